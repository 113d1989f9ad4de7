//! Partition of mesh edges into short, path-shaped chains.
//!
//! [`make_graph`] walks the edges of a mesh from shortest to longest, in the
//! manner of Kruskal's algorithm, and keeps an edge only if it extends a chain
//! at one of its ends or joins two chains end to end without exceeding the
//! size cap. Every kept edge is copied into a new graph-only mesh over the
//! same points. The chains seed terrain fault lines.

use crate::core::collections::KeyedMap;
use crate::core::local_point::LocalPoint;
use crate::core::periodic_mesh::{EdgeKey, PeriodicMesh, PointKey};

/// One chain of points.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Group {
    points: Vec<PointKey>,
}

impl Group {
    /// Members in the order they joined; keys refer to the output mesh.
    #[must_use]
    pub fn points(&self) -> &[PointKey] {
        &self.points
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.points.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }
}

/// Result of [`make_graph`].
#[derive(Clone, Debug)]
pub struct FaultGraph {
    /// Copy of the input points with only the accepted edges.
    pub grid: PeriodicMesh,
    /// Non-empty chains.
    pub groups: Vec<Group>,
}

#[derive(Clone, Copy, Debug, Default)]
struct Membership {
    group: Option<usize>,
    is_tail: bool,
}

struct GroupTable {
    groups: Vec<Group>,
    free: Vec<usize>,
    membership: KeyedMap<PointKey, Membership>,
    max_size: usize,
}

impl GroupTable {
    fn state(&self, key: PointKey) -> Membership {
        self.membership.get(key).copied().unwrap_or_default()
    }

    fn set(&mut self, key: PointKey, group: usize, is_tail: bool) {
        self.membership.insert(
            key,
            Membership {
                group: Some(group),
                is_tail,
            },
        );
    }

    fn allocate(&mut self, points: Vec<PointKey>) -> usize {
        let group = Group { points };
        if let Some(slot) = self.free.pop() {
            self.groups[slot] = group;
            slot
        } else {
            self.groups.push(group);
            self.groups.len() - 1
        }
    }

    /// Applies the edge `a-b` if it keeps every group a bounded path.
    fn try_join(&mut self, a: PointKey, b: PointKey) -> bool {
        let (sa, sb) = (self.state(a), self.state(b));
        match (sa.group, sb.group) {
            (None, None) => {
                if self.max_size < 2 {
                    return false;
                }
                let group = self.allocate(vec![a, b]);
                self.set(a, group, true);
                self.set(b, group, true);
                true
            }
            (Some(group), None) => self.extend(group, a, sa.is_tail, b),
            (None, Some(group)) => self.extend(group, b, sb.is_tail, a),
            (Some(ga), Some(gb)) => {
                if ga == gb || !sa.is_tail || !sb.is_tail {
                    return false;
                }
                if self.groups[ga].len() + self.groups[gb].len() > self.max_size {
                    return false;
                }
                let (large, small) = if self.groups[ga].len() >= self.groups[gb].len() {
                    (ga, gb)
                } else {
                    (gb, ga)
                };
                let moved = std::mem::take(&mut self.groups[small].points);
                for &key in &moved {
                    let is_tail = self.state(key).is_tail;
                    self.set(key, large, is_tail);
                }
                self.groups[large].points.extend(moved);
                self.free.push(small);
                self.set(a, large, false);
                self.set(b, large, false);
                true
            }
        }
    }

    fn extend(&mut self, group: usize, tail: PointKey, is_tail: bool, new: PointKey) -> bool {
        if !is_tail || self.groups[group].len() >= self.max_size {
            return false;
        }
        self.groups[group].points.push(new);
        self.set(tail, group, false);
        self.set(new, group, true);
        true
    }
}

/// Groups the edges of `mesh` into chains of at most `max_group_size` points.
///
/// Edges are visited by increasing resolved length; ties keep arena order.
/// Edges from a point to one of its own images are ignored.
#[must_use]
pub fn make_graph(mesh: &PeriodicMesh, max_group_size: usize) -> FaultGraph {
    let mut grid = mesh.empty_like();
    let mut remap: KeyedMap<PointKey, PointKey> = KeyedMap::with_capacity(mesh.number_of_points());
    for (key, point) in mesh.points() {
        remap.insert(key, grid.add_point(point.position()).key());
    }

    let mut edges: Vec<(f64, EdgeKey)> = mesh
        .edges()
        .filter(|(_, edge)| !edge.signature().is_self_loop())
        .map(|(key, _)| (mesh.edge_view(key).length(), key))
        .collect();
    edges.sort_by(|x, y| x.0.total_cmp(&y.0));

    let mut table = GroupTable {
        groups: Vec::new(),
        free: Vec::new(),
        membership: KeyedMap::with_capacity(mesh.number_of_points()),
        max_size: max_group_size,
    };
    let mut accepted = 0_usize;
    for (_, key) in edges {
        let [from, to] = mesh.edge(key).points();
        let (a, b) = (remap[from.point], remap[to.point]);
        if table.try_join(a, b) {
            grid.add_edge(
                LocalPoint::new(a, from.offset),
                LocalPoint::new(b, to.offset),
            );
            accepted += 1;
        }
    }

    let groups: Vec<Group> = table.groups.into_iter().filter(|g| !g.is_empty()).collect();
    tracing::debug!(
        edges = mesh.number_of_edges(),
        accepted,
        groups = groups.len(),
        max_group_size,
        "grouped mesh edges into chains"
    );
    FaultGraph { grid, groups }
}
