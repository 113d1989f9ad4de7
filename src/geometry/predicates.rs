//! Geometric predicates for planar triangles.
//!
//! Everything here works on already-resolved positions. Periodic wrapping is the
//! caller's business: lift the vertices into a common frame first (see
//! [`ToroidalSpace::lift`](crate::topology::spaces::ToroidalSpace::lift)).

use crate::geometry::point::Point2;

/// Relative tolerance used when deciding that three points are collinear.
pub const DEGENERACY_EPSILON: f64 = 1e-12;

/// Slack applied to barycentric coordinates so that points on a shared edge are
/// found in at least one of the two triangles.
pub const LOCATION_EPSILON: f64 = 1e-12;

/// Represents the position of a point relative to a circumcircle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InSphere {
    /// The point is outside the circumcircle
    OUTSIDE,
    /// The point is on the circumcircle (within numerical tolerance)
    BOUNDARY,
    /// The point is strictly inside the circumcircle
    INSIDE,
}

impl std::fmt::Display for InSphere {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::OUTSIDE => write!(f, "OUTSIDE"),
            Self::BOUNDARY => write!(f, "BOUNDARY"),
            Self::INSIDE => write!(f, "INSIDE"),
        }
    }
}

/// Represents the orientation of a triangle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Orientation {
    /// Clockwise
    NEGATIVE,
    /// Collinear (within numerical tolerance)
    DEGENERATE,
    /// Counter-clockwise
    POSITIVE,
}

impl std::fmt::Display for Orientation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NEGATIVE => write!(f, "NEGATIVE"),
            Self::DEGENERATE => write!(f, "DEGENERATE"),
            Self::POSITIVE => write!(f, "POSITIVE"),
        }
    }
}

/// Twice the signed area of `(a, b, c)`. Positive when counter-clockwise.
#[inline]
#[must_use]
pub fn signed_area2(a: Point2, b: Point2, c: Point2) -> f64 {
    (b - a).cross(c - a)
}

/// Classifies the winding of `(a, b, c)`.
///
/// # Example
///
/// ```
/// use periodic_delaunay::geometry::point::Point2;
/// use periodic_delaunay::geometry::predicates::{Orientation, triangle_orientation};
///
/// let a = Point2::new(0.0, 0.0);
/// let b = Point2::new(1.0, 0.0);
/// let c = Point2::new(0.0, 1.0);
/// assert_eq!(triangle_orientation(a, b, c), Orientation::POSITIVE);
/// assert_eq!(triangle_orientation(a, c, b), Orientation::NEGATIVE);
/// ```
#[must_use]
pub fn triangle_orientation(a: Point2, b: Point2, c: Point2) -> Orientation {
    let area2 = signed_area2(a, b, c);
    let scale = (b - a).squared_norm().max((c - a).squared_norm());
    if area2.abs() <= DEGENERACY_EPSILON * scale {
        Orientation::DEGENERATE
    } else if area2 > 0.0 {
        Orientation::POSITIVE
    } else {
        Orientation::NEGATIVE
    }
}

/// Circumcenter of a triangle, found by intersecting the perpendicular
/// bisectors of two of its sides.
///
/// Returns `None` for collinear (or numerically collinear) input.
#[must_use]
pub fn triangle_omega(p1: Point2, p2: Point2, p3: Point2) -> Option<Point2> {
    // Work relative to p1 so large coordinates do not cancel.
    let a = p2 - p1;
    let b = p3 - p1;
    let det = a.cross(b);
    let scale = a.squared_norm().max(b.squared_norm());
    if det.abs() <= DEGENERACY_EPSILON * scale {
        return None;
    }

    let a2 = a.squared_norm();
    let b2 = b.squared_norm();
    let denom = 2.0 * det;
    let offset = Point2::new(
        b.y.mul_add(a2, -(a.y * b2)) / denom,
        a.x.mul_add(b2, -(b.x * a2)) / denom,
    );
    let center = p1 + offset;
    center.is_finite().then_some(center)
}

/// Circumcenter together with the squared circumradius.
#[must_use]
pub fn circumcircle(p1: Point2, p2: Point2, p3: Point2) -> Option<(Point2, f64)> {
    triangle_omega(p1, p2, p3).map(|center| (center, center.squared_distance(p1)))
}

/// Classifies `query` against the circumcircle of `(p1, p2, p3)`.
///
/// `tolerance` is relative to the squared radius. A degenerate triangle has no
/// circle and reports [`InSphere::OUTSIDE`].
#[must_use]
pub fn incircle(p1: Point2, p2: Point2, p3: Point2, query: Point2, tolerance: f64) -> InSphere {
    let Some((center, radius2)) = circumcircle(p1, p2, p3) else {
        return InSphere::OUTSIDE;
    };
    let d2 = center.squared_distance(query);
    let slack = tolerance * radius2;
    if d2 < radius2 - slack {
        InSphere::INSIDE
    } else if d2 <= radius2 + slack {
        InSphere::BOUNDARY
    } else {
        InSphere::OUTSIDE
    }
}

/// Barycentric weights of `p` with respect to `(a, b, c)`.
///
/// The weights sum to one. Returns `None` when the triangle is degenerate.
#[must_use]
pub fn barycentric(p: Point2, a: Point2, b: Point2, c: Point2) -> Option<[f64; 3]> {
    let v0 = b - a;
    let v1 = c - a;
    let v2 = p - a;
    let d00 = v0.dot(v0);
    let d01 = v0.dot(v1);
    let d11 = v1.dot(v1);
    let d20 = v2.dot(v0);
    let d21 = v2.dot(v1);
    // `denom` is the squared doubled area, so the threshold is squared too.
    let denom = d00.mul_add(d11, -(d01 * d01));
    if denom.abs() <= (DEGENERACY_EPSILON * d00.max(d11)).powi(2) || !denom.is_finite() {
        return None;
    }
    let wb = d11.mul_add(d20, -(d01 * d21)) / denom;
    let wc = d00.mul_add(d21, -(d01 * d20)) / denom;
    Some([1.0 - wb - wc, wb, wc])
}

/// Returns `true` if `p` lies inside or on the boundary of `(a, b, c)`.
///
/// Degenerate triangles contain nothing.
#[must_use]
pub fn is_on_triangle(p: Point2, a: Point2, b: Point2, c: Point2) -> bool {
    barycentric(p, a, b, c).is_some_and(|[wa, wb, wc]| {
        wa >= -LOCATION_EPSILON && wb >= -LOCATION_EPSILON && wc >= -LOCATION_EPSILON
    })
}

/// Intersection point of the closed segments `p1p2` and `q1q2`.
///
/// Parallel (including collinear overlapping) segments report no intersection.
#[must_use]
pub fn segment_intersection(p1: Point2, p2: Point2, q1: Point2, q2: Point2) -> Option<Point2> {
    let r = p2 - p1;
    let s = q2 - q1;
    let denom = r.cross(s);
    if denom.abs() <= DEGENERACY_EPSILON * r.norm() * s.norm() {
        return None;
    }
    let qp = q1 - p1;
    let t = qp.cross(s) / denom;
    let u = qp.cross(r) / denom;
    let range = -LOCATION_EPSILON..=1.0 + LOCATION_EPSILON;
    (range.contains(&t) && range.contains(&u)).then(|| p1 + r * t)
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn unit_right_triangle() -> [Point2; 3] {
        [
            Point2::new(0.0, 0.0),
            Point2::new(1.0, 0.0),
            Point2::new(0.0, 1.0),
        ]
    }

    #[test]
    fn test_orientation() {
        let [a, b, c] = unit_right_triangle();
        assert_eq!(triangle_orientation(a, b, c), Orientation::POSITIVE);
        assert_eq!(triangle_orientation(b, a, c), Orientation::NEGATIVE);
        assert_eq!(
            triangle_orientation(a, b, Point2::new(2.0, 0.0)),
            Orientation::DEGENERATE
        );
        assert_eq!(format!("{}", Orientation::POSITIVE), "POSITIVE");
    }

    #[test]
    fn test_triangle_omega_right_triangle() {
        let [a, b, c] = unit_right_triangle();
        let center = triangle_omega(a, b, c).unwrap();
        assert_relative_eq!(center.x, 0.5);
        assert_relative_eq!(center.y, 0.5);

        // Winding does not matter.
        let reversed = triangle_omega(a, c, b).unwrap();
        assert_relative_eq!(reversed.x, 0.5);
        assert_relative_eq!(reversed.y, 0.5);
    }

    #[test]
    fn test_triangle_omega_far_from_origin() {
        let shift = Point2::new(1.0e4, -2.5e4);
        let [a, b, c] = unit_right_triangle().map(|p| p + shift);
        let center = triangle_omega(a, b, c).unwrap();
        assert_relative_eq!(center.x, 0.5 + shift.x, epsilon = 1e-9);
        assert_relative_eq!(center.y, 0.5 + shift.y, epsilon = 1e-9);
    }

    #[test]
    fn test_triangle_omega_collinear_is_none() {
        let a = Point2::new(0.0, 0.0);
        let b = Point2::new(1.0, 1.0);
        let c = Point2::new(3.0, 3.0);
        assert!(triangle_omega(a, b, c).is_none());
        assert!(circumcircle(a, a, b).is_none());
    }

    #[test]
    fn test_incircle() {
        let [a, b, c] = unit_right_triangle();
        assert_eq!(incircle(a, b, c, Point2::new(0.5, 0.5), 1e-12), InSphere::INSIDE);
        assert_eq!(incircle(a, b, c, Point2::new(1.0, 1.0), 1e-12), InSphere::BOUNDARY);
        assert_eq!(incircle(a, b, c, Point2::new(2.0, 2.0), 1e-12), InSphere::OUTSIDE);
    }

    #[test]
    fn test_barycentric_and_containment() {
        let [a, b, c] = unit_right_triangle();
        let w = barycentric(Point2::new(0.25, 0.25), a, b, c).unwrap();
        assert_relative_eq!(w[0], 0.5);
        assert_relative_eq!(w[1], 0.25);
        assert_relative_eq!(w[2], 0.25);

        assert!(is_on_triangle(Point2::new(0.25, 0.25), a, b, c));
        // Vertices and edges count as inside.
        assert!(is_on_triangle(a, a, b, c));
        assert!(is_on_triangle(Point2::new(0.5, 0.5), a, b, c));
        assert!(!is_on_triangle(Point2::new(0.6, 0.6), a, b, c));
        assert!(!is_on_triangle(Point2::new(-0.1, 0.5), a, b, c));

        let d = Point2::new(2.0, 0.0);
        assert!(barycentric(Point2::new(0.5, 0.0), a, b, d).is_none());
        assert!(!is_on_triangle(Point2::new(0.5, 0.0), a, b, d));
    }

    #[test]
    fn test_thin_triangle_still_contains_its_interior() {
        // Smallest angle about 1e-7 rad: flat, but well above the collinear
        // threshold that `triangle_omega` uses.
        let a = Point2::new(0.0, 0.0);
        let b = Point2::new(10.0, 0.0);
        let c = Point2::new(10.0, 1e-6);
        assert!(triangle_omega(a, b, c).is_some());

        let p = Point2::new(5.0, 2.5e-7);
        let w = barycentric(p, a, b, c).unwrap();
        assert_relative_eq!(w[0], 0.5, epsilon = 0.1);
        assert_relative_eq!(w[2], 0.25, epsilon = 0.1);
        assert!(is_on_triangle(p, a, b, c));
        assert!(!is_on_triangle(Point2::new(5.0, 1e-6), a, b, c));
    }

    #[test]
    fn test_segment_intersection() {
        let hit = segment_intersection(
            Point2::new(0.0, 0.0),
            Point2::new(2.0, 2.0),
            Point2::new(0.0, 2.0),
            Point2::new(2.0, 0.0),
        )
        .unwrap();
        assert_relative_eq!(hit.x, 1.0);
        assert_relative_eq!(hit.y, 1.0);

        // Lines cross, segments do not.
        assert!(
            segment_intersection(
                Point2::new(0.0, 0.0),
                Point2::new(1.0, 1.0),
                Point2::new(3.0, 0.0),
                Point2::new(2.0, 1.0),
            )
            .is_none()
        );

        // Parallel.
        assert!(
            segment_intersection(
                Point2::new(0.0, 0.0),
                Point2::new(1.0, 0.0),
                Point2::new(0.0, 1.0),
                Point2::new(1.0, 1.0),
            )
            .is_none()
        );
    }
}
