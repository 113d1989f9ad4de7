//! Type aliases for the hashing and storage backends.

use rustc_hash::{FxBuildHasher, FxHashMap, FxHashSet};
use slotmap::{SecondaryMap, SlotMap};
use smallvec::SmallVec;

// =============================================================================
// STORAGE BACKEND
// =============================================================================

/// Arena used for points, edges and triangles.
///
/// Removed slots go on a free list and are reused by later insertions; the
/// version counter inside each key makes stale keys detectable.
pub type StorageMap<K, V> = SlotMap<K, V>;

/// Side table keyed by arena keys.
pub type KeyedMap<K, V> = SecondaryMap<K, V>;

// =============================================================================
// CORE OPTIMIZED TYPES
// =============================================================================

pub type FastHashMap<K, V> = FxHashMap<K, V>;

pub type FastBuildHasher = FxBuildHasher;

pub type FastHashSet<T> = FxHashSet<T>;

/// Stack-allocated buffer that spills to the heap past `N` elements.
pub type SmallBuffer<T, const N: usize> = SmallVec<[T; N]>;
