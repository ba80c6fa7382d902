//! Thin aliases over `std::collections::{HashMap, HashSet}` that default to
//! `ahash` as the hasher, matching the rest of the workspace's habit of using
//! `AHashMap`/`AHashSet` everywhere instead of the (slower, DoS-resistant)
//! standard-library default hasher.

#[cfg(feature = "ahash")]
pub type ARandomState = ahash::RandomState;
#[cfg(not(feature = "ahash"))]
pub type ARandomState = std::collections::hash_map::RandomState;

pub type AHashMap<K, V> = std::collections::HashMap<K, V, ARandomState>;
pub type AHashSet<T> = std::collections::HashSet<T, ARandomState>;

pub mod hash_map {
    pub use std::collections::hash_map::Entry;
}
