//! Id-keyed containers backing the ECS.

mod bitset;
mod long_hash_map;
mod pinned_array;

pub use bitset::{BitSet, Ones};
pub use long_hash_map::{LongHashMap, LongHashMapSlot};
pub use pinned_array::PinnedArray;
