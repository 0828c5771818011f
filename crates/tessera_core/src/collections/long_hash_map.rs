//! `u64`-keyed hash map with stable slot storage.
//!
//! Entries live in a [`PinnedArray`] of slots; buckets only hold the head
//! index of each chain. A slot keeps its index for as long as its key is
//! present, so slot indices can be cached externally and resolved later
//! through [`LongHashMap::get_by_index`]. Removed slots are recycled
//! through an intrusive free list before the high-water mark grows.

use super::PinnedArray;

const NONE: i32 = -1;

/// One entry of the slot array: the key and the next slot in the same
/// bucket chain (or the next free slot when vacant).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LongHashMapSlot {
    pub key: u64,
    pub next: i32,
}

impl Default for LongHashMapSlot {
    fn default() -> Self {
        Self { key: 0, next: NONE }
    }
}

#[derive(Debug, Clone)]
pub struct LongHashMap<V> {
    /// Head slot of each chain, stored as `index + 1` so zero means empty.
    buckets: Vec<u32>,
    slots: PinnedArray<LongHashMapSlot>,
    values: Vec<Option<V>>,
    len: usize,
    last_index: usize,
    free_index: i32,
    mask: usize,
}

impl<V> LongHashMap<V> {
    pub const DEFAULT_CAPACITY: usize = 16;

    pub fn new() -> Self {
        Self::with_capacity(Self::DEFAULT_CAPACITY)
    }

    /// Capacity is rounded up to a power of two.
    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = capacity.max(2).next_power_of_two();
        let mut values = Vec::with_capacity(capacity);
        values.resize_with(capacity, || None);
        Self {
            buckets: vec![0; capacity],
            slots: PinnedArray::new(capacity),
            values,
            len: 0,
            last_index: 0,
            free_index: NONE,
            mask: capacity - 1,
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    #[inline]
    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    /// Base address of the slot array; stable until the map grows or
    /// [`resize`](Self::resize) is called.
    #[inline]
    pub fn slots_ptr(&self) -> *const LongHashMapSlot {
        self.slots.as_ptr()
    }

    #[inline]
    fn bucket_of(&self, key: u64) -> usize {
        (key.wrapping_mul(0x9E37_79B9_7F4A_7C15) >> 32) as usize & self.mask
    }

    /// Slot index currently holding `key`.
    pub fn try_get_index(&self, key: u64) -> Option<usize> {
        let mut cursor = self.buckets[self.bucket_of(key)] as i32 - 1;
        while cursor != NONE {
            let index = cursor as usize;
            let slot = self.slots[index];
            if slot.key == key {
                return Some(index);
            }
            cursor = slot.next;
        }
        None
    }

    #[inline]
    pub fn contains_key(&self, key: u64) -> bool {
        self.try_get_index(key).is_some()
    }

    pub fn get(&self, key: u64) -> Option<&V> {
        let index = self.try_get_index(key)?;
        self.values[index].as_ref()
    }

    pub fn get_mut(&mut self, key: u64) -> Option<&mut V> {
        let index = self.try_get_index(key)?;
        self.values[index].as_mut()
    }

    /// Value stored in slot `index`.
    ///
    /// # Panics
    /// Panics if the slot is out of range or vacant.
    #[inline]
    pub fn get_by_index(&self, index: usize) -> &V {
        self.values[index]
            .as_ref()
            .unwrap_or_else(|| panic!("slot {index} is vacant"))
    }

    /// Mutable value stored in slot `index`.
    ///
    /// # Panics
    /// Panics if the slot is out of range or vacant.
    #[inline]
    pub fn get_by_index_mut(&mut self, index: usize) -> &mut V {
        self.values[index]
            .as_mut()
            .unwrap_or_else(|| panic!("slot {index} is vacant"))
    }

    /// Key stored in slot `index` (meaningless for vacant slots).
    #[inline]
    pub fn key_at(&self, index: usize) -> u64 {
        self.slots[index].key
    }

    /// Insert or overwrite, returning the previous value.
    pub fn insert(&mut self, key: u64, value: V) -> Option<V> {
        if let Some(index) = self.try_get_index(key) {
            return self.values[index].replace(value);
        }

        let index = if self.free_index != NONE {
            let index = self.free_index as usize;
            self.free_index = self.slots[index].next;
            index
        } else {
            if self.last_index == self.capacity() {
                self.resize(self.capacity() * 2);
            }
            let index = self.last_index;
            self.last_index += 1;
            index
        };

        let bucket = self.bucket_of(key);
        self.slots[index] = LongHashMapSlot {
            key,
            next: self.buckets[bucket] as i32 - 1,
        };
        self.buckets[bucket] = index as u32 + 1;
        self.values[index] = Some(value);
        self.len += 1;
        None
    }

    pub fn remove(&mut self, key: u64) -> Option<V> {
        let bucket = self.bucket_of(key);
        let mut previous = NONE;
        let mut cursor = self.buckets[bucket] as i32 - 1;

        while cursor != NONE {
            let index = cursor as usize;
            let slot = self.slots[index];
            if slot.key == key {
                if previous == NONE {
                    self.buckets[bucket] = (slot.next + 1) as u32;
                } else {
                    self.slots[previous as usize].next = slot.next;
                }
                self.slots[index] = LongHashMapSlot {
                    key: 0,
                    next: self.free_index,
                };
                self.free_index = cursor;
                self.len -= 1;
                return self.values[index].take();
            }
            previous = cursor;
            cursor = slot.next;
        }
        None
    }

    /// Reallocate slot storage to at least `new_capacity` and rebuild the
    /// bucket table. Occupied slots keep their indices.
    pub fn resize(&mut self, new_capacity: usize) {
        let new_capacity = new_capacity.max(self.last_index).max(2).next_power_of_two();
        self.slots.resize(new_capacity);
        self.values.resize_with(new_capacity, || None);
        self.buckets = vec![0; new_capacity];
        self.mask = new_capacity - 1;

        for index in 0..self.last_index {
            if self.values[index].is_some() {
                let bucket = self.bucket_of(self.slots[index].key);
                self.slots[index].next = self.buckets[bucket] as i32 - 1;
                self.buckets[bucket] = index as u32 + 1;
            }
        }
    }

    /// Drop every entry, keeping the allocation.
    pub fn clear(&mut self) {
        self.buckets.fill(0);
        self.slots.clear();
        self.values.iter_mut().for_each(|value| *value = None);
        self.len = 0;
        self.last_index = 0;
        self.free_index = NONE;
    }

    /// Occupied entries in slot order.
    pub fn iter(&self) -> impl Iterator<Item = (u64, &V)> + '_ {
        self.values[..self.last_index]
            .iter()
            .enumerate()
            .filter_map(move |(index, value)| value.as_ref().map(|v| (self.slots[index].key, v)))
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = (u64, &mut V)> + '_ {
        let slots = &self.slots;
        self.values[..self.last_index]
            .iter_mut()
            .enumerate()
            .filter_map(move |(index, value)| value.as_mut().map(|v| (slots[index].key, v)))
    }

    pub fn keys(&self) -> impl Iterator<Item = u64> + '_ {
        self.iter().map(|(key, _)| key)
    }

    pub fn values(&self) -> impl Iterator<Item = &V> + '_ {
        self.iter().map(|(_, value)| value)
    }
}

impl<V> Default for LongHashMap<V> {
    fn default() -> Self {
        Self::new()
    }
}
