//! Fixed-address backing array.
//!
//! The buffer is a boxed slice, so its base address only changes inside
//! [`PinnedArray::resize`]. Callers may cache [`PinnedArray::as_ptr`]
//! between resizes.

use std::ops::{Index, IndexMut};

#[derive(Debug, Clone)]
pub struct PinnedArray<T> {
    data: Box<[T]>,
}

impl<T: Copy + Default> PinnedArray<T> {
    /// Allocate `len` default-initialized elements.
    pub fn new(len: usize) -> Self {
        Self {
            data: vec![T::default(); len].into_boxed_slice(),
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Base address of the buffer. Valid until the next `resize`.
    #[inline]
    pub fn as_ptr(&self) -> *const T {
        self.data.as_ptr()
    }

    #[inline]
    pub fn as_slice(&self) -> &[T] {
        &self.data
    }

    /// Reallocate to `new_len`, copying the overlapping prefix.
    ///
    /// New tail elements are default-initialized. Invalidates every pointer
    /// previously returned by `as_ptr`.
    pub fn resize(&mut self, new_len: usize) {
        let mut next = vec![T::default(); new_len].into_boxed_slice();
        let keep = new_len.min(self.data.len());
        next[..keep].copy_from_slice(&self.data[..keep]);
        self.data = next;
    }

    /// Reset every element to its default without reallocating.
    pub fn clear(&mut self) {
        self.data.fill(T::default());
    }
}

impl<T> Index<usize> for PinnedArray<T> {
    type Output = T;

    #[inline]
    fn index(&self, index: usize) -> &T {
        &self.data[index]
    }
}

impl<T> IndexMut<usize> for PinnedArray<T> {
    #[inline]
    fn index_mut(&mut self, index: usize) -> &mut T {
        &mut self.data[index]
    }
}
