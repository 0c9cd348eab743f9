use std::alloc::{alloc_zeroed, dealloc, handle_alloc_error, Layout};

use super::*;

/// A zeroed, `NODE_ALIGN` aligned allocation backing the arena.
///
/// The buffer never reallocates in place: growing creates a new buffer and
/// copies every byte to the same offset.
#[derive(Debug)]
pub(super) struct Buffer {
  ptr: ptr::NonNull<u8>,
  cap: usize,
}

// Safety: the buffer is a plain heap allocation, all access to it goes
// through the arena, which only hands out bytes below the published cursor
// and serializes every write behind its writer lock.
unsafe impl Send for Buffer {}
unsafe impl Sync for Buffer {}

impl Drop for Buffer {
  #[inline]
  fn drop(&mut self) {
    unsafe {
      dealloc(self.ptr.as_ptr(), Self::layout(self.cap));
    }
  }
}

impl Buffer {
  #[inline]
  pub(super) fn new(cap: usize) -> Self {
    let cap = cap.max(1);
    let layout = Self::layout(cap);
    let ptr = unsafe {
      let ptr = alloc_zeroed(layout);
      if ptr.is_null() {
        handle_alloc_error(layout);
      }
      ptr::NonNull::new_unchecked(ptr)
    };

    Self { ptr, cap }
  }

  /// Returns a new buffer of `cap` bytes holding a copy of this one.
  pub(super) fn grow(&self, cap: usize) -> Self {
    debug_assert!(cap >= self.cap);
    let new = Self::new(cap);
    // Safety: both allocations are at least `self.cap` bytes and distinct.
    unsafe {
      ptr::copy_nonoverlapping(self.ptr.as_ptr(), new.ptr.as_ptr(), self.cap);
    }
    new
  }

  #[inline]
  fn layout(cap: usize) -> Layout {
    // `cap` never exceeds `MAX_ARENA_SIZE`, which is far below `isize::MAX`.
    unsafe { Layout::from_size_align_unchecked(cap, NODE_ALIGN) }
  }

  #[inline]
  pub(super) const fn cap(&self) -> usize {
    self.cap
  }

  #[inline]
  pub(super) fn contains(&self, offset: u32, size: usize) -> bool {
    offset as usize + size <= self.cap
  }

  /// ## Safety
  /// - `offset + size` must not exceed the capacity.
  /// - No one may write to the range while the slice is alive.
  #[inline]
  pub(super) unsafe fn bytes(&self, offset: u32, size: usize) -> &[u8] {
    slice::from_raw_parts(self.ptr.as_ptr().add(offset as usize), size)
  }

  /// ## Safety
  /// - `offset + size` must not exceed the capacity.
  /// - The range must not be reachable by readers yet.
  #[allow(clippy::mut_from_ref)]
  #[inline]
  pub(super) unsafe fn bytes_mut(&self, offset: u32, size: usize) -> &mut [u8] {
    slice::from_raw_parts_mut(self.ptr.as_ptr().add(offset as usize), size)
  }

  /// ## Safety
  /// - `offset` must be `NODE_ALIGN` aligned.
  /// - `offset + NODE_HEADER_SIZE` must not exceed the capacity.
  #[inline]
  pub(super) unsafe fn node(&self, offset: u32) -> *const Node {
    self.ptr.as_ptr().add(offset as usize).cast::<Node>()
  }
}
