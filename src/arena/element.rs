use super::*;

/// A handle to a node stored in an [`Arena`].
///
/// The handle carries the node's offset instead of its address, and every
/// access resolves that offset against the arena's current buffer. Holding an
/// `Element` therefore never pins a buffer that a later growth has replaced,
/// beyond the epoch guard it was created with.
#[derive(Clone, Copy)]
pub struct Element<'a> {
  arena: &'a Arena,
  guard: &'a Guard,
  offset: u32,
  height: usize,
}

impl core::fmt::Debug for Element<'_> {
  fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
    f.debug_struct("Element")
      .field("offset", &self.offset)
      .field("height", &self.height)
      .field("key", &self.key_descriptor())
      .field("value", &self.value_descriptor())
      .finish()
  }
}

impl<'a> Element<'a> {
  #[inline]
  pub(super) const fn new(arena: &'a Arena, guard: &'a Guard, offset: u32, height: usize) -> Self {
    Self {
      arena,
      guard,
      offset,
      height,
    }
  }

  /// Returns the offset of the node inside the arena.
  #[inline]
  pub const fn offset(&self) -> u32 {
    self.offset
  }

  /// Returns the height of the node's tower.
  #[inline]
  pub const fn height(&self) -> usize {
    self.height
  }

  /// Returns the `(offset, size)` of the node's key.
  #[inline]
  pub fn key_descriptor(&self) -> (u32, u16) {
    let node = self.node_header();
    (
      node.0.load(Ordering::Acquire),
      node.1.load(Ordering::Acquire),
    )
  }

  /// Returns the `(offset, encoded size)` of the node's value.
  #[inline]
  pub fn value_descriptor(&self) -> (u32, u32) {
    decode_value(self.value_pointer().load(Ordering::Acquire))
  }

  /// Returns the node's key.
  pub fn key(&self) -> Result<&'a [u8]> {
    let (offset, size) = self.key_descriptor();
    self.arena.get_key(offset, size, self.guard)
  }

  /// Decodes the node's value.
  ///
  /// Returns `None` if no value has been stored, as for a node created by
  /// [`ArenaWriter::put_node`](super::ArenaWriter::put_node).
  pub fn value<V: ValueCodec>(&self) -> Result<Option<V>> {
    match self.value_descriptor() {
      (0, 0) => Ok(None),
      (offset, size) => self.arena.get_val(offset, size, self.guard).map(Some),
    }
  }

  /// Returns the offset of the next node at `level`, or `0` if there is none.
  ///
  /// Levels at or above the node's height were never allocated and always
  /// read as `0`.
  #[inline]
  pub fn next_offset(&self, level: usize) -> u32 {
    if level >= self.height {
      return 0;
    }
    self.tower(level).load(Ordering::Acquire)
  }

  #[inline]
  pub(super) fn tower(&self, level: usize) -> &'a AtomicU32 {
    debug_assert!(level < self.height);
    let node = self.node_ptr();
    // Safety: `level < height`, so the slot was allocated with the node.
    unsafe { &*ptr::addr_of!((*node).tower[level]) }
  }

  #[inline]
  pub(super) fn value_pointer(&self) -> &'a AtomicU64 {
    let node = self.node_ptr();
    unsafe { &*ptr::addr_of!((*node).value) }
  }

  #[inline]
  fn node_header(&self) -> (&'a AtomicU32, &'a AtomicU16) {
    let node = self.node_ptr();
    unsafe {
      (
        &*ptr::addr_of!((*node).key_offset),
        &*ptr::addr_of!((*node).key_size),
      )
    }
  }

  #[inline]
  fn node_ptr(&self) -> *const Node {
    let buf = self.arena.buffer(self.guard);
    // Safety: `Arena::get_element` checked alignment and that the node lies
    // below the published cursor, and buffers only ever grow.
    unsafe { buf.node(self.offset) }
  }
}
