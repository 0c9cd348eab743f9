use core::{
  ptr, slice,
  sync::atomic::{AtomicU16, AtomicU32, AtomicU64, Ordering},
};

use crossbeam_epoch::{self as epoch, Atomic, Guard, Owned};
use crossbeam_utils::CachePadded;
use parking_lot::{Mutex, MutexGuard};

use super::{
  node::{decode_value, encode_value, node_size, Node},
  Error, Options, Result, ValueCodec, MAX_HEIGHT, MAX_NODE_SIZE, NODE_ALIGN, NODE_HEADER_SIZE,
};

mod buffer;
use buffer::Buffer;

mod element;
pub use element::Element;

/// A growable, offset-addressed memory arena backing a skiplist memtable.
///
/// Offsets handed out by the arena stay valid for its whole lifetime, even
/// after the backing buffer has been replaced by a larger copy. Offset `0` is
/// never allocated and stands for "absent".
///
/// Readers never lock: they pin an epoch [`Guard`] and resolve every offset
/// against the buffer current at that moment. Writers go through an
/// [`ArenaWriter`], which serializes allocation, growth and link publication.
pub struct Arena {
  /// The first unused offset. Bytes below it are fully written.
  n: CachePadded<AtomicU32>,
  buf: Atomic<Buffer>,
  lock: Mutex<()>,
  opts: Options,
}

impl core::fmt::Debug for Arena {
  fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
    f.debug_struct("Arena")
      .field("cap", &self.capacity())
      .field("allocated", &self.size())
      .field("max_size", &self.opts.max_size())
      .finish()
  }
}

impl Drop for Arena {
  fn drop(&mut self) {
    // Safety: we have exclusive access, no reader can hold a guard into
    // this arena anymore.
    unsafe {
      let guard = epoch::unprotected();
      let buf = self.buf.load(Ordering::Relaxed, guard);
      if !buf.is_null() {
        drop(buf.into_owned());
      }
    }
  }
}

impl Arena {
  /// Creates an arena with the given initial capacity and default options.
  #[inline]
  pub fn new(capacity: u32) -> Self {
    Self::with_options(Options::new().with_capacity(capacity))
  }

  /// Creates an arena with the given options.
  pub fn with_options(opts: Options) -> Self {
    Self {
      buf: Atomic::new(Buffer::new(opts.capacity() as usize)),
      // Don't store data at position 0 in order to reserve offset=0 as a kind
      // of nil pointer.
      n: CachePadded::new(AtomicU32::new(1)),
      lock: Mutex::new(()),
      opts,
    }
  }

  /// Returns the options the arena was created with.
  #[inline]
  pub const fn options(&self) -> &Options {
    &self.opts
  }

  /// Returns the number of bytes allocated by the arena, including the
  /// reserved null byte.
  #[inline]
  pub fn size(&self) -> u32 {
    self.n.load(Ordering::Acquire)
  }

  /// Returns the capacity of the current backing buffer.
  #[inline]
  pub fn capacity(&self) -> usize {
    self.buffer(&epoch::pin()).cap()
  }

  /// Returns the hard ceiling on the size of the arena.
  #[inline]
  pub const fn max_size(&self) -> u32 {
    self.opts.max_size()
  }

  /// Returns the number of bytes that can still be allocated.
  #[inline]
  pub fn remaining(&self) -> u32 {
    self.opts.max_size().saturating_sub(self.size())
  }

  /// Acquires the writer lock.
  ///
  /// Only one writer exists at a time. Readers are never blocked by it.
  pub fn writer(&self) -> ArenaWriter<'_> {
    ArenaWriter {
      arena: self,
      _lock: self.lock.lock(),
      guard: epoch::pin(),
    }
  }

  #[inline]
  fn buffer<'g>(&self, guard: &'g Guard) -> &'g Buffer {
    // Safety: the pointer is never null while the arena is alive, and a
    // replaced buffer is only destroyed once every guard has been dropped.
    unsafe { self.buf.load(Ordering::Acquire, guard).deref() }
  }

  /// Checks `[offset, offset + size)` against the published cursor, then
  /// resolves the buffer. The cursor must be loaded first: it is published
  /// after the buffer swap, so the buffer seen afterwards holds every byte
  /// below it.
  #[inline]
  fn checked<'g>(&self, offset: u32, size: usize, guard: &'g Guard) -> Result<&'g Buffer> {
    let allocated = self.size();
    let buf = self.buffer(guard);
    if offset == 0 || offset as u64 + size as u64 > allocated as u64 || !buf.contains(offset, size)
    {
      return Err(Error::OutOfBounds {
        offset,
        size: size as u32,
        allocated,
      });
    }
    Ok(buf)
  }

  /// Returns the key stored at `offset`.
  ///
  /// Offset `0` with size `0` is the absent key and yields an empty slice.
  pub fn get_key<'g>(&self, offset: u32, size: u16, guard: &'g Guard) -> Result<&'g [u8]> {
    if offset == 0 && size == 0 {
      return Ok(&[]);
    }

    let buf = self.checked(offset, size as usize, guard)?;
    // Safety: keys are immutable once the cursor has been published past them.
    Ok(unsafe { buf.bytes(offset, size as usize) })
  }

  /// Decodes the value stored at `offset`.
  pub fn get_val<V: ValueCodec>(&self, offset: u32, size: u32, guard: &Guard) -> Result<V> {
    let buf = self.checked(offset, size as usize, guard)?;
    // Safety: values are immutable once the cursor has been published past them.
    V::decode(unsafe { buf.bytes(offset, size as usize) })
  }

  /// Returns the node stored at `offset`, or `None` for offset `0`.
  ///
  /// ## Safety
  /// - `offset` must be `0` or an offset returned by [`ArenaWriter::put_node`]
  ///   or [`ArenaWriter::new_node`] on this arena. Node fields are accessed
  ///   atomically, and an arbitrary offset would alias other allocations.
  pub unsafe fn get_element<'a>(&'a self, offset: u32, guard: &'a Guard) -> Result<Option<Element<'a>>> {
    if offset == 0 {
      return Ok(None);
    }
    if offset as usize % NODE_ALIGN != 0 {
      return Err(Error::Misaligned(offset));
    }

    let buf = self.checked(offset, NODE_HEADER_SIZE, guard)?;
    let node = buf.node(offset);
    let height = (*ptr::addr_of!((*node).height)).load(Ordering::Acquire) as usize;
    if height == 0 || height > MAX_HEIGHT {
      return Err(Error::InvalidHeight(height));
    }
    self.checked(offset, node_size(height), guard)?;

    Ok(Some(Element::new(self, guard, offset, height)))
  }
}

/// The exclusive write path of an [`Arena`].
///
/// Holding a writer serializes allocation, buffer growth and node link
/// updates. Readers keep running concurrently.
pub struct ArenaWriter<'a> {
  arena: &'a Arena,
  _lock: MutexGuard<'a, ()>,
  guard: Guard,
}

impl core::fmt::Debug for ArenaWriter<'_> {
  fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
    f.debug_struct("ArenaWriter")
      .field("arena", self.arena)
      .finish()
  }
}

impl<'a> ArenaWriter<'a> {
  /// Returns the arena being written.
  #[inline]
  pub const fn arena(&self) -> &'a Arena {
    self.arena
  }

  /// Allocates `size` zeroed bytes and returns the offset of the region.
  ///
  /// Returns [`Error::Full`] if the arena would exceed its maximum size.
  pub fn allocate(&mut self, size: u32) -> Result<u32> {
    let offset = self.reserve(size)?;
    self.publish(offset + size);
    Ok(offset)
  }

  /// Allocates a node with a tower of `height` levels and returns its
  /// `NODE_ALIGN` aligned offset.
  pub fn put_node(&mut self, height: usize) -> Result<u32> {
    let (offset, end) = self.reserve_node(height)?;
    self.init_node(offset, height, 0, 0, 0);
    self.publish(end);
    Ok(offset)
  }

  /// Copies `key` into the arena and returns its offset.
  pub fn put_key(&mut self, key: &[u8]) -> Result<u32> {
    let size = key.len();
    if size > u32::MAX as usize {
      return Err(self.full(size as u64));
    }

    let offset = self.reserve(size as u32)?;
    // Safety: the region was just reserved and is not published yet.
    unsafe {
      self.buffer().bytes_mut(offset, size).copy_from_slice(key);
    }
    self.publish(offset + size as u32);
    Ok(offset)
  }

  /// Encodes `val` into the arena and returns its offset.
  pub fn put_val<V: ValueCodec>(&mut self, val: &V) -> Result<u32> {
    let size = val.encoded_size();
    let offset = self.reserve(size)?;
    // Safety: the region was just reserved and is not published yet.
    unsafe {
      val.encode(self.buffer().bytes_mut(offset, size as usize));
    }
    self.publish(offset + size);
    Ok(offset)
  }

  /// Stores `key` and `val`, then allocates a node of `height` levels that
  /// points at them. The node is fully initialized before it becomes
  /// readable.
  pub fn new_node<V: ValueCodec>(&mut self, key: &[u8], val: &V, height: usize) -> Result<u32> {
    if key.len() > u16::MAX as usize {
      return Err(Error::KeyTooLarge(key.len()));
    }
    if height == 0 || height > MAX_HEIGHT {
      return Err(Error::InvalidHeight(height));
    }

    let key_offset = self.put_key(key)?;
    let val_size = val.encoded_size();
    let val_offset = self.put_val(val)?;

    let (offset, end) = self.reserve_node(height)?;
    self.init_node(offset, height, key_offset, key.len() as u16, encode_value(val_offset, val_size));
    self.publish(end);
    Ok(offset)
  }

  /// Publishes `next` as the successor of `node` at `level`.
  ///
  /// ## Safety
  /// - `node` must be an offset returned by [`put_node`](ArenaWriter::put_node)
  ///   or [`new_node`](ArenaWriter::new_node) on this arena.
  pub unsafe fn set_next_offset(&self, node: u32, level: usize, next: u32) -> Result<()> {
    let element = self.element(node)?;
    if level >= element.height() {
      return Err(Error::InvalidHeight(level + 1));
    }
    element.tower(level).store(next, Ordering::Release);
    Ok(())
  }

  /// Replaces the successor of `node` at `level` with `new` if it is still
  /// `old`. Returns whether the swap happened.
  ///
  /// ## Safety
  /// - `node` must be an offset returned by [`put_node`](ArenaWriter::put_node)
  ///   or [`new_node`](ArenaWriter::new_node) on this arena.
  pub unsafe fn cas_next_offset(&self, node: u32, level: usize, old: u32, new: u32) -> Result<bool> {
    let element = self.element(node)?;
    if level >= element.height() {
      return Err(Error::InvalidHeight(level + 1));
    }
    Ok(
      element
        .tower(level)
        .compare_exchange(old, new, Ordering::AcqRel, Ordering::Acquire)
        .is_ok(),
    )
  }

  /// Points `node` at a value previously stored with
  /// [`put_val`](ArenaWriter::put_val).
  ///
  /// ## Safety
  /// - `node` must be an offset returned by [`put_node`](ArenaWriter::put_node)
  ///   or [`new_node`](ArenaWriter::new_node) on this arena.
  pub unsafe fn set_value(&self, node: u32, offset: u32, size: u32) -> Result<()> {
    let element = self.element(node)?;
    element
      .value_pointer()
      .store(encode_value(offset, size), Ordering::Release);
    Ok(())
  }

  unsafe fn element(&self, node: u32) -> Result<Element<'_>> {
    self
      .arena
      .get_element(node, &self.guard)?
      .ok_or(Error::OutOfBounds {
        offset: 0,
        size: NODE_HEADER_SIZE as u32,
        allocated: self.arena.size(),
      })
  }

  #[inline]
  fn buffer(&self) -> &Buffer {
    self.arena.buffer(&self.guard)
  }

  #[inline]
  fn publish(&self, end: u32) {
    self.arena.n.store(end, Ordering::Release);
  }

  /// Reserves space for a node, returning the aligned offset and the end of
  /// the padded region.
  fn reserve_node(&mut self, height: usize) -> Result<(u32, u32)> {
    if height == 0 || height > MAX_HEIGHT {
      return Err(Error::InvalidHeight(height));
    }

    // Pad the allocation with enough bytes to ensure pointer alignment.
    let align = NODE_ALIGN as u32 - 1;
    let size = node_size(height) as u32 + align;
    let offset = self.reserve(size)?;
    Ok(((offset + align) & !align, offset + size))
  }

  fn init_node(&self, offset: u32, height: usize, key_offset: u32, key_size: u16, value: u64) {
    // Safety: the node was just reserved, is aligned and is not published yet.
    unsafe {
      let node = self.buffer().node(offset);
      (*ptr::addr_of!((*node).value)).store(value, Ordering::Relaxed);
      (*ptr::addr_of!((*node).key_offset)).store(key_offset, Ordering::Relaxed);
      (*ptr::addr_of!((*node).key_size)).store(key_size, Ordering::Relaxed);
      (*ptr::addr_of!((*node).height)).store(height as u16, Ordering::Relaxed);
    }
  }

  /// Makes room for `size` more bytes, growing the buffer if needed, and
  /// returns the offset where they start. The cursor is left untouched until
  /// the caller has written the region and publishes it.
  fn reserve(&mut self, size: u32) -> Result<u32> {
    let max = self.arena.opts.max_size() as u64;
    let size = size as u64;
    if size > max {
      return Err(self.full(size));
    }

    let offset = self.arena.n.load(Ordering::Relaxed) as u64;
    let end = offset + size;
    if end > max {
      return Err(self.full(size));
    }

    let cap = self.buffer().cap() as u64;
    // Keep room for one more full height node after this allocation.
    if cap.saturating_sub(MAX_NODE_SIZE as u64) < end {
      let mut growth = cap.min(self.arena.opts.max_growth() as u64).max(size);
      if cap + growth > max {
        growth = max - cap;
        if growth < size {
          return Err(self.full(size));
        }
      }

      if growth > 0 {
        self.grow((cap + growth) as usize);
      }
    }

    Ok(offset as u32)
  }

  fn grow(&mut self, cap: usize) {
    let old = self.arena.buf.load(Ordering::Acquire, &self.guard);
    // Safety: the buffer is never null while the arena is alive.
    let new = unsafe { old.deref() }.grow(cap);

    #[cfg(feature = "tracing")]
    tracing::debug!(
      old_cap = unsafe { old.deref() }.cap(),
      new_cap = cap,
      allocated = self.arena.size(),
      "growing arena"
    );

    self
      .arena
      .buf
      .store(Owned::new(new), Ordering::Release);
    // Safety: the old buffer is unreachable for new readers, and readers that
    // still see it hold a guard.
    unsafe {
      self.guard.defer_destroy(old);
    }
  }

  #[cold]
  fn full(&self, requested: u64) -> Error {
    let allocated = self.arena.size();
    let max = self.arena.opts.max_size();

    #[cfg(feature = "tracing")]
    tracing::warn!(requested, allocated, max, "arena is full");

    Error::Full {
      requested,
      allocated,
      max,
    }
  }
}
