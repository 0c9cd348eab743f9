/// Error type for the skiparena crate.
#[derive(thiserror::Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
  /// Indicates that the arena cannot grow any further to satisfy an
  /// allocation. The memtable backed by the arena should be rotated and
  /// flushed.
  #[error("allocation of {requested} bytes failed because arena is full (allocated {allocated}, max {max})")]
  Full {
    /// The number of bytes requested.
    requested: u64,
    /// The number of bytes already allocated.
    allocated: u32,
    /// The maximum size of the arena.
    max: u32,
  },

  /// Indicates that a read addressed bytes beyond what has been allocated.
  #[error("offset {offset} with size {size} is out of bounds (allocated {allocated})")]
  OutOfBounds {
    /// The offset of the read.
    offset: u32,
    /// The size of the read.
    size: u32,
    /// The number of bytes allocated when the read was attempted.
    allocated: u32,
  },

  /// Indicates that a node offset is not aligned to `NODE_ALIGN`.
  #[error("node offset {0} is misaligned")]
  Misaligned(u32),

  /// Indicates that a node height is outside `[1, MAX_HEIGHT]`.
  #[error("node height {0} is out of range")]
  InvalidHeight(usize),

  /// Indicates that a key is too long for a node's 16-bit key size.
  #[error("key of {0} bytes is too large")]
  KeyTooLarge(usize),

  /// Indicates that an encoded filter is too short to hold its probe count.
  #[error("bloom filter of {0} bytes is malformed")]
  InvalidFilter(usize),

  /// Indicates that a value could not be decoded from its encoded form.
  #[error("failed to decode value: {0}")]
  Decode(&'static str),
}

/// Result type for the skiparena crate.
pub type Result<T> = core::result::Result<T, Error>;
