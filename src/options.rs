use super::{MAX_ARENA_SIZE, MAX_GROWTH};

/// Options for [`Arena`](crate::Arena).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Options {
  capacity: u32,
  max_size: u32,
  max_growth: u32,
}

impl Default for Options {
  #[inline]
  fn default() -> Options {
    Options::new()
  }
}

impl Options {
  /// Creates a new set of options with the default values.
  #[inline]
  pub const fn new() -> Options {
    Options {
      capacity: 1024,
      max_size: MAX_ARENA_SIZE,
      max_growth: MAX_GROWTH,
    }
  }

  /// Sets the initial capacity of the underlying buffer.
  ///
  /// Default is `1024`. The capacity is clamped to [`max_size`](Options::max_size)
  /// and a zero capacity is raised to `1`, because offset `0` is reserved.
  ///
  /// # Example
  ///
  /// ```
  /// use skiparena::Options;
  ///
  /// let options = Options::new().with_capacity(4096);
  /// assert_eq!(options.capacity(), 4096);
  /// ```
  #[inline]
  pub const fn with_capacity(mut self, capacity: u32) -> Options {
    self.capacity = capacity;
    self
  }

  /// Sets the hard ceiling on the size of the arena.
  ///
  /// Default is [`MAX_ARENA_SIZE`]. Larger values are clamped to it, so every
  /// offset stays representable in 32 bits.
  ///
  /// # Example
  ///
  /// ```
  /// use skiparena::Options;
  ///
  /// let options = Options::new().with_max_size(64 << 20);
  /// assert_eq!(options.max_size(), 64 << 20);
  /// ```
  #[inline]
  pub const fn with_max_size(mut self, size: u32) -> Options {
    self.max_size = if size > MAX_ARENA_SIZE {
      MAX_ARENA_SIZE
    } else {
      size
    };
    self
  }

  /// Sets the upper bound on how many bytes a single growth adds.
  ///
  /// Default is [`MAX_GROWTH`]. A growth still adds at least as many bytes as
  /// the allocation that triggered it.
  #[inline]
  pub const fn with_max_growth(mut self, growth: u32) -> Options {
    self.max_growth = if growth == 0 { 1 } else { growth };
    self
  }

  /// Returns the initial capacity, after clamping.
  ///
  /// # Example
  ///
  /// ```
  /// use skiparena::Options;
  ///
  /// let options = Options::new().with_max_size(512).with_capacity(1024);
  /// assert_eq!(options.capacity(), 512);
  ///
  /// let options = Options::new().with_capacity(0);
  /// assert_eq!(options.capacity(), 1);
  /// ```
  #[inline]
  pub const fn capacity(&self) -> u32 {
    let cap = if self.capacity > self.max_size {
      self.max_size
    } else {
      self.capacity
    };

    if cap == 0 {
      1
    } else {
      cap
    }
  }

  /// Returns the hard ceiling on the size of the arena.
  #[inline]
  pub const fn max_size(&self) -> u32 {
    self.max_size
  }

  /// Returns the upper bound on a single growth.
  #[inline]
  pub const fn max_growth(&self) -> u32 {
    self.max_growth
  }
}
