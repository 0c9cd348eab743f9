//! Bloom filters for immutable tables.
//!
//! An encoded filter is `bits ++ [k]`: a packed bit array followed by a single
//! byte holding the number of probes used to build it. Probe positions come
//! from double hashing, so each key costs one hash computation no matter how
//! many probes are made.

use bytes::Bytes;

use super::{hash, Error, Result};

/// The largest number of probes a filter is built with.
pub const MAX_PROBES: u8 = 30;

/// The smallest bit array a filter is built with, regardless of key count.
pub const MIN_BITS: usize = 64;

// Bit positions are derived from 32-bit hashes, larger arrays are unreachable.
const MAX_BITS: usize = u32::MAX as usize;

/// Returns the bits per key required to reach the false positive rate `fp`.
///
/// The result does not depend on the number of entries, the formula is
/// already per element.
///
/// # Example
///
/// ```
/// use skiparena::bloom_bits_per_key;
///
/// assert_eq!(bloom_bits_per_key(1000, 0.01), 10);
/// ```
pub fn bloom_bits_per_key(_num_entries: usize, fp: f64) -> isize {
  (-1.44 * fp.log2() + 1.0) as isize
}

/// Appends a filter encoding `keys` to `dst`.
///
/// `keys` are hashes produced by [`hash`](crate::hash).
pub fn append_filter(dst: &mut Vec<u8>, keys: &[u32], bits_per_key: isize) {
  let bits_per_key = bits_per_key.max(0) as usize;

  // 0.69 =~ ln(2), the optimal number of probes for a given bits per key.
  let k = ((bits_per_key as f64) * 0.69).round().clamp(1.0, MAX_PROBES as f64) as u8;

  let n_bits = bits_per_key
    .saturating_mul(keys.len())
    .clamp(MIN_BITS, MAX_BITS);
  let n_bytes = n_bits.div_ceil(8);

  let start = dst.len();
  dst.resize(start + n_bytes + 1, 0);

  let bits = &mut dst[start..start + n_bytes];
  for &h in keys {
    let mut h = h;
    let delta = h.rotate_right(17);
    for _ in 0..k {
      let (byte, bit) = bit_position(h, n_bytes);
      bits[byte] |= 1 << bit;
      h = h.wrapping_add(delta);
    }
  }
  dst[start + n_bytes] = k;

  #[cfg(feature = "tracing")]
  tracing::trace!(keys = keys.len(), bits = n_bytes * 8, k, "built bloom filter");
}

/// Returns the `(byte, bit)` position probed by `h` in a bit array of `len` bytes.
#[inline]
fn bit_position(h: u32, len: usize) -> (usize, usize) {
  let pos = (h as u64 % (len as u64 * 8)) as usize;
  (pos / 8, pos % 8)
}

/// An encoded set of keys.
///
/// Queries never return a false negative for a key present when the filter
/// was built. False positives are possible.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Filter {
  data: Bytes,
}

impl Filter {
  /// Builds a filter from the hashes of a table's keys.
  ///
  /// A good `bits_per_key` is `10`, which yields a false positive rate of
  /// roughly 1%.
  ///
  /// # Example
  ///
  /// ```
  /// use skiparena::{hash, Filter};
  ///
  /// let filter = Filter::new(&[hash(b"a"), hash(b"b"), hash(b"c")], 10);
  /// assert!(filter.may_contain_key(b"a"));
  /// ```
  pub fn new(keys: &[u32], bits_per_key: isize) -> Self {
    let mut data = Vec::new();
    append_filter(&mut data, keys, bits_per_key);
    Self {
      data: Bytes::from(data),
    }
  }

  /// Wraps an encoded filter read back from storage.
  ///
  /// Returns [`Error::InvalidFilter`] if `data` cannot carry the trailing
  /// probe count.
  pub fn from_bytes(data: impl Into<Bytes>) -> Result<Self> {
    let data = data.into();
    if data.is_empty() {
      return Err(Error::InvalidFilter(0));
    }
    Ok(Self { data })
  }

  /// Returns the number of probes per key.
  #[inline]
  pub fn k(&self) -> u8 {
    self.data[self.data.len() - 1]
  }

  /// Returns the number of bits in the bit array.
  #[inline]
  pub fn bits(&self) -> usize {
    (self.data.len() - 1) * 8
  }

  /// Returns `false` if the key hashed to `h` is definitely absent.
  pub fn may_contain(&self, mut h: u32) -> bool {
    let len = self.data.len() - 1;
    if len == 0 {
      return false;
    }

    let k = self.k();
    if k > MAX_PROBES {
      // Reserved for encodings this crate does not know, treat as a match.
      return true;
    }

    let bits = &self.data[..len];
    let delta = h.rotate_right(17);
    for _ in 0..k {
      let (byte, bit) = bit_position(h, len);
      if bits[byte] & (1 << bit) == 0 {
        return false;
      }
      h = h.wrapping_add(delta);
    }
    true
  }

  /// Hashes `key` and checks it against the filter.
  #[inline]
  pub fn may_contain_key(&self, key: &[u8]) -> bool {
    self.may_contain(hash(key))
  }

  /// Returns the encoded filter.
  #[inline]
  pub fn as_bytes(&self) -> &[u8] {
    &self.data
  }

  /// Consumes the filter, returning the encoded bytes.
  #[inline]
  pub fn into_bytes(self) -> Bytes {
    self.data
  }
}

impl AsRef<[u8]> for Filter {
  fn as_ref(&self) -> &[u8] {
    &self.data
  }
}

#[cfg(test)]
mod tests;
