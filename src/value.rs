use bytes::Bytes;

use super::{Error, Result};

/// The contract between the arena and the values it stores.
///
/// The arena never interprets value bytes itself: it asks the codec how many
/// bytes to reserve, lets it serialize straight into the reserved region, and
/// hands the same region back for decoding.
pub trait ValueCodec: Sized {
  /// Returns the number of bytes [`encode`](ValueCodec::encode) writes.
  fn encoded_size(&self) -> u32;

  /// Encodes `self` into `dst`, which is exactly `encoded_size()` bytes long.
  fn encode(&self, dst: &mut [u8]);

  /// Decodes a value from a region previously filled by `encode`.
  fn decode(src: &[u8]) -> Result<Self>;
}

/// Raw bytes, stored verbatim.
impl ValueCodec for Bytes {
  #[inline]
  fn encoded_size(&self) -> u32 {
    self.len() as u32
  }

  #[inline]
  fn encode(&self, dst: &mut [u8]) {
    dst.copy_from_slice(self);
  }

  #[inline]
  fn decode(src: &[u8]) -> Result<Self> {
    Ok(Bytes::copy_from_slice(src))
  }
}

/// The value stored in a memtable.
///
/// ```text
/// +---------+--------------+------------------------+---------+
/// | meta u8 | user_meta u8 | uvarint(expires_at)    | payload |
/// +---------+--------------+------------------------+---------+
/// ```
#[viewit::viewit(vis_all = "", setters(skip), getters(vis_all = "pub"))]
#[derive(Debug, Clone, Default, Eq, PartialEq, Hash)]
pub struct Value {
  /// Internal flags.
  #[viewit(getter(const))]
  meta: u8,
  /// Flags owned by the user.
  #[viewit(getter(const))]
  user_meta: u8,
  /// Expiry timestamp, `0` never expires.
  #[viewit(getter(const, rename = "ttl"))]
  expires_at: u64,
  /// The payload.
  #[viewit(getter(const, style = "ref"))]
  value: Bytes,
}

impl AsRef<[u8]> for Value {
  fn as_ref(&self) -> &[u8] {
    self.value.as_ref()
  }
}

impl core::ops::Deref for Value {
  type Target = [u8];

  fn deref(&self) -> &Self::Target {
    self.as_ref()
  }
}

impl Value {
  /// Returns an empty value.
  #[inline]
  pub const fn new() -> Self {
    Self::from_bytes(Bytes::new())
  }

  /// Creates a value from the given payload.
  #[inline]
  pub const fn from_bytes(val: Bytes) -> Self {
    Self {
      meta: 0,
      user_meta: 0,
      expires_at: 0,
      value: val,
    }
  }

  /// Creates a value by copying the given payload.
  #[inline]
  pub fn copy_from_slice(val: &[u8]) -> Self {
    Self::from_bytes(Bytes::copy_from_slice(val))
  }

  /// Sets the meta byte.
  #[inline]
  pub const fn with_meta(mut self, meta: u8) -> Self {
    self.meta = meta;
    self
  }

  /// Sets the user meta byte.
  #[inline]
  pub const fn with_user_meta(mut self, user_meta: u8) -> Self {
    self.user_meta = user_meta;
    self
  }

  /// Sets the expiry timestamp.
  #[inline]
  pub const fn with_ttl(mut self, expires_at: u64) -> Self {
    self.expires_at = expires_at;
    self
  }

  /// Returns the payload.
  #[inline]
  pub fn into_bytes(self) -> Bytes {
    self.value
  }
}

impl ValueCodec for Value {
  #[inline]
  fn encoded_size(&self) -> u32 {
    (2 + u64_varint_size(self.expires_at) + self.value.len()) as u32
  }

  fn encode(&self, dst: &mut [u8]) {
    dst[0] = self.meta;
    dst[1] = self.user_meta;
    let n = put_uvarint(&mut dst[2..], self.expires_at);
    dst[2 + n..2 + n + self.value.len()].copy_from_slice(&self.value);
  }

  fn decode(src: &[u8]) -> Result<Self> {
    if src.len() < 3 {
      return Err(Error::Decode("value header is truncated"));
    }

    let (expires_at, n) = uvarint(&src[2..])?;
    Ok(Self {
      meta: src[0],
      user_meta: src[1],
      expires_at,
      value: Bytes::copy_from_slice(&src[2 + n..]),
    })
  }
}

impl From<Bytes> for Value {
  #[inline]
  fn from(val: Bytes) -> Self {
    Self::from_bytes(val)
  }
}

impl From<&[u8]> for Value {
  #[inline]
  fn from(val: &[u8]) -> Self {
    Self::copy_from_slice(val)
  }
}

impl From<&str> for Value {
  #[inline]
  fn from(val: &str) -> Self {
    Self::copy_from_slice(val.as_bytes())
  }
}

impl From<String> for Value {
  #[inline]
  fn from(val: String) -> Self {
    Self::from_bytes(Bytes::from(val))
  }
}

impl From<Vec<u8>> for Value {
  #[inline]
  fn from(val: Vec<u8>) -> Self {
    Self::from_bytes(Bytes::from(val))
  }
}

/// The maximum length of a varint-encoded 64-bit integer.
const MAX_VARINT_LEN64: usize = 10;

#[inline]
const fn u64_varint_size(mut x: u64) -> usize {
  let mut n = 0;
  loop {
    n += 1;
    x >>= 7;
    if x == 0 {
      break;
    }
  }
  n
}

/// Decodes a u64 from `buf`, returning the value and the number of bytes read.
fn uvarint(buf: &[u8]) -> Result<(u64, usize)> {
  let mut x: u64 = 0;
  let mut s: u32 = 0;
  for (i, &b) in buf.iter().enumerate() {
    if i == MAX_VARINT_LEN64 {
      return Err(Error::Decode("varint overflows a 64-bit integer"));
    }
    if b < 0x80 {
      if i == MAX_VARINT_LEN64 - 1 && b > 1 {
        return Err(Error::Decode("varint overflows a 64-bit integer"));
      }
      return Ok((x | ((b as u64) << s), i + 1));
    }
    x |= ((b & 0x7f) as u64) << s;
    s += 7;
  }
  Err(Error::Decode("varint is truncated"))
}

/// Encodes a u64 into `buf` and returns the number of bytes written.
///
/// # Panic
/// The buffer is too small.
#[inline]
fn put_uvarint(buf: &mut [u8], mut x: u64) -> usize {
  let mut i = 0;
  while x >= 0x80 {
    buf[i] = (x as u8) | 0x80;
    x >>= 7;
    i += 1;
  }
  buf[i] = x as u8;
  i + 1
}

#[cfg(test)]
mod tests {
  use super::*;

  fn encode_to_vec<V: ValueCodec>(v: &V) -> Vec<u8> {
    let mut buf = vec![0; v.encoded_size() as usize];
    v.encode(&mut buf);
    buf
  }

  #[test]
  fn test_value_codec() {
    let v = Value::from("hello")
      .with_meta(1)
      .with_user_meta(2)
      .with_ttl(u64::MAX);
    let buf = encode_to_vec(&v);
    assert_eq!(buf.len(), 2 + MAX_VARINT_LEN64 + 5);

    let decoded = Value::decode(&buf).unwrap();
    assert_eq!(decoded, v);
    assert_eq!(decoded.meta(), 1);
    assert_eq!(decoded.user_meta(), 2);
    assert_eq!(decoded.ttl(), u64::MAX);
    assert_eq!(decoded.value(), "hello");
  }

  #[test]
  fn test_empty_value() {
    let v = Value::new();
    assert_eq!(v.encoded_size(), 3);
    assert_eq!(Value::decode(&encode_to_vec(&v)).unwrap(), v);
  }

  #[test]
  fn test_decode_truncated() {
    assert_eq!(
      Value::decode(&[0, 0]).unwrap_err(),
      Error::Decode("value header is truncated")
    );
    assert_eq!(
      Value::decode(&[0, 0, 0x80]).unwrap_err(),
      Error::Decode("varint is truncated")
    );
    assert!(Value::decode(&[0, 0, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0x7f]).is_err());
  }

  #[test]
  fn test_uvarint() {
    let mut buf = [0; MAX_VARINT_LEN64];
    for x in [0, 1, 127, 128, 300, 1 << 35, u64::MAX] {
      let n = put_uvarint(&mut buf, x);
      assert_eq!(n, u64_varint_size(x));
      assert_eq!(uvarint(&buf[..n]).unwrap(), (x, n));
    }
  }
}
