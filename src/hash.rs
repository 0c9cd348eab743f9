const SEED: u32 = 0xbc9f1d34;
const M: u32 = 0xc6a4a793;

/// Hashes `b` with a Murmur-like 32-bit hash.
///
/// The output is persisted inside Bloom filters, so it must never change.
///
/// # Example
///
/// ```
/// use skiparena::hash;
///
/// assert_eq!(hash(b""), 0xbc9f1d34);
/// assert_eq!(hash(b"hello"), hash(b"hello"));
/// ```
pub fn hash(b: &[u8]) -> u32 {
  let mut h = SEED ^ (b.len() as u32).wrapping_mul(M);

  let mut chunks = b.chunks_exact(4);
  for chunk in &mut chunks {
    h = h.wrapping_add(u32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]));
    h = h.wrapping_mul(M);
    h ^= h >> 16;
  }

  let rest = chunks.remainder();
  if rest.len() == 3 {
    h = h.wrapping_add((rest[2] as u32) << 16);
  }
  if rest.len() >= 2 {
    h = h.wrapping_add((rest[1] as u32) << 8);
  }
  if !rest.is_empty() {
    h = h.wrapping_add(rest[0] as u32);
    h = h.wrapping_mul(M);
    h ^= h >> 24;
  }
  h
}
