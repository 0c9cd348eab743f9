//! The layout of a skiplist node inside the arena.
//!
//! ```text
//! +----------------------+------------+----------+--------+------------------------+
//! | 64-bit value pointer | key offset | key size | height | tower[height] (u32 ea) |
//! +----------------------+------------+----------+--------+------------------------+
//! ```
//!
//! A node only occupies as much of its tower as its height requires; the
//! unused trailing slots are never allocated.

use core::mem;
use core::sync::atomic::{AtomicU16, AtomicU32, AtomicU64};

/// The maximum height of a skiplist tower.
pub const MAX_HEIGHT: usize = 48;

/// The width of an arena offset.
pub const OFFSET_SIZE: usize = mem::size_of::<u32>();

/// Nodes are aligned so that the 64-bit value pointer can be accessed atomically.
pub const NODE_ALIGN: usize = mem::align_of::<u64>();

/// The size of the fixed part of a node, before the tower.
pub const NODE_HEADER_SIZE: usize = mem::offset_of!(Node, tower);

/// The size of a node with a full height tower.
pub const MAX_NODE_SIZE: usize = NODE_HEADER_SIZE + MAX_HEIGHT * OFFSET_SIZE;

const _: () = assert!(mem::size_of::<Node>() == MAX_NODE_SIZE);
const _: () = assert!(MAX_NODE_SIZE % NODE_ALIGN == 0);

#[derive(Debug)]
#[repr(C)]
pub(crate) struct Node {
  // Multiple parts of the value are encoded as a single u64 so that it
  // can be atomically loaded and stored:
  //   value offset: u32 (bits 0-31)
  //   value size  : u32 (bits 32-63)
  pub(crate) value: AtomicU64,
  // Immutable once the node is linked.
  pub(crate) key_offset: AtomicU32,
  pub(crate) key_size: AtomicU16,
  pub(crate) height: AtomicU16,
  pub(crate) tower: [AtomicU32; MAX_HEIGHT],
}

/// Returns the number of bytes a node of the given height occupies.
///
/// # Panics
/// - `height` is greater than [`MAX_HEIGHT`].
///
/// # Example
///
/// ```
/// use skiparena::{node_size, MAX_HEIGHT, MAX_NODE_SIZE, OFFSET_SIZE};
///
/// assert_eq!(node_size(MAX_HEIGHT), MAX_NODE_SIZE);
/// assert_eq!(node_size(1), MAX_NODE_SIZE - OFFSET_SIZE * (MAX_HEIGHT - 1));
/// ```
#[inline]
pub const fn node_size(height: usize) -> usize {
  assert!(height <= MAX_HEIGHT, "node height exceeds MAX_HEIGHT");
  MAX_NODE_SIZE - OFFSET_SIZE * (MAX_HEIGHT - height)
}

#[inline]
pub(crate) const fn encode_value(offset: u32, size: u32) -> u64 {
  (size as u64) << 32 | offset as u64
}

/// (offset, size)
#[inline]
pub(crate) const fn decode_value(value: u64) -> (u32, u32) {
  (value as u32, (value >> 32) as u32)
}

/// Precompute the skiplist probabilities so that only a single random number
/// needs to be generated and so that the optimal pvalue can be used (inverse
/// of Euler's number).
const PROBABILITIES: [u32; MAX_HEIGHT] = {
  const P: f64 = 1.0 / core::f64::consts::E;

  let mut probabilities = [0; MAX_HEIGHT];
  let mut p = 1f64;

  let mut i = 0;
  while i < MAX_HEIGHT {
    probabilities[i] = ((u32::MAX as f64) * p) as u32;
    p *= P;
    i += 1;
  }

  probabilities
};

/// Returns a random tower height in `[1, MAX_HEIGHT]`.
pub fn random_height() -> usize {
  let rnd: u32 = rand::random();
  let mut h = 1;

  while h < MAX_HEIGHT && rnd <= PROBABILITIES[h] {
    h += 1;
  }
  h
}
