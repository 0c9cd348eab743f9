//! Building blocks for an LSM-Tree storage engine.
//!
//! - [`Arena`]: a growable, offset-addressed buffer that backs a lock-free
//!   skiplist memtable. Nodes, keys and values are carved out of one buffer
//!   and referenced by 32-bit offsets, so growing the buffer never
//!   invalidates them.
//! - [`Filter`]: the Bloom filter built once per immutable table from the
//!   hashes of its keys.
//! - [`hash`]: the 32-bit hash shared by filter builders and readers.
//!
//! # Example
//!
//! ```
//! use skiparena::{Arena, Value};
//!
//! let arena = Arena::new(1024);
//!
//! let node = {
//!   let mut w = arena.writer();
//!   w.new_node(b"key", &Value::from("value"), 3).unwrap()
//! };
//!
//! let guard = &skiparena::pin();
//! let element = unsafe { arena.get_element(node, guard) }.unwrap().unwrap();
//! assert_eq!(element.key().unwrap(), b"key");
//! assert_eq!(element.value::<Value>().unwrap().unwrap().value(), "value");
//! assert_eq!(element.next_offset(0), 0);
//! ```
#![cfg_attr(docsrs, feature(doc_cfg))]
#![warn(missing_docs)]
#![allow(clippy::type_complexity)]

mod arena;
pub use arena::{Arena, ArenaWriter, Element};

mod bloom;
pub use bloom::{append_filter, bloom_bits_per_key, Filter, MAX_PROBES, MIN_BITS};

mod error;
pub use error::{Error, Result};

mod hash;
pub use hash::hash;

mod node;
pub use node::{
  node_size, random_height, MAX_HEIGHT, MAX_NODE_SIZE, NODE_ALIGN, NODE_HEADER_SIZE, OFFSET_SIZE,
};

mod options;
pub use options::Options;

mod value;
pub use value::{Value, ValueCodec};

pub use bytes;
pub use crossbeam_epoch::{pin, Guard};

/// The hard ceiling on the size of an arena, 100 MiB.
///
/// Keeps every offset representable in 32 bits and bounds the memory a
/// single memtable can use.
pub const MAX_ARENA_SIZE: u32 = 100 << 20;

/// The largest number of bytes a single growth adds, 10 MiB.
///
/// Doubling is capped so that large arenas do not trigger huge reallocations.
pub const MAX_GROWTH: u32 = 10 << 20;
