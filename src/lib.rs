//! Compressed bitmaps of `u32` values using the
//! [Roaring bitmap](https://roaringbitmap.org/) partitioning scheme, with two
//! additions on top of the classic mutable type:
//!
//! - [`FrozenBitmap`]: a read-only, zero-copy view over the serialized form,
//!   usable directly over a memory-mapped file.
//! - [`BitmapPack`]: an ordered sequence of frozen bitmaps packed into one
//!   contiguous buffer, with bulk intersection and Jaccard-distance queries.
//!
//! Values are split into a 16-bit key (high half) and a 16-bit index
//! (low half); each key owns a container holding the indexes. A container is
//! stored as a sorted array when sparse, a fixed 8 KiB bitmap in the middle
//! range, and a sorted array of *absent* values when nearly full.
//!
//! # Examples
//!
//! ```rust
//! use roaring_pack::RoaringBitmap;
//!
//! let mut rb = RoaringBitmap::new();
//! rb.insert(2);
//! rb.insert(3);
//! rb.insert(5);
//! assert_eq!(rb.len(), 3);
//!
//! let frozen = roaring_pack::FrozenBitmap::from_bytes(rb.freeze()).unwrap();
//! assert!(frozen.contains(5));
//! assert_eq!(frozen.to_roaring(), rb);
//! ```

pub mod bitmap;
pub mod frozen;
pub mod pack;

pub use crate::bitmap::RoaringBitmap;
pub use crate::frozen::{BufferError, FrozenBitmap};
pub use crate::pack::BitmapPack;
