pub(crate) mod container;
mod ops;

use core::cmp::Ordering;
use core::fmt;
use core::ops::{Deref, RangeBounds};
use std::fs::File;
use std::io;
use std::path::Path;

use memmap2::Mmap;

use self::container::{read_u32, ContainerRef, ContainerRefIter, Repr, ValuesRef, WordsRef};
use crate::bitmap::serialization::{
    align_up, header_len, COUNT_BYTES, OFFSET_MASK, REGION_ALIGN, SHAPE_ARRAY, SHAPE_BITMAP,
    SHAPE_INVERTED, SHAPE_SHIFT, VALUES_ALIGN, WORDS_ALIGN,
};
use crate::bitmap::store::BITMAP_BYTES;
use crate::bitmap::util;
use crate::bitmap::{Container, ARRAY_LIMIT, INVERT_LIMIT};
use crate::RoaringBitmap;

/// A read-only bitmap view over the frozen byte layout produced by
/// [`RoaringBitmap::freeze`].
///
/// The view is generic over its buffer holder: an owned `Vec<u8>`, a borrowed
/// slice (as handed out by [`BitmapPack`](crate::BitmapPack)), or a
/// memory-mapped file. The buffer is validated once at construction; every
/// query after that decodes containers in place, without copying payloads.
///
/// # Examples
///
/// ```rust
/// use roaring_pack::{FrozenBitmap, RoaringBitmap};
///
/// let rb: RoaringBitmap = [1u32, 65537, 131073].into_iter().collect();
/// let frozen = FrozenBitmap::from_bytes(rb.freeze()).unwrap();
///
/// assert_eq!(frozen.len(), 3);
/// assert!(frozen.contains(65537));
/// assert_eq!(frozen.iter().collect::<Vec<u32>>(), vec![1, 65537, 131073]);
/// ```
pub struct FrozenBitmap<B> {
    buf: B,
    len: u64,
}

/// Validation failure for a frozen buffer, reported once when the view is
/// constructed. `index` refers to the offending container description.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BufferError {
    /// The buffer is too short for its own header or payloads.
    Truncated,
    /// A container key does not fit in 16 bits.
    KeyOutOfRange { index: usize },
    /// Container keys are not strictly increasing.
    KeysOutOfOrder { index: usize },
    /// A shape tag is none of array, bitmap or inverted.
    UnknownShape { index: usize },
    /// A cardinality is impossible for the recorded shape.
    ShapeCardinalityMismatch { index: usize },
    /// A payload offset breaks the alignment rule of its shape.
    PayloadMisaligned { index: usize },
    /// Payload offsets are not monotonically non-decreasing.
    OffsetsNotMonotonic { index: usize },
}

impl fmt::Display for BufferError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            BufferError::Truncated => write!(f, "buffer too short for its contents"),
            BufferError::KeyOutOfRange { index } => {
                write!(f, "container {index} has a key wider than 16 bits")
            }
            BufferError::KeysOutOfOrder { index } => {
                write!(f, "container {index} breaks the ascending key order")
            }
            BufferError::UnknownShape { index } => {
                write!(f, "container {index} has an unknown shape tag")
            }
            BufferError::ShapeCardinalityMismatch { index } => {
                write!(f, "container {index} has a cardinality outside its shape thresholds")
            }
            BufferError::PayloadMisaligned { index } => {
                write!(f, "container {index} has a misaligned payload offset")
            }
            BufferError::OffsetsNotMonotonic { index } => {
                write!(f, "container {index} has an offset before its predecessor")
            }
        }
    }
}

impl std::error::Error for BufferError {}

/// The borrowed decoding core shared by every holder type.
#[derive(Clone, Copy)]
pub(crate) struct RawBitmap<'a> {
    buf: &'a [u8],
    n_keys: usize,
}

impl<'a> RawBitmap<'a> {
    /// Validates the header and payload geometry of `buf` once. Returns the
    /// raw view; payload contents are trusted afterwards.
    pub(crate) fn validate(buf: &'a [u8]) -> Result<RawBitmap<'a>, BufferError> {
        if buf.len() < COUNT_BYTES {
            return Err(BufferError::Truncated);
        }
        let n_keys = read_u32(buf, 0) as usize;
        if n_keys > u16::MAX as usize + 1 || header_len(n_keys) > buf.len() {
            return Err(BufferError::Truncated);
        }

        let raw = RawBitmap { buf, n_keys };
        let region_start = align_up(header_len(n_keys), REGION_ALIGN);
        let mut prev_key = None;
        let mut prev_offset = region_start;

        for index in 0..n_keys {
            let key = read_u32(buf, COUNT_BYTES + 4 * index);
            if key > u32::from(u16::MAX) {
                return Err(BufferError::KeyOutOfRange { index });
            }
            if prev_key.is_some_and(|prev| prev >= key) {
                return Err(BufferError::KeysOutOfOrder { index });
            }
            prev_key = Some(key);

            let card = raw.card_at(index);
            let (shape, offset) = raw.shape_and_offset_at(index);
            let (align, size) = match shape {
                SHAPE_ARRAY => {
                    if card > ARRAY_LIMIT {
                        return Err(BufferError::ShapeCardinalityMismatch { index });
                    }
                    (VALUES_ALIGN, card as usize * 2)
                }
                SHAPE_BITMAP => {
                    if card <= ARRAY_LIMIT || card >= INVERT_LIMIT {
                        return Err(BufferError::ShapeCardinalityMismatch { index });
                    }
                    (WORDS_ALIGN, BITMAP_BYTES)
                }
                SHAPE_INVERTED => {
                    // The upper bound keeps the absence-list size below from
                    // underflowing on a corrupt cardinality word.
                    if card < INVERT_LIMIT || card > 1 << 16 {
                        return Err(BufferError::ShapeCardinalityMismatch { index });
                    }
                    (VALUES_ALIGN, ((1 << 16) - card) as usize * 2)
                }
                _ => return Err(BufferError::UnknownShape { index }),
            };

            if offset < region_start || offset % align != 0 {
                return Err(BufferError::PayloadMisaligned { index });
            }
            if offset < prev_offset {
                return Err(BufferError::OffsetsNotMonotonic { index });
            }
            if buf.len() < offset + size {
                return Err(BufferError::Truncated);
            }
            prev_offset = offset;
        }

        Ok(raw)
    }

    /// Wraps an already-validated buffer, as stored inside a pack.
    pub(crate) fn new_unchecked(buf: &'a [u8]) -> RawBitmap<'a> {
        RawBitmap { buf, n_keys: read_u32(buf, 0) as usize }
    }

    pub(crate) fn n_keys(&self) -> usize {
        self.n_keys
    }

    #[inline]
    fn key_at(&self, index: usize) -> u16 {
        read_u32(self.buf, COUNT_BYTES + 4 * index) as u16
    }

    #[inline]
    fn card_at(&self, index: usize) -> u64 {
        u64::from(read_u32(self.buf, COUNT_BYTES + 4 * self.n_keys + 4 * index)) + 1
    }

    #[inline]
    fn shape_and_offset_at(&self, index: usize) -> (u32, usize) {
        let word = read_u32(self.buf, COUNT_BYTES + 8 * self.n_keys + 4 * index);
        (word >> SHAPE_SHIFT, (word & OFFSET_MASK) as usize)
    }

    pub(crate) fn container_at(&self, index: usize) -> ContainerRef<'a> {
        let key = self.key_at(index);
        let card = self.card_at(index);
        let (shape, offset) = self.shape_and_offset_at(index);
        let repr = match shape {
            SHAPE_ARRAY => {
                Repr::Array(ValuesRef::new(&self.buf[offset..offset + card as usize * 2]))
            }
            SHAPE_BITMAP => Repr::Bitmap(WordsRef::new(&self.buf[offset..offset + BITMAP_BYTES])),
            _ => {
                let absent = ((1usize << 16) - card as usize) * 2;
                Repr::Inverted(ValuesRef::new(&self.buf[offset..offset + absent]))
            }
        };
        ContainerRef { key, card, repr }
    }

    pub(crate) fn find_key(&self, key: u16) -> Option<usize> {
        let (mut lo, mut hi) = (0, self.n_keys);
        while lo < hi {
            let mid = (lo + hi) / 2;
            match self.key_at(mid).cmp(&key) {
                Ordering::Less => lo = mid + 1,
                Ordering::Greater => hi = mid,
                Ordering::Equal => return Some(mid),
            }
        }
        None
    }

    pub(crate) fn total_len(&self) -> u64 {
        (0..self.n_keys).map(|i| self.card_at(i)).sum()
    }
}

impl FrozenBitmap<Mmap> {
    /// Memory-maps the file at `path` read-only and validates it as a frozen
    /// bitmap.
    ///
    /// The mapping stays valid for the lifetime of the returned view; the
    /// file must not be truncated while it is mapped.
    pub fn open(path: impl AsRef<Path>) -> io::Result<FrozenBitmap<Mmap>> {
        let file = File::open(path)?;
        // Safety: the mapping is read-only and we document that the backing
        // file must not be truncated while the view exists.
        let buf = unsafe { Mmap::map(&file)? };
        FrozenBitmap::from_bytes(buf).map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))
    }
}

impl<B: Deref<Target = [u8]>> FrozenBitmap<B> {
    /// Validates `buf` as a frozen bitmap and wraps it.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use roaring_pack::{BufferError, FrozenBitmap, RoaringBitmap};
    ///
    /// let rb: RoaringBitmap = (0..10).collect();
    /// let frozen = FrozenBitmap::from_bytes(rb.freeze()).unwrap();
    /// assert_eq!(frozen.len(), 10);
    ///
    /// assert_eq!(FrozenBitmap::from_bytes(vec![1, 2]), Err(BufferError::Truncated));
    /// ```
    pub fn from_bytes(buf: B) -> Result<FrozenBitmap<B>, BufferError> {
        let raw = RawBitmap::validate(&buf)?;
        let len = raw.total_len();
        Ok(FrozenBitmap { buf, len })
    }

    pub(crate) fn new_unchecked(buf: B) -> FrozenBitmap<B> {
        let len = RawBitmap::new_unchecked(&buf).total_len();
        FrozenBitmap { buf, len }
    }

    pub(crate) fn raw(&self) -> RawBitmap<'_> {
        RawBitmap::new_unchecked(&self.buf)
    }

    /// The underlying frozen bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.buf
    }

    /// Returns the number of values in the bitmap.
    pub fn len(&self) -> u64 {
        self.len
    }

    /// Returns `true` if there are no values in the bitmap.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Returns `true` if this bitmap contains the specified integer.
    pub fn contains(&self, value: u32) -> bool {
        let (key, index) = util::split(value);
        let raw = self.raw();
        match raw.find_key(key) {
            Some(loc) => raw.container_at(loc).contains(index),
            None => false,
        }
    }

    /// Returns the number of integers that are <= value.
    pub fn rank(&self, value: u32) -> u64 {
        let (key, index) = util::split(value);
        let raw = self.raw();

        let mut rank = 0;
        for i in 0..raw.n_keys() {
            match raw.key_at(i).cmp(&key) {
                Ordering::Less => rank += raw.card_at(i),
                Ordering::Equal => return rank + raw.container_at(i).rank(index),
                Ordering::Greater => break,
            }
        }
        rank
    }

    /// Returns the `n`th integer in the bitmap or `None` if `n >= len()`.
    pub fn select(&self, n: u32) -> Option<u32> {
        let mut n = u64::from(n);
        let raw = self.raw();

        for i in 0..raw.n_keys() {
            let container = raw.container_at(i);
            if container.len() > n {
                return container.select(n as u16).map(|low| util::join(container.key, low));
            }
            n -= container.len();
        }

        None
    }

    /// Returns the minimum value in the bitmap (if it is non-empty).
    pub fn min(&self) -> Option<u32> {
        let raw = self.raw();
        (raw.n_keys() > 0).then(|| raw.container_at(0)).and_then(|container| {
            container.min().map(|low| util::join(container.key, low))
        })
    }

    /// Returns the maximum value in the bitmap (if it is non-empty).
    pub fn max(&self) -> Option<u32> {
        let raw = self.raw();
        raw.n_keys().checked_sub(1).map(|i| raw.container_at(i)).and_then(|container| {
            container.max().map(|low| util::join(container.key, low))
        })
    }

    /// Iterator over the values of the bitmap, in ascending order, decoding
    /// straight from the frozen buffer.
    pub fn iter(&self) -> Iter<'_> {
        Iter { raw: self.raw(), index: 0, front: None }
    }

    /// Copies into a mutable [`RoaringBitmap`].
    pub fn to_roaring(&self) -> RoaringBitmap {
        let raw = self.raw();
        let containers = (0..raw.n_keys())
            .map(|i| {
                let container = raw.container_at(i);
                Container { key: container.key, store: container.to_store() }
            })
            .collect();
        RoaringBitmap::from_containers(containers)
    }

    /// Copies the values inside `range` into a mutable [`RoaringBitmap`].
    ///
    /// # Examples
    ///
    /// ```rust
    /// use roaring_pack::{FrozenBitmap, RoaringBitmap};
    ///
    /// let rb = RoaringBitmap::from_range(0..100_000);
    /// let frozen = FrozenBitmap::from_bytes(rb.freeze()).unwrap();
    /// assert_eq!(frozen.clamp(99_990..200_000).len(), 10);
    /// ```
    pub fn clamp<R>(&self, range: R) -> RoaringBitmap
    where
        R: RangeBounds<u32>,
    {
        let (start, end) = match util::convert_range_to_inclusive(range) {
            Some(range) => (*range.start(), *range.end()),
            None => return RoaringBitmap::new(),
        };

        let (start_key, start_index) = util::split(start);
        let (end_key, end_index) = util::split(end);

        let raw = self.raw();
        let mut containers = Vec::new();
        for i in 0..raw.n_keys() {
            let key = raw.key_at(i);
            if key < start_key {
                continue;
            }
            if key > end_key {
                break;
            }
            let a = if key == start_key { start_index } else { 0 };
            let b = if key == end_key { end_index } else { u16::MAX };
            let mut container = Container { key, store: raw.container_at(i).to_store() };
            if b < u16::MAX {
                container.remove_range(b + 1..=u16::MAX);
            }
            if a > 0 {
                container.remove_range(0..=a - 1);
            }
            if !container.is_empty() {
                containers.push(container);
            }
        }

        RoaringBitmap::from_containers(containers)
    }
}

impl<B: Deref<Target = [u8]>> fmt::Debug for FrozenBitmap<B> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        if self.len() < 16 {
            write!(f, "FrozenBitmap<{:?}>", self.iter().collect::<Vec<u32>>())
        } else {
            write!(
                f,
                "FrozenBitmap<{:?} values between {:?} and {:?}>",
                self.len(),
                self.min().unwrap(),
                self.max().unwrap()
            )
        }
    }
}

/// An iterator over a [`FrozenBitmap`], yielding values in ascending order.
pub struct Iter<'a> {
    raw: RawBitmap<'a>,
    index: usize,
    front: Option<(u16, ContainerRefIter<'a>)>,
}

impl Iterator for Iter<'_> {
    type Item = u32;

    fn next(&mut self) -> Option<u32> {
        loop {
            if let Some((key, inner)) = &mut self.front {
                if let Some(low) = inner.next() {
                    return Some(util::join(*key, low));
                }
                self.front = None;
            }
            if self.index >= self.raw.n_keys() {
                return None;
            }
            let container = self.raw.container_at(self.index);
            self.index += 1;
            self.front = Some((container.key, container.iter()));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frozen(rb: &RoaringBitmap) -> FrozenBitmap<Vec<u8>> {
        FrozenBitmap::from_bytes(rb.freeze()).unwrap()
    }

    #[test]
    fn test_reads_match_the_mutable_bitmap() {
        let mut rb = RoaringBitmap::new();
        rb.insert_range(0..70_000); // inverted + bitmap shapes
        rb.extend([100_000u32, 100_007, u32::MAX]);

        let view = frozen(&rb);
        assert_eq!(view.len(), rb.len());
        assert_eq!(view.min(), rb.min());
        assert_eq!(view.max(), rb.max());
        for value in [0u32, 69_999, 70_000, 100_000, 100_001, u32::MAX] {
            assert_eq!(view.contains(value), rb.contains(value));
            assert_eq!(view.rank(value), rb.rank(value));
        }
        for n in [0u32, 4_096, 65_535, 69_999, 70_002] {
            assert_eq!(view.select(n), rb.select(n));
        }
        assert!(view.iter().eq(rb.iter()));
        assert_eq!(view.to_roaring(), rb);
    }

    #[test]
    fn test_empty_bitmap_views() {
        let view = frozen(&RoaringBitmap::new());
        assert!(view.is_empty());
        assert_eq!(view.len(), 0);
        assert_eq!(view.min(), None);
        assert_eq!(view.max(), None);
        assert_eq!(view.select(0), None);
        assert_eq!(view.iter().count(), 0);
    }

    #[test]
    fn test_validation_rejects_corrupt_headers() {
        assert_eq!(FrozenBitmap::from_bytes(vec![1u8]), Err(BufferError::Truncated));

        let rb: RoaringBitmap = (0..10).collect();
        let bytes = rb.freeze();

        // Pretend there are more containers than the buffer holds.
        let mut corrupt = bytes.clone();
        corrupt[0..4].copy_from_slice(&u32::MAX.to_le_bytes());
        assert_eq!(FrozenBitmap::from_bytes(corrupt), Err(BufferError::Truncated));

        // An out-of-range key.
        let mut corrupt = bytes.clone();
        corrupt[4..8].copy_from_slice(&0x0001_0000u32.to_le_bytes());
        assert_eq!(
            FrozenBitmap::from_bytes(corrupt),
            Err(BufferError::KeyOutOfRange { index: 0 })
        );

        // A shape tag of 3.
        let mut corrupt = bytes.clone();
        let word = read_u32(&bytes, 12) | (3 << SHAPE_SHIFT);
        corrupt[12..16].copy_from_slice(&word.to_le_bytes());
        assert_eq!(
            FrozenBitmap::from_bytes(corrupt),
            Err(BufferError::UnknownShape { index: 0 })
        );

        // A misaligned payload offset.
        let mut corrupt = bytes.clone();
        let word = read_u32(&bytes, 12) + 1;
        corrupt[12..16].copy_from_slice(&word.to_le_bytes());
        assert_eq!(
            FrozenBitmap::from_bytes(corrupt),
            Err(BufferError::PayloadMisaligned { index: 0 })
        );

        // An inverted cardinality beyond the 16-bit domain.
        let full = RoaringBitmap::from_range(0..65_536);
        let mut corrupt = full.freeze();
        corrupt[8..12].copy_from_slice(&u32::MAX.to_le_bytes());
        assert_eq!(
            FrozenBitmap::from_bytes(corrupt),
            Err(BufferError::ShapeCardinalityMismatch { index: 0 })
        );
    }

    #[test]
    fn test_key_order_is_validated() {
        let a: RoaringBitmap = [1u32, 0x0001_0001, 0x0002_0001].into_iter().collect();
        let mut bytes = a.freeze();
        // Swap the first two keys.
        let (k0, k1) = (read_u32(&bytes, 4), read_u32(&bytes, 8));
        bytes[4..8].copy_from_slice(&k1.to_le_bytes());
        bytes[8..12].copy_from_slice(&k0.to_le_bytes());
        assert_eq!(
            FrozenBitmap::from_bytes(bytes),
            Err(BufferError::KeysOutOfOrder { index: 1 })
        );
    }
}
