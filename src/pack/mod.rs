use core::fmt;
use core::ops::{BitAndAssign, Deref, RangeBounds};
use std::fs::File;
use std::io::{self, Write};
use std::path::Path;

use memmap2::Mmap;

use crate::bitmap::serialization::{align_up, REGION_ALIGN};
use crate::bitmap::util;
use crate::frozen::container::read_u32;
use crate::frozen::RawBitmap;
use crate::{BufferError, FrozenBitmap, RoaringBitmap};

const COUNT_BYTES: usize = 4;

/// An ordered sequence of frozen bitmaps packed back-to-back into one
/// contiguous buffer: a `u32` count, per-entry offsets and sizes, then the
/// 32-byte aligned frozen payloads. A size of zero marks an absent entry
/// (empty bitmaps are stored that way).
///
/// The buffer can live in memory or be a read-only file mapping, so a pack
/// built once can be shared by many readers without copies.
///
/// # Examples
///
/// ```rust
/// use roaring_pack::{BitmapPack, RoaringBitmap};
///
/// let bitmaps: Vec<RoaringBitmap> = vec![
///     [0u32, 1, 2].into_iter().collect(),
///     [1u32, 6, 8].into_iter().collect(),
///     [1u32, 7, 2].into_iter().collect(),
/// ];
/// let pack = BitmapPack::build(&bitmaps);
///
/// assert_eq!(pack.len(), 3);
/// assert_eq!(pack.get(1).unwrap().to_roaring(), bitmaps[1]);
///
/// let common = pack.intersection(&[0, 1, 2], ..).unwrap();
/// assert_eq!(common.iter().collect::<Vec<u32>>(), vec![1]);
/// ```
pub struct BitmapPack<B> {
    buf: B,
}

impl BitmapPack<Vec<u8>> {
    /// Packs the given bitmaps into one buffer. Empty bitmaps become absent
    /// entries (`get` returns `None` for them).
    pub fn build(bitmaps: &[RoaringBitmap]) -> BitmapPack<Vec<u8>> {
        let n = bitmaps.len();
        let region_start = align_up(COUNT_BYTES + 8 * n, REGION_ALIGN);

        let mut offsets = Vec::with_capacity(n);
        let mut sizes = Vec::with_capacity(n);
        let mut cursor = region_start;
        for bitmap in bitmaps {
            offsets.push(cursor as u32);
            if bitmap.is_empty() {
                sizes.push(0u32);
            } else {
                let size = bitmap.serialized_size();
                sizes.push(size as u32);
                cursor = align_up(cursor + size, REGION_ALIGN);
            }
        }

        let mut bytes = Vec::with_capacity(cursor);
        bytes.extend_from_slice(&(n as u32).to_le_bytes());
        for offset in &offsets {
            bytes.extend_from_slice(&offset.to_le_bytes());
        }
        for size in &sizes {
            bytes.extend_from_slice(&size.to_le_bytes());
        }
        bytes.resize(region_start, 0);

        for (bitmap, (&offset, &size)) in bitmaps.iter().zip(offsets.iter().zip(&sizes)) {
            if size == 0 {
                continue;
            }
            bytes.resize(offset as usize, 0);
            bitmap.freeze_into(&mut bytes).expect("writing to a vec cannot fail");
        }

        BitmapPack { buf: bytes }
    }
}

impl BitmapPack<Mmap> {
    /// Memory-maps the file at `path` read-only and validates it as a pack.
    ///
    /// The mapping stays valid for the lifetime of the returned pack; the
    /// file must not be truncated while it is mapped.
    pub fn open(path: impl AsRef<Path>) -> io::Result<BitmapPack<Mmap>> {
        let file = File::open(path)?;
        // Safety: the mapping is read-only and we document that the backing
        // file must not be truncated while the pack exists.
        let buf = unsafe { Mmap::map(&file)? };
        BitmapPack::from_bytes(buf).map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))
    }

    /// Packs the given bitmaps, writes the buffer to `path` (truncating any
    /// existing file), flushes it, and reopens the file as a read-only
    /// mapping.
    pub fn write_to_path(
        path: impl AsRef<Path>,
        bitmaps: &[RoaringBitmap],
    ) -> io::Result<BitmapPack<Mmap>> {
        let pack = BitmapPack::build(bitmaps);
        let mut file = File::create(&path)?;
        file.write_all(pack.as_bytes())?;
        file.sync_all()?;
        drop(file);
        BitmapPack::open(path)
    }
}

impl<B: Deref<Target = [u8]>> BitmapPack<B> {
    /// Validates `buf` as a pack, including every contained frozen bitmap,
    /// and wraps it. Entries are trusted after this single pass.
    pub fn from_bytes(buf: B) -> Result<BitmapPack<B>, BufferError> {
        if buf.len() < COUNT_BYTES {
            return Err(BufferError::Truncated);
        }
        let n = read_u32(&buf, 0) as usize;
        if (buf.len() as u64) < COUNT_BYTES as u64 + 8 * n as u64 {
            return Err(BufferError::Truncated);
        }
        let region_start = align_up(COUNT_BYTES + 8 * n, REGION_ALIGN);

        let mut prev_offset = region_start;
        for index in 0..n {
            let offset = read_u32(&buf, COUNT_BYTES + 4 * index) as usize;
            let size = read_u32(&buf, COUNT_BYTES + 4 * n + 4 * index) as usize;
            if offset < region_start || offset % REGION_ALIGN != 0 {
                return Err(BufferError::PayloadMisaligned { index });
            }
            if offset < prev_offset {
                return Err(BufferError::OffsetsNotMonotonic { index });
            }
            prev_offset = offset;
            // An absent entry carries no payload; its offset may point at the
            // end of the buffer.
            if size > 0 {
                if (buf.len() as u64) < offset as u64 + size as u64 {
                    return Err(BufferError::Truncated);
                }
                RawBitmap::validate(&buf[offset..offset + size])?;
            }
        }

        Ok(BitmapPack { buf })
    }

    /// The underlying packed bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.buf
    }

    /// The number of entries in the pack, absent ones included.
    pub fn len(&self) -> usize {
        read_u32(&self.buf, 0) as usize
    }

    /// Returns `true` when the pack has no entries.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    #[inline]
    fn offset_at(&self, index: usize) -> usize {
        read_u32(&self.buf, COUNT_BYTES + 4 * index) as usize
    }

    #[inline]
    fn size_at(&self, index: usize) -> usize {
        read_u32(&self.buf, COUNT_BYTES + 4 * self.len() + 4 * index) as usize
    }

    /// The end of the last payload: the number of buffer bytes in use.
    pub fn buf_size(&self) -> usize {
        match self.len().checked_sub(1) {
            Some(last) => self.offset_at(last) + self.size_at(last),
            None => align_up(COUNT_BYTES, REGION_ALIGN),
        }
    }

    /// A read-only view of the bitmap at `index`, or `None` when the index
    /// is out of range or the entry is absent.
    pub fn get(&self, index: usize) -> Option<FrozenBitmap<&[u8]>> {
        if index >= self.len() || self.size_at(index) == 0 {
            return None;
        }
        Some(self.entry(index))
    }

    /// The view of a known-present entry.
    fn entry(&self, index: usize) -> FrozenBitmap<&[u8]> {
        let (offset, size) = (self.offset_at(index), self.size_at(index));
        FrozenBitmap::new_unchecked(&self.buf[offset..offset + size])
    }

    /// Intersects the entries at `indexes`, optionally restricted to
    /// `range`, and returns the result as a mutable bitmap.
    ///
    /// Entries are folded smallest-first so intermediate results stay small,
    /// and the fold stops as soon as the accumulator empties. Returns `None`
    /// when `indexes` is empty, any index is out of range `0..len()`, any
    /// entry is absent, or the intersection is empty.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use roaring_pack::{BitmapPack, RoaringBitmap};
    ///
    /// let bitmaps: Vec<RoaringBitmap> = vec![
    ///     (0..100).collect(),
    ///     (50..150).collect(),
    /// ];
    /// let pack = BitmapPack::build(&bitmaps);
    ///
    /// let both = pack.intersection(&[0, 1], ..).unwrap();
    /// assert_eq!(both, (50..100).collect::<RoaringBitmap>());
    ///
    /// assert_eq!(pack.intersection(&[0, 1], 0..10), None);
    /// assert_eq!(pack.intersection(&[0, 2], ..), None);
    /// ```
    pub fn intersection<R>(&self, indexes: &[usize], range: R) -> Option<RoaringBitmap>
    where
        R: RangeBounds<u32>,
    {
        let range = util::convert_range_to_inclusive(range)?;

        let mut entries = Vec::with_capacity(indexes.len());
        for &index in indexes {
            if index >= self.len() {
                return None;
            }
            let size = self.size_at(index);
            if size == 0 {
                return None;
            }
            entries.push((size, index));
        }

        // Smallest entry first minimizes the intermediate results.
        entries.sort_unstable();
        let &(_, first) = entries.first()?;

        let mut accumulator = self.entry(first).clamp(range);
        for &(_, index) in &entries[1..] {
            if accumulator.is_empty() {
                break;
            }
            BitAndAssign::bitand_assign(&mut accumulator, &self.entry(index));
        }

        if accumulator.is_empty() {
            None
        } else {
            Some(accumulator)
        }
    }

    /// Pairwise Jaccard distances between the entries at `left[i]` and
    /// `right[i]`, computed on the frozen views without materializing
    /// anything. A pair involving an out-of-range index or an absent entry
    /// has distance `1.0`.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use roaring_pack::{BitmapPack, RoaringBitmap};
    ///
    /// let bitmaps: Vec<RoaringBitmap> = vec![
    ///     [0u32, 6, 8].into_iter().collect(),
    ///     [1u32, 7, 6].into_iter().collect(),
    /// ];
    /// let pack = BitmapPack::build(&bitmaps);
    ///
    /// let distances = pack.jaccard_dist(&[0, 0], &[1, 0]);
    /// assert_eq!(distances, vec![1.0 - 1.0 / 5.0, 0.0]);
    /// ```
    pub fn jaccard_dist(&self, left: &[usize], right: &[usize]) -> Vec<f64> {
        left.iter()
            .zip(right)
            .map(|(&a, &b)| match (self.get(a), self.get(b)) {
                (Some(a), Some(b)) => a.jaccard(&b),
                _ => 1.0,
            })
            .collect()
    }
}

impl<B: Deref<Target = [u8]>> fmt::Debug for BitmapPack<B> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "BitmapPack<{} entries in {} bytes>", self.len(), self.buf.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_pack() -> (Vec<RoaringBitmap>, BitmapPack<Vec<u8>>) {
        let bitmaps: Vec<RoaringBitmap> = vec![
            [0u32, 1, 2].into_iter().collect(),
            [1u32, 6, 8].into_iter().collect(),
            RoaringBitmap::new(),
            (0..70_000).collect(),
        ];
        let pack = BitmapPack::build(&bitmaps);
        (bitmaps, pack)
    }

    #[test]
    fn test_get_round_trips_entries() {
        let (bitmaps, pack) = sample_pack();
        assert_eq!(pack.len(), 4);
        assert_eq!(pack.get(0).unwrap().to_roaring(), bitmaps[0]);
        assert_eq!(pack.get(1).unwrap().to_roaring(), bitmaps[1]);
        assert!(pack.get(2).is_none(), "empty entries are absent");
        assert_eq!(pack.get(3).unwrap().to_roaring(), bitmaps[3]);
        assert!(pack.get(4).is_none());
    }

    #[test]
    fn test_layout_is_aligned_and_validates() {
        let (_, pack) = sample_pack();
        for index in 0..pack.len() {
            assert_eq!(pack.offset_at(index) % REGION_ALIGN, 0);
        }
        assert_eq!(pack.buf_size(), pack.as_bytes().len());

        let reopened = BitmapPack::from_bytes(pack.as_bytes().to_vec()).unwrap();
        assert_eq!(reopened.len(), pack.len());
        assert_eq!(reopened.get(1).unwrap(), pack.get(1).unwrap());
    }

    #[test]
    fn test_intersection_bounds_are_strict() {
        let (_, pack) = sample_pack();
        // The entry count itself is not a valid index.
        assert!(pack.intersection(&[pack.len()], ..).is_none());
        assert!(pack.intersection(&[0, pack.len()], ..).is_none());
        // Absent entries poison the whole query.
        assert!(pack.intersection(&[0, 2], ..).is_none());
        // No indexes, no result.
        assert!(pack.intersection(&[], ..).is_none());
    }

    #[test]
    fn test_intersection_matches_fold() {
        let (bitmaps, pack) = sample_pack();
        let want = &(&bitmaps[0] & &bitmaps[1]) & &bitmaps[3];
        assert_eq!(pack.intersection(&[0, 1, 3], ..).unwrap(), want);
        assert_eq!(pack.intersection(&[3, 1, 0], ..).unwrap(), want);

        // A single index returns the (clamped) entry itself.
        assert_eq!(pack.intersection(&[3], ..).unwrap(), bitmaps[3]);
        assert_eq!(pack.intersection(&[3], 100..200).unwrap(), bitmaps[3].clamp(100..200));

        // Disjoint ranges empty the accumulator.
        assert!(pack.intersection(&[0, 1], 100..200).is_none());
    }

    #[test]
    fn test_trailing_absent_entry_revalidates() {
        let bitmaps = vec![(0..10).collect::<RoaringBitmap>(), RoaringBitmap::new()];
        let pack = BitmapPack::build(&bitmaps);
        let reopened = BitmapPack::from_bytes(pack.as_bytes().to_vec()).unwrap();
        assert!(reopened.get(0).is_some());
        assert!(reopened.get(1).is_none());
    }

    #[test]
    fn test_empty_pack() {
        let pack = BitmapPack::build(&[]);
        assert!(pack.is_empty());
        assert_eq!(pack.buf_size(), REGION_ALIGN);
        assert!(pack.get(0).is_none());
        assert!(pack.intersection(&[0], ..).is_none());
    }
}
