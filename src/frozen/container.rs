use core::cmp::Ordering;

use crate::bitmap::store::{
    select_word, ArrayStore, BitmapStore, InvertedStore, Store, BITMAP_LENGTH,
};

#[inline]
pub(crate) fn read_u16(buf: &[u8], pos: usize) -> u16 {
    u16::from_le_bytes(buf[pos..pos + 2].try_into().unwrap())
}

#[inline]
pub(crate) fn read_u32(buf: &[u8], pos: usize) -> u32 {
    u32::from_le_bytes(buf[pos..pos + 4].try_into().unwrap())
}

#[inline]
pub(crate) fn read_u64(buf: &[u8], pos: usize) -> u64 {
    u64::from_le_bytes(buf[pos..pos + 8].try_into().unwrap())
}

/// A sorted run of little-endian `u16` values inside a frozen payload,
/// either the members of an array container or the absence list of an
/// inverted one.
#[derive(Clone, Copy)]
pub(crate) struct ValuesRef<'a> {
    bytes: &'a [u8],
}

impl<'a> ValuesRef<'a> {
    pub fn new(bytes: &'a [u8]) -> ValuesRef<'a> {
        debug_assert!(bytes.len() % 2 == 0);
        ValuesRef { bytes }
    }

    pub fn len(&self) -> usize {
        self.bytes.len() / 2
    }

    #[inline]
    pub fn get(&self, index: usize) -> u16 {
        read_u16(self.bytes, index * 2)
    }

    pub fn binary_search(&self, value: u16) -> Result<usize, usize> {
        let (mut lo, mut hi) = (0, self.len());
        while lo < hi {
            let mid = (lo + hi) / 2;
            match self.get(mid).cmp(&value) {
                Ordering::Less => lo = mid + 1,
                Ordering::Greater => hi = mid,
                Ordering::Equal => return Ok(mid),
            }
        }
        Err(lo)
    }

    pub fn contains(&self, value: u16) -> bool {
        self.binary_search(value).is_ok()
    }

    /// Count of values <= `value`.
    pub fn rank(&self, value: u16) -> u64 {
        match self.binary_search(value) {
            Ok(i) => i as u64 + 1,
            Err(i) => i as u64,
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = u16> + 'a {
        let this = *self;
        (0..this.len()).map(move |i| this.get(i))
    }

    pub fn to_vec(&self) -> Vec<u16> {
        let mut values = vec![0u16; self.len()];
        bytemuck::cast_slice_mut(&mut values).copy_from_slice(self.bytes);
        values.iter_mut().for_each(|n| *n = u16::from_le(*n));
        values
    }

    pub fn intersection_len(&self, other: &ValuesRef<'_>) -> u64 {
        let (mut i, mut j) = (0, 0);
        let mut len = 0;
        while i < self.len() && j < other.len() {
            match self.get(i).cmp(&other.get(j)) {
                Ordering::Less => i += 1,
                Ordering::Greater => j += 1,
                Ordering::Equal => {
                    len += 1;
                    i += 1;
                    j += 1;
                }
            }
        }
        len
    }
}

/// The 1024 little-endian words of a frozen bitmap payload.
#[derive(Clone, Copy)]
pub(crate) struct WordsRef<'a> {
    bytes: &'a [u8],
}

impl<'a> WordsRef<'a> {
    pub fn new(bytes: &'a [u8]) -> WordsRef<'a> {
        debug_assert_eq!(bytes.len(), BITMAP_LENGTH * 8);
        WordsRef { bytes }
    }

    #[inline]
    pub fn word(&self, index: usize) -> u64 {
        read_u64(self.bytes, index * 8)
    }

    pub fn contains(&self, value: u16) -> bool {
        self.word(usize::from(value) / 64) & (1 << (value % 64)) != 0
    }

    pub fn rank(&self, value: u16) -> u64 {
        let (key, bit) = (usize::from(value) / 64, value % 64);
        let mut rank = 0;
        for i in 0..key {
            rank += self.word(i).count_ones() as u64;
        }
        rank + (self.word(key) << (63 - bit)).count_ones() as u64
    }

    pub fn select(&self, n: u16) -> Option<u16> {
        let mut n = u32::from(n);
        for key in 0..BITMAP_LENGTH {
            let word = self.word(key);
            let len = word.count_ones();
            if n < len {
                return Some((64 * key as u32 + select_word(word, n)) as u16);
            }
            n -= len;
        }
        None
    }

    pub fn min(&self) -> Option<u16> {
        (0..BITMAP_LENGTH)
            .map(|i| (i, self.word(i)))
            .find(|&(_, word)| word != 0)
            .map(|(i, word)| (i * 64 + word.trailing_zeros() as usize) as u16)
    }

    pub fn max(&self) -> Option<u16> {
        (0..BITMAP_LENGTH)
            .rev()
            .map(|i| (i, self.word(i)))
            .find(|&(_, word)| word != 0)
            .map(|(i, word)| (i * 64 + 63 - word.leading_zeros() as usize) as u16)
    }

    pub fn intersection_len(&self, other: &WordsRef<'_>) -> u64 {
        (0..BITMAP_LENGTH).map(|i| (self.word(i) & other.word(i)).count_ones() as u64).sum()
    }

    pub fn intersection_len_values(&self, values: &ValuesRef<'_>) -> u64 {
        values.iter().filter(|&v| self.contains(v)).count() as u64
    }
}

/// A borrowed view of one frozen container: its key, the header cardinality
/// and the payload interpreted per shape.
#[derive(Clone, Copy)]
pub(crate) struct ContainerRef<'a> {
    pub key: u16,
    pub card: u64,
    pub repr: Repr<'a>,
}

#[derive(Clone, Copy)]
pub(crate) enum Repr<'a> {
    Array(ValuesRef<'a>),
    Bitmap(WordsRef<'a>),
    Inverted(ValuesRef<'a>),
}

impl<'a> ContainerRef<'a> {
    pub fn len(&self) -> u64 {
        self.card
    }

    pub fn contains(&self, index: u16) -> bool {
        match &self.repr {
            Repr::Array(values) => values.contains(index),
            Repr::Bitmap(words) => words.contains(index),
            Repr::Inverted(absent) => !absent.contains(index),
        }
    }

    pub fn rank(&self, index: u16) -> u64 {
        match &self.repr {
            Repr::Array(values) => values.rank(index),
            Repr::Bitmap(words) => words.rank(index),
            Repr::Inverted(absent) => u64::from(index) + 1 - absent.rank(index),
        }
    }

    pub fn select(&self, n: u16) -> Option<u16> {
        match &self.repr {
            Repr::Array(values) => {
                (usize::from(n) < values.len()).then(|| values.get(usize::from(n)))
            }
            Repr::Bitmap(words) => words.select(n),
            Repr::Inverted(absent) => {
                let n = u32::from(n);
                if u64::from(n) >= self.card {
                    return None;
                }
                let (mut lo, mut hi) = (0usize, absent.len());
                while lo < hi {
                    let mid = (lo + hi) / 2;
                    if u32::from(absent.get(mid)) - mid as u32 <= n {
                        lo = mid + 1;
                    } else {
                        hi = mid;
                    }
                }
                Some((n + lo as u32) as u16)
            }
        }
    }

    pub fn min(&self) -> Option<u16> {
        match &self.repr {
            Repr::Array(values) => (values.len() > 0).then(|| values.get(0)),
            Repr::Bitmap(words) => words.min(),
            Repr::Inverted(absent) => {
                let mut candidate = 0u32;
                for a in absent.iter() {
                    if u32::from(a) == candidate {
                        candidate += 1;
                    } else {
                        break;
                    }
                }
                (candidate < 1 << 16).then_some(candidate as u16)
            }
        }
    }

    pub fn max(&self) -> Option<u16> {
        match &self.repr {
            Repr::Array(values) => values.len().checked_sub(1).map(|i| values.get(i)),
            Repr::Bitmap(words) => words.max(),
            Repr::Inverted(absent) => {
                let mut candidate = i32::from(u16::MAX);
                for i in (0..absent.len()).rev() {
                    if i32::from(absent.get(i)) == candidate {
                        candidate -= 1;
                    } else {
                        break;
                    }
                }
                (candidate >= 0).then_some(candidate as u16)
            }
        }
    }

    pub fn intersection_len(&self, other: &ContainerRef<'_>) -> u64 {
        use Repr::{Array, Bitmap, Inverted};
        match (&self.repr, &other.repr) {
            (Array(a), Array(b)) => a.intersection_len(b),
            (Array(values), Bitmap(words)) | (Bitmap(words), Array(values)) => {
                words.intersection_len_values(values)
            }
            (Array(values), Inverted(absent)) | (Inverted(absent), Array(values)) => {
                values.len() as u64 - values.intersection_len(absent)
            }
            (Bitmap(a), Bitmap(b)) => a.intersection_len(b),
            (Bitmap(words), Inverted(absent)) => {
                self.card - words.intersection_len_values(absent)
            }
            (Inverted(absent), Bitmap(words)) => {
                other.card - words.intersection_len_values(absent)
            }
            (Inverted(a), Inverted(b)) => {
                let absent_union = a.len() as u64 + b.len() as u64 - a.intersection_len(b);
                (1 << 16) - absent_union
            }
        }
    }

    pub fn iter(&self) -> ContainerRefIter<'a> {
        match self.repr {
            Repr::Array(values) => {
                ContainerRefIter::Array { values, index: 0 }
            }
            Repr::Bitmap(words) => {
                ContainerRefIter::Bitmap { words, key: 0, word: words.word(0) }
            }
            Repr::Inverted(absent) => {
                ContainerRefIter::Inverted { absent, front: 0, abs_front: 0 }
            }
        }
    }

    /// Materialize into an owned store. The buffer was validated at open
    /// time, so the payload invariants are trusted here.
    pub fn to_store(&self) -> Store {
        match &self.repr {
            Repr::Array(values) => Store::Array(ArrayStore::from_vec_unchecked(values.to_vec())),
            Repr::Bitmap(words) => {
                let mut bits = Box::new([0u64; BITMAP_LENGTH]);
                bytemuck::cast_slice_mut(&mut bits[..]).copy_from_slice(words.bytes);
                bits.iter_mut().for_each(|w| *w = u64::from_le(*w));
                Store::Bitmap(BitmapStore::from_unchecked(self.card, bits))
            }
            Repr::Inverted(absent) => Store::Inverted(InvertedStore::from_absent(
                ArrayStore::from_vec_unchecked(absent.to_vec()),
            )),
        }
    }
}

/// Allocation-free scan over one frozen container, in ascending order.
/// The bitmap arm steps an explicit `(word index, remaining word)` cursor.
#[derive(Clone)]
pub(crate) enum ContainerRefIter<'a> {
    Array { values: ValuesRef<'a>, index: usize },
    Bitmap { words: WordsRef<'a>, key: usize, word: u64 },
    Inverted { absent: ValuesRef<'a>, front: u32, abs_front: usize },
}

impl Iterator for ContainerRefIter<'_> {
    type Item = u16;

    fn next(&mut self) -> Option<u16> {
        match self {
            ContainerRefIter::Array { values, index } => {
                if *index < values.len() {
                    let value = values.get(*index);
                    *index += 1;
                    Some(value)
                } else {
                    None
                }
            }
            ContainerRefIter::Bitmap { words, key, word } => loop {
                if *word != 0 {
                    let index = word.trailing_zeros() as usize;
                    *word &= *word - 1;
                    return Some((64 * *key + index) as u16);
                }
                if *key + 1 >= BITMAP_LENGTH {
                    return None;
                }
                *key += 1;
                *word = words.word(*key);
            },
            ContainerRefIter::Inverted { absent, front, abs_front } => {
                while *front < 1 << 16 {
                    let value = *front as u16;
                    *front += 1;
                    if *abs_front < absent.len() && absent.get(*abs_front) == value {
                        *abs_front += 1;
                        continue;
                    }
                    return Some(value);
                }
                None
            }
        }
    }
}
