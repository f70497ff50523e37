use core::fmt;
use core::ops::{
    BitAnd, BitAndAssign, BitOr, BitOrAssign, BitXor, BitXorAssign, RangeInclusive, Sub, SubAssign,
};

use super::store::{self, InvertedStore, Store};
use super::util;

/// Largest cardinality stored as a sorted array.
pub const ARRAY_LIMIT: u64 = 4096;
/// Smallest cardinality stored as a sorted absence array.
pub const INVERT_LIMIT: u64 = (1 << 16) - ARRAY_LIMIT;

#[derive(PartialEq, Clone)]
pub(crate) struct Container {
    pub key: u16,
    pub store: Store,
}

#[derive(Clone)]
pub(crate) struct Iter<'a> {
    pub key: u16,
    inner: store::Iter<'a>,
}

impl Container {
    pub fn new(key: u16) -> Container {
        Container { key, store: Store::new() }
    }

    pub fn full(key: u16) -> Container {
        Container { key, store: Store::full() }
    }

    pub(crate) fn from_store(key: u16, store: Store) -> Container {
        let mut container = Container { key, store };
        container.ensure_correct_store();
        container
    }

    pub fn len(&self) -> u64 {
        self.store.len()
    }

    pub fn is_empty(&self) -> bool {
        self.store.is_empty()
    }

    #[inline]
    pub fn insert(&mut self, index: u16) -> bool {
        if self.store.insert(index) {
            self.ensure_correct_store();
            true
        } else {
            false
        }
    }

    pub fn insert_range(&mut self, range: RangeInclusive<u16>) -> u64 {
        let inserted = self.store.insert_range(range);
        self.ensure_correct_store();
        inserted
    }

    pub fn remove(&mut self, index: u16) -> bool {
        if self.store.remove(index) {
            self.ensure_correct_store();
            true
        } else {
            false
        }
    }

    pub fn remove_range(&mut self, range: RangeInclusive<u16>) -> u64 {
        let removed = self.store.remove_range(range);
        self.ensure_correct_store();
        removed
    }

    pub fn contains(&self, index: u16) -> bool {
        self.store.contains(index)
    }

    pub fn is_full(&self) -> bool {
        self.store.is_full()
    }

    pub fn is_disjoint(&self, other: &Self) -> bool {
        self.store.is_disjoint(&other.store)
    }

    pub fn is_subset(&self, other: &Self) -> bool {
        self.len() <= other.len() && self.store.is_subset(&other.store)
    }

    pub fn intersection_len(&self, other: &Self) -> u64 {
        self.store.intersection_len(&other.store)
    }

    pub fn min(&self) -> Option<u16> {
        self.store.min()
    }

    #[inline]
    pub fn max(&self) -> Option<u16> {
        self.store.max()
    }

    pub fn rank(&self, index: u16) -> u64 {
        self.store.rank(index)
    }

    pub fn select(&self, n: u16) -> Option<u16> {
        self.store.select(n)
    }

    /// Re-types the store when its cardinality has crossed a threshold:
    /// arrays hold at most `ARRAY_LIMIT` values, absence arrays at most
    /// `ARRAY_LIMIT` missing values, bitmaps everything in between.
    pub(crate) fn ensure_correct_store(&mut self) -> bool {
        let len = self.store.len();
        let new_store = match &self.store {
            Store::Array(vec) if len > ARRAY_LIMIT => {
                let bits = vec.to_bitmap_store();
                Some(if len >= INVERT_LIMIT {
                    Store::Inverted(InvertedStore::from_bitmap_store(&bits))
                } else {
                    Store::Bitmap(bits)
                })
            }
            Store::Bitmap(bits) if len <= ARRAY_LIMIT => Some(Store::Array(bits.to_array_store())),
            Store::Bitmap(bits) if len >= INVERT_LIMIT => {
                Some(Store::Inverted(InvertedStore::from_bitmap_store(bits)))
            }
            Store::Inverted(inv) if len < INVERT_LIMIT => {
                let bits = inv.to_bitmap_store();
                Some(if len <= ARRAY_LIMIT {
                    Store::Array(bits.to_array_store())
                } else {
                    Store::Bitmap(bits)
                })
            }
            _ => None,
        };
        if let Some(new_store) = new_store {
            self.store = new_store;
            true
        } else {
            false
        }
    }
}

impl BitOr<&Container> for &Container {
    type Output = Container;

    fn bitor(self, rhs: &Container) -> Container {
        let store = BitOr::bitor(&self.store, &rhs.store);
        Container::from_store(self.key, store)
    }
}

impl BitOrAssign<&Container> for Container {
    fn bitor_assign(&mut self, rhs: &Container) {
        BitOrAssign::bitor_assign(&mut self.store, &rhs.store);
        self.ensure_correct_store();
    }
}

impl BitAnd<&Container> for &Container {
    type Output = Container;

    fn bitand(self, rhs: &Container) -> Container {
        let store = BitAnd::bitand(&self.store, &rhs.store);
        Container::from_store(self.key, store)
    }
}

impl BitAndAssign<&Container> for Container {
    fn bitand_assign(&mut self, rhs: &Container) {
        BitAndAssign::bitand_assign(&mut self.store, &rhs.store);
        self.ensure_correct_store();
    }
}

impl Sub<&Container> for &Container {
    type Output = Container;

    fn sub(self, rhs: &Container) -> Container {
        let store = Sub::sub(&self.store, &rhs.store);
        Container::from_store(self.key, store)
    }
}

impl SubAssign<&Container> for Container {
    fn sub_assign(&mut self, rhs: &Container) {
        SubAssign::sub_assign(&mut self.store, &rhs.store);
        self.ensure_correct_store();
    }
}

impl BitXor<&Container> for &Container {
    type Output = Container;

    fn bitxor(self, rhs: &Container) -> Container {
        let store = BitXor::bitxor(&self.store, &rhs.store);
        Container::from_store(self.key, store)
    }
}

impl BitXorAssign<&Container> for Container {
    fn bitxor_assign(&mut self, rhs: &Container) {
        BitXorAssign::bitxor_assign(&mut self.store, &rhs.store);
        self.ensure_correct_store();
    }
}

impl<'a> IntoIterator for &'a Container {
    type Item = u32;
    type IntoIter = Iter<'a>;

    fn into_iter(self) -> Iter<'a> {
        let store: &Store = &self.store;
        Iter { key: self.key, inner: store.into_iter() }
    }
}

impl IntoIterator for Container {
    type Item = u32;
    type IntoIter = Iter<'static>;

    fn into_iter(self) -> Iter<'static> {
        Iter { key: self.key, inner: self.store.into_iter() }
    }
}

impl Iterator for Iter<'_> {
    type Item = u32;

    fn next(&mut self) -> Option<u32> {
        self.inner.next().map(|i| util::join(self.key, i))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

impl DoubleEndedIterator for Iter<'_> {
    fn next_back(&mut self) -> Option<Self::Item> {
        self.inner.next_back().map(|i| util::join(self.key, i))
    }
}

impl ExactSizeIterator for Iter<'_> {}

impl fmt::Debug for Container {
    fn fmt(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
        format!("Container<{:?} @ {:?}>", self.len(), self.key).fmt(formatter)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_array_to_bitmap_and_back() {
        let mut container = Container::new(0);
        for i in 0..=ARRAY_LIMIT as u16 {
            container.insert(i);
        }
        assert!(matches!(container.store, Store::Bitmap(..)));
        assert_eq!(container.len(), ARRAY_LIMIT + 1);

        container.remove(0);
        assert!(matches!(container.store, Store::Array(..)));
        assert_eq!(container.len(), ARRAY_LIMIT);
    }

    #[test]
    fn test_bitmap_to_inverted_and_back() {
        let mut container = Container::full(0);
        assert!(matches!(container.store, Store::Inverted(..)));

        // Removing up to the threshold keeps the absence array small enough.
        for i in 0..ARRAY_LIMIT as u16 {
            container.remove(i);
        }
        assert!(matches!(container.store, Store::Inverted(..)));
        assert_eq!(container.len(), INVERT_LIMIT);

        // One more removal drops below INVERT_LIMIT, back to a bitmap.
        container.remove(ARRAY_LIMIT as u16);
        assert!(matches!(container.store, Store::Bitmap(..)));
        assert_eq!(container.len(), INVERT_LIMIT - 1);

        // And re-adding promotes again.
        container.insert(0);
        assert!(matches!(container.store, Store::Inverted(..)));
    }

    #[test]
    fn test_range_crossing_both_thresholds() {
        let mut container = Container::new(0);
        container.insert_range(0..=u16::MAX);
        assert!(matches!(container.store, Store::Inverted(..)));
        assert!(container.is_full());

        assert_eq!(container.remove_range(0..=u16::MAX - 1), (1 << 16) - 1);
        assert!(matches!(container.store, Store::Array(..)));
        assert_eq!(container.len(), 1);
        assert!(container.contains(u16::MAX));
    }
}
