mod array_store;
mod bitmap_store;
mod inverted_store;

use core::mem;
use core::ops::{
    BitAnd, BitAndAssign, BitOr, BitOrAssign, BitXor, BitXorAssign, RangeInclusive, Sub, SubAssign,
};
use core::slice;

use self::Store::{Array, Bitmap, Inverted};

pub(crate) use self::array_store::ArrayStore;
pub(crate) use self::bitmap_store::{
    select_word, BitmapIter, BitmapStore, BITMAP_BYTES, BITMAP_LENGTH,
};
pub(crate) use self::inverted_store::{InvertedIter, InvertedStore};

#[derive(Clone)]
pub(crate) enum Store {
    Array(ArrayStore),
    Bitmap(BitmapStore),
    Inverted(InvertedStore),
}

#[derive(Clone)]
pub(crate) enum Iter<'a> {
    Array(slice::Iter<'a, u16>),
    Vec(std::vec::IntoIter<u16>),
    BitmapBorrowed(BitmapIter<&'a [u64; BITMAP_LENGTH]>),
    BitmapOwned(BitmapIter<Box<[u64; BITMAP_LENGTH]>>),
    InvertedBorrowed(InvertedIter<&'a [u16]>),
    InvertedOwned(InvertedIter<Vec<u16>>),
}

impl Store {
    pub fn new() -> Store {
        Store::Array(ArrayStore::new())
    }

    pub fn full() -> Store {
        Store::Inverted(InvertedStore::full())
    }

    #[inline]
    pub fn insert(&mut self, index: u16) -> bool {
        match self {
            Array(vec) => vec.insert(index),
            Bitmap(bits) => bits.insert(index),
            Inverted(inv) => inv.insert(index),
        }
    }

    pub fn insert_range(&mut self, range: RangeInclusive<u16>) -> u64 {
        match self {
            Array(vec) => vec.insert_range(range),
            Bitmap(bits) => bits.insert_range(range),
            Inverted(inv) => inv.insert_range(range),
        }
    }

    pub fn remove(&mut self, index: u16) -> bool {
        match self {
            Array(vec) => vec.remove(index),
            Bitmap(bits) => bits.remove(index),
            Inverted(inv) => inv.remove(index),
        }
    }

    pub fn remove_range(&mut self, range: RangeInclusive<u16>) -> u64 {
        match self {
            Array(vec) => vec.remove_range(range),
            Bitmap(bits) => bits.remove_range(range),
            Inverted(inv) => inv.remove_range(range),
        }
    }

    pub fn contains(&self, index: u16) -> bool {
        match self {
            Array(vec) => vec.contains(index),
            Bitmap(bits) => bits.contains(index),
            Inverted(inv) => inv.contains(index),
        }
    }

    pub fn is_full(&self) -> bool {
        self.len() == (1 << 16)
    }

    /// The subset and disjointness tests below lean on the shape thresholds:
    /// a bitmap store always holds more values than an array store can, and
    /// an inverted store more than either, so the size-impossible shape pairs
    /// answer without looking at payloads.
    pub fn is_disjoint(&self, other: &Self) -> bool {
        match (self, other) {
            (Array(vec1), Array(vec2)) => vec1.is_disjoint(vec2),
            (Array(vec), Bitmap(bits)) | (Bitmap(bits), Array(vec)) => {
                vec.iter().all(|&i| !bits.contains(i))
            }
            (Array(vec), Inverted(inv)) | (Inverted(inv), Array(vec)) => {
                vec.is_subset(inv.absent())
            }
            (Bitmap(bits1), Bitmap(bits2)) => bits1.is_disjoint(bits2),
            // Two sets that each cover more than half the domain overlap.
            (Bitmap(..) | Inverted(..), Inverted(..)) | (Inverted(..), Bitmap(..)) => false,
        }
    }

    pub fn is_subset(&self, other: &Self) -> bool {
        match (self, other) {
            (Array(vec1), Array(vec2)) => vec1.is_subset(vec2),
            (Array(vec), Bitmap(bits)) => vec.iter().all(|&i| bits.contains(i)),
            (Array(vec), Inverted(inv)) => vec.is_disjoint(inv.absent()),
            (Bitmap(bits1), Bitmap(bits2)) => bits1.is_subset(bits2),
            (Bitmap(bits), Inverted(inv)) => inv.absent().iter().all(|&i| !bits.contains(i)),
            (Inverted(inv1), Inverted(inv2)) => inv2.absent().is_subset(inv1.absent()),
            // A store may never fit inside a smaller shape.
            (Bitmap(..), Array(..)) | (Inverted(..), Array(..) | Bitmap(..)) => false,
        }
    }

    pub fn intersection_len(&self, other: &Self) -> u64 {
        match (self, other) {
            (Array(vec1), Array(vec2)) => vec1.intersection_len(vec2),
            (Array(vec), Bitmap(bits)) | (Bitmap(bits), Array(vec)) => {
                bits.intersection_len_array(vec)
            }
            (Array(vec), Inverted(inv)) | (Inverted(inv), Array(vec)) => {
                vec.len() - vec.intersection_len(inv.absent())
            }
            (Bitmap(bits1), Bitmap(bits2)) => bits1.intersection_len_bitmap(bits2),
            (Bitmap(bits), Inverted(inv)) | (Inverted(inv), Bitmap(bits)) => {
                bits.len() - bits.intersection_len_array(inv.absent())
            }
            (Inverted(inv1), Inverted(inv2)) => {
                let (a1, a2) = (inv1.absent(), inv2.absent());
                let absent_union = a1.len() + a2.len() - a1.intersection_len(a2);
                (1 << 16) - absent_union
            }
        }
    }

    pub fn len(&self) -> u64 {
        match self {
            Array(vec) => vec.len(),
            Bitmap(bits) => bits.len(),
            Inverted(inv) => inv.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        match self {
            Array(vec) => vec.is_empty(),
            Bitmap(bits) => bits.is_empty(),
            Inverted(..) => false,
        }
    }

    pub fn min(&self) -> Option<u16> {
        match self {
            Array(vec) => vec.min(),
            Bitmap(bits) => bits.min(),
            Inverted(inv) => inv.min(),
        }
    }

    #[inline]
    pub fn max(&self) -> Option<u16> {
        match self {
            Array(vec) => vec.max(),
            Bitmap(bits) => bits.max(),
            Inverted(inv) => inv.max(),
        }
    }

    pub fn rank(&self, index: u16) -> u64 {
        match self {
            Array(vec) => vec.rank(index),
            Bitmap(bits) => bits.rank(index),
            Inverted(inv) => inv.rank(index),
        }
    }

    pub fn select(&self, n: u16) -> Option<u16> {
        match self {
            Array(vec) => vec.select(n),
            Bitmap(bits) => bits.select(n),
            Inverted(inv) => inv.select(n),
        }
    }
}

impl Default for Store {
    fn default() -> Self {
        Store::new()
    }
}

impl BitOr<&Store> for &Store {
    type Output = Store;

    fn bitor(self, rhs: &Store) -> Store {
        match (self, rhs) {
            (Array(vec1), Array(vec2)) => Array(BitOr::bitor(vec1, vec2)),
            // Union is commutative; assign into the denser side.
            (Array(..), Bitmap(..) | Inverted(..)) | (Bitmap(..), Inverted(..)) => {
                let mut lhs = rhs.clone();
                BitOrAssign::bitor_assign(&mut lhs, self);
                lhs
            }
            _ => {
                let mut lhs = self.clone();
                BitOrAssign::bitor_assign(&mut lhs, rhs);
                lhs
            }
        }
    }
}

impl BitOrAssign<&Store> for Store {
    fn bitor_assign(&mut self, rhs: &Store) {
        match (self, rhs) {
            (&mut Array(ref mut vec1), &Array(ref vec2)) => {
                let this = mem::take(vec1);
                *vec1 = BitOr::bitor(&this, vec2);
            }
            (&mut Bitmap(ref mut bits1), &Array(ref vec2)) => {
                BitOrAssign::bitor_assign(bits1, vec2);
            }
            (&mut Bitmap(ref mut bits1), &Bitmap(ref bits2)) => {
                BitOrAssign::bitor_assign(bits1, bits2);
            }
            (this @ &mut Array(..), &Bitmap(ref bits2)) => {
                let mut lhs: Store = Bitmap(bits2.clone());
                BitOrAssign::bitor_assign(&mut lhs, &*this);
                *this = lhs;
            }
            // Inverted on the left only grows: values merged in are removed
            // from the absence list.
            (&mut Inverted(ref mut inv1), &Array(ref vec2)) => {
                SubAssign::sub_assign(inv1.absent_mut(), vec2);
            }
            (&mut Inverted(ref mut inv1), &Bitmap(ref bits2)) => {
                inv1.absent_mut().retain(|i| !bits2.contains(i));
            }
            (&mut Inverted(ref mut inv1), &Inverted(ref inv2)) => {
                BitAndAssign::bitand_assign(inv1.absent_mut(), inv2.absent());
            }
            // Inverted on the right dominates: keep its absence list minus
            // whatever the left side supplies.
            (this @ &mut (Array(..) | Bitmap(..)), &Inverted(ref inv2)) => {
                let mut absent = inv2.absent().clone();
                match &*this {
                    Array(vec1) => SubAssign::sub_assign(&mut absent, vec1),
                    Bitmap(bits1) => SubAssign::sub_assign(&mut absent, bits1),
                    Inverted(..) => unreachable!(),
                }
                *this = Inverted(InvertedStore::from_absent(absent));
            }
        }
    }
}

impl BitAnd<&Store> for &Store {
    type Output = Store;

    fn bitand(self, rhs: &Store) -> Store {
        match (self, rhs) {
            (Array(vec1), Array(vec2)) => Array(BitAnd::bitand(vec1, vec2)),
            // Intersection is commutative; assign into the sparser side.
            (Bitmap(..) | Inverted(..), Array(..)) | (Inverted(..), Bitmap(..)) => {
                let mut lhs = rhs.clone();
                BitAndAssign::bitand_assign(&mut lhs, self);
                lhs
            }
            _ => {
                let mut lhs = self.clone();
                BitAndAssign::bitand_assign(&mut lhs, rhs);
                lhs
            }
        }
    }
}

impl BitAndAssign<&Store> for Store {
    fn bitand_assign(&mut self, rhs: &Store) {
        match (self, rhs) {
            (&mut Array(ref mut vec1), &Array(ref vec2)) => {
                BitAndAssign::bitand_assign(vec1, vec2);
            }
            (&mut Array(ref mut vec1), &Bitmap(ref bits2)) => {
                BitAndAssign::bitand_assign(vec1, bits2);
            }
            // A ∩ inverted(absent) = A minus the absence list.
            (&mut Array(ref mut vec1), &Inverted(ref inv2)) => {
                SubAssign::sub_assign(vec1, inv2.absent());
            }
            (&mut Bitmap(ref mut bits1), &Bitmap(ref bits2)) => {
                BitAndAssign::bitand_assign(bits1, bits2);
            }
            (&mut Bitmap(ref mut bits1), &Inverted(ref inv2)) => {
                SubAssign::sub_assign(bits1, inv2.absent());
            }
            (this @ &mut Bitmap(..), &Array(ref vec2)) => {
                let mut vec = vec2.clone();
                if let Bitmap(bits1) = &*this {
                    BitAndAssign::bitand_assign(&mut vec, bits1);
                }
                *this = Array(vec);
            }
            (this @ &mut Inverted(..), &Array(ref vec2)) => {
                let mut vec = vec2.clone();
                if let Inverted(inv1) = &*this {
                    SubAssign::sub_assign(&mut vec, inv1.absent());
                }
                *this = Array(vec);
            }
            (this @ &mut Inverted(..), &Bitmap(ref bits2)) => {
                let mut bits = bits2.clone();
                if let Inverted(inv1) = &*this {
                    SubAssign::sub_assign(&mut bits, inv1.absent());
                }
                *this = Bitmap(bits);
            }
            (&mut Inverted(ref mut inv1), &Inverted(ref inv2)) => {
                BitOrAssign::bitor_assign(inv1.absent_mut(), inv2.absent());
            }
        }
    }
}

impl Sub<&Store> for &Store {
    type Output = Store;

    fn sub(self, rhs: &Store) -> Store {
        match (self, rhs) {
            (Array(vec1), Array(vec2)) => Array(Sub::sub(vec1, vec2)),
            _ => {
                let mut lhs = self.clone();
                SubAssign::sub_assign(&mut lhs, rhs);
                lhs
            }
        }
    }
}

impl SubAssign<&Store> for Store {
    fn sub_assign(&mut self, rhs: &Store) {
        match (self, rhs) {
            (&mut Array(ref mut vec1), &Array(ref vec2)) => {
                SubAssign::sub_assign(vec1, vec2);
            }
            (&mut Array(ref mut vec1), &Bitmap(ref bits2)) => {
                SubAssign::sub_assign(vec1, bits2);
            }
            // A ∖ inverted(absent) keeps exactly the absent values of the rhs.
            (&mut Array(ref mut vec1), &Inverted(ref inv2)) => {
                BitAndAssign::bitand_assign(vec1, inv2.absent());
            }
            (&mut Bitmap(ref mut bits1), &Array(ref vec2)) => {
                SubAssign::sub_assign(bits1, vec2);
            }
            (&mut Bitmap(ref mut bits1), &Bitmap(ref bits2)) => {
                SubAssign::sub_assign(bits1, bits2);
            }
            (this @ &mut Bitmap(..), &Inverted(ref inv2)) => {
                let mut vec = inv2.absent().clone();
                if let Bitmap(bits1) = &*this {
                    BitAndAssign::bitand_assign(&mut vec, bits1);
                }
                *this = Array(vec);
            }
            (&mut Inverted(ref mut inv1), &Array(ref vec2)) => {
                BitOrAssign::bitor_assign(inv1.absent_mut(), vec2);
            }
            (this @ &mut Inverted(..), &Bitmap(ref bits2)) => {
                // inverted ∖ B = complement(absent ∪ B)
                let mut bits = bits2.complement();
                if let Inverted(inv1) = &*this {
                    SubAssign::sub_assign(&mut bits, inv1.absent());
                }
                *this = Bitmap(bits);
            }
            (this @ &mut Inverted(..), &Inverted(ref inv2)) => {
                // inverted₁ ∖ inverted₂ = absent₂ ∖ absent₁
                let mut vec = inv2.absent().clone();
                if let Inverted(inv1) = &*this {
                    SubAssign::sub_assign(&mut vec, inv1.absent());
                }
                *this = Array(vec);
            }
        }
    }
}

impl BitXor<&Store> for &Store {
    type Output = Store;

    fn bitxor(self, rhs: &Store) -> Store {
        match (self, rhs) {
            (Array(vec1), Array(vec2)) => Array(BitXor::bitxor(vec1, vec2)),
            // Symmetric difference is commutative; assign into the denser side.
            (Array(..), Bitmap(..) | Inverted(..)) | (Bitmap(..), Inverted(..)) => {
                let mut lhs = rhs.clone();
                BitXorAssign::bitxor_assign(&mut lhs, self);
                lhs
            }
            _ => {
                let mut lhs = self.clone();
                BitXorAssign::bitxor_assign(&mut lhs, rhs);
                lhs
            }
        }
    }
}

impl BitXorAssign<&Store> for Store {
    fn bitxor_assign(&mut self, rhs: &Store) {
        match (self, rhs) {
            (&mut Array(ref mut vec1), &Array(ref vec2)) => {
                let this = mem::take(vec1);
                *vec1 = BitXor::bitxor(&this, vec2);
            }
            (&mut Bitmap(ref mut bits1), &Array(ref vec2)) => {
                BitXorAssign::bitxor_assign(bits1, vec2);
            }
            (&mut Bitmap(ref mut bits1), &Bitmap(ref bits2)) => {
                BitXorAssign::bitxor_assign(bits1, bits2);
            }
            (this @ &mut Array(..), &Bitmap(ref bits2)) => {
                let mut bits = bits2.clone();
                if let Array(vec1) = &*this {
                    BitXorAssign::bitxor_assign(&mut bits, vec1);
                }
                *this = Bitmap(bits);
            }
            // X △ complement(Y) = complement(X △ Y), so the inverted arms
            // xor over absence lists and flip back.
            (this @ &mut Array(..), &Inverted(ref inv2)) => {
                let vec1 = match mem::take(this) {
                    Array(vec) => vec,
                    _ => unreachable!(),
                };
                *this = Inverted(InvertedStore::from_absent(BitXor::bitxor(&vec1, inv2.absent())));
            }
            (this @ &mut Bitmap(..), &Inverted(ref inv2)) => {
                let mut bits = match mem::take(this) {
                    Bitmap(bits) => bits,
                    _ => unreachable!(),
                };
                BitXorAssign::bitxor_assign(&mut bits, inv2.absent());
                *this = Bitmap(bits.complement());
            }
            (this @ &mut Inverted(..), &Array(ref vec2)) => {
                let inv1 = match mem::take(this) {
                    Inverted(inv) => inv,
                    _ => unreachable!(),
                };
                *this = Inverted(InvertedStore::from_absent(BitXor::bitxor(inv1.absent(), vec2)));
            }
            (this @ &mut Inverted(..), &Bitmap(ref bits2)) => {
                let inv1 = match mem::take(this) {
                    Inverted(inv) => inv,
                    _ => unreachable!(),
                };
                let mut bits = bits2.clone();
                BitXorAssign::bitxor_assign(&mut bits, inv1.absent());
                *this = Bitmap(bits.complement());
            }
            // complement(X) △ complement(Y) = X △ Y, as a direct set.
            (this @ &mut Inverted(..), &Inverted(ref inv2)) => {
                let inv1 = match mem::take(this) {
                    Inverted(inv) => inv,
                    _ => unreachable!(),
                };
                *this = Array(BitXor::bitxor(inv1.absent(), inv2.absent()));
            }
        }
    }
}

impl<'a> IntoIterator for &'a Store {
    type Item = u16;
    type IntoIter = Iter<'a>;
    fn into_iter(self) -> Iter<'a> {
        match self {
            Array(vec) => Iter::Array(vec.iter()),
            Bitmap(bits) => Iter::BitmapBorrowed(bits.iter()),
            Inverted(inv) => Iter::InvertedBorrowed(inv.iter()),
        }
    }
}

impl IntoIterator for Store {
    type Item = u16;
    type IntoIter = Iter<'static>;
    fn into_iter(self) -> Iter<'static> {
        match self {
            Array(vec) => Iter::Vec(vec.into_iter()),
            Bitmap(bits) => Iter::BitmapOwned(bits.into_iter()),
            Inverted(inv) => Iter::InvertedOwned(inv.into_iter()),
        }
    }
}

impl PartialEq for Store {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Array(vec1), Array(vec2)) => vec1 == vec2,
            (Bitmap(bits1), Bitmap(bits2)) => bits1 == bits2,
            (Inverted(inv1), Inverted(inv2)) => inv1 == inv2,
            // Normalized stores of different shapes have disjoint
            // cardinality ranges.
            _ => false,
        }
    }
}

impl Iterator for Iter<'_> {
    type Item = u16;

    fn next(&mut self) -> Option<u16> {
        match self {
            Iter::Array(inner) => inner.next().copied(),
            Iter::Vec(inner) => inner.next(),
            Iter::BitmapBorrowed(inner) => inner.next(),
            Iter::BitmapOwned(inner) => inner.next(),
            Iter::InvertedBorrowed(inner) => inner.next(),
            Iter::InvertedOwned(inner) => inner.next(),
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        match self {
            Iter::Array(inner) => inner.size_hint(),
            Iter::Vec(inner) => inner.size_hint(),
            Iter::BitmapBorrowed(inner) => inner.size_hint(),
            Iter::BitmapOwned(inner) => inner.size_hint(),
            Iter::InvertedBorrowed(inner) => inner.size_hint(),
            Iter::InvertedOwned(inner) => inner.size_hint(),
        }
    }
}

impl DoubleEndedIterator for Iter<'_> {
    fn next_back(&mut self) -> Option<Self::Item> {
        match self {
            Iter::Array(inner) => inner.next_back().copied(),
            Iter::Vec(inner) => inner.next_back(),
            Iter::BitmapBorrowed(inner) => inner.next_back(),
            Iter::BitmapOwned(inner) => inner.next_back(),
            Iter::InvertedBorrowed(inner) => inner.next_back(),
            Iter::InvertedOwned(inner) => inner.next_back(),
        }
    }
}

impl ExactSizeIterator for Iter<'_> {}

#[cfg(test)]
mod tests {
    use super::*;

    fn array(values: &[u16]) -> Store {
        Array(ArrayStore::from_vec_unchecked(values.to_vec()))
    }

    fn bitmap(values: &[u16]) -> Store {
        let mut bits = BitmapStore::new();
        for &v in values {
            bits.insert(v);
        }
        Bitmap(bits)
    }

    fn inverted(absent: &[u16]) -> Store {
        Inverted(InvertedStore::from_absent(ArrayStore::from_vec_unchecked(absent.to_vec())))
    }

    fn to_vec(store: &Store) -> Vec<u16> {
        store.into_iter().collect()
    }

    // Every (lhs shape, rhs shape) pair must agree with the array/array
    // reference result on the same values.
    #[test]
    fn test_pairwise_ops_agree_across_shapes() {
        let lhs_values: Vec<u16> = (0..200u16).map(|i| i * 3).collect();
        let rhs_values: Vec<u16> = (0..200u16).map(|i| i * 5 + 1).collect();

        let lhs_shapes = [array(&lhs_values), bitmap(&lhs_values), inverted(&lhs_values)];
        let rhs_shapes = [array(&rhs_values), bitmap(&rhs_values), inverted(&rhs_values)];

        for lhs in &lhs_shapes {
            for rhs in &rhs_shapes {
                let (l, r) = (to_vec(lhs), to_vec(rhs));
                let or_want: Vec<u16> = {
                    let mut v = [l.clone(), r.clone()].concat();
                    v.sort_unstable();
                    v.dedup();
                    v
                };
                let and_want: Vec<u16> =
                    l.iter().copied().filter(|v| r.binary_search(v).is_ok()).collect();
                let sub_want: Vec<u16> =
                    l.iter().copied().filter(|v| r.binary_search(v).is_err()).collect();
                let xor_want: Vec<u16> = or_want
                    .iter()
                    .copied()
                    .filter(|v| l.binary_search(v).is_ok() != r.binary_search(v).is_ok())
                    .collect();

                assert_eq!(to_vec(&(lhs | rhs)), or_want);
                assert_eq!(to_vec(&(lhs & rhs)), and_want);
                assert_eq!(to_vec(&(lhs - rhs)), sub_want);
                assert_eq!(to_vec(&(lhs ^ rhs)), xor_want);

                // In-place variants must agree with the pure ones.
                let mut acc = lhs.clone();
                acc |= rhs;
                assert_eq!(to_vec(&acc), or_want);
                let mut acc = lhs.clone();
                acc &= rhs;
                assert_eq!(to_vec(&acc), and_want);
                let mut acc = lhs.clone();
                acc -= rhs;
                assert_eq!(to_vec(&acc), sub_want);
                let mut acc = lhs.clone();
                acc ^= rhs;
                assert_eq!(to_vec(&acc), xor_want);

                assert_eq!(lhs.intersection_len(rhs), and_want.len() as u64);
                assert_eq!(lhs.is_disjoint(rhs), and_want.is_empty());
                assert_eq!(lhs.is_subset(rhs), sub_want.is_empty());
            }
        }
    }

    #[test]
    fn test_inverted_pairs_stay_in_complement_space() {
        // Absence lists are tiny compared to the domain, so the inverted
        // arms must produce inverted (or bitmap) results, never overflow.
        let a = inverted(&[1, 2, 3]);
        let b = inverted(&[3, 4, 5]);

        let union = &a | &b;
        assert_eq!(union.len(), (1 << 16) - 1);
        assert!(!union.contains(3));
        assert!(union.contains(1));
        assert!(union.contains(5));

        let inter = &a & &b;
        assert_eq!(inter.len(), (1 << 16) - 5);
        for v in 1..=5u16 {
            assert!(!inter.contains(v));
        }

        let diff = &a - &b;
        assert_eq!(to_vec(&diff), [4, 5]);

        let xor = &a ^ &b;
        assert_eq!(to_vec(&xor), [1, 2, 4, 5]);
    }

    #[test]
    fn test_full_store() {
        let full = Store::full();
        assert!(full.is_full());
        assert_eq!(full.len(), 1 << 16);
        assert!(full.contains(0));
        assert!(full.contains(u16::MAX));
    }
}
