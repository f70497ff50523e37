use core::cmp::Ordering;
use core::ops::{BitAndAssign, BitOrAssign, BitXorAssign, Deref, Sub, SubAssign};

use super::container::ContainerRef;
use super::{FrozenBitmap, RawBitmap};
use crate::bitmap::store::Store;
use crate::bitmap::Container;
use crate::RoaringBitmap;

/// Ordered key-merge over two frozen views, the frozen counterpart of the
/// container `Pairs` walk.
struct RawPairs<'a> {
    left: RawBitmap<'a>,
    right: RawBitmap<'a>,
    i: usize,
    j: usize,
}

impl<'a> RawPairs<'a> {
    fn new(left: RawBitmap<'a>, right: RawBitmap<'a>) -> RawPairs<'a> {
        RawPairs { left, right, i: 0, j: 0 }
    }
}

impl<'a> Iterator for RawPairs<'a> {
    type Item = (Option<ContainerRef<'a>>, Option<ContainerRef<'a>>);

    fn next(&mut self) -> Option<Self::Item> {
        let lhs = (self.i < self.left.n_keys()).then(|| self.left.container_at(self.i));
        let rhs = (self.j < self.right.n_keys()).then(|| self.right.container_at(self.j));
        match (lhs, rhs) {
            (None, None) => None,
            (Some(lhs), None) => {
                self.i += 1;
                Some((Some(lhs), None))
            }
            (None, Some(rhs)) => {
                self.j += 1;
                Some((None, Some(rhs)))
            }
            (Some(lhs), Some(rhs)) => match lhs.key.cmp(&rhs.key) {
                Ordering::Equal => {
                    self.i += 1;
                    self.j += 1;
                    Some((Some(lhs), Some(rhs)))
                }
                Ordering::Less => {
                    self.i += 1;
                    Some((Some(lhs), None))
                }
                Ordering::Greater => {
                    self.j += 1;
                    Some((None, Some(rhs)))
                }
            },
        }
    }
}

fn thaw(container: &ContainerRef<'_>) -> Container {
    Container { key: container.key, store: container.to_store() }
}

impl<B: Deref<Target = [u8]>> FrozenBitmap<B> {
    /// The union with another frozen view, as a new mutable bitmap.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use roaring_pack::{FrozenBitmap, RoaringBitmap};
    ///
    /// let a = FrozenBitmap::from_bytes(RoaringBitmap::from_range(0..3).freeze()).unwrap();
    /// let b = FrozenBitmap::from_bytes(RoaringBitmap::from_range(2..5).freeze()).unwrap();
    /// assert_eq!(a.union(&b), RoaringBitmap::from_range(0..5));
    /// ```
    pub fn union<B2: Deref<Target = [u8]>>(&self, other: &FrozenBitmap<B2>) -> RoaringBitmap {
        let mut containers = Vec::new();
        for pair in RawPairs::new(self.raw(), other.raw()) {
            match pair {
                (Some(lhs), None) => containers.push(thaw(&lhs)),
                (None, Some(rhs)) => containers.push(thaw(&rhs)),
                (Some(lhs), Some(rhs)) => {
                    let mut store = lhs.to_store();
                    BitOrAssign::bitor_assign(&mut store, &rhs.to_store());
                    containers.push(Container::from_store(lhs.key, store));
                }
                (None, None) => break,
            }
        }
        RoaringBitmap::from_containers(containers)
    }

    /// The intersection with another frozen view, as a new mutable bitmap.
    pub fn intersection<B2: Deref<Target = [u8]>>(
        &self,
        other: &FrozenBitmap<B2>,
    ) -> RoaringBitmap {
        let mut containers = Vec::new();
        for pair in RawPairs::new(self.raw(), other.raw()) {
            if let (Some(lhs), Some(rhs)) = pair {
                let mut store = lhs.to_store();
                BitAndAssign::bitand_assign(&mut store, &rhs.to_store());
                let container = Container::from_store(lhs.key, store);
                if !container.is_empty() {
                    containers.push(container);
                }
            }
        }
        RoaringBitmap::from_containers(containers)
    }

    /// The difference with another frozen view, as a new mutable bitmap.
    pub fn difference<B2: Deref<Target = [u8]>>(&self, other: &FrozenBitmap<B2>) -> RoaringBitmap {
        let mut containers = Vec::new();
        for pair in RawPairs::new(self.raw(), other.raw()) {
            match pair {
                (Some(lhs), None) => containers.push(thaw(&lhs)),
                (Some(lhs), Some(rhs)) => {
                    let mut store = lhs.to_store();
                    SubAssign::sub_assign(&mut store, &rhs.to_store());
                    let container = Container::from_store(lhs.key, store);
                    if !container.is_empty() {
                        containers.push(container);
                    }
                }
                _ => (),
            }
        }
        RoaringBitmap::from_containers(containers)
    }

    /// The symmetric difference with another frozen view, as a new mutable
    /// bitmap.
    pub fn symmetric_difference<B2: Deref<Target = [u8]>>(
        &self,
        other: &FrozenBitmap<B2>,
    ) -> RoaringBitmap {
        let mut containers = Vec::new();
        for pair in RawPairs::new(self.raw(), other.raw()) {
            match pair {
                (Some(lhs), None) => containers.push(thaw(&lhs)),
                (None, Some(rhs)) => containers.push(thaw(&rhs)),
                (Some(lhs), Some(rhs)) => {
                    let mut store = lhs.to_store();
                    BitXorAssign::bitxor_assign(&mut store, &rhs.to_store());
                    let container = Container::from_store(lhs.key, store);
                    if !container.is_empty() {
                        containers.push(container);
                    }
                }
                (None, None) => break,
            }
        }
        RoaringBitmap::from_containers(containers)
    }

    /// The cardinality of the intersection with another frozen view, without
    /// materializing any container.
    pub fn intersection_len<B2: Deref<Target = [u8]>>(&self, other: &FrozenBitmap<B2>) -> u64 {
        RawPairs::new(self.raw(), other.raw())
            .map(|pair| match pair {
                (Some(lhs), Some(rhs)) => lhs.intersection_len(&rhs),
                _ => 0,
            })
            .sum()
    }

    /// The cardinality of the union with another frozen view, without
    /// materializing any container.
    pub fn union_len<B2: Deref<Target = [u8]>>(&self, other: &FrozenBitmap<B2>) -> u64 {
        self.len() + other.len() - self.intersection_len(other)
    }

    /// The Jaccard distance `1 - |A ∩ B| / |A ∪ B|` to another frozen view.
    /// The distance between two empty bitmaps is defined as `1.0`.
    pub fn jaccard<B2: Deref<Target = [u8]>>(&self, other: &FrozenBitmap<B2>) -> f64 {
        let union_len = self.union_len(other);
        if union_len == 0 {
            return 1.0;
        }
        1.0 - self.intersection_len(other) as f64 / union_len as f64
    }
}

impl<B: Deref<Target = [u8]>> BitAndAssign<&FrozenBitmap<B>> for RoaringBitmap {
    /// In-place intersection with a frozen view. Only the containers whose
    /// key exists on both sides are decoded from the buffer.
    fn bitand_assign(&mut self, rhs: &FrozenBitmap<B>) {
        let raw = rhs.raw();
        self.containers_mut().retain_mut(|cont| match raw.find_key(cont.key) {
            Some(loc) => {
                let rhs_store: Store = raw.container_at(loc).to_store();
                BitAndAssign::bitand_assign(&mut cont.store, &rhs_store);
                cont.ensure_correct_store();
                !cont.is_empty()
            }
            None => false,
        })
    }
}

impl<B: Deref<Target = [u8]>> Sub<&FrozenBitmap<B>> for RoaringBitmap {
    type Output = RoaringBitmap;

    /// A difference with a frozen view, decoding only the matched containers.
    fn sub(mut self, rhs: &FrozenBitmap<B>) -> RoaringBitmap {
        let raw = rhs.raw();
        self.containers_mut().retain_mut(|cont| match raw.find_key(cont.key) {
            Some(loc) => {
                let rhs_store: Store = raw.container_at(loc).to_store();
                SubAssign::sub_assign(&mut cont.store, &rhs_store);
                cont.ensure_correct_store();
                !cont.is_empty()
            }
            None => true,
        });
        self
    }
}

impl<B1, B2> PartialEq<FrozenBitmap<B2>> for FrozenBitmap<B1>
where
    B1: Deref<Target = [u8]>,
    B2: Deref<Target = [u8]>,
{
    fn eq(&self, other: &FrozenBitmap<B2>) -> bool {
        self.len() == other.len() && self.iter().eq(other.iter())
    }
}

impl<B: Deref<Target = [u8]>> PartialEq<RoaringBitmap> for FrozenBitmap<B> {
    fn eq(&self, other: &RoaringBitmap) -> bool {
        self.len() == other.len() && self.iter().eq(other.iter())
    }
}

impl<B: Deref<Target = [u8]>> PartialEq<FrozenBitmap<B>> for RoaringBitmap {
    fn eq(&self, other: &FrozenBitmap<B>) -> bool {
        other == self
    }
}

#[cfg(test)]
mod tests {
    use crate::{FrozenBitmap, RoaringBitmap};

    fn frozen(rb: &RoaringBitmap) -> FrozenBitmap<Vec<u8>> {
        FrozenBitmap::from_bytes(rb.freeze()).unwrap()
    }

    fn samples() -> Vec<RoaringBitmap> {
        let mut dense = RoaringBitmap::new();
        dense.insert_range(0..70_000);

        let sparse: RoaringBitmap = (0..10u32).map(|i| i * 65_536).collect();
        let mid: RoaringBitmap = (0..60_000u32).step_by(3).collect();

        vec![RoaringBitmap::new(), sparse, mid, dense]
    }

    #[test]
    fn test_frozen_pairwise_ops_match_mutable_ones() {
        let samples = samples();
        for a in &samples {
            for b in &samples {
                let (fa, fb) = (frozen(a), frozen(b));
                assert_eq!(fa.union(&fb), a | b);
                assert_eq!(fa.intersection(&fb), a & b);
                assert_eq!(fa.difference(&fb), a - b);
                assert_eq!(fa.symmetric_difference(&fb), a ^ b);
                assert_eq!(fa.intersection_len(&fb), a.intersection_len(b));
                assert_eq!(fa.union_len(&fb), a.union_len(b));
                assert_eq!(fa.jaccard(&fb), a.jaccard(b));
            }
        }
    }

    #[test]
    fn test_intersect_mutable_with_frozen() {
        let samples = samples();
        for a in &samples {
            for b in &samples {
                let mut acc = a.clone();
                acc &= &frozen(b);
                assert_eq!(acc, a & b);

                assert_eq!(a.clone() - &frozen(b), a - b);
            }
        }
    }

    #[test]
    fn test_equality_across_representations() {
        for rb in samples() {
            let view = frozen(&rb);
            assert_eq!(view, rb);
            assert_eq!(rb, view);
            assert_eq!(view, frozen(&rb));
        }
    }
}
