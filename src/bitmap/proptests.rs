use std::collections::BTreeSet;

use proptest::collection::{btree_set, vec};
use proptest::prelude::*;

use crate::{FrozenBitmap, RoaringBitmap};

// Mixes point values with dense runs so the generated bitmaps exercise all
// three container shapes, including the nearly-full ones.
fn bitmap_strategy() -> impl Strategy<Value = RoaringBitmap> {
    (vec((0u32..0x3_0000, 1u32..70_000), 0..3), btree_set(0u32..0x3_0000, 0..300)).prop_map(
        |(ranges, values)| {
            let mut rb = RoaringBitmap::new();
            for (start, len) in ranges {
                rb.insert_range(start..start.saturating_add(len));
            }
            rb.extend(values);
            rb
        },
    )
}

fn model(rb: &RoaringBitmap) -> BTreeSet<u32> {
    rb.iter().collect()
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn set_algebra_agrees_with_the_naive_model(
        a in bitmap_strategy(),
        b in bitmap_strategy(),
    ) {
        let (ma, mb) = (model(&a), model(&b));

        let union = &a | &b;
        prop_assert_eq!(model(&union), ma.union(&mb).copied().collect::<BTreeSet<u32>>());
        prop_assert_eq!(union.len(), a.union_len(&b));

        let intersection = &a & &b;
        prop_assert_eq!(
            model(&intersection),
            ma.intersection(&mb).copied().collect::<BTreeSet<u32>>()
        );
        prop_assert_eq!(intersection.len(), a.intersection_len(&b));

        let difference = &a - &b;
        prop_assert_eq!(
            model(&difference),
            ma.difference(&mb).copied().collect::<BTreeSet<u32>>()
        );
        prop_assert_eq!(difference.len(), a.difference_len(&b));

        let symmetric = &a ^ &b;
        prop_assert_eq!(
            model(&symmetric),
            ma.symmetric_difference(&mb).copied().collect::<BTreeSet<u32>>()
        );
        prop_assert_eq!(symmetric.len(), a.symmetric_difference_len(&b));
    }

    #[test]
    fn inplace_ops_equal_pure_ops(
        a in bitmap_strategy(),
        b in bitmap_strategy(),
    ) {
        let mut or_assign = a.clone();
        or_assign |= &b;
        prop_assert_eq!(&or_assign, &(&a | &b));

        let mut and_assign = a.clone();
        and_assign &= &b;
        prop_assert_eq!(&and_assign, &(&a & &b));

        let mut sub_assign = a.clone();
        sub_assign -= &b;
        prop_assert_eq!(&sub_assign, &(&a - &b));

        let mut xor_assign = a.clone();
        xor_assign ^= &b;
        prop_assert_eq!(&xor_assign, &(&a ^ &b));

        // Owned right-hand sides take the same paths.
        let mut owned = a.clone();
        owned |= b.clone();
        prop_assert_eq!(&owned, &or_assign);
        let mut owned = a.clone();
        owned &= b.clone();
        prop_assert_eq!(&owned, &and_assign);
    }

    #[test]
    fn subset_identities(
        a in bitmap_strategy(),
        b in bitmap_strategy(),
    ) {
        let union = &a | &b;
        let intersection = &a & &b;

        prop_assert!(a.is_subset(&union));
        prop_assert!(intersection.is_subset(&a));
        prop_assert_eq!(a.is_subset(&b), &union == &b);
        prop_assert_eq!(a.is_subset(&b), &intersection == &a);
        prop_assert_eq!(a.is_disjoint(&b), a.intersection_len(&b) == 0);
    }

    #[test]
    fn iteration_is_sorted_and_rank_inverts_select(a in bitmap_strategy()) {
        let values: Vec<u32> = a.iter().collect();
        prop_assert_eq!(values.len() as u64, a.len());
        prop_assert!(values.windows(2).all(|w| w[0] < w[1]));

        let mut reversed: Vec<u32> = a.iter().rev().collect();
        reversed.reverse();
        prop_assert_eq!(&reversed, &values);

        for gap in [1usize, 97, 5000] {
            for (n, &value) in values.iter().enumerate().step_by(gap) {
                prop_assert_eq!(a.select(n as u32), Some(value));
                prop_assert_eq!(a.rank(value), n as u64 + 1);
            }
        }
        prop_assert_eq!(a.select(values.len() as u32), None);
    }

    #[test]
    fn freeze_round_trips(a in bitmap_strategy()) {
        let bytes = a.freeze();
        prop_assert_eq!(bytes.len(), a.serialized_size());
        prop_assert_eq!(&bytes, &a.freeze());

        let frozen = FrozenBitmap::from_bytes(bytes).unwrap();
        prop_assert_eq!(frozen.len(), a.len());
        prop_assert_eq!(&frozen.to_roaring(), &a);
        prop_assert_eq!(frozen.min(), a.min());
        prop_assert_eq!(frozen.max(), a.max());

        let values: Vec<u32> = a.iter().collect();
        prop_assert_eq!(frozen.iter().collect::<Vec<u32>>(), values.clone());
        for (n, &value) in values.iter().enumerate().step_by(1999) {
            prop_assert!(frozen.contains(value));
            prop_assert_eq!(frozen.select(n as u32), Some(value));
            prop_assert_eq!(frozen.rank(value), n as u64 + 1);
        }
    }

    #[test]
    fn clamp_equals_filtered_model(
        a in bitmap_strategy(),
        start in 0u32..0x3_0000,
        len in 0u32..0x2_0000,
    ) {
        let end = start.saturating_add(len);
        let clamped = a.clamp(start..end);
        let want: BTreeSet<u32> =
            model(&a).into_iter().filter(|v| (start..end).contains(v)).collect();
        prop_assert_eq!(model(&clamped), want);
    }
}
