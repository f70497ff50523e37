use roaring_pack::RoaringBitmap;

fn rb(values: &[u32]) -> RoaringBitmap {
    values.iter().copied().collect()
}

#[test]
fn small_set_algebra() {
    let a = rb(&[1, 2, 3]);
    let b = rb(&[2, 3, 4]);

    assert_eq!(&a | &b, rb(&[1, 2, 3, 4]));
    assert_eq!(&a & &b, rb(&[2, 3]));
    assert_eq!(&a - &b, rb(&[1]));
    assert_eq!(&a ^ &b, rb(&[1, 4]));
}

#[test]
fn inplace_equals_pure() {
    let a = rb(&[1, 2, 3, 1_000_000]);
    let b = rb(&[2, 3, 4, 2_000_000]);

    let mut union = a.clone();
    union |= &b;
    assert_eq!(union, &a | &b);

    let mut intersection = a.clone();
    intersection &= &b;
    assert_eq!(intersection, &a & &b);

    let mut difference = a.clone();
    difference -= &b;
    assert_eq!(difference, &a - &b);

    let mut symmetric = a.clone();
    symmetric ^= &b;
    assert_eq!(symmetric, &a ^ &b);

    // Owned operands run through the same kernels.
    assert_eq!(a.clone() | b.clone(), &a | &b);
    assert_eq!(a.clone() & b.clone(), &a & &b);
    assert_eq!(a.clone() - b.clone(), &a - &b);
    assert_eq!(a.clone() ^ b.clone(), &a ^ &b);
}

#[test]
fn empty_bitmap_identities() {
    let a = rb(&[5, 70_000, u32::MAX]);
    let empty = RoaringBitmap::new();

    assert_eq!(&a | &empty, a);
    assert_eq!(&empty | &a, a);
    assert_eq!(&a & &empty, empty);
    assert_eq!(&a - &empty, a);
    assert_eq!(&empty - &a, empty);
    assert_eq!(&a ^ &empty, a);

    assert!(empty.is_subset(&a));
    assert!(!a.is_subset(&empty));
    assert!(empty.is_disjoint(&a));
    assert_eq!(empty.jaccard(&empty), 1.0);
}

#[test]
fn algebraic_laws() {
    let a = RoaringBitmap::from_range(0..10_000);
    let b: RoaringBitmap = (0..20_000u32).step_by(3).collect();
    let c: RoaringBitmap = (5_000..70_000u32).step_by(7).collect();

    // Commutativity.
    assert_eq!(&a | &b, &b | &a);
    assert_eq!(&a & &b, &b & &a);
    assert_eq!(&a ^ &b, &b ^ &a);

    // Associativity.
    assert_eq!(&(&a | &b) | &c, &a | &(&b | &c));
    assert_eq!(&(&a & &b) & &c, &a & &(&b & &c));
    assert_eq!(&(&a ^ &b) ^ &c, &a ^ &(&b ^ &c));

    // Idempotence.
    assert_eq!(&a | &a, a);
    assert_eq!(&a & &a, a);
    assert!((&a ^ &a).is_empty());
    assert!((&a - &a).is_empty());

    // De Morgan-ish decomposition of xor.
    assert_eq!(&a ^ &b, &(&a - &b) | &(&b - &a));
}

#[test]
fn subset_equivalences() {
    let a = RoaringBitmap::from_range(100..5_000);
    let b = RoaringBitmap::from_range(0..70_000);

    assert!(a.is_subset(&b));
    assert!(b.is_superset(&a));
    assert_eq!(&a | &b, b);
    assert_eq!(&a & &b, a);
    assert!(!b.is_subset(&a));

    let mut almost = b.clone();
    almost.remove(2_500);
    assert!(!a.is_subset(&almost));
}

#[test]
fn dense_and_nearly_full_operands() {
    // One side nearly full (inverted containers), the other mid-density.
    let a = RoaringBitmap::from_range(0..65_536);
    let b: RoaringBitmap = (0..65_536u32).step_by(2).collect();

    let difference = &a - &b;
    assert_eq!(difference.len(), 32_768);
    assert!(difference.contains(1));
    assert!(!difference.contains(0));

    let symmetric = &a ^ &b;
    assert_eq!(symmetric, difference);

    let mut shrunk = a.clone();
    shrunk &= &b;
    assert_eq!(shrunk, b);

    assert_eq!(a.intersection_len(&b), b.len());
    assert_eq!(a.union_len(&b), a.len());
}

#[test]
fn len_fast_paths_agree() {
    let a: RoaringBitmap = (0..100_000u32).step_by(3).collect();
    let b: RoaringBitmap = (0..100_000u32).step_by(5).collect();

    assert_eq!(a.intersection_len(&b), (&a & &b).len());
    assert_eq!(a.union_len(&b), (&a | &b).len());
    assert_eq!(a.difference_len(&b), (&a - &b).len());
    assert_eq!(a.symmetric_difference_len(&b), (&a ^ &b).len());
}

#[test]
fn jaccard_distance() {
    let a = rb(&[0, 6, 8]);
    let b = rb(&[1, 7, 6]);

    // |A ∩ B| = 1, |A ∪ B| = 5.
    assert_eq!(a.jaccard(&b), 1.0 - 1.0 / 5.0);
    assert_eq!(a.jaccard(&a), 0.0);

    let disjoint = rb(&[100, 200]);
    assert_eq!(a.jaccard(&disjoint), 1.0);

    let empty = RoaringBitmap::new();
    assert_eq!(a.jaccard(&empty), 1.0);
    assert_eq!(empty.jaccard(&empty), 1.0);
}

#[test]
fn boundary_values() {
    let a = rb(&[0, u32::MAX]);
    let b = rb(&[u32::MAX]);

    assert_eq!((&a & &b), b);
    assert_eq!((&a - &b), rb(&[0]));
    assert_eq!(a.rank(0), 1);
    assert_eq!(a.rank(u32::MAX), 2);
    assert_eq!(a.select(1), Some(u32::MAX));
    assert!(b.is_subset(&a));
}
