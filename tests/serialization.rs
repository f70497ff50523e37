use roaring_pack::{BufferError, FrozenBitmap, RoaringBitmap};

fn frozen(rb: &RoaringBitmap) -> FrozenBitmap<Vec<u8>> {
    FrozenBitmap::from_bytes(rb.freeze()).unwrap()
}

#[test]
fn freeze_round_trip() {
    let rb: RoaringBitmap = [1u32, 65_537, 131_073].into_iter().collect();
    let view = frozen(&rb);

    assert_eq!(view.to_roaring(), rb);
    assert_eq!(view, rb);
    assert!(view.contains((1 << 17) + 1));
    assert!(!view.contains(2));
}

#[test]
fn freeze_is_byte_identical_when_repeated() {
    let mut rb = RoaringBitmap::new();
    rb.insert_range(0..70_000);
    rb.extend([1_000_000u32, u32::MAX]);

    let first = rb.freeze();
    let second = rb.freeze();
    assert_eq!(first, second);

    // A thaw/freeze cycle reproduces the same bytes too.
    let thawed = FrozenBitmap::from_bytes(first.clone()).unwrap().to_roaring();
    assert_eq!(thawed.freeze(), first);
}

#[test]
fn all_shapes_survive_the_round_trip() {
    let mut rb = RoaringBitmap::new();
    rb.insert_range(0..65_536); // inverted (full)
    rb.insert_range(65_536..65_536 + 10_000); // bitmap
    rb.extend((0..100u32).map(|i| (2 << 16) + i * 7)); // array
    rb.insert_range((3 << 16)..(4 << 16) - 10); // inverted (nearly full)

    let view = frozen(&rb);
    assert_eq!(view.len(), rb.len());
    assert_eq!(view.to_roaring(), rb);
    assert!(view.iter().eq(rb.iter()));

    for n in (0..rb.len() as u32).step_by(4_999) {
        assert_eq!(view.select(n), rb.select(n));
        let value = rb.select(n).unwrap();
        assert_eq!(view.rank(value), u64::from(n) + 1);
    }
}

#[test]
fn empty_bitmap_round_trip() {
    let view = frozen(&RoaringBitmap::new());
    assert!(view.is_empty());
    assert_eq!(view.to_roaring(), RoaringBitmap::new());
}

#[test]
fn frozen_views_over_files() {
    let mut rb = RoaringBitmap::new();
    rb.insert_range(500..70_000);
    rb.insert(u32::MAX);

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("bitmap.frozen");
    std::fs::write(&path, rb.freeze()).unwrap();

    let view = FrozenBitmap::open(&path).unwrap();
    assert_eq!(view.len(), rb.len());
    assert_eq!(view.to_roaring(), rb);
    assert!(view.contains(69_999));
    assert!(!view.contains(70_000));

    // Two independent read-only views over the same file agree.
    let other = FrozenBitmap::open(&path).unwrap();
    assert_eq!(view, other);
}

#[test]
fn opening_a_corrupt_file_fails_with_invalid_data() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("corrupt.frozen");
    std::fs::write(&path, [0xFFu8; 7]).unwrap();

    let err = FrozenBitmap::open(&path).unwrap_err();
    assert_eq!(err.kind(), std::io::ErrorKind::InvalidData);
}

#[test]
fn truncated_buffers_are_rejected() {
    let rb: RoaringBitmap = (0..10_000).collect();
    let bytes = rb.freeze();

    for len in [0, 3, 16, bytes.len() - 1] {
        assert_eq!(
            FrozenBitmap::from_bytes(bytes[..len].to_vec()),
            Err(BufferError::Truncated),
            "length {len} should not validate"
        );
    }
}
