//! Integration test: write an MDV volume and query it end-to-end.
//!
//! 1. Generate a volume with position-coded values
//! 2. Write it to MDV format
//! 3. Serve box queries through VolumeDataService
//! 4. Verify the crop, the stats, and both wire encodings

use density_protocol::{decode_binary, decode_text};
use test_utils::{assert_values_approx_eq, coded_value, TestVolumeBuilder};
use volume_common::{OutputEncoding, QueryBox};
use volume_processor::{VolumeDataService, VolumeProcessorConfig, VolumeQuery};

fn service() -> VolumeDataService {
    let mut config = VolumeProcessorConfig::default();
    config.block_cache_size_mb = 32;
    VolumeDataService::new(config)
}

#[tokio::test]
async fn test_small_cartesian_box_at_finest_level() {
    // 100-cubed grid in a 100 A cell: one voxel per angstrom.
    let vol = TestVolumeBuilder::new()
        .extent([100, 100, 100])
        .block_size(32)
        .build()
        .unwrap();
    let service = service();

    let query = VolumeQuery::new("emdb", "emd-1")
        .with_box(QueryBox::cartesian([0.0, 0.0, 0.0], [10.0, 10.0, 10.0]));
    let response = service.query(&query, vol.path()).await.unwrap();

    assert_eq!(response.level, 0);
    assert_eq!(response.rate, 1);
    assert_eq!(response.origin, [0, 0, 0]);
    assert_eq!(response.dims, [11, 11, 11]);
    assert_eq!(response.voxel_count(), 1331);

    // Exact crop, never block-aligned padding.
    let mut i = 0;
    for z in 0..11 {
        for y in 0..11 {
            for x in 0..11 {
                assert_eq!(response.values[i], coded_value(x, y, z));
                i += 1;
            }
        }
    }
    assert!(response.stats.is_consistent());
    assert_eq!(response.stats.min, 0.0);
    assert_eq!(response.stats.max, coded_value(10, 10, 10) as f64);

    // Only block (0, 0, 0) covers indices 0..=10 with block size 32.
    assert_eq!(service.cache_stats().misses, 1);
}

#[tokio::test]
async fn test_corner_order_invariance() {
    let vol = TestVolumeBuilder::new()
        .extent([64, 64, 64])
        .cell(volume_common::UnitCell::orthogonal([50.0, 50.0, 50.0]))
        .build()
        .unwrap();
    let service = service();

    let a = [40.0, 5.0, 30.0];
    let b = [10.0, 45.0, 2.0];
    let fwd = VolumeQuery::new("emdb", "emd-1").with_box(QueryBox::cartesian(a, b));
    let rev = VolumeQuery::new("emdb", "emd-1").with_box(QueryBox::cartesian(b, a));

    let r1 = service.query(&fwd, vol.path()).await.unwrap();
    let r2 = service.query(&rev, vol.path()).await.unwrap();

    assert_eq!(r1.origin, r2.origin);
    assert_eq!(r1.dims, r2.dims);
    assert_eq!(r1.values, r2.values);
}

#[tokio::test]
async fn test_cell_box_equals_full_fractional_box() {
    let vol = TestVolumeBuilder::new().extent([40, 40, 40]).build().unwrap();
    let service = service();

    let cell = service
        .query(&VolumeQuery::new("emdb", "emd-1"), vol.path())
        .await
        .unwrap();
    let frac = service
        .query(
            &VolumeQuery::new("emdb", "emd-1")
                .with_box(QueryBox::fractional([0.0, 0.0, 0.0], [1.0, 1.0, 1.0])),
            vol.path(),
        )
        .await
        .unwrap();

    assert_eq!(cell.origin, frac.origin);
    assert_eq!(cell.dims, frac.dims);
    assert_eq!(cell.values, frac.values);
}

#[tokio::test]
async fn test_text_encoding_round_trip() {
    let vol = TestVolumeBuilder::new()
        .extent([16, 16, 16])
        .block_size(8)
        .gaussian(4.0)
        .build()
        .unwrap();
    let service = service();

    let query = VolumeQuery::new("emdb", "emd-1")
        .with_box(QueryBox::cartesian([10.0, 10.0, 10.0], [60.0, 60.0, 60.0]))
        .with_encoding(OutputEncoding::Text);

    let mut out = Vec::new();
    let response = service
        .query_to_writer(&query, vol.path(), &mut out)
        .await
        .unwrap();

    let decoded = decode_text(std::str::from_utf8(&out).unwrap()).unwrap();
    assert_eq!(decoded.dims, response.dims);
    assert_eq!(decoded.origin, response.origin);
    assert_values_approx_eq!(&decoded.values, &response.values);
}

#[tokio::test]
async fn test_binary_encoding_round_trip_is_exact() {
    let vol = TestVolumeBuilder::new()
        .extent([16, 16, 16])
        .block_size(8)
        .gaussian(4.0)
        .build()
        .unwrap();
    let service = service();

    let query = VolumeQuery::new("emdb", "emd-1");
    let mut out = Vec::new();
    let response = service
        .query_to_writer(&query, vol.path(), &mut out)
        .await
        .unwrap();

    assert_eq!(decode_binary(&out).unwrap(), response);
}

#[tokio::test]
async fn test_repeated_query_is_byte_identical() {
    let vol = TestVolumeBuilder::new()
        .extent([24, 24, 24])
        .gaussian(6.0)
        .build()
        .unwrap();
    let service = service();

    let query = VolumeQuery::new("emdb", "emd-1")
        .with_box(QueryBox::fractional([0.2, 0.2, 0.2], [0.8, 0.8, 0.8]));

    let mut first = Vec::new();
    let mut second = Vec::new();
    service
        .query_to_writer(&query, vol.path(), &mut first)
        .await
        .unwrap();
    // Second pass is served from the block cache.
    service
        .query_to_writer(&query, vol.path(), &mut second)
        .await
        .unwrap();

    assert_eq!(first, second);
    assert!(service.cache_stats().hits > 0);
}

#[tokio::test]
async fn test_box_outside_extent_yields_empty_result() {
    let vol = TestVolumeBuilder::new().extent([32, 32, 32]).build().unwrap();
    let service = service();

    let query = VolumeQuery::new("emdb", "emd-1")
        .with_box(QueryBox::cartesian([500.0, 500.0, 500.0], [600.0, 600.0, 600.0]));
    let response = service.query(&query, vol.path()).await.unwrap();

    assert!(response.is_empty());
    assert_eq!(response.dims, [0, 0, 0]);
    assert!(response.values.is_empty());
    assert_eq!(response.stats, volume_common::ValueStats::default());
}

#[tokio::test]
async fn test_zero_extent_box_yields_empty_result() {
    let vol = TestVolumeBuilder::new().extent([32, 32, 32]).build().unwrap();
    let service = service();

    // A flat box (same x on both corners) covers no volume.
    let query = VolumeQuery::new("emdb", "emd-1")
        .with_box(QueryBox::fractional([0.5, 0.1, 0.1], [0.5, 0.9, 0.9]));
    let response = service.query(&query, vol.path()).await.unwrap();

    assert_eq!(response.level, 0);
    assert!(response.is_empty());
    assert!(response.values.is_empty());
}

#[tokio::test]
async fn test_narrow_value_types_round_trip() {
    use mdv_parser::ValueType;

    // Values representable exactly in i16 survive storage untouched.
    let data: Vec<f32> = (0..512).map(|i| (i - 256) as f32).collect();
    let vol = TestVolumeBuilder::new()
        .extent([8, 8, 8])
        .block_size(8)
        .value_type(ValueType::I16)
        .data(data.clone())
        .build()
        .unwrap();
    let service = service();

    let response = service
        .query(&VolumeQuery::new("emdb", "emd-1"), vol.path())
        .await
        .unwrap();
    assert_eq!(response.values, data);
}
