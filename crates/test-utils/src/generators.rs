//! Test data generators for synthetic density volumes.
//!
//! These generators create predictable, verifiable voxel patterns that
//! are used across the test suite.

/// Creates a volume with position-coded values.
///
/// Voxel (x, y, z) holds `x * 10000 + y * 100 + z`, so any test can
/// verify that a crop pulled the right voxels just by looking at them.
///
/// # Example
///
/// ```
/// use test_utils::coded_volume;
///
/// let data = coded_volume([4, 4, 4]);
/// assert_eq!(data.len(), 64);
/// assert_eq!(data[0], 0.0); // (0, 0, 0)
/// assert_eq!(data[1], 10_000.0); // (1, 0, 0)
/// assert_eq!(data[4], 100.0); // (0, 1, 0)
/// ```
pub fn coded_volume(extent: [u32; 3]) -> Vec<f32> {
    let mut data =
        Vec::with_capacity(extent.iter().map(|&n| n as usize).product::<usize>());
    for z in 0..extent[2] as i64 {
        for y in 0..extent[1] as i64 {
            for x in 0..extent[0] as i64 {
                data.push(coded_value(x, y, z));
            }
        }
    }
    data
}

/// The value [`coded_volume`] stores at voxel (x, y, z).
pub fn coded_value(x: i64, y: i64, z: i64) -> f32 {
    (x * 10_000 + y * 100 + z) as f32
}

/// Creates a volume holding a single Gaussian blob.
///
/// Looks like a real (if idealized) density map: smooth, peaked at
/// `center`, falling off with `sigma` in voxel units. Useful when a
/// test needs plausible non-constant data rather than coded indices.
pub fn gaussian_volume(extent: [u32; 3], center: [f64; 3], sigma: f64) -> Vec<f32> {
    let mut data =
        Vec::with_capacity(extent.iter().map(|&n| n as usize).product::<usize>());
    let s2 = 2.0 * sigma * sigma;
    for z in 0..extent[2] {
        for y in 0..extent[1] {
            for x in 0..extent[0] {
                let dx = x as f64 - center[0];
                let dy = y as f64 - center[1];
                let dz = z as f64 - center[2];
                data.push((-(dx * dx + dy * dy + dz * dz) / s2).exp() as f32);
            }
        }
    }
    data
}
