//! Mean downsampling for coarser level generation.

/// Halve a dense grid along every axis by averaging 2x2x2 neighborhoods.
///
/// Output dimensions are `ceil(dim / 2)` per axis; edge cells average
/// whatever source voxels exist (1, 2, 4, or 8 of them).
pub fn halve(data: &[f32], dims: [u32; 3]) -> (Vec<f32>, [u32; 3]) {
    let [nx, ny, nz] = dims.map(|d| d as usize);
    debug_assert_eq!(data.len(), nx * ny * nz);

    let out_dims = dims.map(|d| d.div_ceil(2));
    let [ox, oy, oz] = out_dims.map(|d| d as usize);
    let mut out = Vec::with_capacity(ox * oy * oz);

    for z in 0..oz {
        for y in 0..oy {
            for x in 0..ox {
                let mut sum = 0.0f64;
                let mut count = 0u32;
                for dz in 0..2 {
                    for dy in 0..2 {
                        for dx in 0..2 {
                            let (sx, sy, sz) = (2 * x + dx, 2 * y + dy, 2 * z + dz);
                            if sx < nx && sy < ny && sz < nz {
                                sum += data[(sz * ny + sy) * nx + sx] as f64;
                                count += 1;
                            }
                        }
                    }
                }
                out.push((sum / count as f64) as f32);
            }
        }
    }

    (out, out_dims)
}
