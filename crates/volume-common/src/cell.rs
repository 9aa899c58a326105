//! Unit-cell geometry and coordinate transforms.
//!
//! A crystallographic unit cell is described by three edge lengths and
//! three angles. Cartesian query boxes are converted into fractional
//! coordinates through the inverse of the cell's orthogonalization
//! matrix before they are mapped onto the voxel grid.

use nalgebra::{Matrix3, Vector3};
use serde::{Deserialize, Serialize};

use crate::error::{VolumeError, VolumeResult};

/// Unit-cell geometry: edge lengths in ångströms, angles in radians.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct UnitCell {
    /// Space-group number.
    pub spacegroup: u32,
    /// Edge lengths (a, b, c) in Å.
    pub size: [f64; 3],
    /// Angles (alpha, beta, gamma) in radians.
    pub angles: [f64; 3],
}

impl UnitCell {
    /// Create a cell, validating that lengths are positive and angles
    /// lie strictly between 0 and pi.
    pub fn new(spacegroup: u32, size: [f64; 3], angles: [f64; 3]) -> VolumeResult<Self> {
        if size.iter().any(|&s| !(s > 0.0) || !s.is_finite()) {
            return Err(VolumeError::format(format!(
                "unit cell lengths must be positive, got {:?}",
                size
            )));
        }
        if angles
            .iter()
            .any(|&a| !(a > 0.0) || a >= std::f64::consts::PI)
        {
            return Err(VolumeError::format(format!(
                "unit cell angles must be in (0, pi) radians, got {:?}",
                angles
            )));
        }
        Ok(Self {
            spacegroup,
            size,
            angles,
        })
    }

    /// An orthogonal (all angles 90 degrees) cell, common for EM maps.
    pub fn orthogonal(size: [f64; 3]) -> Self {
        let right = std::f64::consts::FRAC_PI_2;
        Self {
            spacegroup: 1,
            size,
            angles: [right, right, right],
        }
    }

    /// The orthogonalization matrix: fractional -> Cartesian.
    ///
    /// Standard crystallographic convention with `a` along the x axis
    /// and `b` in the xy plane.
    pub fn orthogonalization(&self) -> Matrix3<f64> {
        let [a, b, c] = self.size;
        let [alpha, beta, gamma] = self.angles;
        let (cos_a, cos_b, cos_g) = (alpha.cos(), beta.cos(), gamma.cos());
        let sin_g = gamma.sin();

        let v = (1.0 - cos_a * cos_a - cos_b * cos_b - cos_g * cos_g
            + 2.0 * cos_a * cos_b * cos_g)
            .max(0.0)
            .sqrt();

        Matrix3::new(
            a,
            b * cos_g,
            c * cos_b,
            0.0,
            b * sin_g,
            c * (cos_a - cos_b * cos_g) / sin_g,
            0.0,
            0.0,
            c * v / sin_g,
        )
    }

    /// The fractionalization matrix: Cartesian -> fractional.
    pub fn fractionalization(&self) -> VolumeResult<Matrix3<f64>> {
        self.orthogonalization().try_inverse().ok_or_else(|| {
            VolumeError::format("unit cell orthogonalization matrix is singular")
        })
    }

    /// Convert a Cartesian point to fractional coordinates.
    pub fn to_fractional(&self, cart: [f64; 3]) -> VolumeResult<[f64; 3]> {
        let f = self.fractionalization()? * Vector3::from(cart);
        Ok([f.x, f.y, f.z])
    }

    /// Convert a fractional point to Cartesian coordinates.
    pub fn to_cartesian(&self, frac: [f64; 3]) -> [f64; 3] {
        let c = self.orthogonalization() * Vector3::from(frac);
        [c.x, c.y, c.z]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_close(a: [f64; 3], b: [f64; 3]) {
        for i in 0..3 {
            assert!(
                (a[i] - b[i]).abs() < 1e-9,
                "axis {}: {} vs {}",
                i,
                a[i],
                b[i]
            );
        }
    }

    #[test]
    fn test_orthogonal_cell_transform() {
        let cell = UnitCell::orthogonal([100.0, 50.0, 25.0]);
        let frac = cell.to_fractional([50.0, 25.0, 12.5]).unwrap();
        assert_close(frac, [0.5, 0.5, 0.5]);
        assert_close(cell.to_cartesian(frac), [50.0, 25.0, 12.5]);
    }

    #[test]
    fn test_triclinic_round_trip() {
        let cell = UnitCell::new(
            1,
            [63.2, 84.9, 107.8],
            [1.396, 1.570, 2.094], // ~80, ~90, ~120 degrees
        )
        .unwrap();

        let points = [[0.0, 0.0, 0.0], [10.0, -5.0, 30.0], [63.2, 84.9, 107.8]];
        for p in points {
            let frac = cell.to_fractional(p).unwrap();
            assert_close(cell.to_cartesian(frac), p);
        }
    }

    #[test]
    fn test_invalid_cell_rejected() {
        assert!(UnitCell::new(1, [0.0, 1.0, 1.0], [1.5, 1.5, 1.5]).is_err());
        assert!(UnitCell::new(1, [1.0, 1.0, 1.0], [0.0, 1.5, 1.5]).is_err());
        assert!(UnitCell::new(1, [1.0, 1.0, 1.0], [1.5, 1.5, 3.2]).is_err());
    }
}
