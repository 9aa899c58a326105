//! Query box union and output encoding selector.

use serde::{Deserialize, Serialize};

/// The spatial region a query asks for.
///
/// Boxes arrive in one of three coordinate systems. Corner order is
/// not significant; the coordinate mapper normalizes each axis pair so
/// `a <= b` before resolving voxel indices.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind")]
pub enum QueryBox {
    /// The whole stored region of the unit cell.
    Cell,
    /// Two opposite corners in Cartesian (ångström) coordinates.
    Cartesian { a: [f64; 3], b: [f64; 3] },
    /// Two opposite corners in fractional unit-cell coordinates.
    Fractional { a: [f64; 3], b: [f64; 3] },
}

impl QueryBox {
    /// Create a Cartesian box from two opposite corners.
    pub fn cartesian(a: [f64; 3], b: [f64; 3]) -> Self {
        Self::Cartesian { a, b }
    }

    /// Create a fractional box from two opposite corners.
    pub fn fractional(a: [f64; 3], b: [f64; 3]) -> Self {
        Self::Fractional { a, b }
    }

    /// Sort two corners per axis so the first is the minimum.
    pub fn sorted_corners(a: [f64; 3], b: [f64; 3]) -> ([f64; 3], [f64; 3]) {
        let mut lo = [0.0; 3];
        let mut hi = [0.0; 3];
        for i in 0..3 {
            lo[i] = a[i].min(b[i]);
            hi[i] = a[i].max(b[i]);
        }
        (lo, hi)
    }

    /// Short label used in output filenames and logs.
    pub fn kind_label(&self) -> &'static str {
        match self {
            Self::Cell => "cell",
            Self::Cartesian { .. } => "cartn",
            Self::Fractional { .. } => "frac",
        }
    }
}

/// How the sampling level should be chosen for a query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Detail {
    /// Precision hint: index into the voxel-budget table, 0 = highest.
    /// Values past the end of the table clamp to the coarsest tier.
    Precision(usize),
    /// Explicit sampling level index; always wins, no budget check.
    ForcedLevel(usize),
}

impl Default for Detail {
    fn default() -> Self {
        Self::Precision(0)
    }
}

impl Detail {
    /// Short label used in output filenames and logs.
    pub fn label(&self) -> String {
        match self {
            Self::Precision(d) => format!("d{}", d),
            Self::ForcedLevel(l) => format!("l{}", l),
        }
    }
}

/// Which exchange encoding the caller wants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputEncoding {
    /// Human-diffable text document.
    Text,
    /// Compact packed-binary document.
    #[default]
    Binary,
}

impl OutputEncoding {
    /// File extension for this encoding.
    pub fn extension(&self) -> &'static str {
        match self {
            Self::Text => "dvtxt",
            Self::Binary => "dvbin",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sorted_corners() {
        let (lo, hi) = QueryBox::sorted_corners([5.0, -1.0, 3.0], [2.0, 4.0, 3.0]);
        assert_eq!(lo, [2.0, -1.0, 3.0]);
        assert_eq!(hi, [5.0, 4.0, 3.0]);
    }

    #[test]
    fn test_box_serde_tagging() {
        let b = QueryBox::cartesian([0.0, 0.0, 0.0], [10.0, 10.0, 10.0]);
        let json = serde_json::to_value(&b).unwrap();
        assert_eq!(json["kind"], "Cartesian");

        let parsed: QueryBox = serde_json::from_value(json).unwrap();
        assert_eq!(parsed, b);

        let cell: QueryBox = serde_json::from_str(r#"{"kind":"Cell"}"#).unwrap();
        assert_eq!(cell, QueryBox::Cell);
    }

    #[test]
    fn test_kind_labels() {
        assert_eq!(QueryBox::Cell.kind_label(), "cell");
        assert_eq!(
            QueryBox::fractional([0.0; 3], [1.0; 3]).kind_label(),
            "frac"
        );
    }
}
