//! Metadata document describing a source volume.

use serde::{Deserialize, Serialize};

use mdv_parser::{available_precisions, HeaderSummary, PrecisionTier};

/// The extended header served to clients before they query.
///
/// Serialized as JSON. An unavailable source (missing or unreadable
/// file) still gets a well-formed document with `is_available: false`
/// so clients can distinguish "no such volume" from a transport error.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HeaderInfo {
    pub source_id: String,
    pub is_available: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub header: Option<HeaderSummary>,
    pub available_precisions: Vec<PrecisionTier>,
}

impl HeaderInfo {
    /// Build the document for a readable volume.
    pub fn from_header(source_id: &str, header: &mdv_parser::Header, budgets: &[u64]) -> Self {
        let finest_voxels = header.levels[0].voxel_count();
        Self {
            source_id: source_id.to_string(),
            is_available: true,
            header: Some(header.summary()),
            available_precisions: available_precisions(finest_voxels, budgets),
        }
    }

    /// Build the document for a volume that could not be opened.
    pub fn unavailable(source_id: &str) -> Self {
        Self {
            source_id: source_id.to_string(),
            is_available: false,
            header: None,
            available_precisions: Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mdv_parser::{LevelSummary, ValueType};
    use volume_common::{UnitCell, ValueStats};

    #[test]
    fn test_unavailable_serializes_without_header() {
        let info = HeaderInfo::unavailable("emd-9999");
        let json = serde_json::to_value(&info).unwrap();
        assert_eq!(json["isAvailable"], false);
        assert!(json.get("header").is_none());
        assert_eq!(json["availablePrecisions"].as_array().unwrap().len(), 0);
    }

    #[test]
    fn test_round_trips_through_json() {
        let info = HeaderInfo {
            source_id: "emdb/emd-1234".to_string(),
            is_available: true,
            header: Some(HeaderSummary {
                format_version: 1,
                value_type: ValueType::F32,
                cell: UnitCell::orthogonal([100.0, 100.0, 100.0]),
                grid_extent: [64, 64, 64],
                origin_frac: [0.0; 3],
                box_frac: [1.0; 3],
                sampling: vec![LevelSummary {
                    rate: 1,
                    sample_count: [64, 64, 64],
                    block_size: 32,
                    stats: ValueStats::default(),
                }],
            }),
            available_precisions: vec![PrecisionTier {
                precision: 0,
                max_voxels: 1 << 20,
            }],
        };
        let json = serde_json::to_string(&info).unwrap();
        let back: HeaderInfo = serde_json::from_str(&json).unwrap();
        assert_eq!(back.source_id, info.source_id);
        let header = back.header.unwrap();
        assert_eq!(header.grid_extent, [64, 64, 64]);
        assert_eq!(header.sampling[0].rate, 1);
        assert_eq!(back.available_precisions.len(), 1);
    }
}
