//! Box query parameters for a density volume.

use serde::{Deserialize, Serialize};

use volume_common::{Detail, OutputEncoding, QueryBox};

/// A fully specified box query against one source volume.
///
/// Built with the fluent methods:
///
/// ```rust,ignore
/// let query = VolumeQuery::new("emdb", "emd-1234")
///     .with_box(QueryBox::cartesian([0.0, 0.0, 0.0], [10.0, 10.0, 10.0]))
///     .with_detail(Detail::Precision(2))
///     .with_encoding(OutputEncoding::Text);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VolumeQuery {
    /// Data source name (e.g. "emdb", "xray").
    pub source: String,
    /// Entry identifier within the source.
    pub id: String,
    /// The region to extract. Defaults to the whole stored box.
    pub query_box: QueryBox,
    /// Requested detail, advisory unless a level is forced.
    pub detail: Detail,
    /// Wire encoding of the result.
    pub encoding: OutputEncoding,
}

impl VolumeQuery {
    /// A whole-cell query at default detail.
    pub fn new(source: impl Into<String>, id: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            id: id.into(),
            query_box: QueryBox::Cell,
            detail: Detail::default(),
            encoding: OutputEncoding::default(),
        }
    }

    /// Set the query box.
    pub fn with_box(mut self, query_box: QueryBox) -> Self {
        self.query_box = query_box;
        self
    }

    /// Set the requested detail.
    pub fn with_detail(mut self, detail: Detail) -> Self {
        self.detail = detail;
        self
    }

    /// Set the output encoding.
    pub fn with_encoding(mut self, encoding: OutputEncoding) -> Self {
        self.encoding = encoding;
        self
    }

    /// The download filename for this query's result.
    pub fn output_filename(&self) -> String {
        density_protocol::output_filename(
            &self.source,
            &self.id,
            &self.query_box,
            &self.detail,
            self.encoding,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_defaults() {
        let q = VolumeQuery::new("emdb", "emd-1234");
        assert_eq!(q.query_box, QueryBox::Cell);
        assert_eq!(q.detail, Detail::Precision(0));
        assert_eq!(q.encoding, OutputEncoding::Binary);
    }

    #[test]
    fn test_filename_follows_query() {
        let q = VolumeQuery::new("emdb", "EMD-1234")
            .with_detail(Detail::ForcedLevel(2))
            .with_encoding(OutputEncoding::Text);
        assert_eq!(q.output_filename(), "emdb_emd-1234-cell_l2.dvtxt");
    }
}
