//! Deterministic output filenames for query results.

use std::fmt::Write as _;

use volume_common::{Detail, OutputEncoding, QueryBox};

/// Build the download filename for a query result.
///
/// Layout: `<source>_<id>-<box>_<detail>.<ext>` where the box part is
/// `cell` or `<kind>_<a>_<b>` with corners rounded to 0.1. Source and
/// id are lowercased with whitespace stripped so the name is safe to
/// hand to a browser.
pub fn output_filename(
    source: &str,
    id: &str,
    query_box: &QueryBox,
    detail: &Detail,
    encoding: OutputEncoding,
) -> String {
    let mut box_part = String::new();
    match query_box {
        QueryBox::Cell => box_part.push_str("cell"),
        QueryBox::Cartesian { a, b } | QueryBox::Fractional { a, b } => {
            box_part.push_str(query_box.kind_label());
            for v in a.iter().chain(b.iter()) {
                let _ = write!(box_part, "_{}", round_tenth(*v));
            }
        }
    }
    format!(
        "{}_{}-{}_{}.{}",
        normalize(source),
        normalize(id),
        box_part,
        detail.label(),
        encoding.extension()
    )
}

fn normalize(s: &str) -> String {
    s.chars()
        .filter(|c| !c.is_whitespace())
        .flat_map(char::to_lowercase)
        .collect()
}

/// Rounds to one decimal; relies on f64 shortest-display so `1.0`
/// prints as `1` and `1.5` as `1.5`.
fn round_tenth(v: f64) -> f64 {
    (v * 10.0).round() / 10.0
}
