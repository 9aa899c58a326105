//! Streaming encoders and matching decoders for both wire encodings.
//!
//! Determinism contract: identical `QueryResponse` input produces
//! byte-identical output. Field order is fixed, text floats use six
//! fixed decimals, and the binary form is little-endian throughout.
//!
//! Both encodings carry an explicit end marker (the `end` line, the
//! declared value count): a consumer can always tell a truncated
//! stream from a complete one.

use std::fmt::Write as _;

use thiserror::Error;
use tokio::io::{AsyncWrite, AsyncWriteExt};

use volume_common::{QueryBox, UnitCell, ValueStats, VolumeError, VolumeResult};

use crate::response::QueryResponse;

/// First line of every text document.
pub const TEXT_PREAMBLE: &str = "density-volume 1";

/// Magic bytes of the binary encoding.
pub const BINARY_MAGIC: [u8; 4] = *b"DVB1";

/// Binary encoding version.
pub const BINARY_VERSION: u32 = 1;

/// Values per write when streaming the value array.
const STREAM_CHUNK: usize = 4096;

/// Errors from decoding a wire document.
#[derive(Debug, Error)]
pub enum WireError {
    #[error("malformed document: {0}")]
    Malformed(String),

    #[error("document is truncated: {0}")]
    Truncated(String),
}

impl WireError {
    fn malformed(msg: impl Into<String>) -> Self {
        Self::Malformed(msg.into())
    }

    fn truncated(msg: impl Into<String>) -> Self {
        Self::Truncated(msg.into())
    }
}

// ===== Text encoding =====

/// Encode a response as the line-oriented text document.
///
/// Streams incrementally: the header lines first, then values in
/// fixed-size chunks, then the `end` marker. Never buffers the whole
/// output.
pub async fn encode_text<W>(response: &QueryResponse, writer: &mut W) -> VolumeResult<()>
where
    W: AsyncWrite + Unpin,
{
    let mut head = String::new();
    head.push_str(TEXT_PREAMBLE);
    head.push('\n');
    let _ = writeln!(head, "source {}", response.source_id);
    match &response.query_box {
        QueryBox::Cell => head.push_str("box cell\n"),
        QueryBox::Cartesian { a, b } | QueryBox::Fractional { a, b } => {
            let _ = write!(head, "box {}", response.query_box.kind_label());
            for v in a.iter().chain(b.iter()) {
                let _ = write!(head, " {:.6}", v);
            }
            head.push('\n');
        }
    }
    let _ = writeln!(
        head,
        "cell {} {:.6} {:.6} {:.6} {:.6} {:.6} {:.6}",
        response.cell.spacegroup,
        response.cell.size[0],
        response.cell.size[1],
        response.cell.size[2],
        response.cell.angles[0],
        response.cell.angles[1],
        response.cell.angles[2],
    );
    let _ = writeln!(head, "level {} {}", response.level, response.rate);
    let _ = writeln!(
        head,
        "origin {} {} {}",
        response.origin[0], response.origin[1], response.origin[2]
    );
    let _ = writeln!(
        head,
        "dims {} {} {}",
        response.dims[0], response.dims[1], response.dims[2]
    );
    let _ = writeln!(
        head,
        "stats {:.6} {:.6} {:.6} {:.6}",
        response.stats.min, response.stats.max, response.stats.mean, response.stats.sigma
    );
    head.push_str("values\n");
    writer
        .write_all(head.as_bytes())
        .await
        .map_err(|e| VolumeError::Encode(e.to_string()))?;

    let mut chunk = String::new();
    for block in response.values.chunks(STREAM_CHUNK) {
        chunk.clear();
        for v in block {
            let _ = writeln!(chunk, "{:.6}", v);
        }
        writer
            .write_all(chunk.as_bytes())
            .await
            .map_err(|e| VolumeError::Encode(e.to_string()))?;
    }

    writer
        .write_all(b"end\n")
        .await
        .map_err(|e| VolumeError::Encode(e.to_string()))?;
    writer
        .flush()
        .await
        .map_err(|e| VolumeError::Encode(e.to_string()))?;
    Ok(())
}

/// Parse a text document back into a response.
pub fn decode_text(input: &str) -> Result<QueryResponse, WireError> {
    let mut lines = input.lines();

    let preamble = lines
        .next()
        .ok_or_else(|| WireError::truncated("empty document"))?;
    if preamble != TEXT_PREAMBLE {
        return Err(WireError::malformed(format!(
            "bad preamble line {:?}",
            preamble
        )));
    }

    let source_id = expect_prefix(lines.next(), "source ")?.to_string();

    let box_line = expect_prefix(lines.next(), "box ")?;
    let query_box = parse_box(box_line)?;

    let cell_fields = parse_floats(expect_prefix(lines.next(), "cell ")?, 7)?;
    let cell = UnitCell {
        spacegroup: cell_fields[0] as u32,
        size: [cell_fields[1], cell_fields[2], cell_fields[3]],
        angles: [cell_fields[4], cell_fields[5], cell_fields[6]],
    };

    let level_fields = parse_floats(expect_prefix(lines.next(), "level ")?, 2)?;
    let origin_fields = parse_floats(expect_prefix(lines.next(), "origin ")?, 3)?;
    let dims_fields = parse_floats(expect_prefix(lines.next(), "dims ")?, 3)?;
    let stats_fields = parse_floats(expect_prefix(lines.next(), "stats ")?, 4)?;

    match lines.next() {
        Some("values") => {}
        other => {
            return Err(WireError::malformed(format!(
                "expected 'values' line, got {:?}",
                other
            )))
        }
    }

    let dims = [
        dims_fields[0] as u64,
        dims_fields[1] as u64,
        dims_fields[2] as u64,
    ];
    let count = dims
        .iter()
        .try_fold(1u64, |acc, &d| acc.checked_mul(d))
        .and_then(|c| usize::try_from(c).ok())
        .ok_or_else(|| WireError::malformed(format!("implausible dimensions {:?}", dims)))?;
    // Declared count is unverified until the lines run out; do not let
    // it size the allocation on its own.
    let mut values = Vec::with_capacity(count.min(1 << 20));
    for _ in 0..count {
        let line = lines
            .next()
            .ok_or_else(|| WireError::truncated("value list ended early"))?;
        values.push(
            line.trim()
                .parse::<f32>()
                .map_err(|_| WireError::malformed(format!("bad value line {:?}", line)))?,
        );
    }

    match lines.next() {
        Some("end") => {}
        other => {
            return Err(WireError::truncated(format!(
                "missing end marker, got {:?}",
                other
            )))
        }
    }

    Ok(QueryResponse {
        source_id,
        cell,
        query_box,
        level: level_fields[0] as usize,
        rate: level_fields[1] as u32,
        origin: [
            origin_fields[0] as i64,
            origin_fields[1] as i64,
            origin_fields[2] as i64,
        ],
        dims,
        stats: ValueStats {
            min: stats_fields[0],
            max: stats_fields[1],
            mean: stats_fields[2],
            sigma: stats_fields[3],
        },
        values,
    })
}

fn expect_prefix<'a>(line: Option<&'a str>, prefix: &str) -> Result<&'a str, WireError> {
    let line = line.ok_or_else(|| WireError::truncated(format!("missing {:?} line", prefix)))?;
    line.strip_prefix(prefix)
        .ok_or_else(|| WireError::malformed(format!("expected {:?} line, got {:?}", prefix, line)))
}

fn parse_box(body: &str) -> Result<QueryBox, WireError> {
    if body == "cell" {
        return Ok(QueryBox::Cell);
    }
    let (kind, rest) = body
        .split_once(' ')
        .ok_or_else(|| WireError::malformed(format!("bad box line {:?}", body)))?;
    let f = parse_floats(rest, 6)?;
    let a = [f[0], f[1], f[2]];
    let b = [f[3], f[4], f[5]];
    match kind {
        "cartn" => Ok(QueryBox::Cartesian { a, b }),
        "frac" => Ok(QueryBox::Fractional { a, b }),
        other => Err(WireError::malformed(format!("unknown box kind {:?}", other))),
    }
}

fn parse_floats(body: &str, expected: usize) -> Result<Vec<f64>, WireError> {
    let fields: Result<Vec<f64>, _> = body.split_whitespace().map(|t| t.parse()).collect();
    let fields =
        fields.map_err(|_| WireError::malformed(format!("bad numeric fields {:?}", body)))?;
    if fields.len() != expected {
        return Err(WireError::malformed(format!(
            "expected {} fields, got {} in {:?}",
            expected,
            fields.len(),
            body
        )));
    }
    Ok(fields)
}

// ===== Binary encoding =====

/// Encode a response as the packed binary document.
///
/// Header first, then the f32 value array streamed in chunks.
pub async fn encode_binary<W>(response: &QueryResponse, writer: &mut W) -> VolumeResult<()>
where
    W: AsyncWrite + Unpin,
{
    let mut head = Vec::with_capacity(256);
    head.extend_from_slice(&BINARY_MAGIC);
    head.extend_from_slice(&BINARY_VERSION.to_le_bytes());

    let source = response.source_id.as_bytes();
    head.extend_from_slice(&(source.len() as u32).to_le_bytes());
    head.extend_from_slice(source);

    match &response.query_box {
        QueryBox::Cell => head.push(0),
        QueryBox::Cartesian { a, b } => {
            head.push(1);
            for v in a.iter().chain(b.iter()) {
                head.extend_from_slice(&v.to_le_bytes());
            }
        }
        QueryBox::Fractional { a, b } => {
            head.push(2);
            for v in a.iter().chain(b.iter()) {
                head.extend_from_slice(&v.to_le_bytes());
            }
        }
    }

    head.extend_from_slice(&response.cell.spacegroup.to_le_bytes());
    for v in response.cell.size.iter().chain(response.cell.angles.iter()) {
        head.extend_from_slice(&v.to_le_bytes());
    }

    head.extend_from_slice(&(response.level as u32).to_le_bytes());
    head.extend_from_slice(&response.rate.to_le_bytes());
    for v in response.origin {
        head.extend_from_slice(&v.to_le_bytes());
    }
    for v in response.dims {
        head.extend_from_slice(&v.to_le_bytes());
    }
    for v in [
        response.stats.min,
        response.stats.max,
        response.stats.mean,
        response.stats.sigma,
    ] {
        head.extend_from_slice(&v.to_le_bytes());
    }

    writer
        .write_all(&head)
        .await
        .map_err(|e| VolumeError::Encode(e.to_string()))?;

    let mut chunk = Vec::with_capacity(STREAM_CHUNK * 4);
    for block in response.values.chunks(STREAM_CHUNK) {
        chunk.clear();
        for v in block {
            chunk.extend_from_slice(&v.to_le_bytes());
        }
        writer
            .write_all(&chunk)
            .await
            .map_err(|e| VolumeError::Encode(e.to_string()))?;
    }
    writer
        .flush()
        .await
        .map_err(|e| VolumeError::Encode(e.to_string()))?;
    Ok(())
}

/// Parse a binary document back into a response.
pub fn decode_binary(input: &[u8]) -> Result<QueryResponse, WireError> {
    let mut cur = Cursor { buf: input, pos: 0 };

    let magic = cur.take(4)?;
    if magic != BINARY_MAGIC {
        return Err(WireError::malformed(format!("bad magic {:?}", magic)));
    }
    let version = cur.u32()?;
    if version != BINARY_VERSION {
        return Err(WireError::malformed(format!(
            "unsupported binary version {}",
            version
        )));
    }

    let source_len = cur.u32()? as usize;
    let source_id = std::str::from_utf8(cur.take(source_len)?)
        .map_err(|_| WireError::malformed("source id is not UTF-8"))?
        .to_string();

    let kind = cur.take(1)?[0];
    let query_box = match kind {
        0 => QueryBox::Cell,
        1 | 2 => {
            let mut f = [0.0f64; 6];
            for v in &mut f {
                *v = cur.f64()?;
            }
            let a = [f[0], f[1], f[2]];
            let b = [f[3], f[4], f[5]];
            if kind == 1 {
                QueryBox::Cartesian { a, b }
            } else {
                QueryBox::Fractional { a, b }
            }
        }
        other => {
            return Err(WireError::malformed(format!("unknown box kind tag {}", other)))
        }
    };

    let spacegroup = cur.u32()?;
    let size = [cur.f64()?, cur.f64()?, cur.f64()?];
    let angles = [cur.f64()?, cur.f64()?, cur.f64()?];

    let level = cur.u32()? as usize;
    let rate = cur.u32()?;
    let origin = [cur.i64()?, cur.i64()?, cur.i64()?];
    let dims = [cur.u64()?, cur.u64()?, cur.u64()?];
    let stats = ValueStats {
        min: cur.f64()?,
        max: cur.f64()?,
        mean: cur.f64()?,
        sigma: cur.f64()?,
    };

    // The dimensions come off the wire; reject products that overflow
    // instead of trusting them to size an allocation.
    let byte_len = dims
        .iter()
        .try_fold(1u64, |acc, &d| acc.checked_mul(d))
        .and_then(|count| count.checked_mul(4))
        .and_then(|bytes| usize::try_from(bytes).ok())
        .ok_or_else(|| WireError::malformed(format!("implausible dimensions {:?}", dims)))?;
    let count = byte_len / 4;
    let raw = cur.take(byte_len).map_err(|_| {
        WireError::truncated(format!(
            "value array holds fewer than the declared {} voxels",
            count
        ))
    })?;
    let mut values = Vec::with_capacity(count);
    for quad in raw.chunks_exact(4) {
        values.push(f32::from_le_bytes([quad[0], quad[1], quad[2], quad[3]]));
    }

    Ok(QueryResponse {
        source_id,
        cell: UnitCell {
            spacegroup,
            size,
            angles,
        },
        query_box,
        level,
        rate,
        origin,
        dims,
        stats,
        values,
    })
}

struct Cursor<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> Cursor<'a> {
    fn take(&mut self, n: usize) -> Result<&'a [u8], WireError> {
        if self.pos + n > self.buf.len() {
            return Err(WireError::truncated(format!(
                "need {} bytes at offset {}, have {}",
                n,
                self.pos,
                self.buf.len() - self.pos
            )));
        }
        let out = &self.buf[self.pos..self.pos + n];
        self.pos += n;
        Ok(out)
    }

    fn u32(&mut self) -> Result<u32, WireError> {
        let b = self.take(4)?;
        Ok(u32::from_le_bytes([b[0], b[1], b[2], b[3]]))
    }

    fn eight(&mut self) -> Result<[u8; 8], WireError> {
        let b = self.take(8)?;
        Ok([b[0], b[1], b[2], b[3], b[4], b[5], b[6], b[7]])
    }

    fn u64(&mut self) -> Result<u64, WireError> {
        Ok(u64::from_le_bytes(self.eight()?))
    }

    fn i64(&mut self) -> Result<i64, WireError> {
        Ok(i64::from_le_bytes(self.eight()?))
    }

    fn f64(&mut self) -> Result<f64, WireError> {
        Ok(f64::from_le_bytes(self.eight()?))
    }
}
