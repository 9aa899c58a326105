//! An opened volume file: parsed header plus a shared read handle.

use std::fs::File;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use mdv_parser::{ByteRange, Header};
use volume_common::{VolumeError, VolumeResult};

use crate::cache::hash_path;

/// An open MDV file.
///
/// The header is parsed and validated once at open time; after that the
/// struct is immutable and shared across concurrent queries behind an
/// `Arc`. All payload access goes through positioned reads, so no seek
/// state exists to race on.
#[derive(Debug)]
pub struct VolumeFile {
    path: PathBuf,
    path_hash: u64,
    header: Header,
    file: File,
}

impl VolumeFile {
    /// Open a file and validate its header against the file length.
    pub fn open(path: &Path) -> VolumeResult<Self> {
        let file = File::open(path)?;
        let file_len = file.metadata()?.len();

        let mut reader = &file;
        let header = Header::parse(&mut reader)?;
        header.validate(file_len)?;

        tracing::debug!(
            path = %path.display(),
            levels = header.levels.len(),
            value_type = ?header.value_type,
            "opened volume file"
        );

        Ok(Self {
            path: path.to_owned(),
            path_hash: hash_path(path),
            header,
            file,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Stable hash of the path, used as the cache-key prefix.
    pub fn path_hash(&self) -> u64 {
        self.path_hash
    }

    pub fn header(&self) -> &Header {
        &self.header
    }

    /// Read one block payload with a positioned read.
    ///
    /// A read that comes up short against the index's byte range means
    /// the file was truncated after its header was written.
    pub fn read_block(&self, range: ByteRange) -> VolumeResult<Vec<u8>> {
        let mut buf = vec![0u8; range.len as usize];
        self.read_exact_at(&mut buf, range.offset).map_err(|e| {
            if e.kind() == ErrorKind::UnexpectedEof {
                VolumeError::truncated(format!(
                    "block at offset {} ({} bytes) extends past the end of {}",
                    range.offset,
                    range.len,
                    self.path.display()
                ))
            } else {
                VolumeError::from(e)
            }
        })?;
        Ok(buf)
    }

    #[cfg(unix)]
    fn read_exact_at(&self, buf: &mut [u8], offset: u64) -> std::io::Result<()> {
        use std::os::unix::fs::FileExt;
        self.file.read_exact_at(buf, offset)
    }

    #[cfg(windows)]
    fn read_exact_at(&self, buf: &mut [u8], offset: u64) -> std::io::Result<()> {
        use std::os::windows::fs::FileExt;
        let mut filled = 0usize;
        while filled < buf.len() {
            let n = self.file.seek_read(&mut buf[filled..], offset + filled as u64)?;
            if n == 0 {
                return Err(std::io::Error::new(
                    ErrorKind::UnexpectedEof,
                    "failed to fill whole buffer",
                ));
            }
            filled += n;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mdv_parser::{MdvWriter, ValueType};
    use volume_common::UnitCell;

    fn write_fixture(dir: &Path) -> PathBuf {
        let path = dir.join("vol.mdv");
        let extent = [8u32, 8, 8];
        let data: Vec<f32> = (0..512).map(|i| i as f32).collect();
        MdvWriter::new(UnitCell::orthogonal([10.0, 10.0, 10.0]), [0.0; 3], [1.0; 3])
            .with_value_type(ValueType::F32)
            .with_block_size(4)
            .write(&path, &data, extent, 1)
            .unwrap();
        path
    }

    #[test]
    fn test_open_and_read_block() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_fixture(dir.path());

        let vol = VolumeFile::open(&path).unwrap();
        assert_eq!(vol.header().levels.len(), 1);

        let range = vol.header().levels[0].index.entry([0, 0, 0]).unwrap();
        let raw = vol.read_block(range).unwrap();
        assert_eq!(raw.len() as u64, range.len);
    }

    #[test]
    fn test_truncated_file_detected_on_read() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_fixture(dir.path());

        // Chop the payload but keep the header intact.
        let full = std::fs::read(&path).unwrap();
        std::fs::write(&path, &full[..full.len() - 64]).unwrap();

        // Header validation now sees ranges past the end.
        assert!(matches!(
            VolumeFile::open(&path).unwrap_err(),
            VolumeError::Format(_) | VolumeError::TruncatedData(_)
        ));
    }

    #[test]
    fn test_missing_file_is_not_found() {
        let err = VolumeFile::open(Path::new("/no/such/file.mdv")).unwrap_err();
        assert!(matches!(err, VolumeError::NotFound(_)));
    }
}
