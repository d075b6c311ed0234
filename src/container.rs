//! ZIP container abstraction for XLSX workbooks.
//!
//! The archive bytes are held once behind an `Arc`, so every part can be
//! opened as an independent, owned, forward-only stream that inflates on
//! demand. Several sheet readers and the shared string table can therefore
//! stream from the same archive at the same time.

use crate::error::{Error, Result};
use flate2::read::DeflateDecoder;
use std::cell::RefCell;
use std::fs::File;
use std::io::{self, BufRead, BufReader, Cursor, Read, Take};
use std::path::Path;
use std::sync::Arc;

/// Cheaply clonable view of the raw archive bytes.
#[derive(Clone)]
struct SharedBytes(Arc<[u8]>);

impl AsRef<[u8]> for SharedBytes {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

type RawSlice = Take<Cursor<SharedBytes>>;

enum PartInner {
    Stored(RawSlice),
    Deflated(DeflateDecoder<RawSlice>),
}

/// An owned, streaming reader over one decompressed archive part.
pub struct PartStream {
    name: String,
    inner: PartInner,
    size: u64,
}

impl PartStream {
    /// Part name inside the archive.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Declared uncompressed size of the part.
    pub fn size(&self) -> u64 {
        self.size
    }
}

impl Read for PartStream {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        match &mut self.inner {
            PartInner::Stored(r) => r.read(buf),
            PartInner::Deflated(r) => r.read(buf),
        }
    }
}

impl std::fmt::Debug for PartStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PartStream")
            .field("name", &self.name)
            .field("size", &self.size)
            .finish()
    }
}

const UTF8_BOM: [u8; 3] = [0xEF, 0xBB, 0xBF];

/// Decode XML bytes into a string, dropping a UTF-8 byte order mark.
pub fn decode_xml_bytes(bytes: &[u8]) -> String {
    let bytes = bytes.strip_prefix(&UTF8_BOM).unwrap_or(bytes);
    String::from_utf8_lossy(bytes).into_owned()
}

/// Consume a leading UTF-8 byte order mark from a stream.
///
/// Returns the number of bytes skipped. The XML reader drops a BOM without
/// counting it, so stream offsets start from this base. A read error is
/// left for the XML reader to report.
pub fn skip_bom<R: BufRead>(source: &mut R) -> u64 {
    let has_bom = source
        .fill_buf()
        .map(|head| head.starts_with(&UTF8_BOM))
        .unwrap_or(false);
    if has_bom {
        source.consume(UTF8_BOM.len());
        UTF8_BOM.len() as u64
    } else {
        0
    }
}

/// XLSX container abstraction over a ZIP archive.
pub struct OoxmlContainer {
    data: SharedBytes,
    archive: RefCell<zip::ZipArchive<Cursor<SharedBytes>>>,
}

impl OoxmlContainer {
    /// Open a container from a file path.
    ///
    /// # Example
    ///
    /// ```no_run
    /// use sheetbind::container::OoxmlContainer;
    ///
    /// let container = OoxmlContainer::open("workbook.xlsx")?;
    /// # Ok::<(), sheetbind::Error>(())
    /// ```
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let file = File::open(path.as_ref())?;
        Self::from_reader(BufReader::new(file))
    }

    /// Create a container from a byte vector.
    pub fn from_bytes(data: Vec<u8>) -> Result<Self> {
        let data = SharedBytes(Arc::from(data));
        let archive = zip::ZipArchive::new(Cursor::new(data.clone()))?;
        tracing::debug!(parts = archive.len(), "opened archive");
        Ok(Self {
            data,
            archive: RefCell::new(archive),
        })
    }

    /// Create a container from any reader.
    pub fn from_reader<R: Read>(mut reader: R) -> Result<Self> {
        let mut data = Vec::new();
        reader.read_to_end(&mut data)?;
        Self::from_bytes(data)
    }

    /// Open a part as an owned decompressing stream.
    pub fn open_part(&self, path: &str) -> Result<PartStream> {
        let path = path.trim_start_matches('/');
        let (method, start, compressed, size) = {
            let mut archive = self.archive.borrow_mut();
            let file = archive
                .by_name(path)
                .map_err(|_| Error::MissingComponent(path.to_string()))?;
            (
                file.compression(),
                file.data_start(),
                file.compressed_size(),
                file.size(),
            )
        };

        let mut cursor = Cursor::new(self.data.clone());
        cursor.set_position(start);
        let raw = cursor.take(compressed);
        let inner = match method {
            zip::CompressionMethod::Stored => PartInner::Stored(raw),
            zip::CompressionMethod::Deflated => PartInner::Deflated(DeflateDecoder::new(raw)),
            other => {
                return Err(Error::UnsupportedFormat(format!(
                    "{} uses compression {:?}",
                    path, other
                )))
            }
        };

        Ok(PartStream {
            name: path.to_string(),
            inner,
            size,
        })
    }

    /// Read a whole XML part into a string.
    pub fn read_xml(&self, path: &str) -> Result<String> {
        let mut part = self.open_part(path)?;
        let mut bytes = Vec::new();
        part.read_to_end(&mut bytes)?;
        Ok(decode_xml_bytes(&bytes))
    }

    /// Check if a part exists in the archive.
    pub fn exists(&self, path: &str) -> bool {
        let path = path.trim_start_matches('/');
        let archive = self.archive.borrow();
        let found = archive.file_names().any(|n| n == path);
        found
    }

    /// List all parts in the archive.
    pub fn list_files(&self) -> Vec<String> {
        let archive = self.archive.borrow();
        archive.file_names().map(String::from).collect()
    }

    /// Resolve a relative path from a base path.
    pub fn resolve_path(base: &str, relative: &str) -> String {
        if let Some(stripped) = relative.strip_prefix('/') {
            return stripped.to_string();
        }

        let base_path = Path::new(base);
        let base_dir = base_path.parent().unwrap_or(Path::new(""));

        let mut result = base_dir.to_path_buf();
        for component in Path::new(relative).components() {
            match component {
                std::path::Component::ParentDir => {
                    result.pop();
                }
                std::path::Component::Normal(c) => {
                    result.push(c);
                }
                _ => {}
            }
        }

        result.to_string_lossy().replace('\\', "/")
    }
}

impl std::fmt::Debug for OoxmlContainer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OoxmlContainer")
            .field("files", &self.list_files().len())
            .finish()
    }
}
