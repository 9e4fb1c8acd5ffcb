//! XML sources and the streaming item extractor

pub mod dates;
pub mod extractor;

pub use extractor::{RawRecord, RawValue, StreamingExtractor};

use std::fmt;
use std::fs::File;
use std::io::{self, BufReader, Chain, Cursor, Read};
use std::path::PathBuf;

/// Where the export document comes from
pub enum XmlSource {
    /// XML document held as a string
    String(String),
    /// XML document held as bytes
    Bytes(Vec<u8>),
    /// Path to an export file
    File(PathBuf),
    /// Standard input stream
    Stdin,
    /// Any other reader
    Reader(Box<dyn Read + Send>),
}

impl fmt::Debug for XmlSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            XmlSource::String(s) => write!(f, "String({} bytes)", s.len()),
            XmlSource::Bytes(b) => write!(f, "Bytes({} bytes)", b.len()),
            XmlSource::File(path) => f.debug_tuple("File").field(path).finish(),
            XmlSource::Stdin => f.write_str("Stdin"),
            XmlSource::Reader(_) => f.write_str("Reader(..)"),
        }
    }
}

/// An opened source: a buffered reader positioned at the start of the
/// document, plus the first bytes for detection
pub struct OpenedSource {
    pub peek: Vec<u8>,
    pub reader: SourceReader,
    /// Total length when known up front
    pub total_bytes: Option<u64>,
}

/// Reader that replays the peeked head before the rest of the source
pub type SourceReader = BufReader<Chain<Cursor<Vec<u8>>, Box<dyn Read + Send>>>;

impl XmlSource {
    pub fn from_string(s: impl Into<String>) -> Self {
        Self::String(s.into())
    }

    pub fn from_file(path: impl Into<PathBuf>) -> Self {
        Self::File(path.into())
    }

    pub fn from_reader(reader: impl Read + Send + 'static) -> Self {
        Self::Reader(Box::new(reader))
    }

    /// Get a human-readable description of the source
    pub fn description(&self) -> String {
        match self {
            XmlSource::String(_) | XmlSource::Bytes(_) => "in-memory document".to_string(),
            XmlSource::File(path) => format!("file: {}", path.display()),
            XmlSource::Stdin => "standard input".to_string(),
            XmlSource::Reader(_) => "reader".to_string(),
        }
    }

    /// Get the size of the source in bytes (if known)
    pub fn estimated_size(&self) -> Option<u64> {
        match self {
            XmlSource::String(s) => Some(s.len() as u64),
            XmlSource::Bytes(b) => Some(b.len() as u64),
            XmlSource::File(path) => std::fs::metadata(path).ok().map(|m| m.len()),
            XmlSource::Stdin | XmlSource::Reader(_) => None,
        }
    }

    /// Open the source and read up to `peek_len` bytes from its head
    pub fn open(self, peek_len: usize) -> io::Result<OpenedSource> {
        let total_bytes = self.estimated_size();
        let mut inner: Box<dyn Read + Send> = match self {
            XmlSource::String(s) => Box::new(Cursor::new(s.into_bytes())),
            XmlSource::Bytes(b) => Box::new(Cursor::new(b)),
            XmlSource::File(path) => Box::new(File::open(path)?),
            XmlSource::Stdin => Box::new(io::stdin()),
            XmlSource::Reader(reader) => reader,
        };

        let mut peek = Vec::with_capacity(peek_len);
        inner.by_ref().take(peek_len as u64).read_to_end(&mut peek)?;

        let reader = BufReader::new(Cursor::new(peek.clone()).chain(inner));
        Ok(OpenedSource {
            peek,
            reader,
            total_bytes,
        })
    }
}

impl From<String> for XmlSource {
    fn from(s: String) -> Self {
        Self::String(s)
    }
}

impl From<&str> for XmlSource {
    fn from(s: &str) -> Self {
        Self::String(s.to_string())
    }
}

impl From<Vec<u8>> for XmlSource {
    fn from(b: Vec<u8>) -> Self {
        Self::Bytes(b)
    }
}

impl From<PathBuf> for XmlSource {
    fn from(path: PathBuf) -> Self {
        Self::File(path)
    }
}
