//! Decoder seam: turn one file into a flat map of tagged values.
//!
//! The pipeline only depends on [`Decoder`]; [`dicom::DicomDecoder`] is the default
//! implementation. [`stringify`] turns every decoded value into a plain string cell.

pub mod dicom;
pub mod stringify;

pub use dicom::DicomDecoder;
pub use stringify::{hex_string, stringify};

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// A decoded value before stringification.
#[derive(Clone, Debug, PartialEq)]
pub enum TagValue {
    /// Element present but without a value.
    Missing,
    Text(String),
    Int(i64),
    Float(f64),
    /// Opaque payload; written as lowercase hex.
    Bytes(Vec<u8>),
    /// Multi-valued element.
    List(Vec<TagValue>),
    Map(BTreeMap<String, TagValue>),
}

/// Flat map from tag key to value, as returned by a [`Decoder`].
pub type TagMap = BTreeMap<String, TagValue>;

#[derive(Debug, thiserror::Error)]
pub enum DecodeError {
    #[error("failed to read {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("malformed file {}: {reason}", .path.display())]
    Malformed { path: PathBuf, reason: String },
}

/// Decode one file into a flat tag map. Must be callable from many threads at once.
pub trait Decoder: Send + Sync {
    fn decode(&self, path: &Path) -> Result<TagMap, DecodeError>;
}
