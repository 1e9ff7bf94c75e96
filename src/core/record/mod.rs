//! # Record Module
//!
//! The persisted fingerprint record and the file metadata it is built from.
//!
//! A record is the authoritative statement "this exact file content, as
//! evidenced by `size` and `mod_time`, has fingerprint F". Records are only
//! ever written whole.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::io::Write;
use std::path::{Path, PathBuf};

/// Image format tag stored with every record
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImageKind {
    /// Decodable, but not a format we fingerprint
    #[default]
    Unknown,
    Jpeg,
    Png,
    Gif,
}

impl ImageKind {
    /// Map a format detected from file content onto a kind
    pub fn from_format(format: image::ImageFormat) -> Self {
        match format {
            image::ImageFormat::Jpeg => ImageKind::Jpeg,
            image::ImageFormat::Png => ImageKind::Png,
            image::ImageFormat::Gif => ImageKind::Gif,
            _ => ImageKind::Unknown,
        }
    }

    pub fn is_known(&self) -> bool {
        !matches!(self, ImageKind::Unknown)
    }
}

impl std::fmt::Display for ImageKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ImageKind::Unknown => write!(f, "unknown"),
            ImageKind::Jpeg => write!(f, "jpeg"),
            ImageKind::Png => write!(f, "png"),
            ImageKind::Gif => write!(f, "gif"),
        }
    }
}

/// Metadata gathered by `stat` before a file is opened
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileStat {
    /// Absolute path; the store key
    pub path: PathBuf,
    /// Base file name
    pub name: String,
    /// Byte length
    pub size: u64,
    /// Last modification time
    pub mod_time: DateTime<Utc>,
}

impl FileStat {
    /// Key under which this file's record is stored
    pub fn key(&self) -> String {
        store_key(&self.path)
    }
}

/// Store key for a path.
///
/// UTF-8 paths are their own key. Other paths are keyed by `bytes:` and the
/// hex of their raw bytes, which cannot collide with an absolute path.
pub fn store_key(path: &Path) -> String {
    match path.to_str() {
        Some(text) => text.to_string(),
        None => {
            let hex: String = path_bytes(path).iter().map(|b| format!("{:02x}", b)).collect();
            format!("bytes:{hex}")
        }
    }
}

#[cfg(unix)]
fn path_bytes(path: &Path) -> Vec<u8> {
    use std::os::unix::ffi::OsStrExt;
    path.as_os_str().as_bytes().to_vec()
}

#[cfg(not(unix))]
fn path_bytes(path: &Path) -> Vec<u8> {
    path.as_os_str().as_encoded_bytes().to_vec()
}

/// Serde codec for paths that may not be UTF-8.
///
/// UTF-8 paths are written as JSON strings. On Unix, any other path is
/// written as an array of its raw bytes so it reads back unchanged.
pub mod path_serde {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::path::{Path, PathBuf};

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Repr {
        Text(String),
        Bytes(Vec<u8>),
    }

    pub fn serialize<S: Serializer>(path: &Path, serializer: S) -> Result<S::Ok, S::Error> {
        match path.to_str() {
            Some(text) => serializer.serialize_str(text),
            None => super::path_bytes(path).serialize(serializer),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<PathBuf, D::Error> {
        match Repr::deserialize(deserializer)? {
            Repr::Text(text) => Ok(PathBuf::from(text)),
            Repr::Bytes(bytes) => from_bytes(bytes).map_err(serde::de::Error::custom),
        }
    }

    #[cfg(unix)]
    fn from_bytes(bytes: Vec<u8>) -> Result<PathBuf, &'static str> {
        use std::os::unix::ffi::OsStringExt;
        Ok(PathBuf::from(std::ffi::OsString::from_vec(bytes)))
    }

    #[cfg(not(unix))]
    fn from_bytes(bytes: Vec<u8>) -> Result<PathBuf, &'static str> {
        String::from_utf8(bytes)
            .map(PathBuf::from)
            .map_err(|_| "path bytes are not valid on this platform")
    }
}

/// A persisted fingerprint, one per ingested file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FingerprintRecord {
    #[serde(with = "path_serde")]
    pub path: PathBuf,
    pub kind: ImageKind,
    pub name: String,
    pub mod_time: DateTime<Utc>,
    pub size: u64,
    pub fingerprint: Vec<u8>,
}

impl FingerprintRecord {
    /// Build a record from the stat taken at ingestion time
    pub fn new(stat: FileStat, kind: ImageKind, fingerprint: Vec<u8>) -> Self {
        Self {
            path: stat.path,
            kind,
            name: stat.name,
            mod_time: stat.mod_time,
            size: stat.size,
            fingerprint,
        }
    }

    /// True when the file still has the size and mtime this record was taken at
    pub fn is_unchanged(&self, size: u64, mod_time: DateTime<Utc>) -> bool {
        self.size == size && self.mod_time == mod_time
    }

    pub fn key(&self) -> String {
        store_key(&self.path)
    }

    /// Serialize as JSON into `writer`
    pub fn write_json<W: Write>(&self, writer: W) -> Result<(), serde_json::Error> {
        serde_json::to_writer(writer, self)
    }

    /// Deserialize from stored bytes
    pub fn from_slice(bytes: &[u8]) -> Result<Self, serde_json::Error> {
        serde_json::from_slice(bytes)
    }
}
