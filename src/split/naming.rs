use std::fmt;
use std::path::{Path, PathBuf};

use serde::Serialize;
use md5::{Digest, Md5};

use crate::error::Result;

/// Hex digits kept from each digest.
pub const HASH_LEN: usize = 5;

/// Truncated MD5 of `text` as lowercase hex.
///
/// Five hex digits keep paths short at the cost of possible collisions,
/// which are neither detected nor resolved.
pub fn short_hash(text: &str) -> String {
    let digest = Md5::digest(text.as_bytes());
    let mut hex = format!("{:x}", digest);
    hex.truncate(HASH_LEN);
    hex
}

/// Stable output location of one segment, relative to the output root.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct SegmentIdentity {
    pub parent_hash: String,
    pub file_hash: String,
    pub segment_hash: String,
    pub extension: String,
}

impl SegmentIdentity {
    pub fn new(source: &Path, part_index: usize, extension: &str) -> Self {
        let parent = source
            .parent()
            .map(|p| p.to_string_lossy().into_owned())
            .filter(|p| !p.is_empty())
            .unwrap_or_else(|| ".".to_string());
        let file_name = source
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();

        Self {
            parent_hash: short_hash(&parent),
            file_hash: short_hash(&file_name),
            segment_hash: short_hash(&format!("{}_{}", source.display(), part_index)),
            extension: extension.to_string(),
        }
    }

    pub fn relative_dir(&self) -> PathBuf {
        PathBuf::from(&self.parent_hash).join(&self.file_hash)
    }

    pub fn relative_path(&self) -> PathBuf {
        self.relative_dir()
            .join(format!("{}.{}", self.segment_hash, self.extension))
    }
}

impl fmt::Display for SegmentIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}/{}/{}.{}",
            self.parent_hash, self.file_hash, self.segment_hash, self.extension
        )
    }
}

/// Maps `(source, part_index)` to paths under an output root.
#[derive(Debug, Clone)]
pub struct IdentityNamer {
    output_root: PathBuf,
    extension: String,
}

impl IdentityNamer {
    pub fn new(output_root: impl Into<PathBuf>, extension: impl Into<String>) -> Self {
        Self {
            output_root: output_root.into(),
            extension: extension.into(),
        }
    }

    pub fn output_root(&self) -> &Path {
        &self.output_root
    }

    pub fn identity(&self, source: &Path, part_index: usize) -> SegmentIdentity {
        SegmentIdentity::new(source, part_index, &self.extension)
    }

    /// Absolute path for a segment, without touching the filesystem.
    pub fn path_for(&self, source: &Path, part_index: usize) -> PathBuf {
        self.output_root
            .join(self.identity(source, part_index).relative_path())
    }

    /// Like [`IdentityNamer::path_for`], creating the containing directories first.
    ///
    /// Safe to call repeatedly and from several workers at once.
    pub fn prepare(&self, source: &Path, part_index: usize) -> Result<PathBuf> {
        let identity = self.identity(source, part_index);
        std::fs::create_dir_all(self.output_root.join(identity.relative_dir()))?;
        Ok(self.output_root.join(identity.relative_path()))
    }
}
