//! Content-addressed disk cache of built executables.
//!
//! Entries are complete BIF containers stored under
//! `<cache_dir>/objects/<key>.bif`. The key covers the input bytes, the
//! option string, the device target, the container version and the backend
//! version, so any change to one of them misses.

use std::fs;
use std::hash::{Hash, Hasher};
use std::path::{Path, PathBuf};

use kiln_bif::{Bif, BifError, BifVersion, Target};
use rustc_hash::FxHasher;
use tracing::{debug, warn};

/// Names a cache entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CacheKey(u64);

impl CacheKey {
    /// Key for building `input` with `options` for `target`.
    #[must_use]
    pub fn new(input: &[u8], options: &str, target: &Target, version: BifVersion, backend_version: &str) -> Self {
        let mut state = FxHasher::default();
        input.hash(&mut state);
        options.trim().hash(&mut state);
        target.hash(&mut state);
        version.hash(&mut state);
        backend_version.hash(&mut state);
        Self(state.finish())
    }

    /// File-name-safe form.
    #[must_use]
    pub fn to_hex(&self) -> String {
        format!("{:016x}", self.0)
    }
}

impl std::fmt::Display for CacheKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:016x}", self.0)
    }
}

/// Disk cache of built containers.
#[derive(Debug)]
pub struct BuildCache {
    root: PathBuf,
    objects_dir: PathBuf,
    backend_version: String,
}

impl BuildCache {
    /// Open (creating if needed) a cache rooted at `root`.
    pub fn new(root: impl AsRef<Path>, backend_version: &str) -> Result<Self, CacheError> {
        let root = root.as_ref().to_path_buf();
        let objects_dir = root.join("objects");
        fs::create_dir_all(&objects_dir).map_err(|e| CacheError::io(&objects_dir, &e))?;
        Ok(Self {
            root,
            objects_dir,
            backend_version: backend_version.to_string(),
        })
    }

    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    #[must_use]
    pub fn key(&self, input: &[u8], options: &str, target: &Target) -> CacheKey {
        CacheKey::new(input, options, target, BifVersion::CURRENT, &self.backend_version)
    }

    #[must_use]
    pub fn object_path(&self, key: &CacheKey) -> PathBuf {
        self.objects_dir.join(format!("{}.bif", key.to_hex()))
    }

    /// Load an entry. Unreadable or undecodable entries count as misses.
    pub fn get(&self, key: &CacheKey) -> Option<Bif> {
        let path = self.object_path(key);
        let bytes = match fs::read(&path) {
            Ok(bytes) => bytes,
            Err(_) => {
                debug!(%key, "build cache miss");
                return None;
            }
        };
        match Bif::decode_current(&bytes) {
            Ok(bif) => {
                debug!(%key, "build cache hit");
                Some(bif)
            }
            Err(e) => {
                warn!(path = %path.display(), error = %e, "discarding corrupt cache entry");
                None
            }
        }
    }

    /// Store an entry, replacing any previous one.
    pub fn put(&self, key: &CacheKey, bif: &Bif) -> Result<PathBuf, CacheError> {
        let path = self.object_path(key);
        let bytes = bif.encode().map_err(CacheError::Encode)?;
        fs::write(&path, bytes).map_err(|e| CacheError::io(&path, &e))?;
        Ok(path)
    }

    /// Number of stored entries.
    pub fn count(&self) -> Result<usize, CacheError> {
        let count = fs::read_dir(&self.objects_dir)
            .map_err(|e| CacheError::io(&self.objects_dir, &e))?
            .filter_map(std::result::Result::ok)
            .filter(|e| e.path().extension().is_some_and(|ext| ext == "bif"))
            .count();
        Ok(count)
    }

    /// Remove every entry.
    pub fn clear(&self) -> Result<(), CacheError> {
        if self.objects_dir.exists() {
            fs::remove_dir_all(&self.objects_dir).map_err(|e| CacheError::io(&self.objects_dir, &e))?;
        }
        fs::create_dir_all(&self.objects_dir).map_err(|e| CacheError::io(&self.objects_dir, &e))
    }
}

/// Error during cache operations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CacheError {
    IoError { path: PathBuf, message: String },
    Encode(BifError),
}

impl CacheError {
    fn io(path: &Path, err: &std::io::Error) -> Self {
        Self::IoError {
            path: path.to_path_buf(),
            message: err.to_string(),
        }
    }
}

impl std::fmt::Display for CacheError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::IoError { path, message } => {
                write!(f, "cache I/O error at '{}': {}", path.display(), message)
            }
            Self::Encode(err) => write!(f, "cache entry could not be encoded: {err}"),
        }
    }
}

impl std::error::Error for CacheError {}

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    reason = "tests use unwrap to panic on unexpected state"
)]
