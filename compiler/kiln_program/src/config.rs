//! Build configuration.

use std::path::PathBuf;

use kiln_bif::BifVersion;
use kiln_options::EnvOverrides;
use tracing::warn;

/// Enables the disk cache under the given directory.
pub const CACHE_DIR_VAR: &str = "KILN_CACHE_DIR";
/// Container version written by `Program::binary` (`2.0`, `2.1`, `3.0`, `3.1`).
pub const BIF_VERSION_VAR: &str = "KILN_BIF_VERSION";

/// Settings shared by every program in a context.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct BuildConfig {
    /// Root of the disk cache; `None` disables caching.
    pub cache_dir: Option<PathBuf>,
    /// Version of containers handed out by `Program::binary`.
    pub binary_version: BifVersion,
    /// Option-string overrides.
    pub overrides: EnvOverrides,
}

impl BuildConfig {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Read the configuration from the process environment.
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Read the configuration through `lookup`.
    ///
    /// An unrecognized container version is logged and the current version
    /// is used instead.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let cache_dir = lookup(CACHE_DIR_VAR)
            .filter(|dir| !dir.trim().is_empty())
            .map(PathBuf::from);
        let binary_version = match lookup(BIF_VERSION_VAR) {
            Some(text) => BifVersion::parse(&text).unwrap_or_else(|| {
                warn!(value = %text, "ignoring unrecognized {BIF_VERSION_VAR}");
                BifVersion::CURRENT
            }),
            None => BifVersion::CURRENT,
        };
        Self {
            cache_dir,
            binary_version,
            overrides: EnvOverrides::from_lookup(lookup),
        }
    }

    #[must_use]
    pub fn with_cache_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.cache_dir = Some(dir.into());
        self
    }

    #[must_use]
    pub fn with_binary_version(mut self, version: BifVersion) -> Self {
        self.binary_version = version;
        self
    }

    #[must_use]
    pub fn with_overrides(mut self, overrides: EnvOverrides) -> Self {
        self.overrides = overrides;
        self
    }
}
