//! Command handlers for the kilnc CLI.
//!
//! Shared helpers for reading and writing container files live here in the
//! module root.

mod convert;
mod inspect;
mod kernels;
mod options;

use std::path::Path;

use kiln_bif::Bif;

pub use convert::{convert_file, parse_version_flag};
pub use inspect::describe_container;
pub use kernels::describe_kernels;
pub use options::describe_options;

/// Read and decode a container file.
pub fn read_container(path: &Path) -> Result<Bif, String> {
    let bytes =
        std::fs::read(path).map_err(|e| format!("cannot read '{}': {e}", path.display()))?;
    Bif::decode(&bytes).map_err(|e| format!("'{}' is not a valid binary: {e}", path.display()))
}

/// Encode `bif` and write it to `path`.
pub fn write_container(path: &Path, bif: &Bif) -> Result<(), String> {
    let bytes = bif.encode().map_err(|e| format!("cannot encode binary: {e}"))?;
    std::fs::write(path, bytes).map_err(|e| format!("cannot write '{}': {e}", path.display()))
}

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    reason = "tests use unwrap to panic on unexpected state"
)]
