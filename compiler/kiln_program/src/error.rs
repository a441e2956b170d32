//! Build errors.

use kiln_bif::BifError;
use kiln_options::OptionError;
use thiserror::Error;

use crate::device::DeviceId;

/// Error returned by compile, link and build calls.
///
/// Every variant that reflects a parse or build problem has a matching entry
/// in the program or device build log.
#[derive(Debug, Error)]
pub enum BuildError {
    #[error("invalid build options: {0}")]
    InvalidBuildOptions(#[source] OptionError),

    #[error("invalid compile options: {0}")]
    InvalidCompileOptions(#[source] OptionError),

    #[error("invalid link options: {0}")]
    InvalidLinkOptions(#[source] OptionError),

    /// Container header, version or required symbol problem.
    #[error("invalid binary: {0}")]
    InvalidBinary(#[from] BifError),

    /// A device outside the context, inputs with no common device, or inputs
    /// from incompatible front ends.
    #[error("device mismatch: {0}")]
    DeviceMismatch(String),

    #[error("invalid operation: {0}")]
    InvalidOperation(String),

    #[error("build failed for {device}")]
    BuildFailure { device: DeviceId },

    #[error("compile failed for {device}")]
    CompileFailure { device: DeviceId },

    #[error("link failed for {device}")]
    LinkFailure { device: DeviceId },

    /// Always fatal for the whole call.
    #[error("out of resources: {0}")]
    OutOfResources(String),
}

impl BuildError {
    #[must_use]
    pub fn is_out_of_resources(&self) -> bool {
        matches!(self, Self::OutOfResources(_))
    }
}

pub type Result<T> = std::result::Result<T, BuildError>;
