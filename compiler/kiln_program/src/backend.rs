//! The code-generation backend the pipeline drives.
//!
//! Every call is synchronous and receives an assembled option fragment. The
//! pipeline never looks inside the bytes a backend returns, except for the
//! kernel offsets an executable reports.

use std::fmt;

use kiln_options::{OptionFragment, SourceKind};

use crate::device::Device;
use crate::kernel::KernelInfo;

/// What a compile call starts from.
#[derive(Debug, Clone, Copy)]
pub enum CompileInput<'a> {
    Source { text: &'a str, kind: SourceKind },
    Il(&'a [u8]),
}

#[derive(Debug)]
pub struct CompileRequest<'a> {
    pub device: &'a Device,
    pub input: CompileInput<'a>,
    /// Embedded headers as (include name, text).
    pub headers: &'a [(String, String)],
    pub options: &'a OptionFragment,
}

#[derive(Debug)]
pub struct LinkRequest<'a> {
    pub device: &'a Device,
    /// IR blobs to link.
    pub inputs: &'a [&'a [u8]],
    pub options: &'a OptionFragment,
}

#[derive(Debug)]
pub struct ExecutableRequest<'a> {
    pub device: &'a Device,
    /// IR blobs to link and lower.
    pub inputs: &'a [&'a [u8]],
    pub options: &'a OptionFragment,
}

/// Bytes produced by a successful backend call.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BackendArtifact {
    pub bytes: Vec<u8>,
    pub log: String,
    /// Kernels inside an executable image. Empty for IR.
    pub kernels: Vec<KernelInfo>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    /// The input had errors; see the log.
    Diagnostics,
    /// The backend ran out of memory or another resource.
    OutOfResources,
}

/// A failed backend call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackendFailure {
    pub kind: FailureKind,
    pub log: String,
}

impl BackendFailure {
    pub fn diagnostics(log: impl Into<String>) -> Self {
        Self {
            kind: FailureKind::Diagnostics,
            log: log.into(),
        }
    }

    pub fn out_of_resources(log: impl Into<String>) -> Self {
        Self {
            kind: FailureKind::OutOfResources,
            log: log.into(),
        }
    }
}

impl fmt::Display for BackendFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            FailureKind::Diagnostics => write!(f, "backend reported errors"),
            FailureKind::OutOfResources => write!(f, "backend ran out of resources"),
        }?;
        if !self.log.is_empty() {
            write!(f, ": {}", self.log.trim_end())?;
        }
        Ok(())
    }
}

/// Front end plus code generator.
///
/// Implementations need not be reentrant; the pipeline serializes every call
/// behind the process-wide build lock.
pub trait Backend: Send + Sync {
    /// Lower source or IL to IR.
    fn compile_to_ir(&self, request: &CompileRequest<'_>) -> Result<BackendArtifact, BackendFailure>;

    /// Link IR blobs into one IR blob.
    fn link_ir(&self, request: &LinkRequest<'_>) -> Result<BackendArtifact, BackendFailure>;

    /// Link IR blobs and lower them to a device executable.
    fn compile_and_link_executable(
        &self,
        request: &ExecutableRequest<'_>,
    ) -> Result<BackendArtifact, BackendFailure>;

    /// Version string folded into cache keys.
    fn version(&self) -> &str {
        env!("CARGO_PKG_VERSION")
    }
}
