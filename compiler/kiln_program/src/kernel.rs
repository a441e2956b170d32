//! Kernel signatures and per-device entry points.

use serde::{Deserialize, Serialize};

/// A kernel's interface as reported by the backend.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct KernelSignature {
    pub name: String,
    /// Metadata ABI the signature was produced with; higher is richer.
    pub abi_version: u32,
    /// Parameter declarations, in order.
    pub params: Vec<String>,
    pub work_group_size_hint: Option<[u32; 3]>,
}

impl KernelSignature {
    #[must_use]
    pub fn new(name: impl Into<String>, abi_version: u32) -> Self {
        Self {
            name: name.into(),
            abi_version,
            params: Vec::new(),
            work_group_size_hint: None,
        }
    }

    #[must_use]
    pub fn with_params(mut self, params: Vec<String>) -> Self {
        self.params = params;
        self
    }
}

/// A kernel inside an executable image. Stored as the kernel's metadata
/// symbol.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KernelInfo {
    pub signature: KernelSignature,
    pub code_offset: u64,
    pub code_size: u64,
}

impl KernelInfo {
    pub fn to_bytes(&self) -> Result<Vec<u8>, String> {
        bincode::serialize(self).map_err(|e| format!("failed to serialize kernel metadata: {e}"))
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, String> {
        bincode::deserialize(bytes).map_err(|e| format!("failed to deserialize kernel metadata: {e}"))
    }

    /// The kernel's slice of `image`, if it lies inside it.
    #[must_use]
    pub fn code<'a>(&self, image: &'a [u8]) -> Option<&'a [u8]> {
        let start = usize::try_from(self.code_offset).ok()?;
        let end = start.checked_add(usize::try_from(self.code_size).ok()?)?;
        image.get(start..end)
    }
}

/// One device's entry point for a kernel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntryPoint {
    /// Name of the device-code symbol in the program binary.
    pub symbol: String,
    pub code_offset: u64,
    pub code_size: u64,
    pub signature: KernelSignature,
}

impl EntryPoint {
    #[must_use]
    pub fn name(&self) -> &str {
        &self.signature.name
    }
}
