//! The program-wide kernel table.

use rustc_hash::FxHashMap;

use crate::device::DeviceId;
use crate::kernel::{EntryPoint, KernelSignature};

/// A kernel as seen across every device that exports it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Symbol {
    /// Highest-ABI signature any device reported.
    pub signature: KernelSignature,
    entries: FxHashMap<DeviceId, EntryPoint>,
}

impl Symbol {
    fn new(signature: KernelSignature) -> Self {
        Self {
            signature,
            entries: FxHashMap::default(),
        }
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.signature.name
    }

    /// The kernel's entry point on `device`.
    #[must_use]
    pub fn entry_point(&self, device: DeviceId) -> Option<&EntryPoint> {
        self.entries.get(&device)
    }

    /// Devices exporting the kernel, in id order.
    #[must_use]
    pub fn devices(&self) -> Vec<DeviceId> {
        let mut devices: Vec<DeviceId> = self.entries.keys().copied().collect();
        devices.sort_unstable();
        devices
    }
}

/// Kernel name to [`Symbol`], in first-insertion order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SymbolTable {
    order: Vec<String>,
    symbols: FxHashMap<String, Symbol>,
}

impl SymbolTable {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record `entry` for `device`, keeping the higher-ABI signature.
    pub fn insert_or_update(&mut self, device: DeviceId, entry: EntryPoint) {
        let name = entry.name().to_string();
        if !self.symbols.contains_key(&name) {
            self.order.push(name.clone());
        }
        let symbol = self
            .symbols
            .entry(name)
            .or_insert_with(|| Symbol::new(entry.signature.clone()));
        if entry.signature.abi_version > symbol.signature.abi_version {
            symbol.signature = entry.signature.clone();
        }
        symbol.entries.insert(device, entry);
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Symbol> {
        self.symbols.get(name)
    }

    /// Kernel names in first-insertion order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.order.iter().map(String::as_str)
    }

    /// Kernel names joined with `;`.
    #[must_use]
    pub fn joined_names(&self) -> String {
        self.order.join(";")
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.order.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    pub fn clear(&mut self) {
        self.order.clear();
        self.symbols.clear();
    }
}

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    reason = "tests use unwrap to panic on unexpected state"
)]
mod tests;
