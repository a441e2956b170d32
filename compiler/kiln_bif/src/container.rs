//! The in-memory container.

use std::collections::BTreeMap;

use crate::convert::convert;
use crate::error::BifError;
use crate::flags::{BifFlags, BinaryKind};
use crate::naming::{demangle, naming, SymbolKind};
use crate::section::SectionId;
use crate::target::Target;
use crate::version::BifVersion;
use crate::wire;

/// A versioned store of named sections and symbols for one target.
///
/// Sections are raw blobs keyed by [`SectionId`]. Symbols are keyed by their
/// section and stored (mangled) name; typed access goes through the
/// container's naming table. Symbols whose names match no rule are kept
/// as-is so legacy inputs survive a decode.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Bif {
    pub version: BifVersion,
    pub target: Target,
    pub kind: BinaryKind,
    pub flags: BifFlags,
    sections: BTreeMap<SectionId, Vec<u8>>,
    symbols: BTreeMap<(SectionId, String), Vec<u8>>,
}

impl Bif {
    #[must_use]
    pub fn new(version: BifVersion, target: Target, kind: BinaryKind) -> Self {
        Self {
            version,
            target,
            kind,
            flags: BifFlags::empty(),
            sections: BTreeMap::new(),
            symbols: BTreeMap::new(),
        }
    }

    /// Same metadata, no sections and no symbols.
    #[must_use]
    pub fn clone_without_payload(&self) -> Self {
        Self::new(self.version, self.target, self.kind).with_flags(self.flags)
    }

    #[must_use]
    pub fn with_flags(mut self, flags: BifFlags) -> Self {
        self.flags = flags;
        self
    }

    pub fn insert_section(&mut self, id: SectionId, data: Vec<u8>) -> Result<(), BifError> {
        if !id.is_valid_in(self.version) {
            return Err(BifError::SectionNotInVersion {
                section: id,
                version: self.version,
            });
        }
        self.sections.insert(id, data);
        Ok(())
    }

    pub fn remove_section(&mut self, id: SectionId) -> Option<Vec<u8>> {
        self.sections.remove(&id)
    }

    #[must_use]
    pub fn section(&self, id: SectionId) -> Option<&[u8]> {
        self.sections.get(&id).map(Vec::as_slice)
    }

    pub fn sections(&self) -> impl Iterator<Item = (SectionId, &[u8])> {
        self.sections.iter().map(|(id, data)| (*id, data.as_slice()))
    }

    /// Store a symbol under this version's name for `kind`/`name`.
    pub fn insert_symbol(&mut self, kind: SymbolKind, name: &str, data: Vec<u8>) -> Result<(), BifError> {
        let rule = naming(self.version, kind).ok_or(BifError::UnknownSymbolKind {
            kind,
            version: self.version,
        })?;
        self.symbols.insert((rule.section, rule.mangle(name)), data);
        Ok(())
    }

    pub fn remove_symbol(&mut self, kind: SymbolKind, name: &str) -> Option<Vec<u8>> {
        let rule = naming(self.version, kind)?;
        self.symbols.remove(&(rule.section, rule.mangle(name)))
    }

    #[must_use]
    pub fn symbol(&self, kind: SymbolKind, name: &str) -> Option<&[u8]> {
        let rule = naming(self.version, kind)?;
        self.symbols
            .get(&(rule.section, rule.mangle(name)))
            .map(Vec::as_slice)
    }

    /// Every symbol of `kind`, as (logical name, data).
    pub fn symbols_of(&self, kind: SymbolKind) -> Vec<(String, &[u8])> {
        let Some(rule) = naming(self.version, kind) else {
            return Vec::new();
        };
        self.symbols
            .iter()
            .filter(|((section, _), _)| *section == rule.section)
            .filter_map(|((section, mangled), data)| {
                match demangle(self.version, *section, mangled) {
                    Some((found, name)) if found == kind => Some((name, data.as_slice())),
                    _ => None,
                }
            })
            .collect()
    }

    /// Every stored symbol as (section, stored name, data), recognized or not.
    pub fn raw_symbols(&self) -> impl Iterator<Item = (SectionId, &str, &[u8])> {
        self.symbols
            .iter()
            .map(|((section, name), data)| (*section, name.as_str(), data.as_slice()))
    }

    /// Store a symbol under an exact name, bypassing the naming table.
    pub fn insert_raw_symbol(&mut self, section: SectionId, name: String, data: Vec<u8>) -> Result<(), BifError> {
        if !section.is_valid_in(self.version) {
            return Err(BifError::SectionNotInVersion {
                section,
                version: self.version,
            });
        }
        self.symbols.insert((section, name), data);
        Ok(())
    }

    #[must_use]
    pub fn symbol_count(&self) -> usize {
        self.symbols.len()
    }

    /// Option string the container was built with.
    #[must_use]
    pub fn compiler_options(&self) -> Option<&str> {
        self.symbol(SymbolKind::CompilerOptions, "")
            .and_then(|bytes| std::str::from_utf8(bytes).ok())
    }

    pub fn set_compiler_options(&mut self, options: &str) -> Result<(), BifError> {
        self.insert_symbol(SymbolKind::CompilerOptions, "", options.as_bytes().to_vec())
    }

    /// Names of kernels that carry device code.
    #[must_use]
    pub fn kernel_names(&self) -> Vec<String> {
        self.symbols_of(SymbolKind::DeviceCode)
            .into_iter()
            .map(|(name, _)| name)
            .collect()
    }

    pub fn encode(&self) -> Result<Vec<u8>, BifError> {
        wire::encode(self)
    }

    pub fn decode(bytes: &[u8]) -> Result<Self, BifError> {
        wire::decode(bytes)
    }

    /// Decode and convert to [`BifVersion::CURRENT`].
    pub fn decode_current(bytes: &[u8]) -> Result<Self, BifError> {
        let bif = Self::decode(bytes)?;
        if bif.version == BifVersion::CURRENT {
            return Ok(bif);
        }
        convert(&bif, BifVersion::CURRENT)
    }
}

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    reason = "tests use unwrap to panic on unexpected state"
)]
