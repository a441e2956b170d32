//! Section identifiers and per-version section validity.

use std::fmt;

use crate::version::BifVersion;

/// A container section.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum SectionId {
    Comment,
    Rodata,
    Text,
    CodeGen,
    Internal,
    Debug,
    Brig,
    Stats,
    Source,
    LlvmIr,
    Il,
    DebugIl,
    Spir,
    Spirv,
    Data,
}

impl SectionId {
    pub const ALL: [Self; 15] = [
        Self::Comment,
        Self::Rodata,
        Self::Text,
        Self::CodeGen,
        Self::Internal,
        Self::Debug,
        Self::Brig,
        Self::Stats,
        Self::Source,
        Self::LlvmIr,
        Self::Il,
        Self::DebugIl,
        Self::Spir,
        Self::Spirv,
        Self::Data,
    ];

    /// ELF-style section name.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Comment => ".comment",
            Self::Rodata => ".rodata",
            Self::Text => ".text",
            Self::CodeGen => ".cg",
            Self::Internal => ".internal",
            Self::Debug => ".debug",
            Self::Brig => ".brig",
            Self::Stats => ".stats",
            Self::Source => ".source",
            Self::LlvmIr => ".llvmir",
            Self::Il => ".amdil",
            Self::DebugIl => ".debugil",
            Self::Spir => ".spir",
            Self::Spirv => ".spirv",
            Self::Data => ".data",
        }
    }

    /// Id written to the wire.
    #[must_use]
    pub const fn wire_id(self) -> u16 {
        self as u16
    }

    #[must_use]
    pub fn from_wire(id: u16) -> Option<Self> {
        Self::ALL.get(usize::from(id)).copied()
    }

    /// Whether `version` has this section.
    #[must_use]
    pub const fn is_valid_in(self, version: BifVersion) -> bool {
        use BifVersion::{V20, V21, V30, V31};
        match self {
            Self::Comment | Self::Rodata | Self::Text | Self::Source | Self::LlvmIr | Self::Data => {
                true
            }
            Self::Il => matches!(version, V20 | V21 | V30),
            Self::DebugIl => matches!(version, V20 | V21),
            Self::Internal | Self::CodeGen => matches!(version, V21 | V30 | V31),
            Self::Debug | Self::Brig | Self::Spir => matches!(version, V30 | V31),
            Self::Stats | Self::Spirv => matches!(version, V31),
        }
    }
}

impl fmt::Display for SectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
