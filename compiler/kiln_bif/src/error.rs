//! Container errors.

use std::fmt;

use crate::naming::SymbolKind;
use crate::section::SectionId;
use crate::target::{Platform, Target};
use crate::version::BifVersion;

/// Error reading, writing or converting a container.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BifError {
    /// The input doesn't start with `\x7fBIF`.
    InvalidMagic,
    /// The version bytes name no known format.
    UnsupportedVersion { major: u8, minor: u8 },
    /// The input ends before the body does.
    Truncated,
    /// The body could not be decoded.
    Decode(String),
    /// The body could not be encoded.
    Encode(String),
    /// A wire section id that no version defines.
    UnknownSection(u16),
    /// A section that exists, but not in this version.
    SectionNotInVersion {
        section: SectionId,
        version: BifVersion,
    },
    /// A symbol kind this version has no naming rule for.
    UnknownSymbolKind {
        kind: SymbolKind,
        version: BifVersion,
    },
    /// The target can't be expressed in this version's encoding.
    TargetNotRepresentable {
        target: Target,
        version: BifVersion,
    },
    /// A legacy machine id that maps to no architecture.
    UnknownMachine { machine: u16, platform: Platform },
    /// A 3.x architecture id that maps to no architecture.
    UnknownArch(u16),
    /// A symbol every kernel needs is absent.
    RequiredSymbolMissing { kind: SymbolKind, name: String },
}

impl fmt::Display for BifError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidMagic => write!(f, "not a BIF container (bad magic)"),
            Self::UnsupportedVersion { major, minor } => {
                write!(f, "unsupported BIF version {major}.{minor}")
            }
            Self::Truncated => write!(f, "BIF container is truncated"),
            Self::Decode(msg) => write!(f, "failed to decode BIF body: {msg}"),
            Self::Encode(msg) => write!(f, "failed to encode BIF body: {msg}"),
            Self::UnknownSection(id) => write!(f, "unknown section id {id}"),
            Self::SectionNotInVersion { section, version } => {
                write!(f, "section {section} does not exist in BIF {version}")
            }
            Self::UnknownSymbolKind { kind, version } => {
                write!(f, "BIF {version} has no {kind} symbols")
            }
            Self::TargetNotRepresentable { target, version } => {
                write!(f, "target {target} cannot be encoded in BIF {version}")
            }
            Self::UnknownMachine { machine, platform } => {
                write!(f, "unknown {platform} machine id {machine}")
            }
            Self::UnknownArch(id) => write!(f, "unknown architecture id {id}"),
            Self::RequiredSymbolMissing { kind, name } => {
                write!(f, "kernel '{name}' is missing its {kind} symbol")
            }
        }
    }
}

impl std::error::Error for BifError {}
