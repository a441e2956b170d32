//! Versioned binary container for compiled kiln programs.
//!
//! A BIF container stores named sections and symbols for one target. Four
//! format versions exist (2.0, 2.1, 3.0, 3.1); they differ in which sections
//! exist, how symbols are named, and how the target is encoded. Containers
//! convert losslessly between versions except for content the destination
//! has no place for, which is dropped and reported.
//!
//! # Usage
//!
//! ```ignore
//! use kiln_bif::{convert, Bif, BifVersion};
//!
//! let bif = Bif::decode(&bytes)?;
//! let legacy = convert(&bif, BifVersion::V21)?;
//! std::fs::write(path, legacy.encode()?)?;
//! ```

mod container;
mod convert;
mod error;
mod flags;
mod naming;
mod section;
mod target;
mod version;
mod wire;

pub use container::Bif;
pub use convert::{convert, convert_with_report, ConversionReport};
pub use error::BifError;
pub use flags::{BifFlags, BinaryKind};
pub use naming::{demangle, mangle, naming, NamingRule, SymbolKind};
pub use section::SectionId;
pub use target::{Arch, Bitness, LegacyMachine, Platform, Target, TargetInfo};
pub use version::BifVersion;
pub use wire::{peek_version, MAGIC};
