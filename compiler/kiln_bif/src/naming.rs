//! Per-version symbol naming tables.
//!
//! A symbol's stored name is `prefix + logical name + postfix`, placed in the
//! section the table assigns to its [`SymbolKind`]. 2.x containers spell
//! per-kernel symbols `__OpenCL_<kernel>_<suffix>`; 3.x containers spell them
//! `__ocl_<suffix>_<kernel>`. Program-wide symbols use an empty logical name.
//!
//! Every kind is present over a contiguous run of versions, so converting
//! through intermediate versions yields the same result as converting
//! directly.

use std::fmt;

use crate::section::SectionId;
use crate::version::BifVersion;

/// Logical meaning of a symbol, independent of how a version spells it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum SymbolKind {
    CompilerOptions,
    LinkerOptions,
    KernelMetadata,
    KernelHeader,
    DeviceCode,
    Il,
    DebugIl,
    DebugInfo,
    GlobalData,
    Internal,
    CodeGen,
    KernelStats,
}

impl SymbolKind {
    pub const ALL: [Self; 12] = [
        Self::CompilerOptions,
        Self::LinkerOptions,
        Self::KernelMetadata,
        Self::KernelHeader,
        Self::DeviceCode,
        Self::Il,
        Self::DebugIl,
        Self::DebugInfo,
        Self::GlobalData,
        Self::Internal,
        Self::CodeGen,
        Self::KernelStats,
    ];

    /// Whether the symbol is named after a kernel.
    #[must_use]
    pub const fn is_per_kernel(self) -> bool {
        !matches!(self, Self::CompilerOptions | Self::LinkerOptions)
    }
}

impl fmt::Display for SymbolKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::CompilerOptions => "compiler options",
            Self::LinkerOptions => "linker options",
            Self::KernelMetadata => "kernel metadata",
            Self::KernelHeader => "kernel header",
            Self::DeviceCode => "device code",
            Self::Il => "IL",
            Self::DebugIl => "debug IL",
            Self::DebugInfo => "debug info",
            Self::GlobalData => "global data",
            Self::Internal => "internal",
            Self::CodeGen => "codegen",
            Self::KernelStats => "kernel stats",
        };
        f.write_str(name)
    }
}

/// Where and how one version stores one symbol kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NamingRule {
    pub section: SectionId,
    pub prefix: &'static str,
    pub postfix: &'static str,
}

impl NamingRule {
    const fn new(section: SectionId, prefix: &'static str, postfix: &'static str) -> Self {
        Self {
            section,
            prefix,
            postfix,
        }
    }

    #[must_use]
    pub fn mangle(&self, name: &str) -> String {
        format!("{}{name}{}", self.prefix, self.postfix)
    }

    /// Recover the logical name, if `mangled` follows this rule.
    #[must_use]
    pub fn demangle<'a>(&self, mangled: &'a str) -> Option<&'a str> {
        mangled
            .strip_prefix(self.prefix)?
            .strip_suffix(self.postfix)
    }

    fn affix_len(&self) -> usize {
        self.prefix.len() + self.postfix.len()
    }
}

/// The naming rule for `kind` in `version`, or `None` if the version has no
/// such symbol.
#[must_use]
pub fn naming(version: BifVersion, kind: SymbolKind) -> Option<NamingRule> {
    if version.is_legacy() {
        legacy_naming(version, kind)
    } else {
        modern_naming(version, kind)
    }
}

fn legacy_naming(version: BifVersion, kind: SymbolKind) -> Option<NamingRule> {
    use SectionId as S;
    let rule = match kind {
        SymbolKind::CompilerOptions => NamingRule::new(S::Comment, "__OpenCL_compiler_options", ""),
        SymbolKind::LinkerOptions => NamingRule::new(S::Comment, "__OpenCL_linker_options", ""),
        SymbolKind::KernelMetadata => NamingRule::new(S::Rodata, "__OpenCL_", "_metadata"),
        SymbolKind::KernelHeader => NamingRule::new(S::Rodata, "__OpenCL_", "_header"),
        SymbolKind::DeviceCode => NamingRule::new(S::Text, "__OpenCL_", "_kernel"),
        SymbolKind::Il => NamingRule::new(S::Il, "__OpenCL_", "_amdil"),
        SymbolKind::DebugIl => NamingRule::new(S::DebugIl, "__OpenCL_", "_debugil"),
        SymbolKind::GlobalData => NamingRule::new(S::Data, "__OpenCL_", "_global"),
        SymbolKind::Internal if version == BifVersion::V21 => {
            NamingRule::new(S::Internal, "__OpenCL_", "_internal")
        }
        SymbolKind::CodeGen if version == BifVersion::V21 => {
            NamingRule::new(S::CodeGen, "__OpenCL_", "_cg")
        }
        SymbolKind::Internal | SymbolKind::CodeGen | SymbolKind::DebugInfo | SymbolKind::KernelStats => {
            return None
        }
    };
    Some(rule)
}

fn modern_naming(version: BifVersion, kind: SymbolKind) -> Option<NamingRule> {
    use SectionId as S;
    let v31 = version == BifVersion::V31;
    let rule = match kind {
        SymbolKind::CompilerOptions => NamingRule::new(S::Comment, "__ocl_compiler_options", ""),
        SymbolKind::LinkerOptions => NamingRule::new(S::Comment, "__ocl_linker_options", ""),
        SymbolKind::KernelMetadata if v31 => NamingRule::new(S::Internal, "__ocl_metadata_", ""),
        SymbolKind::KernelMetadata => NamingRule::new(S::Rodata, "__ocl_metadata_", ""),
        SymbolKind::KernelHeader => NamingRule::new(S::Rodata, "__ocl_header_", ""),
        SymbolKind::DeviceCode => NamingRule::new(S::Text, "__ocl_kernel_", ""),
        SymbolKind::Il if !v31 => NamingRule::new(S::Il, "__ocl_il_", ""),
        SymbolKind::DebugInfo => NamingRule::new(S::Debug, "__ocl_debug_", ""),
        SymbolKind::GlobalData => NamingRule::new(S::Data, "__ocl_global_", ""),
        SymbolKind::Internal => NamingRule::new(S::Internal, "__ocl_internal_", ""),
        SymbolKind::CodeGen => NamingRule::new(S::CodeGen, "__ocl_cg_", ""),
        SymbolKind::KernelStats if v31 => NamingRule::new(S::Stats, "__ocl_stats_", ""),
        SymbolKind::Il | SymbolKind::DebugIl | SymbolKind::KernelStats => return None,
    };
    Some(rule)
}

/// Store name of `kind`/`name` in `version`.
#[must_use]
pub fn mangle(version: BifVersion, kind: SymbolKind, name: &str) -> Option<(SectionId, String)> {
    naming(version, kind).map(|rule| (rule.section, rule.mangle(name)))
}

/// Identify a stored symbol by its section and name.
///
/// When several rules match, the one with the longest fixed affix wins, so
/// `__OpenCL_compiler_options` is never read as a kernel called
/// `compiler_options`.
#[must_use]
pub fn demangle(version: BifVersion, section: SectionId, mangled: &str) -> Option<(SymbolKind, String)> {
    SymbolKind::ALL
        .iter()
        .filter_map(|&kind| {
            let rule = naming(version, kind)?;
            if rule.section != section {
                return None;
            }
            let name = rule.demangle(mangled)?;
            if name.is_empty() == kind.is_per_kernel() {
                return None;
            }
            Some((rule.affix_len(), kind, name))
        })
        .max_by_key(|(affix_len, _, _)| *affix_len)
        .map(|(_, kind, name)| (kind, name.to_string()))
}
