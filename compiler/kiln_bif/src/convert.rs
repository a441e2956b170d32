//! Conversion between container versions.
//!
//! Every conversion starts from [`Bif::clone_without_payload`] and then
//! re-homes the payload under the destination's section and naming tables.
//! Sections and symbols with no destination equivalent are dropped and
//! listed in the [`ConversionReport`]. The target is re-encoded on write, so
//! conversion only has to check that the destination can express it.

use rustc_hash::FxHashSet;
use tracing::{debug, warn};

use crate::container::Bif;
use crate::error::BifError;
use crate::naming::{demangle, naming, SymbolKind};
use crate::section::SectionId;
use crate::version::BifVersion;

/// What a conversion left behind.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConversionReport {
    pub dropped_sections: Vec<SectionId>,
    /// Stored names of dropped symbols.
    pub dropped_symbols: Vec<String>,
}

impl ConversionReport {
    #[must_use]
    pub fn is_lossless(&self) -> bool {
        self.dropped_sections.is_empty() && self.dropped_symbols.is_empty()
    }
}

/// Convert `src` to `to`.
pub fn convert(src: &Bif, to: BifVersion) -> Result<Bif, BifError> {
    convert_with_report(src, to).map(|(bif, _)| bif)
}

/// Convert `src` to `to`, reporting what was dropped.
///
/// Fails without producing a container if the target has no encoding in
/// `to`, or if a kernel's device code has no metadata.
pub fn convert_with_report(src: &Bif, to: BifVersion) -> Result<(Bif, ConversionReport), BifError> {
    if !src.target.is_representable_in(to) {
        return Err(BifError::TargetNotRepresentable {
            target: src.target,
            version: to,
        });
    }
    check_required_symbols(src)?;

    let mut dst = src.clone_without_payload();
    dst.version = to;
    let mut report = ConversionReport::default();

    for (id, data) in src.sections() {
        if id.is_valid_in(to) {
            dst.insert_section(id, data.to_vec())?;
        } else {
            debug!(section = %id, from = %src.version, %to, "dropping section");
            report.dropped_sections.push(id);
        }
    }

    for (section, stored, data) in src.raw_symbols() {
        match demangle(src.version, section, stored) {
            Some((kind, name)) if naming(to, kind).is_some() => {
                dst.insert_symbol(kind, &name, data.to_vec())?;
            }
            Some((kind, _)) => {
                debug!(symbol = stored, %kind, %to, "dropping symbol");
                report.dropped_symbols.push(stored.to_string());
            }
            None => {
                warn!(symbol = stored, %section, from = %src.version, "dropping unrecognized symbol");
                report.dropped_symbols.push(stored.to_string());
            }
        }
    }

    Ok((dst, report))
}

fn check_required_symbols(bif: &Bif) -> Result<(), BifError> {
    let described: FxHashSet<String> = bif
        .symbols_of(SymbolKind::KernelMetadata)
        .into_iter()
        .map(|(name, _)| name)
        .collect();
    for name in bif.kernel_names() {
        if !described.contains(&name) {
            return Err(BifError::RequiredSymbolMissing {
                kind: SymbolKind::KernelMetadata,
                name,
            });
        }
    }
    Ok(())
}

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    reason = "tests use unwrap to panic on unexpected state"
)]
