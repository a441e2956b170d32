//! The `kernels` command: list kernel signatures stored in a container.

use std::fmt::Write;

use kiln_bif::{Bif, SymbolKind};
use kiln_program::KernelInfo;

/// One line per kernel, in code order.
///
/// Fails if any kernel's metadata can't be decoded.
pub fn describe_kernels(bif: &Bif) -> Result<String, String> {
    let mut kernels = bif
        .symbols_of(SymbolKind::KernelMetadata)
        .into_iter()
        .map(|(name, bytes)| {
            KernelInfo::from_bytes(bytes).map_err(|e| format!("kernel '{name}': {e}"))
        })
        .collect::<Result<Vec<_>, _>>()?;
    kernels.sort_by_key(|info| info.code_offset);

    let mut out = String::new();
    for info in &kernels {
        let sig = &info.signature;
        let _ = write!(out, "{}({})", sig.name, sig.params.join(", "));
        if let Some([x, y, z]) = sig.work_group_size_hint {
            let _ = write!(out, " wgs={x},{y},{z}");
        }
        let _ = writeln!(
            out,
            " abi={} code=[{:#x}, +{}]",
            sig.abi_version, info.code_offset, info.code_size
        );
    }
    Ok(out)
}
