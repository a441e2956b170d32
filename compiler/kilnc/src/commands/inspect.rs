//! The `inspect` command: dump a container's header, sections and symbols.

use std::fmt::Write;

use kiln_bif::{demangle, Bif};

pub fn describe_container(bif: &Bif) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "version: {}", bif.version);
    let _ = writeln!(out, "target:  {}", bif.target);
    let _ = writeln!(out, "kind:    {}", bif.kind);

    let flags: Vec<&str> = bif.flags.iter_names().map(|(name, _)| name).collect();
    if flags.is_empty() {
        let _ = writeln!(out, "flags:   none");
    } else {
        let _ = writeln!(out, "flags:   {}", flags.join(" | "));
    }
    if let Some(options) = bif.compiler_options() {
        let _ = writeln!(out, "options: {options}");
    }

    let _ = writeln!(out, "sections:");
    for (id, data) in bif.sections() {
        let _ = writeln!(out, "  {id:<10} {:>8} bytes", data.len());
    }

    let _ = writeln!(out, "symbols:");
    for (section, name, data) in bif.raw_symbols() {
        match demangle(bif.version, section, name) {
            Some((kind, logical)) if !logical.is_empty() => {
                let _ = writeln!(out, "  {name} ({kind} '{logical}', {} bytes)", data.len());
            }
            Some((kind, _)) => {
                let _ = writeln!(out, "  {name} ({kind}, {} bytes)", data.len());
            }
            None => {
                let _ = writeln!(out, "  {name} (unrecognized, {} bytes)", data.len());
            }
        }
    }
    out
}
