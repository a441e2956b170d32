//! The `options` command: show how an option string parses.

use std::fmt::Write;

use kiln_options::table::table;
use kiln_options::{OptionError, OptionScope, Options};

/// Parse `text` in `scope` and render every option it set, followed by the
/// canonical string.
pub fn describe_options(text: &str, scope: OptionScope) -> Result<String, OptionError> {
    let options = Options::parse(text, scope)?;
    let mut out = String::new();

    let _ = writeln!(out, "scope: {scope}");
    for desc in table().descriptors() {
        if desc.is_alias() || desc.accumulates() || !options.is_seen(desc.id) {
            continue;
        }
        if let Some(value) = options.value(desc.id) {
            let _ = writeln!(out, "  {} = {value}", desc.spelling());
        }
    }
    if let Some(wgs) = options.work_group_size {
        let _ = writeln!(out, "  work-group size = {wgs}");
    }
    for (label, flags) in [
        ("frontend", &options.frontend_options),
        ("backend", &options.backend_options),
        ("linker", &options.linker_options),
    ] {
        if !flags.is_empty() {
            let _ = writeln!(out, "  {label} flags = {}", flags.trim());
        }
    }
    let _ = writeln!(out, "canonical: {}", options.canonical_string());
    Ok(out)
}
