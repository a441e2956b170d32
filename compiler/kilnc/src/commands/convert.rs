//! The `convert` command: rewrite a container file in another version.

use std::path::Path;

use kiln_bif::{convert_with_report, BifVersion, ConversionReport};
use tracing::info;

use super::{read_container, write_container};

/// Parse a `--to=<version>` flag.
pub fn parse_version_flag(arg: &str) -> Option<BifVersion> {
    arg.strip_prefix("--to=").and_then(BifVersion::parse)
}

/// Convert the container at `input` to `to` and write it to `output`.
///
/// Nothing is written when the conversion fails.
pub fn convert_file(input: &Path, output: &Path, to: BifVersion) -> Result<ConversionReport, String> {
    let src = read_container(input)?;
    let (dst, report) = convert_with_report(&src, to)
        .map_err(|e| format!("cannot convert '{}' to {to}: {e}", input.display()))?;
    write_container(output, &dst)?;
    info!(from = %src.version, %to, lossless = report.is_lossless(), "converted");
    Ok(report)
}
