//! On-disk encoding.
//!
//! ```text
//! 0x7f 'B' 'I' 'F' | major: u8 | minor: u8 | bincode body
//! ```
//!
//! The version bytes are read first and select the body struct: 2.x bodies
//! carry a legacy machine header, 3.x bodies a target-info record.

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::container::Bif;
use crate::error::BifError;
use crate::flags::{BifFlags, BinaryKind};
use crate::naming::demangle;
use crate::section::SectionId;
use crate::target::{LegacyMachine, Platform, Target, TargetInfo};
use crate::version::BifVersion;

pub const MAGIC: [u8; 4] = *b"\x7fBIF";

const HEADER_LEN: usize = MAGIC.len() + 2;

#[derive(Serialize, Deserialize)]
struct WireSection {
    id: u16,
    data: Vec<u8>,
}

#[derive(Serialize, Deserialize)]
struct WireSymbol {
    section: u16,
    name: String,
    data: Vec<u8>,
}

#[derive(Serialize, Deserialize)]
struct LegacyHeader {
    machine: u16,
    platform: u8,
    class: u8,
}

#[derive(Serialize, Deserialize)]
struct InfoHeader {
    arch_id: u16,
    chip_id: u16,
    flags: u32,
}

#[derive(Serialize, Deserialize)]
struct Payload {
    kind: u8,
    flags: u32,
    sections: Vec<WireSection>,
    symbols: Vec<WireSymbol>,
}

#[derive(Serialize, Deserialize)]
struct LegacyBody {
    header: LegacyHeader,
    payload: Payload,
}

#[derive(Serialize, Deserialize)]
struct InfoBody {
    header: InfoHeader,
    payload: Payload,
}

/// Read the version bytes without decoding the body.
pub fn peek_version(bytes: &[u8]) -> Result<BifVersion, BifError> {
    if bytes.len() < HEADER_LEN {
        return Err(if bytes.starts_with(&MAGIC[..bytes.len().min(MAGIC.len())]) {
            BifError::Truncated
        } else {
            BifError::InvalidMagic
        });
    }
    if bytes[..MAGIC.len()] != MAGIC {
        return Err(BifError::InvalidMagic);
    }
    let (major, minor) = (bytes[MAGIC.len()], bytes[MAGIC.len() + 1]);
    BifVersion::from_bytes(major, minor).ok_or(BifError::UnsupportedVersion { major, minor })
}

pub(crate) fn encode(bif: &Bif) -> Result<Vec<u8>, BifError> {
    let payload = Payload {
        kind: bif.kind.to_wire(),
        flags: bif.flags.bits(),
        sections: bif
            .sections()
            .map(|(id, data)| WireSection {
                id: id.wire_id(),
                data: data.to_vec(),
            })
            .collect(),
        symbols: bif
            .raw_symbols()
            .map(|(section, name, data)| WireSymbol {
                section: section.wire_id(),
                name: name.to_string(),
                data: data.to_vec(),
            })
            .collect(),
    };

    let body = if bif.version.is_legacy() {
        let legacy = bif
            .target
            .to_legacy()
            .ok_or(BifError::TargetNotRepresentable {
                target: bif.target,
                version: bif.version,
            })?;
        let header = LegacyHeader {
            machine: legacy.machine,
            platform: legacy.platform.to_wire(),
            class: legacy.class,
        };
        bincode::serialize(&LegacyBody { header, payload })
    } else {
        let info = bif.target.to_info();
        let header = InfoHeader {
            arch_id: info.arch_id,
            chip_id: info.chip_id,
            flags: info.flags,
        };
        bincode::serialize(&InfoBody { header, payload })
    }
    .map_err(|e| BifError::Encode(e.to_string()))?;

    let mut bytes = Vec::with_capacity(HEADER_LEN + body.len());
    bytes.extend_from_slice(&MAGIC);
    bytes.push(bif.version.major());
    bytes.push(bif.version.minor());
    bytes.extend_from_slice(&body);
    Ok(bytes)
}

pub(crate) fn decode(bytes: &[u8]) -> Result<Bif, BifError> {
    let version = peek_version(bytes)?;
    let body = &bytes[HEADER_LEN..];

    let (target, payload) = if version.is_legacy() {
        let LegacyBody { header, payload } = deserialize(body)?;
        let platform = Platform::from_wire(header.platform)
            .ok_or_else(|| BifError::Decode(format!("unknown platform {}", header.platform)))?;
        let target = Target::from_legacy(LegacyMachine {
            machine: header.machine,
            platform,
            class: header.class,
        })?;
        (target, payload)
    } else {
        let InfoBody { header, payload } = deserialize(body)?;
        let target = Target::from_info(TargetInfo {
            arch_id: header.arch_id,
            chip_id: header.chip_id,
            flags: header.flags,
        })?;
        (target, payload)
    };

    let kind = BinaryKind::from_wire(payload.kind)
        .ok_or_else(|| BifError::Decode(format!("unknown binary kind {}", payload.kind)))?;
    let mut bif = Bif::new(version, target, kind)
        .with_flags(BifFlags::from_bits_truncate(payload.flags));

    for section in payload.sections {
        let id = SectionId::from_wire(section.id).ok_or(BifError::UnknownSection(section.id))?;
        bif.insert_section(id, section.data)?;
    }
    for symbol in payload.symbols {
        let section =
            SectionId::from_wire(symbol.section).ok_or(BifError::UnknownSection(symbol.section))?;
        if demangle(version, section, &symbol.name).is_none() {
            warn!(name = %symbol.name, %section, %version, "keeping unrecognized symbol");
        }
        bif.insert_raw_symbol(section, symbol.name, symbol.data)?;
    }
    Ok(bif)
}

fn deserialize<'de, T: Deserialize<'de>>(body: &'de [u8]) -> Result<T, BifError> {
    bincode::deserialize(body).map_err(|e| match *e {
        bincode::ErrorKind::Io(ref io) if io.kind() == std::io::ErrorKind::UnexpectedEof => {
            BifError::Truncated
        }
        other => BifError::Decode(other.to_string()),
    })
}

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    reason = "tests use unwrap to panic on unexpected state"
)]
