//! Target descriptors and their two wire encodings.
//!
//! In memory a container always carries a [`Target`]. 2.x containers write it
//! as a [`LegacyMachine`] (raw machine id plus platform); 3.x containers write
//! a [`TargetInfo`] record. Only CPU and AMDIL targets have a legacy encoding.

use std::fmt;

use crate::error::BifError;
use crate::version::BifVersion;

/// ELF machine number for 32-bit x86.
pub const EM_386: u16 = 3;
/// ELF machine number for x86-64.
pub const EM_X86_64: u16 = 62;
/// Legacy GPU machine ids start here; the chip id is added to it.
pub const LEGACY_GPU_BASE: u16 = 1001;

const ELFCLASS32: u8 = 1;
const ELFCLASS64: u8 = 2;

/// Device architecture family.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Arch {
    X86,
    X86_64,
    AmdIl,
    Hsail,
    Hsail64,
    Amdgcn,
}

impl Arch {
    const ALL: [Self; 6] = [
        Self::X86,
        Self::X86_64,
        Self::AmdIl,
        Self::Hsail,
        Self::Hsail64,
        Self::Amdgcn,
    ];

    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::X86 => "x86",
            Self::X86_64 => "x86_64",
            Self::AmdIl => "amdil",
            Self::Hsail => "hsail",
            Self::Hsail64 => "hsail64",
            Self::Amdgcn => "amdgcn",
        }
    }

    /// Id used by the 3.x encoding.
    #[must_use]
    pub const fn arch_id(self) -> u16 {
        self as u16 + 1
    }

    #[must_use]
    pub fn from_arch_id(id: u16) -> Option<Self> {
        Self::ALL.iter().copied().find(|arch| arch.arch_id() == id)
    }

    /// Bitness implied by the architecture alone.
    #[must_use]
    pub const fn default_bitness(self) -> Bitness {
        match self {
            Self::X86 | Self::AmdIl | Self::Hsail => Bitness::B32,
            Self::X86_64 | Self::Hsail64 | Self::Amdgcn => Bitness::B64,
        }
    }
}

impl fmt::Display for Arch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Bitness {
    B32,
    B64,
}

impl Bitness {
    #[must_use]
    pub const fn bits(self) -> u8 {
        match self {
            Self::B32 => 32,
            Self::B64 => 64,
        }
    }
}

/// What a container was built for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Target {
    pub arch: Arch,
    pub chip_id: u16,
    pub bitness: Bitness,
}

impl Target {
    /// A target with the architecture's default bitness.
    #[must_use]
    pub const fn new(arch: Arch, chip_id: u16) -> Self {
        Self {
            arch,
            chip_id,
            bitness: arch.default_bitness(),
        }
    }

    #[must_use]
    pub const fn with_bitness(mut self, bitness: Bitness) -> Self {
        self.bitness = bitness;
        self
    }

    /// Whether `version` can encode this target.
    #[must_use]
    pub fn is_representable_in(&self, version: BifVersion) -> bool {
        !version.is_legacy() || self.to_legacy().is_some()
    }

    /// The 2.x encoding, if one exists.
    ///
    /// CPU machine ids carry no chip, so only chip 0 is encodable for them.
    #[must_use]
    pub fn to_legacy(&self) -> Option<LegacyMachine> {
        let class = match self.bitness {
            Bitness::B32 => ELFCLASS32,
            Bitness::B64 => ELFCLASS64,
        };
        let (machine, platform) = match self.arch {
            Arch::X86 | Arch::X86_64 if self.chip_id != 0 => return None,
            Arch::X86 => (EM_386, Platform::Cpu),
            Arch::X86_64 => (EM_X86_64, Platform::Cpu),
            Arch::AmdIl => (LEGACY_GPU_BASE.checked_add(self.chip_id)?, Platform::Gpu),
            Arch::Hsail | Arch::Hsail64 | Arch::Amdgcn => return None,
        };
        Some(LegacyMachine {
            machine,
            platform,
            class,
        })
    }

    pub fn from_legacy(legacy: LegacyMachine) -> Result<Self, BifError> {
        let bitness = if legacy.class == ELFCLASS64 {
            Bitness::B64
        } else {
            Bitness::B32
        };
        let unknown = BifError::UnknownMachine {
            machine: legacy.machine,
            platform: legacy.platform,
        };
        match (legacy.platform, legacy.machine) {
            (Platform::Cpu, EM_386) => Ok(Self::new(Arch::X86, 0).with_bitness(bitness)),
            (Platform::Cpu, EM_X86_64) => Ok(Self::new(Arch::X86_64, 0).with_bitness(bitness)),
            (Platform::Gpu, machine) if machine >= LEGACY_GPU_BASE => {
                Ok(Self::new(Arch::AmdIl, machine - LEGACY_GPU_BASE).with_bitness(bitness))
            }
            _ => Err(unknown),
        }
    }

    /// The 3.x encoding.
    #[must_use]
    pub fn to_info(&self) -> TargetInfo {
        let mut flags = 0;
        if self.bitness == Bitness::B64 {
            flags |= TargetInfo::FLAG_64BIT;
        }
        TargetInfo {
            arch_id: self.arch.arch_id(),
            chip_id: self.chip_id,
            flags,
        }
    }

    pub fn from_info(info: TargetInfo) -> Result<Self, BifError> {
        let arch = Arch::from_arch_id(info.arch_id).ok_or(BifError::UnknownArch(info.arch_id))?;
        let bitness = if info.flags & TargetInfo::FLAG_64BIT != 0 {
            Bitness::B64
        } else {
            Bitness::B32
        };
        Ok(Self::new(arch, info.chip_id).with_bitness(bitness))
    }
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{} ({}-bit)", self.arch, self.chip_id, self.bitness.bits())
    }
}

/// Platform half of a legacy machine id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Platform {
    Cpu,
    Gpu,
}

impl Platform {
    #[must_use]
    pub const fn to_wire(self) -> u8 {
        match self {
            Self::Cpu => 0,
            Self::Gpu => 1,
        }
    }

    #[must_use]
    pub const fn from_wire(value: u8) -> Option<Self> {
        match value {
            0 => Some(Self::Cpu),
            1 => Some(Self::Gpu),
            _ => None,
        }
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Cpu => write!(f, "CPU"),
            Self::Gpu => write!(f, "GPU"),
        }
    }
}

/// 2.x target encoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct LegacyMachine {
    pub machine: u16,
    pub platform: Platform,
    /// ELF class: 1 for 32-bit, 2 for 64-bit.
    pub class: u8,
}

/// 3.x target encoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TargetInfo {
    pub arch_id: u16,
    pub chip_id: u16,
    pub flags: u32,
}

impl TargetInfo {
    pub const FLAG_64BIT: u32 = 1;
}

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    reason = "tests use unwrap to panic on unexpected state"
)]
mod tests;
