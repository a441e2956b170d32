//! Container capability flags and binary kinds.

use std::fmt;

use bitflags::bitflags;

bitflags! {
    /// Capabilities recorded when the container was produced.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct BifFlags: u32 {
        /// Built by the legacy front end.
        const LEGACY_FRONTEND = 1 << 0;
        const DEBUG_INFO = 1 << 1;
        const RELAXED_MATH = 1 << 2;
        const KERNEL_ARG_INFO = 1 << 3;
    }
}

/// What stage of the pipeline produced the container.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BinaryKind {
    Intermediate,
    Compiled,
    Library,
    Executable,
}

impl BinaryKind {
    #[must_use]
    pub const fn to_wire(self) -> u8 {
        match self {
            Self::Intermediate => 0,
            Self::Compiled => 1,
            Self::Library => 2,
            Self::Executable => 3,
        }
    }

    #[must_use]
    pub const fn from_wire(value: u8) -> Option<Self> {
        match value {
            0 => Some(Self::Intermediate),
            1 => Some(Self::Compiled),
            2 => Some(Self::Library),
            3 => Some(Self::Executable),
            _ => None,
        }
    }
}

impl fmt::Display for BinaryKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Intermediate => "intermediate",
            Self::Compiled => "compiled",
            Self::Library => "library",
            Self::Executable => "executable",
        };
        f.write_str(name)
    }
}
