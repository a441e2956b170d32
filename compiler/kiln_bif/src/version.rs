//! Container format versions.

use std::fmt;

/// A BIF format version.
///
/// The version is read from the two bytes after the magic and selects the
/// body layout, the naming table and the target encoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum BifVersion {
    V20,
    V21,
    V30,
    V31,
}

impl BifVersion {
    /// Version produced by new builds.
    pub const CURRENT: Self = Self::V31;

    /// Every version, oldest first.
    pub const ALL: [Self; 4] = [Self::V20, Self::V21, Self::V30, Self::V31];

    #[must_use]
    pub const fn major(self) -> u8 {
        match self {
            Self::V20 | Self::V21 => 2,
            Self::V30 | Self::V31 => 3,
        }
    }

    #[must_use]
    pub const fn minor(self) -> u8 {
        match self {
            Self::V20 | Self::V30 => 0,
            Self::V21 | Self::V31 => 1,
        }
    }

    #[must_use]
    pub const fn from_bytes(major: u8, minor: u8) -> Option<Self> {
        match (major, minor) {
            (2, 0) => Some(Self::V20),
            (2, 1) => Some(Self::V21),
            (3, 0) => Some(Self::V30),
            (3, 1) => Some(Self::V31),
            _ => None,
        }
    }

    /// Parse `"2.0"`, `"2.1"`, `"3.0"` or `"3.1"`.
    pub fn parse(s: &str) -> Option<Self> {
        let (major, minor) = s.trim().split_once('.')?;
        Self::from_bytes(major.parse().ok()?, minor.parse().ok()?)
    }

    /// 2.x containers encode the target as a raw machine id.
    #[must_use]
    pub const fn is_legacy(self) -> bool {
        self.major() == 2
    }

    /// The next newer version, if any.
    #[must_use]
    pub const fn next(self) -> Option<Self> {
        match self {
            Self::V20 => Some(Self::V21),
            Self::V21 => Some(Self::V30),
            Self::V30 => Some(Self::V31),
            Self::V31 => None,
        }
    }
}

impl Default for BifVersion {
    fn default() -> Self {
        Self::CURRENT
    }
}

impl fmt::Display for BifVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.major(), self.minor())
    }
}
