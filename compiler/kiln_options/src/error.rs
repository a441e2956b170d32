//! Option parsing errors.

use std::fmt;

/// Why a token was rejected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OptionErrorKind {
    /// The token doesn't start with `-`.
    NotAnOption,
    /// No descriptor matches the token.
    UnknownOption,
    /// A required value is missing.
    MissingValue,
    /// A value was given to an option that takes none.
    ValueNotAllowed,
    /// The separator used isn't legal for this option.
    SeparatorNotAllowed(&'static str),
    /// `-fno-`/`-mno-` applied to a non-boolean option.
    NegationNotAllowed,
    /// The value isn't an integer.
    InvalidInteger(String),
    /// The value is outside the declared range.
    OutOfRange { min: i64, max: i64 },
    /// The value isn't one of the accepted spellings.
    InvalidValue { expected: &'static str },
    /// A `-wgs` value that doesn't describe a legal work-group.
    InvalidWorkGroupSize(String),
    /// A non-link option in a link option string.
    NotLinkOption,
    /// A link-only option in a build or compile option string.
    LinkOnly,
    /// A double quote was opened but never closed.
    UnterminatedQuote,
}

impl fmt::Display for OptionErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotAnOption => write!(f, "options must start with '-'"),
            Self::UnknownOption => write!(f, "unknown option"),
            Self::MissingValue => write!(f, "missing value"),
            Self::ValueNotAllowed => write!(f, "option does not take a value"),
            Self::SeparatorNotAllowed(sep) => write!(f, "'{sep}' separator is not allowed"),
            Self::NegationNotAllowed => write!(f, "only boolean options can be negated"),
            Self::InvalidInteger(value) => write!(f, "'{value}' is not an integer"),
            Self::OutOfRange { min, max } => write!(f, "Value should be in [{min}, {max}]"),
            Self::InvalidValue { expected } => write!(f, "expected one of: {expected}"),
            Self::InvalidWorkGroupSize(reason) => write!(f, "invalid work-group size: {reason}"),
            Self::NotLinkOption => write!(f, "not a valid link option"),
            Self::LinkOnly => write!(f, "only valid as a link option"),
            Self::UnterminatedQuote => write!(f, "unterminated quote"),
        }
    }
}

/// A rejected option token.
///
/// `token` is the offending substring of the option string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OptionError {
    pub token: String,
    pub kind: OptionErrorKind,
}

impl OptionError {
    pub(crate) fn new(token: impl Into<String>, kind: OptionErrorKind) -> Self {
        Self {
            token: token.into(),
            kind,
        }
    }
}

impl fmt::Display for OptionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Invalid option '{}': {}", self.token, self.kind)
    }
}

impl std::error::Error for OptionError {}
