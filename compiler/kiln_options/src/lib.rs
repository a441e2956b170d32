//! Build option table and parser for kiln.
//!
//! Converts a flat option string such as `-O2 -g -wgs=4,4,1` into a typed
//! [`Options`] record. The descriptor table in [`table`] is the single source
//! of truth for every option's name, type, default, range and syntax.
//!
//! # Usage
//!
//! ```ignore
//! use kiln_options::{OptionScope, Options};
//!
//! let options = Options::parse("-O2 -cl-fast-relaxed-math", OptionScope::Build)?;
//! assert_eq!(options.opt_level(), 2);
//! assert!(options.variables.mad_enable);
//! ```

mod env;
mod error;
mod options;
mod parser;
pub mod table;
mod variables;

pub use env::{EnvOverrides, BUILD_OPTIONS_APPEND_VAR, BUILD_OPTIONS_VAR, LINK_OPTIONS_APPEND_VAR};
pub use error::{OptionError, OptionErrorKind};
pub use options::{OptionFragment, OptionScope, Options, SeenSet};
pub use table::{second_default, OptionDescriptor, OptionFlags, OptionId, ValueType};
pub use variables::{OptionValue, OptionVariables, SourceKind, WorkGroupSize, MAX_WORK_GROUP_SIZE};
