//! Environment overrides for option strings.
//!
//! Overrides are read once into an [`EnvOverrides`] value so callers and tests
//! can apply them without touching the process environment again.

use tracing::debug;

/// Replaces caller build/compile options when the call site allows it.
pub const BUILD_OPTIONS_VAR: &str = "KILN_BUILD_OPTIONS";
/// Appended to build/compile options.
pub const BUILD_OPTIONS_APPEND_VAR: &str = "KILN_BUILD_OPTIONS_APPEND";
/// Appended to link options.
pub const LINK_OPTIONS_APPEND_VAR: &str = "KILN_LINK_OPTIONS_APPEND";

/// Option-string overrides taken from the environment.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct EnvOverrides {
    pub build_options: Option<String>,
    pub build_options_append: Option<String>,
    pub link_options_append: Option<String>,
}

impl EnvOverrides {
    /// Read overrides from the process environment.
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Read overrides through `lookup`. Empty values count as unset.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let read = |name: &str| lookup(name).filter(|value| !value.trim().is_empty());
        Self {
            build_options: read(BUILD_OPTIONS_VAR),
            build_options_append: read(BUILD_OPTIONS_APPEND_VAR),
            link_options_append: read(LINK_OPTIONS_APPEND_VAR),
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.build_options.is_none()
            && self.build_options_append.is_none()
            && self.link_options_append.is_none()
    }

    /// The option string a build or compile call should parse.
    ///
    /// The replacement applies only when `changeable`; the append string
    /// always applies.
    #[must_use]
    pub fn apply_build(&self, user: &str, changeable: bool) -> String {
        let base = match &self.build_options {
            Some(replacement) if changeable => {
                debug!(replacement = %replacement, "replacing build options from environment");
                replacement.as_str()
            }
            _ => user,
        };
        join(base, self.build_options_append.as_deref())
    }

    /// The option string a link call should parse. Link options are never
    /// replaced.
    #[must_use]
    pub fn apply_link(&self, user: &str) -> String {
        join(user, self.link_options_append.as_deref())
    }
}

fn join(base: &str, append: Option<&str>) -> String {
    match append {
        Some(extra) if base.trim().is_empty() => extra.to_string(),
        Some(extra) => format!("{base} {extra}"),
        None => base.to_string(),
    }
}

#[cfg(test)]
mod tests;
