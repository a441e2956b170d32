//! The parsed option set produced for one build, compile or link call.

use std::fmt;

use crate::table::{table, OptionFlags, OptionId, ValueType};
use crate::variables::{OptionValue, OptionVariables, SourceKind, WorkGroupSize};

/// Which entry point an option string belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OptionScope {
    Build,
    Compile,
    Link,
}

impl fmt::Display for OptionScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Build => write!(f, "build"),
            Self::Compile => write!(f, "compile"),
            Self::Link => write!(f, "link"),
        }
    }
}

/// Set of options that appeared in the string, directly or by implication.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SeenSet(u64);

const _: () = assert!(OptionId::COUNT <= 64, "SeenSet holds one bit per option");

impl SeenSet {
    pub fn insert(&mut self, id: OptionId) {
        self.0 |= 1 << id as u32;
    }

    #[must_use]
    pub fn contains(self, id: OptionId) -> bool {
        self.0 & (1 << id as u32) != 0
    }

    #[must_use]
    pub fn is_empty(self) -> bool {
        self.0 == 0
    }
}

/// Option fragment handed to the backend collaborator.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct OptionFragment {
    pub frontend: String,
    pub backend: String,
    pub linker: String,
    pub target: String,
}

impl fmt::Display for OptionFragment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for part in [&self.frontend, &self.backend, &self.linker] {
            if part.is_empty() {
                continue;
            }
            if !first {
                f.write_str(" ")?;
            }
            f.write_str(part)?;
            first = false;
        }
        if !self.target.is_empty() {
            if !first {
                f.write_str(" ")?;
            }
            write!(f, "-target {}", self.target)?;
        }
        Ok(())
    }
}

/// Parsed options for one call.
///
/// Created per build/compile/link call and owned by it.
#[derive(Debug, Clone, PartialEq)]
pub struct Options {
    /// The typed record.
    pub variables: OptionVariables,
    pub(crate) seen: SeenSet,
    /// Parsed `-wgs` hint.
    pub work_group_size: Option<WorkGroupSize>,
    /// Parsed `-x` language.
    pub source_kind: SourceKind,
    /// Flags accumulated for the front end (`-D`, `-I`, `-Wf,`).
    pub frontend_options: String,
    /// Flags accumulated for the backend (`-Wb,`).
    pub backend_options: String,
    /// Flags accumulated for the linker (`-Wh,`).
    pub linker_options: String,
    /// Accumulating options in the order given, for re-serialization.
    pub(crate) accumulated: Vec<(OptionId, String)>,
    /// The literal option string, verbatim.
    pub orig_option_str: String,
}

impl Default for Options {
    fn default() -> Self {
        let variables = OptionVariables::default();
        let source_kind = SourceKind::parse(&variables.source_kind).unwrap_or_default();
        Self {
            variables,
            seen: SeenSet::default(),
            work_group_size: None,
            source_kind,
            frontend_options: String::new(),
            backend_options: String::new(),
            linker_options: String::new(),
            accumulated: Vec::new(),
            orig_option_str: String::new(),
        }
    }
}

impl Options {
    /// Whether `id` appeared in the string, directly or by implication.
    #[must_use]
    pub fn is_seen(&self, id: OptionId) -> bool {
        self.seen.contains(id)
    }

    #[must_use]
    pub fn seen(&self) -> SeenSet {
        self.seen
    }

    /// Current value of a stored option.
    #[must_use]
    pub fn value(&self, id: OptionId) -> Option<OptionValue> {
        id.descriptor().access.get(&self.variables)
    }

    #[must_use]
    pub fn opt_level(&self) -> i32 {
        self.variables.opt_level
    }

    /// Whether two option sets came from the same literal string.
    #[must_use]
    pub fn same_string(&self, other: &str) -> bool {
        self.orig_option_str.trim() == other.trim()
    }

    /// Re-serialize every seen option into a canonical option string.
    ///
    /// Aliases are rendered through the options they set. Parsing the
    /// result yields the same typed record.
    #[must_use]
    pub fn canonical_string(&self) -> String {
        let mut parts: Vec<String> = Vec::new();

        for desc in table().descriptors() {
            if desc.is_alias() || desc.accumulates() || !self.seen.contains(desc.id) {
                continue;
            }
            let Some(value) = desc.access.get(&self.variables) else {
                continue;
            };
            let spelling = desc.spelling();
            let rendered = match value {
                OptionValue::Bool(true) => Some(format!("-{spelling}")),
                OptionValue::Bool(false) => desc
                    .family_prefix()
                    .map(|prefix| format!("-{prefix}no-{}", desc.name)),
                OptionValue::Int32(n) => Some(render_valued(desc.flags, &spelling, &n.to_string())),
                OptionValue::UInt32(n) => Some(render_valued(desc.flags, &spelling, &n.to_string())),
                OptionValue::Byte(n) => Some(render_valued(desc.flags, &spelling, &n.to_string())),
                OptionValue::Str(s) => Some(render_valued(desc.flags, &spelling, &quote(&s))),
            };
            parts.extend(rendered);
        }

        for (id, value) in &self.accumulated {
            let desc = id.descriptor();
            parts.push(format!("-{}{}", desc.name, quote(value)));
        }

        parts.join(" ")
    }

    /// Assemble the option fragment passed to the backend.
    ///
    /// `target` names the device target; `-mcpu=` overrides it.
    #[must_use]
    pub fn fragment(&self, target: &str) -> OptionFragment {
        let vars = &self.variables;
        let mut frontend: Vec<String> = Vec::new();
        let mut backend: Vec<String> = Vec::new();

        if !vars.cl_std.is_empty() {
            frontend.push(format!("-cl-std={}", vars.cl_std));
        }
        if self.source_kind != SourceKind::Clc {
            frontend.push(format!("-x {}", self.source_kind));
        }
        for desc in table().descriptors() {
            if desc.value_type != ValueType::Bool || desc.is_alias() {
                continue;
            }
            let Some(OptionValue::Bool(true)) = desc.access.get(vars) else {
                continue;
            };
            // Flags owned by both stages go to both fragments.
            if desc.flags.contains(OptionFlags::FRONTEND) {
                frontend.push(format!("-{}", desc.spelling()));
            }
            if desc.flags.contains(OptionFlags::BACKEND) && desc.family_prefix().is_none() {
                backend.push(format!("-{}", desc.spelling()));
            }
        }
        if !self.frontend_options.is_empty() {
            frontend.push(self.frontend_options.clone());
        }

        backend.insert(0, format!("-O{}", vars.opt_level));
        if !vars.inline {
            backend.push("-fno-inline".to_string());
        }
        if vars.wavefront_size64 {
            backend.push("-mwavefrontsize64".to_string());
        }
        if vars.xnack {
            backend.push("-mxnack".to_string());
        }
        if vars.max_vgprs != 0 {
            backend.push(format!("-mmax-vgprs={}", vars.max_vgprs));
        }
        if vars.waves_per_eu != 0 {
            backend.push(format!("-mwaves-per-eu={}", vars.waves_per_eu));
        }
        if let Some(wgs) = self.work_group_size {
            backend.push(format!("-wgs={wgs}"));
        }
        if !self.backend_options.is_empty() {
            backend.push(self.backend_options.clone());
        }

        let target = if vars.mcpu.is_empty() {
            target.to_string()
        } else {
            vars.mcpu.clone()
        };

        OptionFragment {
            frontend: frontend.join(" "),
            backend: backend.join(" "),
            linker: self.linker_options.clone(),
            target,
        }
    }

    /// Append a flag to one of the accumulated flag strings.
    pub(crate) fn accumulate(&mut self, id: OptionId, value: &str) {
        let (target, flag) = match id {
            OptionId::Define => (&mut self.frontend_options, format!("-D{value}")),
            OptionId::IncludeDir => (&mut self.frontend_options, format!("-I{value}")),
            OptionId::FrontendPassthrough => (&mut self.frontend_options, value.replace(',', " ")),
            OptionId::BackendPassthrough => (&mut self.backend_options, value.replace(',', " ")),
            OptionId::LinkerPassthrough => (&mut self.linker_options, value.replace(',', " ")),
            _ => return,
        };
        if !target.is_empty() {
            target.push(' ');
        }
        target.push_str(&flag);
        self.accumulated.push((id, value.to_string()));
    }
}

fn render_valued(flags: OptionFlags, spelling: &str, value: &str) -> String {
    if flags.contains(OptionFlags::SEP_NONE) {
        format!("-{spelling}{value}")
    } else if flags.contains(OptionFlags::SEP_EQUAL) {
        format!("-{spelling}={value}")
    } else {
        format!("-{spelling} {value}")
    }
}

/// Quote a value so the tokenizer reads it back unchanged.
///
/// Empty values and values with spaces or quotes are wrapped; backslashes
/// and quotes inside the wrapping are escaped.
fn quote(value: &str) -> String {
    if !value.is_empty() && !value.contains([' ', '"']) {
        return value.to_string();
    }
    let mut out = String::with_capacity(value.len() + 2);
    out.push('"');
    for ch in value.chars() {
        if matches!(ch, '"' | '\\') {
            out.push('\\');
        }
        out.push(ch);
    }
    out.push('"');
    out
}

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    reason = "tests use unwrap to panic on unexpected state"
)]
