//! The static option descriptor table and its lookup maps.
//!
//! One [`OptionDescriptor`] per [`OptionId`], stored at index `id as usize`.
//! The table and its name maps are built once per process behind a
//! [`OnceLock`] and never mutated afterwards, so any thread may read them
//! without locking.

use std::sync::OnceLock;

use bitflags::bitflags;
use rustc_hash::FxHashMap;

use crate::variables::{OptionValue, OptionVariables};

/// Identifies one option descriptor.
///
/// Discriminants are dense and equal the descriptor's index in the table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum OptionId {
    OptLevel,
    OptDebug,
    OptSize,
    OptFast,
    Debug,
    SuppressWarnings,
    WarningsAsErrors,
    Verbose,
    Help,
    SaveTemps,
    Version,
    Define,
    IncludeDir,
    ClStd,
    SinglePrecisionConstant,
    DenormsAreZero,
    Fp32CorrectlyRoundedDivideSqrt,
    StrictAliasing,
    KernelArgInfo,
    UniformWorkGroupSize,
    MadEnable,
    NoSignedZeros,
    FiniteMathOnly,
    UnsafeMathOptimizations,
    FastRelaxedMath,
    OptDisable,
    WorkGroupSize,
    SourceKind,
    FrontendPassthrough,
    BackendPassthrough,
    LinkerPassthrough,
    CreateLibrary,
    EnableLinkOptions,
    Legacy,
    BinSource,
    BinLlvmIr,
    BinExe,
    Inline,
    Cpu,
    WavefrontSize64,
    Xnack,
    MaxVgprs,
    WavesPerEu,
}

impl OptionId {
    /// Number of descriptors in the table.
    pub const COUNT: usize = OptionId::WavesPerEu as usize + 1;

    /// The descriptor for this option.
    #[must_use]
    pub fn descriptor(self) -> &'static OptionDescriptor {
        table().get(self)
    }
}

bitflags! {
    /// Attributes of an option descriptor.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct OptionFlags: u32 {
        /// Consumed by the runtime itself.
        const RUNTIME = 1 << 0;
        /// Forwarded to the front end.
        const FRONTEND = 1 << 1;
        /// Forwarded to the backend code generator.
        const BACKEND = 1 << 2;
        /// Accepted in link option strings.
        const LINK = 1 << 3;
        /// Accepted only in link option strings.
        const LINK_ONLY = 1 << 4;
        /// `-name=value`
        const SEP_EQUAL = 1 << 5;
        /// `-name value`
        const SEP_SPACE = 1 << 6;
        /// `-namevalue`
        const SEP_NONE = 1 << 7;
        const VALUE_REQUIRED = 1 << 8;
        const VALUE_OPTIONAL = 1 << 9;
        const VALUE_DISALLOWED = 1 << 10;
        /// Lives in the `-f`/`-fno-` family.
        const FAMILY_F = 1 << 11;
        /// Lives in the `-m`/`-mno-` family.
        const FAMILY_M = 1 << 12;
        /// Defined purely in terms of other options; has no storage.
        const ALIAS = 1 << 13;
        /// Appends to an accumulated flag string instead of a record field.
        const ACCUMULATE = 1 << 14;
    }
}

/// Storage type of an option value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueType {
    Bool,
    Int32,
    UInt32,
    Str,
    Byte,
}

/// Value used when an option never appears in the option string.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DefaultValue {
    Bool(bool),
    Int(i64),
    Str(&'static str),
    /// Aliases and accumulators carry no default.
    None,
}

/// Typed field access into [`OptionVariables`].
///
/// Each variant holds a getter and a setter for one field, replacing raw
/// offsets into an untyped blob.
#[derive(Clone, Copy)]
pub enum Accessor {
    Bool(
        fn(&OptionVariables) -> &bool,
        fn(&mut OptionVariables) -> &mut bool,
    ),
    Int32(
        fn(&OptionVariables) -> &i32,
        fn(&mut OptionVariables) -> &mut i32,
    ),
    UInt32(
        fn(&OptionVariables) -> &u32,
        fn(&mut OptionVariables) -> &mut u32,
    ),
    Str(
        fn(&OptionVariables) -> &String,
        fn(&mut OptionVariables) -> &mut String,
    ),
    Byte(
        fn(&OptionVariables) -> &u8,
        fn(&mut OptionVariables) -> &mut u8,
    ),
    None,
}

impl Accessor {
    /// Read the field, or `None` for storage-less options.
    #[must_use]
    pub fn get(&self, vars: &OptionVariables) -> Option<OptionValue> {
        match self {
            Self::Bool(get, _) => Some(OptionValue::Bool(*get(vars))),
            Self::Int32(get, _) => Some(OptionValue::Int32(*get(vars))),
            Self::UInt32(get, _) => Some(OptionValue::UInt32(*get(vars))),
            Self::Str(get, _) => Some(OptionValue::Str(get(vars).clone())),
            Self::Byte(get, _) => Some(OptionValue::Byte(*get(vars))),
            Self::None => None,
        }
    }

    /// Write the field. Returns `false` if the value's type doesn't match.
    pub fn set(&self, vars: &mut OptionVariables, value: OptionValue) -> bool {
        match (self, value) {
            (Self::Bool(_, set), OptionValue::Bool(b)) => *set(vars) = b,
            (Self::Int32(_, set), OptionValue::Int32(n)) => *set(vars) = n,
            (Self::UInt32(_, set), OptionValue::UInt32(n)) => *set(vars) = n,
            (Self::Str(_, set), OptionValue::Str(s)) => *set(vars) = s,
            (Self::Byte(_, set), OptionValue::Byte(n)) => *set(vars) = n,
            _ => return false,
        }
        true
    }
}

impl std::fmt::Debug for Accessor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let kind = match self {
            Self::Bool(..) => "Bool",
            Self::Int32(..) => "Int32",
            Self::UInt32(..) => "UInt32",
            Self::Str(..) => "Str",
            Self::Byte(..) => "Byte",
            Self::None => "None",
        };
        write!(f, "Accessor::{kind}")
    }
}

macro_rules! field {
    ($variant:ident, $field:ident) => {
        Accessor::$variant(|v| &v.$field, |v| &mut v.$field)
    };
}

/// Describes one option: its spelling, type, default, range and syntax.
#[derive(Debug, Clone)]
pub struct OptionDescriptor {
    pub id: OptionId,
    /// Spelling after `-` (and after the family prefix for family options).
    pub name: &'static str,
    /// Spelling after `--`, if the option has a long form.
    pub long_name: Option<&'static str>,
    pub value_type: ValueType,
    pub flags: OptionFlags,
    pub default: DefaultValue,
    /// Inclusive legal range for numeric options.
    pub range: Option<(i64, i64)>,
    pub access: Accessor,
    pub help: &'static str,
}

impl OptionDescriptor {
    fn new(id: OptionId, name: &'static str, value_type: ValueType, flags: OptionFlags) -> Self {
        Self {
            id,
            name,
            long_name: None,
            value_type,
            flags,
            default: DefaultValue::None,
            range: None,
            access: Accessor::None,
            help: "",
        }
    }

    fn long(mut self, name: &'static str) -> Self {
        self.long_name = Some(name);
        self
    }

    fn default(mut self, default: DefaultValue) -> Self {
        self.default = default;
        self
    }

    fn range(mut self, min: i64, max: i64) -> Self {
        self.range = Some((min, max));
        self
    }

    fn access(mut self, access: Accessor) -> Self {
        self.access = access;
        self
    }

    fn help(mut self, help: &'static str) -> Self {
        self.help = help;
        self
    }

    #[must_use]
    pub fn is_alias(&self) -> bool {
        self.flags.contains(OptionFlags::ALIAS)
    }

    #[must_use]
    pub fn accumulates(&self) -> bool {
        self.flags.contains(OptionFlags::ACCUMULATE)
    }

    /// The family prefix (`f` or `m`), if any.
    #[must_use]
    pub fn family_prefix(&self) -> Option<&'static str> {
        if self.flags.contains(OptionFlags::FAMILY_F) {
            Some("f")
        } else if self.flags.contains(OptionFlags::FAMILY_M) {
            Some("m")
        } else {
            None
        }
    }

    /// Full spelling after the leading dash, including any family prefix.
    #[must_use]
    pub fn spelling(&self) -> String {
        match self.family_prefix() {
            Some(prefix) => format!("{prefix}{}", self.name),
            None => self.name.to_string(),
        }
    }

    /// Write the declared default into `vars`.
    pub(crate) fn apply_default(&self, vars: &mut OptionVariables) {
        let value = match (self.default, self.value_type) {
            (DefaultValue::Bool(b), _) => OptionValue::Bool(b),
            (DefaultValue::Str(s), _) => OptionValue::Str(s.to_string()),
            (DefaultValue::Int(n), ValueType::Int32) => {
                OptionValue::Int32(i32::try_from(n).unwrap_or_default())
            }
            (DefaultValue::Int(n), ValueType::UInt32) => {
                OptionValue::UInt32(u32::try_from(n).unwrap_or_default())
            }
            (DefaultValue::Int(n), ValueType::Byte) => {
                OptionValue::Byte(u8::try_from(n).unwrap_or_default())
            }
            (DefaultValue::Int(_) | DefaultValue::None, _) => return,
        };
        self.access.set(vars, value);
    }
}

/// Value given to an optional-value option that appears without one.
///
/// This is distinct from the table default, which applies only when the
/// option never appears.
pub const SECOND_DEFAULTS: &[(OptionId, &str)] = &[
    (OptionId::OptLevel, "2"),
    (OptionId::Help, "public"),
    (OptionId::SaveTemps, "_temp"),
];

/// Look up the second default for an option.
#[must_use]
pub fn second_default(id: OptionId) -> Option<&'static str> {
    SECOND_DEFAULTS
        .iter()
        .find(|(candidate, _)| *candidate == id)
        .map(|(_, value)| *value)
}

/// The immutable, process-wide option table.
pub struct OptionsTable {
    descriptors: Vec<OptionDescriptor>,
    short_names: FxHashMap<&'static str, OptionId>,
    long_names: FxHashMap<&'static str, OptionId>,
    /// Options accepting a glued value, longest name first.
    glued: Vec<OptionId>,
    f_family: FxHashMap<&'static str, OptionId>,
    m_family: FxHashMap<&'static str, OptionId>,
}

impl OptionsTable {
    fn build() -> Self {
        let descriptors = descriptors();
        assert_eq!(descriptors.len(), OptionId::COUNT, "option table is incomplete");

        let mut short_names = FxHashMap::default();
        let mut long_names = FxHashMap::default();
        let mut f_family = FxHashMap::default();
        let mut m_family = FxHashMap::default();
        let mut glued = Vec::new();

        for (index, desc) in descriptors.iter().enumerate() {
            assert_eq!(desc.id as usize, index, "option table out of order at {}", desc.name);
            assert!(
                !desc.flags.contains(OptionFlags::VALUE_OPTIONAL)
                    || second_default(desc.id).is_some(),
                "optional-value option -{} has no second default",
                desc.name
            );

            if desc.flags.contains(OptionFlags::FAMILY_F) {
                f_family.insert(desc.name, desc.id);
            } else if desc.flags.contains(OptionFlags::FAMILY_M) {
                m_family.insert(desc.name, desc.id);
            } else {
                short_names.insert(desc.name, desc.id);
                if desc.flags.contains(OptionFlags::SEP_NONE) {
                    glued.push(desc.id);
                }
            }
            if let Some(long) = desc.long_name {
                long_names.insert(long, desc.id);
            }
        }

        glued.sort_by_key(|id| std::cmp::Reverse(descriptors[*id as usize].name.len()));

        Self {
            descriptors,
            short_names,
            long_names,
            glued,
            f_family,
            m_family,
        }
    }

    #[must_use]
    pub fn get(&self, id: OptionId) -> &OptionDescriptor {
        &self.descriptors[id as usize]
    }

    #[must_use]
    pub fn descriptors(&self) -> &[OptionDescriptor] {
        &self.descriptors
    }

    /// Exact lookup of a `-name` spelling.
    #[must_use]
    pub fn find_short(&self, name: &str) -> Option<&OptionDescriptor> {
        self.short_names.get(name).map(|id| self.get(*id))
    }

    /// Exact lookup of a `--name` spelling.
    #[must_use]
    pub fn find_long(&self, name: &str) -> Option<&OptionDescriptor> {
        self.long_names.get(name).map(|id| self.get(*id))
    }

    /// Longest glued-value option whose name is a strict prefix of `body`.
    #[must_use]
    pub fn find_glued<'a>(&self, body: &'a str) -> Option<(&OptionDescriptor, &'a str)> {
        self.glued.iter().find_map(|id| {
            let desc = self.get(*id);
            body.strip_prefix(desc.name)
                .filter(|rest| !rest.is_empty())
                .map(|rest| (desc, rest))
        })
    }

    /// Lookup within the `-f` family.
    #[must_use]
    pub fn find_f(&self, name: &str) -> Option<&OptionDescriptor> {
        self.f_family.get(name).map(|id| self.get(*id))
    }

    /// Lookup within the `-m` family.
    #[must_use]
    pub fn find_m(&self, name: &str) -> Option<&OptionDescriptor> {
        self.m_family.get(name).map(|id| self.get(*id))
    }
}

/// The process-wide option table, built on first use.
pub fn table() -> &'static OptionsTable {
    static TABLE: OnceLock<OptionsTable> = OnceLock::new();
    TABLE.get_or_init(OptionsTable::build)
}

#[allow(
    clippy::too_many_lines,
    reason = "one entry per option; splitting the table would scatter it"
)]
fn descriptors() -> Vec<OptionDescriptor> {
    use DefaultValue as D;
    use OptionFlags as F;
    use OptionId as Id;
    use ValueType as T;

    let flag = F::VALUE_DISALLOWED;
    let math = F::RUNTIME | F::FRONTEND | F::BACKEND | F::LINK | flag;

    vec![
        OptionDescriptor::new(Id::OptLevel, "O", T::Int32, F::RUNTIME | F::BACKEND | F::SEP_NONE | F::VALUE_OPTIONAL)
            .default(D::Int(3))
            .range(0, 5)
            .access(field!(Int32, opt_level))
            .help("Optimization level"),
        OptionDescriptor::new(Id::OptDebug, "Og", T::Bool, F::BACKEND | flag)
            .default(D::Bool(false))
            .access(field!(Bool, opt_debug))
            .help("Optimize for debuggability"),
        OptionDescriptor::new(Id::OptSize, "Os", T::Bool, F::BACKEND | flag)
            .default(D::Bool(false))
            .access(field!(Bool, opt_size))
            .help("Optimize for code size"),
        OptionDescriptor::new(Id::OptFast, "Ofast", T::Bool, F::ALIAS | flag)
            .help("Alias for -O3 -cl-fast-relaxed-math"),
        OptionDescriptor::new(Id::Debug, "g", T::Bool, F::RUNTIME | F::FRONTEND | F::BACKEND | flag)
            .default(D::Bool(false))
            .access(field!(Bool, enable_debug))
            .help("Generate debug information"),
        OptionDescriptor::new(Id::SuppressWarnings, "w", T::Bool, F::FRONTEND | F::LINK | flag)
            .default(D::Bool(false))
            .access(field!(Bool, suppress_warnings))
            .help("Inhibit all warnings"),
        OptionDescriptor::new(Id::WarningsAsErrors, "Werror", T::Bool, F::FRONTEND | F::LINK | flag)
            .default(D::Bool(false))
            .access(field!(Bool, warnings_as_errors))
            .help("Make all warnings into errors"),
        OptionDescriptor::new(Id::Verbose, "v", T::Bool, F::RUNTIME | F::LINK | flag)
            .default(D::Bool(false))
            .access(field!(Bool, verbose))
            .help("Show commands run during the build"),
        OptionDescriptor::new(Id::Help, "h", T::Str, F::RUNTIME | F::SEP_EQUAL | F::VALUE_OPTIONAL)
            .long("help")
            .default(D::Str(""))
            .access(field!(Str, help))
            .help("Show option help (public, all)"),
        OptionDescriptor::new(Id::SaveTemps, "save-temps", T::Str, F::RUNTIME | F::SEP_EQUAL | F::VALUE_OPTIONAL)
            .default(D::Str(""))
            .access(field!(Str, save_temps))
            .help("Keep intermediate files, optionally under a prefix"),
        OptionDescriptor::new(Id::Version, "version", T::Bool, F::RUNTIME | flag)
            .long("version")
            .default(D::Bool(false))
            .access(field!(Bool, show_version))
            .help("Print the compiler version"),
        OptionDescriptor::new(Id::Define, "D", T::Str, F::FRONTEND | F::ACCUMULATE | F::SEP_NONE | F::SEP_SPACE | F::VALUE_REQUIRED)
            .help("Define a preprocessor macro"),
        OptionDescriptor::new(Id::IncludeDir, "I", T::Str, F::FRONTEND | F::ACCUMULATE | F::SEP_NONE | F::SEP_SPACE | F::VALUE_REQUIRED)
            .help("Add a header search directory"),
        OptionDescriptor::new(Id::ClStd, "cl-std", T::Str, F::FRONTEND | F::SEP_EQUAL | F::VALUE_REQUIRED)
            .default(D::Str(""))
            .access(field!(Str, cl_std))
            .help("Language version (CL1.0 .. CL3.0)"),
        OptionDescriptor::new(Id::SinglePrecisionConstant, "cl-single-precision-constant", T::Bool, F::FRONTEND | flag)
            .default(D::Bool(false))
            .access(field!(Bool, single_precision_constant))
            .help("Treat double constants as float"),
        OptionDescriptor::new(Id::DenormsAreZero, "cl-denorms-are-zero", T::Bool, math)
            .default(D::Bool(false))
            .access(field!(Bool, denorms_are_zero))
            .help("Flush denormals to zero"),
        OptionDescriptor::new(Id::Fp32CorrectlyRoundedDivideSqrt, "cl-fp32-correctly-rounded-divide-sqrt", T::Bool, F::FRONTEND | F::BACKEND | flag)
            .default(D::Bool(false))
            .access(field!(Bool, fp32_correctly_rounded_divide_sqrt))
            .help("Correctly round single precision divide and sqrt"),
        OptionDescriptor::new(Id::StrictAliasing, "cl-strict-aliasing", T::Bool, F::FRONTEND | flag)
            .default(D::Bool(false))
            .access(field!(Bool, strict_aliasing))
            .help("Assume strict aliasing rules"),
        OptionDescriptor::new(Id::KernelArgInfo, "cl-kernel-arg-info", T::Bool, F::RUNTIME | F::FRONTEND | flag)
            .default(D::Bool(false))
            .access(field!(Bool, kernel_arg_info))
            .help("Keep kernel argument metadata"),
        OptionDescriptor::new(Id::UniformWorkGroupSize, "cl-uniform-work-group-size", T::Bool, F::FRONTEND | F::BACKEND | flag)
            .default(D::Bool(false))
            .access(field!(Bool, uniform_work_group_size))
            .help("Require uniform work-group sizes"),
        OptionDescriptor::new(Id::MadEnable, "cl-mad-enable", T::Bool, math)
            .default(D::Bool(false))
            .access(field!(Bool, mad_enable))
            .help("Allow a * b + c to be fused"),
        OptionDescriptor::new(Id::NoSignedZeros, "cl-no-signed-zeros", T::Bool, math)
            .default(D::Bool(false))
            .access(field!(Bool, no_signed_zeros))
            .help("Ignore the sign of zero"),
        OptionDescriptor::new(Id::FiniteMathOnly, "cl-finite-math-only", T::Bool, math)
            .default(D::Bool(false))
            .access(field!(Bool, finite_math_only))
            .help("Assume no NaNs or infinities"),
        OptionDescriptor::new(Id::UnsafeMathOptimizations, "cl-unsafe-math-optimizations", T::Bool, math)
            .default(D::Bool(false))
            .access(field!(Bool, unsafe_math_optimizations))
            .help("Allow unsafe floating point optimizations"),
        OptionDescriptor::new(Id::FastRelaxedMath, "cl-fast-relaxed-math", T::Bool, math)
            .default(D::Bool(false))
            .access(field!(Bool, fast_relaxed_math))
            .help("Enable every relaxed math optimization"),
        OptionDescriptor::new(Id::OptDisable, "cl-opt-disable", T::Bool, F::ALIAS | flag)
            .help("Alias for -O0"),
        OptionDescriptor::new(Id::WorkGroupSize, "wgs", T::Str, F::RUNTIME | F::BACKEND | F::SEP_EQUAL | F::VALUE_REQUIRED)
            .default(D::Str(""))
            .access(field!(Str, work_group_size))
            .help("Work-group size hint x[,y[,z]]"),
        OptionDescriptor::new(Id::SourceKind, "x", T::Str, F::RUNTIME | F::FRONTEND | F::SEP_NONE | F::SEP_SPACE | F::VALUE_REQUIRED)
            .default(D::Str("clc"))
            .access(field!(Str, source_kind))
            .help("Input language (clc, clc++, spir, spirv, asm, il)"),
        OptionDescriptor::new(Id::FrontendPassthrough, "Wf,", T::Str, F::FRONTEND | F::ACCUMULATE | F::SEP_NONE | F::VALUE_REQUIRED)
            .help("Pass comma separated options to the front end"),
        OptionDescriptor::new(Id::BackendPassthrough, "Wb,", T::Str, F::BACKEND | F::ACCUMULATE | F::SEP_NONE | F::VALUE_REQUIRED)
            .help("Pass comma separated options to the backend"),
        OptionDescriptor::new(Id::LinkerPassthrough, "Wh,", T::Str, F::LINK | F::ACCUMULATE | F::SEP_NONE | F::VALUE_REQUIRED)
            .help("Pass comma separated options to the linker"),
        OptionDescriptor::new(Id::CreateLibrary, "create-library", T::Bool, F::RUNTIME | F::LINK | F::LINK_ONLY | flag)
            .default(D::Bool(false))
            .access(field!(Bool, create_library))
            .help("Link into a library instead of an executable"),
        OptionDescriptor::new(Id::EnableLinkOptions, "enable-link-options", T::Bool, F::RUNTIME | F::LINK | F::LINK_ONLY | flag)
            .default(D::Bool(false))
            .access(field!(Bool, enable_link_options))
            .help("Allow link options to change library code generation"),
        OptionDescriptor::new(Id::Legacy, "legacy", T::Bool, F::RUNTIME | F::FRONTEND | flag)
            .default(D::Bool(false))
            .access(field!(Bool, legacy))
            .help("Use the legacy front end"),
        OptionDescriptor::new(Id::BinSource, "bin-source", T::Bool, F::RUNTIME | F::FAMILY_F | flag)
            .default(D::Bool(false))
            .access(field!(Bool, bin_source))
            .help("Embed the source in the program binary"),
        OptionDescriptor::new(Id::BinLlvmIr, "bin-llvmir", T::Bool, F::RUNTIME | F::FAMILY_F | flag)
            .default(D::Bool(true))
            .access(field!(Bool, bin_llvmir))
            .help("Keep the intermediate representation in executables"),
        OptionDescriptor::new(Id::BinExe, "bin-exe", T::Bool, F::RUNTIME | F::FAMILY_F | flag)
            .default(D::Bool(true))
            .access(field!(Bool, bin_exe))
            .help("Keep device code in the program binary"),
        OptionDescriptor::new(Id::Inline, "inline", T::Bool, F::BACKEND | F::FAMILY_F | flag)
            .default(D::Bool(true))
            .access(field!(Bool, inline))
            .help("Inline functions"),
        OptionDescriptor::new(Id::Cpu, "cpu", T::Str, F::BACKEND | F::FAMILY_M | F::SEP_EQUAL | F::VALUE_REQUIRED)
            .default(D::Str(""))
            .access(field!(Str, mcpu))
            .help("Override the target chip"),
        OptionDescriptor::new(Id::WavefrontSize64, "wavefrontsize64", T::Bool, F::BACKEND | F::FAMILY_M | flag)
            .default(D::Bool(false))
            .access(field!(Bool, wavefront_size64))
            .help("Use 64-wide wavefronts"),
        OptionDescriptor::new(Id::Xnack, "xnack", T::Bool, F::BACKEND | F::FAMILY_M | flag)
            .default(D::Bool(false))
            .access(field!(Bool, xnack))
            .help("Enable page-fault replay"),
        OptionDescriptor::new(Id::MaxVgprs, "max-vgprs", T::UInt32, F::BACKEND | F::FAMILY_M | F::SEP_EQUAL | F::VALUE_REQUIRED)
            .default(D::Int(0))
            .range(0, 256)
            .access(field!(UInt32, max_vgprs))
            .help("Cap vector registers per work-item (0 = no cap)"),
        OptionDescriptor::new(Id::WavesPerEu, "waves-per-eu", T::Byte, F::BACKEND | F::FAMILY_M | F::SEP_EQUAL | F::VALUE_REQUIRED)
            .default(D::Int(0))
            .range(0, 10)
            .access(field!(Byte, waves_per_eu))
            .help("Occupancy hint (0 = backend choice)"),
    ]
}

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    reason = "tests use unwrap to panic on unexpected state"
)]
mod tests;
