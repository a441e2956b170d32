//! The typed option record and the values that flow in and out of it.
//!
//! Every field of [`OptionVariables`] is owned by exactly one descriptor in
//! the option table; the table supplies its name, default, range, and the
//! accessor used by the parser to read and write it.

use std::fmt;

/// The flat, typed record of every stored option.
///
/// Construct with [`Default`], which applies the defaults declared in the
/// option table. Aliases and accumulating options (`-D`, `-I`, `-Wf,`, ...)
/// have no field here.
#[derive(Debug, Clone, PartialEq, Eq)]
#[allow(
    clippy::struct_excessive_bools,
    reason = "one independent flag per boolean option descriptor"
)]
pub struct OptionVariables {
    /// `-O<n>`
    pub opt_level: i32,
    /// `-Og`
    pub opt_debug: bool,
    /// `-Os`
    pub opt_size: bool,
    /// `-g`
    pub enable_debug: bool,
    /// `-w`
    pub suppress_warnings: bool,
    /// `-Werror`
    pub warnings_as_errors: bool,
    /// `-v`
    pub verbose: bool,
    /// `-h[=topic]`, `--help[=topic]`; empty when never requested.
    pub help: String,
    /// `-save-temps[=prefix]`; empty when never requested.
    pub save_temps: String,
    /// `--version`
    pub show_version: bool,
    /// `-cl-std=`
    pub cl_std: String,
    pub single_precision_constant: bool,
    pub denorms_are_zero: bool,
    pub fp32_correctly_rounded_divide_sqrt: bool,
    pub strict_aliasing: bool,
    pub kernel_arg_info: bool,
    pub uniform_work_group_size: bool,
    pub mad_enable: bool,
    pub no_signed_zeros: bool,
    pub finite_math_only: bool,
    pub unsafe_math_optimizations: bool,
    pub fast_relaxed_math: bool,
    /// Raw `-wgs=` text; the parsed form lives in `Options::work_group_size`.
    pub work_group_size: String,
    /// Raw `-x` text; the parsed form lives in `Options::source_kind`.
    pub source_kind: String,
    pub create_library: bool,
    pub enable_link_options: bool,
    /// `-legacy`: use the legacy front end.
    pub legacy: bool,
    pub bin_source: bool,
    pub bin_llvmir: bool,
    pub bin_exe: bool,
    pub inline: bool,
    /// `-mcpu=`
    pub mcpu: String,
    pub wavefront_size64: bool,
    pub xnack: bool,
    pub max_vgprs: u32,
    pub waves_per_eu: u8,
}

impl OptionVariables {
    /// All-zero record, before table defaults are applied.
    pub(crate) const fn blank() -> Self {
        Self {
            opt_level: 0,
            opt_debug: false,
            opt_size: false,
            enable_debug: false,
            suppress_warnings: false,
            warnings_as_errors: false,
            verbose: false,
            help: String::new(),
            save_temps: String::new(),
            show_version: false,
            cl_std: String::new(),
            single_precision_constant: false,
            denorms_are_zero: false,
            fp32_correctly_rounded_divide_sqrt: false,
            strict_aliasing: false,
            kernel_arg_info: false,
            uniform_work_group_size: false,
            mad_enable: false,
            no_signed_zeros: false,
            finite_math_only: false,
            unsafe_math_optimizations: false,
            fast_relaxed_math: false,
            work_group_size: String::new(),
            source_kind: String::new(),
            create_library: false,
            enable_link_options: false,
            legacy: false,
            bin_source: false,
            bin_llvmir: false,
            bin_exe: false,
            inline: false,
            mcpu: String::new(),
            wavefront_size64: false,
            xnack: false,
            max_vgprs: 0,
            waves_per_eu: 0,
        }
    }
}

impl Default for OptionVariables {
    fn default() -> Self {
        let mut vars = Self::blank();
        for desc in crate::table::table().descriptors() {
            desc.apply_default(&mut vars);
        }
        vars
    }
}

/// A value read from or written to an option field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OptionValue {
    Bool(bool),
    Int32(i32),
    UInt32(u32),
    Str(String),
    Byte(u8),
}

impl fmt::Display for OptionValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bool(b) => write!(f, "{b}"),
            Self::Int32(n) => write!(f, "{n}"),
            Self::UInt32(n) => write!(f, "{n}"),
            Self::Str(s) => write!(f, "\"{s}\""),
            Self::Byte(n) => write!(f, "{n}"),
        }
    }
}

/// Input language selected with `-x`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum SourceKind {
    #[default]
    Clc,
    ClcPlusPlus,
    Spir,
    Spirv,
    Asm,
    Il,
}

impl SourceKind {
    /// Every accepted spelling, for error messages.
    pub const SPELLINGS: &'static str = "clc, clc++, spir, spirv, asm, il";

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "clc" => Some(Self::Clc),
            "clc++" => Some(Self::ClcPlusPlus),
            "spir" => Some(Self::Spir),
            "spirv" => Some(Self::Spirv),
            "asm" => Some(Self::Asm),
            "il" => Some(Self::Il),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Clc => "clc",
            Self::ClcPlusPlus => "clc++",
            Self::Spir => "spir",
            Self::Spirv => "spirv",
            Self::Asm => "asm",
            Self::Il => "il",
        }
    }

    /// Whether the input is already an intermediate language.
    #[must_use]
    pub fn is_intermediate(self) -> bool {
        matches!(self, Self::Spir | Self::Spirv | Self::Il)
    }
}

impl fmt::Display for SourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Largest work-group a `-wgs` hint may describe.
pub const MAX_WORK_GROUP_SIZE: u64 = 1024;

/// A `-wgs=x[,y[,z]]` hint. Omitted dimensions are 1.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct WorkGroupSize {
    pub x: u32,
    pub y: u32,
    pub z: u32,
}

impl WorkGroupSize {
    #[must_use]
    pub const fn new(x: u32, y: u32, z: u32) -> Self {
        Self { x, y, z }
    }

    /// Parse `x[,y[,z]]`.
    pub fn parse(s: &str) -> Result<Self, String> {
        let parts: Vec<&str> = s.split(',').collect();
        if parts.is_empty() || parts.len() > 3 {
            return Err(format!("expected 1 to 3 dimensions, got {}", parts.len()));
        }

        let mut dims = [1u32; 3];
        for (slot, part) in dims.iter_mut().zip(&parts) {
            let value: u32 = part
                .trim()
                .parse()
                .map_err(|_| format!("'{part}' is not a positive integer"))?;
            if value == 0 {
                return Err("dimensions must be at least 1".to_string());
            }
            *slot = value;
        }

        let total = u64::from(dims[0]) * u64::from(dims[1]) * u64::from(dims[2]);
        if total > MAX_WORK_GROUP_SIZE {
            return Err(format!(
                "total size {total} exceeds the maximum of {MAX_WORK_GROUP_SIZE}"
            ));
        }

        Ok(Self::new(dims[0], dims[1], dims[2]))
    }

    #[must_use]
    pub fn as_array(self) -> [u32; 3] {
        [self.x, self.y, self.z]
    }
}

impl fmt::Display for WorkGroupSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{},{},{}", self.x, self.y, self.z)
    }
}
