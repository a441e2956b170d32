//! One device's build state for a program.
//!
//! A [`DeviceProgram`] moves through `None -> InProgress -> Success | Error`
//! exactly once per build cycle. Each step drives the backend, appends its
//! log, and commits the result into a [`Bif`] container held at the current
//! container version.
//!
//! # Container layout
//!
//! - Compiled, library and intermediate programs keep their IR in `.llvmir`.
//! - Executables keep the image in `.text` (`-fbin-exe`), one device-code and
//!   one metadata symbol per kernel, the IR only with `-fbin-llvmir`.
//! - `-fbin-source` adds the source text; the option string always goes to the
//!   comment section.

use std::fmt;

use kiln_bif::{mangle, Bif, BifError, BifFlags, BifVersion, BinaryKind, SectionId, SymbolKind};
use kiln_options::Options;
use tracing::{debug, debug_span, warn};

use crate::backend::{
    Backend, BackendArtifact, BackendFailure, CompileInput, CompileRequest, ExecutableRequest,
    FailureKind, LinkRequest,
};
use crate::cache::BuildCache;
use crate::device::Device;
use crate::error::{BuildError, Result};
use crate::kernel::{EntryPoint, KernelInfo};

/// What a device program currently holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ProgramKind {
    #[default]
    None,
    Compiled,
    Library,
    Executable,
    Intermediate,
}

impl ProgramKind {
    #[must_use]
    pub const fn from_binary(kind: BinaryKind) -> Self {
        match kind {
            BinaryKind::Intermediate => Self::Intermediate,
            BinaryKind::Compiled => Self::Compiled,
            BinaryKind::Library => Self::Library,
            BinaryKind::Executable => Self::Executable,
        }
    }

    #[must_use]
    pub const fn to_binary(self) -> Option<BinaryKind> {
        match self {
            Self::None => None,
            Self::Intermediate => Some(BinaryKind::Intermediate),
            Self::Compiled => Some(BinaryKind::Compiled),
            Self::Library => Some(BinaryKind::Library),
            Self::Executable => Some(BinaryKind::Executable),
        }
    }

    /// Whether the program can be an input to a link.
    #[must_use]
    pub const fn is_linkable(self) -> bool {
        matches!(self, Self::Compiled | Self::Library | Self::Intermediate)
    }
}

/// Build status of a device program.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum BuildStatus {
    #[default]
    None,
    InProgress,
    Success,
    Error,
}

impl fmt::Display for BuildStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::None => "none",
            Self::InProgress => "in progress",
            Self::Success => "success",
            Self::Error => "error",
        };
        f.write_str(name)
    }
}

/// IR contributed to a link by one input program.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkInput {
    pub ir: Vec<u8>,
    /// Built by the legacy front end.
    pub legacy: bool,
}

/// One device's view of one program.
#[derive(Debug, Clone)]
pub struct DeviceProgram {
    device: Device,
    kind: ProgramKind,
    status: BuildStatus,
    log: String,
    kernels: Vec<EntryPoint>,
    binary: Option<Bif>,
    options: String,
    legacy: bool,
}

impl DeviceProgram {
    #[must_use]
    pub fn new(device: Device) -> Self {
        Self {
            device,
            kind: ProgramKind::None,
            status: BuildStatus::None,
            log: String::new(),
            kernels: Vec::new(),
            binary: None,
            options: String::new(),
            legacy: false,
        }
    }

    /// A device program seeded from a stored container.
    ///
    /// The container is converted to the current version and its kind and
    /// kernels are adopted. The status stays `None` until the next build.
    pub fn from_binary(device: Device, bytes: &[u8]) -> Result<Self> {
        let bif = Bif::decode_current(bytes)?;
        if bif.target.arch != device.target.arch {
            return Err(BuildError::DeviceMismatch(format!(
                "binary targets {} but {} is {}",
                bif.target, device.id, device.target
            )));
        }
        let mut program = Self::new(device);
        program.adopt(bif)?;
        Ok(program)
    }

    #[must_use]
    pub fn device(&self) -> &Device {
        &self.device
    }

    #[must_use]
    pub fn kind(&self) -> ProgramKind {
        self.kind
    }

    #[must_use]
    pub fn status(&self) -> BuildStatus {
        self.status
    }

    #[must_use]
    pub fn log(&self) -> &str {
        &self.log
    }

    #[must_use]
    pub fn kernels(&self) -> &[EntryPoint] {
        &self.kernels
    }

    #[must_use]
    pub fn binary(&self) -> Option<&Bif> {
        self.binary.as_ref()
    }

    /// Option string the held binary was built with.
    #[must_use]
    pub fn options(&self) -> &str {
        &self.options
    }

    #[must_use]
    pub fn is_legacy(&self) -> bool {
        self.legacy
    }

    /// The held IR, if any.
    #[must_use]
    pub fn ir(&self) -> Option<&[u8]> {
        self.binary.as_ref()?.section(SectionId::LlvmIr)
    }

    /// What this program contributes to a link, if it can be linked.
    #[must_use]
    pub fn link_input(&self) -> Option<LinkInput> {
        if !self.kind.is_linkable() || self.status == BuildStatus::Error {
            return None;
        }
        Some(LinkInput {
            ir: self.ir()?.to_vec(),
            legacy: self.legacy,
        })
    }

    pub fn append_log(&mut self, text: &str) {
        if text.is_empty() {
            return;
        }
        self.log.push_str(text);
        if !text.ends_with('\n') {
            self.log.push('\n');
        }
    }

    /// Move to `next`, rejecting anything but `None -> InProgress` and
    /// `InProgress -> Success | Error`.
    pub fn set_status(&mut self, next: BuildStatus) -> Result<()> {
        let allowed = matches!(
            (self.status, next),
            (BuildStatus::None, BuildStatus::InProgress)
                | (BuildStatus::InProgress, BuildStatus::Success | BuildStatus::Error)
        );
        if !allowed {
            return Err(BuildError::InvalidOperation(format!(
                "{}: status cannot go from {} to {}",
                self.device.id, self.status, next
            )));
        }
        debug!(device = %self.device.id, from = %self.status, to = %next, "device program status");
        self.status = next;
        Ok(())
    }

    /// Lower source or IL to IR.
    pub fn compile(
        &mut self,
        backend: &dyn Backend,
        input: CompileInput<'_>,
        headers: &[(String, String)],
        options: &Options,
    ) -> Result<()> {
        let _span = debug_span!("compile", device = %self.device.id).entered();
        self.set_status(BuildStatus::InProgress)?;
        let result = self.run_compile(backend, input, headers, options);
        self.finish(result)
    }

    /// Link other programs' IR into a library or an executable.
    ///
    /// Inputs built by different front ends cannot be linked.
    pub fn link(&mut self, backend: &dyn Backend, inputs: &[LinkInput], options: &Options) -> Result<()> {
        let _span = debug_span!("link", device = %self.device.id, inputs = inputs.len()).entered();
        self.set_status(BuildStatus::InProgress)?;
        let result = self.run_link(backend, inputs, options);
        self.finish(result)
    }

    /// Build an executable from source, IL, or the binary this program was
    /// seeded with.
    ///
    /// With a seeded executable, the binary is reused when it was built with
    /// the same option string or carries no IR to rebuild from.
    pub fn build(
        &mut self,
        backend: &dyn Backend,
        cache: Option<&BuildCache>,
        input: Option<CompileInput<'_>>,
        options: &Options,
    ) -> Result<()> {
        let _span = debug_span!("build", device = %self.device.id).entered();
        self.set_status(BuildStatus::InProgress)?;
        let result = match input {
            Some(input) => self.run_build(backend, cache, input, options),
            None => self.rebuild_binary(backend, options),
        };
        self.finish(result)
    }

    fn finish(&mut self, result: Result<()>) -> Result<()> {
        let next = if result.is_ok() {
            BuildStatus::Success
        } else {
            BuildStatus::Error
        };
        self.set_status(next)?;
        result
    }

    fn run_compile(
        &mut self,
        backend: &dyn Backend,
        input: CompileInput<'_>,
        headers: &[(String, String)],
        options: &Options,
    ) -> Result<()> {
        let fragment = options.fragment(&self.device.name);
        let request = CompileRequest {
            device: &self.device,
            input,
            headers,
            options: &fragment,
        };
        let artifact = match backend.compile_to_ir(&request) {
            Ok(artifact) => artifact,
            Err(failure) => {
                return Err(self.fail(&failure, BuildError::CompileFailure { device: self.device.id }))
            }
        };
        self.append_log(&artifact.log);

        let kind = match input {
            CompileInput::Il(_) => ProgramKind::Intermediate,
            CompileInput::Source { kind, .. } if kind.is_intermediate() => ProgramKind::Intermediate,
            CompileInput::Source { .. } => ProgramKind::Compiled,
        };
        self.legacy = options.variables.legacy;
        self.commit_ir(artifact.bytes, kind, options, source_text(input))
    }

    fn run_link(&mut self, backend: &dyn Backend, inputs: &[LinkInput], options: &Options) -> Result<()> {
        let legacy = inputs.first().is_some_and(|input| input.legacy);
        if inputs.iter().any(|input| input.legacy != legacy) {
            let message = format!(
                "{}: cannot link programs built by the legacy and the current front end",
                self.device.id
            );
            self.append_log(&message);
            return Err(BuildError::DeviceMismatch(message));
        }
        self.legacy = legacy;

        let blobs: Vec<&[u8]> = inputs.iter().map(|input| input.ir.as_slice()).collect();
        let failure = BuildError::LinkFailure { device: self.device.id };
        if !options.variables.create_library {
            return self.lower(backend, &blobs, options, None, failure);
        }

        let fragment = options.fragment(&self.device.name);
        let request = LinkRequest {
            device: &self.device,
            inputs: &blobs,
            options: &fragment,
        };
        match backend.link_ir(&request) {
            Ok(artifact) => {
                self.append_log(&artifact.log);
                self.commit_ir(artifact.bytes, ProgramKind::Library, options, None)
            }
            Err(err) => Err(self.fail(&err, failure)),
        }
    }

    fn run_build(
        &mut self,
        backend: &dyn Backend,
        cache: Option<&BuildCache>,
        input: CompileInput<'_>,
        options: &Options,
    ) -> Result<()> {
        let key = cache.map(|cache| cache.key(input_bytes(input), &options.orig_option_str, &self.device.target));
        if let (Some(cache), Some(key)) = (cache, &key) {
            if let Some(bif) = cache.get(key) {
                match self.adopt(bif) {
                    Ok(()) => {
                        self.options = options.orig_option_str.clone();
                        return Ok(());
                    }
                    Err(e) => warn!(error = %e, "ignoring unusable build cache entry"),
                }
            }
        }

        let failure = BuildError::BuildFailure { device: self.device.id };
        let fragment = options.fragment(&self.device.name);
        let request = CompileRequest {
            device: &self.device,
            input,
            headers: &[],
            options: &fragment,
        };
        let ir = match backend.compile_to_ir(&request) {
            Ok(artifact) => {
                self.append_log(&artifact.log);
                artifact.bytes
            }
            Err(err) => return Err(self.fail(&err, failure)),
        };
        self.legacy = options.variables.legacy;
        self.lower(backend, &[ir.as_slice()], options, source_text(input), failure)?;

        if let (Some(cache), Some(key), Some(bif)) = (cache, &key, &self.binary) {
            if let Err(e) = cache.put(key, bif) {
                warn!(error = %e, "failed to write build cache entry");
            }
        }
        Ok(())
    }

    fn rebuild_binary(&mut self, backend: &dyn Backend, options: &Options) -> Result<()> {
        let reusable = self.kind == ProgramKind::Executable
            && (self.options.trim() == options.orig_option_str.trim() || self.ir().is_none());
        if reusable {
            debug!(device = %self.device.id, "reusing executable binary");
            return Ok(());
        }

        let Some(ir) = self.ir().map(<[u8]>::to_vec) else {
            self.append_log("binary carries no IR to build from");
            return Err(BuildError::BuildFailure { device: self.device.id });
        };
        let source = self
            .binary
            .as_ref()
            .and_then(|bif| bif.section(SectionId::Source))
            .and_then(|bytes| String::from_utf8(bytes.to_vec()).ok());
        let failure = BuildError::BuildFailure { device: self.device.id };
        self.lower(backend, &[ir.as_slice()], options, source.as_deref(), failure)
    }

    /// Link and lower IR to an executable and commit it. More than one input
    /// is linked first so the executable's IR can be kept.
    fn lower(
        &mut self,
        backend: &dyn Backend,
        inputs: &[&[u8]],
        options: &Options,
        source: Option<&str>,
        failure: BuildError,
    ) -> Result<()> {
        let fragment = options.fragment(&self.device.name);
        let linked;
        let ir: &[u8] = match inputs {
            [single] => *single,
            _ => {
                let request = LinkRequest {
                    device: &self.device,
                    inputs,
                    options: &fragment,
                };
                match backend.link_ir(&request) {
                    Ok(artifact) => {
                        self.append_log(&artifact.log);
                        linked = artifact.bytes;
                        &linked
                    }
                    Err(err) => return Err(self.fail(&err, failure)),
                }
            }
        };

        let request = ExecutableRequest {
            device: &self.device,
            inputs: &[ir],
            options: &fragment,
        };
        match backend.compile_and_link_executable(&request) {
            Ok(artifact) => {
                self.append_log(&artifact.log);
                self.commit_executable(&artifact, ir, options, source)
            }
            Err(err) => Err(self.fail(&err, failure)),
        }
    }

    fn commit_ir(&mut self, ir: Vec<u8>, kind: ProgramKind, options: &Options, source: Option<&str>) -> Result<()> {
        let binary_kind = kind.to_binary().ok_or_else(|| {
            BuildError::InvalidOperation(format!("{}: nothing to commit", self.device.id))
        })?;
        let mut bif = Bif::new(BifVersion::CURRENT, self.device.target, binary_kind)
            .with_flags(container_flags(options));
        bif.insert_section(SectionId::LlvmIr, ir)?;
        if let (true, Some(text)) = (options.variables.bin_source, source) {
            bif.insert_section(SectionId::Source, text.as_bytes().to_vec())?;
        }
        bif.set_compiler_options(&options.orig_option_str)?;

        self.kind = kind;
        self.kernels.clear();
        self.binary = Some(bif);
        self.options = options.orig_option_str.clone();
        Ok(())
    }

    fn commit_executable(
        &mut self,
        artifact: &BackendArtifact,
        ir: &[u8],
        options: &Options,
        source: Option<&str>,
    ) -> Result<()> {
        let vars = &options.variables;
        let mut bif = Bif::new(BifVersion::CURRENT, self.device.target, BinaryKind::Executable)
            .with_flags(container_flags(options));
        let image = artifact.bytes.as_slice();
        if vars.bin_exe {
            bif.insert_section(SectionId::Text, image.to_vec())?;
        }

        let mut kernels = Vec::with_capacity(artifact.kernels.len());
        for info in &artifact.kernels {
            let name = info.signature.name.as_str();
            let Some(code) = info.code(image) else {
                self.append_log(&format!("kernel '{name}' lies outside the executable image"));
                return Err(BuildError::BuildFailure { device: self.device.id });
            };
            if vars.bin_exe {
                bif.insert_symbol(SymbolKind::DeviceCode, name, code.to_vec())?;
            }
            let metadata = info.to_bytes().map_err(BifError::Encode)?;
            bif.insert_symbol(SymbolKind::KernelMetadata, name, metadata)?;
            kernels.push(entry_point(info));
        }

        if vars.bin_llvmir {
            bif.insert_section(SectionId::LlvmIr, ir.to_vec())?;
        }
        if let (true, Some(text)) = (vars.bin_source, source) {
            bif.insert_section(SectionId::Source, text.as_bytes().to_vec())?;
        }
        bif.set_compiler_options(&options.orig_option_str)?;

        debug!(device = %self.device.id, kernels = kernels.len(), "committed executable");
        self.kind = ProgramKind::Executable;
        self.kernels = kernels;
        self.binary = Some(bif);
        self.options = options.orig_option_str.clone();
        Ok(())
    }

    /// Take over a decoded container's kind, kernels and options.
    fn adopt(&mut self, bif: Bif) -> Result<()> {
        let mut kernels = Vec::new();
        for (name, bytes) in bif.symbols_of(SymbolKind::KernelMetadata) {
            let info = KernelInfo::from_bytes(bytes).map_err(BifError::Decode)?;
            if info.signature.name != name {
                return Err(BifError::Decode(format!(
                    "metadata for '{name}' describes kernel '{}'",
                    info.signature.name
                ))
                .into());
            }
            kernels.push(entry_point(&info));
        }
        kernels.sort_by_key(|entry| entry.code_offset);

        self.kind = ProgramKind::from_binary(bif.kind);
        self.legacy = bif.flags.contains(BifFlags::LEGACY_FRONTEND);
        self.options = bif.compiler_options().unwrap_or_default().to_string();
        self.kernels = kernels;
        self.binary = Some(bif);
        Ok(())
    }

    /// Record a backend failure and pick the error to report.
    fn fail(&mut self, failure: &BackendFailure, err: BuildError) -> BuildError {
        self.append_log(&failure.log);
        match failure.kind {
            FailureKind::OutOfResources => BuildError::OutOfResources(format!("{}: {failure}", self.device.id)),
            FailureKind::Diagnostics => err,
        }
    }
}

fn container_flags(options: &Options) -> BifFlags {
    let vars = &options.variables;
    let mut flags = BifFlags::empty();
    flags.set(BifFlags::LEGACY_FRONTEND, vars.legacy);
    flags.set(BifFlags::DEBUG_INFO, vars.enable_debug);
    flags.set(
        BifFlags::RELAXED_MATH,
        vars.fast_relaxed_math || vars.unsafe_math_optimizations,
    );
    flags.set(BifFlags::KERNEL_ARG_INFO, vars.kernel_arg_info);
    flags
}

fn entry_point(info: &KernelInfo) -> EntryPoint {
    let symbol = mangle(BifVersion::CURRENT, SymbolKind::DeviceCode, &info.signature.name)
        .map(|(_, symbol)| symbol)
        .unwrap_or_else(|| info.signature.name.clone());
    EntryPoint {
        symbol,
        code_offset: info.code_offset,
        code_size: info.code_size,
        signature: info.signature.clone(),
    }
}

fn source_text<'a>(input: CompileInput<'a>) -> Option<&'a str> {
    match input {
        CompileInput::Source { text, .. } => Some(text),
        CompileInput::Il(_) => None,
    }
}

fn input_bytes<'a>(input: CompileInput<'a>) -> &'a [u8] {
    match input {
        CompileInput::Source { text, .. } => text.as_bytes(),
        CompileInput::Il(bytes) => bytes,
    }
}

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    reason = "tests use unwrap to panic on unexpected state"
)]
mod tests;
