//! Programs: one compilation unit built for any number of devices.
//!
//! A [`Program`] owns one [`DeviceProgram`] per device it has been built for
//! and the [`SymbolTable`] aggregated from them. Compile, link and build parse
//! their options once, then walk the requested devices in order under the
//! process-wide build lock. Devices whose program already left
//! [`BuildStatus::None`] are skipped; [`Program::clear`] starts a new cycle.
//!
//! # Usage
//!
//! ```ignore
//! let context = Arc::new(Context::new(devices, Arc::new(backend)));
//! let program = Arc::new(Program::with_source(context, source));
//! program.build(&[], "-O2", None)?;
//! let names = program.kernel_names();
//! ```

use std::fmt;
use std::sync::Arc;

use kiln_bif::convert;
use kiln_options::{OptionError, OptionScope, Options, SourceKind};
use parking_lot::Mutex;
use rustc_hash::{FxHashMap, FxHashSet};
use tracing::{debug, debug_span};

use crate::backend::CompileInput;
use crate::device::{Context, Device, DeviceId};
use crate::device_program::{BuildStatus, DeviceProgram, LinkInput, ProgramKind};
use crate::error::{BuildError, Result};
use crate::lock::build_lock;
use crate::symbols::{Symbol, SymbolTable};

/// Called once every requested device has been processed.
pub type BuildNotify = Box<dyn FnOnce(&Program) + Send>;

/// What a program was created from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProgramSource {
    Source(String),
    Il(Vec<u8>),
    Assembly(String),
    /// Stored containers per device. Empty for programs created by a link.
    Binary(FxHashMap<DeviceId, Vec<u8>>),
}

/// The input language of a program.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProgramLanguage {
    Source,
    Il,
    Assembly,
    Binary,
}

impl fmt::Display for ProgramLanguage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Source => "source",
            Self::Il => "IL",
            Self::Assembly => "assembly",
            Self::Binary => "binary",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Default)]
struct ProgramState {
    device_programs: FxHashMap<DeviceId, DeviceProgram>,
    symbols: SymbolTable,
    log: String,
    kernel_names: Option<String>,
}

impl ProgramState {
    fn append_log(&mut self, text: &str) {
        self.log.push_str(text);
        if !text.ends_with('\n') {
            self.log.push('\n');
        }
    }
}

/// One application-visible compilation unit.
pub struct Program {
    context: Arc<Context>,
    source: ProgramSource,
    state: Mutex<ProgramState>,
}

impl Program {
    fn new(context: Arc<Context>, source: ProgramSource) -> Self {
        Self {
            context,
            source,
            state: Mutex::new(ProgramState::default()),
        }
    }

    #[must_use]
    pub fn with_source(context: Arc<Context>, text: impl Into<String>) -> Self {
        Self::new(context, ProgramSource::Source(text.into()))
    }

    #[must_use]
    pub fn with_il(context: Arc<Context>, il: Vec<u8>) -> Self {
        Self::new(context, ProgramSource::Il(il))
    }

    #[must_use]
    pub fn with_assembly(context: Arc<Context>, text: impl Into<String>) -> Self {
        Self::new(context, ProgramSource::Assembly(text.into()))
    }

    /// A program from stored containers, one per device.
    ///
    /// Every container is decoded up front; the device programs it seeds are
    /// recreated from the same bytes after a [`clear`](Self::clear).
    pub fn with_binaries(context: Arc<Context>, binaries: Vec<(DeviceId, Vec<u8>)>) -> Result<Self> {
        if binaries.is_empty() {
            return Err(BuildError::InvalidOperation("no binaries given".to_string()));
        }
        let mut state = ProgramState::default();
        let mut stored = FxHashMap::default();
        for (id, bytes) in binaries {
            let device = context
                .device(id)
                .ok_or_else(|| BuildError::DeviceMismatch(format!("{id} is not in the context")))?;
            let program = DeviceProgram::from_binary(device.clone(), &bytes)?;
            state.device_programs.insert(id, program);
            stored.insert(id, bytes);
        }
        Ok(Self {
            context,
            source: ProgramSource::Binary(stored),
            state: Mutex::new(state),
        })
    }

    /// A program with no input, to be the target of a link.
    #[must_use]
    pub fn empty(context: Arc<Context>) -> Self {
        Self::new(context, ProgramSource::Binary(FxHashMap::default()))
    }

    #[must_use]
    pub fn context(&self) -> &Arc<Context> {
        &self.context
    }

    #[must_use]
    pub fn source(&self) -> &ProgramSource {
        &self.source
    }

    #[must_use]
    pub fn language(&self) -> ProgramLanguage {
        match self.source {
            ProgramSource::Source(_) => ProgramLanguage::Source,
            ProgramSource::Il(_) => ProgramLanguage::Il,
            ProgramSource::Assembly(_) => ProgramLanguage::Assembly,
            ProgramSource::Binary(_) => ProgramLanguage::Binary,
        }
    }

    /// Compile to IR for `devices` (all context devices when empty).
    ///
    /// `headers` name the programs whose source `#include` resolves to.
    /// With `notify`, returns once the arguments are checked and compiles on
    /// a background thread.
    pub fn compile(
        self: &Arc<Self>,
        devices: &[DeviceId],
        headers: &[(String, Arc<Program>)],
        options: &str,
        notify: Option<BuildNotify>,
    ) -> Result<()> {
        if self.language() == ProgramLanguage::Binary {
            return Err(self.log_error(BuildError::InvalidOperation(
                "binary programs cannot be compiled".to_string(),
            )));
        }
        let devices = self.resolve_devices(devices)?;
        let text = self.context.config().overrides.apply_build(options, true);
        let options = self.parse_options(&text, OptionScope::Compile, BuildError::InvalidCompileOptions)?;
        let headers = headers
            .iter()
            .map(|(name, program)| match program.source() {
                ProgramSource::Source(text) => Ok((name.clone(), text.clone())),
                _ => Err(self.log_error(BuildError::InvalidOperation(format!(
                    "header '{name}' is not a source program"
                )))),
            })
            .collect::<Result<Vec<_>>>()?;

        self.dispatch(notify, move |program| {
            program.compile_devices(&devices, &headers, &options)
        })
    }

    /// Link `inputs` into this program for `devices` (all context devices
    /// when empty).
    ///
    /// Every input must hold compiled, library or intermediate code for every
    /// requested device; otherwise the call fails before any device program
    /// is created.
    pub fn link(
        self: &Arc<Self>,
        devices: &[DeviceId],
        inputs: &[Arc<Program>],
        options: &str,
        notify: Option<BuildNotify>,
    ) -> Result<()> {
        if inputs.is_empty() {
            return Err(self.log_error(BuildError::InvalidOperation("no input programs".to_string())));
        }
        if inputs.iter().any(|input| Arc::ptr_eq(input, self)) {
            return Err(self.log_error(BuildError::InvalidOperation(
                "a program cannot link itself".to_string(),
            )));
        }
        let devices = self.resolve_devices(devices)?;
        let text = self.context.config().overrides.apply_link(options);
        let options = self.parse_options(&text, OptionScope::Link, BuildError::InvalidLinkOptions)?;

        if let Some(id) = devices
            .iter()
            .find(|id| !inputs.iter().all(|input| input.has_link_input(**id)))
        {
            return Err(self.log_error(BuildError::DeviceMismatch(format!(
                "input programs have no linkable code in common for {id}"
            ))));
        }

        let inputs = inputs.to_vec();
        self.dispatch(notify, move |program| {
            program.link_devices(&devices, &inputs, &options)
        })
    }

    /// Build executables for `devices` (all context devices when empty).
    pub fn build(self: &Arc<Self>, devices: &[DeviceId], options: &str, notify: Option<BuildNotify>) -> Result<()> {
        let devices = self.resolve_devices(devices)?;
        if let ProgramSource::Binary(stored) = &self.source {
            let state = self.state.lock();
            let missing = devices
                .iter()
                .find(|id| !stored.contains_key(*id) && !state.device_programs.contains_key(*id));
            if let Some(id) = missing {
                let err = BuildError::DeviceMismatch(format!("program has no binary for {id}"));
                drop(state);
                return Err(self.log_error(err));
            }
        }
        let text = self.context.config().overrides.apply_build(options, true);
        let options = self.parse_options(&text, OptionScope::Build, BuildError::InvalidBuildOptions)?;

        self.dispatch(notify, move |program| program.build_devices(&devices, &options))
    }

    /// Drop every device program and the symbol table. The source stays.
    pub fn clear(&self) {
        let _lock = build_lock();
        let mut state = self.state.lock();
        state.device_programs.clear();
        state.symbols.clear();
        state.kernel_names = None;
        state.log.clear();
        debug!("program cleared");
    }

    #[must_use]
    pub fn build_status(&self, device: DeviceId) -> BuildStatus {
        self.state
            .lock()
            .device_programs
            .get(&device)
            .map_or(BuildStatus::None, DeviceProgram::status)
    }

    #[must_use]
    pub fn program_kind(&self, device: DeviceId) -> ProgramKind {
        self.state
            .lock()
            .device_programs
            .get(&device)
            .map_or(ProgramKind::None, DeviceProgram::kind)
    }

    /// The program log followed by `device`'s log.
    #[must_use]
    pub fn build_log(&self, device: DeviceId) -> String {
        let state = self.state.lock();
        let mut log = state.log.clone();
        if let Some(program) = state.device_programs.get(&device) {
            log.push_str(program.log());
        }
        log
    }

    /// Option string `device`'s binary was built with.
    #[must_use]
    pub fn build_options(&self, device: DeviceId) -> Option<String> {
        self.state
            .lock()
            .device_programs
            .get(&device)
            .map(|program| program.options().to_string())
    }

    /// `device`'s container, encoded at the configured container version.
    pub fn binary(&self, device: DeviceId) -> Result<Option<Vec<u8>>> {
        let state = self.state.lock();
        let Some(bif) = state.device_programs.get(&device).and_then(DeviceProgram::binary) else {
            return Ok(None);
        };
        let version = self.context.config().binary_version;
        let bytes = if bif.version == version {
            bif.encode()?
        } else {
            convert(bif, version)?.encode()?
        };
        Ok(Some(bytes))
    }

    /// Kernel names joined with `;`, in first-seen order.
    #[must_use]
    pub fn kernel_names(&self) -> String {
        let mut guard = self.state.lock();
        let state = &mut *guard;
        state
            .kernel_names
            .get_or_insert_with(|| state.symbols.joined_names())
            .clone()
    }

    #[must_use]
    pub fn num_kernels(&self) -> usize {
        self.state.lock().symbols.len()
    }

    #[must_use]
    pub fn symbol(&self, name: &str) -> Option<Symbol> {
        self.state.lock().symbols.get(name).cloned()
    }

    /// Devices with a device program, in context order.
    #[must_use]
    pub fn devices(&self) -> Vec<DeviceId> {
        let state = self.state.lock();
        self.context
            .devices()
            .iter()
            .map(|device| device.id)
            .filter(|id| state.device_programs.contains_key(id))
            .collect()
    }

    fn has_link_input(&self, device: DeviceId) -> bool {
        self.link_input(device).is_some()
    }

    fn link_input(&self, device: DeviceId) -> Option<LinkInput> {
        self.state.lock().device_programs.get(&device)?.link_input()
    }

    fn resolve_devices(&self, requested: &[DeviceId]) -> Result<Vec<DeviceId>> {
        if requested.is_empty() {
            return Ok(self.context.devices().iter().map(|device| device.id).collect());
        }
        if let Some(id) = requested.iter().find(|id| self.context.device(**id).is_none()) {
            return Err(self.log_error(BuildError::DeviceMismatch(format!(
                "{id} is not in the program's context"
            ))));
        }
        let mut seen = FxHashSet::default();
        Ok(requested.iter().copied().filter(|id| seen.insert(*id)).collect())
    }

    fn parse_options(
        &self,
        text: &str,
        scope: OptionScope,
        wrap: fn(OptionError) -> BuildError,
    ) -> Result<Options> {
        Options::parse(text, scope).map_err(|e| self.log_error(wrap(e)))
    }

    /// Append `err` to the program log and hand it back.
    fn log_error(&self, err: BuildError) -> BuildError {
        self.state.lock().append_log(&err.to_string());
        err
    }

    /// Run `work` now, or on a background thread followed by `notify`.
    fn dispatch<F>(self: &Arc<Self>, notify: Option<BuildNotify>, work: F) -> Result<()>
    where
        F: FnOnce(&Program) -> Result<()> + Send + 'static,
    {
        let Some(notify) = notify else {
            return work(self.as_ref());
        };
        let program = Arc::clone(self);
        std::thread::Builder::new()
            .name("kiln-build".to_string())
            .spawn(move || {
                if let Err(e) = work(program.as_ref()) {
                    debug!(error = %e, "background build finished with errors");
                }
                notify(program.as_ref());
            })
            .map(|_| ())
            .map_err(|e| BuildError::OutOfResources(format!("cannot start build thread: {e}")))
    }

    fn compile_devices(&self, devices: &[DeviceId], headers: &[(String, String)], options: &Options) -> Result<()> {
        let _lock = build_lock();
        let _span = debug_span!("program_compile", devices = devices.len()).entered();
        let backend = self.context.backend();
        let mut state = self.state.lock();

        let mut first_error = None;
        for &id in devices {
            let program = self.device_program(&mut state, id)?;
            if program.status() != BuildStatus::None {
                debug!(device = %id, "already built, skipping");
                continue;
            }
            let input = self.compile_input(options)?;
            match program.compile(backend, input, headers, options) {
                Ok(()) => {}
                Err(e) if e.is_out_of_resources() => return Err(e),
                Err(e) => {
                    first_error.get_or_insert(e);
                }
            }
        }
        first_error.map_or(Ok(()), Err)
    }

    fn link_devices(&self, devices: &[DeviceId], inputs: &[Arc<Program>], options: &Options) -> Result<()> {
        let _lock = build_lock();
        let _span = debug_span!("program_link", devices = devices.len(), inputs = inputs.len()).entered();
        let backend = self.context.backend();

        let mut first_error = None;
        for &id in devices {
            let Some(link_inputs) = inputs
                .iter()
                .map(|input| input.link_input(id))
                .collect::<Option<Vec<_>>>()
            else {
                let err = BuildError::DeviceMismatch(format!("an input program has no linkable code for {id}"));
                self.state.lock().append_log(&err.to_string());
                first_error.get_or_insert(err);
                continue;
            };

            let mut state = self.state.lock();
            let program = self.device_program(&mut state, id)?;
            if program.status() != BuildStatus::None {
                debug!(device = %id, "already built, skipping");
                continue;
            }
            match program.link(backend, &link_inputs, options) {
                Ok(()) => {}
                Err(e) if e.is_out_of_resources() => return Err(e),
                Err(e) => {
                    first_error.get_or_insert(e);
                }
            }
        }
        self.rebuild_symbols(&mut self.state.lock());
        first_error.map_or(Ok(()), Err)
    }

    fn build_devices(&self, devices: &[DeviceId], options: &Options) -> Result<()> {
        let _lock = build_lock();
        let _span = debug_span!("program_build", devices = devices.len()).entered();
        let backend = self.context.backend();
        let cache = self.context.cache();
        let mut state = self.state.lock();

        let mut first_error = None;
        for &id in devices {
            let program = self.device_program(&mut state, id)?;
            if program.status() != BuildStatus::None {
                debug!(device = %id, "already built, skipping");
                continue;
            }
            let input = match self.language() {
                ProgramLanguage::Binary => None,
                _ => Some(self.compile_input(options)?),
            };
            match program.build(backend, cache, input, options) {
                Ok(()) => {}
                Err(e) if e.is_out_of_resources() => return Err(e),
                Err(e) => {
                    first_error.get_or_insert(e);
                }
            }
        }
        self.rebuild_symbols(&mut state);
        first_error.map_or(Ok(()), Err)
    }

    /// The device program for `id`, created (and seeded from a stored
    /// binary) if missing.
    fn device_program<'a>(&self, state: &'a mut ProgramState, id: DeviceId) -> Result<&'a mut DeviceProgram> {
        let device = self
            .context
            .device(id)
            .ok_or_else(|| BuildError::DeviceMismatch(format!("{id} is not in the program's context")))?;
        if !state.device_programs.contains_key(&id) {
            let program = self.new_device_program(device)?;
            state.device_programs.insert(id, program);
        }
        state
            .device_programs
            .get_mut(&id)
            .ok_or_else(|| BuildError::InvalidOperation(format!("no device program for {id}")))
    }

    fn new_device_program(&self, device: &Device) -> Result<DeviceProgram> {
        match &self.source {
            ProgramSource::Binary(stored) => match stored.get(&device.id) {
                Some(bytes) => DeviceProgram::from_binary(device.clone(), bytes),
                None => Ok(DeviceProgram::new(device.clone())),
            },
            _ => Ok(DeviceProgram::new(device.clone())),
        }
    }

    fn compile_input(&self, options: &Options) -> Result<CompileInput<'_>> {
        match &self.source {
            ProgramSource::Source(text) => Ok(CompileInput::Source {
                text,
                kind: options.source_kind,
            }),
            ProgramSource::Assembly(text) => Ok(CompileInput::Source {
                text,
                kind: SourceKind::Asm,
            }),
            ProgramSource::Il(bytes) => Ok(CompileInput::Il(bytes)),
            ProgramSource::Binary(_) => Err(BuildError::InvalidOperation(
                "binary programs have no source to compile".to_string(),
            )),
        }
    }

    /// Rebuild the kernel table from every successfully built executable.
    fn rebuild_symbols(&self, state: &mut ProgramState) {
        state.symbols.clear();
        state.kernel_names = None;
        for device in self.context.devices() {
            let Some(program) = state.device_programs.get(&device.id) else {
                continue;
            };
            if program.status() != BuildStatus::Success || program.kind() != ProgramKind::Executable {
                continue;
            }
            for entry in program.kernels() {
                state.symbols.insert_or_update(device.id, entry.clone());
            }
        }
        debug!(kernels = state.symbols.len(), "rebuilt symbol table");
    }
}

impl fmt::Debug for Program {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Program")
            .field("language", &self.language())
            .field("devices", &self.devices())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    reason = "tests use unwrap to panic on unexpected state"
)]
mod tests;
