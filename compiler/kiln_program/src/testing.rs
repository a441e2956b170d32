//! A deterministic in-process backend.
//!
//! [`MockBackend`] understands just enough of the source language to find
//! `__kernel void name(params)` declarations. Its IR is plain text:
//!
//! ```text
//! kiln-ir
//! kernel scale(global float* x, float a)
//! kernel add(global int* a)
//! ```
//!
//! Sources containing `#error` fail with diagnostics, `#warning` adds a
//! warning to the log, and `#include "name"` must name a supplied header.
//! Executable images are one `<chip>:<kernel>` blob per kernel.

use std::sync::atomic::{AtomicBool, Ordering};

use kiln_options::{SourceKind, WorkGroupSize};
use parking_lot::Mutex;
use rustc_hash::{FxHashMap, FxHashSet};

use crate::backend::{
    Backend, BackendArtifact, BackendFailure, CompileInput, CompileRequest, ExecutableRequest,
    LinkRequest,
};
use crate::device::{Device, DeviceId};
use crate::kernel::{KernelInfo, KernelSignature};

/// First line of every IR blob.
pub const IR_HEADER: &str = "kiln-ir";

/// Which backend entry point was called.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    CompileToIr,
    LinkIr,
    Executable,
}

/// One recorded backend call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackendCall {
    pub stage: Stage,
    pub device: DeviceId,
    /// The rendered option fragment.
    pub options: String,
}

/// Backend double for tests.
#[derive(Debug, Default)]
pub struct MockBackend {
    calls: Mutex<Vec<BackendCall>>,
    out_of_resources: AtomicBool,
    abi_versions: FxHashMap<DeviceId, u32>,
    failing_devices: FxHashSet<DeviceId>,
}

impl MockBackend {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Report `abi` as the metadata ABI for kernels built for `device`.
    /// Devices without an entry report ABI 1.
    #[must_use]
    pub fn with_abi_version(mut self, device: DeviceId, abi: u32) -> Self {
        self.abi_versions.insert(device, abi);
        self
    }

    /// Reject every compile for `device` with a diagnostic.
    #[must_use]
    pub fn with_failing_device(mut self, device: DeviceId) -> Self {
        self.failing_devices.insert(device);
        self
    }

    /// Make every following call fail with an out-of-resources error.
    pub fn set_out_of_resources(&self, enabled: bool) {
        self.out_of_resources.store(enabled, Ordering::SeqCst);
    }

    /// Every call so far, in order.
    pub fn calls(&self) -> Vec<BackendCall> {
        self.calls.lock().clone()
    }

    pub fn calls_for(&self, stage: Stage) -> usize {
        self.calls.lock().iter().filter(|call| call.stage == stage).count()
    }

    fn record(&self, stage: Stage, device: &Device, options: String) -> Result<(), BackendFailure> {
        self.calls.lock().push(BackendCall {
            stage,
            device: device.id,
            options,
        });
        if self.out_of_resources.load(Ordering::SeqCst) {
            return Err(BackendFailure::out_of_resources(format!(
                "error: out of memory while building for {}",
                device.name
            )));
        }
        Ok(())
    }

    fn abi_version(&self, device: DeviceId) -> u32 {
        self.abi_versions.get(&device).copied().unwrap_or(1)
    }
}

impl Backend for MockBackend {
    fn compile_to_ir(&self, request: &CompileRequest<'_>) -> Result<BackendArtifact, BackendFailure> {
        self.record(Stage::CompileToIr, request.device, request.options.to_string())?;
        if self.failing_devices.contains(&request.device.id) {
            return Err(BackendFailure::diagnostics(format!(
                "error: target '{}' is not supported",
                request.device.name
            )));
        }
        let bytes = match request.input {
            CompileInput::Il(bytes) => bytes,
            CompileInput::Source { text, kind } if kind.is_intermediate() => text.as_bytes(),
            CompileInput::Source { text, kind } => return compile_source(text, kind, request.headers),
        };
        parse_ir(bytes)?;
        Ok(BackendArtifact {
            bytes: bytes.to_vec(),
            ..BackendArtifact::default()
        })
    }

    fn link_ir(&self, request: &LinkRequest<'_>) -> Result<BackendArtifact, BackendFailure> {
        self.record(Stage::LinkIr, request.device, request.options.to_string())?;
        let kernels = link(request.inputs)?;
        Ok(BackendArtifact {
            bytes: render_ir(&kernels),
            ..BackendArtifact::default()
        })
    }

    fn compile_and_link_executable(
        &self,
        request: &ExecutableRequest<'_>,
    ) -> Result<BackendArtifact, BackendFailure> {
        self.record(Stage::Executable, request.device, request.options.to_string())?;
        let kernels = link(request.inputs)?;
        let hint = request
            .options
            .backend
            .split(' ')
            .find_map(|flag| flag.strip_prefix("-wgs="))
            .and_then(|dims| WorkGroupSize::parse(dims).ok())
            .map(WorkGroupSize::as_array);
        let abi = self.abi_version(request.device.id);

        let mut image = Vec::new();
        let mut infos = Vec::with_capacity(kernels.len());
        for (name, params) in kernels {
            let blob = format!("{}:{name}\n", request.device.name);
            let mut signature = KernelSignature::new(name, abi).with_params(params);
            signature.work_group_size_hint = hint;
            infos.push(KernelInfo {
                signature,
                code_offset: image.len() as u64,
                code_size: blob.len() as u64,
            });
            image.extend_from_slice(blob.as_bytes());
        }
        Ok(BackendArtifact {
            bytes: image,
            log: String::new(),
            kernels: infos,
        })
    }

    fn version(&self) -> &str {
        "mock-1"
    }
}

type Kernel = (String, Vec<String>);

fn compile_source(
    text: &str,
    kind: SourceKind,
    headers: &[(String, String)],
) -> Result<BackendArtifact, BackendFailure> {
    let mut log = String::new();
    for line in text.lines().map(str::trim) {
        if let Some(message) = line.strip_prefix("#error") {
            return Err(BackendFailure::diagnostics(format!("error: {}", message.trim())));
        }
        if let Some(message) = line.strip_prefix("#warning") {
            log.push_str(&format!("warning: {}\n", message.trim()));
        }
        if let Some(name) = line.strip_prefix("#include") {
            let name = name.trim().trim_matches(|c: char| c == '"' || c == '<' || c == '>');
            if !headers.iter().any(|(header, _)| header == name) {
                return Err(BackendFailure::diagnostics(format!(
                    "fatal error: '{name}' file not found"
                )));
            }
        }
    }
    if kind == SourceKind::Asm && !text.contains("__kernel") {
        return Err(BackendFailure::diagnostics("error: no kernels in assembly input"));
    }
    Ok(BackendArtifact {
        bytes: render_ir(&scan_kernels(text)),
        log,
        kernels: Vec::new(),
    })
}

/// Find `__kernel void name(params)` declarations.
fn scan_kernels(text: &str) -> Vec<Kernel> {
    let mut kernels = Vec::new();
    let mut rest = text;
    while let Some(at) = rest.find("__kernel") {
        rest = &rest[at + "__kernel".len()..];
        let Some(decl) = rest.trim_start().strip_prefix("void") else {
            continue;
        };
        let Some(open) = decl.find('(') else {
            break;
        };
        let Some(close) = decl[open..].find(')') else {
            break;
        };
        let name = decl[..open].trim();
        if name.is_empty() {
            continue;
        }
        kernels.push((name.to_string(), split_params(&decl[open + 1..open + close])));
    }
    kernels
}

fn split_params(params: &str) -> Vec<String> {
    params
        .split(',')
        .map(str::trim)
        .filter(|param| !param.is_empty() && *param != "void")
        .map(ToString::to_string)
        .collect()
}

fn render_ir(kernels: &[Kernel]) -> Vec<u8> {
    let mut ir = format!("{IR_HEADER}\n");
    for (name, params) in kernels {
        ir.push_str(&format!("kernel {name}({})\n", params.join(", ")));
    }
    ir.into_bytes()
}

fn parse_ir(bytes: &[u8]) -> Result<Vec<Kernel>, BackendFailure> {
    let text = std::str::from_utf8(bytes).map_err(|_| invalid_ir())?;
    let mut lines = text.lines();
    if lines.next() != Some(IR_HEADER) {
        return Err(invalid_ir());
    }
    lines
        .filter(|line| !line.trim().is_empty())
        .map(|line| {
            let decl = line.strip_prefix("kernel ").ok_or_else(invalid_ir)?;
            let open = decl.find('(').ok_or_else(invalid_ir)?;
            let params = decl[open + 1..].strip_suffix(')').ok_or_else(invalid_ir)?;
            Ok((decl[..open].to_string(), split_params(params)))
        })
        .collect()
}

fn link(inputs: &[&[u8]]) -> Result<Vec<Kernel>, BackendFailure> {
    let mut seen = FxHashSet::default();
    let mut kernels = Vec::new();
    for input in inputs {
        for (name, params) in parse_ir(input)? {
            if !seen.insert(name.clone()) {
                return Err(BackendFailure::diagnostics(format!(
                    "error: duplicate kernel '{name}'"
                )));
            }
            kernels.push((name, params));
        }
    }
    Ok(kernels)
}

fn invalid_ir() -> BackendFailure {
    BackendFailure::diagnostics("error: input is not valid IR")
}
