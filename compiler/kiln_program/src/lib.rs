//! Programs and their per-device build state.
//!
//! This crate drives the compile, link and build pipeline of the kiln compute
//! runtime. A [`Program`] holds one input (source, IL, assembly or stored
//! binaries) and a [`DeviceProgram`] per device it has been built for. Each
//! device program calls the [`Backend`] and commits the result into a
//! [`kiln_bif::Bif`] container.
//!
//! # Usage
//!
//! ```ignore
//! use std::sync::Arc;
//! use kiln_program::{Context, Device, Program};
//!
//! let context = Arc::new(Context::with_config(devices, backend, BuildConfig::from_env()));
//! let program = Arc::new(Program::with_source(context, source));
//! program.build(&[], "-O2 -cl-fast-relaxed-math", None)?;
//! for id in program.devices() {
//!     println!("{}", program.build_log(id));
//! }
//! ```
//!
//! # Locking
//!
//! Every compile, link and build call in the process runs under one reentrant
//! lock, so backends never see concurrent calls.

mod backend;
mod cache;
mod config;
mod device;
mod device_program;
mod error;
mod kernel;
mod lock;
mod program;
mod symbols;
pub mod testing;

pub use backend::{
    Backend, BackendArtifact, BackendFailure, CompileInput, CompileRequest, ExecutableRequest,
    FailureKind, LinkRequest,
};
pub use cache::{BuildCache, CacheError, CacheKey};
pub use config::{BuildConfig, BIF_VERSION_VAR, CACHE_DIR_VAR};
pub use device::{Context, Device, DeviceId};
pub use device_program::{BuildStatus, DeviceProgram, LinkInput, ProgramKind};
pub use error::{BuildError, Result};
pub use kernel::{EntryPoint, KernelInfo, KernelSignature};
pub use lock::build_lock;
pub use program::{BuildNotify, Program, ProgramLanguage, ProgramSource};
pub use symbols::{Symbol, SymbolTable};
