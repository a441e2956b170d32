//! End-to-end compile, link and build cycles against the mock backend.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use std::sync::mpsc;
use std::sync::Arc;
use std::time::Duration;

use kiln_bif::{Arch, Target};
use kiln_program::testing::{MockBackend, Stage};
use kiln_program::{
    BuildConfig, BuildError, BuildStatus, Context, Device, DeviceId, Program, ProgramKind,
};
use pretty_assertions::assert_eq;

const SCALE: &str = "__kernel void scale(global float* x, float a) { }";
const ADD: &str = "__kernel void add(global int* a, global int* b) { }";

const D0: DeviceId = DeviceId(0);
const D1: DeviceId = DeviceId(1);

fn devices() -> Vec<Device> {
    vec![
        Device::new(0, "gfx906", Target::new(Arch::Amdgcn, 906)),
        Device::new(1, "gfx1030", Target::new(Arch::Amdgcn, 1030)),
    ]
}

fn setup(backend: MockBackend) -> (Arc<Context>, Arc<MockBackend>) {
    setup_with(backend, BuildConfig::new())
}

fn setup_with(backend: MockBackend, config: BuildConfig) -> (Arc<Context>, Arc<MockBackend>) {
    let backend = Arc::new(backend);
    let context = Arc::new(Context::with_config(devices(), backend.clone(), config));
    (context, backend)
}

fn source(context: &Arc<Context>, text: &str) -> Arc<Program> {
    Arc::new(Program::with_source(Arc::clone(context), text))
}

#[test]
fn test_build_twice_is_a_no_op() {
    let (ctx, backend) = setup(MockBackend::new());
    let program = source(&ctx, &format!("#warning slow path\n{SCALE}"));

    program.build(&[], "-O2", None).unwrap();
    let log = program.build_log(D0);
    assert!(log.contains("warning: slow path"));
    let calls = backend.calls().len();

    program.build(&[], "-O3", None).unwrap();
    assert_eq!(program.build_log(D0).len(), log.len());
    assert_eq!(backend.calls().len(), calls);
    assert_eq!(program.build_options(D0).as_deref(), Some("-O2"));
}

#[test]
fn test_clear_resets_status() {
    let (ctx, backend) = setup(MockBackend::new());
    let program = source(&ctx, SCALE);
    program.build(&[D0], "", None).unwrap();
    assert_eq!(program.build_status(D0), BuildStatus::Success);

    program.clear();
    assert_eq!(program.build_status(D0), BuildStatus::None);
    assert_eq!(program.program_kind(D0), ProgramKind::None);
    assert!(program.devices().is_empty());
    assert!(matches!(program.source(), kiln_program::ProgramSource::Source(text) if text == SCALE));

    program.build(&[D0], "", None).unwrap();
    assert_eq!(program.build_status(D0), BuildStatus::Success);
    assert_eq!(backend.calls_for(Stage::Executable), 2);
}

#[test]
fn test_per_device_failure_does_not_stop_others() {
    let (ctx, _) = setup(MockBackend::new().with_failing_device(D0));
    let program = source(&ctx, SCALE);

    let err = program.build(&[], "", None).unwrap_err();
    assert!(matches!(err, BuildError::BuildFailure { device } if device == D0));
    assert_eq!(program.build_status(D0), BuildStatus::Error);
    assert_eq!(program.build_status(D1), BuildStatus::Success);
    assert!(program.build_log(D0).contains("target 'gfx906' is not supported"));

    assert_eq!(program.kernel_names(), "scale");
    let symbol = program.symbol("scale").unwrap();
    assert_eq!(symbol.devices(), vec![D1]);
}

#[test]
fn test_out_of_resources_aborts_the_call() {
    let (ctx, backend) = setup(MockBackend::new());
    backend.set_out_of_resources(true);
    let program = source(&ctx, SCALE);

    let err = program.build(&[], "", None).unwrap_err();
    assert!(err.is_out_of_resources());
    assert_eq!(program.build_status(D0), BuildStatus::Error);
    assert_eq!(program.build_status(D1), BuildStatus::None);
    assert!(backend.calls().iter().all(|call| call.device == D0));
}

#[test]
fn test_symbols_keep_highest_abi() {
    let backend = MockBackend::new().with_abi_version(D0, 1).with_abi_version(D1, 2);
    let (ctx, _) = setup(backend);
    let program = source(&ctx, &format!("{SCALE}\n{ADD}"));
    program.build(&[], "", None).unwrap();

    assert_eq!(program.kernel_names(), "scale;add");
    assert_eq!(program.num_kernels(), 2);
    let symbol = program.symbol("add").unwrap();
    assert_eq!(symbol.signature.abi_version, 2);
    assert_eq!(symbol.devices(), vec![D0, D1]);
    assert_eq!(symbol.entry_point(D0).unwrap().signature.abi_version, 1);
    assert_eq!(symbol.entry_point(D1).unwrap().symbol, "__ocl_kernel_add");
}

#[test]
fn test_compile_then_link() {
    let (ctx, backend) = setup(MockBackend::new());
    let a = source(&ctx, SCALE);
    let b = source(&ctx, ADD);
    a.compile(&[], &[], "", None).unwrap();
    b.compile(&[], &[], "", None).unwrap();

    let linked = Arc::new(Program::empty(Arc::clone(&ctx)));
    linked.link(&[], &[a, b], "", None).unwrap();

    assert_eq!(linked.program_kind(D0), ProgramKind::Executable);
    assert_eq!(linked.program_kind(D1), ProgramKind::Executable);
    assert_eq!(linked.kernel_names(), "scale;add");
    assert_eq!(backend.calls_for(Stage::LinkIr), 2);
}

#[test]
fn test_link_through_library() {
    let (ctx, _) = setup(MockBackend::new());
    let a = source(&ctx, SCALE);
    a.compile(&[D0], &[], "", None).unwrap();

    let library = Arc::new(Program::empty(Arc::clone(&ctx)));
    library.link(&[D0], &[a], "-create-library", None).unwrap();
    assert_eq!(library.program_kind(D0), ProgramKind::Library);
    assert_eq!(library.num_kernels(), 0);

    let exe = Arc::new(Program::empty(Arc::clone(&ctx)));
    exe.link(&[D0], &[library], "", None).unwrap();
    assert_eq!(exe.kernel_names(), "scale");
}

#[test]
fn test_link_without_common_device() {
    let (ctx, backend) = setup(MockBackend::new());
    let a = source(&ctx, SCALE);
    let b = source(&ctx, ADD);
    a.compile(&[D0], &[], "", None).unwrap();
    b.compile(&[D1], &[], "", None).unwrap();
    let calls = backend.calls().len();

    let linked = Arc::new(Program::empty(Arc::clone(&ctx)));
    let err = linked.link(&[], &[a, b], "", None).unwrap_err();
    assert!(matches!(err, BuildError::DeviceMismatch(_)));
    assert!(linked.devices().is_empty());
    assert_eq!(backend.calls().len(), calls);
    assert!(linked.build_log(D0).contains("device mismatch"));
}

#[test]
fn test_link_rejects_uncompiled_input() {
    let (ctx, _) = setup(MockBackend::new());
    let a = source(&ctx, SCALE);
    let linked = Arc::new(Program::empty(Arc::clone(&ctx)));
    let err = linked.link(&[D0], &[a], "", None).unwrap_err();
    assert!(matches!(err, BuildError::DeviceMismatch(_)));
}

#[test]
fn test_link_mixed_front_ends() {
    let (ctx, _) = setup(MockBackend::new());
    let a = source(&ctx, SCALE);
    let b = source(&ctx, ADD);
    a.compile(&[D0], &[], "", None).unwrap();
    b.compile(&[D0], &[], "-legacy", None).unwrap();

    let linked = Arc::new(Program::empty(Arc::clone(&ctx)));
    let err = linked.link(&[D0], &[a, b], "", None).unwrap_err();
    assert!(matches!(err, BuildError::DeviceMismatch(_)));
    assert_eq!(linked.build_status(D0), BuildStatus::Error);
}

#[test]
fn test_link_scope_rejects_compile_options() {
    let (ctx, _) = setup(MockBackend::new());
    let a = source(&ctx, SCALE);
    a.compile(&[D0], &[], "", None).unwrap();
    let linked = Arc::new(Program::empty(Arc::clone(&ctx)));
    let err = linked.link(&[D0], &[a], "-DFOO=1", None).unwrap_err();
    assert!(matches!(err, BuildError::InvalidLinkOptions(_)));
}

#[test]
fn test_self_link_rejected() {
    let (ctx, _) = setup(MockBackend::new());
    let a = source(&ctx, SCALE);
    a.compile(&[D0], &[], "", None).unwrap();
    let err = a.link(&[D0], &[Arc::clone(&a)], "", None).unwrap_err();
    assert!(matches!(err, BuildError::InvalidOperation(_)));
}

#[test]
fn test_build_from_binary_round_trip() {
    let (ctx, backend) = setup(MockBackend::new());
    let program = source(&ctx, &format!("{SCALE}\n{ADD}"));
    program.build(&[], "-O2", None).unwrap();
    let binaries = vec![
        (D0, program.binary(D0).unwrap().unwrap()),
        (D1, program.binary(D1).unwrap().unwrap()),
    ];
    let calls = backend.calls().len();

    let loaded = Arc::new(Program::with_binaries(Arc::clone(&ctx), binaries).unwrap());
    loaded.build(&[], "-O2", None).unwrap();
    assert_eq!(backend.calls().len(), calls);
    assert_eq!(loaded.kernel_names(), "scale;add");

    loaded.clear();
    assert_eq!(loaded.build_status(D0), BuildStatus::None);
    loaded.build(&[D0], "-O1", None).unwrap();
    assert_eq!(backend.calls_for(Stage::Executable), 3);
    assert_eq!(loaded.build_options(D0).as_deref(), Some("-O1"));
}

#[test]
fn test_build_il_program() {
    let (ctx, _) = setup(MockBackend::new());
    let il = b"kiln-ir\nkernel k(int a)\n".to_vec();
    let program = Arc::new(Program::with_il(Arc::clone(&ctx), il));
    program.build(&[D1], "", None).unwrap();
    assert_eq!(program.kernel_names(), "k");
}

#[test]
fn test_async_notify() {
    let (ctx, _) = setup(MockBackend::new());
    let program = source(&ctx, SCALE);
    let (tx, rx) = mpsc::channel();

    program
        .build(
            &[],
            "",
            Some(Box::new(move |program: &Program| {
                tx.send((program.build_status(D0), program.kernel_names())).unwrap();
            })),
        )
        .unwrap();

    let (status, names) = rx.recv_timeout(Duration::from_secs(10)).unwrap();
    assert_eq!(status, BuildStatus::Success);
    assert_eq!(names, "scale");
}

#[test]
fn test_async_validation_is_synchronous() {
    let (ctx, _) = setup(MockBackend::new());
    let program = source(&ctx, SCALE);
    let err = program
        .build(&[], "-bogus", Some(Box::new(|_: &Program| panic!("must not run"))))
        .unwrap_err();
    assert!(matches!(err, BuildError::InvalidBuildOptions(_)));
}

#[test]
fn test_disk_cache_shared_between_programs() {
    let dir = tempfile::tempdir().unwrap();
    let config = BuildConfig::new().with_cache_dir(dir.path());
    let (ctx, backend) = setup_with(MockBackend::new(), config);
    assert!(ctx.cache().is_some());

    source(&ctx, SCALE).build(&[D0], "-O2", None).unwrap();
    let calls = backend.calls().len();

    let second = source(&ctx, SCALE);
    second.build(&[D0], "-O2", None).unwrap();
    assert_eq!(backend.calls().len(), calls);
    assert_eq!(second.kernel_names(), "scale");

    source(&ctx, SCALE).build(&[D0], "-O1", None).unwrap();
    assert!(backend.calls().len() > calls);
}
