use kiln_bif::{peek_version, Arch, Bif, BifVersion, Target};
use pretty_assertions::assert_eq;

use super::*;
use crate::config::BuildConfig;
use crate::testing::{MockBackend, Stage};

const SOURCE: &str = "__kernel void scale(global float* x) {}\n__kernel void add(global int* a) {}\n";

fn devices() -> Vec<Device> {
    vec![
        Device::new(0, "gfx906", Target::new(Arch::Amdgcn, 906)),
        Device::new(1, "gfx1030", Target::new(Arch::Amdgcn, 1030)),
    ]
}

fn context_with(backend: Arc<MockBackend>, config: BuildConfig) -> Arc<Context> {
    Arc::new(Context::with_config(devices(), backend, config))
}

fn context() -> (Arc<Context>, Arc<MockBackend>) {
    let backend = Arc::new(MockBackend::new());
    (context_with(Arc::clone(&backend), BuildConfig::new()), backend)
}

#[test]
fn test_language() {
    let (ctx, _) = context();
    assert_eq!(Program::with_source(Arc::clone(&ctx), "x").language(), ProgramLanguage::Source);
    assert_eq!(Program::with_il(Arc::clone(&ctx), vec![]).language(), ProgramLanguage::Il);
    assert_eq!(Program::with_assembly(Arc::clone(&ctx), "x").language(), ProgramLanguage::Assembly);
    assert_eq!(Program::empty(ctx).language(), ProgramLanguage::Binary);
}

#[test]
fn test_empty_device_list_means_all() {
    let (ctx, _) = context();
    let program = Arc::new(Program::with_source(ctx, SOURCE));
    program.build(&[], "", None).unwrap();
    assert_eq!(program.devices(), vec![DeviceId(0), DeviceId(1)]);
}

#[test]
fn test_unknown_device() {
    let (ctx, backend) = context();
    let program = Arc::new(Program::with_source(ctx, SOURCE));
    let err = program.build(&[DeviceId(7)], "", None).unwrap_err();
    assert!(matches!(err, BuildError::DeviceMismatch(_)));
    assert!(program.build_log(DeviceId(0)).contains("device#7"));
    assert!(backend.calls().is_empty());
}

#[test]
fn test_duplicate_devices_built_once() {
    let (ctx, backend) = context();
    let program = Arc::new(Program::with_source(ctx, SOURCE));
    program.build(&[DeviceId(1), DeviceId(1)], "", None).unwrap();
    assert_eq!(backend.calls_for(Stage::Executable), 1);
}

#[test]
fn test_invalid_options_are_logged() {
    let (ctx, backend) = context();
    let program = Arc::new(Program::with_source(ctx, SOURCE));
    let err = program.build(&[], "-O9", None).unwrap_err();

    assert!(matches!(err, BuildError::InvalidBuildOptions(_)));
    let log = program.build_log(DeviceId(0));
    assert!(log.contains("-O9"));
    assert!(log.contains("Value should be in [0, 5]"));
    assert!(program.devices().is_empty());
    assert!(backend.calls().is_empty());
}

#[test]
fn test_link_only_option_rejected_by_build() {
    let (ctx, _) = context();
    let program = Arc::new(Program::with_source(ctx, SOURCE));
    let err = program.build(&[], "-create-library", None).unwrap_err();
    assert!(matches!(err, BuildError::InvalidBuildOptions(_)));
}

#[test]
fn test_compile_binary_program_rejected() {
    let (ctx, _) = context();
    let program = Arc::new(Program::empty(ctx));
    let err = program.compile(&[], &[], "", None).unwrap_err();
    assert!(matches!(err, BuildError::InvalidOperation(_)));
}

#[test]
fn test_compile_with_headers() {
    let (ctx, _) = context();
    let header = Arc::new(Program::with_source(Arc::clone(&ctx), "#define N 4"));
    let program = Arc::new(Program::with_source(
        ctx,
        "#include \"defs.h\"\n__kernel void k(int a) {}",
    ));

    let err = program.compile(&[DeviceId(0)], &[], "", None).unwrap_err();
    assert!(matches!(err, BuildError::CompileFailure { .. }));
    assert!(program.build_log(DeviceId(0)).contains("'defs.h' file not found"));

    program.clear();
    program
        .compile(&[DeviceId(0)], &[("defs.h".to_string(), header)], "", None)
        .unwrap();
    assert_eq!(program.program_kind(DeviceId(0)), ProgramKind::Compiled);
}

#[test]
fn test_header_must_be_source() {
    let (ctx, _) = context();
    let header = Arc::new(Program::with_il(Arc::clone(&ctx), b"kiln-ir\n".to_vec()));
    let program = Arc::new(Program::with_source(ctx, SOURCE));
    let err = program
        .compile(&[], &[("h".to_string(), header)], "", None)
        .unwrap_err();
    assert!(matches!(err, BuildError::InvalidOperation(_)));
}

#[test]
fn test_env_overrides_apply() {
    let backend = Arc::new(MockBackend::new());
    let config = BuildConfig::from_lookup(|name| match name {
        "KILN_BUILD_OPTIONS" => Some("-O1".to_string()),
        "KILN_BUILD_OPTIONS_APPEND" => Some("-g".to_string()),
        _ => None,
    });
    let program = Arc::new(Program::with_source(context_with(backend, config), SOURCE));
    program.build(&[DeviceId(0)], "-O3", None).unwrap();
    assert_eq!(program.build_options(DeviceId(0)).as_deref(), Some("-O1 -g"));
}

#[test]
fn test_binary_uses_configured_version() {
    let backend = Arc::new(MockBackend::new());
    let config = BuildConfig::new().with_binary_version(BifVersion::V30);
    let program = Arc::new(Program::with_source(context_with(backend, config), SOURCE));
    program.build(&[DeviceId(0)], "", None).unwrap();

    let bytes = program.binary(DeviceId(0)).unwrap().unwrap();
    assert_eq!(peek_version(&bytes).unwrap(), BifVersion::V30);
    let bif = Bif::decode(&bytes).unwrap();
    assert_eq!(bif.kernel_names().len(), 2);
    assert_eq!(program.binary(DeviceId(1)).unwrap(), None);
}

#[test]
fn test_binary_in_unrepresentable_version() {
    let backend = Arc::new(MockBackend::new());
    let config = BuildConfig::new().with_binary_version(BifVersion::V20);
    let program = Arc::new(Program::with_source(context_with(backend, config), SOURCE));
    program.build(&[DeviceId(0)], "", None).unwrap();
    assert!(matches!(
        program.binary(DeviceId(0)),
        Err(BuildError::InvalidBinary(_))
    ));
}

#[test]
fn test_with_binaries_checks_devices() {
    let (ctx, _) = context();
    let source = Arc::new(Program::with_source(Arc::clone(&ctx), SOURCE));
    source.build(&[DeviceId(0)], "", None).unwrap();
    let bytes = source.binary(DeviceId(0)).unwrap().unwrap();

    let err = Program::with_binaries(Arc::clone(&ctx), vec![(DeviceId(9), bytes.clone())]).unwrap_err();
    assert!(matches!(err, BuildError::DeviceMismatch(_)));

    let err = Program::with_binaries(Arc::clone(&ctx), vec![(DeviceId(0), b"junk".to_vec())]).unwrap_err();
    assert!(matches!(err, BuildError::InvalidBinary(_)));

    let program = Arc::new(Program::with_binaries(ctx, vec![(DeviceId(0), bytes)]).unwrap());
    assert_eq!(program.program_kind(DeviceId(0)), ProgramKind::Executable);
    assert_eq!(program.build_status(DeviceId(0)), BuildStatus::None);
    let err = program.build(&[DeviceId(1)], "", None).unwrap_err();
    assert!(matches!(err, BuildError::DeviceMismatch(_)));
}

#[test]
fn test_kernel_names_cached_until_clear() {
    let (ctx, _) = context();
    let program = Arc::new(Program::with_source(ctx, SOURCE));
    assert_eq!(program.kernel_names(), "");
    program.build(&[], "", None).unwrap();
    assert_eq!(program.kernel_names(), "scale;add");
    assert_eq!(program.num_kernels(), 2);

    program.clear();
    assert_eq!(program.kernel_names(), "");
    assert_eq!(program.num_kernels(), 0);
}

#[test]
fn test_compile_does_not_publish_kernels() {
    let (ctx, _) = context();
    let program = Arc::new(Program::with_source(ctx, SOURCE));
    program.compile(&[], &[], "", None).unwrap();
    assert_eq!(program.num_kernels(), 0);
    assert!(program.symbol("scale").is_none());
}
