use kiln_bif::{Arch, Target};
use kiln_options::{OptionScope, SourceKind};
use pretty_assertions::assert_eq;

use super::*;
use crate::testing::{MockBackend, Stage};

const SOURCE: &str = "__kernel void scale(global float* x, float a) { }\n\
                      __kernel void add(global int* a, global int* b) { }\n";

fn device() -> Device {
    Device::new(0, "gfx906", Target::new(Arch::Amdgcn, 906))
}

fn options(text: &str) -> Options {
    Options::parse(text, OptionScope::Build).unwrap()
}

fn source(text: &str) -> CompileInput<'_> {
    CompileInput::Source {
        text,
        kind: SourceKind::Clc,
    }
}

fn compiled(backend: &MockBackend, text: &str, opts: &str) -> DeviceProgram {
    let mut program = DeviceProgram::new(device());
    let options = Options::parse(opts, OptionScope::Compile).unwrap();
    program.compile(backend, source(text), &[], &options).unwrap();
    program
}

#[test]
fn test_status_transitions() {
    let mut program = DeviceProgram::new(device());
    assert!(program.set_status(BuildStatus::Success).is_err());
    program.set_status(BuildStatus::InProgress).unwrap();
    assert!(program.set_status(BuildStatus::None).is_err());
    program.set_status(BuildStatus::Error).unwrap();
    assert!(program.set_status(BuildStatus::InProgress).is_err());
    assert_eq!(program.status(), BuildStatus::Error);
}

#[test]
fn test_compile_commits_ir() {
    let backend = MockBackend::new();
    let program = compiled(&backend, SOURCE, "-O2");

    assert_eq!(program.status(), BuildStatus::Success);
    assert_eq!(program.kind(), ProgramKind::Compiled);
    assert!(program.kernels().is_empty());
    let bif = program.binary().unwrap();
    assert_eq!(bif.kind, BinaryKind::Compiled);
    assert_eq!(bif.compiler_options(), Some("-O2"));
    assert!(bif.section(SectionId::Source).is_none());
    assert!(String::from_utf8_lossy(program.ir().unwrap()).contains("kernel scale("));
}

#[test]
fn test_compile_keeps_source_on_request() {
    let backend = MockBackend::new();
    let program = compiled(&backend, SOURCE, "-fbin-source");
    let bif = program.binary().unwrap();
    assert_eq!(bif.section(SectionId::Source), Some(SOURCE.as_bytes()));
}

#[test]
fn test_compile_il_is_intermediate() {
    let backend = MockBackend::new();
    let mut program = DeviceProgram::new(device());
    let il = b"kiln-ir\nkernel k(int a)\n";
    program
        .compile(&backend, CompileInput::Il(il), &[], &options(""))
        .unwrap();
    assert_eq!(program.kind(), ProgramKind::Intermediate);
    assert_eq!(program.ir(), Some(&il[..]));
}

#[test]
fn test_compile_failure_logs() {
    let backend = MockBackend::new();
    let mut program = DeviceProgram::new(device());
    let err = program
        .compile(&backend, source("#error missing feature"), &[], &options(""))
        .unwrap_err();

    assert!(matches!(err, BuildError::CompileFailure { .. }));
    assert_eq!(program.status(), BuildStatus::Error);
    assert!(program.log().contains("error: missing feature"));
    assert!(program.binary().is_none());
}

#[test]
fn test_compile_twice_is_rejected() {
    let backend = MockBackend::new();
    let mut program = compiled(&backend, SOURCE, "");
    let err = program.compile(&backend, source(SOURCE), &[], &options("")).unwrap_err();
    assert!(matches!(err, BuildError::InvalidOperation(_)));
}

#[test]
fn test_build_executable() {
    let backend = MockBackend::new();
    let mut program = DeviceProgram::new(device());
    program
        .build(&backend, None, Some(source(SOURCE)), &options("-wgs=8,8"))
        .unwrap();

    assert_eq!(program.status(), BuildStatus::Success);
    assert_eq!(program.kind(), ProgramKind::Executable);
    let names: Vec<&str> = program.kernels().iter().map(EntryPoint::name).collect();
    assert_eq!(names, vec!["scale", "add"]);
    assert_eq!(program.kernels()[0].symbol, "__ocl_kernel_scale");
    assert_eq!(program.kernels()[1].signature.work_group_size_hint, Some([8, 8, 1]));

    let bif = program.binary().unwrap();
    let image = bif.section(SectionId::Text).unwrap();
    assert_eq!(bif.symbol(SymbolKind::DeviceCode, "add"), Some(&b"gfx906:add\n"[..]));
    let info = KernelInfo::from_bytes(bif.symbol(SymbolKind::KernelMetadata, "scale").unwrap()).unwrap();
    assert_eq!(info.code(image), Some(&b"gfx906:scale\n"[..]));
    assert!(bif.section(SectionId::LlvmIr).is_some());
}

#[test]
fn test_build_honors_bin_flags() {
    let backend = MockBackend::new();
    let mut program = DeviceProgram::new(device());
    program
        .build(&backend, None, Some(source(SOURCE)), &options("-fno-bin-exe -fno-bin-llvmir"))
        .unwrap();

    let bif = program.binary().unwrap();
    assert!(bif.section(SectionId::Text).is_none());
    assert!(bif.section(SectionId::LlvmIr).is_none());
    assert!(bif.symbol(SymbolKind::DeviceCode, "scale").is_none());
    assert!(bif.symbol(SymbolKind::KernelMetadata, "scale").is_some());
    assert_eq!(program.kernels().len(), 2);
}

#[test]
fn test_build_records_flags() {
    let backend = MockBackend::new();
    let mut program = DeviceProgram::new(device());
    program
        .build(&backend, None, Some(source(SOURCE)), &options("-legacy -g -cl-fast-relaxed-math"))
        .unwrap();
    let flags = program.binary().unwrap().flags;
    assert!(flags.contains(BifFlags::LEGACY_FRONTEND | BifFlags::DEBUG_INFO | BifFlags::RELAXED_MATH));
    assert!(program.is_legacy());
}

#[test]
fn test_out_of_resources() {
    let backend = MockBackend::new();
    backend.set_out_of_resources(true);
    let mut program = DeviceProgram::new(device());
    let err = program
        .build(&backend, None, Some(source(SOURCE)), &options(""))
        .unwrap_err();
    assert!(err.is_out_of_resources());
    assert_eq!(program.status(), BuildStatus::Error);
    assert!(program.log().contains("out of memory"));
}

#[test]
fn test_link_library_then_executable() {
    let backend = MockBackend::new();
    let a = compiled(&backend, "__kernel void a(int x) {}", "");
    let b = compiled(&backend, "__kernel void b(int y) {}", "");
    let inputs = [a.link_input().unwrap(), b.link_input().unwrap()];

    let mut library = DeviceProgram::new(device());
    let link_opts = Options::parse("-create-library", OptionScope::Link).unwrap();
    library.link(&backend, &inputs, &link_opts).unwrap();
    assert_eq!(library.kind(), ProgramKind::Library);

    let mut exe = DeviceProgram::new(device());
    let link_opts = Options::parse("", OptionScope::Link).unwrap();
    exe.link(&backend, &[library.link_input().unwrap()], &link_opts).unwrap();
    assert_eq!(exe.kind(), ProgramKind::Executable);
    let names: Vec<&str> = exe.kernels().iter().map(EntryPoint::name).collect();
    assert_eq!(names, vec!["a", "b"]);
}

#[test]
fn test_link_multiple_inputs_links_ir_first() {
    let backend = MockBackend::new();
    let a = compiled(&backend, "__kernel void a(int x) {}", "");
    let b = compiled(&backend, "__kernel void b(int y) {}", "");
    let mut exe = DeviceProgram::new(device());
    let link_opts = Options::parse("", OptionScope::Link).unwrap();
    exe.link(&backend, &[a.link_input().unwrap(), b.link_input().unwrap()], &link_opts)
        .unwrap();

    assert_eq!(backend.calls_for(Stage::LinkIr), 1);
    assert_eq!(backend.calls_for(Stage::Executable), 1);
    let ir = String::from_utf8_lossy(exe.ir().unwrap()).into_owned();
    assert!(ir.contains("kernel a(") && ir.contains("kernel b("));
}

#[test]
fn test_link_duplicate_kernel_fails() {
    let backend = MockBackend::new();
    let a = compiled(&backend, "__kernel void k(int x) {}", "");
    let mut exe = DeviceProgram::new(device());
    let link_opts = Options::parse("", OptionScope::Link).unwrap();
    let err = exe
        .link(&backend, &[a.link_input().unwrap(), a.link_input().unwrap()], &link_opts)
        .unwrap_err();
    assert!(matches!(err, BuildError::LinkFailure { .. }));
    assert!(exe.log().contains("duplicate kernel 'k'"));
}

#[test]
fn test_link_mixed_front_ends() {
    let backend = MockBackend::new();
    let modern = compiled(&backend, "__kernel void a(int x) {}", "");
    let legacy = compiled(&backend, "__kernel void b(int x) {}", "-legacy");
    let mut exe = DeviceProgram::new(device());
    let link_opts = Options::parse("", OptionScope::Link).unwrap();
    let err = exe
        .link(&backend, &[modern.link_input().unwrap(), legacy.link_input().unwrap()], &link_opts)
        .unwrap_err();
    assert!(matches!(err, BuildError::DeviceMismatch(_)));
    assert_eq!(exe.status(), BuildStatus::Error);
    assert_eq!(backend.calls_for(Stage::Executable), 0);
}

#[test]
fn test_executable_is_not_linkable() {
    let backend = MockBackend::new();
    let mut program = DeviceProgram::new(device());
    program
        .build(&backend, None, Some(source(SOURCE)), &options(""))
        .unwrap();
    assert!(program.link_input().is_none());
}

#[test]
fn test_from_binary_adopts_kernels() {
    let backend = MockBackend::new();
    let mut built = DeviceProgram::new(device());
    built
        .build(&backend, None, Some(source(SOURCE)), &options("-O1"))
        .unwrap();
    let bytes = built.binary().unwrap().encode().unwrap();

    let seeded = DeviceProgram::from_binary(device(), &bytes).unwrap();
    assert_eq!(seeded.status(), BuildStatus::None);
    assert_eq!(seeded.kind(), ProgramKind::Executable);
    assert_eq!(seeded.options(), "-O1");
    assert_eq!(seeded.kernels(), built.kernels());
}

#[test]
fn test_from_legacy_binary() {
    let backend = MockBackend::new();
    let x86 = Device::new(0, "x86-64", Target::new(Arch::X86_64, 0));
    let mut built = DeviceProgram::new(x86.clone());
    built
        .build(&backend, None, Some(source(SOURCE)), &options(""))
        .unwrap();
    let legacy = kiln_bif::convert(built.binary().unwrap(), BifVersion::V20).unwrap();

    let seeded = DeviceProgram::from_binary(x86, &legacy.encode().unwrap()).unwrap();
    assert_eq!(seeded.binary().unwrap().version, BifVersion::CURRENT);
    assert_eq!(seeded.kernels().len(), 2);
}

#[test]
fn test_from_binary_wrong_arch() {
    let backend = MockBackend::new();
    let built = compiled(&backend, SOURCE, "");
    let bytes = built.binary().unwrap().encode().unwrap();
    let x86 = Device::new(1, "x86-64", Target::new(Arch::X86_64, 0));
    assert!(matches!(
        DeviceProgram::from_binary(x86, &bytes),
        Err(BuildError::DeviceMismatch(_))
    ));
}

#[test]
fn test_from_garbage() {
    assert!(matches!(
        DeviceProgram::from_binary(device(), b"not a container"),
        Err(BuildError::InvalidBinary(BifError::InvalidMagic))
    ));
}

#[test]
fn test_seeded_executable_reused_with_same_options() {
    let backend = MockBackend::new();
    let mut built = DeviceProgram::new(device());
    built
        .build(&backend, None, Some(source(SOURCE)), &options("-O2"))
        .unwrap();
    let bytes = built.binary().unwrap().encode().unwrap();
    let calls = backend.calls().len();

    let mut seeded = DeviceProgram::from_binary(device(), &bytes).unwrap();
    seeded.build(&backend, None, None, &options("-O2")).unwrap();
    assert_eq!(seeded.status(), BuildStatus::Success);
    assert_eq!(backend.calls().len(), calls);

    let mut seeded = DeviceProgram::from_binary(device(), &bytes).unwrap();
    seeded.build(&backend, None, None, &options("-O3")).unwrap();
    assert_eq!(backend.calls_for(Stage::Executable), 2);
    assert_eq!(seeded.options(), "-O3");
}

#[test]
fn test_seeded_compiled_binary_builds() {
    let backend = MockBackend::new();
    let compiled = compiled(&backend, SOURCE, "");
    let bytes = compiled.binary().unwrap().encode().unwrap();
    let mut seeded = DeviceProgram::from_binary(device(), &bytes).unwrap();
    assert_eq!(seeded.kind(), ProgramKind::Compiled);

    seeded.build(&backend, None, None, &options("")).unwrap();
    assert_eq!(seeded.kind(), ProgramKind::Executable);
    assert_eq!(seeded.kernels().len(), 2);
}

#[test]
fn test_build_uses_cache() {
    let dir = tempfile::tempdir().unwrap();
    let cache = BuildCache::new(dir.path(), backend_version()).unwrap();
    let backend = MockBackend::new();

    let mut first = DeviceProgram::new(device());
    first
        .build(&backend, Some(&cache), Some(source(SOURCE)), &options("-O2"))
        .unwrap();
    assert_eq!(cache.count().unwrap(), 1);
    let calls = backend.calls().len();

    let mut second = DeviceProgram::new(device());
    second
        .build(&backend, Some(&cache), Some(source(SOURCE)), &options("-O2"))
        .unwrap();
    assert_eq!(backend.calls().len(), calls);
    assert_eq!(second.status(), BuildStatus::Success);
    assert_eq!(second.kernels(), first.kernels());
    assert_eq!(second.binary(), first.binary());
}

fn backend_version() -> &'static str {
    "mock-1"
}
