use super::*;

#[test]
fn test_cpu_legacy_machine_ids() {
    let legacy = Target::new(Arch::X86_64, 0).to_legacy().unwrap();
    assert_eq!(legacy.machine, EM_X86_64);
    assert_eq!(legacy.platform, Platform::Cpu);
    assert_eq!(legacy.class, 2);

    let legacy = Target::new(Arch::X86, 0).to_legacy().unwrap();
    assert_eq!(legacy.machine, EM_386);
}

#[test]
fn test_cpu_legacy_keeps_bitness() {
    for target in [
        Target::new(Arch::X86, 0),
        Target::new(Arch::X86, 0).with_bitness(Bitness::B64),
        Target::new(Arch::X86_64, 0).with_bitness(Bitness::B32),
    ] {
        let legacy = target.to_legacy().unwrap();
        assert_eq!(Target::from_legacy(legacy), Ok(target));
    }
}

#[test]
fn test_cpu_chip_has_no_legacy_encoding() {
    let target = Target::new(Arch::X86_64, 7);
    assert!(target.to_legacy().is_none());
    assert!(!target.is_representable_in(BifVersion::V20));
    assert!(target.is_representable_in(BifVersion::V31));
}

#[test]
fn test_amdil_legacy_offsets_chip_id() {
    let target = Target::new(Arch::AmdIl, 17).with_bitness(Bitness::B64);
    let legacy = target.to_legacy().unwrap();
    assert_eq!(legacy.machine, 1018);
    assert_eq!(legacy.platform, Platform::Gpu);
    assert_eq!(Target::from_legacy(legacy), Ok(target));
}

#[test]
fn test_modern_archs_have_no_legacy_encoding() {
    for arch in [Arch::Hsail, Arch::Hsail64, Arch::Amdgcn] {
        let target = Target::new(arch, 1);
        assert!(target.to_legacy().is_none());
        assert!(!target.is_representable_in(BifVersion::V21));
        assert!(target.is_representable_in(BifVersion::V30));
    }
}

#[test]
fn test_unknown_legacy_machine() {
    let legacy = LegacyMachine {
        machine: 40,
        platform: Platform::Cpu,
        class: 1,
    };
    assert_eq!(
        Target::from_legacy(legacy),
        Err(BifError::UnknownMachine {
            machine: 40,
            platform: Platform::Cpu
        })
    );
}

#[test]
fn test_target_info_encoding() {
    for arch in Arch::ALL {
        let target = Target::new(arch, 1030);
        let info = target.to_info();
        assert_eq!(info.flags & TargetInfo::FLAG_64BIT != 0, target.bitness == Bitness::B64);
        assert_eq!(Target::from_info(info), Ok(target));
    }
    let bad = TargetInfo {
        arch_id: 99,
        chip_id: 0,
        flags: 0,
    };
    assert_eq!(Target::from_info(bad), Err(BifError::UnknownArch(99)));
}

#[test]
fn test_display() {
    assert_eq!(Target::new(Arch::Amdgcn, 1030).to_string(), "amdgcn:1030 (64-bit)");
}
