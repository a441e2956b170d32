use super::*;

#[test]
fn test_descriptor_index_matches_id() {
    for (index, desc) in table().descriptors().iter().enumerate() {
        assert_eq!(desc.id as usize, index, "-{} out of order", desc.name);
    }
    assert_eq!(table().descriptors().len(), OptionId::COUNT);
}

#[test]
fn test_storage_matches_value_type() {
    for desc in table().descriptors() {
        if desc.is_alias() || desc.accumulates() {
            assert!(matches!(desc.access, Accessor::None), "-{}", desc.name);
            assert_eq!(desc.default, DefaultValue::None, "-{}", desc.name);
            continue;
        }
        let matches = matches!(
            (desc.value_type, desc.access),
            (ValueType::Bool, Accessor::Bool(..))
                | (ValueType::Int32, Accessor::Int32(..))
                | (ValueType::UInt32, Accessor::UInt32(..))
                | (ValueType::Str, Accessor::Str(..))
                | (ValueType::Byte, Accessor::Byte(..))
        );
        assert!(matches, "-{} has mismatched accessor", desc.name);
    }
}

#[test]
fn test_value_rule_is_exclusive() {
    let rules = OptionFlags::VALUE_REQUIRED | OptionFlags::VALUE_OPTIONAL | OptionFlags::VALUE_DISALLOWED;
    for desc in table().descriptors() {
        assert_eq!(
            (desc.flags & rules).bits().count_ones(),
            1,
            "-{} must declare exactly one value rule",
            desc.name
        );
    }
}

#[test]
fn test_optional_values_have_second_defaults() {
    for desc in table().descriptors() {
        if desc.flags.contains(OptionFlags::VALUE_OPTIONAL) {
            assert!(second_default(desc.id).is_some(), "-{}", desc.name);
        }
    }
    assert_eq!(second_default(OptionId::OptLevel), Some("2"));
    assert_eq!(second_default(OptionId::Help), Some("public"));
    assert_eq!(second_default(OptionId::Debug), None);
}

#[test]
fn test_lookup_maps() {
    let table = table();
    assert_eq!(table.find_short("g").map(|d| d.id), Some(OptionId::Debug));
    assert_eq!(table.find_long("help").map(|d| d.id), Some(OptionId::Help));
    assert_eq!(table.find_f("bin-exe").map(|d| d.id), Some(OptionId::BinExe));
    assert_eq!(table.find_m("xnack").map(|d| d.id), Some(OptionId::Xnack));
    // Family members are not reachable by their bare name.
    assert!(table.find_short("bin-exe").is_none());
    assert!(table.find_short("nope").is_none());
}

#[test]
fn test_glued_lookup_prefers_longest_name() {
    let table = table();
    let (desc, rest) = table.find_glued("Wf,-a,-b").unwrap();
    assert_eq!(desc.id, OptionId::FrontendPassthrough);
    assert_eq!(rest, "-a,-b");

    let found = table.find_glued("O3").map(|(d, r)| (d.id, r));
    assert_eq!(found, Some((OptionId::OptLevel, "3")));

    // A bare name is not a glued match.
    assert!(table.find_glued("O").is_none());
}

#[test]
fn test_defaults_applied_to_record() {
    let vars = OptionVariables::default();
    assert_eq!(vars.opt_level, 3);
    assert_eq!(vars.source_kind, "clc");
    assert!(vars.bin_exe);
    assert!(vars.bin_llvmir);
    assert!(vars.inline);
    assert!(!vars.bin_source);
    assert!(vars.help.is_empty());
}

#[test]
fn test_spelling_includes_family_prefix() {
    assert_eq!(OptionId::BinExe.descriptor().spelling(), "fbin-exe");
    assert_eq!(OptionId::Cpu.descriptor().spelling(), "mcpu");
    assert_eq!(OptionId::Debug.descriptor().spelling(), "g");
}

#[test]
fn test_accessor_rejects_wrong_type() {
    let mut vars = OptionVariables::default();
    let access = OptionId::OptLevel.descriptor().access;
    assert!(!access.set(&mut vars, OptionValue::Bool(true)));
    assert!(access.set(&mut vars, OptionValue::Int32(1)));
    assert_eq!(access.get(&vars), Some(OptionValue::Int32(1)));
}
