use pretty_assertions::assert_eq;

use super::*;

fn entry(name: &str, abi: u32, params: &[&str]) -> EntryPoint {
    let signature = KernelSignature::new(name, abi)
        .with_params(params.iter().map(ToString::to_string).collect());
    EntryPoint {
        symbol: format!("__ocl_kernel_{name}"),
        code_offset: 0,
        code_size: 4,
        signature,
    }
}

#[test]
fn test_insertion_order() {
    let mut table = SymbolTable::new();
    table.insert_or_update(DeviceId(0), entry("scale", 1, &[]));
    table.insert_or_update(DeviceId(0), entry("add", 1, &[]));
    table.insert_or_update(DeviceId(1), entry("scale", 1, &[]));

    assert_eq!(table.len(), 2);
    assert_eq!(table.names().collect::<Vec<_>>(), vec!["scale", "add"]);
    assert_eq!(table.joined_names(), "scale;add");
}

#[test]
fn test_highest_abi_wins() {
    let mut table = SymbolTable::new();
    table.insert_or_update(DeviceId(0), entry("k", 1, &["int a"]));
    table.insert_or_update(DeviceId(1), entry("k", 3, &["int a", "float b"]));
    table.insert_or_update(DeviceId(2), entry("k", 2, &["int a"]));

    let symbol = table.get("k").unwrap();
    assert_eq!(symbol.signature.abi_version, 3);
    assert_eq!(symbol.signature.params, vec!["int a".to_string(), "float b".to_string()]);
    assert_eq!(symbol.devices(), vec![DeviceId(0), DeviceId(1), DeviceId(2)]);
    assert_eq!(symbol.entry_point(DeviceId(2)).unwrap().signature.abi_version, 2);
}

#[test]
fn test_clear() {
    let mut table = SymbolTable::new();
    table.insert_or_update(DeviceId(0), entry("k", 1, &[]));
    table.clear();
    assert!(table.is_empty());
    assert!(table.get("k").is_none());
    assert_eq!(table.joined_names(), "");
}
