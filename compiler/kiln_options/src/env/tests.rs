use super::*;

fn overrides(vars: &[(&str, &str)]) -> EnvOverrides {
    let vars: Vec<(String, String)> = vars
        .iter()
        .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
        .collect();
    EnvOverrides::from_lookup(|name| {
        vars.iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.clone())
    })
}

#[test]
fn test_no_overrides_passes_through() {
    let env = overrides(&[]);
    assert!(env.is_empty());
    assert_eq!(env.apply_build("-O2", true), "-O2");
    assert_eq!(env.apply_link("-w"), "-w");
}

#[test]
fn test_replacement_only_when_changeable() {
    let env = overrides(&[(BUILD_OPTIONS_VAR, "-O0 -g")]);
    assert_eq!(env.apply_build("-O3", true), "-O0 -g");
    assert_eq!(env.apply_build("-O3", false), "-O3");
}

#[test]
fn test_append_applies_to_build_and_link_separately() {
    let env = overrides(&[
        (BUILD_OPTIONS_VAR, "-O1"),
        (BUILD_OPTIONS_APPEND_VAR, "-g"),
        (LINK_OPTIONS_APPEND_VAR, "-create-library"),
    ]);
    assert_eq!(env.apply_build("-O3", true), "-O1 -g");
    assert_eq!(env.apply_build("-O3", false), "-O3 -g");
    assert_eq!(env.apply_link("-w"), "-w -create-library");
}

#[test]
fn test_append_to_empty_string_has_no_leading_space() {
    let env = overrides(&[(BUILD_OPTIONS_APPEND_VAR, "-g")]);
    assert_eq!(env.apply_build("", false), "-g");
}

#[test]
fn test_blank_values_are_ignored() {
    let env = overrides(&[(BUILD_OPTIONS_VAR, "   ")]);
    assert!(env.is_empty());
}
