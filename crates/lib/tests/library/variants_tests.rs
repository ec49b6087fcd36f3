use archvariant_lib::config::{Config, ProductVariables};
use archvariant_lib::graph::DepTag;
use archvariant_lib::mutator::ErrorKind;
use archvariant_lib::platform::{ArchType, OsType};

use super::common::{device_vars, find, linux_config, module_file, parse, resolve, variant_names};

#[test]
fn both_creates_64_bit_variant_first() {
  let graph = resolve(
    &linux_config(),
    &module_file(r#"{"name": "libc", "supported": "device", "shapes": ["compiler"]}"#),
  )
  .unwrap();
  assert_eq!(
    variant_names(&graph, "libc"),
    ["android_arm64_armv8-a", "android_arm_armv7-a-neon_cortex-a15"]
  );

  let primary = find(&graph, "libc", "android_arm64_armv8-a");
  assert!(primary.state().compile_primary);
  assert_eq!(primary.os(), Some(OsType::Android));
  let secondary = find(&graph, "libc", "android_arm_armv7-a-neon_cortex-a15");
  assert!(!secondary.state().compile_primary);
  assert_eq!(secondary.arch().map(|a| a.arch_type), Some(ArchType::Arm));
}

#[test]
fn first_on_host_builds_the_primary_host_arch() {
  let graph = resolve(
    &linux_config(),
    &module_file(r#"{"name": "aapt", "supported": "host", "default_multilib": "first"}"#),
  )
  .unwrap();
  assert_eq!(variant_names(&graph, "aapt"), ["linux_glibc_x86_64"]);
}

#[test]
fn dependencies_follow_matching_variants() {
  let graph = resolve(
    &linux_config(),
    &module_file(
      r#"
      {"name": "libc", "supported": "host_and_device_default"},
      {"name": "libm", "supported": "host_and_device_default", "deps": ["libc"]}
      "#,
    ),
  )
  .unwrap();

  for id in graph.variants("libm") {
    let deps = graph.dependencies(*id);
    assert_eq!(deps.len(), 1);
    assert_eq!(graph.variations(deps[0].1).unwrap(), graph.variations(*id).unwrap());
    assert_eq!(graph.module(deps[0].1).unwrap().name(), "libc");
  }
}

#[test]
fn common_os_variant_aggregates_concrete_variants() {
  let graph = resolve(
    &linux_config(),
    &module_file(r#"{"name": "sdk", "supported": "host_and_device_default", "create_common_os_variant": true}"#),
  )
  .unwrap();
  assert_eq!(
    variant_names(&graph, "sdk"),
    [
      "linux_glibc_x86_64",
      "linux_glibc_x86",
      "android_arm64_armv8-a",
      "android_arm_armv7-a-neon_cortex-a15",
      "common_os",
    ]
  );

  let common_id = *graph.variants("sdk").last().unwrap();
  let common = graph.module(common_id).unwrap();
  assert!(common.state().common_os_variant);
  assert_eq!(common.arch().map(|a| a.arch_type), Some(ArchType::Common));

  let deps = graph.dependencies(common_id);
  assert_eq!(deps.len(), 4);
  assert!(deps.iter().all(|(tag, _)| *tag == DepTag::CommonOsToOsSpecific));
}

#[test]
fn common_os_variant_with_arch_dependent_enablement() {
  let config = linux_config();
  let graph = resolve(
    &config,
    &module_file(
      r#"{"name": "sdk", "supported": "host_and_device_default", "create_common_os_variant": true,
          "properties": {"enabled": {"select": {"conditions": ["arch"], "cases": [
            {"patterns": ["arm"], "value": false},
            {"patterns": ["default"], "value": true}
          ]}}}}"#,
    ),
  )
  .unwrap();
  assert_eq!(variant_names(&graph, "sdk").len(), 5);
  assert!(find(&graph, "sdk", "android_arm64_armv8-a").enabled(&config).unwrap());
  assert!(
    !find(&graph, "sdk", "android_arm_armv7-a-neon_cortex-a15")
      .enabled(&config)
      .unwrap()
  );

  let common_id = *graph.variants("sdk").last().unwrap();
  let deps = graph.dependencies(common_id);
  assert_eq!(deps.len(), 4);
  assert!(deps.iter().all(|(tag, _)| *tag == DepTag::CommonOsToOsSpecific));
}

#[test]
fn common_os_variant_skips_disabled_variants() {
  let graph = resolve(
    &linux_config(),
    &module_file(
      r#"{"name": "sdk", "supported": "host_and_device_default", "create_common_os_variant": true,
          "properties": {"target": {"host": {"enabled": false}, "android": {"enabled": false}}}}"#,
    ),
  )
  .unwrap();
  let common_id = *graph.variants("sdk").last().unwrap();
  assert!(graph.module(common_id).unwrap().state().common_os_variant);
  assert!(graph.dependencies(common_id).is_empty());
}

#[test]
fn unsupported_modules_are_disabled_not_split() {
  let graph = resolve(
    &linux_config(),
    &module_file(r#"{"name": "libnothing", "supported": "neither"}"#),
  )
  .unwrap();
  assert_eq!(variant_names(&graph, "libnothing"), [""]);
  let module = graph.module(graph.variants("libnothing")[0]).unwrap();
  assert!(module.state().disabled);
  assert!(!module.enabled(&linux_config()).unwrap());
}

#[test]
fn darwin_universal_binaries_pair_their_arches() {
  let vars = ProductVariables {
    host_arch: Some("x86_64".to_string()),
    host_secondary_arch: Some("arm64".to_string()),
    ..Default::default()
  };
  let config = Config::for_build_os(vars, OsType::Darwin).unwrap();
  let graph = resolve(
    &config,
    &module_file(r#"{"name": "aapt2", "supported": "host", "default_multilib": "first"}"#),
  )
  .unwrap();
  assert_eq!(variant_names(&graph, "aapt2"), ["darwin_arm64", "darwin_x86_64"]);

  let ids = graph.variants("aapt2");
  assert_eq!(graph.dependencies(ids[1]), [(DepTag::DarwinUniversal, ids[0])]);
  assert!(graph.dependencies(ids[0]).is_empty());
}

#[test]
fn bootstrap_and_plain_modules() {
  let graph = resolve(
    &linux_config(),
    &module_file(
      r#"
      {"name": "soong_build", "kind": "bootstrap"},
      {"name": "notice", "arch_specific": false}
      "#,
    ),
  )
  .unwrap();
  assert_eq!(variant_names(&graph, "soong_build"), ["linux_glibc_x86_64"]);
  assert_eq!(variant_names(&graph, "notice"), [""]);
}

#[test]
fn invalid_multilib_names_the_variant() {
  let err = resolve(
    &linux_config(),
    &module_file(r#"{"name": "libbad", "supported": "device", "properties": {"compile_multilib": "all"}}"#),
  )
  .unwrap_err();
  let failure = &err.failures()[0];
  assert_eq!(failure.module, "libbad");
  assert_eq!(failure.variant, "android");
  assert_eq!(failure.error.kind(), ErrorKind::Configuration);
  assert!(err.to_string().contains(r#"found "all""#));
}

#[test]
fn resolution_is_deterministic() {
  let file = module_file(
    r#"
    {"name": "libc", "supported": "host_and_device_default", "create_common_os_variant": true,
     "shapes": ["compiler"], "properties": {"cflags": ["-O2"], "arch": {"arm": {"cflags": ["-marm"]}}}},
    {"name": "libm", "supported": "host_and_device_default", "deps": ["libc"], "shapes": ["compiler"]}
    "#,
  );
  let config = linux_config();
  let first = resolve(&config, &file).unwrap();
  let second = resolve(&config, &file).unwrap();

  for name in ["libc", "libm"] {
    assert_eq!(variant_names(&first, name), variant_names(&second, name));
    for (a, b) in first.variants(name).iter().zip(second.variants(name)) {
      assert_eq!(first.module(*a).unwrap(), second.module(*b).unwrap());
    }
  }
}

#[test]
fn fixed_abi_products_ignore_device_arches() {
  let vars = ProductVariables {
    ndk_abis: true,
    ..device_vars()
  };
  let config = Config::for_build_os(vars, OsType::LinuxGlibc).unwrap();
  let graph = resolve(&config, &module_file(r#"{"name": "libndk", "supported": "device"}"#)).unwrap();
  let arches: Vec<ArchType> = graph
    .variants("libndk")
    .iter()
    .map(|id| graph.module(*id).unwrap().arch().unwrap().arch_type)
    .collect();
  assert!(arches.contains(&ArchType::Arm64));
  assert!(arches.contains(&ArchType::X86_64));
}

#[test]
fn declarations_reject_unknown_shapes() {
  let err = parse(&module_file(r#"{"name": "libx", "shapes": ["linker"]}"#)).unwrap_err();
  assert_eq!(err.to_string(), "module \"libx\": unknown property shape \"linker\"");
}
