use archvariant_lib::config::{Config, ConfigVariable};
use archvariant_lib::configurable::ConfigurableValue;
use archvariant_lib::module::Module;
use archvariant_lib::platform::OsType;

use super::common::{cflags, device_vars, find, linux_config, module_file, resolve, string_list};

fn board_config(board: &str) -> Config {
  let mut vars = device_vars();
  vars.soong_config_variables.insert(
    "acme".to_string(),
    [("board".to_string(), ConfigVariable::String(board.to_string()))]
      .into_iter()
      .collect(),
  );
  Config::for_build_os(vars, OsType::LinuxGlibc).unwrap()
}

fn srcs(module: &Module, config: &Config) -> Vec<String> {
  let set = module
    .properties()
    .iter()
    .find(|set| set.shape().field("srcs").is_some())
    .unwrap();
  match set.values().evaluate("srcs", &module.context(config)).unwrap() {
    Some(ConfigurableValue::StringList(items)) => items,
    None => Vec::new(),
    other => panic!("srcs evaluated to {:?}", other),
  }
}

#[test]
fn device_blocks_merge_from_generic_to_specific() {
  let graph = resolve(
    &linux_config(),
    &module_file(
      r#"{"name": "libfoo", "supported": "host_and_device", "shapes": ["compiler"], "properties": {
        "cflags": ["-base"],
        "arch": {"arm64": {"cflags": ["-arm64"], "armv8_a": {"cflags": ["-armv8"]}}},
        "multilib": {"lib64": {"cflags": ["-lib64"]}, "lib32": {"cflags": ["-lib32"]}},
        "target": {
          "android_arm64": {"cflags": ["-android-arm64"]},
          "linux_arm64": {"cflags": ["-linux-arm64"]},
          "android64": {"cflags": ["-android64"]},
          "android": {"cflags": ["-android"]},
          "bionic": {"cflags": ["-bionic"]},
          "linux": {"cflags": ["-linux"]},
          "host": {"cflags": ["-host"]}
        }
      }}"#,
    ),
  )
  .unwrap();

  let arm64 = find(&graph, "libfoo", "android_arm64_armv8-a");
  assert_eq!(
    cflags(arm64),
    [
      "-base",
      "-linux",
      "-bionic",
      "-android",
      "-android64",
      "-arm64",
      "-armv8",
      "-lib64",
      "-linux-arm64",
      "-android-arm64",
    ]
  );

  let arm = find(&graph, "libfoo", "android_arm_armv7-a-neon_cortex-a15");
  assert_eq!(
    cflags(arm),
    ["-base", "-linux", "-bionic", "-android", "-android64", "-lib32"]
  );
}

#[test]
fn host_blocks_merge_per_arch() {
  let graph = resolve(
    &linux_config(),
    &module_file(
      r#"{"name": "aapt", "supported": "host", "shapes": ["compiler"], "properties": {
        "cflags": ["-base"],
        "ldflags": ["-generic"],
        "arch": {"x86": {"cflags": ["-x86"], "ldflags": ["-m32"]}},
        "target": {"host": {"cflags": ["-host"]}, "linux_glibc_x86": {"cflags": ["-glibc-x86"]}}
      }}"#,
    ),
  )
  .unwrap();
  assert_eq!(
    cflags(find(&graph, "aapt", "linux_glibc_x86_64")),
    ["-base", "-host"]
  );
  let x86 = find(&graph, "aapt", "linux_glibc_x86");
  assert_eq!(cflags(x86), ["-base", "-host", "-x86", "-glibc-x86"]);
  assert_eq!(string_list(x86, "ldflags"), ["-m32", "-generic"]);
}

#[test]
fn selects_concatenate_across_blocks() {
  let file = module_file(
    r#"{"name": "libsoc", "supported": "device", "shapes": ["compiler"], "properties": {
      "srcs": {"concat": [
        ["common.c"],
        {"select": {"conditions": ["arch"], "cases": [
          {"patterns": ["arm64"], "value": ["arm64.c"]},
          {"patterns": ["default"], "value": ["generic.c"]}
        ]}}
      ]},
      "arch": {"arm64": {"srcs": {"select": {
        "conditions": [{"soong_config_variable": ["acme", "board"]}],
        "cases": [{"patterns": ["soc_a"], "value": ["soc_a.c"]}, {"patterns": ["default"], "value": null}]
      }}}}
    }}"#,
  );

  let config = board_config("soc_a");
  let graph = resolve(&config, &file).unwrap();
  assert_eq!(
    srcs(find(&graph, "libsoc", "android_arm64_armv8-a"), &config),
    ["common.c", "arm64.c", "soc_a.c"]
  );
  assert_eq!(
    srcs(find(&graph, "libsoc", "android_arm_armv7-a-neon_cortex-a15"), &config),
    ["common.c", "generic.c"]
  );

  let config = board_config("soc_b");
  let graph = resolve(&config, &file).unwrap();
  assert_eq!(
    srcs(find(&graph, "libsoc", "android_arm64_armv8-a"), &config),
    ["common.c", "arm64.c"]
  );
}

#[test]
fn enabled_can_select_on_arch() {
  let config = linux_config();
  let graph = resolve(
    &config,
    &module_file(
      r#"{"name": "lib64only", "supported": "device", "properties": {
        "enabled": {"select": {"conditions": ["arch"], "cases": [
          {"patterns": ["arm"], "value": false},
          {"patterns": ["default"], "value": true}
        ]}}
      }}"#,
    ),
  )
  .unwrap();
  assert!(
    find(&graph, "lib64only", "android_arm64_armv8-a")
      .enabled(&config)
      .unwrap()
  );
  assert!(
    !find(&graph, "lib64only", "android_arm_armv7-a-neon_cortex-a15")
      .enabled(&config)
      .unwrap()
  );
}

#[test]
fn arch_features_merge_their_blocks() {
  let graph = resolve(
    &linux_config(),
    &module_file(
      r#"{"name": "libneon", "supported": "device", "shapes": ["compiler"], "properties": {
        "arch": {"arm": {"neon": {"cflags": ["-mfpu=neon"]}, "cortex_a15": {"cflags": ["-mcpu=cortex-a15"]}}}
      }}"#,
    ),
  )
  .unwrap();
  assert_eq!(
    cflags(find(&graph, "libneon", "android_arm_armv7-a-neon_cortex-a15")),
    ["-mcpu=cortex-a15", "-mfpu=neon"]
  );
  assert!(cflags(find(&graph, "libneon", "android_arm64_armv8-a")).is_empty());
}
