use archvariant_lib::axes::{ConfigurationAxis, resolve_configuration_axes};

use super::common::{module_file, parse};

fn libfoo(properties: &str) -> archvariant_lib::module::Module {
  let file = module_file(&format!(
    r#"{{"name": "libfoo", "supported": "host_and_device", "shapes": ["compiler"], "properties": {properties}}}"#
  ));
  parse(&file).unwrap().remove(0)
}

#[test]
fn feature_power_set_for_declared_features() {
  let module = libfoo(
    r#"{"arch": {"x86": {
      "cflags": ["-x86"],
      "ssse3": {"cflags": ["-mssse3"]},
      "avx2": {"cflags": ["-mavx2"]},
      "popcnt": {"cflags": ["-mpopcnt"]}
    }}}"#,
  );
  let shape = module.properties()[1].shape().clone();
  let axes = resolve_configuration_axes(&module, &shape).unwrap();
  let arch = &axes[&ConfigurationAxis::Arch];

  let x86: Vec<&str> = arch
    .keys()
    .map(String::as_str)
    .filter(|k| *k == "x86" || k.starts_with("x86-"))
    .collect();
  assert_eq!(
    x86,
    [
      "x86",
      "x86-avx2",
      "x86-avx2-popcnt",
      "x86-avx2-popcnt-ssse3",
      "x86-avx2-ssse3",
      "x86-popcnt",
      "x86-popcnt-ssse3",
      "x86-ssse3",
    ]
  );
  assert_eq!(
    arch["x86-avx2-popcnt-ssse3"].get_list("cflags").unwrap(),
    ["-x86", "-mavx2", "-mpopcnt", "-mssse3"]
  );
  // One base value per arch type plus the combinations
  assert_eq!(arch.len(), 5 + 7);
}

#[test]
fn every_axis_is_reported() {
  let module = libfoo(r#"{"cflags": ["-Wall"], "target": {"android_arm64": {"cflags": ["-android-arm64"]}}}"#);
  let shape = module.properties()[1].shape().clone();
  let axes = resolve_configuration_axes(&module, &shape).unwrap();

  let names: Vec<&str> = axes.keys().map(ConfigurationAxis::as_str).collect();
  assert_eq!(names, ["", "arch", "os", "os_arch"]);
  assert_eq!(
    axes[&ConfigurationAxis::NoConfig][""].get_list("cflags").unwrap(),
    ["-Wall"]
  );
  assert_eq!(
    axes[&ConfigurationAxis::OsArch]["android_arm64"]
      .get_list("cflags")
      .unwrap(),
    ["-android-arm64"]
  );
}
