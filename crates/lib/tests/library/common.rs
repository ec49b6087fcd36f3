use archvariant_lib::config::{Config, ProductVariables};
use archvariant_lib::graph::{ModuleGraph, VariantId};
use archvariant_lib::module::{Module, ModuleError, parse_modules};
use archvariant_lib::mutator::{MutatorErrors, run_arch_mutators};
use archvariant_lib::platform::OsType;

/// A linux host with a 64/32-bit arm device.
pub fn device_vars() -> ProductVariables {
  ProductVariables {
    host_arch: Some("x86_64".to_string()),
    host_secondary_arch: Some("x86".to_string()),
    device_arch: Some("arm64".to_string()),
    device_arch_variant: Some("armv8-a".to_string()),
    device_secondary_arch: Some("arm".to_string()),
    device_secondary_arch_variant: Some("armv7-a-neon".to_string()),
    device_secondary_cpu_variant: Some("cortex-a15".to_string()),
    ..Default::default()
  }
}

pub fn linux_config() -> Config {
  Config::for_build_os(device_vars(), OsType::LinuxGlibc).expect("config resolves")
}

/// Parse `modules_json`, split every module, and return the graph.
pub fn resolve(config: &Config, modules_json: &str) -> Result<ModuleGraph, MutatorErrors> {
  let modules = parse_modules(modules_json).expect("modules parse");
  let mut graph = ModuleGraph::from_modules(modules).expect("graph builds");
  run_arch_mutators(&mut graph, config)?;
  Ok(graph)
}

pub fn parse(modules_json: &str) -> Result<Vec<Module>, ModuleError> {
  parse_modules(modules_json)
}

/// Variation names of every variant of `name`, e.g. `android_arm64_armv8-a`.
pub fn variant_names(graph: &ModuleGraph, name: &str) -> Vec<String> {
  graph.variants(name).iter().map(|id| variant_name(graph, *id)).collect()
}

pub fn variant_name(graph: &ModuleGraph, id: VariantId) -> String {
  graph
    .variations(id)
    .expect("variant exists")
    .iter()
    .map(|(_, v)| v.as_str())
    .collect::<Vec<_>>()
    .join("_")
}

/// The variant of `name` whose variations join to `variant`.
pub fn find<'a>(graph: &'a ModuleGraph, name: &str, variant: &str) -> &'a Module {
  let id = graph
    .variants(name)
    .iter()
    .copied()
    .find(|id| variant_name(graph, *id) == variant)
    .unwrap_or_else(|| panic!("{name} has no variant {variant}: {:?}", variant_names(graph, name)));
  graph.module(id).expect("variant exists")
}

pub const COMPILER_SHAPE: &str = r#"
  "compiler": {"fields": [
    {"name": "cflags", "kind": "string_list", "tags": ["arch_variant"]},
    {"name": "srcs", "kind": {"configurable": "string_list"}, "tags": ["arch_variant", "path"]},
    {"name": "ldflags", "kind": "string_list", "tags": ["arch_variant", "variant_prepend"]},
    {"name": "stem", "kind": "string"}
  ]}
"#;

/// Wrap module declarations in a file that declares the compiler shape.
pub fn module_file(modules: &str) -> String {
  format!(r#"{{"shapes": {{{COMPILER_SHAPE}}}, "modules": [{modules}]}}"#)
}

/// The cflags of a variant's compiler properties.
pub fn cflags(module: &Module) -> Vec<String> {
  string_list(module, "cflags")
}

pub fn string_list(module: &Module, field: &str) -> Vec<String> {
  module
    .properties()
    .iter()
    .find_map(|set| set.values().get_list(field))
    .map(<[String]>::to_vec)
    .unwrap_or_default()
}
