//! Textual dump of the static arch tables for a starlark configuration evaluator.

use std::collections::BTreeMap;

use serde::Serialize;
use serde_json::ser::{PrettyFormatter, Serializer};

use crate::platform::ArchType;
use crate::platform::arch_list::{self, ArchConfig};
use crate::util::starlark_fmt::{indention, print_dict, print_string_list, print_string_list_dict};

fn print_arch_type_dict(table: fn(ArchType) -> &'static [&'static str]) -> String {
  let dict = ArchType::ALL
    .into_iter()
    .map(|arch| (arch.to_string(), print_string_list(table(arch), 1)))
    .collect();
  print_dict(&dict, 0)
}

fn print_android_feature_dict() -> String {
  let dict = ArchType::ALL
    .into_iter()
    .map(|arch| {
      let variants: BTreeMap<String, Vec<&str>> = arch_list::android_arch_feature_map(arch)
        .iter()
        .map(|(variant, features)| (variant.to_string(), features.to_vec()))
        .collect();
      (arch.to_string(), print_string_list_dict(&variants, 1))
    })
    .collect();
  print_dict(&dict, 0)
}

fn print_arch_config_list(configs: &[ArchConfig]) -> Result<String, serde_json::Error> {
  let indent = indention(1);
  let mut out = Vec::new();
  let mut ser = Serializer::with_formatter(&mut out, PrettyFormatter::with_indent(indent.as_bytes()));
  configs.serialize(&mut ser)?;
  Ok(format!("json.decode('''{}''')", String::from_utf8_lossy(&out)))
}

/// Dump the arch variant, cpu variant, feature, and fixed ABI tables.
///
/// Keys are sorted, so identical tables always produce identical text.
pub fn arch_config_starlark() -> Result<String, serde_json::Error> {
  Ok(format!(
    r#"
_arch_to_variants = {}

_arch_to_cpu_variants = {}

_arch_to_features = {}

_android_arch_feature_for_arch_variant = {}

_aml_arches = {}

_ndk_arches = {}

arch_to_variants = _arch_to_variants
arch_to_cpu_variants = _arch_to_cpu_variants
arch_to_features = _arch_to_features
android_arch_feature_for_arch_variants = _android_arch_feature_for_arch_variant
aml_arches = _aml_arches
ndk_arches = _ndk_arches
"#,
    print_arch_type_dict(arch_list::arch_variants),
    print_arch_type_dict(arch_list::cpu_variants),
    print_arch_type_dict(arch_list::arch_features),
    print_android_feature_dict(),
    print_arch_config_list(&arch_list::aml_abis_config())?,
    print_arch_config_list(&arch_list::ndk_abis_config())?,
  ))
}
