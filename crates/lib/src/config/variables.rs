use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// A value in the per-build configuration variable store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ConfigVariable {
  Bool(bool),
  String(String),
}

/// Raw product configuration, as written by the product setup step.
///
/// Every field is optional so partially specified products deserialize; the
/// target resolver reports what is missing.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProductVariables {
  pub host_arch: Option<String>,
  pub host_secondary_arch: Option<String>,
  pub host_musl: bool,

  pub cross_host: Option<String>,
  pub cross_host_arch: Option<String>,
  pub cross_host_secondary_arch: Option<String>,

  pub device_arch: Option<String>,
  pub device_arch_variant: Option<String>,
  pub device_cpu_variant: Option<String>,
  pub device_abi: Vec<String>,

  pub device_secondary_arch: Option<String>,
  pub device_secondary_arch_variant: Option<String>,
  pub device_secondary_cpu_variant: Option<String>,
  pub device_secondary_abi: Vec<String>,

  pub native_bridge_arch: Option<String>,
  pub native_bridge_arch_variant: Option<String>,
  pub native_bridge_cpu_variant: Option<String>,
  pub native_bridge_abi: Vec<String>,
  pub native_bridge_relative_path: Option<String>,

  pub native_bridge_secondary_arch: Option<String>,
  pub native_bridge_secondary_arch_variant: Option<String>,
  pub native_bridge_secondary_cpu_variant: Option<String>,
  pub native_bridge_secondary_abi: Vec<String>,
  pub native_bridge_secondary_relative_path: Option<String>,

  /// Build the device for the fixed mainline ABIs instead of the device arches
  pub aml_abis: bool,
  /// Build the device for the fixed NDK ABIs instead of the device arches
  pub ndk_abis: bool,

  pub ignore_prefer32_on_device: bool,
  /// Overrides the "device supports 64-bit" flag derived from the android targets
  pub device_supports_64bit: Option<bool>,

  /// namespace -> variable -> value
  pub soong_config_variables: BTreeMap<String, BTreeMap<String, ConfigVariable>>,
}

/// Treat `Some("")` like `None`, as product files write unset arches as empty strings.
pub(crate) fn non_empty(value: &Option<String>) -> Option<&str> {
  value.as_deref().filter(|v| !v.is_empty())
}
