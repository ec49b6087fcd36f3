//! Per-build configuration: product variables resolved into targets.
//!
//! A [`Config`] is built once, before any mutator runs, and is read-only
//! afterwards. Every mutator and merge step takes it by reference.

pub mod starlark;
pub mod targets;
pub mod variables;

use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::Path;

use thiserror::Error;
use tracing::info;

use crate::platform::target::{common_targets, first_target};
use crate::platform::{ArchType, FeatureRegistry, Multilib, OsType, Target, arch_list};

pub use targets::{TargetError, decode_android_arch_settings, decode_target_product_variables};
pub use variables::{ConfigVariable, ProductVariables};

#[derive(Debug, Error)]
pub enum ConfigError {
  #[error("unsupported build host {os}/{arch}")]
  UnsupportedBuildHost { os: String, arch: String },

  #[error("no targets configured for the build OS {0}")]
  NoBuildOsTarget(OsType),

  #[error(transparent)]
  Target(#[from] TargetError),

  #[error("failed to read {path}: {message}")]
  Read { path: String, message: String },

  #[error("failed to parse product variables: {0}")]
  Parse(#[from] serde_json::Error),
}

#[derive(Debug, Clone)]
pub struct Config {
  variables: ProductVariables,
  build_os: OsType,
  targets: BTreeMap<OsType, Vec<Target>>,
  build_os_target: Target,
  build_os_common_target: Target,
  android_common_target: Option<Target>,
  android_first_device_target: Option<Target>,
  multilib_conflicts: BTreeSet<ArchType>,
}

impl Config {
  /// Resolve `variables` for the machine this process runs on.
  pub fn from_variables(variables: ProductVariables) -> Result<Self, ConfigError> {
    let build_os =
      OsType::current_build_os(variables.host_musl).ok_or_else(|| ConfigError::UnsupportedBuildHost {
        os: std::env::consts::OS.to_string(),
        arch: std::env::consts::ARCH.to_string(),
      })?;
    Self::for_build_os(variables, build_os)
  }

  /// Resolve `variables` as if the build ran on `build_os`.
  pub fn for_build_os(variables: ProductVariables, build_os: OsType) -> Result<Self, ConfigError> {
    Self::with_registry(variables, build_os, FeatureRegistry::global())
  }

  pub fn with_registry(
    variables: ProductVariables,
    build_os: OsType,
    defaults: &FeatureRegistry,
  ) -> Result<Self, ConfigError> {
    let mut targets = decode_target_product_variables(&variables, build_os, defaults)?;

    targets.insert(OsType::CommonOs, vec![Target::common(OsType::CommonOs)]);

    let fixed = if variables.ndk_abis {
      Some(arch_list::ndk_abis_config())
    } else if variables.aml_abis {
      Some(arch_list::aml_abis_config())
    } else {
      None
    };
    if let Some(fixed) = fixed {
      targets.insert(OsType::Android, decode_android_arch_settings(&fixed, defaults)?);
    }

    // Only one variant per multilib class can be installed on the device
    let mut multilib_conflicts = BTreeSet::new();
    let mut seen = BTreeSet::new();
    for target in targets.get(&OsType::Android).into_iter().flatten() {
      if !seen.insert(target.multilib()) {
        multilib_conflicts.insert(target.arch.arch_type);
      }
    }

    let build_targets = targets.get(&build_os).ok_or(ConfigError::NoBuildOsTarget(build_os))?;
    let build_os_target = build_targets.first().cloned().ok_or(ConfigError::NoBuildOsTarget(build_os))?;
    let build_os_common_target = common_targets(build_targets)
      .into_iter()
      .next()
      .unwrap_or_else(|| Target::common(build_os));

    let android = targets.get(&OsType::Android).map(Vec::as_slice).unwrap_or_default();
    let android_common_target = common_targets(android).into_iter().next();
    let android_first_device_target = first_target(android, &[Multilib::Lib64, Multilib::Lib32])
      .into_iter()
      .next();

    info!(
      build_os = %build_os,
      build_target = %build_os_target,
      os_count = targets.len(),
      "configuration resolved"
    );

    Ok(Self {
      variables,
      build_os,
      targets,
      build_os_target,
      build_os_common_target,
      android_common_target,
      android_first_device_target,
      multilib_conflicts,
    })
  }

  /// Load product variables from a JSON file and resolve them for `build_os`,
  /// or for the current machine when `build_os` is `None`.
  pub fn load(path: &Path, build_os: Option<OsType>) -> Result<Self, ConfigError> {
    let content = fs::read_to_string(path).map_err(|e| ConfigError::Read {
      path: path.display().to_string(),
      message: e.to_string(),
    })?;
    let variables: ProductVariables = serde_json::from_str(&content)?;
    match build_os {
      Some(os) => Self::for_build_os(variables, os),
      None => Self::from_variables(variables),
    }
  }

  pub fn variables(&self) -> &ProductVariables {
    &self.variables
  }

  pub fn build_os(&self) -> OsType {
    self.build_os
  }

  /// Every OS with at least one target, in registration order.
  pub fn targets(&self) -> &BTreeMap<OsType, Vec<Target>> {
    &self.targets
  }

  /// The ordered targets of `os`; empty when the OS is not configured.
  pub fn os_targets(&self, os: OsType) -> &[Target] {
    self.targets.get(&os).map(Vec::as_slice).unwrap_or_default()
  }

  pub fn build_os_target(&self) -> &Target {
    &self.build_os_target
  }

  pub fn build_os_common_target(&self) -> &Target {
    &self.build_os_common_target
  }

  pub fn android_common_target(&self) -> Option<&Target> {
    self.android_common_target.as_ref()
  }

  pub fn android_first_device_target(&self) -> Option<&Target> {
    self.android_first_device_target.as_ref()
  }

  /// Arch type of the primary device target, `Common` when there is no device.
  pub fn device_primary_arch_type(&self) -> ArchType {
    self
      .os_targets(OsType::Android)
      .first()
      .map(|t| t.arch.arch_type)
      .unwrap_or(ArchType::Common)
  }

  /// Whether the device supports 64-bit binaries
  pub fn android64(&self) -> bool {
    self.variables.device_supports_64bit.unwrap_or_else(|| {
      self
        .os_targets(OsType::Android)
        .iter()
        .any(|t| t.multilib() == Some(Multilib::Lib64))
    })
  }

  pub fn ignore_prefer32_on_device(&self) -> bool {
    self.variables.ignore_prefer32_on_device
  }

  /// True when an earlier device target already uses the multilib class of `arch`
  pub fn multilib_conflicts(&self, arch: ArchType) -> bool {
    self.multilib_conflicts.contains(&arch)
  }

  /// Look up a configuration variable; `None` when it is not set for this build.
  pub fn config_variable(&self, namespace: &str, name: &str) -> Option<&ConfigVariable> {
    self.variables.soong_config_variables.get(namespace)?.get(name)
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn device_vars() -> ProductVariables {
    ProductVariables {
      host_arch: Some("x86_64".to_string()),
      host_secondary_arch: Some("x86".to_string()),
      device_arch: Some("arm64".to_string()),
      device_arch_variant: Some("armv8-a".to_string()),
      device_secondary_arch: Some("arm".to_string()),
      device_secondary_arch_variant: Some("armv7-a-neon".to_string()),
      ..Default::default()
    }
  }

  #[test]
  fn derived_targets() {
    let config = Config::for_build_os(device_vars(), OsType::LinuxGlibc).unwrap();
    assert_eq!(config.build_os_target().to_string(), "linux_glibc_x86_64");
    assert_eq!(config.build_os_common_target().to_string(), "linux_glibc_common");
    assert_eq!(config.android_common_target().unwrap().to_string(), "android_common");
    assert_eq!(
      config.android_first_device_target().unwrap().to_string(),
      "android_arm64_armv8-a"
    );
    assert_eq!(config.device_primary_arch_type(), ArchType::Arm64);
    assert!(config.android64());
    assert_eq!(config.os_targets(OsType::CommonOs), &[Target::common(OsType::CommonOs)]);
  }

  #[test]
  fn host_only_product() {
    let vars = ProductVariables {
      host_arch: Some("x86_64".to_string()),
      ..Default::default()
    };
    let config = Config::for_build_os(vars, OsType::Darwin).unwrap();
    assert!(config.os_targets(OsType::Android).is_empty());
    assert!(config.android_common_target().is_none());
    assert_eq!(config.device_primary_arch_type(), ArchType::Common);
    assert!(!config.android64());
  }

  #[test]
  fn device_supports_64bit_overrides_derivation() {
    let vars = ProductVariables {
      device_supports_64bit: Some(false),
      ..device_vars()
    };
    let config = Config::for_build_os(vars, OsType::LinuxGlibc).unwrap();
    assert!(!config.android64());
  }

  #[test]
  fn ndk_abis_replace_device_targets() {
    let vars = ProductVariables {
      ndk_abis: true,
      ..device_vars()
    };
    let config = Config::for_build_os(vars, OsType::LinuxGlibc).unwrap();
    assert_eq!(config.os_targets(OsType::Android).len(), 5);
    // arm64 + riscv64 and arm + x86 share multilib classes
    assert!(config.multilib_conflicts(ArchType::Riscv64));
    assert!(config.multilib_conflicts(ArchType::X86));
    assert!(config.multilib_conflicts(ArchType::X86_64));
    assert!(!config.multilib_conflicts(ArchType::Arm64));
  }

  #[test]
  fn config_variables() {
    let mut vars = device_vars();
    vars
      .soong_config_variables
      .entry("acme".to_string())
      .or_default()
      .insert("board".to_string(), ConfigVariable::String("a".to_string()));
    let config = Config::for_build_os(vars, OsType::LinuxGlibc).unwrap();
    assert_eq!(
      config.config_variable("acme", "board"),
      Some(&ConfigVariable::String("a".to_string()))
    );
    assert_eq!(config.config_variable("acme", "missing"), None);
    assert_eq!(config.config_variable("other", "board"), None);
  }

  #[test]
  fn load_reads_json() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("product.json");
    fs::write(&path, r#"{"host_arch": "x86_64", "device_arch": "riscv64"}"#).unwrap();
    let config = Config::load(&path, Some(OsType::LinuxGlibc)).unwrap();
    assert_eq!(config.device_primary_arch_type(), ArchType::Riscv64);

    let err = Config::load(&dir.path().join("missing.json"), Some(OsType::LinuxGlibc)).unwrap_err();
    assert!(matches!(err, ConfigError::Read { .. }));
  }
}
