//! Resolve product variables into the ordered target list of every OS.

use std::collections::BTreeMap;

use thiserror::Error;
use tracing::debug;

use super::variables::{ProductVariables, non_empty};
use crate::platform::arch_list::ArchConfig;
use crate::platform::{ArchError, ArchType, FeatureRegistry, OsClass, OsType, Target, decode_arch};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TargetError {
  #[error("No host primary architecture set")]
  NoHostArch,

  #[error("Unknown cross host OS {0:?}")]
  UnknownCrossHostOs(String),

  #[error("No cross-host primary architecture set")]
  NoCrossHostArch,

  #[error(transparent)]
  Arch(#[from] ArchError),
}

struct TargetConfig<'a> {
  os: OsType,
  arch_name: &'a str,
  arch_variant: Option<&'a str>,
  cpu_variant: Option<&'a str>,
  abi: &'a [String],
  native_bridge: bool,
  native_bridge_host_arch_name: Option<&'a str>,
  native_bridge_relative_path: Option<&'a str>,
}

impl<'a> TargetConfig<'a> {
  fn plain(os: OsType, arch_name: &'a str) -> Self {
    Self {
      os,
      arch_name,
      arch_variant: None,
      cpu_variant: None,
      abi: &[],
      native_bridge: false,
      native_bridge_host_arch_name: None,
      native_bridge_relative_path: None,
    }
  }
}

struct TargetMapBuilder<'a> {
  build_os: OsType,
  host_arch: &'a str,
  host_secondary_arch: Option<&'a str>,
  defaults: &'a FeatureRegistry,
  targets: BTreeMap<OsType, Vec<Target>>,
}

impl TargetMapBuilder<'_> {
  fn add(&mut self, config: TargetConfig<'_>) -> Result<(), TargetError> {
    let arch = decode_arch(
      config.os,
      config.arch_name,
      config.arch_variant,
      config.cpu_variant,
      config.abi,
      self.defaults,
    )?;

    // The guest arch is the default install path of native bridge targets
    let mut relative_path = config.native_bridge_relative_path.unwrap_or_default().to_string();
    if config.native_bridge && relative_path.is_empty() {
      relative_path = arch.arch_type.to_string();
    }

    let host_cross = config.os.class() == OsClass::Host && {
      let os_supported = config.os == self.build_os || (self.build_os.linux() && config.os.linux());
      let arch_supported = arch.arch_type == ArchType::Common
        || arch.arch_type.as_str() == self.host_arch
        || self.host_secondary_arch == Some(arch.arch_type.as_str());
      !os_supported || !arch_supported
    };

    let target = Target {
      os: config.os,
      arch,
      native_bridge: config.native_bridge,
      native_bridge_host_arch_name: config.native_bridge_host_arch_name.unwrap_or_default().to_string(),
      native_bridge_relative_path: relative_path,
      host_cross,
    };
    debug!(target = %target, host_cross, "resolved target");
    self.targets.entry(config.os).or_default().push(target);
    Ok(())
  }
}

/// Build the ordered target list of every OS from the product variables.
///
/// Insertion order per OS is host primary, host secondary, cross host primary,
/// cross host secondary, device primary, device secondary, native bridge, and
/// native bridge secondary. The primary target of an OS is always first.
pub fn decode_target_product_variables(
  vars: &ProductVariables,
  build_os: OsType,
  defaults: &FeatureRegistry,
) -> Result<BTreeMap<OsType, Vec<Target>>, TargetError> {
  let host_arch = non_empty(&vars.host_arch).ok_or(TargetError::NoHostArch)?;
  let host_secondary_arch = non_empty(&vars.host_secondary_arch);

  let mut builder = TargetMapBuilder {
    build_os,
    host_arch,
    host_secondary_arch,
    defaults,
    targets: BTreeMap::new(),
  };

  builder.add(TargetConfig::plain(build_os, host_arch))?;
  if let Some(arch) = host_secondary_arch {
    builder.add(TargetConfig::plain(build_os, arch))?;
  }

  // Cross-compiled host targets, generally windows
  if let Some(cross_host) = non_empty(&vars.cross_host) {
    let os = OsType::from_name(cross_host).ok_or_else(|| TargetError::UnknownCrossHostOs(cross_host.to_string()))?;
    let arch = non_empty(&vars.cross_host_arch).ok_or(TargetError::NoCrossHostArch)?;
    builder.add(TargetConfig::plain(os, arch))?;
    if let Some(arch) = non_empty(&vars.cross_host_secondary_arch) {
      builder.add(TargetConfig::plain(os, arch))?;
    }
  }

  if let Some(device_arch) = non_empty(&vars.device_arch) {
    builder.add(TargetConfig {
      arch_variant: vars.device_arch_variant.as_deref(),
      cpu_variant: vars.device_cpu_variant.as_deref(),
      abi: &vars.device_abi,
      ..TargetConfig::plain(OsType::Android, device_arch)
    })?;

    let device_secondary_arch = non_empty(&vars.device_secondary_arch);
    if let Some(arch) = device_secondary_arch {
      builder.add(TargetConfig {
        arch_variant: vars.device_secondary_arch_variant.as_deref(),
        cpu_variant: vars.device_secondary_cpu_variant.as_deref(),
        abi: &vars.device_secondary_abi,
        ..TargetConfig::plain(OsType::Android, arch)
      })?;
    }

    if let Some(arch) = non_empty(&vars.native_bridge_arch) {
      builder.add(TargetConfig {
        arch_variant: vars.native_bridge_arch_variant.as_deref(),
        cpu_variant: vars.native_bridge_cpu_variant.as_deref(),
        abi: &vars.native_bridge_abi,
        native_bridge: true,
        native_bridge_host_arch_name: Some(device_arch),
        native_bridge_relative_path: vars.native_bridge_relative_path.as_deref(),
        ..TargetConfig::plain(OsType::Android, arch)
      })?;
    }

    if let (Some(host_arch_name), Some(arch)) = (device_secondary_arch, non_empty(&vars.native_bridge_secondary_arch)) {
      builder.add(TargetConfig {
        arch_variant: vars.native_bridge_secondary_arch_variant.as_deref(),
        cpu_variant: vars.native_bridge_secondary_cpu_variant.as_deref(),
        abi: &vars.native_bridge_secondary_abi,
        native_bridge: true,
        native_bridge_host_arch_name: Some(host_arch_name),
        native_bridge_relative_path: vars.native_bridge_secondary_relative_path.as_deref(),
        ..TargetConfig::plain(OsType::Android, arch)
      })?;
    }
  }

  Ok(builder.targets)
}

/// Decode a fixed list of arch configs into android targets.
pub fn decode_android_arch_settings(
  configs: &[ArchConfig],
  defaults: &FeatureRegistry,
) -> Result<Vec<Target>, TargetError> {
  configs
    .iter()
    .map(|config| {
      let abi: Vec<String> = config.abi.iter().map(|a| a.to_string()).collect();
      let arch = decode_arch(
        OsType::Android,
        config.arch,
        Some(config.arch_variant),
        Some(config.cpu_variant),
        &abi,
        defaults,
      )?;
      Ok(Target {
        arch,
        ..Target::common(OsType::Android)
      })
    })
    .collect()
}
