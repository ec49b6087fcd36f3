use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};

use super::arch::{Arch, ArchType, Multilib};
use super::os::OsType;

/// The (OS, arch) pair a single module variant is built for.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Target {
  pub os: OsType,
  pub arch: Arch,
  /// Runs through a translation layer on a device of another arch
  pub native_bridge: bool,
  pub native_bridge_host_arch_name: String,
  pub native_bridge_relative_path: String,
  /// A host target that can't run on the machine performing the build
  pub host_cross: bool,
}

impl Target {
  /// The architecture independent target of `os`.
  pub fn common(os: OsType) -> Self {
    Self {
      os,
      arch: Arch::generic(ArchType::Common),
      native_bridge: false,
      native_bridge_host_arch_name: String::new(),
      native_bridge_relative_path: String::new(),
      host_cross: false,
    }
  }

  /// Name of the variation the OS mutator creates for this target
  pub fn os_variation(&self) -> String {
    self.os.as_str().to_string()
  }

  /// Name of the variation the arch mutator creates for this target
  pub fn arch_variation(&self) -> String {
    if self.native_bridge {
      format!("native_bridge_{}", self.arch)
    } else {
      self.arch.to_string()
    }
  }

  /// (mutator, variation) pairs identifying this target in the module graph
  pub fn variations(&self) -> [(&'static str, String); 2] {
    [("os", self.os_variation()), ("arch", self.arch_variation())]
  }

  pub fn multilib(&self) -> Option<Multilib> {
    self.arch.arch_type.multilib()
  }
}

impl fmt::Display for Target {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}_{}", self.os_variation(), self.arch_variation())
  }
}

/// Targets whose arch has the given multilib class, order preserved.
pub fn filter_multilib_targets(targets: &[Target], multilib: Multilib) -> Vec<Target> {
  targets
    .iter()
    .filter(|t| t.multilib() == Some(multilib))
    .cloned()
    .collect()
}

/// Drop every target whose host-cross flag differs from `host_cross`.
pub fn filter_host_cross(targets: Vec<Target>, host_cross: bool) -> Vec<Target> {
  targets.into_iter().filter(|t| t.host_cross == host_cross).collect()
}

/// One common target per OS appearing in `targets`, carrying that OS's first host-cross flag.
pub fn common_targets(targets: &[Target]) -> Vec<Target> {
  let mut seen = BTreeSet::new();
  let mut ret = Vec::new();
  for t in targets {
    if seen.insert(t.os) {
      let mut common = Target::common(t.os);
      common.host_cross = t.host_cross;
      ret.push(common);
    }
  }
  ret
}

/// At most one target per (OS, host-cross) pair, taking the first target that
/// matches the earliest filter.
pub fn first_target(targets: &[Target], filters: &[Multilib]) -> Vec<Target> {
  let mut seen = BTreeSet::new();
  let mut ret = Vec::new();
  for filter in filters {
    for t in filter_multilib_targets(targets, *filter) {
      if seen.insert((t.os, t.host_cross)) {
        ret.push(t);
      }
    }
  }
  ret
}

/// True if the arch declares at least one arm ABI
pub fn has_arm_abi(arch: &Arch) -> bool {
  arch.abi.iter().any(|abi| abi.starts_with("arm"))
}

/// True if `targets` has at least one arm android arch, native bridged or not
pub fn has_arm_android_arch(targets: &[Target]) -> bool {
  targets
    .iter()
    .any(|t| t.os == OsType::Android && matches!(t.arch.arch_type, ArchType::Arm | ArchType::Arm64))
}
