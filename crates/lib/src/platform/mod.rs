//! Architecture and OS metadata: the closed sets of [`ArchType`] and
//! [`OsType`], per-arch variant tables, and the [`Target`] a variant builds for.

pub mod arch;
pub mod arch_list;
pub mod os;
pub mod registry;
pub mod target;

pub use arch::{Arch, ArchError, ArchType, Multilib, decode_arch};
pub use os::{OsClass, OsType};
pub use registry::{FeatureRegistry, FeatureRegistryBuilder, RegistryError};
pub use target::{
  Target, common_targets, filter_host_cross, filter_multilib_targets, first_target, has_arm_abi, has_arm_android_arch,
};

/// Build machine identifier combining OS and arch (e.g., "linux_glibc_x86_64")
///
/// Returns `None` if the current platform is not supported
pub fn build_platform(musl: bool) -> Option<String> {
  let os = OsType::current_build_os(musl)?;
  let arch = ArchType::current()?;
  Some(format!("{}_{}", os, arch))
}
