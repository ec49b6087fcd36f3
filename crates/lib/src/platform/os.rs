use std::fmt;

use serde::{Deserialize, Serialize};

use super::arch::ArchType;

/// Whether an OS is built for the build machine, for the device, or for neither.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OsClass {
  /// Synthetic OS types such as `common_os` that never run anything.
  Generic,
  Device,
  Host,
}

impl OsClass {
  pub fn as_str(&self) -> &'static str {
    match self {
      Self::Generic => "generic",
      Self::Device => "device",
      Self::Host => "host",
    }
  }
}

impl fmt::Display for OsClass {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}", self.as_str())
  }
}

/// Operating systems a module can be built for.
///
/// Declaration order is registration order; `Ord` follows it so that ordered
/// maps keyed by `OsType` iterate the same way every run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OsType {
  LinuxGlibc,
  LinuxMusl,
  Darwin,
  LinuxBionic,
  Windows,
  Android,
  CommonOs,
}

impl OsType {
  pub const ALL: [OsType; 7] = [
    Self::LinuxGlibc,
    Self::LinuxMusl,
    Self::Darwin,
    Self::LinuxBionic,
    Self::Windows,
    Self::Android,
    Self::CommonOs,
  ];

  /// Detect the OS the build itself runs on.
  ///
  /// Linux hosts resolve to glibc unless `musl` is requested.
  pub fn current_build_os(musl: bool) -> Option<Self> {
    match std::env::consts::OS {
      "linux" if musl => Some(Self::LinuxMusl),
      "linux" => Some(Self::LinuxGlibc),
      "macos" => Some(Self::Darwin),
      _ => None,
    }
  }

  pub fn from_name(name: &str) -> Option<Self> {
    Self::ALL.into_iter().find(|os| os.as_str() == name)
  }

  /// Returns the lowercase identifier used for variation names and `target.<os>` blocks
  pub fn as_str(&self) -> &'static str {
    match self {
      Self::LinuxGlibc => "linux_glibc",
      Self::LinuxMusl => "linux_musl",
      Self::Darwin => "darwin",
      Self::LinuxBionic => "linux_bionic",
      Self::Windows => "windows",
      Self::Android => "android",
      Self::CommonOs => "common_os",
    }
  }

  /// Returns the property field name, e.g. `Linux_glibc`
  pub fn field(&self) -> &'static str {
    match self {
      Self::LinuxGlibc => "Linux_glibc",
      Self::LinuxMusl => "Linux_musl",
      Self::Darwin => "Darwin",
      Self::LinuxBionic => "Linux_bionic",
      Self::Windows => "Windows",
      Self::Android => "Android",
      Self::CommonOs => "Common_os",
    }
  }

  pub fn class(&self) -> OsClass {
    match self {
      Self::Android => OsClass::Device,
      Self::CommonOs => OsClass::Generic,
      _ => OsClass::Host,
    }
  }

  /// Modules built for a default-disabled OS must opt in with `enabled: true`.
  pub fn default_disabled(&self) -> bool {
    matches!(self, Self::Windows)
  }

  /// Architectures that can be paired with this OS in a `target.<os>_<arch>` block
  pub fn arch_types(&self) -> &'static [ArchType] {
    match self {
      Self::LinuxGlibc => &[ArchType::X86, ArchType::X86_64],
      Self::LinuxMusl => &[ArchType::X86, ArchType::X86_64, ArchType::Arm64, ArchType::Arm],
      Self::Darwin => &[ArchType::Arm64, ArchType::X86_64],
      Self::LinuxBionic => &[ArchType::Arm64, ArchType::X86_64],
      Self::Windows => &[ArchType::X86, ArchType::X86_64],
      Self::Android => &[ArchType::Arm, ArchType::Arm64, ArchType::Riscv64, ArchType::X86, ArchType::X86_64],
      Self::CommonOs => &[],
    }
  }

  /// True for every OS that runs a Linux kernel
  pub fn linux(&self) -> bool {
    matches!(self, Self::Android | Self::LinuxGlibc | Self::LinuxBionic | Self::LinuxMusl)
  }

  /// True for every OS that uses Bionic as its libc
  pub fn bionic(&self) -> bool {
    matches!(self, Self::Android | Self::LinuxBionic)
  }
}

impl fmt::Display for OsType {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}", self.as_str())
  }
}
