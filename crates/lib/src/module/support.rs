use std::fmt;

use serde::{Deserialize, Serialize};

use crate::platform::{OsClass, Target};

bitflags::bitflags! {
  /// Which OS classes a module type can be built for, and which it builds by default.
  #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
  pub struct HostOrDeviceSupported: u8 {
    const HOST           = 1 << 0;
    const HOST_CROSS     = 1 << 1;
    const DEVICE         = 1 << 2;
    /// Host variants are built unless `host_supported: false`
    const HOST_DEFAULT   = 1 << 3;
    /// Device variants are built unless `device_supported: false`
    const DEVICE_DEFAULT = 1 << 4;

    const HOST_SUPPORTED = Self::HOST.bits() | Self::HOST_CROSS.bits() | Self::HOST_DEFAULT.bits();
    const HOST_SUPPORTED_NO_CROSS = Self::HOST.bits() | Self::HOST_DEFAULT.bits();
    const DEVICE_SUPPORTED = Self::DEVICE.bits() | Self::DEVICE_DEFAULT.bits();
    /// Device by default; host must be opted into with `host_supported: true`
    const HOST_AND_DEVICE_SUPPORTED =
      Self::HOST.bits() | Self::HOST_CROSS.bits() | Self::DEVICE.bits() | Self::DEVICE_DEFAULT.bits();
    const HOST_AND_DEVICE_DEFAULT = Self::HOST_AND_DEVICE_SUPPORTED.bits() | Self::HOST_DEFAULT.bits();
  }
}

impl HostOrDeviceSupported {
  pub const NEITHER: Self = Self::empty();

  const PRESETS: [(&'static str, Self); 6] = [
    ("host", Self::HOST_SUPPORTED),
    ("host_no_cross", Self::HOST_SUPPORTED_NO_CROSS),
    ("device", Self::DEVICE_SUPPORTED),
    ("host_and_device", Self::HOST_AND_DEVICE_SUPPORTED),
    ("host_and_device_default", Self::HOST_AND_DEVICE_DEFAULT),
    ("neither", Self::NEITHER),
  ];

  pub fn from_preset(name: &str) -> Option<Self> {
    Self::PRESETS.iter().find(|(n, _)| *n == name).map(|(_, v)| *v)
  }

  pub fn preset_name(&self) -> Option<&'static str> {
    Self::PRESETS.iter().find(|(_, v)| v == self).map(|(n, _)| *n)
  }

  /// Host support after applying the `host_supported` override
  pub fn host(&self, host_supported: Option<bool>) -> bool {
    self.contains(Self::HOST) && host_supported.unwrap_or(self.contains(Self::HOST_DEFAULT))
  }

  pub fn host_cross(&self, host_supported: Option<bool>) -> bool {
    self.contains(Self::HOST_CROSS) && host_supported.unwrap_or(self.contains(Self::HOST_DEFAULT))
  }

  /// Device support after applying the `device_supported` override
  pub fn device(&self, device_supported: Option<bool>) -> bool {
    self.contains(Self::DEVICE) && device_supported.unwrap_or(self.contains(Self::DEVICE_DEFAULT))
  }

  /// Whether a module with these flags builds for `target`.
  pub fn supports_target(&self, target: &Target, host_supported: Option<bool>, device_supported: Option<bool>) -> bool {
    match target.os.class() {
      OsClass::Host if target.host_cross => self.host_cross(host_supported),
      OsClass::Host => self.host(host_supported),
      OsClass::Device => self.device(device_supported),
      OsClass::Generic => false,
    }
  }
}

impl Default for HostOrDeviceSupported {
  fn default() -> Self {
    Self::DEVICE_SUPPORTED
  }
}

impl Serialize for HostOrDeviceSupported {
  fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
    match self.preset_name() {
      Some(name) => serializer.serialize_str(name),
      None => serializer.serialize_u8(self.bits()),
    }
  }
}

impl<'de> Deserialize<'de> for HostOrDeviceSupported {
  fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
    let name = String::deserialize(deserializer)?;
    Self::from_preset(&name).ok_or_else(|| serde::de::Error::custom(format!("unknown support preset {:?}", name)))
  }
}

/// The image partition a module variant installs into.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ImageVariation {
  #[default]
  Core,
  Vendor,
  Product,
  Ramdisk,
  VendorRamdisk,
  DebugRamdisk,
  Recovery,
}

impl ImageVariation {
  pub fn as_str(&self) -> &'static str {
    match self {
      Self::Core => "core",
      Self::Vendor => "vendor",
      Self::Product => "product",
      Self::Ramdisk => "ramdisk",
      Self::VendorRamdisk => "vendor_ramdisk",
      Self::DebugRamdisk => "debug_ramdisk",
      Self::Recovery => "recovery",
    }
  }

  /// Partitions that only ever hold the primary device arch
  pub fn installs_single_primary_arch(&self) -> bool {
    matches!(self, Self::Ramdisk | Self::VendorRamdisk | Self::DebugRamdisk | Self::Recovery)
  }
}

impl fmt::Display for ImageVariation {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}", self.as_str())
  }
}
