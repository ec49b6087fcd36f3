use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::arch_list;
use super::os::OsType;
use super::registry::FeatureRegistry;

/// Whether an architecture produces 32-bit or 64-bit libraries
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Multilib {
  #[serde(rename = "lib32")]
  Lib32,
  #[serde(rename = "lib64")]
  Lib64,
}

impl Multilib {
  pub fn as_str(&self) -> &'static str {
    match self {
      Self::Lib32 => "lib32",
      Self::Lib64 => "lib64",
    }
  }

  /// Returns the property field name inside the `multilib` block
  pub fn field(&self) -> &'static str {
    match self {
      Self::Lib32 => "Lib32",
      Self::Lib64 => "Lib64",
    }
  }
}

impl fmt::Display for Multilib {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}", self.as_str())
  }
}

/// CPU instruction-set families, plus the architecture independent `common`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ArchType {
  #[serde(rename = "arm")]
  Arm,
  #[serde(rename = "arm64")]
  Arm64,
  #[serde(rename = "riscv64")]
  Riscv64,
  #[serde(rename = "x86")]
  X86,
  #[serde(rename = "x86_64")]
  X86_64,
  #[serde(rename = "common")]
  Common,
}

impl ArchType {
  /// Every real architecture, in registration order. `Common` is not included.
  pub const ALL: [ArchType; 5] = [Self::Arm, Self::Arm64, Self::Riscv64, Self::X86, Self::X86_64];

  /// Detect the CPU family of the build machine
  pub fn current() -> Option<Self> {
    match std::env::consts::ARCH {
      "x86_64" => Some(Self::X86_64),
      "x86" => Some(Self::X86),
      "aarch64" => Some(Self::Arm64),
      "arm" => Some(Self::Arm),
      "riscv64" => Some(Self::Riscv64),
      _ => None,
    }
  }

  pub fn from_name(name: &str) -> Option<Self> {
    Self::ALL.into_iter().find(|arch| arch.as_str() == name)
  }

  /// Returns the lowercase string identifier for this architecture
  pub fn as_str(&self) -> &'static str {
    match self {
      Self::Arm => "arm",
      Self::Arm64 => "arm64",
      Self::Riscv64 => "riscv64",
      Self::X86 => "x86",
      Self::X86_64 => "x86_64",
      Self::Common => "common",
    }
  }

  /// Returns the property field name, e.g. `Arm64`
  pub fn field(&self) -> &'static str {
    match self {
      Self::Arm => "Arm",
      Self::Arm64 => "Arm64",
      Self::Riscv64 => "Riscv64",
      Self::X86 => "X86",
      Self::X86_64 => "X86_64",
      Self::Common => "Common",
    }
  }

  /// `None` for `Common`
  pub fn multilib(&self) -> Option<Multilib> {
    match self {
      Self::Arm | Self::X86 => Some(Multilib::Lib32),
      Self::Arm64 | Self::Riscv64 | Self::X86_64 => Some(Multilib::Lib64),
      Self::Common => None,
    }
  }
}

impl fmt::Display for ArchType {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}", self.as_str())
  }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ArchError {
  #[error("unknown arch {0:?}")]
  UnknownArch(String),

  #[error("[{arch:?}] unknown arch variant {variant:?}, support variants: {supported:?}")]
  UnknownArchVariant {
    arch: String,
    variant: String,
    supported: Vec<&'static str>,
  },

  #[error("[{arch:?}] unknown cpu variant {variant:?}, support variants: {supported:?}")]
  UnknownCpuVariant {
    arch: String,
    variant: String,
    supported: Vec<&'static str>,
  },
}

/// The architecture a single module variant is compiled for.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Arch {
  pub arch_type: ArchType,
  /// Empty when the generic variant is used
  pub arch_variant: String,
  /// Empty when the generic cpu is used
  pub cpu_variant: String,
  pub abi: Vec<String>,
  pub arch_features: Vec<String>,
}

impl Arch {
  /// An architecture with no variant, cpu, ABI, or features
  pub fn generic(arch_type: ArchType) -> Self {
    Self {
      arch_type,
      arch_variant: String::new(),
      cpu_variant: String::new(),
      abi: Vec::new(),
      arch_features: Vec::new(),
    }
  }
}

impl fmt::Display for Arch {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}", self.arch_type)?;
    if !self.arch_variant.is_empty() {
      write!(f, "_{}", self.arch_variant)?;
    }
    if !self.cpu_variant.is_empty() {
      write!(f, "_{}", self.cpu_variant)?;
    }
    Ok(())
  }
}

/// Validate an architecture name and its variants and build an [`Arch`].
///
/// Variants equal to the arch name or `generic` normalize to the empty string.
/// Features are only resolved for android; an empty arch variant falls back to
/// the defaults registered in `defaults`.
pub fn decode_arch(
  os: OsType,
  arch: &str,
  arch_variant: Option<&str>,
  cpu_variant: Option<&str>,
  abi: &[String],
  defaults: &FeatureRegistry,
) -> Result<Arch, ArchError> {
  let arch_type = ArchType::from_name(arch).ok_or_else(|| ArchError::UnknownArch(arch.to_string()))?;

  let normalize = |variant: Option<&str>| -> String {
    match variant.unwrap_or_default() {
      v if v == arch_type.as_str() || v == "generic" => String::new(),
      v => v.to_string(),
    }
  };
  let arch_variant = normalize(arch_variant);
  let cpu_variant = normalize(cpu_variant);

  if !arch_variant.is_empty() {
    let supported = arch_list::arch_variants(arch_type);
    if !supported.contains(&arch_variant.as_str()) {
      return Err(ArchError::UnknownArchVariant {
        arch: arch_type.to_string(),
        variant: arch_variant,
        supported: supported.to_vec(),
      });
    }
  }

  if !cpu_variant.is_empty() {
    let supported = arch_list::cpu_variants(arch_type);
    if !supported.contains(&cpu_variant.as_str()) {
      return Err(ArchError::UnknownCpuVariant {
        arch: arch_type.to_string(),
        variant: cpu_variant,
        supported: supported.to_vec(),
      });
    }
  }

  let abi = abi.iter().filter(|a| !a.is_empty()).cloned().collect();

  let arch_features = if os == OsType::Android {
    if arch_variant.is_empty() {
      defaults.features(os, arch_type).to_vec()
    } else {
      arch_list::android_arch_features(arch_type, &arch_variant)
        .iter()
        .map(|f| f.to_string())
        .collect()
    }
  } else {
    Vec::new()
  };

  Ok(Arch {
    arch_type,
    arch_variant,
    cpu_variant,
    abi,
    arch_features,
  })
}
