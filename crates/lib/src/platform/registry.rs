//! Init-phase registry of the arch features available to the default arch
//! variant of each (OS, arch) pair.
//!
//! Toolchain definitions register their defaults through a
//! [`FeatureRegistryBuilder`] while the process starts up. Installing the
//! builder freezes the process-wide registry; any later install fails.

use std::collections::BTreeMap;
use std::sync::OnceLock;

use thiserror::Error;

use super::arch::ArchType;
use super::arch_list;
use super::os::OsType;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
  #[error("Invalid feature {feature:?} for arch {arch:?} variant \"\"")]
  InvalidFeature { arch: String, feature: String },

  #[error("default features for {os}/{arch} registered twice")]
  Duplicate { os: OsType, arch: ArchType },

  #[error("the feature registry is frozen; registration must happen during initialization")]
  Frozen,
}

static GLOBAL: OnceLock<FeatureRegistry> = OnceLock::new();

/// Immutable default-feature table.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FeatureRegistry {
  defaults: BTreeMap<(OsType, ArchType), Vec<String>>,
}

impl FeatureRegistry {
  pub fn builder() -> FeatureRegistryBuilder {
    FeatureRegistryBuilder::default()
  }

  /// The installed process-wide registry, or an empty one when nothing was installed.
  ///
  /// Reading freezes the registry, so no installation can follow a read.
  pub fn global() -> &'static FeatureRegistry {
    GLOBAL.get_or_init(FeatureRegistry::default)
  }

  pub fn is_frozen() -> bool {
    GLOBAL.get().is_some()
  }

  pub fn features(&self, os: OsType, arch: ArchType) -> &[String] {
    self.defaults.get(&(os, arch)).map(Vec::as_slice).unwrap_or(&[])
  }

  pub fn is_empty(&self) -> bool {
    self.defaults.is_empty()
  }
}

#[derive(Debug, Default)]
pub struct FeatureRegistryBuilder {
  defaults: BTreeMap<(OsType, ArchType), Vec<String>>,
}

impl FeatureRegistryBuilder {
  /// Register the features of the default arch variant of `arch` on `os`.
  pub fn register(&mut self, os: OsType, arch: ArchType, features: &[&str]) -> Result<&mut Self, RegistryError> {
    if let Some(bad) = features.iter().find(|f| !arch_list::arch_features(arch).contains(f)) {
      return Err(RegistryError::InvalidFeature {
        arch: arch.to_string(),
        feature: bad.to_string(),
      });
    }
    if self.defaults.contains_key(&(os, arch)) {
      return Err(RegistryError::Duplicate { os, arch });
    }
    self
      .defaults
      .insert((os, arch), features.iter().map(|f| f.to_string()).collect());
    Ok(self)
  }

  /// Build a standalone registry without touching the process-wide one.
  pub fn build(self) -> FeatureRegistry {
    FeatureRegistry {
      defaults: self.defaults,
    }
  }

  /// Install as the process-wide registry, ending the initialization phase.
  pub fn install(self) -> Result<&'static FeatureRegistry, RegistryError> {
    let registry = self.build();
    GLOBAL.set(registry).map_err(|_| RegistryError::Frozen)?;
    tracing::debug!("feature registry installed");
    Ok(FeatureRegistry::global())
  }
}
