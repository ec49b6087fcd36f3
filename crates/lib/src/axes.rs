//! Per-axis snapshots of a module's properties.
//!
//! [`resolve_configuration_axes`] reads a module's per-axis trees without
//! touching its variant state and returns, for every axis value, the blocks
//! that apply to that value merged into a fresh struct. Tools that translate
//! modules into another build system's `select()` dictionaries consume the
//! axis value names verbatim, so their format is stable:
//!
//! | axis      | value names                                  |
//! |-----------|----------------------------------------------|
//! | `""`      | `""` (the generic values)                    |
//! | `arch`    | `x86`, `x86-sse4`, `x86-avx-sse4`, ...       |
//! | `os`      | `android`, `linux_glibc`, ...                |
//! | `os_arch` | `android_arm64`, `linux_glibc_x86_64`, ...   |

use std::collections::BTreeMap;
use std::fmt;

use serde::Serialize;

use crate::arch_props::{ArchPropRoot, ShapeError};
use crate::merge::MergeError;
use crate::module::Module;
use crate::platform::{ArchType, OsClass, OsType, arch_list};
use crate::props::{PropertyShape, PropertyStruct};

/// Feature sets larger than this are refused rather than expanded
pub const MAX_POWER_SET_FEATURES: usize = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub enum ConfigurationAxis {
  #[serde(rename = "")]
  NoConfig,
  #[serde(rename = "arch")]
  Arch,
  #[serde(rename = "os")]
  Os,
  #[serde(rename = "os_arch")]
  OsArch,
}

impl ConfigurationAxis {
  pub fn as_str(&self) -> &'static str {
    match self {
      Self::NoConfig => "",
      Self::Arch => "arch",
      Self::Os => "os",
      Self::OsArch => "os_arch",
    }
  }
}

impl fmt::Display for ConfigurationAxis {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}", self.as_str())
  }
}

/// Axis value name to merged properties
pub type AxisValues = BTreeMap<String, PropertyStruct>;

/// Collects the blocks for one axis value and merges them into `shape`.
struct Merger<'a> {
  shape: &'a PropertyShape,
  roots: &'a [&'a ArchPropRoot],
  blocks: Vec<&'a PropertyStruct>,
}

impl<'a> Merger<'a> {
  fn new(shape: &'a PropertyShape, roots: &'a [&'a ArchPropRoot]) -> Self {
    Self {
      shape,
      roots,
      blocks: Vec::new(),
    }
  }

  /// Add the `target.<field>` block of every root.
  fn target(&mut self, field: &str) -> Result<&mut Self, ShapeError> {
    let user = format!("target.{}", field.to_lowercase());
    for root in self.roots {
      if let Some(block) = root.target_block(field, &user)? {
        self.blocks.push(block);
      }
    }
    Ok(self)
  }

  fn merge(&self) -> Result<PropertyStruct, MergeError> {
    let mut merged = PropertyStruct::new();
    for block in &self.blocks {
      merged.extend_matching(self.shape, block)?;
    }
    Ok(merged)
  }
}

/// Every non-empty subset of `items`, each in the order of `items`.
fn power_set_without_empty<T: Clone>(items: &[T]) -> Vec<Vec<T>> {
  (1usize..(1 << items.len()))
    .map(|mask| {
      items
        .iter()
        .enumerate()
        .filter(|(i, _)| (mask >> i) & 1 == 1)
        .map(|(_, item)| item.clone())
        .collect()
    })
    .collect()
}

fn arch_axis(shape: &PropertyShape, roots: &[&ArchPropRoot]) -> Result<AxisValues, MergeError> {
  let mut values = AxisValues::new();
  for arch_type in ArchType::ALL {
    let mut base = Merger::new(shape, roots);
    let mut features: BTreeMap<&'static str, Vec<&PropertyStruct>> = BTreeMap::new();
    for root in roots {
      if let Some(block) = root.arch_block(arch_type) {
        base.blocks.push(&block.base);
        for feature in arch_list::arch_features(arch_type) {
          if let Some(sub) = block.sub_block(arch_type, feature)? {
            features.entry(*feature).or_default().push(sub);
          }
        }
      }
      if let Some(multilib) = arch_type.multilib()
        && let Some(block) = root.multilib_block(multilib)
      {
        base.blocks.push(block);
      }
    }
    values.insert(arch_type.to_string(), base.merge()?);

    if features.len() > MAX_POWER_SET_FEATURES {
      return Err(MergeError::TooManyFeatures {
        arch: arch_type.to_string(),
        count: features.len(),
      });
    }
    // BTreeMap keys are sorted, so every subset is too
    let present: Vec<&'static str> = features.keys().copied().collect();
    for subset in power_set_without_empty(&present) {
      let mut combined = Merger::new(shape, roots);
      combined.blocks.extend(base.blocks.iter().copied());
      for feature in &subset {
        combined.blocks.extend(features[feature].iter().copied());
      }
      values.insert(format!("{}-{}", arch_type, subset.join("-")), combined.merge()?);
    }
  }
  Ok(values)
}

fn os_axes(shape: &PropertyShape, roots: &[&ArchPropRoot]) -> Result<(AxisValues, AxisValues), MergeError> {
  let mut os_values = AxisValues::new();
  let mut os_arch_values = AxisValues::new();

  for os in OsType::ALL.into_iter().filter(|os| *os != OsType::CommonOs) {
    let host = os.class() == OsClass::Host;
    let mut merger = Merger::new(shape, roots);
    if host {
      merger.target("Host")?;
    }
    if os.linux() {
      merger.target("Linux")?;
    }
    if os.bionic() {
      merger.target("Bionic")?;
    }
    if os.linux() && host {
      merger.target("Host_linux")?;
    }
    match os {
      OsType::LinuxMusl => {
        merger.target("Musl")?;
      }
      OsType::LinuxGlibc => {
        merger.target("Glibc")?;
      }
      _ => {}
    }
    merger.target(os.field())?;
    if host && os != OsType::Windows {
      merger.target("Not_windows")?;
    }
    os_values.insert(os.to_string(), merger.merge()?);

    for arch_type in os.arch_types() {
      let mut merger = Merger::new(shape, roots);
      if os.linux() {
        merger.target(&format!("Linux_{}", arch_type))?;
      }
      if os.bionic() {
        merger.target(&format!("Bionic_{}", arch_type))?;
      }
      match os {
        OsType::LinuxMusl => {
          merger.target(&format!("Musl_{}", arch_type))?;
        }
        OsType::LinuxGlibc => {
          merger.target(&format!("Glibc_{}", arch_type))?;
        }
        _ => {}
      }
      merger.target(&format!("{}_{}", os.field(), arch_type))?;
      os_arch_values.insert(format!("{}_{}", os, arch_type), merger.merge()?);
    }
  }
  Ok((os_values, os_arch_values))
}

/// Merged values of `shape` per configuration axis value.
///
/// Only the property set declared with `shape` is read. Modules that are not
/// arch specific, or that never declared `shape`, have no axes at all. Every
/// axis value is present even when nothing applies to it.
pub fn resolve_configuration_axes(
  module: &Module,
  shape: &PropertyShape,
) -> Result<BTreeMap<ConfigurationAxis, AxisValues>, MergeError> {
  let mut axes = BTreeMap::new();
  if !module.arch_specific() {
    return Ok(axes);
  }
  let Some(set) = module.property_set(shape) else {
    return Ok(axes);
  };

  axes.insert(
    ConfigurationAxis::NoConfig,
    AxisValues::from([(String::new(), set.values().clone())]),
  );

  let roots: Vec<&ArchPropRoot> = set.arch().map(|arch| arch.roots().iter().collect()).unwrap_or_default();

  axes.insert(ConfigurationAxis::Arch, arch_axis(shape, &roots)?);
  let (os_values, os_arch_values) = os_axes(shape, &roots)?;
  axes.insert(ConfigurationAxis::Os, os_values);
  axes.insert(ConfigurationAxis::OsArch, os_arch_values);
  Ok(axes)
}
