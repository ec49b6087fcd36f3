//! Merging per-axis overrides into a variant's properties.
//!
//! Once a variant knows its OS (and later its target), every block of its
//! per-axis trees that applies is merged into the generic values, most
//! generic first. Field tags on the owner shape decide whether lists append
//! or prepend.

use thiserror::Error;
use tracing::trace;

use crate::arch_props::{ArchPropRoot, ShapeError};
use crate::config::Config;
use crate::module::Module;
use crate::platform::{Arch, ArchType, OsClass, OsType, Target, has_arm_abi, has_arm_android_arch};
use crate::props::{PropertyError, PropertyStruct};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MergeError {
  #[error("module {0:?} is not arch specific")]
  NotInitialized(String),

  #[error("module {module:?} has no compile {what} yet")]
  NotAssigned { module: String, what: &'static str },

  #[error("arch {arch:?} declares {count} feature blocks, too many to combine")]
  TooManyFeatures { arch: String, count: usize },

  #[error(transparent)]
  Shape(#[from] ShapeError),

  #[error(transparent)]
  Property(#[from] PropertyError),
}

impl MergeError {
  /// Whether the failure points at the engine rather than the declaration
  pub fn is_internal(&self) -> bool {
    !matches!(self, Self::Property(_))
  }
}

/// A block that applies to a variant, named the way a user writes it.
struct Applicable<'a> {
  name: String,
  block: &'a PropertyStruct,
}

/// `target.<name>` fields selected by an OS, in merge order.
fn os_target_fields(os: OsType, android64: bool) -> Vec<String> {
  let mut fields = Vec::new();
  if os.class() == OsClass::Host {
    fields.push("Host".to_string());
  }
  if os.linux() {
    fields.push("Linux".to_string());
    if os.class() == OsClass::Host {
      fields.push("Host_linux".to_string());
    }
  }
  if os.bionic() {
    fields.push("Bionic".to_string());
  }
  match os {
    OsType::LinuxGlibc => fields.push("Glibc".to_string()),
    OsType::LinuxMusl => fields.push("Musl".to_string()),
    _ => {}
  }
  fields.push(os.field().to_string());
  if os.class() == OsClass::Host && os != OsType::Windows {
    fields.push("Not_windows".to_string());
  }
  if os.class() == OsClass::Device {
    fields.push(if android64 { "Android64" } else { "Android32" }.to_string());
  }
  fields
}

fn user_target_name(field: &str) -> String {
  format!("target.{}", field.to_lowercase())
}

fn os_blocks<'a>(root: &'a ArchPropRoot, os: OsType, android64: bool) -> Result<Vec<Applicable<'a>>, ShapeError> {
  let mut blocks = Vec::new();
  for field in os_target_fields(os, android64) {
    let name = user_target_name(&field);
    if let Some(block) = root.target_block(&field, &name)? {
      blocks.push(Applicable { name, block });
    }
  }
  Ok(blocks)
}

fn push_target<'a>(blocks: &mut Vec<Applicable<'a>>, root: &'a ArchPropRoot, field: &str) -> Result<(), ShapeError> {
  let name = user_target_name(field);
  if let Some(block) = root.target_block(field, &name)? {
    blocks.push(Applicable { name, block });
  }
  Ok(())
}

fn arch_blocks<'a>(root: &'a ArchPropRoot, target: &Target, config: &Config) -> Result<Vec<Applicable<'a>>, ShapeError> {
  let mut blocks = Vec::new();
  let os = target.os;
  let arch: &Arch = &target.arch;
  let arch_type = arch.arch_type;

  if arch_type != ArchType::Common {
    if let Some(block) = root.arch_block(arch_type) {
      blocks.push(Applicable {
        name: format!("arch.{}", arch_type),
        block: &block.base,
      });

      let variant = &arch.arch_variant;
      if !variant.is_empty()
        && let Some(sub) = block.sub_block(arch_type, variant)?
      {
        blocks.push(Applicable {
          name: format!("arch.{}.{}", arch_type, variant),
          block: sub,
        });
      }

      let cpu = &arch.cpu_variant;
      if !cpu.is_empty()
        && cpu != variant
        && let Some(sub) = block.sub_block(arch_type, cpu)?
      {
        blocks.push(Applicable {
          name: format!("arch.{}.{}", arch_type, cpu),
          block: sub,
        });
      }

      for feature in &arch.arch_features {
        if let Some(sub) = block.sub_block(arch_type, feature)? {
          blocks.push(Applicable {
            name: format!("arch.{}.{}", arch_type, feature),
            block: sub,
          });
        }
      }
    }

    if let Some(multilib) = arch_type.multilib()
      && let Some(block) = root.multilib_block(multilib)
    {
      blocks.push(Applicable {
        name: format!("multilib.{}", multilib),
        block,
      });
    }

    if os.linux() {
      push_target(&mut blocks, root, &format!("Linux_{}", arch_type))?;
    }
    if os.bionic() {
      push_target(&mut blocks, root, &format!("Bionic_{}", arch_type))?;
    }
    push_target(&mut blocks, root, &format!("{}_{}", os.field(), arch_type))?;
    match os {
      OsType::LinuxGlibc => push_target(&mut blocks, root, &format!("Glibc_{}", arch_type))?,
      OsType::LinuxMusl => push_target(&mut blocks, root, &format!("Musl_{}", arch_type))?,
      _ => {}
    }
  }

  if os.class() == OsClass::Device {
    let arm_on_host = || has_arm_abi(arch) || has_arm_android_arch(config.os_targets(OsType::Android));
    if arch_type == ArchType::X86 && arm_on_host() {
      push_target(&mut blocks, root, "Arm_on_x86")?;
    }
    if arch_type == ArchType::X86_64 && arm_on_host() {
      push_target(&mut blocks, root, "Arm_on_x86_64")?;
    }
    if os == OsType::Android && target.native_bridge {
      push_target(&mut blocks, root, "Native_bridge")?;
    }
  }

  Ok(blocks)
}

/// Merge the per-axis blocks selected by `select` into every property set of
/// `module` that carries overrides.
fn apply_blocks<F>(module: &mut Module, mut select: F) -> Result<(), MergeError>
where
  F: for<'a> FnMut(&'a ArchPropRoot) -> Result<Vec<Applicable<'a>>, ShapeError>,
{
  if !module.arch_specific() {
    return Err(MergeError::NotInitialized(module.name().to_string()));
  }
  let name = module.name().to_string();
  for set in module.properties_mut() {
    let (shape, arch, values) = set.merge_parts();
    let Some(arch) = arch else {
      continue;
    };
    for root in arch.roots() {
      for applicable in select(root)? {
        trace!(module = %name, block = %applicable.name, "merging arch-variant block");
        values.extend_matching(shape, applicable.block)?;
      }
    }
  }
  Ok(())
}

/// Merge the OS-specific `target` blocks into a variant whose OS is set.
///
/// Blocks merge from most to least generic: `host`, `linux`, `host_linux`,
/// `bionic`, `glibc`, `musl`, the OS itself, `not_windows`, then
/// `android64` or `android32` for device variants.
pub fn apply_os_overrides(module: &mut Module, config: &Config) -> Result<(), MergeError> {
  let os = module.os().ok_or_else(|| MergeError::NotAssigned {
    module: module.name().to_string(),
    what: "os",
  })?;
  let android64 = config.android64();
  apply_blocks(module, |root| os_blocks(root, os, android64))
}

/// Merge the arch, multilib, and OS-and-arch blocks into a variant whose
/// target is set.
pub fn apply_arch_overrides(module: &mut Module, config: &Config) -> Result<(), MergeError> {
  let target = module.target().cloned().ok_or_else(|| MergeError::NotAssigned {
    module: module.name().to_string(),
    what: "target",
  })?;
  apply_blocks(module, |root| arch_blocks(root, &target, config))
}
