//! Sparse per-axis override trees.
//!
//! A module holds one [`ArchPropRoot`] per shard of each arch-variant
//! property set it declares. Blocks stay absent until the declaration sets
//! them, so an unused axis costs nothing.

use std::collections::BTreeMap;
use std::sync::Arc;

use serde_json::{Map, Value};

use super::ShapeError;
use super::layout::{axis_layout, variant_field};
use super::shape::ArchPropShard;
use crate::platform::{ArchType, Multilib};
use crate::props::{PropertyError, PropertyStruct};

/// The `arch.<type>` block: inline overrides plus variant, cpu variant, and
/// feature sub-blocks keyed by field name.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ArchBlock {
  pub base: PropertyStruct,
  pub variants: BTreeMap<String, PropertyStruct>,
}

impl ArchBlock {
  pub fn is_empty(&self) -> bool {
    self.base.is_empty() && self.variants.values().all(PropertyStruct::is_empty)
  }

  /// The sub-block for a variant or feature name such as `armv7-a-neon`.
  pub fn sub_block(&self, arch: ArchType, name: &str) -> Result<Option<&PropertyStruct>, ShapeError> {
    let field = variant_field(name);
    if !axis_layout().arch_sub_fields(arch).contains(&field) {
      return Err(ShapeError::FieldDoesNotExist(format!("arch.{}.{}", arch, name)));
    }
    Ok(self.variants.get(&field).filter(|s| !s.is_empty()))
  }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ArchPropRoot {
  arch: BTreeMap<ArchType, ArchBlock>,
  multilib: BTreeMap<Multilib, PropertyStruct>,
  target: BTreeMap<String, PropertyStruct>,
}

impl ArchPropRoot {
  pub fn is_empty(&self) -> bool {
    self.arch.values().all(ArchBlock::is_empty)
      && self.multilib.values().all(PropertyStruct::is_empty)
      && self.target.values().all(PropertyStruct::is_empty)
  }

  /// The `arch.<type>` block, `None` when unset. `Common` never has one.
  pub fn arch_block(&self, arch: ArchType) -> Option<&ArchBlock> {
    self.arch.get(&arch).filter(|b| !b.is_empty())
  }

  pub fn multilib_block(&self, multilib: Multilib) -> Option<&PropertyStruct> {
    self.multilib.get(&multilib).filter(|s| !s.is_empty())
  }

  /// The `target.<name>` block stored under `field`, e.g. `Linux_glibc_x86`.
  ///
  /// `user_field` names the block in the error when the field is not part of
  /// the layout.
  pub fn target_block(&self, field: &str, user_field: &str) -> Result<Option<&PropertyStruct>, ShapeError> {
    if !axis_layout().has_target_field(field) {
      return Err(ShapeError::FieldDoesNotExist(user_field.to_string()));
    }
    Ok(self.target.get(field).filter(|s| !s.is_empty()))
  }

  pub fn set_arch_block(&mut self, arch: ArchType, block: ArchBlock) -> &mut Self {
    self.arch.insert(arch, block);
    self
  }

  pub fn set_multilib_block(&mut self, multilib: Multilib, block: PropertyStruct) -> &mut Self {
    self.multilib.insert(multilib, block);
    self
  }

  pub fn set_target_block(&mut self, field: &str, block: PropertyStruct) -> Result<&mut Self, ShapeError> {
    if !axis_layout().has_target_field(field) {
      return Err(ShapeError::FieldDoesNotExist(field.to_string()));
    }
    self.target.insert(field.to_string(), block);
    Ok(self)
  }
}

/// Every per-axis override of one property set, one root per shard.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchProperties {
  shards: Arc<[ArchPropShard]>,
  roots: Vec<ArchPropRoot>,
}

impl ArchProperties {
  pub fn new(shards: Arc<[ArchPropShard]>) -> Self {
    let roots = vec![ArchPropRoot::default(); shards.len()];
    Self { shards, roots }
  }

  pub fn shards(&self) -> &[ArchPropShard] {
    &self.shards
  }

  pub fn roots(&self) -> &[ArchPropRoot] {
    &self.roots
  }

  pub fn roots_mut(&mut self) -> &mut [ArchPropRoot] {
    &mut self.roots
  }

  /// Decode the `arch`, `multilib`, and `target` blocks of a declaration.
  ///
  /// Keys are matched case-insensitively against the layout, so `target:
  /// {linux_glibc_x86: ...}` fills the `Linux_glibc_x86` block.
  pub fn decode_blocks(&mut self, declaration: &Map<String, Value>) -> Result<(), PropertyError> {
    let layout = axis_layout();

    if let Some(arch) = declaration.get("arch") {
      for (name, raw) in as_object(arch, "arch")? {
        let path = format!("arch.{}", name);
        let arch_type = ArchType::from_name(name)
          .filter(|a| *a != ArchType::Common)
          .ok_or_else(|| PropertyError::UnknownProperty(path.clone()))?;

        let mut inline = Map::new();
        let mut subs: Vec<(String, Vec<PropertyStruct>)> = Vec::new();
        for (key, value) in as_object(raw, &path)? {
          match layout.arch_sub_field_for_key(arch_type, key) {
            Some(field) => subs.push((field.to_string(), self.decode_block(value, &format!("{}.{}", path, key))?)),
            None => {
              inline.insert(key.clone(), value.clone());
            }
          }
        }
        let base = self.decode_block(&Value::Object(inline), &path)?;

        for (index, root) in self.roots.iter_mut().enumerate() {
          let mut block = ArchBlock {
            base: base[index].clone(),
            variants: BTreeMap::new(),
          };
          for (field, parts) in &subs {
            if !parts[index].is_empty() {
              block.variants.insert(field.clone(), parts[index].clone());
            }
          }
          if !block.is_empty() {
            root.set_arch_block(arch_type, block);
          }
        }
      }
    }

    if let Some(multilib) = declaration.get("multilib") {
      for (name, raw) in as_object(multilib, "multilib")? {
        let path = format!("multilib.{}", name);
        let class = match name.as_str() {
          "lib32" => Multilib::Lib32,
          "lib64" => Multilib::Lib64,
          _ => return Err(PropertyError::UnknownProperty(path)),
        };
        let parts = self.decode_block(raw, &path)?;
        for (root, part) in self.roots.iter_mut().zip(parts) {
          if !part.is_empty() {
            root.set_multilib_block(class, part);
          }
        }
      }
    }

    if let Some(target) = declaration.get("target") {
      for (name, raw) in as_object(target, "target")? {
        let path = format!("target.{}", name);
        let field = layout
          .target_field_for_key(name)
          .ok_or_else(|| PropertyError::UnknownProperty(path.clone()))?;
        let parts = self.decode_block(raw, &path)?;
        for (root, part) in self.roots.iter_mut().zip(parts) {
          if !part.is_empty() {
            root.target.insert(field.to_string(), part);
          }
        }
      }
    }

    Ok(())
  }

  /// Split a block across the shards that declare its fields.
  fn decode_block(&self, value: &Value, path: &str) -> Result<Vec<PropertyStruct>, PropertyError> {
    let mut parts = vec![Map::new(); self.shards.len()];
    for (key, raw) in as_object(value, path)? {
      let index = self
        .shards
        .iter()
        .position(|s| s.shape.field(key).is_some())
        .ok_or_else(|| PropertyError::UnknownProperty(format!("{}.{}", path, key)))?;
      parts[index].insert(key.clone(), raw.clone());
    }
    self
      .shards
      .iter()
      .zip(parts)
      .map(|(shard, part)| PropertyStruct::from_json_at(&shard.shape, &Value::Object(part), path))
      .collect()
  }
}

fn as_object<'a>(value: &'a Value, path: &str) -> Result<&'a Map<String, Value>, PropertyError> {
  value.as_object().ok_or_else(|| PropertyError::TypeMismatch {
    property: path.to_string(),
    expected: "struct",
  })
}
