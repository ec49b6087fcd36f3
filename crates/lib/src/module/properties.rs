use std::sync::{Arc, LazyLock};

use serde_json::{Map, Value};

use super::ModuleError;
use crate::arch_props::{ArchProperties, arch_prop_shards};
use crate::configurable::ValueType;
use crate::props::{PropertyField, PropertyKind, PropertyShape, PropertyStruct, TAG_ARCH_VARIANT};

pub const PROP_ENABLED: &str = "enabled";
pub const PROP_COMPILE_MULTILIB: &str = "compile_multilib";
pub const PROP_HOST_SUPPORTED: &str = "host_supported";
pub const PROP_DEVICE_SUPPORTED: &str = "device_supported";

static COMMON_SHAPE: LazyLock<Arc<PropertyShape>> = LazyLock::new(|| {
  Arc::new(PropertyShape::new(vec![
    PropertyField::new(PROP_ENABLED, PropertyKind::Configurable(ValueType::Bool)).tagged(TAG_ARCH_VARIANT),
    PropertyField::new(PROP_COMPILE_MULTILIB, PropertyKind::String).tagged(TAG_ARCH_VARIANT),
    PropertyField::new(PROP_HOST_SUPPORTED, PropertyKind::Bool),
    PropertyField::new(PROP_DEVICE_SUPPORTED, PropertyKind::Bool),
  ]))
});

/// Properties every arch-specific module carries.
pub fn common_shape() -> Arc<PropertyShape> {
  Arc::clone(&COMMON_SHAPE)
}

/// The values a module declared for one property shape, plus its per-axis
/// overrides when the module is arch-aware.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PropertySet {
  shape: Arc<PropertyShape>,
  values: PropertyStruct,
  arch: Option<ArchProperties>,
}

impl PropertySet {
  pub fn new(shape: Arc<PropertyShape>) -> Self {
    Self {
      shape,
      values: PropertyStruct::new(),
      arch: None,
    }
  }

  pub fn with_values(mut self, values: PropertyStruct) -> Self {
    self.values = values;
    self
  }

  /// Attach empty per-axis overrides. A shape without arch-variant fields
  /// gets none.
  pub(crate) fn init_arch(&mut self) -> Result<(), ModuleError> {
    let shards = arch_prop_shards(&self.shape)?;
    self.arch = (!shards.is_empty()).then(|| ArchProperties::new(shards));
    Ok(())
  }

  pub fn shape(&self) -> &PropertyShape {
    &self.shape
  }

  pub fn shape_arc(&self) -> &Arc<PropertyShape> {
    &self.shape
  }

  pub fn values(&self) -> &PropertyStruct {
    &self.values
  }

  pub fn values_mut(&mut self) -> &mut PropertyStruct {
    &mut self.values
  }

  pub fn arch(&self) -> Option<&ArchProperties> {
    self.arch.as_ref()
  }

  pub fn arch_mut(&mut self) -> Option<&mut ArchProperties> {
    self.arch.as_mut()
  }

  /// Borrow the shape and overrides while the values are merged into.
  pub(crate) fn merge_parts(&mut self) -> (&PropertyShape, Option<&ArchProperties>, &mut PropertyStruct) {
    (&self.shape, self.arch.as_ref(), &mut self.values)
  }

  /// Decode this set's part of a declaration: plain fields into the values
  /// and `arch`/`multilib`/`target` blocks into the per-axis overrides.
  pub(crate) fn decode(&mut self, declaration: &Map<String, Value>) -> Result<(), ModuleError> {
    let plain: Map<String, Value> = declaration
      .iter()
      .filter(|(k, _)| !is_block_key(k))
      .map(|(k, v)| (k.clone(), v.clone()))
      .collect();
    self.values = PropertyStruct::from_json(&self.shape, &Value::Object(plain))?;

    if let Some(arch) = self.arch.as_mut() {
      arch.decode_blocks(declaration)?;
    }
    Ok(())
  }
}

pub(crate) fn is_block_key(key: &str) -> bool {
  matches!(key, "arch" | "multilib" | "target")
}
