//! Modules and their variants.
//!
//! A [`Module`] is both the declaration read from a build description and,
//! after the variant splitters run, one materialized variant of it. Splitting
//! clones the module and annotates each clone with the OS and target it is
//! built for.

pub mod decl;
pub mod properties;
pub mod support;

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

use crate::arch_props::{ShapeError, axis_layout};
use crate::config::{Config, ConfigVariable};
use crate::configurable::{Condition, ConditionValue, ConfigurableContext, ConfigurableError, ConfigurableValue};
use crate::platform::{Arch, ArchType, OsType, Target};
use crate::props::{PropertyError, PropertyShape};

pub use decl::{ModuleDecl, ModuleFile, load_modules, parse_modules};
pub use properties::{
  PROP_COMPILE_MULTILIB, PROP_DEVICE_SUPPORTED, PROP_ENABLED, PROP_HOST_SUPPORTED, PropertySet, common_shape,
};
pub use support::{HostOrDeviceSupported, ImageVariation};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ModuleError {
  #[error(transparent)]
  Property(#[from] PropertyError),

  #[error(transparent)]
  Shape(#[from] ShapeError),

  #[error("module {0:?} already has property shape {1}")]
  DuplicateShape(String, String),

  #[error("unknown property shape {0:?}")]
  UnknownShape(String),

  #[error("module {module:?}: {source}")]
  Declaration { module: String, source: Box<ModuleError> },

  #[error("failed to parse module declarations: {0}")]
  Parse(String),

  #[error("failed to read {path}: {message}")]
  Read { path: String, message: String },
}

/// How the variant splitters treat a module.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModuleKind {
  /// A regular module, split per its declared support
  #[default]
  Soong,
  /// A build tool module, always built for the build machine
  Bootstrap,
  /// Neither; never split
  Foreign,
}

/// What the splitters recorded on a variant.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct VariantState {
  pub compile_os: Option<OsType>,
  pub compile_target: Option<Target>,
  /// Extra targets a single variant produces outputs for
  pub compile_multi_targets: Vec<Target>,
  pub compile_primary: bool,
  pub common_os_variant: bool,
  pub skip_install: bool,
  /// Set when no variant could be produced
  pub disabled: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Module {
  name: String,
  kind: ModuleKind,
  arch_specific: bool,
  supported: HostOrDeviceSupported,
  default_multilib: String,
  use_target_variants: bool,
  create_common_os_variant: bool,
  native_bridge_supported: bool,
  image: ImageVariation,
  deps: Vec<String>,
  properties: Vec<PropertySet>,
  state: VariantState,
}

impl Module {
  /// A module that is not architecture specific.
  pub fn new(name: impl Into<String>) -> Self {
    Self {
      name: name.into(),
      kind: ModuleKind::Soong,
      arch_specific: false,
      supported: HostOrDeviceSupported::NEITHER,
      default_multilib: String::new(),
      use_target_variants: false,
      create_common_os_variant: false,
      native_bridge_supported: false,
      image: ImageVariation::Core,
      deps: Vec::new(),
      properties: Vec::new(),
      state: VariantState::default(),
    }
  }

  pub fn bootstrap(name: impl Into<String>) -> Self {
    Self {
      kind: ModuleKind::Bootstrap,
      ..Self::new(name)
    }
  }

  pub fn foreign(name: impl Into<String>) -> Self {
    Self {
      kind: ModuleKind::Foreign,
      ..Self::new(name)
    }
  }

  /// An architecture-specific module with the common property set attached.
  pub fn new_arch(
    name: impl Into<String>,
    supported: HostOrDeviceSupported,
    default_multilib: impl Into<String>,
  ) -> Result<Self, ModuleError> {
    let mut module = Self {
      arch_specific: true,
      supported,
      default_multilib: default_multilib.into(),
      use_target_variants: true,
      ..Self::new(name)
    };
    module.add_properties(common_shape())?;
    Ok(module)
  }

  /// Attach a property set for `shape`. Arch-specific modules also get
  /// per-axis overrides for its arch-variant fields.
  pub fn add_properties(&mut self, shape: Arc<PropertyShape>) -> Result<&mut PropertySet, ModuleError> {
    if self.properties.iter().any(|p| *p.shape() == *shape) {
      let id = shape.id().map_err(|e| ShapeError::Identity(e.to_string()))?;
      return Err(ModuleError::DuplicateShape(self.name.clone(), id.to_string()));
    }
    let mut set = PropertySet::new(shape);
    if self.arch_specific {
      set.init_arch()?;
    }
    self.properties.push(set);
    let last = self.properties.len() - 1;
    Ok(&mut self.properties[last])
  }

  pub fn with_deps<S: Into<String>>(mut self, deps: impl IntoIterator<Item = S>) -> Self {
    self.deps.extend(deps.into_iter().map(Into::into));
    self
  }

  pub fn set_create_common_os_variant(&mut self, value: bool) -> &mut Self {
    self.create_common_os_variant = value;
    self
  }

  pub fn set_native_bridge_supported(&mut self, value: bool) -> &mut Self {
    self.native_bridge_supported = value;
    self
  }

  pub fn set_use_target_variants(&mut self, value: bool) -> &mut Self {
    self.use_target_variants = value;
    self
  }

  pub fn set_image(&mut self, image: ImageVariation) -> &mut Self {
    self.image = image;
    self
  }

  /// Decode a declaration object, routing each property to the set whose
  /// shape declares it.
  pub fn decode_properties(&mut self, declaration: &Map<String, Value>) -> Result<(), ModuleError> {
    let mut routed = vec![Map::new(); self.properties.len()];

    for (key, value) in declaration {
      if properties::is_block_key(key) {
        self.route_block(key, value, &mut routed)?;
        continue;
      }
      let index = self
        .properties
        .iter()
        .position(|p| p.shape().field(key).is_some())
        .ok_or_else(|| PropertyError::UnknownProperty(key.clone()))?;
      routed[index].insert(key.clone(), value.clone());
    }

    for (set, declaration) in self.properties.iter_mut().zip(routed) {
      set.decode(&declaration)?;
    }
    Ok(())
  }

  fn route_block(&self, block: &str, value: &Value, routed: &mut [Map<String, Value>]) -> Result<(), ModuleError> {
    let entries = as_object(value, block)?;
    for (name, raw) in entries {
      let path = format!("{}.{}", block, name);
      let arch_type = if block == "arch" {
        Some(
          ArchType::from_name(name)
            .filter(|a| *a != ArchType::Common)
            .ok_or_else(|| PropertyError::UnknownProperty(path.clone()))?,
        )
      } else {
        None
      };

      for (key, value) in as_object(raw, &path)? {
        let sub_field = arch_type.and_then(|a| axis_layout().arch_sub_field_for_key(a, key));
        if sub_field.is_some() {
          let sub_path = format!("{}.{}", path, key);
          for (leaf, leaf_value) in as_object(value, &sub_path)? {
            let index = self.block_owner(leaf, &sub_path)?;
            insert_nested(&mut routed[index], &[block, name, key], leaf, leaf_value);
          }
        } else {
          let index = self.block_owner(key, &path)?;
          insert_nested(&mut routed[index], &[block, name], key, value);
        }
      }
    }
    Ok(())
  }

  fn block_owner(&self, field: &str, path: &str) -> Result<usize, ModuleError> {
    self
      .properties
      .iter()
      .position(|p| {
        p.arch()
          .is_some_and(|a| a.shards().iter().any(|s| s.shape.field(field).is_some()))
      })
      .ok_or_else(|| PropertyError::UnknownProperty(format!("{}.{}", path, field)).into())
  }

  pub fn name(&self) -> &str {
    &self.name
  }

  pub fn kind(&self) -> ModuleKind {
    self.kind
  }

  /// Whether the module was initialized for arch-awareness
  pub fn arch_specific(&self) -> bool {
    self.arch_specific
  }

  pub fn supported(&self) -> HostOrDeviceSupported {
    self.supported
  }

  pub fn default_multilib(&self) -> &str {
    &self.default_multilib
  }

  pub fn use_target_variants(&self) -> bool {
    self.use_target_variants
  }

  pub fn create_common_os_variant(&self) -> bool {
    self.create_common_os_variant
  }

  pub fn native_bridge_supported(&self) -> bool {
    self.native_bridge_supported
  }

  pub fn image(&self) -> ImageVariation {
    self.image
  }

  pub fn deps(&self) -> &[String] {
    &self.deps
  }

  pub fn properties(&self) -> &[PropertySet] {
    &self.properties
  }

  pub(crate) fn properties_mut(&mut self) -> &mut [PropertySet] {
    &mut self.properties
  }

  /// The set declared with `shape`, compared structurally
  pub fn property_set(&self, shape: &PropertyShape) -> Option<&PropertySet> {
    self.properties.iter().find(|p| p.shape() == shape)
  }

  /// The `enabled`/`compile_multilib` set of an arch-specific module
  pub fn common_properties(&self) -> Option<&PropertySet> {
    self.property_set(&common_shape())
  }

  pub fn host_supported(&self) -> Option<bool> {
    self.common_properties()?.values().get_bool(PROP_HOST_SUPPORTED)
  }

  pub fn device_supported(&self) -> Option<bool> {
    self.common_properties()?.values().get_bool(PROP_DEVICE_SUPPORTED)
  }

  pub fn supports_target(&self, target: &Target) -> bool {
    self
      .supported
      .supports_target(target, self.host_supported(), self.device_supported())
  }

  pub fn state(&self) -> &VariantState {
    &self.state
  }

  pub(crate) fn state_mut(&mut self) -> &mut VariantState {
    &mut self.state
  }

  pub fn os(&self) -> Option<OsType> {
    self.state.compile_os
  }

  pub fn target(&self) -> Option<&Target> {
    self.state.compile_target.as_ref()
  }

  pub fn arch(&self) -> Option<&Arch> {
    self.target().map(|t| &t.arch)
  }

  pub fn disable(&mut self) {
    self.state.disabled = true;
  }

  /// Whether this variant is built.
  ///
  /// A variant without an `enabled` value is built unless its OS is
  /// disabled by default.
  pub fn enabled(&self, config: &Config) -> Result<bool, ConfigurableError> {
    if self.state.disabled {
      return Ok(false);
    }
    let declared = match self.common_properties() {
      Some(common) => common.values().evaluate(PROP_ENABLED, &self.context(config))?,
      None => None,
    };
    Ok(match declared {
      Some(ConfigurableValue::Bool(enabled)) => enabled,
      _ => !self.os().is_some_and(|os| os.default_disabled()),
    })
  }

  /// Evaluation context for configurable properties of this variant
  pub fn context<'a>(&'a self, config: &'a Config) -> VariantContext<'a> {
    VariantContext { module: self, config }
  }
}

impl fmt::Display for Module {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}", self.name)
  }
}

/// Answers `select` conditions for one variant.
pub struct VariantContext<'a> {
  module: &'a Module,
  config: &'a Config,
}

impl ConfigurableContext for VariantContext<'_> {
  fn condition_value(&self, condition: &Condition) -> Result<ConditionValue, ConfigurableError> {
    match condition {
      Condition::SoongConfigVariable(namespace, name) => Ok(match self.config.config_variable(namespace, name) {
        Some(ConfigVariable::Bool(b)) => ConditionValue::Bool(*b),
        Some(ConfigVariable::String(s)) => ConditionValue::String(s.clone()),
        None => ConditionValue::Undefined,
      }),
      Condition::Arch => self
        .module
        .arch()
        .map(|a| ConditionValue::String(a.arch_type.to_string()))
        .ok_or_else(|| ConfigurableError::NotReady(condition.to_string())),
      Condition::Os => self
        .module
        .os()
        .map(|os| ConditionValue::String(os.to_string()))
        .ok_or_else(|| ConfigurableError::NotReady(condition.to_string())),
    }
  }
}

fn as_object<'a>(value: &'a Value, path: &str) -> Result<&'a Map<String, Value>, PropertyError> {
  value.as_object().ok_or_else(|| PropertyError::TypeMismatch {
    property: path.to_string(),
    expected: "struct",
  })
}

fn insert_nested(root: &mut Map<String, Value>, path: &[&str], key: &str, value: &Value) {
  let mut current = root;
  for segment in path {
    let entry = current
      .entry(segment.to_string())
      .or_insert_with(|| Value::Object(Map::new()));
    if !entry.is_object() {
      *entry = Value::Object(Map::new());
    }
    let Value::Object(next) = entry else {
      return;
    };
    current = next;
  }
  current.insert(key.to_string(), value.clone());
}
