use serde::{Deserialize, Serialize};

use crate::configurable::ValueType;
use crate::util::hash::{ShapeId, StructuralHash};

/// The field may be overridden per arch, multilib, or target.
pub const TAG_ARCH_VARIANT: &str = "arch_variant";
/// Variant-specific values are placed before the generic ones.
pub const TAG_VARIANT_PREPEND: &str = "variant_prepend";
/// The field holds source paths.
pub const TAG_PATH: &str = "path";
/// Merging replaces the value instead of concatenating.
pub const TAG_REPLACE_INSTEAD_OF_APPEND: &str = "replace_instead_of_append";

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PropertyKind {
  Bool,
  String,
  StringList,
  Struct(PropertyShape),
  Configurable(ValueType),
}

impl PropertyKind {
  pub fn describe(&self) -> &'static str {
    match self {
      Self::Bool => "bool",
      Self::String => "string",
      Self::StringList => "string list",
      Self::Struct(_) => "struct",
      Self::Configurable(_) => "configurable",
    }
  }

  /// Cost of the kind in a synthesized descriptor name
  pub(crate) fn name_cost(&self) -> usize {
    match self {
      Self::Bool => 5,
      Self::String => 7,
      Self::StringList => 9,
      Self::Configurable(_) => 20,
      Self::Struct(shape) => 8 + shape.name_cost(),
    }
  }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PropertyField {
  pub name: String,
  pub kind: PropertyKind,
  #[serde(default, skip_serializing_if = "Vec::is_empty")]
  pub tags: Vec<String>,
}

impl PropertyField {
  pub fn new(name: impl Into<String>, kind: PropertyKind) -> Self {
    Self {
      name: name.into(),
      kind,
      tags: Vec::new(),
    }
  }

  pub fn tagged(mut self, tag: &str) -> Self {
    self.tags.push(tag.to_string());
    self
  }

  pub fn has_tag(&self, tag: &str) -> bool {
    self.tags.iter().any(|t| t == tag)
  }
}

/// The declared shape of a property struct.
///
/// Two shapes with the same fields, kinds, and tags are the same shape no
/// matter where they were declared.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PropertyShape {
  pub fields: Vec<PropertyField>,
}

impl PropertyShape {
  pub fn new(fields: Vec<PropertyField>) -> Self {
    Self { fields }
  }

  pub fn field(&self, name: &str) -> Option<&PropertyField> {
    self.fields.iter().find(|f| f.name == name)
  }

  pub fn is_empty(&self) -> bool {
    self.fields.is_empty()
  }

  /// Structural identity used to key caches of derived shapes.
  pub fn id(&self) -> Result<ShapeId, serde_json::Error> {
    self.structural_id()
  }

  pub(crate) fn name_cost(&self) -> usize {
    self.fields.iter().map(|f| f.name.len() + f.kind.name_cost()).sum()
  }
}

impl StructuralHash for PropertyShape {}
