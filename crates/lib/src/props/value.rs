use std::collections::BTreeMap;

use serde_json::{Map, Value};

use super::PropertyError;
use super::shape::{PropertyKind, PropertyShape, TAG_REPLACE_INSTEAD_OF_APPEND, TAG_VARIANT_PREPEND};
use crate::configurable::{
  Configurable, ConfigurableContext, ConfigurableError, ConfigurableValue, configurable_from_json, configurable_to_json,
  json::is_select_syntax,
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PropertyValue {
  Bool(bool),
  String(String),
  StringList(Vec<String>),
  Struct(PropertyStruct),
  Configurable(Configurable),
}

impl PropertyValue {
  fn to_json(&self) -> Value {
    match self {
      Self::Bool(b) => Value::Bool(*b),
      Self::String(s) => Value::String(s.clone()),
      Self::StringList(items) => Value::Array(items.iter().cloned().map(Value::String).collect()),
      Self::Struct(s) => s.to_json(),
      Self::Configurable(c) => configurable_to_json(c),
    }
  }
}

/// How a source value combines with the destination value it is merged into
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExtendOrder {
  /// Lists and configurables concatenate after the destination; scalars replace.
  Append,
  /// Lists and configurables concatenate before the destination; set scalars are kept.
  Prepend,
  /// The source value replaces the destination.
  Replace,
}

/// A sparse instance of a [`PropertyShape`]. Absent fields are unset.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PropertyStruct {
  values: BTreeMap<String, PropertyValue>,
}

impl PropertyStruct {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn is_empty(&self) -> bool {
    self.values.is_empty()
  }

  pub fn set(&mut self, name: impl Into<String>, value: PropertyValue) -> &mut Self {
    self.values.insert(name.into(), value);
    self
  }

  pub fn with(mut self, name: impl Into<String>, value: PropertyValue) -> Self {
    self.set(name, value);
    self
  }

  pub fn get(&self, name: &str) -> Option<&PropertyValue> {
    self.values.get(name)
  }

  /// Look up a dotted path such as `sanitize.address`.
  pub fn get_path(&self, path: &str) -> Option<&PropertyValue> {
    let mut parts = path.split('.');
    let mut current = self.get(parts.next()?)?;
    for part in parts {
      match current {
        PropertyValue::Struct(s) => current = s.get(part)?,
        _ => return None,
      }
    }
    Some(current)
  }

  pub fn get_bool(&self, name: &str) -> Option<bool> {
    match self.get_path(name)? {
      PropertyValue::Bool(b) => Some(*b),
      _ => None,
    }
  }

  pub fn get_str(&self, name: &str) -> Option<&str> {
    match self.get_path(name)? {
      PropertyValue::String(s) => Some(s),
      _ => None,
    }
  }

  pub fn get_list(&self, name: &str) -> Option<&[String]> {
    match self.get_path(name)? {
      PropertyValue::StringList(items) => Some(items),
      _ => None,
    }
  }

  pub fn iter(&self) -> impl Iterator<Item = (&str, &PropertyValue)> {
    self.values.iter().map(|(k, v)| (k.as_str(), v))
  }

  /// Evaluate the configurable at `name`; plain values are returned as they are.
  pub fn evaluate(
    &self,
    name: &str,
    ctx: &dyn ConfigurableContext,
  ) -> Result<Option<ConfigurableValue>, ConfigurableError> {
    Ok(match self.get_path(name) {
      None | Some(PropertyValue::Struct(_)) => None,
      Some(PropertyValue::Bool(b)) => Some(ConfigurableValue::Bool(*b)),
      Some(PropertyValue::String(s)) => Some(ConfigurableValue::String(s.clone())),
      Some(PropertyValue::StringList(items)) => Some(ConfigurableValue::StringList(items.clone())),
      Some(PropertyValue::Configurable(c)) => c.evaluate(name, ctx)?,
    })
  }

  /// Merge every field of `src` that `shape` declares into `self`.
  ///
  /// Fields of `src` the shape doesn't declare are skipped. The order for each
  /// field comes from the tags of the destination field.
  pub fn extend_matching(&mut self, shape: &PropertyShape, src: &PropertyStruct) -> Result<(), PropertyError> {
    self.extend_matching_at(shape, src, "")
  }

  fn extend_matching_at(&mut self, shape: &PropertyShape, src: &PropertyStruct, prefix: &str) -> Result<(), PropertyError> {
    for (name, src_value) in &src.values {
      let Some(field) = shape.field(name) else {
        continue;
      };
      let path = if prefix.is_empty() {
        name.clone()
      } else {
        format!("{}.{}", prefix, name)
      };
      let order = if field.has_tag(TAG_REPLACE_INSTEAD_OF_APPEND) {
        ExtendOrder::Replace
      } else if field.has_tag(TAG_VARIANT_PREPEND) {
        ExtendOrder::Prepend
      } else {
        ExtendOrder::Append
      };

      let Some(dst_value) = self.values.get_mut(name) else {
        let mut value = src_value.clone();
        if let (PropertyKind::Struct(nested), PropertyValue::Struct(s)) = (&field.kind, src_value) {
          // Copy only the fields the destination shape knows about
          let mut filtered = PropertyStruct::new();
          filtered.extend_matching_at(nested, s, &path)?;
          if filtered.is_empty() {
            continue;
          }
          value = PropertyValue::Struct(filtered);
        }
        self.values.insert(name.clone(), value);
        continue;
      };

      match (&field.kind, dst_value, src_value) {
        (PropertyKind::Bool, PropertyValue::Bool(dst), PropertyValue::Bool(src)) => {
          if order != ExtendOrder::Prepend {
            *dst = *src;
          }
        }
        (PropertyKind::String, PropertyValue::String(dst), PropertyValue::String(src)) => {
          if order != ExtendOrder::Prepend {
            *dst = src.clone();
          }
        }
        (PropertyKind::StringList, PropertyValue::StringList(dst), PropertyValue::StringList(src)) => match order {
          ExtendOrder::Append => dst.extend(src.iter().cloned()),
          ExtendOrder::Prepend => {
            let mut merged = src.clone();
            merged.append(dst);
            *dst = merged;
          }
          ExtendOrder::Replace => *dst = src.clone(),
        },
        (PropertyKind::Struct(nested), PropertyValue::Struct(dst), PropertyValue::Struct(src)) => {
          dst.extend_matching_at(nested, src, &path)?;
        }
        (PropertyKind::Configurable(_), PropertyValue::Configurable(dst), PropertyValue::Configurable(src)) => {
          match order {
            ExtendOrder::Append => dst.append(src),
            ExtendOrder::Prepend => dst.prepend(src),
            ExtendOrder::Replace => *dst = src.clone(),
          }
        }
        (kind, _, _) => {
          return Err(PropertyError::KindMismatch {
            property: path,
            expected: kind.describe(),
          });
        }
      }
    }
    Ok(())
  }

  /// Decode a JSON object against `shape`.
  pub fn from_json(shape: &PropertyShape, value: &Value) -> Result<Self, PropertyError> {
    Self::from_json_at(shape, value, "")
  }

  /// Decode a JSON object against `shape`, reporting errors under `prefix`.
  pub(crate) fn from_json_at(shape: &PropertyShape, value: &Value, prefix: &str) -> Result<Self, PropertyError> {
    let obj = value.as_object().ok_or_else(|| PropertyError::TypeMismatch {
      property: prefix.to_string(),
      expected: "struct",
    })?;

    let mut out = PropertyStruct::new();
    for (name, raw) in obj {
      let path = if prefix.is_empty() {
        name.clone()
      } else {
        format!("{}.{}", prefix, name)
      };
      let field = shape
        .field(name)
        .ok_or_else(|| PropertyError::UnknownProperty(path.clone()))?;

      if raw.is_null() {
        continue;
      }
      if is_select_syntax(raw) && !matches!(field.kind, PropertyKind::Configurable(_)) {
        return Err(ConfigurableError::NonConfigurable(path).into());
      }

      let mismatch = || PropertyError::TypeMismatch {
        property: path.clone(),
        expected: field.kind.describe(),
      };
      let value = match &field.kind {
        PropertyKind::Bool => PropertyValue::Bool(raw.as_bool().ok_or_else(mismatch)?),
        PropertyKind::String => PropertyValue::String(raw.as_str().ok_or_else(mismatch)?.to_string()),
        PropertyKind::StringList => PropertyValue::StringList(
          raw
            .as_array()
            .ok_or_else(mismatch)?
            .iter()
            .map(|item| item.as_str().map(str::to_string).ok_or_else(mismatch))
            .collect::<Result<_, _>>()?,
        ),
        PropertyKind::Struct(nested) => {
          let nested = Self::from_json_at(nested, raw, &path)?;
          if nested.is_empty() {
            continue;
          }
          PropertyValue::Struct(nested)
        }
        PropertyKind::Configurable(value_type) => {
          PropertyValue::Configurable(configurable_from_json(&path, *value_type, raw)?)
        }
      };
      out.values.insert(name.clone(), value);
    }
    Ok(out)
  }

  pub fn to_json(&self) -> Value {
    Value::Object(
      self
        .values
        .iter()
        .map(|(k, v)| (k.clone(), v.to_json()))
        .collect::<Map<_, _>>(),
    )
  }
}

impl serde::Serialize for PropertyStruct {
  fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
    self.to_json().serialize(serializer)
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::configurable::{Condition, ConditionValue, ValueType};
  use crate::props::shape::{PropertyField, TAG_ARCH_VARIANT};
  use serde_json::json;

  fn shape() -> PropertyShape {
    PropertyShape::new(vec![
      PropertyField::new("cflags", PropertyKind::StringList).tagged(TAG_ARCH_VARIANT),
      PropertyField::new("include_dirs", PropertyKind::StringList)
        .tagged(TAG_ARCH_VARIANT)
        .tagged(TAG_VARIANT_PREPEND),
      PropertyField::new("stem", PropertyKind::String).tagged(TAG_ARCH_VARIANT),
      PropertyField::new("static", PropertyKind::Bool),
      PropertyField::new("linker", PropertyKind::StringList).tagged(TAG_REPLACE_INSTEAD_OF_APPEND),
      PropertyField::new(
        "sanitize",
        PropertyKind::Struct(PropertyShape::new(vec![
          PropertyField::new("address", PropertyKind::Bool).tagged(TAG_ARCH_VARIANT),
          PropertyField::new("misc", PropertyKind::StringList).tagged(TAG_ARCH_VARIANT),
        ])),
      )
      .tagged(TAG_ARCH_VARIANT),
      PropertyField::new("srcs", PropertyKind::Configurable(ValueType::StringList)).tagged(TAG_ARCH_VARIANT),
    ])
  }

  fn decode(value: Value) -> PropertyStruct {
    PropertyStruct::from_json(&shape(), &value).unwrap()
  }

  mod extend {
    use super::*;

    #[test]
    fn lists_append_and_prepend_by_tag() {
      let mut dst = decode(json!({"cflags": ["-a"], "include_dirs": ["generic"]}));
      let src = decode(json!({"cflags": ["-b"], "include_dirs": ["arm"]}));
      dst.extend_matching(&shape(), &src).unwrap();
      assert_eq!(dst.get_list("cflags").unwrap(), ["-a", "-b"]);
      assert_eq!(dst.get_list("include_dirs").unwrap(), ["arm", "generic"]);
    }

    #[test]
    fn scalars_replace() {
      let mut dst = decode(json!({"stem": "foo", "static": false}));
      let src = decode(json!({"stem": "foo_arm", "static": true}));
      dst.extend_matching(&shape(), &src).unwrap();
      assert_eq!(dst.get_str("stem"), Some("foo_arm"));
      assert_eq!(dst.get_bool("static"), Some(true));
    }

    #[test]
    fn replace_tag_replaces_lists() {
      let mut dst = decode(json!({"linker": ["ld"]}));
      dst.extend_matching(&shape(), &decode(json!({"linker": ["lld"]}))).unwrap();
      assert_eq!(dst.get_list("linker").unwrap(), ["lld"]);
    }

    #[test]
    fn nested_structs_merge_fieldwise() {
      let mut dst = decode(json!({"sanitize": {"misc": ["a"]}}));
      let src = decode(json!({"sanitize": {"address": true, "misc": ["b"]}}));
      dst.extend_matching(&shape(), &src).unwrap();
      assert_eq!(dst.get_bool("sanitize.address"), Some(true));
      assert_eq!(dst.get_list("sanitize.misc").unwrap(), ["a", "b"]);
    }

    #[test]
    fn fields_missing_from_destination_shape_are_skipped() {
      let narrow = PropertyShape::new(vec![PropertyField::new("cflags", PropertyKind::StringList)]);
      let mut dst = PropertyStruct::new();
      dst.extend_matching(&narrow, &decode(json!({"cflags": ["-x"], "stem": "s"}))).unwrap();
      assert_eq!(dst.get_list("cflags").unwrap(), ["-x"]);
      assert!(dst.get("stem").is_none());
    }

    #[test]
    fn mismatched_kinds_are_reported() {
      let mut dst = PropertyStruct::new().with("stem", PropertyValue::Bool(true));
      let err = dst.extend_matching(&shape(), &decode(json!({"stem": "x"}))).unwrap_err();
      assert!(matches!(err, PropertyError::KindMismatch { .. }));
    }

    #[test]
    fn configurables_concatenate() {
      struct Ctx;
      impl ConfigurableContext for Ctx {
        fn condition_value(&self, _: &Condition) -> Result<ConditionValue, ConfigurableError> {
          Ok(ConditionValue::Undefined)
        }
      }

      let mut dst = decode(json!({"srcs": ["a.cpp"]}));
      dst.extend_matching(&shape(), &decode(json!({"srcs": ["arm.cpp"]}))).unwrap();
      assert_eq!(
        dst.evaluate("srcs", &Ctx).unwrap(),
        Some(ConfigurableValue::StringList(vec!["a.cpp".to_string(), "arm.cpp".to_string()]))
      );
    }
  }

  mod json_decoding {
    use super::*;

    #[test]
    fn unknown_property() {
      let err = PropertyStruct::from_json(&shape(), &json!({"sanitize": {"thread": true}})).unwrap_err();
      assert_eq!(err, PropertyError::UnknownProperty("sanitize.thread".to_string()));
    }

    #[test]
    fn wrong_type() {
      let err = PropertyStruct::from_json(&shape(), &json!({"cflags": "-O2"})).unwrap_err();
      assert_eq!(
        err,
        PropertyError::TypeMismatch {
          property: "cflags".to_string(),
          expected: "string list"
        }
      );
    }

    #[test]
    fn select_on_plain_property() {
      let err = PropertyStruct::from_json(&shape(), &json!({"stem": {"select": {}}})).unwrap_err();
      assert_eq!(err.to_string(), "can't assign select statement to non-configurable property \"stem\"");
    }

    #[test]
    fn empty_structs_and_nulls_are_unset() {
      let value = decode(json!({"sanitize": {}, "stem": null}));
      assert!(value.is_empty());
    }

    #[test]
    fn encodes_back() {
      let raw = json!({"cflags": ["-a"], "sanitize": {"address": true}, "srcs": ["x.cpp"]});
      assert_eq!(decode(raw.clone()).to_json(), raw);
    }
  }
}
