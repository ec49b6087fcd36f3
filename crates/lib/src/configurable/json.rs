//! JSON form of configurable values.
//!
//! ```json
//! {"concat": [
//!   ["common.cpp"],
//!   {"select": {
//!     "conditions": [{"soong_config_variable": ["acme", "board"]}],
//!     "cases": [
//!       {"patterns": ["soc_a"], "value": ["soc_a.cpp"]},
//!       {"patterns": ["default"], "value": null}
//!     ]
//!   }}
//! ]}
//! ```
//!
//! `null` is `unset` and the pattern `"default"` matches anything.

use serde_json::{Map, Value, json};

use super::{
  Condition, Configurable, ConfigurableError, ConfigurablePart, ConfigurableValue, Select, SelectCase, SelectPattern,
  ValueType,
};

fn malformed(property: &str, message: impl Into<String>) -> ConfigurableError {
  ConfigurableError::Malformed {
    property: property.to_string(),
    message: message.into(),
  }
}

fn value_from_json(property: &str, value: &Value) -> Result<Option<ConfigurableValue>, ConfigurableError> {
  match value {
    Value::Null => Ok(None),
    Value::Bool(b) => Ok(Some(ConfigurableValue::Bool(*b))),
    Value::String(s) => Ok(Some(ConfigurableValue::String(s.clone()))),
    Value::Array(items) => items
      .iter()
      .map(|item| {
        item
          .as_str()
          .map(str::to_string)
          .ok_or_else(|| malformed(property, "list items must be strings"))
      })
      .collect::<Result<Vec<_>, _>>()
      .map(|items| Some(ConfigurableValue::StringList(items))),
    other => Err(malformed(property, format!("unsupported value {}", other))),
  }
}

fn pattern_from_json(property: &str, value: &Value) -> Result<SelectPattern, ConfigurableError> {
  match value {
    Value::String(s) if s == "default" => Ok(SelectPattern::Default),
    Value::String(s) => Ok(SelectPattern::String(s.clone())),
    Value::Bool(b) => Ok(SelectPattern::Bool(*b)),
    other => Err(malformed(property, format!("unsupported select pattern {}", other))),
  }
}

fn select_from_json(property: &str, body: &Map<String, Value>) -> Result<Select, ConfigurableError> {
  let conditions = body
    .get("conditions")
    .cloned()
    .ok_or_else(|| malformed(property, "select without conditions"))?;
  let conditions: Vec<Condition> =
    serde_json::from_value(conditions).map_err(|e| malformed(property, format!("bad condition: {}", e)))?;

  let cases = body
    .get("cases")
    .and_then(Value::as_array)
    .ok_or_else(|| malformed(property, "select without cases"))?;
  let cases = cases
    .iter()
    .map(|case| {
      let patterns = case
        .get("patterns")
        .and_then(Value::as_array)
        .ok_or_else(|| malformed(property, "select case without patterns"))?
        .iter()
        .map(|p| pattern_from_json(property, p))
        .collect::<Result<Vec<_>, _>>()?;
      let value = value_from_json(property, case.get("value").unwrap_or(&Value::Null))?;
      Ok(SelectCase { patterns, value })
    })
    .collect::<Result<Vec<_>, ConfigurableError>>()?;

  Ok(Select { conditions, cases })
}

fn parts_from_json(property: &str, value: &Value, parts: &mut Vec<ConfigurablePart>) -> Result<(), ConfigurableError> {
  if let Value::Object(obj) = value {
    if let Some(Value::Object(body)) = obj.get("select") {
      parts.push(ConfigurablePart::Select(select_from_json(property, body)?));
      return Ok(());
    }
    if let Some(Value::Array(items)) = obj.get("concat") {
      for item in items {
        parts_from_json(property, item, parts)?;
      }
      return Ok(());
    }
    return Err(malformed(property, "expected \"select\" or \"concat\""));
  }
  parts.push(ConfigurablePart::Literal(value_from_json(property, value)?));
  Ok(())
}

/// Decode a configurable property of type `value_type`.
///
/// Branch types are not checked here; they are checked on evaluation.
pub fn configurable_from_json(
  property: &str,
  value_type: ValueType,
  value: &Value,
) -> Result<Configurable, ConfigurableError> {
  let mut parts = Vec::new();
  parts_from_json(property, value, &mut parts)?;
  Ok(Configurable::from_parts(value_type, parts))
}

/// Whether a JSON value uses select or concat syntax.
pub(crate) fn is_select_syntax(value: &Value) -> bool {
  value
    .as_object()
    .is_some_and(|obj| obj.contains_key("select") || obj.contains_key("concat"))
}

fn value_to_json(value: &Option<ConfigurableValue>) -> Value {
  match value {
    None => Value::Null,
    Some(ConfigurableValue::Bool(b)) => Value::Bool(*b),
    Some(ConfigurableValue::String(s)) => Value::String(s.clone()),
    Some(ConfigurableValue::StringList(items)) => json!(items),
  }
}

fn part_to_json(part: &ConfigurablePart) -> Value {
  match part {
    ConfigurablePart::Literal(value) => value_to_json(value),
    ConfigurablePart::Select(select) => {
      let cases: Vec<Value> = select
        .cases
        .iter()
        .map(|case| {
          let patterns: Vec<Value> = case
            .patterns
            .iter()
            .map(|p| match p {
              SelectPattern::Default => json!("default"),
              SelectPattern::String(s) => json!(s),
              SelectPattern::Bool(b) => json!(b),
            })
            .collect();
          json!({"patterns": patterns, "value": value_to_json(&case.value)})
        })
        .collect();
      json!({"select": {"conditions": select.conditions, "cases": cases}})
    }
  }
}

/// Encode a configurable back into its JSON form.
pub fn configurable_to_json(configurable: &Configurable) -> Value {
  match configurable.parts() {
    [] => Value::Null,
    [only] => part_to_json(only),
    parts => json!({"concat": parts.iter().map(part_to_json).collect::<Vec<_>>()}),
  }
}
