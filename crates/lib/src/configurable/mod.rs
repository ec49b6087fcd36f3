//! Configurable property values.
//!
//! A configurable value is a concatenation of parts. Each part is either a
//! literal or a `select` over one or more conditions. Evaluation is deferred
//! until the owning variant and the build configuration are known, then
//! memoized.

pub(crate) mod json;

use std::fmt;
use std::sync::OnceLock;

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use json::{configurable_from_json, configurable_to_json};

/// The dynamic type of a configurable value
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValueType {
  Bool,
  String,
  StringList,
}

impl ValueType {
  pub fn as_str(&self) -> &'static str {
    match self {
      Self::Bool => "bool",
      Self::String => "string",
      Self::StringList => "string_list",
    }
  }
}

impl fmt::Display for ValueType {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}", self.as_str())
  }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ConfigurableValue {
  Bool(bool),
  String(String),
  StringList(Vec<String>),
}

impl ConfigurableValue {
  pub fn value_type(&self) -> ValueType {
    match self {
      Self::Bool(_) => ValueType::Bool,
      Self::String(_) => ValueType::String,
      Self::StringList(_) => ValueType::StringList,
    }
  }

  /// Concatenate `other` after `self`. Booleans combine with OR.
  fn append(self, other: Self) -> Result<Self, ConfigurableError> {
    match (self, other) {
      (Self::Bool(a), Self::Bool(b)) => Ok(Self::Bool(a || b)),
      (Self::String(a), Self::String(b)) => Ok(Self::String(a + &b)),
      (Self::StringList(mut a), Self::StringList(b)) => {
        a.extend(b);
        Ok(Self::StringList(a))
      }
      (a, b) => Err(ConfigurableError::DifferingTypes {
        first: a.value_type(),
        second: b.value_type(),
      }),
    }
  }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Condition {
  /// A variable from the per-build configuration store
  SoongConfigVariable(String, String),
  /// The arch type of the evaluating variant
  Arch,
  /// The OS of the evaluating variant
  Os,
}

impl fmt::Display for Condition {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      Self::SoongConfigVariable(namespace, name) => write!(f, "soong_config_variable({:?}, {:?})", namespace, name),
      Self::Arch => write!(f, "arch()"),
      Self::Os => write!(f, "os()"),
    }
  }
}

/// The value a condition evaluated to
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConditionValue {
  Undefined,
  String(String),
  Bool(bool),
}

impl fmt::Display for ConditionValue {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      Self::Undefined => write!(f, "undefined"),
      Self::String(s) => write!(f, "{:?}", s),
      Self::Bool(b) => write!(f, "{}", b),
    }
  }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SelectPattern {
  /// Matches any value, including an undefined one
  Default,
  String(String),
  Bool(bool),
}

impl SelectPattern {
  fn matches(&self, value: &ConditionValue) -> bool {
    match (self, value) {
      (Self::Default, _) => true,
      (Self::String(p), ConditionValue::String(v)) => p == v,
      (Self::Bool(p), ConditionValue::Bool(v)) => p == v,
      _ => false,
    }
  }

  fn type_name(&self) -> Option<&'static str> {
    match self {
      Self::Default => None,
      Self::String(_) => Some("string"),
      Self::Bool(_) => Some("bool"),
    }
  }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectCase {
  /// One pattern per condition of the select
  pub patterns: Vec<SelectPattern>,
  /// `None` is the explicit `unset` marker
  pub value: Option<ConfigurableValue>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Select {
  pub conditions: Vec<Condition>,
  pub cases: Vec<SelectCase>,
}

impl Select {
  fn describe_conditions(&self) -> String {
    match self.conditions.as_slice() {
      [only] => only.to_string(),
      many => format!("({})", many.iter().map(|c| c.to_string()).collect::<Vec<_>>().join(", ")),
    }
  }

  fn check_types(&self, property: &str, expected: ValueType) -> Result<(), ConfigurableError> {
    let mut seen: Option<ValueType> = None;
    for value in self.cases.iter().filter_map(|c| c.value.as_ref()) {
      let found = value.value_type();
      match seen {
        Some(first) if first != found => {
          return Err(ConfigurableError::DifferingTypes { first, second: found });
        }
        _ => seen = Some(found),
      }
    }
    match seen {
      Some(found) if found != expected => Err(ConfigurableError::CantAssign {
        found,
        expected,
        property: property.to_string(),
      }),
      _ => Ok(()),
    }
  }

  fn evaluate(
    &self,
    property: &str,
    ctx: &dyn ConfigurableContext,
  ) -> Result<Option<ConfigurableValue>, ConfigurableError> {
    let values = self
      .conditions
      .iter()
      .map(|c| ctx.condition_value(c))
      .collect::<Result<Vec<_>, _>>()?;

    for case in &self.cases {
      if case.patterns.len() != values.len() {
        return Err(ConfigurableError::PatternCount {
          conditions: values.len(),
          patterns: case.patterns.len(),
        });
      }
      for ((pattern, value), condition) in case.patterns.iter().zip(&values).zip(&self.conditions) {
        let expected = match value {
          ConditionValue::Bool(_) => "bool",
          ConditionValue::String(_) => "string",
          ConditionValue::Undefined => continue,
        };
        if let Some(found) = pattern.type_name()
          && found != expected
        {
          return Err(ConfigurableError::PatternType {
            condition: condition.to_string(),
            expected,
            found,
          });
        }
      }
    }

    self
      .cases
      .iter()
      .find(|case| case.patterns.iter().zip(&values).all(|(p, v)| p.matches(v)))
      .map(|case| case.value.clone())
      .ok_or_else(|| ConfigurableError::NotHandled {
        property: property.to_string(),
        condition: self.describe_conditions(),
        value: match values.as_slice() {
          [only] => only.to_string(),
          many => format!("({})", many.iter().map(|v| v.to_string()).collect::<Vec<_>>().join(", ")),
        },
      })
  }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigurablePart {
  /// A plain value; `None` is `unset`
  Literal(Option<ConfigurableValue>),
  Select(Select),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigurableError {
  #[error("{property}: {condition} had value {value}, which was not handled by the select statement")]
  NotHandled {
    property: String,
    condition: String,
    value: String,
  },

  #[error("Found select statement with differing types \"{first}\" and \"{second}\" in its cases")]
  DifferingTypes { first: ValueType, second: ValueType },

  #[error("can't assign {found} value to {expected} property {property:?}")]
  CantAssign {
    found: ValueType,
    expected: ValueType,
    property: String,
  },

  #[error("Expected all branches of a select on condition {condition} to have type {expected}, found {found}")]
  PatternType {
    condition: String,
    expected: &'static str,
    found: &'static str,
  },

  #[error("select has {conditions} conditions but a case has {patterns} patterns")]
  PatternCount { conditions: usize, patterns: usize },

  #[error("can't assign select statement to non-configurable property {0:?}")]
  NonConfigurable(String),

  #[error("{0} can't be evaluated before the variant is known")]
  NotReady(String),

  #[error("malformed configurable value for {property:?}: {message}")]
  Malformed { property: String, message: String },
}

/// Supplies condition values when a configurable is evaluated.
pub trait ConfigurableContext {
  /// Evaluate a single condition for the variant being resolved.
  fn condition_value(&self, condition: &Condition) -> Result<ConditionValue, ConfigurableError>;
}

type Memo = OnceLock<Result<Option<ConfigurableValue>, ConfigurableError>>;

/// A lazily evaluated property value.
#[derive(Debug)]
pub struct Configurable {
  value_type: ValueType,
  parts: Vec<ConfigurablePart>,
  memo: Memo,
}

impl Configurable {
  /// An unset value of type `value_type`
  pub fn new(value_type: ValueType) -> Self {
    Self {
      value_type,
      parts: Vec::new(),
      memo: OnceLock::new(),
    }
  }

  pub fn literal(value: ConfigurableValue) -> Self {
    let mut c = Self::new(value.value_type());
    c.parts.push(ConfigurablePart::Literal(Some(value)));
    c
  }

  pub fn select(value_type: ValueType, select: Select) -> Self {
    let mut c = Self::new(value_type);
    c.parts.push(ConfigurablePart::Select(select));
    c
  }

  pub fn from_parts(value_type: ValueType, parts: Vec<ConfigurablePart>) -> Self {
    Self {
      value_type,
      parts,
      memo: OnceLock::new(),
    }
  }

  pub fn value_type(&self) -> ValueType {
    self.value_type
  }

  pub fn parts(&self) -> &[ConfigurablePart] {
    &self.parts
  }

  pub fn is_empty(&self) -> bool {
    self.parts.is_empty()
  }

  /// `self + other`
  pub fn append(&mut self, other: &Configurable) {
    self.parts.extend(other.parts.iter().cloned());
    self.memo = OnceLock::new();
  }

  /// `other + self`
  pub fn prepend(&mut self, other: &Configurable) {
    let mut parts = other.parts.clone();
    parts.append(&mut self.parts);
    self.parts = parts;
    self.memo = OnceLock::new();
  }

  /// Resolve to a concrete value, or `None` when every part is unset.
  ///
  /// The first result is cached and later calls return it whatever `ctx`
  /// they pass, so a value must only be evaluated for one variant. Splitting
  /// clones the module, and clones, `append` and `prepend` start with an
  /// empty memo; a caller evaluating one value under several contexts has to
  /// clone it first. [`ConfigurableError::NotReady`] is not cached, so a
  /// value asked for before its variant has a target can still resolve once
  /// it does.
  pub fn evaluate(
    &self,
    property: &str,
    ctx: &dyn ConfigurableContext,
  ) -> Result<Option<ConfigurableValue>, ConfigurableError> {
    if let Some(cached) = self.memo.get() {
      return cached.clone();
    }
    let result = self.evaluate_uncached(property, ctx);
    if matches!(result, Err(ConfigurableError::NotReady(_))) {
      return result;
    }
    self.memo.get_or_init(|| result).clone()
  }

  fn evaluate_uncached(
    &self,
    property: &str,
    ctx: &dyn ConfigurableContext,
  ) -> Result<Option<ConfigurableValue>, ConfigurableError> {
    let mut result: Option<ConfigurableValue> = None;
    for part in &self.parts {
      let value = match part {
        ConfigurablePart::Literal(value) => value.clone(),
        ConfigurablePart::Select(select) => {
          select.check_types(property, self.value_type)?;
          select.evaluate(property, ctx)?
        }
      };
      if let Some(found) = value.as_ref().map(ConfigurableValue::value_type)
        && found != self.value_type
      {
        return Err(ConfigurableError::CantAssign {
          found,
          expected: self.value_type,
          property: property.to_string(),
        });
      }
      result = match (result, value) {
        (None, v) => v,
        (r, None) => r,
        (Some(a), Some(b)) => Some(a.append(b)?),
      };
    }
    tracing::trace!(property, "evaluated configurable");
    Ok(result)
  }
}

impl Clone for Configurable {
  /// Clones start with an empty memo so each variant evaluates its own copy.
  fn clone(&self) -> Self {
    Self::from_parts(self.value_type, self.parts.clone())
  }
}

impl PartialEq for Configurable {
  fn eq(&self, other: &Self) -> bool {
    self.value_type == other.value_type && self.parts == other.parts
  }
}

impl Eq for Configurable {}

#[cfg(test)]
mod tests {
  use super::*;
  use std::cell::Cell;
  use std::collections::HashMap;

  #[derive(Default)]
  struct TestContext {
    vars: HashMap<(String, String), ConditionValue>,
    arch: Option<String>,
    lookups: Cell<usize>,
  }

  impl TestContext {
    fn with_var(mut self, ns: &str, name: &str, value: ConditionValue) -> Self {
      self.vars.insert((ns.to_string(), name.to_string()), value);
      self
    }
  }

  impl ConfigurableContext for TestContext {
    fn condition_value(&self, condition: &Condition) -> Result<ConditionValue, ConfigurableError> {
      self.lookups.set(self.lookups.get() + 1);
      match condition {
        Condition::SoongConfigVariable(ns, name) => Ok(
          self
            .vars
            .get(&(ns.clone(), name.clone()))
            .cloned()
            .unwrap_or(ConditionValue::Undefined),
        ),
        Condition::Arch => self
          .arch
          .clone()
          .map(ConditionValue::String)
          .ok_or_else(|| ConfigurableError::NotReady(condition.to_string())),
        Condition::Os => Ok(ConditionValue::String("android".to_string())),
      }
    }
  }

  fn var(name: &str) -> Condition {
    Condition::SoongConfigVariable("ns".to_string(), name.to_string())
  }

  fn s(v: &str) -> SelectPattern {
    SelectPattern::String(v.to_string())
  }

  fn list(items: &[&str]) -> Option<ConfigurableValue> {
    Some(ConfigurableValue::StringList(items.iter().map(|s| s.to_string()).collect()))
  }

  fn string(v: &str) -> Option<ConfigurableValue> {
    Some(ConfigurableValue::String(v.to_string()))
  }

  fn select_a_x_default_y() -> Configurable {
    Configurable::select(
      ValueType::StringList,
      Select {
        conditions: vec![var("cond")],
        cases: vec![
          SelectCase {
            patterns: vec![s("a")],
            value: list(&["x"]),
          },
          SelectCase {
            patterns: vec![SelectPattern::Default],
            value: list(&["y"]),
          },
        ],
      },
    )
  }

  fn string_select(name: &str, hit: &str, value: Option<ConfigurableValue>, default: Option<ConfigurableValue>) -> Select {
    Select {
      conditions: vec![var(name)],
      cases: vec![
        SelectCase {
          patterns: vec![s(hit)],
          value,
        },
        SelectCase {
          patterns: vec![SelectPattern::Default],
          value: default,
        },
      ],
    }
  }

  mod concatenation {
    use super::*;

    #[test]
    fn select_then_literal() {
      let ctx = TestContext::default().with_var("ns", "cond", ConditionValue::String("b".to_string()));
      let mut value = select_a_x_default_y();
      value.append(&Configurable::literal(ConfigurableValue::StringList(vec!["z".to_string()])));
      assert_eq!(value.evaluate("srcs", &ctx).unwrap(), list(&["y", "z"]));
    }

    #[test]
    fn literal_then_select() {
      let ctx = TestContext::default().with_var("ns", "cond", ConditionValue::String("b".to_string()));
      let mut value = select_a_x_default_y();
      value.prepend(&Configurable::literal(ConfigurableValue::StringList(vec!["w".to_string()])));
      assert_eq!(value.evaluate("srcs", &ctx).unwrap(), list(&["w", "y"]));
    }

    #[test]
    fn strings_concatenate() {
      let ctx = TestContext::default();
      let mut value = Configurable::literal(ConfigurableValue::String("lib".to_string()));
      value.append(&Configurable::literal(ConfigurableValue::String("foo".to_string())));
      assert_eq!(value.evaluate("stem", &ctx).unwrap(), string("libfoo"));
    }

    #[test]
    fn bools_combine_with_or() {
      let ctx = TestContext::default();
      let eval = |a: bool, b: bool| {
        let mut value = Configurable::literal(ConfigurableValue::Bool(a));
        value.append(&Configurable::literal(ConfigurableValue::Bool(b)));
        value.evaluate("flag", &ctx).unwrap()
      };
      assert_eq!(eval(true, false), Some(ConfigurableValue::Bool(true)));
      assert_eq!(eval(false, true), Some(ConfigurableValue::Bool(true)));
      assert_eq!(eval(false, false), Some(ConfigurableValue::Bool(false)));
    }

    #[test]
    fn unset_plus_unset_is_unset() {
      let ctx = TestContext::default();
      let mut value = Configurable::select(ValueType::String, string_select("v1", "foo", string("bar"), None));
      value.append(&Configurable::select(
        ValueType::String,
        string_select("v2", "baz", string("qux"), None),
      ));
      assert_eq!(value.evaluate("name", &ctx).unwrap(), None);
    }

    #[test]
    fn unset_plus_value_is_value() {
      let ctx = TestContext::default();
      let mut value = Configurable::select(ValueType::String, string_select("v1", "foo", string("bar"), None));
      value.append(&Configurable::select(
        ValueType::String,
        Select {
          conditions: vec![var("v2")],
          cases: vec![SelectCase {
            patterns: vec![SelectPattern::Default],
            value: string("a"),
          }],
        },
      ));
      assert_eq!(value.evaluate("name", &ctx).unwrap(), string("a"));
    }
  }

  mod selection {
    use super::*;

    #[test]
    fn explicit_unset_branch() {
      let ctx = TestContext::default().with_var("ns", "v", ConditionValue::String("a".to_string()));
      let value = Configurable::select(ValueType::String, string_select("v", "a", None, string("c")));
      assert_eq!(value.evaluate("name", &ctx).unwrap(), None);
    }

    #[test]
    fn unhandled_value() {
      let ctx = TestContext::default().with_var("ns", "v", ConditionValue::String("baz".to_string()));
      let value = Configurable::select(
        ValueType::String,
        Select {
          conditions: vec![var("v")],
          cases: vec![SelectCase {
            patterns: vec![s("a")],
            value: string("a"),
          }],
        },
      );
      let err = value.evaluate("my_string", &ctx).unwrap_err();
      assert_eq!(
        err.to_string(),
        "my_string: soong_config_variable(\"ns\", \"v\") had value \"baz\", which was not handled by the select statement"
      );
    }

    #[test]
    fn undefined_only_matches_default() {
      let ctx = TestContext::default();
      let value = Configurable::select(
        ValueType::Bool,
        Select {
          conditions: vec![var("flag")],
          cases: vec![SelectCase {
            patterns: vec![SelectPattern::Bool(true)],
            value: Some(ConfigurableValue::Bool(true)),
          }],
        },
      );
      let err = value.evaluate("my_bool", &ctx).unwrap_err();
      assert!(err.to_string().contains("had value undefined"));
    }

    #[test]
    fn differing_branch_types() {
      let ctx = TestContext::default();
      let value = Configurable::select(
        ValueType::String,
        string_select("v", "a", string("a.cpp"), Some(ConfigurableValue::Bool(true))),
      );
      let err = value.evaluate("my_string", &ctx).unwrap_err();
      assert_eq!(
        err.to_string(),
        "Found select statement with differing types \"string\" and \"bool\" in its cases"
      );
    }

    #[test]
    fn branch_type_must_match_property() {
      let ctx = TestContext::default();
      let value = Configurable::select(
        ValueType::String,
        string_select(
          "v",
          "a",
          Some(ConfigurableValue::Bool(false)),
          Some(ConfigurableValue::Bool(true)),
        ),
      );
      let err = value.evaluate("my_string", &ctx).unwrap_err();
      assert_eq!(err.to_string(), "can't assign bool value to string property \"my_string\"");
    }

    #[test]
    fn bool_condition_rejects_string_patterns() {
      let ctx = TestContext::default().with_var("ns", "flag", ConditionValue::Bool(true));
      let value = Configurable::select(ValueType::String, string_select("flag", "yes", string("a"), string("b")));
      let err = value.evaluate("my_string", &ctx).unwrap_err();
      assert_eq!(
        err.to_string(),
        "Expected all branches of a select on condition soong_config_variable(\"ns\", \"flag\") to have type bool, found string"
      );
    }

    #[test]
    fn multi_condition_tuples() {
      let ctx = TestContext {
        arch: Some("arm64".to_string()),
        ..Default::default()
      }
      .with_var("ns", "v", ConditionValue::String("b".to_string()));
      let value = Configurable::select(
        ValueType::String,
        Select {
          conditions: vec![Condition::Arch, var("v")],
          cases: vec![
            SelectCase {
              patterns: vec![s("arm64"), s("a")],
              value: string("arm64_a"),
            },
            SelectCase {
              patterns: vec![s("arm64"), SelectPattern::Default],
              value: string("arm64_other"),
            },
            SelectCase {
              patterns: vec![SelectPattern::Default, SelectPattern::Default],
              value: string("other"),
            },
          ],
        },
      );
      assert_eq!(value.evaluate("name", &ctx).unwrap(), string("arm64_other"));
    }

    #[test]
    fn arch_before_split_is_not_ready() {
      let ctx = TestContext::default();
      let value = Configurable::select(
        ValueType::String,
        Select {
          conditions: vec![Condition::Arch],
          cases: vec![SelectCase {
            patterns: vec![SelectPattern::Default],
            value: string("x"),
          }],
        },
      );
      assert_eq!(
        value.evaluate("name", &ctx).unwrap_err(),
        ConfigurableError::NotReady("arch()".to_string())
      );
    }

    #[test]
    fn tuple_arity_mismatch() {
      let ctx = TestContext::default();
      let value = Configurable::select(
        ValueType::String,
        Select {
          conditions: vec![Condition::Os],
          cases: vec![SelectCase {
            patterns: vec![SelectPattern::Default, SelectPattern::Default],
            value: string("x"),
          }],
        },
      );
      assert!(matches!(
        value.evaluate("name", &ctx).unwrap_err(),
        ConfigurableError::PatternCount { .. }
      ));
    }
  }

  mod memoization {
    use super::*;

    #[test]
    fn evaluates_once() {
      let ctx = TestContext::default().with_var("ns", "cond", ConditionValue::String("a".to_string()));
      let value = select_a_x_default_y();
      assert_eq!(value.evaluate("srcs", &ctx).unwrap(), list(&["x"]));
      assert_eq!(value.evaluate("srcs", &ctx).unwrap(), list(&["x"]));
      assert_eq!(ctx.lookups.get(), 1);
    }

    #[test]
    fn clones_and_edits_reset_the_memo() {
      let ctx = TestContext::default().with_var("ns", "cond", ConditionValue::String("a".to_string()));
      let mut value = select_a_x_default_y();
      value.evaluate("srcs", &ctx).unwrap();

      let copy = value.clone();
      let other = TestContext::default();
      assert_eq!(copy.evaluate("srcs", &other).unwrap(), list(&["y"]));

      value.append(&Configurable::literal(ConfigurableValue::StringList(vec!["z".to_string()])));
      assert_eq!(value.evaluate("srcs", &ctx).unwrap(), list(&["x", "z"]));
    }

    #[test]
    fn not_ready_is_retried() {
      let value = Configurable::select(
        ValueType::StringList,
        Select {
          conditions: vec![Condition::Arch],
          cases: vec![
            SelectCase {
              patterns: vec![s("x86")],
              value: list(&["x86.c"]),
            },
            SelectCase {
              patterns: vec![SelectPattern::Default],
              value: list(&["generic.c"]),
            },
          ],
        },
      );
      let early = TestContext::default();
      assert!(matches!(value.evaluate("srcs", &early), Err(ConfigurableError::NotReady(_))));

      let ready = TestContext {
        arch: Some("x86".to_string()),
        ..Default::default()
      };
      assert_eq!(value.evaluate("srcs", &ready).unwrap(), list(&["x86.c"]));
    }
  }
}
