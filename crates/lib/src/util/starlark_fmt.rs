//! Formatting helpers that print values as starlark literals.
//!
//! Dictionary entries are sorted so the output is stable across runs.

use std::collections::BTreeMap;

const INDENT: usize = 4;

/// Indentation string for `level`.
pub fn indention(level: usize) -> String {
  " ".repeat(level * INDENT)
}

fn quote(item: &str) -> String {
  if item.contains('"') {
    format!("'''{}'''", item)
  } else {
    format!("\"{}\"", item)
  }
}

/// A list of strings; one-element lists stay on one line.
pub fn print_string_list<S: AsRef<str>>(items: &[S], indent_level: usize) -> String {
  match items {
    [] => "[]".to_string(),
    [only] => format!("[{}]", quote(only.as_ref())),
    _ => {
      let inner = indention(indent_level + 1);
      let mut lines = vec!["[".to_string()];
      lines.extend(items.iter().map(|item| format!("{}{},", inner, quote(item.as_ref()))));
      lines.push(format!("{}]", indention(indent_level)));
      lines.join("\n")
    }
  }
}

/// A dictionary whose values are already formatted.
pub fn print_dict(dict: &BTreeMap<String, String>, indent_level: usize) -> String {
  if dict.is_empty() {
    return "{}".to_string();
  }
  let inner = indention(indent_level + 1);
  let mut items: Vec<String> = dict.iter().map(|(k, v)| format!("{}\"{}\": {},", inner, k, v)).collect();
  items.sort();
  format!("{{\n{}\n{}}}", items.join("\n"), indention(indent_level))
}

/// A dictionary of string lists.
pub fn print_string_list_dict<S: AsRef<str>>(dict: &BTreeMap<String, Vec<S>>, indent_level: usize) -> String {
  let formatted = dict
    .iter()
    .map(|(k, v)| (k.clone(), print_string_list(v, indent_level + 1)))
    .collect();
  print_dict(&formatted, indent_level)
}
