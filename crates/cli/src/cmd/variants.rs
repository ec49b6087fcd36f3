use std::path::Path;

use anyhow::{Context, Result, bail};
use archvariant_lib::graph::{DepTag, ModuleGraph, VariantId};
use archvariant_lib::module::{VariantState, load_modules};
use archvariant_lib::mutator::{PassSummary, run_arch_mutators};
use archvariant_lib::platform::OsType;
use serde::Serialize;
use tracing::debug;

use super::load_config;
use crate::output::{OutputFormat, print_detail, print_entry, print_json, print_stat, print_success, print_warning};

#[derive(Serialize)]
struct VariantsOutput<'a> {
  passes: Vec<PassSummary>,
  variants: Vec<VariantEntry<'a>>,
}

#[derive(Serialize)]
struct VariantEntry<'a> {
  module: &'a str,
  variant: String,
  state: &'a VariantState,
  deps: Vec<DepEntry<'a>>,
}

#[derive(Serialize)]
struct DepEntry<'a> {
  tag: DepTag,
  module: &'a str,
  variant: String,
}

fn variation_name(graph: &ModuleGraph, id: VariantId) -> Result<String> {
  let variations = graph.variations(id)?;
  Ok(
    variations
      .iter()
      .map(|(_, v)| v.as_str())
      .filter(|v| !v.is_empty())
      .collect::<Vec<_>>()
      .join("_"),
  )
}

fn collect<'a>(graph: &'a ModuleGraph, only: Option<&str>) -> Result<Vec<VariantEntry<'a>>> {
  let mut entries = Vec::new();
  for name in graph.names() {
    if only.is_some_and(|only| only != name.as_str()) {
      continue;
    }
    for id in graph.variants(name) {
      let module = graph.module(*id)?;
      let mut deps = Vec::new();
      for (tag, dep) in graph.dependencies(*id) {
        deps.push(DepEntry {
          tag,
          module: graph.module(dep)?.name(),
          variant: variation_name(graph, dep)?,
        });
      }
      entries.push(VariantEntry {
        module: module.name(),
        variant: variation_name(graph, *id)?,
        state: module.state(),
        deps,
      });
    }
  }
  Ok(entries)
}

/// Run the OS and arch passes over a module file and list the variants.
pub fn cmd_variants(
  modules: &Path,
  product: &Path,
  build_os: Option<OsType>,
  only: Option<&str>,
  verbose: bool,
  format: OutputFormat,
) -> Result<()> {
  let config = load_config(product, build_os)?;
  let declared =
    load_modules(modules).with_context(|| format!("Failed to load modules from {}", modules.display()))?;
  debug!(modules = declared.len(), path = %modules.display(), "loaded module file");
  let mut graph = ModuleGraph::from_modules(declared).context("Failed to build the module graph")?;

  if let Some(only) = only
    && graph.variants(only).is_empty()
  {
    bail!("no module named {:?}", only);
  }

  let passes = run_arch_mutators(&mut graph, &config).context("Variant resolution failed")?;
  let variants = collect(&graph, only)?;

  if format.is_json() {
    return print_json(&VariantsOutput { passes, variants });
  }

  let mut current = "";
  for entry in &variants {
    if entry.module != current {
      println!("{}", entry.module);
      current = entry.module;
    }
    let mut line = if entry.variant.is_empty() {
      "(no variation)".to_string()
    } else {
      entry.variant.clone()
    };
    if let Some(target) = &entry.state.compile_target {
      line.push_str(&format!(" [{}]", target));
    }
    if entry.state.disabled {
      line.push_str(" (disabled)");
    }
    print_entry(&line);
    if verbose {
      for extra in &entry.state.compile_multi_targets {
        print_detail(&format!("also builds for {}", extra));
      }
    }
    for dep in &entry.deps {
      print_detail(&format!("{} {} ({})", dep.module, dep.variant, dep.tag));
    }
  }

  println!();
  for pass in &passes {
    print_stat(
      pass.pass,
      &format!(
        "{} modules, {} split into {} variants, {} disabled",
        pass.modules, pass.split, pass.variants, pass.disabled
      ),
    );
  }
  let disabled = variants.iter().filter(|v| v.state.disabled).count();
  if disabled > 0 {
    print_warning(&format!("{} variant(s) have no target and are disabled", disabled));
  }
  print_success(&format!("Resolved {} variants", variants.len()));
  Ok(())
}
