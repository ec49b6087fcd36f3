//! Runs mutators over a [`ModuleGraph`].
//!
//! Planning reads one module at a time and is spread over the rayon pool.
//! Plans are applied serially in dependency order, so the graph only ever
//! has one writer.

use rayon::prelude::*;
use serde::Serialize;
use tracing::{info, warn};

use super::{ArchMutator, ModuleFailure, Mutator, MutatorError, MutatorErrors, OsMutator, Outcome};
use crate::config::Config;
use crate::graph::{ModuleGraph, VariantId};

/// Counts for one completed pass.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PassSummary {
  pub pass: &'static str,
  /// Variants the pass looked at
  pub modules: usize,
  /// Variants that were split
  pub split: usize,
  /// Variants created by splits
  pub variants: usize,
  /// Variants disabled because no target was left
  pub disabled: usize,
}

fn failure(graph: &ModuleGraph, id: VariantId, error: MutatorError) -> ModuleFailure {
  let (module, variant) = match (graph.module(id), graph.variations(id)) {
    (Ok(module), Ok(variations)) => (
      module.name().to_string(),
      variations
        .iter()
        .map(|(_, v)| v.as_str())
        .collect::<Vec<_>>()
        .join("_"),
    ),
    _ => (id.to_string(), String::new()),
  };
  ModuleFailure { module, variant, error }
}

/// Plan every variant with `mutator` and apply the plans.
///
/// A module whose plan fails is left as it is; every other plan is still
/// applied. All failures of the pass are returned together once the graph
/// has been re-wired.
pub fn run_mutator(graph: &mut ModuleGraph, config: &Config, mutator: &dyn Mutator) -> Result<PassSummary, MutatorErrors> {
  let pass = mutator.name();
  let order = graph.topo_order().map_err(|e| {
    MutatorErrors(vec![ModuleFailure {
      module: String::new(),
      variant: String::new(),
      error: e.into(),
    }])
  })?;

  let shared: &ModuleGraph = graph;
  let planned: Vec<(VariantId, Result<Outcome, MutatorError>)> = order
    .par_iter()
    .map(|id| {
      let outcome = shared
        .module(*id)
        .map_err(MutatorError::from)
        .and_then(|module| mutator.plan(module, config));
      (*id, outcome)
    })
    .collect();

  let mut failures = Vec::new();
  let mut summary = PassSummary {
    pass,
    modules: planned.len(),
    ..Default::default()
  };
  for (id, outcome) in planned {
    let outcome = match outcome {
      Ok(outcome) => outcome,
      Err(error) => {
        failures.push(failure(graph, id, error));
        continue;
      }
    };
    match outcome {
      Outcome::Unchanged => {}
      Outcome::Update(module) => {
        if module.state().disabled {
          summary.disabled += 1;
        }
        match graph.module_mut(id) {
          Ok(slot) => *slot = *module,
          Err(error) => failures.push(failure(graph, id, error.into())),
        }
      }
      Outcome::Split { variants, inter_deps } => {
        let created = match graph.create_variations(id, pass, variants) {
          Ok(created) => created,
          Err(error) => {
            failures.push(failure(graph, id, error.into()));
            continue;
          }
        };
        summary.split += 1;
        summary.variants += created.len();
        for dep in inter_deps {
          let (Some(from), Some(to)) = (created.get(dep.from), created.get(dep.to)) else {
            continue;
          };
          if let Err(error) = graph.add_inter_variant_dependency(dep.tag, *from, *to, &created) {
            failures.push(failure(graph, *from, error.into()));
          }
        }
      }
    }
  }

  for (id, error) in graph.finish_pass() {
    failures.push(failure(graph, id, error.into()));
  }
  if !failures.is_empty() {
    warn!(pass, failures = failures.len(), "pass failed");
    return Err(MutatorErrors(failures));
  }

  info!(
    pass,
    modules = summary.modules,
    split = summary.split,
    variants = summary.variants,
    disabled = summary.disabled,
    "mutator pass finished"
  );
  Ok(summary)
}

pub fn run_os_mutator(graph: &mut ModuleGraph, config: &Config) -> Result<PassSummary, MutatorErrors> {
  run_mutator(graph, config, &OsMutator)
}

pub fn run_arch_mutator(graph: &mut ModuleGraph, config: &Config) -> Result<PassSummary, MutatorErrors> {
  run_mutator(graph, config, &ArchMutator)
}

/// The OS pass followed by the arch pass. The arch pass only runs when the
/// OS pass succeeded.
pub fn run_arch_mutators(graph: &mut ModuleGraph, config: &Config) -> Result<Vec<PassSummary>, MutatorErrors> {
  let os = run_os_mutator(graph, config)?;
  let arch = run_arch_mutator(graph, config)?;
  Ok(vec![os, arch])
}
