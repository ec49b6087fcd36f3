//! Module graph the variant splitters rewrite.
//!
//! Nodes are module variants in an arena; handles stay valid while other
//! nodes are added and removed. Edges point from a dependency to its
//! dependent, so a topological sort yields dependencies first.
//!
//! Splitting a node with [`ModuleGraph::create_variations`] adds the new
//! variants and leaves the old node in place until [`ModuleGraph::finish_pass`]
//! re-targets the edges of its dependents and removes it.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use petgraph::Direction;
use petgraph::algo::toposort;
use petgraph::stable_graph::{NodeIndex, StableDiGraph};
use petgraph::visit::EdgeRef;
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, warn};

use crate::module::Module;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GraphError {
  #[error("module {0:?} is declared more than once")]
  DuplicateModule(String),

  #[error("module {module:?} depends on undefined module {dependency:?}")]
  MissingDependency { module: String, dependency: String },

  #[error("dependency cycle through {0:?}")]
  Cycle(String),

  #[error("no variant handle {0}")]
  UnknownVariant(VariantId),

  #[error("module {0:?} can't be split into zero variations")]
  NoVariations(String),

  #[error("module {module:?}: variation {from:?} can't depend on later variation {to:?}")]
  LaterVariation { module: String, from: String, to: String },

  #[error("module {module:?}: inter-variant dependency on a variant not created by this split")]
  NotCreatedTogether { module: String },

  #[error("dependency {dependency:?} of {module:?} has no {mutator} variation {variation:?}")]
  MissingVariant {
    module: String,
    dependency: String,
    mutator: &'static str,
    variation: String,
  },
}

/// Handle to one module variant in a [`ModuleGraph`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct VariantId(NodeIndex);

impl fmt::Display for VariantId {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "#{}", self.0.index())
  }
}

/// Why one variant depends on another.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DepTag {
  /// Declared in the module's `deps`
  Normal,
  /// From the common OS variant to each OS-specific variant
  CommonOsToOsSpecific,
  /// From the second slice of a darwin universal binary to the first
  DarwinUniversal,
}

impl DepTag {
  pub fn as_str(&self) -> &'static str {
    match self {
      Self::Normal => "normal",
      Self::CommonOsToOsSpecific => "common_os_to_os_specific",
      Self::DarwinUniversal => "darwin_universal",
    }
  }
}

impl fmt::Display for DepTag {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}", self.as_str())
  }
}

#[derive(Debug)]
struct Node {
  module: Module,
  /// (mutator, variation) pairs, in the order the mutators ran
  variations: Vec<(&'static str, String)>,
}

#[derive(Debug, Clone, Copy)]
struct Edge {
  tag: DepTag,
  /// Creation order, so dependencies keep their declared order across splits
  seq: u64,
}

/// A node split during the current pass, with the variants that replace it.
#[derive(Debug)]
struct Split {
  old: NodeIndex,
  mutator: &'static str,
  variants: Vec<VariantId>,
}

#[derive(Debug, Default)]
pub struct ModuleGraph {
  graph: StableDiGraph<Node, Edge>,
  /// Live variants per module name, in creation order
  groups: BTreeMap<String, Vec<VariantId>>,
  /// Module names in declaration order
  names: Vec<String>,
  splits: Vec<Split>,
  next_seq: u64,
}

impl ModuleGraph {
  /// Build a graph from declared modules, wiring each `deps` entry.
  pub fn from_modules(modules: Vec<Module>) -> Result<Self, GraphError> {
    let mut graph = Self::default();
    for module in modules {
      let name = module.name().to_string();
      if graph.groups.contains_key(&name) {
        return Err(GraphError::DuplicateModule(name));
      }
      let index = graph.graph.add_node(Node {
        module,
        variations: Vec::new(),
      });
      graph.groups.insert(name.clone(), vec![VariantId(index)]);
      graph.names.push(name);
    }

    for name in graph.names.clone() {
      let dependent = graph.groups[&name][0];
      let deps = graph.graph[dependent.0].module.deps().to_vec();
      for dep in deps {
        let dependency = graph
          .groups
          .get(&dep)
          .map(|ids| ids[0])
          .ok_or_else(|| GraphError::MissingDependency {
            module: name.clone(),
            dependency: dep.clone(),
          })?;
        graph.add_edge(dependency, dependent, DepTag::Normal);
      }
    }

    graph.topo_order()?;
    Ok(graph)
  }

  fn add_edge(&mut self, dependency: VariantId, dependent: VariantId, tag: DepTag) {
    let seq = self.next_seq;
    self.next_seq += 1;
    self.graph.add_edge(dependency.0, dependent.0, Edge { tag, seq });
  }

  fn node(&self, id: VariantId) -> Result<&Node, GraphError> {
    self.graph.node_weight(id.0).ok_or(GraphError::UnknownVariant(id))
  }

  pub fn contains(&self, id: VariantId) -> bool {
    self.graph.contains_node(id.0)
  }

  pub fn module(&self, id: VariantId) -> Result<&Module, GraphError> {
    Ok(&self.node(id)?.module)
  }

  pub fn module_mut(&mut self, id: VariantId) -> Result<&mut Module, GraphError> {
    self
      .graph
      .node_weight_mut(id.0)
      .map(|n| &mut n.module)
      .ok_or(GraphError::UnknownVariant(id))
  }

  /// (mutator, variation) pairs identifying the variant
  pub fn variations(&self, id: VariantId) -> Result<&[(&'static str, String)], GraphError> {
    Ok(&self.node(id)?.variations)
  }

  /// The variation `mutator` assigned to the variant, if it split it
  pub fn variation(&self, id: VariantId, mutator: &str) -> Option<&str> {
    let node = self.graph.node_weight(id.0)?;
    node
      .variations
      .iter()
      .find(|(m, _)| *m == mutator)
      .map(|(_, v)| v.as_str())
  }

  /// Live variants of `name`, in creation order.
  pub fn variants(&self, name: &str) -> &[VariantId] {
    self.groups.get(name).map(Vec::as_slice).unwrap_or_default()
  }

  /// Module names in declaration order
  pub fn names(&self) -> &[String] {
    &self.names
  }

  /// Every live variant, grouped by module in declaration order.
  pub fn iter(&self) -> impl Iterator<Item = (VariantId, &Module)> {
    self
      .names
      .iter()
      .flat_map(|name| self.variants(name))
      .filter_map(|id| self.graph.node_weight(id.0).map(|n| (*id, &n.module)))
  }

  pub fn len(&self) -> usize {
    self.groups.values().map(Vec::len).sum()
  }

  pub fn is_empty(&self) -> bool {
    self.len() == 0
  }

  /// Direct dependencies of `id` in the order they were added.
  pub fn dependencies(&self, id: VariantId) -> Vec<(DepTag, VariantId)> {
    self.edges(id, Direction::Incoming)
  }

  /// Direct dependents of `id` in the order they were added.
  pub fn dependents(&self, id: VariantId) -> Vec<(DepTag, VariantId)> {
    self.edges(id, Direction::Outgoing)
  }

  fn edges(&self, id: VariantId, direction: Direction) -> Vec<(DepTag, VariantId)> {
    let mut edges: Vec<_> = self
      .graph
      .edges_directed(id.0, direction)
      .map(|e| {
        let other = match direction {
          Direction::Incoming => e.source(),
          Direction::Outgoing => e.target(),
        };
        (e.weight().seq, e.weight().tag, VariantId(other))
      })
      .collect();
    edges.sort_by_key(|(seq, _, _)| *seq);
    edges.into_iter().map(|(_, tag, id)| (tag, id)).collect()
  }

  /// Live variants, dependencies before dependents.
  pub fn topo_order(&self) -> Result<Vec<VariantId>, GraphError> {
    let sorted = toposort(&self.graph, None).map_err(|cycle| {
      let name = self.graph[cycle.node_id()].module.name().to_string();
      GraphError::Cycle(name)
    })?;
    Ok(sorted.into_iter().map(VariantId).collect())
  }

  /// Replace `id` with one variant per `(variation, module)` entry.
  ///
  /// Each new variant inherits the dependencies of `id`, except that a
  /// common OS variant only gets the edges added explicitly for it. The new
  /// handles are returned in `variants` order.
  pub fn create_variations(
    &mut self,
    id: VariantId,
    mutator: &'static str,
    variants: Vec<(String, Module)>,
  ) -> Result<Vec<VariantId>, GraphError> {
    let node = self.node(id)?;
    let name = node.module.name().to_string();
    if variants.is_empty() {
      return Err(GraphError::NoVariations(name));
    }
    let base_variations = node.variations.clone();
    let inherited = self.dependencies(id);

    let mut created = Vec::with_capacity(variants.len());
    for (variation, module) in variants {
      let common_os = module.state().common_os_variant;
      let mut variations = base_variations.clone();
      variations.push((mutator, variation));
      let new = VariantId(self.graph.add_node(Node { module, variations }));
      if !common_os {
        for (tag, dependency) in &inherited {
          self.add_edge(*dependency, new, *tag);
        }
      }
      created.push(new);
    }

    if let Some(group) = self.groups.get_mut(&name)
      && let Some(pos) = group.iter().position(|v| *v == id)
    {
      drop(group.splice(pos..=pos, created.iter().copied()));
    }
    self.splits.push(Split {
      old: id.0,
      mutator,
      variants: created.clone(),
    });
    debug!(module = %name, mutator, variants = created.len(), "created variations");
    Ok(created)
  }

  /// Make `from` depend on `to`, both from the same [`Self::create_variations`]
  /// call. `to` must have been created before `from`.
  pub fn add_inter_variant_dependency(
    &mut self,
    tag: DepTag,
    from: VariantId,
    to: VariantId,
    created: &[VariantId],
  ) -> Result<(), GraphError> {
    let module = self.module(from)?.name().to_string();
    let (Some(from_pos), Some(to_pos)) = (
      created.iter().position(|v| *v == from),
      created.iter().position(|v| *v == to),
    ) else {
      return Err(GraphError::NotCreatedTogether { module });
    };
    if from_pos <= to_pos {
      return Err(GraphError::LaterVariation {
        module,
        from: self.variation_label(from),
        to: self.variation_label(to),
      });
    }
    self.add_edge(to, from, tag);
    Ok(())
  }

  fn variation_label(&self, id: VariantId) -> String {
    self
      .graph
      .node_weight(id.0)
      .and_then(|n| n.variations.last())
      .map(|(_, v)| v.clone())
      .unwrap_or_default()
  }

  /// Re-target the dependents of every node split since the last call and
  /// drop the split nodes.
  ///
  /// A dependent picks the variant with its own variation for the splitting
  /// mutator. A dependent that has no such variation (it wasn't split) gets
  /// the first variant; the common OS variant gets every variant. Failures are
  /// returned per dependent so a pass can report them all.
  pub fn finish_pass(&mut self) -> Vec<(VariantId, GraphError)> {
    let splits = std::mem::take(&mut self.splits);
    let replaced: BTreeSet<NodeIndex> = splits.iter().map(|s| s.old).collect();
    let mut errors = Vec::new();

    for split in &splits {
      let dependency_name = self.graph[split.old].module.name().to_string();
      let dependents: Vec<(NodeIndex, Edge)> = self
        .graph
        .edges_directed(split.old, Direction::Outgoing)
        .filter(|e| !replaced.contains(&e.target()))
        .map(|e| (e.target(), *e.weight()))
        .collect();

      for (dependent, edge) in dependents {
        let dependent_id = VariantId(dependent);
        let targets: Vec<VariantId> = match self.variation(dependent_id, split.mutator) {
          Some(variation) => {
            let matching = split
              .variants
              .iter()
              .copied()
              .find(|v| self.variation(*v, split.mutator) == Some(variation));
            match matching {
              Some(v) => vec![v],
              None => {
                errors.push((
                  dependent_id,
                  GraphError::MissingVariant {
                    module: self.graph[dependent].module.name().to_string(),
                    dependency: dependency_name.clone(),
                    mutator: split.mutator,
                    variation: variation.to_string(),
                  },
                ));
                continue;
              }
            }
          }
          None if edge.tag == DepTag::CommonOsToOsSpecific => split.variants.clone(),
          None => {
            warn!(
              module = %self.graph[dependent].module.name(),
              dependency = %dependency_name,
              mutator = split.mutator,
              "dependent has no matching variation, using the first variant"
            );
            vec![split.variants[0]]
          }
        };
        for target in targets {
          self.graph.add_edge(target.0, dependent, edge);
        }
      }
    }

    for split in splits {
      self.graph.remove_node(split.old);
    }
    errors
  }
}
