//! Variant splitters.
//!
//! The OS mutator splits every arch-specific module into one variant per OS
//! it supports; the arch mutator then splits each OS variant into one
//! variant per target its multilib policy selects. Each split variant gets
//! its per-axis overrides merged in as it is created.
//!
//! A mutator only plans: it looks at one module and says what should replace
//! it. The [`driver`] plans every module in parallel and applies the plans to
//! the [`ModuleGraph`](crate::graph::ModuleGraph) one at a time.

pub mod arch;
pub mod driver;
pub mod multilib;
pub mod os;

use std::fmt;

use thiserror::Error;

use crate::arch_props::ShapeError;
use crate::config::Config;
use crate::configurable::ConfigurableError;
use crate::graph::{DepTag, GraphError};
use crate::merge::MergeError;
use crate::module::Module;

pub use arch::ArchMutator;
pub use driver::{PassSummary, run_arch_mutator, run_arch_mutators, run_mutator, run_os_mutator};
pub use multilib::{MultilibError, decode_multilib, decode_multilib_targets};
pub use os::OsMutator;

/// Whether an error is the declaration's fault or the engine's.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
  Configuration,
  Internal,
}

impl ErrorKind {
  pub fn as_str(&self) -> &'static str {
    match self {
      Self::Configuration => "configuration",
      Self::Internal => "internal",
    }
  }
}

impl fmt::Display for ErrorKind {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}", self.as_str())
  }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MutatorError {
  #[error(transparent)]
  Multilib(#[from] MultilibError),

  #[error(transparent)]
  Merge(#[from] MergeError),

  #[error(transparent)]
  Configurable(#[from] ConfigurableError),

  #[error(transparent)]
  Shape(#[from] ShapeError),

  #[error(transparent)]
  Graph(#[from] GraphError),
}

impl MutatorError {
  pub fn kind(&self) -> ErrorKind {
    match self {
      Self::Multilib(_) | Self::Configurable(_) => ErrorKind::Configuration,
      Self::Merge(e) if !e.is_internal() => ErrorKind::Configuration,
      Self::Graph(GraphError::MissingVariant { .. } | GraphError::MissingDependency { .. }) => {
        ErrorKind::Configuration
      }
      Self::Merge(_) | Self::Shape(_) | Self::Graph(_) => ErrorKind::Internal,
    }
  }
}

/// A failure attributed to one module variant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModuleFailure {
  pub module: String,
  /// Variations the module had when it failed, e.g. `android_arm64`
  pub variant: String,
  pub error: MutatorError,
}

impl fmt::Display for ModuleFailure {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "module {:?}", self.module)?;
    if !self.variant.is_empty() {
      write!(f, " variant {:?}", self.variant)?;
    }
    write!(f, ": {}", self.error)?;
    if self.error.kind() == ErrorKind::Internal {
      write!(f, " (internal error)")?;
    }
    Ok(())
  }
}

/// Every failure of one pass.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub struct MutatorErrors(pub Vec<ModuleFailure>);

impl fmt::Display for MutatorErrors {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    let mut failures = self.0.iter();
    if let Some(first) = failures.next() {
      write!(f, "{}", first)?;
    }
    for failure in failures {
      write!(f, "\n{}", failure)?;
    }
    Ok(())
  }
}

impl MutatorErrors {
  pub fn failures(&self) -> &[ModuleFailure] {
    &self.0
  }
}

/// An edge between two variants of the same split, by index into the
/// planned variants. `from` must come after `to`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InterVariantDep {
  pub tag: DepTag,
  pub from: usize,
  pub to: usize,
}

/// What should happen to a module.
#[derive(Debug, Clone)]
pub enum Outcome {
  Unchanged,
  /// Replace the module in place without a new variation, e.g. to disable it
  Update(Box<Module>),
  Split {
    /// (variation name, variant) pairs in creation order
    variants: Vec<(String, Module)>,
    inter_deps: Vec<InterVariantDep>,
  },
}

impl Outcome {
  fn disabled(module: &Module) -> Self {
    let mut module = module.clone();
    module.disable();
    Self::Update(Box::new(module))
  }
}

/// A variant splitter.
pub trait Mutator: Sync {
  /// Name of the variation axis this mutator creates
  fn name(&self) -> &'static str;

  /// Decide how `module` is split. Must not depend on other modules.
  fn plan(&self, module: &Module, config: &Config) -> Result<Outcome, MutatorError>;
}
