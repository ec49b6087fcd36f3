//! archvariant-lib: per-OS and per-arch variant resolution for build modules
//!
//! This crate provides the pieces a build graph needs to split declared
//! modules into the variants they are compiled as:
//! - `platform` and `config`: the OS and arch tables, and the targets a
//!   product configuration resolves to
//! - `props` and `arch_props`: typed module properties and their per-axis
//!   override blocks (`arch`, `multilib`, `target`)
//! - `mutator`: the OS and arch splitters, run over a `graph::ModuleGraph`
//! - `merge` and `axes`: squashing override blocks into a variant, and
//!   reporting them per configuration axis

pub mod arch_props;
pub mod axes;
pub mod config;
pub mod configurable;
pub mod graph;
pub mod merge;
pub mod module;
pub mod mutator;
pub mod platform;
pub mod props;
pub mod util;
