//! Per-axis property trees.
//!
//! For every property shape that declares arch-variant fields, a parallel
//! tree holds one block per arch type, multilib class, and target name. The
//! block layout is a pure function of the static arch tables and the owner
//! shape, so it is derived once per process and shared by every module.

pub mod layout;
pub mod root;
pub mod shape;

use thiserror::Error;

pub use layout::{AxisLayout, axis_layout, variant_field};
pub use root::{ArchBlock, ArchPropRoot, ArchProperties};
pub use shape::{ArchPropShard, MAX_SHARD_NAME_COST, arch_prop_shards, create_arch_prop_shards, filter_arch_shape};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ShapeError {
  #[error("unknown tags {tags:?} in field {field:?}")]
  UnknownTags { field: String, tags: Vec<String> },

  #[error("failed to identify property shape: {0}")]
  Identity(String),

  #[error("field {0:?} does not exist")]
  FieldDoesNotExist(String),
}
