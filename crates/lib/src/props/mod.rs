//! Property shapes and sparse property values.
//!
//! A [`PropertyShape`] declares the fields of a property struct, with tags
//! marking which fields are arch-variant and how they merge. A
//! [`PropertyStruct`] holds only the fields that were set.

pub mod shape;
pub mod value;

use thiserror::Error;

use crate::configurable::ConfigurableError;

pub use shape::{
  PropertyField, PropertyKind, PropertyShape, TAG_ARCH_VARIANT, TAG_PATH, TAG_REPLACE_INSTEAD_OF_APPEND,
  TAG_VARIANT_PREPEND,
};
pub use value::{ExtendOrder, PropertyStruct, PropertyValue};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PropertyError {
  #[error("unrecognized property {0:?}")]
  UnknownProperty(String),

  #[error("property {property:?} expects a {expected} value")]
  TypeMismatch { property: String, expected: &'static str },

  #[error("can't merge {property:?}: source and destination are not both {expected}")]
  KindMismatch { property: String, expected: &'static str },

  #[error(transparent)]
  Configurable(#[from] ConfigurableError),
}
