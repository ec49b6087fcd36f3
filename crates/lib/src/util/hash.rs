//! Structural hashing for values that key process-wide caches.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

pub type HashError = serde_json::Error;

/// Identity of a value derived from its serialized structure.
///
/// The id is a lowercase hexadecimal SHA-256 of the JSON-serialized value.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ShapeId(pub String);

impl std::fmt::Display for ShapeId {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    write!(f, "{}", self.0)
  }
}

pub trait StructuralHash: Serialize {
  fn structural_id(&self) -> Result<ShapeId, HashError> {
    let serialized = serde_json::to_string(self)?;
    let mut hasher = Sha256::new();
    hasher.update(serialized.as_bytes());
    Ok(ShapeId(hex::encode(hasher.finalize())))
  }
}
