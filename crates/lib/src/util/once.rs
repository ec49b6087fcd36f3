//! Compute-once caches safe for concurrent first access.

use std::collections::HashMap;
use std::hash::Hash;
use std::sync::{Arc, Mutex, OnceLock};

/// A map of lazily computed values, each computed at most once per key.
///
/// The map lock is only held to find the per-key cell; computing a value runs
/// outside it, so workers computing different keys never wait on each other,
/// and workers asking for the same key wait for the first computation.
#[derive(Debug)]
pub struct OncePer<K, V> {
  cells: Mutex<HashMap<K, Arc<OnceLock<V>>>>,
}

impl<K: Eq + Hash, V: Clone> OncePer<K, V> {
  pub fn new() -> Self {
    Self {
      cells: Mutex::new(HashMap::new()),
    }
  }

  /// Return the value for `key`, computing it with `init` on first use.
  pub fn once(&self, key: K, init: impl FnOnce() -> V) -> V {
    let cell = {
      let mut cells = self.cells.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
      cells.entry(key).or_default().clone()
    };
    cell.get_or_init(init).clone()
  }

  pub fn len(&self) -> usize {
    self.cells.lock().unwrap_or_else(|poisoned| poisoned.into_inner()).len()
  }

  pub fn is_empty(&self) -> bool {
    self.len() == 0
  }
}

impl<K: Eq + Hash, V: Clone> Default for OncePer<K, V> {
  fn default() -> Self {
    Self::new()
  }
}
