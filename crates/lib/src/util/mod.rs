//! Shared utilities.
//!
//! Structural hashing, compute-once caches, and Starlark text helpers.

pub mod hash;
pub mod once;
pub mod starlark_fmt;
