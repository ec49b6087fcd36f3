//! Subcommand implementations.

mod arch_config;
mod targets;
mod variants;

use std::path::Path;

use anyhow::{Context, Result};
use archvariant_lib::config::Config;
use archvariant_lib::platform::OsType;

pub use arch_config::cmd_arch_config;
pub use targets::cmd_targets;
pub use variants::cmd_variants;

/// Load product variables, resolving for `build_os` or the current machine.
fn load_config(product: &Path, build_os: Option<OsType>) -> Result<Config> {
  Config::load(product, build_os).with_context(|| format!("Failed to load product variables from {}", product.display()))
}
