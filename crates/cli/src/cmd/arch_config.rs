use anyhow::{Context, Result};
use archvariant_lib::config::starlark::arch_config_starlark;

/// Print the arch, arch variant, CPU variant and feature tables as Starlark.
pub fn cmd_arch_config() -> Result<()> {
  let text = arch_config_starlark().context("Failed to render arch config")?;
  print!("{}", text);
  Ok(())
}
