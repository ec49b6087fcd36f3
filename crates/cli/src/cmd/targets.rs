use std::collections::BTreeMap;
use std::path::Path;

use anyhow::Result;
use archvariant_lib::platform::{OsType, Target};
use serde::Serialize;

use super::load_config;
use crate::output::{OutputFormat, print_entry, print_json, print_stat};

#[derive(Serialize)]
struct TargetsOutput<'a> {
  build_os: OsType,
  android64: bool,
  targets: &'a BTreeMap<OsType, Vec<Target>>,
}

/// Show the targets each OS resolves to.
pub fn cmd_targets(product: &Path, build_os: Option<OsType>, format: OutputFormat) -> Result<()> {
  let config = load_config(product, build_os)?;

  if format.is_json() {
    return print_json(&TargetsOutput {
      build_os: config.build_os(),
      android64: config.android64(),
      targets: config.targets(),
    });
  }

  print_stat("Build OS", config.build_os().as_str());
  print_stat("Build target", &config.build_os_target().to_string());
  println!();
  for (os, targets) in config.targets() {
    println!("{} ({})", os, os.class());
    for target in targets {
      let mut line = target.to_string();
      if target.host_cross {
        line.push_str(" [host cross]");
      }
      print_entry(&line);
    }
  }
  Ok(())
}
