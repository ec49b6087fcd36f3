use tracing::debug;

use super::{InterVariantDep, Mutator, MutatorError, Outcome};
use crate::config::Config;
use crate::configurable::ConfigurableError;
use crate::graph::DepTag;
use crate::merge::apply_os_overrides;
use crate::module::{Module, ModuleKind};
use crate::platform::{OsType, Target};

/// Splits modules into one variant per supported OS.
#[derive(Debug, Clone, Copy, Default)]
pub struct OsMutator;

impl OsMutator {
  /// Build tools run on the build machine, or as linux_bionic on the same arch.
  fn plan_bootstrap(module: &Module, config: &Config) -> Outcome {
    let build = config.build_os_target();
    let mut targets: Vec<&Target> = vec![build];
    targets.extend(
      config
        .os_targets(OsType::LinuxBionic)
        .iter()
        .filter(|t| t.arch.arch_type == build.arch.arch_type),
    );

    let mut variants: Vec<(String, Module)> = Vec::new();
    for target in targets {
      let variation = target.os_variation();
      if variants.iter().any(|(v, _)| *v == variation) {
        continue;
      }
      let mut variant = module.clone();
      variant.state_mut().compile_os = Some(target.os);
      variants.push((variation, variant));
    }
    Outcome::Split {
      variants,
      inter_deps: Vec::new(),
    }
  }
}

impl Mutator for OsMutator {
  fn name(&self) -> &'static str {
    "os"
  }

  fn plan(&self, module: &Module, config: &Config) -> Result<Outcome, MutatorError> {
    match module.kind() {
      ModuleKind::Foreign => return Ok(Outcome::Unchanged),
      ModuleKind::Bootstrap => return Ok(Self::plan_bootstrap(module, config)),
      ModuleKind::Soong => {}
    }
    if !module.arch_specific() {
      return Ok(Outcome::Unchanged);
    }

    let mut os_list: Vec<OsType> = OsType::ALL
      .into_iter()
      .filter(|os| config.os_targets(*os).iter().any(|t| module.supports_target(t)))
      .collect();

    let common = module.create_common_os_variant();
    if os_list.is_empty() && !common {
      debug!(module = %module.name(), "no supported OS, disabling");
      return Ok(Outcome::disabled(module));
    }
    // Last, so it can depend on every other variant
    if common {
      os_list.push(OsType::CommonOs);
    }

    let mut variants = Vec::with_capacity(os_list.len());
    for os in &os_list {
      let mut variant = module.clone();
      variant.state_mut().compile_os = Some(*os);
      variant.state_mut().common_os_variant = *os == OsType::CommonOs;
      apply_os_overrides(&mut variant, config)?;
      variants.push((os.to_string(), variant));
    }

    let mut inter_deps = Vec::new();
    if common {
      let last = variants.len() - 1;
      for (index, (_, variant)) in variants[..last].iter().enumerate() {
        // Variants disabled later by the arch mutator still get an edge, as do
        // variants whose `enabled` needs a target to be decided
        let enabled = match variant.enabled(config) {
          Err(ConfigurableError::NotReady(_)) => true,
          other => other?,
        };
        if enabled {
          inter_deps.push(InterVariantDep {
            tag: DepTag::CommonOsToOsSpecific,
            from: last,
            to: index,
          });
        }
      }
    }

    debug!(
      module = %module.name(),
      variants = ?variants.iter().map(|(v, _)| v.as_str()).collect::<Vec<_>>(),
      "split by os"
    );
    Ok(Outcome::Split { variants, inter_deps })
  }
}
