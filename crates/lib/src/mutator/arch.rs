use tracing::debug;

use super::multilib::{decode_multilib, decode_multilib_targets};
use super::{InterVariantDep, Mutator, MutatorError, Outcome};
use crate::config::Config;
use crate::graph::DepTag;
use crate::merge::{MergeError, apply_arch_overrides};
use crate::module::{ImageVariation, Module, ModuleKind};
use crate::platform::{ArchType, OsType, Target, filter_host_cross};

/// Splits each OS variant into one variant per target its multilib policy selects.
#[derive(Debug, Clone, Copy, Default)]
pub struct ArchMutator;

fn filter_to_arch(targets: Vec<Target>, keep: &[ArchType]) -> Vec<Target> {
  targets
    .into_iter()
    .filter(|t| keep.contains(&t.arch.arch_type))
    .collect()
}

impl Mutator for ArchMutator {
  fn name(&self) -> &'static str {
    "arch"
  }

  fn plan(&self, module: &Module, config: &Config) -> Result<Outcome, MutatorError> {
    match module.kind() {
      ModuleKind::Foreign => return Ok(Outcome::Unchanged),
      ModuleKind::Bootstrap => {
        return Ok(Outcome::Split {
          variants: vec![(config.build_os_target().arch_variation(), module.clone())],
          inter_deps: Vec::new(),
        });
      }
      ModuleKind::Soong => {}
    }
    if !module.arch_specific() || module.state().disabled {
      return Ok(Outcome::Unchanged);
    }

    let os = module.os().ok_or_else(|| MergeError::NotAssigned {
      module: module.name().to_string(),
      what: "os",
    })?;

    if os == OsType::CommonOs {
      let mut common = module.clone();
      let state = common.state_mut();
      state.compile_target = Some(Target::common(OsType::CommonOs));
      state.compile_multi_targets = Vec::new();
      state.compile_primary = true;
      return Ok(Outcome::Update(Box::new(common)));
    }

    let image = module.image();
    let mut os_targets = config.os_targets(os).to_vec();
    if os == OsType::Android {
      if !(module.native_bridge_supported() && image == ImageVariation::Core) {
        os_targets.retain(|t| !t.native_bridge);
      }
      if image.installs_single_primary_arch() {
        os_targets.truncate(1);
      }
    }

    // Windows builds always prefer 32-bit
    let prefer32 = os == OsType::Windows;

    let (multilib, extra_multilib) = decode_multilib(module, os, config.ignore_prefer32_on_device())?;
    let mut targets = decode_multilib_targets(&multilib, &os_targets, prefer32)?;
    if targets.is_empty() {
      debug!(module = %module.name(), os = %os, multilib = %multilib, "no targets selected, disabling");
      return Ok(Outcome::disabled(module));
    }

    let mut multi_targets = Vec::new();
    if !extra_multilib.is_empty() {
      multi_targets = decode_multilib_targets(&extra_multilib, &os_targets, prefer32)?;
      multi_targets = filter_host_cross(multi_targets, targets[0].host_cross);
    }

    if image == ImageVariation::Recovery {
      let keep = [config.device_primary_arch_type(), ArchType::Common];
      targets = filter_to_arch(targets, &keep);
      multi_targets = filter_to_arch(multi_targets, &keep);
      if targets.is_empty() {
        debug!(module = %module.name(), "no primary arch target for recovery, disabling");
        return Ok(Outcome::disabled(module));
      }
    }

    let mut variants = Vec::with_capacity(targets.len());
    for (index, target) in targets.iter().enumerate() {
      let mut variant = module.clone();
      let state = variant.state_mut();
      state.compile_target = Some(target.clone());
      state.compile_multi_targets = multi_targets.clone();
      state.compile_primary = index == 0;
      // Darwin installs can't handle the cross arch
      state.skip_install = os == OsType::Darwin && target.host_cross;
      apply_arch_overrides(&mut variant, config)?;
      variants.push((target.arch_variation(), variant));
    }

    // The primary arch of a universal binary links the other arch into it
    let mut inter_deps = Vec::new();
    if os == OsType::Darwin {
      let pair = match (multilib.as_str(), variants.len()) {
        ("darwin_universal", 2) => Some((1, 0)),
        ("darwin_universal_common_first", 3) => Some((2, 1)),
        _ => None,
      };
      if let Some((from, to)) = pair {
        inter_deps.push(InterVariantDep {
          tag: DepTag::DarwinUniversal,
          from,
          to,
        });
      }
    }

    debug!(
      module = %module.name(),
      os = %os,
      multilib = %multilib,
      variants = ?variants.iter().map(|(v, _)| v.as_str()).collect::<Vec<_>>(),
      "split by arch"
    );
    Ok(Outcome::Split { variants, inter_deps })
  }
}
