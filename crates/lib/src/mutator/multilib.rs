//! Multilib policies: which of an OS's targets a module builds for.

use thiserror::Error;

use crate::arch_props::ShapeError;
use crate::module::{Module, PROP_COMPILE_MULTILIB};
use crate::platform::target::{common_targets, filter_multilib_targets, first_target};
use crate::platform::{Multilib, OsClass, OsType, Target};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MultilibError {
  #[error(r#"compile_multilib must be "both", "first", "32", "64", "prefer32" or "first_prefer32" found {0:?}"#)]
  Invalid(String),
}

/// The multilib policy of `module` for `os`, plus the policy for the extra
/// targets of modules that don't use per-target variants.
///
/// The policy comes from `target.android.compile_multilib` or
/// `target.host.compile_multilib`, then `compile_multilib`, then the
/// module's default. Darwin modules building more than one arch become
/// universal binaries.
pub fn decode_multilib(module: &Module, os: OsType, ignore_prefer32: bool) -> Result<(String, String), ShapeError> {
  let common = module.common_properties();

  let class_block = match os.class() {
    OsClass::Device => Some(("Android", "target.android")),
    OsClass::Host => Some(("Host", "target.host")),
    OsClass::Generic => None,
  };
  let mut declared = None;
  if let (Some((field, user)), Some(root)) = (
    class_block,
    common.and_then(|c| c.arch()).and_then(|a| a.roots().first()),
  ) && let Some(block) = root.target_block(field, user)?
  {
    declared = block.get_str(PROP_COMPILE_MULTILIB).filter(|m| !m.is_empty());
  }

  let mut multilib = declared
    .or_else(|| {
      common
        .and_then(|c| c.values().get_str(PROP_COMPILE_MULTILIB))
        .filter(|m| !m.is_empty())
    })
    .unwrap_or(module.default_multilib())
    .to_string();

  if ignore_prefer32 && os.class() == OsClass::Device && (multilib == "prefer32" || multilib == "first_prefer32") {
    multilib = "first".to_string();
  }

  if module.use_target_variants() {
    if os == OsType::Darwin && multilib != "common" && multilib != "32" {
      multilib = if multilib == "common_first" {
        "darwin_universal_common_first".to_string()
      } else {
        "darwin_universal".to_string()
      };
    }
    Ok((multilib, String::new()))
  } else {
    // One variant handles every selected arch; the declared policy picks the extra targets
    if multilib == module.default_multilib() {
      multilib = "first".to_string();
    }
    Ok((module.default_multilib().to_string(), multilib))
  }
}

/// Select the targets a multilib policy covers, in variant order.
pub fn decode_multilib_targets(multilib: &str, targets: &[Target], prefer32: bool) -> Result<Vec<Target>, MultilibError> {
  let first_order: &[Multilib] = if prefer32 {
    &[Multilib::Lib32, Multilib::Lib64]
  } else {
    &[Multilib::Lib64, Multilib::Lib32]
  };

  let selected = match multilib {
    "common" => common_targets(targets),
    "common_first" => {
      let mut selected = common_targets(targets);
      selected.extend(first_target(targets, first_order));
      selected
    }
    "both" => first_order
      .iter()
      .flat_map(|class| filter_multilib_targets(targets, *class))
      .collect(),
    "32" => filter_multilib_targets(targets, Multilib::Lib32),
    "64" => filter_multilib_targets(targets, Multilib::Lib64),
    "first" => first_target(targets, first_order),
    "first_prefer32" => first_target(targets, &[Multilib::Lib32, Multilib::Lib64]),
    "prefer32" => {
      let lib32 = filter_multilib_targets(targets, Multilib::Lib32);
      if lib32.is_empty() {
        filter_multilib_targets(targets, Multilib::Lib64)
      } else {
        lib32
      }
    }
    // Reversed so the first arch variant can depend on the second
    "darwin_universal" => filter_multilib_targets(targets, Multilib::Lib64).into_iter().rev().collect(),
    "darwin_universal_common_first" => {
      let mut selected = common_targets(targets);
      selected.extend(filter_multilib_targets(targets, Multilib::Lib64).into_iter().rev());
      selected
    }
    other => return Err(MultilibError::Invalid(other.to_string())),
  };
  Ok(selected)
}
