//! Field names of the per-axis blocks: one per arch type (with nested
//! variant, cpu variant, and feature sub-blocks), one per multilib class,
//! and one per target axis value.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::LazyLock;

use crate::platform::{ArchType, Multilib, OsClass, OsType, arch_list};

/// Convert a variant or feature name into a block field name.
///
/// `cortex-a53.a57` becomes `Cortex_a53_a57`.
pub fn variant_field(name: &str) -> String {
  let replaced = name.replace(['-', '.'], "_");
  let mut chars = replaced.chars();
  match chars.next() {
    Some(first) => first.to_uppercase().chain(chars).collect(),
    None => String::new(),
  }
}

/// Target fields that don't name an OS
pub const FIXED_TARGET_FIELDS: [&str; 12] = [
  "Host",
  "Android64",
  "Android32",
  "Bionic",
  "Glibc",
  "Musl",
  "Linux",
  "Host_linux",
  "Not_windows",
  "Arm_on_x86",
  "Arm_on_x86_64",
  "Native_bridge",
];

#[derive(Debug)]
pub struct AxisLayout {
  /// Sub-block fields per arch type, in arch variant, cpu variant, feature order
  pub arch: BTreeMap<ArchType, Vec<String>>,
  pub multilib: [Multilib; 2],
  pub target: Vec<String>,
}

impl AxisLayout {
  pub fn arch_sub_fields(&self, arch: ArchType) -> &[String] {
    self.arch.get(&arch).map(Vec::as_slice).unwrap_or_default()
  }

  pub fn has_target_field(&self, field: &str) -> bool {
    self.target.iter().any(|f| f == field)
  }

  /// Map a declared (lowercase) block key to its target field
  pub fn target_field_for_key(&self, key: &str) -> Option<&str> {
    self
      .target
      .iter()
      .find(|f| f.eq_ignore_ascii_case(key))
      .map(String::as_str)
  }

  /// Map a declared (lowercase) sub-block key of an arch block to its field
  pub fn arch_sub_field_for_key(&self, arch: ArchType, key: &str) -> Option<&str> {
    self
      .arch_sub_fields(arch)
      .iter()
      .find(|f| f.eq_ignore_ascii_case(key))
      .map(String::as_str)
  }
}

fn build_layout() -> AxisLayout {
  let arch = ArchType::ALL
    .into_iter()
    .map(|arch_type| {
      let mut seen = BTreeSet::new();
      let fields = arch_list::arch_variants(arch_type)
        .iter()
        .chain(arch_list::cpu_variants(arch_type))
        .chain(arch_list::arch_features(arch_type))
        .map(|name| variant_field(name))
        .filter(|field| seen.insert(field.clone()))
        .collect();
      (arch_type, fields)
    })
    .collect();

  let mut target: Vec<String> = FIXED_TARGET_FIELDS.iter().map(|f| f.to_string()).collect();
  for os in OsType::ALL {
    target.push(os.field().to_string());
    for arch in os.arch_types() {
      target.push(format!("{}_{}", os.field(), arch));
      if os.linux() {
        target.push(format!("Linux_{}", arch));
        if os.class() == OsClass::Host {
          target.push(format!("Host_linux_{}", arch));
        }
      }
      if os.bionic() {
        target.push(format!("Bionic_{}", arch));
      }
      match os {
        OsType::LinuxGlibc => target.push(format!("Glibc_{}", arch)),
        OsType::LinuxMusl => target.push(format!("Musl_{}", arch)),
        _ => {}
      }
    }
  }
  let mut seen = BTreeSet::new();
  target.retain(|field| seen.insert(field.clone()));

  AxisLayout {
    arch,
    multilib: [Multilib::Lib32, Multilib::Lib64],
    target,
  }
}

static LAYOUT: LazyLock<AxisLayout> = LazyLock::new(build_layout);

/// The process-wide axis layout; a pure function of the static arch tables.
pub fn axis_layout() -> &'static AxisLayout {
  &LAYOUT
}
