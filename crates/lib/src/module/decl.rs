//! JSON module declarations.
//!
//! ```json
//! {
//!   "shapes": {"compiler": {"fields": [{"name": "cflags", "kind": "string_list", "tags": ["arch_variant"]}]}},
//!   "modules": [
//!     {"name": "libfoo", "supported": "host_and_device", "shapes": ["compiler"],
//!      "properties": {"cflags": ["-Wall"], "arch": {"arm": {"cflags": ["-marm"]}}}}
//!   ]
//! }
//! ```

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::{HostOrDeviceSupported, ImageVariation, Module, ModuleError, ModuleKind};
use crate::props::PropertyShape;

fn default_true() -> bool {
  true
}

fn default_multilib() -> String {
  "both".to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ModuleDecl {
  pub name: String,
  #[serde(default)]
  pub kind: ModuleKind,
  #[serde(default = "default_true")]
  pub arch_specific: bool,
  #[serde(default)]
  pub supported: HostOrDeviceSupported,
  #[serde(default = "default_multilib")]
  pub default_multilib: String,
  #[serde(default = "default_true")]
  pub use_target_variants: bool,
  #[serde(default)]
  pub create_common_os_variant: bool,
  #[serde(default)]
  pub native_bridge_supported: bool,
  #[serde(default)]
  pub image: ImageVariation,
  #[serde(default)]
  pub deps: Vec<String>,
  /// Names of shapes from the file's shape table
  #[serde(default)]
  pub shapes: Vec<String>,
  #[serde(default)]
  pub properties: Map<String, Value>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ModuleFile {
  #[serde(default)]
  pub shapes: BTreeMap<String, PropertyShape>,
  #[serde(default)]
  pub modules: Vec<ModuleDecl>,
}

impl ModuleDecl {
  /// Build the module, resolving shape names against `shapes`.
  pub fn into_module(self, shapes: &BTreeMap<String, Arc<PropertyShape>>) -> Result<Module, ModuleError> {
    let name = self.name.clone();
    self.build(shapes).map_err(|source| ModuleError::Declaration {
      module: name,
      source: Box::new(source),
    })
  }

  fn build(self, shapes: &BTreeMap<String, Arc<PropertyShape>>) -> Result<Module, ModuleError> {
    let mut module = match self.kind {
      ModuleKind::Bootstrap => Module::bootstrap(&self.name),
      ModuleKind::Foreign => Module::foreign(&self.name),
      ModuleKind::Soong if self.arch_specific => Module::new_arch(&self.name, self.supported, self.default_multilib)?,
      ModuleKind::Soong => Module::new(&self.name),
    };
    module
      .set_use_target_variants(self.use_target_variants)
      .set_create_common_os_variant(self.create_common_os_variant)
      .set_native_bridge_supported(self.native_bridge_supported)
      .set_image(self.image);

    for shape_name in &self.shapes {
      let shape = shapes
        .get(shape_name)
        .ok_or_else(|| ModuleError::UnknownShape(shape_name.clone()))?;
      module.add_properties(Arc::clone(shape))?;
    }
    module.decode_properties(&self.properties)?;
    Ok(module.with_deps(self.deps))
  }
}

/// Parse a module file into modules, in declaration order.
pub fn parse_modules(content: &str) -> Result<Vec<Module>, ModuleError> {
  let file: ModuleFile = serde_json::from_str(content).map_err(|e| ModuleError::Parse(e.to_string()))?;
  let shapes: BTreeMap<String, Arc<PropertyShape>> =
    file.shapes.into_iter().map(|(name, shape)| (name, Arc::new(shape))).collect();
  file.modules.into_iter().map(|decl| decl.into_module(&shapes)).collect()
}

pub fn load_modules(path: &Path) -> Result<Vec<Module>, ModuleError> {
  let content = fs::read_to_string(path).map_err(|e| ModuleError::Read {
    path: path.display().to_string(),
    message: e.to_string(),
  })?;
  parse_modules(&content)
}
