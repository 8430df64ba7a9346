use serde::Deserialize;
use serde::Serialize;

/// A dependency configured for externalization, as the host hands it to us.
/// Accepts both the terse and the structured form:
///
/// ```json
/// ["vue", { "name": "react", "relativeModule": "umd/react.production.min.js" }]
/// ```
#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(untagged)]
pub enum TrackedModule {
  Bare(String),
  Detailed(DetailedModule),
}

#[derive(Clone, Debug, Default, Deserialize, Serialize)]
#[serde(default, rename_all = "camelCase")]
pub struct DetailedModule {
  /// Module specifier, e.g. `vue`.
  pub name: String,
  /// Explicit global identifier. When set, discovery is skipped and the
  /// probe only verifies the global exists so its bindings can be read.
  pub global: Option<String>,
  /// Alternate import sub-paths that resolve to the same record, e.g.
  /// `dist` to also capture `vue/dist`.
  pub aliases: Vec<String>,
  /// Path of the distributable inside the package, overriding whatever
  /// `package.json` declares.
  pub relative_module: Option<String>,
  /// Extra asset references (stylesheets etc.) carried through to the
  /// record for downstream tag formatters.
  pub spare: Vec<String>,
}

impl From<&str> for TrackedModule {
  fn from(name: &str) -> Self {
    TrackedModule::Bare(name.to_string())
  }
}

impl From<String> for TrackedModule {
  fn from(name: String) -> Self {
    TrackedModule::Bare(name)
  }
}

impl From<DetailedModule> for TrackedModule {
  fn from(detailed: DetailedModule) -> Self {
    TrackedModule::Detailed(detailed)
  }
}

/// The uniform shape every TrackedModule normalizes to before scanning.
#[derive(Clone, Debug)]
pub struct ModuleDescriptor {
  pub name: String,
  pub global_override: Option<String>,
  pub aliases: Vec<String>,
  pub relative_module: Option<String>,
  pub spare: Vec<String>,
}

impl TrackedModule {
  pub fn normalize(self) -> ModuleDescriptor {
    match self {
      TrackedModule::Bare(name) => ModuleDescriptor {
        name,
        global_override: None,
        aliases: Vec::new(),
        relative_module: None,
        spare: Vec::new(),
      },
      TrackedModule::Detailed(detailed) => ModuleDescriptor {
        name: detailed.name,
        global_override: detailed.global,
        aliases: detailed.aliases,
        relative_module: detailed.relative_module,
        spare: detailed.spare,
      },
    }
  }
}

#[cfg(test)]
mod tests {
  use super::TrackedModule;

  #[test]
  fn bare_and_detailed_forms_deserialize() {
    let raw = r#"["vue", {"name": "react", "global": "React", "aliases": ["umd"]}]"#;
    let modules: Vec<TrackedModule> = serde_json::from_str(raw).unwrap();
    let vue = modules[0].clone().normalize();
    assert_eq!(vue.name, "vue");
    assert_eq!(vue.global_override, None);
    let react = modules[1].clone().normalize();
    assert_eq!(react.name, "react");
    assert_eq!(react.global_override.as_deref(), Some("React"));
    assert_eq!(react.aliases, vec!["umd".to_string()]);
  }

  #[test]
  fn omitted_fields_default() {
    let raw = r#"{"name": "lodash"}"#;
    let module: TrackedModule = serde_json::from_str(raw).unwrap();
    let lodash = module.normalize();
    assert_eq!(lodash.name, "lodash");
    assert!(lodash.aliases.is_empty());
    assert!(lodash.relative_module.is_none());
    assert!(lodash.spare.is_empty());
  }
}
