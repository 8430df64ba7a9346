use crate::error::ScanError;
use ahash::HashMap;
use serde::Deserialize;
use serde::Serialize;
use serde::Serializer;

/// A resolved tracked dependency. Created once by the scanner, never
/// mutated after insertion into the catalog.
#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BindingRecord {
  /// Canonical module specifier, e.g. `vue`.
  pub name: String,
  pub version: String,
  /// Path of the distributable inside the package.
  pub relative_module: String,
  /// The global identifier the distributable introduces.
  pub global: String,
  /// Exported binding names, unique, in discovery order. Discovery order is
  /// the property creation order of the global's value, which keeps
  /// wildcard expansion stable across runs.
  pub bindings: Vec<String>,
  pub aliases: Vec<String>,
  pub spare: Vec<String>,
}

impl BindingRecord {
  pub fn has_binding(&self, name: &str) -> bool {
    self.bindings.iter().any(|b| b == name)
  }
}

/// The complete, read-only specifier-to-record mapping for one build.
/// Every alias sub-path indexes to the same record as its canonical
/// specifier. Absence of a key means "do not touch this import/export".
#[derive(Clone, Debug, Default)]
pub struct Catalog {
  records: Vec<BindingRecord>,
  // Specifier (canonical or alias) -> index into `records`.
  index: HashMap<String, usize>,
  // Key insertion order, for deterministic iteration.
  keys: Vec<String>,
}

impl Catalog {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn from_records(
    records: impl IntoIterator<Item = BindingRecord>,
  ) -> Result<Self, ScanError> {
    let mut catalog = Catalog::new();
    for record in records {
      catalog.insert(record)?;
    }
    Ok(catalog)
  }

  pub(crate) fn insert(&mut self, record: BindingRecord) -> Result<(), ScanError> {
    if let Some(existing) = self.records.iter().find(|r| r.global == record.global) {
      return Err(ScanError::CatalogAmbiguity {
        global: record.global.clone(),
        first: existing.name.clone(),
        second: record.name.clone(),
      });
    }
    let idx = self.records.len();
    let mut keys = Vec::with_capacity(1 + record.aliases.len());
    keys.push(record.name.clone());
    for alias in &record.aliases {
      keys.push(format!("{}/{}", record.name, alias));
    }
    for key in keys {
      if let Some(&taken) = self.index.get(&key) {
        return Err(ScanError::SpecifierCollision {
          key,
          first: self.records[taken].name.clone(),
          second: record.name.clone(),
        });
      }
      self.index.insert(key.clone(), idx);
      self.keys.push(key);
    }
    self.records.push(record);
    Ok(())
  }

  pub fn lookup(&self, specifier: &str) -> Option<&BindingRecord> {
    self.index.get(specifier).map(|&idx| &self.records[idx])
  }

  /// Every specifier the catalog answers for (canonical names and alias
  /// sub-paths), in insertion order.
  pub fn keys(&self) -> impl Iterator<Item = &str> {
    self.keys.iter().map(|k| k.as_str())
  }

  pub fn records(&self) -> impl Iterator<Item = &BindingRecord> {
    self.records.iter()
  }

  pub fn len(&self) -> usize {
    self.records.len()
  }

  pub fn is_empty(&self) -> bool {
    self.records.is_empty()
  }
}

impl Serialize for Catalog {
  fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
    self.records.serialize(serializer)
  }
}

#[cfg(test)]
mod tests {
  use super::BindingRecord;
  use super::Catalog;
  use crate::error::ScanError;

  fn record(name: &str, global: &str, aliases: &[&str]) -> BindingRecord {
    BindingRecord {
      name: name.to_string(),
      version: "1.0.0".to_string(),
      relative_module: "dist/index.js".to_string(),
      global: global.to_string(),
      bindings: vec!["ref".to_string(), "version".to_string()],
      aliases: aliases.iter().map(|a| a.to_string()).collect(),
      spare: Vec::new(),
    }
  }

  #[test]
  fn aliases_resolve_to_the_canonical_record() {
    let catalog = Catalog::from_records([record("vue", "Vue", &["dist"])]).unwrap();
    let direct = catalog.lookup("vue").unwrap();
    let aliased = catalog.lookup("vue/dist").unwrap();
    assert_eq!(direct.global, "Vue");
    assert_eq!(aliased.global, "Vue");
    assert!(catalog.lookup("vuex").is_none());
  }

  #[test]
  fn shared_global_is_ambiguous() {
    let err = Catalog::from_records([record("vue", "Vue", &[]), record("vue-lite", "Vue", &[])])
      .unwrap_err();
    assert!(matches!(err, ScanError::CatalogAmbiguity { .. }));
  }

  #[test]
  fn colliding_specifiers_are_rejected() {
    let err = Catalog::from_records([record("vue", "Vue", &["dist"]), {
      let mut r = record("vue/dist", "VueDist", &[]);
      r.bindings.clear();
      r
    }])
    .unwrap_err();
    assert!(matches!(err, ScanError::SpecifierCollision { .. }));
  }

  #[test]
  fn keys_iterate_in_insertion_order() {
    let catalog =
      Catalog::from_records([record("vue", "Vue", &["dist"]), record("pinia", "Pinia", &[])])
        .unwrap();
    let keys: Vec<&str> = catalog.keys().collect();
    assert_eq!(keys, vec!["vue", "vue/dist", "pinia"]);
  }
}
