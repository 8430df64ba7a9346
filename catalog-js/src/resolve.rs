use crate::descriptor::ModuleDescriptor;
use crate::error::ProbeFailureReason;
use std::fs;
use std::path::Path;
use std::path::PathBuf;

#[derive(Debug)]
pub(crate) struct ResolvedEntry {
  pub version: String,
  pub relative_module: String,
  pub source: String,
}

/// Locates the descriptor's package under `node_modules` (walking up from
/// `root` like module resolution does) and reads its distributable entry.
/// The entry is the configured `relativeModule` when present, otherwise
/// the first of the `jsdelivr`, `unpkg`, `browser`, `main` fields of
/// `package.json`.
pub(crate) fn resolve_entry(
  root: &Path,
  descriptor: &ModuleDescriptor,
) -> Result<ResolvedEntry, ProbeFailureReason> {
  let package_dir =
    locate_package(root, &descriptor.name).ok_or(ProbeFailureReason::PackageNotFound)?;
  let manifest_raw = fs::read_to_string(package_dir.join("package.json"))
    .map_err(|_| ProbeFailureReason::PackageNotFound)?;
  let manifest: serde_json::Value = serde_json::from_str(&manifest_raw)
    .map_err(|err| ProbeFailureReason::EntryUnreadable(err.to_string()))?;

  let version = manifest
    .get("version")
    .and_then(|v| v.as_str())
    .unwrap_or_default()
    .to_string();
  let relative_module = match &descriptor.relative_module {
    Some(relative) => relative.clone(),
    None => distributable_field(&manifest).ok_or(ProbeFailureReason::MissingEntryField)?,
  };
  let source = fs::read_to_string(package_dir.join(&relative_module))
    .map_err(|err| ProbeFailureReason::EntryUnreadable(err.to_string()))?;
  Ok(ResolvedEntry {
    version,
    relative_module,
    source,
  })
}

fn distributable_field(manifest: &serde_json::Value) -> Option<String> {
  for field in ["jsdelivr", "unpkg", "browser", "main"] {
    // `browser` may be a remap object; only the plain string form names an
    // entry file.
    if let Some(value) = manifest.get(field).and_then(|v| v.as_str()) {
      return Some(value.to_string());
    }
  }
  None
}

fn locate_package(root: &Path, name: &str) -> Option<PathBuf> {
  let mut dir = Some(root);
  while let Some(current) = dir {
    let candidate = current.join("node_modules").join(name);
    if candidate.join("package.json").is_file() {
      return Some(candidate);
    }
    dir = current.parent();
  }
  None
}

#[cfg(test)]
mod tests {
  use super::resolve_entry;
  use crate::descriptor::TrackedModule;
  use crate::error::ProbeFailureReason;
  use std::fs;
  use std::path::PathBuf;

  fn fixture_root(tag: &str) -> PathBuf {
    let root = std::env::temp_dir().join(format!("catalog-js-resolve-{}-{}", tag, std::process::id()));
    let _ = fs::remove_dir_all(&root);
    root
  }

  fn write_package(root: &PathBuf, name: &str, manifest: &str, entry: Option<(&str, &str)>) {
    let dir = root.join("node_modules").join(name);
    fs::create_dir_all(&dir).unwrap();
    fs::write(dir.join("package.json"), manifest).unwrap();
    if let Some((path, source)) = entry {
      if let Some(parent) = dir.join(path).parent() {
        fs::create_dir_all(parent).unwrap();
      }
      fs::write(dir.join(path), source).unwrap();
    }
  }

  #[test]
  fn reads_the_first_distributable_field() {
    let root = fixture_root("fields");
    write_package(
      &root,
      "vue",
      r#"{"version": "3.4.0", "unpkg": "dist/vue.global.js", "main": "index.js"}"#,
      Some(("dist/vue.global.js", "var Vue = {};")),
    );
    let descriptor = TrackedModule::from("vue").normalize();
    let entry = resolve_entry(&root, &descriptor).unwrap();
    assert_eq!(entry.version, "3.4.0");
    assert_eq!(entry.relative_module, "dist/vue.global.js");
    assert_eq!(entry.source, "var Vue = {};");
    let _ = fs::remove_dir_all(&root);
  }

  #[test]
  fn walks_up_to_parent_node_modules() {
    let root = fixture_root("walk");
    write_package(
      &root,
      "dayjs",
      r#"{"version": "1.11.0", "main": "dayjs.min.js"}"#,
      Some(("dayjs.min.js", "var dayjs = function () {};")),
    );
    let nested = root.join("packages").join("app");
    fs::create_dir_all(&nested).unwrap();
    let descriptor = TrackedModule::from("dayjs").normalize();
    let entry = resolve_entry(&nested, &descriptor).unwrap();
    assert_eq!(entry.relative_module, "dayjs.min.js");
    let _ = fs::remove_dir_all(&root);
  }

  #[test]
  fn missing_package_and_missing_entry_fail_distinctly() {
    let root = fixture_root("missing");
    fs::create_dir_all(&root).unwrap();
    let absent = TrackedModule::from("ghost").normalize();
    assert_eq!(
      resolve_entry(&root, &absent).unwrap_err(),
      ProbeFailureReason::PackageNotFound
    );

    write_package(&root, "bare", r#"{"version": "0.1.0"}"#, None);
    let bare = TrackedModule::from("bare").normalize();
    assert_eq!(
      resolve_entry(&root, &bare).unwrap_err(),
      ProbeFailureReason::MissingEntryField
    );
    let _ = fs::remove_dir_all(&root);
  }
}
