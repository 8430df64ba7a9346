use crate::error::ProbeFailureReason;
use ahash::HashSet;
use boa_engine::object::JsObject;
use boa_engine::property::PropertyKey;
use boa_engine::Context;
use boa_engine::JsString;
use boa_engine::Source;

/// What one probe observed: the global identifier the distributable
/// introduced and the binding names exposed on it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DiscoveredGlobal {
  pub global: String,
  pub bindings: Vec<String>,
}

/// Executes a distributable bundle in a fresh context and reports the
/// global it introduces.
///
/// The context carries only ECMAScript builtins: no `module`, `exports`,
/// `require` or `define`, so UMD wrappers take their global-assignment
/// branch, and no caller state can leak in or out. Evaluation errors are
/// captured, not propagated: a bundle that throws after installing its
/// global still counts, one that throws before does not.
///
/// When several globals appear the most recently introduced wins: string
/// keys enumerate in creation order, so the last unseen key is the latest
/// write. A deliberate simplification.
pub fn probe(
  source: &str,
  declared_global: Option<&str>,
) -> Result<DiscoveredGlobal, ProbeFailureReason> {
  let mut context = Context::default();
  let baseline = global_names(&mut context)?;
  let eval_error = context
    .eval(Source::from_bytes(source.as_bytes()))
    .err()
    .map(|err| err.to_string());
  let after = global_names(&mut context)?;

  let seen: HashSet<&str> = baseline.iter().map(|n| n.as_str()).collect();
  let fresh: Vec<&String> = after.iter().filter(|n| !seen.contains(n.as_str())).collect();

  let global = match declared_global {
    Some(name) => name.to_string(),
    None => match fresh.last() {
      Some(name) => (*name).clone(),
      None => {
        return Err(match eval_error {
          Some(reason) => ProbeFailureReason::Eval(reason),
          None => ProbeFailureReason::NoGlobalProduced,
        });
      }
    },
  };

  let key = PropertyKey::from(JsString::from(global.as_str()));
  let value = context
    .global_object()
    .get(key, &mut context)
    .map_err(|err| ProbeFailureReason::Eval(err.to_string()))?;
  if value.is_undefined() {
    return Err(ProbeFailureReason::GlobalMissing(global));
  }
  let bindings = match value.as_object() {
    Some(object) => string_keys(object, &mut context)?,
    // A primitive export surface (e.g. a bare function returning nothing
    // enumerable) simply has no named bindings.
    None => Vec::new(),
  };
  Ok(DiscoveredGlobal { global, bindings })
}

fn global_names(context: &mut Context) -> Result<Vec<String>, ProbeFailureReason> {
  let global = context.global_object();
  string_keys(&global, context)
}

fn string_keys(object: &JsObject, context: &mut Context) -> Result<Vec<String>, ProbeFailureReason> {
  let keys = object
    .own_property_keys(context)
    .map_err(|err| ProbeFailureReason::Eval(err.to_string()))?;
  Ok(
    keys
      .into_iter()
      .filter_map(|key| match key {
        PropertyKey::String(name) => Some(name.to_std_string_escaped()),
        _ => None,
      })
      .collect(),
  )
}

#[cfg(test)]
mod tests {
  use super::probe;
  use crate::error::ProbeFailureReason;

  #[test]
  fn discovers_an_iife_global_and_its_bindings() {
    let source = "var Vue = (function () { return { ref: function () {}, version: '3.0.0' }; })();";
    let found = probe(source, None).unwrap();
    assert_eq!(found.global, "Vue");
    assert_eq!(found.bindings, vec!["ref".to_string(), "version".to_string()]);
  }

  #[test]
  fn umd_style_assignment_on_global_this() {
    let source = "(function (root) { root.Dayjs = { extend: function () {} }; })(globalThis);";
    let found = probe(source, None).unwrap();
    assert_eq!(found.global, "Dayjs");
    assert_eq!(found.bindings, vec!["extend".to_string()]);
  }

  #[test]
  fn most_recent_global_wins() {
    let source = "var First = { a: 1 }; var Second = { b: 2 };";
    let found = probe(source, None).unwrap();
    assert_eq!(found.global, "Second");
  }

  #[test]
  fn no_global_is_a_failure_not_a_panic() {
    let err = probe("(function () { var local = 1; })();", None).unwrap_err();
    assert_eq!(err, ProbeFailureReason::NoGlobalProduced);
  }

  #[test]
  fn throw_before_assignment_fails() {
    let err = probe("throw new Error('broken bundle');", None).unwrap_err();
    assert!(matches!(err, ProbeFailureReason::Eval(_)));
  }

  #[test]
  fn throw_after_assignment_still_counts() {
    let source = "var Lib = { go: function () {} }; throw new Error('late');";
    let found = probe(source, None).unwrap();
    assert_eq!(found.global, "Lib");
  }

  #[test]
  fn declared_override_skips_discovery_but_must_exist() {
    let source = "var A = { x: 1 }; var B = { y: 2 };";
    let found = probe(source, Some("A")).unwrap();
    assert_eq!(found.global, "A");
    assert_eq!(found.bindings, vec!["x".to_string()]);

    let err = probe("var A = 1;", Some("Missing")).unwrap_err();
    assert_eq!(err, ProbeFailureReason::GlobalMissing("Missing".to_string()));
  }

  #[test]
  fn probes_are_isolated_from_each_other() {
    probe("var Shared = { a: 1 };", None).unwrap();
    let err = probe("var x = typeof Shared;", None);
    // `x` itself becomes the only new global; `Shared` must be gone.
    let found = err.unwrap();
    assert_eq!(found.global, "x");
  }
}
