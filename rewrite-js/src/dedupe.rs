use crate::discover::Discovery;
use crate::discover::UnitKind;
use crate::edit::SourceEditor;
use ahash::HashMap;
use parse_js::loc::Loc;

/// Collapses duplicate top-level declarations: whenever two sibling units
/// (function, class, var declarator, or a synthesized export-group name)
/// declare the same name, only the last survives. Merged bundles routinely
/// produce such siblings; runtimes reject the redeclaration.
pub(crate) fn resolve_duplicates(discovery: &mut Discovery, editor: &mut SourceEditor) {
  let mut last_by_name: HashMap<&str, usize> = HashMap::default();
  for (id, unit) in discovery.units.iter().enumerate() {
    for name in &unit.names {
      last_by_name.insert(name, id);
    }
  }

  // A unit is discarded when any of its names was re-declared later. For a
  // destructuring declarator this drops the whole declarator, matching how
  // bundlers duplicate declarations wholesale.
  let discarded: Vec<bool> = discovery
    .units
    .iter()
    .enumerate()
    .map(|(id, unit)| unit.names.iter().any(|name| last_by_name[name.as_str()] != id))
    .collect();
  if !discarded.contains(&true) {
    return;
  }

  // Discarded declarators grouped per var statement for comma-aware
  // surgery; everything else edits directly.
  let mut dropped_declarators: HashMap<usize, Vec<usize>> = HashMap::default();
  for (id, unit) in discovery.units.iter().enumerate() {
    if !discarded[id] {
      continue;
    }
    match unit.kind {
      UnitKind::WholeStmt(span) => editor.remove_statement(span),
      UnitKind::VarDeclarator { var_stmt, index } => {
        dropped_declarators.entry(var_stmt).or_default().push(index);
      }
      UnitKind::GroupEntry { export, index } => {
        discovery.exports[export].group[index].discarded = true;
      }
    }
  }

  let mut stmts: Vec<_> = dropped_declarators.into_iter().collect();
  stmts.sort_by_key(|(var_stmt, _)| *var_stmt);
  for (var_stmt, mut dropped) in stmts {
    dropped.sort_unstable();
    let info = &discovery.var_stmts[var_stmt];
    if dropped.len() == info.declarator_spans.len() {
      editor.remove_statement(info.span);
      continue;
    }
    remove_declarators(&info.declarator_spans, &dropped, editor);
  }
}

// Removes individual declarators from a multi-declarator statement. A
// dropped declarator that precedes a survivor is cut up to the survivor's
// start (taking its comma with it); a dropped tail is cut back to the last
// survivor's end.
fn remove_declarators(spans: &[Loc], dropped: &[usize], editor: &mut SourceEditor) {
  let is_dropped = |i: usize| dropped.binary_search(&i).is_ok();
  let mut i = 0;
  while i < spans.len() {
    if !is_dropped(i) {
      i += 1;
      continue;
    }
    let run_start = i;
    while i < spans.len() && is_dropped(i) {
      i += 1;
    }
    if i < spans.len() {
      editor.remove(Loc(spans[run_start].0, spans[i].0));
    } else {
      // Tail run: every earlier declarator survives by construction of the
      // whole-statement fast path, so run_start > 0 here.
      let prev_end = spans[run_start - 1].1;
      editor.remove(Loc(prev_end, spans[run_start..].last().unwrap().1));
    }
  }
}
