use crate::edit::SourceEditor;
use ahash::HashMap;
use catalog_js::BindingRecord;
use catalog_js::Catalog;
use parse_js::ast::expr::pat::Pat;
use parse_js::ast::import_export::ExportNames;
use parse_js::ast::import_export::ImportNames;
use parse_js::ast::import_export::ModuleExportImportName;
use parse_js::ast::node::Node;
use parse_js::ast::stmt::decl::PatDecl;
use parse_js::ast::stmt::decl::VarDeclarator;
use parse_js::ast::stmt::Stmt;
use parse_js::ast::stx::TopLevel;
use parse_js::loc::Loc;
use tracing::debug;

/// How a local binding maps onto the externalized dependency's global.
#[derive(Clone, Debug)]
pub(crate) enum GlobalAccess {
  /// Default and namespace imports bind the global itself.
  Whole,
  /// Named imports bind one member of it.
  Member(String),
}

#[derive(Clone, Debug)]
pub(crate) struct GlobalRef {
  pub global: String,
  pub access: GlobalAccess,
}

impl GlobalRef {
  fn whole(global: &str) -> Self {
    GlobalRef {
      global: global.to_string(),
      access: GlobalAccess::Whole,
    }
  }

  fn member(global: &str, name: &str) -> Self {
    GlobalRef {
      global: global.to_string(),
      access: GlobalAccess::Member(name.to_string()),
    }
  }

  pub fn expr(&self) -> String {
    match &self.access {
      GlobalAccess::Whole => self.global.clone(),
      GlobalAccess::Member(name) => member_expr(&self.global, name),
    }
  }
}

/// Local binding name -> global-qualified expression. Built during
/// discovery, consumed during substitution, discarded with the file.
pub(crate) type ReferenceTable = HashMap<String, GlobalRef>;

/// One export statement scheduled for restructuring. Rendered only after
/// duplicate resolution, which may filter group entries.
pub(crate) struct ExportRewrite {
  pub span: Loc,
  /// Specifiers kept as an ordinary `export { a, b };`.
  pub natives: Vec<String>,
  /// Names becoming one grouped `export var n = G.n, m = G.m;`.
  pub group: Vec<GroupEntry>,
  /// Expressions becoming `export default expr;`.
  pub defaults: Vec<String>,
}

pub(crate) struct GroupEntry {
  pub name: String,
  pub init: String,
  pub discarded: bool,
}

/// A top-level declaring unit, in source order. Duplicate resolution keeps
/// only the last unit per name.
pub(crate) struct DeclUnit {
  pub names: Vec<String>,
  pub kind: UnitKind,
}

pub(crate) enum UnitKind {
  /// Function or class declaration: discarded whole.
  WholeStmt(Loc),
  /// One declarator of a var statement: discarded comma-aware.
  VarDeclarator { var_stmt: usize, index: usize },
  /// One name of a synthesized export group: filtered before rendering.
  GroupEntry { export: usize, index: usize },
}

pub(crate) struct VarStmt {
  pub span: Loc,
  pub declarator_spans: Vec<Loc>,
}

pub(crate) struct Discovery {
  pub refs: ReferenceTable,
  /// Indices of tracked import statements, detached from the AST before
  /// scope analysis so their bindings stop existing.
  pub detach: Vec<usize>,
  pub exports: Vec<ExportRewrite>,
  pub units: Vec<DeclUnit>,
  pub var_stmts: Vec<VarStmt>,
}

/// Pass 1. Imports are read first (they hoist), then exports and top-level
/// declarations in statement order.
pub(crate) fn discover(
  top: &Node<TopLevel>,
  catalog: &Catalog,
  editor: &mut SourceEditor,
) -> Discovery {
  let mut discovery = Discovery {
    refs: ReferenceTable::default(),
    detach: Vec::new(),
    exports: Vec::new(),
    units: Vec::new(),
    var_stmts: Vec::new(),
  };

  for (index, stmt) in top.stx.body.iter().enumerate() {
    if let Stmt::Import(import) = stmt.stx.as_ref() {
      if import.stx.type_only {
        continue;
      }
      let Some(record) = catalog.lookup(&import.stx.module) else {
        continue;
      };
      scan_import(&import.stx, record, &mut discovery.refs);
      editor.remove_statement(stmt.loc);
      discovery.detach.push(index);
    }
  }

  for stmt in &top.stx.body {
    match stmt.stx.as_ref() {
      Stmt::ExportList(list) => {
        if list.stx.type_only {
          continue;
        }
        match &list.stx.from {
          Some(from) => {
            if let Some(record) = catalog.lookup(from) {
              scan_reexport(stmt.loc, &list.stx.names, record, &mut discovery);
            }
          }
          None => scan_local_export(stmt.loc, &list.stx.names, &mut discovery),
        }
      }
      Stmt::FunctionDecl(func) => {
        if let Some(name) = &func.stx.name {
          discovery.units.push(DeclUnit {
            names: vec![name.stx.name.clone()],
            kind: UnitKind::WholeStmt(stmt.loc),
          });
        }
      }
      Stmt::ClassDecl(class) => {
        if let Some(name) = &class.stx.name {
          discovery.units.push(DeclUnit {
            names: vec![name.stx.name.clone()],
            kind: UnitKind::WholeStmt(stmt.loc),
          });
        }
      }
      Stmt::VarDecl(var) => {
        let var_stmt = discovery.var_stmts.len();
        let mut declarator_spans = Vec::with_capacity(var.stx.declarators.len());
        for (index, declarator) in var.stx.declarators.iter().enumerate() {
          declarator_spans.push(declarator_span(declarator));
          let mut names = Vec::new();
          pat_names(&declarator.pattern.stx.pat, &mut names);
          discovery.units.push(DeclUnit {
            names,
            kind: UnitKind::VarDeclarator { var_stmt, index },
          });
        }
        discovery.var_stmts.push(VarStmt {
          span: stmt.loc,
          declarator_spans,
        });
      }
      _ => {}
    }
  }

  discovery
}

fn scan_import(
  import: &parse_js::ast::stmt::ImportStmt,
  record: &BindingRecord,
  refs: &mut ReferenceTable,
) {
  if let Some(default) = &import.default {
    if let Some(name) = pat_decl_id_name(default) {
      refs.insert(name, GlobalRef::whole(&record.global));
    }
  }
  match &import.names {
    Some(ImportNames::All(alias)) => {
      if let Some(name) = pat_decl_id_name(alias) {
        refs.insert(name, GlobalRef::whole(&record.global));
      }
    }
    Some(ImportNames::Specific(names)) => {
      for name in names {
        if name.stx.type_only {
          continue;
        }
        let Some(local) = pat_decl_id_name(&name.stx.alias) else {
          continue;
        };
        let imported = name.stx.importable.as_str();
        let global_ref = if imported == "default" {
          GlobalRef::whole(&record.global)
        } else {
          GlobalRef::member(&record.global, imported)
        };
        refs.insert(local, global_ref);
      }
    }
    // Side-effect-only import: nothing binds, the statement still goes.
    None => {}
  }
}

// Re-export with source from a tracked module. Every specifier shape
// collapses into natives/group/defaults; names missing from the record's
// binding set are zero-effect.
fn scan_reexport(span: Loc, names: &ExportNames, record: &BindingRecord, out: &mut Discovery) {
  let export_index = out.exports.len();
  let mut rewrite = ExportRewrite {
    span,
    natives: Vec::new(),
    group: Vec::new(),
    defaults: Vec::new(),
  };
  let push_group = |rewrite: &mut ExportRewrite, units: &mut Vec<DeclUnit>, name: &str, init: String| {
    units.push(DeclUnit {
      names: vec![name.to_string()],
      kind: UnitKind::GroupEntry {
        export: export_index,
        index: rewrite.group.len(),
      },
    });
    rewrite.group.push(GroupEntry {
      name: name.to_string(),
      init,
      discarded: false,
    });
  };

  match names {
    ExportNames::All(None) => {
      for binding in &record.bindings {
        push_group(
          &mut rewrite,
          &mut out.units,
          binding,
          member_expr(&record.global, binding),
        );
      }
    }
    ExportNames::All(Some(alias)) => {
      if alias.stx.name == "default" {
        rewrite.defaults.push(object_literal(record));
      } else {
        push_group(&mut rewrite, &mut out.units, &alias.stx.name, object_literal(record));
      }
    }
    ExportNames::Specific(names) => {
      for name in names {
        if name.stx.type_only {
          continue;
        }
        let local = name.stx.exportable.as_str();
        let alias = name.stx.alias.stx.name.as_str();
        if alias == "default" {
          if local == "default" {
            rewrite.defaults.push(object_literal(record));
          } else if record.has_binding(local) {
            rewrite.defaults.push(member_expr(&record.global, local));
          } else {
            debug!(module = %record.name, binding = local, "zero-effect re-export");
          }
        } else if local == "default" {
          push_group(&mut rewrite, &mut out.units, alias, object_literal(record));
        } else if record.has_binding(local) {
          push_group(
            &mut rewrite,
            &mut out.units,
            alias,
            member_expr(&record.global, local),
          );
        } else {
          debug!(module = %record.name, binding = local, "zero-effect re-export");
        }
      }
    }
  }
  out.exports.push(rewrite);
}

// Export without source: specifiers naming discovered bindings are
// rewritten, everything else is kept verbatim. Statements with nothing to
// rewrite are left untouched.
fn scan_local_export(span: Loc, names: &ExportNames, out: &mut Discovery) {
  let ExportNames::Specific(names) = names else {
    return;
  };
  let export_index = out.exports.len();
  let mut rewrite = ExportRewrite {
    span,
    natives: Vec::new(),
    group: Vec::new(),
    defaults: Vec::new(),
  };
  for name in names {
    let local = name.stx.exportable.as_str();
    let alias = name.stx.alias.stx.name.as_str();
    let mapped = if name.stx.type_only {
      None
    } else {
      out.refs.get(local).map(GlobalRef::expr)
    };
    match mapped {
      Some(expr) => {
        if alias == "default" {
          rewrite.defaults.push(expr);
        } else {
          out.units.push(DeclUnit {
            names: vec![alias.to_string()],
            kind: UnitKind::GroupEntry {
              export: export_index,
              index: rewrite.group.len(),
            },
          });
          rewrite.group.push(GroupEntry {
            name: alias.to_string(),
            init: expr,
            discarded: false,
          });
        }
      }
      None => rewrite
        .natives
        .push(specifier_text(&name.stx.exportable, alias, name.stx.type_only)),
    }
  }
  if rewrite.group.is_empty() && rewrite.defaults.is_empty() {
    return;
  }
  out.exports.push(rewrite);
}

/// Renders every scheduled export restructuring into the editor, after
/// duplicate resolution has filtered the groups.
pub(crate) fn render_exports(exports: &[ExportRewrite], editor: &mut SourceEditor) {
  for export in exports {
    let mut parts = Vec::new();
    if !export.natives.is_empty() {
      parts.push(format!("export {{ {} }};", export.natives.join(", ")));
    }
    let kept: Vec<String> = export
      .group
      .iter()
      .filter(|entry| !entry.discarded)
      .map(|entry| format!("{} = {}", entry.name, entry.init))
      .collect();
    if !kept.is_empty() {
      parts.push(format!("export var {};", kept.join(", ")));
    }
    for default in &export.defaults {
      parts.push(format!("export default {};", default));
    }
    if parts.is_empty() {
      editor.remove_statement(export.span);
    } else {
      editor.replace_statement(export.span, parts.join("\n"));
    }
  }
}

fn pat_decl_id_name(decl: &Node<PatDecl>) -> Option<String> {
  match decl.stx.pat.stx.as_ref() {
    Pat::Id(id) => Some(id.name.clone()),
    _ => None,
  }
}

/// Collects every name a pattern binds, recursing through nested
/// object/array destructuring and rest elements.
pub(crate) fn pat_names(pat: &Node<Pat>, out: &mut Vec<String>) {
  match pat.stx.as_ref() {
    Pat::Id(id) => out.push(id.name.clone()),
    Pat::Obj(obj) => {
      for prop in &obj.properties {
        pat_names(&prop.stx.target, out);
      }
      if let Some(rest) = &obj.rest {
        out.push(rest.stx.name.clone());
      }
    }
    Pat::Arr(arr) => {
      for elem in arr.elements.iter().flatten() {
        pat_names(&elem.target, out);
      }
      if let Some(rest) = &arr.rest {
        pat_names(rest, out);
      }
    }
  }
}

fn declarator_span(declarator: &VarDeclarator) -> Loc {
  let mut span = declarator.pattern.loc;
  if let Some(annotation) = &declarator.type_annotation {
    span.extend(annotation.loc);
  }
  if let Some(initializer) = &declarator.initializer {
    span.extend(initializer.loc);
  }
  span
}

fn specifier_text(exportable: &ModuleExportImportName, alias: &str, type_only: bool) -> String {
  let prefix = if type_only { "type " } else { "" };
  match exportable {
    ModuleExportImportName::Ident(name) if name == alias => format!("{}{}", prefix, name),
    ModuleExportImportName::Ident(name) => format!("{}{} as {}", prefix, name, alias),
    ModuleExportImportName::Str(name) => {
      format!("{}{} as {}", prefix, quote_js_string(name), alias)
    }
  }
}

pub(crate) fn member_expr(global: &str, name: &str) -> String {
  if is_identifier(name) {
    format!("{}.{}", global, name)
  } else {
    format!("{}[{}]", global, quote_js_string(name))
  }
}

fn object_literal(record: &BindingRecord) -> String {
  if record.bindings.is_empty() {
    return "{}".to_string();
  }
  let entries: Vec<String> = record
    .bindings
    .iter()
    .map(|binding| {
      let key = if is_identifier(binding) {
        binding.clone()
      } else {
        quote_js_string(binding)
      };
      format!("{}: {}", key, member_expr(&record.global, binding))
    })
    .collect();
  format!("{{ {} }}", entries.join(", "))
}

// IdentifierName in the property-access sense: keywords are fine after a
// dot, so no reserved-word check.
fn is_identifier(name: &str) -> bool {
  let mut chars = name.chars();
  match chars.next() {
    Some(c) if c.is_alphabetic() || c == '_' || c == '$' => {}
    _ => return false,
  }
  chars.all(|c| c.is_alphanumeric() || c == '_' || c == '$')
}

fn quote_js_string(value: &str) -> String {
  let mut quoted = String::with_capacity(value.len() + 2);
  quoted.push('"');
  for c in value.chars() {
    match c {
      '"' => quoted.push_str("\\\""),
      '\\' => quoted.push_str("\\\\"),
      '\n' => quoted.push_str("\\n"),
      '\r' => quoted.push_str("\\r"),
      '\t' => quoted.push_str("\\t"),
      c if (c as u32) < 0x20 => quoted.push_str(&format!("\\u{:04x}", c as u32)),
      c => quoted.push(c),
    }
  }
  quoted.push('"');
  quoted
}

#[cfg(test)]
mod tests {
  use super::is_identifier;
  use super::member_expr;
  use super::quote_js_string;

  #[test]
  fn member_access_falls_back_to_brackets() {
    assert_eq!(member_expr("Lodash", "chunk"), "Lodash.chunk");
    assert_eq!(member_expr("Lodash", "default"), "Lodash.default");
    assert_eq!(member_expr("Icons", "arrow-left"), "Icons[\"arrow-left\"]");
  }

  #[test]
  fn identifier_check_rejects_leading_digits_and_dashes() {
    assert!(is_identifier("$ref"));
    assert!(is_identifier("_private"));
    assert!(!is_identifier("1st"));
    assert!(!is_identifier("a-b"));
    assert!(!is_identifier(""));
  }

  #[test]
  fn strings_are_escaped_for_embedding() {
    assert_eq!(quote_js_string("a\"b\\c"), "\"a\\\"b\\\\c\"");
    assert_eq!(quote_js_string("line\nbreak"), "\"line\\nbreak\"");
  }
}
