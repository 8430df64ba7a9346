use crate::discover::ReferenceTable;
use crate::edit::SourceEditor;
use ahash::HashSet;
use derive_visitor::Drive;
use derive_visitor::Visitor;
use parse_js::ast::class_or_object::ObjMember;
use parse_js::ast::class_or_object::ObjMemberType;
use parse_js::ast::expr::IdExpr;
use parse_js::ast::node::Node;
use parse_js::ast::stx::TopLevel;
use parse_js::loc::Loc;
use symbol_js::compute_symbols;
use symbol_js::symbol::Scope;
use symbol_js::symbol::Symbol;
use symbol_js::TopLevelMode;

type IdExprNode = Node<IdExpr>;
type ObjMemberNode = Node<ObjMember>;

/// Pass 2: replaces every value-reading identifier reference that maps
/// through the ReferenceTable and is not shadowed by a lexical binding.
///
/// Identifier *patterns* (declaration sites, assignment targets,
/// import/export aliases) are distinct node kinds in the AST and never
/// reach this visitor. Tracked imports were detached before symbols were
/// computed, so their bindings no longer exist; anything still resolving
/// somewhere up the scope chain is a genuine local and stays.
pub(crate) fn substitute(
  top: &mut Node<TopLevel>,
  refs: &ReferenceTable,
  editor: &mut SourceEditor,
) {
  if refs.is_empty() {
    return;
  }
  compute_symbols(top, TopLevelMode::Module);
  let mut visitor = SubstituteVisitor {
    refs,
    editor,
    expanded: HashSet::default(),
  };
  top.drive(&mut visitor);
}

#[derive(Visitor)]
#[visitor(ObjMemberNode(enter), IdExprNode(enter))]
struct SubstituteVisitor<'a, 'b> {
  refs: &'a ReferenceTable,
  editor: &'a mut SourceEditor<'b>,
  // Shorthand ids already rewritten at the member level.
  expanded: HashSet<Loc>,
}

impl SubstituteVisitor<'_, '_> {
  // `{ version }` cannot become `{ Vue.version }`; the shorthand expands
  // to `{ version: Vue.version }` instead.
  fn enter_obj_member_node(&mut self, node: &ObjMemberNode) {
    let ObjMemberType::Shorthand { id } = &node.stx.typ else {
      return;
    };
    let Some(expr) = self.mapped(id) else {
      return;
    };
    self.expanded.insert(id.loc);
    self
      .editor
      .replace(id.loc, format!("{}: {}", id.stx.name, expr));
  }

  fn enter_id_expr_node(&mut self, node: &IdExprNode) {
    if self.expanded.contains(&node.loc) {
      return;
    }
    if let Some(expr) = self.mapped(node) {
      self.editor.replace(node.loc, expr);
    }
  }

  fn mapped(&self, node: &IdExprNode) -> Option<String> {
    let global_ref = self.refs.get(&node.stx.name)?;
    let scope = node
      .assoc
      .get::<Scope>()
      .expect("symbols must be computed before substitution");
    if resolve_symbol(scope, &node.stx.name).is_some() {
      return None;
    }
    Some(global_ref.expr())
  }
}

fn resolve_symbol(scope: &Scope, name: &str) -> Option<Symbol> {
  for ancestor in scope.self_and_ancestors() {
    let symbol = ancestor.data().get_symbol(name);
    if symbol.is_some() {
      return symbol;
    }
  }
  None
}
