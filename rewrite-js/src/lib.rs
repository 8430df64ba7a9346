use aho_corasick::AhoCorasick;
use parse_js::ast::node::Node;
use parse_js::ast::stx::TopLevel;
use parse_js::parse;

mod dedupe;
mod discover;
mod substitute;

pub mod edit;
pub mod error;

pub use crate::edit::MapSegment;
pub use crate::edit::PositionMap;
pub use crate::edit::Rewritten;
pub use crate::edit::SourceEditor;
pub use crate::error::RewriteError;
pub use catalog_js::BindingRecord;
pub use catalog_js::Catalog;

/// Per-file source-to-source transform against one build's catalog.
///
/// The catalog is passed in once and owned here; there is no ambient
/// state, so one `Rewriter` can serve any number of files, concurrently.
pub struct Rewriter {
  catalog: Catalog,
  // Fast-path substring automaton over every catalog key.
  matcher: Option<AhoCorasick>,
}

impl Rewriter {
  pub fn new(catalog: Catalog) -> Self {
    let matcher = if catalog.is_empty() {
      None
    } else {
      Some(AhoCorasick::new(catalog.keys()).expect("catalog keys form a valid pattern set"))
    };
    Rewriter { catalog, matcher }
  }

  pub fn catalog(&self) -> &Catalog {
    &self.catalog
  }

  /// Cheap static pre-scan: can this file possibly reference a catalog
  /// key? `false` guarantees the file needs no work; `true` only makes it
  /// worth parsing.
  pub fn filter(&self, source: &str) -> bool {
    match &self.matcher {
      Some(matcher) => matcher.find(source).is_some(),
      None => false,
    }
  }

  /// Rewrites one module. Returns `Ok(None)` when the file needs no
  /// changes; the input is then to be used as-is, byte-identical.
  pub fn rewrite(&self, source: &str) -> Result<Option<Rewritten>, RewriteError> {
    if !self.filter(source) {
      return Ok(None);
    }
    let mut top = parse(source)?;
    let mut editor = SourceEditor::new(source);
    let mut discovery = discover::discover(&top, &self.catalog, &mut editor);
    if discovery.refs.is_empty() && discovery.exports.is_empty() && discovery.detach.is_empty() {
      // The pre-scan hit was a false positive (e.g. a key inside a string
      // literal); nothing tracked is actually imported or re-exported.
      return Ok(None);
    }
    dedupe::resolve_duplicates(&mut discovery, &mut editor);
    discover::render_exports(&discovery.exports, &mut editor);
    detach_statements(&mut top, &discovery.detach);
    substitute::substitute(&mut top, &discovery.refs, &mut editor);
    if !editor.has_edits() {
      return Ok(None);
    }
    editor.finish().map(Some)
  }
}

// Tracked imports leave the AST before scope analysis so their bindings
// stop shadowing the globals they stood for.
fn detach_statements(top: &mut Node<TopLevel>, indices: &[usize]) {
  if indices.is_empty() {
    return;
  }
  let mut keep = vec![true; top.stx.body.len()];
  for &index in indices {
    keep[index] = false;
  }
  let mut cursor = 0;
  top.stx.body.retain(|_| {
    let kept = keep[cursor];
    cursor += 1;
    kept
  });
}
