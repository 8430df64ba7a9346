use crate::error::RewriteError;
use parse_js::loc::Loc;
use serde::Serialize;

/// Accumulates span edits against one file's source text and applies them
/// in a single pass. All untouched bytes pass through unchanged, which is
/// what makes the no-op law (`transform(code) == code` for uninvolved
/// files) hold trivially.
pub struct SourceEditor<'a> {
  source: &'a str,
  edits: Vec<Edit>,
}

#[derive(Debug)]
struct Edit {
  start: usize,
  end: usize,
  text: String,
  seq: usize,
}

impl<'a> SourceEditor<'a> {
  pub fn new(source: &'a str) -> Self {
    SourceEditor {
      source,
      edits: Vec::new(),
    }
  }

  pub fn source(&self) -> &'a str {
    self.source
  }

  /// Replaces `loc` with `text`. Replacements identical to the underlying
  /// text are dropped so they neither dirty the editor nor the map.
  pub fn replace(&mut self, loc: Loc, text: impl Into<String>) {
    let text = text.into();
    if &self.source[loc.0..loc.1] == text {
      return;
    }
    self.edits.push(Edit {
      start: loc.0,
      end: loc.1,
      text,
      seq: self.edits.len(),
    });
  }

  pub fn remove(&mut self, loc: Loc) {
    if loc.is_empty() {
      return;
    }
    self.replace(loc, "");
  }

  /// Removes a whole statement: the span, its trailing semicolon, and the
  /// rest of its line if nothing else follows on it.
  pub fn remove_statement(&mut self, loc: Loc) {
    self.remove(Loc(loc.0, past_statement_tail(self.source, loc.1)));
  }

  /// Replaces a whole statement, swallowing the trailing semicolon (the
  /// replacement carries its own).
  pub fn replace_statement(&mut self, loc: Loc, text: impl Into<String>) {
    self.replace(Loc(loc.0, past_semicolon(self.source, loc.1)), text);
  }

  pub fn has_edits(&self) -> bool {
    !self.edits.is_empty()
  }

  pub fn finish(self) -> Result<Rewritten, RewriteError> {
    let mut edits = self.edits;
    // Containers first at equal starts, then submission order.
    edits.sort_by(|a, b| {
      a.start
        .cmp(&b.start)
        .then(b.end.cmp(&a.end))
        .then(a.seq.cmp(&b.seq))
    });

    let mut applied: Vec<&Edit> = Vec::with_capacity(edits.len());
    let mut covered = 0usize;
    for edit in &edits {
      if edit.start >= covered {
        applied.push(edit);
        covered = covered.max(edit.end);
      } else if edit.end <= covered {
        // Fully inside an accepted edit: the container's replacement
        // governs (e.g. an identifier substitution inside a removed
        // duplicate declaration).
        continue;
      } else {
        return Err(RewriteError::OverlappingEdits {
          first: Loc(edit.start, covered),
          second: Loc(edit.start, edit.end),
        });
      }
    }

    let mut code = String::with_capacity(self.source.len());
    let mut segments = Vec::new();
    let mut src = 0usize;
    for edit in applied {
      if edit.start > src {
        let out_start = code.len();
        code.push_str(&self.source[src..edit.start]);
        segments.push(MapSegment {
          src_start: src,
          src_end: edit.start,
          out_start,
          out_end: code.len(),
          synthetic: false,
        });
      }
      if !edit.text.is_empty() {
        let out_start = code.len();
        code.push_str(&edit.text);
        segments.push(MapSegment {
          src_start: edit.start,
          src_end: edit.end,
          out_start,
          out_end: code.len(),
          synthetic: true,
        });
      }
      src = edit.end;
    }
    if src < self.source.len() {
      let out_start = code.len();
      code.push_str(&self.source[src..]);
      segments.push(MapSegment {
        src_start: src,
        src_end: self.source.len(),
        out_start,
        out_end: code.len(),
        synthetic: false,
      });
    }
    Ok(Rewritten {
      code,
      map: PositionMap { segments },
    })
  }
}

/// Extends `end` past an immediately following semicolon (horizontal
/// whitespace allowed in between).
pub(crate) fn past_semicolon(source: &str, end: usize) -> usize {
  let bytes = source.as_bytes();
  let mut i = end;
  while i < bytes.len() && matches!(bytes[i], b' ' | b'\t') {
    i += 1;
  }
  if i < bytes.len() && bytes[i] == b';' {
    i + 1
  } else {
    end
  }
}

// Past the semicolon, then past the line break when only whitespace
// remains on the line; code following on the same line is left alone.
fn past_statement_tail(source: &str, end: usize) -> usize {
  let end = past_semicolon(source, end);
  let bytes = source.as_bytes();
  let mut i = end;
  while i < bytes.len() && matches!(bytes[i], b' ' | b'\t') {
    i += 1;
  }
  if i < bytes.len() && bytes[i] == b'\r' {
    i += 1;
  }
  if i < bytes.len() && bytes[i] == b'\n' {
    return i + 1;
  }
  end
}

/// The transformed source and its position-mapping artifact.
#[derive(Debug)]
pub struct Rewritten {
  pub code: String,
  pub map: PositionMap,
}

/// Ordered byte-range segments relating input positions to output
/// positions. Synthetic segments carry replacement text that has no
/// counterpart bytes in the input.
#[derive(Clone, Debug, Default, Serialize)]
pub struct PositionMap {
  pub segments: Vec<MapSegment>,
}

#[derive(Clone, Copy, Debug, Serialize)]
pub struct MapSegment {
  pub src_start: usize,
  pub src_end: usize,
  pub out_start: usize,
  pub out_end: usize,
  pub synthetic: bool,
}

impl PositionMap {
  /// Maps an input byte offset to its output position. Offsets inside
  /// replaced or removed ranges have no exact image and return `None`.
  pub fn map_offset(&self, offset: usize) -> Option<usize> {
    self
      .segments
      .iter()
      .filter(|seg| !seg.synthetic)
      .find(|seg| offset >= seg.src_start && offset < seg.src_end)
      .map(|seg| seg.out_start + (offset - seg.src_start))
  }
}

#[cfg(test)]
mod tests {
  use super::SourceEditor;
  use crate::error::RewriteError;
  use parse_js::loc::Loc;

  #[test]
  fn untouched_source_passes_through_byte_identical() {
    let source = "const answer = 42;\n";
    let out = SourceEditor::new(source).finish().unwrap();
    assert_eq!(out.code, source);
    assert_eq!(out.map.map_offset(6), Some(6));
  }

  #[test]
  fn edits_apply_in_position_order_regardless_of_submission() {
    let source = "a b c";
    let mut editor = SourceEditor::new(source);
    editor.replace(Loc(4, 5), "C");
    editor.replace(Loc(0, 1), "A");
    let out = editor.finish().unwrap();
    assert_eq!(out.code, "A b C");
  }

  #[test]
  fn identical_replacement_is_dropped() {
    let source = "keep me";
    let mut editor = SourceEditor::new(source);
    editor.replace(Loc(0, 4), "keep");
    assert!(!editor.has_edits());
  }

  #[test]
  fn contained_edits_yield_to_their_container() {
    let source = "var dead = inner; rest";
    let mut editor = SourceEditor::new(source);
    editor.replace(Loc(11, 16), "OUTER.inner");
    editor.remove(Loc(0, 18));
    let out = editor.finish().unwrap();
    assert_eq!(out.code, "rest");
  }

  #[test]
  fn crossing_edits_are_an_error() {
    let source = "abcdefgh";
    let mut editor = SourceEditor::new(source);
    editor.remove(Loc(0, 4));
    editor.remove(Loc(2, 6));
    assert!(matches!(
      editor.finish(),
      Err(RewriteError::OverlappingEdits { .. })
    ));
  }

  #[test]
  fn statement_removal_swallows_semicolon_and_blank_line() {
    let source = "import x from 'm';\nconsole.log(x);\n";
    let mut editor = SourceEditor::new(source);
    editor.remove_statement(Loc(0, 17));
    let out = editor.finish().unwrap();
    assert_eq!(out.code, "console.log(x);\n");
  }

  #[test]
  fn statement_removal_keeps_code_on_the_same_line() {
    let source = "import x from 'm'; console.log(1);";
    let mut editor = SourceEditor::new(source);
    editor.remove_statement(Loc(0, 17));
    let out = editor.finish().unwrap();
    assert_eq!(out.code, " console.log(1);");
  }

  #[test]
  fn map_tracks_shifted_offsets() {
    let source = "import { v } from 'm';\nconsole.log(v);\n";
    let mut editor = SourceEditor::new(source);
    editor.remove_statement(Loc(0, 22));
    let out = editor.finish().unwrap();
    assert_eq!(out.code, "console.log(v);\n");
    // `console` started at 23 in the input, at 0 in the output.
    assert_eq!(out.map.map_offset(23), Some(0));
    assert_eq!(out.map.map_offset(3), None);
  }
}
