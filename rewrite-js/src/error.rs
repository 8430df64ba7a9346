use parse_js::error::SyntaxError;
use parse_js::loc::Loc;
use std::error::Error;
use std::fmt;
use std::fmt::Display;
use std::fmt::Formatter;

#[derive(Clone, Debug)]
pub enum RewriteError {
  /// The file does not parse. No partial output is emitted.
  Syntax(SyntaxError),
  /// Two rewrite passes produced edits that cross each other. This is an
  /// internal invariant violation, not an input error.
  OverlappingEdits { first: Loc, second: Loc },
}

impl Display for RewriteError {
  fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
    match self {
      RewriteError::Syntax(err) => write!(f, "{}", err),
      RewriteError::OverlappingEdits { first, second } => write!(
        f,
        "overlapping edits at [{}:{}] and [{}:{}]",
        first.0, first.1, second.0, second.1
      ),
    }
  }
}

impl Error for RewriteError {}

impl From<SyntaxError> for RewriteError {
  fn from(err: SyntaxError) -> Self {
    RewriteError::Syntax(err)
  }
}
