use serde::Serialize;
use std::error::Error;
use std::fmt;
use std::fmt::Display;
use std::fmt::Formatter;
use std::time::Duration;

/// Fatal scanning errors. Any of these aborts the build; none are retried.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ScanError {
  /// The blocking handoff to the probing thread ended abnormally.
  SynchronizationFault(SyncFault),
  /// Two tracked modules resolved to the same global identifier. The later
  /// record must never silently overwrite the earlier one.
  CatalogAmbiguity {
    global: String,
    first: String,
    second: String,
  },
  /// A specifier or alias is claimed by two distinct records.
  SpecifierCollision {
    key: String,
    first: String,
    second: String,
  },
}

impl Display for ScanError {
  fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
    match self {
      ScanError::SynchronizationFault(fault) => write!(f, "synchronization fault: {}", fault),
      ScanError::CatalogAmbiguity {
        global,
        first,
        second,
      } => write!(
        f,
        "modules {} and {} both resolve to global `{}`",
        first, second, global
      ),
      ScanError::SpecifierCollision { key, first, second } => write!(
        f,
        "specifier `{}` is declared by both {} and {}",
        key, first, second
      ),
    }
  }
}

impl Error for ScanError {}

/// Abnormal outcomes of the bridge wait. All fatal.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SyncFault {
  /// The deadline elapsed before the probing thread reported back.
  Timeout(Duration),
  /// The probing thread died without reporting (e.g. it panicked).
  ChannelClosed,
  /// The probing thread could not be started at all.
  SpawnFailed(String),
  /// A queue task failed inside the probing thread.
  Worker(String),
}

impl Display for SyncFault {
  fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
    match self {
      SyncFault::Timeout(limit) => write!(f, "no response within {:?}", limit),
      SyncFault::ChannelClosed => write!(f, "probing thread terminated abnormally"),
      SyncFault::SpawnFailed(reason) => write!(f, "failed to spawn probing thread: {}", reason),
      SyncFault::Worker(reason) => write!(f, "probe worker failed: {}", reason),
    }
  }
}

/// A module that could not be resolved. Non-fatal: the module is omitted
/// from the catalog and reported; whether that warns or aborts is the
/// host's policy, not ours.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ProbeFailure {
  pub name: String,
  pub reason: ProbeFailureReason,
}

impl Display for ProbeFailure {
  fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
    write!(f, "{}: {}", self.name, self.reason)
  }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub enum ProbeFailureReason {
  /// The package directory was not found in any `node_modules` up the tree.
  PackageNotFound,
  /// `package.json` names no distributable entry and none was configured.
  MissingEntryField,
  /// The distributable entry exists in metadata but could not be read.
  EntryUnreadable(String),
  /// Evaluation failed before any global could be observed.
  Eval(String),
  /// Evaluation completed without introducing a global.
  NoGlobalProduced,
  /// A declared global identifier never appeared on the global object.
  GlobalMissing(String),
}

impl Display for ProbeFailureReason {
  fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
    match self {
      ProbeFailureReason::PackageNotFound => write!(f, "package not found in node_modules"),
      ProbeFailureReason::MissingEntryField => {
        write!(f, "package.json declares no distributable entry")
      }
      ProbeFailureReason::EntryUnreadable(reason) => {
        write!(f, "distributable entry unreadable: {}", reason)
      }
      ProbeFailureReason::Eval(reason) => write!(f, "evaluation failed: {}", reason),
      ProbeFailureReason::NoGlobalProduced => write!(f, "bundle introduced no global"),
      ProbeFailureReason::GlobalMissing(name) => {
        write!(f, "declared global `{}` was never defined", name)
      }
    }
  }
}
