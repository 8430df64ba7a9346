use crate::bridge;
use crate::catalog::BindingRecord;
use crate::catalog::Catalog;
use crate::descriptor::ModuleDescriptor;
use crate::descriptor::TrackedModule;
use crate::error::ProbeFailure;
use crate::error::ScanError;
use crate::error::SyncFault;
use crate::queue::max_concurrency;
use crate::queue::TaskQueue;
use crate::resolve::resolve_entry;
use crate::sandbox;
use crossbeam::channel::unbounded;
use std::path::PathBuf;
use std::time::Duration;
use tracing::debug;
use tracing::warn;

#[derive(Clone, Debug)]
pub struct ScanOptions {
  /// Directory module resolution starts from.
  pub root: PathBuf,
  /// Probe parallelism override. Defaults to hardware parallelism minus
  /// one, floor 1.
  pub concurrency: Option<usize>,
  /// Deadline for the blocking bridge wait. `None` waits indefinitely;
  /// the wait still faults if the probing thread dies.
  pub wait_timeout: Option<Duration>,
}

impl Default for ScanOptions {
  fn default() -> Self {
    ScanOptions {
      root: PathBuf::from("."),
      concurrency: None,
      wait_timeout: None,
    }
  }
}

/// The outcome of one build's scan: the finished catalog plus the modules
/// that could not be resolved. Whether failures warn or abort is the
/// host's policy.
#[derive(Debug)]
pub struct ScanReport {
  pub catalog: Catalog,
  pub failures: Vec<ProbeFailure>,
}

/// Normalizes tracked-module descriptors and resolves each to a
/// `BindingRecord` by probing its distributable build off-thread.
pub struct Scanner {
  modules: Vec<TrackedModule>,
  options: ScanOptions,
}

impl Scanner {
  pub fn new(modules: impl IntoIterator<Item = TrackedModule>, options: ScanOptions) -> Self {
    Scanner {
      modules: modules.into_iter().collect(),
      options,
    }
  }

  /// Scans every tracked module. Blocks until probing finishes; scanning
  /// always completes before any rewrite starts.
  pub fn scan_all(self) -> Result<ScanReport, ScanError> {
    let descriptors: Vec<ModuleDescriptor> =
      self.modules.into_iter().map(TrackedModule::normalize).collect();
    debug!(modules = descriptors.len(), "scanning tracked modules");

    let root = self.options.root.clone();
    let limit = self.options.concurrency.unwrap_or_else(max_concurrency);
    let outcomes = bridge::run_blocking(
      move || probe_all(root, limit, descriptors),
      self.options.wait_timeout,
    )??;

    let mut catalog = Catalog::new();
    let mut failures = Vec::new();
    for outcome in outcomes {
      match outcome {
        Ok(record) => {
          debug!(module = %record.name, global = %record.global, "resolved");
          catalog.insert(record)?;
        }
        Err(failure) => {
          warn!(module = %failure.name, reason = %failure.reason, "probe failed");
          failures.push(failure);
        }
      }
    }
    Ok(ScanReport { catalog, failures })
  }
}

type ProbeOutcome = Result<BindingRecord, ProbeFailure>;

// Runs inside the bridge's secondary thread: one queue task per
// descriptor, results collected over a channel and restored to input
// order so the catalog is deterministic.
fn probe_all(
  root: PathBuf,
  limit: usize,
  descriptors: Vec<ModuleDescriptor>,
) -> Result<Vec<ProbeOutcome>, ScanError> {
  let total = descriptors.len();
  let queue: TaskQueue<String> = TaskQueue::new(limit);
  let (tx, rx) = unbounded::<(usize, ProbeOutcome)>();
  for (index, descriptor) in descriptors.into_iter().enumerate() {
    let tx = tx.clone();
    let root = root.clone();
    queue.enqueue(Box::new(move || {
      let outcome = probe_one(&root, &descriptor);
      tx.send((index, outcome)).map_err(|err| err.to_string())
    }));
  }
  drop(tx);
  queue
    .wait()
    .map_err(|reason| ScanError::SynchronizationFault(SyncFault::Worker(reason)))?;

  let mut slots: Vec<Option<ProbeOutcome>> = (0..total).map(|_| None).collect();
  for (index, outcome) in rx {
    slots[index] = Some(outcome);
  }
  let ordered = slots
    .into_iter()
    .map(|slot| {
      slot.ok_or_else(|| ScanError::SynchronizationFault(SyncFault::ChannelClosed))
    })
    .collect::<Result<Vec<_>, _>>()?;
  Ok(ordered)
}

// One probe is strictly sequential: locate once, read once, evaluate once,
// observe once. Failures are values; nothing crosses the thread boundary
// as a panic.
fn probe_one(root: &std::path::Path, descriptor: &ModuleDescriptor) -> ProbeOutcome {
  let fail = |reason| ProbeFailure {
    name: descriptor.name.clone(),
    reason,
  };
  let entry = resolve_entry(root, descriptor).map_err(fail)?;
  let found =
    sandbox::probe(&entry.source, descriptor.global_override.as_deref()).map_err(fail)?;
  Ok(BindingRecord {
    name: descriptor.name.clone(),
    version: entry.version,
    relative_module: entry.relative_module,
    global: found.global,
    bindings: found.bindings,
    aliases: descriptor.aliases.clone(),
    spare: descriptor.spare.clone(),
  })
}
