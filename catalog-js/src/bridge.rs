use crate::error::ScanError;
use crate::error::SyncFault;
use crossbeam::channel::bounded;
use crossbeam::channel::RecvTimeoutError;
use std::thread;
use std::time::Duration;

/// Runs `work` on a secondary thread and blocks the caller until it
/// reports back over a capacity-1 channel.
///
/// Probing untrusted bundles happens behind this handoff so a crash over
/// there cannot corrupt the orchestrating thread; per-module failures are
/// ordinary values inside `T` and never surface here. An abnormal wait
/// (deadline elapsed, channel closed because the worker died, spawn
/// failure) is a fatal `SynchronizationFault` and is not retried.
pub fn run_blocking<T, F>(work: F, deadline: Option<Duration>) -> Result<T, ScanError>
where
  T: Send + 'static,
  F: FnOnce() -> T + Send + 'static,
{
  let (tx, rx) = bounded::<T>(1);
  let handle = thread::Builder::new()
    .name("catalog-probe".to_string())
    .spawn(move || {
      // The receiver only disappears after a fault was already raised on
      // the waiting side; nothing left to report to.
      let _ = tx.send(work());
    });
  if let Err(err) = handle {
    return Err(ScanError::SynchronizationFault(SyncFault::SpawnFailed(
      err.to_string(),
    )));
  }
  match deadline {
    Some(limit) => rx.recv_timeout(limit).map_err(|err| {
      ScanError::SynchronizationFault(match err {
        RecvTimeoutError::Timeout => SyncFault::Timeout(limit),
        RecvTimeoutError::Disconnected => SyncFault::ChannelClosed,
      })
    }),
    None => rx
      .recv()
      .map_err(|_| ScanError::SynchronizationFault(SyncFault::ChannelClosed)),
  }
}

#[cfg(test)]
mod tests {
  use super::run_blocking;
  use crate::error::ScanError;
  use crate::error::SyncFault;
  use std::thread;
  use std::time::Duration;

  #[test]
  fn returns_the_worker_result() {
    let value = run_blocking(|| 7 * 6, None).unwrap();
    assert_eq!(value, 42);
  }

  #[test]
  fn deadline_elapsing_is_a_fault() {
    let err = run_blocking(
      || thread::sleep(Duration::from_secs(5)),
      Some(Duration::from_millis(10)),
    )
    .unwrap_err();
    assert!(matches!(
      err,
      ScanError::SynchronizationFault(SyncFault::Timeout(_))
    ));
  }

  #[test]
  fn worker_panic_is_a_fault() {
    let err = run_blocking::<(), _>(|| panic!("probe thread died"), None).unwrap_err();
    assert_eq!(
      err,
      ScanError::SynchronizationFault(SyncFault::ChannelClosed)
    );
  }
}
