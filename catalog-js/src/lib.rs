pub mod bridge;
pub mod catalog;
pub mod descriptor;
pub mod error;
pub mod queue;
pub mod sandbox;
pub mod scanner;

mod resolve;

pub use crate::catalog::BindingRecord;
pub use crate::catalog::Catalog;
pub use crate::descriptor::DetailedModule;
pub use crate::descriptor::TrackedModule;
pub use crate::error::ProbeFailure;
pub use crate::error::ProbeFailureReason;
pub use crate::error::ScanError;
pub use crate::error::SyncFault;
pub use crate::scanner::ScanOptions;
pub use crate::scanner::ScanReport;
pub use crate::scanner::Scanner;

/// Scans every tracked module once and returns the finished read-only
/// catalog together with the modules that failed to resolve.
pub fn scan(
  modules: impl IntoIterator<Item = TrackedModule>,
  options: ScanOptions,
) -> Result<ScanReport, ScanError> {
  Scanner::new(modules, options).scan_all()
}
