use rayon::prelude::*;
use tracing::debug;

pub use catalog_js::descriptor::DetailedModule;
pub use catalog_js::descriptor::TrackedModule;
pub use catalog_js::error::ProbeFailure;
pub use catalog_js::error::ScanError;
pub use catalog_js::scanner::ScanOptions;
pub use catalog_js::scanner::ScanReport;
pub use catalog_js::BindingRecord;
pub use catalog_js::Catalog;
pub use rewrite_js::PositionMap;
pub use rewrite_js::RewriteError;
pub use rewrite_js::Rewriter;
pub use rewrite_js::Rewritten;

/// One build's externalization state: the catalog resolved by the scan
/// and the rewrite engine configured with it. Scanning fully completes
/// before the first rewrite; the two phases never interleave.
pub struct Externalizer {
  rewriter: Rewriter,
  failures: Vec<ProbeFailure>,
}

/// A module handed in for rewriting, identified for reporting.
#[derive(Clone, Debug)]
pub struct SourceFile {
  pub id: String,
  pub source: String,
}

/// Per-file outcome of `transform_all`. `output` is `None` when the file
/// needed no changes.
pub struct TransformedFile {
  pub id: String,
  pub output: Option<Rewritten>,
}

impl Externalizer {
  /// Probes every tracked module once and readies the rewrite engine.
  pub fn scan(
    modules: impl IntoIterator<Item = TrackedModule>,
    options: ScanOptions,
  ) -> Result<Self, ScanError> {
    let report = catalog_js::scan(modules, options)?;
    Ok(Self::from_report(report))
  }

  pub fn from_report(report: ScanReport) -> Self {
    debug!(
      resolved = report.catalog.len(),
      failed = report.failures.len(),
      "externalization catalog ready"
    );
    Externalizer {
      rewriter: Rewriter::new(report.catalog),
      failures: report.failures,
    }
  }

  /// For hosts that already own a catalog (tests, caches).
  pub fn from_catalog(catalog: Catalog) -> Self {
    Externalizer {
      rewriter: Rewriter::new(catalog),
      failures: Vec::new(),
    }
  }

  pub fn catalog(&self) -> &Catalog {
    self.rewriter.catalog()
  }

  /// Modules that failed probing. Whether these warn or abort the build
  /// is the host's call.
  pub fn failures(&self) -> &[ProbeFailure] {
    &self.failures
  }

  /// Rewrites one module. `Ok(None)` means the input is to be used
  /// unchanged.
  pub fn transform(&self, source: &str) -> Result<Option<Rewritten>, RewriteError> {
    self.rewriter.rewrite(source)
  }

  /// Rewrites many modules in parallel. Files only share the read-only
  /// catalog, so order of work is free; results come back in input order.
  pub fn transform_all(
    &self,
    files: Vec<SourceFile>,
  ) -> Vec<Result<TransformedFile, (String, RewriteError)>> {
    files
      .into_par_iter()
      .map(|file| match self.rewriter.rewrite(&file.source) {
        Ok(output) => Ok(TransformedFile {
          id: file.id,
          output,
        }),
        Err(err) => Err((file.id, err)),
      })
      .collect()
  }
}
