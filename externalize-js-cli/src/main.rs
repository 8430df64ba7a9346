use clap::Parser;
use externalize_js::Externalizer;
use externalize_js::ScanOptions;
use externalize_js::SourceFile;
use externalize_js::TrackedModule;
use serde::Deserialize;
use std::fs;
use std::path::Path;
use std::path::PathBuf;
use std::process;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(
  name = "externalize-js",
  about = "Externalize bundled JavaScript dependencies to CDN globals"
)]
struct Cli {
  /// JSON config declaring the tracked modules.
  #[arg(short, long)]
  config: PathBuf,

  /// Module files to rewrite. With no files, only the scan runs.
  inputs: Vec<PathBuf>,

  /// Directory to write rewritten files into; omit to overwrite in place.
  #[arg(short, long)]
  out_dir: Option<PathBuf>,

  /// Also write a `<file>.map.json` position map next to each output.
  #[arg(long)]
  emit_map: bool,

  /// Print the resolved catalog as JSON to stdout and exit.
  #[arg(long)]
  print_catalog: bool,

  /// Treat probe failures as fatal instead of warnings.
  #[arg(long)]
  strict: bool,
}

#[derive(Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct Config {
  modules: Vec<TrackedModule>,
  root: Option<PathBuf>,
  concurrency: Option<usize>,
  wait_timeout_ms: Option<u64>,
}

fn main() {
  tracing_subscriber::fmt()
    .with_env_filter(EnvFilter::from_default_env())
    .with_writer(std::io::stderr)
    .init();
  let cli = Cli::parse();

  let raw = match fs::read_to_string(&cli.config) {
    Ok(raw) => raw,
    Err(err) => {
      eprintln!("error: cannot read {}: {}", cli.config.display(), err);
      process::exit(1);
    }
  };
  let config: Config = match serde_json::from_str(&raw) {
    Ok(config) => config,
    Err(err) => {
      eprintln!("error: invalid config {}: {}", cli.config.display(), err);
      process::exit(1);
    }
  };

  let options = ScanOptions {
    root: config.root.unwrap_or_else(|| PathBuf::from(".")),
    concurrency: config.concurrency,
    wait_timeout: config.wait_timeout_ms.map(Duration::from_millis),
  };
  let host = match Externalizer::scan(config.modules, options) {
    Ok(host) => host,
    Err(err) => {
      eprintln!("error: scan failed: {}", err);
      process::exit(1);
    }
  };
  for failure in host.failures() {
    eprintln!("warning: {} could not be externalized: {}", failure.name, failure.reason);
  }
  if cli.strict && !host.failures().is_empty() {
    process::exit(1);
  }

  if cli.print_catalog {
    match serde_json::to_string_pretty(host.catalog()) {
      Ok(json) => println!("{}", json),
      Err(err) => {
        eprintln!("error: cannot serialize catalog: {}", err);
        process::exit(1);
      }
    }
    return;
  }

  let mut files = Vec::with_capacity(cli.inputs.len());
  for input in &cli.inputs {
    match fs::read_to_string(input) {
      Ok(source) => files.push(SourceFile {
        id: input.display().to_string(),
        source,
      }),
      Err(err) => {
        eprintln!("error: cannot read {}: {}", input.display(), err);
        process::exit(1);
      }
    }
  }

  let mut failed = false;
  for (input, result) in cli.inputs.iter().zip(host.transform_all(files)) {
    match result {
      Ok(file) => {
        let Some(rewritten) = file.output else {
          continue;
        };
        let target = output_path(input, cli.out_dir.as_deref());
        if let Err(err) = write_output(&target, &rewritten.code) {
          eprintln!("error: cannot write {}: {}", target.display(), err);
          failed = true;
          continue;
        }
        if cli.emit_map {
          let map_path = target.with_extension("map.json");
          let map = match serde_json::to_string(&rewritten.map) {
            Ok(map) => map,
            Err(err) => {
              eprintln!("error: cannot serialize map for {}: {}", file.id, err);
              failed = true;
              continue;
            }
          };
          if let Err(err) = write_output(&map_path, &map) {
            eprintln!("error: cannot write {}: {}", map_path.display(), err);
            failed = true;
          }
        }
      }
      Err((id, err)) => {
        eprintln!("error: {}: {}", id, err);
        failed = true;
      }
    }
  }
  if failed {
    process::exit(1);
  }
}

fn output_path(input: &Path, out_dir: Option<&Path>) -> PathBuf {
  match out_dir {
    Some(dir) => match input.file_name() {
      Some(name) => dir.join(name),
      None => dir.join(input),
    },
    None => input.to_path_buf(),
  }
}

fn write_output(path: &Path, contents: &str) -> std::io::Result<()> {
  if let Some(parent) = path.parent() {
    if !parent.as_os_str().is_empty() {
      fs::create_dir_all(parent)?;
    }
  }
  fs::write(path, contents)
}
