//! CLI binary for psd2doc.
//!
//! A thin shim over the library crate that maps CLI flags to
//! `ExtractionConfig` and prints results. Input is a JSON layer-tree dump
//! (see `psd2doc::node::value`); output is the extraction result as JSON.

use anyhow::{Context, Result};
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use psd2doc::node::value::ValueNode;
use psd2doc::{
    extract, AssetStore, DataUriStore, ExtractionConfig, ExtractionProgressCallback, FsAssetStore,
    HttpAssetStore, ProgressCallback,
};
use std::io::{self, Write};
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

// ── ANSI colour helpers (no extra deps) ──────────────────────────────────────

fn green(s: &str) -> String {
    format!("\x1b[32m{s}\x1b[0m")
}
fn red(s: &str) -> String {
    format!("\x1b[31m{s}\x1b[0m")
}
fn dim(s: &str) -> String {
    format!("\x1b[2m{s}\x1b[0m")
}
fn bold(s: &str) -> String {
    format!("\x1b[1m{s}\x1b[0m")
}
fn cyan(s: &str) -> String {
    format!("\x1b[36m{s}\x1b[0m")
}

// ── CLI progress callback using indicatif ────────────────────────────────────

/// Terminal progress callback: renders a live progress bar and per-layer
/// log lines using [indicatif]. Works correctly when layers complete
/// out-of-order (concurrent mode).
struct CliProgressCallback {
    bar: ProgressBar,
    errors: AtomicUsize,
}

impl CliProgressCallback {
    /// Create a callback whose progress-bar length is set dynamically by
    /// `on_extraction_start` (called after classification).
    fn new_dynamic() -> Arc<Self> {
        let bar = ProgressBar::new(0);

        let spinner_style = ProgressStyle::with_template("{spinner:.cyan} {prefix:.bold}  {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"]);

        bar.set_style(spinner_style);
        bar.set_prefix("Preparing");
        bar.set_message("Reading layer tree…");
        bar.enable_steady_tick(std::time::Duration::from_millis(80));

        Arc::new(Self {
            bar,
            errors: AtomicUsize::new(0),
        })
    }

    /// Switch to the full progress-bar style once we know `total`.
    fn activate_bar(&self, total: usize) {
        let progress_style = ProgressStyle::with_template(
            "{spinner:.cyan} {prefix:.bold}  \
             [{bar:42.green/238}] {pos:>3}/{len} layers  ⏱ {elapsed_precise}",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("█▉▊▋▌▍▎▏  ")
        .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"]);

        self.bar.set_length(total as u64);
        self.bar.set_style(progress_style);
        self.bar.set_prefix("Extracting");
    }
}

impl ExtractionProgressCallback for CliProgressCallback {
    fn on_extraction_start(&self, total_layers: usize) {
        self.activate_bar(total_layers);
        self.bar.println(format!(
            "{} {}",
            cyan("◆"),
            bold(&format!("Extracting {total_layers} layers…"))
        ));
    }

    fn on_layer_start(&self, _index: usize, _total: usize, name: &str) {
        self.bar.set_message(name.to_string());
    }

    fn on_layer_complete(&self, index: usize, total: usize, name: &str) {
        self.bar.println(format!(
            "  {} Layer {:>3}/{:<3}  {}",
            green("✓"),
            index + 1,
            total,
            dim(name),
        ));
        self.bar.inc(1);
    }

    fn on_layer_error(&self, index: usize, total: usize, name: &str, detail: &str) {
        self.errors.fetch_add(1, Ordering::SeqCst);

        // Truncate very long error messages to keep output tidy.
        let msg = if detail.len() > 80 {
            format!("{}\u{2026}", &detail[..79])
        } else {
            detail.to_string()
        };

        self.bar.println(format!(
            "  {} Layer {:>3}/{:<3}  {}  {}",
            red("✗"),
            index + 1,
            total,
            name,
            red(&msg),
        ));
        self.bar.inc(1);
    }

    fn on_extraction_complete(&self, total_layers: usize, emitted: usize) {
        let dropped = self.errors.load(Ordering::SeqCst);
        self.bar.finish_and_clear();

        if dropped == 0 {
            eprintln!(
                "{} {} layers extracted successfully",
                green("✔"),
                bold(&emitted.to_string())
            );
        } else {
            eprintln!(
                "{} {}/{} layers extracted  ({} dropped)",
                if emitted == 0 { red("✘") } else { cyan("⚠") },
                bold(&emitted.to_string()),
                total_layers,
                red(&dropped.to_string()),
            );
        }
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Extract with inline data-URI assets (stdout)
  psd2doc banner-tree.json

  # Write document JSON and store layer PNGs in a directory
  psd2doc banner-tree.json -o banner.json --assets-dir ./assets

  # Upload layer PNGs to a CDN endpoint
  psd2doc banner-tree.json --upload-url https://cdn.example/upload

  # Strictly sequential processing (one upload at a time)
  psd2doc banner-tree.json --sequential

  # Drop placeholder text layers with empty content
  psd2doc banner-tree.json --skip-empty-text

INPUT FORMAT:
  A JSON dump of the parsed layer tree. Each node carries "name", optional
  "children", optional bounds (left/top/right/bottom), and payloads:
  "typeTool" (text record), "imagePng" (base64 PNG), "mask". See the
  psd2doc::node::value module docs for the full schema.

ENVIRONMENT VARIABLES:
  RUST_LOG                Tracing filter (overrides -v/-q)
  PSD2DOC_OUTPUT          Default for --output
  PSD2DOC_CONCURRENCY     Default for --concurrency
"#;

/// Extract a flat document model from a parsed PSD layer tree.
#[derive(Parser, Debug)]
#[command(
    name = "psd2doc",
    version,
    about = "Extract a flat document model from a parsed PSD layer tree",
    long_about = "Extract a flat, ordered document model (text and image layers with resolved \
geometry, masks, and externalized assets) from a JSON dump of a parsed PSD layer tree.",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// JSON layer-tree dump produced by the upstream parser.
    input: PathBuf,

    /// Write the extraction result JSON to this file instead of stdout.
    #[arg(short, long, env = "PSD2DOC_OUTPUT")]
    output: Option<PathBuf>,

    /// Store layer PNGs in this directory (file:// asset URLs).
    #[arg(long, conflicts_with = "upload_url")]
    assets_dir: Option<PathBuf>,

    /// Upload layer PNGs to this HTTP endpoint (response body = asset URL).
    #[arg(long)]
    upload_url: Option<String>,

    /// Number of layers processed concurrently.
    #[arg(short, long, env = "PSD2DOC_CONCURRENCY", default_value_t = 8)]
    concurrency: usize,

    /// Strictly sequential processing (equivalent to --concurrency 1).
    #[arg(long)]
    sequential: bool,

    /// Drop text layers whose resolved text is empty.
    #[arg(long)]
    skip_empty_text: bool,

    /// Retries per layer on upload failure.
    #[arg(long, default_value_t = 3)]
    max_retries: u32,

    /// Per-upload-attempt timeout in seconds.
    #[arg(long, default_value_t = 60)]
    upload_timeout: u64,

    /// Disable progress bar.
    #[arg(long)]
    no_progress: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long)]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long)]
    quiet: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    // Suppress INFO-level library logs when the progress bar is active;
    // the bar provides all the feedback that matters to the user.
    let show_progress = !cli.quiet && !cli.no_progress;
    let filter = if cli.verbose {
        "debug"
    } else if cli.quiet || show_progress {
        "error"
    } else {
        "info"
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(io::stderr)
        .init();

    // ── Parse the layer tree ─────────────────────────────────────────────
    let json = tokio::fs::read_to_string(&cli.input)
        .await
        .with_context(|| format!("Failed to read layer tree from {:?}", cli.input))?;
    let root = ValueNode::from_json(&json).context("Failed to parse layer tree")?;

    // ── Build config ─────────────────────────────────────────────────────
    let progress_cb: Option<ProgressCallback> = if show_progress {
        Some(CliProgressCallback::new_dynamic() as Arc<dyn ExtractionProgressCallback>)
    } else {
        None
    };

    let store: Arc<dyn AssetStore> = if let Some(ref url) = cli.upload_url {
        Arc::new(
            HttpAssetStore::new(url.clone(), cli.upload_timeout)
                .context("Failed to build HTTP asset store")?,
        )
    } else if let Some(ref dir) = cli.assets_dir {
        Arc::new(FsAssetStore::new(dir.clone()))
    } else {
        Arc::new(DataUriStore)
    };

    let concurrency = if cli.sequential { 1 } else { cli.concurrency };
    let mut builder = ExtractionConfig::builder()
        .concurrency(concurrency)
        .max_retries(cli.max_retries)
        .upload_timeout_secs(cli.upload_timeout)
        .skip_empty_text(cli.skip_empty_text)
        .store(store);

    if let Some(cb) = progress_cb {
        builder = builder.progress_callback(cb);
    }

    let config = builder.build().context("Invalid configuration")?;

    // ── Run extraction ───────────────────────────────────────────────────
    let output = extract(&root, &config)
        .await
        .context("Extraction failed")?;

    let json = serde_json::to_string_pretty(&output).context("Failed to serialise output")?;

    if let Some(ref output_path) = cli.output {
        tokio::fs::write(output_path, &json)
            .await
            .with_context(|| format!("Failed to write output file {:?}", output_path))?;

        if !cli.quiet {
            eprintln!(
                "{}  {} layers  {}ms  →  {}",
                if output.failures.is_empty() {
                    green("✔")
                } else {
                    cyan("⚠")
                },
                output.stats.emitted_layers(),
                output.stats.total_duration_ms,
                bold(&output_path.display().to_string()),
            );
        }
    } else {
        let stdout = io::stdout();
        let mut handle = stdout.lock();
        handle
            .write_all(json.as_bytes())
            .context("Failed to write to stdout")?;
        handle.write_all(b"\n").ok();
    }

    // Summary (the callback already printed the final green/red tick).
    if !cli.quiet {
        if !output.warnings.is_empty() {
            eprintln!("   {} warnings:", output.warnings.len());
            for w in &output.warnings {
                eprintln!("   {} {}", dim("•"), w);
            }
        }
        if !output.failures.is_empty() {
            eprintln!("   {} failures:", output.failures.len());
            for f in &output.failures {
                eprintln!("   {} {}", red("•"), f);
            }
        }
        if !show_progress {
            eprintln!(
                "Extracted {}/{} layers in {}ms",
                output.stats.emitted_layers(),
                output.stats.emitted_layers()
                    + output.stats.skipped_layers
                    + output.stats.failed_layers,
                output.stats.total_duration_ms
            );
        }
    }

    Ok(())
}
