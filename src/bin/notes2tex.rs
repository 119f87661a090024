//! CLI binary for notes2tex.
//!
//! A thin shim over the library crate that maps CLI flags to
//! `PipelineConfig`, prints the final text, and writes the export file.

use anyhow::{Context, Result};
use clap::Parser;
use notes2tex::{
    transcribe_files, Notes2TexError, OutputFormat, PipelineConfig, ProgressCallback, RunOutput,
    StructuredOutcome, StructuringPolicy, TranscriptionProgressCallback, Variant,
};
use indicatif::{ProgressBar, ProgressStyle};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

// ── ANSI colour helpers (no extra deps) ──────────────────────────────────────

fn green(s: &str) -> String {
    format!("\x1b[32m{s}\x1b[0m")
}
fn red(s: &str) -> String {
    format!("\x1b[31m{s}\x1b[0m")
}
fn yellow(s: &str) -> String {
    format!("\x1b[33m{s}\x1b[0m")
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

const TICKS: &[&str] = &["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"];

// ── CLI progress callback using indicatif ────────────────────────────────────

/// Terminal progress: one spinner line while a call is in flight, plus a
/// log line per image naming every failure or skip.
struct CliProgressCallback {
    bar: ProgressBar,
    target: &'static str,
    problems: AtomicUsize,
}

impl CliProgressCallback {
    fn new(format: OutputFormat) -> Arc<Self> {
        let bar = ProgressBar::new(0);
        let style = ProgressStyle::with_template("{spinner:.cyan} {prefix:.bold}  {msg}  ⏱ {elapsed}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_strings(TICKS);
        bar.set_style(style);
        bar.set_prefix("Preparing");
        bar.enable_steady_tick(Duration::from_millis(80));

        let target = match format {
            OutputFormat::Latex => "LaTeX",
            OutputFormat::Markdown => "Markdown",
        };
        Arc::new(Self {
            bar,
            target,
            problems: AtomicUsize::new(0),
        })
    }
}

impl TranscriptionProgressCallback for CliProgressCallback {
    fn on_run_start(&self, total_images: usize) {
        self.bar.set_length(total_images as u64);
        self.bar.set_prefix("Transcribing");
    }

    fn on_image_start(&self, position: usize, total: usize, name: &str) {
        self.bar.set_message(format!(
            "Converting page {position}/{total} ({name}) to {}…",
            self.target
        ));
    }

    fn on_image_complete(&self, position: usize, total: usize, name: &str, text_len: usize) {
        self.bar.println(format!(
            "  {} Page {:>3}/{:<3} {}  {}",
            green("✓"),
            position,
            total,
            name,
            dim(&format!("{text_len:>5} chars")),
        ));
        self.bar.inc(1);
    }

    fn on_image_error(&self, position: usize, total: usize, name: &str, error: &str) {
        self.problems.fetch_add(1, Ordering::SeqCst);
        self.bar.println(format!(
            "  {} Page {:>3}/{:<3} {}  {}",
            red("✗"),
            position,
            total,
            name,
            red(&shorten(error, 100)),
        ));
        self.bar.inc(1);
    }

    fn on_image_skipped(&self, position: usize, total: usize, name: &str) {
        self.problems.fetch_add(1, Ordering::SeqCst);
        self.bar.println(format!(
            "  {} Page {:>3}/{:<3} {}  {}",
            yellow("⚠"),
            position,
            total,
            name,
            yellow("no usable bytes, skipped"),
        ));
        self.bar.inc(1);
    }

    fn on_structuring_start(&self, _input_len: usize) {
        self.bar.set_prefix("Structuring");
        self.bar.set_message("Wrapping the transcription in a complete LaTeX document…");
    }

    fn on_structuring_complete(&self, output_len: usize) {
        self.bar.println(format!(
            "  {} Document structured  {}",
            green("✓"),
            dim(&format!("{output_len} chars"))
        ));
    }

    fn on_structuring_error(&self, error: &str) {
        self.bar.println(format!(
            "  {} Structuring failed  {}",
            red("✗"),
            red(&shorten(error, 100))
        ));
    }

    fn on_run_complete(&self, total_images: usize, transcribed: usize) {
        self.bar.finish_and_clear();
        let problems = self.problems.load(Ordering::SeqCst);
        if problems == 0 {
            eprintln!(
                "{} {} page(s) transcribed",
                green("✔"),
                bold(&transcribed.to_string())
            );
        } else {
            eprintln!(
                "{} {}/{} page(s) transcribed  ({} failed or skipped)",
                if transcribed == 0 { red("✘") } else { cyan("⚠") },
                bold(&transcribed.to_string()),
                total_images,
                red(&problems.to_string()),
            );
        }
    }
}

fn shorten(s: &str, max_chars: usize) -> String {
    if s.chars().count() <= max_chars {
        return s.to_string();
    }
    let head: String = s.chars().take(max_chars - 1).collect();
    format!("{head}\u{2026}")
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Several pages → one compilable LaTeX document (default variant)
  notes2tex page1.jpg page2.jpg page3.jpg --output-dir .

  # One page → LaTeX fragment on stdout
  notes2tex --variant latex lecture.png

  # One page → Markdown file
  notes2tex --variant markdown lecture.png -o lecture.md

  # Keep the raw transcription if the structuring call fails
  notes2tex --fallback-unstructured p1.png p2.png -o notes.tex

  # Use another provider through edgequake-llm
  notes2tex --provider openai --model gpt-4.1-mini page.jpg

  # Full run report as JSON
  notes2tex --json p1.png p2.png > run.json

VARIANTS:
  latex         1 image  → LaTeX          → resultado_latex.tex    (text/latex)
  markdown      1 image  → Markdown       → resultado_markdown.md  (text/plain)
  latex-multi   N images → LaTeX document → resultado_latex.tex    (text/latex)

ENVIRONMENT VARIABLES:
  GEMINI_API_KEY          Gemini API key (default provider)
  OPENAI_API_KEY          OpenAI API key (--provider openai)
  ANTHROPIC_API_KEY       Anthropic API key (--provider anthropic)
  EDGEQUAKE_LLM_PROVIDER  Provider for --provider auto
  EDGEQUAKE_MODEL         Model for --provider auto
"#;

/// Transcribe photos of handwritten notes to LaTeX or Markdown.
#[derive(Parser, Debug)]
#[command(
    name = "notes2tex",
    version,
    about = "Transcribe photos of handwritten notes to LaTeX or Markdown using Vision LLMs",
    long_about = "Send each photo of handwritten notes to a hosted multimodal model, collect \
the transcriptions in page order, optionally restructure them into one compilable LaTeX \
document, and export the result.",
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// Image files (.png, .jpeg, .jpg) or HTTP/HTTPS URLs, in page order.
    inputs: Vec<String>,

    /// Which flow to run.
    #[arg(long, env = "NOTES2TEX_VARIANT", value_enum, default_value = "latex-multi")]
    variant: VariantArg,

    /// Path to a text file replacing the per-image instruction.
    #[arg(long, env = "NOTES2TEX_INSTRUCTION")]
    instruction: Option<PathBuf>,

    /// Path to a text file replacing the structuring instruction.
    #[arg(long, env = "NOTES2TEX_STRUCTURE_INSTRUCTION")]
    structure_instruction: Option<PathBuf>,

    /// Skip the structuring pass even for latex-multi.
    #[arg(long, env = "NOTES2TEX_NO_STRUCTURE")]
    no_structure: bool,

    /// Model ID (default: gemini-2.5-flash for Gemini).
    #[arg(long, env = "NOTES2TEX_MODEL")]
    model: Option<String>,

    /// Provider: gemini (default), openai, anthropic, ollama, azure, auto.
    #[arg(long, env = "NOTES2TEX_PROVIDER")]
    provider: Option<String>,

    /// Gemini API key.
    #[arg(long, env = "GEMINI_API_KEY", hide_env_values = true)]
    api_key: Option<String>,

    /// Override the Gemini API base URL.
    #[arg(long, env = "NOTES2TEX_API_BASE_URL")]
    api_base_url: Option<String>,

    /// Per-call timeout in seconds (default: none).
    #[arg(long, env = "NOTES2TEX_API_TIMEOUT")]
    api_timeout: Option<u64>,

    /// HTTP download timeout in seconds for URL inputs.
    #[arg(long, env = "NOTES2TEX_DOWNLOAD_TIMEOUT", default_value_t = 120)]
    download_timeout: u64,

    /// Write the export file to this path.
    #[arg(short, long, env = "NOTES2TEX_OUTPUT", conflicts_with = "output_dir")]
    output: Option<PathBuf>,

    /// Write the export file into this directory under its fixed name.
    #[arg(long, env = "NOTES2TEX_OUTPUT_DIR")]
    output_dir: Option<PathBuf>,

    /// Export the unstructured transcription if the structuring pass fails.
    #[arg(long, env = "NOTES2TEX_FALLBACK_UNSTRUCTURED")]
    fallback_unstructured: bool,

    /// Remove an outer ``` fence the model may wrap its answer in.
    #[arg(long, env = "NOTES2TEX_STRIP_FENCES")]
    strip_fences: bool,

    /// Print the full run report (RunOutput) as JSON instead of the text.
    #[arg(long, env = "NOTES2TEX_JSON")]
    json: bool,

    /// Disable the progress spinner.
    #[arg(long, env = "NOTES2TEX_NO_PROGRESS")]
    no_progress: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, env = "NOTES2TEX_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors and the result.
    #[arg(short, long, env = "NOTES2TEX_QUIET")]
    quiet: bool,
}

#[derive(clap::ValueEnum, Clone, Copy, Debug)]
enum VariantArg {
    Latex,
    Markdown,
    LatexMulti,
}

impl From<VariantArg> for Variant {
    fn from(v: VariantArg) -> Self {
        match v {
            VariantArg::Latex => Variant::Latex,
            VariantArg::Markdown => Variant::Markdown,
            VariantArg::LatexMulti => Variant::LatexMulti,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    // The spinner gives all the feedback that matters; keep library INFO
    // logs out of its way unless --verbose.
    let show_progress = progress_enabled(&cli);
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

    // ── Nothing uploaded: prompt, no remote call ─────────────────────────
    if cli.inputs.is_empty() {
        eprintln!(
            "{} Please provide an image (.png, .jpeg, .jpg) to get started. See --help.",
            cyan("ℹ")
        );
        return Ok(());
    }

    let variant: Variant = cli.variant.into();
    let progress_cb: Option<ProgressCallback> = if show_progress {
        let cb = CliProgressCallback::new(variant.format());
        Some(cb as Arc<dyn TranscriptionProgressCallback>)
    } else {
        None
    };

    let config = build_config(&cli, progress_cb).await?;

    // ── Run ──────────────────────────────────────────────────────────────
    let output = match transcribe_files(&cli.inputs, &config).await {
        Ok(output) => output,
        Err(Notes2TexError::NoImages) => {
            eprintln!("{} {}", cyan("ℹ"), Notes2TexError::NoImages);
            return Ok(());
        }
        Err(e) => return Err(e).context("Transcription failed"),
    };

    // The callback already named every failed image; without it, do so here.
    // Failures are errors, so --quiet still shows them.
    if !show_progress {
        for line in failure_lines(&output) {
            eprintln!("{line}");
        }
    }

    if cli.json {
        let json = serde_json::to_string_pretty(&output).context("Failed to serialise output")?;
        println!("{json}");
    }

    // ── Export ───────────────────────────────────────────────────────────
    let artifact = output
        .export(config.structuring_policy)
        .context("Export aborted")?;

    if !cli.json {
        write_body(&mut io::stdout().lock(), &artifact.body).context("Failed to write to stdout")?;
    }

    let written = if let Some(ref path) = cli.output {
        artifact.write_to(path).context("Export failed")?;
        Some(path.clone())
    } else if let Some(ref dir) = cli.output_dir {
        Some(artifact.write_to_dir(dir).context("Export failed")?)
    } else {
        None
    };

    if !cli.quiet {
        let stats = &output.stats;
        eprintln!(
            "{}  {}/{} pages  {}ms{}",
            if stats.failed + stats.skipped == 0 {
                green("✔")
            } else {
                cyan("⚠")
            },
            stats.transcribed,
            stats.total_images,
            stats.total_duration_ms,
            match written {
                Some(ref p) => format!(
                    "  →  {} {}",
                    bold(&p.display().to_string()),
                    dim(&format!("({})", artifact.content_type))
                ),
                None => String::new(),
            }
        );
    }

    Ok(())
}

/// The spinner callback reports failures itself; when it is off, `main`
/// prints [`failure_lines`] instead.
fn progress_enabled(cli: &Cli) -> bool {
    !cli.quiet && !cli.no_progress && !cli.json
}

/// One line per failed or skipped image, then the structuring failure if any.
fn failure_lines(output: &RunOutput) -> Vec<String> {
    let mut lines: Vec<String> = output
        .image_errors()
        .map(|err| {
            let mark = if err.is_skip() { yellow("⚠") } else { red("✗") };
            format!("{mark} {err}")
        })
        .collect();
    if let Some(StructuredOutcome::Failed { ref detail }) = output.structured {
        lines.push(format!("{} Structuring failed: {}", red("✗"), detail));
    }
    lines
}

/// Print the final text, ending it with a newline if it lacks one.
fn write_body(out: &mut impl Write, body: &str) -> io::Result<()> {
    out.write_all(body.as_bytes())?;
    if !body.ends_with('\n') {
        out.write_all(b"\n")?;
    }
    out.flush()
}

/// Map CLI args to `PipelineConfig`.
async fn build_config(cli: &Cli, progress: Option<ProgressCallback>) -> Result<PipelineConfig> {
    let mut builder = PipelineConfig::builder()
        .variant(cli.variant.into())
        .download_timeout_secs(cli.download_timeout)
        .strip_fences(cli.strip_fences)
        .structuring_policy(if cli.fallback_unstructured {
            StructuringPolicy::FallbackToAggregate
        } else {
            StructuringPolicy::Strict
        });

    if cli.no_structure {
        builder = builder.structure(false);
    }
    if let Some(ref path) = cli.instruction {
        builder = builder.instruction(read_text(path).await?);
    }
    if let Some(ref path) = cli.structure_instruction {
        builder = builder.structuring_instruction(read_text(path).await?);
    }
    if let Some(ref model) = cli.model {
        builder = builder.model(model);
    }
    if let Some(ref provider) = cli.provider {
        builder = builder.provider_name(provider);
    }
    if let Some(ref key) = cli.api_key {
        builder = builder.api_key(key);
    }
    if let Some(ref url) = cli.api_base_url {
        builder = builder.api_base_url(url);
    }
    if let Some(secs) = cli.api_timeout {
        builder = builder.api_timeout_secs(secs);
    }
    if let Some(cb) = progress {
        builder = builder.progress_callback(cb);
    }

    builder.build().context("Invalid configuration")
}

async fn read_text(path: &Path) -> Result<String> {
    tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("Failed to read instruction from {:?}", path))
}
