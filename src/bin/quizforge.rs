//! CLI binary for quizforge.
//!
//! A thin shim over the library crate that maps CLI flags to
//! `GenerationConfig` / `GenerationRequest` and prints results.

use anyhow::{bail, Context, Result};
use clap::Parser;
use quizforge::{
    commit_generation, generate, generate_study_material, CommitOutcome, GenerationConfig,
    GenerationOutput, GenerationProgressCallback, GenerationRequest, JsonFileStore, LlmGenerator,
    ProgressCallback, SourceContent, SourceKind, write_questions,
};
use indicatif::{ProgressBar, ProgressStyle};
use std::io::{self, Read, Write};
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

const TICKS: &[&str] = &["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"];

/// Progress bar over chunks with one log line per page.
struct CliProgressCallback {
    bar: ProgressBar,
    retries: AtomicUsize,
}

impl CliProgressCallback {
    fn new() -> Arc<Self> {
        let bar = ProgressBar::new(0);
        let spinner_style = ProgressStyle::with_template("{spinner:.cyan} {prefix:.bold}  {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_strings(TICKS);
        bar.set_style(spinner_style);
        bar.set_prefix("Preparing");
        bar.enable_steady_tick(Duration::from_millis(80));

        Arc::new(Self {
            bar,
            retries: AtomicUsize::new(0),
        })
    }
}

impl GenerationProgressCallback for CliProgressCallback {
    fn on_generation_start(&self, total_chunks: usize) {
        let style = ProgressStyle::with_template(
            "{spinner:.cyan} {prefix:.bold}  \
             [{bar:42.green/238}] {pos:>3}/{len} chunks  \
             ⏱ {elapsed_precise}",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("█▉▊▋▌▍▎▏  ")
        .tick_strings(TICKS);

        self.bar.set_length(total_chunks as u64);
        self.bar.set_style(style);
        self.bar.set_prefix("Generating");
        self.bar.println(format!(
            "{} {}",
            cyan("◆"),
            bold(&format!("Generating questions from {total_chunks} chunk(s)…"))
        ));
    }

    fn on_chunk_start(&self, page_number: usize, _total: usize, requested: usize) {
        self.bar
            .set_message(format!("page {page_number}: {requested} questions"));
    }

    fn on_batch_retry(&self, page_number: usize, attempt: u32, reason: &str) {
        self.retries.fetch_add(1, Ordering::SeqCst);
        self.bar.set_message(format!(
            "page {page_number}: attempt {attempt} ({reason})"
        ));
    }

    fn on_chunk_complete(&self, page_number: usize, total: usize, accepted: usize) {
        let mark = if accepted > 0 { green("✓") } else { red("✗") };
        self.bar.println(format!(
            "  {} Page {:>3}/{:<3}  {}",
            mark,
            page_number,
            total,
            dim(&format!("{accepted:>2} questions")),
        ));
        self.bar.inc(1);
    }

    fn on_chunk_skipped(&self, page_number: usize, total: usize, reason: &str) {
        self.bar.println(format!(
            "  {} Page {:>3}/{:<3}  {}",
            dim("-"),
            page_number,
            total,
            dim(reason),
        ));
        self.bar.inc(1);
    }

    fn on_generation_complete(&self, total_chunks: usize, total_questions: usize) {
        self.bar.finish_and_clear();
        let retries = self.retries.load(Ordering::SeqCst);
        eprintln!(
            "{} {} questions from {} chunk(s){}",
            if total_questions > 0 { green("✔") } else { red("✘") },
            bold(&total_questions.to_string()),
            total_chunks,
            if retries > 0 {
                dim(&format!("  ({retries} retries)"))
            } else {
                String::new()
            },
        );
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Five questions per page of a pdftotext dump (pages split on form feeds)
  quizforge lecture.txt --kind pdf

  # Pages 1-3 and 5, at most 8 questions, written to a file
  quizforge lecture.txt --kind pdf --pages 1-3,5 --total-limit 8 -o quiz.json

  # Pre-split pages as a JSON array of strings
  quizforge pages.json --questions-per-chunk 3

  # 40 questions from a transcript (three generator calls of 15/15/10)
  quizforge transcript.txt --kind youtube --total-limit 40

  # Replace the stored question set for a source
  quizforge notes.txt --source-id biology-101 --store ./questions

  # No document: generate study material on a topic, then quiz it
  quizforge --topic "Plate tectonics" --total-limit 10

INPUT FORMATS:
  *.json   JSON array of page texts
  -        read text from stdin
  other    plain text; split on form feeds when --kind is pdf

ENVIRONMENT VARIABLES:
  OPENAI_API_KEY          OpenAI API key
  ANTHROPIC_API_KEY       Anthropic API key
  GEMINI_API_KEY          Google Gemini API key
  QUIZFORGE_LLM_PROVIDER  Override provider (openai, anthropic, gemini, ollama)
  QUIZFORGE_MODEL         Override model ID
"#;

/// Generate multiple-choice quiz questions from document text.
#[derive(Parser, Debug)]
#[command(
    name = "quizforge",
    version,
    about = "Generate validated multiple-choice quiz questions from document text using LLMs",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// Text file, JSON array of pages, or "-" for stdin.
    #[arg(required_unless_present = "topic")]
    input: Option<String>,

    /// Source format: pdf, docx, pptx, txt, youtube. Guessed from the input if omitted.
    #[arg(long, env = "QUIZFORGE_KIND")]
    kind: Option<SourceKind>,

    /// Questions requested per page (clamped to 15).
    #[arg(short = 'n', long, env = "QUIZFORGE_QUESTIONS_PER_CHUNK", default_value_t = 5)]
    questions_per_chunk: usize,

    /// Global cap on questions for the whole source.
    #[arg(short = 't', long, env = "QUIZFORGE_TOTAL_LIMIT")]
    total_limit: Option<usize>,

    /// Page selection, 1-indexed: "1-3,5". Ignored for single-block sources.
    #[arg(long, env = "QUIZFORGE_PAGES")]
    pages: Option<String>,

    /// Identifier stamped on every question. Defaults to the input file stem.
    #[arg(long, env = "QUIZFORGE_SOURCE_ID")]
    source_id: Option<String>,

    /// LLM model ID (e.g. gpt-4.1-nano, gpt-4.1-mini, claude-sonnet-4-20250514).
    #[arg(long, env = "QUIZFORGE_MODEL")]
    model: Option<String>,

    /// LLM provider: openai, anthropic, gemini, ollama, azure.
    #[arg(long, env = "QUIZFORGE_PROVIDER")]
    provider: Option<String>,

    /// LLM temperature (0.0–2.0).
    #[arg(long, env = "QUIZFORGE_TEMPERATURE", default_value_t = 0.2)]
    temperature: f32,

    /// Max LLM output tokens per call.
    #[arg(long, env = "QUIZFORGE_MAX_TOKENS", default_value_t = 2000)]
    max_tokens: usize,

    /// Nucleus sampling cutoff (0.0–1.0).
    #[arg(long, env = "QUIZFORGE_TOP_P", default_value_t = 0.9)]
    top_p: f32,

    /// Attempts per batch, including the first.
    #[arg(long, env = "QUIZFORGE_MAX_ATTEMPTS", default_value_t = 3)]
    max_attempts: u32,

    /// Per-call LLM timeout in seconds.
    #[arg(long, env = "QUIZFORGE_API_TIMEOUT", default_value_t = 60)]
    api_timeout: u64,

    /// Write the questions as a JSON array to this file.
    #[arg(short, long, env = "QUIZFORGE_OUTPUT")]
    output: Option<PathBuf>,

    /// Replace the stored question set for the source in this directory.
    #[arg(long, env = "QUIZFORGE_STORE")]
    store: Option<PathBuf>,

    /// Generate study material on this topic and use it as the source.
    #[arg(long, env = "QUIZFORGE_TOPIC", conflicts_with = "input")]
    topic: Option<String>,

    /// Print the full run result (questions, chunks, stats) as JSON.
    #[arg(long, env = "QUIZFORGE_JSON")]
    json: bool,

    /// Disable progress bar.
    #[arg(long, env = "QUIZFORGE_NO_PROGRESS")]
    no_progress: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, env = "QUIZFORGE_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, env = "QUIZFORGE_QUIET")]
    quiet: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    // The progress bar replaces INFO logs while it is visible.
    let show_progress = !cli.quiet && !cli.no_progress && !cli.json;
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

    let progress_cb: Option<ProgressCallback> = if show_progress {
        Some(CliProgressCallback::new() as Arc<dyn GenerationProgressCallback>)
    } else {
        None
    };
    let config = build_config(&cli, progress_cb)?;
    let generator = LlmGenerator::from_config(&config).context("No LLM provider available")?;

    // ── Load content ─────────────────────────────────────────────────────
    let (content, kind, default_id) = match (&cli.topic, &cli.input) {
        (Some(topic), _) => {
            if !cli.quiet && !cli.json {
                eprintln!("{} writing study material on {}…", cyan("◆"), bold(topic));
            }
            let material = generate_study_material(&generator, topic, &config)
                .await
                .context("Study material generation failed")?;
            let content = SourceContent::from_extracted(SourceKind::Txt, Some(vec![material]));
            (content, SourceKind::Txt, slug(topic))
        }
        (None, Some(input)) => {
            let (content, kind) = load_content(input, cli.kind).await?;
            (content, kind, default_source_id(input))
        }
        (None, None) => bail!("either INPUT or --topic is required"),
    };
    let source_id = cli.source_id.clone().unwrap_or(default_id);
    if !cli.quiet && !cli.json {
        eprintln!(
            "{} {} {}",
            cyan("◆"),
            bold(&source_id),
            dim(&format!("({kind}, {} chunk(s))", content.chunk_count()))
        );
    }

    let request = GenerationRequest::new(cli.questions_per_chunk, cli.pages.clone(), cli.total_limit)
        .context("Invalid request")?;

    // ── Run generation ───────────────────────────────────────────────────
    let output = generate(&generator, &content, &request, &source_id, &config)
        .await
        .context("Generation failed")?;

    if let Some(ref dir) = cli.store {
        let store = JsonFileStore::new(dir);
        match commit_generation(&store, &output).await.context("Failed to store questions")? {
            CommitOutcome::Replaced { count } if !cli.quiet => eprintln!(
                "{} stored {} questions in {}",
                green("✔"),
                count,
                bold(&store.path_for(&source_id).display().to_string())
            ),
            CommitOutcome::KeptExisting { existing } if !cli.quiet => eprintln!(
                "{} nothing generated; kept {} existing questions",
                cyan("⚠"),
                existing
            ),
            _ => {}
        }
    }

    if let Some(ref path) = cli.output {
        write_questions(path, &output.questions).await?;
    }

    if cli.json {
        let json = serde_json::to_string_pretty(&output).context("Failed to serialise output")?;
        println!("{json}");
    } else if cli.output.is_none() && cli.store.is_none() {
        print_questions(&output)?;
    }

    if !cli.quiet && !cli.json {
        let s = &output.stats;
        eprintln!(
            "   {} questions  {}/{} chunks  {} calls  {}ms",
            bold(&s.total_questions.to_string()),
            s.productive_chunks,
            s.selected_chunks,
            s.total_attempts,
            s.total_duration_ms,
        );
        eprintln!(
            "   {} tokens in  /  {} tokens out",
            dim(&s.total_input_tokens.to_string()),
            dim(&s.total_output_tokens.to_string()),
        );
    }

    if output.is_empty() && !content.is_unavailable() {
        bail!("No questions could be generated for '{}'", source_id);
    }
    Ok(())
}

/// Map CLI args to `GenerationConfig`.
fn build_config(cli: &Cli, progress: Option<ProgressCallback>) -> Result<GenerationConfig> {
    let mut builder = GenerationConfig::builder()
        .temperature(cli.temperature)
        .top_p(cli.top_p)
        .max_tokens(cli.max_tokens)
        .max_attempts(cli.max_attempts)
        .api_timeout_secs(cli.api_timeout);

    if let Some(ref model) = cli.model {
        builder = builder.model(model);
    }
    if let Some(ref provider) = cli.provider {
        builder = builder.provider_name(provider);
    }
    if let Some(cb) = progress {
        builder = builder.progress_callback(cb);
    }

    builder.build().context("Invalid configuration")
}

/// Read INPUT into `SourceContent`, guessing the kind when not given.
async fn load_content(input: &str, kind: Option<SourceKind>) -> Result<(SourceContent, SourceKind)> {
    if input.ends_with(".json") {
        let raw = tokio::fs::read_to_string(input)
            .await
            .with_context(|| format!("Failed to read {input}"))?;
        let pages: Vec<String> = serde_json::from_str(&raw)
            .with_context(|| format!("{input} must be a JSON array of strings"))?;
        let kind = kind.unwrap_or(SourceKind::Pdf);
        return Ok((SourceContent::from_extracted(kind, Some(pages)), kind));
    }

    let text = if input == "-" {
        let mut buf = String::new();
        io::stdin()
            .read_to_string(&mut buf)
            .context("Failed to read stdin")?;
        buf
    } else {
        tokio::fs::read_to_string(input)
            .await
            .with_context(|| format!("Failed to read {input}"))?
    };

    let kind = kind.unwrap_or(if text.contains('\u{000C}') {
        SourceKind::Pdf
    } else {
        SourceKind::Txt
    });
    let content = if kind.is_paginated() {
        SourceContent::from_form_feed_text(&text)
    } else {
        SourceContent::from_extracted(kind, Some(vec![text]))
    };
    Ok((content, kind))
}

fn default_source_id(input: &str) -> String {
    if input == "-" {
        return "stdin".to_string();
    }
    Path::new(input)
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| "source".to_string())
}

/// Lower-case, dash-separated id for a topic title.
fn slug(title: &str) -> String {
    let words: Vec<String> = title
        .split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
        .map(str::to_lowercase)
        .collect();
    if words.is_empty() {
        "topic".to_string()
    } else {
        words.join("-")
    }
}

fn print_questions(output: &GenerationOutput) -> Result<()> {
    let stdout = io::stdout();
    let mut out = stdout.lock();
    for (i, q) in output.questions.iter().enumerate() {
        writeln!(out, "{}. [p{}] {}", i + 1, q.page_number, q.question_text)?;
        for (key, text) in &q.options {
            writeln!(out, "   {key}) {text}")?;
        }
        writeln!(out, "   Answer: {}. {}", q.correct_answer, q.explanation)?;
        writeln!(out)?;
    }
    Ok(())
}
