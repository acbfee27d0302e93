//! DOCX Translator CLI - Command line tool for translating Word documents.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use docx_translator_core::util::{checkpoint_dir, format_size};
use docx_translator_core::{
    AppConfig, Lang, ProgressListener, RunControl, RunOutcome, Session, TranslationPipeline,
    cache_status, codec_for_path, diagnose, purge, supported_languages,
};
use indicatif::{ProgressBar, ProgressStyle};
use std::io::{BufRead, Write};
use std::path::{Path, PathBuf};
use tracing::{Level, info};
use tracing_subscriber::FmtSubscriber;

#[derive(Parser, Debug)]
#[command(name = "docx-translate")]
#[command(author, version, about = "Translate Word documents, resuming where an interrupted run stopped", long_about = None)]
struct Args {
    #[command(subcommand)]
    command: Commands,

    /// Config file path
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Verbose output
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Translate a document
    Translate(TranslateArgs),

    /// Inspect a document and report anything that would hinder translation
    Diagnose {
        /// Input document
        input: PathBuf,
    },

    /// Inspect or remove the checkpoints kept next to a document
    Cache {
        #[command(subcommand)]
        action: CacheAction,
    },

    /// List the supported target languages
    Languages,
}

#[derive(Subcommand, Debug)]
enum CacheAction {
    /// Show the size of the checkpoint directory
    Status {
        /// Document whose checkpoint directory to inspect
        input: PathBuf,
    },
    /// Delete the checkpoint directory with every checkpoint in it
    Clean {
        /// Document whose checkpoint directory to delete
        input: PathBuf,

        /// Do not ask for confirmation
        #[arg(short, long)]
        yes: bool,
    },
}

#[derive(Parser, Debug)]
struct TranslateArgs {
    /// Input document (.docx, or .json document model)
    input: PathBuf,

    /// Target language: English name, native name or code (e.g. "Japanese", "日本語", "ja")
    #[arg(short, long)]
    target: Option<String>,

    /// Output file (default: <input>_translated_<language>.<ext>)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Resume from a checkpoint without asking
    #[arg(long, conflicts_with = "restart")]
    resume: bool,

    /// Discard any checkpoint and start over
    #[arg(long)]
    restart: bool,

    /// Do not copy paragraph styles into the translation
    #[arg(long)]
    no_format: bool,

    /// API key; repeat or separate with commas for failover between keys
    #[arg(long, env = "X_AI_API_KEY", value_delimiter = ',', hide_env_values = true)]
    api_key: Vec<String>,

    /// OpenAI-compatible API base URL
    #[arg(long, env = "X_AI_API_BASE")]
    api_base: Option<String>,

    /// Model name
    #[arg(long, env = "X_AI_MODEL")]
    model: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ResumePolicy {
    Ask,
    Resume,
    Restart,
}

/// Progress bar driver for the pipeline
struct CliListener {
    bar: ProgressBar,
    policy: ResumePolicy,
}

impl ProgressListener for CliListener {
    #[allow(clippy::cast_possible_truncation)]
    fn on_progress(&self, current: usize, total: usize) {
        self.bar.set_length(total as u64);
        self.bar.set_position(current as u64);
    }

    fn on_warning(&self, message: &str) {
        self.bar.println(format!("warning: {message}"));
    }

    fn on_error(&self, message: &str) {
        self.bar.println(format!("error: {message}"));
    }

    fn confirm_resume(&self, cursor: usize, total: usize) -> bool {
        match self.policy {
            ResumePolicy::Resume => true,
            ResumePolicy::Restart => false,
            ResumePolicy::Ask => self.bar.suspend(|| {
                ask(&format!(
                    "Found a checkpoint at block {cursor}/{total}. Resume from there? [Y/n] "
                ), true)
            }),
        }
    }
}

/// Yes/no question on stdin; an empty or unreadable answer is `default`.
#[allow(clippy::print_stdout)]
fn ask(question: &str, default: bool) -> bool {
    print!("{question}");
    std::io::stdout().flush().ok();

    let mut answer = String::new();
    if std::io::stdin().lock().read_line(&mut answer).is_err() {
        return default;
    }
    match answer.trim().to_lowercase().as_str() {
        "" => default,
        "y" | "yes" => true,
        _ => false,
    }
}

fn load_config(path: Option<&Path>) -> Result<AppConfig> {
    match path {
        Some(path) => AppConfig::from_file(path).context("Failed to load config file"),
        None => Ok(AppConfig::load()),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (before parsing args so env vars are available)
    dotenvy::dotenv().ok();

    let args = Args::parse();

    // Setup logging
    let log_level = match args.verbose {
        0 => Level::WARN,
        1 => Level::INFO,
        2 => Level::DEBUG,
        _ => Level::TRACE,
    };

    FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_target(false)
        .init();

    let config = load_config(args.config.as_deref())?;

    match args.command {
        Commands::Translate(translate_args) => translate(config, translate_args).await,
        Commands::Diagnose { input } => run_diagnose(&input),
        Commands::Cache { action } => run_cache(&config, action),
        Commands::Languages => {
            list_languages();
            Ok(())
        }
    }
}

async fn translate(mut config: AppConfig, args: TranslateArgs) -> Result<()> {
    // Override config with CLI arguments
    if let Some(target) = &args.target {
        config.target_lang = Lang::parse(target)?;
    }
    if args.no_format {
        config.preserve_format = false;
    }
    if !args.api_key.is_empty() {
        config.translator.api_keys = args.api_key;
    }
    if let Some(api_base) = args.api_base {
        config.translator.api_base = api_base;
    }
    if let Some(model) = args.model {
        config.translator.model = model;
    }

    let pipeline = TranslationPipeline::new(config.clone()).context("Failed to initialize translator")?;
    info!(
        "Using {} with {} credential(s), model {}",
        pipeline.translator().name(),
        pipeline.translator().info().credentials,
        config.translator.model
    );

    let mut session = Session::new(&args.input, config.target_lang.clone());
    if let Some(output) = args.output {
        session = session.with_output(output);
    }

    // Setup progress bar
    let bar = ProgressBar::new(0);
    // Template is hardcoded and valid, unwrap is safe
    #[allow(clippy::unwrap_used)]
    bar.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({eta})")
            .unwrap()
            .progress_chars("#>-"),
    );

    let policy = if args.resume {
        ResumePolicy::Resume
    } else if args.restart {
        ResumePolicy::Restart
    } else {
        ResumePolicy::Ask
    };
    let listener = CliListener { bar: bar.clone(), policy };

    // Ctrl-C stops at the next block boundary and keeps the checkpoint
    let control = RunControl::new();
    let interrupt = {
        let control = control.clone();
        let bar = bar.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                bar.println("Stopping after the current batch...");
                control.cancel();
            }
        })
    };

    let outcome = pipeline
        .run(&session, &control, &listener)
        .await
        .context(format!("Failed to translate {}", args.input.display()));
    interrupt.abort();
    bar.finish_and_clear();

    // CLI output is intentional
    #[allow(clippy::print_stdout)]
    {
        match outcome? {
            RunOutcome::Completed { output_path, stats } => {
                println!("Translated document saved to: {}", output_path.display());
                println!(
                    "{} blocks, {} requests, {} fragment(s) kept in the original language",
                    stats.blocks, stats.requests, stats.fallbacks
                );
            }
            RunOutcome::Cancelled { cursor, total } => {
                println!("Stopped at block {cursor}/{total}. Run the same command again to resume.");
            }
        }
    }

    Ok(())
}

fn run_diagnose(input: &Path) -> Result<()> {
    let bytes = std::fs::read(input).context(format!("Failed to read {}", input.display()))?;
    let codec = codec_for_path(input);
    let report = diagnose(codec.as_ref(), &bytes);

    #[allow(clippy::print_stdout)]
    {
        println!("{}", input.display());
        println!("{report}");
    }

    if report.is_healthy() {
        Ok(())
    } else {
        anyhow::bail!("{} problem(s) found", report.problems.len())
    }
}

fn run_cache(config: &AppConfig, action: CacheAction) -> Result<()> {
    match action {
        CacheAction::Status { input } => {
            let dir = checkpoint_dir(&input, &config.checkpoint.dir_name);
            let status = cache_status(&dir).context("Failed to read cache directory")?;
            #[allow(clippy::print_stdout)]
            {
                println!("Cache directory: {}", dir.display());
                println!("{} file(s), {}", status.files, format_size(status.bytes));
            }
            Ok(())
        }
        CacheAction::Clean { input, yes } => {
            let dir = checkpoint_dir(&input, &config.checkpoint.dir_name);
            let status = cache_status(&dir).context("Failed to read cache directory")?;
            if status.files == 0 {
                #[allow(clippy::print_stdout)]
                {
                    println!("Nothing to clean in {}", dir.display());
                }
                return Ok(());
            }

            let confirmed = yes
                || ask(
                    &format!(
                        "Delete {} file(s) ({}) in {}? [y/N] ",
                        status.files,
                        format_size(status.bytes),
                        dir.display()
                    ),
                    false,
                );
            if confirmed {
                let removed = purge(&dir).context("Failed to clean cache directory")?;
                #[allow(clippy::print_stdout)]
                {
                    println!("Removed {removed} file(s)");
                }
            }
            Ok(())
        }
    }
}

#[allow(clippy::print_stdout)]
fn list_languages() {
    for lang in supported_languages() {
        println!("{:<8} {:<20} {}", lang.code, lang.name, lang.label);
    }
}
