//! CLI command definitions for blogforge.

use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::Parser;
use tracing::{info, warn};

use crate::config::AppConfig;
use crate::models::Note;
use crate::pipeline::{BatchRunner, BlogPipeline};
use crate::services::{BraveSearchClient, OpenRouterClient, ReplicateClient};

/// Default inbox directory scanned by `blogforge batch`.
const DEFAULT_INBOX_DIR: &str = "./inbox";

/// Default output directory for generated posts.
const DEFAULT_OUTPUT_DIR: &str = "./output";

/// Convert raw notes into publishable blog posts using LLM agents.
#[derive(Parser)]
#[command(name = "blogforge")]
#[command(about = "Convert notes to blog posts using AI agents")]
#[command(version)]
#[command(
    long_about = "blogforge runs a fixed 15-step pipeline (analysis, research, writing, \
imagery, metadata) over raw notes and emits markdown blog posts with frontmatter.\n\n\
Example usage:\n  blogforge process ./inbox/note1.md --output ./output"
)]
pub struct Cli {
    /// The subcommand to execute.
    #[command(subcommand)]
    pub command: Commands,

    /// Log level (trace, debug, info, warn, error).
    #[arg(short, long, default_value = "info", global = true)]
    pub log_level: String,
}

/// Available CLI subcommands.
#[derive(clap::Subcommand)]
pub enum Commands {
    /// Process a single note file into a blog post.
    Process(ProcessArgs),

    /// Process every note file in the inbox directory.
    Batch(BatchArgs),

    /// Probe the health of the external services.
    Health(HealthArgs),
}

/// Arguments for `blogforge process`.
#[derive(Parser, Debug)]
pub struct ProcessArgs {
    /// Path to the note file to process.
    pub file: PathBuf,

    /// Output directory for the generated post.
    #[arg(short, long, default_value = DEFAULT_OUTPUT_DIR)]
    pub output: PathBuf,
}

/// Arguments for `blogforge batch`.
#[derive(Parser, Debug)]
pub struct BatchArgs {
    /// Inbox directory to scan for .md and .txt notes.
    #[arg(long, default_value = DEFAULT_INBOX_DIR)]
    pub inbox: PathBuf,

    /// Output directory for generated posts.
    #[arg(short, long, default_value = DEFAULT_OUTPUT_DIR)]
    pub output: PathBuf,
}

/// Arguments for `blogforge health`.
#[derive(Parser, Debug)]
pub struct HealthArgs {
    /// Output the reports as JSON.
    #[arg(short, long)]
    pub json: bool,
}

/// Parses CLI arguments from the process environment.
pub fn parse_cli() -> Cli {
    Cli::parse()
}

/// Runs the parsed CLI command.
pub async fn run_with_cli(cli: Cli) -> anyhow::Result<()> {
    let config = AppConfig::from_env().context("failed to load configuration")?;

    match cli.command {
        Commands::Process(args) => cmd_process(&config, args).await,
        Commands::Batch(args) => cmd_batch(&config, args).await,
        Commands::Health(args) => cmd_health(&config, args).await,
    }
}

async fn cmd_process(config: &AppConfig, args: ProcessArgs) -> anyhow::Result<()> {
    let note = Note::from_file(&args.file)
        .with_context(|| format!("failed to read note {}", args.file.display()))?;

    let pipeline = BlogPipeline::from_config(config);
    let artifact = pipeline
        .run(&note.content, &note.filename)
        .await
        .with_context(|| format!("pipeline failed for {}", args.file.display()))?;

    let path = write_post(&args.output, &artifact.filename, &artifact.to_markdown())?;
    println!("Blog post generated: {}", path.display());
    Ok(())
}

async fn cmd_batch(config: &AppConfig, args: BatchArgs) -> anyhow::Result<()> {
    let notes = collect_notes(&args.inbox)?;
    if notes.is_empty() {
        println!("No note files found in {}.", args.inbox.display());
        return Ok(());
    }

    info!(count = notes.len(), inbox = %args.inbox.display(), "starting batch");
    let pipeline = BlogPipeline::from_config(config);
    let runner = BatchRunner::new(&pipeline);
    let (executions, stats) = runner.run_notes(notes).await;

    for execution in &executions {
        match &execution.artifact {
            Some(artifact) => {
                let path = write_post(&args.output, &artifact.filename, &artifact.to_markdown())?;
                println!("Processed: {} -> {}", execution.filename, path.display());
            }
            None => {
                println!(
                    "Failed: {} ({})",
                    execution.filename,
                    execution.error.as_deref().unwrap_or("unknown error")
                );
            }
        }
    }

    println!(
        "Batch complete: {} processed, {} succeeded, {} failed.",
        stats.total, stats.succeeded, stats.failed
    );
    Ok(())
}

async fn cmd_health(config: &AppConfig, args: HealthArgs) -> anyhow::Result<()> {
    let reports = vec![
        OpenRouterClient::new(config).health_check().await,
        BraveSearchClient::new(config).health_check().await,
        ReplicateClient::new(config).health_check().await,
    ];

    if args.json {
        println!("{}", serde_json::to_string_pretty(&reports)?);
    } else {
        for report in &reports {
            let status = if report.healthy { "healthy" } else { "unhealthy" };
            match &report.error {
                Some(err) => println!(
                    "{:<14} {} ({:.1}s): {}",
                    report.service,
                    status,
                    report.elapsed.as_secs_f64(),
                    err
                ),
                None => println!(
                    "{:<14} {} ({:.1}s)",
                    report.service,
                    status,
                    report.elapsed.as_secs_f64()
                ),
            }
        }
    }

    if reports.iter().any(|report| !report.healthy) {
        anyhow::bail!("one or more services are unhealthy");
    }
    Ok(())
}

/// Scans a directory for `.md` and `.txt` notes, skipping unreadable or
/// too-short files with a warning.
fn collect_notes(inbox: &Path) -> anyhow::Result<Vec<Note>> {
    let entries = std::fs::read_dir(inbox)
        .with_context(|| format!("failed to read inbox directory {}", inbox.display()))?;

    let mut notes = Vec::new();
    for entry in entries {
        let path = entry?.path();
        let is_note = path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| ext.eq_ignore_ascii_case("md") || ext.eq_ignore_ascii_case("txt"))
            .unwrap_or(false);
        if !is_note {
            continue;
        }

        match Note::from_file(&path) {
            Ok(note) => notes.push(note),
            Err(err) => {
                warn!(path = %path.display(), error = %err, "skipping unreadable note");
            }
        }
    }

    notes.sort_by(|a, b| a.filename.cmp(&b.filename));
    Ok(notes)
}

/// Writes a rendered post into the output directory.
fn write_post(output_dir: &Path, filename: &str, markdown: &str) -> anyhow::Result<PathBuf> {
    std::fs::create_dir_all(output_dir)
        .with_context(|| format!("failed to create output directory {}", output_dir.display()))?;

    let path = output_dir.join(filename);
    std::fs::write(&path, markdown)
        .with_context(|| format!("failed to write {}", path.display()))?;
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_parses() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_process_args() {
        let cli = Cli::try_parse_from(["blogforge", "process", "note.md", "--output", "./out"])
            .expect("parses");
        match cli.command {
            Commands::Process(args) => {
                assert_eq!(args.file, PathBuf::from("note.md"));
                assert_eq!(args.output, PathBuf::from("./out"));
            }
            _ => panic!("expected process command"),
        }
    }

    #[test]
    fn test_batch_args_defaults() {
        let cli = Cli::try_parse_from(["blogforge", "batch"]).expect("parses");
        match cli.command {
            Commands::Batch(args) => {
                assert_eq!(args.inbox, PathBuf::from(DEFAULT_INBOX_DIR));
                assert_eq!(args.output, PathBuf::from(DEFAULT_OUTPUT_DIR));
            }
            _ => panic!("expected batch command"),
        }
    }

    #[test]
    fn test_global_log_level() {
        let cli = Cli::try_parse_from(["blogforge", "--log-level", "debug", "health"])
            .expect("parses");
        assert_eq!(cli.log_level, "debug");
    }

    #[test]
    fn test_collect_notes_filters_and_sorts() {
        let dir = std::env::temp_dir().join(format!("blogforge-cli-test-{}", std::process::id()));
        std::fs::create_dir_all(&dir).expect("create temp dir");
        std::fs::write(dir.join("b.md"), "A note long enough to pass validation.")
            .expect("write note");
        std::fs::write(dir.join("a.txt"), "Another note long enough to pass.")
            .expect("write note");
        std::fs::write(dir.join("ignored.json"), "{}").expect("write non-note");
        std::fs::write(dir.join("short.md"), "tiny").expect("write short note");

        let notes = collect_notes(&dir).expect("collect notes");
        let names: Vec<&str> = notes.iter().map(|n| n.filename.as_str()).collect();
        assert_eq!(names, vec!["a.txt", "b.md"]);

        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_write_post() {
        let dir = std::env::temp_dir().join(format!("blogforge-out-test-{}", std::process::id()));
        let path = write_post(&dir, "post.md", "# Hello").expect("write post");
        assert_eq!(std::fs::read_to_string(&path).expect("read back"), "# Hello");
        std::fs::remove_dir_all(&dir).ok();
    }
}
