use super::{read_document, resolve, write_document};
use crate::config::Config;
use anyhow::{anyhow, Context, Result};
use clap::Args;
use colored::Colorize;
use footnote_editor::{check_invariants, Command, Pipeline};
use std::fs;
use std::path::PathBuf;
use tracing::warn;

#[derive(Debug, Args)]
pub struct ReplayArgs {
    /// Starting document
    pub input: PathBuf,

    /// JSON array of commands
    pub script: PathBuf,

    /// Output file (defaults to rewriting the input)
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Stop at the first rejected command
    #[arg(long)]
    pub strict: bool,
}

/// Outcome of running a script
#[derive(Debug, Default, PartialEq, Eq)]
pub struct ReplaySummary {
    pub applied: usize,
    pub rejected: usize,
}

/// Apply `commands` in order. Rejected commands leave the document as it
/// was; with `strict` the first one aborts the run.
pub fn run_script(
    pipeline: &mut Pipeline,
    commands: &[Command],
    strict: bool,
) -> Result<ReplaySummary> {
    let mut summary = ReplaySummary::default();

    for (index, command) in commands.iter().enumerate() {
        match command.apply(pipeline) {
            Ok(()) => {
                summary.applied += 1;
                println!("   {} {}", "✓".green(), command.name());
            }
            Err(err) if strict => {
                return Err(anyhow!("command {} ({}) failed: {}", index, command.name(), err));
            }
            Err(err) => {
                summary.rejected += 1;
                warn!(index, command = command.name(), %err, "command rejected");
                println!("   {} {} - {}", "✗".red(), command.name(), err);
            }
        }
    }
    Ok(summary)
}

pub fn replay(args: ReplayArgs, cwd: &str) -> Result<()> {
    let config = Config::load(cwd)?;
    let input = resolve(cwd, &args.input);
    let output = resolve(cwd, args.output.as_ref().unwrap_or(&args.input));

    let doc = read_document(&input)?;
    let script_path = resolve(cwd, &args.script);
    let script = fs::read_to_string(&script_path)
        .with_context(|| format!("cannot read {}", script_path.display()))?;
    let commands: Vec<Command> = serde_json::from_str(&script)
        .with_context(|| format!("{} is not a command script", script_path.display()))?;

    println!(
        "▶️  {} {} commands on {}",
        "Replaying".bright_blue().bold(),
        commands.len(),
        args.input.display()
    );

    let mut pipeline = Pipeline::with_id_source(doc, config.editor.clone(), config.id_source())?;
    let summary = run_script(&mut pipeline, &commands, args.strict)?;

    let violations = check_invariants(pipeline.doc());
    if !violations.is_empty() {
        return Err(anyhow!("replay left {} footnote violation(s)", violations.len()));
    }
    write_document(pipeline.doc(), &output, config.compact)?;

    println!();
    println!("✨ {} Replay complete!", "Done".green().bold());
    println!("   Applied: {}", summary.applied);
    if summary.rejected > 0 {
        println!("   {} {}", "Rejected:".yellow(), summary.rejected);
    }
    let history = pipeline.history();
    if history.is_batching() {
        println!("   {} script ended inside a batch", "Warning:".yellow());
    }
    println!("   Undo levels: {}", history.undo_levels());
    if let Some(next) = history.redo_description() {
        println!("   Next redo: {}", next);
    }
    println!("   Output: {}", output.display());

    Ok(())
}
