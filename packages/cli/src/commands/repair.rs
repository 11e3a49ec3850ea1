use super::{read_document, resolve, write_document};
use crate::config::Config;
use anyhow::Result;
use clap::Args;
use colored::Colorize;
use footnote_editor::{check_invariants, Pipeline};
use std::path::PathBuf;

#[derive(Debug, Args)]
pub struct RepairArgs {
    /// Document to repair
    pub input: PathBuf,

    /// Output file (defaults to rewriting the input)
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}

pub fn repair(args: RepairArgs, cwd: &str) -> Result<()> {
    let config = Config::load(cwd)?;
    let input = resolve(cwd, &args.input);
    let output = resolve(cwd, args.output.as_ref().unwrap_or(&args.input));

    let doc = read_document(&input)?;
    let found = check_invariants(&doc);

    // Loading reconciles a drifted document; the explicit pass settles
    // anything loading left behind
    let mut pipeline = Pipeline::with_id_source(doc, config.editor.clone(), config.id_source())?;
    let report = pipeline.resynchronize(false)?;
    if !report.is_noop() {
        tracing::debug!(?report, "second pass changed the document");
    }

    write_document(pipeline.doc(), &output, config.compact)?;

    println!("🔧 {} {}", "Repairing".bright_blue().bold(), args.input.display());
    for violation in &found {
        println!("   {} {}", "•".yellow(), violation);
    }
    if found.is_empty() {
        println!("   {} Nothing to repair", "✓".green());
    } else {
        println!("   {} Fixed {} issue(s)", "✓".green(), found.len());
    }
    println!("   Output: {}", output.display());

    Ok(())
}
