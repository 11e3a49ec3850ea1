use super::{read_document, resolve};
use anyhow::{anyhow, Result};
use clap::Args;
use colored::Colorize;
use footnote_editor::{check_invariants, check_structure, references, Violation};
use std::path::PathBuf;

#[derive(Debug, Args)]
pub struct CheckArgs {
    /// Document to check
    pub input: PathBuf,

    /// Output format (text, json)
    #[arg(short, long, default_value = "text")]
    pub format: String,
}

pub fn check(args: CheckArgs, cwd: &str) -> Result<()> {
    let path = resolve(cwd, &args.input);
    let doc = read_document(&path)?;
    check_structure(&doc)?;

    let violations = check_invariants(&doc);

    match args.format.as_str() {
        "json" => {
            let messages: Vec<String> = violations.iter().map(Violation::to_string).collect();
            println!("{}", serde_json::to_string_pretty(&messages)?);
        }
        "text" => report(&args.input.display().to_string(), &doc, &violations),
        other => return Err(anyhow!("Unknown format: {}. Use: text or json", other)),
    }

    if !violations.is_empty() {
        return Err(anyhow!(
            "{} footnote violation(s); run `footnotes repair` to fix",
            violations.len()
        ));
    }
    Ok(())
}

fn report(name: &str, doc: &footnote_model::Node, violations: &[Violation]) {
    println!("🔍 {} {}", "Checking".bright_blue().bold(), name);
    println!("   References: {}", references(doc).len());

    for violation in violations {
        println!("   {} {}", "✗".red(), violation);
    }
    if violations.is_empty() {
        println!("   {} Footnotes are consistent", "✓".green());
    }
}
