use super::{resolve, write_document};
use crate::config::{Config, DEFAULT_CONFIG_NAME};
use anyhow::Result;
use clap::Args;
use colored::Colorize;
use footnote_model::Node;
use std::fs;
use std::path::PathBuf;

#[derive(Debug, Args)]
pub struct InitArgs {
    /// Document to create
    #[arg(default_value = "document.json")]
    pub path: PathBuf,

    /// Also write a default footnotes.config.json
    #[arg(short, long)]
    pub config: bool,

    /// Force overwrite existing files
    #[arg(short, long)]
    pub force: bool,
}

/// One empty paragraph followed by an empty footnote list
pub fn empty_document() -> Node {
    Node::doc(vec![Node::paragraph(Vec::new()), Node::footnotes(Vec::new())])
}

pub fn init(args: InitArgs, cwd: &str) -> Result<()> {
    let doc_path = resolve(cwd, &args.path);

    if doc_path.exists() && !args.force {
        println!(
            "{} {} already exists",
            "⚠️".yellow(),
            args.path.display().to_string().bright_white()
        );
        println!("Use --force to overwrite");
        return Ok(());
    }

    let config = Config::load(cwd)?;
    write_document(&empty_document(), &doc_path, config.compact)?;
    println!("  {} Created {}", "✓".green(), args.path.display());

    if args.config {
        let config_path = PathBuf::from(cwd).join(DEFAULT_CONFIG_NAME);
        if config_path.exists() && !args.force {
            println!("  {} {} already exists", "⚠️".yellow(), DEFAULT_CONFIG_NAME);
        } else {
            fs::write(&config_path, serde_json::to_string_pretty(&config)?)?;
            println!("  {} Created {}", "✓".green(), DEFAULT_CONFIG_NAME);
        }
    }

    Ok(())
}
