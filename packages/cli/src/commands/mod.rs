pub mod check;
pub mod init;
pub mod repair;
pub mod replay;

pub use check::{check, CheckArgs};
pub use init::{init, InitArgs};
pub use repair::{repair, RepairArgs};
pub use replay::{replay, ReplayArgs};

use anyhow::{Context, Result};
use footnote_model::Node;
use std::fs;
use std::path::{Path, PathBuf};

/// Resolve `path` against the working directory
pub(crate) fn resolve(cwd: &str, path: &Path) -> PathBuf {
    PathBuf::from(cwd).join(path)
}

pub(crate) fn read_document(path: &Path) -> Result<Node> {
    let source =
        fs::read_to_string(path).with_context(|| format!("cannot read {}", path.display()))?;
    let doc: Node = serde_json::from_str(&source)
        .with_context(|| format!("{} is not a document", path.display()))?;
    Ok(doc)
}

pub(crate) fn write_document(doc: &Node, path: &Path, compact: bool) -> Result<()> {
    let json = if compact {
        serde_json::to_string(doc)?
    } else {
        serde_json::to_string_pretty(doc)?
    };
    fs::write(path, json).with_context(|| format!("cannot write {}", path.display()))?;
    Ok(())
}
