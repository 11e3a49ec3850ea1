//! Text-pattern trigger for footnote references.
//!
//! Typing `[^label]` with a non-empty label replaces the token with a new
//! footnote reference. The label itself is discarded; the reference gets a
//! fresh id and reconciliation creates its footnote.

use std::collections::HashSet;
use std::sync::OnceLock;

use footnote_model::{IdSource, Node, Selection, Transaction};
use regex::Regex;
use tracing::debug;

use crate::errors::EditorError;
use crate::identity::{collect_ids, fresh_id};

/// Stands in for inline leaves when matching text before the cursor
const LEAF_PLACEHOLDER: &str = "\u{fffc}";

fn footnote_token() -> &'static Regex {
    static TOKEN: OnceLock<Regex> = OnceLock::new();
    TOKEN.get_or_init(|| Regex::new(r"\[\^([^\]\x{fffc}]+)\]$").expect("footnote token pattern is valid"))
}

/// A converted `[^label]` token
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenMatch {
    pub label: String,
    /// Position of the inserted reference
    pub pos: usize,
}

/// Convert a `[^label]` token ending at the cursor into a reference,
/// within the same transaction
pub fn apply_footnote_token(
    tr: &mut Transaction,
    ids: &mut dyn IdSource,
) -> Result<Option<TokenMatch>, EditorError> {
    let Selection::Text { anchor, head } = tr.selection() else {
        return Ok(None);
    };
    if anchor != head {
        return Ok(None);
    }
    let resolved = tr.doc().resolve(head)?;
    if !resolved.parent_type.is_textblock() {
        return Ok(None);
    }

    let before = tr.doc().text_between(resolved.start, head, LEAF_PLACEHOLDER);
    let Some(captures) = footnote_token().captures(&before) else {
        return Ok(None);
    };
    let (Some(token), Some(label)) = (captures.get(0), captures.get(1)) else {
        return Ok(None);
    };

    let from = resolved.start + before[..token.start()].chars().count();
    let mut taken: HashSet<String> = collect_ids(std::slice::from_ref(tr.doc()));
    let id = fresh_id(&mut taken, ids);
    debug!(label = label.as_str(), id = %id, pos = from, "footnote token converted");

    tr.replace(from, head, vec![Node::reference(id)])?;
    Ok(Some(TokenMatch {
        label: label.as_str().to_string(),
        pos: from,
    }))
}
