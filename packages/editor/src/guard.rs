//! # Selection-Scope Guard
//!
//! Vetoes transactions whose affected ranges cross region boundaries:
//! general content and the footnote list may not be touched together, and at
//! most one footnote may be touched at a time. A range covering the whole
//! document is always allowed.
//!
//! The range checked is the transaction's resulting selection (on the new
//! document) together with every replaced range (on the document the step
//! applied to).

use footnote_model::{Node, NodeType, Selection, Step, Transaction};
use thiserror::Error;

/// Why a transaction was vetoed
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ScopeViolation {
    #[error("range {from}..{to} spans body content and the footnote list")]
    SpansContentAndFootnotes { from: usize, to: usize },

    #[error("range {from}..{to} spans {count} footnotes")]
    SpansMultipleFootnotes { from: usize, to: usize, count: usize },
}

/// What a range touches
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Containment {
    pub general_content: bool,
    pub footnote_list: bool,
    pub footnotes: usize,
}

impl Containment {
    /// Classify the nodes overlapping `from..to`
    pub fn of(doc: &Node, from: usize, to: usize) -> Self {
        let mut containment = Containment::default();
        doc.nodes_between(from, to, &mut |node, _, parent| {
            if parent.is(NodeType::Doc) && !node.is(NodeType::Footnotes) {
                containment.general_content = true;
            } else if node.is(NodeType::Footnote) {
                containment.footnotes += 1;
            } else if node.is(NodeType::Footnotes) {
                containment.footnote_list = true;
            }
            true
        });
        containment
    }

    fn verdict(&self, from: usize, to: usize) -> Result<(), ScopeViolation> {
        if self.general_content && self.footnote_list {
            return Err(ScopeViolation::SpansContentAndFootnotes { from, to });
        }
        if self.footnotes > 1 {
            return Err(ScopeViolation::SpansMultipleFootnotes {
                from,
                to,
                count: self.footnotes,
            });
        }
        Ok(())
    }
}

/// Whether `from..to` spans the whole document, either every position or
/// everything from the first to the last text position
pub fn covers_whole_document(doc: &Node, from: usize, to: usize) -> bool {
    if from == 0 && to == doc.content_size() {
        return true;
    }
    match (doc.text_start(), doc.text_end()) {
        (Some(start), Some(end)) => from == start && to == end,
        _ => false,
    }
}

/// Check one range against `doc`
pub fn check_range(doc: &Node, from: usize, to: usize) -> Result<(), ScopeViolation> {
    if covers_whole_document(doc, from, to) {
        return Ok(());
    }
    Containment::of(doc, from, to).verdict(from, to)
}

/// Veto hook run before a transaction is committed
pub fn check(tr: &Transaction) -> Result<(), ScopeViolation> {
    for (step, before) in tr.steps().iter().zip(tr.docs()) {
        if let Step::Replace { from, to, .. } = step {
            check_range(before, *from, *to)?;
        }
    }

    let selection = tr.selection();
    if selection == Selection::All {
        return Ok(());
    }
    let (from, to) = selection.range(tr.doc());
    check_range(tr.doc(), from, to)
}
