//! # Editor State
//!
//! An immutable snapshot of the document and selection. Every committed
//! transaction produces a new state with the version bumped when the
//! document changed; previous states are never mutated.

use footnote_model::{Node, Selection, Transaction};
use serde::{Deserialize, Serialize};

use crate::errors::EditorError;
use crate::footnotes::check_structure;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EditorState {
    doc: Node,

    #[serde(default)]
    selection: Selection,

    /// Increments on each committed document change
    #[serde(default)]
    version: u64,
}

impl EditorState {
    /// Wrap a document, rejecting shapes the footnote engine cannot work on
    pub fn new(doc: Node) -> Result<Self, EditorError> {
        check_structure(&doc)?;
        let selection = doc.text_start().map_or_else(Selection::default, Selection::cursor);
        Ok(Self {
            doc,
            selection,
            version: 0,
        })
    }

    pub fn doc(&self) -> &Node {
        &self.doc
    }

    pub fn selection(&self) -> Selection {
        self.selection
    }

    pub fn version(&self) -> u64 {
        self.version
    }

    /// Start a transaction on this state
    pub fn transaction(&self) -> Transaction {
        Transaction::new(self.doc.clone(), self.selection)
    }

    /// State after committing `doc` and `selection`
    pub fn apply(&self, doc: Node, selection: Selection) -> EditorState {
        let version = if doc == self.doc { self.version } else { self.version + 1 };
        EditorState {
            doc,
            selection,
            version,
        }
    }
}
