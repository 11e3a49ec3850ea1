//! # Commands
//!
//! Editing operations exposed to callers. Each one builds a transaction on
//! the current state and sends it through [`Pipeline::dispatch`], so the
//! guard, post-effects and reconciliation apply uniformly.
//!
//! [`Command`] is the serializable form of the same operations, used to
//! replay scripted sessions.

use footnote_model::{Node, NodeType, Selection, Transaction, ATTR_LOCAL_ID};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::errors::EditorError;
use crate::footnotes::find_footnote;
use crate::guard::covers_whole_document;
use crate::identity::{collect_ids, fresh_id, regenerate};
use crate::input_rules::apply_footnote_token;
use crate::pipeline::{DispatchResult, Pipeline};

impl Pipeline {
    /// Insert a new reference at the selection anchor
    pub fn insert_reference(&mut self) -> Result<DispatchResult, EditorError> {
        let anchor = self.selection().anchor();
        let resolved = self.doc().resolve(anchor)?;
        if !resolved.parent_type.is_textblock() {
            return Err(EditorError::InvalidSelection(anchor));
        }

        let mut taken = collect_ids(std::slice::from_ref(self.doc()));
        let id = fresh_id(&mut taken, self.ids_mut());
        info!(id = %id, pos = anchor, "inserting footnote reference");

        let mut tr = self.transaction();
        tr.insert(anchor, vec![Node::reference(id)])?;
        tr.meta_mut().label = Some("Insert footnote".to_string());
        self.dispatch(tr)
    }

    /// Put the cursor at the end of the footnote with local id `id`
    pub fn focus_definition(&mut self, id: &str) -> Result<DispatchResult, EditorError> {
        let (pos, note) =
            find_footnote(self.doc(), id).ok_or_else(|| EditorError::DefinitionNotFound(id.to_string()))?;
        let end = pos + 1 + note.content_size();
        let cursor = if note.last_child().is_some_and(|child| child.node_type().is_textblock()) {
            end - 1
        } else {
            end
        };

        let mut tr = self.transaction();
        tr.set_selection(Selection::cursor(cursor));
        self.dispatch(tr)
    }

    /// Replace the selection with `text`, then run input rules in the same
    /// transaction
    pub fn insert_text(&mut self, text: &str) -> Result<DispatchResult, EditorError> {
        let mut tr = self.transaction();
        let content = if text.is_empty() { Vec::new() } else { vec![Node::text(text)] };
        replace_selection(&mut tr, content)?;
        if self.config().input_rules {
            apply_footnote_token(&mut tr, self.ids_mut())?;
        }
        tr.meta_mut().label = Some("Typing".to_string());
        self.dispatch(tr)
    }

    /// Replace the selection with externally sourced content; every
    /// reference in it gets a fresh id
    pub fn paste(&mut self, content: &[Node]) -> Result<DispatchResult, EditorError> {
        let mut taken = collect_ids(std::slice::from_ref(self.doc()));
        taken.extend(collect_ids(content));
        let content = regenerate(content, &mut taken, self.ids_mut());

        let mut tr = self.transaction();
        replace_selection(&mut tr, content)?;
        tr.meta_mut().label = Some("Paste".to_string());
        self.dispatch(tr)
    }

    /// Delete the selected range, joining the end blocks when it spans
    /// several paragraphs. Deleting the whole document leaves one empty
    /// paragraph and an empty footnote list.
    pub fn delete_selection(&mut self) -> Result<DispatchResult, EditorError> {
        let mut tr = self.transaction();
        let selection = self.selection();

        if selects_whole_document(&tr) {
            replace_document(&mut tr, Vec::new())?;
        } else if !selection.is_empty(self.doc()) {
            let (from, to) = selection.range(self.doc());
            tr.delete_range(from, to)?;
        }
        tr.meta_mut().label = Some("Delete".to_string());
        self.dispatch(tr)
    }

    pub fn select_all(&mut self) -> Result<DispatchResult, EditorError> {
        self.set_selection(Selection::All)
    }

    pub fn set_selection(&mut self, selection: Selection) -> Result<DispatchResult, EditorError> {
        let (from, to) = selection.range(self.doc());
        let size = self.doc().content_size();
        if from > size || to > size {
            return Err(EditorError::InvalidSelection(from.max(to)));
        }
        let mut tr = self.transaction();
        tr.set_selection(selection);
        self.dispatch(tr)
    }

    /// Click on a reference: the first activation selects it, activating the
    /// selected reference again focuses its footnote
    pub fn activate_reference(&mut self, pos: usize) -> Result<DispatchResult, EditorError> {
        let id = self.reference_id_at(pos)?;
        if self.selection() == (Selection::Node { pos }) {
            self.focus_definition(&id)
        } else {
            self.set_selection(Selection::Node { pos })
        }
    }

    /// Double click on a reference: focus its footnote directly
    pub fn open_reference(&mut self, pos: usize) -> Result<DispatchResult, EditorError> {
        let id = self.reference_id_at(pos)?;
        self.focus_definition(&id)
    }

    fn reference_id_at(&self, pos: usize) -> Result<String, EditorError> {
        self.doc()
            .node_at(pos)
            .filter(|node| node.is(NodeType::FootnoteReference))
            .and_then(|node| node.attr(ATTR_LOCAL_ID))
            .map(str::to_string)
            .ok_or(EditorError::NotAReference(pos))
    }
}

fn selects_whole_document(tr: &Transaction) -> bool {
    let (from, to) = tr.selection().range(tr.doc());
    tr.selection() == Selection::All || (from < to && covers_whole_document(tr.doc(), from, to))
}

/// Replace the document with `content` and an empty footnote list. Inline
/// content is wrapped in a paragraph.
fn replace_document(tr: &mut Transaction, content: Vec<Node>) -> Result<(), EditorError> {
    let inline = content.iter().all(|node| node.node_type().is_inline());
    let (blocks, cursor) = if inline {
        let size: usize = content.iter().map(Node::node_size).sum();
        (vec![Node::paragraph(content)], 1 + size)
    } else {
        let size: usize = content.iter().map(Node::node_size).sum();
        (content, size.saturating_sub(1))
    };

    let size = tr.doc().content_size();
    let mut replacement = blocks;
    replacement.push(Node::footnotes(Vec::new()));
    tr.replace(0, size, replacement)?;
    tr.set_selection(Selection::cursor(cursor));
    Ok(())
}

/// Replace the selection with `content`; a selection covering the whole
/// document replaces the document
fn replace_selection(tr: &mut Transaction, content: Vec<Node>) -> Result<(), EditorError> {
    if selects_whole_document(tr) {
        return replace_document(tr, content);
    }
    tr.replace_selection(content)?;
    Ok(())
}

/// Serializable editor command
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "command", rename_all = "camelCase")]
pub enum Command {
    InsertReference,

    InsertText {
        text: String,
    },

    Paste {
        content: Vec<Node>,
    },

    DeleteSelection,

    SetSelection {
        selection: Selection,
    },

    SelectAll,

    FocusDefinition {
        id: String,
    },

    ActivateReference {
        pos: usize,
    },

    OpenReference {
        pos: usize,
    },

    Resynchronize {
        #[serde(default, rename = "insertNew")]
        insert_new: bool,
    },

    Undo,

    Redo,

    BeginBatch {
        #[serde(default)]
        description: Option<String>,
    },

    EndBatch,
}

impl Command {
    pub fn name(&self) -> &'static str {
        match self {
            Command::InsertReference => "insertReference",
            Command::InsertText { .. } => "insertText",
            Command::Paste { .. } => "paste",
            Command::DeleteSelection => "deleteSelection",
            Command::SetSelection { .. } => "setSelection",
            Command::SelectAll => "selectAll",
            Command::FocusDefinition { .. } => "focusDefinition",
            Command::ActivateReference { .. } => "activateReference",
            Command::OpenReference { .. } => "openReference",
            Command::Resynchronize { .. } => "resynchronize",
            Command::Undo => "undo",
            Command::Redo => "redo",
            Command::BeginBatch { .. } => "beginBatch",
            Command::EndBatch => "endBatch",
        }
    }

    /// Run against `pipeline`
    pub fn apply(&self, pipeline: &mut Pipeline) -> Result<(), EditorError> {
        match self {
            Command::InsertReference => pipeline.insert_reference().map(drop),
            Command::InsertText { text } => pipeline.insert_text(text).map(drop),
            Command::Paste { content } => pipeline.paste(content).map(drop),
            Command::DeleteSelection => pipeline.delete_selection().map(drop),
            Command::SetSelection { selection } => pipeline.set_selection(*selection).map(drop),
            Command::SelectAll => pipeline.select_all().map(drop),
            Command::FocusDefinition { id } => pipeline.focus_definition(id).map(drop),
            Command::ActivateReference { pos } => pipeline.activate_reference(*pos).map(drop),
            Command::OpenReference { pos } => pipeline.open_reference(*pos).map(drop),
            Command::Resynchronize { insert_new } => pipeline.resynchronize(*insert_new).map(drop),
            Command::Undo => pipeline.undo().map(drop),
            Command::Redo => pipeline.redo().map(drop),
            Command::BeginBatch { description } => {
                pipeline.begin_batch(description.as_deref());
                Ok(())
            }
            Command::EndBatch => {
                pipeline.end_batch();
                Ok(())
            }
        }
    }
}
