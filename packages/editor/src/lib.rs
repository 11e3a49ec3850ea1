//! # Footnote Editor
//!
//! Keeps inline footnote references and the footnote list of a document
//! consistent under arbitrary edits.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────┐
//! │ footnote-model: nodes, steps, transactions  │
//! └─────────────────────────────────────────────┘
//!                     ↓
//! ┌─────────────────────────────────────────────┐
//! │ footnote-editor                             │
//! │  - guard: veto cross-region edits           │
//! │  - post_effects: delete orphaned footnotes  │
//! │  - reconcile: renumber + rebuild the list   │
//! │  - identity: fresh ids for pasted content   │
//! │  - pipeline: dispatch, history, commands    │
//! └─────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//!
//! ```rust,ignore
//! use footnote_editor::{EditorConfig, Pipeline};
//! use footnote_model::Node;
//!
//! let doc = Node::doc(vec![Node::paragraph(vec![Node::text("Hello")])]);
//! let mut pipeline = Pipeline::new(doc, EditorConfig::default())?;
//!
//! pipeline.insert_text(" world[^1]")?;   // becomes a footnote reference
//! pipeline.undo()?;                     // removes reference and footnote
//! ```

mod commands;
mod config;
mod errors;
mod footnotes;
mod guard;
mod identity;
mod input_rules;
mod invariants;
mod pipeline;
mod post_effects;
mod reconcile;
mod state;
mod undo_stack;

pub use commands::Command;
pub use config::EditorConfig;
pub use errors::{EditorError, StructureError};
pub use footnotes::{check_structure, find_footnote, footnote_list, references, FootnoteList, Reference};
pub use guard::{check as check_scope, check_range, covers_whole_document, Containment, ScopeViolation};
pub use identity::{collect_ids, fresh_id, regenerate};
pub use input_rules::{apply_footnote_token, TokenMatch};
pub use invariants::{check as check_invariants, holds as invariants_hold, Violation};
pub use pipeline::{needs_reconciliation, DispatchResult, Pipeline};
pub use post_effects::{DeleteOrphanedFootnotes, PostEffect, PostEffectEngine};
pub use reconcile::{reconcile, reconcile_pass, ReconcileReport, MAX_PASSES};
pub use state::EditorState;
pub use undo_stack::{StepBatch, UndoStack};

pub use footnote_model as model;
