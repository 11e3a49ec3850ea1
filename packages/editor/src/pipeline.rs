//! # Editing Pipeline
//!
//! Every change to the document goes through [`Pipeline::dispatch`]:
//!
//! ```text
//! transaction
//!     ↓  guard: veto cross-region ranges (nothing applied on failure)
//!     ↓  structure: one footnote list, last in the document
//!     ↓  post-effects: append footnote removals for deleted references
//!     ↓  dirty check: reference order/count changed or drift detected?
//!     ↓  reconciliation: second, flagged transaction built on the result
//!     ↓  commit: both transactions, the second joined to the same undo
//!        entry
//! ```
//!
//! Nothing is committed until every fallible stage has succeeded.
//!
//! The pipeline owns the current state, the undo history, the id source
//! used for new references and the editor configuration.

use footnote_model::{IdSource, Node, Selection, Transaction, UuidIds};
use tracing::{debug, info, warn};

use crate::config::EditorConfig;
use crate::errors::EditorError;
use crate::footnotes::{check_structure, references};
use crate::guard;
use crate::invariants;
use crate::post_effects::PostEffectEngine;
use crate::reconcile::{reconcile, ReconcileReport};
use crate::state::EditorState;
use crate::undo_stack::{StepBatch, UndoStack};

/// How a committed transaction enters the undo history
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Record {
    /// New undo level (or into the open batch)
    Push,
    /// Folded into the most recent undo level
    Join,
    /// Folded into the history around the current position, keeping the
    /// redo stack (repairs after undo/redo)
    Absorb,
    /// Not recorded
    Skip,
}

/// A transaction ready to commit; everything fallible is already done
#[derive(Debug)]
struct Pending {
    doc: Node,
    selection: Selection,
    batch: Option<StepBatch>,
    record: Record,
    changed: bool,
}

impl Pending {
    fn prepare(tr: Transaction, record: Record, selection_before: Selection) -> Result<Self, EditorError> {
        let (doc, steps, docs, selection, meta) = tr.into_parts();
        let changed = !steps.is_empty();
        let record = if meta.add_to_history { record } else { Record::Skip };

        let batch = if changed && record != Record::Skip {
            let batch = StepBatch::from_steps(steps, &docs, selection_before, selection)?;
            Some(match meta.label {
                Some(label) => batch.with_description(label),
                None => batch,
            })
        } else {
            None
        };

        Ok(Self {
            doc,
            selection,
            batch,
            record,
            changed,
        })
    }
}

/// Outcome of a dispatched transaction
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DispatchResult {
    /// State version after the dispatch
    pub version: u64,

    /// Steps committed, including appended ones
    pub steps: usize,

    /// Steps appended by post-effects
    pub compensated: usize,

    /// Reconciliation that followed, if any
    pub reconciled: Option<ReconcileReport>,
}

/// Owns editor state and applies transactions to it
#[derive(Debug)]
pub struct Pipeline {
    state: EditorState,
    history: UndoStack,
    effects: PostEffectEngine,
    ids: Box<dyn IdSource>,
    config: EditorConfig,
}

impl Pipeline {
    /// Create a pipeline for `doc`, repairing footnotes if needed
    pub fn new(doc: Node, config: EditorConfig) -> Result<Self, EditorError> {
        Self::with_id_source(doc, config, Box::new(UuidIds))
    }

    pub fn with_id_source(
        doc: Node,
        config: EditorConfig,
        ids: Box<dyn IdSource>,
    ) -> Result<Self, EditorError> {
        let state = EditorState::new(doc)?;
        let mut pipeline = Self {
            state,
            history: UndoStack::with_max_levels(config.max_undo_levels),
            effects: PostEffectEngine::new(),
            ids,
            config,
        };

        let violations = invariants::check(pipeline.state.doc());
        if !violations.is_empty() {
            warn!(count = violations.len(), "repairing footnotes of loaded document");
            for violation in &violations {
                debug!(%violation, "footnote drift");
            }
            pipeline.run_reconciliation(None, Record::Skip)?;
        }
        Ok(pipeline)
    }

    pub fn state(&self) -> &EditorState {
        &self.state
    }

    pub fn doc(&self) -> &Node {
        self.state.doc()
    }

    pub fn selection(&self) -> Selection {
        self.state.selection()
    }

    pub fn version(&self) -> u64 {
        self.state.version()
    }

    pub fn config(&self) -> &EditorConfig {
        &self.config
    }

    pub fn history(&self) -> &UndoStack {
        &self.history
    }

    pub fn history_mut(&mut self) -> &mut UndoStack {
        &mut self.history
    }

    pub(crate) fn ids_mut(&mut self) -> &mut dyn IdSource {
        self.ids.as_mut()
    }

    /// Start a transaction on the current state
    pub fn transaction(&self) -> Transaction {
        self.state.transaction()
    }

    /// Apply a transaction
    ///
    /// A vetoed or failing transaction leaves the state untouched, including
    /// when the reconciliation that would follow it fails.
    pub fn dispatch(&mut self, mut tr: Transaction) -> Result<DispatchResult, EditorError> {
        let reconciliation = tr.meta().reconciliation;
        if !reconciliation {
            if let Err(violation) = guard::check(&tr) {
                warn!(%violation, "transaction rejected");
                return Err(violation.into());
            }
        }
        check_structure(tr.doc())?;

        let compensated = self.effects.apply_with_effects(&mut tr)?;
        if compensated > 0 {
            debug!(compensated, "post-effects appended steps");
        }

        let dirty = !reconciliation && tr.doc_changed() && needs_reconciliation(tr.before(), tr.doc());
        let follow_up = if tr.meta().add_to_history { Record::Join } else { Record::Skip };

        let follow = if dirty {
            let mut follow = Transaction::new(tr.doc().clone(), tr.selection());
            follow.set_reconciliation();
            let report = reconcile(&mut follow, None, self.ids.as_mut())?;
            if !report.is_noop() {
                debug!(?report, "reconciled footnotes");
            }
            Some((follow, report))
        } else {
            None
        };

        let steps = tr.steps().len();
        let edit = Pending::prepare(tr, Record::Push, self.state.selection())?;
        let (follow, reconciled) = match follow {
            Some((follow, report)) => (
                Some(Pending::prepare(follow, follow_up, edit.selection)?),
                Some(report),
            ),
            None => (None, None),
        };

        self.commit(edit);
        if let Some(follow) = follow {
            self.commit(follow);
        }

        Ok(DispatchResult {
            version: self.state.version(),
            steps,
            compensated,
            reconciled,
        })
    }

    /// Force a reconciliation pass, optionally inserting a new reference at
    /// the selection anchor first. Recorded as its own undo level.
    pub fn resynchronize(&mut self, insert_new: bool) -> Result<ReconcileReport, EditorError> {
        let anchor = insert_new.then(|| self.selection().anchor());
        let report = self.run_reconciliation(anchor, Record::Push)?;
        info!(
            renumbered = report.renumbered,
            created = report.created.len(),
            removed = report.removed.len(),
            "footnotes resynchronized"
        );
        Ok(report)
    }

    /// Undo the most recent history entry; `false` when there is none
    pub fn undo(&mut self) -> Result<bool, EditorError> {
        let Some((doc, selection)) = self.history.undo(self.state.doc())? else {
            return Ok(false);
        };
        self.restore(doc, selection)?;
        Ok(true)
    }

    /// Redo the most recently undone entry; `false` when there is none
    pub fn redo(&mut self) -> Result<bool, EditorError> {
        let Some((doc, selection)) = self.history.redo(self.state.doc())? else {
            return Ok(false);
        };
        self.restore(doc, selection)?;
        Ok(true)
    }

    pub fn begin_batch(&mut self, description: Option<&str>) {
        self.history.begin_batch(self.state.selection());
        if let Some(description) = description {
            self.history.set_batch_description(description);
        }
    }

    pub fn end_batch(&mut self) {
        self.history.end_batch();
    }

    fn restore(&mut self, doc: Node, selection: Selection) -> Result<(), EditorError> {
        self.state = self.state.apply(doc, selection);
        if !invariants::holds(self.state.doc()) {
            warn!("footnote drift after history step; repairing");
            self.run_reconciliation(None, Record::Absorb)?;
        }
        Ok(())
    }

    fn run_reconciliation(
        &mut self,
        insert_at: Option<usize>,
        record: Record,
    ) -> Result<ReconcileReport, EditorError> {
        let mut tr = self.state.transaction();
        tr.set_reconciliation();
        let report = reconcile(&mut tr, insert_at, self.ids.as_mut())?;
        if !report.is_noop() {
            debug!(?report, "reconciled footnotes");
        }
        let pending = Pending::prepare(tr, record, self.state.selection())?;
        self.commit(pending);
        Ok(report)
    }

    fn commit(&mut self, pending: Pending) {
        if pending.changed {
            match (pending.record, pending.batch) {
                (Record::Skip, _) => {
                    // Stored inverses no longer line up with the document
                    debug!("unrecorded change, clearing history");
                    self.history.clear();
                }
                (Record::Push, Some(batch)) => self.history.record(batch),
                (Record::Join, Some(batch)) => self.history.join(batch),
                (Record::Absorb, Some(batch)) => self.history.absorb(batch),
                (_, None) => {}
            }
        }
        self.state = self.state.apply(pending.doc, pending.selection);
    }
}

/// Whether a committed change needs a reconciliation cycle: the sequence of
/// reference ids and numbers changed, or the result breaks an invariant
pub fn needs_reconciliation(before: &Node, after: &Node) -> bool {
    let signature = |doc: &Node| -> Vec<(Option<String>, Option<String>)> {
        references(doc)
            .into_iter()
            .map(|r| (r.local_id, r.number))
            .collect()
    };
    signature(before) != signature(after) || !invariants::holds(after)
}
