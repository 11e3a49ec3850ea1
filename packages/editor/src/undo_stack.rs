//! # Undo/Redo Stack
//!
//! Tracks step history and enables undo/redo operations.
//!
//! ## Design
//!
//! - Each committed transaction records its steps and their inverses
//! - Undo applies the inverses and moves the batch to the redo stack
//! - Redo reapplies the original steps
//! - New batches clear the redo stack
//! - Batches can be opened explicitly (`begin_batch` / `end_batch`) or
//!   extended after the fact (`join`), which is how footnote reconciliation
//!   ends up in the same undo unit as the edit that triggered it
//! - A change applied right after an undo or redo can be absorbed
//!   (`absorb`): both stacks are adjusted so they keep lining up with the
//!   document

use footnote_model::{Node, Selection, Step, StepResult};

/// Steps that are undone/redone together
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StepBatch {
    /// Steps in application order
    pub steps: Vec<Step>,

    /// Inverse steps, in the order they are applied on undo
    pub inverses: Vec<Step>,

    pub selection_before: Selection,
    pub selection_after: Selection,

    /// Label shown for this undo level
    pub description: Option<String>,
}

impl StepBatch {
    /// Empty batch starting from `selection`
    pub fn new(selection: Selection) -> Self {
        Self {
            steps: Vec::new(),
            inverses: Vec::new(),
            selection_before: selection,
            selection_after: selection,
            description: None,
        }
    }

    /// Batch for steps applied in order to `docs` (the document before each
    /// step)
    pub fn from_steps(
        steps: Vec<Step>,
        docs: &[Node],
        selection_before: Selection,
        selection_after: Selection,
    ) -> StepResult<Self> {
        let mut inverses = steps
            .iter()
            .zip(docs)
            .map(|(step, doc)| step.invert(doc))
            .collect::<StepResult<Vec<_>>>()?;
        inverses.reverse();
        Ok(Self {
            steps,
            inverses,
            selection_before,
            selection_after,
            description: None,
        })
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Adjust a batch waiting to be redone for `change`, which was applied
    /// to the document it starts from: redo first reverts `change`, undo
    /// ends by reapplying it
    pub fn rebase_onto(&mut self, change: &StepBatch) {
        let mut steps = change.inverses.clone();
        steps.append(&mut self.steps);
        self.steps = steps;
        self.inverses.extend(change.steps.iter().cloned());
        self.selection_before = change.selection_after;
    }

    /// Append a later batch to this one
    pub fn extend(&mut self, later: StepBatch) {
        self.steps.extend(later.steps);
        let mut inverses = later.inverses;
        inverses.append(&mut self.inverses);
        self.inverses = inverses;
        self.selection_after = later.selection_after;
        if self.description.is_none() {
            self.description = later.description;
        }
    }
}

/// History of committed step batches
#[derive(Debug)]
pub struct UndoStack {
    /// Applied batches (most recent last)
    undo_stack: Vec<StepBatch>,

    /// Undone batches (most recent last)
    redo_stack: Vec<StepBatch>,

    /// Undo levels kept before the oldest is dropped (0 keeps all)
    max_levels: usize,

    /// Open batch collecting records
    current_batch: Option<StepBatch>,
}

impl UndoStack {
    /// 100 undo levels
    pub fn new() -> Self {
        Self::with_max_levels(100)
    }

    pub fn with_max_levels(max_levels: usize) -> Self {
        Self {
            undo_stack: Vec::new(),
            redo_stack: Vec::new(),
            max_levels,
            current_batch: None,
        }
    }

    pub fn max_levels(&self) -> usize {
        self.max_levels
    }

    /// Record a batch as its own undo level, or into the open batch
    pub fn record(&mut self, batch: StepBatch) {
        if batch.is_empty() {
            return;
        }
        match &mut self.current_batch {
            Some(current) => current.extend(batch),
            None => self.push_batch(batch),
        }
    }

    /// Fold a batch into the most recent undo level
    pub fn join(&mut self, batch: StepBatch) {
        if batch.is_empty() {
            return;
        }
        if let Some(current) = &mut self.current_batch {
            current.extend(batch);
        } else if let Some(last) = self.undo_stack.last_mut() {
            last.extend(batch);
        } else {
            self.push_batch(batch);
        }
    }

    /// Fold a change made on the current document into the history without
    /// starting a new level or dropping the redo stack. The latest undo
    /// level ends with the change; the next redo level first reverts it.
    pub fn absorb(&mut self, change: StepBatch) {
        if change.is_empty() {
            return;
        }
        if let Some(next) = self.redo_stack.last_mut() {
            next.rebase_onto(&change);
        }
        if let Some(current) = &mut self.current_batch {
            current.extend(change);
        } else if let Some(last) = self.undo_stack.last_mut() {
            last.extend(change);
        }
    }

    /// Start a batch (everything recorded until `end_batch` undoes together)
    pub fn begin_batch(&mut self, selection: Selection) {
        self.end_batch();
        self.current_batch = Some(StepBatch::new(selection));
    }

    /// Close the open batch; an empty one leaves no undo level
    pub fn end_batch(&mut self) {
        if let Some(batch) = self.current_batch.take() {
            if !batch.is_empty() {
                self.push_batch(batch);
            }
        }
    }

    pub fn is_batching(&self) -> bool {
        self.current_batch.is_some()
    }

    pub fn set_batch_description(&mut self, description: impl Into<String>) {
        if let Some(batch) = &mut self.current_batch {
            batch.description = Some(description.into());
        }
    }

    fn push_batch(&mut self, batch: StepBatch) {
        self.undo_stack.push(batch);

        if self.max_levels > 0 && self.undo_stack.len() > self.max_levels {
            self.undo_stack.remove(0);
        }

        // A new action invalidates the redo history
        self.redo_stack.clear();
    }

    /// Undo the most recent batch against `doc`, returning the restored
    /// document and selection. Nothing moves if an inverse fails to apply.
    pub fn undo(&mut self, doc: &Node) -> StepResult<Option<(Node, Selection)>> {
        self.end_batch();
        let Some(batch) = self.undo_stack.last() else {
            return Ok(None);
        };
        let restored = apply_all(&batch.inverses, doc)?;
        let selection = batch.selection_before;

        if let Some(batch) = self.undo_stack.pop() {
            self.redo_stack.push(batch);
        }
        Ok(Some((restored, selection)))
    }

    /// Redo the most recently undone batch against `doc`
    pub fn redo(&mut self, doc: &Node) -> StepResult<Option<(Node, Selection)>> {
        let Some(batch) = self.redo_stack.last() else {
            return Ok(None);
        };
        let restored = apply_all(&batch.steps, doc)?;
        let selection = batch.selection_after;

        if let Some(batch) = self.redo_stack.pop() {
            self.undo_stack.push(batch);
        }
        Ok(Some((restored, selection)))
    }

    pub fn can_undo(&self) -> bool {
        !self.undo_stack.is_empty() || self.current_batch.as_ref().is_some_and(|b| !b.is_empty())
    }

    pub fn can_redo(&self) -> bool {
        !self.redo_stack.is_empty()
    }

    pub fn undo_levels(&self) -> usize {
        self.undo_stack.len()
    }

    pub fn redo_levels(&self) -> usize {
        self.redo_stack.len()
    }

    /// Drop both stacks, e.g. after an unrecorded document change
    pub fn clear(&mut self) {
        self.undo_stack.clear();
        self.redo_stack.clear();
        self.current_batch = None;
    }

    pub fn undo_description(&self) -> Option<&str> {
        self.undo_stack
            .last()
            .and_then(|batch| batch.description.as_deref())
    }

    pub fn redo_description(&self) -> Option<&str> {
        self.redo_stack
            .last()
            .and_then(|batch| batch.description.as_deref())
    }
}

impl Default for UndoStack {
    fn default() -> Self {
        Self::new()
    }
}

fn apply_all(steps: &[Step], doc: &Node) -> StepResult<Node> {
    steps.iter().try_fold(doc.clone(), |doc, step| step.apply(&doc))
}
