//! # Post-Effect System
//!
//! Effects inspect a transaction before it is committed and append the
//! steps needed to keep the document consistent. Appended steps land in the
//! same transaction, so they are undone and redone together with the edit
//! that caused them.
//!
//! The only effect today removes the footnote of every reference the
//! transaction deleted:
//! - references carried in by insert steps are protected, which keeps a
//!   dragged reference (deleted, then inserted elsewhere) attached to its
//!   footnote
//! - footnotes nested inside removed footnotes are removed as well
//! - removals are skipped for transactions produced by reconciliation

use std::collections::{BTreeSet, HashSet};

use footnote_model::{Bias, Mapping, NodeType, Step, StepResult, Transaction, ATTR_LOCAL_ID};
use tracing::debug;

use crate::footnotes::{footnote_list, reference_ids};

/// Effect that can append steps to a transaction
pub trait PostEffect: std::fmt::Debug {
    /// Steps to append, positioned against `tr.doc()` and each previously
    /// returned step
    fn analyze(&self, tr: &Transaction) -> Vec<Step>;
}

/// Delete the footnotes of references removed by the transaction
#[derive(Debug)]
pub struct DeleteOrphanedFootnotes;

impl DeleteOrphanedFootnotes {
    /// Ids of references the transaction removed for good
    pub fn removed_ids(tr: &Transaction) -> BTreeSet<String> {
        let mut protected: HashSet<String> = HashSet::new();
        let mut to_remove: BTreeSet<String> = BTreeSet::new();

        for (step, before) in tr.steps().iter().zip(tr.docs()) {
            let Step::Replace { from, to, content } = step else {
                continue;
            };
            let inserted: HashSet<String> = reference_ids(content).into_iter().collect();

            if step.is_insert() {
                for id in &inserted {
                    to_remove.remove(id);
                }
            }
            if step.is_delete() {
                let end = (*to).min(before.content_size());
                before.nodes_between(*from, end, &mut |node, _, _| {
                    if node.is(NodeType::FootnoteReference) {
                        if let Some(id) = node.attr(ATTR_LOCAL_ID) {
                            if !inserted.contains(id) {
                                to_remove.insert(id.to_string());
                            }
                        }
                    }
                    true
                });
            }
            protected.extend(inserted);
        }

        to_remove.retain(|id| !protected.contains(id));
        to_remove
    }
}

impl PostEffect for DeleteOrphanedFootnotes {
    fn analyze(&self, tr: &Transaction) -> Vec<Step> {
        if tr.meta().reconciliation {
            return vec![];
        }
        let mut to_remove = Self::removed_ids(tr);
        if to_remove.is_empty() {
            return vec![];
        }

        let doc = tr.doc();
        let Ok(Some(list)) = footnote_list(doc) else {
            return vec![];
        };

        // Footnotes may reference further footnotes; follow them to a fixpoint
        loop {
            let nested: Vec<String> = list
                .footnotes()
                .filter(|(_, note)| note.attr(ATTR_LOCAL_ID).is_some_and(|id| to_remove.contains(id)))
                .flat_map(|(_, note)| reference_ids(note.content()))
                .filter(|id| !to_remove.contains(id))
                .collect();
            if nested.is_empty() {
                break;
            }
            to_remove.extend(nested);
        }

        let mut mapping = Mapping::new();
        let mut steps = Vec::new();
        for (pos, note) in list.footnotes() {
            if !note.attr(ATTR_LOCAL_ID).is_some_and(|id| to_remove.contains(id)) {
                continue;
            }
            let from = mapping.map(pos, Bias::Right);
            let step = Step::replace(from, from + note.node_size(), Vec::new());
            debug!(id = ?note.attr(ATTR_LOCAL_ID), pos = from, "removing footnote of deleted reference");
            mapping.push(step.map());
            steps.push(step);
        }
        steps
    }
}

/// Runs the registered effects over a transaction
#[derive(Debug)]
pub struct PostEffectEngine {
    effects: Vec<Box<dyn PostEffect>>,
}

impl PostEffectEngine {
    /// Create engine with default effects
    pub fn new() -> Self {
        Self {
            effects: vec![Box::new(DeleteOrphanedFootnotes)],
        }
    }

    pub fn with_effects(effects: Vec<Box<dyn PostEffect>>) -> Self {
        Self { effects }
    }

    /// Steps every effect wants appended, in effect order
    pub fn analyze(&self, tr: &Transaction) -> Vec<Step> {
        self.effects.iter().flat_map(|effect| effect.analyze(tr)).collect()
    }

    /// Append each effect's steps to the transaction; returns how many were
    /// appended
    pub fn apply_with_effects(&self, tr: &mut Transaction) -> StepResult<usize> {
        let mut appended = 0;
        for effect in &self.effects {
            for step in effect.analyze(tr) {
                tr.step(step)?;
                appended += 1;
            }
        }
        Ok(appended)
    }
}

impl Default for PostEffectEngine {
    fn default() -> Self {
        Self::new()
    }
}
