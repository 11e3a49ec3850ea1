//! # Transactions
//!
//! A transaction accumulates steps on top of a committed document. Each step
//! produces a new document value; the document the transaction started from,
//! and the document before every step, stay available for inspection.

use crate::error::{StepError, StepResult};
use crate::mapping::Mapping;
use crate::node::{normalize, Node};
use crate::selection::Selection;
use crate::step::Step;

/// Flags carried by a transaction through dispatch
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransactionMeta {
    /// Produced by footnote reconciliation; never triggers another pass
    pub reconciliation: bool,

    /// Record in undo history
    pub add_to_history: bool,

    /// Optional description for the undo entry
    pub label: Option<String>,
}

impl Default for TransactionMeta {
    fn default() -> Self {
        Self {
            reconciliation: false,
            add_to_history: true,
            label: None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Transaction {
    before: Node,
    doc: Node,
    steps: Vec<Step>,
    docs: Vec<Node>,
    mapping: Mapping,
    selection: Selection,
    meta: TransactionMeta,
}

impl Transaction {
    pub fn new(doc: Node, selection: Selection) -> Self {
        Self {
            before: doc.clone(),
            doc,
            steps: Vec::new(),
            docs: Vec::new(),
            mapping: Mapping::new(),
            selection,
            meta: TransactionMeta::default(),
        }
    }

    /// Document the transaction started from
    pub fn before(&self) -> &Node {
        &self.before
    }

    /// Current document
    pub fn doc(&self) -> &Node {
        &self.doc
    }

    pub fn steps(&self) -> &[Step] {
        &self.steps
    }

    /// Document before each step, index-aligned with `steps()`
    pub fn docs(&self) -> &[Node] {
        &self.docs
    }

    pub fn mapping(&self) -> &Mapping {
        &self.mapping
    }

    pub fn selection(&self) -> Selection {
        self.selection
    }

    pub fn meta(&self) -> &TransactionMeta {
        &self.meta
    }

    pub fn meta_mut(&mut self) -> &mut TransactionMeta {
        &mut self.meta
    }

    pub fn doc_changed(&self) -> bool {
        !self.steps.is_empty()
    }

    /// Apply a step. On failure the transaction is left unchanged.
    pub fn step(&mut self, step: Step) -> StepResult<&mut Self> {
        let next = step.apply(&self.doc)?;
        let map = step.map();
        self.docs.push(std::mem::replace(&mut self.doc, next));
        self.steps.push(step);
        self.mapping.push(map);
        self.selection = self.selection.map(&map);
        Ok(self)
    }

    pub fn replace(&mut self, from: usize, to: usize, content: Vec<Node>) -> StepResult<&mut Self> {
        self.step(Step::replace(from, to, content))
    }

    pub fn insert(&mut self, pos: usize, content: Vec<Node>) -> StepResult<&mut Self> {
        self.step(Step::replace(pos, pos, content))
    }

    pub fn delete(&mut self, from: usize, to: usize) -> StepResult<&mut Self> {
        self.step(Step::replace(from, to, Vec::new()))
    }

    /// Delete `from..to` where the two ends may sit in different sibling
    /// textblocks. The blocks are joined: the part of the first block before
    /// `from` and the part of the last block after `to` end up in one block,
    /// and the cursor lands at `from`.
    ///
    /// This is a single replace step over the whole blocks, so everything
    /// in the range shows up as deleted content of that step.
    pub fn delete_range(&mut self, from: usize, to: usize) -> StepResult<&mut Self> {
        let rfrom = self.doc.resolve(from)?;
        let rto = self.doc.resolve(to)?;
        if from >= to || rfrom.path == rto.path {
            return self.delete(from, to);
        }

        let depth = rfrom.depth();
        let siblings = depth > 0
            && rto.depth() == depth
            && rfrom.path[..depth - 1] == rto.path[..depth - 1];
        if !siblings || !rfrom.parent_type.is_textblock() || !rto.parent_type.is_textblock() {
            return Err(StepError::CrossesBoundary { from, to });
        }

        let size = self.doc.content_size();
        let first = rfrom.parent(&self.doc).ok_or(StepError::OutOfRange { pos: from, size })?;
        let last = rto.parent(&self.doc).ok_or(StepError::OutOfRange { pos: to, size })?;
        let last_end = rto.start + last.content_size();

        let mut content = self.doc.slice(rfrom.start, from)?;
        content.extend(self.doc.slice(to, last_end)?);
        let joined = first.copy_with_content(normalize(content));

        self.replace(rfrom.start - 1, last_end + 1, vec![joined])?;
        self.selection = Selection::cursor(from);
        Ok(self)
    }

    pub fn set_node_attr(
        &mut self,
        pos: usize,
        name: &str,
        value: impl Into<String>,
    ) -> StepResult<&mut Self> {
        self.step(Step::set_attr(pos, name, Some(value.into())))
    }

    pub fn set_selection(&mut self, selection: Selection) -> &mut Self {
        self.selection = selection;
        self
    }

    /// Replace the selection's range with `content`. A range spanning
    /// sibling textblocks is deleted with [`Transaction::delete_range`] first;
    /// if the insert then fails the deletion stays in the transaction.
    pub fn replace_selection(&mut self, content: Vec<Node>) -> StepResult<&mut Self> {
        let (from, to) = self.selection.range(&self.doc);
        if self.doc.resolve(from)?.path == self.doc.resolve(to)?.path {
            return self.replace(from, to, content);
        }
        self.delete_range(from, to)?;
        if !content.is_empty() {
            self.insert(from, content)?;
        }
        Ok(self)
    }

    pub fn set_reconciliation(&mut self) -> &mut Self {
        self.meta.reconciliation = true;
        self
    }

    pub fn into_parts(self) -> (Node, Vec<Step>, Vec<Node>, Selection, TransactionMeta) {
        (self.doc, self.steps, self.docs, self.selection, self.meta)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_steps_record_history() {
        let doc = Node::doc(vec![Node::paragraph(vec![Node::text("abc")])]);
        let mut tr = Transaction::new(doc.clone(), Selection::cursor(4));

        tr.insert(1, vec![Node::reference("r")]).unwrap();
        tr.delete(3, 4).unwrap();

        assert_eq!(tr.steps().len(), 2);
        assert_eq!(tr.docs()[0], doc);
        assert_eq!(tr.before(), &doc);
        assert_eq!(tr.doc().child(0).unwrap().text_content(), "ac");
        assert_eq!(tr.selection(), Selection::cursor(4));
    }

    fn two_paragraphs() -> Node {
        // <p>ab[r]c</p> 0..6, <p>de</p> 6..10
        Node::doc(vec![
            Node::paragraph(vec![Node::text("ab"), Node::reference("r"), Node::text("c")]),
            Node::paragraph(vec![Node::text("de")]),
        ])
    }

    #[test]
    fn test_delete_range_joins_blocks() {
        let mut tr = Transaction::new(two_paragraphs(), Selection::text(2, 8));
        tr.delete_range(2, 8).unwrap();

        assert_eq!(tr.steps().len(), 1);
        assert_eq!(
            tr.doc(),
            &Node::doc(vec![Node::paragraph(vec![Node::text("ae")])])
        );
        assert_eq!(tr.selection(), Selection::cursor(2));
        // the removed reference is part of the step's deleted range
        assert!(tr.docs()[0].node_at(3).is_some_and(|n| n.attr("data-id") == Some("r")));
    }

    #[test]
    fn test_delete_range_within_block_is_plain_delete() {
        let mut tr = Transaction::new(two_paragraphs(), Selection::default());
        tr.delete_range(1, 3).unwrap();
        assert_eq!(tr.steps(), &[Step::replace(1, 3, Vec::new())]);
    }

    #[test]
    fn test_delete_range_rejects_non_siblings() {
        let doc = Node::doc(vec![
            Node::paragraph(vec![Node::text("ab")]),
            Node::footnotes(vec![Node::footnote("r", 1, vec![Node::paragraph(vec![Node::text("x")])])]),
        ]);
        let mut tr = Transaction::new(doc, Selection::default());
        assert_eq!(
            tr.delete_range(2, 7).map(|_| ()),
            Err(StepError::CrossesBoundary { from: 2, to: 7 })
        );
        assert!(!tr.doc_changed());
    }

    #[test]
    fn test_replace_selection_across_blocks() {
        let mut tr = Transaction::new(two_paragraphs(), Selection::text(5, 7));
        tr.replace_selection(vec![Node::text("X")]).unwrap();

        assert!(tr.selection().is_empty(tr.doc()));
        assert_eq!(tr.doc().child(0).unwrap().text_content(), "abcXde");
        assert_eq!(tr.doc().child_count(), 1);
    }

    #[test]
    fn test_failed_step_leaves_transaction_intact() {
        let doc = Node::doc(vec![Node::paragraph(vec![Node::text("abc")])]);
        let mut tr = Transaction::new(doc.clone(), Selection::default());

        assert!(tr.delete(0, 99).is_err());
        assert!(!tr.doc_changed());
        assert_eq!(tr.doc(), &doc);
    }
}
