//! # Reconciliation
//!
//! Rebuilds reference numbering and the footnote list from scratch:
//!
//! 1. optionally insert a new reference at an anchor
//! 2. number the body references 1..k in document order
//! 3. index the existing footnotes by id
//! 4. walk the reached footnotes in order: keep each one's content (render
//!    id rewritten, nested references numbered k+1.. as they are met) or
//!    create an empty one. References met inside a footnote extend the walk.
//! 5. replace the whole list content with the result. Footnotes the walk
//!    never reached are dropped along with the references inside them.
//!
//! Walking from the body makes the list order and the document order of
//! nested references agree, so one pass settles the document. [`reconcile`]
//! still repeats passes until one changes nothing, within the same
//! transaction, and gives up after [`MAX_PASSES`].

use std::collections::{HashMap, HashSet};

use footnote_model::{
    render_id, IdSource, Node, NodeType, Transaction, ATTR_LOCAL_ID, ATTR_REFERENCE_NUMBER,
    ATTR_RENDER_ID,
};
use tracing::{debug, warn};

use crate::errors::EditorError;
use crate::footnotes::{body_references, footnote_list};
use crate::identity::{collect_ids, fresh_id};

/// Upper bound on passes before giving up
pub const MAX_PASSES: usize = 8;

/// What reconciliation changed
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReconcileReport {
    /// Position of the reference inserted on request
    pub inserted: Option<usize>,
    /// References whose number was rewritten
    pub renumbered: usize,
    /// References given a new id because theirs was missing or duplicated
    pub reidentified: usize,
    /// Ids of footnotes created empty
    pub created: Vec<String>,
    /// Ids of footnotes dropped as orphans
    pub removed: Vec<String>,
    /// Passes run, including the final one that changed nothing
    pub passes: usize,
}

impl ReconcileReport {
    pub fn is_noop(&self) -> bool {
        self.inserted.is_none()
            && self.renumbered == 0
            && self.reidentified == 0
            && self.created.is_empty()
            && self.removed.is_empty()
    }
}

/// Run passes until the document settles
pub fn reconcile(
    tr: &mut Transaction,
    insert_at: Option<usize>,
    ids: &mut dyn IdSource,
) -> Result<ReconcileReport, EditorError> {
    let mut report = ReconcileReport::default();
    let mut insert_at = insert_at;
    for _ in 0..MAX_PASSES {
        let steps_before = tr.steps().len();
        reconcile_pass(tr, insert_at.take(), ids, &mut report)?;
        report.passes += 1;
        if tr.steps().len() == steps_before {
            debug!(passes = report.passes, "footnotes settled");
            return Ok(report);
        }
    }
    warn!(passes = MAX_PASSES, "footnotes did not settle");
    Err(EditorError::Unsettled(MAX_PASSES))
}

/// One reconciliation pass, appending its steps to `tr`
pub fn reconcile_pass(
    tr: &mut Transaction,
    insert_at: Option<usize>,
    ids: &mut dyn IdSource,
    report: &mut ReconcileReport,
) -> Result<(), EditorError> {
    let mut taken = collect_ids(std::slice::from_ref(tr.doc()));

    if let Some(anchor) = insert_at {
        let resolved = tr.doc().resolve(anchor)?;
        if !resolved.parent_type.is_textblock() {
            return Err(EditorError::InvalidSelection(anchor));
        }
        let id = fresh_id(&mut taken, ids);
        tr.insert(anchor, vec![Node::reference(id)])?;
        report.inserted = Some(anchor);
    }

    if footnote_list(tr.doc())?.is_none() {
        let end = tr.doc().content_size();
        tr.insert(end, vec![Node::footnotes(Vec::new())])?;
    }

    let mut order = Order::default();
    number_body_references(tr, &mut order, &mut taken, ids, report)?;
    rebuild_list(tr, &mut order, &mut taken, ids, report)
}

/// Reference ids in numbering order; each id is claimed once
#[derive(Debug, Default)]
struct Order {
    ids: Vec<String>,
    seen: HashSet<String>,
}

impl Order {
    /// Claim `id` for the next reference, or a fresh id when it is missing
    /// or already claimed. Returns the id and whether it is fresh.
    fn claim(
        &mut self,
        id: Option<&str>,
        taken: &mut HashSet<String>,
        ids: &mut dyn IdSource,
    ) -> (String, bool) {
        let (id, fresh) = match id {
            Some(id) if !self.seen.contains(id) => (id.to_string(), false),
            _ => (fresh_id(taken, ids), true),
        };
        self.seen.insert(id.clone());
        self.ids.push(id.clone());
        (id, fresh)
    }

    /// Number of the most recently claimed reference
    fn number(&self) -> String {
        self.ids.len().to_string()
    }
}

fn number_body_references(
    tr: &mut Transaction,
    order: &mut Order,
    taken: &mut HashSet<String>,
    ids: &mut dyn IdSource,
    report: &mut ReconcileReport,
) -> Result<(), EditorError> {
    for reference in body_references(tr.doc()) {
        let (id, fresh) = order.claim(reference.local_id.as_deref(), taken, ids);
        if fresh {
            tr.set_node_attr(reference.pos, ATTR_LOCAL_ID, id)?;
            report.reidentified += 1;
        }

        let number = order.number();
        if reference.number.as_deref() != Some(number.as_str()) {
            tr.set_node_attr(reference.pos, ATTR_REFERENCE_NUMBER, number)?;
            report.renumbered += 1;
        }
    }
    Ok(())
}

/// Copy of `node` with the references inside it claimed and numbered
fn number_nested(
    node: &Node,
    order: &mut Order,
    taken: &mut HashSet<String>,
    ids: &mut dyn IdSource,
    report: &mut ReconcileReport,
) -> Node {
    if node.is(NodeType::FootnoteReference) {
        let (id, fresh) = order.claim(node.attr(ATTR_LOCAL_ID), taken, ids);
        let mut numbered = node.clone();
        if fresh {
            numbered = numbered.copy_with_attr(ATTR_LOCAL_ID, Some(&id));
            report.reidentified += 1;
        }
        let number = order.number();
        if node.attr(ATTR_REFERENCE_NUMBER) != Some(number.as_str()) {
            numbered = numbered.copy_with_attr(ATTR_REFERENCE_NUMBER, Some(&number));
            report.renumbered += 1;
        }
        return numbered;
    }
    if node.content().is_empty() {
        return node.clone();
    }

    let mut content = Vec::with_capacity(node.child_count());
    for child in node.content() {
        content.push(number_nested(child, order, taken, ids, report));
    }
    node.copy_with_content(content)
}

/// Replace the footnote list content with one footnote per reached id
fn rebuild_list(
    tr: &mut Transaction,
    order: &mut Order,
    taken: &mut HashSet<String>,
    ids: &mut dyn IdSource,
    report: &mut ReconcileReport,
) -> Result<(), EditorError> {
    let (start, end, rebuilt) = {
        let Some(list) = footnote_list(tr.doc())? else {
            return Ok(());
        };

        let mut existing: HashMap<&str, &Node> = HashMap::new();
        for (_, note) in list.footnotes() {
            if let Some(id) = note.attr(ATTR_LOCAL_ID) {
                existing.entry(id).or_insert(note);
            }
        }

        // `order` grows while walking: nested references queue their footnotes
        let mut rebuilt = Vec::with_capacity(order.ids.len());
        let mut index = 0;
        while index < order.ids.len() {
            let id = order.ids[index].clone();
            let render = render_id(index + 1);
            let note = match existing.remove(id.as_str()) {
                Some(note) if note.content().is_empty() => note
                    .copy_with_content(vec![Node::paragraph(Vec::new())])
                    .copy_with_attr(ATTR_RENDER_ID, Some(&render)),
                Some(note) => number_nested(note, order, taken, ids, report)
                    .copy_with_attr(ATTR_RENDER_ID, Some(&render)),
                None => {
                    report.created.push(id.clone());
                    Node::footnote(id, index + 1, vec![Node::paragraph(Vec::new())])
                }
            };
            rebuilt.push(note);
            index += 1;
        }

        // Whatever was not reached is dropped
        for (_, note) in list.footnotes() {
            if let Some(id) = note.attr(ATTR_LOCAL_ID) {
                if existing.remove(id).is_some() {
                    report.removed.push(id.to_string());
                }
            }
        }

        if list.node.content() == rebuilt.as_slice() {
            return Ok(());
        }
        (list.content_start(), list.content_end(), rebuilt)
    };

    tr.replace(start, end, rebuilt)?;
    Ok(())
}
