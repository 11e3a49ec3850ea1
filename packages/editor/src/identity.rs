//! # Identity Regenerator
//!
//! Content that arrives from outside the current document (paste) may carry
//! reference ids that already exist. Every reference in such content gets a
//! fresh id before insertion, so reconciliation treats it as a new footnote.

use std::collections::HashSet;

use footnote_model::{IdSource, Node, NodeType, ATTR_LOCAL_ID};
use tracing::debug;

use crate::footnotes::reference_ids;

/// Reference ids used anywhere in `nodes`
pub fn collect_ids(nodes: &[Node]) -> HashSet<String> {
    reference_ids(nodes).into_iter().collect()
}

/// Next id from `ids` that is not in `taken`; the result is added to `taken`
pub fn fresh_id(taken: &mut HashSet<String>, ids: &mut dyn IdSource) -> String {
    loop {
        let id = ids.next_id();
        if taken.insert(id.clone()) {
            return id;
        }
    }
}

/// Copy of `nodes` with every reference id replaced by a fresh one
pub fn regenerate(nodes: &[Node], taken: &mut HashSet<String>, ids: &mut dyn IdSource) -> Vec<Node> {
    nodes.iter().map(|node| regenerate_node(node, taken, ids)).collect()
}

fn regenerate_node(node: &Node, taken: &mut HashSet<String>, ids: &mut dyn IdSource) -> Node {
    if node.is(NodeType::FootnoteReference) {
        let id = fresh_id(taken, ids);
        debug!(old = ?node.attr(ATTR_LOCAL_ID), new = %id, "regenerated reference id");
        return node.copy_with_attr(ATTR_LOCAL_ID, Some(&id));
    }
    if node.content().is_empty() {
        return node.clone();
    }
    node.copy_with_content(regenerate(node.content(), taken, ids))
}
