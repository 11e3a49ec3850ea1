//! Consistency rules between footnote references and the footnote list.
//!
//! A settled document satisfies all of:
//! 1. reference numbers run 1, 2, 3... in document order
//! 2. the list holds one footnote per reference, in reference order
//! 3. every reference id matches exactly one footnote and vice versa
//! 4. each footnote's render id is `fn:<position>`
//! 5. the list holds nothing but footnotes
//! 6. every footnote can be reached from a reference in the body, directly
//!    or through other footnotes

use std::collections::HashSet;

use footnote_model::{render_id, Node, NodeType, ATTR_LOCAL_ID, ATTR_RENDER_ID};
use thiserror::Error;

use crate::footnotes::{footnote_list, reachable_ids, references};

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Violation {
    #[error("document holds {0} footnote lists")]
    DuplicateLists(usize),

    #[error("document has no footnote list")]
    MissingList,

    #[error("reference at {pos} is numbered {found:?}, expected {expected}")]
    Numbering {
        pos: usize,
        expected: usize,
        found: Option<String>,
    },

    #[error("reference at {0} has no id")]
    MissingId(usize),

    #[error("reference id {0} is used more than once")]
    DuplicateId(String),

    #[error("reference {0} has no footnote")]
    MissingDefinition(String),

    #[error("footnote {0} has no reference")]
    OrphanDefinition(String),

    #[error("footnote {0} is only cited from footnotes the body never reaches")]
    Unreachable(String),

    #[error("footnote order differs from reference order at index {0}")]
    OutOfOrder(usize),

    #[error("footnote {index} has render id {found:?}, expected {expected}")]
    RenderId {
        index: usize,
        expected: String,
        found: Option<String>,
    },

    #[error("footnote list holds a {found} at {pos}")]
    NotAFootnote { pos: usize, found: NodeType },
}

/// Every rule broken by `doc`
pub fn check(doc: &Node) -> Vec<Violation> {
    let mut violations = Vec::new();

    let list = match footnote_list(doc) {
        Ok(list) => list,
        Err(_) => {
            let count = doc.content().iter().filter(|n| n.is(NodeType::Footnotes)).count();
            violations.push(Violation::DuplicateLists(count));
            return violations;
        }
    };

    let refs = references(doc);
    let mut ref_ids = Vec::with_capacity(refs.len());
    let mut seen = HashSet::new();
    for (index, reference) in refs.iter().enumerate() {
        let expected = index + 1;
        if reference.number.as_deref() != Some(expected.to_string().as_str()) {
            violations.push(Violation::Numbering {
                pos: reference.pos,
                expected,
                found: reference.number.clone(),
            });
        }
        match &reference.local_id {
            Some(id) => {
                if !seen.insert(id.as_str()) {
                    violations.push(Violation::DuplicateId(id.clone()));
                }
                ref_ids.push(id.as_str());
            }
            None => violations.push(Violation::MissingId(reference.pos)),
        }
    }

    let Some(list) = list else {
        violations.push(Violation::MissingList);
        return violations;
    };

    let mut def_ids = Vec::new();
    for (pos, child) in list.children() {
        if !child.is(NodeType::Footnote) {
            violations.push(Violation::NotAFootnote {
                pos,
                found: child.node_type(),
            });
            continue;
        }
        let index = def_ids.len();
        let expected = render_id(index + 1);
        if child.attr(ATTR_RENDER_ID) != Some(expected.as_str()) {
            violations.push(Violation::RenderId {
                index,
                expected,
                found: child.attr(ATTR_RENDER_ID).map(str::to_string),
            });
        }
        def_ids.push(child.attr(ATTR_LOCAL_ID).unwrap_or_default());
    }

    let ref_set: HashSet<&str> = ref_ids.iter().copied().collect();
    let def_set: HashSet<&str> = def_ids.iter().copied().collect();
    for id in &ref_ids {
        if !def_set.contains(id) {
            violations.push(Violation::MissingDefinition(id.to_string()));
        }
    }
    for id in &def_ids {
        if !ref_set.contains(id) {
            violations.push(Violation::OrphanDefinition(id.to_string()));
        }
    }
    let reachable: HashSet<String> = reachable_ids(doc).into_iter().collect();
    for id in &def_ids {
        if ref_set.contains(id) && !reachable.contains(*id) {
            violations.push(Violation::Unreachable(id.to_string()));
        }
    }
    if let Some(index) = (0..ref_ids.len().max(def_ids.len()))
        .find(|&i| ref_ids.get(i) != def_ids.get(i))
    {
        violations.push(Violation::OutOfOrder(index));
    }

    violations
}

pub fn holds(doc: &Node) -> bool {
    check(doc).is_empty()
}
