//! Read-only queries over footnote references and the footnote list.

use std::collections::{HashMap, HashSet};

use footnote_model::{Node, NodeType, ATTR_LOCAL_ID, ATTR_REFERENCE_NUMBER};

use crate::errors::StructureError;

/// A footnote reference found in a document
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reference {
    pub pos: usize,
    pub local_id: Option<String>,
    pub number: Option<String>,
}

/// All footnote references in document order, including references nested
/// inside footnote bodies
pub fn references(doc: &Node) -> Vec<Reference> {
    let mut refs = Vec::new();
    doc.descendants(&mut |node, pos, _| {
        if node.is(NodeType::FootnoteReference) {
            refs.push(Reference {
                pos,
                local_id: node.attr(ATTR_LOCAL_ID).map(str::to_string),
                number: node.attr(ATTR_REFERENCE_NUMBER).map(str::to_string),
            });
        }
        true
    });
    refs
}

/// References outside the footnote list, in document order
pub fn body_references(doc: &Node) -> Vec<Reference> {
    let end = match footnote_list(doc) {
        Ok(Some(list)) => list.pos,
        _ => doc.content_size(),
    };
    references(doc).into_iter().filter(|r| r.pos < end).collect()
}

/// Ids reachable from the body: body references first, then the references
/// inside each reached footnote, breadth first. This is the only order in
/// which the list can follow document order of references, since every
/// nested reference sits after the body and inside the footnote that
/// reached it.
///
/// Footnotes only referenced from other unreached footnotes (a footnote
/// citing itself, or two citing each other) are not reachable.
pub fn reachable_ids(doc: &Node) -> Vec<String> {
    let mut notes: HashMap<&str, &Node> = HashMap::new();
    if let Ok(Some(list)) = footnote_list(doc) {
        for (_, note) in list.footnotes() {
            if let Some(id) = note.attr(ATTR_LOCAL_ID) {
                notes.entry(id).or_insert(note);
            }
        }
    }

    let mut seen = HashSet::new();
    let mut order: Vec<String> = body_references(doc)
        .into_iter()
        .filter_map(|r| r.local_id)
        .filter(|id| seen.insert(id.clone()))
        .collect();

    let mut index = 0;
    while index < order.len() {
        if let Some(note) = notes.get(order[index].as_str()) {
            for id in reference_ids(note.content()) {
                if seen.insert(id.clone()) {
                    order.push(id);
                }
            }
        }
        index += 1;
    }
    order
}

/// Local ids of the references contained in `nodes` (at any depth)
pub fn reference_ids(nodes: &[Node]) -> Vec<String> {
    let mut ids = Vec::new();
    for node in nodes {
        collect_reference_ids(node, &mut ids);
    }
    ids
}

fn collect_reference_ids(node: &Node, ids: &mut Vec<String>) {
    if node.is(NodeType::FootnoteReference) {
        if let Some(id) = node.attr(ATTR_LOCAL_ID) {
            ids.push(id.to_string());
        }
    }
    for child in node.content() {
        collect_reference_ids(child, ids);
    }
}

/// The footnote list of a document and its position
#[derive(Debug, Clone, Copy)]
pub struct FootnoteList<'a> {
    pub pos: usize,
    pub node: &'a Node,
}

impl<'a> FootnoteList<'a> {
    pub fn content_start(&self) -> usize {
        self.pos + 1
    }

    pub fn content_end(&self) -> usize {
        self.pos + 1 + self.node.content_size()
    }

    /// Children of the list with their absolute positions
    pub fn children(&self) -> impl Iterator<Item = (usize, &'a Node)> + 'a {
        let mut pos = self.content_start();
        self.node.content().iter().map(move |child| {
            let start = pos;
            pos += child.node_size();
            (start, child)
        })
    }

    /// Footnotes with their absolute positions
    pub fn footnotes(&self) -> impl Iterator<Item = (usize, &'a Node)> + 'a {
        self.children().filter(|(_, node)| node.is(NodeType::Footnote))
    }
}

/// Locate the footnote list; more than one is a structure error
pub fn footnote_list(doc: &Node) -> Result<Option<FootnoteList<'_>>, StructureError> {
    let mut found = None;
    let mut count = 0;
    let mut pos = 0;
    for child in doc.content() {
        if child.is(NodeType::Footnotes) {
            count += 1;
            found.get_or_insert(FootnoteList { pos, node: child });
        }
        pos += child.node_size();
    }
    if count > 1 {
        return Err(StructureError::DuplicateFootnoteLists(count));
    }
    Ok(found)
}

/// Shape checks the footnote engine relies on but does not repair
pub fn check_structure(doc: &Node) -> Result<(), StructureError> {
    if !doc.is(NodeType::Doc) {
        return Err(StructureError::NotADocument(doc.node_type()));
    }
    if footnote_list(doc)?.is_some() && !doc.last_child().is_some_and(|n| n.is(NodeType::Footnotes)) {
        return Err(StructureError::FootnotesNotLast);
    }
    Ok(())
}

/// Footnote whose local id is `id`
pub fn find_footnote<'a>(doc: &'a Node, id: &str) -> Option<(usize, &'a Node)> {
    let list = footnote_list(doc).ok().flatten()?;
    list.footnotes()
        .find(|(_, node)| node.attr(ATTR_LOCAL_ID) == Some(id))
}
