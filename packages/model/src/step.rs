//! # Steps
//!
//! Elementary, invertible document changes. Every edit, including the ones
//! appended by footnote maintenance, is expressed as a sequence of steps so
//! it can be mapped, inverted and grouped for undo.
//!
//! - `Replace` swaps the content between two positions that share a parent
//!   node. An empty range inserts, empty content deletes.
//! - `SetAttr` sets or clears one attribute of the node starting at a position.

use serde::{Deserialize, Serialize};

use crate::error::{StepError, StepResult};
use crate::mapping::StepMap;
use crate::node::Node;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "stepType", rename_all = "camelCase")]
pub enum Step {
    Replace {
        from: usize,
        to: usize,
        #[serde(default)]
        content: Vec<Node>,
    },

    SetAttr {
        pos: usize,
        name: String,
        value: Option<String>,
    },
}

impl Step {
    pub fn replace(from: usize, to: usize, content: Vec<Node>) -> Self {
        Step::Replace { from, to, content }
    }

    pub fn set_attr(pos: usize, name: impl Into<String>, value: Option<String>) -> Self {
        Step::SetAttr {
            pos,
            name: name.into(),
            value,
        }
    }

    /// Apply to `doc`, producing a new document
    pub fn apply(&self, doc: &Node) -> StepResult<Node> {
        match self {
            Step::Replace { from, to, content } => {
                let (rfrom, rto) = doc.resolve_range(*from, *to)?;
                doc.replace_at_path(&rfrom.path, rfrom.parent_offset, rto.parent_offset, content)
            }
            Step::SetAttr { pos, name, value } => doc.update_node_at(*pos, |node| {
                if node.is_text() {
                    return Err(StepError::NotAttributable(*pos));
                }
                Ok(node.copy_with_attr(name, value.as_deref()))
            }),
        }
    }

    /// Step undoing this one, given the document it was applied to
    pub fn invert(&self, doc: &Node) -> StepResult<Step> {
        match self {
            Step::Replace { from, to, .. } => Ok(Step::Replace {
                from: *from,
                to: from + self.inserted_size(),
                content: doc.slice(*from, *to)?,
            }),
            Step::SetAttr { pos, name, .. } => {
                let node = doc.node_at(*pos).ok_or(StepError::NoNodeAt(*pos))?;
                Ok(Step::SetAttr {
                    pos: *pos,
                    name: name.clone(),
                    value: node.attr(name).map(str::to_string),
                })
            }
        }
    }

    pub fn map(&self) -> StepMap {
        match self {
            Step::Replace { from, to, .. } => StepMap::new(*from, to - from, self.inserted_size()),
            Step::SetAttr { .. } => StepMap::empty(),
        }
    }

    pub fn inserted_size(&self) -> usize {
        match self {
            Step::Replace { content, .. } => content.iter().map(Node::node_size).sum(),
            Step::SetAttr { .. } => 0,
        }
    }

    /// Nodes carried in by this step
    pub fn inserted(&self) -> &[Node] {
        match self {
            Step::Replace { content, .. } => content,
            Step::SetAttr { .. } => &[],
        }
    }

    /// Replace step that removes a non-empty range
    pub fn is_delete(&self) -> bool {
        matches!(self, Step::Replace { from, to, .. } if from != to)
    }

    /// Replace step that only adds content
    pub fn is_insert(&self) -> bool {
        matches!(self, Step::Replace { from, to, content } if from == to && !content.is_empty())
    }

    /// Range removed from the document the step applies to
    pub fn deleted_range(&self) -> Option<(usize, usize)> {
        match self {
            Step::Replace { from, to, .. } if from != to => Some((*from, *to)),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::{NodeType, ATTR_REFERENCE_NUMBER};

    fn doc() -> Node {
        Node::doc(vec![
            Node::paragraph(vec![Node::text("hello"), Node::reference("a")]),
            Node::footnotes(vec![]),
        ])
    }

    #[test]
    fn test_insert_into_text_splits_and_merges() {
        let doc = doc();
        let step = Step::replace(3, 3, vec![Node::text("XY")]);
        let next = step.apply(&doc).unwrap();
        let para = next.child(0).unwrap();
        assert_eq!(para.child(0).unwrap().text_str(), Some("heXYllo"));
        assert_eq!(para.child_count(), 2);
    }

    #[test]
    fn test_delete_reference() {
        let doc = doc();
        let step = Step::replace(6, 7, vec![]);
        assert!(step.is_delete());
        let next = step.apply(&doc).unwrap();
        assert_eq!(next.child(0).unwrap().child_count(), 1);
    }

    #[test]
    fn test_invert_restores_document() {
        let doc = doc();
        let step = Step::replace(2, 7, vec![Node::reference("b")]);
        let next = step.apply(&doc).unwrap();
        let inverse = step.invert(&doc).unwrap();
        assert_eq!(inverse.apply(&next).unwrap(), doc);
    }

    #[test]
    fn test_set_attr_and_invert() {
        let doc = doc();
        let step = Step::set_attr(6, ATTR_REFERENCE_NUMBER, Some("1".to_string()));
        let next = step.apply(&doc).unwrap();
        assert_eq!(next.node_at(6).unwrap().attr(ATTR_REFERENCE_NUMBER), Some("1"));
        let inverse = step.invert(&doc).unwrap();
        assert_eq!(inverse.apply(&next).unwrap(), doc);
    }

    #[test]
    fn test_set_attr_on_text_fails() {
        let err = Step::set_attr(2, "x", None).apply(&doc()).unwrap_err();
        assert_eq!(err, StepError::NoNodeAt(2));
        let err = Step::set_attr(1, "x", None).apply(&doc()).unwrap_err();
        assert_eq!(err, StepError::NotAttributable(1));
    }

    #[test]
    fn test_schema_violation_rejected() {
        let step = Step::replace(9, 9, vec![Node::paragraph(vec![])]);
        let err = step.apply(&doc()).unwrap_err();
        assert_eq!(
            err,
            StepError::InvalidContent {
                parent: NodeType::Footnotes,
                child: NodeType::Paragraph
            }
        );
    }

    #[test]
    fn test_cross_boundary_rejected() {
        let step = Step::replace(3, 9, vec![]);
        assert!(matches!(step.apply(&doc()), Err(StepError::CrossesBoundary { .. })));
    }
}
