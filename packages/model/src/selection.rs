use serde::{Deserialize, Serialize};

use crate::mapping::{Bias, StepMap};
use crate::node::Node;

/// Editor selection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum Selection {
    /// Text range between `anchor` and `head` (a cursor when equal)
    Text { anchor: usize, head: usize },

    /// The single node starting at `pos`
    Node { pos: usize },

    /// The whole document
    All,
}

impl Selection {
    pub fn cursor(pos: usize) -> Self {
        Selection::Text { anchor: pos, head: pos }
    }

    pub fn text(anchor: usize, head: usize) -> Self {
        Selection::Text { anchor, head }
    }

    /// Ordered `(from, to)` range on `doc`
    pub fn range(&self, doc: &Node) -> (usize, usize) {
        match *self {
            Selection::Text { anchor, head } => (anchor.min(head), anchor.max(head)),
            Selection::Node { pos } => {
                let size = doc.node_at(pos).map_or(0, Node::node_size);
                (pos, pos + size)
            }
            Selection::All => (0, doc.content_size()),
        }
    }

    pub fn anchor(&self) -> usize {
        match *self {
            Selection::Text { anchor, .. } => anchor,
            Selection::Node { pos } => pos,
            Selection::All => 0,
        }
    }

    pub fn is_empty(&self, doc: &Node) -> bool {
        let (from, to) = self.range(doc);
        from == to
    }

    /// Map through one step. A node selection whose node was removed
    /// collapses to a cursor.
    pub fn map(self, map: &StepMap) -> Self {
        match self {
            Selection::Text { anchor, head } => Selection::Text {
                anchor: map.map(anchor, Bias::Right),
                head: map.map(head, Bias::Right),
            },
            Selection::Node { pos } => {
                let mapped = map.map(pos, Bias::Right);
                if map.deletes(pos, pos + 1) {
                    Selection::cursor(mapped)
                } else {
                    Selection::Node { pos: mapped }
                }
            }
            Selection::All => Selection::All,
        }
    }
}

impl Default for Selection {
    fn default() -> Self {
        Selection::cursor(0)
    }
}
