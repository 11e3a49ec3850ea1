use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use crate::error::{StepError, StepResult};

/// Attribute holding the identifier shared by a reference and its footnote
pub const ATTR_LOCAL_ID: &str = "data-id";

/// Attribute holding a reference's 1-based number (decimal string)
pub const ATTR_REFERENCE_NUMBER: &str = "referenceNumber";

/// Attribute holding a footnote's render id (`fn:<n>`)
pub const ATTR_RENDER_ID: &str = "id";

/// Prefix of footnote render ids
pub const RENDER_ID_PREFIX: &str = "fn:";

/// Node kinds known to the document schema
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum NodeType {
    Doc,
    Paragraph,
    Text,
    FootnoteReference,
    Footnotes,
    Footnote,
}

impl NodeType {
    pub fn name(self) -> &'static str {
        match self {
            NodeType::Doc => "doc",
            NodeType::Paragraph => "paragraph",
            NodeType::Text => "text",
            NodeType::FootnoteReference => "footnoteReference",
            NodeType::Footnotes => "footnotes",
            NodeType::Footnote => "footnote",
        }
    }

    /// Inline nodes live inside textblocks
    pub fn is_inline(self) -> bool {
        matches!(self, NodeType::Text | NodeType::FootnoteReference)
    }

    /// Leaves have no content positions of their own
    pub fn is_leaf(self) -> bool {
        self.is_inline()
    }

    pub fn is_textblock(self) -> bool {
        self == NodeType::Paragraph
    }

    /// Content expression of the schema, flattened to a membership check
    pub fn allows_child(self, child: NodeType) -> bool {
        match self {
            NodeType::Doc => matches!(child, NodeType::Paragraph | NodeType::Footnotes),
            NodeType::Paragraph => child.is_inline(),
            NodeType::Footnotes => child == NodeType::Footnote,
            NodeType::Footnote => child == NodeType::Paragraph,
            NodeType::Text | NodeType::FootnoteReference => false,
        }
    }
}

impl fmt::Display for NodeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Immutable document tree node
///
/// Positions follow the usual token model: a text node counts one position
/// per character, a footnote reference counts one, and every other node
/// counts its content plus an opening and a closing token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Node {
    #[serde(rename = "type")]
    node_type: NodeType,

    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    attrs: BTreeMap<String, String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    content: Vec<Node>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    text: Option<String>,
}

impl Node {
    pub fn new(node_type: NodeType, content: Vec<Node>) -> Self {
        Self {
            node_type,
            attrs: BTreeMap::new(),
            content,
            text: None,
        }
    }

    pub fn doc(content: Vec<Node>) -> Self {
        Self::new(NodeType::Doc, content)
    }

    pub fn paragraph(content: Vec<Node>) -> Self {
        Self::new(NodeType::Paragraph, content)
    }

    pub fn text(text: impl Into<String>) -> Self {
        Self {
            node_type: NodeType::Text,
            attrs: BTreeMap::new(),
            content: Vec::new(),
            text: Some(text.into()),
        }
    }

    /// Inline footnote reference with the given local id
    pub fn reference(local_id: impl Into<String>) -> Self {
        Self::new(NodeType::FootnoteReference, Vec::new()).with_attr(ATTR_LOCAL_ID, local_id)
    }

    /// Footnote list holding the given footnotes
    pub fn footnotes(footnotes: Vec<Node>) -> Self {
        Self::new(NodeType::Footnotes, footnotes)
    }

    /// Footnote body for reference `number`
    pub fn footnote(local_id: impl Into<String>, number: usize, paragraphs: Vec<Node>) -> Self {
        Self::new(NodeType::Footnote, paragraphs)
            .with_attr(ATTR_LOCAL_ID, local_id)
            .with_attr(ATTR_RENDER_ID, render_id(number))
    }

    pub fn with_attr(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.attrs.insert(name.into(), value.into());
        self
    }

    pub fn node_type(&self) -> NodeType {
        self.node_type
    }

    pub fn is(&self, node_type: NodeType) -> bool {
        self.node_type == node_type
    }

    pub fn is_text(&self) -> bool {
        self.node_type == NodeType::Text
    }

    pub fn is_leaf(&self) -> bool {
        self.node_type.is_leaf()
    }

    pub fn attrs(&self) -> &BTreeMap<String, String> {
        &self.attrs
    }

    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attrs.get(name).map(String::as_str)
    }

    pub fn text_content(&self) -> String {
        match &self.text {
            Some(text) => text.clone(),
            None => self.content.iter().map(Node::text_content).collect(),
        }
    }

    pub fn text_str(&self) -> Option<&str> {
        self.text.as_deref()
    }

    pub fn content(&self) -> &[Node] {
        &self.content
    }

    pub fn child_count(&self) -> usize {
        self.content.len()
    }

    pub fn child(&self, index: usize) -> Option<&Node> {
        self.content.get(index)
    }

    pub fn last_child(&self) -> Option<&Node> {
        self.content.last()
    }

    /// Same node with its content replaced
    pub fn copy_with_content(&self, content: Vec<Node>) -> Node {
        Node {
            node_type: self.node_type,
            attrs: self.attrs.clone(),
            content,
            text: self.text.clone(),
        }
    }

    /// Same node with one attribute set (or removed when `value` is `None`)
    pub fn copy_with_attr(&self, name: &str, value: Option<&str>) -> Node {
        let mut node = self.clone();
        match value {
            Some(value) => {
                node.attrs.insert(name.to_string(), value.to_string());
            }
            None => {
                node.attrs.remove(name);
            }
        }
        node
    }

    pub fn node_size(&self) -> usize {
        match self.node_type {
            NodeType::Text => self.text.as_deref().map_or(0, |t| t.chars().count()),
            NodeType::FootnoteReference => 1,
            _ => self.content_size() + 2,
        }
    }

    pub fn content_size(&self) -> usize {
        self.content.iter().map(Node::node_size).sum()
    }

    /// Visit every node overlapping `from..to`, in document order.
    ///
    /// The callback receives the node, its absolute position and its parent.
    /// Returning `false` skips the node's descendants.
    pub fn nodes_between<F>(&self, from: usize, to: usize, f: &mut F)
    where
        F: FnMut(&Node, usize, &Node) -> bool,
    {
        self.walk_between(from, to, f, 0);
    }

    fn walk_between<F>(&self, from: usize, to: usize, f: &mut F, node_start: usize)
    where
        F: FnMut(&Node, usize, &Node) -> bool,
    {
        let mut pos = 0;
        for child in &self.content {
            if pos >= to {
                break;
            }
            let end = pos + child.node_size();
            if end > from && f(child, node_start + pos, self) && !child.is_leaf() {
                let start = pos + 1;
                let inner_to = (to - start).min(child.content_size());
                child.walk_between(from.saturating_sub(start), inner_to, f, node_start + start);
            }
            pos = end;
        }
    }

    /// Visit every descendant in document order
    pub fn descendants<F>(&self, f: &mut F)
    where
        F: FnMut(&Node, usize, &Node) -> bool,
    {
        self.nodes_between(0, self.content_size(), f);
    }

    /// Child index and start offset of the child covering `offset`
    fn find_index(&self, offset: usize) -> Option<(usize, usize)> {
        let mut pos = 0;
        for (index, child) in self.content.iter().enumerate() {
            let end = pos + child.node_size();
            if offset < end {
                return Some((index, pos));
            }
            pos = end;
        }
        None
    }

    /// Node starting at `pos`, or the text node covering it
    pub fn node_at(&self, pos: usize) -> Option<&Node> {
        let mut node = self;
        let mut pos = pos;
        loop {
            let (index, offset) = node.find_index(pos)?;
            let child = &node.content[index];
            if offset == pos || child.is_text() {
                return Some(child);
            }
            if child.is_leaf() {
                return None;
            }
            node = child;
            pos -= offset + 1;
        }
    }

    /// Resolve a position to the innermost node whose content contains it
    pub fn resolve(&self, pos: usize) -> StepResult<ResolvedPos> {
        let size = self.content_size();
        if pos > size {
            return Err(StepError::OutOfRange { pos, size });
        }

        let mut path = Vec::new();
        let mut node = self;
        let mut start = 0;
        'descend: loop {
            let offset = pos - start;
            let mut child_pos = 0;
            for (index, child) in node.content.iter().enumerate() {
                let end = child_pos + child.node_size();
                if offset > child_pos && offset < end && !child.is_leaf() {
                    start += child_pos + 1;
                    path.push(index);
                    node = child;
                    continue 'descend;
                }
                if end > offset {
                    break;
                }
                child_pos = end;
            }
            return Ok(ResolvedPos {
                pos,
                path,
                start,
                parent_type: node.node_type,
                parent_offset: offset,
            });
        }
    }

    /// Follow a child index path from this node
    pub fn node_at_path(&self, path: &[usize]) -> Option<&Node> {
        path.iter().try_fold(self, |node, &index| node.content.get(index))
    }

    /// Content between two positions sharing a parent
    pub fn slice(&self, from: usize, to: usize) -> StepResult<Vec<Node>> {
        let (rfrom, rto) = self.resolve_range(from, to)?;
        let parent = self
            .node_at_path(&rfrom.path)
            .ok_or(StepError::OutOfRange { pos: from, size: self.content_size() })?;
        Ok(cut(&parent.content, rfrom.parent_offset, rto.parent_offset))
    }

    pub(crate) fn resolve_range(&self, from: usize, to: usize) -> StepResult<(ResolvedPos, ResolvedPos)> {
        if from > to {
            return Err(StepError::InvalidRange { from, to });
        }
        let rfrom = self.resolve(from)?;
        let rto = self.resolve(to)?;
        if rfrom.path != rto.path {
            return Err(StepError::CrossesBoundary { from, to });
        }
        Ok((rfrom, rto))
    }

    /// Text between two positions; non-text leaves contribute `leaf_text`
    /// and block boundaries contribute nothing
    pub fn text_between(&self, from: usize, to: usize, leaf_text: &str) -> String {
        let mut out = String::new();
        self.nodes_between(from, to, &mut |node, pos, _| {
            if let Some(text) = node.text_str() {
                let skip = from.saturating_sub(pos);
                let take = to.min(pos + node.node_size()) - pos.max(from);
                out.extend(text.chars().skip(skip).take(take));
            } else if node.is_leaf() {
                out.push_str(leaf_text);
            }
            true
        });
        out
    }

    /// First position inside a textblock (start of the document's text)
    pub fn text_start(&self) -> Option<usize> {
        let mut found = None;
        self.descendants(&mut |node, pos, _| {
            if found.is_some() {
                return false;
            }
            if node.node_type.is_textblock() {
                found = Some(pos + 1);
                return false;
            }
            true
        });
        found
    }

    /// Last position inside a textblock (end of the document's text)
    pub fn text_end(&self) -> Option<usize> {
        let mut found = None;
        self.descendants(&mut |node, pos, _| {
            if node.node_type.is_textblock() {
                found = Some(pos + 1 + node.content_size());
                return false;
            }
            true
        });
        found
    }

    pub(crate) fn replace_at_path(
        &self,
        path: &[usize],
        from: usize,
        to: usize,
        insert: &[Node],
    ) -> StepResult<Node> {
        match path.split_first() {
            None => {
                for node in insert {
                    if !self.node_type.allows_child(node.node_type) {
                        return Err(StepError::InvalidContent {
                            parent: self.node_type,
                            child: node.node_type,
                        });
                    }
                }
                let mut content = cut(&self.content, 0, from);
                content.extend(insert.iter().cloned());
                content.extend(cut(&self.content, to, self.content_size()));
                Ok(self.copy_with_content(normalize(content)))
            }
            Some((&index, rest)) => {
                let replaced = self.content[index].replace_at_path(rest, from, to, insert)?;
                let mut content = self.content.clone();
                content[index] = replaced;
                Ok(self.copy_with_content(content))
            }
        }
    }

    /// Rebuild the tree with the node starting at `pos` transformed by `f`
    pub(crate) fn update_node_at<F>(&self, pos: usize, f: F) -> StepResult<Node>
    where
        F: FnOnce(&Node) -> StepResult<Node>,
    {
        self.update_at(pos, pos, f)
    }

    fn update_at<F>(&self, offset: usize, pos: usize, f: F) -> StepResult<Node>
    where
        F: FnOnce(&Node) -> StepResult<Node>,
    {
        let (index, start) = self.find_index(offset).ok_or(StepError::NoNodeAt(pos))?;
        let child = &self.content[index];
        let updated = if start == offset {
            f(child)?
        } else if child.is_leaf() {
            return Err(StepError::NoNodeAt(pos));
        } else {
            child.update_at(offset - start - 1, pos, f)?
        };
        let mut content = self.content.clone();
        content[index] = updated;
        Ok(self.copy_with_content(content))
    }
}

/// Position resolved against a document
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedPos {
    pub pos: usize,
    /// Child indices from the root to the parent node
    pub path: Vec<usize>,
    /// Absolute position where the parent's content starts
    pub start: usize,
    pub parent_type: NodeType,
    pub parent_offset: usize,
}

impl ResolvedPos {
    pub fn depth(&self) -> usize {
        self.path.len()
    }

    pub fn parent<'a>(&self, doc: &'a Node) -> Option<&'a Node> {
        doc.node_at_path(&self.path)
    }
}

/// `fn:<number>`
pub fn render_id(number: usize) -> String {
    format!("{}{}", RENDER_ID_PREFIX, number)
}

/// Children overlapping `from..to` (parent-relative), splitting text nodes
fn cut(content: &[Node], from: usize, to: usize) -> Vec<Node> {
    let mut out = Vec::new();
    let mut pos = 0;
    for child in content {
        let size = child.node_size();
        let end = pos + size;
        if end > from && pos < to {
            match child.text_str() {
                Some(text) if pos < from || end > to => {
                    let skip = from.saturating_sub(pos);
                    let take = to.min(end) - pos.max(from);
                    out.push(Node::text(text.chars().skip(skip).take(take).collect::<String>()));
                }
                _ => out.push(child.clone()),
            }
        } else if size == 0 && pos >= from && pos < to {
            out.push(child.clone());
        }
        pos = end;
    }
    out
}

/// Merge adjacent text nodes and drop empty ones
pub(crate) fn normalize(content: Vec<Node>) -> Vec<Node> {
    let mut out: Vec<Node> = Vec::with_capacity(content.len());
    for node in content {
        if node.is_text() {
            if node.node_size() == 0 {
                continue;
            }
            if let Some(last) = out.last_mut() {
                if last.is_text() && last.attrs == node.attrs {
                    if let (Some(text), Some(more)) = (last.text.as_mut(), node.text.as_deref()) {
                        text.push_str(more);
                        continue;
                    }
                }
            }
        }
        out.push(node);
    }
    out
}
