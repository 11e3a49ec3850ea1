use thiserror::Error;

use crate::node::NodeType;

pub type StepResult<T> = Result<T, StepError>;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StepError {
    #[error("Position {pos} is outside the document (content size {size})")]
    OutOfRange { pos: usize, size: usize },

    #[error("Invalid range {from}..{to}")]
    InvalidRange { from: usize, to: usize },

    #[error("Range {from}..{to} crosses a node boundary")]
    CrossesBoundary { from: usize, to: usize },

    #[error("{child} is not allowed inside {parent}")]
    InvalidContent { parent: NodeType, child: NodeType },

    #[error("No node starts at position {0}")]
    NoNodeAt(usize),

    #[error("Node at position {0} cannot carry attributes")]
    NotAttributable(usize),
}
