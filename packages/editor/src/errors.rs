//! Error types for the editor

use footnote_model::StepError;
use thiserror::Error;

use crate::guard::ScopeViolation;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EditorError {
    #[error("Edit rejected: {0}")]
    Rejected(#[from] ScopeViolation),

    #[error("Step error: {0}")]
    Step(#[from] StepError),

    #[error("Structure error: {0}")]
    Structure(#[from] StructureError),

    #[error("No footnote with id {0}")]
    DefinitionNotFound(String),

    #[error("Position {0} cannot hold a footnote reference")]
    InvalidSelection(usize),

    #[error("No footnote reference at position {0}")]
    NotAReference(usize),

    #[error("Footnotes did not settle after {0} reconciliation passes")]
    Unsettled(usize),
}

/// Host-level shape problems the footnote engine does not repair
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StructureError {
    #[error("root node is {0}, expected doc")]
    NotADocument(footnote_model::NodeType),

    #[error("document holds {0} footnote lists")]
    DuplicateFootnoteLists(usize),

    #[error("footnote list is not the last child of the document")]
    FootnotesNotLast,
}
