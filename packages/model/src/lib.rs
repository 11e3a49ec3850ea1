//! # Footnote Model
//!
//! Document tree the footnote engine runs on.
//!
//! ```text
//! doc
//! ├── paragraph            text and footnote references
//! ├── ...
//! └── footnotes            always the last child of doc
//!     └── footnote         one or more paragraphs
//! ```
//!
//! Documents are immutable values. Edits are expressed as [`Step`]s
//! collected in a [`Transaction`]; every step yields a new tree and a
//! [`StepMap`] so positions can be carried across the change.

pub mod error;
pub mod id_generator;
pub mod mapping;
pub mod node;
pub mod selection;
pub mod step;
pub mod transaction;

pub use error::{StepError, StepResult};
pub use id_generator::{IdSource, SequentialIds, UuidIds};
pub use mapping::{Bias, Mapping, StepMap};
pub use node::{
    render_id, Node, NodeType, ResolvedPos, ATTR_LOCAL_ID, ATTR_REFERENCE_NUMBER, ATTR_RENDER_ID,
    RENDER_ID_PREFIX,
};
pub use selection::Selection;
pub use step::Step;
pub use transaction::{Transaction, TransactionMeta};
