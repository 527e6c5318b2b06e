//! Domain layer: the mind map model and its invariants
//!
//! This layer is independent of external concerns (no I/O, no CLI, no config loading).

pub mod document;
pub mod error;
pub mod map;
pub mod node;
pub mod render;

pub use document::{MapDocument, DOCUMENT_VERSION};
pub use error::{DomainError, DomainResult};
pub use map::{DeletePreview, Find, MindMap, TreeIterator, MAX_DEPTH};
pub use node::{Node, NodeId, NodeRecord};
pub use render::CARD_SEPARATOR;
