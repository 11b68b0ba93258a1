//! SVG template documents
//!
//! The template is parsed once into an owned element tree, nodes are picked
//! out with ElementTree-style path expressions, and their `style` attributes
//! are rewritten per color combination before the tree is serialized again.

pub mod mutate;
pub mod path;
pub mod tree;

pub use mutate::{apply_color, set_style, MutateError};
pub use path::{ElementPath, PathError};
pub use tree::{Document, Element, Node, TreeError};
