//! # epubmark-dom
//!
//! An owned, mutable DOM tree for EPUB chapter HTML.
//!
//! EPUB chapters arrive as XHTML text. The conversion pipeline needs to edit
//! the document structurally (remove elements, retag paragraphs to headings,
//! wrap content) before it is rendered to Markdown, so this crate keeps the
//! whole tree as plain owned data instead of borrowing from a parser arena.
//!
//! ## Example
//!
//! ```rust
//! use epubmark_dom::{parse_chapter, Node};
//!
//! let mut body = parse_chapter("<p class=\"x\">Hello</p>");
//! body.retag_matching(&|n: &Node| n.has_class("x"), "h2");
//! assert_eq!(body.inner_html(), "<h2>Hello</h2>");
//! ```

mod node;
mod parse;

pub use node::{Node, NodeType};
pub use parse::{collect_classes, parse_chapter};
