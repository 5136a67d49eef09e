//! HTML to Markdown conversion engine.
//!
//! The DOM tree is first converted to a small Markdown AST, then the AST is
//! serialized to text. Keeping the intermediate AST makes the custom block
//! containers (`centered`/`verse` wrappers) and real ordered-list numbering
//! straightforward.

mod ast;
mod convert;
mod options;
mod serialize;

pub use ast::{Block, Inline, ListItem};
pub use convert::convert;
pub use options::{HeadingStyle, Options};
pub use serialize::serialize;

use epubmark_dom::Node;

/// Convert a DOM tree straight to Markdown text.
pub fn render(node: &Node, options: &Options) -> String {
    serialize(&convert(node, options), options)
}
