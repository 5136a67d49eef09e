//! Markdown abstract syntax tree.

/// Block-level markdown content.
#[derive(Debug, Clone, PartialEq)]
pub enum Block {
    /// Top level container for a chapter.
    Document(Vec<Block>),
    /// Heading with level 1-6.
    Heading { level: u8, content: Vec<Inline> },
    Paragraph(Vec<Inline>),
    BlockQuote(Vec<Block>),
    List {
        ordered: bool,
        start: u64,
        items: Vec<ListItem>,
    },
    ThematicBreak,
    /// A block wrapper serialized as a raw `<div class="...">` with markdown
    /// inside. Used for centered and verse passages which plain markdown
    /// cannot express.
    Container { class: String, content: Vec<Block> },
}

/// A single list item, holding block content.
#[derive(Debug, Clone, PartialEq)]
pub struct ListItem {
    pub content: Vec<Block>,
}

/// Inline markdown content.
#[derive(Debug, Clone, PartialEq)]
pub enum Inline {
    Text(String),
    Emphasis(Vec<Inline>),
    Strong(Vec<Inline>),
    Link { url: String, title: Option<String>, content: Vec<Inline> },
    Image { url: String, alt: String, title: Option<String> },
    LineBreak,
}
