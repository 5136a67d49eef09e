//! DOM tree to Markdown AST conversion.

use epubmark_dom::Node;
use once_cell::sync::Lazy;
use regex::Regex;

use super::ast::{Block, Inline, ListItem};
use super::options::Options;

/// Convert a DOM tree to a markdown document.
pub fn convert(node: &Node, options: &Options) -> Block {
    Block::Document(convert_children(node, options))
}

/// Convert the children of a block container. Runs of inline content between
/// block elements become implicit paragraphs.
pub fn convert_children(node: &Node, options: &Options) -> Vec<Block> {
    let mut blocks = Vec::new();
    let mut run: Vec<Inline> = Vec::new();

    for child in node.children() {
        if is_block_element(child) {
            flush_run(&mut run, &mut blocks);
            convert_block(child, &mut blocks, options);
        } else {
            collect_inline(child, &mut run);
        }
    }
    flush_run(&mut run, &mut blocks);

    blocks
}

fn flush_run(run: &mut Vec<Inline>, blocks: &mut Vec<Block>) {
    trim_run(run);
    if !run.is_empty() {
        blocks.push(Block::Paragraph(std::mem::take(run)));
    }
}

fn convert_block(node: &Node, blocks: &mut Vec<Block>, options: &Options) {
    let tag = node.tag_name();
    match tag.as_str() {
        "h1" | "h2" | "h3" | "h4" | "h5" | "h6" => {
            let level = tag.as_bytes()[1] - b'0';
            blocks.push(Block::Heading { level, content: collect_inlines(node) });
        }
        "p" => {
            let mut content = collect_inlines(node);
            trim_run(&mut content);
            if !content.is_empty() {
                blocks.push(Block::Paragraph(content));
            }
        }
        "blockquote" => {
            blocks.push(Block::BlockQuote(convert_children(node, options)));
        }
        "ul" | "ol" => {
            let ordered = tag == "ol";
            let start = node
                .attr("start")
                .and_then(|s| s.parse::<u64>().ok())
                .unwrap_or(1);
            let items = node
                .element_children()
                .filter(|child| child.tag_name() == "li")
                .map(|child| ListItem { content: convert_children(child, options) })
                .collect();
            blocks.push(Block::List { ordered, start, items });
        }
        "hr" => blocks.push(Block::ThematicBreak),
        "pre" => {
            // Preformatted content is rare in fiction EPUBs; degrade to a
            // plain paragraph rather than carry code fences around.
            let text = node.text_content();
            if !text.trim().is_empty() {
                blocks.push(Block::Paragraph(vec![Inline::Text(escape_markdown(
                    &collapse_whitespace(&text),
                ))]));
            }
        }
        "div" if node.has_class("centered") || node.has_class("verse") => {
            let class = if node.has_class("centered") { "centered" } else { "verse" };
            blocks.push(Block::Container {
                class: class.to_string(),
                content: convert_children(node, options),
            });
        }
        // Structural wrappers contribute nothing of their own.
        _ => blocks.extend(convert_children(node, options)),
    }
}

/// Collect the inline content of an element.
pub fn collect_inlines(node: &Node) -> Vec<Inline> {
    let mut run = Vec::new();
    for child in node.children() {
        collect_inline(child, &mut run);
    }
    run
}

fn collect_inline(node: &Node, run: &mut Vec<Inline>) {
    if node.is_text() {
        let text = node.node_value.as_deref().unwrap_or("");
        let collapsed = collapse_whitespace(text);
        if !collapsed.is_empty() {
            run.push(Inline::Text(escape_markdown(&collapsed)));
        }
        return;
    }

    match node.tag_name().as_str() {
        "em" | "i" | "cite" | "dfn" => {
            let content = collect_inlines(node);
            if !content.is_empty() {
                run.push(Inline::Emphasis(content));
            }
        }
        "strong" | "b" => {
            let content = collect_inlines(node);
            if !content.is_empty() {
                run.push(Inline::Strong(content));
            }
        }
        "a" => match node.attr("href") {
            Some(href) if !href.is_empty() => {
                run.push(Inline::Link {
                    url: href.to_string(),
                    title: node.attr("title").map(str::to_string),
                    content: collect_inlines(node),
                });
            }
            _ => run.extend(collect_inlines(node)),
        },
        "img" => {
            run.push(Inline::Image {
                url: node.attr("src").unwrap_or("").to_string(),
                alt: node.attr("alt").unwrap_or("").to_string(),
                title: node.attr("title").map(str::to_string),
            });
        }
        "br" => run.push(Inline::LineBreak),
        // Everything else, spans included, passes its content through.
        _ => run.extend(collect_inlines(node)),
    }
}

/// Trim ASCII whitespace from the edges of an inline run. No-break spaces
/// stay put.
fn trim_run(run: &mut Vec<Inline>) {
    while let Some(Inline::Text(text)) = run.first_mut() {
        let trimmed = text.trim_start_matches([' ', '\t']).to_string();
        if trimmed.is_empty() {
            run.remove(0);
        } else {
            *text = trimmed;
            break;
        }
    }
    while let Some(Inline::Text(text)) = run.last_mut() {
        let trimmed = text.trim_end_matches([' ', '\t']).to_string();
        if trimmed.is_empty() {
            run.pop();
        } else {
            *text = trimmed;
            break;
        }
    }
}

fn is_block_element(node: &Node) -> bool {
    if !node.is_element() {
        return false;
    }
    matches!(
        node.tag_name().as_str(),
        "address"
            | "article"
            | "aside"
            | "blockquote"
            | "body"
            | "dd"
            | "div"
            | "dl"
            | "dt"
            | "figcaption"
            | "figure"
            | "footer"
            | "h1"
            | "h2"
            | "h3"
            | "h4"
            | "h5"
            | "h6"
            | "header"
            | "hr"
            | "li"
            | "main"
            | "nav"
            | "ol"
            | "p"
            | "pre"
            | "section"
            | "table"
            | "ul"
    )
}

static ASCII_WHITESPACE: Lazy<Regex> = Lazy::new(|| Regex::new(r"[ \t\r\n]+").unwrap());

/// Collapse runs of ASCII whitespace to single spaces. No-break spaces are
/// deliberately left alone.
pub fn collapse_whitespace(text: &str) -> String {
    ASCII_WHITESPACE.replace_all(text, " ").into_owned()
}

static ESCAPES: Lazy<Vec<(Regex, &str)>> = Lazy::new(|| {
    vec![
        (Regex::new(r"\\").unwrap(), r"\\"),
        (Regex::new(r"\*").unwrap(), r"\*"),
        (Regex::new(r"(?m)^-").unwrap(), r"\-"),
        (Regex::new(r"(?m)^\+ ").unwrap(), r"\+ "),
        (Regex::new(r"(?m)^(=+)").unwrap(), r"\$1"),
        (Regex::new(r"(?m)^(#{1,6}) ").unwrap(), r"\$1 "),
        (Regex::new("`").unwrap(), r"\`"),
        (Regex::new(r"\[").unwrap(), r"\["),
        (Regex::new(r"\]").unwrap(), r"\]"),
        (Regex::new(r"(?m)^>").unwrap(), r"\>"),
        (Regex::new("_").unwrap(), r"\_"),
        (Regex::new(r"(?m)^(\d+)\. ").unwrap(), r"$1\. "),
    ]
});

/// Escape plain text so it cannot be misread as markdown syntax.
pub fn escape_markdown(text: &str) -> String {
    let mut escaped = text.to_string();
    for (pattern, replacement) in ESCAPES.iter() {
        escaped = pattern.replace_all(&escaped, *replacement).into_owned();
    }
    escaped
}
