//! Markdown AST serialization.

use super::ast::{Block, Inline, ListItem};
use super::options::{HeadingStyle, Options};

/// Serialize a block tree to markdown text.
pub fn serialize(block: &Block, options: &Options) -> String {
    match block {
        Block::Document(blocks) => join_blocks(blocks, options),
        Block::Heading { level, content } => serialize_heading(*level, content, options),
        Block::Paragraph(inlines) => serialize_inlines(inlines, options),
        Block::BlockQuote(blocks) => {
            let inner = join_blocks(blocks, options);
            inner
                .lines()
                .map(|line| {
                    if line.is_empty() {
                        ">".to_string()
                    } else {
                        format!("> {}", line)
                    }
                })
                .collect::<Vec<_>>()
                .join("\n")
        }
        Block::List { ordered, start, items } => serialize_list(*ordered, *start, items, options),
        Block::ThematicBreak => options.hr.clone(),
        Block::Container { class, content } => {
            let inner = join_blocks(content, options);
            format!("<div class=\"{}\">\n\n{}\n\n</div>", class, inner)
        }
    }
}

fn join_blocks(blocks: &[Block], options: &Options) -> String {
    // Whitespace-only output stays in: a paragraph holding a lone line break
    // serializes to a whitespace line, which downstream section splitting
    // reads as a scene break marker.
    blocks
        .iter()
        .map(|block| serialize(block, options))
        .filter(|text| !text.is_empty())
        .collect::<Vec<_>>()
        .join("\n\n")
}

fn serialize_heading(level: u8, content: &[Inline], options: &Options) -> String {
    let text = serialize_inlines(content, options);

    if options.heading_style == HeadingStyle::Setext && level < 3 {
        let underline = if level == 1 { '=' } else { '-' };
        let width = text.chars().count().max(1);
        return format!("{}\n{}", text, underline.to_string().repeat(width));
    }

    format!("{} {}", "#".repeat(level.clamp(1, 6) as usize), text)
}

fn serialize_list(ordered: bool, start: u64, items: &[ListItem], options: &Options) -> String {
    let mut out = Vec::with_capacity(items.len());

    for (i, item) in items.iter().enumerate() {
        let prefix = if ordered {
            format!("{}. ", start + i as u64)
        } else {
            format!("{} ", options.bullet_list_marker)
        };
        let indent = " ".repeat(prefix.chars().count());

        let body = join_blocks(&item.content, options);
        let mut lines = body.lines();
        let mut rendered = format!("{}{}", prefix, lines.next().unwrap_or(""));
        for line in lines {
            rendered.push('\n');
            if !line.is_empty() {
                rendered.push_str(&indent);
            }
            rendered.push_str(line);
        }
        out.push(rendered);
    }

    out.join("\n")
}

/// Serialize inline content to a single line of markdown.
pub fn serialize_inlines(inlines: &[Inline], options: &Options) -> String {
    let mut out = String::new();
    for inline in inlines {
        out.push_str(&serialize_inline(inline, options));
    }
    out
}

fn serialize_inline(inline: &Inline, options: &Options) -> String {
    match inline {
        Inline::Text(text) => text.clone(),
        Inline::Emphasis(content) => delimit(content, &options.em_delimiter, options),
        Inline::Strong(content) => delimit(content, &options.strong_delimiter, options),
        Inline::Link { url, title, content } => {
            let text = serialize_inlines(content, options);
            match title {
                Some(title) => format!("[{}]({} \"{}\")", text, url, title),
                None => format!("[{}]({})", text, url),
            }
        }
        Inline::Image { url, alt, title } => match title {
            Some(title) => format!("![{}]({} \"{}\")", alt, url, title),
            None => format!("![{}]({})", alt, url),
        },
        Inline::LineBreak => "  \n".to_string(),
    }
}

/// Wrap inline content in a delimiter, keeping surrounding whitespace outside
/// the markers so the output stays valid markdown.
fn delimit(content: &[Inline], delimiter: &str, options: &Options) -> String {
    let text = serialize_inlines(content, options);
    if text.trim().is_empty() {
        return text;
    }

    let leading: String = text.chars().take_while(|c| c.is_whitespace()).collect();
    let trailing: String = text
        .chars()
        .rev()
        .take_while(|c| c.is_whitespace())
        .collect();
    let core = text.trim();

    format!("{}{}{}{}{}", leading, delimiter, core, delimiter, trailing)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn text(s: &str) -> Inline {
        Inline::Text(s.to_string())
    }

    #[test]
    fn test_atx_heading() {
        let block = Block::Heading {
            level: 2,
            content: vec![text("Chapter One")],
        };
        assert_eq!(serialize(&block, &Options::default()), "## Chapter One");
    }

    #[test]
    fn test_setext_heading() {
        let options = Options {
            heading_style: HeadingStyle::Setext,
            ..Options::default()
        };
        let block = Block::Heading {
            level: 1,
            content: vec![text("Title")],
        };
        assert_eq!(serialize(&block, &options), "Title\n=====");
    }

    #[test]
    fn test_blockquote() {
        let block = Block::BlockQuote(vec![
            Block::Paragraph(vec![text("one")]),
            Block::Paragraph(vec![text("two")]),
        ]);
        assert_eq!(serialize(&block, &Options::default()), "> one\n>\n> two");
    }

    #[test]
    fn test_ordered_list_numbering() {
        let items = vec![
            ListItem { content: vec![Block::Paragraph(vec![text("a")])] },
            ListItem { content: vec![Block::Paragraph(vec![text("b")])] },
            ListItem { content: vec![Block::Paragraph(vec![text("c")])] },
        ];
        let block = Block::List { ordered: true, start: 3, items };
        assert_eq!(serialize(&block, &Options::default()), "3. a\n4. b\n5. c");
    }

    #[test]
    fn test_thematic_break() {
        assert_eq!(serialize(&Block::ThematicBreak, &Options::default()), "* * *");
    }

    #[test]
    fn test_container_keeps_html_wrapper() {
        let block = Block::Container {
            class: "centered".to_string(),
            content: vec![Block::Paragraph(vec![text("middle")])],
        };
        assert_eq!(
            serialize(&block, &Options::default()),
            "<div class=\"centered\">\n\nmiddle\n\n</div>"
        );
    }

    #[test]
    fn test_emphasis_keeps_whitespace_outside() {
        let inline = Inline::Emphasis(vec![text(" word ")]);
        assert_eq!(
            serialize_inline(&inline, &Options::default()),
            " _word_ "
        );
    }

    #[test]
    fn test_empty_emphasis_dropped() {
        let inline = Inline::Strong(vec![text("  ")]);
        assert_eq!(serialize_inline(&inline, &Options::default()), "  ");
    }
}
