//! Structural DOM rewrite driven by role selectors.
//!
//! The pass order is load-bearing. Removal runs before everything so later
//! steps never touch doomed content; title and subtitle extraction run before
//! retagging so the title paragraph is not turned into a heading first;
//! em/strong wrapping runs before centered/verse wrapping because verse
//! blocks commonly contain italic lines.

use epubmark_dom::Node;

use crate::params::ElementRoleConfig;
use crate::selector::ClassSelector;

/// Compiled selectors for every element role.
#[derive(Debug, Clone, Default)]
pub struct RoleSelectors {
    pub title: Option<ClassSelector>,
    pub subtitle: Option<ClassSelector>,
    pub h2: Option<ClassSelector>,
    pub h3: Option<ClassSelector>,
    pub h4: Option<ClassSelector>,
    pub hr: Option<ClassSelector>,
    pub hr_before: Option<ClassSelector>,
    pub hr_after: Option<ClassSelector>,
    pub br: Option<ClassSelector>,
    pub br_before: Option<ClassSelector>,
    pub br_after: Option<ClassSelector>,
    pub blockquote: Option<ClassSelector>,
    pub figure: Option<ClassSelector>,
    pub centered: Option<ClassSelector>,
    pub verse: Option<ClassSelector>,
    pub em: Option<ClassSelector>,
    pub strong: Option<ClassSelector>,
    pub remove: Option<ClassSelector>,
    pub ignore: Option<ClassSelector>,
}

impl RoleSelectors {
    /// Compile every role pattern against the discovered class inventory.
    pub fn compile(config: &ElementRoleConfig, document_classes: &[String]) -> RoleSelectors {
        let compile = |pattern: &str| ClassSelector::compile(pattern, document_classes);
        RoleSelectors {
            title: compile(&config.title),
            subtitle: compile(&config.subtitle),
            h2: compile(&config.h2),
            h3: compile(&config.h3),
            h4: compile(&config.h4),
            hr: compile(&config.hr),
            hr_before: compile(&config.hr_before),
            hr_after: compile(&config.hr_after),
            br: compile(&config.br),
            br_before: compile(&config.br_before),
            br_after: compile(&config.br_after),
            blockquote: compile(&config.blockquote),
            figure: compile(&config.figure),
            centered: compile(&config.centered),
            verse: compile(&config.verse),
            em: compile(&config.em),
            strong: compile(&config.strong),
            remove: compile(&config.remove),
            ignore: compile(&config.ignore),
        }
    }

    /// Classes claimed by any role, `ignore` included. What is left over is
    /// worth surfacing to the operator.
    pub fn claimed_classes(&self) -> Vec<String> {
        let all = [
            &self.title,
            &self.subtitle,
            &self.h2,
            &self.h3,
            &self.h4,
            &self.hr,
            &self.hr_before,
            &self.hr_after,
            &self.br,
            &self.br_before,
            &self.br_after,
            &self.blockquote,
            &self.figure,
            &self.centered,
            &self.verse,
            &self.em,
            &self.strong,
            &self.remove,
            &self.ignore,
        ];
        let mut classes: Vec<String> = all
            .iter()
            .filter_map(|selector| selector.as_ref())
            .flat_map(|selector| selector.classes().iter().cloned())
            .collect();
        classes.sort();
        classes.dedup();
        classes
    }
}

/// Title and subtitle pulled out of a chapter during rewrite.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ChapterTitles {
    pub title: Option<String>,
    pub subtitle: Option<String>,
}

/// Rewrite a chapter body in place, returning any extracted titles.
pub fn rewrite_chapter(body: &mut Node, selectors: &RoleSelectors) -> ChapterTitles {
    if let Some(remove) = &selectors.remove {
        body.remove_matching(&|n: &Node| remove.matches(n));
    }

    let titles = ChapterTitles {
        title: extract_text(body, &selectors.title),
        subtitle: extract_text(body, &selectors.subtitle),
    };

    let retags = [
        (&selectors.h2, "h2"),
        (&selectors.h3, "h3"),
        (&selectors.h4, "h4"),
        (&selectors.hr, "hr"),
        (&selectors.br, "br"),
        (&selectors.blockquote, "blockquote"),
        (&selectors.figure, "figure"),
    ];
    for (selector, tag) in retags {
        if let Some(selector) = selector {
            body.retag_matching(&|n: &Node| selector.matches(n), tag);
        }
    }

    for (selector, tag) in [(&selectors.em, "em"), (&selectors.strong, "strong")] {
        if let Some(selector) = selector {
            body.wrap_inner_matching(&|n: &Node| selector.matches(n), tag);
        }
    }

    for (selector, class) in [(&selectors.centered, "centered"), (&selectors.verse, "verse")] {
        if let Some(selector) = selector {
            body.wrap_matching(&|n: &Node| selector.matches(n), &|| {
                Node::element_with_attrs("div", vec![("class", class)])
            });
        }
    }

    for (selector, before) in [(&selectors.br_before, true), (&selectors.br_after, false)] {
        if let Some(selector) = selector {
            body.insert_adjacent_matching(&|n: &Node| selector.matches(n), "br", before);
        }
    }
    for (selector, before) in [(&selectors.hr_before, true), (&selectors.hr_after, false)] {
        if let Some(selector) = selector {
            body.insert_adjacent_matching(&|n: &Node| selector.matches(n), "hr", before);
        }
    }

    titles
}

/// Detach the first match and return its text, newlines collapsed to spaces.
fn extract_text(body: &mut Node, selector: &Option<ClassSelector>) -> Option<String> {
    let selector = selector.as_ref()?;
    let element = body.take_first(&|n: &Node| selector.matches(n))?;
    Some(clean_title(&element.text_content()))
}

/// Peek at the text of the first match without mutating anything. Used for
/// chapter title suggestions during analysis.
pub fn suggest_text(body: &Node, selector: &Option<ClassSelector>) -> Option<String> {
    let selector = selector.as_ref()?;
    let element = body.find_first(&|n: &Node| selector.matches(n))?;
    Some(clean_title(&element.text_content()))
}

fn clean_title(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}
