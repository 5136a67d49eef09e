//! Serialization options.

/// Heading output style.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HeadingStyle {
    /// `# Heading`
    Atx,
    /// Underlined with `===` / `---` for levels 1 and 2.
    Setext,
}

/// Options controlling markdown output.
#[derive(Debug, Clone)]
pub struct Options {
    pub heading_style: HeadingStyle,
    /// Thematic break marker.
    pub hr: String,
    /// Unordered list item marker.
    pub bullet_list_marker: char,
    pub em_delimiter: String,
    pub strong_delimiter: String,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            heading_style: HeadingStyle::Atx,
            hr: "* * *".to_string(),
            bullet_list_marker: '*',
            em_delimiter: "_".to_string(),
            strong_delimiter: "**".to_string(),
        }
    }
}
