//! Render state carried between parser events.

use std::collections::HashMap;

use pulldown_cmark::Alignment;

/// Output collected away from the document until its block closes.
pub(crate) enum Capture {
    /// Raw code, escaped once when the block ends.
    Code {
        language: Option<String>,
        source: String,
    },
    /// Heading content. The opening tag needs the id, which needs all the text.
    Heading(HeadingCapture),
}

pub(crate) struct HeadingCapture {
    pub(crate) level: u8,
    /// Plain text, the slug source.
    pub(crate) text: String,
    pub(crate) html: String,
}

impl HeadingCapture {
    pub(crate) fn new(level: u8) -> Self {
        Self {
            level,
            text: String::new(),
            html: String::new(),
        }
    }

    /// Record a piece of heading content as plain text and as markup.
    pub(crate) fn push(&mut self, text: &str, html: &str) {
        self.text.push_str(text);
        self.html.push_str(html);
    }
}

/// Image whose alt text is still being read.
pub(crate) struct PendingImage {
    pub(crate) src: String,
    pub(crate) title: String,
    pub(crate) alt: String,
}

impl PendingImage {
    pub(crate) fn to_html(&self) -> String {
        let mut img = String::from("<img src=\"");
        escape_into(&mut img, &self.src);
        img.push_str("\" alt=\"");
        escape_into(&mut img, &self.alt);
        img.push('"');
        if !self.title.is_empty() {
            img.push_str(" title=\"");
            escape_into(&mut img, &self.title);
            img.push('"');
        }
        img.push('>');
        img
    }
}

/// Position inside a GFM table.
pub(crate) struct Table {
    alignments: Vec<Alignment>,
    column: usize,
    head: bool,
}

impl Table {
    pub(crate) fn new(alignments: Vec<Alignment>) -> Self {
        Self {
            alignments,
            column: 0,
            head: true,
        }
    }

    pub(crate) fn cell_tag(&self) -> &'static str {
        if self.head { "th" } else { "td" }
    }

    pub(crate) fn align_attr(&self) -> &'static str {
        match self.alignments.get(self.column) {
            Some(Alignment::Left) => r#" align="left""#,
            Some(Alignment::Center) => r#" align="center""#,
            Some(Alignment::Right) => r#" align="right""#,
            Some(Alignment::None) | None => "",
        }
    }

    pub(crate) fn end_cell(&mut self) {
        self.column += 1;
    }

    /// Move to the next row; rows after the head are body rows.
    pub(crate) fn end_row(&mut self) {
        self.head = false;
        self.column = 0;
    }
}

/// Generates unique heading ids within one render.
///
/// Repeated slugs get a numeric suffix: `faq`, `faq-1`, `faq-2`. A suffixed
/// slug never collides with a heading whose own text already slugs to it.
#[derive(Debug, Default)]
pub struct Slugger {
    seen: HashMap<String, usize>,
}

impl Slugger {
    /// Create an empty slugger.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Return a unique slug for `text`, remembering it.
    pub fn slug(&mut self, text: &str) -> String {
        let base = slugify(text);
        let mut slug = base.clone();

        if let Some(&count) = self.seen.get(&base) {
            let mut n = count;
            loop {
                n += 1;
                slug = format!("{base}-{n}");
                if !self.seen.contains_key(&slug) {
                    break;
                }
            }
            self.seen.insert(base, n);
        }

        self.seen.insert(slug.clone(), 0);
        slug
    }
}

/// Lowercase words of `text` joined by `-`.
///
/// Words split on whitespace, `-` and `_`; other punctuation is dropped.
#[must_use]
pub fn slugify(text: &str) -> String {
    text.split(|c: char| c.is_whitespace() || c == '-' || c == '_')
        .map(|word| {
            word.chars()
                .filter(|c| c.is_alphanumeric())
                .flat_map(char::to_lowercase)
                .collect::<String>()
        })
        .filter(|word| !word.is_empty())
        .collect::<Vec<_>>()
        .join("-")
}

/// Escape text for HTML content and attribute values.
#[must_use]
pub fn escape_html(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    escape_into(&mut out, s);
    out
}

fn escape_into(out: &mut String, s: &str) {
    for c in s.chars() {
        let entity = match c {
            '&' => "&amp;",
            '<' => "&lt;",
            '>' => "&gt;",
            '"' => "&quot;",
            '\'' => "&#39;",
            _ => {
                out.push(c);
                continue;
            }
        };
        out.push_str(entity);
    }
}
