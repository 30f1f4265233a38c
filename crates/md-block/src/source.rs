//! Element content and its identity.

use std::sync::Arc;

use md_renderer::Provenance;

/// The markdown text of one element.
///
/// Every assignment allocates a fresh `Arc`, and identity is pointer
/// identity: assigning equal text twice still yields two distinct sources.
#[derive(Clone, Debug)]
pub struct ContentSource {
    text: Arc<str>,
    provenance: Provenance,
}

impl ContentSource {
    /// Content taken from the element's own markup.
    ///
    /// The markup is de-indented and `&gt;` is un-escaped so blockquotes
    /// survive the host's entity escaping.
    #[must_use]
    pub fn from_markup(markup: &str) -> Self {
        let text = deindent(markup).replace("&gt;", ">");
        Self {
            text: Arc::from(text),
            provenance: Provenance::FromMarkup,
        }
    }

    /// Content assigned programmatically or fetched from `src`.
    #[must_use]
    pub fn from_property(text: &str) -> Self {
        Self {
            text: Arc::from(text),
            provenance: Provenance::FromProperty,
        }
    }

    /// Markdown text.
    #[must_use]
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Where the text came from.
    #[must_use]
    pub fn provenance(&self) -> Provenance {
        self.provenance
    }

    /// Whether `other` is the very same assignment.
    #[must_use]
    pub fn is_same(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.text, &other.text)
    }
}

/// Remove the indentation of the first indented line from every line.
///
/// Leading blank lines are skipped when looking for the indentation; lines
/// that do not start with it are left alone.
#[must_use]
pub fn deindent(text: &str) -> String {
    let first = text.trim_start_matches(['\r', '\n']);
    let indent_len = first.len() - first.trim_start_matches([' ', '\t']).len();
    if indent_len == 0 {
        return text.to_owned();
    }
    let indent = &first[..indent_len];

    text.split_inclusive('\n')
        .map(|line| line.strip_prefix(indent).unwrap_or(line))
        .collect()
}
