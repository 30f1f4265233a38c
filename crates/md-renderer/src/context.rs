//! Per-element state visible to renderer overrides.

use crate::parser::ParserOptions;

/// Origin of an element's markdown text.
///
/// Decides how code text is normalized and which rendered status is published.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum Provenance {
    /// Text was taken from the element's own markup, already entity-escaped by the host.
    FromMarkup,
    /// Text was assigned programmatically or fetched from `src`.
    #[default]
    FromProperty,
}

/// How heading anchors are generated.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum HeadingLinks {
    /// No anchors.
    #[default]
    Disabled,
    /// The heading content itself is the link.
    ContentIsLink,
    /// The given symbol markup is placed before the heading content, inside the link.
    PrefixedSymbol(String),
}

impl HeadingLinks {
    /// Map an `hlinks` attribute value to a link mode.
    ///
    /// Absent means disabled, empty means the content is the link, anything
    /// else is used verbatim as the symbol markup.
    #[must_use]
    pub fn from_attribute(value: Option<&str>) -> Self {
        match value {
            None => Self::Disabled,
            Some("") => Self::ContentIsLink,
            Some(symbol) => Self::PrefixedSymbol(symbol.to_owned()),
        }
    }
}

/// Snapshot of element state taken when a render starts.
#[derive(Clone, Debug)]
pub struct RenderContext {
    /// Origin of the text being rendered.
    pub provenance: Provenance,
    /// Heading offset (`hmin`), at least 1.
    pub heading_offset: u8,
    /// Heading anchor mode (`hlinks`).
    pub heading_links: HeadingLinks,
    /// Global parser output options.
    pub options: ParserOptions,
}

impl Default for RenderContext {
    fn default() -> Self {
        Self {
            provenance: Provenance::default(),
            heading_offset: 1,
            heading_links: HeadingLinks::default(),
            options: ParserOptions::default(),
        }
    }
}
