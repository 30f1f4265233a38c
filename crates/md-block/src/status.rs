//! Published rendered status.

use std::fmt;

use md_renderer::Provenance;
use serde::Serialize;

/// Status of the last completed render, as published on the element.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RenderedStatus {
    /// Page markup, no `src`.
    Content,
    /// Assigned content, no `src`.
    Property,
    /// Page markup while a `src` is set: the fetch has not replaced it.
    Fallback,
    /// Fetched or assigned content with a `src` set.
    Remote,
}

impl RenderedStatus {
    /// Status for content of `provenance`, given whether a `src` is set.
    #[must_use]
    pub fn new(provenance: Provenance, has_src: bool) -> Self {
        match (provenance, has_src) {
            (Provenance::FromMarkup, false) => Self::Content,
            (Provenance::FromProperty, false) => Self::Property,
            (Provenance::FromMarkup, true) => Self::Fallback,
            (Provenance::FromProperty, true) => Self::Remote,
        }
    }

    /// Attribute value.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Content => "content",
            Self::Property => "property",
            Self::Fallback => "fallback",
            Self::Remote => "remote",
        }
    }
}

impl fmt::Display for RenderedStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
