//! Per-element attribute configuration.

use md_renderer::HeadingLinks;
use url::Url;

/// Attribute observed on a block element.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Attribute {
    /// `src`: remote content location.
    Src,
    /// `hmin`: heading offset.
    Hmin,
    /// `hlinks`: heading anchor mode.
    Hlinks,
    /// `untrusted`: sanitize output. Read once at first connection.
    Untrusted,
}

impl Attribute {
    /// Look up an attribute by its HTML name. Unknown names are not observed.
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "src" => Some(Self::Src),
            "hmin" => Some(Self::Hmin),
            "hlinks" => Some(Self::Hlinks),
            "untrusted" => Some(Self::Untrusted),
            _ => None,
        }
    }

    /// HTML attribute name.
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Self::Src => "src",
            Self::Hmin => "hmin",
            Self::Hlinks => "hlinks",
            Self::Untrusted => "untrusted",
        }
    }
}

/// Effect of an attribute change on the element.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ConfigChange {
    /// Old and new values are equal, or the resolved value did not change.
    Unchanged,
    /// Invalid or immutable value; previous state retained.
    Ignored,
    /// Content must be fetched from this URL.
    Fetch(Url),
    /// Settings changed; the current content must be rendered again.
    Rerender,
}

/// Attribute-driven state of one block element.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ElementConfig {
    /// Resolved `src`, if any was ever accepted.
    pub src: Option<Url>,
    /// Heading offset, at least 1.
    pub hmin: u8,
    /// Heading anchor mode.
    pub hlinks: HeadingLinks,
}

impl Default for ElementConfig {
    fn default() -> Self {
        Self {
            src: None,
            hmin: 1,
            hlinks: HeadingLinks::Disabled,
        }
    }
}

impl ElementConfig {
    /// Apply one attribute change and report what the element must do.
    ///
    /// `src` is resolved against `base`. A removed or unparsable `src` is
    /// ignored and the previous source is kept. `hmin` accepts positive
    /// integers only.
    pub fn apply_change(
        &mut self,
        attribute: Attribute,
        old: Option<&str>,
        new: Option<&str>,
        base: &Url,
    ) -> ConfigChange {
        if old == new {
            return ConfigChange::Unchanged;
        }

        match attribute {
            Attribute::Src => {
                let Some(Ok(url)) = new.map(|value| base.join(value)) else {
                    return ConfigChange::Ignored;
                };
                if self.src.as_ref() == Some(&url) {
                    return ConfigChange::Unchanged;
                }
                self.src = Some(url.clone());
                ConfigChange::Fetch(url)
            }
            Attribute::Hmin => match new.and_then(parse_heading_offset) {
                Some(hmin) => {
                    self.hmin = hmin;
                    ConfigChange::Rerender
                }
                None => ConfigChange::Ignored,
            },
            Attribute::Hlinks => {
                self.hlinks = HeadingLinks::from_attribute(new);
                ConfigChange::Rerender
            }
            Attribute::Untrusted => ConfigChange::Ignored,
        }
    }
}

/// Parse a positive integer heading offset. Values above `u8::MAX` saturate.
fn parse_heading_offset(value: &str) -> Option<u8> {
    let value = value.trim();
    if value.is_empty() || !value.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    let digits = value.trim_start_matches('0');
    if digits.is_empty() {
        return None;
    }
    Some(digits.parse().unwrap_or(u8::MAX))
}
