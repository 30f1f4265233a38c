//! Capability contracts and the values the cache stores.

use std::fmt;
use std::sync::Arc;

use md_renderer::MarkdownParser;

/// Name a capability is registered and resolved under.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum CapabilityName {
    /// Markdown parser.
    Parser,
    /// HTML sanitizer.
    Sanitizer,
    /// Syntax highlighter.
    Highlighter,
}

impl CapabilityName {
    /// Stable lowercase name used in logs.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Parser => "parser",
            Self::Sanitizer => "sanitizer",
            Self::Highlighter => "highlighter",
        }
    }
}

impl fmt::Display for CapabilityName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// HTML sanitization capability.
pub trait Sanitizer: Send + Sync {
    /// Return `html` with unsafe markup removed.
    fn sanitize(&self, html: &str) -> String;
}

/// Syntax highlighting capability.
///
/// Runs over already-published HTML and rewrites code blocks in place.
pub trait Highlighter: Send + Sync {
    /// Highlight every code block under `root`.
    fn highlight(&self, root: &mut String);
}

/// A resolved capability.
#[derive(Clone)]
pub enum Capability {
    Parser(Arc<dyn MarkdownParser>),
    Sanitizer(Arc<dyn Sanitizer>),
    Highlighter(Arc<dyn Highlighter>),
}

impl Capability {
    /// Name of the capability this value provides.
    #[must_use]
    pub fn name(&self) -> CapabilityName {
        match self {
            Self::Parser(_) => CapabilityName::Parser,
            Self::Sanitizer(_) => CapabilityName::Sanitizer,
            Self::Highlighter(_) => CapabilityName::Highlighter,
        }
    }
}

impl fmt::Debug for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Capability").field(&self.name()).finish()
    }
}

/// Capability acquisition error.
///
/// Cloneable because one failed acquisition is handed to every waiter.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum AcquireError {
    /// No loader was registered for the capability.
    #[error("capability {0} is not configured")]
    NotConfigured(CapabilityName),

    /// The loader failed.
    #[error("failed to acquire {capability}: {message}")]
    Failed {
        capability: CapabilityName,
        message: String,
    },

    /// The loader produced a capability of another kind.
    #[error("loader for {expected} produced {found}")]
    WrongKind {
        expected: CapabilityName,
        found: CapabilityName,
    },
}

impl AcquireError {
    /// Build a [`AcquireError::Failed`] from any displayable error.
    pub fn failed(capability: CapabilityName, error: impl fmt::Display) -> Self {
        Self::Failed {
            capability,
            message: error.to_string(),
        }
    }
}
