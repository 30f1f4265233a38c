//! Markdown to HTML renderer with per-flavor renderer overrides.
//!
//! This crate provides the parser capability consumed by `md-block` elements:
//! a [`MarkdownParser`] trait and its pulldown-cmark implementation,
//! [`PulldownParser`].
//!
//! # Architecture
//!
//! The renderer walks pulldown-cmark events and writes HTML. Three stages of
//! output can be customized without forking the walker, through a
//! [`RendererOverrides`] table of plain function pointers:
//! - heading construction
//! - code block construction
//! - inline code construction
//!
//! One table exists per element flavor: [`RendererOverrides::INLINE`] only
//! replaces inline code, [`RendererOverrides::BLOCK`] also replaces headings and
//! code blocks. Overrides read per-element state from a [`RenderContext`].
//!
//! # Example
//!
//! ```
//! use md_renderer::{MarkdownParser, PulldownParser, RenderContext, RendererOverrides};
//!
//! let ctx = RenderContext::default();
//! let html = PulldownParser.parse("# Hello\n\n**Bold** text", &RendererOverrides::BLOCK, &ctx);
//! assert!(html.contains(r#"<h1 id="hello">Hello</h1>"#));
//! ```

mod context;
mod overrides;
mod parser;
mod renderer;
mod state;
mod util;

pub use context::{HeadingLinks, Provenance, RenderContext};
pub use overrides::{
    CodeBlock, CodeBlockOverride, CodespanOverride, Heading, HeadingOverride, RendererOverrides,
    effective_heading_level, normalize_code,
};
pub use parser::{MarkdownParser, ParserOptions, PulldownParser};
pub use renderer::MarkdownRenderer;
pub use state::{Slugger, escape_html, slugify};
pub use util::MAX_HEADING_LEVEL;
