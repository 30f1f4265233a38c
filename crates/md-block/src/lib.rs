//! Reactive markdown elements.
//!
//! A [`MarkdownElement`] holds markdown content and renders it to HTML
//! whenever the content, an observed attribute, or its connection changes.
//! Each render is a [pipeline](pipeline) over shared capabilities from an
//! [`Environment`]:
//!
//! 1. resolve the parser (and sanitizer for `untrusted` elements)
//! 2. parse with the flavor's [`RendererOverrides`](md_renderer::RendererOverrides)
//! 3. sanitize, for `untrusted` elements
//! 4. link footnotes ([`replace_footnotes`])
//! 5. publish, then highlight code blocks if a highlighter is configured
//! 6. publish the [`RenderedStatus`] and send a [`RenderEvent`]
//!
//! Content changes never cancel running pipelines. A pipeline that finds the
//! content replaced after one of its suspension points stops without
//! publishing, so the most recently assigned content always wins.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use md_block::{Environment, Flavor, MarkdownElement};
//! use md_config::Config;
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let env = Arc::new(Environment::from_config(&Config::load(None)?));
//! let element = MarkdownElement::new(Flavor::Block, env).with_markup("# Hello");
//!
//! if let Some(render) = element.connect() {
//!     render.await??;
//! }
//! assert_eq!(element.html(), "<h1 id=\"hello\">Hello</h1>\n");
//! # Ok(())
//! # }
//! ```

mod capabilities;
mod element;
mod error;
mod events;
mod fetch;
mod footnotes;
mod highlight;
pub mod pipeline;
mod sanitize;
mod source;
mod status;

pub use capabilities::{Environment, default_cache};
pub use element::{Flavor, MarkdownElement, RenderHandle};
pub use error::{FetchError, RenderError};
pub use events::RenderEvent;
pub use fetch::{FetchFuture, Fetcher, HttpFetcher};
pub use footnotes::replace_footnotes;
pub use highlight::SyntectHighlighter;
pub use pipeline::{PipelineState, RenderOutcome};
pub use sanitize::AmmoniaSanitizer;
pub use source::{ContentSource, deindent};
pub use status::RenderedStatus;
