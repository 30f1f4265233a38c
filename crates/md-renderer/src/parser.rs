//! Parser capability.
//!
//! [`MarkdownParser`] is the contract the render pipeline consumes; it is
//! object-safe so the pipeline can hold it as `Arc<dyn MarkdownParser>`.
//! [`PulldownParser`] is the built-in implementation.

use pulldown_cmark::{Options, Parser};

use crate::context::RenderContext;
use crate::overrides::RendererOverrides;
use crate::renderer::MarkdownRenderer;

/// Global output options shared by every parse.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ParserOptions {
    /// GitHub Flavored Markdown: tables, strikethrough, task lists.
    pub gfm: bool,
    /// Typographic punctuation: curly quotes, dashes, ellipses.
    pub smartypants: bool,
    /// Prefix for the language class of code blocks.
    pub lang_prefix: String,
}

impl Default for ParserOptions {
    fn default() -> Self {
        Self {
            gfm: true,
            smartypants: true,
            lang_prefix: "language-".to_owned(),
        }
    }
}

impl ParserOptions {
    /// Get pulldown-cmark options for these settings.
    #[must_use]
    pub fn pulldown_options(&self) -> Options {
        let mut options = Options::empty();
        if self.gfm {
            options |= Options::ENABLE_TABLES
                | Options::ENABLE_STRIKETHROUGH
                | Options::ENABLE_TASKLISTS
                | Options::ENABLE_GFM;
        }
        if self.smartypants {
            options |= Options::ENABLE_SMART_PUNCTUATION;
        }
        options
    }
}

/// Markdown to HTML capability.
///
/// Implementations must be synchronous and pure: the same text, overrides
/// and context always produce the same HTML.
pub trait MarkdownParser: Send + Sync {
    /// Parse block-level markdown into HTML.
    fn parse(&self, markdown: &str, overrides: &RendererOverrides, ctx: &RenderContext) -> String;

    /// Parse markdown as inline content.
    ///
    /// Paragraphs lose their wrappers and are separated by a blank line.
    /// Block syntax such as `# heading` or `- item` stays literal text.
    fn parse_inline(
        &self,
        markdown: &str,
        overrides: &RendererOverrides,
        ctx: &RenderContext,
    ) -> String;
}

/// [`MarkdownParser`] backed by pulldown-cmark.
#[derive(Clone, Copy, Debug, Default)]
pub struct PulldownParser;

impl MarkdownParser for PulldownParser {
    fn parse(&self, markdown: &str, overrides: &RendererOverrides, ctx: &RenderContext) -> String {
        let parser = Parser::new_ext(markdown, ctx.options.pulldown_options());
        MarkdownRenderer::new(overrides, ctx).render(parser)
    }

    fn parse_inline(
        &self,
        markdown: &str,
        overrides: &RendererOverrides,
        ctx: &RenderContext,
    ) -> String {
        let parser = Parser::new_ext(markdown, ctx.options.pulldown_options());
        MarkdownRenderer::new(overrides, ctx).render_inline(markdown, parser.into_offset_iter())
    }
}
