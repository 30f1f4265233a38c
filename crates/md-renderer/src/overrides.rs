//! Renderer override set.
//!
//! A [`RendererOverrides`] table replaces selected stages of HTML output.
//! Tables are built once per element flavor as constants and passed into
//! every parse; they carry no state of their own; per-element state comes
//! in through [`RenderContext`].

use std::borrow::Cow;

use crate::context::{HeadingLinks, Provenance, RenderContext};
use crate::state::Slugger;
use crate::util::MAX_HEADING_LEVEL;

/// A completed heading handed to a heading override.
#[derive(Clone, Copy, Debug)]
pub struct Heading<'a> {
    /// Plain heading text (slug source).
    pub text: &'a str,
    /// Rendered inline HTML of the heading content.
    pub html: &'a str,
    /// Level requested by the source (1-6).
    pub level: u8,
}

/// A completed code block handed to a code block override.
#[derive(Clone, Copy, Debug)]
pub struct CodeBlock<'a> {
    /// Code text, already HTML-escaped once by the renderer.
    pub code: &'a str,
    /// Language from the fence info string.
    pub language: Option<&'a str>,
}

/// Builds a heading element.
pub type HeadingOverride = fn(&Heading<'_>, &RenderContext, &mut Slugger) -> String;

/// Builds a code block element from escaped code.
pub type CodeBlockOverride = fn(&CodeBlock<'_>, &RenderContext) -> String;

/// Builds an inline code element from escaped code.
pub type CodespanOverride = fn(&str, &RenderContext) -> String;

/// Table of parsing-stage hooks.
///
/// `None` entries fall back to the renderer's built-in output.
#[derive(Clone, Copy, Debug, Default)]
pub struct RendererOverrides {
    /// Heading construction.
    pub heading: Option<HeadingOverride>,
    /// Code block construction.
    pub code_block: Option<CodeBlockOverride>,
    /// Inline code construction.
    pub codespan: Option<CodespanOverride>,
}

impl RendererOverrides {
    /// No overrides; built-in output everywhere.
    pub const NONE: Self = Self {
        heading: None,
        code_block: None,
        codespan: None,
    };

    /// Inline flavor: overrides inline code only.
    pub const INLINE: Self = Self {
        codespan: Some(codespan),
        ..Self::NONE
    };

    /// Block flavor: overrides headings and code blocks, inherits the inline
    /// flavor's inline code override.
    pub const BLOCK: Self = Self {
        heading: Some(heading),
        code_block: Some(code_block),
        ..Self::INLINE
    };
}

/// Shift a requested heading level by the heading offset, clamped to h6.
///
/// An offset of 1 leaves levels unchanged.
#[must_use]
pub fn effective_heading_level(requested: u8, offset: u8) -> u8 {
    requested
        .saturating_add(offset.saturating_sub(1))
        .min(MAX_HEADING_LEVEL)
}

/// Normalize already-escaped code text according to its provenance.
///
/// Markup-sourced text was escaped by the host document and escaped again by
/// the renderer, so one level of `&amp;` in front of `lt;`/`gt;` is removed.
/// Property-sourced text gets any raw `<` escaped.
#[must_use]
pub fn normalize_code(code: &str, provenance: Provenance) -> Cow<'_, str> {
    match provenance {
        Provenance::FromMarkup => {
            if code.contains("&amp;") {
                Cow::Owned(code.replace("&amp;lt;", "&lt;").replace("&amp;gt;", "&gt;"))
            } else {
                Cow::Borrowed(code)
            }
        }
        Provenance::FromProperty => {
            if code.contains('<') {
                Cow::Owned(code.replace('<', "&lt;"))
            } else {
                Cow::Borrowed(code)
            }
        }
    }
}

fn heading(heading: &Heading<'_>, ctx: &RenderContext, slugger: &mut Slugger) -> String {
    let level = effective_heading_level(heading.level, ctx.heading_offset);
    let id = slugger.slug(heading.text);

    let content = match &ctx.heading_links {
        HeadingLinks::Disabled => heading.html.to_owned(),
        HeadingLinks::ContentIsLink => {
            format!(r##"<a href="#{id}" class="anchor">{}</a>"##, heading.html)
        }
        HeadingLinks::PrefixedSymbol(symbol) => {
            format!(
                r##"<a href="#{id}" class="anchor">{symbol}{}</a>"##,
                heading.html
            )
        }
    };

    format!(r#"<h{level} id="{id}">{content}</h{level}>"#)
}

fn code_block(block: &CodeBlock<'_>, ctx: &RenderContext) -> String {
    let code = normalize_code(block.code, ctx.provenance);
    match block.language {
        Some(lang) => format!(
            r#"<pre class="{}{lang}"><code>{code}</code></pre>"#,
            ctx.options.lang_prefix
        ),
        None => format!("<pre><code>{code}</code></pre>"),
    }
}

fn codespan(code: &str, ctx: &RenderContext) -> String {
    format!("<code>{}</code>", normalize_code(code, ctx.provenance))
}
