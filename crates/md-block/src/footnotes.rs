//! Footnote linking over rendered HTML.
//!
//! The parser leaves `[^id]` markers and `[^id]: text` paragraphs as plain
//! text. This pass turns each marker with a matching definition into a
//! numbered superscript link and appends a footnotes section:
//!
//! ```html
//! <p>See note<sup><a class="footnote-ref" href="#footnote-1" id="footnote-1-ref">1</a></sup>.</p>
//!
//! <div class="footnotes">
//!     <hr class="footnote-div">
//!     <p>1. Explanation text.<a class="footnote" href="#footnote-1-ref" id="footnote-1">↩</a></p>
//! </div>
//! ```
//!
//! Numbering follows reference order, one entry per reference occurrence.
//! A symbol defined twice uses its first definition. Definitions nobody
//! references are dropped; references nobody defines stay literal text.

use std::borrow::Cow;
use std::fmt::Write;
use std::sync::LazyLock;

use regex::Regex;

/// `[^id]`. Matches followed by `:` are definitions, not references.
static REFERENCE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\[\^([A-Za-z0-9]+)\]").expect("invalid footnote reference regex")
});

/// A whole paragraph starting with `[^id]:`.
static DEFINITION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"<p>[ \t]*\[\^([A-Za-z0-9]+)\]:.*[ \t\n]*</p>")
        .expect("invalid footnote definition regex")
});

struct Definition<'a> {
    block: &'a str,
    symbol: &'a str,
}

impl Definition<'_> {
    /// Text after the `[^id]:` prefix, without the closing tag.
    fn content(&self) -> &str {
        let after = self
            .block
            .find("]:")
            .map_or(self.block, |pos| &self.block[pos + 2..]);
        after.strip_suffix("</p>").unwrap_or(after).trim()
    }
}

/// Link footnote references to their definitions.
///
/// Returns the input unchanged when no reference has a definition.
#[must_use]
pub fn replace_footnotes(html: &str) -> Cow<'_, str> {
    let references: Vec<&str> = REFERENCE
        .captures_iter(html)
        .filter_map(|caps| {
            let whole = caps.get(0)?;
            if html[whole.end()..].starts_with(':') {
                return None;
            }
            caps.get(1).map(|symbol| symbol.as_str())
        })
        .collect();
    if references.is_empty() {
        return Cow::Borrowed(html);
    }

    let definitions: Vec<Definition<'_>> = DEFINITION
        .captures_iter(html)
        .filter_map(|caps| {
            Some(Definition {
                block: caps.get(0)?.as_str(),
                symbol: caps.get(1)?.as_str(),
            })
        })
        .collect();
    if definitions.is_empty() {
        return Cow::Borrowed(html);
    }

    // First definition wins for every referenced symbol.
    let linked: Vec<(&str, &Definition<'_>)> = references
        .iter()
        .filter_map(|symbol| {
            definitions
                .iter()
                .find(|def| def.symbol == *symbol)
                .map(|def| (*symbol, def))
        })
        .collect();

    tracing::trace!(
        references = references.len(),
        definitions = definitions.len(),
        linked = linked.len(),
        "Scanned footnotes"
    );

    if linked.is_empty() {
        return Cow::Borrowed(html);
    }

    let mut body = html.to_owned();
    for def in &definitions {
        body = body.replacen(def.block, "", 1);
    }

    for (index, (symbol, _)) in linked.iter().enumerate() {
        let n = index + 1;
        let marker = format!("[^{symbol}]");
        let link = format!(
            r##"<sup><a class="footnote-ref" href="#footnote-{n}" id="footnote-{n}-ref">{n}</a></sup>"##
        );
        body = body.replacen(&marker, &link, 1);
    }

    body.push_str("\n<div class=\"footnotes\">\n\t<hr class=\"footnote-div\">");
    for (index, (_, def)) in linked.iter().enumerate() {
        let n = index + 1;
        write!(
            body,
            "\n\t<p>{n}. {content}<a class=\"footnote\" href=\"#footnote-{n}-ref\" id=\"footnote-{n}\">↩</a></p>",
            content = def.content()
        )
        .unwrap();
    }
    body.push_str("\n</div>");

    Cow::Owned(body)
}
