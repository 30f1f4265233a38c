//! Default highlighter capability.

use std::borrow::Cow;

use md_cache::Highlighter;
use regex::{Captures, Regex};
use syntect::html::{ClassStyle, ClassedHTMLGenerator};
use syntect::parsing::SyntaxSet;
use syntect::util::LinesWithEndings;

/// CSS class prefix of highlighted spans (`hl-keyword`, `hl-string`, ...).
const CLASS_PREFIX: &str = "hl-";

/// [`Highlighter`] backed by syntect.
///
/// Rewrites every `<pre class="{prefix}{lang}"><code>` block whose language
/// syntect knows into class-annotated spans. Blocks in unknown languages are
/// left as they are.
pub struct SyntectHighlighter {
    syntax_set: SyntaxSet,
    block: Regex,
}

impl SyntectHighlighter {
    /// Load the default syntax definitions.
    ///
    /// Loading is slow; call this on a blocking thread.
    #[must_use]
    pub fn new(lang_prefix: &str) -> Self {
        let pattern = format!(
            r#"(?s)<pre class="{}([^"\s]+)"><code>(.*?)</code></pre>"#,
            regex::escape(lang_prefix)
        );
        Self {
            syntax_set: SyntaxSet::load_defaults_newlines(),
            block: Regex::new(&pattern).expect("invalid code block regex"),
        }
    }

    fn highlight_block<'c>(&self, caps: &'c Captures<'_>) -> Cow<'c, str> {
        let whole = &caps[0];
        let language = &caps[1];
        let Some(syntax) = self.syntax_set.find_syntax_by_token(language) else {
            return Cow::Borrowed(whole);
        };

        let code = unescape_html(&caps[2]);
        let mut generator = ClassedHTMLGenerator::new_with_class_style(
            syntax,
            &self.syntax_set,
            ClassStyle::SpacedPrefixed {
                prefix: CLASS_PREFIX,
            },
        );
        for line in LinesWithEndings::from(&code) {
            if let Err(e) = generator.parse_html_for_line_which_includes_newline(line) {
                tracing::debug!(language, error = %e, "Highlighting failed");
                return Cow::Borrowed(whole);
            }
        }

        let start = whole.find("><code>").map_or(whole.len(), |pos| pos + 1);
        Cow::Owned(format!(
            "{}<code class=\"highlighted\">{}</code></pre>",
            &whole[..start],
            generator.finalize()
        ))
    }
}

impl Highlighter for SyntectHighlighter {
    fn highlight(&self, root: &mut String) {
        let highlighted = self
            .block
            .replace_all(root, |caps: &Captures<'_>| self.highlight_block(caps).into_owned());
        if let Cow::Owned(html) = highlighted {
            *root = html;
        }
    }
}

/// Reverse the escaping applied to code text.
fn unescape_html(code: &str) -> String {
    code.replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&amp;", "&")
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::sync::LazyLock;

    static HIGHLIGHTER: LazyLock<SyntectHighlighter> =
        LazyLock::new(|| SyntectHighlighter::new("language-"));

    #[test]
    fn test_highlights_known_language() {
        let mut html =
            r#"<pre class="language-rust"><code>fn main() {}</code></pre>"#.to_owned();
        HIGHLIGHTER.highlight(&mut html);

        assert!(html.starts_with(r#"<pre class="language-rust"><code class="highlighted">"#));
        assert!(html.contains(r#"<span class="hl-"#));
        assert!(html.ends_with("</code></pre>"));
    }

    #[test]
    fn test_unknown_language_untouched() {
        let original = r#"<pre class="language-nosuchlang"><code>x</code></pre>"#;
        let mut html = original.to_owned();
        HIGHLIGHTER.highlight(&mut html);
        assert_eq!(html, original);
    }

    #[test]
    fn test_blocks_without_language_untouched() {
        let original = "<pre><code>plain</code></pre>\n<p><code>inline</code></p>";
        let mut html = original.to_owned();
        HIGHLIGHTER.highlight(&mut html);
        assert_eq!(html, original);
    }

    #[test]
    fn test_escaped_code_stays_escaped_once() {
        let mut html =
            r#"<pre class="language-html"><code>&lt;b&gt;bold&lt;/b&gt;</code></pre>"#.to_owned();
        HIGHLIGHTER.highlight(&mut html);
        assert!(html.contains("&lt;"));
        assert!(!html.contains("&amp;lt;"));
        assert!(!html.contains("<b>"));
    }

    #[test]
    fn test_unescape_html() {
        assert_eq!(unescape_html("&lt;a href=&quot;x&quot;&gt;&amp;lt;"), "<a href=\"x\">&lt;");
    }
}
