//! Default sanitizer capability.

use std::borrow::Cow;

use md_cache::Sanitizer;

/// [`Sanitizer`] backed by ammonia.
///
/// On top of ammonia's defaults it keeps `id` and `class` everywhere, so
/// heading anchors and code block languages survive, and keeps task list
/// checkboxes.
pub struct AmmoniaSanitizer {
    builder: ammonia::Builder<'static>,
}

impl AmmoniaSanitizer {
    /// Create the sanitizer.
    #[must_use]
    pub fn new() -> Self {
        let mut builder = ammonia::Builder::default();
        builder
            .add_generic_attributes(["id", "class"])
            .add_tags(["input"])
            .add_tag_attributes("input", ["type", "checked", "disabled"])
            .attribute_filter(|element, attribute, value| match (element, attribute) {
                ("input", "type") if value != "checkbox" => None,
                _ => Some(Cow::Borrowed(value)),
            });
        Self { builder }
    }
}

impl Default for AmmoniaSanitizer {
    fn default() -> Self {
        Self::new()
    }
}

impl Sanitizer for AmmoniaSanitizer {
    fn sanitize(&self, html: &str) -> String {
        self.builder.clean(html).to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_removes_scripts() {
        let html = AmmoniaSanitizer::new().sanitize("<p>Hi</p><script>alert(1)</script>");
        assert_eq!(html, "<p>Hi</p>");
    }

    #[test]
    fn test_removes_event_handlers() {
        let html = AmmoniaSanitizer::new().sanitize(r#"<p onclick="steal()">Hi</p>"#);
        assert_eq!(html, "<p>Hi</p>");
    }

    #[test]
    fn test_keeps_heading_ids() {
        let html = AmmoniaSanitizer::new().sanitize(r#"<h2 id="setup">Setup</h2>"#);
        assert_eq!(html, r#"<h2 id="setup">Setup</h2>"#);
    }

    #[test]
    fn test_keeps_code_language_class() {
        let html = AmmoniaSanitizer::new()
            .sanitize(r#"<pre class="language-rust"><code>fn main() {}</code></pre>"#);
        assert_eq!(
            html,
            r#"<pre class="language-rust"><code>fn main() {}</code></pre>"#
        );
    }

    #[test]
    fn test_keeps_footnote_syntax_text() {
        let html = AmmoniaSanitizer::new().sanitize("<p>[^a]: Note.</p>");
        assert_eq!(html, "<p>[^a]: Note.</p>");
    }

    #[test]
    fn test_task_list_checkbox_only() {
        let sanitizer = AmmoniaSanitizer::new();
        let checkbox = sanitizer.sanitize(r#"<input type="checkbox" checked="" disabled="">"#);
        assert!(checkbox.contains(r#"type="checkbox""#));
        let text_input = sanitizer.sanitize(r#"<input type="text">"#);
        assert!(!text_input.contains("type="));
    }
}
