//! Markdown event walker producing HTML.

use std::fmt::Write;
use std::ops::Range;

use pulldown_cmark::{CodeBlockKind, Event, Tag, TagEnd};

use crate::context::RenderContext;
use crate::overrides::{CodeBlock, Heading, RendererOverrides};
use crate::state::{Capture, HeadingCapture, PendingImage, Slugger, Table, escape_html};
use crate::util::heading_level_to_num;

/// Markdown renderer with pluggable output overrides.
///
/// Handles common elements (tables, lists, inline formatting) itself and
/// delegates headings, code blocks and inline code to the
/// [`RendererOverrides`] table when the matching entry is set.
pub struct MarkdownRenderer<'a> {
    overrides: &'a RendererOverrides,
    ctx: &'a RenderContext,
    inline: bool,
    output: String,
    capture: Option<Capture>,
    image: Option<PendingImage>,
    table: Option<Table>,
    slugger: Slugger,
}

impl<'a> MarkdownRenderer<'a> {
    /// Create a new block renderer.
    #[must_use]
    pub fn new(overrides: &'a RendererOverrides, ctx: &'a RenderContext) -> Self {
        Self {
            overrides,
            ctx,
            inline: false,
            output: String::with_capacity(4096),
            capture: None,
            image: None,
            table: None,
            slugger: Slugger::new(),
        }
    }

    /// Render markdown events and return the HTML.
    pub fn render<'e, I>(mut self, events: I) -> String
    where
        I: Iterator<Item = Event<'e>>,
    {
        for event in events {
            self.process_event(event);
        }
        self.output
    }

    /// Render `source` as inline content from its offset events.
    ///
    /// Paragraphs lose their wrappers and are separated by a blank line.
    /// Other blocks (headings, lists, quotes, code, tables) are not built:
    /// their markers stay as literal text around formatted inline content,
    /// so `# *Title*` renders as `# <em>Title</em>`.
    pub fn render_inline<'e, I>(mut self, source: &str, events: I) -> String
    where
        I: Iterator<Item = (Event<'e>, Range<usize>)>,
    {
        self.inline = true;
        let mut blocks = 0usize;
        let mut depth = 0usize;
        let mut literal = false;
        // Source offset up to which a literal block has been written. None
        // right after an inline opening tag, whose delimiter is not text.
        let mut cursor: Option<usize> = None;

        for (event, range) in events {
            match &event {
                Event::Start(tag) if is_block(tag) => {
                    if depth == 0 {
                        if blocks > 0 {
                            self.output.push_str("\n\n");
                        }
                        blocks += 1;
                        literal = !matches!(tag, Tag::Paragraph | Tag::HtmlBlock);
                        cursor = Some(range.start);
                    }
                    depth += 1;
                    if !literal {
                        self.process_event(event);
                    }
                }
                Event::End(tag) if is_block_end(*tag) => {
                    depth = depth.saturating_sub(1);
                    if !literal {
                        self.process_event(event);
                    } else if depth == 0 {
                        let end = source[..range.end].trim_end().len();
                        self.literal_source(source, cursor, end);
                    }
                }
                Event::Rule if depth == 0 => {
                    if blocks > 0 {
                        self.output.push_str("\n\n");
                    }
                    blocks += 1;
                    self.output.push_str(&escape_html(source[range].trim_end()));
                }
                _ if literal => {
                    let opens = matches!(event, Event::Start(_));
                    match event {
                        Event::End(_) => self.process_event(event),
                        Event::Rule => self.literal_source(source, cursor, range.end),
                        _ => {
                            self.literal_source(source, cursor, range.start);
                            self.process_event(event);
                        }
                    }
                    cursor = if opens { None } else { Some(range.end) };
                }
                _ => self.process_event(event),
            }
        }
        self.output
    }

    fn literal_source(&mut self, source: &str, cursor: Option<usize>, end: usize) {
        if let Some(text) = cursor.and_then(|start| source.get(start..end)) {
            self.output.push_str(&escape_html(text));
        }
    }

    /// Push markup to the output, or to the heading being captured.
    fn push_inline(&mut self, content: &str) {
        if self.image.is_some() {
            // Alt text is plain.
            return;
        }
        match &mut self.capture {
            Some(Capture::Heading(heading)) => heading.html.push_str(content),
            _ => self.output.push_str(content),
        }
    }

    fn process_event(&mut self, event: Event<'_>) {
        match event {
            Event::Start(tag) => self.start_tag(tag),
            Event::End(tag) => self.end_tag(tag),
            Event::Text(text) => self.text(&text),
            Event::Code(code) => self.inline_code(&code),
            Event::Html(html) | Event::InlineHtml(html) => self.push_inline(&html),
            Event::SoftBreak => self.soft_break(),
            Event::HardBreak => self.push_inline("<br>"),
            Event::Rule => self.output.push_str("<hr>\n"),
            Event::TaskListMarker(checked) => self.task_list_marker(checked),
            Event::FootnoteReference(_) | Event::InlineMath(_) | Event::DisplayMath(_) => {
                // Not enabled in parser options
            }
        }
    }

    fn start_tag(&mut self, tag: Tag<'_>) {
        match tag {
            Tag::Paragraph => {
                if !self.inline {
                    self.output.push_str("<p>");
                }
            }
            Tag::Heading { level, .. } => {
                // Opening tag is written in end_tag once the id is known.
                let capture = HeadingCapture::new(heading_level_to_num(level));
                self.capture = Some(Capture::Heading(capture));
            }
            Tag::BlockQuote(_) => self.output.push_str("<blockquote>\n"),
            Tag::CodeBlock(kind) => {
                let language = match kind {
                    CodeBlockKind::Fenced(ref info) => info
                        .split_whitespace()
                        .next()
                        .map(ToOwned::to_owned),
                    CodeBlockKind::Indented => None,
                };
                self.capture = Some(Capture::Code {
                    language,
                    source: String::new(),
                });
            }
            Tag::List(start) => match start {
                Some(1) => self.output.push_str("<ol>\n"),
                Some(n) => write!(self.output, "<ol start=\"{n}\">\n").unwrap(),
                None => self.output.push_str("<ul>\n"),
            },
            Tag::Item => self.output.push_str("<li>"),
            Tag::FootnoteDefinition(_) | Tag::HtmlBlock | Tag::MetadataBlock(_) => {}
            Tag::DefinitionList => self.output.push_str("<dl>\n"),
            Tag::DefinitionListTitle => self.output.push_str("<dt>"),
            Tag::DefinitionListDefinition => self.output.push_str("<dd>"),
            Tag::Table(alignments) => {
                self.table = Some(Table::new(alignments));
                self.output.push_str("<table>\n");
            }
            Tag::TableHead => self.output.push_str("<thead>\n<tr>"),
            Tag::TableRow => self.output.push_str("<tr>"),
            Tag::TableCell => {
                if let Some(table) = &self.table {
                    let (tag, align) = (table.cell_tag(), table.align_attr());
                    write!(self.output, "<{tag}{align}>").unwrap();
                }
            }
            Tag::Emphasis => self.push_inline("<em>"),
            Tag::Strong => self.push_inline("<strong>"),
            Tag::Strikethrough => self.push_inline("<del>"),
            Tag::Superscript => self.push_inline("<sup>"),
            Tag::Subscript => self.push_inline("<sub>"),
            Tag::Link {
                dest_url, title, ..
            } => {
                let link_tag = if title.is_empty() {
                    format!(r#"<a href="{}">"#, escape_html(&dest_url))
                } else {
                    format!(
                        r#"<a href="{}" title="{}">"#,
                        escape_html(&dest_url),
                        escape_html(&title)
                    )
                };
                self.push_inline(&link_tag);
            }
            Tag::Image {
                dest_url, title, ..
            } => {
                self.image = Some(PendingImage {
                    src: dest_url.into_string(),
                    title: title.into_string(),
                    alt: String::new(),
                });
            }
        }
    }

    fn end_tag(&mut self, tag: TagEnd) {
        match tag {
            TagEnd::Paragraph => {
                if !self.inline {
                    self.output.push_str("</p>\n");
                }
            }
            TagEnd::Heading(_) => self.end_heading(),
            TagEnd::BlockQuote(_) => self.output.push_str("</blockquote>\n"),
            TagEnd::CodeBlock => self.end_code_block(),
            TagEnd::List(ordered) => {
                self.output
                    .push_str(if ordered { "</ol>\n" } else { "</ul>\n" });
            }
            TagEnd::Item => self.output.push_str("</li>\n"),
            TagEnd::FootnoteDefinition | TagEnd::HtmlBlock | TagEnd::MetadataBlock(_) => {}
            TagEnd::DefinitionList => self.output.push_str("</dl>\n"),
            TagEnd::DefinitionListTitle => self.output.push_str("</dt>\n"),
            TagEnd::DefinitionListDefinition => self.output.push_str("</dd>\n"),
            TagEnd::Table => {
                self.table = None;
                self.output.push_str("</tbody>\n</table>\n");
            }
            TagEnd::TableHead | TagEnd::TableRow => {
                self.output.push_str(if tag == TagEnd::TableHead {
                    "</tr>\n</thead>\n<tbody>\n"
                } else {
                    "</tr>\n"
                });
                if let Some(table) = &mut self.table {
                    table.end_row();
                }
            }
            TagEnd::TableCell => {
                if let Some(table) = &mut self.table {
                    write!(self.output, "</{}>", table.cell_tag()).unwrap();
                    table.end_cell();
                }
            }
            TagEnd::Emphasis => self.push_inline("</em>"),
            TagEnd::Strong => self.push_inline("</strong>"),
            TagEnd::Strikethrough => self.push_inline("</del>"),
            TagEnd::Superscript => self.push_inline("</sup>"),
            TagEnd::Subscript => self.push_inline("</sub>"),
            TagEnd::Link => self.push_inline("</a>"),
            TagEnd::Image => {
                if let Some(image) = self.image.take() {
                    self.push_inline(&image.to_html());
                }
            }
        }
    }

    fn end_heading(&mut self) {
        let Some(Capture::Heading(captured)) = self.capture.take() else {
            return;
        };
        let heading = Heading {
            text: captured.text.trim(),
            html: captured.html.trim(),
            level: captured.level,
        };

        let rendered = match self.overrides.heading {
            Some(hook) => hook(&heading, self.ctx, &mut self.slugger),
            None => {
                let id = self.slugger.slug(heading.text);
                let level = heading.level;
                format!(r#"<h{level} id="{id}">{}</h{level}>"#, heading.html)
            }
        };
        self.output.push_str(&rendered);
        self.output.push('\n');
    }

    fn end_code_block(&mut self) {
        let Some(Capture::Code { language, source }) = self.capture.take() else {
            return;
        };
        let escaped = escape_html(&source);
        let block = CodeBlock {
            code: &escaped,
            language: language.as_deref(),
        };

        let rendered = match self.overrides.code_block {
            Some(hook) => hook(&block, self.ctx),
            None => match block.language {
                Some(lang) => format!(
                    r#"<pre><code class="{}{}">{escaped}</code></pre>"#,
                    self.ctx.options.lang_prefix,
                    escape_html(lang)
                ),
                None => format!("<pre><code>{escaped}</code></pre>"),
            },
        };
        self.output.push_str(&rendered);
        self.output.push('\n');
    }

    fn text(&mut self, text: &str) {
        if let Some(image) = &mut self.image {
            image.alt.push_str(text);
            return;
        }
        match &mut self.capture {
            Some(Capture::Code { source, .. }) => source.push_str(text),
            Some(Capture::Heading(heading)) => heading.push(text, &escape_html(text)),
            None => self.output.push_str(&escape_html(text)),
        }
    }

    fn inline_code(&mut self, code: &str) {
        if let Some(image) = &mut self.image {
            image.alt.push_str(code);
            return;
        }
        let escaped = escape_html(code);
        let rendered = match self.overrides.codespan {
            Some(hook) => hook(&escaped, self.ctx),
            None => format!("<code>{escaped}</code>"),
        };
        match &mut self.capture {
            Some(Capture::Heading(heading)) => heading.push(code, &rendered),
            _ => self.output.push_str(&rendered),
        }
    }

    fn soft_break(&mut self) {
        if let Some(image) = &mut self.image {
            image.alt.push(' ');
            return;
        }
        match &mut self.capture {
            Some(Capture::Code { source, .. }) => source.push('\n'),
            Some(Capture::Heading(heading)) => heading.push(" ", "\n"),
            None => self.output.push('\n'),
        }
    }

    fn task_list_marker(&mut self, checked: bool) {
        if checked {
            self.output
                .push_str(r#"<input type="checkbox" checked disabled> "#);
        } else {
            self.output.push_str(r#"<input type="checkbox" disabled> "#);
        }
    }
}

fn is_block(tag: &Tag<'_>) -> bool {
    matches!(
        tag,
        Tag::Paragraph
            | Tag::Heading { .. }
            | Tag::BlockQuote(_)
            | Tag::CodeBlock(_)
            | Tag::HtmlBlock
            | Tag::List(_)
            | Tag::Item
            | Tag::FootnoteDefinition(_)
            | Tag::DefinitionList
            | Tag::DefinitionListTitle
            | Tag::DefinitionListDefinition
            | Tag::Table(_)
            | Tag::TableHead
            | Tag::TableRow
            | Tag::TableCell
            | Tag::MetadataBlock(_)
    )
}

fn is_block_end(tag: TagEnd) -> bool {
    matches!(
        tag,
        TagEnd::Paragraph
            | TagEnd::Heading(_)
            | TagEnd::BlockQuote(_)
            | TagEnd::CodeBlock
            | TagEnd::HtmlBlock
            | TagEnd::List(_)
            | TagEnd::Item
            | TagEnd::FootnoteDefinition
            | TagEnd::DefinitionList
            | TagEnd::DefinitionListTitle
            | TagEnd::DefinitionListDefinition
            | TagEnd::Table
            | TagEnd::TableHead
            | TagEnd::TableRow
            | TagEnd::TableCell
            | TagEnd::MetadataBlock(_)
    )
}
