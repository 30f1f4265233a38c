//! End-to-end rendering through elements.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use md_block::{
    Environment, FetchError, FetchFuture, Fetcher, Flavor, MarkdownElement, PipelineState,
    RenderError, RenderOutcome, RenderedStatus, default_cache,
};
use md_cache::{AcquireError, Capability, CapabilityName, DependencyCache};
use md_renderer::{ParserOptions, PulldownParser};
use pretty_assertions::assert_eq;
use tokio::sync::Notify;
use url::Url;

/// Serves fixed bodies by URL; anything else is a 404.
#[derive(Default)]
struct StaticFetcher {
    bodies: HashMap<String, String>,
}

impl StaticFetcher {
    fn with(mut self, url: &str, body: &str) -> Self {
        self.bodies.insert(url.to_owned(), body.to_owned());
        self
    }
}

impl Fetcher for StaticFetcher {
    fn fetch(&self, url: &Url) -> FetchFuture<'_> {
        let result = self
            .bodies
            .get(url.as_str())
            .cloned()
            .ok_or(FetchError::Http { status: 404 });
        Box::pin(async move { result })
    }
}

fn env_with(cache: DependencyCache, fetcher: StaticFetcher) -> Arc<Environment> {
    let base = Url::parse("https://docs.example.com/guide/").unwrap();
    Arc::new(Environment::new(Arc::new(cache), Arc::new(fetcher)).with_base_url(base))
}

fn default_env() -> Arc<Environment> {
    env_with(
        default_cache(&ParserOptions::default(), false),
        StaticFetcher::default(),
    )
}

async fn published(handle: Option<md_block::RenderHandle>) -> RenderOutcome {
    handle
        .expect("render should start")
        .await
        .expect("render task panicked")
        .expect("render failed")
}

#[tokio::test]
async fn test_footnote_end_to_end() {
    let element = MarkdownElement::new(Flavor::Block, default_env());
    element.connect();
    let outcome = published(element.set_content("See note[^a].\n\n[^a]: Explanation text.")).await;

    assert_eq!(outcome, RenderOutcome::Published(RenderedStatus::Property));
    assert_eq!(
        element.html(),
        concat!(
            "<p>See note<sup><a class=\"footnote-ref\" href=\"#footnote-1\" id=\"footnote-1-ref\">1</a></sup>.</p>\n\n",
            "\n<div class=\"footnotes\">\n\t<hr class=\"footnote-div\">",
            "\n\t<p>1. Explanation text.<a class=\"footnote\" href=\"#footnote-1-ref\" id=\"footnote-1\">↩</a></p>",
            "\n</div>"
        )
    );
}

#[tokio::test]
async fn test_markup_code_span_escaped_once() {
    // Markup arrives entity-escaped by the host document.
    let element = MarkdownElement::new(Flavor::Span, default_env())
        .with_markup("Use `code&lt;with&gt;brackets` here");
    published(element.connect()).await;

    assert_eq!(
        element.html(),
        "Use <code>code&lt;with&gt;brackets</code> here"
    );
    assert_eq!(element.rendered(), Some(RenderedStatus::Content));
}

#[tokio::test]
async fn test_property_code_span_escaped_once() {
    let element = MarkdownElement::new(Flavor::Span, default_env());
    element.connect();
    published(element.set_content("Use `code<with>brackets` here")).await;

    assert_eq!(
        element.html(),
        "Use <code>code&lt;with&gt;brackets</code> here"
    );
}

#[tokio::test]
async fn test_span_keeps_paragraphs_and_block_syntax_as_text() {
    let element = MarkdownElement::new(Flavor::Span, default_env());
    element.connect();
    published(element.set_content("first *one*\n\nsecond\n\n# third")).await;

    assert_eq!(
        element.html(),
        "first <em>one</em>\n\nsecond\n\n# third"
    );
}

#[tokio::test]
async fn test_markup_code_block_escaped_once() {
    let markup = "\n      ```html\n      &lt;b&gt;bold&lt;/b&gt;\n      ```\n";
    let element = MarkdownElement::new(Flavor::Block, default_env()).with_markup(markup);
    published(element.connect()).await;

    assert_eq!(
        element.html(),
        "<pre class=\"language-html\"><code>&lt;b&gt;bold&lt;/b&gt;\n</code></pre>\n"
    );
}

#[tokio::test]
async fn test_markup_blockquote() {
    let element =
        MarkdownElement::new(Flavor::Block, default_env()).with_markup("  &gt; Quoted\n");
    published(element.connect()).await;

    assert_eq!(
        element.html(),
        "<blockquote>\n<p>Quoted</p>\n</blockquote>\n"
    );
}

#[tokio::test]
async fn test_heading_level_clamped() {
    let element = MarkdownElement::new(Flavor::Block, default_env())
        .with_markup("# Top\n\n###### Deep");
    element.set_attribute("hmin", Some("3"));
    published(element.connect()).await;

    assert_eq!(
        element.html(),
        "<h3 id=\"top\">Top</h3>\n<h6 id=\"deep\">Deep</h6>\n"
    );
}

#[tokio::test]
async fn test_heading_links() {
    let element = MarkdownElement::new(Flavor::Block, default_env()).with_markup("# Top");
    element.set_attribute("hlinks", Some(""));
    published(element.connect()).await;
    assert_eq!(
        element.html(),
        "<h1 id=\"top\"><a href=\"#top\" class=\"anchor\">Top</a></h1>\n"
    );

    published(element.set_attribute("hlinks", Some("§"))).await;
    assert_eq!(
        element.html(),
        "<h1 id=\"top\"><a href=\"#top\" class=\"anchor\">§Top</a></h1>\n"
    );

    published(element.set_attribute("hlinks", None)).await;
    assert_eq!(element.html(), "<h1 id=\"top\">Top</h1>\n");
}

#[tokio::test]
async fn test_untrusted_sanitizes_before_footnotes() {
    let element = MarkdownElement::new(Flavor::Block, default_env());
    element.set_attribute("untrusted", Some(""));
    element.connect();
    let outcome = published(element.set_content(
        "<script>alert(1)</script>\n\nSee[^n].\n\n[^n]: Safe note.",
    ))
    .await;

    let html = element.html();
    assert_eq!(outcome, RenderOutcome::Published(RenderedStatus::Property));
    assert!(!html.contains("<script>"));
    assert!(html.contains(r##"<a class="footnote-ref" href="#footnote-1" id="footnote-1-ref">1</a>"##));
    assert!(html.contains("<p>1. Safe note.<a class=\"footnote\""));
}

#[tokio::test]
async fn test_rendered_status_values() {
    let fetcher = StaticFetcher::default()
        .with("https://docs.example.com/guide/intro.md", "Remote *text*");
    let env = env_with(default_cache(&ParserOptions::default(), false), fetcher);

    let plain = MarkdownElement::new(Flavor::Block, Arc::clone(&env)).with_markup("Inline");
    published(plain.connect()).await;
    assert_eq!(plain.rendered(), Some(RenderedStatus::Content));
    published(plain.set_content("Assigned")).await;
    assert_eq!(plain.rendered(), Some(RenderedStatus::Property));

    let fallback = MarkdownElement::new(Flavor::Block, Arc::clone(&env)).with_markup("Fallback");
    let fetch = fallback.set_attribute("src", Some("missing.md")).unwrap();
    published(fallback.connect()).await;
    assert!(matches!(
        fetch.await.unwrap(),
        Err(RenderError::Fetch(FetchError::Http { status: 404 }))
    ));
    assert_eq!(fallback.rendered(), Some(RenderedStatus::Fallback));
    assert_eq!(fallback.html(), "<p>Fallback</p>\n");

    let remote = MarkdownElement::new(Flavor::Block, Arc::clone(&env)).with_markup("Fallback");
    published(remote.connect()).await;
    let outcome = published(remote.set_attribute("src", Some("intro.md"))).await;
    assert_eq!(outcome, RenderOutcome::Published(RenderedStatus::Remote));
    assert_eq!(remote.html(), "<p>Remote <em>text</em></p>\n");
    assert_eq!(remote.content().as_deref(), Some("Remote *text*"));
}

#[tokio::test]
async fn test_completion_event_per_published_render() {
    let element = MarkdownElement::new(Flavor::Block, default_env()).with_markup("One");
    let mut events = element.subscribe();

    published(element.connect()).await;
    published(element.set_content("Two")).await;

    assert!(events.try_recv().is_ok());
    assert!(events.try_recv().is_ok());
    assert!(events.try_recv().is_err());
}

struct Gate {
    started: Notify,
    release: Notify,
}

#[tokio::test]
async fn test_last_assigned_content_wins() {
    let gate = Arc::new(Gate {
        started: Notify::new(),
        release: Notify::new(),
    });
    let loader_gate = Arc::clone(&gate);
    let cache = DependencyCache::builder()
        .with_loader(CapabilityName::Parser, move || {
            let gate = Arc::clone(&loader_gate);
            async move {
                gate.started.notify_one();
                gate.release.notified().await;
                Ok(Capability::Parser(Arc::new(PulldownParser)))
            }
        })
        .build();
    let element = MarkdownElement::new(
        Flavor::Block,
        env_with(cache, StaticFetcher::default()),
    )
    .with_markup("Initial");
    let mut events = element.subscribe();

    // The first pipeline holds the parser acquisition open.
    let initial = element.connect().unwrap();
    gate.started.notified().await;

    // Content A and then B are assigned while the acquisition is pending.
    let first = element.set_content("Content A").unwrap();
    let second = element.set_content("Content B").unwrap();
    gate.release.notify_one();

    let abandoned = RenderOutcome::Abandoned {
        at: PipelineState::DependenciesPending,
    };
    assert_eq!(initial.await.unwrap().unwrap(), abandoned);
    assert_eq!(first.await.unwrap().unwrap(), abandoned);
    assert_eq!(
        second.await.unwrap().unwrap(),
        RenderOutcome::Published(RenderedStatus::Property)
    );

    assert_eq!(element.html(), "<p>Content B</p>\n");
    assert!(events.try_recv().is_ok());
    assert!(events.try_recv().is_err());
}

#[tokio::test]
async fn test_back_to_back_assignments_signal_once() {
    let element = MarkdownElement::new(Flavor::Block, default_env());
    element.connect();
    let mut events = element.subscribe();

    // No suspension between the two assignments.
    let first = element.set_content("Content A").unwrap();
    let second = element.set_content("Content B").unwrap();

    assert_eq!(
        first.await.unwrap().unwrap(),
        RenderOutcome::Abandoned {
            at: PipelineState::DependenciesPending,
        }
    );
    assert_eq!(
        second.await.unwrap().unwrap(),
        RenderOutcome::Published(RenderedStatus::Property)
    );
    assert_eq!(element.html(), "<p>Content B</p>\n");
    assert_eq!(element.rendered(), Some(RenderedStatus::Property));
    assert!(events.try_recv().is_ok());
    assert!(events.try_recv().is_err());
}

#[tokio::test]
async fn test_failed_acquisition_poisons_every_element() {
    let calls = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&calls);
    let cache = DependencyCache::builder()
        .with_parser(Arc::new(PulldownParser))
        .with_loader(CapabilityName::Sanitizer, move || {
            counter.fetch_add(1, Ordering::SeqCst);
            async { Err(AcquireError::failed(CapabilityName::Sanitizer, "unavailable")) }
        })
        .build();
    let env = env_with(cache, StaticFetcher::default());

    for text in ["first", "second"] {
        let element = MarkdownElement::new(Flavor::Block, Arc::clone(&env)).with_markup(text);
        let mut events = element.subscribe();
        element.set_attribute("untrusted", Some(""));

        let result = element.connect().unwrap().await.unwrap();
        assert!(matches!(
            result,
            Err(RenderError::Acquire(AcquireError::Failed { .. }))
        ));
        assert_eq!(element.html(), "");
        assert_eq!(element.rendered(), None);
        assert!(events.try_recv().is_err());
    }
    assert_eq!(calls.load(Ordering::SeqCst), 1);

    // Trusted elements only need the parser and still render.
    let trusted = MarkdownElement::new(Flavor::Block, env).with_markup("fine");
    published(trusted.connect()).await;
    assert_eq!(trusted.html(), "<p>fine</p>\n");
}

#[tokio::test]
async fn test_highlighting_after_publish() {
    let env = env_with(
        default_cache(&ParserOptions::default(), true),
        StaticFetcher::default(),
    );
    let element = MarkdownElement::new(Flavor::Block, env);
    element.connect();
    published(element.set_content("```rust\nfn main() {}\n```")).await;

    let html = element.html();
    assert!(html.starts_with("<pre class=\"language-rust\"><code class=\"highlighted\">"));
    assert!(html.contains("<span class=\"hl-"));
}
