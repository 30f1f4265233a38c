//! Markdown elements.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use md_config::{Attribute, ConfigChange, ElementConfig};
use md_renderer::{Provenance, RenderContext, RendererOverrides};
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use url::Url;

use crate::capabilities::Environment;
use crate::error::RenderError;
use crate::events::{EVENT_CAPACITY, RenderEvent};
use crate::pipeline::{self, RenderOutcome, Snapshot};
use crate::source::ContentSource;
use crate::status::RenderedStatus;

/// Handle to a spawned render (or fetch-then-render).
pub type RenderHandle = JoinHandle<Result<RenderOutcome, RenderError>>;

/// Element flavor.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Flavor {
    /// `<md-block>`: block markdown, observes `src`, `hmin` and `hlinks`.
    Block,
    /// `<md-span>`: inline markdown, observes no attributes.
    Span,
}

impl Flavor {
    /// Renderer overrides used by this flavor.
    #[must_use]
    pub fn overrides(self) -> &'static RendererOverrides {
        match self {
            Self::Block => &RendererOverrides::BLOCK,
            Self::Span => &RendererOverrides::INLINE,
        }
    }

    /// Whether changes to `attribute` affect this flavor.
    #[must_use]
    pub fn observes(self, attribute: Attribute) -> bool {
        match self {
            Self::Block => attribute != Attribute::Untrusted,
            Self::Span => false,
        }
    }

    /// Custom element tag name.
    #[must_use]
    pub fn tag_name(self) -> &'static str {
        match self {
            Self::Block => "md-block",
            Self::Span => "md-span",
        }
    }
}

/// A markdown element.
///
/// Cheap to clone; clones share one element. Content changes, attribute
/// changes and connection start render pipelines on the tokio runtime and
/// return their [`RenderHandle`].
///
/// # Panics
///
/// Methods that start a pipeline panic when called outside a tokio runtime.
/// Every method panics if the element's state mutex is poisoned.
#[derive(Clone)]
pub struct MarkdownElement {
    inner: Arc<Inner>,
}

pub(crate) struct Inner {
    pub(crate) flavor: Flavor,
    pub(crate) env: Arc<Environment>,
    state: Mutex<ElementState>,
    events: broadcast::Sender<RenderEvent>,
}

#[derive(Default)]
struct ElementState {
    connected: bool,
    /// Fixed at first connection.
    untrusted: Option<bool>,
    /// The element's own children, used as content at first connection.
    markup: String,
    content: Option<ContentSource>,
    attributes: HashMap<Attribute, String>,
    config: ElementConfig,
    html: String,
    /// Incremented on every publish.
    generation: u64,
    rendered: Option<RenderedStatus>,
}

impl MarkdownElement {
    /// Create a disconnected element with no markup.
    #[must_use]
    pub fn new(flavor: Flavor, env: Arc<Environment>) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            inner: Arc::new(Inner {
                flavor,
                env,
                state: Mutex::new(ElementState::default()),
                events,
            }),
        }
    }

    /// Set the element's own markup, read as content at first connection.
    #[must_use]
    pub fn with_markup(self, markup: &str) -> Self {
        markup.clone_into(&mut self.inner.lock().markup);
        self
    }

    /// Element flavor.
    #[must_use]
    pub fn flavor(&self) -> Flavor {
        self.inner.flavor
    }

    /// Attach the element and render.
    ///
    /// On first connection the `untrusted` attribute is read and fixed, and
    /// the markup becomes the content unless content was already assigned.
    pub fn connect(&self) -> Option<RenderHandle> {
        let snapshot = {
            let mut state = self.inner.lock();
            state.connected = true;
            if state.untrusted.is_none() {
                let untrusted = state.attributes.contains_key(&Attribute::Untrusted);
                state.untrusted = Some(untrusted);
            }
            if state.content.is_none() {
                let content = ContentSource::from_markup(&state.markup);
                state.content = Some(content);
            }
            self.inner.capture(&state)
        };
        tracing::debug!(element = self.inner.flavor.tag_name(), "Connected");
        snapshot.map(|snapshot| self.spawn_pipeline(snapshot))
    }

    /// Detach the element. Pipelines already running still finish.
    pub fn disconnect(&self) {
        self.inner.lock().connected = false;
    }

    /// Whether the element is attached.
    #[must_use]
    pub fn is_connected(&self) -> bool {
        self.inner.lock().connected
    }

    /// Whether output is sanitized. Always `false` before first connection.
    #[must_use]
    pub fn is_untrusted(&self) -> bool {
        self.inner.lock().untrusted.unwrap_or(false)
    }

    /// Assign markdown content and render it.
    ///
    /// Pipelines still running for earlier content are abandoned.
    pub fn set_content(&self, text: &str) -> Option<RenderHandle> {
        let snapshot = self
            .inner
            .assign_and_snapshot(ContentSource::from_property(text))?;
        Some(self.spawn_pipeline(snapshot))
    }

    /// Current markdown text, if any.
    #[must_use]
    pub fn content(&self) -> Option<String> {
        self.inner
            .lock()
            .content
            .as_ref()
            .map(|content| content.text().to_owned())
    }

    /// Where the current content came from.
    #[must_use]
    pub fn provenance(&self) -> Option<Provenance> {
        self.inner
            .lock()
            .content
            .as_ref()
            .map(ContentSource::provenance)
    }

    /// Set or remove (`None`) an attribute.
    ///
    /// Returns a handle when the change starts a fetch or a render. Unknown
    /// attribute names are ignored.
    pub fn set_attribute(&self, name: &str, value: Option<&str>) -> Option<RenderHandle> {
        let attribute = Attribute::from_name(name)?;

        let change = {
            let mut state = self.inner.lock();
            let old = match value {
                Some(value) => state.attributes.insert(attribute, value.to_owned()),
                None => state.attributes.remove(&attribute),
            };
            if !self.inner.flavor.observes(attribute) {
                return None;
            }
            state.config.apply_change(
                attribute,
                old.as_deref(),
                value,
                &self.inner.env.base_url,
            )
        };

        tracing::debug!(attribute = attribute.name(), ?change, "Attribute changed");
        match change {
            ConfigChange::Unchanged | ConfigChange::Ignored => None,
            ConfigChange::Rerender => self.render(),
            ConfigChange::Fetch(url) => Some(self.spawn_fetch(url)),
        }
    }

    /// Current value of an attribute.
    #[must_use]
    pub fn attribute(&self, name: &str) -> Option<String> {
        let attribute = Attribute::from_name(name)?;
        self.inner.lock().attributes.get(&attribute).cloned()
    }

    /// Attribute-driven configuration.
    #[must_use]
    pub fn config(&self) -> ElementConfig {
        self.inner.lock().config.clone()
    }

    /// Start a render of the current content.
    ///
    /// Returns `None` when the element is disconnected or has no content.
    pub fn render(&self) -> Option<RenderHandle> {
        let snapshot = self.inner.snapshot()?;
        Some(self.spawn_pipeline(snapshot))
    }

    /// Published HTML.
    #[must_use]
    pub fn html(&self) -> String {
        self.inner.lock().html.clone()
    }

    /// Status of the last completed render.
    #[must_use]
    pub fn rendered(&self) -> Option<RenderedStatus> {
        self.inner.lock().rendered
    }

    /// Subscribe to completion events.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<RenderEvent> {
        self.inner.events.subscribe()
    }

    fn spawn_pipeline(&self, snapshot: Snapshot) -> RenderHandle {
        tokio::spawn(pipeline::run(Arc::clone(&self.inner), snapshot))
    }

    fn spawn_fetch(&self, url: Url) -> RenderHandle {
        let inner = Arc::clone(&self.inner);
        tokio::spawn(async move {
            tracing::debug!(%url, "Fetching markdown source");
            let text = match inner.env.fetcher.fetch(&url).await {
                Ok(text) => text,
                Err(e) => {
                    tracing::warn!(%url, error = %e, "Failed to fetch markdown source");
                    return Err(e.into());
                }
            };

            let snapshot = {
                let mut state = inner.lock();
                // A newer `src` supersedes this fetch.
                if state.config.src.as_ref() != Some(&url) {
                    tracing::debug!(%url, "Source changed during fetch, dropping response");
                    return Ok(RenderOutcome::Skipped);
                }
                state.content = Some(ContentSource::from_property(&text));
                inner.capture(&state)
            };
            match snapshot {
                Some(snapshot) => pipeline::run(inner, snapshot).await,
                None => Ok(RenderOutcome::Skipped),
            }
        })
    }
}

impl Inner {
    fn lock(&self) -> MutexGuard<'_, ElementState> {
        self.state.lock().unwrap()
    }

    /// Replace the content and capture it for a pipeline under one lock.
    ///
    /// The content is replaced even when no pipeline may start.
    fn assign_and_snapshot(&self, content: ContentSource) -> Option<Snapshot> {
        let mut state = self.lock();
        state.content = Some(content);
        self.capture(&state)
    }

    /// Capture what a pipeline needs, or `None` if it must not start.
    ///
    /// Taken when the render is requested, so a pipeline always works on
    /// the content it was started for.
    fn snapshot(&self) -> Option<Snapshot> {
        let state = self.lock();
        self.capture(&state)
    }

    fn capture(&self, state: &ElementState) -> Option<Snapshot> {
        if !state.connected {
            return None;
        }
        let content = state.content.clone()?;
        let ctx = RenderContext {
            provenance: content.provenance(),
            heading_offset: state.config.hmin,
            heading_links: state.config.hlinks.clone(),
            options: self.env.options.clone(),
        };
        Some(Snapshot {
            content,
            ctx,
            untrusted: state.untrusted.unwrap_or(false),
        })
    }

    /// Whether `content` is still the element's current content.
    pub(crate) fn is_current(&self, content: &ContentSource) -> bool {
        self.lock()
            .content
            .as_ref()
            .is_some_and(|current| current.is_same(content))
    }

    /// Publish `html` if `content` is still current. Returns the publish
    /// generation.
    pub(crate) fn publish(&self, content: &ContentSource, html: &str) -> Option<u64> {
        let mut state = self.lock();
        if !state.content.as_ref().is_some_and(|c| c.is_same(content)) {
            return None;
        }
        html.clone_into(&mut state.html);
        state.generation += 1;
        Some(state.generation)
    }

    /// Replace the HTML published as `generation`, if nothing newer was
    /// published and `content` is still current.
    pub(crate) fn replace_published(
        &self,
        content: &ContentSource,
        generation: u64,
        html: String,
    ) -> bool {
        let mut state = self.lock();
        let current = state.content.as_ref().is_some_and(|c| c.is_same(content));
        if !current || state.generation != generation {
            return false;
        }
        state.html = html;
        true
    }

    /// Record the rendered status and signal completion.
    pub(crate) fn finish(&self, provenance: Provenance) -> RenderedStatus {
        let status = {
            let mut state = self.lock();
            let status = RenderedStatus::new(provenance, state.config.src.is_some());
            state.rendered = Some(status);
            status
        };
        // No subscribers is fine.
        let _ = self.events.send(RenderEvent);
        status
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capabilities::default_cache;
    use crate::fetch::{FetchFuture, Fetcher};
    use md_renderer::ParserOptions;
    use pretty_assertions::assert_eq;

    struct NoFetch;

    impl Fetcher for NoFetch {
        fn fetch(&self, url: &Url) -> FetchFuture<'_> {
            let url = url.to_string();
            Box::pin(async move { Err(crate::FetchError::Transport(url)) })
        }
    }

    fn element(flavor: Flavor) -> MarkdownElement {
        let cache = default_cache(&ParserOptions::default(), false);
        let env = Environment::new(Arc::new(cache), Arc::new(NoFetch));
        MarkdownElement::new(flavor, Arc::new(env))
    }

    #[test]
    fn test_flavor_observed_attributes() {
        assert!(Flavor::Block.observes(Attribute::Src));
        assert!(Flavor::Block.observes(Attribute::Hmin));
        assert!(!Flavor::Block.observes(Attribute::Untrusted));
        assert!(!Flavor::Span.observes(Attribute::Hlinks));
    }

    #[tokio::test]
    async fn test_disconnected_element_does_not_render() {
        let element = element(Flavor::Block);
        assert!(element.set_content("# Title").is_none());
        assert_eq!(element.html(), "");
        assert_eq!(element.rendered(), None);
    }

    #[tokio::test]
    async fn test_connect_renders_markup() {
        let element = element(Flavor::Block).with_markup("\n    Hello *world*\n");
        let outcome = element.connect().unwrap().await.unwrap().unwrap();

        assert_eq!(outcome, RenderOutcome::Published(RenderedStatus::Content));
        assert_eq!(element.html(), "<p>Hello <em>world</em></p>\n");
    }

    #[tokio::test]
    async fn test_assigned_content_survives_connect() {
        let element = element(Flavor::Block).with_markup("markup");
        assert!(element.set_content("assigned").is_none());
        element.connect().unwrap().await.unwrap().unwrap();

        assert_eq!(element.html(), "<p>assigned</p>\n");
        assert_eq!(element.rendered(), Some(RenderedStatus::Property));
        assert_eq!(element.provenance(), Some(Provenance::FromProperty));
    }

    #[tokio::test]
    async fn test_untrusted_fixed_at_first_connect() {
        let element = element(Flavor::Block);
        element.set_attribute("untrusted", Some(""));
        element.connect().unwrap().await.unwrap().unwrap();
        assert!(element.is_untrusted());

        element.set_attribute("untrusted", None);
        element.disconnect();
        element.connect().unwrap().await.unwrap().unwrap();
        assert!(element.is_untrusted());
    }

    #[tokio::test]
    async fn test_span_ignores_block_attributes() {
        let element = element(Flavor::Span).with_markup("Some *text*");
        element.connect().unwrap().await.unwrap().unwrap();

        assert!(element.set_attribute("hmin", Some("2")).is_none());
        assert_eq!(element.config().hmin, 1);
        assert_eq!(element.attribute("hmin").as_deref(), Some("2"));
        assert_eq!(element.html(), "Some <em>text</em>");
    }

    #[tokio::test]
    async fn test_hmin_change_rerenders() {
        let element = element(Flavor::Block).with_markup("# Title");
        element.connect().unwrap().await.unwrap().unwrap();

        let handle = element.set_attribute("hmin", Some("3")).unwrap();
        handle.await.unwrap().unwrap();
        assert_eq!(element.html(), "<h3 id=\"title\">Title</h3>\n");
    }

    #[tokio::test]
    async fn test_failed_fetch_keeps_content() {
        let element = element(Flavor::Block).with_markup("Fallback text");
        element.connect().unwrap().await.unwrap().unwrap();

        let handle = element.set_attribute("src", Some("missing.md")).unwrap();
        let err = handle.await.unwrap().unwrap_err();
        assert!(matches!(err, RenderError::Fetch(_)));
        assert_eq!(element.html(), "<p>Fallback text</p>\n");
        assert_eq!(element.content().as_deref(), Some("Fallback text"));
    }

    #[tokio::test]
    async fn test_back_to_back_assignments_publish_last_only() {
        let element = element(Flavor::Block).with_markup("Initial");
        let mut events = element.subscribe();

        let initial = element.connect().unwrap();
        let first = element.set_content("Content A").unwrap();
        let second = element.set_content("Content B").unwrap();

        let abandoned = RenderOutcome::Abandoned {
            at: crate::PipelineState::DependenciesPending,
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
    async fn test_assignment_while_disconnected_renders_nothing_later() {
        let element = element(Flavor::Block);
        element.connect().unwrap().await.unwrap().unwrap();
        element.disconnect();

        assert!(element.set_content("Offline").is_none());
        assert_eq!(element.content().as_deref(), Some("Offline"));
        assert_eq!(element.html(), "");
    }

    #[tokio::test]
    async fn test_unknown_attribute_ignored() {
        let element = element(Flavor::Block);
        assert!(element.set_attribute("class", Some("wide")).is_none());
        assert_eq!(element.attribute("class"), None);
    }
}
