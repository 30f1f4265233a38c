//! Capability registry.

use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Instant;

use md_renderer::MarkdownParser;
use tokio::sync::OnceCell;

use crate::capability::{AcquireError, Capability, CapabilityName, Highlighter, Sanitizer};

/// Future returned by a capability loader.
pub type LoadFuture = Pin<Box<dyn Future<Output = Result<Capability, AcquireError>> + Send>>;

type Loader = Box<dyn Fn() -> LoadFuture + Send + Sync>;

/// One registered capability: its loader and the write-once result.
struct Slot {
    loader: Loader,
    cell: OnceCell<Result<Capability, AcquireError>>,
}

/// Registry of lazily acquired capabilities, keyed by [`CapabilityName`].
///
/// The set of registered loaders is fixed at build time; each slot is written
/// at most once, by its first acquisition, and is read-only afterwards. The
/// only synchronization is the de-duplication of in-flight acquisitions.
///
/// # Failure
///
/// A failed acquisition is stored like a success: every waiter and every
/// later caller receives the same [`AcquireError`] and the loader is never
/// retried. Build a new cache to recover.
pub struct DependencyCache {
    slots: HashMap<CapabilityName, Slot>,
}

impl DependencyCache {
    /// Start building a cache.
    #[must_use]
    pub fn builder() -> DependencyCacheBuilder {
        DependencyCacheBuilder::default()
    }

    /// Whether a loader is registered for `name`.
    #[must_use]
    pub fn is_configured(&self, name: CapabilityName) -> bool {
        self.slots.contains_key(&name)
    }

    /// Whether the acquisition for `name` has finished, successfully or not.
    #[must_use]
    pub fn is_resolved(&self, name: CapabilityName) -> bool {
        self.slots
            .get(&name)
            .is_some_and(|slot| slot.cell.initialized())
    }

    /// Resolve a capability, acquiring it on first use.
    ///
    /// Concurrent callers share a single acquisition and all observe the same
    /// result.
    pub async fn resolve(&self, name: CapabilityName) -> Result<Capability, AcquireError> {
        let slot = self
            .slots
            .get(&name)
            .ok_or(AcquireError::NotConfigured(name))?;

        if let Some(result) = slot.cell.get() {
            tracing::trace!(capability = %name, "Capability cache hit");
            return result.clone();
        }

        slot.cell
            .get_or_init(|| acquire(name, &slot.loader))
            .await
            .clone()
    }

    /// Resolve the parser capability.
    pub async fn parser(&self) -> Result<Arc<dyn MarkdownParser>, AcquireError> {
        match self.resolve(CapabilityName::Parser).await? {
            Capability::Parser(parser) => Ok(parser),
            other => Err(wrong_kind(CapabilityName::Parser, &other)),
        }
    }

    /// Resolve the sanitizer capability.
    pub async fn sanitizer(&self) -> Result<Arc<dyn Sanitizer>, AcquireError> {
        match self.resolve(CapabilityName::Sanitizer).await? {
            Capability::Sanitizer(sanitizer) => Ok(sanitizer),
            other => Err(wrong_kind(CapabilityName::Sanitizer, &other)),
        }
    }

    /// Resolve the highlighter capability.
    pub async fn highlighter(&self) -> Result<Arc<dyn Highlighter>, AcquireError> {
        match self.resolve(CapabilityName::Highlighter).await? {
            Capability::Highlighter(highlighter) => Ok(highlighter),
            other => Err(wrong_kind(CapabilityName::Highlighter, &other)),
        }
    }
}

/// Run a loader once, logging the outcome.
async fn acquire(name: CapabilityName, loader: &Loader) -> Result<Capability, AcquireError> {
    let start = Instant::now();
    tracing::debug!(capability = %name, "Acquiring capability");

    let result = loader().await.and_then(|capability| {
        if capability.name() == name {
            Ok(capability)
        } else {
            Err(wrong_kind(name, &capability))
        }
    });

    let elapsed_ms = start.elapsed().as_secs_f64() * 1000.0;
    match &result {
        Ok(_) => tracing::info!(capability = %name, elapsed_ms, "Capability acquired"),
        Err(e) => tracing::warn!(capability = %name, error = %e, "Capability acquisition failed"),
    }
    result
}

fn wrong_kind(expected: CapabilityName, found: &Capability) -> AcquireError {
    AcquireError::WrongKind {
        expected,
        found: found.name(),
    }
}

/// Builder for [`DependencyCache`].
#[derive(Default)]
pub struct DependencyCacheBuilder {
    slots: HashMap<CapabilityName, Slot>,
}

impl DependencyCacheBuilder {
    /// Register an async loader for `name`, replacing any previous one.
    #[must_use]
    pub fn with_loader<F, Fut>(mut self, name: CapabilityName, loader: F) -> Self
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Capability, AcquireError>> + Send + 'static,
    {
        let loader: Loader = Box::new(move || Box::pin(loader()));
        self.slots.insert(
            name,
            Slot {
                loader,
                cell: OnceCell::new(),
            },
        );
        self
    }

    /// Register a parser that is already available.
    #[must_use]
    pub fn with_parser(self, parser: Arc<dyn MarkdownParser>) -> Self {
        self.with_loader(CapabilityName::Parser, move || {
            let parser = Arc::clone(&parser);
            async move { Ok(Capability::Parser(parser)) }
        })
    }

    /// Register a sanitizer that is already available.
    #[must_use]
    pub fn with_sanitizer(self, sanitizer: Arc<dyn Sanitizer>) -> Self {
        self.with_loader(CapabilityName::Sanitizer, move || {
            let sanitizer = Arc::clone(&sanitizer);
            async move { Ok(Capability::Sanitizer(sanitizer)) }
        })
    }

    /// Register a highlighter that is already available.
    #[must_use]
    pub fn with_highlighter(self, highlighter: Arc<dyn Highlighter>) -> Self {
        self.with_loader(CapabilityName::Highlighter, move || {
            let highlighter = Arc::clone(&highlighter);
            async move { Ok(Capability::Highlighter(highlighter)) }
        })
    }

    /// Finish building.
    #[must_use]
    pub fn build(self) -> DependencyCache {
        DependencyCache { slots: self.slots }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use md_renderer::PulldownParser;
    use pretty_assertions::assert_eq;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    struct UppercaseSanitizer;

    impl Sanitizer for UppercaseSanitizer {
        fn sanitize(&self, html: &str) -> String {
            html.to_uppercase()
        }
    }

    fn counting_parser_cache(calls: &Arc<AtomicUsize>) -> DependencyCache {
        let calls = Arc::clone(calls);
        DependencyCache::builder()
            .with_loader(CapabilityName::Parser, move || {
                let calls = Arc::clone(&calls);
                async move {
                    calls.fetch_add(1, Ordering::SeqCst);
                    tokio::time::sleep(Duration::from_millis(10)).await;
                    Ok(Capability::Parser(Arc::new(PulldownParser)))
                }
            })
            .build()
    }

    #[tokio::test]
    async fn test_resolve_acquires_once() {
        let calls = Arc::new(AtomicUsize::new(0));
        let cache = counting_parser_cache(&calls);

        assert!(!cache.is_resolved(CapabilityName::Parser));
        cache.parser().await.unwrap();
        cache.parser().await.unwrap();

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(cache.is_resolved(CapabilityName::Parser));
    }

    #[tokio::test]
    async fn test_concurrent_resolvers_share_acquisition() {
        let calls = Arc::new(AtomicUsize::new(0));
        let cache = Arc::new(counting_parser_cache(&calls));

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let cache = Arc::clone(&cache);
                tokio::spawn(async move { cache.parser().await.map(|_| ()) })
            })
            .collect();

        for handle in handles {
            handle.await.unwrap().unwrap();
        }
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_resolved_capability_is_shared() {
        let cache = DependencyCache::builder()
            .with_sanitizer(Arc::new(UppercaseSanitizer))
            .build();

        let first = cache.sanitizer().await.unwrap();
        let second = cache.sanitizer().await.unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(first.sanitize("<p>x</p>"), "<P>X</P>");
    }

    #[tokio::test]
    async fn test_not_configured() {
        let cache = DependencyCache::builder().build();
        let err = cache.highlighter().await.err().unwrap();
        assert_eq!(
            err,
            AcquireError::NotConfigured(CapabilityName::Highlighter)
        );
        assert!(!cache.is_resolved(CapabilityName::Highlighter));
    }

    #[tokio::test]
    async fn test_failed_acquisition_poisons_slot() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        let cache = DependencyCache::builder()
            .with_loader(CapabilityName::Sanitizer, move || {
                let counter = Arc::clone(&counter);
                async move {
                    counter.fetch_add(1, Ordering::SeqCst);
                    Err(AcquireError::failed(CapabilityName::Sanitizer, "offline"))
                }
            })
            .build();

        let first = cache.sanitizer().await.err().unwrap();
        let second = cache.sanitizer().await.err().unwrap();

        assert_eq!(first, second);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(cache.is_resolved(CapabilityName::Sanitizer));
    }

    #[tokio::test]
    async fn test_loader_of_wrong_kind() {
        let cache = DependencyCache::builder()
            .with_loader(CapabilityName::Highlighter, || async {
                Ok(Capability::Parser(Arc::new(PulldownParser)))
            })
            .build();

        let err = cache.highlighter().await.err().unwrap();
        assert_eq!(
            err,
            AcquireError::WrongKind {
                expected: CapabilityName::Highlighter,
                found: CapabilityName::Parser,
            }
        );
    }
}
