//! Default capability loaders and the shared render environment.

use std::sync::Arc;

use md_cache::{AcquireError, Capability, CapabilityName, DependencyCache};
use md_config::Config;
use md_renderer::{ParserOptions, PulldownParser};
use url::Url;

use crate::fetch::{Fetcher, HttpFetcher};
use crate::highlight::SyntectHighlighter;
use crate::sanitize::AmmoniaSanitizer;

/// Build a cache with the default parser and sanitizer, plus the syntect
/// highlighter when `highlight` is set.
///
/// Nothing is loaded until first resolved.
#[must_use]
pub fn default_cache(options: &ParserOptions, highlight: bool) -> DependencyCache {
    let builder = DependencyCache::builder()
        .with_loader(CapabilityName::Parser, || async {
            Ok(Capability::Parser(Arc::new(PulldownParser)))
        })
        .with_loader(CapabilityName::Sanitizer, || async {
            Ok(Capability::Sanitizer(Arc::new(AmmoniaSanitizer::new())))
        });

    if !highlight {
        return builder.build();
    }

    let lang_prefix = options.lang_prefix.clone();
    builder
        .with_loader(CapabilityName::Highlighter, move || {
            let lang_prefix = lang_prefix.clone();
            async move {
                tokio::task::spawn_blocking(move || SyntectHighlighter::new(&lang_prefix))
                    .await
                    .map(|highlighter| Capability::Highlighter(Arc::new(highlighter)))
                    .map_err(|e| AcquireError::failed(CapabilityName::Highlighter, e))
            }
        })
        .build()
}

/// Everything elements share: capabilities, fetcher and global options.
///
/// Create one per process and hand clones of the `Arc` to every element.
pub struct Environment {
    /// Capability registry.
    pub cache: Arc<DependencyCache>,
    /// Fetcher for `src`.
    pub fetcher: Arc<dyn Fetcher>,
    /// Global parser output options.
    pub options: ParserOptions,
    /// Document location `src` values are resolved against.
    pub base_url: Url,
}

impl Environment {
    /// Environment with the given capabilities and default options.
    ///
    /// Relative `src` values resolve against `file:///`.
    #[must_use]
    pub fn new(cache: Arc<DependencyCache>, fetcher: Arc<dyn Fetcher>) -> Self {
        Self {
            cache,
            fetcher,
            options: ParserOptions::default(),
            base_url: Url::parse("file:///").expect("valid root file URL"),
        }
    }

    /// Build the default environment from configuration.
    #[must_use]
    pub fn from_config(config: &Config) -> Self {
        let options = config.parser.options();
        let cache = default_cache(&options, config.highlight.enabled);
        Self {
            cache: Arc::new(cache),
            fetcher: Arc::new(HttpFetcher::new(config.fetch_resolved.timeout)),
            options,
            base_url: config.fetch_resolved.base_url.clone(),
        }
    }

    /// Replace the parser options.
    #[must_use]
    pub fn with_options(mut self, options: ParserOptions) -> Self {
        self.options = options;
        self
    }

    /// Replace the base URL.
    #[must_use]
    pub fn with_base_url(mut self, base_url: Url) -> Self {
        self.base_url = base_url;
        self
    }

    /// Whether a highlighter is configured.
    #[must_use]
    pub fn has_highlighter(&self) -> bool {
        self.cache.is_configured(CapabilityName::Highlighter)
    }
}
