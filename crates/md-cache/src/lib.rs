//! Capability cache for md-block.
//!
//! Rendering depends on three pluggable capabilities, each acquired
//! asynchronously at most once and shared by every element:
//!
//! - [`MarkdownParser`]: markdown to HTML (defined in `md-renderer`)
//! - [`Sanitizer`]: HTML to safe HTML
//! - [`Highlighter`]: syntax highlighting over published HTML
//!
//! [`DependencyCache`] is the registry. Its only entry point is the idempotent
//! async [`DependencyCache::resolve`]; the slot holding a capability is never
//! exposed. The first caller for a capability runs its loader; concurrent
//! callers wait on that same acquisition; later callers get the cached value.
//! A failed acquisition is cached too and handed to every later caller.
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use md_cache::{CapabilityName, DependencyCache};
//! use md_renderer::PulldownParser;
//!
//! let cache = DependencyCache::builder()
//!     .with_parser(Arc::new(PulldownParser))
//!     .build();
//!
//! assert!(cache.is_configured(CapabilityName::Parser));
//! assert!(!cache.is_configured(CapabilityName::Highlighter));
//! assert!(!cache.is_resolved(CapabilityName::Parser)); // acquired on first resolve
//! ```

mod capability;
mod registry;

pub use capability::{AcquireError, Capability, CapabilityName, Highlighter, Sanitizer};
pub use md_renderer::MarkdownParser;
pub use registry::{DependencyCache, DependencyCacheBuilder, LoadFuture};
