//! Render pipeline.
//!
//! One pipeline runs per content change:
//!
//! ```text
//! Idle → DependenciesPending → Parsing → [Sanitizing] → FootnoteProcessing
//!      → Publishing → [HighlightPending] → Done
//! ```
//!
//! Pipelines are never cancelled. Each one captures the element's content when
//! the render is requested and compares it with the current content after every suspension
//! point and again when publishing; on mismatch it stops without side
//! effects. The last started pipeline therefore always wins, however slowly
//! older ones finish.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use md_renderer::RenderContext;

use crate::element::{Flavor, Inner};
use crate::error::RenderError;
use crate::footnotes::replace_footnotes;
use crate::source::ContentSource;
use crate::status::RenderedStatus;

/// Stage of a render pipeline.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PipelineState {
    /// Not started.
    Idle,
    /// Resolving the parser, and the sanitizer for untrusted elements.
    DependenciesPending,
    /// Running the parser.
    Parsing,
    /// Sanitizing parser output.
    Sanitizing,
    /// Linking footnotes.
    FootnoteProcessing,
    /// Writing the element's content.
    Publishing,
    /// Resolving and running the highlighter over published content.
    HighlightPending,
    /// Status published and completion signalled.
    Done,
}

impl fmt::Display for PipelineState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// How a pipeline ended.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RenderOutcome {
    /// Content published with this status and completion signalled.
    Published(RenderedStatus),
    /// Content changed while the pipeline was suspended; nothing published
    /// from this state on.
    Abandoned {
        /// State in which staleness was detected.
        at: PipelineState,
    },
    /// The element was not connected or had no content.
    Skipped,
}

/// Element state captured when a pipeline starts.
pub(crate) struct Snapshot {
    pub(crate) content: ContentSource,
    pub(crate) ctx: RenderContext,
    pub(crate) untrusted: bool,
}

static NEXT_PIPELINE_ID: AtomicU64 = AtomicU64::new(1);

struct Pipeline {
    id: u64,
    state: PipelineState,
}

/// Run one pipeline for `inner` over `snapshot` to completion.
pub(crate) async fn run(
    inner: Arc<Inner>,
    snapshot: Snapshot,
) -> Result<RenderOutcome, RenderError> {
    let mut pipeline = Pipeline {
        id: NEXT_PIPELINE_ID.fetch_add(1, Ordering::Relaxed),
        state: PipelineState::Idle,
    };

    let result = pipeline.execute(&inner, snapshot).await;
    match &result {
        Ok(outcome) => {
            tracing::debug!(pipeline = pipeline.id, ?outcome, "Pipeline finished");
        }
        Err(e) => {
            tracing::warn!(
                pipeline = pipeline.id,
                state = %pipeline.state,
                error = %e,
                "Render failed"
            );
        }
    }
    result
}

impl Pipeline {
    fn enter(&mut self, next: PipelineState) {
        tracing::debug!(pipeline = self.id, from = %self.state, to = %next, "Pipeline transition");
        self.state = next;
    }

    fn abandon(&self) -> RenderOutcome {
        tracing::debug!(pipeline = self.id, at = %self.state, "Content changed, abandoning render");
        RenderOutcome::Abandoned { at: self.state }
    }

    async fn execute(
        &mut self,
        inner: &Inner,
        snapshot: Snapshot,
    ) -> Result<RenderOutcome, RenderError> {
        let env = Arc::clone(&inner.env);

        self.enter(PipelineState::DependenciesPending);
        let parser = env.cache.parser().await?;
        let sanitizer = if snapshot.untrusted {
            Some(env.cache.sanitizer().await?)
        } else {
            None
        };
        if !inner.is_current(&snapshot.content) {
            return Ok(self.abandon());
        }

        self.enter(PipelineState::Parsing);
        let overrides = inner.flavor.overrides();
        let text = snapshot.content.text();
        let mut html = match inner.flavor {
            Flavor::Block => parser.parse(text, overrides, &snapshot.ctx),
            Flavor::Span => parser.parse_inline(text, overrides, &snapshot.ctx),
        };

        if let Some(sanitizer) = sanitizer {
            self.enter(PipelineState::Sanitizing);
            html = sanitizer.sanitize(&html);
            if !inner.is_current(&snapshot.content) {
                return Ok(self.abandon());
            }
        }

        self.enter(PipelineState::FootnoteProcessing);
        let html = replace_footnotes(&html).into_owned();

        self.enter(PipelineState::Publishing);
        let Some(generation) = inner.publish(&snapshot.content, &html) else {
            return Ok(self.abandon());
        };

        if env.has_highlighter() && html.contains("<pre") {
            self.enter(PipelineState::HighlightPending);
            let highlighter = env.cache.highlighter().await?;
            if !inner.is_current(&snapshot.content) {
                return Ok(self.abandon());
            }
            let mut highlighted = html;
            highlighter.highlight(&mut highlighted);
            if !inner.replace_published(&snapshot.content, generation, highlighted) {
                return Ok(self.abandon());
            }
        }

        self.enter(PipelineState::Done);
        let status = inner.finish(snapshot.content.provenance());
        Ok(RenderOutcome::Published(status))
    }
}
