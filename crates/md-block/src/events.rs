//! Completion signal.

/// Fired after every render that reaches `Done`.
///
/// Carries nothing beyond its occurrence; read the element for the result.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RenderEvent;

impl RenderEvent {
    /// Event name.
    pub const NAME: &'static str = "md-render";

    /// Whether the event propagates to ancestors.
    pub const BUBBLES: bool = true;

    /// Whether the event crosses shadow boundaries.
    pub const COMPOSED: bool = true;
}

/// Capacity of each element's completion channel.
pub(crate) const EVENT_CAPACITY: usize = 16;
