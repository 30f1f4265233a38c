//! Shared utility functions for markdown rendering.

use pulldown_cmark::HeadingLevel;

/// Deepest heading level HTML can represent.
pub const MAX_HEADING_LEVEL: u8 = 6;

/// Convert heading level enum to number (1-6).
#[must_use]
pub(crate) fn heading_level_to_num(level: HeadingLevel) -> u8 {
    match level {
        HeadingLevel::H1 => 1,
        HeadingLevel::H2 => 2,
        HeadingLevel::H3 => 3,
        HeadingLevel::H4 => 4,
        HeadingLevel::H5 => 5,
        HeadingLevel::H6 => 6,
    }
}
