//! Structural locators for third-party markup.
//!
//! External diagnostic pages offer no stable test IDs, so elements are
//! located by tag/attribute structure plus visible text. Third-party markup
//! reuses the same structure freely; locators therefore carry an explicit
//! match position instead of assuming single-match uniqueness.

use std::fmt;

/// Default timeout for landmark waits (10 seconds)
pub const DEFAULT_TIMEOUT_MS: u64 = 10_000;

/// Default polling interval while waiting (50ms)
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 50;

/// Selector for matching elements on an external page
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Selector {
    /// CSS selector (e.g. `div#performance`)
    Css(String),
    /// CSS selector filtered by visible text content
    CssWithText {
        /// Base CSS selector
        css: String,
        /// Substring the element's text must contain
        text: String,
    },
}

impl Selector {
    /// Create a CSS selector
    #[must_use]
    pub fn css(selector: impl Into<String>) -> Self {
        Self::Css(selector.into())
    }

    /// Create a CSS selector with a text-content filter
    #[must_use]
    pub fn css_with_text(css: impl Into<String>, text: impl Into<String>) -> Self {
        Self::CssWithText {
            css: css.into(),
            text: text.into(),
        }
    }

    /// Stable string key identifying this selector
    #[must_use]
    pub fn key(&self) -> String {
        match self {
            Self::Css(css) => format!("css:{css}"),
            Self::CssWithText { css, text } => format!("css:{css}::text:{text}"),
        }
    }
}

impl fmt::Display for Selector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Css(css) => write!(f, "{css}"),
            Self::CssWithText { css, text } => write!(f, "{css} containing {text:?}"),
        }
    }
}

/// Which of several matching elements to act on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MatchIndex {
    /// First match in document order
    #[default]
    First,
    /// Zero-based Nth match
    Nth(usize),
    /// Last match in document order
    Last,
}

impl MatchIndex {
    /// Resolve the index into a match list of the given length.
    #[must_use]
    pub fn resolve(&self, count: usize) -> Option<usize> {
        match self {
            Self::First => (count > 0).then_some(0),
            Self::Nth(n) => (*n < count).then_some(*n),
            Self::Last => count.checked_sub(1),
        }
    }

    /// Minimum number of matches this index expects to exist.
    #[must_use]
    pub const fn expected_count(&self) -> usize {
        match self {
            Self::First | Self::Last => 1,
            Self::Nth(n) => *n + 1,
        }
    }
}

/// A locator: selector plus positional match selection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Locator {
    /// Selector used to collect candidate elements
    pub selector: Selector,
    /// Which candidate to act on
    pub index: MatchIndex,
}

impl Locator {
    /// Locate the first match of a CSS selector
    #[must_use]
    pub fn css(selector: impl Into<String>) -> Self {
        Self {
            selector: Selector::css(selector),
            index: MatchIndex::First,
        }
    }

    /// Locate the first match of a CSS selector filtered by text
    #[must_use]
    pub fn css_with_text(css: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            selector: Selector::css_with_text(css, text),
            index: MatchIndex::First,
        }
    }

    /// Act on the zero-based Nth match instead of the first
    #[must_use]
    pub const fn nth(mut self, n: usize) -> Self {
        self.index = MatchIndex::Nth(n);
        self
    }

    /// Act on the last match
    #[must_use]
    pub const fn last(mut self) -> Self {
        self.index = MatchIndex::Last;
        self
    }
}

impl fmt::Display for Locator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.index {
            MatchIndex::First => write!(f, "{}", self.selector),
            MatchIndex::Nth(n) => write!(f, "{} (match #{n})", self.selector),
            MatchIndex::Last => write!(f, "{} (last match)", self.selector),
        }
    }
}

/// Axis-aligned bounding rectangle in page coordinates
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct BoundingBox {
    /// Left edge
    pub x: f64,
    /// Top edge
    pub y: f64,
    /// Width in pixels
    pub width: f64,
    /// Height in pixels
    pub height: f64,
}

impl BoundingBox {
    /// Create a new bounding box
    #[must_use]
    pub const fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Bottom edge coordinate
    #[must_use]
    pub fn bottom(&self) -> f64 {
        self.y + self.height
    }

    /// Rectangle spanning from the top of `self` down to the bottom of
    /// `lower`, keeping `self`'s horizontal extent. This is the clipped
    /// capture shape for long-scrolling report pages.
    #[must_use]
    pub fn span_to(&self, lower: &Self) -> Self {
        Self {
            x: self.x,
            y: self.y,
            width: self.width,
            height: lower.bottom() - self.y,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    mod selector_tests {
        use super::*;

        #[test]
        fn css_key_is_stable() {
            let a = Selector::css("div#performance");
            let b = Selector::css("div#performance");
            assert_eq!(a.key(), b.key());
        }

        #[test]
        fn text_filter_changes_key() {
            let plain = Selector::css("button");
            let filtered = Selector::css_with_text("button", "Ok, Got it.");
            assert_ne!(plain.key(), filtered.key());
        }

        #[test]
        fn display_names_the_text_filter() {
            let sel = Selector::css_with_text("div[role='button']", "Test live URL");
            let shown = sel.to_string();
            assert!(shown.contains("div[role='button']"));
            assert!(shown.contains("Test live URL"));
        }
    }

    mod match_index_tests {
        use super::*;

        #[test]
        fn first_needs_one_match() {
            assert_eq!(MatchIndex::First.resolve(0), None);
            assert_eq!(MatchIndex::First.resolve(3), Some(0));
        }

        #[test]
        fn nth_respects_count() {
            assert_eq!(MatchIndex::Nth(1).resolve(1), None);
            assert_eq!(MatchIndex::Nth(1).resolve(2), Some(1));
            assert_eq!(MatchIndex::Nth(1).expected_count(), 2);
        }

        #[test]
        fn last_picks_final_match() {
            assert_eq!(MatchIndex::Last.resolve(0), None);
            assert_eq!(MatchIndex::Last.resolve(4), Some(3));
        }
    }

    mod bounding_box_tests {
        use super::*;

        #[test]
        fn span_to_reaches_lower_bottom() {
            let anchor = BoundingBox::new(10.0, 100.0, 800.0, 50.0);
            let lower = BoundingBox::new(40.0, 700.0, 200.0, 30.0);
            let clip = anchor.span_to(&lower);
            assert_eq!(clip.x, 10.0);
            assert_eq!(clip.y, 100.0);
            assert_eq!(clip.width, 800.0);
            assert_eq!(clip.height, 630.0);
            assert_eq!(clip.bottom(), lower.bottom());
        }
    }

    mod locator_tests {
        use super::*;

        #[test]
        fn builder_sets_positional_index() {
            let tab = Locator::css_with_text("div[role='tab']", "screenshot").nth(1);
            assert_eq!(tab.index, MatchIndex::Nth(1));
            assert!(tab.to_string().contains("match #1"));
        }

        #[test]
        fn last_builder() {
            let panel = Locator::css("div[data-leave-open-on-resize]").last();
            assert_eq!(panel.index, MatchIndex::Last);
        }
    }
}
