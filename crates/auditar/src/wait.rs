//! Wait and interaction primitives.
//!
//! Every higher stage synchronizes against partial, racy page state through
//! these helpers: bounded element waits, wait-then-click with soft-failure
//! semantics, and fixed settle delays for transitions that expose no
//! completion signal.

use std::time::{Duration, Instant};

use tracing::warn;

use crate::browser::{ElementHandle, Page};
use crate::locator::{Locator, DEFAULT_POLL_INTERVAL_MS, DEFAULT_TIMEOUT_MS};
use crate::result::{AuditError, AuditResult};

/// Every external-surface timeout and settle delay of a run, threaded
/// explicitly through the audit context so nothing hides in module state and
/// tests can compress the clock.
#[derive(Debug, Clone)]
pub struct Timings {
    /// Polling interval for element waits
    pub poll_interval: Duration,
    /// Budget for landmark elements and optional affordances
    pub landmark_timeout: Duration,
    /// Budget for the PageSpeed report to materialize
    pub report_timeout: Duration,
    /// Budget for the Search Console live test round-trip
    pub live_test_timeout: Duration,
    /// Fixed delay after submitting a URL inspection; the console exposes no
    /// client-observable completion signal for this phase
    pub inspection_settle: Duration,
    /// Settle delay after switching tabs/panels
    pub tab_settle: Duration,
    /// Settle delay before measuring geometry or capturing pixels
    pub capture_settle: Duration,
    /// Short settle after navigation before typing into fresh inputs
    pub nav_settle: Duration,
    /// Total budget for the interactive login fallback
    pub login_timeout: Duration,
    /// How often to re-check authentication during interactive login
    pub login_poll: Duration,
}

impl Default for Timings {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_millis(DEFAULT_POLL_INTERVAL_MS),
            landmark_timeout: Duration::from_millis(DEFAULT_TIMEOUT_MS),
            report_timeout: Duration::from_secs(60),
            live_test_timeout: Duration::from_secs(120),
            inspection_settle: Duration::from_secs(20),
            tab_settle: Duration::from_secs(2),
            capture_settle: Duration::from_millis(1500),
            nav_settle: Duration::from_secs(1),
            login_timeout: Duration::from_secs(300),
            login_poll: Duration::from_secs(5),
        }
    }
}

impl Timings {
    /// Production timings
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Compressed timings for staged-browser tests: identical structure,
    /// millisecond budgets.
    #[must_use]
    pub fn fast() -> Self {
        Self {
            poll_interval: Duration::from_millis(2),
            landmark_timeout: Duration::from_millis(40),
            report_timeout: Duration::from_millis(40),
            live_test_timeout: Duration::from_millis(40),
            inspection_settle: Duration::from_millis(1),
            tab_settle: Duration::from_millis(1),
            capture_settle: Duration::from_millis(1),
            nav_settle: Duration::from_millis(1),
            login_timeout: Duration::from_millis(60),
            login_poll: Duration::from_millis(5),
        }
    }
}

/// Yield for a fixed duration to let client-side animation/layout settle.
///
/// Only used where the external page exposes no observable completion event;
/// prefer [`wait_for_visible`] wherever a DOM signal exists.
pub async fn delay(duration: Duration) {
    tokio::time::sleep(duration).await;
}

/// Poll until at least one visible element matches the locator's selector,
/// then return all matches. Warns (does not fail) when fewer matches exist at
/// the deadline than the locator's position expects.
pub async fn wait_for_all(
    page: &Page,
    locator: &Locator,
    timeout: Duration,
    poll: Duration,
) -> AuditResult<Vec<ElementHandle>> {
    let expected = locator.index.expected_count();
    let start = Instant::now();

    loop {
        let handles = page.find_all(&locator.selector).await?;
        if handles.len() >= expected {
            return Ok(handles);
        }
        if start.elapsed() >= timeout {
            if handles.is_empty() {
                return Err(AuditError::Timeout {
                    what: locator.to_string(),
                    ms: timeout.as_millis() as u64,
                });
            }
            // The page reuses this markup less than we assumed; positional
            // selection cannot be satisfied.
            warn!(
                locator = %locator,
                found = handles.len(),
                expected,
                "fewer matches than the locator position expects"
            );
            return Err(AuditError::ElementNotFound {
                what: locator.to_string(),
            });
        }
        tokio::time::sleep(poll).await;
    }
}

/// Poll until the locator's selected match is present and visible.
pub async fn wait_for_visible(
    page: &Page,
    locator: &Locator,
    timeout: Duration,
    poll: Duration,
) -> AuditResult<ElementHandle> {
    let mut handles = wait_for_all(page, locator, timeout, poll).await?;
    let count = handles.len();
    locator
        .index
        .resolve(count)
        .map(|i| handles.swap_remove(i))
        .ok_or_else(|| AuditError::ElementNotFound {
            what: locator.to_string(),
        })
}

/// Wait for the locator's match and click it.
///
/// A miss is a warning-level soft failure returning `false`: many UI
/// affordances (cookie banners, optional dialogs, repeated tabs) are not
/// guaranteed to appear, and their absence must not abort the calling driver.
pub async fn click_when_ready(
    page: &Page,
    locator: &Locator,
    timeout: Duration,
    poll: Duration,
) -> bool {
    match wait_for_visible(page, locator, timeout, poll).await {
        Ok(handle) => match handle.click().await {
            Ok(()) => true,
            Err(error) => {
                warn!(locator = %locator, %error, "element found but click failed");
                false
            }
        },
        Err(error) => {
            warn!(locator = %locator, %error, "optional element not clicked");
            false
        }
    }
}
