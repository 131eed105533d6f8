//! Evidence capture: landmark-anchored screenshot artifacts.
//!
//! The diagnostic pages are long-scrolling reports with no single "card"
//! boundary, so captures are clipped between landmark elements rather than
//! taken of the whole viewport. Capture never raises past the driver
//! boundary: a missing landmark logs a warning and yields `None`, and report
//! assembly renders whatever evidence was obtainable.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use tracing::{info, warn};

use crate::browser::Page;
use crate::config::sanitize_label;
use crate::locator::Locator;
use crate::wait::{delay, wait_for_visible, Timings};

/// Build the artifact path `{domain}_{driverTag}_{sanitizedPageType}_{timestamp}.png`.
///
/// Timestamps are second-granularity: the driver/page discriminators make
/// collisions across drivers impossible, but two captures for the same page
/// and driver within the same second would collide. Runs capture each page
/// once per driver tag, so this stays a documented risk rather than a
/// handled case.
#[must_use]
pub fn artifact_path(
    dir: &Path,
    domain: &str,
    driver_tag: &str,
    page_type: &str,
    timestamp: &DateTime<Utc>,
) -> PathBuf {
    let stamp = timestamp.format("%Y-%m-%dT%H_%M_%S");
    dir.join(format!(
        "{domain}_{driver_tag}_{}_{stamp}.png",
        sanitize_label(page_type)
    ))
}

/// Capture the region spanning from the top of `anchor` to the bottom of
/// `lower`. Returns `None` (no artifact) when either landmark is missing or
/// the capture itself fails.
pub async fn capture_region(
    page: &Page,
    anchor: &Locator,
    lower: &Locator,
    dest: &Path,
    timings: &Timings,
) -> Option<PathBuf> {
    let anchor_el = match wait_for_visible(page, anchor, timings.landmark_timeout, timings.poll_interval).await {
        Ok(el) => el,
        Err(error) => {
            warn!(landmark = %anchor, %error, "capture skipped: content anchor missing");
            return None;
        }
    };
    let lower_el = match wait_for_visible(page, lower, timings.landmark_timeout, timings.poll_interval).await {
        Ok(el) => el,
        Err(error) => {
            warn!(landmark = %lower, %error, "capture skipped: lower boundary missing");
            return None;
        }
    };

    // Let entrance animations finish before measuring geometry; the report
    // widgets animate in and expose no completion event.
    delay(timings.capture_settle).await;

    let clip = match (anchor_el.bounding_box().await, lower_el.bounding_box().await) {
        (Ok(top), Ok(bottom)) => top.span_to(&bottom),
        (Err(error), _) | (_, Err(error)) => {
            warn!(%error, "capture skipped: landmark has no geometry");
            return None;
        }
    };

    match page.screenshot_to_file(Some(clip), dest).await {
        Ok(()) => {
            info!(path = %dest.display(), "screenshot saved");
            Some(dest.to_path_buf())
        }
        Err(error) => {
            warn!(path = %dest.display(), %error, "screenshot failed");
            None
        }
    }
}

/// Capture the full viewport after a settle delay.
pub async fn capture_full(page: &Page, dest: &Path, timings: &Timings) -> Option<PathBuf> {
    delay(timings.capture_settle).await;
    match page.screenshot_to_file(None, dest).await {
        Ok(()) => {
            info!(path = %dest.display(), "screenshot saved");
            Some(dest.to_path_buf())
        }
        Err(error) => {
            warn!(path = %dest.display(), %error, "screenshot failed");
            None
        }
    }
}

/// Capture a single located element (an embedded panel rather than the whole
/// viewport). Soft-fails to `None` like the other captures.
pub async fn capture_element(
    page: &Page,
    locator: &Locator,
    dest: &Path,
    timings: &Timings,
) -> Option<PathBuf> {
    let element = match wait_for_visible(page, locator, timings.landmark_timeout, timings.poll_interval).await {
        Ok(el) => el,
        Err(error) => {
            warn!(landmark = %locator, %error, "capture skipped: element missing");
            return None;
        }
    };
    delay(timings.capture_settle).await;
    let clip = match element.bounding_box().await {
        Ok(rect) => rect,
        Err(error) => {
            warn!(landmark = %locator, %error, "capture skipped: element has no geometry");
            return None;
        }
    };
    match page.screenshot_to_file(Some(clip), dest).await {
        Ok(()) => {
            info!(path = %dest.display(), "screenshot saved");
            Some(dest.to_path_buf())
        }
        Err(error) => {
            warn!(path = %dest.display(), %error, "screenshot failed");
            None
        }
    }
}
