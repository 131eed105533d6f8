//! Search Console URL-inspection / mobile-friendliness driver.
//!
//! The longest sequence in the pipeline: navigate to the inspection console,
//! submit the URL, run a live test, open the tested-page view, then walk its
//! tabs capturing evidence. Each tab/panel step is independently
//! soft-failable; the report is assembled from whatever evidence was
//! obtainable.
//!
//! Tab and panel locators deliberately pick the second match: the console
//! renders each control twice and the actionable one observed in practice is
//! the latter. That is an assumption about external markup ordering, not a
//! contract; the wait primitives warn whenever the expected count is absent.

use async_trait::async_trait;
use tracing::info;

use crate::browser::Page;
use crate::capture::{capture_element, capture_full};
use crate::config::{DriverKind, PageSpec};
use crate::locator::Locator;
use crate::result::AuditResult;
use crate::wait::{click_when_ready, delay, wait_for_visible};

use super::{AuditContext, Driver, TestResult};

/// Inspection console endpoint; the run's resource id rides in the query.
pub const SEARCH_CONSOLE_URL: &str = "https://search.google.com/search-console?resource_id=";

const TAG: &str = "mobile-friendly";
const RESOURCES_TAG: &str = "mobile-friendly-page-resources";

/// Drives the Search Console URL inspection flow.
#[derive(Debug, Default, Clone, Copy)]
pub struct InspectionDriver;

#[async_trait]
impl Driver for InspectionDriver {
    fn kind(&self) -> DriverKind {
        DriverKind::Inspection
    }

    fn title(&self) -> &'static str {
        "Search Console URL Inspection"
    }

    fn viewport(&self) -> (u32, u32) {
        (1400, 1000)
    }

    async fn run(
        &self,
        page: &Page,
        cx: &AuditContext,
        spec: &PageSpec,
    ) -> AuditResult<Vec<TestResult>> {
        let t = &cx.timings;
        let console_url = format!(
            "{SEARCH_CONSOLE_URL}{}",
            urlencoding::encode(&cx.site.full_resource_id)
        );
        info!(url = %spec.url, page_type = %spec.page_type, "running URL inspection");
        page.goto(&console_url).await?;
        delay(t.nav_settle).await;

        // Submit the URL under audit into the inspection search field.
        let input = wait_for_visible(
            page,
            &Locator::css("input[aria-label='Inspect any URL in the current resource']"),
            t.landmark_timeout,
            t.poll_interval,
        )
        .await?;
        input.type_text(&spec.url).await?;
        delay(t.nav_settle).await;

        let search = wait_for_visible(
            page,
            &Locator::css("button[aria-label='Search']"),
            t.landmark_timeout,
            t.poll_interval,
        )
        .await?;
        search.click().await?;

        // The initial inspection has no client-observable completion signal;
        // a fixed long delay is the only synchronization available.
        delay(t.inspection_settle).await;

        let live_test = wait_for_visible(
            page,
            &Locator::css_with_text("div[role='button']", "Test live URL"),
            t.live_test_timeout,
            t.poll_interval,
        )
        .await?;
        live_test.click().await?;

        wait_for_visible(
            page,
            &Locator::css_with_text("div[role='button']", "Live test"),
            t.live_test_timeout,
            t.poll_interval,
        )
        .await?;
        delay(t.tab_settle).await;

        click_when_ready(
            page,
            &Locator::css_with_text("div[role='button']", "View tested page"),
            t.landmark_timeout,
            t.poll_interval,
        )
        .await;

        // Screenshot tab, second match.
        let screenshot_tab =
            Locator::css_with_text("div[role='tablist'] div[role='tab']", "screenshot").nth(1);
        if click_when_ready(page, &screenshot_tab, t.landmark_timeout, t.poll_interval).await {
            delay(t.tab_settle).await;
        }
        let dest = cx.artifact_path(TAG, &spec.page_type);
        let screenshot = capture_full(page, &dest, t).await;

        // More info tab, then the embedded page-resources panel, both second
        // match and both optional.
        let more_info = Locator::css_with_text("div[role='tab']", "more info").nth(1);
        if click_when_ready(page, &more_info, t.landmark_timeout, t.poll_interval).await {
            delay(t.tab_settle).await;
        }
        let resources_button =
            Locator::css_with_text("div[role='button']", "Page resources").nth(1);
        if click_when_ready(page, &resources_button, t.landmark_timeout, t.poll_interval).await {
            delay(t.tab_settle).await;
        }

        let resources_dest = cx.artifact_path(RESOURCES_TAG, &spec.page_type);
        let resources = capture_element(
            page,
            &Locator::css("div[data-leave-open-on-resize]").last(),
            &resources_dest,
            t,
        )
        .await;

        Ok(vec![
            TestResult::new(page.current_url().await, screenshot).with_secondary(resources)
        ])
    }
}
