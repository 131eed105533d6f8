//! PageSpeed Insights performance-report driver.
//!
//! Sequence: Navigate → await report (fatal on timeout: the report never
//! materialized) → dismiss consent once per run → await performance panel →
//! clipped capture → done.

use async_trait::async_trait;
use tracing::{debug, info};

use crate::browser::Page;
use crate::capture::capture_region;
use crate::config::{DriverKind, PageSpec};
use crate::locator::Locator;
use crate::result::AuditResult;
use crate::wait::{click_when_ready, wait_for_visible};

use super::{AuditContext, Driver, TestResult};

/// Analysis endpoint; the page URL under audit rides in the query string.
pub const PAGESPEED_ANALYSIS_URL: &str = "https://pagespeed.web.dev/analysis?url=";

/// Driver tag used in artifact filenames
const TAG: &str = "psi";

/// Drives pagespeed.web.dev and captures the performance section.
#[derive(Debug, Default, Clone, Copy)]
pub struct PagespeedDriver;

#[async_trait]
impl Driver for PagespeedDriver {
    fn kind(&self) -> DriverKind {
        DriverKind::Pagespeed
    }

    fn title(&self) -> &'static str {
        "PageSpeed Insights"
    }

    async fn run(
        &self,
        page: &Page,
        cx: &AuditContext,
        spec: &PageSpec,
    ) -> AuditResult<Vec<TestResult>> {
        let timings = &cx.timings;
        let analysis_url = format!("{PAGESPEED_ANALYSIS_URL}{}", urlencoding::encode(&spec.url));
        info!(url = %spec.url, page_type = %spec.page_type, "running PageSpeed analysis");
        page.goto(&analysis_url).await?;

        // The Lighthouse report is the whole point; without it there is
        // nothing to capture and this invocation fails.
        wait_for_visible(
            page,
            &Locator::css(".lh-report"),
            timings.report_timeout,
            timings.poll_interval,
        )
        .await?;

        // The consent dialog shows once per browser session; only the first
        // page of the run can encounter it.
        if cx.first_page {
            let consent = Locator::css_with_text("button", "Ok, Got it.");
            if click_when_ready(page, &consent, timings.landmark_timeout, timings.poll_interval)
                .await
            {
                debug!("dismissed consent dialog");
            }
        }

        let dest = cx.artifact_path(TAG, &spec.page_type);
        let screenshot = capture_region(
            page,
            &Locator::css("div#performance"),
            &Locator::css_with_text("span.lh-audit-group__title", "Opportunities"),
            &dest,
            timings,
        )
        .await;

        Ok(vec![TestResult::new(page.current_url().await, screenshot)])
    }
}

#[cfg(all(test, not(feature = "browser")))]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::browser::{Browser, BrowserConfig};
    use crate::config::SiteIdentity;
    use crate::locator::{BoundingBox, Selector};
    use crate::result::AuditError;
    use crate::wait::Timings;

    fn context(dir: &std::path::Path) -> AuditContext {
        let site = SiteIdentity {
            domain: "example.com".to_string(),
            full_resource_id: "https://example.com/".to_string(),
        };
        AuditContext::new(site, dir.to_path_buf()).with_timings(Timings::fast())
    }

    fn stage_report(browser: &Browser) {
        for selector in [
            Selector::css(".lh-report"),
            Selector::css("div#performance"),
        ] {
            browser.stage_elements(&selector, vec![BoundingBox::new(0.0, 100.0, 800.0, 400.0)]);
        }
        browser.stage_elements(
            &Selector::css_with_text("span.lh-audit-group__title", "Opportunities"),
            vec![BoundingBox::new(20.0, 900.0, 200.0, 24.0)],
        );
    }

    #[tokio::test]
    async fn produces_one_result_with_artifact_and_analysis_url() {
        let browser = Browser::launch(BrowserConfig::default()).await.unwrap();
        stage_report(&browser);
        let dir = tempfile::tempdir().unwrap();
        let cx = context(dir.path());
        let page = browser.new_page().await.unwrap();

        let results = PagespeedDriver
            .run(&page, &cx, &PageSpec::new("home", "https://example.com"))
            .await
            .unwrap();

        assert_eq!(results.len(), 1);
        assert!(results[0].test_url.contains("pagespeed.web.dev"));
        // The page URL rides percent-encoded in the query string.
        assert!(results[0]
            .test_url
            .ends_with("analysis?url=https%3A%2F%2Fexample.com"));
        assert!(results[0].screenshot_path.is_some());
        assert!(results[0].secondary_screenshot_path.is_none());
    }

    #[tokio::test]
    async fn report_that_never_materializes_is_fatal_to_the_invocation() {
        let browser = Browser::launch(BrowserConfig::default()).await.unwrap();
        let dir = tempfile::tempdir().unwrap();
        let cx = context(dir.path());
        let page = browser.new_page().await.unwrap();

        let err = PagespeedDriver
            .run(&page, &cx, &PageSpec::new("home", "https://example.com"))
            .await
            .unwrap_err();
        assert!(matches!(err, AuditError::Timeout { .. }));
    }

    #[tokio::test]
    async fn consent_is_only_clicked_on_the_first_page() {
        let browser = Browser::launch(BrowserConfig::default()).await.unwrap();
        stage_report(&browser);
        let consent = Selector::css_with_text("button", "Ok, Got it.");
        browser.stage_elements(&consent, vec![BoundingBox::new(0.0, 0.0, 80.0, 20.0)]);
        let dir = tempfile::tempdir().unwrap();
        let mut cx = context(dir.path());

        let page = browser.new_page().await.unwrap();
        PagespeedDriver
            .run(&page, &cx, &PageSpec::new("home", "https://example.com"))
            .await
            .unwrap();

        cx.first_page = false;
        let page = browser.new_page().await.unwrap();
        PagespeedDriver
            .run(&page, &cx, &PageSpec::new("pricing", "https://example.com/pricing"))
            .await
            .unwrap();

        let consent_clicks: Vec<_> = browser
            .clicks()
            .into_iter()
            .filter(|c| c.starts_with(&consent.key()))
            .collect();
        assert_eq!(consent_clicks.len(), 1);
    }

    #[tokio::test]
    async fn missing_capture_landmark_degrades_to_none() {
        let browser = Browser::launch(BrowserConfig::default()).await.unwrap();
        // Report renders but the performance panel never becomes visible.
        browser.stage_elements(
            &Selector::css(".lh-report"),
            vec![BoundingBox::new(0.0, 0.0, 800.0, 400.0)],
        );
        let dir = tempfile::tempdir().unwrap();
        let cx = context(dir.path());
        let page = browser.new_page().await.unwrap();

        let results = PagespeedDriver
            .run(&page, &cx, &PageSpec::new("home", "https://example.com"))
            .await
            .unwrap();
        assert_eq!(results.len(), 1);
        assert!(results[0].screenshot_path.is_none());
    }
}
