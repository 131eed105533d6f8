//! JS on/off comparison driver.
//!
//! Loads the page under audit twice, first with script execution enabled and
//! then with it disabled, capturing both renderings so the report shows what
//! the page degrades to without JavaScript. Yields two results per page.

use async_trait::async_trait;
use tracing::info;

use crate::browser::Page;
use crate::capture::capture_full;
use crate::config::{DriverKind, PageSpec};
use crate::result::AuditResult;
use crate::wait::delay;

use super::{AuditContext, Driver, TestResult};

const TAG_ON: &str = "js-on";
const TAG_OFF: &str = "js-off";

/// Compares the page with and without script execution.
#[derive(Debug, Default, Clone, Copy)]
pub struct JsToggleDriver;

#[async_trait]
impl Driver for JsToggleDriver {
    fn kind(&self) -> DriverKind {
        DriverKind::JsToggle
    }

    fn title(&self) -> &'static str {
        "JavaScript On/Off"
    }

    async fn run(
        &self,
        page: &Page,
        cx: &AuditContext,
        spec: &PageSpec,
    ) -> AuditResult<Vec<TestResult>> {
        let t = &cx.timings;
        info!(url = %spec.url, page_type = %spec.page_type, "comparing JS on/off renderings");

        page.goto(&spec.url).await?;
        let on_dest = cx.artifact_path(TAG_ON, &spec.page_type);
        let on_shot = capture_full(page, &on_dest, t).await;
        let on_url = page.current_url().await;

        // Disabling script execution only affects subsequent loads.
        page.set_javascript_enabled(false).await?;
        page.goto(&spec.url).await?;
        delay(t.nav_settle).await;
        let off_dest = cx.artifact_path(TAG_OFF, &spec.page_type);
        let off_shot = capture_full(page, &off_dest, t).await;

        Ok(vec![
            TestResult::new(on_url, on_shot),
            TestResult::new(page.current_url().await, off_shot),
        ])
    }
}

#[cfg(all(test, not(feature = "browser")))]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::browser::{Browser, BrowserConfig};
    use crate::config::SiteIdentity;
    use crate::wait::Timings;

    fn context(dir: &std::path::Path) -> AuditContext {
        let site = SiteIdentity {
            domain: "example.com".to_string(),
            full_resource_id: "https://example.com/".to_string(),
        };
        AuditContext::new(site, dir.to_path_buf()).with_timings(Timings::fast())
    }

    #[tokio::test]
    async fn yields_two_results_and_disables_scripts_for_the_second() {
        let browser = Browser::launch(BrowserConfig::default()).await.unwrap();
        let dir = tempfile::tempdir().unwrap();
        let cx = context(dir.path());
        let page = browser.new_page().await.unwrap();

        let results = JsToggleDriver
            .run(&page, &cx, &PageSpec::new("home", "https://example.com"))
            .await
            .unwrap();

        assert_eq!(results.len(), 2);
        assert!(results.iter().all(|r| r.screenshot_path.is_some()));
        assert!(results.iter().all(|r| r.test_url == "https://example.com"));
        assert!(!page.javascript_enabled());

        // The two artifacts are distinct files.
        assert_ne!(results[0].screenshot_path, results[1].screenshot_path);
    }

    #[tokio::test]
    async fn navigation_failure_is_fatal_to_the_invocation() {
        let browser = Browser::launch(BrowserConfig::default()).await.unwrap();
        browser.fail_navigation("example.com");
        let dir = tempfile::tempdir().unwrap();
        let cx = context(dir.path());
        let page = browser.new_page().await.unwrap();

        let err = JsToggleDriver
            .run(&page, &cx, &PageSpec::new("home", "https://example.com"))
            .await
            .unwrap_err();
        assert!(matches!(err, crate::result::AuditError::Navigation { .. }));
    }
}
