//! Sequential audit orchestrator.
//!
//! Runs the configured drivers over the configured pages in order, one
//! driver at a time on a fresh browsing context, and appends every result
//! to the report sink. A failing driver invocation is logged and counted
//! but never aborts the rest of the run; only browser launch and
//! configuration problems are fatal, and those happen before the loop
//! starts.

use tracing::{info, warn};

use crate::browser::Browser;
use crate::config::{RunConfig, SiteIdentity};
use crate::drivers::{driver_for, AuditContext};
use crate::report::{ReportSection, ReportSink};
use crate::result::AuditResult;
use crate::wait::Timings;

/// Tally of a completed run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RunSummary {
    /// Pages audited
    pub pages: usize,
    /// Report sections produced
    pub results: usize,
    /// Driver invocations that ended in an error
    pub failures: usize,
}

/// Drives the page-by-page, driver-by-driver audit loop.
pub struct Runner<'a, S: ReportSink> {
    browser: &'a Browser,
    config: &'a RunConfig,
    sink: &'a mut S,
    timings: Timings,
}

impl<S: ReportSink> std::fmt::Debug for Runner<'_, S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Runner")
            .field("config", &self.config)
            .field("timings", &self.timings)
            .finish_non_exhaustive()
    }
}

impl<'a, S: ReportSink> Runner<'a, S> {
    /// Orchestrator over an already launched browser and an open sink.
    pub fn new(browser: &'a Browser, config: &'a RunConfig, sink: &'a mut S) -> Self {
        Self {
            browser,
            config,
            sink,
            timings: Timings::default(),
        }
    }

    /// Replace the timing profile (tests compress it).
    #[must_use]
    pub fn with_timings(mut self, timings: Timings) -> Self {
        self.timings = timings;
        self
    }

    /// Run every configured driver against every configured page, in order.
    ///
    /// Pages are the outer loop, matching how results group in the report.
    pub async fn run(&mut self) -> AuditResult<RunSummary> {
        let first = self
            .config
            .pages
            .first()
            .ok_or_else(|| crate::result::AuditError::Config {
                message: "page list is empty".to_string(),
            })?;
        let site = SiteIdentity::from_url(&first.url)?;
        let mut cx = AuditContext::new(site, self.config.screenshot_dir())
            .with_timings(self.timings.clone());

        let mut summary = RunSummary::default();
        for spec in &self.config.pages {
            info!(page_type = %spec.page_type, url = %spec.url, "auditing page");
            for kind in &self.config.drivers {
                let driver = driver_for(*kind);
                let page = self.browser.new_page().await?;
                let (width, height) = driver.viewport();
                if let Err(e) = page.set_viewport(width, height).await {
                    warn!(error = %e, "viewport override failed, using browser default");
                }

                let outcome = driver.run(&page, &cx, spec).await;
                if let Err(e) = page.close().await {
                    warn!(error = %e, "failed to close page after driver run");
                }

                match outcome {
                    Ok(results) => {
                        for result in results {
                            let section = ReportSection::from_result(
                                driver.title(),
                                &spec.page_type,
                                &spec.url,
                                result,
                            );
                            // A sink that cannot take a section loses that
                            // section only; the evidence files are already on
                            // disk and the rest of the run still has value.
                            match self.sink.append(&section).await {
                                Ok(()) => summary.results += 1,
                                Err(e) => {
                                    warn!(
                                        page_type = %spec.page_type,
                                        driver = driver.title(),
                                        error = %e,
                                        "report append failed; section dropped"
                                    );
                                    summary.failures += 1;
                                }
                            }
                        }
                    }
                    Err(e) => {
                        warn!(
                            page_type = %spec.page_type,
                            driver = driver.title(),
                            error = %e,
                            "driver failed; continuing with the rest of the run"
                        );
                        summary.failures += 1;
                    }
                }
            }
            cx.first_page = false;
            summary.pages += 1;
        }

        info!(
            pages = summary.pages,
            results = summary.results,
            failures = summary.failures,
            "audit run complete"
        );
        Ok(summary)
    }
}
