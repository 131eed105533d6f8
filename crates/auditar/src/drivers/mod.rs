//! Test drivers: one per external diagnostic surface.
//!
//! Each driver encodes one tool's navigation/wait/click sequence as a
//! sequential state machine and yields uniform [`TestResult`] records.
//! Third-party markup offers no uniqueness guarantees, so every DOM query a
//! driver makes goes through locators with explicit count/position handling,
//! and every external-surface wait carries a bounded timeout.

use std::path::PathBuf;

use async_trait::async_trait;

use crate::browser::Page;
use crate::config::{DriverKind, PageSpec, SiteIdentity};
use crate::result::AuditResult;
use crate::wait::Timings;

mod inspection;
mod js_toggle;
mod pagespeed;

pub use inspection::InspectionDriver;
pub use js_toggle::JsToggleDriver;
pub use pagespeed::PagespeedDriver;

/// Outcome of one driver invocation against one page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TestResult {
    /// Final URL after the external tool's own navigation/redirects
    pub test_url: String,
    /// Primary evidence; `None` when capture soft-failed
    pub screenshot_path: Option<PathBuf>,
    /// Auxiliary evidence, produced only by drivers that capture two views
    pub secondary_screenshot_path: Option<PathBuf>,
}

impl TestResult {
    /// Result with a single (possibly absent) artifact.
    #[must_use]
    pub fn new(test_url: impl Into<String>, screenshot_path: Option<PathBuf>) -> Self {
        Self {
            test_url: test_url.into(),
            screenshot_path,
            secondary_screenshot_path: None,
        }
    }

    /// Attach auxiliary evidence.
    #[must_use]
    pub fn with_secondary(mut self, path: Option<PathBuf>) -> Self {
        self.secondary_screenshot_path = path;
        self
    }
}

/// Run-scoped state threaded explicitly into every driver invocation.
///
/// Replaces what would otherwise be shared module state: the one-time
/// consent gate and the run-stable site identity both live here.
#[derive(Debug, Clone)]
pub struct AuditContext {
    /// Identity derived from the first configured URL, stable for the run
    pub site: SiteIdentity,
    /// Directory artifacts are written into
    pub screenshot_dir: PathBuf,
    /// All external-surface timeouts and settle delays
    pub timings: Timings,
    /// True only while the first configured page is being audited; gates
    /// one-time UI interactions such as consent dialogs
    pub first_page: bool,
}

impl AuditContext {
    /// Context at the start of a run.
    #[must_use]
    pub fn new(site: SiteIdentity, screenshot_dir: PathBuf) -> Self {
        Self {
            site,
            screenshot_dir,
            timings: Timings::default(),
            first_page: true,
        }
    }

    /// Replace the timing profile (tests compress it).
    #[must_use]
    pub fn with_timings(mut self, timings: Timings) -> Self {
        self.timings = timings;
        self
    }

    /// Artifact destination for a capture taken right now.
    #[must_use]
    pub fn artifact_path(&self, driver_tag: &str, page_type: &str) -> PathBuf {
        crate::capture::artifact_path(
            &self.screenshot_dir,
            &self.site.domain,
            driver_tag,
            page_type,
            &chrono::Utc::now(),
        )
    }
}

/// A driver for one external diagnostic surface.
#[async_trait]
pub trait Driver: Send + Sync {
    /// Which configured surface this driver implements
    fn kind(&self) -> DriverKind;

    /// Section title for report assembly
    fn title(&self) -> &'static str;

    /// Viewport this tool's layout expects
    fn viewport(&self) -> (u32, u32) {
        (1280, 800)
    }

    /// Execute the tool's sequence against one page.
    ///
    /// An `Err` is fatal to this invocation only; the orchestrator isolates
    /// it from other drivers and pages. Degraded evidence (missing optional
    /// affordances, failed captures) is `Ok` with `None` artifact paths.
    async fn run(
        &self,
        page: &Page,
        cx: &AuditContext,
        spec: &PageSpec,
    ) -> AuditResult<Vec<TestResult>>;
}

/// Instantiate the driver for a configured kind.
#[must_use]
pub fn driver_for(kind: DriverKind) -> Box<dyn Driver> {
    match kind {
        DriverKind::Pagespeed => Box::new(PagespeedDriver),
        DriverKind::Inspection => Box::new(InspectionDriver),
        DriverKind::JsToggle => Box::new(JsToggleDriver),
    }
}
