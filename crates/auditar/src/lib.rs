//! Browser-driven SEO audit pipeline.
//!
//! Points a real Chrome/Chromium (over the DevTools protocol) at external
//! diagnostic surfaces for a configured list of pages and assembles the
//! evidence into a single markdown report:
//!
//! - **PageSpeed Insights**: the Lighthouse performance section, clipped
//!   between its landmark elements.
//! - **Search Console URL inspection**: the live mobile-friendliness test,
//!   including the rendered-page screenshot and resources panel.
//! - **JS on/off**: the page itself rendered with and without script
//!   execution.
//!
//! The building blocks layer bottom-up: [`locator`] and [`wait`] provide
//! bounded synchronization against racy third-party markup, [`capture`]
//! turns located landmarks into PNG artifacts, [`session`] persists the
//! authenticated state the inspection flow needs, the [`drivers`] encode
//! each tool's sequence, and [`runner`] walks pages and drivers in order
//! while isolating their failures from each other.
//!
//! Without the `browser` cargo feature the same API is backed by a
//! scriptable in-memory page, which is what the crate's own tests drive.
//!
//! ```no_run
//! use auditar::{
//!     Browser, BrowserConfig, MarkdownReport, PageSpec, RunConfig, Runner,
//! };
//!
//! # async fn run() -> auditar::AuditResult<()> {
//! let config = RunConfig::load(std::path::Path::new("audit.json"))?;
//! let browser = Browser::launch(BrowserConfig::default()).await?;
//! let mut report = MarkdownReport::create("report.md", "example.com").await?;
//! let summary = Runner::new(&browser, &config, &mut report).run().await?;
//! println!("{} results, {} failures", summary.results, summary.failures);
//! # Ok(())
//! # }
//! ```

pub mod browser;
pub mod capture;
pub mod config;
pub mod drivers;
pub mod locator;
pub mod report;
pub mod result;
pub mod runner;
pub mod session;
pub mod wait;

pub use browser::{Browser, BrowserConfig, ElementHandle, Page};
pub use config::{sanitize_label, DriverKind, PageSpec, RunConfig, SiteIdentity};
pub use drivers::{
    driver_for, AuditContext, Driver, InspectionDriver, JsToggleDriver, PagespeedDriver,
    TestResult,
};
pub use locator::{BoundingBox, Locator, MatchIndex, Selector};
pub use report::{MarkdownReport, MemoryReport, ReportSection, ReportSink};
pub use result::{AuditError, AuditResult};
pub use runner::{RunSummary, Runner};
pub use session::{
    ensure_authenticated, is_authenticated, CookieRecord, SessionStore, WELCOME_URL,
};
pub use wait::{click_when_ready, delay, wait_for_all, wait_for_visible, Timings};
