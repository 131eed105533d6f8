//! Browser control for interactive audit sessions.
//!
//! With the `browser` feature this drives a real Chrome/Chromium over the
//! Chrome DevTools Protocol via chromiumoxide. Without the feature a
//! scriptable in-memory page stands in, so drivers and the orchestrator can
//! be exercised anywhere.
//!
//! Audits run headful by default: the Search Console flow needs a visible
//! window for the one-time interactive login.

use crate::locator::{BoundingBox, Selector};
use crate::result::{AuditError, AuditResult};
use crate::session::CookieRecord;

/// Browser configuration
#[derive(Debug, Clone)]
pub struct BrowserConfig {
    /// Run without a visible window (breaks interactive login)
    pub headless: bool,
    /// Default viewport width
    pub viewport_width: u32,
    /// Default viewport height
    pub viewport_height: u32,
    /// Path to the Chrome/Chromium binary (None = auto-detect)
    pub chrome_path: Option<String>,
    /// Start with a fresh incognito profile
    pub incognito: bool,
}

impl Default for BrowserConfig {
    fn default() -> Self {
        Self {
            headless: false,
            viewport_width: 1280,
            viewport_height: 800,
            chrome_path: None,
            incognito: true,
        }
    }
}

impl BrowserConfig {
    /// Set viewport dimensions
    #[must_use]
    pub const fn with_viewport(mut self, width: u32, height: u32) -> Self {
        self.viewport_width = width;
        self.viewport_height = height;
        self
    }

    /// Set headless mode
    #[must_use]
    pub const fn with_headless(mut self, headless: bool) -> Self {
        self.headless = headless;
        self
    }

    /// Set the browser binary path
    #[must_use]
    pub fn with_chrome_path(mut self, path: impl Into<String>) -> Self {
        self.chrome_path = Some(path.into());
        self
    }
}

// ============================================================================
// Real CDP implementation (when `browser` feature is enabled)
// ============================================================================

#[cfg(feature = "browser")]
mod cdp {
    use super::*;
    use chromiumoxide::browser::{Browser as CdpBrowser, BrowserConfig as CdpConfig};
    use chromiumoxide::cdp::browser_protocol::emulation::{
        SetDeviceMetricsOverrideParams, SetScriptExecutionDisabledParams,
    };
    use chromiumoxide::cdp::browser_protocol::network::CookieParam;
    use chromiumoxide::cdp::browser_protocol::page::{
        CaptureScreenshotFormat, CaptureScreenshotParams, Viewport,
    };
    use chromiumoxide::page::Page as CdpPage;
    use futures::StreamExt;
    use std::path::Path;
    use std::sync::Arc;
    use tokio::sync::Mutex;

    fn page_err(e: impl std::fmt::Display) -> AuditError {
        AuditError::Page {
            message: e.to_string(),
        }
    }

    /// Browser instance with a live CDP connection
    #[derive(Debug)]
    pub struct Browser {
        config: BrowserConfig,
        inner: Arc<Mutex<CdpBrowser>>,
        #[allow(dead_code)]
        handle: tokio::task::JoinHandle<()>,
    }

    impl Browser {
        /// Launch the browser process. Failure here is fatal to the run.
        pub async fn launch(config: BrowserConfig) -> AuditResult<Self> {
            let mut builder =
                CdpConfig::builder().window_size(config.viewport_width, config.viewport_height);

            if !config.headless {
                builder = builder.with_head();
            }
            if config.incognito {
                builder = builder.arg("--incognito");
            }
            if let Some(ref path) = config.chrome_path {
                builder = builder.chrome_executable(path);
            }

            let cdp_config = builder.build().map_err(|e| AuditError::BrowserLaunch {
                message: e.to_string(),
            })?;

            let (browser, mut handler) =
                CdpBrowser::launch(cdp_config)
                    .await
                    .map_err(|e| AuditError::BrowserLaunch {
                        message: e.to_string(),
                    })?;

            // Drive the CDP event stream until the browser goes away
            let handle = tokio::spawn(async move {
                while let Some(h) = handler.next().await {
                    if h.is_err() {
                        break;
                    }
                }
            });

            Ok(Self {
                config,
                inner: Arc::new(Mutex::new(browser)),
                handle,
            })
        }

        /// Open a fresh page (one isolated browsing context per driver run)
        pub async fn new_page(&self) -> AuditResult<Page> {
            let browser = self.inner.lock().await;
            let cdp_page = browser.new_page("about:blank").await.map_err(page_err)?;
            Ok(Page {
                last_url: std::sync::Mutex::new(String::from("about:blank")),
                inner: Arc::new(Mutex::new(cdp_page)),
            })
        }

        /// Get the browser configuration
        #[must_use]
        pub const fn config(&self) -> &BrowserConfig {
            &self.config
        }

        /// Close the browser process
        pub async fn close(self) -> AuditResult<()> {
            let mut browser = self.inner.lock().await;
            browser.close().await.map_err(page_err)?;
            Ok(())
        }
    }

    /// A browser page backed by a CDP target
    #[derive(Debug)]
    pub struct Page {
        last_url: std::sync::Mutex<String>,
        inner: Arc<Mutex<CdpPage>>,
    }

    impl Page {
        /// Navigate and wait for the load to settle.
        pub async fn goto(&self, url: &str) -> AuditResult<()> {
            let nav_err = |e: chromiumoxide::error::CdpError| AuditError::Navigation {
                url: url.to_string(),
                message: e.to_string(),
            };
            {
                let page = self.inner.lock().await;
                page.goto(url).await.map_err(nav_err)?;
                page.wait_for_navigation().await.map_err(nav_err)?;
            }
            if let Ok(mut last) = self.last_url.lock() {
                *last = url.to_string();
            }
            Ok(())
        }

        /// Current URL after any redirects the external tool performed.
        pub async fn current_url(&self) -> String {
            let page = self.inner.lock().await;
            if let Ok(Some(url)) = page.url().await {
                return url;
            }
            drop(page);
            self.last_url
                .lock()
                .map(|u| u.clone())
                .unwrap_or_default()
        }

        /// Override viewport metrics for this page.
        pub async fn set_viewport(&self, width: u32, height: u32) -> AuditResult<()> {
            let params = SetDeviceMetricsOverrideParams::builder()
                .width(i64::from(width))
                .height(i64::from(height))
                .device_scale_factor(1.0)
                .mobile(false)
                .build()
                .map_err(page_err)?;
            let page = self.inner.lock().await;
            page.execute(params).await.map_err(page_err)?;
            Ok(())
        }

        /// Resolve all currently visible elements matching the selector, in
        /// document order. Zero matches is a normal outcome on third-party
        /// markup, never an error.
        pub async fn find_all(&self, selector: &Selector) -> AuditResult<Vec<ElementHandle>> {
            let (css, text) = match selector {
                Selector::Css(css) => (css.clone(), None),
                Selector::CssWithText { css, text } => (css.clone(), Some(text.clone())),
            };
            // Tag matches with a scratch attribute so they can be picked up
            // as plain CSS below; CDP has no first-class text selector.
            let expr = format!(
                r"(() => {{
                    const css = {css_json};
                    const text = {text_json};
                    for (const el of document.querySelectorAll('[data-auditar-hit]')) {{
                        el.removeAttribute('data-auditar-hit');
                    }}
                    const visible = el => {{
                        const r = el.getBoundingClientRect();
                        return r.width > 0 && r.height > 0;
                    }};
                    let els = Array.from(document.querySelectorAll(css)).filter(visible);
                    if (text !== null) {{
                        els = els.filter(el => (el.textContent || '').includes(text));
                    }}
                    els.forEach((el, i) => el.setAttribute('data-auditar-hit', String(i)));
                    return els.length;
                }})()",
                css_json = serde_json::to_string(&css)?,
                text_json = serde_json::to_string(&text)?,
            );

            let page = self.inner.lock().await;
            let count: usize = page
                .evaluate(expr)
                .await
                .map_err(page_err)?
                .into_value()
                .map_err(page_err)?;

            let mut handles = Vec::with_capacity(count);
            for i in 0..count {
                let element = page
                    .find_element(format!("[data-auditar-hit=\"{i}\"]"))
                    .await
                    .map_err(page_err)?;
                handles.push(ElementHandle {
                    inner: element,
                    page: Arc::clone(&self.inner),
                    hit_index: i,
                    description: format!("{selector} #{i}"),
                });
            }
            Ok(handles)
        }

        /// Capture the page (optionally clipped to a region) to a PNG file.
        pub async fn screenshot_to_file(
            &self,
            clip: Option<BoundingBox>,
            path: &Path,
        ) -> AuditResult<()> {
            let shot_err = |message: String| AuditError::Screenshot { message };

            let mut builder = CaptureScreenshotParams::builder().format(CaptureScreenshotFormat::Png);
            if let Some(region) = clip {
                builder = builder
                    .clip(Viewport {
                        x: region.x,
                        y: region.y,
                        width: region.width,
                        height: region.height,
                        scale: 1.0,
                    })
                    .capture_beyond_viewport(true);
            }
            let params = builder.build();

            let page = self.inner.lock().await;
            let reply = page
                .execute(params)
                .await
                .map_err(|e| shot_err(e.to_string()))?;

            use base64::Engine;
            let data_b64: &str = reply.data.as_ref();
            let bytes = base64::engine::general_purpose::STANDARD
                .decode(data_b64.as_bytes())
                .map_err(|e| shot_err(e.to_string()))?;
            tokio::fs::write(path, bytes).await?;
            Ok(())
        }

        /// Toggle script execution for subsequent loads in this page.
        pub async fn set_javascript_enabled(&self, enabled: bool) -> AuditResult<()> {
            let params = SetScriptExecutionDisabledParams::builder()
                .value(!enabled)
                .build()
                .map_err(page_err)?;
            let page = self.inner.lock().await;
            page.execute(params).await.map_err(page_err)?;
            Ok(())
        }

        /// Read the session's cookie jar.
        pub async fn cookies(&self) -> AuditResult<Vec<CookieRecord>> {
            let page = self.inner.lock().await;
            let cookies = page.get_cookies().await.map_err(page_err)?;
            // CDP cookie shapes share field names with CookieRecord
            let records = serde_json::from_value(serde_json::to_value(cookies)?)?;
            Ok(records)
        }

        /// Install a previously persisted cookie set.
        pub async fn set_cookies(&self, records: Vec<CookieRecord>) -> AuditResult<()> {
            let params: Vec<CookieParam> =
                serde_json::from_value(serde_json::to_value(records)?)?;
            let page = self.inner.lock().await;
            page.set_cookies(params).await.map_err(page_err)?;
            Ok(())
        }

        /// Close this page's browsing context.
        pub async fn close(self) -> AuditResult<()> {
            let page = self.inner.lock().await;
            page.clone().close().await.map_err(page_err)?;
            Ok(())
        }
    }

    /// Opaque handle to a located DOM element
    #[derive(Debug)]
    pub struct ElementHandle {
        inner: chromiumoxide::element::Element,
        page: Arc<Mutex<CdpPage>>,
        hit_index: usize,
        description: String,
    }

    impl ElementHandle {
        /// Bounding rectangle in page coordinates.
        ///
        /// Valid until the next [`Page::find_all`] re-tags the document.
        pub async fn bounding_box(&self) -> AuditResult<BoundingBox> {
            let expr = format!(
                r#"(() => {{
                    const el = document.querySelector('[data-auditar-hit="{i}"]');
                    if (!el) return null;
                    const r = el.getBoundingClientRect();
                    return {{ x: r.x + window.scrollX, y: r.y + window.scrollY,
                              width: r.width, height: r.height }};
                }})()"#,
                i = self.hit_index
            );
            let page = self.page.lock().await;
            let rect: Option<BoundingBox> = page
                .evaluate(expr)
                .await
                .map_err(page_err)?
                .into_value()
                .map_err(page_err)?;
            rect.ok_or_else(|| AuditError::ElementNotFound {
                what: format!("{} has no geometry", self.description),
            })
        }

        /// Scroll into view and click.
        pub async fn click(&self) -> AuditResult<()> {
            self.inner.scroll_into_view().await.map_err(page_err)?;
            self.inner.click().await.map_err(page_err)?;
            Ok(())
        }

        /// Focus the element and type text into it.
        pub async fn type_text(&self, text: &str) -> AuditResult<()> {
            self.inner.click().await.map_err(page_err)?;
            self.inner.type_str(text).await.map_err(page_err)?;
            Ok(())
        }
    }
}

// ============================================================================
// Scriptable mock (when `browser` feature is NOT enabled)
// ============================================================================

#[cfg(not(feature = "browser"))]
mod mock {
    use super::*;
    use std::collections::HashMap;
    use std::path::Path;
    use std::sync::{Arc, Mutex};

    /// Staged page content shared by every page of the mock browser.
    #[derive(Debug, Default)]
    struct Script {
        /// selector key -> visible element rectangles, in document order
        dom: HashMap<String, Vec<BoundingBox>>,
        /// URL substrings whose navigation fails
        nav_failures: Vec<String>,
    }

    #[derive(Debug, Default)]
    struct PageState {
        url: String,
        js_enabled: bool,
        cookies: Vec<CookieRecord>,
    }

    /// Browser instance driving staged in-memory pages
    #[derive(Debug)]
    pub struct Browser {
        config: BrowserConfig,
        script: Arc<Mutex<Script>>,
        clicks: Arc<Mutex<Vec<String>>>,
        typed: Arc<Mutex<Vec<(String, String)>>>,
    }

    impl Browser {
        /// "Launch" the staged browser.
        pub async fn launch(config: BrowserConfig) -> AuditResult<Self> {
            Ok(Self {
                config,
                script: Arc::new(Mutex::new(Script::default())),
                clicks: Arc::new(Mutex::new(Vec::new())),
                typed: Arc::new(Mutex::new(Vec::new())),
            })
        }

        /// Open a fresh page sharing the staged content.
        pub async fn new_page(&self) -> AuditResult<Page> {
            Ok(Page {
                script: Arc::clone(&self.script),
                clicks: Arc::clone(&self.clicks),
                typed: Arc::clone(&self.typed),
                state: Arc::new(Mutex::new(PageState {
                    url: String::from("about:blank"),
                    js_enabled: true,
                    cookies: Vec::new(),
                })),
            })
        }

        /// Get the browser configuration
        #[must_use]
        pub const fn config(&self) -> &BrowserConfig {
            &self.config
        }

        /// Close the browser
        pub async fn close(self) -> AuditResult<()> {
            Ok(())
        }

        /// Stage elements every page will report for the selector.
        pub fn stage_elements(&self, selector: &Selector, boxes: Vec<BoundingBox>) {
            if let Ok(mut script) = self.script.lock() {
                script.dom.insert(selector.key(), boxes);
            }
        }

        /// Make navigation fail for URLs containing the substring.
        pub fn fail_navigation(&self, url_substring: impl Into<String>) {
            if let Ok(mut script) = self.script.lock() {
                script.nav_failures.push(url_substring.into());
            }
        }

        /// Click log across all pages: `"<selector key>#<index>"` entries.
        #[must_use]
        pub fn clicks(&self) -> Vec<String> {
            self.clicks.lock().map(|c| c.clone()).unwrap_or_default()
        }

        /// Text typed into elements across all pages.
        #[must_use]
        pub fn typed(&self) -> Vec<(String, String)> {
            self.typed.lock().map(|t| t.clone()).unwrap_or_default()
        }
    }

    /// A staged in-memory page
    #[derive(Debug)]
    pub struct Page {
        script: Arc<Mutex<Script>>,
        clicks: Arc<Mutex<Vec<String>>>,
        typed: Arc<Mutex<Vec<(String, String)>>>,
        state: Arc<Mutex<PageState>>,
    }

    impl Page {
        /// Navigate to a URL (fails when staged to fail).
        pub async fn goto(&self, url: &str) -> AuditResult<()> {
            let fails = self
                .script
                .lock()
                .map(|s| s.nav_failures.iter().any(|frag| url.contains(frag)))
                .unwrap_or(false);
            if fails {
                return Err(AuditError::Navigation {
                    url: url.to_string(),
                    message: "staged navigation failure".to_string(),
                });
            }
            if let Ok(mut state) = self.state.lock() {
                state.url = url.to_string();
            }
            Ok(())
        }

        /// Current URL
        pub async fn current_url(&self) -> String {
            self.state.lock().map(|s| s.url.clone()).unwrap_or_default()
        }

        /// Viewport override (no-op for staged pages)
        pub async fn set_viewport(&self, _width: u32, _height: u32) -> AuditResult<()> {
            Ok(())
        }

        /// Return staged elements for the selector, in staged order.
        pub async fn find_all(&self, selector: &Selector) -> AuditResult<Vec<ElementHandle>> {
            let key = selector.key();
            let boxes = self
                .script
                .lock()
                .map(|s| s.dom.get(&key).cloned().unwrap_or_default())
                .unwrap_or_default();
            Ok(boxes
                .into_iter()
                .enumerate()
                .map(|(index, bbox)| ElementHandle {
                    key: key.clone(),
                    index,
                    bbox,
                    clicks: Arc::clone(&self.clicks),
                    typed: Arc::clone(&self.typed),
                })
                .collect())
        }

        /// Write a placeholder PNG so artifact paths exist on disk.
        pub async fn screenshot_to_file(
            &self,
            _clip: Option<BoundingBox>,
            path: &Path,
        ) -> AuditResult<()> {
            tokio::fs::write(path, b"\x89PNG\r\n\x1a\n").await?;
            Ok(())
        }

        /// Toggle script execution
        pub async fn set_javascript_enabled(&self, enabled: bool) -> AuditResult<()> {
            if let Ok(mut state) = self.state.lock() {
                state.js_enabled = enabled;
            }
            Ok(())
        }

        /// Whether script execution is currently enabled.
        #[must_use]
        pub fn javascript_enabled(&self) -> bool {
            self.state.lock().map(|s| s.js_enabled).unwrap_or(true)
        }

        /// Read the page's cookie jar
        pub async fn cookies(&self) -> AuditResult<Vec<CookieRecord>> {
            Ok(self.state.lock().map(|s| s.cookies.clone()).unwrap_or_default())
        }

        /// Install a cookie set
        pub async fn set_cookies(&self, records: Vec<CookieRecord>) -> AuditResult<()> {
            if let Ok(mut state) = self.state.lock() {
                state.cookies = records;
            }
            Ok(())
        }

        /// Close the page
        pub async fn close(self) -> AuditResult<()> {
            Ok(())
        }
    }

    /// Opaque handle to a staged element
    #[derive(Debug)]
    pub struct ElementHandle {
        key: String,
        index: usize,
        bbox: BoundingBox,
        clicks: Arc<Mutex<Vec<String>>>,
        typed: Arc<Mutex<Vec<(String, String)>>>,
    }

    impl ElementHandle {
        /// Bounding rectangle in page coordinates.
        pub async fn bounding_box(&self) -> AuditResult<BoundingBox> {
            Ok(self.bbox)
        }

        /// Record a click against the shared click log.
        pub async fn click(&self) -> AuditResult<()> {
            if let Ok(mut clicks) = self.clicks.lock() {
                clicks.push(format!("{}#{}", self.key, self.index));
            }
            Ok(())
        }

        /// Record typed text.
        pub async fn type_text(&self, text: &str) -> AuditResult<()> {
            if let Ok(mut typed) = self.typed.lock() {
                typed.push((self.key.clone(), text.to_string()));
            }
            Ok(())
        }
    }
}

// Re-export based on feature
#[cfg(feature = "browser")]
pub use cdp::{Browser, ElementHandle, Page};

#[cfg(not(feature = "browser"))]
pub use mock::{Browser, ElementHandle, Page};

#[cfg(all(test, not(feature = "browser")))]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::locator::Selector;

    #[tokio::test]
    async fn staged_elements_are_visible_to_every_page() {
        let browser = Browser::launch(BrowserConfig::default()).await.unwrap();
        let selector = Selector::css("div#performance");
        browser.stage_elements(&selector, vec![BoundingBox::new(0.0, 0.0, 100.0, 50.0)]);

        let page = browser.new_page().await.unwrap();
        let handles = page.find_all(&selector).await.unwrap();
        assert_eq!(handles.len(), 1);

        let other = browser.new_page().await.unwrap();
        assert_eq!(other.find_all(&selector).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn staged_navigation_failure_surfaces_as_navigation_error() {
        let browser = Browser::launch(BrowserConfig::default()).await.unwrap();
        browser.fail_navigation("search-console");
        let page = browser.new_page().await.unwrap();
        let err = page
            .goto("https://search.google.com/search-console/welcome")
            .await
            .unwrap_err();
        assert!(matches!(err, crate::result::AuditError::Navigation { .. }));
    }

    #[tokio::test]
    async fn clicks_are_logged_with_match_index() {
        let browser = Browser::launch(BrowserConfig::default()).await.unwrap();
        let tab = Selector::css_with_text("div[role='tab']", "screenshot");
        browser.stage_elements(
            &tab,
            vec![
                BoundingBox::new(0.0, 0.0, 10.0, 10.0),
                BoundingBox::new(20.0, 0.0, 10.0, 10.0),
            ],
        );
        let page = browser.new_page().await.unwrap();
        let handles = page.find_all(&tab).await.unwrap();
        handles[1].click().await.unwrap();
        let clicks = browser.clicks();
        assert_eq!(clicks.len(), 1);
        assert!(clicks[0].ends_with("#1"));
    }

    #[tokio::test]
    async fn javascript_toggle_round_trips() {
        let browser = Browser::launch(BrowserConfig::default()).await.unwrap();
        let page = browser.new_page().await.unwrap();
        assert!(page.javascript_enabled());
        page.set_javascript_enabled(false).await.unwrap();
        assert!(!page.javascript_enabled());
    }
}
