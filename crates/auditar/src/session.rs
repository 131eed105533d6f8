//! Session persistence and authentication detection.
//!
//! Authenticated browser state (cookies) is persisted across runs so the
//! Search Console flow can skip interactive login. A missing session file is
//! a normal branch, not a failure: the caller falls back to leaving the
//! headful window on the login surface and polling until a human signs in.

use std::path::{Path, PathBuf};
use std::time::Instant;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::browser::{Browser, Page};
use crate::locator::Locator;
use crate::result::{AuditError, AuditResult};
use crate::wait::{delay, wait_for_visible, Timings};

/// Authenticated-only landing surface used to detect login validity.
pub const WELCOME_URL: &str = "https://search.google.com/search-console/welcome";

/// Landmark text present only behind authentication.
const WELCOME_LANDMARK: &str = "Welcome to Google Search Console";

/// One persisted cookie. Field names follow the DevTools protocol so records
/// convert to and from CDP cookie shapes without a mapping layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CookieRecord {
    /// Cookie name
    pub name: String,
    /// Cookie value
    pub value: String,
    /// Cookie domain
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub domain: Option<String>,
    /// Cookie path
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    /// Expiry as seconds since the epoch
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires: Option<f64>,
    /// HttpOnly flag
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub http_only: Option<bool>,
    /// Secure flag
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub secure: Option<bool>,
}

impl CookieRecord {
    /// Create a minimal cookie record
    #[must_use]
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
            domain: None,
            path: None,
            expires: None,
            http_only: None,
            secure: None,
        }
    }
}

/// Durable store for the session cookie set.
#[derive(Debug, Clone)]
pub struct SessionStore {
    path: PathBuf,
}

impl SessionStore {
    /// Store backed by the given JSON file.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Path of the backing file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Whether a persisted session exists.
    #[must_use]
    pub fn exists(&self) -> bool {
        self.path.exists()
    }

    /// Serialize the page's current cookie set, overwriting any prior state.
    ///
    /// Callers treat failure as a warning, never as a reason to abort a run.
    pub async fn persist(&self, page: &Page) -> AuditResult<usize> {
        let cookies = page.cookies().await?;
        let json = serde_json::to_string_pretty(&cookies)?;
        tokio::fs::write(&self.path, json).await?;
        debug!(path = %self.path.display(), count = cookies.len(), "saved session cookies");
        Ok(cookies.len())
    }

    /// Install the persisted cookie set into the page.
    ///
    /// Fails with [`AuditError::SessionNotFound`] when no prior state exists;
    /// callers must treat that as the trigger for interactive login.
    pub async fn restore(&self, page: &Page) -> AuditResult<usize> {
        let raw = match tokio::fs::read_to_string(&self.path).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(AuditError::SessionNotFound);
            }
            Err(e) => return Err(e.into()),
        };
        let cookies: Vec<CookieRecord> = serde_json::from_str(&raw)?;
        page.set_cookies(cookies.clone()).await?;
        debug!(path = %self.path.display(), count = cookies.len(), "restored session cookies");
        Ok(cookies.len())
    }
}

/// Check login validity by navigating to the authenticated-only welcome
/// surface and looking for its landmark. Any navigation failure reads as
/// "not authenticated", the fail-safe default.
pub async fn is_authenticated(page: &Page, timings: &Timings) -> bool {
    if let Err(error) = page.goto(WELCOME_URL).await {
        debug!(%error, "welcome surface unreachable; treating as unauthenticated");
        return false;
    }
    let landmark = Locator::css_with_text("div", WELCOME_LANDMARK);
    wait_for_visible(page, &landmark, timings.landmark_timeout, timings.poll_interval)
        .await
        .is_ok()
}

/// Restore-or-login: make sure the browser session is authenticated before
/// any inspection driver runs.
///
/// Tries the persisted session first. When that does not hold, the page is
/// left on the login surface and authentication is re-checked until the
/// login budget runs out; a successful login is persisted for the next run.
pub async fn ensure_authenticated(
    browser: &Browser,
    store: &SessionStore,
    timings: &Timings,
) -> AuditResult<()> {
    let page = browser.new_page().await?;

    match store.restore(&page).await {
        Ok(count) => debug!(count, "session cookies restored"),
        Err(AuditError::SessionNotFound) => {
            info!("no saved session; interactive login will be required");
        }
        Err(error) => warn!(%error, "could not restore saved session"),
    }

    if is_authenticated(&page, timings).await {
        if let Err(error) = store.persist(&page).await {
            warn!(%error, "session persisted state could not be written");
        }
        return page.close().await;
    }

    info!(
        timeout_s = timings.login_timeout.as_secs(),
        "waiting for interactive login in the browser window"
    );
    let deadline = Instant::now() + timings.login_timeout;
    loop {
        delay(timings.login_poll).await;
        if is_authenticated(&page, timings).await {
            if let Err(error) = store.persist(&page).await {
                warn!(%error, "session persisted state could not be written");
            }
            return page.close().await;
        }
        if Instant::now() >= deadline {
            let _ = page.close().await;
            return Err(AuditError::Timeout {
                what: "interactive login".to_string(),
                ms: timings.login_timeout.as_millis() as u64,
            });
        }
    }
}

#[cfg(all(test, not(feature = "browser")))]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::browser::BrowserConfig;
    use crate::locator::BoundingBox;

    async fn staged_browser() -> Browser {
        Browser::launch(BrowserConfig::default()).await.unwrap()
    }

    fn stage_welcome_landmark(browser: &Browser) {
        let landmark =
            crate::locator::Selector::css_with_text("div", WELCOME_LANDMARK);
        browser.stage_elements(&landmark, vec![BoundingBox::new(0.0, 0.0, 400.0, 40.0)]);
    }

    mod store_tests {
        use super::*;

        #[tokio::test]
        async fn restore_without_file_is_session_not_found() {
            let dir = tempfile::tempdir().unwrap();
            let store = SessionStore::new(dir.path().join("cookies.json"));
            let browser = staged_browser().await;
            let page = browser.new_page().await.unwrap();
            let err = store.restore(&page).await.unwrap_err();
            assert!(matches!(err, AuditError::SessionNotFound));
        }

        #[tokio::test]
        async fn persist_then_restore_round_trips_cookie_set() {
            let dir = tempfile::tempdir().unwrap();
            let store = SessionStore::new(dir.path().join("cookies.json"));
            let browser = staged_browser().await;

            let page = browser.new_page().await.unwrap();
            let mut secure = CookieRecord::new("SID", "abc123");
            secure.domain = Some(".google.com".to_string());
            secure.secure = Some(true);
            let cookies = vec![secure, CookieRecord::new("NID", "xyz")];
            page.set_cookies(cookies.clone()).await.unwrap();
            assert_eq!(store.persist(&page).await.unwrap(), 2);

            let fresh = browser.new_page().await.unwrap();
            assert_eq!(store.restore(&fresh).await.unwrap(), 2);
            assert_eq!(fresh.cookies().await.unwrap(), cookies);
        }

        #[tokio::test]
        async fn persist_overwrites_prior_state() {
            let dir = tempfile::tempdir().unwrap();
            let store = SessionStore::new(dir.path().join("cookies.json"));
            let browser = staged_browser().await;

            let page = browser.new_page().await.unwrap();
            page.set_cookies(vec![CookieRecord::new("old", "1")])
                .await
                .unwrap();
            store.persist(&page).await.unwrap();

            page.set_cookies(vec![CookieRecord::new("new", "2")])
                .await
                .unwrap();
            store.persist(&page).await.unwrap();

            let fresh = browser.new_page().await.unwrap();
            store.restore(&fresh).await.unwrap();
            let restored = fresh.cookies().await.unwrap();
            assert_eq!(restored.len(), 1);
            assert_eq!(restored[0].name, "new");
        }
    }

    mod auth_tests {
        use super::*;

        #[tokio::test]
        async fn navigation_failure_reads_as_unauthenticated() {
            let browser = staged_browser().await;
            browser.fail_navigation("search-console");
            let page = browser.new_page().await.unwrap();
            assert!(!is_authenticated(&page, &Timings::fast()).await);
        }

        #[tokio::test]
        async fn welcome_landmark_reads_as_authenticated() {
            let browser = staged_browser().await;
            stage_welcome_landmark(&browser);
            let page = browser.new_page().await.unwrap();
            assert!(is_authenticated(&page, &Timings::fast()).await);
        }

        #[tokio::test]
        async fn ensure_authenticated_persists_after_fresh_login() {
            let dir = tempfile::tempdir().unwrap();
            let store = SessionStore::new(dir.path().join("cookies.json"));
            let browser = staged_browser().await;
            stage_welcome_landmark(&browser);

            // No session file at startup: the flow must proceed without
            // crashing and write one once authenticated.
            assert!(!store.exists());
            ensure_authenticated(&browser, &store, &Timings::fast())
                .await
                .unwrap();
            assert!(store.exists());
        }

        #[tokio::test]
        async fn login_that_never_happens_times_out_cleanly() {
            let dir = tempfile::tempdir().unwrap();
            let store = SessionStore::new(dir.path().join("cookies.json"));
            let browser = staged_browser().await;

            let err = ensure_authenticated(&browser, &store, &Timings::fast())
                .await
                .unwrap_err();
            assert!(matches!(err, AuditError::Timeout { .. }));
        }
    }
}
