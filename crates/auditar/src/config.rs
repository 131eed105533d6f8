//! Run configuration and site identity.
//!
//! The page list is an ordered array: audits run pages in exactly the
//! configured order, and the first entry also determines the site identity
//! used to namespace artifacts and to address the Search Console resource
//! selector for the whole run.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use url::Url;

use crate::result::{AuditError, AuditResult};

/// One unit of audit work: a labelled page URL.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageSpec {
    /// Human label for the page ("home", "blog article", ...)
    pub page_type: String,
    /// Absolute URL of the page under audit
    pub url: String,
}

impl PageSpec {
    /// Create a new page spec
    #[must_use]
    pub fn new(page_type: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            page_type: page_type.into(),
            url: url.into(),
        }
    }
}

/// Which diagnostic surfaces to exercise
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DriverKind {
    /// PageSpeed Insights performance report
    Pagespeed,
    /// Search Console URL inspection / mobile friendliness
    Inspection,
    /// JS enabled/disabled comparison of the page itself
    JsToggle,
}

impl DriverKind {
    /// All drivers, in default execution order
    #[must_use]
    pub const fn all() -> [Self; 3] {
        [Self::Pagespeed, Self::JsToggle, Self::Inspection]
    }
}

/// Configuration for one audit run, typically loaded from a JSON file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunConfig {
    /// Pages to audit, in execution order
    pub pages: Vec<PageSpec>,
    /// Drivers to run per page, in execution order
    #[serde(default = "default_drivers")]
    pub drivers: Vec<DriverKind>,
    /// Path to the Chrome/Chromium binary (None = auto-detect)
    #[serde(default)]
    pub chrome_path: Option<String>,
    /// Directory for the report, session file, and screenshots
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,
}

fn default_drivers() -> Vec<DriverKind> {
    DriverKind::all().to_vec()
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("_audit-output")
}

impl RunConfig {
    /// Load a configuration from a JSON file.
    pub fn load(path: &Path) -> AuditResult<Self> {
        let raw = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&raw)?;
        config.validate()?;
        Ok(config)
    }

    /// Reject configurations the run cannot start from.
    pub fn validate(&self) -> AuditResult<()> {
        if self.pages.is_empty() {
            return Err(AuditError::Config {
                message: "page list is empty".to_string(),
            });
        }
        for page in &self.pages {
            if !page.url.starts_with("http://") && !page.url.starts_with("https://") {
                return Err(AuditError::Config {
                    message: format!("page {:?} has a non-absolute url: {}", page.page_type, page.url),
                });
            }
        }
        Ok(())
    }

    /// Screenshot directory under the output directory.
    #[must_use]
    pub fn screenshot_dir(&self) -> PathBuf {
        self.output_dir.join("screenshots")
    }

    /// Session cookie file under the output directory.
    #[must_use]
    pub fn session_path(&self) -> PathBuf {
        self.output_dir.join("cookies.json")
    }
}

/// Site identity derived once per run from the first configured URL.
///
/// Stable for the whole run: every artifact filename is namespaced by
/// `domain`, and the inspection console is addressed by `full_resource_id`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SiteIdentity {
    /// Bare host name, e.g. `example.com`
    pub domain: String,
    /// Resource identifier for the inspection console, e.g. `https://example.com/`
    pub full_resource_id: String,
}

impl SiteIdentity {
    /// Derive the identity from an absolute page URL.
    pub fn from_url(raw: &str) -> AuditResult<Self> {
        let url = Url::parse(raw).map_err(|e| AuditError::Config {
            message: format!("cannot derive site identity from {raw}: {e}"),
        })?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(AuditError::Config {
                message: format!("unsupported scheme in {raw}"),
            });
        }
        let host = url.host_str().ok_or_else(|| AuditError::Config {
            message: format!("url {raw} has no host"),
        })?;
        Ok(Self {
            full_resource_id: format!("{}://{host}/", url.scheme()),
            domain: host.to_string(),
        })
    }
}

/// Reduce a page label to a filename-safe token.
///
/// Anything outside `[a-z0-9]` collapses to a single `-`, so "Blog Article!"
/// becomes "blog-article".
#[must_use]
pub fn sanitize_label(label: &str) -> String {
    let mut out = String::with_capacity(label.len());
    let mut last_dash = true;
    for ch in label.chars() {
        let ch = ch.to_ascii_lowercase();
        if ch.is_ascii_alphanumeric() {
            out.push(ch);
            last_dash = false;
        } else if !last_dash {
            out.push('-');
            last_dash = true;
        }
    }
    while out.ends_with('-') {
        out.pop();
    }
    out
}
