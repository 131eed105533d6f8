//! Report assembly: structured sections appended to a run-scoped document.
//!
//! Drivers hand uniform section records to a [`ReportSink`]; the markdown
//! sink is the production implementation, and the in-memory sink backs the
//! orchestrator tests. Earlier revisions wired report output inside each
//! driver; a single sink dependency replaced those parallel paths.

use std::path::PathBuf;

use async_trait::async_trait;

use crate::drivers::TestResult;
use crate::result::AuditResult;

/// One appended report section: a (title, page-type, source URL, artifacts,
/// result URL) tuple.
#[derive(Debug, Clone, PartialEq)]
pub struct ReportSection {
    /// Which diagnostic surface produced this section
    pub title: String,
    /// Page label from the configuration
    pub page_type: String,
    /// URL of the page under audit
    pub source_url: String,
    /// Where the external tool ended up (post-redirect)
    pub result_url: String,
    /// Primary evidence, when capture succeeded
    pub screenshot_path: Option<PathBuf>,
    /// Auxiliary evidence (e.g. the embedded resources panel)
    pub secondary_screenshot_path: Option<PathBuf>,
}

impl ReportSection {
    /// Build a section from a driver result.
    #[must_use]
    pub fn from_result(
        title: impl Into<String>,
        page_type: impl Into<String>,
        source_url: impl Into<String>,
        result: TestResult,
    ) -> Self {
        Self {
            title: title.into(),
            page_type: page_type.into(),
            source_url: source_url.into(),
            result_url: result.test_url,
            screenshot_path: result.screenshot_path,
            secondary_screenshot_path: result.secondary_screenshot_path,
        }
    }
}

/// Sink consuming report sections in page-then-driver order.
#[async_trait]
pub trait ReportSink: Send {
    /// Append one section to the running document.
    async fn append(&mut self, section: &ReportSection) -> AuditResult<()>;
}

/// Markdown document sink writing to a single run-scoped file.
#[derive(Debug)]
pub struct MarkdownReport {
    path: PathBuf,
}

impl MarkdownReport {
    /// Create the document with a run header, truncating any prior file.
    pub async fn create(path: impl Into<PathBuf>, domain: &str) -> AuditResult<Self> {
        let path = path.into();
        let header = format!(
            "# SEO Audit: {domain}\n\nGenerated {}\n",
            chrono::Utc::now().format("%Y-%m-%d %H:%M UTC")
        );
        tokio::fs::write(&path, header).await?;
        Ok(Self { path })
    }

    fn render(section: &ReportSection) -> String {
        let mut out = String::new();
        out.push_str(&format!("\n## {}: {}\n\n", section.title, section.page_type));
        out.push_str(&format!("- Page: <{}>\n", section.source_url));
        out.push_str(&format!("- Result: <{}>\n", section.result_url));
        out.push('\n');
        match &section.screenshot_path {
            Some(path) => out.push_str(&format!(
                "![{} for {}]({})\n",
                section.title,
                section.page_type,
                path.display()
            )),
            None => out.push_str("_No screenshot captured._\n"),
        }
        if let Some(path) = &section.secondary_screenshot_path {
            out.push_str(&format!("\n![Page resources]({})\n", path.display()));
        }
        out
    }
}

#[async_trait]
impl ReportSink for MarkdownReport {
    async fn append(&mut self, section: &ReportSection) -> AuditResult<()> {
        use tokio::io::AsyncWriteExt;
        let mut file = tokio::fs::OpenOptions::new()
            .append(true)
            .open(&self.path)
            .await?;
        file.write_all(Self::render(section).as_bytes()).await?;
        file.flush().await?;
        Ok(())
    }
}

/// In-memory sink for tests and dry runs.
#[derive(Debug, Default)]
pub struct MemoryReport {
    /// Sections in append order
    pub sections: Vec<ReportSection>,
}

impl MemoryReport {
    /// Empty sink
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ReportSink for MemoryReport {
    async fn append(&mut self, section: &ReportSection) -> AuditResult<()> {
        self.sections.push(section.clone());
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn section(screenshot: Option<PathBuf>) -> ReportSection {
        ReportSection {
            title: "PageSpeed Insights".to_string(),
            page_type: "home".to_string(),
            source_url: "https://example.com".to_string(),
            result_url: "https://pagespeed.web.dev/analysis/xyz".to_string(),
            screenshot_path: screenshot,
            secondary_screenshot_path: None,
        }
    }

    #[tokio::test]
    async fn markdown_report_appends_sections_in_order() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("report.md");
        let mut report = MarkdownReport::create(&path, "example.com").await.unwrap();

        report
            .append(&section(Some(PathBuf::from("shots/a.png"))))
            .await
            .unwrap();
        let mut second = section(None);
        second.page_type = "pricing".to_string();
        report.append(&second).await.unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        assert!(text.starts_with("# SEO Audit: example.com"));
        let home = text.find("## PageSpeed Insights: home").unwrap();
        let pricing = text.find("## PageSpeed Insights: pricing").unwrap();
        assert!(home < pricing);
        assert!(text.contains("![PageSpeed Insights for home](shots/a.png)"));
    }

    #[tokio::test]
    async fn missing_artifact_renders_a_placeholder() {
        let rendered = MarkdownReport::render(&section(None));
        assert!(rendered.contains("_No screenshot captured._"));
        assert!(!rendered.contains("!["));
    }

    #[tokio::test]
    async fn dual_artifact_section_renders_both_images() {
        let mut sec = section(Some(PathBuf::from("shots/a.png")));
        sec.secondary_screenshot_path = Some(PathBuf::from("shots/b.png"));
        let rendered = MarkdownReport::render(&sec);
        assert!(rendered.contains("shots/a.png"));
        assert!(rendered.contains("![Page resources](shots/b.png)"));
    }

    #[tokio::test]
    async fn memory_report_collects_sections() {
        let mut sink = MemoryReport::new();
        sink.append(&section(None)).await.unwrap();
        assert_eq!(sink.sections.len(), 1);
    }
}
