//! Auditador CLI: run the browser-driven SEO audit pipeline.
//!
//! ## Usage
//!
//! ```bash
//! auditador --config audit.json                 # Full run
//! auditador --config audit.json --headless      # No visible window
//! auditador --config audit.json --output ./out  # Override output dir
//! ```
//!
//! The config file lists the pages to audit and the drivers to run; see
//! [`auditar::RunConfig`] for its shape.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use tracing::{error, info, warn};

use auditar::{
    ensure_authenticated, AuditResult, Browser, BrowserConfig, DriverKind, MarkdownReport,
    RunConfig, Runner, SessionStore, SiteIdentity, Timings,
};

#[derive(Debug, Parser)]
#[command(name = "auditador", version, about = "Browser-driven SEO audit pipeline")]
struct Cli {
    /// Path to the run configuration (JSON)
    #[arg(short, long, default_value = "audit.json")]
    config: PathBuf,

    /// Override the configured output directory
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Path to the Chrome/Chromium binary
    #[arg(long)]
    chrome: Option<String>,

    /// Run without a visible browser window (breaks interactive login)
    #[arg(long)]
    headless: bool,
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    match run(Cli::parse()).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{e}");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> AuditResult<()> {
    let mut config = RunConfig::load(&cli.config)?;
    if let Some(output) = cli.output {
        config.output_dir = output;
    }
    if let Some(chrome) = cli.chrome {
        config.chrome_path = Some(chrome);
    }

    std::fs::create_dir_all(config.screenshot_dir())?;

    let mut browser_config = BrowserConfig::default().with_headless(cli.headless);
    if let Some(ref path) = config.chrome_path {
        browser_config = browser_config.with_chrome_path(path.clone());
    }
    let browser = Browser::launch(browser_config).await?;
    let timings = Timings::new();

    // The inspection console is the only authenticated surface; skip the
    // login dance entirely when it is not part of the run. A failed login
    // drops that driver rather than aborting the other audits.
    if config.drivers.contains(&DriverKind::Inspection) {
        if cli.headless {
            warn!("headless mode cannot complete an interactive login; relying on a saved session");
        }
        let store = SessionStore::new(config.session_path());
        if let Err(e) = ensure_authenticated(&browser, &store, &timings).await {
            warn!(error = %e, "not authenticated; skipping the URL inspection driver");
            config.drivers.retain(|d| *d != DriverKind::Inspection);
        }
    }

    let first = config
        .pages
        .first()
        .ok_or_else(|| auditar::AuditError::Config {
            message: "page list is empty".to_string(),
        })?;
    let site = SiteIdentity::from_url(&first.url)?;
    let report_path = config.output_dir.join("report.md");
    let mut report = MarkdownReport::create(&report_path, &site.domain).await?;

    let summary = Runner::new(&browser, &config, &mut report)
        .with_timings(timings)
        .run()
        .await?;

    if let Err(e) = browser.close().await {
        warn!(error = %e, "browser did not shut down cleanly");
    }

    info!(
        report = %report_path.display(),
        pages = summary.pages,
        results = summary.results,
        failures = summary.failures,
        "audit finished"
    );
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn defaults_point_at_audit_json() {
        let cli = Cli::parse_from(["auditador"]);
        assert_eq!(cli.config, PathBuf::from("audit.json"));
        assert!(cli.output.is_none());
        assert!(!cli.headless);
    }

    #[test]
    fn overrides_parse() {
        let cli = Cli::parse_from([
            "auditador",
            "--config",
            "site.json",
            "--output",
            "out",
            "--chrome",
            "/usr/bin/chromium",
            "--headless",
        ]);
        assert_eq!(cli.config, PathBuf::from("site.json"));
        assert_eq!(cli.output, Some(PathBuf::from("out")));
        assert_eq!(cli.chrome.as_deref(), Some("/usr/bin/chromium"));
        assert!(cli.headless);
    }
}
