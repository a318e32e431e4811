//! Page scraping
//!
//! With a Chromium binary configured, pages are rendered headless and the
//! final DOM is dumped; otherwise the raw HTML is fetched over HTTP. Both
//! paths send the same desktop user agent and end in [`html_to_text`].
//!
//! Targets must stay on the public internet: the host's DNS answers are
//! checked before anything is fetched or rendered, and every HTTP redirect
//! hop goes through [`validate_url`] again.

use crate::html::html_to_text;
use async_trait::async_trait;
use mia_core::{is_public_ip, validate_url, ScrapeError, Settings, UrlRejection};
use reqwest::redirect::Policy;
use reqwest::{Client, Url};
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;

/// Redirect hops followed by the HTTP fetch
pub const MAX_REDIRECTS: usize = 10;

/// Desktop Chrome user agent sent by every scrape
pub const DESKTOP_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) \
    AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

/// Fetches a page and returns its visible text
#[async_trait]
pub trait PageScraper: Send + Sync + std::fmt::Debug {
    async fn scrape(&self, url: &Url) -> Result<String, ScrapeError>;
}

/// Headless Chromium scraper with HTTP fallback
#[derive(Debug, Clone)]
pub struct BrowserScraper {
    chromium: Option<PathBuf>,
    client: Client,
    timeout: Duration,
    check_dns: bool,
}

impl BrowserScraper {
    /// HTTP-only scraper
    pub fn new(timeout: Duration) -> Result<Self, ScrapeError> {
        let client = Client::builder()
            .redirect(guarded_redirects())
            .build()
            .map_err(|e| ScrapeError::Setup(e.to_string()))?;

        Ok(Self {
            chromium: None,
            client,
            timeout,
            check_dns: true,
        })
    }

    /// Render with the Chromium binary at `path`
    #[must_use]
    pub fn with_chromium(mut self, path: impl Into<PathBuf>) -> Self {
        self.chromium = Some(path.into());
        self
    }

    pub fn from_settings(settings: &Settings) -> Result<Self, ScrapeError> {
        let scraper = Self::new(settings.scraper_timeout())?;
        Ok(match &settings.chromium_path {
            Some(path) if !path.as_os_str().is_empty() => scraper.with_chromium(path),
            _ => scraper,
        })
    }

    /// Reject targets whose host resolves to a private address
    async fn ensure_public_target(&self, url: &Url) -> Result<(), ScrapeError> {
        validate_url(url.as_str())?;
        if !self.check_dns {
            return Ok(());
        }
        let Some(host) = url.domain() else {
            // IP literal, already checked by validate_url
            return Ok(());
        };
        let port = url.port_or_known_default().unwrap_or(80);

        let addrs = tokio::time::timeout(
            self.timeout,
            tokio::net::lookup_host((host, port)),
        )
        .await
        .map_err(|_| self.timeout_error())?
        .map_err(|e| ScrapeError::Navigation(format!("could not resolve {host}: {e}")))?;

        check_resolved(host, addrs)?;
        Ok(())
    }

    fn timeout_error(&self) -> ScrapeError {
        ScrapeError::Timeout {
            secs: self.timeout.as_secs(),
        }
    }

    async fn render(&self, chromium: &Path, url: &Url) -> Result<String, ScrapeError> {
        let mut command = Command::new(chromium);
        command
            .args(chromium_args(url))
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let child = command.spawn().map_err(|e| {
            ScrapeError::Browser(format!("failed to launch {}: {e}", chromium.display()))
        })?;

        let output = tokio::time::timeout(self.timeout, child.wait_with_output())
            .await
            .map_err(|_| self.timeout_error())?
            .map_err(|e| ScrapeError::Browser(e.to_string()))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            let reason = stderr.lines().last().unwrap_or("no output").trim().to_string();
            return Err(ScrapeError::Browser(format!(
                "chromium exited with {}: {reason}",
                output.status
            )));
        }

        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }

    async fn fetch(&self, url: &Url) -> Result<String, ScrapeError> {
        let response = self
            .client
            .get(url.clone())
            .header(reqwest::header::USER_AGENT, DESKTOP_USER_AGENT)
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|e| self.request_error(&e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(ScrapeError::Navigation(format!(
                "HTTP {} for {url}",
                status.as_u16()
            )));
        }

        response.text().await.map_err(|e| self.request_error(&e))
    }

    fn request_error(&self, err: &reqwest::Error) -> ScrapeError {
        if err.is_timeout() {
            return self.timeout_error();
        }
        match rejection_in(err) {
            Some(rejection) => ScrapeError::Rejected(rejection.clone()),
            None => ScrapeError::Navigation(err.to_string()),
        }
    }
}

/// Follow redirects only to URLs that would pass validation themselves
fn guarded_redirects() -> Policy {
    Policy::custom(|attempt| {
        if attempt.previous().len() >= MAX_REDIRECTS {
            return attempt.error("too many redirects");
        }
        let checked = validate_url(attempt.url().as_str());
        match checked {
            Ok(_) => attempt.follow(),
            Err(rejection) => {
                tracing::warn!(url = %attempt.url(), %rejection, "Redirect refused");
                attempt.error(rejection)
            }
        }
    })
}

fn rejection_in(err: &reqwest::Error) -> Option<&UrlRejection> {
    let mut source = std::error::Error::source(err);
    while let Some(inner) = source {
        if let Some(rejection) = inner.downcast_ref::<UrlRejection>() {
            return Some(rejection);
        }
        source = inner.source();
    }
    None
}

/// Every resolved address must be public
fn check_resolved(
    host: &str,
    addrs: impl IntoIterator<Item = SocketAddr>,
) -> Result<(), UrlRejection> {
    match addrs.into_iter().map(|a| a.ip()).find(|ip| !is_public_ip(*ip)) {
        Some(addr) => Err(UrlRejection::PrivateAddress {
            host: host.to_string(),
            addr,
        }),
        None => Ok(()),
    }
}

fn chromium_args(url: &Url) -> Vec<String> {
    vec![
        "--headless=new".to_string(),
        "--no-sandbox".to_string(),
        "--disable-setuid-sandbox".to_string(),
        "--disable-gpu".to_string(),
        "--disable-dev-shm-usage".to_string(),
        format!("--user-agent={DESKTOP_USER_AGENT}"),
        "--virtual-time-budget=2000".to_string(),
        "--dump-dom".to_string(),
        url.to_string(),
    ]
}

#[async_trait]
impl PageScraper for BrowserScraper {
    async fn scrape(&self, url: &Url) -> Result<String, ScrapeError> {
        tracing::info!(%url, browser = self.chromium.is_some(), "Scraping");

        if let Err(e) = self.ensure_public_target(url).await {
            tracing::warn!(%url, error = %e, "Scrape target refused");
            return Err(e);
        }

        let html = match &self.chromium {
            Some(chromium) => self.render(chromium, url).await,
            None => self.fetch(url).await,
        };

        match html {
            Ok(html) => Ok(html_to_text(&html)),
            Err(e @ ScrapeError::Timeout { .. }) => {
                tracing::error!(%url, secs = self.timeout.as_secs(), "Scrape timed out");
                Err(e)
            }
            Err(e) => {
                tracing::error!(%url, error = %e, "Scrape failed");
                Err(e)
            }
        }
    }
}
