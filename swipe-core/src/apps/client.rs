use std::path::Path;

use crate::browser::{BrowserResult, Driver, InteractionMetrics};
use crate::cancel::CancelSignal;
use crate::domain::{Action, AppName};

use super::AppAdapter;

/// Pairs an application adapter with the driver that performs its clicks.
pub struct AppClient {
    adapter: Box<dyn AppAdapter>,
    driver: Box<dyn Driver>,
    entry_url: Option<String>,
}

impl AppClient {
    pub fn new(adapter: Box<dyn AppAdapter>, driver: Box<dyn Driver>) -> Self {
        Self {
            adapter,
            driver,
            entry_url: None,
        }
    }

    pub fn with_entry_url(mut self, entry_url: Option<String>) -> Self {
        self.entry_url = entry_url.filter(|url| !url.trim().is_empty());
        self
    }

    pub fn app(&self) -> AppName {
        self.adapter.app()
    }

    pub fn entry_url(&self) -> &str {
        self.entry_url
            .as_deref()
            .unwrap_or_else(|| self.adapter.default_entry_url())
    }

    /// Opens the entry URL and waits until the application reports ready.
    pub async fn open(&mut self, cancel: &CancelSignal) -> BrowserResult<()> {
        let url = self.entry_url().to_string();
        self.driver.open(cancel, &url).await?;
        self.adapter.wait_ready(cancel, self.driver.as_ref()).await
    }

    pub async fn next_media(&self, cancel: &CancelSignal) -> BrowserResult<()> {
        self.adapter.next_media(cancel, self.driver.as_ref()).await
    }

    pub async fn act(&self, cancel: &CancelSignal, action: &Action) -> BrowserResult<()> {
        self.adapter.act(cancel, self.driver.as_ref(), action).await
    }

    pub async fn screenshot(&self, cancel: &CancelSignal, path: &Path) -> BrowserResult<()> {
        self.adapter
            .screenshot_media(cancel, self.driver.as_ref(), path)
            .await
    }

    pub fn metrics(&self) -> InteractionMetrics {
        self.driver.metrics()
    }

    pub async fn close(&mut self) -> BrowserResult<()> {
        self.driver.close().await
    }
}
