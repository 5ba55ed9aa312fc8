use std::path::Path;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use async_trait::async_trait;

use crate::apps::SelectorList;
use crate::cancel::CancelSignal;
use crate::config::DriverSection;

use super::error::{BrowserError, BrowserResult};
use super::locator::{find_first_visible, probe_once, Located, LocatorConfig};
use super::metrics::InteractionMetrics;
use super::retry::RetryPolicy;
use super::transport::{UiPage, UiTransport};

/// High-level, retrying operations on a single UI page.
#[async_trait(?Send)]
pub trait Driver {
    async fn open(&mut self, cancel: &CancelSignal, url: &str) -> BrowserResult<()>;

    /// Waits until any of `selectors` is visible and returns the one that matched.
    async fn wait_any_visible(
        &self,
        cancel: &CancelSignal,
        selectors: &SelectorList,
    ) -> BrowserResult<String>;

    /// Single probe pass with no retry; used to detect disabled or absent controls.
    async fn is_visible(&self, cancel: &CancelSignal, selectors: &SelectorList)
        -> BrowserResult<bool>;

    async fn click_by_selectors(
        &self,
        cancel: &CancelSignal,
        selectors: &SelectorList,
    ) -> BrowserResult<()>;

    async fn screenshot_page(&self, cancel: &CancelSignal, path: &Path) -> BrowserResult<()>;

    async fn screenshot_element(
        &self,
        cancel: &CancelSignal,
        selector: &str,
        path: &Path,
    ) -> BrowserResult<()>;

    fn metrics(&self) -> InteractionMetrics;

    async fn close(&mut self) -> BrowserResult<()>;
}

pub struct InteractionDriver {
    transport: Box<dyn UiTransport>,
    page: Option<Box<dyn UiPage>>,
    step_timeout: Duration,
    locator: LocatorConfig,
    retry: RetryPolicy,
    metrics: Arc<Mutex<InteractionMetrics>>,
}

impl InteractionDriver {
    pub fn new(transport: Box<dyn UiTransport>, config: &DriverSection) -> Self {
        Self {
            transport,
            page: None,
            step_timeout: Duration::from_millis(config.step_timeout_ms),
            locator: LocatorConfig::from(config),
            retry: RetryPolicy::new(&config.retry),
            metrics: Arc::new(Mutex::new(InteractionMetrics::default())),
        }
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn with_locator(mut self, locator: LocatorConfig) -> Self {
        self.locator = locator;
        self
    }

    pub fn step_timeout(&self) -> Duration {
        self.step_timeout
    }

    pub fn set_step_timeout(&mut self, timeout: Duration) {
        self.step_timeout = timeout;
    }

    pub fn is_open(&self) -> bool {
        self.page.is_some()
    }

    fn with_metrics<F, R>(&self, f: F) -> R
    where
        F: FnOnce(&mut InteractionMetrics) -> R,
    {
        let mut guard = self.metrics.lock().unwrap_or_else(PoisonError::into_inner);
        f(&mut guard)
    }

    fn page(&self) -> BrowserResult<&dyn UiPage> {
        self.page.as_deref().ok_or(BrowserError::NotOpened)
    }

    async fn locate(
        &self,
        cancel: &CancelSignal,
        selectors: &SelectorList,
    ) -> BrowserResult<Located> {
        let page = self.page()?;
        let result =
            find_first_visible(page, selectors, self.step_timeout, cancel, self.locator).await;
        if matches!(result, Err(BrowserError::Timeout { .. })) {
            self.with_metrics(|metrics| metrics.record_locate_timeout());
        }
        result
    }

    async fn attempt_click(&self, cancel: &CancelSignal, selectors: &SelectorList) -> BrowserResult<()> {
        let located = self.locate(cancel, selectors).await?;
        // Visibility already gates correctness; a failed scroll is not fatal.
        let _ = located.element.scroll_into_view().await;
        located.element.click().await
    }
}

async fn ensure_parent_dir(path: &Path) -> BrowserResult<()> {
    if let Some(dir) = path.parent() {
        if !dir.as_os_str().is_empty() {
            tokio::fs::create_dir_all(dir).await?;
        }
    }
    Ok(())
}

#[async_trait(?Send)]
impl Driver for InteractionDriver {
    async fn open(&mut self, cancel: &CancelSignal, url: &str) -> BrowserResult<()> {
        cancel.check()?;
        url::Url::parse(url)
            .map_err(|err| BrowserError::Configuration(format!("invalid url {url}: {err}")))?;
        let page = self.transport.open(url).await?;
        self.page = Some(page);
        self.with_metrics(|metrics| metrics.record_page_open());
        Ok(())
    }

    async fn wait_any_visible(
        &self,
        cancel: &CancelSignal,
        selectors: &SelectorList,
    ) -> BrowserResult<String> {
        let located = self.locate(cancel, selectors).await?;
        Ok(located.selector)
    }

    async fn is_visible(
        &self,
        cancel: &CancelSignal,
        selectors: &SelectorList,
    ) -> BrowserResult<bool> {
        cancel.check()?;
        let found = probe_once(self.page()?, selectors, self.locator.probe_timeout).await;
        Ok(found.is_some())
    }

    async fn click_by_selectors(
        &self,
        cancel: &CancelSignal,
        selectors: &SelectorList,
    ) -> BrowserResult<()> {
        self.page()?;
        match self
            .retry
            .run(cancel, |_| self.attempt_click(cancel, selectors))
            .await
        {
            Ok(outcome) => {
                self.with_metrics(|metrics| metrics.record_click(outcome.attempts));
                Ok(())
            }
            Err(failure) => {
                self.with_metrics(|metrics| metrics.record_click_failure(failure.attempts));
                if failure.error.is_cancelled() {
                    return Err(failure.error);
                }
                Err(BrowserError::Exhausted {
                    selectors: selectors.to_vec(),
                    attempts: failure.attempts,
                    source: Box::new(failure.error),
                })
            }
        }
    }

    async fn screenshot_page(&self, cancel: &CancelSignal, path: &Path) -> BrowserResult<()> {
        cancel.check()?;
        let page = self.page()?;
        ensure_parent_dir(path).await?;
        let bytes = page.screenshot().await?;
        tokio::fs::write(path, bytes).await?;
        self.with_metrics(|metrics| metrics.record_screenshot());
        Ok(())
    }

    async fn screenshot_element(
        &self,
        cancel: &CancelSignal,
        selector: &str,
        path: &Path,
    ) -> BrowserResult<()> {
        cancel.check()?;
        self.page()?;
        ensure_parent_dir(path).await?;
        let selectors = SelectorList::single(selector)?;
        let located = self.locate(cancel, &selectors).await?;
        let _ = located.element.scroll_into_view().await;
        let bytes = located.element.screenshot().await?;
        tokio::fs::write(path, bytes).await?;
        self.with_metrics(|metrics| metrics.record_screenshot());
        Ok(())
    }

    fn metrics(&self) -> InteractionMetrics {
        self.with_metrics(|metrics| metrics.clone())
    }

    async fn close(&mut self) -> BrowserResult<()> {
        self.page = None;
        self.transport.close().await
    }
}
