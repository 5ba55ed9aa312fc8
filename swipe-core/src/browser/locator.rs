use std::time::Duration;

use tokio::time::Instant;

use crate::apps::SelectorList;
use crate::cancel::CancelSignal;
use crate::config::DriverSection;

use super::error::{BrowserError, BrowserResult};
use super::transport::{UiElement, UiPage};

#[derive(Debug, Clone, Copy)]
pub struct LocatorConfig {
    /// Bound on a single selector lookup inside one polling pass.
    pub probe_timeout: Duration,
    /// Pause between two passes over the candidate list.
    pub poll_interval: Duration,
}

impl Default for LocatorConfig {
    fn default() -> Self {
        Self {
            probe_timeout: Duration::from_millis(600),
            poll_interval: Duration::from_millis(120),
        }
    }
}

impl From<&DriverSection> for LocatorConfig {
    fn from(section: &DriverSection) -> Self {
        Self {
            probe_timeout: Duration::from_millis(section.probe_timeout_ms),
            poll_interval: Duration::from_millis(section.poll_interval_ms),
        }
    }
}

pub struct Located {
    pub element: Box<dyn UiElement>,
    pub selector: String,
}

impl std::fmt::Debug for Located {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Located")
            .field("selector", &self.selector)
            .finish_non_exhaustive()
    }
}

/// Polls `page` until one of `candidates` resolves to a visible element.
///
/// Candidates are scanned in order on every pass, so the first visible match
/// in list order wins. The page offers no visibility notifications, hence the
/// bounded poll.
pub async fn find_first_visible(
    page: &dyn UiPage,
    candidates: &SelectorList,
    timeout: Duration,
    cancel: &CancelSignal,
    config: LocatorConfig,
) -> BrowserResult<Located> {
    let deadline = Instant::now() + timeout;
    loop {
        cancel.check()?;

        if let Some(found) = probe_once(page, candidates, config.probe_timeout).await {
            return Ok(found);
        }

        if Instant::now() >= deadline {
            return Err(BrowserError::Timeout {
                selectors: candidates.to_vec(),
                timeout,
            });
        }
        cancel.sleep(config.poll_interval).await?;
    }
}

/// One pass over the candidates with no retry.
pub async fn probe_once(
    page: &dyn UiPage,
    candidates: &SelectorList,
    probe_timeout: Duration,
) -> Option<Located> {
    for selector in candidates.iter() {
        let element = match page.find(selector, probe_timeout).await {
            Ok(Some(element)) => element,
            Ok(None) | Err(_) => continue,
        };
        if element.is_visible().await.unwrap_or(false) {
            return Some(Located {
                element,
                selector: selector.to_string(),
            });
        }
    }
    None
}
