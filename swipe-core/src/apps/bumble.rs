use std::path::Path;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::browser::{BrowserError, BrowserResult, Driver};
use crate::cancel::CancelSignal;
use crate::domain::{Action, ActionKind, AppName};

use super::{AppAdapter, SelectorList};

pub const BUMBLE_ENTRY_URL: &str = "https://bumble.com/app";

const ALBUM_NAV_PATH: &str = "#main > div > div.page__layout > main > div.page__content-inner > div > div > span > div:nth-child(1) > article > div.encounters-album__nav";

fn list(selectors: &[&str]) -> SelectorList {
    SelectorList::builtin(selectors)
}

fn default_next_image() -> SelectorList {
    list(&[
        "div.encounters-album__nav-item.encounters-album__nav-item--next[role='button']",
        "#main > div > div.page__layout > main > div.page__content-inner > div > div > span > div:nth-child(1) > article > div.encounters-album__nav > div.encounters-album__nav-item.encounters-album__nav-item--next",
    ])
}

fn default_next_image_disabled() -> SelectorList {
    list(&[
        "div.encounters-album__nav-item.is-disabled.encounters-album__nav-item--next[role='button']",
        "#main > div > div.page__layout > main > div.page__content-inner > div > div > span > div:nth-child(1) > article > div.encounters-album__nav > div.encounters-album__nav-item.is-disabled.encounters-album__nav-item--next",
    ])
}

fn default_pass() -> SelectorList {
    list(&[
        "div[data-qa-role='encounters-action-dislike'][role='button']",
        "div.encounters-action.encounters-action--dislike[role='button']",
    ])
}

fn default_super_like() -> SelectorList {
    list(&[
        "div[data-qa-role='encounters-action-superswipe'][role='button']",
        "div.encounters-action.encounters-action--superswipe[role='button']",
    ])
}

fn default_like() -> SelectorList {
    list(&[
        "div[data-qa-role='encounters-action-like'][role='button']",
        "div.encounters-action.encounters-action--like[role='button']",
    ])
}

fn default_ready_hints() -> SelectorList {
    list(&["div.encounters-user__controls", "article"])
}

fn default_album_nav() -> SelectorList {
    list(&[ALBUM_NAV_PATH])
}

/// Selector lists for every Bumble control; each can be overridden from config.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BumbleSelectors {
    pub next_image: SelectorList,
    pub next_image_disabled: SelectorList,
    pub pass: SelectorList,
    pub super_like: SelectorList,
    pub like: SelectorList,
    pub ready_hints: SelectorList,
    pub album_nav: SelectorList,
}

impl Default for BumbleSelectors {
    fn default() -> Self {
        Self {
            next_image: default_next_image(),
            next_image_disabled: default_next_image_disabled(),
            pass: default_pass(),
            super_like: default_super_like(),
            like: default_like(),
            ready_hints: default_ready_hints(),
            album_nav: default_album_nav(),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct BumbleAdapter {
    selectors: BumbleSelectors,
}

impl BumbleAdapter {
    pub fn new(selectors: BumbleSelectors) -> Self {
        Self { selectors }
    }

    pub fn selectors(&self) -> &BumbleSelectors {
        &self.selectors
    }

    fn action_selectors(&self, kind: ActionKind) -> &SelectorList {
        match kind {
            ActionKind::Pass => &self.selectors.pass,
            ActionKind::Like => &self.selectors.like,
            ActionKind::SuperLike => &self.selectors.super_like,
        }
    }
}

#[async_trait(?Send)]
impl AppAdapter for BumbleAdapter {
    fn app(&self) -> AppName {
        AppName::Bumble
    }

    fn default_entry_url(&self) -> &str {
        BUMBLE_ENTRY_URL
    }

    async fn wait_ready(&self, cancel: &CancelSignal, driver: &dyn Driver) -> BrowserResult<()> {
        driver
            .wait_any_visible(cancel, &self.selectors.ready_hints)
            .await
            .map(|_| ())
    }

    async fn next_media(&self, cancel: &CancelSignal, driver: &dyn Driver) -> BrowserResult<()> {
        if driver
            .is_visible(cancel, &self.selectors.next_image_disabled)
            .await?
        {
            return Err(BrowserError::NavigationDisabled);
        }
        driver
            .click_by_selectors(cancel, &self.selectors.next_image)
            .await
    }

    async fn act(
        &self,
        cancel: &CancelSignal,
        driver: &dyn Driver,
        action: &Action,
    ) -> BrowserResult<()> {
        driver
            .click_by_selectors(cancel, self.action_selectors(action.kind))
            .await
    }

    async fn screenshot_media(
        &self,
        cancel: &CancelSignal,
        driver: &dyn Driver,
        path: &Path,
    ) -> BrowserResult<()> {
        driver
            .screenshot_element(cancel, self.selectors.album_nav.primary(), path)
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::browser::testing::{FakeDom, FakeTransport};
    use crate::browser::{InteractionDriver, RetryPolicy};
    use crate::config::DriverSection;
    use std::time::Duration;

    async fn open_driver(dom: &FakeDom) -> InteractionDriver {
        let config = DriverSection {
            step_timeout_ms: 200,
            probe_timeout_ms: 20,
            poll_interval_ms: 50,
            ..DriverSection::default()
        };
        let mut driver = InteractionDriver::new(Box::new(FakeTransport { dom: dom.clone() }), &config)
            .with_retry(RetryPolicy::with_attempts(2, Duration::from_millis(10)));
        driver
            .open(&CancelSignal::new(), BUMBLE_ENTRY_URL)
            .await
            .unwrap();
        driver
    }

    #[tokio::test(start_paused = true)]
    async fn disabled_next_control_is_reported_distinctly() {
        let selectors = BumbleSelectors::default();
        let dom = FakeDom::default()
            .with_element(selectors.next_image_disabled.primary(), true)
            .with_element(selectors.next_image.primary(), true);
        let driver = open_driver(&dom).await;
        let adapter = BumbleAdapter::default();

        let err = adapter
            .next_media(&CancelSignal::new(), &driver)
            .await
            .unwrap_err();
        assert!(matches!(err, BrowserError::NavigationDisabled));
        assert_eq!(dom.state(selectors.next_image.primary()).clicks, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn missing_next_control_is_a_retry_failure() {
        let dom = FakeDom::default();
        let driver = open_driver(&dom).await;
        let err = BumbleAdapter::default()
            .next_media(&CancelSignal::new(), &driver)
            .await
            .unwrap_err();
        assert!(matches!(err, BrowserError::Exhausted { attempts: 2, .. }));
    }

    #[tokio::test(start_paused = true)]
    async fn actions_click_their_fallback_selectors() {
        let selectors = BumbleSelectors::default();
        let super_fallback = selectors.super_like.iter().nth(1).unwrap().to_string();
        let dom = FakeDom::default()
            .with_element(selectors.like.primary(), true)
            .with_element(&super_fallback, true);
        let driver = open_driver(&dom).await;
        let adapter = BumbleAdapter::new(selectors.clone());
        let cancel = CancelSignal::new();

        adapter.act(&cancel, &driver, &Action::like()).await.unwrap();
        adapter
            .act(&cancel, &driver, &Action::new(ActionKind::SuperLike))
            .await
            .unwrap();
        assert_eq!(dom.state(selectors.like.primary()).clicks, 1);
        assert_eq!(dom.state(&super_fallback).clicks, 1);
    }

    #[test]
    fn partial_overrides_keep_remaining_defaults() {
        let parsed: BumbleSelectors = toml::from_str(r#"like = ["button.like"]"#).unwrap();
        assert_eq!(parsed.like.primary(), "button.like");
        assert_eq!(parsed.pass, BumbleSelectors::default().pass);
    }
}
