mod bumble;
mod client;
mod selectors;

use std::path::Path;

use async_trait::async_trait;

use crate::browser::{BrowserResult, Driver};
use crate::cancel::CancelSignal;
use crate::config::SelectorsSection;
use crate::domain::{Action, AppName};

pub use bumble::{BumbleAdapter, BumbleSelectors, BUMBLE_ENTRY_URL};
pub use client::AppClient;
pub use selectors::SelectorList;

/// Translates abstract profile operations into one application's controls.
#[async_trait(?Send)]
pub trait AppAdapter {
    fn app(&self) -> AppName;

    fn default_entry_url(&self) -> &str;

    async fn wait_ready(&self, cancel: &CancelSignal, driver: &dyn Driver) -> BrowserResult<()>;

    /// Advances to the next media item.
    ///
    /// Fails with [`crate::browser::BrowserError::NavigationDisabled`] when the
    /// application shows the control as disabled, i.e. the album has ended.
    async fn next_media(&self, cancel: &CancelSignal, driver: &dyn Driver) -> BrowserResult<()>;

    async fn act(
        &self,
        cancel: &CancelSignal,
        driver: &dyn Driver,
        action: &Action,
    ) -> BrowserResult<()>;

    async fn screenshot_media(
        &self,
        cancel: &CancelSignal,
        driver: &dyn Driver,
        path: &Path,
    ) -> BrowserResult<()>;
}

pub fn adapter_for(app: AppName, selectors: &SelectorsSection) -> Box<dyn AppAdapter> {
    match app {
        AppName::Bumble => Box::new(BumbleAdapter::new(selectors.bumble.clone())),
    }
}
