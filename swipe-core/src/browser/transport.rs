use std::time::Duration;

use async_trait::async_trait;

use super::error::BrowserResult;

/// Minimal capability set the locator and driver need from a browser page.
#[async_trait(?Send)]
pub trait UiPage {
    /// Looks `selector` up once, bounded by `timeout`. `Ok(None)` means nothing matched in time.
    async fn find(&self, selector: &str, timeout: Duration)
        -> BrowserResult<Option<Box<dyn UiElement>>>;

    async fn screenshot(&self) -> BrowserResult<Vec<u8>>;
}

#[async_trait(?Send)]
pub trait UiElement {
    /// True when the rendered bounding box has strictly positive width and height.
    async fn is_visible(&self) -> BrowserResult<bool>;

    async fn scroll_into_view(&self) -> BrowserResult<()>;

    async fn click(&self) -> BrowserResult<()>;

    async fn screenshot(&self) -> BrowserResult<Vec<u8>>;
}

#[async_trait(?Send)]
pub trait UiTransport {
    /// Opens `url` in a fresh page and waits for it to finish loading.
    async fn open(&self, url: &str) -> BrowserResult<Box<dyn UiPage>>;

    async fn close(&mut self) -> BrowserResult<()>;
}
