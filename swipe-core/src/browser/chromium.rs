use std::time::Duration;

use async_trait::async_trait;
use chromiumoxide::browser::{Browser, BrowserConfig as ChromiumConfig};
use chromiumoxide::cdp::browser_protocol::page::CaptureScreenshotFormat;
use chromiumoxide::cdp::browser_protocol::target::CreateTargetParams;
use chromiumoxide::element::Element;
use chromiumoxide::handler::viewport::Viewport as ChromiumViewport;
use chromiumoxide::handler::Handler;
use chromiumoxide::page::{Page, ScreenshotParams};
use futures::StreamExt;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::config::ChromiumSection;

use super::error::{BrowserError, BrowserResult};
use super::transport::{UiElement, UiPage, UiTransport};

/// [`UiTransport`] backed by a Chromium instance driven over CDP.
///
/// The transport either launches its own browser (and closes it on
/// [`UiTransport::close`]) or attaches to an already running one through its
/// DevTools websocket URL, in which case closing only detaches.
#[derive(Debug)]
pub struct ChromiumTransport {
    browser: Browser,
    handler_task: Option<JoinHandle<()>>,
    owns_browser: bool,
}

impl ChromiumTransport {
    pub async fn start(config: &ChromiumSection) -> BrowserResult<Self> {
        match &config.control_url {
            Some(url) if !url.trim().is_empty() => Self::connect(url.trim()).await,
            _ => Self::launch(config).await,
        }
    }

    pub async fn launch(config: &ChromiumSection) -> BrowserResult<Self> {
        let chromium_config = build_chromium_config(config)?;
        info!(
            headless = config.headless,
            width = config.window[0],
            height = config.window[1],
            "Launching Chromium instance"
        );
        let (browser, handler) = Browser::launch(chromium_config)
            .await
            .map_err(|err| BrowserError::Launch(err.to_string()))?;
        Ok(Self {
            browser,
            handler_task: Some(spawn_handler(handler)),
            owns_browser: true,
        })
    }

    pub async fn connect(control_url: &str) -> BrowserResult<Self> {
        info!(url = %control_url, "Attaching to running Chromium instance");
        let (browser, handler) = Browser::connect(control_url)
            .await
            .map_err(|err| BrowserError::Launch(format!("connect {control_url}: {err}")))?;
        Ok(Self {
            browser,
            handler_task: Some(spawn_handler(handler)),
            owns_browser: false,
        })
    }
}

fn spawn_handler(mut handler: Handler) -> JoinHandle<()> {
    tokio::spawn(async move {
        while let Some(event) = handler.next().await {
            if let Err(err) = event {
                debug!(error = %err, "Chromium handler reported error");
            }
        }
    })
}

fn build_chromium_config(config: &ChromiumSection) -> BrowserResult<ChromiumConfig> {
    let [width, height] = config.window;
    let mut builder = ChromiumConfig::builder().viewport(ChromiumViewport {
        width,
        height,
        device_scale_factor: None,
        emulating_mobile: false,
        is_landscape: width >= height,
        has_touch: false,
    });

    if let Some(path) = &config.executable_path {
        builder = builder.chrome_executable(path);
    }
    if !config.headless {
        builder = builder.with_head();
    }
    if !config.sandbox {
        builder = builder.no_sandbox();
    }
    if let Some(timeout) = config.request_timeout_secs {
        builder = builder.request_timeout(Duration::from_secs(timeout));
    }

    let mut args = vec![format!("--window-size={width},{height}")];
    if config.disable_gpu {
        args.push("--disable-gpu".into());
    }
    if let Some(user_agent) = &config.user_agent {
        args.push(format!("--user-agent={user_agent}"));
    }
    args.push("--no-first-run".into());
    args.push("--password-store=basic".into());
    builder = builder.args(args);

    builder.build().map_err(BrowserError::Configuration)
}

#[async_trait(?Send)]
impl UiTransport for ChromiumTransport {
    async fn open(&self, url: &str) -> BrowserResult<Box<dyn UiPage>> {
        let page = self.browser.new_page(CreateTargetParams::new(url)).await?;
        page.wait_for_navigation().await?;
        Ok(Box::new(ChromiumPage { page }))
    }

    async fn close(&mut self) -> BrowserResult<()> {
        if self.owns_browser {
            if let Err(err) = self.browser.close().await {
                warn!(error = %err, "Failed to close browser gracefully");
            }
            if let Some(handle) = self.handler_task.take() {
                if let Err(err) = handle.await {
                    warn!(error = %err, "Browser handler join error");
                }
            }
        } else if let Some(handle) = self.handler_task.take() {
            handle.abort();
        }
        Ok(())
    }
}

impl Drop for ChromiumTransport {
    fn drop(&mut self) {
        if let Some(handle) = &self.handler_task {
            if !handle.is_finished() {
                warn!("ChromiumTransport dropped without explicit close");
            }
        }
    }
}

struct ChromiumPage {
    page: Page,
}

#[async_trait(?Send)]
impl UiPage for ChromiumPage {
    async fn find(
        &self,
        selector: &str,
        timeout: Duration,
    ) -> BrowserResult<Option<Box<dyn UiElement>>> {
        match tokio::time::timeout(timeout, self.page.find_element(selector)).await {
            Ok(Ok(element)) => Ok(Some(Box::new(ChromiumElement { element }))),
            // CDP reports a missing node as an error; both that and the probe timeout mean "not yet".
            Ok(Err(_)) | Err(_) => Ok(None),
        }
    }

    async fn screenshot(&self) -> BrowserResult<Vec<u8>> {
        let params = ScreenshotParams::builder().build();
        Ok(self.page.screenshot(params).await?)
    }
}

struct ChromiumElement {
    element: Element,
}

#[async_trait(?Send)]
impl UiElement for ChromiumElement {
    async fn is_visible(&self) -> BrowserResult<bool> {
        let bbox = self.element.bounding_box().await?;
        Ok(bbox.width > 0.0 && bbox.height > 0.0)
    }

    async fn scroll_into_view(&self) -> BrowserResult<()> {
        self.element.scroll_into_view().await?;
        Ok(())
    }

    async fn click(&self) -> BrowserResult<()> {
        self.element.click().await?;
        Ok(())
    }

    async fn screenshot(&self) -> BrowserResult<Vec<u8>> {
        Ok(self.element.screenshot(CaptureScreenshotFormat::Png).await?)
    }
}
