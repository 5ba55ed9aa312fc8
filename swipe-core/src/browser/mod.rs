mod chromium;
mod driver;
mod error;
mod locator;
mod metrics;
mod retry;
mod transport;

pub use chromium::ChromiumTransport;
pub use driver::{Driver, InteractionDriver};
pub use error::{BrowserError, BrowserResult};
pub use locator::{find_first_visible, probe_once, Located, LocatorConfig};
pub use metrics::InteractionMetrics;
pub use retry::{RetryFailure, RetryOutcome, RetryPolicy};
pub use transport::{UiElement, UiPage, UiTransport};

#[cfg(test)]
pub(crate) use locator::testing;
