use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InteractionMetrics {
    pub pages_opened: u64,
    pub clicks: u64,
    pub click_attempts: u64,
    pub click_failures: u64,
    pub locate_timeouts: u64,
    pub screenshots: u64,
}

impl InteractionMetrics {
    pub fn record_page_open(&mut self) {
        self.pages_opened = self.pages_opened.saturating_add(1);
    }

    pub fn record_click(&mut self, attempts: usize) {
        self.clicks = self.clicks.saturating_add(1);
        self.click_attempts = self.click_attempts.saturating_add(attempts as u64);
    }

    pub fn record_click_failure(&mut self, attempts: usize) {
        self.click_failures = self.click_failures.saturating_add(1);
        self.click_attempts = self.click_attempts.saturating_add(attempts as u64);
    }

    pub fn record_locate_timeout(&mut self) {
        self.locate_timeouts = self.locate_timeouts.saturating_add(1);
    }

    pub fn record_screenshot(&mut self) {
        self.screenshots = self.screenshots.saturating_add(1);
    }

    /// Counter name/value pairs, prefixed for the analytics session.
    pub fn counters(&self) -> Vec<(&'static str, u64)> {
        vec![
            ("driver.pages_opened", self.pages_opened),
            ("driver.clicks", self.clicks),
            ("driver.click_attempts", self.click_attempts),
            ("driver.click_failures", self.click_failures),
            ("driver.locate_timeouts", self.locate_timeouts),
            ("driver.screenshots", self.screenshots),
        ]
    }

    pub fn click_retry_rate(&self) -> f64 {
        let finished = self.clicks + self.click_failures;
        if finished == 0 {
            0.0
        } else {
            (self.click_attempts.saturating_sub(finished) as f64 / finished as f64) * 100.0
        }
    }
}
