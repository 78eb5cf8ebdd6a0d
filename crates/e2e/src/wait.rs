//! Polling waits for asynchronous UI state
//!
//! Every interaction is preceded by an explicit wait instead of a fixed
//! sleep. A wait polls one [`Condition`] until it holds or the deadline
//! passes, then fails with [`E2eError::WaitTimeout`] naming the condition.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use tokio::time::{sleep, Instant};
use tracing::{debug, warn};

use crate::config::ConfigResolver;
use crate::error::{E2eError, E2eResult};
use crate::session::{BrowserSession, ElementRef, Locator};
use crate::webdriver::is_stale_element;

/// Poll cadence for every wait except the fluent one.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(500);

/// Deadline used when `now + timeout` does not fit in an `Instant`.
const FAR_FUTURE: Duration = Duration::from_secs(60 * 60 * 24 * 365 * 30);

/// The four wait tunables read from the environment config.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WaitTimeouts {
    pub visibility: Duration,
    pub clickable: Duration,
    pub fluent: Duration,
    pub polling: Duration,
}

impl Default for WaitTimeouts {
    fn default() -> Self {
        Self {
            visibility: Duration::from_secs(10),
            clickable: Duration::from_secs(10),
            fluent: Duration::from_secs(15),
            polling: DEFAULT_POLL_INTERVAL,
        }
    }
}

impl WaitTimeouts {
    /// Read `VISIBILITY_TIMEOUT`, `CLICKABLE_TIMEOUT`, `FLUENT_TIMEOUT`
    /// (seconds) and `POLLING_INTERVAL` (milliseconds). Absent keys keep
    /// their defaults.
    pub fn from_config(config: &ConfigResolver) -> E2eResult<Self> {
        let defaults = Self::default();
        let secs = |key: &str, fallback: Duration| -> E2eResult<Duration> {
            Ok(config.get_u64(key)?.map(Duration::from_secs).unwrap_or(fallback))
        };

        let polling = config
            .get_u64("POLLING_INTERVAL")?
            .map(Duration::from_millis)
            .unwrap_or(defaults.polling);
        if polling.is_zero() {
            return Err(E2eError::Configuration(
                "POLLING_INTERVAL must be greater than zero".to_string(),
            ));
        }

        Ok(Self {
            visibility: secs("VISIBILITY_TIMEOUT", defaults.visibility)?,
            clickable: secs("CLICKABLE_TIMEOUT", defaults.clickable)?,
            fluent: secs("FLUENT_TIMEOUT", defaults.fluent)?,
            polling,
        })
    }
}

/// Something to wait for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Condition {
    /// Element exists and is rendered visible.
    Visible(Locator),
    /// Element is visible and enabled.
    Clickable(Locator),
    /// Element text contains the substring.
    TextPresent(Locator, String),
    /// Current URL contains the substring.
    UrlContains(String),
    /// Current URL equals the target, ignoring one trailing `/` on either side.
    UrlEquals(String),
    /// Element exists in the DOM.
    Present(Locator),
}

impl fmt::Display for Condition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Condition::Visible(l) => write!(f, "visibility of element located by {}", l),
            Condition::Clickable(l) => write!(f, "element to be clickable: {}", l),
            Condition::TextPresent(l, t) => {
                write!(f, "text ('{}') to be present in element located by {}", t, l)
            }
            Condition::UrlContains(u) => write!(f, "url to contain \"{}\"", u),
            Condition::UrlEquals(u) => write!(f, "url to be \"{}\"", u),
            Condition::Present(l) => write!(f, "presence of element located by {}", l),
        }
    }
}

/// A single wait request.
#[derive(Debug, Clone)]
pub struct WaitSpec {
    pub condition: Condition,
    pub timeout: Duration,
    pub polling: Option<Duration>,
}

impl WaitSpec {
    pub fn new(condition: Condition, timeout: Duration) -> Self {
        Self {
            condition,
            timeout,
            polling: None,
        }
    }

    pub fn polling(mut self, interval: Duration) -> Self {
        self.polling = Some(interval);
        self
    }
}

/// What a satisfied wait produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WaitOutcome {
    Element(ElementRef),
    Satisfied,
}

/// Wait primitives bound to one session.
#[derive(Clone)]
pub struct Waiter {
    session: Arc<dyn BrowserSession>,
    timeouts: WaitTimeouts,
}

impl Waiter {
    pub fn new(session: Arc<dyn BrowserSession>, timeouts: WaitTimeouts) -> Self {
        Self { session, timeouts }
    }

    pub fn timeouts(&self) -> &WaitTimeouts {
        &self.timeouts
    }

    pub async fn wait_visible(
        &self,
        locator: &Locator,
        timeout: Duration,
    ) -> E2eResult<ElementRef> {
        self.until_element(WaitSpec::new(Condition::Visible(locator.clone()), timeout))
            .await
    }

    pub async fn wait_clickable(
        &self,
        locator: &Locator,
        timeout: Duration,
    ) -> E2eResult<ElementRef> {
        self.until_element(WaitSpec::new(Condition::Clickable(locator.clone()), timeout))
            .await
    }

    pub async fn wait_text_present(
        &self,
        locator: &Locator,
        text: &str,
        timeout: Duration,
    ) -> E2eResult<bool> {
        let spec = WaitSpec::new(
            Condition::TextPresent(locator.clone(), text.to_string()),
            timeout,
        );
        self.until(spec).await.map(|_| true)
    }

    pub async fn wait_url_contains(&self, partial: &str, timeout: Duration) -> E2eResult<()> {
        let spec = WaitSpec::new(Condition::UrlContains(partial.to_string()), timeout);
        self.until(spec).await.map(|_| ())
    }

    pub async fn wait_url_equals(&self, url: &str, timeout: Duration) -> E2eResult<bool> {
        let spec = WaitSpec::new(Condition::UrlEquals(url.to_string()), timeout);
        self.until(spec).await.map(|_| true)
    }

    /// Wait for presence with a caller-chosen cadence; a missing element
    /// is retried until the deadline.
    pub async fn fluent_wait(
        &self,
        locator: &Locator,
        timeout: Duration,
        polling: Duration,
    ) -> E2eResult<ElementRef> {
        let spec = WaitSpec::new(Condition::Present(locator.clone()), timeout).polling(polling);
        self.until_element(spec).await
    }

    async fn until_element(&self, spec: WaitSpec) -> E2eResult<ElementRef> {
        let condition = spec.condition.to_string();
        match self.until(spec).await? {
            WaitOutcome::Element(element) => Ok(element),
            WaitOutcome::Satisfied => Err(E2eError::InvalidArgument(format!(
                "{} does not produce an element",
                condition
            ))),
        }
    }

    /// Poll `spec.condition` until it holds or `spec.timeout` elapses.
    ///
    /// The condition is always checked at least once, even with a zero
    /// timeout.
    pub async fn until(&self, spec: WaitSpec) -> E2eResult<WaitOutcome> {
        let interval = spec.polling.unwrap_or(DEFAULT_POLL_INTERVAL);
        let deadline = deadline_after(spec.timeout);
        let mut attempts = 0u32;

        loop {
            attempts += 1;

            match self.check_condition(&spec.condition).await {
                Ok(Some(outcome)) => {
                    debug!("Satisfied {} after {} attempt(s)", spec.condition, attempts);
                    return Ok(outcome);
                }
                Ok(None) => {}
                Err(e) if retryable(&spec.condition, &e) => {
                    debug!("Retrying {}: {}", spec.condition, e);
                }
                Err(e) => return Err(e),
            }

            let now = Instant::now();
            if now >= deadline {
                warn!(
                    "Gave up waiting for {} after {} attempt(s)",
                    spec.condition, attempts
                );
                return Err(E2eError::WaitTimeout {
                    condition: spec.condition.to_string(),
                    timeout: spec.timeout,
                });
            }

            sleep(interval.min(deadline - now)).await;
        }
    }

    /// Check the condition once. `Ok(None)` means "not yet".
    async fn check_condition(&self, condition: &Condition) -> E2eResult<Option<WaitOutcome>> {
        let session = self.session.as_ref();

        match condition {
            Condition::Present(locator) => {
                Ok(session.find(locator).await?.map(WaitOutcome::Element))
            }
            Condition::Visible(locator) => {
                let Some(element) = session.find(locator).await? else {
                    return Ok(None);
                };
                if session.is_displayed(&element).await? {
                    Ok(Some(WaitOutcome::Element(element)))
                } else {
                    Ok(None)
                }
            }
            Condition::Clickable(locator) => {
                let Some(element) = session.find(locator).await? else {
                    return Ok(None);
                };
                if session.is_displayed(&element).await? && session.is_enabled(&element).await? {
                    Ok(Some(WaitOutcome::Element(element)))
                } else {
                    Ok(None)
                }
            }
            Condition::TextPresent(locator, text) => {
                let Some(element) = session.find(locator).await? else {
                    return Ok(None);
                };
                if session.text(&element).await?.contains(text.as_str()) {
                    Ok(Some(WaitOutcome::Satisfied))
                } else {
                    Ok(None)
                }
            }
            Condition::UrlContains(partial) => {
                let current = session.current_url().await?;
                Ok(current.contains(partial.as_str()).then_some(WaitOutcome::Satisfied))
            }
            Condition::UrlEquals(url) => {
                let current = session.current_url().await?;
                Ok(urls_match(&current, url).then_some(WaitOutcome::Satisfied))
            }
        }
    }
}

/// Stale references are retried for state conditions; presence polling
/// only tolerates absence.
fn retryable(condition: &Condition, err: &E2eError) -> bool {
    !matches!(condition, Condition::Present(_)) && is_stale_element(err)
}

/// Compare URLs after stripping a single trailing `/` from each.
pub fn urls_match(actual: &str, expected: &str) -> bool {
    strip_one_slash(actual) == strip_one_slash(expected)
}

fn strip_one_slash(url: &str) -> &str {
    url.strip_suffix('/').unwrap_or(url)
}

fn deadline_after(timeout: Duration) -> Instant {
    let now = Instant::now();
    now.checked_add(timeout).unwrap_or_else(|| now + FAR_FUTURE)
}
