//! Browser sessions and the engine-dispatching session factory

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{json, Value};
use tracing::info;

use crate::error::{E2eError, E2eResult};
use crate::webdriver::WebDriverSession;

/// Viewport applied to every headless session.
pub const HEADLESS_VIEWPORT: (u32, u32) = (1920, 1080);

/// Endpoint used when `WEBDRIVER_URL` is not configured anywhere.
pub const DEFAULT_WEBDRIVER_URL: &str = "http://localhost:4444";

/// Supported browser engines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Engine {
    Chrome,
    Firefox,
    Edge,
}

impl Engine {
    pub fn as_str(&self) -> &'static str {
        match self {
            Engine::Chrome => "chrome",
            Engine::Firefox => "firefox",
            Engine::Edge => "edge",
        }
    }

    /// `browserName` capability understood by the driver.
    fn browser_name(&self) -> &'static str {
        match self {
            Engine::Chrome => "chrome",
            Engine::Firefox => "firefox",
            Engine::Edge => "MicrosoftEdge",
        }
    }

    /// Vendor key carrying command-line arguments.
    fn options_key(&self) -> &'static str {
        match self {
            Engine::Chrome => "goog:chromeOptions",
            Engine::Firefox => "moz:firefoxOptions",
            Engine::Edge => "ms:edgeOptions",
        }
    }

    /// Launch arguments for headless mode.
    pub fn headless_args(&self) -> Vec<String> {
        let (width, height) = HEADLESS_VIEWPORT;
        match self {
            Engine::Chrome => vec![
                "--headless=new".to_string(),
                format!("--window-size={},{}", width, height),
                "--disable-gpu".to_string(),
                "--no-sandbox".to_string(),
            ],
            Engine::Firefox => vec![
                "-headless".to_string(),
                format!("--width={}", width),
                format!("--height={}", height),
            ],
            Engine::Edge => vec![
                "--headless=new".to_string(),
                format!("--window-size={},{}", width, height),
            ],
        }
    }

    /// W3C `alwaysMatch` capabilities for a new session.
    pub fn capabilities(&self, headless: bool) -> Value {
        let args = if headless { self.headless_args() } else { Vec::new() };
        let mut caps = json!({ "browserName": self.browser_name() });
        caps[self.options_key()] = json!({ "args": args });
        caps
    }
}

impl FromStr for Engine {
    type Err = E2eError;

    fn from_str(name: &str) -> Result<Self, Self::Err> {
        match name.trim().to_ascii_lowercase().as_str() {
            "chrome" => Ok(Engine::Chrome),
            "firefox" => Ok(Engine::Firefox),
            "edge" => Ok(Engine::Edge),
            _ => Err(E2eError::UnsupportedEngine {
                name: name.to_string(),
            }),
        }
    }
}

impl fmt::Display for Engine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How to find an element on the page.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Locator {
    Css(String),
    XPath(String),
}

impl Locator {
    pub fn css(selector: impl Into<String>) -> Self {
        Locator::Css(selector.into())
    }

    pub fn xpath(expr: impl Into<String>) -> Self {
        Locator::XPath(expr.into())
    }

    /// W3C location strategy name.
    pub fn strategy(&self) -> &'static str {
        match self {
            Locator::Css(_) => "css selector",
            Locator::XPath(_) => "xpath",
        }
    }

    pub fn value(&self) -> &str {
        match self {
            Locator::Css(s) | Locator::XPath(s) => s,
        }
    }
}

impl fmt::Display for Locator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Locator::Css(s) => write!(f, "By.cssSelector: {}", s),
            Locator::XPath(s) => write!(f, "By.xpath: {}", s),
        }
    }
}

/// Reference to an element found during the current page state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ElementRef {
    pub id: String,
    pub locator: Locator,
}

/// One live browser automation connection.
///
/// Implementations must fail every call made after [`quit`](Self::quit)
/// with [`E2eError::StaleSession`].
#[async_trait]
pub trait BrowserSession: Send + Sync {
    fn id(&self) -> &str;

    fn engine(&self) -> Engine;

    async fn navigate(&self, url: &str) -> E2eResult<()>;

    async fn current_url(&self) -> E2eResult<String>;

    async fn set_window_size(&self, width: u32, height: u32) -> E2eResult<()>;

    async fn maximize(&self) -> E2eResult<()>;

    /// Find the first element matching `locator`; `Ok(None)` if none exists.
    async fn find(&self, locator: &Locator) -> E2eResult<Option<ElementRef>>;

    /// Find a descendant of `parent`; `Ok(None)` if none exists.
    async fn find_child(
        &self,
        parent: &ElementRef,
        locator: &Locator,
    ) -> E2eResult<Option<ElementRef>>;

    async fn is_displayed(&self, element: &ElementRef) -> E2eResult<bool>;

    async fn is_enabled(&self, element: &ElementRef) -> E2eResult<bool>;

    async fn text(&self, element: &ElementRef) -> E2eResult<String>;

    async fn attribute(&self, element: &ElementRef, name: &str) -> E2eResult<Option<String>>;

    async fn click(&self, element: &ElementRef) -> E2eResult<()>;

    async fn clear(&self, element: &ElementRef) -> E2eResult<()>;

    async fn send_keys(&self, element: &ElementRef, text: &str) -> E2eResult<()>;

    /// Outline an element on screen for visual debugging.
    async fn highlight(&self, element: &ElementRef) -> E2eResult<()>;

    /// PNG bytes of the current viewport.
    async fn screenshot(&self) -> E2eResult<Vec<u8>> {
        Err(E2eError::CaptureUnsupported)
    }

    async fn quit(&self) -> E2eResult<()>;
}

/// Everything needed to open a session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionRequest {
    pub engine: Engine,
    pub headless: bool,
    pub webdriver_url: String,
}

/// Opens browser sessions.
#[async_trait]
pub trait SessionFactory: Send + Sync {
    async fn create(&self, request: &SessionRequest) -> E2eResult<Arc<dyn BrowserSession>>;
}

/// Factory backed by a W3C WebDriver endpoint (chromedriver, geckodriver,
/// msedgedriver or a Selenium server).
#[derive(Debug, Clone, Default)]
pub struct WebDriverFactory {
    client: reqwest::Client,
}

impl WebDriverFactory {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SessionFactory for WebDriverFactory {
    async fn create(&self, request: &SessionRequest) -> E2eResult<Arc<dyn BrowserSession>> {
        info!(
            "Starting {} session (headless={}) via {}",
            request.engine, request.headless, request.webdriver_url
        );
        let session = WebDriverSession::start(
            self.client.clone(),
            &request.webdriver_url,
            request.engine,
            request.engine.capabilities(request.headless),
        )
        .await?;
        Ok(Arc::new(session))
    }
}

/// Parse `engine_name` and open a session.
///
/// The name is validated before the factory is touched, so an unsupported
/// engine never reaches a driver.
pub async fn create_session(
    factory: &dyn SessionFactory,
    engine_name: &str,
    headless: bool,
    webdriver_url: &str,
) -> E2eResult<Arc<dyn BrowserSession>> {
    let engine: Engine = engine_name.parse()?;
    factory
        .create(&SessionRequest {
            engine,
            headless,
            webdriver_url: webdriver_url.to_string(),
        })
        .await
}
