//! In-memory test doubles for sessions, session factories and report sinks
//!
//! [`MockSession`] keeps a tiny page model keyed by locator and records every
//! call, so lifecycle and wait behaviour can be tested without a browser.
//! [`MockSession::calculator`] models the calculator landing page, including
//! computing a result when the compute button is clicked.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;

use crate::actions::option_locator;
use crate::diagnostics::{Attachment, ReportSink};
use crate::error::{E2eError, E2eResult};
use crate::pages::locators;
use crate::session::{BrowserSession, ElementRef, Engine, Locator, SessionFactory, SessionRequest};

/// PNG signature, enough to look like an image to a report.
const FAKE_PNG: &[u8] = &[0x89, b'P', b'N', b'G', 0x0d, 0x0a, 0x1a, 0x0a];

/// State of one mocked element.
#[derive(Debug, Clone, Default)]
pub struct MockElement {
    pub displayed: bool,
    pub enabled: bool,
    pub text: String,
    pub value: String,
    pub options: Vec<String>,
    /// Lookups that report "no such element" before it shows up.
    pub missing_polls: u32,
}

impl MockElement {
    pub fn visible(text: &str) -> Self {
        Self {
            displayed: true,
            enabled: true,
            text: text.to_string(),
            ..Default::default()
        }
    }

    pub fn hidden() -> Self {
        Self {
            enabled: true,
            ..Default::default()
        }
    }

    pub fn disabled(mut self) -> Self {
        self.enabled = false;
        self
    }

    pub fn appearing_after(mut self, polls: u32) -> Self {
        self.missing_polls = polls;
        self
    }

    pub fn with_value(mut self, value: &str) -> Self {
        self.value = value.to_string();
        self
    }

    pub fn with_options(mut self, options: &[&str]) -> Self {
        self.options = options.iter().map(|o| o.to_string()).collect();
        if self.value.is_empty() {
            self.value = self.options.first().cloned().unwrap_or_default();
        }
        self
    }
}

#[derive(Default)]
struct MockState {
    url: String,
    elements: HashMap<Locator, MockElement>,
    /// Option element id -> (select locator, option value).
    options: HashMap<String, (Locator, String)>,
    find_calls: HashMap<Locator, usize>,
    calls: Vec<String>,
    quit: bool,
    quit_calls: usize,
    screenshots: usize,
}

/// A scripted browser session.
pub struct MockSession {
    id: String,
    engine: Engine,
    capture_supported: bool,
    fail_quit: bool,
    fail_navigation: bool,
    calculator: bool,
    state: Mutex<MockState>,
}

impl MockSession {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            engine: Engine::Chrome,
            capture_supported: true,
            fail_quit: false,
            fail_navigation: false,
            calculator: false,
            state: Mutex::new(MockState::default()),
        }
    }

    /// A session showing the calculator landing page.
    pub fn calculator(id: impl Into<String>) -> Self {
        let mut session = Self::new(id);
        session.calculator = true;
        {
            let mut state = session.state.lock();
            state
                .elements
                .insert(locators::header(), MockElement::visible("Simple Calculator App"));
            state.elements.insert(locators::number_one(), MockElement::visible(""));
            state.elements.insert(locators::number_two(), MockElement::visible(""));
            state.elements.insert(
                locators::operation(),
                MockElement::visible("").with_options(&["add", "sub", "mul", "div"]),
            );
            state.elements.insert(locators::compute(), MockElement::visible("Compute"));
            state.elements.insert(locators::result(), MockElement::visible("Result:"));
        }
        session
    }

    pub fn with_engine(mut self, engine: Engine) -> Self {
        self.engine = engine;
        self
    }

    pub fn with_url(self, url: &str) -> Self {
        self.state.lock().url = url.to_string();
        self
    }

    pub fn without_screenshots(mut self) -> Self {
        self.capture_supported = false;
        self
    }

    pub fn failing_quit(mut self) -> Self {
        self.fail_quit = true;
        self
    }

    pub fn failing_navigation(mut self) -> Self {
        self.fail_navigation = true;
        self
    }

    pub fn put_element(&self, locator: &Locator, element: MockElement) {
        self.state.lock().elements.insert(locator.clone(), element);
    }

    pub fn element(&self, locator: &Locator) -> Option<MockElement> {
        self.state.lock().elements.get(locator).cloned()
    }

    pub fn calls(&self) -> Vec<String> {
        self.state.lock().calls.clone()
    }

    pub fn find_calls(&self, locator: &Locator) -> usize {
        self.state.lock().find_calls.get(locator).copied().unwrap_or(0)
    }

    pub fn quit_calls(&self) -> usize {
        self.state.lock().quit_calls
    }

    pub fn screenshots(&self) -> usize {
        self.state.lock().screenshots
    }

    pub fn is_quit(&self) -> bool {
        self.state.lock().quit
    }

    fn live(&self) -> E2eResult<parking_lot::MutexGuard<'_, MockState>> {
        let state = self.state.lock();
        if state.quit {
            return Err(E2eError::StaleSession(self.id.clone()));
        }
        Ok(state)
    }

    fn with_element<T>(
        &self,
        element: &ElementRef,
        f: impl FnOnce(&mut MockElement) -> T,
    ) -> E2eResult<T> {
        let mut state = self.live()?;
        state
            .elements
            .get_mut(&element.locator)
            .map(f)
            .ok_or_else(|| E2eError::WebDriver {
                error: "stale element reference".to_string(),
                message: format!("{} is no longer attached", element.locator),
            })
    }

    /// Run the calculator's compute handler against current inputs.
    fn compute(state: &mut MockState) {
        let read = |locator: &Locator, state: &MockState| {
            state
                .elements
                .get(locator)
                .map(|e| e.value.trim().parse::<f64>().unwrap_or(f64::NAN))
                .unwrap_or(f64::NAN)
        };
        let a = read(&locators::number_one(), state);
        let b = read(&locators::number_two(), state);
        let op = state
            .elements
            .get(&locators::operation())
            .map(|e| e.value.clone())
            .unwrap_or_default();

        let value = match op.as_str() {
            "add" => a + b,
            "sub" => a - b,
            "mul" => a * b,
            "div" => a / b,
            _ => f64::NAN,
        };
        let shown = match value {
            v if v.is_nan() => "NaN".to_string(),
            v if v == f64::INFINITY => "Infinity".to_string(),
            v if v == f64::NEG_INFINITY => "-Infinity".to_string(),
            v => v.to_string(),
        };

        if let Some(result) = state.elements.get_mut(&locators::result()) {
            result.text = format!("Result: {}", shown);
        }
    }
}

#[async_trait]
impl BrowserSession for MockSession {
    fn id(&self) -> &str {
        &self.id
    }

    fn engine(&self) -> Engine {
        self.engine
    }

    async fn navigate(&self, url: &str) -> E2eResult<()> {
        let mut state = self.live()?;
        state.calls.push(format!("navigate {}", url));
        if self.fail_navigation {
            return Err(E2eError::WebDriver {
                error: "unknown error".to_string(),
                message: format!("net::ERR_NAME_NOT_RESOLVED at {}", url),
            });
        }
        state.url = url.to_string();
        Ok(())
    }

    async fn current_url(&self) -> E2eResult<String> {
        Ok(self.live()?.url.clone())
    }

    async fn set_window_size(&self, width: u32, height: u32) -> E2eResult<()> {
        self.live()?.calls.push(format!("set_window_size {}x{}", width, height));
        Ok(())
    }

    async fn maximize(&self) -> E2eResult<()> {
        self.live()?.calls.push("maximize".to_string());
        Ok(())
    }

    async fn find(&self, locator: &Locator) -> E2eResult<Option<ElementRef>> {
        let mut state = self.live()?;
        *state.find_calls.entry(locator.clone()).or_insert(0) += 1;

        let Some(element) = state.elements.get_mut(locator) else {
            return Ok(None);
        };
        if element.missing_polls > 0 {
            element.missing_polls -= 1;
            return Ok(None);
        }
        Ok(Some(ElementRef {
            id: locator.value().to_string(),
            locator: locator.clone(),
        }))
    }

    async fn find_child(
        &self,
        parent: &ElementRef,
        locator: &Locator,
    ) -> E2eResult<Option<ElementRef>> {
        let mut state = self.live()?;
        let Some(select) = state.elements.get(&parent.locator) else {
            return Ok(None);
        };

        let found = select
            .options
            .iter()
            .find(|value| option_locator(value) == *locator)
            .cloned();
        Ok(found.map(|value| {
            let id = format!("{}/option[{}]", parent.id, value);
            state.options.insert(id.clone(), (parent.locator.clone(), value));
            ElementRef {
                id,
                locator: locator.clone(),
            }
        }))
    }

    async fn is_displayed(&self, element: &ElementRef) -> E2eResult<bool> {
        self.with_element(element, |e| e.displayed)
    }

    async fn is_enabled(&self, element: &ElementRef) -> E2eResult<bool> {
        self.with_element(element, |e| e.enabled)
    }

    async fn text(&self, element: &ElementRef) -> E2eResult<String> {
        self.with_element(element, |e| e.text.clone())
    }

    async fn attribute(&self, element: &ElementRef, name: &str) -> E2eResult<Option<String>> {
        let name = name.to_string();
        self.with_element(element, move |e| (name == "value").then(|| e.value.clone()))
    }

    async fn click(&self, element: &ElementRef) -> E2eResult<()> {
        let mut state = self.live()?;
        state.calls.push(format!("click {}", element.id));

        if let Some((select, value)) = state.options.get(&element.id).cloned() {
            if let Some(select) = state.elements.get_mut(&select) {
                select.value = value;
            }
            return Ok(());
        }

        if self.calculator && element.locator == locators::compute() {
            Self::compute(&mut state);
        }
        Ok(())
    }

    async fn clear(&self, element: &ElementRef) -> E2eResult<()> {
        self.with_element(element, |e| e.value.clear())
    }

    async fn send_keys(&self, element: &ElementRef, text: &str) -> E2eResult<()> {
        self.with_element(element, |e| e.value.push_str(text))
    }

    async fn highlight(&self, element: &ElementRef) -> E2eResult<()> {
        self.with_element(element, |_| ())
    }

    async fn screenshot(&self) -> E2eResult<Vec<u8>> {
        if !self.capture_supported {
            return Err(E2eError::CaptureUnsupported);
        }
        let mut state = self.live()?;
        state.screenshots += 1;
        state.calls.push("screenshot".to_string());
        Ok(FAKE_PNG.to_vec())
    }

    async fn quit(&self) -> E2eResult<()> {
        let mut state = self.state.lock();
        state.quit_calls += 1;
        if state.quit {
            return Err(E2eError::StaleSession(self.id.clone()));
        }
        state.quit = true;
        state.calls.push("quit".to_string());

        if self.fail_quit {
            return Err(E2eError::WebDriver {
                error: "unknown error".to_string(),
                message: "browser process already exited".to_string(),
            });
        }
        Ok(())
    }
}

type SessionBuilder = Box<dyn Fn(usize) -> MockSession + Send + Sync>;

/// Factory handing out [`MockSession`]s and recording every request.
pub struct MockFactory {
    build: SessionBuilder,
    requests: Mutex<Vec<SessionRequest>>,
    sessions: Mutex<Vec<Arc<MockSession>>>,
}

impl MockFactory {
    /// `build` receives the zero-based index of the session being created.
    pub fn new(build: impl Fn(usize) -> MockSession + Send + Sync + 'static) -> Self {
        Self {
            build: Box::new(build),
            requests: Mutex::new(Vec::new()),
            sessions: Mutex::new(Vec::new()),
        }
    }

    /// Every session shows the calculator page.
    pub fn calculator() -> Self {
        Self::new(|n| MockSession::calculator(format!("session-{}", n)))
    }

    pub fn requests(&self) -> Vec<SessionRequest> {
        self.requests.lock().clone()
    }

    pub fn sessions(&self) -> Vec<Arc<MockSession>> {
        self.sessions.lock().clone()
    }

    pub fn last_session(&self) -> Option<Arc<MockSession>> {
        self.sessions.lock().last().cloned()
    }
}

#[async_trait]
impl SessionFactory for MockFactory {
    async fn create(&self, request: &SessionRequest) -> E2eResult<Arc<dyn BrowserSession>> {
        self.requests.lock().push(request.clone());
        let index = self.sessions.lock().len();
        let session = Arc::new((self.build)(index).with_engine(request.engine));
        self.sessions.lock().push(session.clone());
        let session: Arc<dyn BrowserSession> = session;
        Ok(session)
    }
}

/// Report sink that keeps everything in memory.
#[derive(Default)]
pub struct MemorySink {
    failing: bool,
    step_names: Mutex<Vec<String>>,
    attachments: Mutex<Vec<Attachment>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// A sink whose every operation fails with an I/O error.
    pub fn failing() -> Self {
        Self {
            failing: true,
            ..Default::default()
        }
    }

    pub fn step_names(&self) -> Vec<String> {
        self.step_names.lock().clone()
    }

    pub fn attachments(&self) -> Vec<Attachment> {
        self.attachments.lock().clone()
    }

    fn check(&self) -> E2eResult<()> {
        if self.failing {
            return Err(E2eError::Io(std::io::Error::new(
                std::io::ErrorKind::Other,
                "report sink offline",
            )));
        }
        Ok(())
    }
}

impl ReportSink for MemorySink {
    fn rename_current_step(&self, name: &str) -> E2eResult<()> {
        self.check()?;
        self.step_names.lock().push(name.to_string());
        Ok(())
    }

    fn attach(&self, attachment: &Attachment) -> E2eResult<()> {
        self.check()?;
        self.attachments.lock().push(attachment.clone());
        Ok(())
    }
}
