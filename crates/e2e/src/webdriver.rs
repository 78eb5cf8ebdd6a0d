//! Minimal W3C WebDriver client
//!
//! Speaks the JSON-over-HTTP protocol directly: every command is a request
//! against `/session/{id}/...` and every reply wraps its payload in a
//! `value` field. Errors come back as `{"value": {"error", "message"}}`.

use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD as B64;
use base64::Engine as _;
use reqwest::{Method, StatusCode};
use serde_json::{json, Value};
use tracing::{debug, info};

use crate::error::{E2eError, E2eResult};
use crate::session::{BrowserSession, ElementRef, Engine, Locator};

/// Key under which W3C drivers return element references.
const ELEMENT_KEY: &str = "element-6066-11e4-a52e-4f735466cecf";

const HIGHLIGHT_SCRIPT: &str =
    "arguments[0].style.border='2px solid yellow'; arguments[0].style.backgroundColor='yellow';";

/// A session on a remote WebDriver endpoint.
pub struct WebDriverSession {
    client: reqwest::Client,
    endpoint: String,
    id: String,
    engine: Engine,
    quit: AtomicBool,
}

impl WebDriverSession {
    /// Open a new session with the given capabilities.
    pub async fn start(
        client: reqwest::Client,
        endpoint: &str,
        engine: Engine,
        capabilities: Value,
    ) -> E2eResult<Self> {
        let endpoint = endpoint.trim_end_matches('/').to_string();
        let body = json!({ "capabilities": { "alwaysMatch": capabilities } });

        let resp = client
            .post(format!("{}/session", endpoint))
            .json(&body)
            .send()
            .await?;
        let value = unwrap_reply(resp).await?;

        let id = value
            .get("sessionId")
            .and_then(Value::as_str)
            .ok_or_else(|| E2eError::WebDriver {
                error: "invalid response".to_string(),
                message: format!("new session reply has no sessionId: {}", value),
            })?
            .to_string();

        info!("WebDriver session {} started", id);

        Ok(Self {
            client,
            endpoint,
            id,
            engine,
            quit: AtomicBool::new(false),
        })
    }

    fn ensure_live(&self) -> E2eResult<()> {
        if self.quit.load(Ordering::SeqCst) {
            return Err(E2eError::StaleSession(self.id.clone()));
        }
        Ok(())
    }

    async fn command(&self, method: Method, path: &str, body: Option<Value>) -> E2eResult<Value> {
        self.ensure_live()?;
        self.send(method, path, body).await
    }

    async fn send(&self, method: Method, path: &str, body: Option<Value>) -> E2eResult<Value> {
        let url = format!("{}/session/{}{}", self.endpoint, self.id, path);
        debug!("WebDriver {} {}", method, url);

        let mut req = self.client.request(method, url.as_str());
        if let Some(body) = body {
            req = req.json(&body);
        }
        unwrap_reply(req.send().await?).await
    }

    async fn element_command(&self, element: &ElementRef, path: &str) -> E2eResult<Value> {
        self.command(Method::GET, &format!("/element/{}{}", element.id, path), None)
            .await
    }

    fn locate_body(locator: &Locator) -> Value {
        json!({ "using": locator.strategy(), "value": locator.value() })
    }

    fn element_from(value: Value, locator: &Locator) -> E2eResult<ElementRef> {
        let id = value
            .get(ELEMENT_KEY)
            .and_then(Value::as_str)
            .ok_or_else(|| E2eError::WebDriver {
                error: "invalid response".to_string(),
                message: format!("no element reference for {}", locator),
            })?;
        Ok(ElementRef {
            id: id.to_string(),
            locator: locator.clone(),
        })
    }

    async fn locate(&self, path: &str, locator: &Locator) -> E2eResult<Option<ElementRef>> {
        match self
            .command(Method::POST, path, Some(Self::locate_body(locator)))
            .await
        {
            Ok(value) => Self::element_from(value, locator).map(Some),
            Err(e) if is_no_such_element(&e) => Ok(None),
            Err(e) => Err(e),
        }
    }
}

#[async_trait]
impl BrowserSession for WebDriverSession {
    fn id(&self) -> &str {
        &self.id
    }

    fn engine(&self) -> Engine {
        self.engine
    }

    async fn navigate(&self, url: &str) -> E2eResult<()> {
        self.command(Method::POST, "/url", Some(json!({ "url": url })))
            .await?;
        Ok(())
    }

    async fn current_url(&self) -> E2eResult<String> {
        let value = self.command(Method::GET, "/url", None).await?;
        Ok(value.as_str().unwrap_or_default().to_string())
    }

    async fn set_window_size(&self, width: u32, height: u32) -> E2eResult<()> {
        self.command(
            Method::POST,
            "/window/rect",
            Some(json!({ "width": width, "height": height })),
        )
        .await?;
        Ok(())
    }

    async fn maximize(&self) -> E2eResult<()> {
        self.command(Method::POST, "/window/maximize", Some(json!({})))
            .await?;
        Ok(())
    }

    async fn find(&self, locator: &Locator) -> E2eResult<Option<ElementRef>> {
        self.locate("/element", locator).await
    }

    async fn find_child(
        &self,
        parent: &ElementRef,
        locator: &Locator,
    ) -> E2eResult<Option<ElementRef>> {
        self.locate(&format!("/element/{}/element", parent.id), locator)
            .await
    }

    async fn is_displayed(&self, element: &ElementRef) -> E2eResult<bool> {
        Ok(self
            .element_command(element, "/displayed")
            .await?
            .as_bool()
            .unwrap_or(false))
    }

    async fn is_enabled(&self, element: &ElementRef) -> E2eResult<bool> {
        Ok(self
            .element_command(element, "/enabled")
            .await?
            .as_bool()
            .unwrap_or(false))
    }

    async fn text(&self, element: &ElementRef) -> E2eResult<String> {
        let value = self.element_command(element, "/text").await?;
        Ok(value.as_str().unwrap_or_default().to_string())
    }

    async fn attribute(&self, element: &ElementRef, name: &str) -> E2eResult<Option<String>> {
        let value = self
            .element_command(element, &format!("/attribute/{}", name))
            .await?;
        Ok(value.as_str().map(String::from))
    }

    async fn click(&self, element: &ElementRef) -> E2eResult<()> {
        self.command(
            Method::POST,
            &format!("/element/{}/click", element.id),
            Some(json!({})),
        )
        .await?;
        Ok(())
    }

    async fn clear(&self, element: &ElementRef) -> E2eResult<()> {
        self.command(
            Method::POST,
            &format!("/element/{}/clear", element.id),
            Some(json!({})),
        )
        .await?;
        Ok(())
    }

    async fn send_keys(&self, element: &ElementRef, text: &str) -> E2eResult<()> {
        self.command(
            Method::POST,
            &format!("/element/{}/value", element.id),
            Some(json!({ "text": text })),
        )
        .await?;
        Ok(())
    }

    async fn highlight(&self, element: &ElementRef) -> E2eResult<()> {
        let mut arg = serde_json::Map::new();
        arg.insert(ELEMENT_KEY.to_string(), Value::String(element.id.clone()));
        self.command(
            Method::POST,
            "/execute/sync",
            Some(json!({ "script": HIGHLIGHT_SCRIPT, "args": [arg] })),
        )
        .await?;
        Ok(())
    }

    async fn screenshot(&self) -> E2eResult<Vec<u8>> {
        let value = self.command(Method::GET, "/screenshot", None).await?;
        let encoded = value.as_str().ok_or_else(|| E2eError::WebDriver {
            error: "invalid response".to_string(),
            message: "screenshot reply is not a string".to_string(),
        })?;
        B64.decode(encoded).map_err(|e| E2eError::WebDriver {
            error: "invalid response".to_string(),
            message: format!("screenshot is not valid base64: {}", e),
        })
    }

    async fn quit(&self) -> E2eResult<()> {
        if self.quit.swap(true, Ordering::SeqCst) {
            return Err(E2eError::StaleSession(self.id.clone()));
        }
        self.send(Method::DELETE, "", None).await?;
        info!("WebDriver session {} closed", self.id);
        Ok(())
    }
}

/// Extract `value` from a reply, turning W3C error payloads into errors.
async fn unwrap_reply(resp: reqwest::Response) -> E2eResult<Value> {
    let status = resp.status();
    let body: Value = resp.json().await?;
    reply_value(status, body)
}

fn reply_value(status: StatusCode, mut body: Value) -> E2eResult<Value> {
    let value = body.get_mut("value").map(Value::take).unwrap_or(Value::Null);

    if let Some(error) = value.get("error").and_then(Value::as_str) {
        return Err(E2eError::WebDriver {
            error: error.to_string(),
            message: value
                .get("message")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string(),
        });
    }

    if !status.is_success() {
        return Err(E2eError::WebDriver {
            error: status.to_string(),
            message: value.to_string(),
        });
    }

    Ok(value)
}

fn is_no_such_element(err: &E2eError) -> bool {
    matches!(err, E2eError::WebDriver { error, .. } if error == "no such element")
}

/// Whether the error says an element reference went stale.
pub fn is_stale_element(err: &E2eError) -> bool {
    matches!(err, E2eError::WebDriver { error, .. } if error == "stale element reference")
}
