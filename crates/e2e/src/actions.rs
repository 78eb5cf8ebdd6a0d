//! Wait-then-act helpers used by page objects
//!
//! Each action waits for the right element state, highlights the element,
//! performs the interaction and logs the outcome with the locator.

use std::sync::Arc;

use tracing::{error, info};

use crate::error::{E2eError, E2eResult};
use crate::session::{BrowserSession, ElementRef, Locator};
use crate::wait::{WaitTimeouts, Waiter};

#[derive(Clone)]
pub struct ElementActions {
    session: Arc<dyn BrowserSession>,
    waiter: Waiter,
}

impl ElementActions {
    pub fn new(session: Arc<dyn BrowserSession>, timeouts: WaitTimeouts) -> Self {
        let waiter = Waiter::new(session.clone(), timeouts);
        Self { session, waiter }
    }

    pub fn waiter(&self) -> &Waiter {
        &self.waiter
    }

    fn timeouts(&self) -> WaitTimeouts {
        *self.waiter.timeouts()
    }

    /// Wait for `locator` to be visible and return it.
    pub async fn find_element(&self, locator: &Locator) -> E2eResult<ElementRef> {
        self.waiter
            .wait_visible(locator, self.timeouts().visibility)
            .await
            .map_err(|e| {
                error!("Failed to find element: {}", locator);
                e
            })
    }

    pub async fn is_displayed(&self, element: &ElementRef) -> E2eResult<bool> {
        self.session.is_displayed(element).await
    }

    pub async fn text(&self, element: &ElementRef) -> E2eResult<String> {
        self.session.text(element).await
    }

    pub async fn click_element(&self, locator: &Locator) -> E2eResult<()> {
        let result: E2eResult<()> = async {
            let element = self
                .waiter
                .wait_clickable(locator, self.timeouts().clickable)
                .await?;
            self.session.highlight(&element).await?;
            self.session.click(&element).await
        }
        .await;

        match &result {
            Ok(()) => info!("Clicked on element: {}", locator),
            Err(_) => error!("Failed to click on element: {}", locator),
        }
        result
    }

    /// Click after a presence-only fluent wait.
    pub async fn click_element_fluent(&self, locator: &Locator) -> E2eResult<()> {
        let timeouts = self.timeouts();
        let result: E2eResult<()> = async {
            let element = self
                .waiter
                .fluent_wait(locator, timeouts.fluent, timeouts.polling)
                .await?;
            self.session.highlight(&element).await?;
            self.session.click(&element).await
        }
        .await;

        match &result {
            Ok(()) => info!("Clicked on element (using fluent wait): {}", locator),
            Err(_) => error!("Failed to click on element (using fluent wait): {}", locator),
        }
        result
    }

    /// Clear an input and type `text` into it.
    pub async fn input_element(&self, locator: &Locator, text: &str) -> E2eResult<()> {
        let result: E2eResult<()> = async {
            let element = self
                .waiter
                .wait_visible(locator, self.timeouts().visibility)
                .await?;
            self.session.highlight(&element).await?;
            self.session.clear(&element).await?;
            self.session.send_keys(&element, text).await
        }
        .await;

        match &result {
            Ok(()) => info!("Entered text in element: {} - Text: {}", locator, text),
            Err(_) => error!("Failed to enter text in element: {} - Text: {}", locator, text),
        }
        result
    }

    /// Pick the `<option>` whose `value` attribute equals `value`.
    pub async fn select_dropdown(&self, locator: &Locator, value: &str) -> E2eResult<()> {
        let result: E2eResult<()> = async {
            let select = self
                .waiter
                .wait_visible(locator, self.timeouts().visibility)
                .await?;
            self.session.highlight(&select).await?;

            let option = self
                .session
                .find_child(&select, &option_locator(value))
                .await?
                .ok_or_else(|| {
                    E2eError::InvalidArgument(format!("Cannot locate option with value: {}", value))
                })?;
            self.session.click(&option).await
        }
        .await;

        match &result {
            Ok(()) => info!("Selected in the dropdown: {} - Value: {}", locator, value),
            Err(_) => error!("Failed to select in the dropdown: {} - Value: {}", locator, value),
        }
        result
    }

    pub async fn verify_displayed(&self, locator: &Locator) -> E2eResult<()> {
        match self.find_element(locator).await {
            Ok(element) => {
                self.session.highlight(&element).await?;
                info!("Element is displayed: {}", locator);
                Ok(())
            }
            Err(e) => {
                error!("Element is not displayed: {}", locator);
                Err(e)
            }
        }
    }

    /// Log whether `actual` contains `expected`. Never fails.
    pub fn verify_text_contains(&self, actual: Option<&str>, expected: &str) -> bool {
        match actual {
            Some(text) if text.contains(expected) => {
                info!("Text contains: {}", expected);
                true
            }
            _ => {
                error!("Expected to contain: {}, but was: {:?}", expected, actual);
                false
            }
        }
    }

    /// Assert the element's text equals `expected` exactly.
    pub async fn text_equals(&self, locator: &Locator, expected: &str) -> E2eResult<()> {
        let element = self.find_element(locator).await?;
        self.session.highlight(&element).await?;
        let actual = self.session.text(&element).await?;

        if actual == expected {
            info!("Text matches expected: {}", expected);
            Ok(())
        } else {
            error!("Text does not match expected. Found: {}, Expected: {}", actual, expected);
            Err(E2eError::AssertionFailed(format!(
                "{}: expected text '{}', found '{}'",
                locator, expected, actual
            )))
        }
    }

    /// Assert an attribute of the element equals `expected`.
    pub async fn attribute_equals(
        &self,
        locator: &Locator,
        attribute: &str,
        expected: &str,
    ) -> E2eResult<()> {
        let element = self.find_element(locator).await?;
        let actual = self.session.attribute(&element, attribute).await?;

        if actual.as_deref() == Some(expected) {
            info!("Attribute '{}' matches expected: {}", attribute, expected);
            Ok(())
        } else {
            error!(
                "Attribute '{}' does not match expected. Found: {:?}, Expected: {}",
                attribute, actual, expected
            );
            Err(E2eError::AssertionFailed(format!(
                "{}: expected {}='{}', found {:?}",
                locator, attribute, expected, actual
            )))
        }
    }
}

/// Locator for a child `<option>` with the given value.
pub fn option_locator(value: &str) -> Locator {
    Locator::css(format!("option[value=\"{}\"]", value))
}
