//! Page object for the calculator landing page

use std::str::FromStr;

use crate::actions::ElementActions;
use crate::error::{E2eError, E2eResult};
use crate::session::{ElementRef, Locator};

/// Element locators on the landing page.
pub mod locators {
    use crate::session::Locator;

    pub fn header() -> Locator {
        Locator::xpath("//h1[normalize-space()='Simple Calculator App']")
    }

    pub fn number_one() -> Locator {
        Locator::xpath("//input[@id='a']")
    }

    pub fn number_two() -> Locator {
        Locator::xpath("//input[@id='b']")
    }

    pub fn operation() -> Locator {
        Locator::xpath("//select[@id='op']")
    }

    pub fn compute() -> Locator {
        Locator::xpath("//button[@id='compute']")
    }

    pub fn result() -> Locator {
        Locator::xpath("//div[@id='result']")
    }
}

/// Operations offered by the calculator's dropdown.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Add,
    Subtract,
    Multiply,
    Divide,
}

impl Operation {
    /// `value` attribute of the matching `<option>`.
    pub fn option_value(&self) -> &'static str {
        match self {
            Operation::Add => "add",
            Operation::Subtract => "sub",
            Operation::Multiply => "mul",
            Operation::Divide => "div",
        }
    }
}

impl FromStr for Operation {
    type Err = E2eError;

    fn from_str(name: &str) -> Result<Self, Self::Err> {
        match name {
            "add" => Ok(Operation::Add),
            "subtract" => Ok(Operation::Subtract),
            "multiply" => Ok(Operation::Multiply),
            "divide" => Ok(Operation::Divide),
            _ => Err(E2eError::InvalidArgument(format!("Unknown operation: {}", name))),
        }
    }
}

/// The calculator landing page.
pub struct LandingPage {
    actions: ElementActions,
}

impl LandingPage {
    pub fn new(actions: ElementActions) -> Self {
        Self { actions }
    }

    pub async fn is_header_text_visible(&self) -> E2eResult<bool> {
        let header = self.actions.find_element(&locators::header()).await?;
        self.actions.is_displayed(&header).await
    }

    pub async fn number_one_element(&self) -> E2eResult<ElementRef> {
        self.actions.find_element(&locators::number_one()).await
    }

    pub async fn number_two_element(&self) -> E2eResult<ElementRef> {
        self.actions.find_element(&locators::number_two()).await
    }

    pub async fn operation_element(&self) -> E2eResult<ElementRef> {
        self.actions.find_element(&locators::operation()).await
    }

    pub async fn compute_button_element(&self) -> E2eResult<ElementRef> {
        self.actions.find_element(&locators::compute()).await
    }

    pub async fn result_label_element(&self) -> E2eResult<ElementRef> {
        self.actions.find_element(&locators::result()).await
    }

    pub async fn input_number_one(&self, value: &str) -> E2eResult<()> {
        self.actions.input_element(&locators::number_one(), value).await
    }

    pub async fn input_number_two(&self, value: &str) -> E2eResult<()> {
        self.actions.input_element(&locators::number_two(), value).await
    }

    pub async fn select_operation(&self, operation: Operation) -> E2eResult<()> {
        self.actions
            .select_dropdown(&locators::operation(), operation.option_value())
            .await
    }

    pub async fn click_compute(&self) -> E2eResult<()> {
        self.actions.click_element(&locators::compute()).await
    }

    /// Raw text of the result label with the `Result:` prefix removed.
    pub async fn result_text(&self) -> E2eResult<String> {
        let element = self.actions.find_element(&locators::result()).await?;
        let text = self.actions.text(&element).await?;
        Ok(strip_result_prefix(&text).to_string())
    }

    /// Numeric result shown by the page.
    pub async fn result(&self) -> E2eResult<f64> {
        let text = self.result_text().await?;
        parse_result(&text)
    }
}

fn strip_result_prefix(text: &str) -> &str {
    let trimmed = text.trim();
    trimmed.strip_prefix("Result:").unwrap_or(trimmed).trim()
}

/// Parse a result label value; `Infinity` and `NaN` parse to their float
/// counterparts, anything else non-numeric is an error.
pub fn parse_result(text: &str) -> E2eResult<f64> {
    text.trim()
        .parse::<f64>()
        .map_err(|_| E2eError::AssertionFailed(format!("Result '{}' is not a number", text)))
}
