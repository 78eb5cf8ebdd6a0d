//! Step definitions for the calculator suite
//!
//! Step lines are matched against a fixed set of patterns and executed
//! against the scenario's context. Browser steps go through the landing page
//! object; API steps use a plain HTTP client.

use std::str::FromStr;

use once_cell::sync::Lazy;
use regex::Regex;
use tracing::{debug, info};

use crate::error::{E2eError, E2eResult};
use crate::lifecycle::ScenarioContext;
use crate::pages::{parse_result, Operation};

/// Allowed distance between expected and displayed results.
pub const RESULT_TOLERANCE: f64 = 0.001;

const NUMBER: &str = r"(-?\d+(?:\.\d+)?)";

struct Patterns {
    two_numbers: Regex,
    operate: Regex,
    result_is: Regex,
    status_is: Regex,
}

impl Patterns {
    fn compile() -> Result<Self, regex::Error> {
        Ok(Self {
            two_numbers: Regex::new(&format!(r"^two numbers {} and {}$", NUMBER, NUMBER))?,
            operate: Regex::new(r"^I (\S+) them$")?,
            result_is: Regex::new(&format!(r"^the result should be {}$", NUMBER))?,
            status_is: Regex::new(r"^the response status should be (\d{3})$")?,
        })
    }
}

static PATTERNS: Lazy<Result<Patterns, regex::Error>> = Lazy::new(Patterns::compile);

#[derive(Debug, Clone, PartialEq)]
pub enum Step {
    OnCalculatorPage,
    SeesCalculatorElements,
    EnterNumbers(f64, f64),
    Operate(String),
    ResultIs(f64),
    ResultUndefined,
    HasBaseUrl,
    GetBaseUrl,
    StatusIs(u16),
}

impl FromStr for Step {
    type Err = E2eError;

    fn from_str(text: &str) -> Result<Self, Self::Err> {
        let line = text.trim();
        let undefined = || E2eError::StepFailed {
            step: line.to_string(),
            reason: "no matching step definition".to_string(),
        };
        let number = |s: &str| s.parse::<f64>().map_err(|_| undefined());

        match line {
            "User is in the calculator page" => return Ok(Step::OnCalculatorPage),
            "User should see the calculator elements" => return Ok(Step::SeesCalculatorElements),
            "the result should be undefined" => return Ok(Step::ResultUndefined),
            "I have the calculator base URL" => return Ok(Step::HasBaseUrl),
            "I send a GET request to the base URL" => return Ok(Step::GetBaseUrl),
            _ => {}
        }

        let patterns = PATTERNS
            .as_ref()
            .map_err(|e| E2eError::Configuration(format!("Invalid step pattern: {}", e)))?;

        if let Some(caps) = patterns.two_numbers.captures(line) {
            return Ok(Step::EnterNumbers(number(&caps[1])?, number(&caps[2])?));
        }
        if let Some(caps) = patterns.operate.captures(line) {
            return Ok(Step::Operate(caps[1].to_string()));
        }
        if let Some(caps) = patterns.result_is.captures(line) {
            return Ok(Step::ResultIs(number(&caps[1])?));
        }
        if let Some(caps) = patterns.status_is.captures(line) {
            let status = caps[1].parse().map_err(|_| undefined())?;
            return Ok(Step::StatusIs(status));
        }

        Err(undefined())
    }
}

/// State carried between the steps of one scenario.
#[derive(Debug, Default)]
pub struct StepWorld {
    http: reqwest::Client,
    base_url: Option<String>,
    status: Option<u16>,
}

impl StepWorld {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn status(&self) -> Option<u16> {
        self.status
    }
}

impl Step {
    pub async fn execute(&self, ctx: &ScenarioContext, world: &mut StepWorld) -> E2eResult<()> {
        debug!("Executing step: {:?}", self);
        match self {
            Step::OnCalculatorPage => {
                let page = ctx.landing_page()?;
                if !page.is_header_text_visible().await? {
                    return Err(E2eError::AssertionFailed(
                        "Calculator header is not visible".to_string(),
                    ));
                }
                Ok(())
            }
            Step::SeesCalculatorElements => {
                let page = ctx.landing_page()?;
                let actions = ctx.actions()?;
                let elements = [
                    page.number_one_element().await?,
                    page.number_two_element().await?,
                    page.operation_element().await?,
                    page.compute_button_element().await?,
                    page.result_label_element().await?,
                ];
                for element in &elements {
                    if !actions.is_displayed(element).await? {
                        return Err(E2eError::AssertionFailed(format!(
                            "{} is not displayed",
                            element.locator
                        )));
                    }
                }
                Ok(())
            }
            Step::EnterNumbers(first, second) => {
                let page = ctx.landing_page()?;
                page.input_number_one(&format!("{:?}", first)).await?;
                page.input_number_two(&format!("{:?}", second)).await
            }
            Step::Operate(name) => {
                let operation: Operation = name.parse()?;
                let page = ctx.landing_page()?;
                page.select_operation(operation).await?;
                page.click_compute().await
            }
            Step::ResultIs(expected) => {
                let actual = ctx.landing_page()?.result().await?;
                if (actual - expected).abs() <= RESULT_TOLERANCE {
                    Ok(())
                } else {
                    Err(E2eError::AssertionFailed(format!(
                        "Verify calculator result equals expected: \
                         expected {} within {}, but was {}",
                        expected, RESULT_TOLERANCE, actual
                    )))
                }
            }
            Step::ResultUndefined => {
                let text = ctx.landing_page()?.result_text().await?;
                if is_undefined_result(&text) {
                    Ok(())
                } else {
                    Err(E2eError::AssertionFailed(format!(
                        "Expected an undefined result, but was {}",
                        text
                    )))
                }
            }
            Step::HasBaseUrl => {
                world.base_url = Some(ctx.settings().base_url.clone());
                Ok(())
            }
            Step::GetBaseUrl => {
                let url = world.base_url.clone().ok_or_else(|| E2eError::StepFailed {
                    step: "I send a GET request to the base URL".to_string(),
                    reason: "base URL was not set by a previous step".to_string(),
                })?;
                let response = world.http.get(&url).send().await?;
                let status = response.status().as_u16();
                info!("GET {} -> {}", url, status);
                world.status = Some(status);
                Ok(())
            }
            Step::StatusIs(expected) => match world.status {
                Some(actual) if actual == *expected => Ok(()),
                Some(actual) => Err(E2eError::AssertionFailed(format!(
                    "Expected response status {}, but was {}",
                    expected, actual
                ))),
                None => Err(E2eError::StepFailed {
                    step: format!("the response status should be {}", expected),
                    reason: "no request has been sent".to_string(),
                }),
            },
        }
    }
}

/// A displayed result is undefined when it is not a number at all or is
/// not finite.
pub fn is_undefined_result(text: &str) -> bool {
    match parse_result(text) {
        Ok(value) => !value.is_finite(),
        Err(_) => true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test_case("User is in the calculator page", Step::OnCalculatorPage)]
    #[test_case("User should see the calculator elements", Step::SeesCalculatorElements)]
    #[test_case("two numbers 5.0 and 3.0", Step::EnterNumbers(5.0, 3.0))]
    #[test_case("two numbers -1 and 0", Step::EnterNumbers(-1.0, 0.0))]
    #[test_case("I divide them", Step::Operate("divide".to_string()))]
    #[test_case("the result should be 8.0", Step::ResultIs(8.0))]
    #[test_case("the result should be undefined", Step::ResultUndefined)]
    #[test_case("I have the calculator base URL", Step::HasBaseUrl)]
    #[test_case("I send a GET request to the base URL", Step::GetBaseUrl)]
    #[test_case("the response status should be 200", Step::StatusIs(200))]
    fn test_step_matching(text: &str, expected: Step) {
        assert_eq!(text.parse::<Step>().unwrap(), expected);
    }

    #[test]
    fn test_unknown_step_is_reported() {
        let err = "I fly to the moon".parse::<Step>().unwrap_err();
        assert!(
            matches!(err, E2eError::StepFailed { ref step, .. } if step == "I fly to the moon")
        );
    }

    #[test_case("Infinity", true)]
    #[test_case("NaN", true)]
    #[test_case("Error: division by zero", true)]
    #[test_case("", true)]
    #[test_case("8", false)]
    #[test_case("-0.5", false)]
    fn test_undefined_result(text: &str, undefined: bool) {
        assert_eq!(is_undefined_result(text), undefined);
    }

    #[test]
    fn test_numbers_are_typed_with_decimal_point() {
        assert_eq!(format!("{:?}", 5.0_f64), "5.0");
        assert_eq!(format!("{:?}", 2.5_f64), "2.5");
    }
}
