//! Calculator E2E Test Harness
//!
//! This crate drives a browser through the calculator web app and provides:
//! - Per-environment configuration with override precedence
//! - Browser sessions over the W3C WebDriver protocol
//! - Polling waits for UI state with bounded timeouts
//! - Scenario setup and teardown with failure diagnostics
//! - Declarative YAML feature files and a scenario runner
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                    E2E Test Runner (Rust)                   │
//! ├─────────────────────────────────────────────────────────────┤
//! │  TestRunner                                                 │
//! │    ├── load_features() -> [Feature]                         │
//! │    ├── publish(StepStarted) -> StepTracker, listeners       │
//! │    └── run_scenario(feature, scenario) -> TestResult        │
//! ├─────────────────────────────────────────────────────────────┤
//! │  ScenarioLifecycle                                          │
//! │    ├── before_scenario()                                    │
//! │    │     ├── ConfigResolver + Precedence -> settings        │
//! │    │     ├── SessionFactory -> BrowserSession               │
//! │    │     └── SessionRegistry, DiagnosticsRecorder           │
//! │    ├── after_step()   -> every-step screenshot              │
//! │    └── after_scenario()                                     │
//! │          ├── CaptureFailureDiagnostics                      │
//! │          └── QuitSession                                    │
//! ├─────────────────────────────────────────────────────────────┤
//! │  Steps -> LandingPage -> ElementActions -> Waiter           │
//! └─────────────────────────────────────────────────────────────┘
//! ```

pub mod actions;
pub mod config;
pub mod diagnostics;
pub mod error;
pub mod lifecycle;
pub mod pages;
pub mod registry;
pub mod runner;
pub mod session;
pub mod spec;
pub mod steps;
#[cfg(any(test, feature = "testing"))]
pub mod testing;
pub mod tracker;
pub mod wait;
pub mod webdriver;

pub use config::{ConfigResolver, Overrides, Setting};
pub use error::{E2eError, E2eResult};
pub use lifecycle::{Scenario, ScenarioContext, ScenarioLifecycle};
pub use runner::{RunnerConfig, TestRunner, TestSuiteResult};
pub use session::{BrowserSession, Engine, Locator, SessionFactory, WebDriverFactory};
pub use spec::Feature;
