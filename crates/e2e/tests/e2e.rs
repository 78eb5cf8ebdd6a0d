//! E2E test harness entry point
//!
//! This file is the test binary that runs the calculator features.
//! Run with: cargo test --package calculator-e2e --test e2e -- --live
//!
//! Without `--live` (or `E2E_LIVE=true`) the selected features are only
//! checked: every step line must match a step definition.

use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use calculator_e2e::diagnostics::{DirectorySink, DEFAULT_RESULTS_DIR, DEFAULT_SCREENSHOT_DIR};
use calculator_e2e::steps::Step;
use calculator_e2e::{
    ConfigResolver, E2eResult, Overrides, RunnerConfig, ScenarioLifecycle, Setting, TestRunner,
    WebDriverFactory,
};

#[derive(Parser, Debug)]
#[command(name = "calculator-e2e")]
#[command(about = "E2E test runner for the calculator app")]
struct Args {
    /// Drive a real browser through the configured WebDriver endpoint
    #[arg(long, env = "E2E_LIVE")]
    live: bool,

    /// Environment name; selects config/<env>.toml
    #[arg(long)]
    env: Option<String>,

    /// Browser engine (chrome, firefox, edge)
    #[arg(long)]
    browser: Option<String>,

    /// Run the browser headless
    #[arg(long)]
    headless: Option<bool>,

    /// Base URL of the calculator app
    #[arg(long)]
    base_url: Option<String>,

    /// Attach a screenshot after every step
    #[arg(long)]
    screenshot_every_step: Option<bool>,

    /// WebDriver endpoint
    #[arg(long)]
    webdriver_url: Option<String>,

    /// Path to feature files directory
    #[arg(short, long, default_value = "features")]
    features: PathBuf,

    /// Run only scenarios matching this tag
    #[arg(short, long)]
    tag: Option<String>,

    /// Run only a specific scenario by name
    #[arg(short, long)]
    name: Option<String>,

    /// Directory holding per-environment config files
    #[arg(long, default_value = "config")]
    config_dir: PathBuf,

    /// Report attachments and environment manifest
    #[arg(long, default_value = DEFAULT_RESULTS_DIR)]
    results_dir: PathBuf,

    /// Saved screenshots
    #[arg(long, default_value = DEFAULT_SCREENSHOT_DIR)]
    screenshot_dir: PathBuf,

    /// Output directory for results
    #[arg(short, long, default_value = "target/e2e-results")]
    output: PathBuf,
}

impl Args {
    fn overrides(&self) -> Overrides {
        let mut overrides = Overrides::new();
        let flags = [
            (Setting::Environment, self.env.clone()),
            (Setting::Browser, self.browser.clone()),
            (Setting::Headless, self.headless.map(|h| h.to_string())),
            (Setting::BaseUrl, self.base_url.clone()),
            (Setting::ScreenshotEveryStep, self.screenshot_every_step.map(|s| s.to_string())),
            (Setting::WebDriverUrl, self.webdriver_url.clone()),
        ];
        for (setting, value) in flags {
            if let Some(value) = value {
                overrides.set(setting, value);
            }
        }
        overrides
    }

    fn runner_config(&self) -> RunnerConfig {
        RunnerConfig {
            features_dir: self.features.clone(),
            output_dir: self.output.clone(),
            tag: self.tag.clone(),
            name: self.name.clone(),
        }
    }
}

fn main() {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();

    let rt = tokio::runtime::Runtime::new().expect("Failed to create tokio runtime");
    let result = rt.block_on(async_main(args));

    match result {
        Ok(true) => std::process::exit(0),
        Ok(false) => std::process::exit(1),
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(2);
        }
    }
}

async fn async_main(args: Args) -> E2eResult<bool> {
    let sink = Arc::new(DirectorySink::new(&args.results_dir));
    let lifecycle = ScenarioLifecycle::new(
        Arc::new(ConfigResolver::new(&args.config_dir)),
        Arc::new(WebDriverFactory::new()),
        sink,
    )
    .with_overrides(args.overrides())
    .with_results_dir(&args.results_dir)
    .with_screenshot_dir(&args.screenshot_dir);

    let runner = TestRunner::new(lifecycle, args.runner_config());

    if !args.live {
        return check_features(&runner);
    }

    let results = runner.run_all().await?;
    runner.write_results(&results)?;

    Ok(results.is_success())
}

/// Match every selected step line without opening a browser.
fn check_features(runner: &TestRunner) -> E2eResult<bool> {
    let features = runner.load_features()?;
    let mut undefined = 0;

    for feature in &features {
        for scenario in &feature.scenarios {
            for text in &scenario.steps {
                if let Err(e) = text.parse::<Step>() {
                    error!("{} / {}: {}", feature.name, scenario.name, e);
                    undefined += 1;
                }
            }
        }
    }

    let total: usize = features.iter().map(|f| f.scenarios.len()).sum();
    info!(
        "Checked {} scenario(s), {} undefined step(s). Pass --live to run them.",
        total, undefined
    );
    Ok(undefined == 0)
}
