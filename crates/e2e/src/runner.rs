//! Main test runner that drives feature scenarios through the lifecycle hooks

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, warn};

use crate::error::{E2eError, E2eResult};
use crate::lifecycle::{ScenarioContext, ScenarioLifecycle};
use crate::spec::{Feature, ScenarioSpec};
use crate::steps::{Step, StepWorld};
use crate::tracker::{StepListener, StepStarted, StepTracker};

/// Name of the results file written into the output directory.
pub const RESULTS_FILE: &str = "test-results.json";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepStatus {
    Passed,
    Failed,
    Skipped,
}

/// Result of a single step
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StepResult {
    pub text: String,
    pub status: StepStatus,
    pub duration_ms: u64,
    pub error: Option<String>,
}

/// Result of running a single scenario
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TestResult {
    pub feature: String,
    pub name: String,
    pub tags: Vec<String>,
    pub success: bool,
    pub duration_ms: u64,
    pub steps: Vec<StepResult>,
    pub error: Option<String>,
    /// Teardown problems; these never flip `success`.
    #[serde(default)]
    pub teardown_errors: Vec<String>,
}

/// Result of running all scenarios
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TestSuiteResult {
    pub total: usize,
    pub passed: usize,
    pub failed: usize,
    pub skipped: usize,
    pub duration_ms: u64,
    pub results: Vec<TestResult>,
}

impl TestSuiteResult {
    pub fn is_success(&self) -> bool {
        self.failed == 0
    }
}

/// Configuration for the test runner
#[derive(Debug, Clone)]
pub struct RunnerConfig {
    pub features_dir: PathBuf,
    pub output_dir: PathBuf,
    /// Only scenarios with this tag
    pub tag: Option<String>,
    /// Only the scenario with this exact name
    pub name: Option<String>,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            features_dir: PathBuf::from("features"),
            output_dir: PathBuf::from("target/e2e-results"),
            tag: None,
            name: None,
        }
    }
}

/// Runs scenarios one after another, each with its own context.
pub struct TestRunner {
    lifecycle: ScenarioLifecycle,
    config: RunnerConfig,
    listeners: Vec<Arc<dyn StepListener>>,
}

impl TestRunner {
    pub fn new(lifecycle: ScenarioLifecycle, config: RunnerConfig) -> Self {
        Self {
            lifecycle,
            config,
            listeners: Vec::new(),
        }
    }

    /// Register an extra receiver for step-started events.
    pub fn add_listener(&mut self, listener: Arc<dyn StepListener>) {
        self.listeners.push(listener);
    }

    /// Load features and apply the tag and name filters
    pub fn load_features(&self) -> E2eResult<Vec<Feature>> {
        let mut features = Feature::load_all(&self.config.features_dir)?;
        if let Some(tag) = &self.config.tag {
            features = Feature::filter_by_tag(features, tag);
        }
        if let Some(name) = &self.config.name {
            features = Feature::filter_by_name(features, name);
            if features.is_empty() {
                return Err(E2eError::SpecParse(format!("Scenario not found: {}", name)));
            }
        }
        Ok(features)
    }

    /// Run every selected scenario
    pub async fn run_all(&self) -> E2eResult<TestSuiteResult> {
        let features = self.load_features()?;
        Ok(self.run_features(&features).await)
    }

    pub async fn run_features(&self, features: &[Feature]) -> TestSuiteResult {
        let start = Instant::now();
        let total: usize = features.iter().map(|f| f.scenarios.len()).sum();
        let mut results = Vec::with_capacity(total);

        info!("Running {} scenario(s)...", total);

        for feature in features {
            for spec in &feature.scenarios {
                let result = self.run_scenario(feature, spec).await;
                if result.success {
                    info!("✓ {} ({} ms)", result.name, result.duration_ms);
                } else {
                    error!(
                        "✗ {} - {}",
                        result.name,
                        result.error.as_deref().unwrap_or("unknown error")
                    );
                }
                results.push(result);
            }
        }

        let passed = results.iter().filter(|r| r.success).count();
        let failed = results.len() - passed;
        let duration_ms = start.elapsed().as_millis() as u64;

        info!("Test Results: {} passed, {} failed ({} ms)", passed, failed, duration_ms);

        TestSuiteResult {
            total,
            passed,
            failed,
            skipped: 0,
            duration_ms,
            results,
        }
    }

    /// Run one scenario: setup, steps until the first failure, teardown.
    pub async fn run_scenario(&self, feature: &Feature, spec: &ScenarioSpec) -> TestResult {
        let start = Instant::now();
        let scenario = spec.to_scenario(feature);
        let tracker = StepTracker::new();
        debug!("Running scenario: {}", scenario.name);

        let mut result = TestResult {
            feature: feature.name.clone(),
            name: scenario.name.clone(),
            tags: scenario.tags.clone(),
            success: false,
            duration_ms: 0,
            steps: Vec::new(),
            error: None,
            teardown_errors: Vec::new(),
        };

        let mut ctx = match self.lifecycle.before_scenario(scenario, tracker.clone()).await {
            Ok(ctx) => ctx,
            Err(e) => {
                result.error = Some(format!("Setup failed: {}", e));
                result.steps = spec.steps.iter().map(|text| skipped(text)).collect();
                result.duration_ms = start.elapsed().as_millis() as u64;
                return result;
            }
        };

        ctx.start();
        let mut world = StepWorld::new();
        for text in &spec.steps {
            if result.error.is_some() {
                result.steps.push(skipped(text));
                continue;
            }

            self.publish(&tracker, &StepStarted::Text { text: text.clone() });
            let step_start = Instant::now();
            let outcome = self.run_step(&ctx, &mut world, text).await;
            let duration_ms = step_start.elapsed().as_millis() as u64;

            match outcome {
                Ok(()) => result.steps.push(StepResult {
                    text: text.clone(),
                    status: StepStatus::Passed,
                    duration_ms,
                    error: None,
                }),
                Err(e) => {
                    error!("Step failed: {} - {}", text, e);
                    ctx.mark_failed();
                    result.error = Some(e.to_string());
                    result.steps.push(StepResult {
                        text: text.clone(),
                        status: StepStatus::Failed,
                        duration_ms,
                        error: Some(e.to_string()),
                    });
                }
            }
        }

        let phase = ctx.finish_steps();
        debug!("Scenario '{}' finished steps: {:?}", result.name, phase);

        self.publish(
            &tracker,
            &StepStarted::Hook {
                name: "after_scenario".to_string(),
            },
        );
        let report = self.lifecycle.after_scenario(&mut ctx).await;
        for failure in report.failures() {
            warn!("Teardown of '{}': {}", result.name, failure);
        }

        result.success = !ctx.is_failed();
        result.teardown_errors = report.failures();
        result.duration_ms = start.elapsed().as_millis() as u64;
        result
    }

    async fn run_step(
        &self,
        ctx: &ScenarioContext,
        world: &mut StepWorld,
        text: &str,
    ) -> E2eResult<()> {
        let outcome = match text.parse::<Step>() {
            Ok(step) => step.execute(ctx, world).await,
            Err(e) => Err(e),
        };

        match (outcome, self.lifecycle.after_step(ctx).await) {
            (Ok(()), hook) => hook,
            (Err(e), Err(hook_err)) => {
                warn!("After-step hook failed: {}", hook_err);
                Err(e)
            }
            (Err(e), Ok(())) => Err(e),
        }
    }

    fn publish(&self, tracker: &StepTracker, event: &StepStarted) {
        tracker.on_step_started(event);
        for listener in &self.listeners {
            listener.on_step_started(event);
        }
    }

    /// Write test results to JSON file
    pub fn write_results(&self, results: &TestSuiteResult) -> E2eResult<PathBuf> {
        write_results(&self.config.output_dir, results)
    }
}

fn skipped(text: &str) -> StepResult {
    StepResult {
        text: text.to_string(),
        status: StepStatus::Skipped,
        duration_ms: 0,
        error: None,
    }
}

/// Write `results` to `<dir>/test-results.json`.
pub fn write_results(dir: &Path, results: &TestSuiteResult) -> E2eResult<PathBuf> {
    std::fs::create_dir_all(dir)?;

    let path = dir.join(RESULTS_FILE);
    let json = serde_json::to_string_pretty(results)?;
    std::fs::write(&path, json)?;

    info!("Results written to: {}", path.display());
    Ok(path)
}
