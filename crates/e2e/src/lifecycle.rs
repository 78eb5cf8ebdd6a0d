//! Scenario lifecycle: setup, per-step hooks and teardown
//!
//! Every scenario gets its own [`ScenarioContext`] holding the session
//! registry, the step tracker and the diagnostics recorder. Nothing is shared
//! between scenarios.
//!
//! Teardown is an ordered list of [`TeardownAction`]s. Actions run highest
//! order first and every action runs even if an earlier one failed, so the
//! failure screenshot is taken while the session is still alive and the
//! session is always quit.

use std::path::PathBuf;
use std::sync::Arc;

use tracing::{error, info, warn};

use crate::actions::ElementActions;
use crate::config::{
    ConfigResolver, EnvSource, Overrides, Precedence, ProcessEnv, Setting, DEFAULT_ENVIRONMENT,
};
use crate::diagnostics::{
    DiagnosticsRecorder, ReportSink, DEFAULT_RESULTS_DIR, DEFAULT_SCREENSHOT_DIR,
};
use crate::error::{E2eError, E2eResult};
use crate::pages::LandingPage;
use crate::registry::SessionRegistry;
use crate::session::{
    create_session, BrowserSession, SessionFactory, DEFAULT_WEBDRIVER_URL, HEADLESS_VIEWPORT,
};
use crate::tracker::StepTracker;
use crate::wait::{WaitTimeouts, Waiter};

/// Browser used when no tier names one.
pub const DEFAULT_BROWSER: &str = "chrome";

/// A scenario as seen by the lifecycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Scenario {
    pub name: String,
    pub tags: Vec<String>,
}

impl Scenario {
    pub fn new(name: impl Into<String>, tags: Vec<String>) -> Self {
        Self {
            name: name.into(),
            tags,
        }
    }

    /// Tagged `@api` (any case, with or without the `@`).
    pub fn is_api_only(&self) -> bool {
        self.tags.iter().any(|tag| is_api_tag(tag))
    }
}

pub fn is_api_tag(tag: &str) -> bool {
    tag.trim().trim_start_matches('@').eq_ignore_ascii_case("api")
}

/// Where a scenario is: Setup, Running, Passed or Failed, Teardown, Done.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Setup,
    Running,
    Passed,
    Failed,
    Teardown,
    Done,
}

/// Settings snapshot taken once at scenario setup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedSettings {
    pub environment: String,
    pub browser: String,
    pub headless: bool,
    pub base_url: String,
    pub screenshot_every_step: bool,
    pub webdriver_url: String,
}

impl ResolvedSettings {
    /// Entries for the environment manifest.
    pub fn manifest(&self) -> Vec<(String, String)> {
        vec![
            ("OS".to_string(), std::env::consts::OS.to_string()),
            ("Browser".to_string(), self.browser.clone()),
            ("Headless".to_string(), self.headless.to_string()),
            ("Environment".to_string(), self.environment.clone()),
            ("BaseUrl".to_string(), self.base_url.clone()),
        ]
    }
}

/// Per-scenario state handed to every step.
pub struct ScenarioContext {
    scenario: Scenario,
    settings: ResolvedSettings,
    timeouts: WaitTimeouts,
    registry: SessionRegistry,
    tracker: StepTracker,
    recorder: Option<DiagnosticsRecorder>,
    api_only: bool,
    failed: bool,
    phase: Phase,
}

impl ScenarioContext {
    pub fn scenario(&self) -> &Scenario {
        &self.scenario
    }

    pub fn settings(&self) -> &ResolvedSettings {
        &self.settings
    }

    pub fn timeouts(&self) -> WaitTimeouts {
        self.timeouts
    }

    /// The scenario's live session.
    pub fn session(&self) -> E2eResult<Arc<dyn BrowserSession>> {
        self.registry.get()
    }

    pub fn waiter(&self) -> E2eResult<Waiter> {
        Ok(Waiter::new(self.session()?, self.timeouts))
    }

    pub fn actions(&self) -> E2eResult<ElementActions> {
        Ok(ElementActions::new(self.session()?, self.timeouts))
    }

    pub fn landing_page(&self) -> E2eResult<LandingPage> {
        Ok(LandingPage::new(self.actions()?))
    }

    pub fn tracker(&self) -> &StepTracker {
        &self.tracker
    }

    pub fn diagnostics(&self) -> Option<&DiagnosticsRecorder> {
        self.recorder.as_ref()
    }

    pub fn is_api_only(&self) -> bool {
        self.api_only
    }

    /// Enter step execution.
    pub fn start(&mut self) {
        if self.phase == Phase::Setup {
            self.phase = Phase::Running;
        }
    }

    pub fn mark_failed(&mut self) {
        self.failed = true;
    }

    /// Settle the step outcome once the last step has run.
    pub fn finish_steps(&mut self) -> Phase {
        if matches!(self.phase, Phase::Setup | Phase::Running) {
            self.phase = if self.failed { Phase::Failed } else { Phase::Passed };
        }
        self.phase
    }

    pub fn is_failed(&self) -> bool {
        self.failed
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }
}

/// Cleanup performed after every scenario.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TeardownAction {
    /// Screenshot of a failed, non-API scenario.
    CaptureFailureDiagnostics,
    /// Quit the session if one is registered.
    QuitSession,
}

impl TeardownAction {
    /// Hook order; higher runs first.
    pub fn order(&self) -> u8 {
        match self {
            TeardownAction::CaptureFailureDiagnostics => 1,
            TeardownAction::QuitSession => 0,
        }
    }

    /// All actions in execution order.
    pub fn sequence() -> Vec<TeardownAction> {
        let mut actions = vec![
            TeardownAction::QuitSession,
            TeardownAction::CaptureFailureDiagnostics,
        ];
        actions.sort_by(|a, b| b.order().cmp(&a.order()));
        actions
    }
}

#[derive(Debug)]
pub enum ActionOutcome {
    Completed,
    Skipped,
    Failed(E2eError),
}

/// What happened during teardown, in execution order.
#[derive(Debug, Default)]
pub struct TeardownReport {
    pub actions: Vec<(TeardownAction, ActionOutcome)>,
}

impl TeardownReport {
    fn record(&mut self, action: TeardownAction, outcome: E2eResult<bool>) {
        let outcome = match outcome {
            Ok(true) => ActionOutcome::Completed,
            Ok(false) => ActionOutcome::Skipped,
            Err(e) => {
                warn!("Teardown action {:?} failed: {}", action, e);
                ActionOutcome::Failed(e)
            }
        };
        self.actions.push((action, outcome));
    }

    pub fn outcome(&self, action: TeardownAction) -> Option<&ActionOutcome> {
        self.actions.iter().find(|(a, _)| *a == action).map(|(_, o)| o)
    }

    pub fn failures(&self) -> Vec<String> {
        self.actions
            .iter()
            .filter_map(|(action, outcome)| match outcome {
                ActionOutcome::Failed(e) => Some(format!("{:?}: {}", action, e)),
                _ => None,
            })
            .collect()
    }

    pub fn is_clean(&self) -> bool {
        self.failures().is_empty()
    }

    /// First failure, if any.
    pub fn into_result(self) -> E2eResult<()> {
        for (_, outcome) in self.actions {
            if let ActionOutcome::Failed(e) = outcome {
                return Err(e);
            }
        }
        Ok(())
    }
}

/// Runs the before/after hooks for scenarios.
pub struct ScenarioLifecycle {
    config: Arc<ConfigResolver>,
    overrides: Overrides,
    env: Box<dyn EnvSource>,
    factory: Arc<dyn SessionFactory>,
    sink: Arc<dyn ReportSink>,
    results_dir: PathBuf,
    screenshot_dir: PathBuf,
}

impl ScenarioLifecycle {
    pub fn new(
        config: Arc<ConfigResolver>,
        factory: Arc<dyn SessionFactory>,
        sink: Arc<dyn ReportSink>,
    ) -> Self {
        Self {
            config,
            overrides: Overrides::new(),
            env: Box::new(ProcessEnv),
            factory,
            sink,
            results_dir: PathBuf::from(DEFAULT_RESULTS_DIR),
            screenshot_dir: PathBuf::from(DEFAULT_SCREENSHOT_DIR),
        }
    }

    pub fn with_overrides(mut self, overrides: Overrides) -> Self {
        self.overrides = overrides;
        self
    }

    pub fn with_env(mut self, env: impl EnvSource + 'static) -> Self {
        self.env = Box::new(env);
        self
    }

    pub fn with_results_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.results_dir = dir.into();
        self
    }

    pub fn with_screenshot_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.screenshot_dir = dir.into();
        self
    }

    /// Load the environment's config file and resolve every setting.
    pub fn resolve_settings(&self) -> E2eResult<(ResolvedSettings, WaitTimeouts)> {
        let precedence = Precedence::new(&self.overrides, self.env.as_ref(), &self.config);

        let environment = precedence
            .resolve(Setting::Environment)
            .map(|e| e.trim().to_string())
            .filter(|e| !e.is_empty())
            .unwrap_or_else(|| DEFAULT_ENVIRONMENT.to_string());
        self.config.load(&environment)?;

        let base_url = precedence
            .resolve(Setting::BaseUrl)
            .map(|u| u.trim().to_string())
            .unwrap_or_default();
        if base_url.is_empty() {
            return Err(E2eError::Configuration(
                "Base URL is not configured. Provide --base-url, BASE_URL or APP_URL.".to_string(),
            ));
        }

        let settings = ResolvedSettings {
            environment,
            browser: precedence.resolve_or(Setting::Browser, DEFAULT_BROWSER),
            headless: precedence.resolve_flag(Setting::Headless),
            base_url,
            screenshot_every_step: precedence.resolve_flag(Setting::ScreenshotEveryStep),
            webdriver_url: precedence.resolve_or(Setting::WebDriverUrl, DEFAULT_WEBDRIVER_URL),
        };
        let timeouts = WaitTimeouts::from_config(&self.config)?;

        Ok((settings, timeouts))
    }

    /// Open, size and navigate a session, then build the scenario context.
    ///
    /// If anything fails once the session exists, it is quit before the
    /// error is returned.
    pub async fn before_scenario(
        &self,
        scenario: Scenario,
        tracker: StepTracker,
    ) -> E2eResult<ScenarioContext> {
        let api_only = scenario.is_api_only();
        let (settings, timeouts) = self.resolve_settings()?;

        let session = create_session(
            self.factory.as_ref(),
            &settings.browser,
            settings.headless,
            &settings.webdriver_url,
        )
        .await?;

        if let Err(e) = prepare_window(session.as_ref(), &settings).await {
            error!("Scenario setup failed after session creation: {}", e);
            if let Err(quit_err) = session.quit().await {
                warn!("Failed to quit session {}: {}", session.id(), quit_err);
            }
            return Err(e);
        }

        let mut registry = SessionRegistry::new();
        registry.set(session.clone());

        let recorder = DiagnosticsRecorder::new(session, self.sink.clone(), tracker.clone())
            .with_results_dir(&self.results_dir)
            .with_screenshot_dir(&self.screenshot_dir);
        recorder.write_environment_manifest(&settings.manifest());

        info!("Starting scenario: {}", scenario.name);
        info!(
            "Config: env={}, browser={}, headless={}, baseUrl={}",
            settings.environment, settings.browser, settings.headless, settings.base_url
        );

        Ok(ScenarioContext {
            scenario,
            settings,
            timeouts,
            registry,
            tracker,
            recorder: Some(recorder),
            api_only,
            failed: false,
            phase: Phase::Setup,
        })
    }

    /// Screenshot after a step when every-step capture is on.
    pub async fn after_step(&self, ctx: &ScenarioContext) -> E2eResult<()> {
        if ctx.api_only || !ctx.settings.screenshot_every_step {
            return Ok(());
        }
        match &ctx.recorder {
            Some(recorder) => recorder.attach_screenshot().await,
            None => Ok(()),
        }
    }

    /// Run every teardown action in order.
    pub async fn after_scenario(&self, ctx: &mut ScenarioContext) -> TeardownReport {
        ctx.finish_steps();
        ctx.phase = Phase::Teardown;

        let mut report = TeardownReport::default();
        for action in TeardownAction::sequence() {
            let outcome = match action {
                TeardownAction::CaptureFailureDiagnostics => capture_failure(ctx).await,
                TeardownAction::QuitSession => quit_session(ctx).await,
            };
            report.record(action, outcome);
        }

        ctx.phase = Phase::Done;
        report
    }
}

async fn prepare_window(
    session: &dyn BrowserSession,
    settings: &ResolvedSettings,
) -> E2eResult<()> {
    if settings.headless {
        let (width, height) = HEADLESS_VIEWPORT;
        session.set_window_size(width, height).await?;
    } else {
        session.maximize().await?;
    }
    session.navigate(&settings.base_url).await
}

async fn capture_failure(ctx: &ScenarioContext) -> E2eResult<bool> {
    if !ctx.failed || ctx.api_only {
        return Ok(false);
    }
    let Some(recorder) = &ctx.recorder else {
        return Ok(false);
    };
    recorder.attach_screenshot().await?;
    Ok(true)
}

async fn quit_session(ctx: &mut ScenarioContext) -> E2eResult<bool> {
    let Some(session) = ctx.registry.take() else {
        return Ok(false);
    };
    let result = session.quit().await;
    info!("Closing the browser.");
    result.map(|_| true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{MemorySink, MockFactory, MockSession};
    use std::collections::HashMap;
    use tempfile::TempDir;

    const DEV_TOML: &str = r#"
BROWSER = "chrome"
HEADLESS = true
APP_URL = "https://calc.example/app"
VISIBILITY_TIMEOUT = 1
CLICKABLE_TIMEOUT = 1
FLUENT_TIMEOUT = 1
POLLING_INTERVAL = 10
"#;

    struct Fixture {
        tmp: TempDir,
        factory: Arc<MockFactory>,
        sink: Arc<MemorySink>,
    }

    impl Fixture {
        fn new(factory: MockFactory) -> Self {
            Self::with_config(factory, DEV_TOML)
        }

        fn with_config(factory: MockFactory, body: &str) -> Self {
            let tmp = TempDir::new().unwrap();
            std::fs::create_dir_all(tmp.path().join("config")).unwrap();
            std::fs::write(tmp.path().join("config/dev.toml"), body).unwrap();
            Self {
                tmp,
                factory: Arc::new(factory),
                sink: Arc::new(MemorySink::new()),
            }
        }

        fn lifecycle(&self, env: &[(&str, &str)]) -> ScenarioLifecycle {
            let env: HashMap<String, String> = env
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect();
            ScenarioLifecycle::new(
                Arc::new(ConfigResolver::new(self.tmp.path().join("config"))),
                self.factory.clone(),
                self.sink.clone(),
            )
            .with_env(env)
            .with_results_dir(self.tmp.path().join("results"))
            .with_screenshot_dir(self.tmp.path().join("shots"))
        }

        fn session(&self) -> Arc<MockSession> {
            self.factory.last_session().unwrap()
        }
    }

    fn ui_scenario() -> Scenario {
        Scenario::new("Add two numbers", vec!["@UI".to_string()])
    }

    fn api_scenario() -> Scenario {
        Scenario::new("Landing page responds", vec!["@API".to_string()])
    }

    #[test]
    fn test_api_tag_detection() {
        assert!(is_api_tag("@api"));
        assert!(is_api_tag("API"));
        assert!(is_api_tag(" @Api "));
        assert!(!is_api_tag("@apis"));
        assert!(!ui_scenario().is_api_only());
        assert!(api_scenario().is_api_only());
    }

    #[test]
    fn test_teardown_runs_capture_before_quit() {
        assert_eq!(
            TeardownAction::sequence(),
            vec![TeardownAction::CaptureFailureDiagnostics, TeardownAction::QuitSession]
        );
    }

    #[tokio::test]
    async fn test_headless_setup_sizes_window_and_navigates() {
        let fx = Fixture::new(MockFactory::calculator());
        let ctx = fx
            .lifecycle(&[])
            .before_scenario(ui_scenario(), StepTracker::new())
            .await
            .unwrap();

        assert_eq!(ctx.phase(), Phase::Setup);
        assert_eq!(ctx.settings().environment, "dev");
        assert_eq!(
            fx.session().calls(),
            vec!["set_window_size 1920x1080", "navigate https://calc.example/app"]
        );
        assert_eq!(ctx.timeouts().polling, std::time::Duration::from_millis(10));

        let manifest =
            std::fs::read_to_string(fx.tmp.path().join("results/environment.properties")).unwrap();
        assert!(manifest.contains("Browser=chrome\n"));
        assert!(manifest.contains("Headless=true\n"));
        assert!(manifest.contains("Environment=dev\n"));
        assert!(manifest.contains("BaseUrl=https://calc.example/app\n"));
        assert!(manifest.starts_with("OS="));
    }

    #[tokio::test]
    async fn test_headed_setup_maximizes() {
        let fx = Fixture::new(MockFactory::calculator());
        fx.lifecycle(&[("HEADLESS", "false")])
            .before_scenario(ui_scenario(), StepTracker::new())
            .await
            .unwrap();

        assert_eq!(fx.session().calls()[0], "maximize");
    }

    #[tokio::test]
    async fn test_override_beats_env_beats_file() {
        let fx = Fixture::new(MockFactory::calculator());
        let lifecycle = fx
            .lifecycle(&[("BROWSER", "edge"), ("BASE_URL", "https://env.example")])
            .with_overrides(Overrides::new().with(Setting::Browser, "Firefox"));

        let ctx = lifecycle.before_scenario(ui_scenario(), StepTracker::new()).await.unwrap();

        assert_eq!(ctx.settings().browser, "Firefox");
        assert_eq!(ctx.settings().base_url, "https://env.example");
        assert_eq!(fx.factory.requests()[0].engine, crate::session::Engine::Firefox);
    }

    #[tokio::test]
    async fn test_unsupported_browser_never_reaches_factory() {
        let fx = Fixture::new(MockFactory::calculator());
        let err = fx
            .lifecycle(&[("BROWSER", "safari")])
            .before_scenario(ui_scenario(), StepTracker::new())
            .await
            .err()
            .unwrap();

        assert!(matches!(err, E2eError::UnsupportedEngine { ref name } if name == "safari"));
        assert!(fx.factory.requests().is_empty());
    }

    #[tokio::test]
    async fn test_blank_base_url_fails_before_session() {
        let fx = Fixture::with_config(
            MockFactory::calculator(),
            "BROWSER = \"chrome\"\nAPP_URL = \"  \"\n",
        );
        let err = fx
            .lifecycle(&[])
            .before_scenario(ui_scenario(), StepTracker::new())
            .await
            .err()
            .unwrap();

        assert!(matches!(err, E2eError::Configuration(_)));
        assert!(fx.factory.requests().is_empty());
    }

    #[tokio::test]
    async fn test_missing_environment_file_is_configuration_error() {
        let fx = Fixture::new(MockFactory::calculator());
        let err = fx
            .lifecycle(&[("ENV", "staging")])
            .before_scenario(ui_scenario(), StepTracker::new())
            .await
            .err()
            .unwrap();

        assert!(matches!(err, E2eError::Configuration(_)));
    }

    #[tokio::test]
    async fn test_navigation_failure_quits_session() {
        let fx = Fixture::new(MockFactory::new(|_| {
            MockSession::calculator("s").failing_navigation()
        }));
        let err = fx
            .lifecycle(&[])
            .before_scenario(ui_scenario(), StepTracker::new())
            .await
            .err()
            .unwrap();

        assert!(matches!(err, E2eError::WebDriver { .. }));
        assert_eq!(fx.session().quit_calls(), 1);
    }

    #[tokio::test]
    async fn test_passed_scenario_quits_once_without_screenshot() {
        let fx = Fixture::new(MockFactory::calculator());
        let lifecycle = fx.lifecycle(&[]);
        let mut ctx = lifecycle.before_scenario(ui_scenario(), StepTracker::new()).await.unwrap();

        let report = lifecycle.after_scenario(&mut ctx).await;

        assert!(report.is_clean());
        assert!(matches!(
            report.outcome(TeardownAction::CaptureFailureDiagnostics),
            Some(ActionOutcome::Skipped)
        ));
        assert_eq!(fx.session().quit_calls(), 1);
        assert_eq!(fx.session().screenshots(), 0);
        assert_eq!(ctx.phase(), Phase::Done);
        assert!(matches!(ctx.session(), Err(E2eError::NoActiveSession)));
    }

    #[tokio::test]
    async fn test_failed_scenario_screenshots_then_quits() {
        let fx = Fixture::new(MockFactory::calculator());
        let lifecycle = fx.lifecycle(&[]);
        let mut ctx = lifecycle.before_scenario(ui_scenario(), StepTracker::new()).await.unwrap();
        ctx.mark_failed();

        let report = lifecycle.after_scenario(&mut ctx).await;

        assert!(report.is_clean());
        let calls = fx.session().calls();
        assert_eq!(&calls[calls.len() - 2..], &["screenshot".to_string(), "quit".to_string()]);
        assert_eq!(fx.sink.attachments().len(), 1);
        assert_eq!(fx.session().quit_calls(), 1);
    }

    #[tokio::test]
    async fn test_phases_follow_step_outcome() {
        let fx = Fixture::new(MockFactory::calculator());
        let lifecycle = fx.lifecycle(&[]);

        let mut passed = lifecycle
            .before_scenario(ui_scenario(), StepTracker::new())
            .await
            .unwrap();
        passed.start();
        assert_eq!(passed.phase(), Phase::Running);
        assert_eq!(passed.finish_steps(), Phase::Passed);
        lifecycle.after_scenario(&mut passed).await;
        assert_eq!(passed.phase(), Phase::Done);

        let mut failed = lifecycle
            .before_scenario(ui_scenario(), StepTracker::new())
            .await
            .unwrap();
        failed.start();
        failed.mark_failed();
        assert_eq!(failed.phase(), Phase::Running);
        assert_eq!(failed.finish_steps(), Phase::Failed);
        assert_eq!(failed.finish_steps(), Phase::Failed);
        lifecycle.after_scenario(&mut failed).await;
        assert_eq!(failed.phase(), Phase::Done);
        assert!(failed.is_failed());
    }

    #[tokio::test]
    async fn test_capture_failure_still_quits() {
        let fx = Fixture::new(MockFactory::new(|_| {
            MockSession::calculator("s").without_screenshots()
        }));
        let lifecycle = fx.lifecycle(&[]);
        let mut ctx = lifecycle.before_scenario(ui_scenario(), StepTracker::new()).await.unwrap();
        ctx.mark_failed();

        let report = lifecycle.after_scenario(&mut ctx).await;

        assert!(matches!(
            report.outcome(TeardownAction::CaptureFailureDiagnostics),
            Some(ActionOutcome::Failed(E2eError::CaptureUnsupported))
        ));
        assert!(matches!(
            report.outcome(TeardownAction::QuitSession),
            Some(ActionOutcome::Completed)
        ));
        assert_eq!(fx.session().quit_calls(), 1);
        assert!(matches!(report.into_result(), Err(E2eError::CaptureUnsupported)));
    }

    #[tokio::test]
    async fn test_quit_error_is_reported_not_retried() {
        let fx = Fixture::new(MockFactory::new(|_| MockSession::calculator("s").failing_quit()));
        let lifecycle = fx.lifecycle(&[]);
        let mut ctx = lifecycle.before_scenario(ui_scenario(), StepTracker::new()).await.unwrap();

        let report = lifecycle.after_scenario(&mut ctx).await;
        assert_eq!(report.failures().len(), 1);

        let again = lifecycle.after_scenario(&mut ctx).await;
        assert!(again.is_clean());
        assert_eq!(fx.session().quit_calls(), 1);
    }

    #[tokio::test]
    async fn test_api_scenario_never_screenshots() {
        let fx = Fixture::new(MockFactory::calculator());
        let lifecycle = fx.lifecycle(&[("SCREENSHOT_EVERY_STEP", "true")]);
        let mut ctx = lifecycle.before_scenario(api_scenario(), StepTracker::new()).await.unwrap();
        assert!(ctx.is_api_only());

        lifecycle.after_step(&ctx).await.unwrap();
        ctx.mark_failed();
        let report = lifecycle.after_scenario(&mut ctx).await;

        assert!(report.is_clean());
        assert_eq!(fx.session().screenshots(), 0);
        assert!(fx.sink.attachments().is_empty());
        assert_eq!(fx.session().quit_calls(), 1);
    }

    #[tokio::test]
    async fn test_every_step_screenshot_toggle() {
        let fx = Fixture::new(MockFactory::calculator());

        let lifecycle = fx.lifecycle(&[]);
        let ctx = lifecycle.before_scenario(ui_scenario(), StepTracker::new()).await.unwrap();
        lifecycle.after_step(&ctx).await.unwrap();
        assert_eq!(fx.session().screenshots(), 0);

        let lifecycle = fx
            .lifecycle(&[])
            .with_overrides(Overrides::new().with(Setting::ScreenshotEveryStep, "TRUE"));
        let ctx = lifecycle.before_scenario(ui_scenario(), StepTracker::new()).await.unwrap();
        lifecycle.after_step(&ctx).await.unwrap();
        assert_eq!(fx.session().screenshots(), 1);
        assert_eq!(fx.sink.step_names().len(), 1);
    }
}
