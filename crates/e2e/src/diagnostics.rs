//! Report attachments: text notes, screenshots and the environment manifest
//!
//! Reporting must never fail a scenario, so sink and filesystem errors are
//! logged and dropped. The one exception is a session that cannot take
//! screenshots at all: that is a misconfiguration and is returned.

use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::{DateTime, Local, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tracing::{debug, error, info};

use crate::error::{E2eError, E2eResult};
use crate::session::BrowserSession;
use crate::tracker::StepTracker;

/// Default location of report results (attachments and manifest).
pub const DEFAULT_RESULTS_DIR: &str = "target/allure-results";

/// Manifest file name inside the results directory.
pub const MANIFEST_FILE: &str = "environment.properties";

/// Attachment index inside the results directory, one JSON record per line.
pub const ATTACHMENT_INDEX: &str = "attachments.jsonl";

/// Default location for timestamped screenshot files.
pub const DEFAULT_SCREENSHOT_DIR: &str = "reports/screenshots";

const TEXT_MARKER: &str = "📄";
const SCREENSHOT_MARKER: &str = "📸";

/// A payload attached to the current report step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attachment {
    pub name: String,
    pub content_type: String,
    pub extension: String,
    pub data: Vec<u8>,
}

impl Attachment {
    pub fn text(message: &str) -> Self {
        Self {
            name: "Sample Text".to_string(),
            content_type: "text/plain".to_string(),
            extension: ".txt".to_string(),
            data: message.as_bytes().to_vec(),
        }
    }

    pub fn screenshot(png: Vec<u8>) -> Self {
        Self {
            name: "Screenshot".to_string(),
            content_type: "image/png".to_string(),
            extension: ".png".to_string(),
            data: png,
        }
    }
}

/// Destination for report steps and attachments.
pub trait ReportSink: Send + Sync {
    /// Rename the report step that is currently open.
    fn rename_current_step(&self, name: &str) -> E2eResult<()>;

    /// Attach a payload to the current step.
    fn attach(&self, attachment: &Attachment) -> E2eResult<()>;
}

/// Entry in the attachment index.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AttachmentRecord {
    pub name: String,
    #[serde(rename = "type")]
    pub content_type: String,
    pub source: String,
    pub step: String,
    pub attached_at: DateTime<Utc>,
}

/// Writes attachments into a results directory, named by content hash,
/// and appends to an index of which step each belongs to.
pub struct DirectorySink {
    dir: PathBuf,
    current_step: Mutex<String>,
}

impl DirectorySink {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            current_step: Mutex::new(String::new()),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Read the attachment index back; empty if nothing was attached.
    pub fn records(&self) -> E2eResult<Vec<AttachmentRecord>> {
        let path = self.dir.join(ATTACHMENT_INDEX);
        if !path.exists() {
            return Ok(Vec::new());
        }
        std::fs::read_to_string(path)?
            .lines()
            .filter(|line| !line.trim().is_empty())
            .map(|line| serde_json::from_str::<AttachmentRecord>(line).map_err(E2eError::from))
            .collect()
    }
}

impl ReportSink for DirectorySink {
    fn rename_current_step(&self, name: &str) -> E2eResult<()> {
        *self.current_step.lock() = name.to_string();
        Ok(())
    }

    fn attach(&self, attachment: &Attachment) -> E2eResult<()> {
        std::fs::create_dir_all(&self.dir)?;

        let digest = hex::encode(Sha256::digest(&attachment.data));
        let source = format!("{}-attachment{}", digest, attachment.extension);
        std::fs::write(self.dir.join(&source), &attachment.data)?;

        // The step lock also serializes appends to the index.
        let step = self.current_step.lock();
        let record = AttachmentRecord {
            name: attachment.name.clone(),
            content_type: attachment.content_type.clone(),
            source,
            step: step.clone(),
            attached_at: Utc::now(),
        };
        let mut index = OpenOptions::new()
            .create(true)
            .append(true)
            .open(self.dir.join(ATTACHMENT_INDEX))?;
        writeln!(index, "{}", serde_json::to_string(&record)?)?;

        Ok(())
    }
}

/// Captures diagnostics for one scenario.
pub struct DiagnosticsRecorder {
    session: Arc<dyn BrowserSession>,
    sink: Arc<dyn ReportSink>,
    tracker: StepTracker,
    results_dir: PathBuf,
    screenshot_dir: PathBuf,
}

impl DiagnosticsRecorder {
    pub fn new(
        session: Arc<dyn BrowserSession>,
        sink: Arc<dyn ReportSink>,
        tracker: StepTracker,
    ) -> Self {
        Self {
            session,
            sink,
            tracker,
            results_dir: PathBuf::from(DEFAULT_RESULTS_DIR),
            screenshot_dir: PathBuf::from(DEFAULT_SCREENSHOT_DIR),
        }
    }

    pub fn with_results_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.results_dir = dir.into();
        self
    }

    pub fn with_screenshot_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.screenshot_dir = dir.into();
        self
    }

    fn relabel(&self, marker: &str) {
        let label = self.tracker.current().unwrap_or_default();
        let name = format!("{} {}", marker, label);
        if let Err(e) = self.sink.rename_current_step(name.trim_end()) {
            error!("Failed to rename report step: {}", e);
        }
    }

    fn deliver(&self, attachment: &Attachment) {
        match self.sink.attach(attachment) {
            Ok(()) => debug!("Attached '{}' ({} bytes)", attachment.name, attachment.data.len()),
            Err(e) => error!("Failed to attach '{}': {}", attachment.name, e),
        }
    }

    /// Attach a UTF-8 note to the current step.
    pub fn attach_text(&self, message: &str) {
        self.relabel(TEXT_MARKER);
        self.deliver(&Attachment::text(message));
    }

    /// Capture the viewport and attach it to the current step.
    ///
    /// Fails only when the session cannot produce a screenshot.
    pub async fn attach_screenshot(&self) -> E2eResult<()> {
        let png = self.session.screenshot().await?;
        self.relabel(SCREENSHOT_MARKER);
        self.deliver(&Attachment::screenshot(png));
        Ok(())
    }

    /// Capture the viewport to `<screenshot_dir>/<prefix>_<yyyyMMdd_HHmmss>.png`.
    ///
    /// Returns the written path, or `None` if the file could not be saved.
    pub async fn save_screenshot(&self, prefix: &str) -> E2eResult<Option<PathBuf>> {
        let png = self.session.screenshot().await?;
        let stamp = Local::now().format("%Y%m%d_%H%M%S");
        let path = self.screenshot_dir.join(format!("{}_{}.png", prefix, stamp));

        let written = std::fs::create_dir_all(&self.screenshot_dir)
            .and_then(|_| std::fs::write(&path, &png));
        match written {
            Ok(()) => {
                info!("Screenshot saved: {}", path.display());
                Ok(Some(path))
            }
            Err(e) => {
                error!("Failed to save screenshot {}: {}", path.display(), e);
                Ok(None)
            }
        }
    }

    /// Write the environment manifest into the results directory.
    pub fn write_environment_manifest(&self, entries: &[(String, String)]) {
        write_environment_manifest(&self.results_dir, entries);
    }
}

/// Write `key=value` lines to `<dir>/environment.properties`.
///
/// Failures are logged and swallowed.
pub fn write_environment_manifest(dir: &Path, entries: &[(String, String)]) {
    let path = dir.join(MANIFEST_FILE);
    let body: String = entries
        .iter()
        .map(|(key, value)| format!("{}={}\n", key, value))
        .collect();

    let written = std::fs::create_dir_all(dir).and_then(|_| std::fs::write(&path, body));
    match written {
        Ok(()) => debug!("Environment manifest written to {}", path.display()),
        Err(e) => error!("Failed to write environment manifest {}: {}", path.display(), e),
    }
}
