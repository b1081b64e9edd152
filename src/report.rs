use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::task::{ExecResult, Plan, TaskSpec};
use crate::verify::Verification;

const REPORT_FILE: &str = "report.json";

/// Everything one run planned, did and found
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunReport {
    pub id: String,
    pub created_at: DateTime<Utc>,
    pub backend: String,
    pub task: TaskSpec,
    pub plan: Plan,
    pub results: Vec<ExecResult>,
    pub verification: Verification,
}

impl RunReport {
    pub fn new(
        backend: impl Into<String>,
        task: TaskSpec,
        plan: Plan,
        results: Vec<ExecResult>,
        verification: Verification,
    ) -> Self {
        let short = Uuid::new_v4().simple().to_string();
        Self {
            id: format!("run-{}", &short[..8]),
            created_at: Utc::now(),
            backend: backend.into(),
            task,
            plan,
            results,
            verification,
        }
    }

    /// Number of steps that finished `ok`
    pub fn succeeded(&self) -> usize {
        self.results.iter().filter(|r| r.is_ok()).count()
    }
}

/// Writes the run report next to the step artifacts
pub struct ReportStore {
    dir: PathBuf,
}

impl ReportStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn path(&self) -> PathBuf {
        self.dir.join(REPORT_FILE)
    }

    /// Save, replacing any previous report
    pub fn save(&self, report: &RunReport) -> Result<PathBuf> {
        let path = self.path();
        let content = serde_json::to_string_pretty(report).context("Failed to serialize report")?;
        fs::write(&path, content)
            .context(format!("Failed to write report: {}", path.display()))?;
        Ok(path)
    }

    /// Last saved report, if any
    pub fn load(&self) -> Result<Option<RunReport>> {
        let path = self.path();
        if !path.exists() {
            return Ok(None);
        }
        read_report(&path).map(Some)
    }
}

fn read_report(path: &Path) -> Result<RunReport> {
    let content = fs::read_to_string(path)
        .context(format!("Failed to read report: {}", path.display()))?;
    serde_json::from_str(&content).context(format!("Failed to parse report: {}", path.display()))
}
