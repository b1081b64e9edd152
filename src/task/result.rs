use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// Step outcome
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExecStatus {
    Ok,
    Error,
}

impl ExecStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Ok => "ok",
            Self::Error => "error",
        }
    }
}

/// What a step left behind
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExecOutputs {
    /// Produced artifact
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file: Option<PathBuf>,
    /// Backend diagnostic log
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub log: String,
}

/// Outcome of one step. `error` is set exactly when the status is `Error`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "StoredResult")]
pub struct ExecResult {
    /// Ordinal label, `S1`, `S2`, ...
    pub step_id: String,
    pub action: String,
    status: ExecStatus,
    pub outputs: ExecOutputs,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    error: Option<String>,
    #[serde(default)]
    pub duration_ms: u64,
}

impl ExecResult {
    pub fn ok(step_id: impl Into<String>, action: impl Into<String>, outputs: ExecOutputs) -> Self {
        Self {
            step_id: step_id.into(),
            action: action.into(),
            status: ExecStatus::Ok,
            outputs,
            error: None,
            duration_ms: 0,
        }
    }

    pub fn failed(
        step_id: impl Into<String>,
        action: impl Into<String>,
        outputs: ExecOutputs,
        error: impl Into<String>,
    ) -> Self {
        let mut error = error.into();
        if error.trim().is_empty() {
            error = "unknown error".into();
        }
        Self {
            step_id: step_id.into(),
            action: action.into(),
            status: ExecStatus::Error,
            outputs,
            error: Some(error),
            duration_ms: 0,
        }
    }

    pub fn with_duration_ms(mut self, duration_ms: u64) -> Self {
        self.duration_ms = duration_ms;
        self
    }

    pub fn status(&self) -> ExecStatus {
        self.status
    }

    pub fn is_ok(&self) -> bool {
        self.status == ExecStatus::Ok
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    /// Declared artifact, if any
    pub fn artifact(&self) -> Option<&Path> {
        self.outputs.file.as_deref()
    }
}

/// Wire form, checked before it becomes an `ExecResult`
#[derive(Deserialize)]
struct StoredResult {
    step_id: String,
    action: String,
    status: ExecStatus,
    outputs: ExecOutputs,
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    duration_ms: u64,
}

impl TryFrom<StoredResult> for ExecResult {
    type Error = String;

    fn try_from(raw: StoredResult) -> Result<Self, Self::Error> {
        let error = raw.error.filter(|e| !e.trim().is_empty());
        let result = match (raw.status, error) {
            (ExecStatus::Ok, None) => ExecResult::ok(raw.step_id, raw.action, raw.outputs),
            (ExecStatus::Error, Some(e)) => {
                ExecResult::failed(raw.step_id, raw.action, raw.outputs, e)
            }
            (ExecStatus::Ok, Some(_)) => {
                return Err(format!("step {}: ok result carries an error", raw.step_id))
            }
            (ExecStatus::Error, None) => {
                return Err(format!("step {}: error result has no message", raw.step_id))
            }
        };
        Ok(result.with_duration_ms(raw.duration_ms))
    }
}
