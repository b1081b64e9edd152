use serde::{Deserialize, Serialize};

use crate::task::ExecResult;

/// One problem found in a step's outcome
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Issue {
    pub step_id: String,
    pub message: String,
}

/// Verification result over a whole run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Verification {
    /// True iff `issues` is empty
    pub ok: bool,
    pub issues: Vec<Issue>,
}

impl Verification {
    pub fn passed() -> Self {
        Self {
            ok: true,
            issues: Vec::new(),
        }
    }

    pub fn with_issue(mut self, step_id: impl Into<String>, message: impl Into<String>) -> Self {
        self.ok = false;
        self.issues.push(Issue {
            step_id: step_id.into(),
            message: message.into(),
        });
        self
    }

    /// `(ok, [(step_id, message)])`
    pub fn into_parts(self) -> (bool, Vec<(String, String)>) {
        let issues = self
            .issues
            .into_iter()
            .map(|i| (i.step_id, i.message))
            .collect();
        (self.ok, issues)
    }
}

/// Check that every step succeeded and left an artifact on disk.
/// Read-only apart from existence checks.
pub fn verify(results: &[ExecResult]) -> Verification {
    let mut verification = Verification::passed();

    for r in results {
        if !r.is_ok() {
            verification =
                verification.with_issue(&r.step_id, r.error().unwrap_or("unknown error"));
            continue;
        }
        match r.artifact() {
            None => {
                verification = verification.with_issue(&r.step_id, "no output artifact declared");
            }
            Some(path) if path.as_os_str().is_empty() => {
                verification = verification.with_issue(&r.step_id, "no output artifact declared");
            }
            Some(path) if !path.exists() => {
                verification = verification
                    .with_issue(&r.step_id, format!("output file missing: {}", path.display()));
            }
            Some(_) => {}
        }
    }

    verification
}
