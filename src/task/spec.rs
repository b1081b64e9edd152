use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Artifacts the goal applies to
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Targets {
    /// Source clip
    pub input: PathBuf,
    /// Time range, e.g. `00:00:03-00:00:07`
    #[serde(default)]
    pub segment: Option<String>,
    /// Music bed for ducking
    #[serde(default)]
    pub music: Option<PathBuf>,
    /// `.cube` LUT for log footage
    #[serde(default)]
    pub lut: Option<PathBuf>,
}

impl Targets {
    pub fn new(input: impl Into<PathBuf>) -> Self {
        Self {
            input: input.into(),
            segment: None,
            music: None,
            lut: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Constraints {
    /// Never write over the source clip
    #[serde(default = "default_true")]
    pub non_destructive: bool,
}

impl Default for Constraints {
    fn default() -> Self {
        Self {
            non_destructive: true,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Prefs {
    #[serde(default)]
    pub preview_after_each_step: bool,
    /// Quality of the trailing preview export (low, medium, high)
    #[serde(default)]
    pub preview_quality: Option<String>,
}

fn default_true() -> bool {
    true
}

/// What the user asked for
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskSpec {
    /// Free-text goal, e.g. "cold cinematic look with slow zoom"
    pub goal: String,
    pub targets: Targets,
    #[serde(default)]
    pub constraints: Constraints,
    #[serde(default)]
    pub prefs: Prefs,
}

impl TaskSpec {
    pub fn new(goal: impl Into<String>, targets: Targets) -> Self {
        Self {
            goal: goal.into(),
            targets,
            constraints: Constraints::default(),
            prefs: Prefs {
                preview_after_each_step: true,
                preview_quality: None,
            },
        }
    }
}
