use serde_json::Value;

use super::Planner;
use crate::backend::Action;
use crate::task::{Plan, Step, TaskSpec};

const CHECK_PREVIEW: &str = "preview_exists";
const CHECK_FILE: &str = "file_exists";

/// A goal phrase set and the step it contributes
struct Trigger {
    phrases: &'static [&'static str],
    /// Extra condition on the task besides a phrase match
    applies: fn(&TaskSpec) -> bool,
    build: fn(&TaskSpec) -> Step,
}

fn always(_: &TaskSpec) -> bool {
    true
}

fn has_lut(task: &TaskSpec) -> bool {
    task.targets.lut.is_some()
}

fn log_to_rec709(_: &TaskSpec) -> Step {
    Step::new(Action::Slog3ToRec709.as_str())
        .param("contrast", 1.15)
        .param("saturation", 1.08)
        .param("brightness", 0.03)
        .explain("Convert S-Log3 footage to Rec709 with a natural correction")
        .check(CHECK_PREVIEW)
}

fn cinematic_color(_: &TaskSpec) -> Step {
    Step::new(Action::AdjustColorEq.as_str())
        .param("brightness", 0.0)
        .param("contrast", 1.15)
        .param("saturation", 0.85)
        .param("temperature", "cool")
        .explain("Increase contrast and add cool tone for cinematic look")
        .check(CHECK_PREVIEW)
}

fn slow_zoom(_: &TaskSpec) -> Step {
    Step::new(Action::AddKeyframeZoom.as_str())
        .param("from_scale", 1.00)
        .param("to_scale", 1.08)
        .param("duration_s", 5.0)
        .explain("Gradually zoom in over the duration to add tension")
        .check(CHECK_PREVIEW)
}

fn duck_music(task: &TaskSpec) -> Step {
    let music = task
        .targets
        .music
        .as_ref()
        .map(|p| Value::from(p.to_string_lossy().into_owned()))
        .unwrap_or(Value::Null);
    Step::new(Action::DuckMusic.as_str())
        .param("music_file", music)
        .param("duck_db", 10)
        .param("attack_ms", 200)
        .param("release_ms", 800)
        .explain("Lower music volume when dialogue is present")
        .check(CHECK_PREVIEW)
}

fn apply_lut(task: &TaskSpec) -> Step {
    let lut = task
        .targets
        .lut
        .as_ref()
        .map(|p| p.to_string_lossy().into_owned())
        .unwrap_or_default();
    Step::new(Action::Slog3WithLut.as_str())
        .param("lut_file", lut)
        .param("intensity", 1.0)
        .explain("Apply the supplied LUT to the footage")
        .check(CHECK_PREVIEW)
}

fn export_preview(task: &TaskSpec) -> Step {
    let quality = task
        .prefs
        .preview_quality
        .clone()
        .unwrap_or_else(|| "medium".into());
    Step::new(Action::ExportPreview.as_str())
        .param("quality", quality)
        .explain("Render a short preview of the edited segment")
        .check(CHECK_FILE)
}

/// Evaluated in order; every match appends one step
const TRIGGERS: &[Trigger] = &[
    Trigger {
        phrases: &["slog3", "s-log3", "log footage"],
        applies: always,
        build: log_to_rec709,
    },
    Trigger {
        phrases: &["cinematic", "cold"],
        applies: always,
        build: cinematic_color,
    },
    Trigger {
        phrases: &["slow zoom", "dolly"],
        applies: always,
        build: slow_zoom,
    },
    Trigger {
        phrases: &["fade music", "duck", "dialogue"],
        applies: always,
        build: duck_music,
    },
    Trigger {
        phrases: &["lut"],
        applies: has_lut,
        build: apply_lut,
    },
];

/// Rule-based planner: scans the goal for trigger phrases
#[derive(Debug, Default)]
pub struct KeywordPlanner;

impl Planner for KeywordPlanner {
    fn plan(&self, task: &TaskSpec) -> Plan {
        let goal = task.goal.to_lowercase();

        let mut steps: Vec<Step> = TRIGGERS
            .iter()
            .filter(|t| t.phrases.iter().any(|p| goal.contains(p)) && (t.applies)(task))
            .map(|t| (t.build)(task))
            .collect();
        steps.push(export_preview(task));

        Plan::new(steps)
    }
}
