//! Plan execution.
//!
//! Steps run strictly in order. Each step reads the most recent
//! successfully produced artifact (the cursor) and, on success, moves the
//! cursor to its own output. Expected failures never abort the plan: they
//! become an `error` result and the next step runs against the last good
//! artifact.

use std::path::{Path, PathBuf};
use std::time::Instant;

use tracing::{debug, info, warn};

use crate::backend::{Action, Backend, CapabilityIo, Invocation, Segment};
use crate::error::ExecutorError;
use crate::task::{ExecOutputs, ExecResult, Plan, Step};

pub struct Executor<'a> {
    backend: &'a dyn Backend,
    out_dir: PathBuf,
    segment: Option<Segment>,
    non_destructive: bool,
}

impl<'a> Executor<'a> {
    /// Create an executor writing under `out_dir`, creating it if absent
    pub fn new(backend: &'a dyn Backend, out_dir: impl Into<PathBuf>) -> Result<Self, ExecutorError> {
        let out_dir = out_dir.into();
        std::fs::create_dir_all(&out_dir).map_err(|source| ExecutorError::OutputDir {
            path: out_dir.clone(),
            source,
        })?;
        Ok(Self {
            backend,
            out_dir,
            segment: None,
            non_destructive: true,
        })
    }

    /// Restrict the source to a time range. Only steps reading the initial
    /// artifact get the range; later artifacts are already trimmed.
    pub fn with_segment(mut self, segment: Option<Segment>) -> Self {
        self.segment = segment;
        self
    }

    /// Refuse any step whose output would replace the initial artifact
    pub fn non_destructive(mut self, enabled: bool) -> Self {
        self.non_destructive = enabled;
        self
    }

    pub fn out_dir(&self) -> &Path {
        &self.out_dir
    }

    /// Output path for the step at 1-based `index`
    pub fn output_path(&self, index: usize, action: Action) -> PathBuf {
        self.out_dir
            .join(format!("step_{:02}_{}.mp4", index, action.label()))
    }

    /// Run every step of `plan`, returning one result per step in order
    pub fn execute(&self, plan: &Plan, initial: &Path) -> Vec<ExecResult> {
        info!(
            backend = self.backend.name(),
            steps = plan.len(),
            input = %initial.display(),
            "executing plan"
        );

        let mut cursor = initial.to_path_buf();
        let mut results = Vec::with_capacity(plan.len());

        for (i, step) in plan.steps().iter().enumerate() {
            let index = i + 1;
            let started = Instant::now();
            let result = self
                .run_step(index, step, &cursor, initial)
                .with_duration_ms(started.elapsed().as_millis() as u64);

            match (result.is_ok(), result.artifact()) {
                (true, Some(file)) if file.exists() => {
                    debug!(step_id = %result.step_id, artifact = %file.display(), "cursor advanced");
                    cursor = file.to_path_buf();
                }
                (true, _) => {
                    warn!(step_id = %result.step_id, "step reported ok without a present artifact");
                }
                (false, _) => {
                    warn!(
                        step_id = %result.step_id,
                        action = %step.action,
                        error = result.error().unwrap_or_default(),
                        "step failed"
                    );
                }
            }
            results.push(result);
        }

        results
    }

    fn run_step(&self, index: usize, step: &Step, input: &Path, initial: &Path) -> ExecResult {
        let step_id = format!("S{}", index);
        let fail = |message: String| {
            ExecResult::failed(step_id.clone(), step.action.clone(), ExecOutputs::default(), message)
        };

        let action = match self.backend.resolve(&step.action) {
            Ok(action) => action,
            Err(e) => return fail(e.to_string()),
        };
        let call = match Invocation::decode(action, &step.params) {
            Ok(call) => call,
            Err(e) => return fail(format!("{}: {}", action, e)),
        };

        let output = self.output_path(index, action);
        if self.non_destructive && same_file(&output, initial) {
            return fail(format!(
                "refusing to overwrite source artifact {}",
                initial.display()
            ));
        }

        info!(
            step_id = %step_id,
            action = %action,
            explain = step.explain.as_deref().unwrap_or_default(),
            "running step"
        );
        let io = CapabilityIo {
            input,
            output: &output,
            segment: self.segment.as_ref().filter(|_| input == initial),
        };
        let outcome = self.backend.invoke(&call, &io);

        let outputs = ExecOutputs {
            file: outcome.file.clone(),
            log: outcome.log.clone(),
        };
        if outcome.is_success() {
            return ExecResult::ok(step_id, action.as_str(), outputs);
        }

        let message = match outcome.timed_out {
            Some(limit) => format!("{} timed out after {}s", action, limit.as_secs_f64()),
            None => match last_line(&outcome.log) {
                Some(line) => format!(
                    "{} failed with code {}: {}",
                    self.backend.name(),
                    outcome.code,
                    line
                ),
                None => format!("{} failed with code {}", self.backend.name(), outcome.code),
            },
        };
        ExecResult::failed(step_id, action.as_str(), outputs, message)
    }
}

fn same_file(a: &Path, b: &Path) -> bool {
    if a == b {
        return true;
    }
    match (a.canonicalize(), b.canonicalize()) {
        (Ok(a), Ok(b)) => a == b,
        _ => false,
    }
}

fn last_line(log: &str) -> Option<&str> {
    log.lines().map(str::trim).filter(|l| !l.is_empty()).last()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::{CapabilityOutcome, ResolveBackend};
    use crate::task::ExecStatus;
    use std::cell::RefCell;
    use std::time::Duration;
    use tempfile::TempDir;

    /// Writes a small file per call; fails the listed actions
    #[derive(Default)]
    struct ScriptedBackend {
        failing: Vec<Action>,
        ok_without_file: Vec<Action>,
        timing_out: Vec<Action>,
        inputs: RefCell<Vec<PathBuf>>,
        segments: RefCell<Vec<Option<Segment>>>,
    }

    impl Backend for ScriptedBackend {
        fn name(&self) -> &str {
            "scripted"
        }

        fn capabilities(&self) -> &[Action] {
            &[
                Action::AdjustColorEq,
                Action::AddKeyframeZoom,
                Action::DuckMusic,
                Action::ExportPreview,
            ]
        }

        fn invoke(&self, call: &Invocation, io: &CapabilityIo<'_>) -> CapabilityOutcome {
            let action = call.action();
            self.inputs.borrow_mut().push(io.input.to_path_buf());
            self.segments.borrow_mut().push(io.segment.cloned());
            if self.timing_out.contains(&action) {
                return CapabilityOutcome {
                    code: 124,
                    log: "timed out".into(),
                    file: None,
                    timed_out: Some(Duration::from_secs(3)),
                };
            }
            if self.failing.contains(&action) {
                return CapabilityOutcome::failure(1, "frame=0\nInvalid data found");
            }
            if self.ok_without_file.contains(&action) {
                return CapabilityOutcome::success(io.output, "claimed success");
            }
            std::fs::write(io.output, action.as_str()).unwrap();
            CapabilityOutcome::success(io.output, "done")
        }
    }

    fn plan(actions: &[&str]) -> Plan {
        Plan::new(
            actions
                .iter()
                .map(|a| {
                    let step = Step::new(*a);
                    if *a == "duck_music" {
                        step.param("music_file", "bed.wav")
                    } else {
                        step
                    }
                })
                .collect(),
        )
    }

    fn statuses(results: &[ExecResult]) -> Vec<ExecStatus> {
        results.iter().map(|r| r.status()).collect()
    }

    // ========================================
    // Ordering and chaining
    // ========================================

    #[test]
    fn test_one_result_per_step_in_order() {
        let dir = TempDir::new().unwrap();
        let backend = ScriptedBackend::default();
        let executor = Executor::new(&backend, dir.path()).unwrap();

        for n in 1..=5 {
            let actions: Vec<&str> = ["adjust_color_eq", "unknown_op", "export_preview"]
                .iter()
                .cycle()
                .take(n)
                .copied()
                .collect();
            let results = executor.execute(&plan(&actions), Path::new("clip.mp4"));

            assert_eq!(results.len(), n);
            for (i, r) in results.iter().enumerate() {
                assert_eq!(r.step_id, format!("S{}", i + 1));
                assert_eq!(r.action, actions[i]);
            }
        }
    }

    #[test]
    fn test_artifacts_chain_between_steps() {
        let dir = TempDir::new().unwrap();
        let backend = ScriptedBackend::default();
        let executor = Executor::new(&backend, dir.path()).unwrap();

        let results = executor.execute(
            &plan(&["adjust_color_eq", "add_keyframe_zoom", "export_preview"]),
            Path::new("clip.mp4"),
        );

        assert!(results.iter().all(|r| r.is_ok()));
        let inputs = backend.inputs.borrow();
        assert_eq!(inputs[0], PathBuf::from("clip.mp4"));
        assert_eq!(inputs[1], dir.path().join("step_01_color.mp4"));
        assert_eq!(inputs[2], dir.path().join("step_02_zoom.mp4"));
        assert_eq!(
            results[2].artifact(),
            Some(dir.path().join("step_03_preview.mp4").as_path())
        );
    }

    #[test]
    fn test_failed_step_does_not_advance_cursor() {
        let dir = TempDir::new().unwrap();
        let backend = ScriptedBackend {
            failing: vec![Action::AddKeyframeZoom],
            ..Default::default()
        };
        let executor = Executor::new(&backend, dir.path()).unwrap();

        let results = executor.execute(
            &plan(&["adjust_color_eq", "add_keyframe_zoom", "export_preview"]),
            Path::new("clip.mp4"),
        );

        assert_eq!(
            statuses(&results),
            vec![ExecStatus::Ok, ExecStatus::Error, ExecStatus::Ok]
        );
        let inputs = backend.inputs.borrow();
        assert_eq!(inputs[1], inputs[2]);
        assert!(results[1].error().unwrap().contains("Invalid data found"));
        assert!(results[1].error().unwrap().contains("code 1"));
    }

    #[test]
    fn test_ok_without_artifact_keeps_cursor() {
        let dir = TempDir::new().unwrap();
        let backend = ScriptedBackend {
            ok_without_file: vec![Action::AdjustColorEq],
            ..Default::default()
        };
        let executor = Executor::new(&backend, dir.path()).unwrap();

        let results = executor.execute(
            &plan(&["adjust_color_eq", "export_preview"]),
            Path::new("clip.mp4"),
        );

        assert!(results[0].is_ok());
        assert_eq!(backend.inputs.borrow()[1], PathBuf::from("clip.mp4"));
    }

    #[test]
    fn test_segment_only_applies_to_source() {
        let dir = TempDir::new().unwrap();
        let backend = ScriptedBackend {
            failing: vec![Action::AdjustColorEq],
            ..Default::default()
        };
        let segment: Segment = "00:00:05-00:00:10".parse().unwrap();
        let executor = Executor::new(&backend, dir.path())
            .unwrap()
            .with_segment(Some(segment.clone()));

        executor.execute(
            &plan(&["adjust_color_eq", "add_keyframe_zoom", "export_preview"]),
            Path::new("clip.mp4"),
        );

        // color fails, so zoom still reads the source
        assert_eq!(
            *backend.segments.borrow(),
            vec![Some(segment.clone()), Some(segment), None]
        );
    }

    // ========================================
    // Expected failure classes
    // ========================================

    #[test]
    fn test_unknown_action_continues() {
        let dir = TempDir::new().unwrap();
        let backend = ScriptedBackend::default();
        let executor = Executor::new(&backend, dir.path()).unwrap();

        let results = executor.execute(&plan(&["unknown_op", "export_preview"]), Path::new("clip.mp4"));

        assert_eq!(results[0].status(), ExecStatus::Error);
        assert!(results[0].error().unwrap().contains("unknown_op"));
        assert!(results[1].is_ok());
        assert_eq!(backend.inputs.borrow().len(), 1);
    }

    #[test]
    fn test_unsupported_action_names_backend() {
        let dir = TempDir::new().unwrap();
        let backend = ScriptedBackend::default();
        let executor = Executor::new(&backend, dir.path()).unwrap();

        let results = executor.execute(&plan(&["slog3_to_rec709"]), Path::new("clip.mp4"));

        assert_eq!(results[0].status(), ExecStatus::Error);
        assert!(results[0].error().unwrap().contains("scripted"));
    }

    #[test]
    fn test_missing_music_errors_and_export_uses_original_input() {
        let dir = TempDir::new().unwrap();
        let backend = ScriptedBackend::default();
        let executor = Executor::new(&backend, dir.path()).unwrap();
        let plan = Plan::new(vec![
            Step::new("duck_music").param("music_file", serde_json::Value::Null),
            Step::new("export_preview").param("quality", "medium"),
        ]);

        let results = executor.execute(&plan, Path::new("clip.mp4"));

        assert_eq!(results[0].status(), ExecStatus::Error);
        assert!(results[0].error().unwrap().contains("music_file not provided"));
        assert!(results[1].is_ok());
        assert_eq!(*backend.inputs.borrow(), vec![PathBuf::from("clip.mp4")]);
    }

    #[test]
    fn test_invalid_param_is_step_error() {
        let dir = TempDir::new().unwrap();
        let backend = ScriptedBackend::default();
        let executor = Executor::new(&backend, dir.path()).unwrap();
        let plan = Plan::new(vec![Step::new("export_preview").param("quality", "ultra")]);

        let results = executor.execute(&plan, Path::new("clip.mp4"));
        assert!(results[0].error().unwrap().starts_with("export_preview: parameter 'quality'"));
        assert!(backend.inputs.borrow().is_empty());
    }

    #[test]
    fn test_oversized_duck_db_is_step_error() {
        let dir = TempDir::new().unwrap();
        let music = dir.path().join("bed.wav");
        std::fs::write(&music, "").unwrap();
        let backend = ScriptedBackend::default();
        let executor = Executor::new(&backend, dir.path().join("out")).unwrap();
        let plan = Plan::new(vec![
            Step::new("duck_music")
                .param("music_file", music.to_string_lossy().into_owned())
                .param("duck_db", 3_000_000_000u64),
            Step::new("export_preview"),
        ]);

        let results = executor.execute(&plan, Path::new("clip.mp4"));

        assert_eq!(results[0].status(), ExecStatus::Error);
        assert!(results[0].error().unwrap().contains("duck_db"));
        assert!(results[1].is_ok());
    }

    #[test]
    fn test_timeout_has_dedicated_message() {
        let dir = TempDir::new().unwrap();
        let backend = ScriptedBackend {
            timing_out: vec![Action::ExportPreview],
            ..Default::default()
        };
        let executor = Executor::new(&backend, dir.path()).unwrap();

        let results = executor.execute(&plan(&["export_preview"]), Path::new("clip.mp4"));
        assert_eq!(results[0].error(), Some("export_preview timed out after 3s"));
    }

    #[test]
    fn test_every_step_fails_on_stub_backend() {
        let dir = TempDir::new().unwrap();
        let backend = ResolveBackend;
        let executor = Executor::new(&backend, dir.path()).unwrap();

        let results = executor.execute(
            &plan(&["adjust_color_eq", "export_preview"]),
            Path::new("clip.mp4"),
        );

        assert!(results.iter().all(|r| r.status() == ExecStatus::Error));
        assert!(results[0].error().unwrap().contains("not implemented"));
    }

    #[test]
    fn test_refuses_to_overwrite_source() {
        let dir = TempDir::new().unwrap();
        let backend = ScriptedBackend::default();
        let executor = Executor::new(&backend, dir.path()).unwrap();
        let source = dir.path().join("step_01_preview.mp4");
        std::fs::write(&source, "original").unwrap();

        let results = executor.execute(&plan(&["export_preview"]), &source);

        assert_eq!(results[0].status(), ExecStatus::Error);
        assert_eq!(std::fs::read_to_string(&source).unwrap(), "original");
    }

    // ========================================
    // Setup and determinism
    // ========================================

    #[test]
    fn test_creates_output_dir() {
        let dir = TempDir::new().unwrap();
        let out = dir.path().join("nested").join("outputs");
        let backend = ScriptedBackend::default();

        let executor = Executor::new(&backend, &out).unwrap();
        assert!(out.is_dir());
        assert_eq!(executor.out_dir(), out.as_path());
    }

    #[test]
    fn test_output_dir_failure_is_hard_error() {
        let dir = TempDir::new().unwrap();
        let blocker = dir.path().join("file");
        std::fs::write(&blocker, "").unwrap();
        let backend = ScriptedBackend::default();

        let err = Executor::new(&backend, blocker.join("outputs")).err().unwrap();
        assert!(matches!(err, ExecutorError::OutputDir { .. }));
    }

    #[test]
    fn test_rerun_is_deterministic() {
        let backend = ScriptedBackend {
            failing: vec![Action::AddKeyframeZoom],
            ..Default::default()
        };
        let steps = plan(&["adjust_color_eq", "add_keyframe_zoom", "unknown_op", "export_preview"]);

        let run = |dir: &TempDir| {
            let executor = Executor::new(&backend, dir.path()).unwrap();
            executor
                .execute(&steps, Path::new("clip.mp4"))
                .into_iter()
                .map(|r| {
                    let name = r
                        .artifact()
                        .and_then(|p| p.file_name())
                        .map(|n| n.to_string_lossy().into_owned());
                    (r.status(), name)
                })
                .collect::<Vec<_>>()
        };

        let first = run(&TempDir::new().unwrap());
        let second = run(&TempDir::new().unwrap());
        assert_eq!(first, second);
        assert_eq!(first[3].1.as_deref(), Some("step_04_preview.mp4"));
    }
}
