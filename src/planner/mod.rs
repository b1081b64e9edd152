mod keyword;

pub use keyword::KeywordPlanner;

use crate::task::{Plan, TaskSpec};

/// Turns a task into an ordered plan.
///
/// Implementations must be pure and must always end the plan with an
/// `export_preview` step, so every plan is non-empty and produces a
/// viewable artifact.
pub trait Planner {
    fn plan(&self, task: &TaskSpec) -> Plan;
}
