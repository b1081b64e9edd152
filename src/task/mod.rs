mod plan;
mod result;
mod spec;

pub use plan::{Params, Plan, Step};
pub use result::{ExecOutputs, ExecResult, ExecStatus};
pub use spec::{Constraints, Prefs, Targets, TaskSpec};
