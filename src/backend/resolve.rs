use tracing::warn;

use super::{Action, Backend, CapabilityIo, CapabilityOutcome, Invocation};

/// DaVinci Resolve scripting backend. Advertises the full action set so
/// plans resolve, but no capability is wired to the host yet.
#[derive(Debug, Default)]
pub struct ResolveBackend;

impl Backend for ResolveBackend {
    fn name(&self) -> &str {
        "resolve"
    }

    fn capabilities(&self) -> &[Action] {
        &Action::ALL
    }

    fn invoke(&self, call: &Invocation, _io: &CapabilityIo<'_>) -> CapabilityOutcome {
        warn!(action = %call.action(), "resolve backend has no capability implementations");
        CapabilityOutcome::failure(-1, "Resolve backend not implemented")
    }
}
