use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Named step arguments (numbers, strings, optional file paths)
pub type Params = serde_json::Map<String, Value>;

/// One requested operation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Step {
    /// Capability key, e.g. `adjust_color_eq`
    pub action: String,
    #[serde(default)]
    pub params: Params,
    /// Human-readable reason, for logs and display only
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub explain: Option<String>,
    /// Post-condition check ids
    #[serde(default)]
    pub verify: Vec<String>,
}

impl Step {
    pub fn new(action: impl Into<String>) -> Self {
        Self {
            action: action.into(),
            params: Params::new(),
            explain: None,
            verify: Vec::new(),
        }
    }

    pub fn param(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.params.insert(key.to_string(), value.into());
        self
    }

    pub fn explain(mut self, text: impl Into<String>) -> Self {
        self.explain = Some(text.into());
        self
    }

    pub fn check(mut self, id: impl Into<String>) -> Self {
        self.verify.push(id.into());
        self
    }
}

/// Steps in execution order
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Plan {
    steps: Vec<Step>,
}

impl Plan {
    pub fn new(steps: Vec<Step>) -> Self {
        Self { steps }
    }

    pub fn steps(&self) -> &[Step] {
        &self.steps
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    pub fn actions(&self) -> Vec<&str> {
        self.steps.iter().map(|s| s.action.as_str()).collect()
    }
}
