//! Operation outcomes

use serde::Serialize;

/// Result of one provisioning operation
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Outcome {
    pub changed: bool,
    #[serde(rename = "msg")]
    pub message: String,
}

impl Outcome {
    pub fn changed(message: impl Into<String>) -> Self {
        Self {
            changed: true,
            message: message.into(),
        }
    }

    pub fn unchanged(message: impl Into<String>) -> Self {
        Self {
            changed: false,
            message: message.into(),
        }
    }
}

/// Ordered outcomes of a bulk run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RunReport {
    pub changed: bool,
    pub outcomes: Vec<Outcome>,
}

impl RunReport {
    pub fn push(&mut self, outcome: Outcome) {
        self.changed |= outcome.changed;
        self.outcomes.push(outcome);
    }

    pub fn len(&self) -> usize {
        self.outcomes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.outcomes.is_empty()
    }

    /// Messages in run order
    pub fn messages(&self) -> Vec<&str> {
        self.outcomes.iter().map(|o| o.message.as_str()).collect()
    }
}
