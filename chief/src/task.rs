use serde::{Deserialize, Serialize};

/// One entry of `.chief/tasks.json`.
///
/// Only `passes` changes after the tasks are generated, and only the agent flips it.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct Task {
    pub category: String,
    pub description: String,
    pub passes: bool,
    pub steps: Vec<String>,
}

impl Task {
    pub fn new(category: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            category: category.into(),
            description: description.into(),
            passes: false,
            steps: Vec::new(),
        }
    }
}
