use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::{AssistanceMode, Confidence, TaskId};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    pub id: TaskId,
    pub title: String,
    pub initial_prompt: String,
    /// Ordered hint/explanation steps. The first step doubles as the hint.
    pub assistance: Vec<String>,
    pub update_prompt: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub choices: Option<Vec<String>>,
}

impl Task {
    pub fn is_choice_task(&self) -> bool {
        self.choices.is_some()
    }

    pub fn hint(&self) -> Option<&str> {
        self.assistance.first().map(String::as_str)
    }

    pub fn choice(&self, index: usize) -> Option<&str> {
        self.choices
            .as_ref()
            .and_then(|choices| choices.get(index))
            .map(String::as_str)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResultRecord {
    pub task_id: TaskId,
    pub assistance: AssistanceMode,
    pub initial_answer: String,
    pub update_answer: String,
    pub latency_secs: f64,
    pub confidence: Confidence,
    pub completed_at: DateTime<Utc>,
}

impl ResultRecord {
    pub fn latency_display(&self) -> String {
        format!("{:.2}", self.latency_secs)
    }
}
