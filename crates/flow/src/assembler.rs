use std::collections::{BTreeMap, HashSet};

use catalog::STUDY_TASK_COUNT;
use serde::{Deserialize, Serialize};
use shared::protocol::ResultRecord;
use thiserror::Error;
use url::{form_urlencoded, Url};

use crate::participant::ParticipantId;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LayoutError {
    #[error("form layout defines {layout} task field sets but the catalog has {catalog} tasks")]
    TaskCountMismatch { layout: usize, catalog: usize },
    #[error("form field id `{0}` is used more than once")]
    DuplicateField(String),
    #[error("form field ids must not be empty")]
    EmptyField,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskFields {
    pub assistance: String,
    pub latency: String,
    pub initial: String,
    pub update: String,
    pub confidence: String,
}

impl TaskFields {
    fn symbolic(ordinal: usize) -> Self {
        Self {
            assistance: format!("t{ordinal}_assist"),
            latency: format!("t{ordinal}_latency"),
            initial: format!("t{ordinal}_initial"),
            update: format!("t{ordinal}_update"),
            confidence: format!("t{ordinal}_confidence"),
        }
    }

    fn ids(&self) -> [&str; 5] {
        [
            self.assistance.as_str(),
            self.latency.as_str(),
            self.initial.as_str(),
            self.update.as_str(),
            self.confidence.as_str(),
        ]
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FormLayout {
    pub participant: String,
    pub tasks: Vec<TaskFields>,
    pub extra: BTreeMap<String, String>,
}

impl FormLayout {
    pub fn symbolic(task_count: usize) -> Self {
        Self {
            participant: "pid".to_string(),
            tasks: (1..=task_count).map(TaskFields::symbolic).collect(),
            extra: BTreeMap::from([("submit".to_string(), "Submit".to_string())]),
        }
    }

    pub fn validate(&self, task_count: usize) -> Result<(), LayoutError> {
        if self.tasks.len() != task_count {
            return Err(LayoutError::TaskCountMismatch {
                layout: self.tasks.len(),
                catalog: task_count,
            });
        }

        let mut seen = HashSet::new();
        let ids = std::iter::once(self.participant.as_str())
            .chain(self.tasks.iter().flat_map(TaskFields::ids))
            .chain(self.extra.keys().map(String::as_str));
        for id in ids {
            if id.trim().is_empty() {
                return Err(LayoutError::EmptyField);
            }
            if !seen.insert(id) {
                return Err(LayoutError::DuplicateField(id.to_string()));
            }
        }
        Ok(())
    }
}

impl Default for FormLayout {
    fn default() -> Self {
        Self::symbolic(STUDY_TASK_COUNT)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct FormPayload {
    fields: Vec<(String, String)>,
}

impl FormPayload {
    pub fn fields(&self) -> &[(String, String)] {
        &self.fields
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    pub fn encoded_query(&self) -> String {
        form_urlencoded::Serializer::new(String::new())
            .extend_pairs(self.fields.iter())
            .finish()
    }

    pub fn url_for(&self, endpoint: &Url) -> Url {
        let mut url = endpoint.clone();
        url.set_query(Some(&self.encoded_query()));
        url
    }

    fn push(&mut self, key: &str, value: impl Into<String>) {
        self.fields.push((key.to_string(), value.into()));
    }
}

pub fn assemble(
    layout: &FormLayout,
    participant: &ParticipantId,
    records: &[ResultRecord],
) -> FormPayload {
    let mut ordered: Vec<&ResultRecord> = records.iter().collect();
    ordered.sort_by_key(|record| record.task_id);

    let mut payload = FormPayload::default();
    payload.push(&layout.participant, participant.to_string());

    for record in ordered {
        let Some(fields) = layout.tasks.get(record.task_id.index()) else {
            continue;
        };
        payload.push(&fields.assistance, record.assistance.label());
        payload.push(&fields.latency, record.latency_display());
        payload.push(&fields.initial, record.initial_answer.as_str());
        payload.push(&fields.update, record.update_answer.as_str());
        payload.push(&fields.confidence, record.confidence.to_string());
    }

    for (key, value) in &layout.extra {
        payload.push(key, value.as_str());
    }

    payload
}

#[cfg(test)]
#[path = "tests/assembler_tests.rs"]
mod tests;
