use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;
use shared::{
    domain::{AssistanceMode, Group, Phase},
    protocol::ResultRecord,
};
use uuid::Uuid;

use crate::participant::{ParticipantId, ParticipantTag};

#[derive(Debug, Clone, Default)]
pub(crate) struct TaskDraft {
    pub(crate) input: String,
    pub(crate) hint_shown: bool,
    pub(crate) logic_shown: bool,
    pub(crate) initial: Option<(String, AssistanceMode)>,
    pub(crate) update_answer: Option<String>,
    pub(crate) latency: Option<Duration>,
}

impl TaskDraft {
    pub(crate) fn assistance_mode(&self) -> AssistanceMode {
        AssistanceMode::from_flags(self.hint_shown, self.logic_shown)
    }

    pub(crate) fn has_input(&self) -> bool {
        !self.input.trim().is_empty()
    }
}

#[derive(Debug, Clone)]
pub struct Session {
    pub(crate) id: Uuid,
    pub(crate) tag: ParticipantTag,
    pub(crate) started_at: DateTime<Utc>,
    pub(crate) group: Option<Group>,
    pub(crate) phase: Phase,
    pub(crate) task_index: usize,
    pub(crate) draft: TaskDraft,
    pub(crate) results: Vec<ResultRecord>,
    pub(crate) submitted: bool,
}

impl Session {
    pub(crate) fn new(tag: ParticipantTag) -> Self {
        Self {
            id: Uuid::new_v4(),
            tag,
            started_at: Utc::now(),
            group: None,
            phase: Phase::Landing,
            task_index: 0,
            draft: TaskDraft::default(),
            results: Vec::new(),
            submitted: false,
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    pub fn group(&self) -> Option<Group> {
        self.group
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn task_index(&self) -> usize {
        self.task_index
    }

    pub fn results(&self) -> &[ResultRecord] {
        &self.results
    }

    pub fn is_submitted(&self) -> bool {
        self.submitted
    }

    pub fn input(&self) -> &str {
        &self.draft.input
    }

    pub fn hint_shown(&self) -> bool {
        self.draft.hint_shown
    }

    pub fn logic_shown(&self) -> bool {
        self.draft.logic_shown
    }

    pub fn participant(&self) -> Option<ParticipantId> {
        self.group.map(|group| ParticipantId {
            group,
            tag: self.tag,
        })
    }

    pub fn report(&self) -> SessionReport<'_> {
        SessionReport {
            session_id: self.id,
            participant: self.participant().map(|participant| participant.to_string()),
            started_at: self.started_at,
            finished: self.phase == Phase::Finished,
            results: &self.results,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct SessionReport<'a> {
    pub session_id: Uuid,
    pub participant: Option<String>,
    pub started_at: DateTime<Utc>,
    pub finished: bool,
    pub results: &'a [ResultRecord],
}
