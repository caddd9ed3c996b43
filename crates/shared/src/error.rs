use thiserror::Error;

use crate::domain::{Group, Phase, TaskId};

/// A participant action rejected by the flow controller. The session is left
/// untouched whenever one of these is returned.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FlowError {
    #[error("`{action}` is not available during the {phase} phase")]
    WrongPhase { action: &'static str, phase: Phase },
    #[error("group already assigned: {0}")]
    GroupAlreadyAssigned(Group),
    #[error("an answer is required before continuing")]
    AnswerRequired,
    #[error("open the hint or the full logic before continuing")]
    AssistanceNotViewed,
    #[error("assistance panels are only offered to the assisted group")]
    AssistanceUnavailable,
    #[error("task {task} has no choice number {index}")]
    ChoiceOutOfRange { task: TaskId, index: usize },
    #[error("task {0} takes a free-text answer")]
    NotAChoiceTask(TaskId),
    #[error("task {0} is answered by picking one of the listed choices")]
    ChoiceRequired(TaskId),
    #[error("confidence must be between 1 and 5, got {0}")]
    ConfidenceOutOfRange(u8),
    #[error("no task is active")]
    NoActiveTask,
    #[error("the session has finished")]
    SessionFinished,
}

impl FlowError {
    pub fn is_missing_input(&self) -> bool {
        matches!(
            self,
            FlowError::AnswerRequired | FlowError::AssistanceNotViewed
        )
    }
}
