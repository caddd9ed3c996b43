use shared::{
    domain::{AssistancePanel, Group, Phase, TaskId},
    protocol::ResultRecord,
};

use crate::participant::ParticipantId;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FlowAction {
    SelectGroup(Group),
    Proceed,
    Reveal(AssistancePanel),
    Edit(String),
    AdvanceInitial,
    Choose(usize),
    SubmitUpdate,
    Rate(u8),
}

impl FlowAction {
    pub fn name(&self) -> &'static str {
        match self {
            FlowAction::SelectGroup(_) => "select_group",
            FlowAction::Proceed => "proceed",
            FlowAction::Reveal(_) => "reveal",
            FlowAction::Edit(_) => "edit",
            FlowAction::AdvanceInitial => "advance_initial",
            FlowAction::Choose(_) => "choose",
            FlowAction::SubmitUpdate => "submit_update",
            FlowAction::Rate(_) => "rate",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum FlowEvent {
    GroupAssigned {
        group: Group,
        participant: ParticipantId,
    },
    PhaseEntered {
        phase: Phase,
        task: Option<TaskId>,
    },
    AssistanceRevealed {
        task: TaskId,
        panel: AssistancePanel,
    },
    InputUpdated {
        task: TaskId,
        chars: usize,
    },
    UpdateSubmitted {
        task: TaskId,
        latency_secs: f64,
    },
    TaskCompleted {
        record: ResultRecord,
        session_finished: bool,
    },
}
