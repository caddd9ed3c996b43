//! The experiment flow state machine.

use std::sync::Arc;

use catalog::TaskCatalog;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use shared::{
    domain::{AssistanceMode, AssistancePanel, Confidence, Group, Phase, TaskId},
    error::FlowError,
    protocol::{ResultRecord, Task},
};
use tracing::{debug, info, warn};

use crate::{
    assembler::{assemble, FormLayout, LayoutError},
    clock::{Clock, SystemClock},
    events::{FlowAction, FlowEvent},
    participant::{ParticipantId, ParticipantTag},
    session::{Session, TaskDraft},
    sink::SubmissionSink,
    timer::{LatencyTimer, NoopTickScheduler, TickHandle, TickScheduler},
};

/// What the assisted group must do before leaving the initial phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AssistedGate {
    Unconditional,
    #[default]
    AnyPanel,
}

#[derive(Debug, Clone, Default)]
pub struct FlowOptions {
    pub assisted_gate: AssistedGate,
    pub pre_survey_url: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Progress {
    pub position: usize,
    pub total: usize,
}

impl Progress {
    pub fn percent(self) -> u8 {
        if self.total == 0 {
            return 0;
        }
        ((self.position.min(self.total) * 100) / self.total) as u8
    }
}

#[derive(Debug, Clone)]
pub struct TaskView<'a> {
    pub task: &'a Task,
    pub group: Group,
    pub progress: Progress,
    pub hint: Option<&'a str>,
    pub logic: Option<&'a [String]>,
    pub input: &'a str,
    pub can_advance: bool,
}

#[derive(Debug, Clone)]
pub enum Screen<'a> {
    Landing,
    PreSurvey { survey_url: &'a str },
    Consent,
    Initial(TaskView<'a>),
    Update { view: TaskView<'a>, elapsed_secs: f64 },
    Confidence(TaskView<'a>),
    Finished { participant: Option<ParticipantId> },
}

pub struct FlowController {
    catalog: TaskCatalog,
    layout: FormLayout,
    options: FlowOptions,
    session: Session,
    timer: LatencyTimer,
    ticker: Option<Box<dyn TickHandle>>,
    clock: Arc<dyn Clock>,
    scheduler: Arc<dyn TickScheduler>,
    sink: Arc<dyn SubmissionSink>,
}

impl FlowController {
    pub fn new(
        catalog: TaskCatalog,
        layout: FormLayout,
        sink: Arc<dyn SubmissionSink>,
    ) -> Result<Self, LayoutError> {
        layout.validate(catalog.len())?;
        Ok(Self {
            catalog,
            layout,
            options: FlowOptions::default(),
            session: Session::new(ParticipantTag::random()),
            timer: LatencyTimer::new(),
            ticker: None,
            clock: Arc::new(SystemClock),
            scheduler: Arc::new(NoopTickScheduler),
            sink,
        })
    }

    pub fn with_options(mut self, options: FlowOptions) -> Self {
        self.options = options;
        self
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_scheduler(mut self, scheduler: Arc<dyn TickScheduler>) -> Self {
        self.scheduler = scheduler;
        self
    }

    pub fn with_participant_tag(mut self, tag: ParticipantTag) -> Self {
        self.session.tag = tag;
        self
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn phase(&self) -> Phase {
        self.session.phase
    }

    pub fn results(&self) -> &[ResultRecord] {
        &self.session.results
    }

    pub fn participant(&self) -> Option<ParticipantId> {
        self.session.participant()
    }

    pub fn ticker_active(&self) -> bool {
        self.ticker.as_ref().is_some_and(|ticker| ticker.is_active())
    }

    pub fn current_task(&self) -> Option<&Task> {
        if self.session.phase.is_task_phase() {
            self.catalog.get(self.session.task_index)
        } else {
            None
        }
    }

    pub fn progress(&self) -> Progress {
        Progress {
            position: self.session.task_index + 1,
            total: self.catalog.len(),
        }
    }

    pub fn elapsed_secs(&self) -> f64 {
        match self.session.phase {
            Phase::Update => self.timer.elapsed(self.clock.now()).as_secs_f64(),
            _ => self
                .session
                .draft
                .latency
                .map(|latency| latency.as_secs_f64())
                .unwrap_or_default(),
        }
    }

    pub fn apply(&mut self, action: FlowAction) -> Result<FlowEvent, FlowError> {
        let name = action.name();
        let outcome = match action {
            FlowAction::SelectGroup(group) => self.select_group(group),
            FlowAction::Proceed => self.proceed(),
            FlowAction::Reveal(panel) => self.reveal(panel),
            FlowAction::Edit(text) => self.edit(text),
            FlowAction::AdvanceInitial => self.advance_initial(),
            FlowAction::Choose(index) => self.choose(index),
            FlowAction::SubmitUpdate => self.submit_update(),
            FlowAction::Rate(value) => self.rate(value),
        };
        if let Err(error) = &outcome {
            debug!(
                session_id = %self.session.id,
                action = name,
                phase = %self.session.phase,
                %error,
                "action rejected"
            );
        }
        outcome
    }

    pub fn select_group(&mut self, group: Group) -> Result<FlowEvent, FlowError> {
        if self.session.phase == Phase::Finished {
            return Err(FlowError::SessionFinished);
        }
        if let Some(existing) = self.session.group {
            return Err(FlowError::GroupAlreadyAssigned(existing));
        }
        self.ensure_phase("select_group", Phase::Landing)?;

        self.session.group = Some(group);
        self.session.phase = if self.options.pre_survey_url.is_some() {
            Phase::PreSurvey
        } else {
            Phase::Consent
        };

        let participant = ParticipantId {
            group,
            tag: self.session.tag,
        };
        info!(
            session_id = %self.session.id,
            %group,
            %participant,
            next = %self.session.phase,
            "group assigned"
        );
        Ok(FlowEvent::GroupAssigned { group, participant })
    }

    pub fn proceed(&mut self) -> Result<FlowEvent, FlowError> {
        match self.session.phase {
            Phase::PreSurvey => {
                self.session.phase = Phase::Consent;
                Ok(FlowEvent::PhaseEntered {
                    phase: Phase::Consent,
                    task: None,
                })
            }
            Phase::Consent => {
                self.enter_task(0);
                Ok(FlowEvent::PhaseEntered {
                    phase: Phase::Initial,
                    task: Some(TaskId::from_index(0)),
                })
            }
            Phase::Finished => Err(FlowError::SessionFinished),
            phase => Err(FlowError::WrongPhase {
                action: "proceed",
                phase,
            }),
        }
    }

    pub fn reveal(&mut self, panel: AssistancePanel) -> Result<FlowEvent, FlowError> {
        self.ensure_phase("reveal", Phase::Initial)?;
        if self.session.group != Some(Group::Assisted) {
            return Err(FlowError::AssistanceUnavailable);
        }

        let draft = &mut self.session.draft;
        match panel {
            AssistancePanel::Hint => draft.hint_shown = true,
            AssistancePanel::Logic => draft.logic_shown = true,
        }
        let task = self.task_id();
        debug!(session_id = %self.session.id, %task, ?panel, "assistance revealed");
        Ok(FlowEvent::AssistanceRevealed { task, panel })
    }

    pub fn edit(&mut self, text: impl Into<String>) -> Result<FlowEvent, FlowError> {
        match self.session.phase {
            Phase::Initial => {}
            Phase::Update => {
                if self.active_task()?.is_choice_task() {
                    return Err(FlowError::ChoiceRequired(self.task_id()));
                }
            }
            Phase::Finished => return Err(FlowError::SessionFinished),
            phase => {
                return Err(FlowError::WrongPhase {
                    action: "edit",
                    phase,
                })
            }
        }

        let text = text.into();
        let chars = text.chars().count();
        self.session.draft.input = text;
        Ok(FlowEvent::InputUpdated {
            task: self.task_id(),
            chars,
        })
    }

    pub fn advance_initial(&mut self) -> Result<FlowEvent, FlowError> {
        self.ensure_phase("advance_initial", Phase::Initial)?;
        let Some(group) = self.session.group else {
            return Err(FlowError::NoActiveTask);
        };
        self.initial_gate(group)?;

        let draft = &mut self.session.draft;
        let assistance = match group {
            Group::Assisted => draft.assistance_mode(),
            Group::Manual => AssistanceMode::None,
        };
        let answer = draft.input.trim().to_string();
        draft.initial = Some((answer, assistance));
        draft.input.clear();

        let now = self.clock.now();
        self.timer.arm(now);
        self.start_ticker(now);
        self.session.phase = Phase::Update;

        let task = self.task_id();
        info!(
            session_id = %self.session.id,
            %task,
            assistance = assistance.label(),
            "initial answer recorded; latency timer armed"
        );
        Ok(FlowEvent::PhaseEntered {
            phase: Phase::Update,
            task: Some(task),
        })
    }

    pub fn choose(&mut self, index: usize) -> Result<FlowEvent, FlowError> {
        self.ensure_phase("choose", Phase::Update)?;
        let task = self.active_task()?;
        let answer = match &task.choices {
            None => return Err(FlowError::NotAChoiceTask(task.id)),
            Some(choices) => choices
                .get(index)
                .cloned()
                .ok_or(FlowError::ChoiceOutOfRange {
                    task: task.id,
                    index,
                })?,
        };
        Ok(self.finish_update(answer))
    }

    pub fn submit_update(&mut self) -> Result<FlowEvent, FlowError> {
        self.ensure_phase("submit_update", Phase::Update)?;
        if self.active_task()?.is_choice_task() {
            return Err(FlowError::ChoiceRequired(self.task_id()));
        }
        if !self.session.draft.has_input() {
            return Err(FlowError::AnswerRequired);
        }
        let answer = self.session.draft.input.trim().to_string();
        Ok(self.finish_update(answer))
    }

    pub fn rate(&mut self, value: u8) -> Result<FlowEvent, FlowError> {
        self.ensure_phase("rate", Phase::Confidence)?;
        let confidence = Confidence::try_from(value)?;

        let task_id = self.task_id();
        let draft = std::mem::take(&mut self.session.draft);
        let (initial_answer, assistance) = draft.initial.unwrap_or_default();
        let record = ResultRecord {
            task_id,
            assistance,
            initial_answer,
            update_answer: draft.update_answer.unwrap_or_default(),
            latency_secs: draft.latency.unwrap_or_default().as_secs_f64(),
            confidence,
            completed_at: Utc::now(),
        };
        self.session.results.push(record.clone());
        info!(
            session_id = %self.session.id,
            task = %task_id,
            confidence = confidence.value(),
            latency_secs = record.latency_secs,
            "task completed"
        );

        let next = self.session.task_index + 1;
        let session_finished = next >= self.catalog.len();
        if session_finished {
            self.finish();
        } else {
            self.enter_task(next);
        }

        Ok(FlowEvent::TaskCompleted {
            record,
            session_finished,
        })
    }

    pub fn abandon(&mut self) {
        if self.session.phase == Phase::Update {
            warn!(
                session_id = %self.session.id,
                task = %self.task_id(),
                "session abandoned during update phase"
            );
        }
        self.stop_ticker();
    }

    pub fn screen(&self) -> Screen<'_> {
        match self.session.phase {
            Phase::Landing => Screen::Landing,
            Phase::PreSurvey => Screen::PreSurvey {
                survey_url: self.options.pre_survey_url.as_deref().unwrap_or_default(),
            },
            Phase::Consent => Screen::Consent,
            Phase::Finished => Screen::Finished {
                participant: self.session.participant(),
            },
            Phase::Initial | Phase::Update | Phase::Confidence => match self.task_view() {
                Some(view) => match self.session.phase {
                    Phase::Initial => Screen::Initial(view),
                    Phase::Update => Screen::Update {
                        view,
                        elapsed_secs: self.elapsed_secs(),
                    },
                    _ => Screen::Confidence(view),
                },
                None => Screen::Finished {
                    participant: self.session.participant(),
                },
            },
        }
    }

    fn task_view(&self) -> Option<TaskView<'_>> {
        let task = self.current_task()?;
        let group = self.session.group?;
        let draft = &self.session.draft;
        let can_advance = match self.session.phase {
            Phase::Initial => self.initial_gate(group).is_ok(),
            Phase::Update => !task.is_choice_task() && draft.has_input(),
            _ => false,
        };

        Some(TaskView {
            task,
            group,
            progress: self.progress(),
            hint: draft.hint_shown.then(|| task.hint()).flatten(),
            logic: draft.logic_shown.then_some(task.assistance.as_slice()),
            input: &draft.input,
            can_advance,
        })
    }

    fn initial_gate(&self, group: Group) -> Result<(), FlowError> {
        let draft = &self.session.draft;
        match group {
            Group::Manual if !draft.has_input() => Err(FlowError::AnswerRequired),
            Group::Assisted
                if self.options.assisted_gate == AssistedGate::AnyPanel
                    && !draft.hint_shown
                    && !draft.logic_shown =>
            {
                Err(FlowError::AssistanceNotViewed)
            }
            _ => Ok(()),
        }
    }

    fn finish_update(&mut self, answer: String) -> FlowEvent {
        let latency = self.timer.disarm(self.clock.now()).unwrap_or_default();
        self.stop_ticker();

        let draft = &mut self.session.draft;
        draft.update_answer = Some(answer);
        draft.latency = Some(latency);
        draft.input.clear();
        self.session.phase = Phase::Confidence;

        let task = self.task_id();
        let latency_secs = latency.as_secs_f64();
        info!(session_id = %self.session.id, %task, latency_secs, "update answer submitted");
        FlowEvent::UpdateSubmitted { task, latency_secs }
    }

    fn enter_task(&mut self, index: usize) {
        self.stop_ticker();
        self.timer.reset();
        self.session.task_index = index;
        self.session.draft = TaskDraft::default();
        self.session.phase = Phase::Initial;
        debug!(
            session_id = %self.session.id,
            task = %TaskId::from_index(index),
            "task started"
        );
    }

    fn finish(&mut self) {
        self.stop_ticker();
        self.timer.reset();
        self.session.phase = Phase::Finished;
        if self.session.submitted {
            return;
        }

        let Some(participant) = self.session.participant() else {
            warn!(session_id = %self.session.id, "finished without a group; nothing submitted");
            return;
        };
        let payload = assemble(&self.layout, &participant, &self.session.results);
        self.session.submitted = true;
        let last_completed_at = self.session.results.last().map(|record| record.completed_at);
        info!(
            session_id = %self.session.id,
            %participant,
            records = self.session.results.len(),
            started_at = %self.session.started_at,
            last_completed_at = ?last_completed_at,
            "session finished; handing results to submission sink"
        );
        self.sink.deliver(payload);
    }

    fn start_ticker(&mut self, started: std::time::Instant) {
        self.stop_ticker();
        self.ticker = Some(self.scheduler.schedule(started));
    }

    fn stop_ticker(&mut self) {
        if let Some(mut ticker) = self.ticker.take() {
            ticker.cancel();
        }
    }

    fn ensure_phase(&self, action: &'static str, expected: Phase) -> Result<(), FlowError> {
        match self.session.phase {
            Phase::Finished => Err(FlowError::SessionFinished),
            phase if phase == expected => Ok(()),
            phase => Err(FlowError::WrongPhase { action, phase }),
        }
    }

    fn active_task(&self) -> Result<&Task, FlowError> {
        self.current_task().ok_or(FlowError::NoActiveTask)
    }

    fn task_id(&self) -> TaskId {
        TaskId::from_index(self.session.task_index)
    }
}

impl Drop for FlowController {
    fn drop(&mut self) {
        self.stop_ticker();
    }
}

#[cfg(test)]
#[path = "tests/controller_tests.rs"]
mod tests;
