use super::*;

use std::{
    sync::{
        atomic::{AtomicUsize, Ordering},
        Mutex,
    },
    time::{Duration, Instant},
};

use crate::{assembler::FormPayload, clock::ManualClock};

#[derive(Default)]
struct RecordingSink {
    payloads: Mutex<Vec<FormPayload>>,
}

impl SubmissionSink for RecordingSink {
    fn deliver(&self, payload: FormPayload) {
        self.payloads.lock().expect("sink lock").push(payload);
    }
}

#[derive(Default)]
struct CountingScheduler {
    live: Arc<AtomicUsize>,
    peak: Arc<AtomicUsize>,
    scheduled: AtomicUsize,
}

struct CountingHandle {
    live: Arc<AtomicUsize>,
    active: bool,
}

impl TickHandle for CountingHandle {
    fn cancel(&mut self) {
        if self.active {
            self.active = false;
            self.live.fetch_sub(1, Ordering::SeqCst);
        }
    }

    fn is_active(&self) -> bool {
        self.active
    }
}

impl Drop for CountingHandle {
    fn drop(&mut self) {
        self.cancel();
    }
}

impl TickScheduler for CountingScheduler {
    fn schedule(&self, _started: Instant) -> Box<dyn TickHandle> {
        let live = self.live.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(live, Ordering::SeqCst);
        self.scheduled.fetch_add(1, Ordering::SeqCst);
        Box::new(CountingHandle {
            live: self.live.clone(),
            active: true,
        })
    }
}

struct Harness {
    controller: FlowController,
    clock: ManualClock,
    sink: Arc<RecordingSink>,
    scheduler: Arc<CountingScheduler>,
}

fn harness(options: FlowOptions) -> Harness {
    let clock = ManualClock::new();
    let sink = Arc::new(RecordingSink::default());
    let scheduler = Arc::new(CountingScheduler::default());
    let controller = FlowController::new(TaskCatalog::builtin(), FormLayout::default(), sink.clone())
        .expect("controller")
        .with_options(options)
        .with_clock(Arc::new(clock.clone()))
        .with_scheduler(scheduler.clone())
        .with_participant_tag(ParticipantTag::new(1234));
    Harness {
        controller,
        clock,
        sink,
        scheduler,
    }
}

fn started(group: Group) -> Harness {
    let mut h = harness(FlowOptions::default());
    h.controller.select_group(group).expect("group");
    h.controller.proceed().expect("consent");
    h
}

#[test]
fn layout_must_match_catalog() {
    let result = FlowController::new(
        TaskCatalog::builtin(),
        FormLayout::symbolic(3),
        Arc::new(RecordingSink::default()),
    );
    assert!(matches!(
        result,
        Err(LayoutError::TaskCountMismatch {
            layout: 3,
            catalog: 4
        })
    ));
}

#[test]
fn group_selection_is_irrevocable() {
    let mut h = harness(FlowOptions::default());
    assert_eq!(h.controller.phase(), Phase::Landing);
    h.controller.select_group(Group::Manual).expect("group");
    assert_eq!(h.controller.phase(), Phase::Consent);
    assert_eq!(
        h.controller.select_group(Group::Assisted),
        Err(FlowError::GroupAlreadyAssigned(Group::Manual))
    );
    assert_eq!(h.controller.session().group(), Some(Group::Manual));
}

#[test]
fn landing_rejects_everything_but_selection() {
    let mut h = harness(FlowOptions::default());
    assert_eq!(
        h.controller.proceed(),
        Err(FlowError::WrongPhase {
            action: "proceed",
            phase: Phase::Landing
        })
    );
    assert!(h.controller.edit("text").is_err());
    assert!(h.controller.rate(3).is_err());
    assert!(matches!(h.controller.screen(), Screen::Landing));
}

#[test]
fn pre_survey_step_is_optional() {
    let mut h = harness(FlowOptions {
        pre_survey_url: Some("https://survey.example/pre".to_string()),
        ..FlowOptions::default()
    });
    h.controller.select_group(Group::Assisted).expect("group");
    assert_eq!(h.controller.phase(), Phase::PreSurvey);
    match h.controller.screen() {
        Screen::PreSurvey { survey_url } => assert_eq!(survey_url, "https://survey.example/pre"),
        other => panic!("unexpected screen: {other:?}"),
    }
    h.controller.proceed().expect("pre-survey");
    assert_eq!(h.controller.phase(), Phase::Consent);
    h.controller.proceed().expect("consent");
    assert_eq!(h.controller.phase(), Phase::Initial);
}

#[test]
fn manual_group_cannot_advance_with_blank_input() {
    let mut h = started(Group::Manual);
    assert_eq!(h.controller.advance_initial(), Err(FlowError::AnswerRequired));

    h.controller.edit("   ").expect("edit");
    assert_eq!(h.controller.advance_initial(), Err(FlowError::AnswerRequired));
    assert_eq!(h.controller.phase(), Phase::Initial);
    assert!(!h.controller.ticker_active());

    match h.controller.screen() {
        Screen::Initial(view) => assert!(!view.can_advance),
        other => panic!("unexpected screen: {other:?}"),
    }

    h.controller.edit("90.91").expect("edit");
    h.controller.advance_initial().expect("advance");
    assert_eq!(h.controller.phase(), Phase::Update);
}

#[test]
fn manual_group_gets_no_assistance() {
    let mut h = started(Group::Manual);
    assert_eq!(
        h.controller.reveal(AssistancePanel::Hint),
        Err(FlowError::AssistanceUnavailable)
    );
}

#[test]
fn assisted_gate_requires_a_panel_by_default() {
    let mut h = started(Group::Assisted);
    assert_eq!(
        h.controller.advance_initial(),
        Err(FlowError::AssistanceNotViewed)
    );

    match h.controller.screen() {
        Screen::Initial(view) => {
            assert!(view.hint.is_none(), "assistance is never auto-shown");
            assert!(view.logic.is_none());
            assert!(!view.can_advance);
        }
        other => panic!("unexpected screen: {other:?}"),
    }

    h.controller.reveal(AssistancePanel::Logic).expect("logic");
    match h.controller.screen() {
        Screen::Initial(view) => {
            assert_eq!(view.logic.map(<[String]>::len), Some(3));
            assert!(view.can_advance);
        }
        other => panic!("unexpected screen: {other:?}"),
    }
    h.controller.advance_initial().expect("advance");
}

#[test]
fn unconditional_gate_lets_assisted_group_through() {
    let mut h = harness(FlowOptions {
        assisted_gate: AssistedGate::Unconditional,
        ..FlowOptions::default()
    });
    h.controller.select_group(Group::Assisted).expect("group");
    h.controller.proceed().expect("consent");
    h.controller.advance_initial().expect("advance without assistance");
    h.controller.edit("1.5").expect("edit");
    h.controller.submit_update().expect("submit");
    let event = h.controller.rate(2).expect("rate");
    match event {
        FlowEvent::TaskCompleted { record, .. } => {
            assert_eq!(record.assistance, AssistanceMode::None);
            assert_eq!(record.initial_answer, "");
        }
        other => panic!("unexpected event: {other:?}"),
    }
}

#[test]
fn free_text_update_requires_input() {
    let mut h = started(Group::Manual);
    h.controller.edit("90.91").expect("edit");
    h.controller.advance_initial().expect("advance");

    assert_eq!(h.controller.session().input(), "", "buffer cleared for update");
    assert_eq!(h.controller.submit_update(), Err(FlowError::AnswerRequired));
    assert_eq!(
        h.controller.choose(0),
        Err(FlowError::NotAChoiceTask(TaskId(1)))
    );
    assert!(h.controller.ticker_active(), "rejections leave the ticker running");
}

#[test]
fn choice_task_rejects_free_text_and_bad_indices() {
    let mut h = started(Group::Manual);
    complete_free_text_task(&mut h, "90.91", "100", 3);

    h.controller.edit("keywords").expect("edit");
    h.controller.advance_initial().expect("advance");
    assert_eq!(
        h.controller.edit("typed"),
        Err(FlowError::ChoiceRequired(TaskId(2)))
    );
    assert_eq!(
        h.controller.submit_update(),
        Err(FlowError::ChoiceRequired(TaskId(2)))
    );
    assert_eq!(
        h.controller.choose(9),
        Err(FlowError::ChoiceOutOfRange {
            task: TaskId(2),
            index: 9
        })
    );
    h.controller.choose(0).expect("choose");
    assert_eq!(h.controller.phase(), Phase::Confidence);
}

#[test]
fn confidence_outside_scale_is_rejected_without_side_effects() {
    let mut h = started(Group::Manual);
    h.controller.edit("a").expect("edit");
    h.controller.advance_initial().expect("advance");
    h.controller.edit("b").expect("edit");
    h.controller.submit_update().expect("submit");

    assert_eq!(h.controller.rate(0), Err(FlowError::ConfidenceOutOfRange(0)));
    assert_eq!(h.controller.rate(6), Err(FlowError::ConfidenceOutOfRange(6)));
    assert_eq!(h.controller.phase(), Phase::Confidence);
    assert!(h.controller.results().is_empty());

    h.controller.rate(5).expect("rate");
    assert_eq!(h.controller.results().len(), 1);
}

#[test]
fn latency_covers_only_the_update_phase() {
    let mut h = started(Group::Manual);
    h.controller.edit("90.91").expect("edit");
    h.clock.advance(Duration::from_secs(40));
    h.controller.advance_initial().expect("advance");

    h.clock.advance(Duration::from_millis(7_250));
    assert!((h.controller.elapsed_secs() - 7.25).abs() < 1e-9);
    h.controller.edit("100").expect("edit");
    h.controller.submit_update().expect("submit");

    h.clock.advance(Duration::from_secs(90));
    assert!((h.controller.elapsed_secs() - 7.25).abs() < 1e-9, "frozen");
    h.controller.rate(1).expect("rate");

    let record = &h.controller.results()[0];
    assert!((record.latency_secs - 7.25).abs() < 1e-9);
    assert_eq!(record.latency_display(), "7.25");
}

#[test]
fn next_task_starts_from_a_clean_slate() {
    let mut h = started(Group::Assisted);
    h.controller.reveal(AssistancePanel::Hint).expect("hint");
    h.controller.edit("scratch").expect("edit");
    h.controller.advance_initial().expect("advance");
    h.controller.edit("110").expect("edit");
    h.controller.submit_update().expect("submit");
    h.controller.rate(4).expect("rate");

    let session = h.controller.session();
    assert_eq!(session.phase(), Phase::Initial);
    assert_eq!(session.task_index(), 1);
    assert_eq!(session.input(), "");
    assert!(!session.hint_shown());
    assert!(!session.logic_shown());
    assert!(!h.controller.ticker_active());
    assert_eq!(h.controller.elapsed_secs(), 0.0);
    assert_eq!(
        h.controller.advance_initial(),
        Err(FlowError::AssistanceNotViewed),
        "assistance flag from task 1 must not carry over"
    );
}

#[test]
fn at_most_one_ticker_is_ever_armed() {
    let mut h = started(Group::Manual);
    for (index, task) in TaskCatalog::builtin().tasks().iter().enumerate() {
        h.controller.edit("initial").expect("edit");
        h.controller.advance_initial().expect("advance");
        assert_eq!(h.scheduler.live.load(Ordering::SeqCst), 1);
        if task.is_choice_task() {
            h.controller.choose(1).expect("choose");
        } else {
            h.controller.edit("update").expect("edit");
            h.controller.submit_update().expect("submit");
        }
        assert_eq!(h.scheduler.live.load(Ordering::SeqCst), 0);
        h.controller.rate(3).expect("rate");
        assert_eq!(h.controller.results().len(), index + 1);
    }

    assert_eq!(h.scheduler.scheduled.load(Ordering::SeqCst), 4);
    assert_eq!(h.scheduler.peak.load(Ordering::SeqCst), 1);
    assert_eq!(h.controller.phase(), Phase::Finished);
}

#[test]
fn abandoning_and_dropping_cancel_the_ticker() {
    let mut h = started(Group::Manual);
    h.controller.edit("x").expect("edit");
    h.controller.advance_initial().expect("advance");
    assert!(h.controller.ticker_active());
    h.controller.abandon();
    assert!(!h.controller.ticker_active());
    assert_eq!(h.scheduler.live.load(Ordering::SeqCst), 0);

    let mut h = started(Group::Manual);
    h.controller.edit("x").expect("edit");
    h.controller.advance_initial().expect("advance");
    let live = h.scheduler.live.clone();
    assert_eq!(live.load(Ordering::SeqCst), 1);
    drop(h.controller);
    assert_eq!(live.load(Ordering::SeqCst), 0);
}

#[test]
fn finished_session_rejects_all_input_and_submits_once() {
    let mut h = started(Group::Manual);
    complete_free_text_task(&mut h, "1", "2", 1);
    complete_choice_task(&mut h, 2, 2);
    complete_free_text_task(&mut h, "7", "5", 3);
    complete_free_text_task(&mut h, "4000", "Wallet", 4);

    assert_eq!(h.controller.phase(), Phase::Finished);
    assert!(h.controller.session().is_submitted());
    for action in [
        FlowAction::SelectGroup(Group::Assisted),
        FlowAction::SelectGroup(Group::Manual),
        FlowAction::Proceed,
        FlowAction::Edit("late".to_string()),
        FlowAction::AdvanceInitial,
        FlowAction::Choose(0),
        FlowAction::SubmitUpdate,
        FlowAction::Rate(3),
        FlowAction::Reveal(AssistancePanel::Hint),
    ] {
        assert_eq!(h.controller.apply(action), Err(FlowError::SessionFinished));
    }
    assert_eq!(h.sink.payloads.lock().expect("sink lock").len(), 1);
    match h.controller.screen() {
        Screen::Finished { participant } => {
            assert_eq!(participant.map(|p| p.to_string()).as_deref(), Some("Grp-B-1234"))
        }
        other => panic!("unexpected screen: {other:?}"),
    }
}

#[test]
fn progress_tracks_task_position() {
    let mut h = started(Group::Manual);
    assert_eq!(h.controller.progress().percent(), 25);
    complete_free_text_task(&mut h, "1", "2", 1);
    let progress = h.controller.progress();
    assert_eq!((progress.position, progress.total), (2, 4));
    assert_eq!(progress.percent(), 50);
}

#[test]
fn apply_dispatches_to_named_transitions() {
    let mut h = harness(FlowOptions::default());
    let event = h
        .controller
        .apply(FlowAction::SelectGroup(Group::Assisted))
        .expect("select");
    assert!(matches!(
        event,
        FlowEvent::GroupAssigned {
            group: Group::Assisted,
            ..
        }
    ));
    assert_eq!(
        h.controller.apply(FlowAction::Proceed),
        Ok(FlowEvent::PhaseEntered {
            phase: Phase::Initial,
            task: Some(TaskId(1))
        })
    );
    assert_eq!(
        h.controller.apply(FlowAction::Reveal(AssistancePanel::Hint)),
        Ok(FlowEvent::AssistanceRevealed {
            task: TaskId(1),
            panel: AssistancePanel::Hint
        })
    );
    assert_eq!(
        h.controller.apply(FlowAction::Edit("note".to_string())),
        Ok(FlowEvent::InputUpdated {
            task: TaskId(1),
            chars: 4
        })
    );
}

fn complete_free_text_task(h: &mut Harness, initial: &str, update: &str, confidence: u8) {
    h.controller.edit(initial).expect("edit initial");
    h.controller.advance_initial().expect("advance");
    h.controller.edit(update).expect("edit update");
    h.controller.submit_update().expect("submit");
    h.controller.rate(confidence).expect("rate");
}

fn complete_choice_task(h: &mut Harness, choice: usize, confidence: u8) {
    h.controller.edit("initial").expect("edit initial");
    h.controller.advance_initial().expect("advance");
    h.controller.choose(choice).expect("choose");
    h.controller.rate(confidence).expect("rate");
}
