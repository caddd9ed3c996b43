//! Line-oriented front end: renders the controller's current screen and turns
//! each input line into flow actions.

use std::io::{BufRead, Write};

use anyhow::Context;
use flow::{FlowAction, FlowController, Screen, TaskView};
use shared::domain::{AssistancePanel, Group, CONFIDENCE_MAX, CONFIDENCE_MIN};
use tokio::sync::watch;
use tracing::{debug, warn};

const QUIT: &str = ":quit";
const HINT: &str = ":hint";
const LOGIC: &str = ":logic";

pub struct Terminal<R, W> {
    input: R,
    output: W,
    elapsed: Option<watch::Receiver<f64>>,
}

impl<R: BufRead, W: Write> Terminal<R, W> {
    pub fn new(input: R, output: W) -> Self {
        Self {
            input,
            output,
            elapsed: None,
        }
    }

    pub fn with_elapsed(mut self, elapsed: watch::Receiver<f64>) -> Self {
        self.elapsed = Some(elapsed);
        self
    }

    pub fn into_output(self) -> W {
        self.output
    }

    pub fn run(&mut self, flow: &mut FlowController) -> anyhow::Result<()> {
        loop {
            self.render(flow)?;
            if matches!(flow.screen(), Screen::Finished { .. }) {
                return Ok(());
            }

            let Some(line) = self.read_line()? else {
                warn!("input closed before the session finished");
                flow.abandon();
                return Ok(());
            };
            if line.eq_ignore_ascii_case(QUIT) {
                warn!("participant quit before the session finished");
                flow.abandon();
                return Ok(());
            }

            for action in self.actions_for(flow, &line)? {
                if let Err(error) = flow.apply(action) {
                    if error.is_missing_input() {
                        writeln!(self.output, "  Required: {error}")?;
                    } else {
                        writeln!(self.output, "  ! {error}")?;
                    }
                    break;
                }
            }
        }
    }

    fn actions_for(
        &mut self,
        flow: &FlowController,
        line: &str,
    ) -> anyhow::Result<Vec<FlowAction>> {
        let actions = match flow.screen() {
            Screen::Landing => match landing_choice(line) {
                Some(group) => vec![FlowAction::SelectGroup(group)],
                None => {
                    debug!(input = line, "no group selected");
                    Vec::new()
                }
            },
            Screen::PreSurvey { .. } => vec![FlowAction::Proceed],
            Screen::Consent => {
                if is_agreement(line) {
                    vec![FlowAction::Proceed]
                } else {
                    writeln!(self.output, "  Type 'yes' to give consent and begin.")?;
                    Vec::new()
                }
            }
            Screen::Initial(view) => initial_actions(&view, line),
            Screen::Update { .. } if line.trim().is_empty() => Vec::new(),
            Screen::Update { view, .. } => match &view.task.choices {
                Some(choices) => match line.parse::<usize>() {
                    Ok(n) if (1..=choices.len()).contains(&n) => {
                        vec![FlowAction::Choose(n - 1)]
                    }
                    _ => {
                        writeln!(
                            self.output,
                            "  Pick an option between 1 and {}.",
                            choices.len()
                        )?;
                        Vec::new()
                    }
                },
                None => vec![
                    FlowAction::Edit(line.to_string()),
                    FlowAction::SubmitUpdate,
                ],
            },
            Screen::Confidence(_) => match line.parse::<u8>() {
                Ok(value) => vec![FlowAction::Rate(value)],
                Err(_) => {
                    writeln!(
                        self.output,
                        "  Enter a number from {CONFIDENCE_MIN} to {CONFIDENCE_MAX}."
                    )?;
                    Vec::new()
                }
            },
            Screen::Finished { .. } => Vec::new(),
        };
        Ok(actions)
    }

    fn render(&mut self, flow: &FlowController) -> anyhow::Result<()> {
        let out = &mut self.output;
        match flow.screen() {
            Screen::Landing => {
                writeln!(out, "\nCognitive Flexibility Study")?;
                writeln!(out, "Select your assigned group to begin the assessment:")?;
                writeln!(out, "  1) Group A (assisted)")?;
                writeln!(out, "  2) Group B (manual)")?;
            }
            Screen::PreSurvey { survey_url } => {
                writeln!(out, "\nBefore you start, please complete the short survey:")?;
                writeln!(out, "  {survey_url}")?;
                writeln!(out, "Press Enter once you are done.")?;
            }
            Screen::Consent => {
                writeln!(out, "\nConsent")?;
                writeln!(
                    out,
                    "Your answers and response times are recorded anonymously for research."
                )?;
                writeln!(out, "Type 'yes' to agree and continue.")?;
            }
            Screen::Initial(view) => {
                write_task_header(out, &view)?;
                writeln!(out, "{}", view.task.initial_prompt)?;
                write_assistance(out, &view)?;
                if !view.input.is_empty() {
                    writeln!(out, "  Your note: {}", view.input)?;
                }
                match view.group {
                    Group::Assisted => writeln!(
                        out,
                        "[{HINT} | {LOGIC} | optional note, Enter to proceed to the challenge]"
                    )?,
                    Group::Manual => writeln!(out, "[your initial response]")?,
                }
            }
            Screen::Update { view, elapsed_secs } => {
                let shown = self
                    .elapsed
                    .as_ref()
                    .map(|rx| *rx.borrow())
                    .unwrap_or(elapsed_secs);
                write_task_header(out, &view)?;
                writeln!(out, "{}", view.task.update_prompt)?;
                if let Some(choices) = &view.task.choices {
                    for (index, choice) in choices.iter().enumerate() {
                        writeln!(out, "  {}) {choice}", index + 1)?;
                    }
                }
                writeln!(
                    out,
                    "Elapsed: {shown:.2}s (the timer keeps running until you answer; press Enter to refresh)"
                )?;
            }
            Screen::Confidence(view) => {
                write_task_header(out, &view)?;
                writeln!(
                    out,
                    "How confident are you in your answer? ({CONFIDENCE_MIN} = not at all, {CONFIDENCE_MAX} = completely)"
                )?;
            }
            Screen::Finished { participant } => {
                writeln!(out, "\nParticipation Recorded")?;
                writeln!(
                    out,
                    "Thank you! Your responses have been submitted. You may now close this window."
                )?;
                if let Some(participant) = participant {
                    writeln!(out, "Participant: {participant}")?;
                }
            }
        }
        write!(out, "> ")?;
        out.flush().context("failed to flush terminal output")
    }

    fn read_line(&mut self) -> anyhow::Result<Option<String>> {
        let mut line = String::new();
        let read = self
            .input
            .read_line(&mut line)
            .context("failed to read participant input")?;
        if read == 0 {
            return Ok(None);
        }
        Ok(Some(line.trim_end_matches(['\r', '\n']).to_string()))
    }
}

fn landing_choice(line: &str) -> Option<Group> {
    match line.trim() {
        "1" => Some(Group::Assisted),
        "2" => Some(Group::Manual),
        other => Group::parse_label(other),
    }
}

fn is_agreement(line: &str) -> bool {
    let line = line.trim();
    ["y", "yes", "agree", "i agree"]
        .iter()
        .any(|accepted| line.eq_ignore_ascii_case(accepted))
}

fn initial_actions(view: &TaskView<'_>, line: &str) -> Vec<FlowAction> {
    let trimmed = line.trim();
    if view.group == Group::Assisted {
        if trimmed.eq_ignore_ascii_case(HINT) {
            return vec![FlowAction::Reveal(AssistancePanel::Hint)];
        }
        if trimmed.eq_ignore_ascii_case(LOGIC) {
            return vec![FlowAction::Reveal(AssistancePanel::Logic)];
        }
    }

    let mut actions = Vec::new();
    if !trimmed.is_empty() {
        actions.push(FlowAction::Edit(line.to_string()));
    }
    actions.push(FlowAction::AdvanceInitial);
    actions
}

fn write_task_header<W: Write>(out: &mut W, view: &TaskView<'_>) -> std::io::Result<()> {
    writeln!(
        out,
        "\nTask {} of {} - {} [{}%]",
        view.progress.position,
        view.progress.total,
        view.task.title,
        view.progress.percent()
    )
}

fn write_assistance<W: Write>(out: &mut W, view: &TaskView<'_>) -> std::io::Result<()> {
    if let Some(hint) = view.hint {
        writeln!(out, "  Hint: {hint}")?;
    }
    if let Some(steps) = view.logic {
        writeln!(out, "  AI logic sequence:")?;
        for step in steps {
            writeln!(out, "    - {step}")?;
        }
    }
    Ok(())
}

#[cfg(test)]
#[path = "tests/terminal_tests.rs"]
mod tests;
