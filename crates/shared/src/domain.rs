use std::fmt;

use serde::{Deserialize, Serialize};

macro_rules! id_newtype {
    ($name:ident, $inner:ty) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        pub struct $name(pub $inner);

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

id_newtype!(TaskId, u32);

impl TaskId {
    pub fn from_index(index: usize) -> Self {
        Self(index as u32 + 1)
    }

    pub fn index(self) -> usize {
        self.0.saturating_sub(1) as usize
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Group {
    Assisted,
    Manual,
}

impl Group {
    pub fn label(self) -> &'static str {
        match self {
            Group::Assisted => "assisted",
            Group::Manual => "manual",
        }
    }

    pub fn code(self) -> &'static str {
        match self {
            Group::Assisted => "A",
            Group::Manual => "B",
        }
    }

    pub fn parse_label(raw: &str) -> Option<Self> {
        let raw = raw.trim();
        if raw.eq_ignore_ascii_case("assisted") || raw.eq_ignore_ascii_case("a") {
            Some(Group::Assisted)
        } else if raw.eq_ignore_ascii_case("manual") || raw.eq_ignore_ascii_case("b") {
            Some(Group::Manual)
        } else {
            None
        }
    }
}

impl fmt::Display for Group {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    Landing,
    PreSurvey,
    Consent,
    Initial,
    Update,
    Confidence,
    Finished,
}

impl Phase {
    pub fn as_str(self) -> &'static str {
        match self {
            Phase::Landing => "landing",
            Phase::PreSurvey => "pre_survey",
            Phase::Consent => "consent",
            Phase::Initial => "initial",
            Phase::Update => "update",
            Phase::Confidence => "confidence",
            Phase::Finished => "finished",
        }
    }

    pub fn is_task_phase(self) -> bool {
        matches!(self, Phase::Initial | Phase::Update | Phase::Confidence)
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AssistancePanel {
    Hint,
    Logic,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AssistanceMode {
    #[default]
    None,
    Hint,
    Logic,
    HintAndLogic,
}

impl AssistanceMode {
    pub fn from_flags(hint: bool, logic: bool) -> Self {
        match (hint, logic) {
            (false, false) => AssistanceMode::None,
            (true, false) => AssistanceMode::Hint,
            (false, true) => AssistanceMode::Logic,
            (true, true) => AssistanceMode::HintAndLogic,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            AssistanceMode::None => "none",
            AssistanceMode::Hint => "hint",
            AssistanceMode::Logic => "logic",
            AssistanceMode::HintAndLogic => "hint+logic",
        }
    }
}

impl fmt::Display for AssistanceMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

pub const CONFIDENCE_MIN: u8 = 1;
pub const CONFIDENCE_MAX: u8 = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct Confidence(u8);

impl Confidence {
    pub fn new(value: u8) -> Option<Self> {
        (CONFIDENCE_MIN..=CONFIDENCE_MAX)
            .contains(&value)
            .then_some(Self(value))
    }

    pub fn value(self) -> u8 {
        self.0
    }
}

impl TryFrom<u8> for Confidence {
    type Error = crate::error::FlowError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Self::new(value).ok_or(crate::error::FlowError::ConfidenceOutOfRange(value))
    }
}

impl From<Confidence> for u8 {
    fn from(value: Confidence) -> Self {
        value.0
    }
}

impl fmt::Display for Confidence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
