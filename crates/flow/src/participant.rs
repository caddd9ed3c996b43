use std::fmt;

use rand::Rng;
use serde::{Deserialize, Serialize};
use shared::domain::Group;

const TAG_RANGE: u16 = 10_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ParticipantTag(u16);

impl ParticipantTag {
    pub fn random() -> Self {
        Self(rand::thread_rng().gen_range(0..TAG_RANGE))
    }

    pub fn new(value: u16) -> Self {
        Self(value % TAG_RANGE)
    }

    pub fn value(self) -> u16 {
        self.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ParticipantId {
    pub group: Group,
    pub tag: ParticipantTag,
}

impl fmt::Display for ParticipantId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Grp-{}-{}", self.group.code(), self.tag.value())
    }
}
