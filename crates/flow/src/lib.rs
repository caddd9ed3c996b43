pub mod assembler;
pub mod clock;
pub mod controller;
pub mod events;
pub mod launch;
pub mod participant;
pub mod session;
pub mod sink;
pub mod timer;

pub use assembler::{assemble, FormLayout, FormPayload, LayoutError, TaskFields};
pub use clock::{Clock, ManualClock, SystemClock};
pub use controller::{AssistedGate, FlowController, FlowOptions, Progress, Screen, TaskView};
pub use events::{FlowAction, FlowEvent};
pub use launch::group_from_launch;
pub use participant::{ParticipantId, ParticipantTag};
pub use session::{Session, SessionReport};
pub use sink::{HttpFormSink, LogSink, SubmissionSink};
pub use timer::{
    LatencyTimer, NoopTickScheduler, TickHandle, TickScheduler, TokioTickScheduler,
    DEFAULT_TICK_INTERVAL,
};
