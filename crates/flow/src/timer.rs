use std::{
    sync::Arc,
    time::{Duration, Instant},
};

use tokio::{runtime::Handle, sync::watch, task::JoinHandle, time::MissedTickBehavior};
use tracing::debug;

use crate::clock::Clock;

pub const DEFAULT_TICK_INTERVAL: Duration = Duration::from_millis(100);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
enum TimerState {
    #[default]
    Idle,
    Armed {
        started: Instant,
    },
    Frozen {
        elapsed: Duration,
    },
}

/// Stopwatch armed when the update phase begins and frozen exactly once on
/// submission. Reads after freezing always return the frozen value.
#[derive(Debug, Clone, Default)]
pub struct LatencyTimer {
    state: TimerState,
}

impl LatencyTimer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn arm(&mut self, now: Instant) {
        self.state = TimerState::Armed { started: now };
    }

    pub fn disarm(&mut self, now: Instant) -> Option<Duration> {
        match self.state {
            TimerState::Armed { started } => {
                let elapsed = now.saturating_duration_since(started);
                self.state = TimerState::Frozen { elapsed };
                Some(elapsed)
            }
            TimerState::Idle | TimerState::Frozen { .. } => None,
        }
    }

    pub fn elapsed(&self, now: Instant) -> Duration {
        match self.state {
            TimerState::Idle => Duration::ZERO,
            TimerState::Armed { started } => now.saturating_duration_since(started),
            TimerState::Frozen { elapsed } => elapsed,
        }
    }

    pub fn is_armed(&self) -> bool {
        matches!(self.state, TimerState::Armed { .. })
    }

    pub fn reset(&mut self) {
        self.state = TimerState::Idle;
    }
}

pub trait TickHandle: Send {
    fn cancel(&mut self);
    fn is_active(&self) -> bool;
}

pub trait TickScheduler: Send + Sync {
    fn schedule(&self, started: Instant) -> Box<dyn TickHandle>;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct NoopTickScheduler;

struct NoopTickHandle {
    active: bool,
}

impl TickHandle for NoopTickHandle {
    fn cancel(&mut self) {
        self.active = false;
    }

    fn is_active(&self) -> bool {
        self.active
    }
}

impl TickScheduler for NoopTickScheduler {
    fn schedule(&self, _started: Instant) -> Box<dyn TickHandle> {
        Box::new(NoopTickHandle { active: true })
    }
}

pub struct TokioTickScheduler {
    runtime: Handle,
    period: Duration,
    clock: Arc<dyn Clock>,
    elapsed_tx: Arc<watch::Sender<f64>>,
}

impl TokioTickScheduler {
    pub fn new(runtime: Handle, period: Duration, clock: Arc<dyn Clock>) -> Self {
        let (elapsed_tx, _) = watch::channel(0.0);
        Self {
            runtime,
            period: period.max(Duration::from_millis(1)),
            clock,
            elapsed_tx: Arc::new(elapsed_tx),
        }
    }

    pub fn subscribe(&self) -> watch::Receiver<f64> {
        self.elapsed_tx.subscribe()
    }
}

impl TickScheduler for TokioTickScheduler {
    fn schedule(&self, started: Instant) -> Box<dyn TickHandle> {
        self.elapsed_tx.send_replace(0.0);

        let period = self.period;
        let clock = self.clock.clone();
        let elapsed_tx = self.elapsed_tx.clone();
        let task = self.runtime.spawn(async move {
            let mut interval = tokio::time::interval(period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
            loop {
                interval.tick().await;
                let secs = clock.now().saturating_duration_since(started).as_secs_f64();
                elapsed_tx.send_replace(secs);
            }
        });
        debug!(period_ms = period.as_millis() as u64, "display ticker armed");

        Box::new(TokioTickHandle { task: Some(task) })
    }
}

struct TokioTickHandle {
    task: Option<JoinHandle<()>>,
}

impl TickHandle for TokioTickHandle {
    fn cancel(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
            debug!("display ticker cancelled");
        }
    }

    fn is_active(&self) -> bool {
        self.task.is_some()
    }
}

impl Drop for TokioTickHandle {
    fn drop(&mut self) {
        self.cancel();
    }
}

#[cfg(test)]
#[path = "tests/timer_tests.rs"]
mod tests;
