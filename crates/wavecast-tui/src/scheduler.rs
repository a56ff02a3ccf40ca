//! Periodic timers with start / stop / replace semantics per kind.
//!
//! Four kinds coexist: the 1 s progress tick, the 15 ms waveform sampler,
//! the 60 Hz renderer and the 10 s API poll.  Starting a kind that is already
//! running replaces it, so there is never more than one producer per kind.
//!
//! `TokioScheduler` runs each kind as an interval task that posts
//! `TimerFired` into the app loop.  Replacing or stopping a kind aborts its
//! task and bumps its generation; ticks from an older generation that were
//! already queued are dropped by `accept`.

use std::collections::HashMap;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::AbortHandle;
use tracing::trace;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TimerKind {
    Progress,
    Sampler,
    Render,
    Poll,
}

impl TimerKind {
    pub const ALL: [TimerKind; 4] = [
        TimerKind::Progress,
        TimerKind::Sampler,
        TimerKind::Render,
        TimerKind::Poll,
    ];

    /// The timers that only make sense while audio is playing.
    pub const PLAYBACK: [TimerKind; 3] = [TimerKind::Progress, TimerKind::Sampler, TimerKind::Render];
}

/// A tick delivered by a timer task.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimerFired {
    pub kind: TimerKind,
    pub generation: u64,
}

pub trait Scheduler {
    /// Start `kind`, replacing any instance already running.
    fn start(&mut self, kind: TimerKind, period: Duration);
    fn stop(&mut self, kind: TimerKind);
    fn is_active(&self, kind: TimerKind) -> bool;
}

struct RunningTimer {
    abort: AbortHandle,
    generation: u64,
}

pub struct TokioScheduler {
    tx: mpsc::Sender<TimerFired>,
    running: HashMap<TimerKind, RunningTimer>,
    next_generation: u64,
}

impl TokioScheduler {
    pub fn new(tx: mpsc::Sender<TimerFired>) -> Self {
        Self {
            tx,
            running: HashMap::new(),
            next_generation: 1,
        }
    }

    /// True if `fired` comes from the currently running instance of its kind.
    pub fn accept(&self, fired: TimerFired) -> bool {
        self.running
            .get(&fired.kind)
            .map(|t| t.generation == fired.generation)
            .unwrap_or(false)
    }

    pub fn stop_all(&mut self) {
        for kind in TimerKind::ALL {
            self.stop(kind);
        }
    }
}

impl Scheduler for TokioScheduler {
    fn start(&mut self, kind: TimerKind, period: Duration) {
        self.stop(kind);

        let generation = self.next_generation;
        self.next_generation += 1;

        let tx = self.tx.clone();
        let period = period.max(Duration::from_millis(1));
        let handle = tokio::spawn(async move {
            let mut interval = tokio::time::interval_at(tokio::time::Instant::now() + period, period);
            interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
            loop {
                interval.tick().await;
                if tx.send(TimerFired { kind, generation }).await.is_err() {
                    break;
                }
            }
        });
        trace!("scheduler: start {:?} gen={} period={:?}", kind, generation, period);
        self.running.insert(
            kind,
            RunningTimer {
                abort: handle.abort_handle(),
                generation,
            },
        );
    }

    fn stop(&mut self, kind: TimerKind) {
        if let Some(timer) = self.running.remove(&kind) {
            trace!("scheduler: stop {:?} gen={}", kind, timer.generation);
            timer.abort.abort();
        }
    }

    fn is_active(&self, kind: TimerKind) -> bool {
        self.running.contains_key(&kind)
    }
}

impl Drop for TokioScheduler {
    fn drop(&mut self) {
        self.stop_all();
    }
}
