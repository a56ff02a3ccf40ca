//! In-memory stand-ins for the controller's collaborators.

use std::cell::Cell;
use std::collections::HashMap;
use std::rc::Rc;
use std::time::Duration;

use crate::audio::{AudioError, AudioGraph};
use crate::clock::Clock;
use crate::media_session::{MediaMetadata, MediaPlaybackState, MediaSession};
use crate::scheduler::{Scheduler, TimerKind};

/// A new graph starts suspended, like a freshly created audio context.
#[derive(Debug, Default)]
pub struct FakeGraph {
    pub created: bool,
    pub creations: usize,
    pub suspended: bool,
    pub playing: bool,
    pub source: Option<String>,
    pub plays: Vec<String>,
    pub frame: Option<Vec<u8>>,
    pub reads: Cell<usize>,
    pub fail_ensure: Option<AudioError>,
    pub fail_resume: Option<AudioError>,
    pub fail_play: Option<AudioError>,
}

impl AudioGraph for FakeGraph {
    fn ensure_graph(&mut self) -> Result<(), AudioError> {
        if let Some(e) = self.fail_ensure.clone() {
            return Err(e);
        }
        if !self.created {
            self.created = true;
            self.creations += 1;
            self.suspended = true;
        }
        Ok(())
    }

    fn has_graph(&self) -> bool {
        self.created
    }

    fn set_source(&mut self, url: &str) {
        self.source = Some(url.to_string());
    }

    fn is_suspended(&self) -> bool {
        self.suspended
    }

    fn resume(&mut self) -> Result<(), AudioError> {
        if let Some(e) = self.fail_resume.clone() {
            return Err(e);
        }
        self.suspended = false;
        Ok(())
    }

    fn play(&mut self) -> Result<(), AudioError> {
        if let Some(e) = self.fail_play.clone() {
            return Err(e);
        }
        let url = self
            .source
            .clone()
            .ok_or_else(|| AudioError::PlayRejected("no source".into()))?;
        self.playing = true;
        self.plays.push(url);
        Ok(())
    }

    fn pause(&mut self) {
        self.playing = false;
        self.suspended = true;
    }

    fn read_time_domain(&self, out: &mut [u8]) -> bool {
        self.reads.set(self.reads.get() + 1);
        let Some(frame) = &self.frame else {
            return false;
        };
        for (dst, src) in out.iter_mut().zip(frame.iter()) {
            *dst = *src;
        }
        true
    }
}

#[derive(Debug, Default)]
pub struct RecordingMedia {
    pub metadata: Option<MediaMetadata>,
    pub playback_state: MediaPlaybackState,
    pub cleared: usize,
}

impl MediaSession for RecordingMedia {
    fn set_metadata(&mut self, metadata: Option<MediaMetadata>) {
        if metadata.is_none() {
            self.cleared += 1;
        }
        self.metadata = metadata;
    }

    fn set_playback_state(&mut self, state: MediaPlaybackState) {
        self.playback_state = state;
    }
}

/// Records which kinds are running and under which generation.
#[derive(Debug, Default)]
pub struct ManualScheduler {
    active: HashMap<TimerKind, (Duration, u64)>,
    next_generation: u64,
}

impl ManualScheduler {
    pub fn generation(&self, kind: TimerKind) -> Option<u64> {
        self.active.get(&kind).map(|(_, g)| *g)
    }

    pub fn period(&self, kind: TimerKind) -> Option<Duration> {
        self.active.get(&kind).map(|(p, _)| *p)
    }
}

impl Scheduler for ManualScheduler {
    fn start(&mut self, kind: TimerKind, period: Duration) {
        self.next_generation += 1;
        self.active.insert(kind, (period, self.next_generation));
    }

    fn stop(&mut self, kind: TimerKind) {
        self.active.remove(&kind);
    }

    fn is_active(&self, kind: TimerKind) -> bool {
        self.active.contains_key(&kind)
    }
}

#[derive(Debug, Clone)]
pub struct ManualClock(Rc<Cell<f64>>);

impl ManualClock {
    pub fn new(now: f64) -> Self {
        Self(Rc::new(Cell::new(now)))
    }

    pub fn set(&self, now: f64) {
        self.0.set(now);
    }
}

impl Clock for ManualClock {
    fn now_epoch_secs(&self) -> f64 {
        self.0.get()
    }
}
