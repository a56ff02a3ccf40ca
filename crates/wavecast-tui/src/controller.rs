//! Session controller: station selection, playback phases, reconciliation
//! and the waveform loops.
//!
//! All state lives in one [`SessionState`] owned by the [`Controller`].  Every
//! collaborator with side effects (audio, media session, timers, wall clock)
//! is a trait so the whole state machine runs under test without a terminal,
//! mpv or a network.
//!
//! ```text
//!   Idle ──(first snapshot / select)──▶ Selected ──(toggle)──▶ Playing
//!                                                   ▲            │
//!                                                   └─(toggle)── Stopped ◀─(toggle / audio error)
//! ```
//!
//! Operations return [`Effect`]s for the app loop to carry out.

use std::time::Duration;

use serde::Serialize;
use tracing::{debug, info, warn};

use wavecast_proto::config::Config;
use wavecast_proto::nowplaying::{
    context_for, stations_from_payload, ApiStationEntry, DisplayNames, NowPlayingContext,
    StationDescriptor,
};
use wavecast_proto::reconcile::{PlaybackBaseline, Reconciler, TrackSource};

use crate::audio::{AudioError, AudioGraph};
use crate::clock::Clock;
use crate::media_session::{MediaMetadata, MediaPlaybackState, MediaSession};
use crate::progress::{ProgressTimer, ProgressView};
use crate::scheduler::{Scheduler, TimerKind};
use crate::waveform::renderer::{render_frame, render_idle_frame, DisplayList, RenderSurface};
use crate::waveform::sampler::{SampleOutcome, WaveformSampler};
use crate::waveform::{CanvasSize, WaveformHistory, WaveformStyle};

pub const NO_TRACK_PLACEHOLDER: &str = "No track information";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PlaybackPhase {
    Idle,
    Selected,
    Playing,
    /// Paused and stopped are one phase: a live stream restarts from "now".
    Stopped,
}

impl PlaybackPhase {
    pub fn label(self) -> &'static str {
        match self {
            PlaybackPhase::Idle => "idle",
            PlaybackPhase::Selected => "ready",
            PlaybackPhase::Playing => "playing",
            PlaybackPhase::Stopped => "stopped",
        }
    }
}

/// Work the controller needs the app loop to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Effect {
    /// Poll the now-playing API out of band.
    FetchNow,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NowPlayingDisplay {
    pub title: String,
    pub artist: String,
    pub station: String,
    pub art_url: Option<String>,
    #[serde(skip)]
    pub source: Option<TrackSource>,
}

impl NowPlayingDisplay {
    pub fn placeholder() -> Self {
        Self {
            title: NO_TRACK_PLACEHOLDER.to_string(),
            artist: String::new(),
            station: String::new(),
            art_url: None,
            source: None,
        }
    }

    pub fn is_placeholder(&self) -> bool {
        self.source.is_none()
    }
}

/// Periods of the four timer kinds.
#[derive(Debug, Clone, Copy)]
pub struct Timings {
    pub progress: Duration,
    pub sampler: Duration,
    pub render: Duration,
    pub poll: Duration,
}

impl Timings {
    pub fn from_config(cfg: &Config) -> Self {
        Self {
            progress: Duration::from_secs(1),
            sampler: Duration::from_millis(cfg.waveform.sample_interval_ms.max(1)),
            render: Duration::from_secs(1) / cfg.waveform.render_fps.max(1),
            poll: Duration::from_secs(cfg.api.poll_interval_secs.max(1)),
        }
    }
}

/// Everything the UI reads.
#[derive(Debug, Clone)]
pub struct SessionState {
    pub stations: Vec<StationDescriptor>,
    pub selected: Option<usize>,
    pub phase: PlaybackPhase,
    pub now_playing: NowPlayingDisplay,
    pub progress: ProgressView,
    pub last_error: Option<String>,
}

impl Default for SessionState {
    fn default() -> Self {
        Self {
            stations: Vec::new(),
            selected: None,
            phase: PlaybackPhase::Idle,
            now_playing: NowPlayingDisplay::placeholder(),
            progress: ProgressView::zero(),
            last_error: None,
        }
    }
}

impl SessionState {
    pub fn is_playing(&self) -> bool {
        self.phase == PlaybackPhase::Playing
    }

    pub fn selected_station(&self) -> Option<&StationDescriptor> {
        self.selected.and_then(|i| self.stations.get(i))
    }
}

pub struct Controller<A, M, S, C> {
    graph: A,
    media: M,
    scheduler: S,
    clock: C,
    timings: Timings,
    names: DisplayNames,
    reconciler: Reconciler,
    progress: ProgressTimer,
    repoll_requested: bool,
    snapshot: Option<Vec<ApiStationEntry>>,
    history: WaveformHistory,
    sampler: WaveformSampler,
    style: WaveformStyle,
    surface: DisplayList,
    pending_errors: Vec<String>,
    state: SessionState,
}

impl<A, M, S, C> Controller<A, M, S, C>
where
    A: AudioGraph,
    M: MediaSession,
    S: Scheduler,
    C: Clock,
{
    pub fn new(config: &Config, graph: A, media: M, scheduler: S, clock: C) -> Self {
        let style = WaveformStyle::from_config(&config.waveform);
        Self {
            graph,
            media,
            scheduler,
            clock,
            timings: Timings::from_config(config),
            names: DisplayNames::new(&config.display_names),
            reconciler: Reconciler::new(config.playback.latency_buffer_secs),
            progress: ProgressTimer::new(config.playback.repoll_grace_secs),
            repoll_requested: false,
            snapshot: None,
            history: WaveformHistory::with_capacity(0),
            sampler: WaveformSampler::new(
                config.waveform.fft_size,
                config.waveform.amplitude_scale,
            ),
            style,
            surface: DisplayList::default(),
            pending_errors: Vec::new(),
            state: SessionState::default(),
        }
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub fn display_list(&self) -> &DisplayList {
        &self.surface
    }

    #[cfg(test)]
    pub(crate) fn history(&self) -> &WaveformHistory {
        &self.history
    }

    #[cfg(test)]
    pub(crate) fn graph(&self) -> &A {
        &self.graph
    }

    #[cfg(test)]
    pub(crate) fn media(&self) -> &M {
        &self.media
    }

    pub fn scheduler(&self) -> &S {
        &self.scheduler
    }

    pub fn scheduler_mut(&mut self) -> &mut S {
        &mut self.scheduler
    }

    #[cfg(test)]
    pub(crate) fn graph_mut(&mut self) -> &mut A {
        &mut self.graph
    }

    /// Inline errors raised since the last call, oldest first.
    pub fn take_errors(&mut self) -> Vec<String> {
        std::mem::take(&mut self.pending_errors)
    }

    /// Begin polling.  The caller performs the returned fetch.
    pub fn start(&mut self) -> Vec<Effect> {
        self.scheduler.start(TimerKind::Poll, self.timings.poll);
        self.render_idle();
        vec![Effect::FetchNow]
    }

    /// The waveform pane changed size.
    pub fn resize_canvas(&mut self, size: CanvasSize) {
        if self.surface.size() == size {
            return;
        }
        self.surface.resize(size);
        self.history.set_capacity(self.style.capacity_for(size.width));
        if !self.state.is_playing() {
            self.render_idle();
        }
    }

    // ── API results ───────────────────────────────────────────────────────────

    pub fn apply_snapshot(&mut self, entries: Option<Vec<ApiStationEntry>>) -> Vec<Effect> {
        let Some(entries) = entries else {
            debug!("controller: no now-playing data, showing placeholder");
            self.snapshot = None;
            self.apply_context(None);
            return Vec::new();
        };

        let stations = stations_from_payload(&entries, &self.names);
        let previous = self
            .state
            .selected_station()
            .map(|s| s.shortcode.clone());
        self.state.selected = previous
            .as_deref()
            .and_then(|code| stations.iter().position(|s| s.shortcode == code));
        self.state.stations = stations;
        self.snapshot = Some(entries);

        if previous.is_some() && self.state.selected.is_none() {
            warn!("controller: selected station vanished from the payload");
            if self.state.is_playing() {
                self.stop_playback();
            }
            self.state.phase = PlaybackPhase::Idle;
        }

        if self.state.selected.is_none() && !self.state.stations.is_empty() {
            info!(
                "controller: auto-selecting {}",
                self.state.stations[0].display_name
            );
            self.state.selected = Some(0);
            self.state.phase = PlaybackPhase::Selected;
            self.scheduler.start(TimerKind::Poll, self.timings.poll);
        }

        self.reconcile_selected();
        Vec::new()
    }

    /// One reconciliation pass.  `None` means the payload had nothing usable
    /// for the selected station.
    pub fn apply_context(&mut self, ctx: Option<&NowPlayingContext>) {
        let Some(ctx) = ctx else {
            self.state.now_playing = NowPlayingDisplay::placeholder();
            self.state.progress = ProgressView::zero();
            self.progress.set_baseline(None);
            self.scheduler.stop(TimerKind::Progress);
            self.media.set_metadata(None);
            return;
        };

        let now = self.clock.now_epoch_secs();
        let rec = self.reconciler.reconcile(ctx, now);
        debug!(
            "controller: {} -> {:?} '{}'",
            ctx.shortcode, rec.source, rec.track.title
        );

        self.state.now_playing = NowPlayingDisplay {
            title: rec.track.title.clone(),
            artist: rec.track.artist.clone(),
            station: ctx.station_name.clone(),
            art_url: rec.track.art_url.clone(),
            source: Some(rec.source),
        };
        self.media
            .set_metadata(Some(MediaMetadata::for_track(&rec.track, &ctx.station_name)));

        self.set_baseline(rec.baseline);
        self.state.progress = self.progress.tick(now);
        if self.state.is_playing() {
            self.scheduler.start(TimerKind::Progress, self.timings.progress);
        }
    }

    fn set_baseline(&mut self, baseline: PlaybackBaseline) {
        if self.progress.baseline() != Some(baseline) {
            self.repoll_requested = false;
        }
        self.progress.set_baseline(Some(baseline));
    }

    fn reconcile_selected(&mut self) {
        let ctx = match (&self.snapshot, self.state.selected_station()) {
            (Some(entries), Some(station)) => context_for(entries, &station.shortcode, &self.names),
            _ => None,
        };
        self.apply_context(ctx.as_ref());
    }

    // ── User actions ──────────────────────────────────────────────────────────

    pub fn select_station(&mut self, idx: usize) -> Vec<Effect> {
        let Some(station) = self.state.stations.get(idx) else {
            debug!("controller: select_station({}) out of range", idx);
            return Vec::new();
        };
        info!("controller: select {} ({})", station.display_name, station.shortcode);

        let was_playing = self.state.is_playing();
        if was_playing {
            self.stop_playback();
        }

        self.state.selected = Some(idx);
        if self.state.phase == PlaybackPhase::Idle {
            self.state.phase = PlaybackPhase::Selected;
        }
        self.reconcile_selected();
        self.scheduler.start(TimerKind::Poll, self.timings.poll);

        if was_playing {
            self.start_playback();
        }
        vec![Effect::FetchNow]
    }

    pub fn toggle_play(&mut self) -> Vec<Effect> {
        match self.state.phase {
            PlaybackPhase::Playing => self.stop_playback(),
            PlaybackPhase::Selected | PlaybackPhase::Stopped => self.start_playback(),
            PlaybackPhase::Idle => self.raise_error("No station selected".to_string()),
        }
        Vec::new()
    }

    pub fn start_playback(&mut self) {
        let Some(url) = self.state.selected_station().map(|s| s.stream_url.clone()) else {
            self.raise_error("No station selected".to_string());
            return;
        };

        if let Err(e) = self.graph.ensure_graph() {
            self.fail_playback(e);
            return;
        }
        // committed before anything can start playing
        self.graph.set_source(&url);
        if self.graph.is_suspended() {
            if let Err(e) = self.graph.resume() {
                self.fail_playback(e);
                return;
            }
        }
        if let Err(e) = self.graph.play() {
            self.graph.pause();
            self.fail_playback(e);
            return;
        }

        info!("controller: playing {}", url);
        self.state.phase = PlaybackPhase::Playing;
        self.state.last_error = None;
        self.history.clear();
        self.scheduler.start(TimerKind::Sampler, self.timings.sampler);
        self.scheduler.start(TimerKind::Render, self.timings.render);
        if self.progress.baseline().is_some() {
            self.scheduler.start(TimerKind::Progress, self.timings.progress);
            self.state.progress = self.progress.tick(self.clock.now_epoch_secs());
        }
        self.media.set_playback_state(MediaPlaybackState::Playing);
    }

    pub fn stop_playback(&mut self) {
        self.graph.pause();
        for kind in TimerKind::PLAYBACK {
            self.scheduler.stop(kind);
        }
        if self.state.phase != PlaybackPhase::Idle {
            self.state.phase = PlaybackPhase::Stopped;
        }
        self.history.clear();
        self.render_idle();
        self.media.set_playback_state(MediaPlaybackState::Paused);
        info!("controller: stopped");
    }

    /// The audio output reported a failure.
    pub fn on_audio_error(&mut self, message: &str) {
        if self.state.is_playing() {
            self.stop_playback();
        }
        self.raise_error(format!("Playback error: {}", message));
    }

    // ── Timers ────────────────────────────────────────────────────────────────

    pub fn on_timer(&mut self, kind: TimerKind) -> Vec<Effect> {
        match kind {
            TimerKind::Progress => self.on_progress_tick(),
            TimerKind::Sampler => {
                self.on_sampler_tick();
                Vec::new()
            }
            TimerKind::Render => {
                self.on_render_tick();
                Vec::new()
            }
            TimerKind::Poll => vec![Effect::FetchNow],
        }
    }

    fn on_progress_tick(&mut self) -> Vec<Effect> {
        let view = self.progress.tick(self.clock.now_epoch_secs());
        let repoll = view.needs_repoll && !self.repoll_requested;
        self.state.progress = view;
        if repoll {
            debug!("controller: past track end, re-polling");
            self.repoll_requested = true;
            return vec![Effect::FetchNow];
        }
        Vec::new()
    }

    fn on_sampler_tick(&mut self) {
        let outcome = self.sampler.sample(
            &self.graph,
            self.state.is_playing(),
            self.surface.size().height,
            &mut self.history,
        );
        if outcome == SampleOutcome::Inactive {
            debug!("controller: sampler inactive, stopping it");
            self.scheduler.stop(TimerKind::Sampler);
        }
    }

    fn on_render_tick(&mut self) {
        if !self.state.is_playing() {
            self.scheduler.stop(TimerKind::Render);
            self.render_idle();
            return;
        }
        render_frame(&mut self.surface, &self.history, &self.style);
    }

    fn render_idle(&mut self) {
        render_idle_frame(&mut self.surface, &self.style);
    }

    // ── Errors ────────────────────────────────────────────────────────────────

    fn fail_playback(&mut self, err: AudioError) {
        warn!("controller: playback failed: {}", err);
        for kind in TimerKind::PLAYBACK {
            self.scheduler.stop(kind);
        }
        self.state.phase = PlaybackPhase::Stopped;
        self.media.set_playback_state(MediaPlaybackState::Paused);
        self.render_idle();
        self.raise_error(err.to_string());
    }

    fn raise_error(&mut self, message: String) {
        warn!("controller: {}", message);
        self.state.last_error = Some(message.clone());
        self.pending_errors.push(message);
    }
}
