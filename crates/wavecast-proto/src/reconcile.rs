//! Track-time reconciliation.
//!
//! The server's `played_at` is the broadcast position; what comes out of the
//! speaker lags behind it by network and player buffering.  Every timestamp is
//! shifted forward by a fixed latency buffer before being compared with the
//! local wall clock, and the track whose shifted window contains "now" wins:
//!
//! ```text
//!   history[0]            now_playing            playing_next
//! |------------------|---------------------|------------------>
//!                    now_start             now_end
//! ```
//!
//! Reconciliation is a pure function of (context, now); collaborators apply
//! the side effects.

use serde::Serialize;
use tracing::warn;

use crate::nowplaying::{NowPlayingContext, TrackSnapshot};

pub const DEFAULT_LATENCY_BUFFER_SECS: f64 = 40.0;

/// Where the selected track came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum TrackSource {
    /// Head of `song_history`: the server moved on, the listener hasn't yet.
    Previous,
    Current,
    /// `playing_next`: the listener is past the reported track's end.
    Next,
}

/// Lag-adjusted start of the selected track plus its duration.  Drives the
/// progress timer until the next reconciliation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PlaybackBaseline {
    pub lag_adjusted_start: f64,
    pub duration: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Reconciliation {
    pub track: TrackSnapshot,
    pub baseline: PlaybackBaseline,
    pub source: TrackSource,
    /// Client clock is before the adjusted start of `now_playing` and there
    /// is no history to fall back to.
    pub timing_inconsistent: bool,
}

#[derive(Debug, Clone, Copy)]
pub struct Reconciler {
    latency_secs: f64,
}

impl Default for Reconciler {
    fn default() -> Self {
        Self::new(DEFAULT_LATENCY_BUFFER_SECS)
    }
}

impl Reconciler {
    pub fn new(latency_secs: f64) -> Self {
        Self { latency_secs }
    }

    pub fn latency_secs(&self) -> f64 {
        self.latency_secs
    }

    /// `[start, end)` of a track after the latency shift.
    pub fn window(&self, track: &TrackSnapshot) -> (f64, f64) {
        let start = track.played_at + self.latency_secs;
        (start, start + track.duration)
    }

    pub fn reconcile(&self, ctx: &NowPlayingContext, current_time: f64) -> Reconciliation {
        let (now_start, now_end) = self.window(&ctx.now_playing);
        let mut timing_inconsistent = false;

        let (track, source) = if current_time < now_start {
            match ctx.song_history.first() {
                Some(previous) => {
                    let (_, prev_end) = self.window(previous);
                    if current_time < prev_end {
                        (previous, TrackSource::Previous)
                    } else {
                        // Past the previous track as well: stale payload.
                        (&ctx.now_playing, TrackSource::Current)
                    }
                }
                None => {
                    warn!(
                        "[reconcile] {}: client time {:.0} is before adjusted start {:.0} and no history is available",
                        ctx.shortcode, current_time, now_start
                    );
                    timing_inconsistent = true;
                    (&ctx.now_playing, TrackSource::Current)
                }
            }
        } else if current_time >= now_end {
            match ctx.playing_next.as_ref() {
                Some(next) => (next, TrackSource::Next),
                None => (&ctx.now_playing, TrackSource::Current),
            }
        } else {
            (&ctx.now_playing, TrackSource::Current)
        };

        Reconciliation {
            baseline: PlaybackBaseline {
                lag_adjusted_start: track.played_at + self.latency_secs,
                duration: track.duration,
            },
            track: track.clone(),
            source,
            timing_inconsistent,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const T: f64 = 1_700_000_000.0;
    const L: f64 = 40.0;

    fn track(title: &str, played_at: f64, duration: f64) -> TrackSnapshot {
        TrackSnapshot {
            played_at,
            duration,
            title: title.to_string(),
            artist: "Artist".to_string(),
            art_url: None,
        }
    }

    fn ctx(history: Vec<TrackSnapshot>, next: Option<TrackSnapshot>) -> NowPlayingContext {
        NowPlayingContext {
            station_name: "Test FM".to_string(),
            shortcode: "test".to_string(),
            now_playing: track("current", T, 180.0),
            song_history: history,
            playing_next: next,
        }
    }

    #[test]
    fn test_inside_window_selects_now_playing() {
        let r = Reconciler::new(L);
        let c = ctx(
            vec![track("previous", T - 200.0, 200.0)],
            Some(track("next", T + 180.0, 150.0)),
        );
        for offset in [0.0, 0.5, 10.0, 90.0, 179.9] {
            let out = r.reconcile(&c, T + L + offset);
            assert_eq!(out.source, TrackSource::Current, "offset {offset}");
            assert_eq!(out.track.title, "current");
            assert!(!out.timing_inconsistent);
        }
    }

    #[test]
    fn test_scenario_elapsed_ten_seconds() {
        let r = Reconciler::new(L);
        let c = ctx(vec![], None);
        let now = T + 40.0 + 10.0;
        let out = r.reconcile(&c, now);
        assert_eq!(out.source, TrackSource::Current);
        assert_eq!(out.baseline.lag_adjusted_start, T + 40.0);
        assert_eq!(out.baseline.duration, 180.0);
        assert_eq!((now - out.baseline.lag_adjusted_start).floor(), 10.0);
    }

    #[test]
    fn test_before_start_selects_history_head() {
        let r = Reconciler::new(L);
        let c = ctx(
            vec![
                track("previous", T - 200.0, 200.0),
                track("older", T - 400.0, 200.0),
            ],
            None,
        );
        // previous window: [T - 160, T + 40)
        let out = r.reconcile(&c, T + 20.0);
        assert_eq!(out.source, TrackSource::Previous);
        assert_eq!(out.track.title, "previous");
        assert_eq!(out.baseline.lag_adjusted_start, T - 160.0);
        assert_eq!(out.baseline.duration, 200.0);
    }

    #[test]
    fn test_before_start_past_history_falls_back_to_current() {
        let r = Reconciler::new(L);
        // previous window: [T - 260, T - 20); "now" is after that but before T + 40.
        let c = ctx(vec![track("previous", T - 300.0, 240.0)], None);
        let out = r.reconcile(&c, T);
        assert_eq!(out.source, TrackSource::Current);
        assert!(!out.timing_inconsistent);
    }

    #[test]
    fn test_before_start_without_history_flags_inconsistency() {
        let r = Reconciler::new(L);
        let c = ctx(vec![], None);
        let out = r.reconcile(&c, T + 10.0);
        assert_eq!(out.source, TrackSource::Current);
        assert!(out.timing_inconsistent);
        assert_eq!(out.baseline.lag_adjusted_start, T + L);
    }

    #[test]
    fn test_past_end_selects_next_when_present() {
        let r = Reconciler::new(L);
        let with_next = ctx(vec![], Some(track("next", T + 180.0, 150.0)));
        let out = r.reconcile(&with_next, T + L + 180.0);
        assert_eq!(out.source, TrackSource::Next);
        assert_eq!(out.track.title, "next");
        assert_eq!(out.baseline.lag_adjusted_start, T + 180.0 + L);

        let without_next = ctx(vec![], None);
        let out = r.reconcile(&without_next, T + L + 500.0);
        assert_eq!(out.source, TrackSource::Current);
        assert_eq!(out.track.title, "current");
    }

    #[test]
    fn test_reconcile_is_idempotent_within_window() {
        let r = Reconciler::new(L);
        let c = ctx(
            vec![track("previous", T - 200.0, 200.0)],
            Some(track("next", T + 180.0, 150.0)),
        );
        for now in [T + 10.0, T + 60.0, T + 300.0] {
            let a = r.reconcile(&c, now);
            let b = r.reconcile(&c, now + 0.25);
            assert_eq!(a.source, b.source);
            assert_eq!(a.track, b.track);
            assert_eq!(a.baseline, b.baseline);
        }
    }

    #[test]
    fn test_zero_latency_uses_raw_timestamps() {
        let r = Reconciler::new(0.0);
        let c = ctx(vec![track("previous", T - 200.0, 200.0)], None);
        assert_eq!(r.reconcile(&c, T - 1.0).source, TrackSource::Previous);
        assert_eq!(r.reconcile(&c, T).source, TrackSource::Current);
    }
}
