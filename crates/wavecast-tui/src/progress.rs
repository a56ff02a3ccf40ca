//! Elapsed-time tracking for the selected track.

use wavecast_proto::reconcile::PlaybackBaseline;

/// What the now-playing pane shows for one progress tick.
#[derive(Debug, Clone, PartialEq)]
pub struct ProgressView {
    pub elapsed_secs: i64,
    pub duration_secs: i64,
    /// 0.0..=100.0
    pub percent: f64,
    pub elapsed_label: String,
    pub duration_label: String,
    /// The listener is well past the track's end; a fresh context is needed.
    pub needs_repoll: bool,
}

impl ProgressView {
    pub fn zero() -> Self {
        Self {
            elapsed_secs: 0,
            duration_secs: 0,
            percent: 0.0,
            elapsed_label: format_time(0),
            duration_label: format_time(0),
            needs_repoll: false,
        }
    }

    pub fn ratio(&self) -> f64 {
        self.percent / 100.0
    }
}

#[derive(Debug, Clone)]
pub struct ProgressTimer {
    baseline: Option<PlaybackBaseline>,
    repoll_grace_secs: f64,
}

impl ProgressTimer {
    pub fn new(repoll_grace_secs: f64) -> Self {
        Self {
            baseline: None,
            repoll_grace_secs,
        }
    }

    pub fn baseline(&self) -> Option<PlaybackBaseline> {
        self.baseline
    }

    pub fn set_baseline(&mut self, baseline: Option<PlaybackBaseline>) {
        self.baseline = baseline;
    }

    pub fn tick(&self, now: f64) -> ProgressView {
        let Some(baseline) = self.baseline else {
            return ProgressView::zero();
        };
        if baseline.duration <= 0.0 {
            return ProgressView::zero();
        }

        let elapsed = (now - baseline.lag_adjusted_start).floor();
        let duration = baseline.duration.floor();
        let shown = elapsed.clamp(0.0, duration);
        let percent = (shown / baseline.duration * 100.0).clamp(0.0, 100.0);

        ProgressView {
            elapsed_secs: shown as i64,
            duration_secs: duration as i64,
            percent,
            elapsed_label: format_time(shown as i64),
            duration_label: format_time(duration as i64),
            needs_repoll: elapsed > baseline.duration + self.repoll_grace_secs,
        }
    }
}

/// `m:ss`.  Minutes are not folded into hours.
pub fn format_time(secs: i64) -> String {
    let s = secs.max(0);
    format!("{}:{:02}", s / 60, s % 60)
}

#[cfg(test)]
mod tests {
    use super::*;

    const T: f64 = 1_700_000_000.0;

    fn timer(start: f64, duration: f64) -> ProgressTimer {
        let mut t = ProgressTimer::new(5.0);
        t.set_baseline(Some(PlaybackBaseline {
            lag_adjusted_start: start,
            duration,
        }));
        t
    }

    #[test]
    fn test_format_time() {
        assert_eq!(format_time(0), "0:00");
        assert_eq!(format_time(65), "1:05");
        assert_eq!(format_time(3599), "59:59");
        assert_eq!(format_time(3600), "60:00");
        assert_eq!(format_time(-3), "0:00");
    }

    #[test]
    fn test_elapsed_from_lag_adjusted_start() {
        let view = timer(T + 40.0, 180.0).tick(T + 50.4);
        assert_eq!(view.elapsed_secs, 10);
        assert_eq!(view.elapsed_label, "0:10");
        assert_eq!(view.duration_label, "3:00");
        assert!((view.percent - 10.0 / 180.0 * 100.0).abs() < 1e-9);
        assert!(!view.needs_repoll);
    }

    #[test]
    fn test_percent_clamped_past_end() {
        let t = timer(T, 100.0);
        let view = t.tick(T + 103.0);
        assert_eq!(view.percent, 100.0);
        assert_eq!(view.elapsed_label, "1:40");
        assert!(!view.needs_repoll);

        let before = t.tick(T - 30.0);
        assert_eq!(before.percent, 0.0);
        assert_eq!(before.elapsed_label, "0:00");
    }

    #[test]
    fn test_repoll_after_grace() {
        let t = timer(T, 100.0);
        assert!(!t.tick(T + 105.0).needs_repoll);
        assert!(t.tick(T + 106.0).needs_repoll);
    }

    #[test]
    fn test_zero_duration_is_zero_state() {
        let view = timer(T, 0.0).tick(T + 500.0);
        assert_eq!(view, ProgressView::zero());
        assert_eq!(ProgressTimer::new(5.0).tick(T), ProgressView::zero());
    }
}
