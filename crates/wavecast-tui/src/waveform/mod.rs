//! Real-time waveform: a rolling history of peak amplitudes, filled by a
//! fast sampler and painted by a frame-synchronised renderer.
//!
//! ```text
//!   analyser frame (256 x u8) --sampler--> WaveformHistory --renderer--> RenderSurface
//!        every 15 ms                          FIFO ring          every 1/60 s
//! ```

pub mod renderer;
pub mod sampler;

use std::collections::VecDeque;

use ratatui::style::Color;

use wavecast_proto::config::WaveformConfig;

/// Canvas resolution, in drawing units (braille dots for the terminal pane).
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct CanvasSize {
    pub width: f64,
    pub height: f64,
}

impl CanvasSize {
    pub fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }

    pub fn mid(&self) -> f64 {
        self.height / 2.0
    }
}

/// Bar geometry and colours.
#[derive(Debug, Clone)]
pub struct WaveformStyle {
    pub bar_width: f64,
    pub bar_spacing: f64,
    pub background: Color,
    pub bar: Color,
    pub reference: Color,
    pub dash: f64,
    pub gap: f64,
}

impl WaveformStyle {
    pub fn from_config(cfg: &WaveformConfig) -> Self {
        Self {
            bar_width: f64::from(cfg.bar_width.max(1)),
            bar_spacing: f64::from(cfg.bar_spacing),
            ..Self::default()
        }
    }

    /// Horizontal distance between the left edges of two bars.
    pub fn stride(&self) -> f64 {
        self.bar_width + self.bar_spacing
    }

    /// How many bars fit across `width`.
    pub fn capacity_for(&self, width: f64) -> usize {
        if width <= 0.0 || self.stride() <= 0.0 {
            return 0;
        }
        (width / self.stride()).floor() as usize
    }
}

impl Default for WaveformStyle {
    fn default() -> Self {
        Self {
            bar_width: 2.0,
            bar_spacing: 1.0,
            background: crate::theme::C_BG,
            bar: crate::theme::C_WAVE,
            reference: crate::theme::C_MUTED,
            dash: 4.0,
            gap: 4.0,
        }
    }
}

/// Fixed-capacity sliding window of half-bar heights.  Pushing at capacity
/// evicts the oldest entry.
#[derive(Debug, Clone, Default)]
pub struct WaveformHistory {
    bars: VecDeque<f64>,
    capacity: usize,
}

impl WaveformHistory {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            bars: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.bars.len()
    }

    #[cfg(test)]
    pub fn is_empty(&self) -> bool {
        self.bars.is_empty()
    }

    pub fn push(&mut self, half_height: f64) {
        if self.capacity == 0 {
            return;
        }
        while self.bars.len() >= self.capacity {
            self.bars.pop_front();
        }
        self.bars.push_back(half_height.max(0.0));
    }

    /// Change capacity (canvas resized).  Shrinking drops the oldest bars.
    pub fn set_capacity(&mut self, capacity: usize) {
        self.capacity = capacity;
        while self.bars.len() > capacity {
            self.bars.pop_front();
        }
    }

    pub fn clear(&mut self) {
        self.bars.clear();
    }

    /// Oldest first.
    pub fn iter(&self) -> impl Iterator<Item = f64> + '_ {
        self.bars.iter().copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_capacity_from_canvas_width() {
        let style = WaveformStyle::default();
        assert_eq!(style.capacity_for(300.0), 100);
        assert_eq!(style.capacity_for(302.9), 100);
        assert_eq!(style.capacity_for(0.0), 0);
    }

    #[test]
    fn test_history_never_exceeds_capacity() {
        let mut h = WaveformHistory::with_capacity(16);
        for i in 0..1000 {
            h.push(i as f64);
            assert!(h.len() <= 16);
        }
        assert_eq!(h.len(), 16);
        let bars: Vec<f64> = h.iter().collect();
        assert_eq!(bars.first(), Some(&984.0));
        assert_eq!(bars.last(), Some(&999.0));
    }

    #[test]
    fn test_shrink_keeps_newest() {
        let mut h = WaveformHistory::with_capacity(8);
        for i in 0..8 {
            h.push(i as f64);
        }
        h.set_capacity(3);
        assert_eq!(h.iter().collect::<Vec<_>>(), vec![5.0, 6.0, 7.0]);
        h.push(8.0);
        assert_eq!(h.iter().collect::<Vec<_>>(), vec![6.0, 7.0, 8.0]);
    }

    #[test]
    fn test_zero_capacity_and_negative_heights() {
        let mut h = WaveformHistory::with_capacity(0);
        h.push(3.0);
        assert!(h.is_empty());

        let mut h = WaveformHistory::with_capacity(2);
        h.push(-1.0);
        assert_eq!(h.iter().next(), Some(0.0));
    }
}
