//! Waveform painting against an abstract surface.
//!
//! Coordinates are canvas units with the origin at the top-left, y growing
//! downwards.  `DisplayList` records the calls; the terminal pane replays them
//! onto a ratatui canvas.

use ratatui::style::Color;

use super::{CanvasSize, WaveformHistory, WaveformStyle};

pub trait RenderSurface {
    fn size(&self) -> CanvasSize;
    fn clear(&mut self, color: Color);
    fn fill_rect(&mut self, x: f64, y: f64, width: f64, height: f64, color: Color);
    fn dashed_hline(&mut self, y: f64, dash: f64, gap: f64, color: Color);
}

/// Bars for every history entry, then the dashed midline on top.
pub fn render_frame<S: RenderSurface>(
    surface: &mut S,
    history: &WaveformHistory,
    style: &WaveformStyle,
) {
    let size = surface.size();
    let mid = size.mid();
    surface.clear(style.background);
    for (i, half) in history.iter().enumerate() {
        let x = i as f64 * style.stride();
        if x >= size.width {
            break;
        }
        let half = half.min(mid);
        surface.fill_rect(x, mid - half, style.bar_width, half * 2.0, style.bar);
    }
    surface.dashed_hline(mid, style.dash, style.gap, style.reference);
}

/// Static frame shown while stopped: reference line only.
pub fn render_idle_frame<S: RenderSurface>(surface: &mut S, style: &WaveformStyle) {
    let mid = surface.size().mid();
    surface.clear(style.background);
    surface.dashed_hline(mid, style.dash, style.gap, style.reference);
}

#[derive(Debug, Clone, PartialEq)]
pub enum DrawOp {
    Clear(Color),
    Rect {
        x: f64,
        y: f64,
        width: f64,
        height: f64,
        color: Color,
    },
    DashedHLine {
        y: f64,
        dash: f64,
        gap: f64,
        color: Color,
    },
}

/// Recording surface.  `clear` drops everything recorded so far.
#[derive(Debug, Clone, Default)]
pub struct DisplayList {
    size: CanvasSize,
    ops: Vec<DrawOp>,
}

impl DisplayList {
    #[cfg(test)]
    pub fn new(size: CanvasSize) -> Self {
        Self {
            size,
            ops: Vec::new(),
        }
    }

    pub fn resize(&mut self, size: CanvasSize) {
        self.size = size;
    }

    pub fn ops(&self) -> &[DrawOp] {
        &self.ops
    }

    #[cfg(test)]
    pub fn bar_count(&self) -> usize {
        self.ops
            .iter()
            .filter(|op| matches!(op, DrawOp::Rect { .. }))
            .count()
    }

    pub fn background(&self) -> Option<Color> {
        self.ops.iter().find_map(|op| match op {
            DrawOp::Clear(c) => Some(*c),
            _ => None,
        })
    }
}

impl RenderSurface for DisplayList {
    fn size(&self) -> CanvasSize {
        self.size
    }

    fn clear(&mut self, color: Color) {
        self.ops.clear();
        self.ops.push(DrawOp::Clear(color));
    }

    fn fill_rect(&mut self, x: f64, y: f64, width: f64, height: f64, color: Color) {
        self.ops.push(DrawOp::Rect {
            x,
            y,
            width,
            height,
            color,
        });
    }

    fn dashed_hline(&mut self, y: f64, dash: f64, gap: f64, color: Color) {
        self.ops.push(DrawOp::DashedHLine { y, dash, gap, color });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn style() -> WaveformStyle {
        WaveformStyle {
            bar_width: 2.0,
            bar_spacing: 1.0,
            ..WaveformStyle::default()
        }
    }

    #[test]
    fn test_frame_draws_bars_then_reference_line() {
        let mut surface = DisplayList::new(CanvasSize::new(30.0, 40.0));
        let mut history = WaveformHistory::with_capacity(10);
        history.push(5.0);
        history.push(10.0);

        render_frame(&mut surface, &history, &style());
        let ops = surface.ops();
        assert_eq!(ops.len(), 4);
        assert!(matches!(ops[0], DrawOp::Clear(_)));
        assert_eq!(
            ops[1],
            DrawOp::Rect {
                x: 0.0,
                y: 15.0,
                width: 2.0,
                height: 10.0,
                color: style().bar
            }
        );
        assert_eq!(
            ops[2],
            DrawOp::Rect {
                x: 3.0,
                y: 10.0,
                width: 2.0,
                height: 20.0,
                color: style().bar
            }
        );
        assert!(matches!(ops[3], DrawOp::DashedHLine { y, .. } if y == 20.0));
    }

    #[test]
    fn test_bars_clamped_to_canvas() {
        let mut surface = DisplayList::new(CanvasSize::new(30.0, 40.0));
        let mut history = WaveformHistory::with_capacity(1);
        history.push(500.0);
        render_frame(&mut surface, &history, &style());
        assert!(matches!(
            surface.ops()[1],
            DrawOp::Rect { y, height, .. } if y == 0.0 && height == 40.0
        ));
    }

    #[test]
    fn test_idle_frame_has_no_bars() {
        let mut surface = DisplayList::new(CanvasSize::new(30.0, 40.0));
        let mut history = WaveformHistory::with_capacity(10);
        history.push(5.0);
        render_frame(&mut surface, &history, &style());
        assert_eq!(surface.bar_count(), 1);

        render_idle_frame(&mut surface, &style());
        assert_eq!(surface.bar_count(), 0);
        assert_eq!(surface.ops().len(), 2);
        assert!(matches!(surface.ops()[1], DrawOp::DashedHLine { .. }));
    }
}
