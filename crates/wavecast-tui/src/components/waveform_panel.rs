//! Waveform pane: replays the controller's display list onto a braille
//! canvas.  One canvas unit is one braille dot; y is flipped so the display
//! list keeps a top-left origin.

use ratatui::{
    layout::Rect,
    symbols::Marker,
    widgets::canvas::{Canvas, Context, Line as CanvasLine},
    widgets::Block,
    Frame,
};

use crate::{
    action::ComponentId,
    component::{Component, ViewState},
    theme::{C_BG, C_PLAYING},
    waveform::renderer::{DrawOp, RenderSurface},
    waveform::CanvasSize,
    widgets::pane::{pane_chrome, Badge},
};

#[derive(Default)]
pub struct WaveformPanel;

impl WaveformPanel {
    /// Braille resolution of the pane's interior.
    pub fn canvas_size(area: Rect) -> CanvasSize {
        let inner = Block::bordered().inner(area);
        CanvasSize::new(f64::from(inner.width) * 2.0, f64::from(inner.height) * 4.0)
    }
}

fn paint(ctx: &mut Context, ops: &[DrawOp], size: CanvasSize) {
    let flip = |y: f64| size.height - y;
    for op in ops {
        match *op {
            DrawOp::Clear(_) => {}
            DrawOp::Rect {
                x,
                y,
                width,
                height,
                color,
            } => {
                // one vertical line per dot column
                let mut cx = x.floor();
                while cx < x + width {
                    ctx.draw(&CanvasLine::new(
                        cx + 0.5,
                        flip(y),
                        cx + 0.5,
                        flip(y + height),
                        color,
                    ));
                    cx += 1.0;
                }
            }
            DrawOp::DashedHLine {
                y,
                dash,
                gap,
                color,
            } => {
                let step = (dash + gap).max(1.0);
                let mut x = 0.0;
                while x < size.width {
                    let end = (x + dash).min(size.width);
                    ctx.draw(&CanvasLine::new(x, flip(y), end, flip(y), color));
                    x += step;
                }
            }
        }
    }
}

impl Component for WaveformPanel {
    fn id(&self) -> ComponentId {
        ComponentId::Waveform
    }

    fn draw(&mut self, frame: &mut Frame, area: Rect, focused: bool, view: &ViewState) {
        let badge = view.session.is_playing().then_some(Badge {
            text: "live",
            color: C_PLAYING,
        });
        let block = pane_chrome("waveform", Some('3'), focused, badge);
        let size = view.waveform.size();
        let background = view.waveform.background().unwrap_or(C_BG);
        let ops = view.waveform.ops();

        let canvas = Canvas::default()
            .block(block)
            .marker(Marker::Braille)
            .background_color(background)
            .x_bounds([0.0, size.width.max(1.0)])
            .y_bounds([0.0, size.height.max(1.0)])
            .paint(|ctx| paint(ctx, ops, size));
        frame.render_widget(canvas, area);
    }
}
