//! Smooth Unicode progress bar: `m:ss ████▌     m:ss  42%`.

use ratatui::{
    layout::Rect,
    style::Style,
    text::{Line, Span},
    widgets::Paragraph,
    Frame,
};

use crate::progress::ProgressView;
use crate::theme::{C_MUTED, C_PLAYING, C_SECONDARY};

const BLOCKS: [char; 9] = [' ', '▏', '▎', '▍', '▌', '▋', '▊', '▉', '█'];

/// Bar of `width` cells filled to `ratio` (0.0..=1.0) in eighth-cell steps.
pub fn bar_string(ratio: f64, width: usize) -> String {
    let eighths = (ratio.clamp(0.0, 1.0) * width as f64 * 8.0) as usize;
    let full_blocks = (eighths / 8).min(width);
    let partial = eighths % 8;

    let mut bar = String::with_capacity(width * 3);
    bar.extend(std::iter::repeat('█').take(full_blocks));
    if full_blocks < width {
        bar.push(BLOCKS[partial]);
        bar.extend(std::iter::repeat(' ').take(width - full_blocks - 1));
    }
    bar
}

pub fn draw_progress(frame: &mut Frame, area: Rect, view: &ProgressView) {
    if area.width < 4 || area.height == 0 {
        return;
    }

    let left_label = format!("{} ", view.elapsed_label);
    let right_label = format!(" {}  {:>3.0}%", view.duration_label, view.percent);
    let label_w = (left_label.chars().count() + right_label.chars().count()) as u16;
    let bar_w = area.width.saturating_sub(label_w).max(4) as usize;

    let spans = vec![
        Span::styled(left_label, Style::default().fg(C_SECONDARY)),
        Span::styled(bar_string(view.ratio(), bar_w), Style::default().fg(C_PLAYING)),
        Span::styled(right_label, Style::default().fg(C_MUTED)),
    ];
    frame.render_widget(Paragraph::new(Line::from(spans)), area);
}
