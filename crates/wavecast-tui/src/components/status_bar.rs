//! Bottom line: key hints, or the current inline error.

use ratatui::{
    layout::Rect,
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::Paragraph,
    Frame,
};

use crate::theme::{C_MUTED, C_TOAST_ERROR};

pub const KEY_HINTS: &str = " ↑↓/jk move  Enter select  Space play/stop  r refresh  1-3/Tab pane  q quit";

pub fn draw_status_bar(frame: &mut Frame, area: Rect, error: Option<&str>) {
    let line = match error {
        Some(msg) => Line::from(vec![
            Span::styled(
                " ✗ ",
                Style::default()
                    .fg(C_TOAST_ERROR)
                    .add_modifier(Modifier::BOLD),
            ),
            Span::styled(msg, Style::default().fg(C_TOAST_ERROR)),
        ]),
        None => Line::from(Span::styled(KEY_HINTS, Style::default().fg(C_MUTED))),
    };
    frame.render_widget(Paragraph::new(line), area);
}
