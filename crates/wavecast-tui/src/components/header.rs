//! One-row top bar: app name, selected station, playback phase.

use ratatui::{
    layout::Rect,
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::Paragraph,
    Frame,
};

use crate::controller::PlaybackPhase;
use crate::component::ViewState;
use crate::theme::{C_ACCENT, C_MUTED, C_PLAYING, C_PRIMARY, C_READY, C_SEPARATOR};

fn phase_color(phase: PlaybackPhase) -> ratatui::style::Color {
    match phase {
        PlaybackPhase::Playing => C_PLAYING,
        PlaybackPhase::Selected => C_READY,
        PlaybackPhase::Stopped => C_ACCENT,
        PlaybackPhase::Idle => C_MUTED,
    }
}

pub fn draw_header(frame: &mut Frame, area: Rect, view: &ViewState) {
    let session = view.session;
    let station = session
        .selected_station()
        .map(|s| s.display_name.as_str())
        .unwrap_or("no station");

    let mut spans = vec![
        Span::styled(
            " wavecast ",
            Style::default().fg(C_ACCENT).add_modifier(Modifier::BOLD),
        ),
        Span::styled("│ ", Style::default().fg(C_SEPARATOR)),
        Span::styled(station, Style::default().fg(C_PRIMARY)),
        Span::raw("  "),
        Span::styled(
            format!("[{}]", session.phase.label()),
            Style::default()
                .fg(phase_color(session.phase))
                .add_modifier(Modifier::BOLD),
        ),
    ];
    if view.fetching {
        spans.push(Span::styled("  ⟳", Style::default().fg(C_MUTED)));
    }
    frame.render_widget(Paragraph::new(Line::from(spans)), area);
}
