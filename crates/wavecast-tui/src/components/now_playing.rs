//! Now-playing pane: track text plus the progress bar.

use ratatui::{
    layout::{Constraint, Layout, Rect},
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::Paragraph,
    Frame,
};

use crate::{
    action::ComponentId,
    component::{Component, ViewState},
    theme::{style_muted, style_secondary, C_PRIMARY, C_SECONDARY},
    widgets::{pane::pane_chrome, progress_bar::draw_progress},
};

#[derive(Default)]
pub struct NowPlayingPanel;

fn labelled<'a>(label: &'a str, value: &'a str) -> Line<'a> {
    Line::from(vec![
        Span::styled(format!("{:<8}", label), style_muted()),
        Span::styled(value, Style::default().fg(C_SECONDARY)),
    ])
}

impl Component for NowPlayingPanel {
    fn id(&self) -> ComponentId {
        ComponentId::NowPlaying
    }

    fn draw(&mut self, frame: &mut Frame, area: Rect, focused: bool, view: &ViewState) {
        let block = pane_chrome("now playing", Some('2'), focused, None);
        let inner = block.inner(area);
        frame.render_widget(block, area);
        if inner.height == 0 {
            return;
        }

        let np = &view.session.now_playing;
        let [text_area, progress_area] =
            Layout::vertical([Constraint::Min(1), Constraint::Length(1)]).areas(inner);

        let mut lines = vec![Line::from(Span::styled(
            np.title.as_str(),
            Style::default().fg(C_PRIMARY).add_modifier(Modifier::BOLD),
        ))];
        if !np.is_placeholder() {
            lines.push(labelled("artist", &np.artist));
            lines.push(labelled("station", &np.station));
            if let Some(art) = np.art_url.as_deref() {
                lines.push(labelled("artwork", art));
            }
        } else if let Some(station) = view.session.selected_station() {
            lines.push(Line::from(Span::styled(
                station.display_name.as_str(),
                style_secondary(),
            )));
        }
        frame.render_widget(Paragraph::new(lines), text_area);
        draw_progress(frame, progress_area, &view.session.progress);
    }
}
