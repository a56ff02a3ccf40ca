//! StationList component: left pane, one row per station.

use ratatui::crossterm::event::{KeyCode, KeyEvent, KeyEventKind};
use ratatui::{
    layout::Rect,
    style::Style,
    text::{Line, Span},
    widgets::{List, ListItem, ListState, Paragraph},
    Frame,
};

use unicode_width::{UnicodeWidthChar, UnicodeWidthStr};

use crate::{
    action::{Action, ComponentId},
    component::{Component, ViewState},
    theme::{style_default, style_muted, style_selected, C_PLAYING, C_READY},
    widgets::pane::pane_chrome,
};

#[derive(Default)]
pub struct StationList {
    cursor: usize,
    list_state: ListState,
}

impl StationList {
    pub fn new() -> Self {
        Self::default()
    }

    /// Keep the cursor inside the list after a refresh.
    pub fn clamp(&mut self, len: usize) {
        self.cursor = self.cursor.min(len.saturating_sub(1));
    }

    pub fn set_cursor(&mut self, idx: usize, len: usize) {
        self.cursor = idx;
        self.clamp(len);
    }

    pub fn move_cursor(&mut self, delta: isize, len: usize) {
        if len == 0 {
            self.cursor = 0;
            return;
        }
        let next = (self.cursor as isize + delta).clamp(0, len as isize - 1);
        self.cursor = next as usize;
    }
}

/// Cut `name` to `width` terminal columns, ending in `…` when shortened.
fn fit_width(name: &str, width: usize) -> String {
    if name.width() <= width {
        return name.to_string();
    }
    let mut out = String::new();
    let mut used = 0;
    for ch in name.chars() {
        let w = ch.width().unwrap_or(0);
        if used + w + 1 > width {
            break;
        }
        out.push(ch);
        used += w;
    }
    if width > 0 {
        out.push('…');
    }
    out
}

impl Component for StationList {
    fn id(&self) -> ComponentId {
        ComponentId::StationList
    }

    fn handle_key(&mut self, key: KeyEvent, view: &ViewState) -> Vec<Action> {
        if key.kind != KeyEventKind::Press {
            return Vec::new();
        }
        let len = view.session.stations.len();
        match key.code {
            KeyCode::Up | KeyCode::Char('k') => self.move_cursor(-1, len),
            KeyCode::Down | KeyCode::Char('j') => self.move_cursor(1, len),
            KeyCode::Home | KeyCode::Char('g') => self.cursor = 0,
            KeyCode::End | KeyCode::Char('G') => self.cursor = len.saturating_sub(1),
            KeyCode::Enter if len > 0 => return vec![Action::Select(self.cursor)],
            _ => {}
        }
        Vec::new()
    }

    fn draw(&mut self, frame: &mut Frame, area: Rect, focused: bool, view: &ViewState) {
        let block = pane_chrome("stations", Some('1'), focused, None);
        let inner = block.inner(area);
        frame.render_widget(block, area);

        let session = view.session;
        if session.stations.is_empty() {
            let msg = if view.fetching {
                "  loading stations…"
            } else {
                "  no stations available"
            };
            frame.render_widget(Paragraph::new(Span::styled(msg, style_muted())), inner);
            return;
        }
        self.clamp(session.stations.len());
        let name_width = usize::from(inner.width).saturating_sub(2);

        let items: Vec<ListItem> = session
            .stations
            .iter()
            .enumerate()
            .map(|(i, station)| {
                let marker = match (session.selected == Some(i), session.is_playing()) {
                    (true, true) => Span::styled("▶ ", Style::default().fg(C_PLAYING)),
                    (true, false) => Span::styled("• ", Style::default().fg(C_READY)),
                    _ => Span::raw("  "),
                };
                let style = if i == self.cursor {
                    style_selected()
                } else {
                    style_default()
                };
                ListItem::new(Line::from(vec![
                    marker,
                    Span::styled(fit_width(&station.display_name, name_width), style),
                ]))
                .style(if i == self.cursor { style } else { Style::default() })
            })
            .collect();

        self.list_state.select(Some(self.cursor));
        frame.render_stateful_widget(List::new(items), inner, &mut self.list_state);
    }
}
