//! Component trait: the interface every pane implements.
//!
//! - Components own their local UI state (cursor, scroll) and draw themselves.
//! - Session data comes in read-only through [`ViewState`].
//! - Key handling returns `Vec<Action>`; components never mutate the session.

use ratatui::crossterm::event::KeyEvent;
use ratatui::{layout::Rect, Frame};

use crate::action::{Action, ComponentId};
use crate::controller::SessionState;
use crate::waveform::renderer::DisplayList;

/// Read-only snapshot handed to every component for one frame.
pub struct ViewState<'a> {
    pub session: &'a SessionState,
    pub waveform: &'a DisplayList,
    pub fetching: bool,
}

pub trait Component {
    fn id(&self) -> ComponentId;

    fn handle_key(&mut self, _key: KeyEvent, _view: &ViewState) -> Vec<Action> {
        Vec::new()
    }

    fn draw(&mut self, frame: &mut Frame, area: Rect, focused: bool, view: &ViewState);
}
