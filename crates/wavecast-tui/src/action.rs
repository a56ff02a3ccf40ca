//! Action enum: everything a key press or remote request can ask for.

/// Focusable panes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ComponentId {
    StationList,
    NowPlaying,
    Waveform,
}

/// Components produce actions; the app dispatches them to the controller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    /// Make station `idx` the selected one (restarts playback if it was on).
    Select(usize),
    TogglePlay,
    Play,
    Pause,
    /// Fetch now-playing data immediately.
    Refresh,
    Quit,
}
