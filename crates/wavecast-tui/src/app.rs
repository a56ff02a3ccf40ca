//! App: terminal event loop.
//!
//! - Background tasks (keyboard reader, API fetches) post [`AppMessage`]s.
//! - Timer ticks, audio failures and remote requests arrive on their own
//!   channels; everything is handled on this one task, so the controller is
//!   never touched concurrently.
//! - Components return `Vec<Action>`; the app turns actions into controller
//!   calls and controller effects into fetches.

use std::io;
use std::sync::{Arc, RwLock};
use std::time::Duration;

use ratatui::crossterm::{
    event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{
    backend::CrosstermBackend,
    layout::{Constraint, Layout, Rect},
    Frame, Terminal,
};
use tokio::sync::mpsc;
use tracing::{debug, info};

use wavecast_proto::api::NowPlayingClient;
use wavecast_proto::config::Config;
use wavecast_proto::nowplaying::ApiStationEntry;

use crate::{
    action::{Action, ComponentId},
    audio::{AudioEvent, MpvAudioGraph},
    clock::SystemClock,
    component::{Component, ViewState},
    components::{
        header::draw_header, now_playing::NowPlayingPanel, station_list::StationList,
        status_bar::draw_status_bar, waveform_panel::WaveformPanel,
    },
    controller::{Controller, Effect},
    http::{self, HttpState, PlayerStatus, SharedStatus},
    media_session::SharedMediaSession,
    scheduler::{TimerFired, TimerKind, TokioScheduler},
    widgets::toast::ToastManager,
};

type LiveController = Controller<MpvAudioGraph, SharedMediaSession, TokioScheduler, SystemClock>;

enum AppMessage {
    Event(Event),
    Snapshot(Option<Vec<ApiStationEntry>>),
}

/// Receiving ends of every channel feeding the loop.
pub struct Inbox {
    messages: mpsc::Receiver<AppMessage>,
    timers: mpsc::Receiver<TimerFired>,
    audio: mpsc::Receiver<AudioEvent>,
    remote: mpsc::Receiver<Action>,
}

struct PaneAreas {
    header: Rect,
    stations: Rect,
    now_playing: Rect,
    waveform: Rect,
    status: Rect,
}

fn layout(area: Rect) -> PaneAreas {
    let [header, body, status] = Layout::vertical([
        Constraint::Length(1),
        Constraint::Min(6),
        Constraint::Length(1),
    ])
    .areas(area);
    let [stations, right] =
        Layout::horizontal([Constraint::Percentage(30), Constraint::Percentage(70)]).areas(body);
    let [now_playing, waveform] =
        Layout::vertical([Constraint::Length(7), Constraint::Min(4)]).areas(right);
    PaneAreas {
        header,
        stations,
        now_playing,
        waveform,
        status,
    }
}

/// Number keys match the `[n]` hints in the pane titles.
fn pane_for_digit(c: char) -> Option<ComponentId> {
    match c {
        '1' => Some(ComponentId::StationList),
        '2' => Some(ComponentId::NowPlaying),
        '3' => Some(ComponentId::Waveform),
        _ => None,
    }
}

fn next_pane(id: ComponentId) -> ComponentId {
    match id {
        ComponentId::StationList => ComponentId::NowPlaying,
        ComponentId::NowPlaying => ComponentId::Waveform,
        ComponentId::Waveform => ComponentId::StationList,
    }
}

pub struct App {
    controller: LiveController,
    client: Arc<NowPlayingClient>,
    tx: mpsc::Sender<AppMessage>,
    station_list: StationList,
    now_playing: NowPlayingPanel,
    waveform: WaveformPanel,
    focus: ComponentId,
    toasts: ToastManager,
    status: SharedStatus,
    fetch_in_flight: bool,
    should_quit: bool,
}

impl App {
    pub fn new(config: &Config, client: NowPlayingClient) -> (Self, Inbox) {
        let (tx, messages) = mpsc::channel(256);
        let (timer_tx, timers) = mpsc::channel(256);
        let (audio_tx, audio) = mpsc::channel(16);
        let (remote_tx, remote) = mpsc::channel(16);

        let media = SharedMediaSession::new();
        let status: SharedStatus = Arc::new(RwLock::new(PlayerStatus::default()));
        if config.http.enabled {
            http::start_server(
                config.http.bind_address.clone(),
                config.http.port,
                HttpState {
                    status: status.clone(),
                    media: media.clone(),
                    action_tx: remote_tx,
                },
            );
        }

        let graph = MpvAudioGraph::new(config.playback.volume, config.waveform.fft_size, audio_tx);
        let controller = Controller::new(
            config,
            graph,
            media,
            TokioScheduler::new(timer_tx),
            SystemClock,
        );

        let app = Self {
            controller,
            client: Arc::new(client),
            tx,
            station_list: StationList::new(),
            now_playing: NowPlayingPanel,
            waveform: WaveformPanel,
            focus: ComponentId::StationList,
            toasts: ToastManager::new(),
            status,
            fetch_in_flight: false,
            should_quit: false,
        };
        let inbox = Inbox {
            messages,
            timers,
            audio,
            remote,
        };
        (app, inbox)
    }

    pub async fn run(mut self, inbox: Inbox) -> anyhow::Result<()> {
        enable_raw_mode()?;
        let mut stdout = io::stdout();
        execute!(stdout, EnterAlternateScreen)?;
        let mut terminal = Terminal::new(CrosstermBackend::new(stdout))?;
        debug!("app: terminal ready, size={:?}", terminal.size());

        let result = self.event_loop(&mut terminal, inbox).await;

        disable_raw_mode()?;
        execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
        terminal.show_cursor()?;
        result
    }

    async fn event_loop(
        &mut self,
        terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
        inbox: Inbox,
    ) -> anyhow::Result<()> {
        let Inbox {
            mut messages,
            mut timers,
            mut audio,
            mut remote,
        } = inbox;

        let event_tx = self.tx.clone();
        tokio::task::spawn_blocking(move || loop {
            match event::read() {
                Ok(ev) => {
                    if event_tx.blocking_send(AppMessage::Event(ev)).is_err() {
                        break;
                    }
                }
                Err(_) => break,
            }
        });

        let effects = self.controller.start();
        self.run_effects(effects);
        info!("app: started");

        let mut ui_tick = tokio::time::interval(Duration::from_millis(250));
        ui_tick.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

        let mut needs_redraw = true;
        loop {
            if needs_redraw {
                terminal.draw(|f| self.draw(f))?;
                needs_redraw = false;
            }

            tokio::select! {
                Some(msg) = messages.recv() => {
                    needs_redraw = self.handle_message(msg);
                }
                Some(fired) = timers.recv() => {
                    if self.controller.scheduler().accept(fired) {
                        let effects = self.controller.on_timer(fired.kind);
                        self.run_effects(effects);
                        // sampler ticks only feed history; the render tick paints it
                        needs_redraw = fired.kind != TimerKind::Sampler;
                    } else {
                        debug!("app: dropped stale {:?} tick gen={}", fired.kind, fired.generation);
                    }
                }
                Some(AudioEvent::Error(msg)) = audio.recv() => {
                    self.controller.on_audio_error(&msg);
                    needs_redraw = true;
                }
                Some(action) = remote.recv() => {
                    self.dispatch(action);
                    needs_redraw = true;
                }
                _ = ui_tick.tick() => {
                    needs_redraw = self.toasts.tick();
                }
            }

            self.after_update();
            if self.should_quit {
                break;
            }
        }

        if self.controller.state().is_playing() {
            self.controller.stop_playback();
        }
        self.controller.scheduler_mut().stop_all();
        info!("app: exiting");
        Ok(())
    }

    fn handle_message(&mut self, msg: AppMessage) -> bool {
        match msg {
            AppMessage::Event(Event::Key(key)) => {
                self.handle_key(key);
                true
            }
            AppMessage::Event(Event::Resize(..)) => true,
            AppMessage::Event(_) => false,
            AppMessage::Snapshot(snapshot) => {
                self.fetch_in_flight = false;
                let effects = self.controller.apply_snapshot(snapshot);
                self.run_effects(effects);
                true
            }
        }
    }

    fn handle_key(&mut self, key: KeyEvent) {
        if key.kind != KeyEventKind::Press {
            return;
        }
        let action = match key.code {
            KeyCode::Char('q') | KeyCode::Esc => Some(Action::Quit),
            KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => {
                Some(Action::Quit)
            }
            KeyCode::Char(' ') => Some(Action::TogglePlay),
            KeyCode::Char('r') => Some(Action::Refresh),
            KeyCode::Tab => {
                self.focus = next_pane(self.focus);
                None
            }
            KeyCode::Char(c) if pane_for_digit(c).is_some() => {
                self.focus = pane_for_digit(c).unwrap_or(self.focus);
                None
            }
            _ => None,
        };
        if let Some(action) = action {
            self.dispatch(action);
            return;
        }

        let view = ViewState {
            session: self.controller.state(),
            waveform: self.controller.display_list(),
            fetching: self.fetch_in_flight,
        };
        let actions = match self.focus {
            ComponentId::StationList => self.station_list.handle_key(key, &view),
            ComponentId::NowPlaying => self.now_playing.handle_key(key, &view),
            ComponentId::Waveform => self.waveform.handle_key(key, &view),
        };
        for action in actions {
            self.dispatch(action);
        }
    }

    fn dispatch(&mut self, action: Action) {
        debug!("app: action {:?}", action);
        let playing = self.controller.state().is_playing();
        let effects = match action {
            Action::Select(idx) => {
                self.station_list.set_cursor(idx, self.controller.state().stations.len());
                self.controller.select_station(idx)
            }
            Action::TogglePlay => self.controller.toggle_play(),
            Action::Play if !playing => self.controller.toggle_play(),
            Action::Pause if playing => self.controller.toggle_play(),
            Action::Play | Action::Pause => Vec::new(),
            Action::Refresh => {
                self.toasts.info("Refreshing now playing…");
                vec![Effect::FetchNow]
            }
            Action::Quit => {
                self.should_quit = true;
                Vec::new()
            }
        };
        self.run_effects(effects);
    }

    fn run_effects(&mut self, effects: Vec<Effect>) {
        for effect in effects {
            match effect {
                Effect::FetchNow => self.request_fetch(),
            }
        }
    }

    /// At most one fetch in flight; later requests fold into it.
    fn request_fetch(&mut self) {
        if self.fetch_in_flight {
            debug!("app: fetch already in flight, coalescing");
            return;
        }
        self.fetch_in_flight = true;
        let client = self.client.clone();
        let tx = self.tx.clone();
        tokio::spawn(async move {
            let snapshot = client.fetch().await;
            let _ = tx.send(AppMessage::Snapshot(snapshot)).await;
        });
    }

    /// Surface new errors and republish what the HTTP remote sees.
    fn after_update(&mut self) {
        for err in self.controller.take_errors() {
            self.toasts.error(err);
        }
        let status = PlayerStatus::from_session(self.controller.state());
        match self.status.write() {
            Ok(mut guard) => *guard = status,
            Err(poisoned) => *poisoned.into_inner() = status,
        }
    }

    fn draw(&mut self, frame: &mut Frame) {
        let full = frame.area();
        let areas = layout(full);
        self.controller
            .resize_canvas(WaveformPanel::canvas_size(areas.waveform));

        let view = ViewState {
            session: self.controller.state(),
            waveform: self.controller.display_list(),
            fetching: self.fetch_in_flight,
        };
        draw_header(frame, areas.header, &view);
        let panes: [(&mut dyn Component, Rect); 3] = [
            (&mut self.station_list, areas.stations),
            (&mut self.now_playing, areas.now_playing),
            (&mut self.waveform, areas.waveform),
        ];
        for (pane, area) in panes {
            let focused = pane.id() == self.focus;
            pane.draw(frame, area, focused, &view);
        }
        draw_status_bar(frame, areas.status, self.toasts.latest_error());
        self.toasts.draw(frame, full);
    }
}
