//! The audio graph: one audible output plus an analyser the waveform reads.
//!
//! The controller drives it synchronously through [`AudioGraph`].
//! [`MpvAudioGraph`] forwards playback commands to a background task that
//! owns mpv, and runs the analyser as an ffmpeg tap on the same URL.

pub mod mpv;
pub mod tap;

use std::path::PathBuf;

use thiserror::Error;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use self::mpv::{MpvDriver, MpvEvent, MpvHandle};
use self::tap::AnalyserTap;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AudioError {
    #[error("audio output unavailable: {0}")]
    Unavailable(String),
    #[error("could not resume audio analyser: {0}")]
    ResumeFailed(String),
    #[error("playback rejected: {0}")]
    PlayRejected(String),
}

pub trait AudioGraph {
    /// Create the graph on first use.  Later calls are no-ops.
    fn ensure_graph(&mut self) -> Result<(), AudioError>;
    fn has_graph(&self) -> bool;
    fn set_source(&mut self, url: &str);
    fn is_suspended(&self) -> bool;
    fn resume(&mut self) -> Result<(), AudioError>;
    fn play(&mut self) -> Result<(), AudioError>;
    fn pause(&mut self);
    /// Fill `out` with the latest unsigned 8-bit time-domain samples.
    fn read_time_domain(&self, out: &mut [u8]) -> bool;
}

/// Asynchronous failure reported by the playback task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AudioEvent {
    Error(String),
}

#[derive(Debug)]
enum GraphCommand {
    Load(String),
    Stop,
}

pub struct MpvAudioGraph {
    volume: f32,
    fft_size: usize,
    events: mpsc::Sender<AudioEvent>,
    commands: Option<mpsc::UnboundedSender<GraphCommand>>,
    tap: Option<AnalyserTap>,
    source: Option<String>,
}

impl MpvAudioGraph {
    pub fn new(volume: f32, fft_size: usize, events: mpsc::Sender<AudioEvent>) -> Self {
        Self {
            volume,
            fft_size,
            events,
            commands: None,
            tap: None,
            source: None,
        }
    }

    /// A graph with a tap but no playback task.
    #[cfg(test)]
    fn with_tap(tap: AnalyserTap, events: mpsc::Sender<AudioEvent>) -> Self {
        Self {
            tap: Some(tap),
            ..Self::new(100.0, 1024, events)
        }
    }

    fn send(&self, cmd: GraphCommand) -> bool {
        match &self.commands {
            Some(tx) => tx.send(cmd).is_ok(),
            None => false,
        }
    }
}

impl AudioGraph for MpvAudioGraph {
    fn ensure_graph(&mut self) -> Result<(), AudioError> {
        if self.commands.is_some() {
            return Ok(());
        }
        let runtime = tokio::runtime::Handle::try_current()
            .map_err(|e| AudioError::Unavailable(e.to_string()))?;
        let mpv = wavecast_proto::platform::find_mpv_binary()
            .ok_or_else(|| AudioError::Unavailable("mpv binary not found".into()))?;
        let ffmpeg = wavecast_proto::platform::find_ffmpeg_binary()
            .ok_or_else(|| AudioError::Unavailable("ffmpeg binary not found".into()))?;
        info!("[audio] graph: mpv={:?} ffmpeg={:?}", mpv, ffmpeg);

        let (tx, rx) = mpsc::unbounded_channel();
        runtime.spawn(run_graph_task(mpv, self.volume, rx, self.events.clone()));
        self.commands = Some(tx);
        self.tap = Some(AnalyserTap::new(ffmpeg, self.fft_size));
        Ok(())
    }

    fn has_graph(&self) -> bool {
        self.commands.is_some()
    }

    fn set_source(&mut self, url: &str) {
        if self.source.as_deref() == Some(url) {
            return;
        }
        debug!("[audio] source -> {}", url);
        self.source = Some(url.to_string());
        // a tap decoding the old URL would feed the wrong waveform
        if let Some(tap) = self.tap.as_mut() {
            if tap.url() != Some(url) {
                tap.stop();
            }
        }
    }

    fn is_suspended(&self) -> bool {
        self.tap.as_ref().map(|t| !t.is_running()).unwrap_or(true)
    }

    fn resume(&mut self) -> Result<(), AudioError> {
        let url = self
            .source
            .clone()
            .ok_or_else(|| AudioError::ResumeFailed("no source".into()))?;
        let tap = self
            .tap
            .as_mut()
            .ok_or_else(|| AudioError::ResumeFailed("graph not created".into()))?;
        tap.start(&url)
            .map_err(|e| AudioError::ResumeFailed(e.to_string()))
    }

    fn play(&mut self) -> Result<(), AudioError> {
        let url = self
            .source
            .clone()
            .ok_or_else(|| AudioError::PlayRejected("no source".into()))?;
        if !self.send(GraphCommand::Load(url)) {
            return Err(AudioError::PlayRejected("playback task not running".into()));
        }
        Ok(())
    }

    fn pause(&mut self) {
        self.send(GraphCommand::Stop);
        if let Some(tap) = self.tap.as_mut() {
            tap.stop();
        }
    }

    fn read_time_domain(&self, out: &mut [u8]) -> bool {
        self.tap
            .as_ref()
            .map(|t| t.read_latest(out))
            .unwrap_or(false)
    }
}

/// Owns mpv.  Spawns it on the first `Load`, respawns it if it died, and
/// kills it when the graph is dropped.
async fn run_graph_task(
    binary: PathBuf,
    volume: f32,
    mut commands: mpsc::UnboundedReceiver<GraphCommand>,
    events: mpsc::Sender<AudioEvent>,
) {
    let mut driver = MpvDriver::new(binary, volume);
    let mut handle: Option<MpvHandle> = None;
    let (mpv_tx, mut mpv_rx) = mpsc::channel::<MpvEvent>(64);

    loop {
        tokio::select! {
            cmd = commands.recv() => {
                let Some(cmd) = cmd else { break };
                if let Err(e) = apply_command(&mut driver, &mut handle, &mpv_tx, cmd).await {
                    warn!("[audio] mpv: {}", e);
                    let _ = events.send(AudioEvent::Error(e.to_string())).await;
                }
            }
            Some(event) = mpv_rx.recv() => {
                if let Some(reason) = event.load_error() {
                    warn!("[audio] mpv: stream failed: {}", reason);
                    let _ = events.send(AudioEvent::Error(reason)).await;
                }
            }
        }
    }

    debug!("[audio] graph task exiting");
    driver.kill().await;
}

async fn apply_command(
    driver: &mut MpvDriver,
    handle: &mut Option<MpvHandle>,
    mpv_tx: &mpsc::Sender<MpvEvent>,
    cmd: GraphCommand,
) -> anyhow::Result<()> {
    match cmd {
        GraphCommand::Load(url) => {
            if handle.is_none() || !driver.process_alive() {
                *handle = Some(driver.spawn_and_connect(mpv_tx.clone()).await?);
            }
            let h = handle
                .as_ref()
                .ok_or_else(|| anyhow::anyhow!("mpv not connected"))?;
            if let Err(e) = h.load_stream(&url, driver.volume()).await {
                *handle = None;
                return Err(e);
            }
            info!("[audio] playing {}", url);
        }
        GraphCommand::Stop => {
            if let Some(h) = handle.as_ref() {
                h.stop().await?;
                info!("[audio] stopped");
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    // Tap tasks are only spawned here; on the current-thread test runtime
    // they cannot run (and exit) until the test awaits.
    fn graph() -> MpvAudioGraph {
        let (events, _rx) = mpsc::channel(1);
        let tap = AnalyserTap::new(PathBuf::from("/nonexistent/ffmpeg-for-tests"), 16);
        MpvAudioGraph::with_tap(tap, events)
    }

    fn tap_url(graph: &MpvAudioGraph) -> Option<&str> {
        graph.tap.as_ref().and_then(|t| t.url())
    }

    #[tokio::test]
    async fn test_resume_without_source_fails() {
        let mut g = graph();
        assert!(g.is_suspended());
        assert!(matches!(g.resume(), Err(AudioError::ResumeFailed(_))));
        assert!(g.is_suspended());
    }

    #[tokio::test]
    async fn test_resume_starts_tap_for_current_source() {
        let mut g = graph();
        g.set_source("https://radio.example/a.mp3");
        assert!(g.is_suspended());

        g.resume().expect("resume");
        assert!(!g.is_suspended());
        assert_eq!(tap_url(&g), Some("https://radio.example/a.mp3"));

        g.pause();
        assert!(g.is_suspended());
    }

    #[tokio::test]
    async fn test_new_source_stops_tap_on_old_url() {
        let mut g = graph();
        g.set_source("https://radio.example/a.mp3");
        g.resume().expect("resume");

        g.set_source("https://radio.example/a.mp3");
        assert!(!g.is_suspended(), "same source keeps the tap");

        g.set_source("https://radio.example/b.mp3");
        assert!(g.is_suspended(), "tap on the old url must stop");

        g.resume().expect("resume");
        assert!(!g.is_suspended());
        assert_eq!(tap_url(&g), Some("https://radio.example/b.mp3"));
    }

    #[tokio::test]
    async fn test_play_without_graph_is_rejected() {
        let mut g = graph();
        g.set_source("https://radio.example/a.mp3");
        assert!(!g.has_graph());
        assert!(matches!(g.play(), Err(AudioError::PlayRejected(_))));
    }
}
