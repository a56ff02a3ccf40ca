//! OS-style media session: what is playing and which remote actions are
//! honoured.  The app publishes into a [`SharedMediaSession`] that the HTTP
//! remote reads.

use std::sync::{Arc, RwLock};

use serde::Serialize;
use tracing::debug;

use wavecast_proto::nowplaying::TrackSnapshot;

pub const ARTWORK_SIZES: &str = "512x512";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Artwork {
    pub src: String,
    pub sizes: String,
    #[serde(rename = "type")]
    pub mime_type: String,
}

impl Artwork {
    pub fn new(src: &str) -> Self {
        Self {
            src: src.to_string(),
            sizes: ARTWORK_SIZES.to_string(),
            mime_type: mime_for_url(src).to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MediaMetadata {
    pub title: String,
    pub artist: String,
    /// Station display name.
    pub album: String,
    pub artwork: Vec<Artwork>,
}

impl MediaMetadata {
    pub fn for_track(track: &TrackSnapshot, station: &str) -> Self {
        Self {
            title: track.title.clone(),
            artist: track.artist.clone(),
            album: station.to_string(),
            artwork: track.art_url.as_deref().map(Artwork::new).into_iter().collect(),
        }
    }
}

/// Guess the artwork MIME type from the URL's extension.
pub fn mime_for_url(url: &str) -> &'static str {
    let path = url.split(['?', '#']).next().unwrap_or(url);
    let ext = path
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_ascii_lowercase())
        .unwrap_or_default();
    match ext.as_str() {
        "png" => "image/png",
        "webp" => "image/webp",
        "gif" => "image/gif",
        "svg" => "image/svg+xml",
        _ => "image/jpeg",
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaPlaybackState {
    #[default]
    None,
    Paused,
    Playing,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaAction {
    Play,
    Pause,
    SeekTo,
    SeekForward,
    SeekBackward,
    NextTrack,
    PreviousTrack,
}

impl MediaAction {
    pub const ALL: [MediaAction; 7] = [
        MediaAction::Play,
        MediaAction::Pause,
        MediaAction::SeekTo,
        MediaAction::SeekForward,
        MediaAction::SeekBackward,
        MediaAction::NextTrack,
        MediaAction::PreviousTrack,
    ];

    /// A live stream can start and stop, nothing else.
    pub fn is_supported(self) -> bool {
        matches!(self, MediaAction::Play | MediaAction::Pause)
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.to_ascii_lowercase().as_str() {
            "play" => Some(Self::Play),
            "pause" => Some(Self::Pause),
            "seekto" => Some(Self::SeekTo),
            "seekforward" => Some(Self::SeekForward),
            "seekbackward" => Some(Self::SeekBackward),
            "nexttrack" => Some(Self::NextTrack),
            "previoustrack" => Some(Self::PreviousTrack),
            _ => None,
        }
    }
}

pub trait MediaSession {
    /// `None` clears the session metadata.
    fn set_metadata(&mut self, metadata: Option<MediaMetadata>);
    fn set_playback_state(&mut self, state: MediaPlaybackState);
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct MediaSessionSnapshot {
    pub metadata: Option<MediaMetadata>,
    pub playback_state: MediaPlaybackState,
    pub supported_actions: Vec<MediaAction>,
}

#[derive(Debug, Clone)]
pub struct SharedMediaSession {
    inner: Arc<RwLock<MediaSessionSnapshot>>,
}

impl Default for SharedMediaSession {
    fn default() -> Self {
        Self::new()
    }
}

impl SharedMediaSession {
    pub fn new() -> Self {
        let snapshot = MediaSessionSnapshot {
            supported_actions: MediaAction::ALL
                .into_iter()
                .filter(|a| a.is_supported())
                .collect(),
            ..Default::default()
        };
        Self {
            inner: Arc::new(RwLock::new(snapshot)),
        }
    }

    pub fn snapshot(&self) -> MediaSessionSnapshot {
        self.inner
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    fn update(&self, f: impl FnOnce(&mut MediaSessionSnapshot)) {
        let mut guard = self
            .inner
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        f(&mut guard);
    }
}

impl MediaSession for SharedMediaSession {
    fn set_metadata(&mut self, metadata: Option<MediaMetadata>) {
        match &metadata {
            Some(m) => debug!("[media] metadata: {} - {} ({})", m.artist, m.title, m.album),
            None => debug!("[media] metadata cleared"),
        }
        self.update(|s| s.metadata = metadata);
    }

    fn set_playback_state(&mut self, state: MediaPlaybackState) {
        debug!("[media] playback state: {:?}", state);
        self.update(|s| s.playback_state = state);
    }
}
