//! Now-playing API payload and the domain types derived from it.
//!
//! The API returns one object per station:
//!
//! ```text
//! { station:      { name, shortcode, listen_url, mounts: [{ url, is_default }] },
//!   now_playing:  { played_at, duration, song: { title, artist, art } },
//!   song_history: [ same shape, most recent first ],
//!   playing_next: same shape | null }
//! ```
//!
//! Wire types default every optional field so that one odd station does not
//! reject the whole payload; the domain conversions decide what is usable.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use tracing::debug;

// ── Wire types ────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ApiStationEntry {
    #[serde(default)]
    pub station: Option<ApiStation>,
    #[serde(default)]
    pub now_playing: Option<ApiSongEntry>,
    #[serde(default)]
    pub song_history: Vec<ApiSongEntry>,
    #[serde(default)]
    pub playing_next: Option<ApiSongEntry>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ApiStation {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub shortcode: String,
    #[serde(default)]
    pub listen_url: Option<String>,
    #[serde(default)]
    pub mounts: Vec<ApiMount>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ApiMount {
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub is_default: bool,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ApiSongEntry {
    #[serde(default)]
    pub played_at: f64,
    #[serde(default)]
    pub duration: f64,
    #[serde(default)]
    pub song: ApiSong,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ApiSong {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub artist: String,
    #[serde(default)]
    pub art: Option<String>,
}

/// Parse a raw payload.  The top level must be an array; entries that do not
/// fit the station shape are skipped individually.
pub fn parse_payload(value: serde_json::Value) -> anyhow::Result<Vec<ApiStationEntry>> {
    let serde_json::Value::Array(items) = value else {
        anyhow::bail!("now-playing payload is not an array");
    };
    let mut entries = Vec::with_capacity(items.len());
    for (idx, item) in items.into_iter().enumerate() {
        match serde_json::from_value::<ApiStationEntry>(item) {
            Ok(entry) => entries.push(entry),
            Err(e) => debug!("[api] skipping malformed station entry #{}: {}", idx, e),
        }
    }
    Ok(entries)
}

// ── Domain types ──────────────────────────────────────────────────────────────

/// A selectable station.  Rebuilt wholesale from every successful fetch.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StationDescriptor {
    pub display_name: String,
    pub original_name: String,
    /// Unique key across the payload.
    pub shortcode: String,
    pub stream_url: String,
}

/// One track as reported by the server.  Times are epoch seconds.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrackSnapshot {
    pub played_at: f64,
    pub duration: f64,
    pub title: String,
    pub artist: String,
    pub art_url: Option<String>,
}

impl From<&ApiSongEntry> for TrackSnapshot {
    fn from(entry: &ApiSongEntry) -> Self {
        Self {
            played_at: entry.played_at,
            duration: entry.duration,
            title: entry.song.title.trim().to_string(),
            artist: entry.song.artist.trim().to_string(),
            art_url: entry
                .song
                .art
                .as_deref()
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string),
        }
    }
}

/// The slice of the payload that belongs to one station.
#[derive(Debug, Clone, PartialEq)]
pub struct NowPlayingContext {
    pub station_name: String,
    pub shortcode: String,
    pub now_playing: TrackSnapshot,
    /// Most recent first.
    pub song_history: Vec<TrackSnapshot>,
    pub playing_next: Option<TrackSnapshot>,
}

impl NowPlayingContext {
    /// `None` unless both `station` and `now_playing` are present.
    pub fn from_entry(entry: &ApiStationEntry, names: &DisplayNames) -> Option<Self> {
        let station = entry.station.as_ref()?;
        let now_playing = entry.now_playing.as_ref()?;
        Some(Self {
            station_name: names.display(&station.name),
            shortcode: station.shortcode.clone(),
            now_playing: TrackSnapshot::from(now_playing),
            song_history: entry.song_history.iter().map(TrackSnapshot::from).collect(),
            playing_next: entry.playing_next.as_ref().map(TrackSnapshot::from),
        })
    }
}

// ── Station list helpers ──────────────────────────────────────────────────────

/// `listen_url` when set, otherwise the default mount.
pub fn resolve_stream_url(station: &ApiStation) -> Option<String> {
    if let Some(url) = station.listen_url.as_deref().map(str::trim) {
        if !url.is_empty() {
            return Some(url.to_string());
        }
    }
    station
        .mounts
        .iter()
        .find(|m| m.is_default && !m.url.trim().is_empty())
        .map(|m| m.url.trim().to_string())
}

/// Build the selectable station list, keeping payload order.  Stations
/// without a shortcode or a resolvable stream are left out.
pub fn stations_from_payload(
    entries: &[ApiStationEntry],
    names: &DisplayNames,
) -> Vec<StationDescriptor> {
    let mut out: Vec<StationDescriptor> = Vec::with_capacity(entries.len());
    for station in entries.iter().filter_map(|e| e.station.as_ref()) {
        if station.shortcode.is_empty() || out.iter().any(|s| s.shortcode == station.shortcode) {
            continue;
        }
        let Some(stream_url) = resolve_stream_url(station) else {
            debug!("[api] station {:?} has no stream url, skipping", station.shortcode);
            continue;
        };
        out.push(StationDescriptor {
            display_name: names.display(&station.name),
            original_name: station.name.clone(),
            shortcode: station.shortcode.clone(),
            stream_url,
        });
    }
    out
}

/// Find the context for `shortcode` in a fetched payload.
pub fn context_for(
    entries: &[ApiStationEntry],
    shortcode: &str,
    names: &DisplayNames,
) -> Option<NowPlayingContext> {
    entries
        .iter()
        .find(|e| e.station.as_ref().map(|s| s.shortcode.as_str()) == Some(shortcode))
        .and_then(|e| NowPlayingContext::from_entry(e, names))
}

// ── Display names ─────────────────────────────────────────────────────────────

/// Known station names and how they are shown.  `[display_names]` in the
/// config adds to and overrides these.
pub const BUILTIN_DISPLAY_NAMES: &[(&str, &str)] = &[
    ("Radio Main", "Main Stage"),
    ("Radio Night", "Night Shift"),
    ("Radio Jazz", "Jazz Lounge"),
    ("Radio Classic", "Classical"),
    ("Radio Talk", "Talk & News"),
];

/// Name → display-name table.  Unknown names pass through unchanged.
#[derive(Debug, Clone, Default)]
pub struct DisplayNames {
    table: HashMap<String, String>,
}

impl DisplayNames {
    /// Built-in entries, then `overrides` on top.
    pub fn new(overrides: &BTreeMap<String, String>) -> Self {
        let mut table: HashMap<String, String> = BUILTIN_DISPLAY_NAMES
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        table.extend(overrides.iter().map(|(k, v)| (k.clone(), v.clone())));
        Self { table }
    }

    pub fn display(&self, name: &str) -> String {
        self.table
            .get(name)
            .cloned()
            .unwrap_or_else(|| name.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn names() -> DisplayNames {
        let mut table = BTreeMap::new();
        table.insert("Radio Main".to_string(), "Main Stage".to_string());
        DisplayNames::new(&table)
    }

    fn sample_payload() -> serde_json::Value {
        json!([
            {
                "station": {
                    "name": "Radio Main",
                    "shortcode": "main",
                    "listen_url": "https://radio.example/listen/main/radio.mp3",
                    "mounts": []
                },
                "now_playing": {
                    "played_at": 1700000000,
                    "duration": 180,
                    "song": { "title": "Song A", "artist": "Artist A", "art": "https://radio.example/a.jpg" }
                },
                "song_history": [
                    { "played_at": 1699999800, "duration": 200, "song": { "title": "Song Z", "artist": "Artist Z" } }
                ],
                "playing_next": null
            },
            {
                "station": {
                    "name": "Night Shift",
                    "shortcode": "night",
                    "listen_url": "",
                    "mounts": [
                        { "url": "https://radio.example/night/low.aac", "is_default": false },
                        { "url": "https://radio.example/night/high.mp3", "is_default": true }
                    ]
                },
                "now_playing": {
                    "played_at": 1700000100,
                    "duration": 240,
                    "song": { "title": "Song B", "artist": "Artist B", "art": "" }
                }
            },
            {
                "station": { "name": "Silent", "shortcode": "silent", "mounts": [] }
            },
            "not a station"
        ])
    }

    #[test]
    fn test_parse_payload_skips_malformed_entries() {
        let entries = parse_payload(sample_payload()).unwrap();
        assert_eq!(entries.len(), 3);
        assert!(parse_payload(json!({"error": "nope"})).is_err());
    }

    #[test]
    fn test_resolve_stream_url_prefers_listen_url() {
        let entries = parse_payload(sample_payload()).unwrap();
        let main = entries[0].station.as_ref().unwrap();
        assert_eq!(
            resolve_stream_url(main).as_deref(),
            Some("https://radio.example/listen/main/radio.mp3")
        );
        let night = entries[1].station.as_ref().unwrap();
        assert_eq!(
            resolve_stream_url(night).as_deref(),
            Some("https://radio.example/night/high.mp3")
        );
        let silent = entries[2].station.as_ref().unwrap();
        assert_eq!(resolve_stream_url(silent), None);
    }

    #[test]
    fn test_stations_from_payload_excludes_unresolvable() {
        let entries = parse_payload(sample_payload()).unwrap();
        let stations = stations_from_payload(&entries, &names());
        let codes: Vec<&str> = stations.iter().map(|s| s.shortcode.as_str()).collect();
        assert_eq!(codes, vec!["main", "night"]);
        assert_eq!(stations[0].display_name, "Main Stage");
        assert_eq!(stations[0].original_name, "Radio Main");
        assert_eq!(stations[1].display_name, "Night Shift");
    }

    #[test]
    fn test_context_for_requires_now_playing() {
        let entries = parse_payload(sample_payload()).unwrap();
        let ctx = context_for(&entries, "main", &names()).unwrap();
        assert_eq!(ctx.station_name, "Main Stage");
        assert_eq!(ctx.now_playing.title, "Song A");
        assert_eq!(ctx.now_playing.duration, 180.0);
        assert_eq!(ctx.song_history.len(), 1);
        assert!(ctx.playing_next.is_none());

        let night = context_for(&entries, "night", &names()).unwrap();
        assert!(night.song_history.is_empty());
        assert_eq!(night.now_playing.art_url, None);

        assert!(context_for(&entries, "silent", &names()).is_none());
        assert!(context_for(&entries, "missing", &names()).is_none());
    }

    #[test]
    fn test_display_names_pass_through_unknown() {
        let n = names();
        assert_eq!(n.display("Radio Main"), "Main Stage");
        assert_eq!(n.display("Somewhere Else"), "Somewhere Else");
    }

    #[test]
    fn test_display_names_builtin_then_config_override() {
        let defaults = DisplayNames::new(&BTreeMap::new());
        assert_eq!(defaults.display("Radio Jazz"), "Jazz Lounge");
        assert_eq!(defaults.display("Radio Pirate"), "Radio Pirate");

        let mut overrides = BTreeMap::new();
        overrides.insert("Radio Jazz".to_string(), "Jazz".to_string());
        overrides.insert("Radio Pirate".to_string(), "Pirate FM".to_string());
        let merged = DisplayNames::new(&overrides);
        assert_eq!(merged.display("Radio Jazz"), "Jazz");
        assert_eq!(merged.display("Radio Pirate"), "Pirate FM");
        assert_eq!(merged.display("Radio Night"), "Night Shift");
    }
}
