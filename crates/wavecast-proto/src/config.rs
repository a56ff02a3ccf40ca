use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;

use super::platform;

/// Environment override for `api.url`, handy for pointing at a staging server.
pub const API_URL_ENV: &str = "WAVECAST_API_URL";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub api: ApiConfig,
    #[serde(default)]
    pub playback: PlaybackConfig,
    #[serde(default)]
    pub waveform: WaveformConfig,
    #[serde(default)]
    pub http: HttpConfig,
    /// Station name → display name.  Unknown names are shown as-is.
    #[serde(default)]
    pub display_names: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    #[serde(default = "default_api_url")]
    pub url: String,
    #[serde(default = "default_poll_interval_secs")]
    pub poll_interval_secs: u64,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlaybackConfig {
    /// Seconds between the server's "played_at" and what is actually audible.
    #[serde(default = "default_latency_buffer_secs")]
    pub latency_buffer_secs: f64,
    /// How far past the track end the progress timer goes before re-polling.
    #[serde(default = "default_repoll_grace_secs")]
    pub repoll_grace_secs: f64,
    #[serde(default = "default_volume")]
    pub volume: f32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WaveformConfig {
    #[serde(default = "default_sample_interval_ms")]
    pub sample_interval_ms: u64,
    #[serde(default = "default_render_fps")]
    pub render_fps: u32,
    #[serde(default = "default_fft_size")]
    pub fft_size: usize,
    /// Bar width in canvas dots.
    #[serde(default = "default_bar_width")]
    pub bar_width: u16,
    #[serde(default = "default_bar_spacing")]
    pub bar_spacing: u16,
    #[serde(default = "default_amplitude_scale")]
    pub amplitude_scale: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HttpConfig {
    #[serde(default = "default_http_enabled")]
    pub enabled: bool,
    #[serde(default = "default_bind_address")]
    pub bind_address: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            url: default_api_url(),
            poll_interval_secs: default_poll_interval_secs(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl Default for PlaybackConfig {
    fn default() -> Self {
        Self {
            latency_buffer_secs: default_latency_buffer_secs(),
            repoll_grace_secs: default_repoll_grace_secs(),
            volume: default_volume(),
        }
    }
}

impl Default for WaveformConfig {
    fn default() -> Self {
        Self {
            sample_interval_ms: default_sample_interval_ms(),
            render_fps: default_render_fps(),
            fft_size: default_fft_size(),
            bar_width: default_bar_width(),
            bar_spacing: default_bar_spacing(),
            amplitude_scale: default_amplitude_scale(),
        }
    }
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            enabled: default_http_enabled(),
            bind_address: default_bind_address(),
            port: default_port(),
        }
    }
}

fn default_api_url() -> String {
    "https://demo.azuracast.com/api/nowplaying".to_string()
}

fn default_poll_interval_secs() -> u64 {
    10
}

fn default_timeout_secs() -> u64 {
    8
}

fn default_latency_buffer_secs() -> f64 {
    40.0
}

fn default_repoll_grace_secs() -> f64 {
    5.0
}

fn default_volume() -> f32 {
    0.8
}

fn default_sample_interval_ms() -> u64 {
    15
}

fn default_render_fps() -> u32 {
    60
}

fn default_fft_size() -> usize {
    256
}

fn default_bar_width() -> u16 {
    2
}

fn default_bar_spacing() -> u16 {
    1
}

fn default_amplitude_scale() -> f64 {
    0.45
}

fn default_http_enabled() -> bool {
    true
}

fn default_bind_address() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    8990
}

impl Config {
    pub fn load() -> anyhow::Result<Self> {
        let config_path = Self::config_path();

        let mut config = if !config_path.exists() {
            let config = Self::default();
            config.save()?;
            config
        } else {
            let content = std::fs::read_to_string(&config_path)?;
            toml::from_str(&content)?
        };

        if let Ok(url) = std::env::var(API_URL_ENV) {
            if !url.trim().is_empty() {
                config.api.url = url;
            }
        }
        Ok(config)
    }

    pub fn save(&self) -> anyhow::Result<()> {
        let config_path = Self::config_path();
        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)?;
        std::fs::write(&config_path, content)?;
        Ok(())
    }

    pub fn config_path() -> PathBuf {
        platform::config_dir().join("config.toml")
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api: ApiConfig::default(),
            playback: PlaybackConfig::default(),
            waveform: WaveformConfig::default(),
            http: HttpConfig::default(),
            display_names: BTreeMap::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert!(config.api.url.starts_with("https://"));
        assert_eq!(config.api.poll_interval_secs, 10);
        assert_eq!(config.playback.latency_buffer_secs, 40.0);
        assert_eq!(config.waveform.fft_size, 256);
        assert_eq!(config.waveform.sample_interval_ms, 15);
        assert_eq!(config.waveform.render_fps, 60);
        assert_eq!(config.http.port, 8990);
        assert!(Config::config_path().ends_with("wavecast/config.toml"));
    }

    #[test]
    fn test_partial_toml_fills_defaults() {
        let config: Config = toml::from_str(
            r#"
            [api]
            url = "http://radio.local/api/nowplaying"

            [display_names]
            "radio_one" = "Radio One"
            "#,
        )
        .unwrap();
        assert_eq!(config.api.url, "http://radio.local/api/nowplaying");
        assert_eq!(config.api.poll_interval_secs, 10);
        assert_eq!(config.playback.repoll_grace_secs, 5.0);
        assert_eq!(config.display_names["radio_one"], "Radio One");
    }
}
