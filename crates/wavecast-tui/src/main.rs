mod action;
mod app;
mod audio;
mod clock;
mod component;
mod components;
mod controller;
mod http;
mod media_session;
mod progress;
mod scheduler;
mod theme;
mod waveform;
mod widgets;

#[cfg(test)]
mod test_support;

use std::time::Duration;

use wavecast_proto::api::NowPlayingClient;
use wavecast_proto::config::Config;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let data_dir = wavecast_proto::platform::data_dir();
    std::fs::create_dir_all(&data_dir)?;

    let log_path = data_dir.join("wavecast.log");
    let log_file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&log_path)?;

    // RUST_LOG wins; the default keeps HTTP client internals quiet.
    let log_filter = std::env::var("RUST_LOG")
        .unwrap_or_else(|_| "debug,hyper_util=warn,reqwest=warn,hyper=warn".to_string());
    tracing_subscriber::fmt()
        .with_writer(log_file)
        .with_env_filter(log_filter.as_str())
        .with_ansi(false)
        .init();

    eprintln!("wavecast log: {}", log_path.display());
    tracing::info!("wavecast starting…");

    let config = match Config::load() {
        Ok(config) => config,
        Err(e) => {
            tracing::warn!("config: failed to load {}: {}; using defaults", Config::config_path().display(), e);
            Config::default()
        }
    };

    let client = NowPlayingClient::new(
        config.api.url.clone(),
        Duration::from_secs(config.api.timeout_secs),
    )?;
    tracing::info!("[api] polling {} every {}s", client.url(), config.api.poll_interval_secs);

    let (app, inbox) = app::App::new(&config, client);
    app.run(inbox).await
}
