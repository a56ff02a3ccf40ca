//! Shared model for the wavecast player: the now-playing API payload, the
//! track reconciler, user configuration and platform paths.

pub mod api;
pub mod config;
pub mod nowplaying;
pub mod platform;
pub mod reconcile;
