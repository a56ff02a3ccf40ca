pub mod header;
pub mod now_playing;
pub mod station_list;
pub mod status_bar;
pub mod waveform_panel;
