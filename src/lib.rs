//! Camera-modulated step sequencer.
//!
//! A 10x10 grid of oscillator/sample cells stepped column by column, plus
//! one extra voice whose pitch and level follow the dominant color seen by a
//! camera. Four activities run side by side: the audio callback, the camera
//! loop, the sequencer tick thread and the terminal control surface. They
//! only talk through published snapshots and bounded queues.

pub mod audio;
pub mod audio_api;
pub mod config;
pub mod error;
pub mod loader;
pub mod mapper;
pub mod middle;
pub mod params;
pub mod publish;
pub mod sequencer;
pub mod shared;
pub mod tui;
pub mod vision;
