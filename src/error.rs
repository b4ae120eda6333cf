//! Error types for the three failure domains.
//!
//! Asset and camera failures degrade (mute, keep going). Audio device
//! failure is the one fatal class. Out-of-range control input has no error
//! type at all: every setter clamps.

use thiserror::Error;

/// Missing or unreadable sample material
#[derive(Error, Debug)]
pub enum AssetError {
    #[error("sample not found: {0}")]
    Missing(String),

    #[error("no sample selected")]
    NoneSelected,

    #[error("sample id {0} is not registered")]
    UnknownId(usize),

    #[error("sample {name} is empty")]
    Empty { name: String },

    #[error("failed to decode {name}: {reason}")]
    Decode { name: String, reason: String },
}

/// Camera device or frame-read failure
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CameraError {
    #[error("camera unavailable: {0}")]
    Unavailable(String),

    #[error("frame read failed: {0}")]
    ReadFailed(String),

    #[error("frame has invalid dimensions {width}x{height} for {len} bytes")]
    BadFrame { width: usize, height: usize, len: usize },
}

/// Output device failures; fatal to the audio subsystem
#[derive(Error, Debug)]
pub enum AudioError {
    #[error("no default audio output device")]
    NoDevice,

    #[error("failed to get device config: {0}")]
    Config(String),

    #[error("unsupported sample format: {0}")]
    UnsupportedFormat(String),

    #[error("failed to build audio stream: {0}")]
    StreamBuild(String),

    #[error("failed to start audio stream: {0}")]
    StreamPlay(String),

    #[error("audio stream error: {0}")]
    Stream(String),
}

pub type AudioResult<T> = Result<T, AudioError>;
