//! Error types for breathwork

use std::fmt;

/// Errors raised by the breathing engine, its audio backends and its config layer
#[derive(Debug)]
pub enum Error {
    /// No pattern with this name in the catalog
    UnknownPattern(String),
    /// Pattern with a zero inhale or exhale
    DegeneratePattern(String),
    /// Malformed automation request (bad time, overlap, short curve)
    Automation(String),
    /// Audio device or stream failure
    Audio(String),
    /// Config file could not be parsed
    Config(String),
    /// Offline render request that cannot be satisfied
    Render(String),
    /// IO error
    Io(std::io::Error),
    /// WAV encoding error
    Wav(hound::Error),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::UnknownPattern(name) => write!(f, "Unknown breathing pattern: {}", name),
            Error::DegeneratePattern(msg) => write!(f, "Degenerate breathing pattern: {}", msg),
            Error::Automation(msg) => write!(f, "Automation error: {}", msg),
            Error::Audio(msg) => write!(f, "Audio error: {}", msg),
            Error::Config(msg) => write!(f, "Config error: {}", msg),
            Error::Render(msg) => write!(f, "Render error: {}", msg),
            Error::Io(e) => write!(f, "IO error: {}", e),
            Error::Wav(e) => write!(f, "WAV error: {}", e),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Io(e) => Some(e),
            Error::Wav(e) => Some(e),
            _ => None,
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self {
        Error::Io(e)
    }
}

impl From<hound::Error> for Error {
    fn from(e: hound::Error) -> Self {
        Error::Wav(e)
    }
}

impl From<toml::de::Error> for Error {
    fn from(e: toml::de::Error) -> Self {
        Error::Config(e.to_string())
    }
}

impl From<cpal::BuildStreamError> for Error {
    fn from(e: cpal::BuildStreamError) -> Self {
        Error::Audio(e.to_string())
    }
}

impl From<cpal::PlayStreamError> for Error {
    fn from(e: cpal::PlayStreamError) -> Self {
        Error::Audio(e.to_string())
    }
}

impl From<cpal::DefaultStreamConfigError> for Error {
    fn from(e: cpal::DefaultStreamConfigError) -> Self {
        Error::Audio(e.to_string())
    }
}

impl From<cpal::DeviceNameError> for Error {
    fn from(e: cpal::DeviceNameError) -> Self {
        Error::Audio(e.to_string())
    }
}

/// Result type for breathwork operations
pub type Result<T> = std::result::Result<T, Error>;
