//! Audio normalization to the MP3 container
//!
//! Anything that isn't already an `.mp3` goes through the conversion
//! engine before upload. The engine is loaded once per session and
//! reports fractional progress to a registered sink while a transcode
//! runs.

pub mod engine;

pub use engine::Engine;

/// Observer for long-running conversion progress. Fractions are in
/// `0.0..=1.0` and end at completion or error.
pub trait ProgressSink: Send + Sync {
    fn progress(&self, fraction: f64);
}

/// Progress sink that drops every notification. For callers that don't
/// render progress.
pub struct NullProgressSink;

impl ProgressSink for NullProgressSink {
    fn progress(&self, _fraction: f64) {}
}

/// Errors from the conversion engine.
#[derive(Debug)]
pub enum EngineError {
    /// The engine binary could not be located or validated.
    LoadFailed(String),
    /// Scratch filesystem I/O failed.
    Io(String),
    /// The transcode itself failed; carries the engine's diagnostics.
    ConversionFailed(String),
}

impl std::fmt::Display for EngineError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EngineError::LoadFailed(e) => {
                write!(f, "Conversion engine failed to load: {}", e)
            }
            EngineError::Io(e) => write!(f, "Conversion scratch I/O failed: {}", e),
            EngineError::ConversionFailed(e) => write!(f, "Conversion failed: {}", e),
        }
    }
}

impl std::error::Error for EngineError {}

/// Output of a successful conversion: always an MP3 container.
#[derive(Debug, Clone)]
pub struct ConvertedAudio {
    pub filename: String,
    pub content_type: String,
    pub bytes: Vec<u8>,
}

/// Name and type every converted file comes back with, matching the
/// single-output convention of the share pipeline.
pub const CONVERTED_FILENAME: &str = "converted.mp3";
pub const CONVERTED_CONTENT_TYPE: &str = "audio/mpeg";

/// Does this filename already carry the target extension?
/// Case-insensitive; files that pass skip conversion entirely.
pub fn is_mp3_filename(name: &str) -> bool {
    name.to_lowercase().ends_with(".mp3")
}
