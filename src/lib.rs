//! Share-to-transcription pipeline.
//!
//! A shared audio file enters through the [`gateway`], waits in the
//! single-slot [`cache::SharedFileBridge`], is adopted by a
//! [`session::Session`] via [`intake`], converted to MP3 by
//! [`convert::Engine`] when needed, and transcribed through
//! [`transcribe`]. Results land in the [`history`] store.

pub mod cache;
pub mod cli;
pub mod convert;
pub mod credential;
pub mod gateway;
pub mod history;
pub mod intake;
pub mod paths;
pub mod session;
pub mod status;
pub mod transcribe;

pub use session::Session;
pub use status::{Status, StatusLevel, StatusSink};
pub use transcribe::{run_pipeline, PipelineRun, TranscribeError};
