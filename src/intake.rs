//! Consumer half of the share hand-off protocol
//!
//! The gateway signals a completed (or failed) share through query
//! flags on the redirect URL. Intake treats those flags as a one-shot
//! message: parse, act, strip. A `shared=true` flag means the bridge
//! slot should hold a record; it is read then deleted.

use crate::cache::bridge::SharedFileBridge;
use crate::status::{Status, StatusSink};

/// Where an input file came from. Exactly one input is active at a
/// time; the shared path wins when both exist.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputSource {
    Shared,
    Manual,
}

/// The file the pipeline will transcribe, fully materialized.
#[derive(Debug, Clone)]
pub struct InputFile {
    pub name: String,
    pub content_type: String,
    pub bytes: Vec<u8>,
    pub source: InputSource,
}

impl InputFile {
    /// Manual file-picker selection: read the file from disk.
    pub fn from_path(path: &std::path::Path) -> Result<Self, String> {
        let bytes = std::fs::read(path).map_err(|e| format!("Read {:?}: {}", path, e))?;
        let name = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("selected_audio.file")
            .to_string();
        Ok(Self {
            name,
            content_type: guess_content_type(path),
            bytes,
            source: InputSource::Manual,
        })
    }
}

fn guess_content_type(path: &std::path::Path) -> String {
    match path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_lowercase())
        .as_deref()
    {
        Some("mp3") => "audio/mpeg",
        Some("wav") => "audio/wav",
        Some("ogg") | Some("oga") => "audio/ogg",
        Some("m4a") | Some("mp4") => "audio/mp4",
        Some("flac") => "audio/flac",
        Some("webm") => "audio/webm",
        _ => "application/octet-stream",
    }
    .to_string()
}

/// The one-shot share message carried in redirect query flags.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueryFlags {
    pub shared: bool,
    pub error: Option<String>,
}

impl QueryFlags {
    /// Parse the `shared` / `error` flags out of a raw query string
    /// (without the leading `?`). Unknown parameters are ignored.
    pub fn parse(query: &str) -> Self {
        let mut flags = QueryFlags::default();
        for pair in query.split('&').filter(|p| !p.is_empty()) {
            let (key, value) = match pair.split_once('=') {
                Some((k, v)) => (k, v),
                None => (pair, ""),
            };
            match key {
                "shared" => flags.shared = true,
                "error" => flags.error = Some(value.to_string()),
                _ => {}
            }
        }
        flags
    }

    pub fn is_empty(&self) -> bool {
        !self.shared && self.error.is_none()
    }
}

/// Act on parsed flags: surface a share error, and/or consume the
/// bridge slot into an [`InputFile`]. Returns the shared file when one
/// was found.
///
/// The slot is deleted after a successful read; a share arriving
/// between the read and the delete is lost (accepted single-slot race).
pub fn handle_query_flags(
    flags: &QueryFlags,
    bridge: &SharedFileBridge,
    sink: &dyn StatusSink,
) -> Option<InputFile> {
    if let Some(token) = &flags.error {
        sink.emit(Status::error(format!(
            "Error during share: {}. Please try again.",
            token
        )));
    }

    if !flags.shared {
        return None;
    }

    sink.emit(Status::loading("Attempting to load shared file..."));
    let record = match bridge.get() {
        Some(r) => r,
        None => {
            sink.emit(Status::info("No shared file found in cache."));
            return None;
        }
    };

    if let Err(e) = bridge.delete() {
        log::warn!("Intake: failed to clear bridge slot: {}", e);
    }

    sink.emit(Status::success(format!(
        "Shared file \"{}\" loaded.",
        record.filename
    )));

    Some(InputFile {
        name: record.filename,
        content_type: record.content_type,
        bytes: record.bytes,
        source: InputSource::Shared,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::status::LogStatusSink;
    use tempfile::tempdir;

    #[test]
    fn parses_shared_flag() {
        let flags = QueryFlags::parse("shared=true");
        assert!(flags.shared);
        assert!(flags.error.is_none());
    }

    #[test]
    fn parses_error_flag_with_token() {
        let flags = QueryFlags::parse("shared=true&error=share_failed_no_file");
        assert!(flags.shared);
        assert_eq!(flags.error.as_deref(), Some("share_failed_no_file"));
    }

    #[test]
    fn ignores_unrelated_parameters() {
        let flags = QueryFlags::parse("utm_source=x&tab=home");
        assert!(flags.is_empty());
    }

    #[test]
    fn consume_reads_then_deletes_the_slot() {
        let root = tempdir().unwrap();
        let bridge = SharedFileBridge::new(root.path().join(crate::cache::SHARED_FILES_BUCKET));
        bridge.put("memo.ogg", "audio/ogg", b"bytes").unwrap();

        let flags = QueryFlags::parse("shared=true");
        let input = handle_query_flags(&flags, &bridge, &LogStatusSink).unwrap();

        assert_eq!(input.name, "memo.ogg");
        assert_eq!(input.source, InputSource::Shared);
        assert_eq!(input.bytes, b"bytes");
        // Consumed: a second intake finds nothing.
        assert!(handle_query_flags(&flags, &bridge, &LogStatusSink).is_none());
    }

    #[test]
    fn empty_slot_with_shared_flag_is_not_an_error() {
        let root = tempdir().unwrap();
        let bridge = SharedFileBridge::new(root.path().join(crate::cache::SHARED_FILES_BUCKET));
        let flags = QueryFlags::parse("shared=true");
        assert!(handle_query_flags(&flags, &bridge, &LogStatusSink).is_none());
    }

    #[test]
    fn error_flag_alone_consumes_nothing() {
        let root = tempdir().unwrap();
        let bridge = SharedFileBridge::new(root.path().join(crate::cache::SHARED_FILES_BUCKET));
        bridge.put("memo.ogg", "audio/ogg", b"bytes").unwrap();

        let flags = QueryFlags::parse("error=share_processing_failed");
        assert!(handle_query_flags(&flags, &bridge, &LogStatusSink).is_none());
        // Slot untouched.
        assert!(bridge.get().is_some());
    }

    #[test]
    fn manual_input_guesses_content_type() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("note.wav");
        std::fs::write(&path, b"RIFF").unwrap();
        let input = InputFile::from_path(&path).unwrap();
        assert_eq!(input.content_type, "audio/wav");
        assert_eq!(input.source, InputSource::Manual);
    }
}
