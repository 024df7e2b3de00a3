//! Session context owned by the daemon
//!
//! The loaded conversion engine, the stored credential, the pending
//! input files, and the busy flag live here as one explicit object
//! handed to whichever component needs it. No module-level state.

use std::path::PathBuf;

use crate::cache::{SharedFileBridge, SHARED_FILES_BUCKET};
use crate::convert::Engine;
use crate::credential::CredentialStore;
use crate::history::HistoryStore;
use crate::intake::{self, InputFile, InputSource, QueryFlags};
use crate::paths;
use crate::status::{Status, StatusSink};

pub struct Session {
    pub credential: CredentialStore,
    pub history: HistoryStore,
    pub engine: Engine,
    shared: Option<InputFile>,
    manual: Option<InputFile>,
    busy: bool,
}

impl Session {
    pub fn new(config_dir: PathBuf, scratch_dir: PathBuf) -> Self {
        Self {
            credential: CredentialStore::new(config_dir.clone()),
            history: HistoryStore::new(config_dir),
            engine: Engine::new(scratch_dir),
            shared: None,
            manual: None,
            busy: false,
        }
    }

    /// Session with all state under the default XDG locations.
    pub fn with_default_paths() -> Self {
        Self::new(paths::default_config_dir(), paths::default_scratch_dir())
    }

    /// Announce credential presence on startup, the way the page does
    /// on load.
    pub fn announce_credential(&self, sink: &dyn StatusSink) {
        if self.credential.load().is_some() {
            sink.emit(Status::success("API Key loaded from storage."));
        } else {
            sink.emit(Status::error("API Key not set. Please enter and save."));
        }
    }

    /// Run the intake half of the share protocol against the given
    /// bridge, adopting the shared file if one is waiting. Returns
    /// whether a file was adopted; error-only flags and an empty bridge
    /// slot surface statuses but adopt nothing, so callers must not
    /// treat them as a transcription trigger.
    pub fn intake(
        &mut self,
        flags: &QueryFlags,
        bridge: &SharedFileBridge,
        sink: &dyn StatusSink,
    ) -> bool {
        if flags.is_empty() {
            return false;
        }
        match intake::handle_query_flags(flags, bridge, sink) {
            Some(input) => {
                self.set_shared(input);
                true
            }
            None => false,
        }
    }

    /// Adopt a shared file; clears any manual selection.
    pub fn set_shared(&mut self, input: InputFile) {
        debug_assert_eq!(input.source, InputSource::Shared);
        self.manual = None;
        self.shared = Some(input);
    }

    /// Adopt a manual file-picker selection; clears any shared file.
    pub fn set_manual(&mut self, input: InputFile) {
        debug_assert_eq!(input.source, InputSource::Manual);
        self.shared = None;
        self.manual = Some(input);
    }

    /// Drop the pending shared file ("Choose a different file").
    pub fn clear_shared(&mut self, sink: &dyn StatusSink) {
        if self.shared.take().is_some() {
            sink.emit(Status::info("Shared file cleared."));
        }
    }

    /// The file the next transcription will use. Shared wins over
    /// manual: the share flow is the inbound action the user just
    /// completed.
    pub fn active_input(&self) -> Option<&InputFile> {
        self.shared.as_ref().or(self.manual.as_ref())
    }

    pub fn is_busy(&self) -> bool {
        self.busy
    }

    pub(crate) fn set_busy(&mut self, busy: bool) {
        self.busy = busy;
    }

    /// Default bridge matching this installation's cache layout.
    pub fn default_bridge() -> SharedFileBridge {
        SharedFileBridge::new(paths::bucket_dir(
            &paths::default_cache_root(),
            SHARED_FILES_BUCKET,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::status::LogStatusSink;
    use tempfile::tempdir;

    fn session() -> (tempfile::TempDir, Session) {
        let dir = tempdir().unwrap();
        let s = Session::new(dir.path().join("config"), dir.path().join("scratch"));
        (dir, s)
    }

    fn shared_input(name: &str) -> InputFile {
        InputFile {
            name: name.to_string(),
            content_type: "audio/ogg".to_string(),
            bytes: vec![1, 2, 3],
            source: InputSource::Shared,
        }
    }

    fn manual_input(name: &str) -> InputFile {
        InputFile {
            name: name.to_string(),
            content_type: "audio/wav".to_string(),
            bytes: vec![4, 5, 6],
            source: InputSource::Manual,
        }
    }

    #[test]
    fn shared_wins_over_manual() {
        let (_dir, mut s) = session();
        s.set_manual(manual_input("picked.wav"));
        s.set_shared(shared_input("shared.ogg"));
        assert_eq!(s.active_input().unwrap().name, "shared.ogg");
    }

    #[test]
    fn selecting_one_input_clears_the_other() {
        let (_dir, mut s) = session();
        s.set_shared(shared_input("shared.ogg"));
        s.set_manual(manual_input("picked.wav"));
        // Manual selection replaced the shared file entirely.
        assert_eq!(s.active_input().unwrap().name, "picked.wav");

        s.set_shared(shared_input("again.ogg"));
        assert_eq!(s.active_input().unwrap().name, "again.ogg");
        s.clear_shared(&LogStatusSink);
        assert!(s.active_input().is_none());
    }

    #[test]
    fn clear_shared_without_shared_file_is_silent() {
        let (_dir, mut s) = session();
        s.set_manual(manual_input("picked.wav"));
        s.clear_shared(&LogStatusSink);
        assert_eq!(s.active_input().unwrap().name, "picked.wav");
    }

    #[test]
    fn intake_adopts_waiting_shared_file() {
        let (dir, mut s) = session();
        let bridge = SharedFileBridge::new(dir.path().join(SHARED_FILES_BUCKET));
        bridge.put("memo.m4a", "audio/mp4", b"abc").unwrap();

        let adopted = s.intake(&QueryFlags::parse("shared=true"), &bridge, &LogStatusSink);

        assert!(adopted);
        let input = s.active_input().unwrap();
        assert_eq!(input.name, "memo.m4a");
        assert_eq!(input.source, InputSource::Shared);
    }

    #[test]
    fn intake_without_a_new_file_adopts_nothing() {
        let (dir, mut s) = session();
        let bridge = SharedFileBridge::new(dir.path().join(SHARED_FILES_BUCKET));

        // A previous run's file is still selected.
        s.set_shared(shared_input("earlier.ogg"));

        // Error-only flags: status surfaced, nothing adopted, so the
        // stale selection must not be re-run off this signal.
        let flags = QueryFlags::parse("error=share_processing_failed");
        assert!(!s.intake(&flags, &bridge, &LogStatusSink));

        // shared=true against an empty slot: same.
        let flags = QueryFlags::parse("shared=true");
        assert!(!s.intake(&flags, &bridge, &LogStatusSink));

        // Empty flags: same.
        assert!(!s.intake(&QueryFlags::default(), &bridge, &LogStatusSink));

        assert_eq!(s.active_input().unwrap().name, "earlier.ogg");
    }

    #[test]
    fn intake_reports_adoption_once_per_share() {
        let (dir, mut s) = session();
        let bridge = SharedFileBridge::new(dir.path().join(SHARED_FILES_BUCKET));
        bridge.put("memo.m4a", "audio/mp4", b"abc").unwrap();

        let flags = QueryFlags::parse("shared=true");
        assert!(s.intake(&flags, &bridge, &LogStatusSink));
        // The slot was consumed; a repeated page load with the same
        // flags finds nothing and triggers nothing.
        assert!(!s.intake(&flags, &bridge, &LogStatusSink));
    }
}
