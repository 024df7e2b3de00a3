//! ffmpeg-backed conversion engine
//!
//! The engine wraps a system ffmpeg binary located once per session
//! (`ensure_loaded`). Conversions go through a scratch directory: write
//! input, transcode to MP3, read output, remove both files regardless
//! of outcome. Progress is parsed from `-progress` key/value output
//! against a duration probe of the input.

use std::path::PathBuf;
use std::process::Stdio;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::Command;
use uuid::Uuid;

use super::{
    ConvertedAudio, EngineError, ProgressSink, CONVERTED_CONTENT_TYPE, CONVERTED_FILENAME,
};

/// Conversion engine with init-once load semantics.
///
/// Not `Clone`; the session owns the single instance and lends it out.
pub struct Engine {
    scratch_dir: PathBuf,
    /// Held binary handle; `Some` once `ensure_loaded` has succeeded.
    binary: Option<PathBuf>,
}

impl Engine {
    pub fn new(scratch_dir: impl Into<PathBuf>) -> Self {
        Self {
            scratch_dir: scratch_dir.into(),
            binary: None,
        }
    }

    pub fn is_loaded(&self) -> bool {
        self.binary.is_some()
    }

    /// Locate and validate the ffmpeg binary. Idempotent: after the
    /// first success this returns immediately. A load failure
    /// propagates loudly; conversion is impossible without the engine.
    pub async fn ensure_loaded(&mut self) -> Result<(), EngineError> {
        if self.binary.is_some() {
            return Ok(());
        }

        let candidate = std::env::var("FFMPEG_PATH")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("ffmpeg"));

        log::info!("Engine: probing {:?}", candidate);
        let output = Command::new(&candidate)
            .arg("-version")
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .await
            .map_err(|e| EngineError::LoadFailed(format!("{:?}: {}", candidate, e)))?;

        if !output.status.success() {
            return Err(EngineError::LoadFailed(format!(
                "{:?} exited with {}",
                candidate, output.status
            )));
        }

        let banner = String::from_utf8_lossy(&output.stdout);
        log::info!(
            "Engine: loaded {}",
            banner.lines().next().unwrap_or("ffmpeg")
        );
        self.binary = Some(candidate);
        Ok(())
    }

    /// Convert `bytes` (named `input_name`) to an MP3 container.
    /// Scratch files are removed on both the success and error paths;
    /// cleanup failures are logged and swallowed.
    pub async fn convert(
        &self,
        input_name: &str,
        bytes: &[u8],
        progress: &dyn ProgressSink,
    ) -> Result<ConvertedAudio, EngineError> {
        let binary = self
            .binary
            .as_ref()
            .ok_or_else(|| EngineError::LoadFailed("engine not loaded".to_string()))?;

        tokio::fs::create_dir_all(&self.scratch_dir)
            .await
            .map_err(|e| EngineError::Io(format!("create scratch dir: {}", e)))?;

        // Unique stems so concurrent daemons (or a crashed run's
        // leftovers) can't collide.
        let job = Uuid::new_v4();
        let ext = extension_of(input_name);
        let input_path = self.scratch_dir.join(format!("{}_in{}", job, ext));
        let output_path = self.scratch_dir.join(format!("{}_out.mp3", job));

        let result = self
            .run_conversion(binary, &input_path, &output_path, bytes, progress)
            .await;

        // Best-effort cleanup on both paths.
        for path in [&input_path, &output_path] {
            if let Err(e) = tokio::fs::remove_file(path).await {
                if e.kind() != std::io::ErrorKind::NotFound {
                    log::debug!("Engine: failed to remove scratch file {:?}: {}", path, e);
                }
            }
        }

        result
    }

    async fn run_conversion(
        &self,
        binary: &PathBuf,
        input_path: &PathBuf,
        output_path: &PathBuf,
        bytes: &[u8],
        progress: &dyn ProgressSink,
    ) -> Result<ConvertedAudio, EngineError> {
        tokio::fs::write(input_path, bytes)
            .await
            .map_err(|e| EngineError::Io(format!("write scratch input: {}", e)))?;

        let duration_us = probe_duration_us(binary, input_path).await;
        if duration_us.is_none() {
            log::debug!("Engine: input duration unknown, progress disabled");
        }

        let mut child = Command::new(binary)
            .arg("-hide_banner")
            .arg("-y")
            .arg("-i")
            .arg(input_path)
            .arg("-progress")
            .arg("pipe:1")
            .arg("-nostats")
            .arg(output_path)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| EngineError::ConversionFailed(format!("spawn: {}", e)))?;

        // Drain stderr concurrently with the progress loop: ffmpeg can
        // emit per-frame warnings well past the pipe buffer, and a full
        // stderr pipe would block it before any more progress arrives.
        let stderr_task = child.stderr.take().map(|mut stderr| {
            tokio::spawn(async move {
                use tokio::io::AsyncReadExt;
                let mut buf = Vec::new();
                let _ = stderr.read_to_end(&mut buf).await;
                buf
            })
        });

        // Drain -progress output as it arrives so the sink sees live
        // fractions, not one burst at exit.
        if let Some(stdout) = child.stdout.take() {
            let mut lines = BufReader::new(stdout).lines();
            while let Ok(Some(line)) = lines.next_line().await {
                if let (Some(total), Some(done)) = (duration_us, parse_out_time_us(&line)) {
                    let fraction = (done as f64 / total as f64).clamp(0.0, 1.0);
                    progress.progress(fraction);
                }
            }
        }

        let status = child
            .wait()
            .await
            .map_err(|e| EngineError::ConversionFailed(format!("wait: {}", e)))?;

        let stderr_bytes = match stderr_task {
            Some(task) => task.await.unwrap_or_default(),
            None => Vec::new(),
        };

        if !status.success() {
            let stderr = String::from_utf8_lossy(&stderr_bytes);
            // The tail holds the actual error; the head is stream info.
            let detail: String = stderr
                .lines()
                .rev()
                .take(4)
                .collect::<Vec<_>>()
                .into_iter()
                .rev()
                .collect::<Vec<_>>()
                .join("; ");
            return Err(EngineError::ConversionFailed(format!(
                "exit {}: {}",
                status, detail
            )));
        }

        let converted = tokio::fs::read(output_path)
            .await
            .map_err(|e| EngineError::Io(format!("read scratch output: {}", e)))?;

        progress.progress(1.0);
        log::info!(
            "Engine: converted {} bytes of input to {} bytes of mp3",
            bytes.len(),
            converted.len()
        );

        Ok(ConvertedAudio {
            filename: CONVERTED_FILENAME.to_string(),
            content_type: CONVERTED_CONTENT_TYPE.to_string(),
            bytes: converted,
        })
    }
}

/// Probe the input's duration in microseconds via a bare `-i` run.
/// Returns `None` when the duration can't be determined; progress is
/// simply disabled in that case.
async fn probe_duration_us(binary: &PathBuf, input_path: &PathBuf) -> Option<u64> {
    let output = Command::new(binary)
        .arg("-hide_banner")
        .arg("-i")
        .arg(input_path)
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::piped())
        .output()
        .await
        .ok()?;

    // ffmpeg exits non-zero for "-i without output", the stream info on
    // stderr is still there.
    let stderr = String::from_utf8_lossy(&output.stderr);
    parse_duration_us(&stderr)
}

/// Parse `Duration: HH:MM:SS.cc` out of ffmpeg stream info.
fn parse_duration_us(stderr: &str) -> Option<u64> {
    let line = stderr.lines().find(|l| l.trim_start().starts_with("Duration:"))?;
    let value = line.trim_start().strip_prefix("Duration:")?.trim();
    let value = value.split(',').next()?.trim();
    if value == "N/A" {
        return None;
    }

    let mut parts = value.split(':');
    let hours: u64 = parts.next()?.parse().ok()?;
    let minutes: u64 = parts.next()?.parse().ok()?;
    let seconds: f64 = parts.next()?.parse().ok()?;
    Some(hours * 3_600_000_000 + minutes * 60_000_000 + (seconds * 1_000_000.0) as u64)
}

/// Parse an `out_time_ms=` line from `-progress` output. Despite the
/// name, ffmpeg reports this field in microseconds.
fn parse_out_time_us(line: &str) -> Option<u64> {
    line.trim().strip_prefix("out_time_ms=")?.parse().ok()
}

fn extension_of(name: &str) -> String {
    std::path::Path::new(name)
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| format!(".{}", e))
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_duration_from_stream_info() {
        let stderr = "Input #0, wav, from 'in.wav':\n  Duration: 00:01:02.50, bitrate: 1411 kb/s\n";
        assert_eq!(parse_duration_us(stderr), Some(62_500_000));
    }

    #[test]
    fn missing_or_na_duration_is_none() {
        assert_eq!(parse_duration_us("no duration here"), None);
        assert_eq!(parse_duration_us("  Duration: N/A, bitrate: N/A\n"), None);
    }

    #[test]
    fn parses_out_time_line() {
        assert_eq!(parse_out_time_us("out_time_ms=1500000"), Some(1_500_000));
        assert_eq!(parse_out_time_us("speed=12.5x"), None);
    }

    #[test]
    fn extension_is_preserved_for_scratch_input() {
        assert_eq!(extension_of("memo.ogg"), ".ogg");
        assert_eq!(extension_of("noext"), "");
    }

    #[tokio::test]
    async fn convert_without_load_fails_loudly() {
        let engine = Engine::new("/tmp/sharescribe-test-scratch");
        let err = engine
            .convert("a.ogg", b"x", &super::super::NullProgressSink)
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::LoadFailed(_)));
    }

    // Stand-in binary that floods stderr far past the pipe buffer
    // before producing any progress output or the output file, the way
    // ffmpeg does on damaged inputs with per-frame warnings.
    #[cfg(unix)]
    const CHATTY_FFMPEG: &str = r#"#!/bin/sh
case "$*" in
*-progress*) : ;;
*) echo "probe mode" >&2; exit 1 ;;
esac
for out in "$@"; do :; done
i=0
while [ $i -lt 5000 ]; do
  echo "[mp3float @ 0x0] Header missing, skipping corrupt frame in stream" >&2
  i=$((i+1))
done
printf 'ID3 fake mp3 payload' > "$out"
echo "out_time_ms=500000"
echo "progress=end"
exit 0
"#;

    #[cfg(unix)]
    #[tokio::test]
    async fn stderr_flood_does_not_stall_conversion() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let script = dir.path().join("chatty-ffmpeg");
        std::fs::write(&script, CHATTY_FFMPEG).unwrap();
        let mut perms = std::fs::metadata(&script).unwrap().permissions();
        perms.set_mode(0o755);
        std::fs::set_permissions(&script, perms).unwrap();

        let mut engine = Engine::new(dir.path().join("scratch"));
        engine.binary = Some(script);

        // Conversion must complete even though stderr fills its pipe
        // long before stdout carries any progress.
        let converted = tokio::time::timeout(
            std::time::Duration::from_secs(10),
            engine.convert("memo.ogg", b"oggbytes", &super::super::NullProgressSink),
        )
        .await
        .expect("conversion stalled with a full stderr pipe")
        .unwrap();

        assert!(!converted.bytes.is_empty());
    }
}
