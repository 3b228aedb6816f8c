//! Soundtrack extraction for the audio ingestion mode.
//!
//! Every fetch works in its own scratch directory under the configured temp
//! dir, so nothing from an earlier run can be picked up. All failures are
//! reported as [`ReplicatorError::Ingestion`].

use crate::error::{ReplicatorError, Result};
use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use std::process::{Output, Stdio};
use tokio::process::Command;
use tracing::{debug, info, instrument, warn};

/// Extensions yt-dlp produces for audio-only downloads, in preference order.
const AUDIO_EXTENSIONS: [&str; 5] = ["mp3", "opus", "m4a", "webm", "ogg"];

/// Download the soundtrack of `url` and return it as MP3 bytes.
///
/// `stem` names the files inside the scratch directory. The scratch
/// directory is removed before returning, on success and on failure.
#[instrument(skip(work_dir), fields(stem = %stem))]
pub async fn fetch_audio(url: &str, stem: &str, work_dir: &Path) -> Result<Vec<u8>> {
    std::fs::create_dir_all(work_dir).map_err(|e| {
        ReplicatorError::Ingestion(format!("cannot create {}: {}", work_dir.display(), e))
    })?;
    let scratch = tempfile::Builder::new()
        .prefix("fetch-")
        .tempdir_in(work_dir)
        .map_err(|e| {
            ReplicatorError::Ingestion(format!(
                "cannot create scratch dir in {}: {}",
                work_dir.display(),
                e
            ))
        })?;

    let result = fetch_into(url, stem, scratch.path()).await;

    let scratch_path = scratch.path().to_path_buf();
    if let Err(e) = scratch.close() {
        warn!("Failed to cleanup {}: {}", scratch_path.display(), e);
    }

    result
}

async fn fetch_into(url: &str, stem: &str, dir: &Path) -> Result<Vec<u8>> {
    info!("Downloading audio from {}", url);

    let template = dir.join(format!("{}.%(ext)s", stem));
    run_tool(
        "yt-dlp",
        [
            OsStr::new("--extract-audio"),
            OsStr::new("--audio-format"),
            OsStr::new("mp3"),
            OsStr::new("--audio-quality"),
            OsStr::new("0"),
            OsStr::new("--output"),
            template.as_os_str(),
            OsStr::new("--no-playlist"),
            OsStr::new("--quiet"),
            OsStr::new("--no-warnings"),
            OsStr::new(url),
        ],
    )
    .await?;

    let downloaded = find_audio_file(dir, stem)?;
    let mp3 = dir.join(format!("{}.mp3", stem));
    if downloaded != mp3 {
        debug!("Converting {} to MP3", downloaded.display());
        run_tool(
            "ffmpeg",
            [
                OsStr::new("-i"),
                downloaded.as_os_str(),
                OsStr::new("-vn"),
                OsStr::new("-codec:a"),
                OsStr::new("libmp3lame"),
                OsStr::new("-qscale:a"),
                OsStr::new("2"),
                OsStr::new("-y"),
                OsStr::new("-loglevel"),
                OsStr::new("error"),
                mp3.as_os_str(),
            ],
        )
        .await?;
    }

    tokio::fs::read(&mp3)
        .await
        .map_err(|e| ReplicatorError::Ingestion(format!("cannot read {}: {}", mp3.display(), e)))
}

/// Run an external tool to completion. A missing binary or a non-zero exit
/// is an ingestion failure carrying the tool's stderr.
async fn run_tool<I, S>(program: &str, args: I) -> Result<Output>
where
    I: IntoIterator<Item = S>,
    S: AsRef<OsStr>,
{
    let output = Command::new(program)
        .args(args)
        .stdout(Stdio::null())
        .stderr(Stdio::piped())
        .output()
        .await
        .map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => {
                ReplicatorError::Ingestion(format!("{} is not installed", program))
            }
            _ => ReplicatorError::Ingestion(format!("cannot run {}: {}", program, e)),
        })?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(ReplicatorError::Ingestion(format!(
            "{} exited with {}: {}",
            program,
            output.status,
            stderr.trim()
        )));
    }
    Ok(output)
}

/// Locate the file yt-dlp wrote for `stem`.
fn find_audio_file(dir: &Path, stem: &str) -> Result<PathBuf> {
    if let Some(found) = AUDIO_EXTENSIONS
        .iter()
        .map(|ext| dir.join(format!("{}.{}", stem, ext)))
        .find(|candidate| candidate.exists())
    {
        return Ok(found);
    }

    // Format ids end up in the name for some extractors, e.g. `<stem>.f251.weba`
    let entries = std::fs::read_dir(dir)
        .map_err(|e| ReplicatorError::Ingestion(format!("cannot read {}: {}", dir.display(), e)))?;
    entries
        .flatten()
        .find(|entry| entry.file_name().to_string_lossy().starts_with(stem))
        .map(|entry| entry.path())
        .ok_or_else(|| ReplicatorError::Ingestion("no audio file after download".into()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_find_audio_file_prefers_known_extensions() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("abc123.m4a"), b"audio").unwrap();
        std::fs::write(dir.path().join("other.mp3"), b"audio").unwrap();

        let found = find_audio_file(dir.path(), "abc123").unwrap();
        assert_eq!(found, dir.path().join("abc123.m4a"));
    }

    #[test]
    fn test_find_audio_file_falls_back_to_prefix() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("abc123.f251.weba"), b"audio").unwrap();

        let found = find_audio_file(dir.path(), "abc123").unwrap();
        assert_eq!(found, dir.path().join("abc123.f251.weba"));
    }

    #[test]
    fn test_find_audio_file_missing() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(
            find_audio_file(dir.path(), "nothing"),
            Err(ReplicatorError::Ingestion(_))
        ));
    }

    #[tokio::test]
    async fn test_missing_tool_is_ingestion_error() {
        let err = run_tool("replicator-no-such-tool", ["--version"])
            .await
            .unwrap_err();
        match err {
            ReplicatorError::Ingestion(msg) => assert!(msg.contains("not installed")),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_failing_tool_is_ingestion_error() {
        let err = run_tool("sh", ["-c", "echo boom >&2; exit 3"]).await.unwrap_err();
        match err {
            ReplicatorError::Ingestion(msg) => assert!(msg.contains("boom")),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_unusable_work_dir_is_ingestion_error() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("not-a-dir");
        std::fs::write(&file, b"x").unwrap();

        let err = fetch_audio("https://youtu.be/jNQXAC9IVRw", "jNQXAC9IVRw", &file)
            .await
            .unwrap_err();
        assert!(matches!(err, ReplicatorError::Ingestion(_)));
    }

    #[tokio::test]
    async fn test_scratch_dir_is_removed_after_failure() {
        let dir = tempfile::tempdir().unwrap();
        // The URL is not a video, so yt-dlp (or its absence) fails the fetch
        let result = fetch_audio("not-a-url", "stem", dir.path()).await;
        assert!(matches!(result, Err(ReplicatorError::Ingestion(_))));
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }
}
