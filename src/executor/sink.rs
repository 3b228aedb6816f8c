//! Destinations for generated artifacts.

use crate::error::{ReplicatorError, Result};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::debug;

/// A writable text target that receives artifact entries one at a time.
pub trait ArtifactSink {
    /// Start a fresh artifact, discarding anything written before.
    fn reset(&mut self) -> Result<()>;

    /// Append one entry. A line terminator is added by the sink.
    fn append(&mut self, entry: &str) -> Result<()>;

    /// Flush any buffered output.
    fn finish(&mut self) -> Result<()> {
        Ok(())
    }
}

/// Writes the artifact to a file, truncating it on reset.
pub struct FileSink {
    path: PathBuf,
    writer: Option<BufWriter<File>>,
}

impl FileSink {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            writer: None,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl ArtifactSink for FileSink {
    fn reset(&mut self) -> Result<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let file = File::create(&self.path).map_err(|e| {
            ReplicatorError::Artifact(format!("cannot create {}: {}", self.path.display(), e))
        })?;
        debug!("Created artifact at {}", self.path.display());
        self.writer = Some(BufWriter::new(file));
        Ok(())
    }

    fn append(&mut self, entry: &str) -> Result<()> {
        let writer = self.writer.as_mut().ok_or_else(|| {
            ReplicatorError::Artifact("append called before the artifact was created".into())
        })?;
        writeln!(writer, "{}", entry).map_err(|e| {
            ReplicatorError::Artifact(format!("cannot write {}: {}", self.path.display(), e))
        })
    }

    fn finish(&mut self) -> Result<()> {
        if let Some(writer) = self.writer.as_mut() {
            writer.flush().map_err(|e| {
                ReplicatorError::Artifact(format!("cannot flush {}: {}", self.path.display(), e))
            })?;
        }
        Ok(())
    }
}

/// Keeps entries in memory. Useful when only the returned artifact matters.
#[derive(Debug, Default)]
pub struct MemorySink {
    pub entries: Vec<String>,
}

impl ArtifactSink for MemorySink {
    fn reset(&mut self) -> Result<()> {
        self.entries.clear();
        Ok(())
    }

    fn append(&mut self, entry: &str) -> Result<()> {
        self.entries.push(entry.to_string());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_file_sink_truncates_on_reset() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out").join("solution.py");
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(&path, "stale contents\n").unwrap();

        let mut sink = FileSink::new(&path);
        sink.reset().unwrap();
        sink.append("print('a')").unwrap();
        sink.append("print('b')").unwrap();
        sink.finish().unwrap();

        let written = std::fs::read_to_string(&path).unwrap();
        assert_eq!(written, "print('a')\nprint('b')\n");
    }

    #[test]
    fn test_file_sink_creates_parent_dirs() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("deeper").join("gen.py");

        let mut sink = FileSink::new(&path);
        sink.reset().unwrap();
        sink.finish().unwrap();

        assert!(path.exists());
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "");
    }

    #[test]
    fn test_append_before_reset_fails() {
        let dir = tempfile::tempdir().unwrap();
        let mut sink = FileSink::new(dir.path().join("gen.py"));
        assert!(matches!(
            sink.append("x"),
            Err(ReplicatorError::Artifact(_))
        ));
    }

    #[test]
    fn test_memory_sink_reset_discards() {
        let mut sink = MemorySink::default();
        sink.append("old").unwrap();
        sink.reset().unwrap();
        sink.append("new").unwrap();
        assert_eq!(sink.entries, vec!["new"]);
    }
}
