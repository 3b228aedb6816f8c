//! Content acquisition.
//!
//! Turns a [`VideoReference`] into something the analysis step can consume:
//! either the reference itself (the model looks the video up through search
//! grounding) or the downloaded soundtrack as inline media.

use crate::audio::fetch_audio;
use crate::config::{IngestionMode, Settings};
use crate::error::{ReplicatorError, Result};
use crate::video_source::VideoReference;
use async_trait::async_trait;
use std::path::PathBuf;
use tracing::{info, instrument};

/// Largest payload sent inline with a generation request.
pub const MAX_INLINE_BYTES: usize = 20 * 1024 * 1024;

/// What ingestion produced for a video.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AcquiredContent {
    /// The canonical URL only.
    Reference(String),
    /// Raw media bytes with their MIME type.
    Media { data: Vec<u8>, mime_type: String },
}

impl AcquiredContent {
    pub fn describe(&self) -> String {
        match self {
            AcquiredContent::Reference(url) => format!("reference {}", url),
            AcquiredContent::Media { data, mime_type } => {
                format!("{} bytes of {}", data.len(), mime_type)
            }
        }
    }
}

/// Trait for content acquisition.
#[async_trait]
pub trait Ingestor: Send + Sync {
    fn mode(&self) -> IngestionMode;

    /// Acquire content for a video. Fails without partial output.
    async fn acquire(&self, reference: &VideoReference) -> Result<AcquiredContent>;
}

/// Passes the canonical URL straight through.
#[derive(Debug, Default)]
pub struct ReferenceIngestor;

#[async_trait]
impl Ingestor for ReferenceIngestor {
    fn mode(&self) -> IngestionMode {
        IngestionMode::Reference
    }

    async fn acquire(&self, reference: &VideoReference) -> Result<AcquiredContent> {
        Ok(AcquiredContent::Reference(reference.url.clone()))
    }
}

/// Downloads the soundtrack with yt-dlp and returns it as MP3 bytes.
pub struct AudioIngestor {
    temp_dir: PathBuf,
}

impl AudioIngestor {
    pub fn new(temp_dir: PathBuf) -> Self {
        Self { temp_dir }
    }
}

#[async_trait]
impl Ingestor for AudioIngestor {
    fn mode(&self) -> IngestionMode {
        IngestionMode::Audio
    }

    #[instrument(skip(self), fields(url = %reference.url))]
    async fn acquire(&self, reference: &VideoReference) -> Result<AcquiredContent> {
        let data = fetch_audio(&reference.url, &reference.slug(), &self.temp_dir)
            .await
            .map_err(into_ingestion)?;
        check_inline_size(data.len())?;

        info!("Acquired {} bytes of audio", data.len());
        Ok(AcquiredContent::Media {
            data,
            mime_type: "audio/mpeg".to_string(),
        })
    }
}

/// Any failure while acquiring is reported as an ingestion failure.
fn into_ingestion(error: ReplicatorError) -> ReplicatorError {
    match error {
        ReplicatorError::Ingestion(_) => error,
        other => ReplicatorError::Ingestion(other.to_string()),
    }
}

/// Inline media must be non-empty and within [`MAX_INLINE_BYTES`].
fn check_inline_size(len: usize) -> Result<()> {
    if len == 0 {
        return Err(ReplicatorError::Ingestion("downloaded audio is empty".into()));
    }
    if len > MAX_INLINE_BYTES {
        return Err(ReplicatorError::Ingestion(format!(
            "audio is {} bytes, larger than the {} byte inline limit",
            len, MAX_INLINE_BYTES
        )));
    }
    Ok(())
}

/// Create the ingestor configured in settings.
pub fn create_ingestor(settings: &Settings) -> Box<dyn Ingestor> {
    match settings.ingestion.mode {
        IngestionMode::Reference => Box::new(ReferenceIngestor),
        IngestionMode::Audio => Box::new(AudioIngestor::new(settings.temp_dir())),
    }
}
