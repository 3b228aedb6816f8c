//! Audio acquisition for the audio ingestion mode.

mod downloader;

pub use downloader::fetch_audio;
