//! Audio download and inspection.

mod downloader;

pub use downloader::{download_audio, probe_audio, AudioTarget};
