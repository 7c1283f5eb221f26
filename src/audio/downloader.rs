//! Audio download and processing utilities.
//!
//! This module downloads the best audio stream with yt-dlp, converts it to a
//! mono file at the configured bitrate with ffmpeg, and reads stream
//! properties back with ffprobe.

use crate::error::{Result, ShelfError};
use crate::store::AudioMetadata;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::process::Command;
use tracing::{debug, info, instrument};

/// Target encoding for downloaded audio.
#[derive(Debug, Clone)]
pub struct AudioTarget {
    /// Container/codec extension, e.g. `mp3`.
    pub format: String,
    /// Bitrate passed to ffmpeg, e.g. `64k`.
    pub bitrate: String,
}

/// Downloads audio for a video and converts it to the target format.
///
/// If the converted file already exists it is returned without re-downloading.
/// Conversion goes through a `<id>.partial.<format>` file that is only renamed
/// into place once ffmpeg succeeds, so an interrupted run never leaves a
/// truncated file behind under the final name.
#[instrument(skip(output_dir, target))]
pub async fn download_audio(
    url: &str,
    video_id: &str,
    output_dir: &Path,
    target: &AudioTarget,
) -> Result<PathBuf> {
    tokio::fs::create_dir_all(output_dir).await?;

    if let Some(cached) = cached_audio(output_dir, video_id, target) {
        info!("Using cached audio file");
        return Ok(cached);
    }
    let target_path = output_dir.join(format!("{}.{}", video_id, target.format));

    info!("Downloading audio from {}", url);

    let template = output_dir.join(format!("{}.source.%(ext)s", video_id));

    let result = Command::new("yt-dlp")
        .arg("--format")
        .arg("bestaudio")
        .arg("--output")
        .arg(&template)
        .arg("--no-playlist")
        .arg("--quiet")
        .arg("--no-warnings")
        .arg(url)
        .stdout(Stdio::null())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .output()
        .await;

    let output = match result {
        Ok(o) => o,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(ShelfError::ToolNotFound("yt-dlp".into()));
        }
        Err(e) => {
            return Err(ShelfError::AudioDownload(format!("yt-dlp execution failed: {e}")));
        }
    };

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(ShelfError::from_tool_output("yt-dlp audio download", &stderr));
    }

    let downloaded = find_source_file(output_dir, video_id)?;

    let partial = partial_path(output_dir, video_id, target);
    convert(&downloaded, &partial, &target.bitrate).await?;
    tokio::fs::rename(&partial, &target_path).await?;
    if let Err(e) = tokio::fs::remove_file(&downloaded).await {
        debug!("Could not remove {}: {}", downloaded.display(), e);
    }

    Ok(target_path)
}

/// The finished file for `video_id`, if a previous run completed it.
fn cached_audio(output_dir: &Path, video_id: &str, target: &AudioTarget) -> Option<PathBuf> {
    let path = output_dir.join(format!("{}.{}", video_id, target.format));
    path.is_file().then_some(path)
}

/// Where ffmpeg writes before the result is renamed into place. The
/// extension stays last so ffmpeg can pick the container from it.
fn partial_path(output_dir: &Path, video_id: &str, target: &AudioTarget) -> PathBuf {
    output_dir.join(format!("{}.partial.{}", video_id, target.format))
}

/// Locates the raw download by its `<id>.source.` prefix.
fn find_source_file(dir: &Path, video_id: &str) -> Result<PathBuf> {
    let prefix = format!("{}.source.", video_id);

    let entries = std::fs::read_dir(dir)
        .map_err(|e| ShelfError::AudioDownload(format!("Cannot read directory: {e}")))?;

    for entry in entries.flatten() {
        let name = entry.file_name();
        let name = name.to_string_lossy();
        if name.starts_with(&prefix) && !name.ends_with(".part") {
            return Ok(entry.path());
        }
    }

    Err(ShelfError::AudioDownload("Audio file not found after download".into()))
}

/// Converts to a mono file at `bitrate` using ffmpeg.
///
/// On failure `dest` is removed.
async fn convert(source: &Path, dest: &Path, bitrate: &str) -> Result<()> {
    debug!("Converting {:?} to {:?}", source, dest);

    let result = Command::new("ffmpeg")
        .arg("-i")
        .arg(source)
        .arg("-vn")
        .arg("-ac")
        .arg("1")
        .arg("-b:a")
        .arg(bitrate)
        .arg("-y")
        .arg("-loglevel")
        .arg("error")
        .arg(dest)
        .stdout(Stdio::null())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .output()
        .await;

    let outcome = match result {
        Ok(out) if out.status.success() => return Ok(()),
        Ok(out) => {
            let err = String::from_utf8_lossy(&out.stderr);
            Err(ShelfError::AudioDownload(format!("ffmpeg conversion failed: {err}")))
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            Err(ShelfError::ToolNotFound("ffmpeg".into()))
        }
        Err(e) => Err(ShelfError::AudioDownload(format!("ffmpeg error: {e}"))),
    };

    if dest.exists() {
        if let Err(e) = tokio::fs::remove_file(dest).await {
            debug!("Could not remove {}: {}", dest.display(), e);
        }
    }
    outcome
}

/// Reads stream properties of an audio file using ffprobe.
pub async fn probe_audio(path: &Path) -> Result<AudioMetadata> {
    let result = Command::new("ffprobe")
        .arg("-v")
        .arg("quiet")
        .arg("-print_format")
        .arg("json")
        .arg("-show_format")
        .arg("-show_streams")
        .arg(path)
        .output()
        .await;

    let output = match result {
        Ok(o) => o,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(ShelfError::ToolNotFound("ffprobe".into()));
        }
        Err(e) => {
            return Err(ShelfError::AudioDownload(format!("ffprobe failed: {e}")));
        }
    };

    if !output.status.success() {
        return Err(ShelfError::AudioDownload("ffprobe returned error".into()));
    }

    parse_probe_output(&String::from_utf8_lossy(&output.stdout))
}

/// Extracts the first audio stream's properties from ffprobe JSON.
fn parse_probe_output(json_str: &str) -> Result<AudioMetadata> {
    let parsed: serde_json::Value = serde_json::from_str(json_str)
        .map_err(|_| ShelfError::AudioDownload("Invalid ffprobe output".into()))?;

    let stream = parsed["streams"]
        .as_array()
        .and_then(|streams| {
            streams
                .iter()
                .find(|s| s["codec_type"].as_str() == Some("audio"))
        })
        .ok_or_else(|| ShelfError::AudioDownload("No audio stream found".into()))?;

    let text = |v: &serde_json::Value| {
        v.as_str()
            .map(|s| s.to_string())
            .or_else(|| v.as_u64().map(|n| n.to_string()))
            .unwrap_or_else(|| "unknown".to_string())
    };

    Ok(AudioMetadata {
        codec: stream["codec_name"].as_str().unwrap_or("unknown").to_string(),
        channels: stream["channels"].as_u64().unwrap_or(0) as u32,
        sample_rate: text(&stream["sample_rate"]),
        bit_rate: text(&stream["bit_rate"]),
        duration: parsed["format"]["duration"]
            .as_str()
            .unwrap_or("0")
            .to_string(),
    })
}
