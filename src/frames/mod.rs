//! Video frame extraction and down-sampling.
//!
//! Wraps an external ffmpeg binary behind the [`FrameExtractor`] trait and
//! provides the evenly-spaced frame selection used to bound per-video model
//! calls.

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tokio::process::Command;
use tracing::{debug, info};

use crate::error::{FrameError, FrameResult};

/// One frame pulled out of a video, before any analysis.
#[derive(Debug, Clone)]
pub struct ExtractedFrame {
    /// Offset into the video in seconds.
    pub time_seconds: f64,
    /// Path of the written frame image.
    pub path: PathBuf,
}

/// Interface to the external frame extraction tool.
#[async_trait]
pub trait FrameExtractor: Send + Sync {
    /// Extract frames from `video_path` at the given sampling interval,
    /// ordered by time ascending.
    async fn extract_frames(
        &self,
        video_path: &Path,
        interval_seconds: f64,
    ) -> FrameResult<Vec<ExtractedFrame>>;
}

/// ffmpeg-backed frame extractor writing JPEG frames to a work directory.
#[derive(Clone)]
pub struct FfmpegExtractor {
    output_dir: PathBuf,
    ffmpeg_bin: String,
}

impl FfmpegExtractor {
    /// Create an extractor writing frames under `output_dir`.
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            output_dir: output_dir.into(),
            ffmpeg_bin: "ffmpeg".to_string(),
        }
    }

    /// Override the ffmpeg binary path.
    pub fn with_binary(mut self, bin: impl Into<String>) -> Self {
        self.ffmpeg_bin = bin.into();
        self
    }
}

#[async_trait]
impl FrameExtractor for FfmpegExtractor {
    async fn extract_frames(
        &self,
        video_path: &Path,
        interval_seconds: f64,
    ) -> FrameResult<Vec<ExtractedFrame>> {
        if !video_path.exists() {
            return Err(FrameError::FileNotFound {
                path: video_path.display().to_string(),
            });
        }

        let stem = video_path
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("video");
        let frame_dir = self.output_dir.join(stem);
        tokio::fs::create_dir_all(&frame_dir).await?;

        let pattern = frame_dir.join("frame_%05d.jpg");
        let fps = 1.0 / interval_seconds.max(0.001);

        debug!(video = %video_path.display(), fps, "Extracting frames");

        let output = Command::new(&self.ffmpeg_bin)
            .arg("-y")
            .arg("-i")
            .arg(video_path)
            .arg("-vf")
            .arg(format!("fps={}", fps))
            .arg("-q:v")
            .arg("3")
            .arg(&pattern)
            .output()
            .await?;

        if !output.status.success() {
            return Err(FrameError::Extraction {
                message: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        let mut frames = Vec::new();
        let mut entries = tokio::fs::read_dir(&frame_dir).await?;
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if let Some(index) = frame_index(&path) {
                // ffmpeg numbers frames from 1; frame N sits at (N-1) * interval.
                frames.push(ExtractedFrame {
                    time_seconds: (index - 1) as f64 * interval_seconds,
                    path,
                });
            }
        }

        frames.sort_by(|a, b| {
            a.time_seconds
                .partial_cmp(&b.time_seconds)
                .unwrap_or(std::cmp::Ordering::Equal)
        });

        info!(
            video = %video_path.display(),
            frames = frames.len(),
            "Frame extraction completed"
        );

        Ok(frames)
    }
}

/// Parse the 1-based frame index out of a `frame_%05d.jpg` filename.
fn frame_index(path: &Path) -> Option<u32> {
    let name = path.file_stem()?.to_str()?;
    name.strip_prefix("frame_")?.parse().ok()
}

/// Evenly-spaced frame selection with both endpoints always included.
///
/// Given `n` frames and a cap of `max`, returns at most `max` strictly
/// increasing indices, always containing `0` and `n - 1`. Interior picks are
/// spaced by `floor(n / max)`.
pub fn select_frame_indices(n: usize, max: usize) -> Vec<usize> {
    if n == 0 || max == 0 {
        return Vec::new();
    }
    if n <= max {
        return (0..n).collect();
    }
    if max == 1 {
        return vec![0];
    }

    let step = (n / max).max(1);
    let mut indices: Vec<usize> = (0..n).step_by(step).take(max - 1).collect();
    if indices.last() != Some(&(n - 1)) {
        indices.push(n - 1);
    }
    indices
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_select_all_when_under_cap() {
        assert_eq!(select_frame_indices(5, 15), vec![0, 1, 2, 3, 4]);
        assert_eq!(select_frame_indices(15, 15), (0..15).collect::<Vec<_>>());
    }

    #[test]
    fn test_select_endpoints_always_included() {
        for n in [16, 31, 40, 100, 997] {
            let selected = select_frame_indices(n, 15);
            assert_eq!(selected[0], 0, "n={}", n);
            assert_eq!(*selected.last().unwrap(), n - 1, "n={}", n);
            assert!(selected.len() <= 15, "n={}", n);
        }
    }

    #[test]
    fn test_select_strictly_increasing() {
        for n in [31, 40, 73, 256] {
            let selected = select_frame_indices(n, 15);
            assert!(
                selected.windows(2).all(|w| w[0] < w[1]),
                "not strictly increasing for n={}",
                n
            );
        }
    }

    #[test]
    fn test_select_forty_frames() {
        // 40-second clip sampled at 1 fps.
        let selected = select_frame_indices(40, 15);
        assert_eq!(selected.len(), 15);
        assert!(selected.contains(&0));
        assert!(selected.contains(&39));
    }

    #[test]
    fn test_select_degenerate() {
        assert!(select_frame_indices(0, 15).is_empty());
        assert_eq!(select_frame_indices(10, 1), vec![0]);
        assert_eq!(select_frame_indices(1, 15), vec![0]);
    }

    #[test]
    fn test_frame_index_parse() {
        assert_eq!(frame_index(Path::new("/tmp/frame_00001.jpg")), Some(1));
        assert_eq!(frame_index(Path::new("/tmp/frame_00042.jpg")), Some(42));
        assert_eq!(frame_index(Path::new("/tmp/cover.jpg")), None);
    }
}
