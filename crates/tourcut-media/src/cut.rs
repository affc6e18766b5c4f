//! Slot clip cutting.

use std::path::Path;
use tokio::fs;
use tracing::info;

use crate::command::{FfmpegCommand, FfmpegRunner};
use crate::error::{MediaError, MediaResult};

/// Hard ceiling on a single cut; slot clips are a few seconds long,
/// so anything past this is a wedged FFmpeg.
const CUT_TIMEOUT_SECS: u64 = 120;

/// File name for one slot's cut clip, zero-padded so directory
/// listings sort in template order.
pub fn slot_clip_filename(slot_number: u8) -> String {
    format!("slot_{:02}.mp4", slot_number)
}

/// Cut one slot clip out of recorded footage.
///
/// Seeks accurately (decode-based), re-encodes at constant quality so
/// the cut boundary is frame-exact regardless of the source keyframe
/// interval, and shifts timestamps to start at zero for the render
/// tool. Returns the output size in bytes.
pub async fn cut_slot_clip(
    input: impl AsRef<Path>,
    output: impl AsRef<Path>,
    start_secs: f64,
    duration_secs: f64,
) -> MediaResult<u64> {
    let input = input.as_ref();
    let output = output.as_ref();

    if !input.exists() {
        return Err(MediaError::FileNotFound(input.to_path_buf()));
    }
    if let Some(parent) = output.parent() {
        fs::create_dir_all(parent).await?;
    }

    info!(
        input = %input.display(),
        output = %output.display(),
        start = format!("{:.3}", start_secs),
        duration = format!("{:.3}", duration_secs),
        "Cutting slot clip"
    );

    let cmd = FfmpegCommand::new(input, output)
        .accurate_seek(start_secs)
        .duration(duration_secs)
        .video_codec("libx264")
        .crf(18)
        .preset("fast")
        .audio_codec("aac")
        .zero_based_timestamps();

    FfmpegRunner::new()
        .with_timeout(CUT_TIMEOUT_SECS)
        .run(&cmd)
        .await?;

    let meta = fs::metadata(output).await?;
    if meta.len() == 0 {
        return Err(MediaError::InvalidVideo(format!(
            "FFmpeg produced an empty file: {}",
            output.display()
        )));
    }

    Ok(meta.len())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_slot_clip_filename_zero_pads() {
        assert_eq!(slot_clip_filename(1), "slot_01.mp4");
        assert_eq!(slot_clip_filename(14), "slot_14.mp4");
    }

    #[tokio::test]
    async fn test_cut_missing_input() {
        let dir = tempfile::TempDir::new().unwrap();
        let err = cut_slot_clip(
            dir.path().join("missing.mp4"),
            dir.path().join("out.mp4"),
            0.0,
            1.3,
        )
        .await
        .unwrap_err();
        assert!(matches!(err, MediaError::FileNotFound(_)));
    }
}
