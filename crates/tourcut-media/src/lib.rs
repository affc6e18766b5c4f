//! FFmpeg CLI wrapper for cutting slot clips from recorded footage.
//!
//! This crate provides:
//! - Type-safe FFmpeg command building
//! - A runner with timeout and stderr capture
//! - FFprobe wrapping for duration and frame rate checks
//! - Slot clip cutting (accurate seek, re-encode, zero-based timestamps)
//! - Cross-device-safe file moves for the render queue directory

pub mod command;
pub mod cut;
pub mod error;
pub mod fs_utils;
pub mod probe;

pub use command::{check_ffmpeg, check_ffprobe, FfmpegCommand, FfmpegRunner};
pub use cut::{cut_slot_clip, slot_clip_filename};
pub use error::{MediaError, MediaResult};
pub use fs_utils::move_file;
pub use probe::{get_duration, probe_video, VideoInfo};
