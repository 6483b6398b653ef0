//! Audio handling: format validation, duration probing, stream-copy
//! segmentation and span slicing. The core never decodes compressed audio
//! itself; everything non-WAV goes through ffmpeg subprocesses.

pub mod ffmpeg;
pub mod segmenter;

pub use ffmpeg::{extract_slice, probe_duration_ms};
pub use segmenter::{validate_extension, AudioSegmenter, SUPPORTED_EXTENSIONS};
