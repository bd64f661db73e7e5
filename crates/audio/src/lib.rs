//! Audio handling for ytx
//!
//! - Overlapping time windows for long recordings ([`compute_chunks`])
//! - WAV probing, slicing and sample loading on top of `hound`
//! - The [`Transcoder`] contract and its ffmpeg implementation

pub mod chunking;
mod error;
pub mod transcoder;
pub mod wav;

pub use chunking::{Chunk, compute_chunks};
pub use error::{Error, Result};
pub use transcoder::{FfmpegTranscoder, Transcoder};
pub use wav::{TARGET_SAMPLE_RATE, load_pcm_f32, probe_duration, slice_segment};
