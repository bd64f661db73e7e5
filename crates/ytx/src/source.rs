//! Media source contract
//!
//! Resolving URLs and downloading audio live outside this crate. A source
//! hands over video metadata first so the cache can be consulted before any
//! audio is downloaded.

use crate::Result;
use std::path::{Path, PathBuf};
use ytx_core::VideoMetadata;

/// Provider of video metadata and downloadable audio
pub trait MediaSource: Send + Sync {
    /// Metadata for the video at `url`
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::Source`] when the video cannot be resolved.
    fn fetch_metadata(&self, url: &str) -> Result<VideoMetadata>;

    /// Download the audio of `video` into `out_dir` and return the file path
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::Source`] when the download fails.
    fn download_audio(&self, video: &VideoMetadata, out_dir: &Path) -> Result<PathBuf>;
}
