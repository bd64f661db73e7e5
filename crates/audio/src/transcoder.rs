//! Conversion of downloaded media into canonical 16 kHz mono PCM WAV

use crate::{Error, Result};
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::Command;

/// Turns arbitrary media into the canonical WAV format engines consume
pub trait Transcoder: Send + Sync {
    /// Convert `src` into a 16 kHz mono PCM WAV at `dst` and return `dst`
    ///
    /// # Errors
    ///
    /// Returns a transcoder error when conversion fails.
    fn normalize(&self, src: &Path, dst: &Path) -> Result<PathBuf>;
}

/// [`Transcoder`] backed by the `ffmpeg` command line tool
#[derive(Debug, Clone)]
pub struct FfmpegTranscoder {
    program: PathBuf,
    overwrite: bool,
}

impl Default for FfmpegTranscoder {
    fn default() -> Self {
        Self {
            program: PathBuf::from("ffmpeg"),
            overwrite: false,
        }
    }
}

impl FfmpegTranscoder {
    /// Transcoder using `ffmpeg` from `PATH`
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Use a specific ffmpeg binary
    #[must_use]
    pub fn with_program(mut self, program: impl Into<PathBuf>) -> Self {
        self.program = program.into();
        self
    }

    /// Re-encode even when the destination already exists
    #[must_use]
    pub fn with_overwrite(mut self, overwrite: bool) -> Self {
        self.overwrite = overwrite;
        self
    }

    /// Arguments passed to ffmpeg for one conversion
    #[must_use]
    pub fn normalize_args(src: &Path, dst: &Path) -> Vec<OsString> {
        let mut args: Vec<OsString> = [
            "-hide_banner",
            "-loglevel",
            "error",
            "-y",
            "-i",
        ]
        .iter()
        .map(OsString::from)
        .collect();
        args.push(src.as_os_str().to_owned());
        args.extend(
            ["-vn", "-ac", "1", "-ar", "16000", "-c:a", "pcm_s16le"]
                .iter()
                .map(OsString::from),
        );
        args.push(dst.as_os_str().to_owned());
        args
    }
}

impl Transcoder for FfmpegTranscoder {
    fn normalize(&self, src: &Path, dst: &Path) -> Result<PathBuf> {
        if let Some(parent) = dst.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| Error::io(e, parent, "create_dir_all"))?;
        }
        if dst.exists() && !self.overwrite {
            tracing::debug!(dst = %dst.display(), "Reusing existing normalized audio");
            return Ok(dst.to_path_buf());
        }

        let program = self.program.display().to_string();
        tracing::debug!(program = %program, src = %src.display(), dst = %dst.display(), "Normalizing audio");
        let output = Command::new(&self.program)
            .args(Self::normalize_args(src, dst))
            .output()
            .map_err(|e| {
                if e.kind() == std::io::ErrorKind::NotFound {
                    Error::TranscoderNotFound {
                        program: program.clone(),
                    }
                } else {
                    Error::transcoder(format!("failed to execute {program}: {e}"))
                }
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(Error::transcoder(format!(
                "{program} failed: {}",
                stderr.trim()
            )));
        }
        if !dst.exists() {
            return Err(Error::transcoder(format!(
                "{program} reported success but {} is missing",
                dst.display()
            )));
        }
        Ok(dst.to_path_buf())
    }
}
