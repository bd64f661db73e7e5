//! Cache root resolution and artifact directory layout
//!
//! ```text
//! <cache_root>/<video_id>/<engine>/<model>/<config_hash>/
//!   transcript.json
//!   captions.srt
//!   meta.json
//! ```

use crate::{Error, Result};
use dirs::{cache_dir, home_dir};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use ytx_core::AppConfig;

/// Metadata record file name
pub const META_JSON: &str = "meta.json";
/// Transcript document file name
pub const TRANSCRIPT_JSON: &str = "transcript.json";
/// Captions file name
pub const CAPTIONS_SRT: &str = "captions.srt";

/// Placeholder used for replaced characters and empty segments
const PLACEHOLDER: &str = "_";

/// Make a single path component filesystem-safe
///
/// Separators and control characters become `_`, surrounding whitespace and
/// dots are stripped, and an empty result becomes `_`. The function is pure,
/// so the same input always maps to the same directory name.
#[must_use]
pub fn sanitize_segment(segment: &str) -> String {
    let replaced: String = segment
        .chars()
        .map(|c| {
            if c == '/' || c == '\\' || c == std::path::MAIN_SEPARATOR || (c as u32) < 32 {
                '_'
            } else {
                c
            }
        })
        .collect();
    let trimmed = replaced.trim().trim_matches('.');
    if trimmed.is_empty() {
        PLACEHOLDER.to_string()
    } else {
        trimmed.to_string()
    }
}

/// The four-part address of one artifact set
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CacheKey {
    /// Video identifier
    pub video_id: String,
    /// Engine that produced the transcript
    pub engine: String,
    /// Model that produced the transcript
    pub model: String,
    /// Hash of the output-relevant configuration
    pub config_hash: String,
}

impl CacheKey {
    /// Assemble a key from its parts
    #[must_use]
    pub fn new(
        video_id: impl Into<String>,
        engine: impl Into<String>,
        model: impl Into<String>,
        config_hash: impl Into<String>,
    ) -> Self {
        Self {
            video_id: video_id.into(),
            engine: engine.into(),
            model: model.into(),
            config_hash: config_hash.into(),
        }
    }

    /// Derive the key for a video under a configuration
    pub fn for_config(video_id: impl Into<String>, config: &AppConfig) -> Result<Self> {
        Ok(Self::new(
            video_id,
            config.engine.clone(),
            config.model.clone(),
            config.config_hash()?,
        ))
    }

    /// Relative directory of this key below the cache root
    #[must_use]
    pub fn relative_dir(&self) -> PathBuf {
        [
            &self.video_id,
            &self.engine,
            &self.model,
            &self.config_hash,
        ]
        .iter()
        .map(|s| sanitize_segment(s))
        .collect()
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}/{}/{}/{}",
            self.video_id, self.engine, self.model, self.config_hash
        )
    }
}

/// Resolved locations of one artifact set
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactPaths {
    /// Artifact directory
    pub dir: PathBuf,
    /// Transcript document
    pub transcript_json: PathBuf,
    /// Captions file
    pub captions_srt: PathBuf,
    /// Metadata record
    pub meta_json: PathBuf,
}

impl ArtifactPaths {
    /// Paths of the artifact files inside `dir`
    #[must_use]
    pub fn in_dir(dir: impl Into<PathBuf>) -> Self {
        let dir = dir.into();
        Self {
            transcript_json: dir.join(TRANSCRIPT_JSON),
            captions_srt: dir.join(CAPTIONS_SRT),
            meta_json: dir.join(META_JSON),
            dir,
        }
    }
}

/// Inputs for determining cache root directory
#[derive(Debug, Clone, Default)]
pub struct CacheInputs {
    /// `YTX_CACHE_DIR`
    pub ytx_cache_dir: Option<PathBuf>,
    /// `XDG_CACHE_HOME`
    pub xdg_cache_home: Option<PathBuf>,
    /// Platform cache directory
    pub os_cache_dir: Option<PathBuf>,
    /// User home directory
    pub home_dir: Option<PathBuf>,
}

impl CacheInputs {
    /// Read the inputs from the process environment
    #[must_use]
    pub fn from_env() -> Self {
        let var = |name: &str| {
            std::env::var(name)
                .ok()
                .filter(|s| !s.trim().is_empty())
                .map(PathBuf::from)
        };
        Self {
            ytx_cache_dir: var("YTX_CACHE_DIR"),
            xdg_cache_home: var("XDG_CACHE_HOME"),
            os_cache_dir: cache_dir(),
            home_dir: home_dir(),
        }
    }
}

/// Pick the cache root from explicit inputs
///
/// Resolution order:
/// 1) `YTX_CACHE_DIR` (explicit override)
/// 2) `XDG_CACHE_HOME/ytx`
/// 3) OS cache dir/ytx
/// 4) `~/.cache/ytx`
pub fn cache_root_from_inputs(inputs: CacheInputs) -> Result<PathBuf> {
    if let Some(dir) = inputs.ytx_cache_dir.filter(|p| !p.as_os_str().is_empty()) {
        return Ok(expand_home(&dir, inputs.home_dir.as_deref()));
    }
    if let Some(xdg) = inputs.xdg_cache_home.filter(|p| p.is_absolute()) {
        return Ok(xdg.join("ytx"));
    }
    if let Some(os_cache) = inputs.os_cache_dir {
        return Ok(os_cache.join("ytx"));
    }
    if let Some(home) = inputs.home_dir {
        return Ok(home.join(".cache").join("ytx"));
    }
    Err(Error::configuration(
        "Failed to determine a cache directory; set YTX_CACHE_DIR",
    ))
}

fn expand_home(path: &Path, home: Option<&Path>) -> PathBuf {
    match (path.strip_prefix("~"), home) {
        (Ok(rest), Some(home)) => home.join(rest),
        _ => path.to_path_buf(),
    }
}

static CACHE_ROOT: OnceLock<PathBuf> = OnceLock::new();

/// Process-wide cache root, resolved from the environment on first use
pub fn cache_root() -> Result<PathBuf> {
    if let Some(root) = CACHE_ROOT.get() {
        return Ok(root.clone());
    }
    let resolved = cache_root_from_inputs(CacheInputs::from_env())?;
    tracing::debug!(root = %resolved.display(), "Resolved cache root");
    Ok(CACHE_ROOT.get_or_init(|| resolved).clone())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sanitize_replaces_separators() {
        assert_eq!(sanitize_segment("a/b\\c"), "a_b_c");
    }

    #[test]
    fn test_sanitize_replaces_control_chars() {
        assert_eq!(sanitize_segment("a\nb\tc\u{0}"), "a_b_c_");
    }

    #[test]
    fn test_sanitize_strips_whitespace_and_dots() {
        assert_eq!(sanitize_segment("  name.. "), "name");
        assert_eq!(sanitize_segment("..hidden"), "hidden");
    }

    #[test]
    fn test_sanitize_empty_becomes_placeholder() {
        assert_eq!(sanitize_segment(""), "_");
        assert_eq!(sanitize_segment(".."), "_");
        assert_eq!(sanitize_segment("   "), "_");
    }

    #[test]
    fn test_sanitize_keeps_ordinary_names() {
        assert_eq!(sanitize_segment("large-v3"), "large-v3");
        assert_eq!(sanitize_segment("dQw4w9WgXcQ"), "dQw4w9WgXcQ");
    }

    #[test]
    fn test_relative_dir_layout() {
        let key = CacheKey::new("vid", "whisper", "small", "abc");
        assert_eq!(key.relative_dir(), PathBuf::from("vid/whisper/small/abc"));
    }

    #[test]
    fn test_relative_dir_cannot_escape() {
        let key = CacheKey::new("../etc", "a/b", "..", "h");
        let rel = key.relative_dir();
        assert_eq!(rel.components().count(), 4);
        assert!(!rel.to_string_lossy().contains(".."));
    }

    #[test]
    fn test_for_config_uses_engine_and_model() {
        let config = AppConfig::for_engine("gemini");
        let key = CacheKey::for_config("vid", &config).unwrap();
        assert_eq!(key.engine, "gemini");
        assert_eq!(key.model, "gemini-2.5-flash");
        assert_eq!(key.config_hash, config.config_hash().unwrap());
    }

    #[test]
    fn test_artifact_paths_file_names() {
        let paths = ArtifactPaths::in_dir("/tmp/x");
        assert_eq!(paths.transcript_json, PathBuf::from("/tmp/x/transcript.json"));
        assert_eq!(paths.captions_srt, PathBuf::from("/tmp/x/captions.srt"));
        assert_eq!(paths.meta_json, PathBuf::from("/tmp/x/meta.json"));
    }

    #[test]
    fn cache_root_respects_override() {
        let inputs = CacheInputs {
            ytx_cache_dir: Some(PathBuf::from("/data/ytx")),
            xdg_cache_home: Some(PathBuf::from("/xdg")),
            os_cache_dir: Some(PathBuf::from("/os")),
            home_dir: Some(PathBuf::from("/home/u")),
        };
        assert_eq!(
            cache_root_from_inputs(inputs).unwrap(),
            PathBuf::from("/data/ytx")
        );
    }

    #[test]
    fn cache_root_expands_tilde_override() {
        let inputs = CacheInputs {
            ytx_cache_dir: Some(PathBuf::from("~/ytx-cache")),
            home_dir: Some(PathBuf::from("/home/u")),
            ..CacheInputs::default()
        };
        assert_eq!(
            cache_root_from_inputs(inputs).unwrap(),
            PathBuf::from("/home/u/ytx-cache")
        );
    }

    #[test]
    fn cache_root_prefers_xdg() {
        let inputs = CacheInputs {
            xdg_cache_home: Some(PathBuf::from("/xdg")),
            os_cache_dir: Some(PathBuf::from("/os")),
            home_dir: Some(PathBuf::from("/home/u")),
            ..CacheInputs::default()
        };
        assert_eq!(cache_root_from_inputs(inputs).unwrap(), PathBuf::from("/xdg/ytx"));
    }

    #[test]
    fn cache_root_falls_back_to_home() {
        let inputs = CacheInputs {
            home_dir: Some(PathBuf::from("/home/u")),
            ..CacheInputs::default()
        };
        assert_eq!(
            cache_root_from_inputs(inputs).unwrap(),
            PathBuf::from("/home/u/.cache/ytx")
        );
    }

    #[test]
    fn cache_root_errors_without_any_input() {
        assert!(cache_root_from_inputs(CacheInputs::default()).is_err());
    }

    #[test]
    fn cache_inputs_read_environment() {
        temp_env::with_vars(
            [
                ("YTX_CACHE_DIR", Some("/override")),
                ("XDG_CACHE_HOME", Some("  ")),
            ],
            || {
                let inputs = CacheInputs::from_env();
                assert_eq!(inputs.ytx_cache_dir, Some(PathBuf::from("/override")));
                assert_eq!(inputs.xdg_cache_home, None);
            },
        );
    }
}
