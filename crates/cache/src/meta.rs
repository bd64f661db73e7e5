//! Metadata record stored next to every transcript

use crate::paths::CacheKey;
use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use ytx_core::VideoMetadata;

/// Source information copied from the media source
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceInfo {
    /// Video URL
    pub url: String,
    /// Video title
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    /// Duration in seconds
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration: Option<f64>,
    /// Channel or uploader
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uploader: Option<String>,
}

impl From<&VideoMetadata> for SourceInfo {
    fn from(video: &VideoMetadata) -> Self {
        Self {
            url: video.url.clone(),
            title: Some(video.title.clone()).filter(|t| !t.is_empty()),
            duration: video.duration,
            uploader: video.uploader.clone(),
        }
    }
}

/// Engine and model the caller originally asked for
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestedEngine {
    /// Requested engine
    pub engine: String,
    /// Requested model
    pub model: String,
}

/// Contents of `meta.json`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArtifactMeta {
    /// When the artifact set was written (UTC, `Z` suffix)
    #[serde(serialize_with = "serialize_utc", deserialize_with = "deserialize_utc")]
    pub created_at: DateTime<Utc>,
    /// ytx version that wrote the entry
    pub ytx_version: String,
    /// Video identifier
    pub video_id: String,
    /// Engine that produced the transcript
    pub engine: String,
    /// Model that produced the transcript
    pub model: String,
    /// Configuration hash of the entry
    pub config_hash: String,
    /// Source information
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<SourceInfo>,
    /// Originally requested engine and model, when they differ from the ones used
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub requested: Option<RequestedEngine>,
    /// Whether the transcript came from the fallback engine
    #[serde(default)]
    pub fell_back: bool,
}

impl ArtifactMeta {
    /// Cache key described by this record
    #[must_use]
    pub fn key(&self) -> CacheKey {
        CacheKey::new(
            self.video_id.clone(),
            self.engine.clone(),
            self.model.clone(),
            self.config_hash.clone(),
        )
    }
}

fn serialize_utc<S: Serializer>(value: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&value.to_rfc3339_opts(SecondsFormat::Secs, true))
}

fn deserialize_utc<'de, D: Deserializer<'de>>(deserializer: D) -> Result<DateTime<Utc>, D::Error> {
    let raw = String::deserialize(deserializer)?;
    DateTime::parse_from_rfc3339(&raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(serde::de::Error::custom)
}
