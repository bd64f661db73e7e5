//! Integration tests for the artifact store lifecycle

use std::fs;
use std::time::Duration;
use tempfile::TempDir;
use ytx_cache::{ArtifactStore, CacheKey, RequestedEngine};
use ytx_core::{AppConfig, Chapter, Summary, TranscriptDoc, TranscriptSegment, VideoMetadata};

fn video(id: &str) -> VideoMetadata {
    VideoMetadata {
        id: id.into(),
        title: format!("Video {id}"),
        duration: Some(4.0),
        url: format!("https://www.youtube.com/watch?v={id}"),
        uploader: None,
        chapters: Vec::new(),
    }
}

fn transcript(video: &VideoMetadata, config: &AppConfig) -> TranscriptDoc {
    TranscriptDoc {
        video_id: video.id.clone(),
        source_url: video.url.clone(),
        title: Some(video.title.clone()),
        duration: video.duration,
        language: Some("en".into()),
        engine: config.engine.clone(),
        model: config.model.clone(),
        segments: vec![
            TranscriptSegment::new(0, 0.0, 2.0, "first").unwrap(),
            TranscriptSegment::new(1, 2.0, 4.0, "second").unwrap(),
        ],
        chapters: None,
        summary: None,
    }
}

#[test]
fn default_store_uses_override_directory() {
    let tmp = TempDir::new().unwrap();
    temp_env::with_var("YTX_CACHE_DIR", Some(tmp.path()), || {
        let store = ArtifactStore::open_default().unwrap();
        assert_eq!(store.root(), tmp.path());
    });
}

#[test]
fn transcript_only_directory_is_not_a_hit() {
    let tmp = TempDir::new().unwrap();
    let store = ArtifactStore::new(tmp.path());
    let config = AppConfig::default();
    let v = video("abc");
    let key = CacheKey::for_config(&v.id, &config).unwrap();
    let paths = store.resolve(&key, true).unwrap();

    store.write_transcript(&paths, &transcript(&v, &config)).unwrap();
    assert!(fs::metadata(&paths.transcript_json).unwrap().len() > 0);
    assert!(!paths.captions_srt.exists());
    assert!(!store.exists(&paths));
}

#[test]
fn full_lifecycle() {
    let tmp = TempDir::new().unwrap();
    let store = ArtifactStore::new(tmp.path());
    let config = AppConfig::default();

    for id in ["one", "two"] {
        let v = video(id);
        let key = CacheKey::for_config(&v.id, &config).unwrap();
        let paths = store.resolve(&key, true).unwrap();
        let meta = store.build_metadata(
            &key,
            Some(&v),
            Some(RequestedEngine {
                engine: config.engine.clone(),
                model: config.model.clone(),
            }),
        );
        assert!(!meta.fell_back);
        store.persist(&paths, &transcript(&v, &config), &meta).unwrap();
    }

    let entries = store.enumerate().unwrap();
    assert_eq!(entries.len(), 2);
    assert_eq!(entries[1].url.as_deref(), Some("https://www.youtube.com/watch?v=two"));

    let bytes_one: u64 = entries
        .iter()
        .filter(|e| e.key.video_id == "one")
        .map(|e| e.size_bytes)
        .sum();
    assert_eq!(store.clear(Some("one")).unwrap(), (1, bytes_one));
    assert_eq!(store.clear(Some("one")).unwrap(), (0, 0));

    // Nothing is older than an hour yet
    assert!(store.expire(Duration::from_secs(3600)).unwrap().is_empty());
    assert_eq!(store.stats().unwrap().entries, 1);
}

#[test]
fn chapters_and_summary_read_back_as_a_hit() {
    let tmp = TempDir::new().unwrap();
    let store = ArtifactStore::new(tmp.path());
    let config = AppConfig::default();
    let v = video("chaptered");
    let key = CacheKey::for_config(&v.id, &config).unwrap();
    let paths = store.resolve(&key, true).unwrap();

    let mut doc = transcript(&v, &config);
    doc.chapters = Some(vec![Chapter {
        title: Some("Intro".into()),
        start: 0.0,
        end: 4.0,
    }]);
    doc.summary = Some(Summary {
        tldr: "Two lines".into(),
        bullets: vec!["first".into(), "second".into()],
    });
    store
        .persist(&paths, &doc, &store.build_metadata(&key, Some(&v), None))
        .unwrap();

    assert_eq!(store.read_transcript(&paths).unwrap(), doc);
}
