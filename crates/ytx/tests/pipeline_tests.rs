//! End-to-end pipeline runs with in-process collaborators

use hound::{SampleFormat, WavSpec, WavWriter};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use tempfile::TempDir;
use ytx::{
    AppConfig, ArtifactStore, CachedTranscriptionPipeline, Error, MediaSource, ProgressReporter,
    VideoMetadata,
};
use ytx_audio::Transcoder;
use ytx_core::{Chapter, TranscriptSegment};
use ytx_engines::remote::GenerationRequest;
use ytx_engines::{
    AdapterKind, EngineError, EngineRegistry, GeminiEngine, GenerationClient, RetryPolicy,
    TranscriptionEngine, WHISPER_PRESETS,
};

const VIDEO_ID: &str = "dQw4w9WgXcQ";

struct FakeSource {
    fetches: AtomicUsize,
    downloads: AtomicUsize,
    fail: bool,
}

impl FakeSource {
    fn new() -> Arc<Self> {
        Arc::new(Self {
            fetches: AtomicUsize::new(0),
            downloads: AtomicUsize::new(0),
            fail: false,
        })
    }
}

impl MediaSource for FakeSource {
    fn fetch_metadata(&self, url: &str) -> ytx::Result<VideoMetadata> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            return Err(Error::media_source(url, "video unavailable"));
        }
        Ok(VideoMetadata {
            id: VIDEO_ID.to_string(),
            title: "Test video".to_string(),
            duration: Some(4.0),
            url: url.to_string(),
            uploader: Some("tester".to_string()),
            chapters: vec![Chapter {
                title: Some("Intro".to_string()),
                start: 0.0,
                end: 2.0,
            }],
        })
    }

    fn download_audio(&self, _video: &VideoMetadata, out_dir: &Path) -> ytx::Result<PathBuf> {
        self.downloads.fetch_add(1, Ordering::SeqCst);
        let path = out_dir.join("download.wav");
        let spec = WavSpec {
            channels: 1,
            sample_rate: 16_000,
            bits_per_sample: 16,
            sample_format: SampleFormat::Int,
        };
        let mut writer = WavWriter::create(&path, spec).unwrap();
        for i in 0..(16_000 * 4) {
            writer.write_sample((i % 500) as i16).unwrap();
        }
        writer.finalize().unwrap();
        Ok(path)
    }
}

/// Already-canonical input: normalizing is a copy
struct CopyTranscoder;

impl Transcoder for CopyTranscoder {
    fn normalize(&self, src: &Path, dst: &Path) -> ytx_audio::Result<PathBuf> {
        std::fs::copy(src, dst).map_err(|e| ytx_audio::Error::io(e, dst, "copy"))?;
        Ok(dst.to_path_buf())
    }
}

struct FixedClient {
    reply: fn() -> ytx_engines::Result<String>,
}

impl GenerationClient for FixedClient {
    fn generate(&self, _request: &GenerationRequest<'_>) -> ytx_engines::Result<String> {
        (self.reply)()
    }
}

struct LocalWhisper;

impl TranscriptionEngine for LocalWhisper {
    fn name(&self) -> &'static str {
        "whisper"
    }

    fn kind(&self) -> AdapterKind {
        AdapterKind::Local
    }

    fn default_model(&self) -> &'static str {
        "small"
    }

    fn is_valid_model(&self, model: &str) -> bool {
        WHISPER_PRESETS.contains(&model)
    }

    fn transcribe(
        &self,
        _audio: &Path,
        _config: &AppConfig,
    ) -> ytx_engines::Result<Vec<TranscriptSegment>> {
        Ok(vec![
            TranscriptSegment::new(0, 0.0, 2.0, "never gonna").unwrap(),
            TranscriptSegment::new(1, 2.0, 4.0, "give you up").unwrap(),
        ])
    }

    fn detect_language(&self, _audio: &Path, _config: &AppConfig) -> Option<String> {
        Some("en".to_string())
    }
}

fn gemini_ok() -> ytx_engines::Result<String> {
    Ok(r#"{"language":"en","segments":[{"start":0,"end":4,"text":"never gonna give you up"}]}"#.into())
}

fn gemini_down() -> ytx_engines::Result<String> {
    Err(EngineError::request("gemini", "503 Service Unavailable"))
}

fn registry(reply: fn() -> ytx_engines::Result<String>) -> Arc<EngineRegistry> {
    let mut registry = EngineRegistry::new();
    registry.register(Arc::new(
        GeminiEngine::new(Arc::new(FixedClient { reply })).with_retry(RetryPolicy::immediate(1)),
    ));
    registry.register(Arc::new(LocalWhisper));
    Arc::new(registry)
}

fn pipeline(
    root: &Path,
    config: AppConfig,
    source: Arc<FakeSource>,
    reply: fn() -> ytx_engines::Result<String>,
) -> CachedTranscriptionPipeline {
    CachedTranscriptionPipeline::new(
        config,
        ArtifactStore::new(root),
        source,
        Arc::new(CopyTranscoder),
        registry(reply),
    )
}

const URL: &str = "https://www.youtube.com/watch?v=dQw4w9WgXcQ";

#[test]
fn test_miss_then_hit() {
    let tmp = TempDir::new().unwrap();
    let source = FakeSource::new();
    let pipeline = pipeline(tmp.path(), AppConfig::for_engine("gemini"), source.clone(), gemini_ok);

    let first = pipeline.run(URL, &ProgressReporter::none()).unwrap();
    assert!(!first.cache_hit);
    assert!(!first.fell_back);
    assert_eq!(first.key.engine, "gemini");
    assert_eq!(first.key.model, "gemini-2.5-flash");
    assert_eq!(first.document.language.as_deref(), Some("en"));
    let chapters = first.document.chapters.as_deref().unwrap();
    assert_eq!(chapters[0].title.as_deref(), Some("Intro"));
    assert!(pipeline.store().exists(&first.paths));

    let second = pipeline.run(URL, &ProgressReporter::none()).unwrap();
    assert!(second.cache_hit);
    assert_eq!(second.document, first.document);
    assert_eq!(second.key, first.key);
    assert_eq!(source.downloads.load(Ordering::SeqCst), 1, "hits never download");
}

#[test]
fn test_gemini_failure_persists_under_whisper() {
    let tmp = TempDir::new().unwrap();
    let source = FakeSource::new();
    let pipeline = pipeline(tmp.path(), AppConfig::for_engine("gemini"), source, gemini_down);

    let outcome = pipeline.run(URL, &ProgressReporter::none()).unwrap();
    assert!(outcome.fell_back);
    assert_eq!(outcome.key.engine, "whisper");
    assert!(WHISPER_PRESETS.contains(&outcome.key.model.as_str()));
    assert_eq!(outcome.document.engine, "whisper");

    assert!(tmp.path().join(VIDEO_ID).join("whisper").is_dir());
    assert!(!tmp.path().join(VIDEO_ID).join("gemini").exists());

    let meta = pipeline.store().read_metadata(&outcome.paths).unwrap();
    assert!(meta.fell_back);
    assert_eq!(meta.engine, "whisper");
    assert_eq!(meta.requested.unwrap().engine, "gemini");
    assert_eq!(meta.source.unwrap().title.as_deref(), Some("Test video"));
}

#[test]
fn test_fallback_disabled_fails_without_artifacts() {
    let tmp = TempDir::new().unwrap();
    let mut config = AppConfig::for_engine("gemini");
    config.fallback = false;
    let pipeline = pipeline(tmp.path(), config, FakeSource::new(), gemini_down);

    let err = pipeline.run(URL, &ProgressReporter::none()).unwrap_err();
    assert!(matches!(err, Error::Engine(EngineError::Request { .. })));
    assert!(pipeline.store().enumerate().unwrap().is_empty());
}

#[test]
fn test_corrupted_entry_is_reprocessed() {
    let tmp = TempDir::new().unwrap();
    let source = FakeSource::new();
    let pipeline = pipeline(tmp.path(), AppConfig::default(), source.clone(), gemini_ok);

    let first = pipeline.run(URL, &ProgressReporter::none()).unwrap();
    std::fs::write(&first.paths.transcript_json, b"{\"video_id\": tru").unwrap();

    let second = pipeline.run(URL, &ProgressReporter::none()).unwrap();
    assert!(!second.cache_hit);
    assert_eq!(source.downloads.load(Ordering::SeqCst), 2);
    let reread = pipeline.store().read_transcript(&second.paths).unwrap();
    assert_eq!(reread, second.document);
}

#[test]
fn test_invalid_engine_rejected_before_fetch() {
    let tmp = TempDir::new().unwrap();
    let source = FakeSource::new();
    let pipeline = pipeline(tmp.path(), AppConfig::for_engine("deepgram"), source.clone(), gemini_ok);

    let err = pipeline.run(URL, &ProgressReporter::none()).unwrap_err();
    assert!(matches!(err, Error::Engine(ref e) if e.is_configuration()));
    assert_eq!(source.fetches.load(Ordering::SeqCst), 0);
}

#[test]
fn test_source_failure_surfaces() {
    let tmp = TempDir::new().unwrap();
    let source = Arc::new(FakeSource {
        fetches: AtomicUsize::new(0),
        downloads: AtomicUsize::new(0),
        fail: true,
    });
    let pipeline = pipeline(tmp.path(), AppConfig::default(), source, gemini_ok);

    let err = pipeline.run(URL, &ProgressReporter::none()).unwrap_err();
    assert!(matches!(err, Error::Source { .. }));
}

#[test]
fn test_progress_reaches_one() {
    let tmp = TempDir::new().unwrap();
    let pipeline = pipeline(tmp.path(), AppConfig::default(), FakeSource::new(), gemini_ok);
    let progress = ProgressReporter::new(|_| {});

    pipeline.run(URL, &progress).unwrap();
    assert!((progress.current() - 1.0).abs() < f64::EPSILON);
}

#[test]
fn test_clear_after_runs() {
    let tmp = TempDir::new().unwrap();
    let pipeline = pipeline(tmp.path(), AppConfig::default(), FakeSource::new(), gemini_ok);
    let outcome = pipeline.run(URL, &ProgressReporter::none()).unwrap();

    let (removed, freed) = pipeline.store().clear(Some(VIDEO_ID)).unwrap();
    assert_eq!(removed, 1);
    assert!(freed > 0);
    assert!(!pipeline.store().exists(&outcome.paths));
    assert_eq!(pipeline.store().clear(Some("unknown")).unwrap(), (0, 0));
}
