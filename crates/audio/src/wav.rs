//! WAV probing, slicing and sample loading

use crate::{Error, Result};
use hound::{SampleFormat, WavReader, WavSpec, WavWriter};
use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

/// Sample rate expected by speech models
pub const TARGET_SAMPLE_RATE: u32 = 16_000;

fn open(path: &Path) -> Result<WavReader<BufReader<File>>> {
    WavReader::open(path).map_err(|e| Error::wav(e, path))
}

fn duration_of<R: std::io::Read>(reader: &WavReader<R>) -> f64 {
    f64::from(reader.duration()) / f64::from(reader.spec().sample_rate)
}

/// Duration of a WAV file in seconds, from its header
///
/// # Errors
///
/// Returns [`Error::Wav`] if the file is missing or not a valid WAV file.
pub fn probe_duration(path: &Path) -> Result<f64> {
    let reader = open(path)?;
    Ok(duration_of(&reader))
}

/// Copy `[start, end)` of `source` into an independent WAV file at `destination`
///
/// `end` is clamped to the source duration. The destination is replaced
/// atomically and the source is only ever read.
///
/// # Errors
///
/// Returns [`Error::InvalidRange`] for an empty or out-of-bounds range,
/// [`Error::InPlace`] when both paths are the same file, and WAV or I/O
/// errors from reading and writing.
pub fn slice_segment(source: &Path, destination: &Path, start: f64, end: f64) -> Result<PathBuf> {
    if same_file(source, destination) {
        return Err(Error::InPlace {
            path: source.to_path_buf(),
        });
    }

    let mut reader = open(source)?;
    let spec = reader.spec();
    let duration = duration_of(&reader);
    let clamped_end = end.min(duration);
    if !start.is_finite() || !end.is_finite() || start < 0.0 || start >= duration || clamped_end <= start {
        return Err(Error::InvalidRange {
            start,
            end,
            duration,
        });
    }

    let rate = f64::from(spec.sample_rate);
    let first_frame = (start * rate).floor() as u32;
    let last_frame = ((clamped_end * rate).ceil() as u32).min(reader.duration());
    let frames = last_frame.saturating_sub(first_frame);
    reader
        .seek(first_frame)
        .map_err(|e| Error::io(e, source, "seek"))?;

    let dir = destination
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    std::fs::create_dir_all(dir).map_err(|e| Error::io(e, dir, "create_dir_all"))?;
    let mut tmp = NamedTempFile::new_in(dir).map_err(|e| Error::io(e, dir, "create_temp"))?;

    {
        let sink = BufWriter::new(tmp.as_file_mut());
        let mut writer = WavWriter::new(sink, spec).map_err(|e| Error::wav(e, destination))?;
        let samples = u64::from(frames) * u64::from(spec.channels);
        copy_samples(&mut reader, &mut writer, spec, samples, source)?;
        writer.finalize().map_err(|e| Error::wav(e, destination))?;
    }

    tmp.persist(destination)
        .map_err(|e| Error::io(e.error, destination, "persist"))?;
    tracing::debug!(
        source = %source.display(),
        destination = %destination.display(),
        start,
        end = clamped_end,
        "Sliced audio segment"
    );
    Ok(destination.to_path_buf())
}

fn copy_samples<R, W>(
    reader: &mut WavReader<R>,
    writer: &mut WavWriter<W>,
    spec: WavSpec,
    count: u64,
    source: &Path,
) -> Result<()>
where
    R: std::io::Read,
    W: std::io::Write + std::io::Seek,
{
    match (spec.sample_format, spec.bits_per_sample) {
        (SampleFormat::Int, 8) => copy_typed::<i8, _, _>(reader, writer, count, source),
        (SampleFormat::Int, 16) => copy_typed::<i16, _, _>(reader, writer, count, source),
        (SampleFormat::Int, 24 | 32) => copy_typed::<i32, _, _>(reader, writer, count, source),
        (SampleFormat::Float, 32) => copy_typed::<f32, _, _>(reader, writer, count, source),
        (format, bits) => Err(Error::unsupported(
            source,
            format!("{bits}-bit {format:?} samples"),
        )),
    }
}

fn copy_typed<S, R, W>(
    reader: &mut WavReader<R>,
    writer: &mut WavWriter<W>,
    count: u64,
    source: &Path,
) -> Result<()>
where
    S: hound::Sample + Copy,
    R: std::io::Read,
    W: std::io::Write + std::io::Seek,
{
    let count = usize::try_from(count).unwrap_or(usize::MAX);
    for sample in reader.samples::<S>().take(count) {
        let sample = sample.map_err(|e| Error::wav(e, source))?;
        writer.write_sample(sample).map_err(|e| Error::wav(e, source))?;
    }
    Ok(())
}

/// Decode a WAV file into mono `f32` samples in `[-1, 1]`
///
/// Multi-channel audio is averaged down to one channel. The sample rate must
/// be [`TARGET_SAMPLE_RATE`]; resampling is the transcoder's job.
///
/// # Errors
///
/// Returns [`Error::UnsupportedFormat`] for other sample rates or bit
/// depths and [`Error::Wav`] for decoding failures.
pub fn load_pcm_f32(path: &Path) -> Result<Vec<f32>> {
    let reader = open(path)?;
    let spec = reader.spec();
    if spec.sample_rate != TARGET_SAMPLE_RATE {
        return Err(Error::unsupported(
            path,
            format!("sample rate {} Hz, expected {TARGET_SAMPLE_RATE} Hz", spec.sample_rate),
        ));
    }

    let samples: Vec<f32> = match (spec.sample_format, spec.bits_per_sample) {
        (SampleFormat::Int, bits @ (8 | 16 | 24 | 32)) => {
            let scale = (1u64 << (bits - 1)) as f32;
            reader
                .into_samples::<i32>()
                .map(|s| s.map(|v| v as f32 / scale))
                .collect::<std::result::Result<_, _>>()
                .map_err(|e| Error::wav(e, path))?
        }
        (SampleFormat::Float, 32) => reader
            .into_samples::<f32>()
            .collect::<std::result::Result<_, _>>()
            .map_err(|e| Error::wav(e, path))?,
        (format, bits) => {
            return Err(Error::unsupported(
                path,
                format!("{bits}-bit {format:?} samples"),
            ));
        }
    };

    let channels = usize::from(spec.channels.max(1));
    if channels == 1 {
        return Ok(samples);
    }
    Ok(samples
        .chunks(channels)
        .map(|frame| frame.iter().sum::<f32>() / frame.len() as f32)
        .collect())
}

fn same_file(a: &Path, b: &Path) -> bool {
    match (a.canonicalize(), b.canonicalize()) {
        (Ok(a), Ok(b)) => a == b,
        _ => a == b,
    }
}
