//! WAV file audio producer.
//!
//! The live capture device is an external collaborator; for pipe mode and
//! tests the producer side is a WAV file (or stdin), downmixed and
//! resampled to the pipeline rate, then appended chunk by chunk the way a
//! real device would deliver it.

use std::io::Read;
use std::path::Path;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crate::error::{Result, ScribecastError};

/// Chunk duration used when feeding samples downstream, in milliseconds.
const FEED_CHUNK_MS: u64 = 100;

/// Decoded WAV audio normalized to mono f32 at a target rate.
pub struct WavSource {
    samples: Vec<f32>,
    sample_rate: u32,
}

impl WavSource {
    /// Parses WAV data from any reader.
    ///
    /// Accepts 16-bit integer or 32-bit float samples, any channel count
    /// (downmixed to mono), any rate (linear resample to `target_rate`).
    pub fn from_reader(reader: Box<dyn Read + Send>, target_rate: u32) -> Result<Self> {
        let mut wav_reader =
            hound::WavReader::new(reader).map_err(|e| ScribecastError::AudioSource {
                message: format!("Failed to parse WAV file: {}", e),
            })?;

        let spec = wav_reader.spec();
        let source_rate = spec.sample_rate;
        let channels = spec.channels.max(1) as usize;

        let raw: Vec<f32> = match spec.sample_format {
            hound::SampleFormat::Float => wav_reader
                .samples::<f32>()
                .collect::<std::result::Result<Vec<_>, _>>()
                .map_err(|e| ScribecastError::AudioSource {
                    message: format!("Failed to read WAV samples: {}", e),
                })?,
            hound::SampleFormat::Int => wav_reader
                .samples::<i16>()
                .map(|s| s.map(|v| v as f32 / 32768.0))
                .collect::<std::result::Result<Vec<_>, _>>()
                .map_err(|e| ScribecastError::AudioSource {
                    message: format!("Failed to read WAV samples: {}", e),
                })?,
        };

        // Downmix interleaved channels to mono
        let mono: Vec<f32> = if channels > 1 {
            raw.chunks_exact(channels)
                .map(|frame| frame.iter().sum::<f32>() / channels as f32)
                .collect()
        } else {
            raw
        };

        let samples = if source_rate != target_rate {
            resample(&mono, source_rate, target_rate)
        } else {
            mono
        };

        Ok(Self {
            samples,
            sample_rate: target_rate,
        })
    }

    /// Parses a WAV file from disk.
    pub fn from_path(path: &Path, target_rate: u32) -> Result<Self> {
        let file = std::fs::File::open(path).map_err(|e| ScribecastError::AudioSource {
            message: format!("Failed to open {}: {}", path.display(), e),
        })?;
        Self::from_reader(Box::new(file), target_rate)
    }

    /// Reads WAV data from stdin.
    pub fn from_stdin(target_rate: u32) -> Result<Self> {
        use std::io::Cursor;

        // Read all data from stdin into memory first (StdinLock is not Send)
        let mut buffer = Vec::new();
        std::io::stdin()
            .lock()
            .read_to_end(&mut buffer)
            .map_err(|e| ScribecastError::AudioSource {
                message: format!("Failed to read from stdin: {}", e),
            })?;

        Self::from_reader(Box::new(Cursor::new(buffer)), target_rate)
    }

    /// The decoded samples.
    pub fn samples(&self) -> &[f32] {
        &self.samples
    }

    /// Consumes the source and returns its samples.
    pub fn into_samples(self) -> Vec<f32> {
        self.samples
    }

    /// Audio duration at the target rate.
    pub fn duration(&self) -> Duration {
        Duration::from_secs_f64(self.samples.len() as f64 / self.sample_rate as f64)
    }

    /// Feeds the samples to `sink` from a producer thread, 100ms at a time.
    ///
    /// With `pace` set, chunks are delivered at real-time speed, simulating
    /// a live capture device; without it the whole file is pushed as fast
    /// as the sink accepts it.
    pub fn stream_with<F>(self, pace: bool, mut sink: F) -> JoinHandle<()>
    where
        F: FnMut(&[f32]) + Send + 'static,
    {
        let chunk_len = ((self.sample_rate as u64 * FEED_CHUNK_MS / 1000) as usize).max(1);
        thread::spawn(move || {
            for chunk in self.samples.chunks(chunk_len) {
                sink(chunk);
                if pace {
                    thread::sleep(Duration::from_millis(FEED_CHUNK_MS));
                }
            }
        })
    }
}

/// Simple linear interpolation resampling.
fn resample(samples: &[f32], from_rate: u32, to_rate: u32) -> Vec<f32> {
    if from_rate == to_rate || samples.is_empty() {
        return samples.to_vec();
    }

    let ratio = from_rate as f64 / to_rate as f64;
    let output_len = (samples.len() as f64 / ratio).ceil() as usize;

    (0..output_len)
        .map(|i| {
            let src_pos = i as f64 * ratio;
            let idx = src_pos as usize;
            let frac = (src_pos - idx as f64) as f32;

            let current = samples[idx.min(samples.len() - 1)];
            let next = samples[(idx + 1).min(samples.len() - 1)];
            current + (next - current) * frac
        })
        .collect()
}
