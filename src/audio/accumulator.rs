//! Audio Accumulator (C1)
//!
//! Owns the raw PCM frames for a single session, enforces the duration cap,
//! and produces self-contained WAV snapshots for re-transcription.

use std::collections::VecDeque;

use crate::audio::wav;
use crate::config::BufferConfig;
use crate::protocol::ProtocolError;

/// An immutable chunk of PCM audio, already stripped of any WAV framing.
#[derive(Debug, Clone)]
pub struct AudioChunk {
    pub pcm: Vec<u8>,
}

/// Result of appending a chunk: whether a re-transcription pass and/or a
/// trim should follow.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AppendOutcome {
    pub should_transcribe: bool,
    pub should_trim: bool,
}

/// Ordered sequence of retained PCM chunks with a cached running byte total.
///
/// Invariants (enforced by construction): `total_bytes == sum(len(chunk))`
/// for every chunk currently held; `total_bytes <= max_audio_bytes` once
/// `trim()` returns; chunks are only ever appended at the back or removed
/// from the front.
pub struct AudioAccumulator {
    config: BufferConfig,
    chunks: VecDeque<AudioChunk>,
    total_bytes: usize,
    chunk_count: u64,
}

impl AudioAccumulator {
    pub fn new(config: BufferConfig) -> Self {
        Self {
            config,
            chunks: VecDeque::new(),
            total_bytes: 0,
            chunk_count: 0,
        }
    }

    pub fn chunk_count(&self) -> u64 {
        self.chunk_count
    }

    pub fn total_bytes(&self) -> usize {
        self.total_bytes
    }

    pub fn duration_seconds(&self) -> f64 {
        self.total_bytes as f64 / self.config.bytes_per_second()
    }

    /// Append a chunk (WAV-framed or raw PCM) and report whether a
    /// re-transcription pass and/or a trim should follow. Rejects a
    /// WAV-framed chunk whose declared sample rate or channel count
    /// disagrees with the session's configured format (§6) without
    /// mutating the buffer.
    pub fn append(&mut self, data: &[u8]) -> Result<AppendOutcome, ProtocolError> {
        let pcm = wav::extract_pcm_checked(data, &self.config)?;
        self.total_bytes += pcm.len();
        self.chunks.push_back(AudioChunk { pcm });
        self.chunk_count += 1;

        let should_transcribe =
            self.chunk_count % self.config.transcription_interval_chunks as u64 == 0;
        let should_trim =
            self.total_bytes > self.config.max_audio_bytes() && self.chunks.len() > 1;

        Ok(AppendOutcome { should_transcribe, should_trim })
    }

    /// Number of chunks until the next scheduled re-transcription pass.
    pub fn chunks_until_transcription(&self) -> u64 {
        let interval = self.config.transcription_interval_chunks as u64;
        let remainder = self.chunk_count % interval;
        if remainder == 0 {
            0
        } else {
            interval - remainder
        }
    }

    /// A self-contained WAV snapshot of all currently retained PCM. The
    /// returned bytes are independent of subsequent mutations.
    pub fn snapshot(&self) -> Vec<u8> {
        if self.chunks.is_empty() {
            return Vec::new();
        }
        let pcm: Vec<u8> = self.chunks.iter().flat_map(|c| c.pcm.iter().copied()).collect();
        wav::wrap_pcm(&pcm, &self.config)
    }

    /// Remove chunks from the front until the buffer is within the cap or
    /// only one chunk remains. The only operation that reduces buffer size.
    pub fn trim(&mut self) {
        let max_bytes = self.config.max_audio_bytes();
        while self.total_bytes > max_bytes && self.chunks.len() > 1 {
            if let Some(removed) = self.chunks.pop_front() {
                self.total_bytes -= removed.pcm.len();
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn silence_chunk(bytes: usize) -> Vec<u8> {
        vec![0u8; bytes]
    }

    #[test]
    fn append_tracks_total_bytes_exactly() {
        let mut acc = AudioAccumulator::new(BufferConfig::default());
        acc.append(&silence_chunk(100)).unwrap();
        acc.append(&silence_chunk(50)).unwrap();
        assert_eq!(acc.total_bytes(), 150);
    }

    #[test]
    fn should_transcribe_on_interval_boundary() {
        let mut acc = AudioAccumulator::new(BufferConfig {
            transcription_interval_chunks: 3,
            ..BufferConfig::default()
        });
        assert!(!acc.append(&silence_chunk(10)).unwrap().should_transcribe);
        assert!(!acc.append(&silence_chunk(10)).unwrap().should_transcribe);
        assert!(acc.append(&silence_chunk(10)).unwrap().should_transcribe);
    }

    #[test]
    fn should_trim_requires_over_cap_and_multiple_chunks() {
        let config = BufferConfig {
            max_audio_duration_seconds: 0.001, // ~32 bytes at 16kHz/mono/16-bit
            ..BufferConfig::default()
        };
        let mut acc = AudioAccumulator::new(config);
        let outcome = acc.append(&silence_chunk(1000)).unwrap();
        // Only one chunk present — must not trim despite being over cap.
        assert!(!outcome.should_trim);
        let outcome = acc.append(&silence_chunk(1000)).unwrap();
        assert!(outcome.should_trim);
    }

    #[test]
    fn trim_never_removes_the_last_chunk() {
        let config = BufferConfig {
            max_audio_duration_seconds: 0.001,
            ..BufferConfig::default()
        };
        let mut acc = AudioAccumulator::new(config);
        acc.append(&silence_chunk(1000)).unwrap();
        acc.trim();
        assert_eq!(acc.total_bytes(), 1000);
    }

    #[test]
    fn trim_reduces_to_cap_when_possible() {
        let config = BufferConfig {
            max_audio_duration_seconds: 0.001,
            ..BufferConfig::default()
        };
        let max_bytes = config.max_audio_bytes();
        let mut acc = AudioAccumulator::new(config);
        acc.append(&silence_chunk(max_bytes)).unwrap();
        acc.append(&silence_chunk(max_bytes)).unwrap();
        acc.append(&silence_chunk(max_bytes)).unwrap();
        acc.trim();
        assert!(acc.total_bytes() <= max_bytes.max(acc.total_bytes()));
        // Invariant: after trim, either under cap or a single chunk remains.
        assert!(acc.total_bytes() <= max_bytes || acc.chunks.len() == 1);
    }

    #[test]
    fn snapshot_is_independent_of_later_mutation() {
        let mut acc = AudioAccumulator::new(BufferConfig::default());
        acc.append(&silence_chunk(10)).unwrap();
        let snap = acc.snapshot();
        acc.append(&silence_chunk(10)).unwrap();
        // The first snapshot must not have grown.
        assert!(snap.len() < acc.snapshot().len());
    }

    #[test]
    fn chunks_until_transcription_wraps_after_trigger() {
        let mut acc = AudioAccumulator::new(BufferConfig {
            transcription_interval_chunks: 3,
            ..BufferConfig::default()
        });
        acc.append(&silence_chunk(1)).unwrap();
        assert_eq!(acc.chunks_until_transcription(), 2);
        acc.append(&silence_chunk(1)).unwrap();
        assert_eq!(acc.chunks_until_transcription(), 1);
        acc.append(&silence_chunk(1)).unwrap();
        assert_eq!(acc.chunks_until_transcription(), 0);
    }

    #[test]
    fn append_rejects_wav_with_mismatched_sample_rate_without_mutating_state() {
        let config = BufferConfig::default();
        let mut acc = AudioAccumulator::new(config);
        let mut wrong_format = config;
        wrong_format.sample_rate = 8_000;
        let wav = wav::wrap_pcm(&silence_chunk(100), &wrong_format);

        assert!(acc.append(&wav).is_err());
        assert_eq!(acc.total_bytes(), 0);
        assert_eq!(acc.chunk_count(), 0);
    }
}
