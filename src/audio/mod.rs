//! Audio accumulation
//!
//! Owns the per-session PCM buffer: chunk framing, duration-cap enforcement,
//! and WAV snapshotting for re-transcription passes.

pub mod accumulator;
pub mod wav;

pub use accumulator::{AppendOutcome, AudioAccumulator, AudioChunk};
