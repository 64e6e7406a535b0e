//! Per-session state (C4)
//!
//! Owns the confirmed/tentative text invariants, the audio accumulator, and
//! (per the Statistics supplement) a bounded ledger of per-chunk records used
//! to build translation context and the final `session_end` statistics.
//! Grounded in `original_source/app/services/session_manager.py`'s `Session`.

use crate::audio::AudioAccumulator;
use crate::config::Config;
use chrono::{DateTime, Utc};
use std::collections::VecDeque;

/// Per-session `{hiragana, translation}` toggles, defaulting to both false.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ProcessingOptions {
    pub hiragana: bool,
    pub translation: bool,
}

/// One ingested-and-transcribed chunk's record, per
/// `original_source`'s `ChunkData`.
#[derive(Debug, Clone)]
pub struct ChunkData {
    pub chunk_id: u64,
    pub timestamp: DateTime<Utc>,
    pub original_text: String,
    pub hiragana_text: Option<String>,
    pub translated_text: Option<String>,
    pub processing_time_ms: u64,
}

/// Read-only snapshot for introspection (`Registry::session_info`).
#[derive(Debug, Clone)]
pub struct SessionInfo {
    pub session_id: String,
    pub chunk_count: u64,
    pub confirmed_text_length: usize,
    pub created_at: DateTime<Utc>,
    pub last_updated: DateTime<Utc>,
}

pub struct SessionState {
    pub session_id: String,
    pub confirmed_text: String,
    pub confirmed_hiragana: String,
    pub last_transcription: String,
    pub previous_full_text: String,
    pub stable_count: u32,
    pub stable_threshold: u32,
    pub chunk_count: u64,
    pub created_at: DateTime<Utc>,
    pub last_updated: DateTime<Utc>,
    pub processing_options: ProcessingOptions,
    pub accumulator: AudioAccumulator,
    max_chunks_in_memory: usize,
    chunks: VecDeque<ChunkData>,
}

impl SessionState {
    pub fn new(session_id: String, config: &Config) -> Self {
        let now = Utc::now();
        Self {
            session_id,
            confirmed_text: String::new(),
            confirmed_hiragana: String::new(),
            last_transcription: String::new(),
            previous_full_text: String::new(),
            stable_count: 0,
            stable_threshold: config.buffer.stable_text_threshold,
            chunk_count: 0,
            created_at: now,
            last_updated: now,
            processing_options: ProcessingOptions::default(),
            accumulator: AudioAccumulator::new(config.buffer),
            max_chunks_in_memory: config.max_chunks_per_session,
            chunks: VecDeque::new(),
        }
    }

    pub fn touch(&mut self) {
        self.last_updated = Utc::now();
    }

    pub fn is_expired(&self, timeout: chrono::Duration) -> bool {
        Utc::now() - self.last_updated > timeout
    }

    /// Append a per-chunk record, evicting the oldest half (FIFO) when the
    /// in-memory ledger reaches `max_chunks_per_session`. `chunk_count` is
    /// unaffected — it is a monotonic session-lifetime counter independent
    /// of in-memory retention.
    pub fn record_chunk(&mut self, record: ChunkData) {
        if self.chunks.len() >= self.max_chunks_in_memory {
            let evict = self.chunks.len() / 2;
            for _ in 0..evict.max(1) {
                self.chunks.pop_front();
            }
        }
        self.chunks.push_back(record);
    }

    /// Join of the most recent `n` chunks' original text, used to build the
    /// translation context window.
    pub fn get_context_text(&self, n: usize) -> String {
        self.chunks.iter().rev().take(n).rev().map(|c| c.original_text.as_str()).collect::<Vec<_>>().join("")
    }

    pub fn get_session_info(&self) -> SessionInfo {
        SessionInfo {
            session_id: self.session_id.clone(),
            chunk_count: self.chunk_count,
            confirmed_text_length: self.confirmed_text.chars().count(),
            created_at: self.created_at,
            last_updated: self.last_updated,
        }
    }
}
