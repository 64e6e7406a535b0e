//! Wire protocol
//!
//! `ClientMessage` / `ServerMessage` serde enums implement §6's JSON tables
//! exactly: tagged on `type`, with `#[serde(rename_all = "snake_case")]` tag
//! values matching the spec's string literals. Binary frames (audio chunks)
//! carry no envelope and are handled separately by the transport layer.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Control messages recognized on the text channel (§4.8).
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    Options {
        #[serde(default)]
        hiragana: bool,
        #[serde(default)]
        translation: bool,
    },
    End,
    Ping,
}

#[derive(Debug, Clone, Serialize)]
pub struct TranscriptionPayload {
    pub confirmed: String,
    pub tentative: String,
    pub full_text: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct TextPairPayload {
    pub confirmed: String,
    pub tentative: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct PerformancePayload {
    pub transcription_time: f64,
    pub total_time: f64,
    pub accumulated_audio_seconds: f64,
    pub session_elapsed_seconds: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct StatisticsPayload {
    pub chunk_count: u64,
    pub audio_duration_seconds: f64,
    pub confirmed_text_length: usize,
}

/// Server-to-client event table (§6).
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    Connected {
        session_id: String,
        message: String,
    },
    OptionsReceived,
    Pong,
    Accumulating {
        chunk_id: u64,
        accumulated_seconds: f64,
        session_elapsed_seconds: f64,
        chunks_until_transcription: u64,
    },
    TranscriptionUpdate {
        chunk_id: u64,
        transcription: TranscriptionPayload,
        #[serde(skip_serializing_if = "Option::is_none")]
        hiragana: Option<TextPairPayload>,
        #[serde(skip_serializing_if = "Option::is_none")]
        translation: Option<TextPairPayload>,
        performance: PerformancePayload,
        is_final: bool,
    },
    Skipped {
        chunk_id: u64,
        reason: String,
        message: String,
    },
    Error {
        message: String,
    },
    SessionEnd {
        transcription: TranscriptionPayload,
        #[serde(skip_serializing_if = "Option::is_none")]
        hiragana: Option<TextPairPayload>,
        #[serde(skip_serializing_if = "Option::is_none")]
        translation: Option<TextPairPayload>,
        statistics: StatisticsPayload,
        is_final: bool,
    },
}

impl ServerMessage {
    pub fn to_json(&self) -> String {
        serde_json::to_string(self).expect("ServerMessage is always serializable")
    }
}

/// Malformed control frames / unsupported audio formats.
#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("malformed control message: {message}")]
    MalformedControlMessage { message: String },

    #[error("unsupported audio format: {message}")]
    UnsupportedAudioFormat { message: String },
}
