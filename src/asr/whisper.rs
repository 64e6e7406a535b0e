//! Whisper ASR engine
//!
//! Runs whole-utterance re-transcription passes through whisper.cpp via
//! `whisper-rs`, seeded with the initial prompt the session builds from
//! already-confirmed text. Grounded in the corpus's `whisper-rs` usage
//! pattern (`WhisperContext`/`WhisperState`/`FullParams`), adapted to a
//! stateless-per-call shape: each pass reinitializes the state, since the
//! accumulator hands over the complete buffer every time rather than an
//! incremental delta.

use crate::asr::invoker::AsrInvoker;
use crate::asr::types::{AsrError, AsrResult};
use async_trait::async_trait;
use std::sync::{Arc, Mutex};
use tracing::{debug, info};
use whisper_rs::{FullParams, SamplingStrategy, WhisperContext, WhisperContextParameters};

#[derive(Debug, Clone)]
pub struct WhisperEngineConfig {
    pub model_path: String,
    pub beam_size: usize,
    pub temperature: f32,
    pub language: Option<String>,
}

/// Whisper-backed [`AsrInvoker`]. `WhisperState` is not `Sync`, so calls are
/// serialized behind a mutex. Inference itself runs on a blocking thread
/// (`tokio::task::spawn_blocking`) so a transcription pass never stalls the
/// async runtime's worker threads while the session scheduler's worker pool
/// bounds how many passes are in flight across sessions.
pub struct WhisperAsrInvoker {
    config: WhisperEngineConfig,
    context: Arc<WhisperContext>,
    state: Arc<Mutex<()>>,
}

impl WhisperAsrInvoker {
    pub fn new(config: WhisperEngineConfig) -> Result<Self, AsrError> {
        if !std::path::Path::new(&config.model_path).exists() {
            return Err(AsrError::ModelNotFound { path: config.model_path.clone() });
        }

        info!(model_path = %config.model_path, "loading whisper model");
        let context = WhisperContext::new_with_params(&config.model_path, WhisperContextParameters::default())
            .map_err(|e| AsrError::ModelLoadFailed { message: e.to_string() })?;

        Ok(Self { config, context: Arc::new(context), state: Arc::new(Mutex::new(())) })
    }

    fn pcm_i16_to_f32(pcm: &[u8]) -> Vec<f32> {
        pcm.chunks_exact(2)
            .map(|b| i16::from_le_bytes([b[0], b[1]]) as f32 / 32768.0)
            .collect()
    }
}

/// Strips whitespace (half- or full-width) that separates two digits, e.g.
/// `"1 2 3"` -> `"123"`. Mirrors
/// `original_source/app/services/async_processor.py`'s
/// `re.sub(r"(?<=\d)[\s　]+(?=\d)", "", text)`, applied to the segments once
/// they're joined into the full transcript (§4.5).
fn collapse_digit_whitespace(text: &str) -> String {
    let chars: Vec<char> = text.chars().collect();
    let mut out = String::with_capacity(text.len());
    let mut i = 0;
    while i < chars.len() {
        let c = chars[i];
        if c.is_whitespace() || c == '\u{3000}' {
            let mut j = i;
            while j < chars.len() && (chars[j].is_whitespace() || chars[j] == '\u{3000}') {
                j += 1;
            }
            let prev_is_digit = out.chars().last().map(|p| p.is_ascii_digit()).unwrap_or(false);
            let next_is_digit = j < chars.len() && chars[j].is_ascii_digit();
            if prev_is_digit && next_is_digit {
                i = j;
                continue;
            }
            out.extend(&chars[i..j]);
            i = j;
            continue;
        }
        out.push(c);
        i += 1;
    }
    out
}

#[async_trait]
impl AsrInvoker for WhisperAsrInvoker {
    async fn transcribe(&self, wav_bytes: &[u8], initial_prompt: Option<&str>) -> Result<AsrResult, AsrError> {
        let pcm = crate::audio::wav::extract_pcm(wav_bytes);
        if pcm.is_empty() {
            return Ok(AsrResult { text: String::new(), language: "ja".to_string() });
        }
        let samples = Self::pcm_i16_to_f32(&pcm);

        let context = self.context.clone();
        let state_lock = self.state.clone();
        let config = self.config.clone();
        let prompt = initial_prompt.map(|p| p.to_string());

        tokio::task::spawn_blocking(move || {
            let _guard = state_lock.lock().expect("whisper state mutex poisoned");
            let mut whisper_state =
                context.create_state().map_err(|e| AsrError::TranscriptionFailed { message: e.to_string() })?;

            let mut params = FullParams::new(SamplingStrategy::BeamSearch {
                beam_size: config.beam_size as i32,
                patience: -1.0,
            });
            params.set_language(config.language.as_deref());
            params.set_temperature(config.temperature);
            params.set_print_progress(false);
            params.set_print_special(false);
            params.set_print_realtime(false);
            params.set_no_context(true);
            params.set_single_segment(false);

            if let Some(prompt) = prompt.as_deref() {
                debug!(prompt_len = prompt.chars().count(), "seeding whisper with initial prompt");
                params.set_initial_prompt(prompt);
            }

            whisper_state.full(params, &samples).map_err(|e| AsrError::TranscriptionFailed { message: e.to_string() })?;

            let n_segments = whisper_state
                .full_n_segments()
                .map_err(|e| AsrError::TranscriptionFailed { message: e.to_string() })?;
            let mut text = String::new();
            for i in 0..n_segments {
                if let Ok(segment_text) = whisper_state.full_get_segment_text(i) {
                    text.push_str(&segment_text);
                }
            }

            let text = collapse_digit_whitespace(text.trim());
            Ok(AsrResult { text, language: config.language.clone().unwrap_or_else(|| "ja".to_string()) })
        })
        .await
        .map_err(|e| AsrError::TranscriptionFailed { message: format!("whisper worker thread panicked: {e}") })?
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn collapses_whitespace_between_digits() {
        assert_eq!(collapse_digit_whitespace("1 2 3"), "123");
        assert_eq!(collapse_digit_whitespace("1　2"), "12");
    }

    #[test]
    fn leaves_non_digit_whitespace_untouched() {
        assert_eq!(collapse_digit_whitespace("これは 1 です"), "これは 1 です");
        assert_eq!(collapse_digit_whitespace("1 です 2"), "1 です 2");
    }
}
