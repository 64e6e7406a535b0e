//! Process configuration
//!
//! All tunables are read once from the environment at process start; changing
//! them requires a restart (no hot reload), matching the source's `Settings`
//! class in `app/config.py`.

use std::env;
use std::time::Duration;

/// Per-session cumulative-buffer configuration, frozen at session creation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BufferConfig {
    /// Sample rate in Hz.
    pub sample_rate: u32,
    /// Channel count.
    pub channels: u16,
    /// Bytes per sample.
    pub sample_width: u16,
    /// Upper bound on buffered audio before a trim is triggered.
    pub max_audio_duration_seconds: f64,
    /// Re-transcribe every N appended chunks.
    pub transcription_interval_chunks: u32,
    /// Consecutive identical passes required before auto-promotion.
    pub stable_text_threshold: u32,
}

impl Default for BufferConfig {
    fn default() -> Self {
        Self {
            sample_rate: 16_000,
            channels: 1,
            sample_width: 2,
            max_audio_duration_seconds: 25.0,
            transcription_interval_chunks: 3,
            stable_text_threshold: 2,
        }
    }
}

impl BufferConfig {
    /// Maximum audio byte count before trimming must occur.
    pub fn max_audio_bytes(&self) -> usize {
        (self.max_audio_duration_seconds
            * self.sample_rate as f64
            * self.channels as f64
            * self.sample_width as f64) as usize
    }

    pub fn bytes_per_second(&self) -> f64 {
        self.sample_rate as f64 * self.channels as f64 * self.sample_width as f64
    }
}

/// Process-wide configuration, read once at start-up.
#[derive(Debug, Clone)]
pub struct Config {
    pub buffer: BufferConfig,
    pub session_timeout: Duration,
    pub max_chunks_per_session: usize,
    pub asr_model_path: Option<String>,
    pub asr_beam_size: usize,
    pub asr_temperature: f32,
    pub asr_vad_threshold: f32,
    pub translation_model: String,
    pub worker_pool_permits: usize,
    pub asr_timeout: Duration,
    pub translation_timeout: Duration,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            buffer: BufferConfig::default(),
            session_timeout: Duration::from_secs(30 * 60),
            max_chunks_per_session: 100,
            asr_model_path: None,
            asr_beam_size: 5,
            asr_temperature: 0.0,
            asr_vad_threshold: 0.5,
            translation_model: "Helsinki-NLP/opus-mt-ja-en".to_string(),
            worker_pool_permits: 2,
            asr_timeout: Duration::from_secs(15),
            translation_timeout: Duration::from_secs(10),
        }
    }
}

impl Config {
    /// Build configuration from environment variables, falling back to the
    /// spec's documented defaults for anything unset or unparseable.
    pub fn from_env() -> Self {
        let defaults = Self::default();

        Self {
            buffer: BufferConfig {
                sample_rate: defaults.buffer.sample_rate,
                channels: defaults.buffer.channels,
                sample_width: defaults.buffer.sample_width,
                max_audio_duration_seconds: env_f64(
                    "CTE_MAX_AUDIO_SECONDS",
                    defaults.buffer.max_audio_duration_seconds,
                ),
                transcription_interval_chunks: env_u32(
                    "CTE_TRANSCRIPTION_INTERVAL_CHUNKS",
                    defaults.buffer.transcription_interval_chunks,
                ),
                stable_text_threshold: env_u32(
                    "CTE_STABLE_THRESHOLD",
                    defaults.buffer.stable_text_threshold,
                ),
            },
            session_timeout: Duration::from_secs(
                env_u64("CTE_SESSION_TIMEOUT_MINUTES", 30) * 60,
            ),
            max_chunks_per_session: env_usize(
                "CTE_MAX_CHUNKS_PER_SESSION",
                defaults.max_chunks_per_session,
            ),
            asr_model_path: env::var("CTE_ASR_MODEL_PATH").ok(),
            asr_beam_size: env_usize("CTE_ASR_BEAM_SIZE", defaults.asr_beam_size),
            asr_temperature: env_f32("CTE_ASR_TEMPERATURE", defaults.asr_temperature),
            asr_vad_threshold: env_f32("CTE_ASR_VAD_THRESHOLD", defaults.asr_vad_threshold),
            translation_model: env::var("CTE_TRANSLATION_MODEL")
                .unwrap_or(defaults.translation_model),
            worker_pool_permits: env_usize(
                "CTE_WORKER_POOL_PERMITS",
                defaults.worker_pool_permits,
            ),
            asr_timeout: Duration::from_secs(env_u64(
                "CTE_ASR_TIMEOUT_SECONDS",
                defaults.asr_timeout.as_secs(),
            )),
            translation_timeout: Duration::from_secs(env_u64(
                "CTE_TRANSLATION_TIMEOUT_SECONDS",
                defaults.translation_timeout.as_secs(),
            )),
        }
    }
}

fn env_f64(key: &str, default: f64) -> f64 {
    env::var(key).ok().and_then(|v| v.parse().ok()).unwrap_or(default)
}

fn env_f32(key: &str, default: f32) -> f32 {
    env::var(key).ok().and_then(|v| v.parse().ok()).unwrap_or(default)
}

fn env_u32(key: &str, default: u32) -> u32 {
    env::var(key).ok().and_then(|v| v.parse().ok()).unwrap_or(default)
}

fn env_u64(key: &str, default: u64) -> u64 {
    env::var(key).ok().and_then(|v| v.parse().ok()).unwrap_or(default)
}

fn env_usize(key: &str, default: usize) -> usize {
    env::var(key).ok().and_then(|v| v.parse().ok()).unwrap_or(default)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_buffer_config_matches_spec_defaults() {
        let cfg = BufferConfig::default();
        assert_eq!(cfg.sample_rate, 16_000);
        assert_eq!(cfg.transcription_interval_chunks, 3);
        assert_eq!(cfg.stable_text_threshold, 2);
        assert_eq!(cfg.max_audio_bytes(), (25.0 * 16_000.0 * 1.0 * 2.0) as usize);
    }
}
