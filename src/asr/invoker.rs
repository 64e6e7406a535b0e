//! ASR invocation boundary
//!
//! `AsrInvoker` is the seam between the session scheduler and whichever
//! engine actually runs inference. Production wiring uses a single
//! process-wide [`WhisperAsrInvoker`] behind a lazily-initialized
//! `OnceCell`, mirroring the singleton pattern the teacher used for its
//! diarization service.

use crate::asr::types::{AsrError, AsrResult};
use crate::asr::whisper::{WhisperAsrInvoker, WhisperEngineConfig};
use crate::config::Config;
use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::OnceCell;

/// Transcribes a complete WAV buffer, optionally seeded with an initial
/// prompt built from already-confirmed text.
#[async_trait]
pub trait AsrInvoker: Send + Sync {
    async fn transcribe(&self, wav_bytes: &[u8], initial_prompt: Option<&str>) -> Result<AsrResult, AsrError>;
}

static ASR_SERVICE: OnceCell<Arc<dyn AsrInvoker>> = OnceCell::const_new();

async fn create_service(config: &Config) -> Result<Arc<dyn AsrInvoker>, AsrError> {
    let whisper_config = WhisperEngineConfig {
        model_path: config.asr_model_path.clone().ok_or_else(|| AsrError::ModelNotFound {
            path: "CTE_ASR_MODEL_PATH not set".to_string(),
        })?,
        beam_size: config.asr_beam_size,
        temperature: config.asr_temperature,
        language: Some("ja".to_string()),
    };
    let engine = WhisperAsrInvoker::new(whisper_config)?;
    Ok(Arc::new(engine))
}

/// Initialize the process-wide ASR service. Must be called once before
/// [`get_service`]; subsequent calls are no-ops.
pub async fn initialize(config: &Config) -> Result<(), AsrError> {
    let service = create_service(config).await?;
    let _ = ASR_SERVICE.set(service);
    Ok(())
}

/// Fetch the process-wide ASR service, panicking if [`initialize`] was
/// never called. Mirrors the teacher's `diarization::get_service()`.
pub fn get_service() -> Arc<dyn AsrInvoker> {
    ASR_SERVICE.get().expect("asr service not initialized; call asr::invoker::initialize() at startup").clone()
}

/// A deterministic invoker for tests: echoes back a fixed transcript
/// regardless of audio content, so session/scheduler tests don't depend on
/// a real model file being present.
pub struct MockAsrInvoker {
    pub fixed_text: String,
}

#[async_trait]
impl AsrInvoker for MockAsrInvoker {
    async fn transcribe(&self, _wav_bytes: &[u8], _initial_prompt: Option<&str>) -> Result<AsrResult, AsrError> {
        Ok(AsrResult { text: self.fixed_text.clone(), language: "ja".to_string() })
    }
}
