//! Transcription Scheduler (C3)
//!
//! Owns the per-chunk decision of whether to re-transcribe and whether to
//! trim, and — critically — the ordering guarantee from §4.3: force-finalize
//! precedes trim precedes recomputation. No callback reaches back from the
//! Accumulator into the Scheduler (§9 design note): this module calls
//! `Accumulator::trim()` directly, in order, itself.

use crate::asr::{AsrInvoker, AsrResult};
use crate::session::state::{ChunkData, SessionState};
use crate::text::{HiraganaNormalizer, Translator};
use crate::transcription::{build_initial_prompt, diff_resolver, is_valid_text};
use crate::worker_pool::WorkerPool;
use chrono::Utc;
use std::time::{Duration, Instant};

/// The process-wide collaborators a chunk pass needs, bundled so the
/// Scheduler's entry points take one reference instead of a growing
/// positional-argument list.
pub struct Services<'a> {
    pub asr: &'a dyn AsrInvoker,
    pub hiragana: &'a HiraganaNormalizer,
    pub translator: &'a dyn Translator,
    pub worker_pool: &'a WorkerPool,
    pub asr_timeout: Duration,
    pub translation_timeout: Duration,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    Silent,
    Invalid,
}

#[derive(Debug, Clone, Default)]
pub struct TextPair {
    pub confirmed: String,
    pub tentative: String,
}

#[derive(Debug, Clone)]
pub struct Performance {
    pub transcription_time_ms: u64,
    pub total_time_ms: u64,
    pub accumulated_audio_seconds: f64,
    pub session_elapsed_seconds: f64,
}

#[derive(Debug, Clone)]
pub struct TranscriptionUpdate {
    pub confirmed: String,
    pub tentative: String,
    pub full_text: String,
    pub hiragana: Option<TextPair>,
    pub translation: Option<TextPair>,
    pub performance: Performance,
    pub is_final: bool,
}

#[derive(Debug, Clone)]
pub enum ChunkOutcome {
    Accumulating { accumulated_seconds: f64, chunks_until_transcription: u64 },
    Transcribed(TranscriptionUpdate),
    Skipped { reason: SkipReason, message: String },
    Error { message: String },
}

/// Promotes whatever remains tentative in `full_text` into `confirmed_text`,
/// via the same overlap-detection logic the normal diff path uses, ignoring
/// the break-boundary rule: this is an unconditional one-shot promotion, not
/// a normal pass (§4.7, §9 "force-finalize").
fn force_finalize(session: &mut SessionState, full_text: &str) {
    if full_text.is_empty() {
        return;
    }
    let remaining = diff_resolver::remove_confirmed_overlap(&session.confirmed_text, full_text);
    session.confirmed_text.push_str(&remaining);
}

/// Dispatch one ASR pass through the bounded worker pool with a wall-clock
/// timeout (§5). A timeout or transport-level failure is reported as a
/// string message and never mutates session state — the caller returns
/// before touching `last_transcription` / `stable_count`.
async fn run_asr(services: &Services<'_>, snapshot: &[u8], initial_prompt: Option<&str>) -> Result<AsrResult, String> {
    let _permit = services.worker_pool.acquire().await;
    match tokio::time::timeout(services.asr_timeout, services.asr.transcribe(snapshot, initial_prompt)).await {
        Ok(Ok(result)) => Ok(result),
        Ok(Err(err)) => Err(err.to_string()),
        Err(_) => Err(format!("asr processing timed out after {:?}", services.asr_timeout)),
    }
}

/// Translate one piece of text under the worker pool and its wall-clock
/// timeout; a timeout or backend failure degrades to an empty string rather
/// than failing the whole chunk — translation is best-effort and never
/// allowed to feed back into `confirmed_text`/`stable_count`.
async fn translate_guarded(services: &Services<'_>, text: &str, context: &str) -> String {
    if text.is_empty() {
        return String::new();
    }
    let _permit = services.worker_pool.acquire().await;
    match tokio::time::timeout(services.translation_timeout, services.translator.translate(text, context)).await {
        Ok(Ok(result)) => result,
        Ok(Err(_)) | Err(_) => String::new(),
    }
}

async fn run_post_processing(
    session: &SessionState,
    newly_confirmed: &str,
    tentative: &str,
    services: &Services<'_>,
) -> (Option<TextPair>, Option<TextPair>, String) {
    let hiragana_pair = if session.processing_options.hiragana {
        Some(TextPair {
            confirmed: services.hiragana.to_hiragana(newly_confirmed),
            tentative: services.hiragana.to_hiragana(tentative),
        })
    } else {
        None
    };

    let mut translated_confirmed_suffix = String::new();
    let translation_pair = if session.processing_options.translation {
        let context = session.get_context_text(5);
        let confirmed = translate_guarded(services, newly_confirmed, &context).await;
        let tentative_t = translate_guarded(services, tentative, &context).await;
        translated_confirmed_suffix = confirmed.clone();
        Some(TextPair { confirmed, tentative: tentative_t })
    } else {
        None
    };

    (hiragana_pair, translation_pair, translated_confirmed_suffix)
}

/// Process one ingested binary frame end to end: append, decide, transcribe,
/// diff, force-finalize/trim/recompute, post-process, record.
pub async fn process_chunk(session: &mut SessionState, data: &[u8], services: &Services<'_>) -> ChunkOutcome {
    let total_start = Instant::now();
    let confirmed_before = session.confirmed_text.clone();
    let outcome = match session.accumulator.append(data) {
        Ok(outcome) => outcome,
        Err(err) => return ChunkOutcome::Error { message: err.to_string() },
    };
    session.chunk_count += 1;
    session.touch();

    if !outcome.should_transcribe {
        return ChunkOutcome::Accumulating {
            accumulated_seconds: session.accumulator.duration_seconds(),
            chunks_until_transcription: session.accumulator.chunks_until_transcription(),
        };
    }

    let initial_prompt = build_initial_prompt(&session.confirmed_text);
    let snapshot = session.accumulator.snapshot();

    let asr_start = Instant::now();
    let asr_result: AsrResult = match run_asr(services, &snapshot, initial_prompt.as_deref()).await {
        Ok(result) => result,
        Err(message) => return ChunkOutcome::Error { message },
    };
    let transcription_time_ms = asr_start.elapsed().as_millis() as u64;

    let trimmed = asr_result.text.trim();
    if trimmed.is_empty() {
        return ChunkOutcome::Skipped { reason: SkipReason::Silent, message: "no speech detected".to_string() };
    }
    if !is_valid_text(trimmed) {
        return ChunkOutcome::Skipped { reason: SkipReason::Invalid, message: "transcript failed validity filter".to_string() };
    }

    let new_text = trimmed.to_string();

    let resolved = diff_resolver::resolve(diff_resolver::ResolveInput {
        previous_full_text: &session.last_transcription,
        new_full_text: &new_text,
        confirmed_text: &session.confirmed_text,
        stable_count: session.stable_count,
        stable_threshold: session.stable_threshold,
    });

    session.confirmed_text.push_str(&resolved.newly_confirmed_suffix);
    session.stable_count = resolved.stable_count;
    let mut tentative = resolved.tentative;
    let mut newly_confirmed = resolved.newly_confirmed_suffix;

    if outcome.should_trim {
        let before_len = session.confirmed_text.len();
        force_finalize(session, &new_text);
        let force_finalized_suffix = session.confirmed_text[before_len..].to_string();
        newly_confirmed.push_str(&force_finalized_suffix);

        session.accumulator.trim();
        tentative = diff_resolver::remove_confirmed_overlap(&session.confirmed_text, &new_text);
    }

    session.previous_full_text = std::mem::replace(&mut session.last_transcription, new_text.clone());

    let (hiragana_pair, translation_pair, _) =
        run_post_processing(session, &newly_confirmed, &tentative, services).await;

    if let Some(pair) = &hiragana_pair {
        session.confirmed_hiragana.push_str(&pair.confirmed);
    }

    session.record_chunk(ChunkData {
        chunk_id: session.chunk_count,
        timestamp: Utc::now(),
        original_text: new_text.clone(),
        hiragana_text: hiragana_pair.as_ref().map(|p| p.confirmed.clone()),
        translated_text: translation_pair.as_ref().map(|p| p.confirmed.clone()),
        processing_time_ms: transcription_time_ms,
    });

    debug_assert!(
        session.confirmed_text.starts_with(&confirmed_before),
        "confirmed_text must never shrink or be rewritten"
    );

    let full_text = format!("{}{}", session.confirmed_text, tentative);

    ChunkOutcome::Transcribed(TranscriptionUpdate {
        confirmed: session.confirmed_text.clone(),
        tentative,
        full_text,
        hiragana: hiragana_pair,
        translation: translation_pair,
        performance: Performance {
            transcription_time_ms,
            total_time_ms: total_start.elapsed().as_millis() as u64,
            accumulated_audio_seconds: session.accumulator.duration_seconds(),
            session_elapsed_seconds: (Utc::now() - session.created_at).num_milliseconds() as f64 / 1000.0,
        },
        is_final: false,
    })
}

/// Session finalize (§4.7): run one last pass if there is unprocessed
/// audio, then unconditionally force-promote everything tentative.
pub async fn finalize(session: &mut SessionState, services: &Services<'_>) -> TranscriptionUpdate {
    let total_start = Instant::now();
    let confirmed_before = session.confirmed_text.clone();

    if session.accumulator.chunk_count() > 0 {
        let initial_prompt = build_initial_prompt(&session.confirmed_text);
        let snapshot = session.accumulator.snapshot();
        if let Ok(asr_result) = run_asr(services, &snapshot, initial_prompt.as_deref()).await {
            let trimmed = asr_result.text.trim();
            if !trimmed.is_empty() && is_valid_text(trimmed) {
                session.last_transcription = trimmed.to_string();
            }
        }
    }

    let full_text = session.last_transcription.clone();
    force_finalize(session, &full_text);

    let (hiragana_pair, translation_pair, _) =
        run_post_processing(session, &session.confirmed_text.clone(), "", services).await;
    if let Some(pair) = &hiragana_pair {
        session.confirmed_hiragana = pair.confirmed.clone();
    }

    debug_assert!(
        session.confirmed_text.starts_with(&confirmed_before),
        "confirmed_text must never shrink or be rewritten"
    );

    TranscriptionUpdate {
        confirmed: session.confirmed_text.clone(),
        tentative: String::new(),
        full_text: session.confirmed_text.clone(),
        hiragana: hiragana_pair,
        translation: translation_pair,
        performance: Performance {
            transcription_time_ms: 0,
            total_time_ms: total_start.elapsed().as_millis() as u64,
            accumulated_audio_seconds: session.accumulator.duration_seconds(),
            session_elapsed_seconds: (Utc::now() - session.created_at).num_milliseconds() as f64 / 1000.0,
        },
        is_final: true,
    }
}
