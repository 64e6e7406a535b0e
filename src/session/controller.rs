//! Streaming Session Controller (C5)
//!
//! Drives the per-connection state machine described in §4.8:
//! `Handshaking → Ready → [Ingesting ⇄ Configured] → Finalizing → Closed`.
//! Owns its `SessionState` exclusively (§5) — no other task reads or
//! mutates it.

use crate::asr::AsrInvoker;
use crate::config::Config;
use crate::protocol::{
    ClientMessage, PerformancePayload, ServerMessage, StatisticsPayload, TextPairPayload, TranscriptionPayload,
};
use crate::session::scheduler::{self, ChunkOutcome, Services, SkipReason};
use crate::session::state::SessionState;
use crate::text::{HiraganaNormalizer, Translator};
use crate::worker_pool::WorkerPool;
use std::sync::Arc;
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Ready,
    Finalizing,
    Closed,
}

pub struct Controller {
    session: SessionState,
    phase: Phase,
    asr: Arc<dyn AsrInvoker>,
    hiragana: Arc<HiraganaNormalizer>,
    translator: Arc<dyn Translator>,
    worker_pool: Arc<WorkerPool>,
    asr_timeout: Duration,
    translation_timeout: Duration,
}

impl Controller {
    /// `Handshaking → Ready`: allocate the session and produce the
    /// `connected` event.
    pub fn new(
        session_id: String,
        config: &Config,
        asr: Arc<dyn AsrInvoker>,
        hiragana: Arc<HiraganaNormalizer>,
        translator: Arc<dyn Translator>,
        worker_pool: Arc<WorkerPool>,
    ) -> (Self, ServerMessage) {
        let session = SessionState::new(session_id.clone(), config);
        let connected = ServerMessage::Connected { session_id, message: "session ready".to_string() };
        let asr_timeout = config.asr_timeout;
        let translation_timeout = config.translation_timeout;
        (
            Self { session, phase: Phase::Ready, asr, hiragana, translator, worker_pool, asr_timeout, translation_timeout },
            connected,
        )
    }

    fn services(&self) -> Services<'_> {
        Services {
            asr: self.asr.as_ref(),
            hiragana: self.hiragana.as_ref(),
            translator: self.translator.as_ref(),
            worker_pool: self.worker_pool.as_ref(),
            asr_timeout: self.asr_timeout,
            translation_timeout: self.translation_timeout,
        }
    }

    pub fn session_id(&self) -> &str {
        &self.session.session_id
    }

    pub fn is_closed(&self) -> bool {
        self.phase == Phase::Closed
    }

    pub fn mark_closed(&mut self) {
        self.phase = Phase::Closed;
    }

    /// `Ready|Configured → Configured`: update processing options.
    pub fn handle_options(&mut self, hiragana: bool, translation: bool) -> ServerMessage {
        self.session.processing_options.hiragana = hiragana;
        self.session.processing_options.translation = translation;
        ServerMessage::OptionsReceived
    }

    pub fn handle_ping(&self) -> ServerMessage {
        ServerMessage::Pong
    }

    /// `Ready|Configured → Ingesting`: process one binary audio frame.
    pub async fn handle_binary(&mut self, data: &[u8]) -> ServerMessage {
        let services = self.services();
        let outcome = scheduler::process_chunk(&mut self.session, data, &services).await;
        let chunk_id = self.session.chunk_count;

        match outcome {
            ChunkOutcome::Accumulating { accumulated_seconds, chunks_until_transcription } => {
                ServerMessage::Accumulating {
                    chunk_id,
                    accumulated_seconds,
                    session_elapsed_seconds: (chrono::Utc::now() - self.session.created_at).num_milliseconds() as f64 / 1000.0,
                    chunks_until_transcription,
                }
            }
            ChunkOutcome::Transcribed(update) => ServerMessage::TranscriptionUpdate {
                chunk_id,
                transcription: TranscriptionPayload {
                    confirmed: update.confirmed,
                    tentative: update.tentative,
                    full_text: update.full_text,
                },
                hiragana: update.hiragana.map(|p| TextPairPayload { confirmed: p.confirmed, tentative: p.tentative }),
                translation: update.translation.map(|p| TextPairPayload { confirmed: p.confirmed, tentative: p.tentative }),
                performance: PerformancePayload {
                    transcription_time: update.performance.transcription_time_ms as f64 / 1000.0,
                    total_time: update.performance.total_time_ms as f64 / 1000.0,
                    accumulated_audio_seconds: update.performance.accumulated_audio_seconds,
                    session_elapsed_seconds: update.performance.session_elapsed_seconds,
                },
                is_final: update.is_final,
            },
            ChunkOutcome::Skipped { reason, message } => ServerMessage::Skipped {
                chunk_id,
                reason: match reason {
                    SkipReason::Silent => "silent".to_string(),
                    SkipReason::Invalid => "invalid".to_string(),
                },
                message,
            },
            ChunkOutcome::Error { message } => ServerMessage::Error { message },
        }
    }

    /// `* → Finalizing`: run §4.7 and produce the terminal event.
    pub async fn handle_end(&mut self) -> ServerMessage {
        self.phase = Phase::Finalizing;
        let services = self.services();
        let update = scheduler::finalize(&mut self.session, &services).await;

        let message = ServerMessage::SessionEnd {
            transcription: TranscriptionPayload {
                confirmed: update.confirmed.clone(),
                tentative: update.tentative,
                full_text: update.full_text,
            },
            hiragana: update.hiragana.map(|p| TextPairPayload { confirmed: p.confirmed, tentative: p.tentative }),
            translation: update.translation.map(|p| TextPairPayload { confirmed: p.confirmed, tentative: p.tentative }),
            statistics: StatisticsPayload {
                chunk_count: self.session.chunk_count,
                audio_duration_seconds: self.session.accumulator.duration_seconds(),
                confirmed_text_length: update.confirmed.chars().count(),
            },
            is_final: true,
        };
        self.phase = Phase::Closed;
        message
    }

    /// Dispatch one successfully parsed text-channel control message.
    /// Distinguishing unrecognized types from malformed payloads of a known
    /// type is the caller's job (§4.8, §7) — this only handles messages
    /// that already deserialized into a known variant.
    pub async fn handle_control(&mut self, message: ClientMessage) -> Option<ServerMessage> {
        match message {
            ClientMessage::Options { hiragana, translation } => Some(self.handle_options(hiragana, translation)),
            ClientMessage::Ping => Some(self.handle_ping()),
            ClientMessage::End => Some(self.handle_end().await),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::asr::MockAsrInvoker;
    use crate::text::NoopTranslator;

    fn make_controller() -> (Controller, ServerMessage) {
        let config = Config::default();
        Controller::new(
            "s1".to_string(),
            &config,
            Arc::new(MockAsrInvoker { fixed_text: "こんにちは。".to_string() }),
            Arc::new(HiraganaNormalizer::new()),
            Arc::new(NoopTranslator),
            Arc::new(WorkerPool::new(2)),
        )
    }

    #[test]
    fn new_controller_emits_connected_with_session_id() {
        let (controller, connected) = make_controller();
        match connected {
            ServerMessage::Connected { session_id, .. } => assert_eq!(session_id, controller.session_id()),
            _ => panic!("expected connected"),
        }
    }

    #[tokio::test]
    async fn ping_replies_pong() {
        let (controller, _) = make_controller();
        assert!(matches!(controller.handle_ping(), ServerMessage::Pong));
    }

    #[tokio::test]
    async fn options_reply_and_update_session_state() {
        let (mut controller, _) = make_controller();
        let reply = controller.handle_options(true, true);
        assert!(matches!(reply, ServerMessage::OptionsReceived));
        assert!(controller.session.processing_options.hiragana);
        assert!(controller.session.processing_options.translation);
    }

    #[tokio::test]
    async fn end_transitions_to_closed_and_clears_tentative() {
        let (mut controller, _) = make_controller();
        let reply = controller.handle_end().await;
        assert!(controller.is_closed());
        match reply {
            ServerMessage::SessionEnd { transcription, is_final, .. } => {
                assert_eq!(transcription.tentative, "");
                assert!(is_final);
            }
            _ => panic!("expected session_end"),
        }
    }
}
