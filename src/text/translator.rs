//! Translation boundary
//!
//! `Translator` is the seam for the external MT model the source used
//! (Helsinki-NLP/opus-mt-ja-en via MarianMT, see
//! `original_source/app/services/translator.py`). Runs strictly after diff
//! resolution and never influences `confirmed_text`/`stable_count`.

use async_trait::async_trait;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum TranslationError {
    #[error("translation backend unavailable: {message}")]
    Unavailable { message: String },
}

#[async_trait]
pub trait Translator: Send + Sync {
    async fn translate(&self, text: &str, context: &str) -> Result<String, TranslationError>;
}

/// Default translator: returns the input text unchanged. A real MT model
/// plugs in behind the same trait without touching session/scheduler code.
pub struct NoopTranslator;

#[async_trait]
impl Translator for NoopTranslator {
    async fn translate(&self, text: &str, _context: &str) -> Result<String, TranslationError> {
        Ok(text.to_string())
    }
}
