//! Text post-processing: hiragana normalization and translation.
//!
//! Both stages run strictly after diff resolution and are never fed back
//! into the confirmed/tentative state the Diff Resolver owns.

pub mod hiragana;
pub mod translator;

pub use hiragana::HiraganaNormalizer;
pub use translator::{NoopTranslator, Translator, TranslationError};
