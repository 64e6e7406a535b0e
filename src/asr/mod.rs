//! Automatic speech recognition
//!
//! Wraps whisper.cpp behind the [`invoker::AsrInvoker`] seam, so the
//! session scheduler never depends on whisper-rs types directly.

pub mod invoker;
pub mod types;
pub mod whisper;

pub use invoker::{get_service, initialize, AsrInvoker, MockAsrInvoker};
pub use types::{AsrError, AsrResult};
