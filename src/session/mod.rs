//! Session state, the transcription scheduler, and the streaming controller
//! that drives both per connection.

pub mod controller;
pub mod scheduler;
pub mod state;

pub use controller::Controller;
pub use scheduler::{ChunkOutcome, SkipReason, TranscriptionUpdate};
pub use state::{ProcessingOptions, SessionInfo, SessionState};
