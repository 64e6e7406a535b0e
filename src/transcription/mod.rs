//! Cumulative transcription core: overlap resolution, validity filtering,
//! and initial-prompt construction over the whole-utterance re-transcription
//! passes driven by the session scheduler.

pub mod diff_resolver;
pub mod prompt;
pub mod similarity;
pub mod validity;

pub use diff_resolver::{remove_confirmed_overlap, resolve, ResolveInput, ResolveOutput};
pub use prompt::build_initial_prompt;
pub use validity::is_valid_text;
