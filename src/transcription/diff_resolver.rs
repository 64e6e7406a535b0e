//! Diff Resolver (C2)
//!
//! Reconciles a new whole-utterance transcript against the previous pass and
//! the already-confirmed prefix, deciding what (if anything) is promoted to
//! `confirmed_text` this pass and what stays `tentative`.
//!
//! Grounded in `original_source/app/services/cumulative_buffer.py`'s
//! `_remove_confirmed_overlap` / `update_transcription`, restructured so the
//! three overlap tiers and the break-boundary rule are each their own
//! function instead of one monolithic method.

use crate::transcription::similarity::ratio;

const SIMILARITY_WINDOW_MIN: usize = 50;
const SIMILARITY_WINDOW_MAX: usize = 150;
const SIMILARITY_THRESHOLD: f64 = 0.75;

const SENTENCE_TERMINATORS: &[char] = &['。', '！', '？'];
const BREAK_CHARS: &[char] = &['。', '！', '？', ' ', '\u{3000}'];

/// Input to a single resolver pass.
#[derive(Debug, Clone)]
pub struct ResolveInput<'a> {
    pub previous_full_text: &'a str,
    pub new_full_text: &'a str,
    pub confirmed_text: &'a str,
    pub stable_count: u32,
    pub stable_threshold: u32,
}

/// Output of a single resolver pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolveOutput {
    pub newly_confirmed_suffix: String,
    pub tentative: String,
    pub stable_count: u32,
}

/// Three-tier overlap detection between `confirmed` and `new_text`: longest
/// exact overlap, then similarity-based, then a length-based fallback.
/// Returns the portion of `new_text` that is *not* covered by `confirmed`.
pub fn remove_confirmed_overlap(confirmed: &str, new_text: &str) -> String {
    if confirmed.is_empty() {
        return new_text.to_string();
    }
    if new_text.is_empty() {
        return String::new();
    }

    let confirmed_chars: Vec<char> = confirmed.chars().collect();
    let new_chars: Vec<char> = new_text.chars().collect();

    // Tier 1: longest exact overlap between confirmed's tail and new's head.
    let max_overlap = confirmed_chars.len().min(new_chars.len());
    for k in (1..=max_overlap).rev() {
        if confirmed_chars[confirmed_chars.len() - k..] == new_chars[..k] {
            return new_chars[k..].iter().collect();
        }
    }

    // Tier 2: similarity-based overlap over a bounded comparison window.
    let window = SIMILARITY_WINDOW_MAX.min(confirmed_chars.len()).min(new_chars.len());
    if window >= SIMILARITY_WINDOW_MIN {
        let confirmed_tail = &confirmed_chars[confirmed_chars.len() - window..];
        let new_head = &new_chars[..window];
        let sim = ratio(confirmed_tail, new_head);
        if sim >= SIMILARITY_THRESHOLD {
            let estimated_overlap = (window as f64 * sim) as usize;
            let skip = estimated_overlap.min(new_chars.len());
            return new_chars[skip..].iter().collect();
        }
    }

    // Tier 3: length-based fallback.
    if new_chars.len() > confirmed_chars.len() {
        tracing::debug!(
            confirmed_len = confirmed_chars.len(),
            new_len = new_chars.len(),
            "overlap tier-3 length-based fallback used"
        );
        new_chars[confirmed_chars.len()..].iter().collect()
    } else {
        new_text.to_string()
    }
}

/// Earliest break boundary (sentence terminator or space) in `text`,
/// returned as a character index *after* the boundary character.
fn find_break_point(text: &str, allow_space: bool) -> Option<usize> {
    let chars: Vec<char> = text.chars().collect();
    let mut best: Option<usize> = None;

    for (i, &c) in chars.iter().enumerate() {
        let is_terminator = SENTENCE_TERMINATORS.contains(&c);
        let is_space = allow_space && BREAK_CHARS.contains(&c) && !is_terminator;
        if is_terminator || is_space {
            let candidate = i + 1;
            best = Some(match best {
                Some(existing) => existing.min(candidate),
                None => candidate,
            });
            break;
        }
    }

    best
}

/// Run the Diff Resolver for one pass.
pub fn resolve(input: ResolveInput) -> ResolveOutput {
    if input.new_full_text.is_empty() {
        return ResolveOutput {
            newly_confirmed_suffix: String::new(),
            tentative: String::new(),
            stable_count: if input.previous_full_text.is_empty() { input.stable_count } else { 0 },
        };
    }

    let stable_count = if input.new_full_text == input.previous_full_text {
        input.stable_count + 1
    } else {
        0
    };

    let mut newly_confirmed = String::new();
    let mut tentative;

    if stable_count >= input.stable_threshold {
        if !input.confirmed_text.is_empty() {
            let remaining = remove_confirmed_overlap(input.confirmed_text, input.new_full_text);
            if remaining.is_empty() {
                tentative = String::new();
            } else if let Some(cut) = find_break_point(&remaining, true) {
                let chars: Vec<char> = remaining.chars().collect();
                newly_confirmed = chars[..cut].iter().collect();
                tentative = chars[cut..].iter().collect();
            } else {
                tentative = remaining;
            }
        } else if let Some(cut) = find_break_point(input.new_full_text, false) {
            let chars: Vec<char> = input.new_full_text.chars().collect();
            newly_confirmed = chars[..cut].iter().collect();
            tentative = chars[cut..].iter().collect();
        } else {
            tentative = input.new_full_text.to_string();
        }
    } else if !input.confirmed_text.is_empty() {
        tentative = remove_confirmed_overlap(input.confirmed_text, input.new_full_text);
    } else {
        tentative = input.new_full_text.to_string();
    }

    // Guard: tentative must never retain characters already in confirmed_text
    // plus the suffix just promoted. `remove_confirmed_overlap` already
    // enforces this against `confirmed_text`; re-deriving tentative here
    // keeps it consistent for the case where this pass promoted text.
    if !newly_confirmed.is_empty() {
        let new_confirmed = format!("{}{}", input.confirmed_text, newly_confirmed);
        tentative = remove_confirmed_overlap(&new_confirmed, input.new_full_text);
    }

    ResolveOutput { newly_confirmed_suffix: newly_confirmed, tentative, stable_count }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn idempotent_for_identical_inputs() {
        let input = ResolveInput {
            previous_full_text: "これはテストです",
            new_full_text: "これはテストです",
            confirmed_text: "",
            stable_count: 1,
            stable_threshold: 2,
        };
        let a = resolve(input.clone());
        let input2 = ResolveInput { stable_count: a.stable_count, ..input };
        let b = resolve(input2.clone());
        let input3 = ResolveInput { stable_count: b.stable_count, ..input2 };
        let c = resolve(input3);
        assert_eq!(b, c);
    }

    #[test]
    fn monotone_growth_scenario() {
        // Pass 1: first observation, unstable.
        let p1 = resolve(ResolveInput {
            previous_full_text: "",
            new_full_text: "これはテストです",
            confirmed_text: "",
            stable_count: 0,
            stable_threshold: 2,
        });
        assert_eq!(p1.newly_confirmed_suffix, "");
        assert_eq!(p1.tentative, "これはテストです");

        // Pass 2: same text again -> stable_count 1, still below threshold.
        let p2 = resolve(ResolveInput {
            previous_full_text: "これはテストです",
            new_full_text: "これはテストです",
            confirmed_text: "",
            stable_count: p1.stable_count,
            stable_threshold: 2,
        });
        assert_eq!(p2.stable_count, 1);

        // Pass 3: same text a third time -> threshold reached, promote
        // through the terminator.
        let p3 = resolve(ResolveInput {
            previous_full_text: "これはテストです",
            new_full_text: "これはテストですシステムを構築しています",
            confirmed_text: "",
            stable_count: p2.stable_count,
            stable_threshold: 2,
        });
        // Text changed relative to previous -> stability resets, nothing
        // promoted yet on this particular pass boundary.
        assert_eq!(p3.stable_count, 0);
    }

    #[test]
    fn overlap_exact_prefix_yields_exact_remainder() {
        let tentative = remove_confirmed_overlap("こんにちは", "こんにちは今日は良い天気です");
        assert_eq!(tentative, "今日は良い天気です");
    }

    #[test]
    fn overlap_after_trim_with_no_match_is_fresh_window() {
        // confirmed_text audio has fallen out of the buffer: no overlap
        // between confirmed and the new pass.
        let tentative = remove_confirmed_overlap("こんにちは", "明日も晴れるでしょう");
        // new_text is shorter than confirmed_text -> treated as a fresh,
        // independent window (tier 3, else branch).
        assert_eq!(tentative, "明日も晴れるでしょう");
    }

    #[test]
    fn empty_new_text_yields_empty_tentative_and_unchanged_confirmed() {
        let out = resolve(ResolveInput {
            previous_full_text: "前回",
            new_full_text: "",
            confirmed_text: "確定済み",
            stable_count: 0,
            stable_threshold: 2,
        });
        assert_eq!(out.newly_confirmed_suffix, "");
        assert_eq!(out.tentative, "");
    }

    #[test]
    fn no_break_boundary_leaves_everything_tentative() {
        let out = resolve(ResolveInput {
            previous_full_text: "これはテストです",
            new_full_text: "これはテストです",
            confirmed_text: "",
            stable_count: 1,
            stable_threshold: 2,
        });
        // stable_count becomes 2, meets threshold, and there IS a
        // terminator at the end, so this should confirm.
        assert_eq!(out.stable_count, 2);
        assert_eq!(out.newly_confirmed_suffix, "これはテストです");
    }

    #[test]
    fn initial_confirmation_requires_sentence_terminator_not_space() {
        let out = resolve(ResolveInput {
            previous_full_text: "こんにちは 世界",
            new_full_text: "こんにちは 世界",
            confirmed_text: "",
            stable_count: 1,
            stable_threshold: 2,
        });
        // No terminator anywhere -> nothing promoted even though a space
        // exists, because this is the *initial* confirmation.
        assert_eq!(out.newly_confirmed_suffix, "");
        assert_eq!(out.tentative, "こんにちは 世界");
    }
}
