//! Validity / hallucination filter (§4.6)
//!
//! Applied to every ASR result before it is allowed to influence session
//! state, and to candidate initial prompts. Grounded in
//! `original_source/app/services/text_filter.py`'s `is_valid_text`, extended
//! per spec.md with the N-gram degenerate-loop check.

use std::collections::HashMap;

/// A closed set of filler-only utterances: a run of one repeated filler
/// character, e.g. `^(あ+|え+|う+|ん+)$` — not any mixture drawn from the
/// set (so `いいえ`/`うえ`/`あおい` are not filler).
fn is_filler_only(text: &str) -> bool {
    const FILLER_CHARS: &[char] = &['あ', 'え', 'う', 'ん', 'お', 'い'];
    let mut chars = text.chars();
    let Some(first) = chars.next() else { return false };
    FILLER_CHARS.contains(&first) && chars.all(|c| c == first)
}

fn has_cjk(text: &str) -> bool {
    text.chars().any(|c| {
        let cp = c as u32;
        matches!(cp,
            0x3040..=0x309F // Hiragana
            | 0x30A0..=0x30FF // Katakana
            | 0x4E00..=0x9FFF // CJK Unified Ideographs
        )
    })
}

/// Frequency of the single most common character, as a fraction of the
/// total character count.
fn max_char_frequency(chars: &[char]) -> f64 {
    if chars.is_empty() {
        return 0.0;
    }
    let mut counts: HashMap<char, usize> = HashMap::new();
    for &c in chars {
        *counts.entry(c).or_insert(0) += 1;
    }
    let max_count = counts.values().copied().max().unwrap_or(0);
    max_count as f64 / chars.len() as f64
}

/// For every N in `[3, min(15, floor(len/2))]`, the most frequent N-gram's
/// coverage (`freq * N / len`) — catches degenerate ASR loops such as
/// `"abcabcabcabc"`.
fn max_ngram_coverage(chars: &[char]) -> f64 {
    let len = chars.len();
    if len < 6 {
        return 0.0;
    }
    let max_n = (len / 2).min(15);
    let mut worst = 0.0f64;

    for n in 3..=max_n {
        let mut counts: HashMap<&[char], usize> = HashMap::new();
        for window in chars.windows(n) {
            *counts.entry(window).or_insert(0) += 1;
        }
        if let Some(&freq) = counts.values().max() {
            let coverage = (freq * n) as f64 / len as f64;
            if coverage > worst {
                worst = coverage;
            }
        }
    }

    worst
}

/// A string is invalid if it has no CJK/kana content, is a closed filler
/// utterance, a single character dominates the text, or a repeating N-gram
/// covers most of it.
pub fn is_valid_text(text: &str) -> bool {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return false;
    }

    if !has_cjk(trimmed) {
        return false;
    }

    if is_filler_only(trimmed) {
        return false;
    }

    let chars: Vec<char> = trimmed.chars().collect();

    if max_char_frequency(&chars) > 0.7 {
        return false;
    }

    if max_ngram_coverage(&chars) > 0.6 {
        return false;
    }

    true
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_text_with_no_cjk_content() {
        assert!(!is_valid_text("hello world"));
    }

    #[test]
    fn rejects_empty_or_whitespace() {
        assert!(!is_valid_text(""));
        assert!(!is_valid_text("   "));
    }

    #[test]
    fn rejects_filler_only_utterance() {
        assert!(!is_valid_text("あああああ"));
        assert!(!is_valid_text("んんんん"));
    }

    #[test]
    fn accepts_mixed_text_drawn_from_filler_chars() {
        // Real words built from filler characters are not homogeneous runs
        // and must not be rejected by the filler check.
        assert!(is_valid_text("いいえ"));
        assert!(is_valid_text("うえ"));
        assert!(is_valid_text("あおい"));
    }

    #[test]
    fn rejects_single_character_repetition_above_seventy_percent() {
        assert!(!is_valid_text("ああああああああああ"));
    }

    #[test]
    fn any_repeated_char_of_length_four_or_more_is_invalid() {
        for c in ['猫', 'あ', 'ア'] {
            let s: String = std::iter::repeat(c).take(4).collect();
            assert!(!is_valid_text(&s), "{s} should be invalid");
        }
    }

    #[test]
    fn rejects_degenerate_ngram_loop() {
        // "です。です。です。です。" repeats a 4-char n-gram almost entirely.
        assert!(!is_valid_text("ですですですですですです"));
    }

    #[test]
    fn accepts_ordinary_japanese_sentence() {
        assert!(is_valid_text("これはテストです。"));
    }
}
