//! Hiragana normalizer
//!
//! A deterministic, synchronous text transform run after diff resolution
//! (never feeding back into `confirmed_text`/`stable_count`). Grounded in
//! `original_source/app/utils/normalizer.py`'s `HiraganaConverter`, scaled
//! down to the part expressible without a reading dictionary: katakana is
//! folded to hiragana by codepoint offset, and everything else (kanji,
//! punctuation, Latin text) passes through unchanged.

const KATAKANA_START: u32 = 0x30A1;
const KATAKANA_END: u32 = 0x30F6;
const HIRAGANA_OFFSET: u32 = 0x30A1 - 0x3041;

pub struct HiraganaNormalizer;

impl HiraganaNormalizer {
    pub fn new() -> Self {
        Self
    }

    /// Fold katakana to hiragana; kanji, Latin text, and punctuation are
    /// left untouched, matching the documented fallback behavior of the
    /// source converter when no reading dictionary is consulted.
    pub fn to_hiragana(&self, text: &str) -> String {
        text.chars()
            .map(|c| {
                let cp = c as u32;
                if (KATAKANA_START..=KATAKANA_END).contains(&cp) {
                    char::from_u32(cp - HIRAGANA_OFFSET).unwrap_or(c)
                } else {
                    c
                }
            })
            .collect()
    }
}

impl Default for HiraganaNormalizer {
    fn default() -> Self {
        Self::new()
    }
}
