//! Initial-prompt builder (§4.4)
//!
//! Builds a short textual context window from `confirmed_text` to feed back
//! into the ASR model as `initial_prompt`, guarding against hallucinated
//! repetitions by running the candidate through the validity filter.

use crate::transcription::validity::is_valid_text;

const MAX_SENTENCES: usize = 10;
const MAX_PROMPT_CHARS: usize = 200;

fn split_into_sentences(text: &str) -> Vec<String> {
    let mut sentences = Vec::new();
    let mut current = String::new();

    for c in text.chars() {
        current.push(c);
        if matches!(c, '。' | '！' | '？') {
            sentences.push(std::mem::take(&mut current));
        }
    }
    if !current.is_empty() {
        sentences.push(current);
    }

    sentences
}

/// Build the initial prompt from `confirmed_text`, or `None` if there is
/// nothing usable (empty confirmed text, or the candidate fails the
/// validity filter).
pub fn build_initial_prompt(confirmed_text: &str) -> Option<String> {
    if confirmed_text.is_empty() {
        return None;
    }

    let sentences = split_into_sentences(confirmed_text);
    let recent: Vec<&String> = sentences
        .iter()
        .rev()
        .take(MAX_SENTENCES)
        .filter(|s| !s.trim().is_empty())
        .collect();

    let mut prompt: String = recent.into_iter().rev().cloned().collect();

    if prompt.chars().count() > MAX_PROMPT_CHARS {
        let skip = prompt.chars().count() - MAX_PROMPT_CHARS;
        prompt = prompt.chars().skip(skip).collect();
    }

    if prompt.is_empty() {
        return None;
    }

    if !is_valid_text(&prompt) {
        tracing::warn!("initial prompt candidate failed validity filter, omitting");
        return None;
    }

    Some(prompt)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_confirmed_text_yields_no_prompt() {
        assert_eq!(build_initial_prompt(""), None);
    }

    #[test]
    fn takes_tail_sentences() {
        let confirmed = "これはテストです。次の文です。最後の文です。";
        let prompt = build_initial_prompt(confirmed).unwrap();
        assert!(prompt.ends_with("最後の文です。"));
    }

    #[test]
    fn truncates_to_max_length_from_the_front() {
        let words = [
            "今日は天気が良いので散歩に出かけました。",
            "会議の資料を確認してから始めます。",
            "次の議題について話し合いましょう。",
        ];
        let confirmed: String = (0..10).map(|i| words[i % words.len()]).collect();
        let prompt = build_initial_prompt(&confirmed).unwrap();
        assert!(prompt.chars().count() <= MAX_PROMPT_CHARS);
    }

    #[test]
    fn invalid_candidate_is_omitted() {
        // No terminators — the whole confirmed text becomes one "sentence"
        // made entirely of one repeated character, which fails the filter.
        let confirmed: String = std::iter::repeat('あ').take(20).collect();
        assert_eq!(build_initial_prompt(&confirmed), None);
    }
}
