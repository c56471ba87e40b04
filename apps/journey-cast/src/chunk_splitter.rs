//! Sentence-respecting text chunking for single TTS requests.
//!
//! Text is cut after `.`, `!` or `?` when followed by whitespace, then the
//! sentences are packed greedily into chunks of at most `max_chars`
//! characters. A sentence that alone exceeds the limit is forwarded as one
//! oversized chunk rather than being cut mid-sentence.

/// Per-request input limit, a little under the endpoint's hard cap
pub const DEFAULT_MAX_CHUNK_CHARS: usize = 4800;

/// Split `text` into sentences, keeping punctuation with the sentence that
/// precedes it and dropping the whitespace run after it.
pub fn split_sentences(text: &str) -> Vec<&str> {
    let text = text.trim();
    let mut sentences = Vec::new();
    if text.is_empty() {
        return sentences;
    }

    let mut start = 0;
    let mut chars = text.char_indices().peekable();

    while let Some((idx, c)) = chars.next() {
        if !matches!(c, '.' | '!' | '?') {
            continue;
        }
        let end = idx + c.len_utf8();
        match chars.peek() {
            Some(&(_, next)) if next.is_whitespace() => {
                sentences.push(&text[start..end]);
                // Skip the separating whitespace run
                while let Some(&(_, ws)) = chars.peek() {
                    if !ws.is_whitespace() {
                        break;
                    }
                    chars.next();
                }
                start = chars.peek().map(|&(i, _)| i).unwrap_or(text.len());
            }
            _ => {}
        }
    }

    if start < text.len() {
        sentences.push(&text[start..]);
    }

    sentences
}

/// Pack sentences into chunks of at most `max_chars` characters, joined by
/// single spaces. Empty or whitespace-only input yields no chunks.
pub fn split_into_chunks(text: &str, max_chars: usize) -> Vec<String> {
    let mut chunks = Vec::new();
    let mut current = String::new();
    let mut current_len = 0usize;

    for sentence in split_sentences(text) {
        let sentence_len = sentence.chars().count();

        if current.is_empty() {
            current.push_str(sentence);
            current_len = sentence_len;
            continue;
        }

        if current_len + 1 + sentence_len > max_chars {
            chunks.push(std::mem::take(&mut current));
            current.push_str(sentence);
            current_len = sentence_len;
        } else {
            current.push(' ');
            current.push_str(sentence);
            current_len += 1 + sentence_len;
        }
    }

    if !current.is_empty() {
        chunks.push(current);
    }

    if let Some(oversized) = chunks.iter().find(|c| c.chars().count() > max_chars) {
        log::warn!(
            "Sentence of {} chars exceeds the {} char chunk limit; sending it whole",
            oversized.chars().count(),
            max_chars
        );
    }

    chunks
}

#[cfg(test)]
mod tests {
    use super::*;

    fn normalize(text: &str) -> String {
        text.split_whitespace().collect::<Vec<_>>().join(" ")
    }

    #[test]
    fn test_sentence_boundaries() {
        let sentences = split_sentences("Hello there. How are you?  Fine!\nGreat... v1.2 works");

        assert_eq!(
            sentences,
            vec!["Hello there.", "How are you?", "Fine!", "Great...", "v1.2 works"]
        );
    }

    #[test]
    fn test_short_text_single_chunk() {
        let chunks = split_into_chunks("One. Two. Three.", DEFAULT_MAX_CHUNK_CHARS);
        assert_eq!(chunks, vec!["One. Two. Three."]);
    }

    #[test]
    fn test_empty_input() {
        assert!(split_into_chunks("", 100).is_empty());
        assert!(split_into_chunks("   \n\t ", 100).is_empty());
    }

    #[test]
    fn test_greedy_packing_respects_limit() {
        // "aaaa." is 5 chars; two joined with a space is 11
        let text = "aaaa. bbbb. cccc. dddd. eeee.";
        let chunks = split_into_chunks(text, 11);

        assert_eq!(chunks, vec!["aaaa. bbbb.", "cccc. dddd.", "eeee."]);
        assert!(chunks.iter().all(|c| c.chars().count() <= 11));
    }

    #[test]
    fn test_joining_space_counts_toward_limit() {
        // 5 + 1 + 5 = 11 does not fit in 10
        let chunks = split_into_chunks("aaaa. bbbb.", 10);
        assert_eq!(chunks, vec!["aaaa.", "bbbb."]);
    }

    #[test]
    fn test_oversized_sentence_is_forwarded_whole() {
        let long = format!("{}.", "x".repeat(30));
        let text = format!("{} Short one. Tiny.", long);
        let chunks = split_into_chunks(&text, 20);

        assert_eq!(chunks[0], long);
        assert_eq!(chunks[1], "Short one. Tiny.");
        assert!(chunks.iter().all(|c| !c.is_empty()));
    }

    #[test]
    fn test_join_reproduces_text() {
        let text = "The borrow checker tracks lifetimes.  It rejects dangling references!\n\
                    Why? Because memory safety matters. Ownership moves values; borrows lend them.";

        for limit in [10, 40, 80, DEFAULT_MAX_CHUNK_CHARS] {
            let chunks = split_into_chunks(text, limit);
            assert_eq!(normalize(&chunks.join(" ")), normalize(text), "limit {}", limit);
        }
    }

    #[test]
    fn test_counts_characters_not_bytes() {
        let text = "Привет мир. Пока мир.";
        let chunks = split_into_chunks(text, 11);
        assert_eq!(chunks, vec!["Привет мир.", "Пока мир."]);
    }
}
