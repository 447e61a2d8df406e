//! Token-budgeted text chunking.
//!
//! Greedy accumulation over blank-line paragraph boundaries; a paragraph
//! that alone exceeds the budget is split on sentence terminators and
//! accumulated the same way. Output order matches input order, and the
//! concatenated chunks reproduce the input text up to the blank-line
//! separators re-inserted between accumulated paragraphs.
//!
//! Boundary condition: a single sentence longer than the budget is emitted
//! whole rather than split mid-sentence.

use crate::tokens::TokenCounter;

/// Split `text` into chunks of at most `max_tokens` tokens each.
pub fn chunk_text(counter: &TokenCounter, text: &str, max_tokens: usize) -> Vec<String> {
    let mut chunks = Vec::new();
    let mut current = String::new();

    for para in text.split("\n\n") {
        let candidate = if current.is_empty() {
            para.to_string()
        } else {
            format!("{current}\n\n{para}")
        };

        if counter.count(&candidate) > max_tokens {
            if !current.is_empty() {
                chunks.push(std::mem::take(&mut current));
            }
            if counter.count(para) > max_tokens {
                // Oversized paragraph: fall back to sentence-level splitting
                accumulate_sentences(counter, para, max_tokens, &mut chunks, &mut current);
            } else {
                current = para.to_string();
            }
        } else {
            current = candidate;
        }
    }

    if !current.is_empty() {
        chunks.push(current);
    }

    chunks
}

/// Greedily pack sentences of an oversized paragraph into `current`,
/// flushing to `chunks` whenever the budget would be exceeded. Sentences
/// carry their own terminators, so packing is plain concatenation.
fn accumulate_sentences(
    counter: &TokenCounter,
    para: &str,
    max_tokens: usize,
    chunks: &mut Vec<String>,
    current: &mut String,
) {
    for sentence in split_sentences(para) {
        if current.is_empty() {
            // A lone over-budget sentence stays whole; it gets flushed on
            // the next iteration or at end-of-input.
            current.push_str(sentence);
            continue;
        }
        let candidate = format!("{current}{sentence}");
        if counter.count(&candidate) > max_tokens {
            chunks.push(std::mem::take(current));
            current.push_str(sentence);
        } else {
            *current = candidate;
        }
    }
}

/// Split on sentence terminators (`.`, `!`, `?`) followed by whitespace,
/// keeping the terminator and trailing whitespace with the sentence so that
/// concatenating the pieces reproduces the input exactly.
fn split_sentences(text: &str) -> Vec<&str> {
    let bytes = text.as_bytes();
    let mut out = Vec::new();
    let mut start = 0;
    let mut i = 0;

    while i < bytes.len() {
        if matches!(bytes[i], b'.' | b'!' | b'?') {
            let mut j = i + 1;
            while j < bytes.len() && matches!(bytes[j], b'.' | b'!' | b'?') {
                j += 1;
            }
            if j >= bytes.len() || bytes[j].is_ascii_whitespace() {
                while j < bytes.len() && bytes[j].is_ascii_whitespace() {
                    j += 1;
                }
                out.push(&text[start..j]);
                start = j;
                i = j;
                continue;
            }
        }
        i += 1;
    }

    if start < text.len() {
        out.push(&text[start..]);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn counter() -> TokenCounter {
        TokenCounter::new().unwrap()
    }

    fn strip_whitespace(s: &str) -> String {
        s.chars().filter(|c| !c.is_whitespace()).collect()
    }

    #[test]
    fn test_short_text_is_single_chunk() {
        let c = counter();
        let text = "One paragraph.\n\nAnother paragraph.";
        let chunks = chunk_text(&c, text, 1000);
        assert_eq!(chunks, vec![text.to_string()]);
    }

    #[test]
    fn test_empty_text_yields_no_chunks() {
        let c = counter();
        assert!(chunk_text(&c, "", 100).is_empty());
    }

    #[test]
    fn test_chunks_respect_token_budget() {
        let c = counter();
        let para = "the cat sat on the mat and looked at the dog. ".repeat(8);
        let text = vec![para.trim_end(); 6].join("\n\n");
        let max = 120;
        let chunks = chunk_text(&c, &text, max);
        assert!(chunks.len() > 1);
        for chunk in &chunks {
            assert!(
                c.count(chunk) <= max,
                "chunk of {} tokens exceeds budget {}",
                c.count(chunk),
                max
            );
        }
    }

    #[test]
    fn test_chunks_reconstruct_input_modulo_whitespace() {
        let c = counter();
        let para = "a quick brown fox jumps over the lazy dog again and again. ".repeat(10);
        let text = format!("intro paragraph here\n\n{}\n\nclosing paragraph", para.trim_end());
        let chunks = chunk_text(&c, &text, 80);
        let rebuilt: String = chunks.concat();
        assert_eq!(strip_whitespace(&rebuilt), strip_whitespace(&text));
    }

    #[test]
    fn test_order_preserved() {
        let c = counter();
        let text = (1..=6)
            .map(|i| format!("paragraph number {i} with some padding words to fill tokens"))
            .collect::<Vec<_>>()
            .join("\n\n");
        let chunks = chunk_text(&c, &text, 30);
        let mut last_pos = 0;
        for chunk in &chunks {
            let first_line = chunk.split("\n\n").next().unwrap();
            let pos = text.find(first_line).unwrap();
            assert!(pos >= last_pos, "chunk order must follow input order");
            last_pos = pos;
        }
    }

    #[test]
    fn test_oversized_paragraph_falls_back_to_sentences() {
        let c = counter();
        let para = "the mouse ran up the clock and then it ran back down again. ".repeat(12);
        let max = 60;
        assert!(c.count(&para) > max, "fixture paragraph must exceed the budget");
        let chunks = chunk_text(&c, para.trim_end(), max);
        assert!(chunks.len() > 1);
        for chunk in &chunks {
            assert!(c.count(chunk) <= max);
        }
    }

    #[test]
    fn test_single_oversized_sentence_emitted_whole() {
        let c = counter();
        // One sentence with no terminators until the very end
        let sentence = format!("{} end.", "word ".repeat(200).trim_end());
        let chunks = chunk_text(&c, &sentence, 20);
        assert_eq!(chunks.len(), 1, "an unsplittable sentence is returned whole");
        assert!(c.count(&chunks[0]) > 20);
    }

    #[test]
    fn test_split_sentences_roundtrip() {
        let text = "First one. Second one! Third? Trailing fragment";
        let parts = split_sentences(text);
        assert_eq!(parts.len(), 4);
        assert_eq!(parts.concat(), text);
    }

    #[test]
    fn test_split_sentences_ignores_inline_dots() {
        // Dots not followed by whitespace (decimals, versions) do not split
        let text = "We used v2.5 of the model. It scored 3.14 points.";
        let parts = split_sentences(text);
        assert_eq!(parts.len(), 2);
        assert_eq!(parts.concat(), text);
    }
}
