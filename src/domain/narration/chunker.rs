use regex::Regex;
use std::sync::LazyLock;

/// Sentence-ending punctuation followed by whitespace
static SENTENCE_BOUNDARY: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[.!?]+\s+").unwrap());

/// Split text into sentences.
///
/// A boundary is one or more of `.`, `?`, `!` followed by whitespace. The
/// punctuation stays with its sentence, the whitespace is dropped.
pub fn split_sentences(text: &str) -> Vec<&str> {
    let mut sentences = Vec::new();
    let mut last_end = 0;

    for mat in SENTENCE_BOUNDARY.find_iter(text) {
        let punctuation_end = mat.start() + mat.as_str().trim_end().len();
        let sentence = text[last_end..punctuation_end].trim();
        if !sentence.is_empty() {
            sentences.push(sentence);
        }
        last_end = mat.end();
    }

    let tail = text[last_end..].trim();
    if !tail.is_empty() {
        sentences.push(tail);
    }

    sentences
}

/// Split text into ordered chunks of at most `max_chars` characters and
/// `max_bytes` UTF-8 bytes that only break at sentence boundaries.
///
/// Sentences are packed greedily. A sentence that exceeds either limit on
/// its own becomes a single oversized chunk.
pub fn split(text: &str, max_chars: usize, max_bytes: usize) -> Vec<String> {
    let mut chunks = Vec::new();
    let mut current = String::new();
    // Length of `current` plus the trailing separator it will carry
    let mut current_len = 0;

    for sentence in split_sentences(text) {
        let sentence_len = sentence.chars().count();
        let over_chars = current_len + sentence_len + 1 > max_chars;
        // Bytes of `current` once joined with this sentence
        let over_bytes = current.len() + 1 + sentence.len() > max_bytes;

        if (over_chars || over_bytes) && !current.is_empty() {
            chunks.push(std::mem::take(&mut current));
            current_len = 0;
        }

        if !current.is_empty() {
            current.push(' ');
        }
        current.push_str(sentence);
        current_len += sentence_len + 1;
    }

    if !current.is_empty() {
        chunks.push(current);
    }

    chunks
}
