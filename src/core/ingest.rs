//! Study-text ingestion: whitespace normalization and sentence
//! segmentation. PDF byte extraction happens upstream of the API; this
//! module receives already-extracted text.

use regex::Regex;

/// Segments shorter than this are discarded as headings/page furniture.
const MIN_SENTENCE_LEN: usize = 10;

/// Split raw study text into sentences: normalize line endings, collapse
/// blank-line runs and horizontal whitespace, then cut after sentence
/// punctuation or at paragraph breaks.
pub fn split_into_sentences(text: &str) -> Vec<String> {
    let cleaned = text.replace("\r\n", "\n");
    let cleaned = Regex::new(r"\n{2,}")
        .unwrap()
        .replace_all(&cleaned, "\n\n")
        .into_owned();
    let cleaned = Regex::new(r"[ \t]+")
        .unwrap()
        .replace_all(&cleaned, " ")
        .into_owned();
    let cleaned = cleaned.trim();

    let boundary = Regex::new(r"[.!?]\s+|\n\n").unwrap();
    let mut sentences = Vec::new();
    let mut last = 0usize;
    for m in boundary.find_iter(cleaned) {
        // Sentence punctuation stays with its sentence; the whitespace
        // separator is dropped. Paragraph breaks are trimmed off below.
        let end = if cleaned[m.start()..].starts_with(['.', '!', '?']) {
            m.start() + 1
        } else {
            m.end()
        };
        sentences.push(cleaned[last..end].trim().to_string());
        last = m.end();
    }
    sentences.push(cleaned[last..].trim().to_string());

    sentences
        .into_iter()
        .filter(|s| s.len() > MIN_SENTENCE_LEN)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splits_on_sentence_punctuation() {
        let text = "The mitochondria is the powerhouse of the cell. It produces ATP! Does it really?  Yes, through oxidative phosphorylation.";
        let sentences = split_into_sentences(text);
        assert_eq!(
            sentences,
            vec![
                "The mitochondria is the powerhouse of the cell.",
                "It produces ATP!",
                "Does it really?",
                "Yes, through oxidative phosphorylation.",
            ]
        );
    }

    #[test]
    fn splits_on_paragraph_breaks_and_normalizes_crlf() {
        let text = "First paragraph without punctuation\r\n\r\n\r\nSecond paragraph here";
        let sentences = split_into_sentences(text);
        assert_eq!(
            sentences,
            vec!["First paragraph without punctuation", "Second paragraph here"]
        );
    }

    #[test]
    fn short_fragments_are_dropped() {
        let text = "Ch. 3. This sentence is long enough to keep.";
        let sentences = split_into_sentences(text);
        assert_eq!(sentences, vec!["This sentence is long enough to keep."]);
    }

    #[test]
    fn empty_input_yields_nothing() {
        assert!(split_into_sentences("").is_empty());
        assert!(split_into_sentences("   \n\n  ").is_empty());
    }
}
