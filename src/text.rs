//! Word-boundary aware view over one sentence's text.

use std::collections::BTreeSet;

use unicode_segmentation::UnicodeSegmentation;

/// A half-open span of a sentence, in character (code point) offsets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct CharSpan {
    pub start: usize,
    pub end: usize,
}

/// Sentence text with its UAX #29 word boundaries precomputed.
///
/// A phrase match only counts when both of its ends sit on a word boundary,
/// so "risk" never matches inside "asterisk" while "non-inferior" still
/// contains "inferior".
#[derive(Debug, Clone)]
pub struct SentenceText<'t> {
    text: &'t str,
    /// Byte offsets where a word segment starts, plus `text.len()`.
    boundaries: BTreeSet<usize>,
}

impl<'t> SentenceText<'t> {
    pub fn new(text: &'t str) -> Self {
        let mut boundaries: BTreeSet<usize> = text
            .split_word_bound_indices()
            .map(|(idx, _)| idx)
            .collect();
        boundaries.insert(text.len());
        Self { text, boundaries }
    }

    pub fn as_str(&self) -> &'t str {
        self.text
    }

    /// True when the byte range starts and ends on word boundaries.
    pub fn is_word_aligned(&self, start: usize, end: usize) -> bool {
        start < end && self.boundaries.contains(&start) && self.boundaries.contains(&end)
    }

    /// Convert a byte range of the text into a character span.
    pub fn char_span(&self, start: usize, end: usize) -> CharSpan {
        let start_char = self.text[..start].chars().count();
        let end_char = start_char + self.text[start..end].chars().count();
        CharSpan {
            start: start_char,
            end: end_char,
        }
    }

    /// Number of characters in the text.
    pub fn char_len(&self) -> usize {
        self.text.chars().count()
    }
}
