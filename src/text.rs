//! Text helpers shared by extraction and resolution.
//!
//! Mention spans are character offsets, while Rust strings are indexed by
//! byte. [`TextIndex`] bridges the two and clamps out-of-range offsets the
//! same way sequence slicing does: a span past the end yields the available
//! suffix (or nothing), never a panic.

use std::sync::LazyLock;

use regex::Regex;

static SENTENCE_RE: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"[^.!?]+[.!?]*").ok());

/// Character-offset view over a borrowed text.
#[derive(Debug, Clone)]
pub struct TextIndex<'a> {
    text: &'a str,
    // Byte offset of every char, plus a trailing `text.len()`.
    offsets: Vec<usize>,
}

impl<'a> TextIndex<'a> {
    /// Builds the index.
    #[must_use]
    pub fn new(text: &'a str) -> Self {
        let mut offsets: Vec<usize> = text.char_indices().map(|(b, _)| b).collect();
        offsets.push(text.len());
        Self { text, offsets }
    }

    /// The indexed text.
    #[must_use]
    pub fn text(&self) -> &'a str {
        self.text
    }

    /// Length of the text in characters.
    #[must_use]
    pub fn char_len(&self) -> usize {
        self.offsets.len() - 1
    }

    /// Byte offset of a character offset, clamped to the end of the text.
    #[must_use]
    pub fn byte_offset(&self, char_offset: usize) -> usize {
        self.offsets
            .get(char_offset)
            .copied()
            .unwrap_or(self.text.len())
    }

    /// Character offset of a byte offset (rounded down to a char boundary).
    #[must_use]
    pub fn char_offset(&self, byte_offset: usize) -> usize {
        match self.offsets.binary_search(&byte_offset) {
            Ok(i) => i,
            Err(i) => i.saturating_sub(1),
        }
    }

    /// Slices by character offsets. Out-of-range or inverted spans yield the
    /// overlapping part, possibly empty.
    #[must_use]
    pub fn slice(&self, start: usize, end: usize) -> &'a str {
        let start = self.byte_offset(start);
        let end = self.byte_offset(end);
        if start >= end {
            return "";
        }
        &self.text[start..end]
    }

    /// Slices `[start - radius, end + radius)`, clamped to the text.
    #[must_use]
    pub fn window(&self, start: usize, end: usize, radius: usize) -> &'a str {
        self.slice(start.saturating_sub(radius), end.saturating_add(radius))
    }

    /// Splits the text into sentence spans (character offsets) on `.`, `!`
    /// and `?`. Terminal punctuation stays with its sentence.
    #[must_use]
    pub fn sentences(&self) -> Vec<(usize, usize)> {
        let Some(re) = SENTENCE_RE.as_ref() else {
            return vec![(0, self.char_len())];
        };
        re.find_iter(self.text)
            .map(|m| (self.char_offset(m.start()), self.char_offset(m.end())))
            .collect()
    }
}

/// Normalizes a surface value for lookup: lowercase, punctuation removed,
/// whitespace collapsed.
///
/// # Examples
///
/// ```
/// use doc_entities::text::normalize_value;
///
/// assert_eq!(normalize_value("  Apple,  Inc. "), "apple inc");
/// ```
#[must_use]
pub fn normalize_value(value: &str) -> String {
    let stripped: String = value
        .to_lowercase()
        .chars()
        .filter(|c| c.is_alphanumeric() || c.is_whitespace() || *c == '_')
        .collect();
    stripped.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Builds a node-id slug: lowercase alphanumeric runs joined by `-`.
///
/// # Examples
///
/// ```
/// use doc_entities::text::slugify;
///
/// assert_eq!(slugify("Totally Unknown Startup Corp."), "totally-unknown-startup-corp");
/// ```
#[must_use]
pub fn slugify(value: &str) -> String {
    let lowered = value.to_lowercase();
    lowered
        .split(|c: char| !c.is_alphanumeric())
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join("-")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_slice_clamps_out_of_range() {
        let idx = TextIndex::new("hello world");
        assert_eq!(idx.slice(6, 11), "world");
        assert_eq!(idx.slice(6, 500), "world");
        assert_eq!(idx.slice(40, 500), "");
        assert_eq!(idx.slice(8, 2), "");
    }

    #[test]
    fn test_slice_uses_char_offsets() {
        let idx = TextIndex::new("Zürich is in Switzerland");
        assert_eq!(idx.char_len(), 24);
        assert_eq!(idx.slice(0, 6), "Zürich");
        assert_eq!(idx.slice(13, 24), "Switzerland");
    }

    #[test]
    fn test_window() {
        let idx = TextIndex::new("abcdefghij");
        assert_eq!(idx.window(4, 6, 2), "cdefgh");
        assert_eq!(idx.window(0, 2, 30), "abcdefghij");
    }

    #[test]
    fn test_char_offset_roundtrip() {
        let idx = TextIndex::new("né à Paris");
        for c in 0..=idx.char_len() {
            assert_eq!(idx.char_offset(idx.byte_offset(c)), c);
        }
    }

    #[test]
    fn test_sentences() {
        let idx = TextIndex::new("Ada met Bob. Then they left! Why?");
        let spans = idx.sentences();
        assert_eq!(spans.len(), 3);
        assert_eq!(idx.slice(spans[0].0, spans[0].1), "Ada met Bob.");
        assert_eq!(idx.slice(spans[1].0, spans[1].1), " Then they left!");
    }

    #[test]
    fn test_sentences_without_terminator() {
        let idx = TextIndex::new("no punctuation here");
        assert_eq!(idx.sentences(), vec![(0, 19)]);
    }

    #[test]
    fn test_normalize_value() {
        assert_eq!(normalize_value("Barack   OBAMA"), "barack obama");
        assert_eq!(normalize_value("U.S.A."), "usa");
        assert_eq!(normalize_value("---"), "");
    }

    #[test]
    fn test_slugify() {
        assert_eq!(slugify("New York City"), "new-york-city");
        assert_eq!(slugify("$5 million"), "5-million");
        assert_eq!(slugify("  "), "");
    }
}
