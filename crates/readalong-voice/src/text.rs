//! Utterance tokenization for highlight tracking.
//!
//! Splits an utterance into an ordered word sequence and builds a lookup
//! from any character offset in the normalized text to the index of the
//! word containing it. Speech engines report progress as character offsets
//! into the text they were handed, so the map must cover every offset —
//! including separators — with no undefined gaps.

/// One span of text submitted for vocalization as a single unit.
///
/// Immutable once parsed: the raw input, the normalized form actually sent
/// to the speech engine (newlines collapsed to spaces, whitespace runs
/// collapsed to one), and the derived word sequence.
#[derive(Debug, Clone)]
pub struct Utterance {
    raw: String,
    normalized: String,
    words: Vec<String>,
}

impl Utterance {
    /// Parse raw text into an utterance.
    ///
    /// Returns `None` for blank or whitespace-only input so that playback
    /// never starts on an empty word sequence (and nothing downstream can
    /// divide by a zero word count).
    #[must_use]
    pub fn parse(raw: &str) -> Option<Self> {
        let words: Vec<String> = raw.split_whitespace().map(str::to_owned).collect();
        if words.is_empty() {
            return None;
        }

        let normalized = words.join(" ");

        Some(Self {
            raw: raw.to_owned(),
            normalized,
            words,
        })
    }

    /// The text as originally submitted.
    #[must_use]
    pub fn raw(&self) -> &str {
        &self.raw
    }

    /// The whitespace-normalized text handed to the speech engine.
    #[must_use]
    pub fn normalized(&self) -> &str {
        &self.normalized
    }

    /// The ordered word sequence. Guaranteed non-empty.
    #[must_use]
    pub fn words(&self) -> &[String] {
        &self.words
    }

    /// Number of words. Guaranteed `>= 1`.
    #[must_use]
    pub fn word_count(&self) -> usize {
        self.words.len()
    }
}

/// Dense lookup from character offsets in the normalized text to word
/// indices.
///
/// Offsets count Unicode scalar values of the normalized text. Each word's
/// characters map to that word's index; the single separating space after a
/// word maps to the *preceding* word, so every valid offset resolves.
/// Offsets at or beyond the end of the text resolve to the last word —
/// engines are allowed to report clamped or overshooting offsets.
#[derive(Debug, Clone)]
pub struct CharToWordMap {
    map: Vec<usize>,
}

impl CharToWordMap {
    /// Build the map by walking the word sequence once.
    #[must_use]
    pub fn build(utterance: &Utterance) -> Self {
        let words = utterance.words();
        let mut map = Vec::with_capacity(utterance.normalized().chars().count());

        for (index, word) in words.iter().enumerate() {
            map.extend(std::iter::repeat_n(index, word.chars().count()));
            if index + 1 < words.len() {
                // Separator space belongs to the word it follows.
                map.push(index);
            }
        }

        Self { map }
    }

    /// Number of mapped character offsets (the normalized text length).
    #[must_use]
    pub fn len(&self) -> usize {
        self.map.len()
    }

    /// Whether the map is empty. Never true for a parsed [`Utterance`].
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    /// Resolve a character offset to the index of the containing word.
    ///
    /// Out-of-range offsets resolve to the last word index, which is what a
    /// proportional estimate clamped to the word sequence would produce —
    /// an engine that reports an offset past the end is necessarily
    /// speaking the final word.
    #[must_use]
    pub fn resolve(&self, offset: usize) -> usize {
        self.map
            .get(offset)
            .or_else(|| self.map.last())
            .copied()
            .unwrap_or(0)
    }
}
