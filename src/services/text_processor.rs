// Text Processing Service
// Canonicalizes raw document text into the form the classifiers compare

use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};
use std::fmt;
use std::ops::Deref;

use super::config_store::LanguageConfig;

const LATIN_BASE: std::ops::RangeInclusive<char> = 'a'..='z';
const CYRILLIC_BASE: std::ops::RangeInclusive<char> = 'а'..='я';

/// Lowercase text over the supported alphabets, single-spaced and trimmed.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NormalizedText(String);

impl NormalizedText {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn words(&self) -> std::str::SplitWhitespace<'_> {
        self.0.split_whitespace()
    }
}

impl Deref for NormalizedText {
    type Target = str;

    fn deref(&self) -> &str {
        &self.0
    }
}

impl AsRef<str> for NormalizedText {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for NormalizedText {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Union of the alphabets the configured languages are written in.
///
/// Always covers basic Latin `a-z` and Cyrillic `а-я` plus `ё`; every
/// configured signature character is added on top.
#[derive(Debug, Clone)]
pub struct TextNormalizer {
    extra: BTreeSet<char>,
}

impl Default for TextNormalizer {
    fn default() -> Self {
        Self::with_extra_letters("ёäöüß".chars())
    }
}

impl TextNormalizer {
    pub fn with_extra_letters<I: IntoIterator<Item = char>>(letters: I) -> Self {
        let extra = letters
            .into_iter()
            .flat_map(|c| c.to_lowercase())
            .filter(|c| !c.is_whitespace())
            .collect();
        Self { extra }
    }

    pub fn for_languages(languages: &[LanguageConfig]) -> Self {
        Self::with_extra_letters(
            std::iter::once('ё').chain(languages.iter().flat_map(|l| l.signature_set())),
        )
    }

    pub fn is_allowed(&self, c: char) -> bool {
        LATIN_BASE.contains(&c) || CYRILLIC_BASE.contains(&c) || self.extra.contains(&c)
    }

    /// Lowercase, drop characters outside the alphabet, collapse whitespace.
    pub fn normalize(&self, raw: &str) -> NormalizedText {
        if raw.is_empty() {
            return NormalizedText::default();
        }

        let mut kept = String::with_capacity(raw.len());
        for ch in raw.chars() {
            if ch.is_whitespace() {
                kept.push(' ');
                continue;
            }
            for lower in ch.to_lowercase() {
                if self.is_allowed(lower) {
                    kept.push(lower);
                }
            }
        }

        NormalizedText(kept.split_whitespace().collect::<Vec<_>>().join(" "))
    }
}

/// Normalize with the default Russian/German alphabet.
pub fn normalize(raw: &str) -> NormalizedText {
    TextNormalizer::default().normalize(raw)
}

/// Occurrence count per whitespace-separated token.
pub fn word_frequencies(text: &str) -> HashMap<&str, usize> {
    let mut counts: HashMap<&str, usize> = HashMap::new();
    for word in text.split_whitespace() {
        *counts.entry(word).or_insert(0) += 1;
    }
    counts
}

/// Token length in characters, not UTF-8 bytes.
#[inline]
pub fn word_len(word: &str) -> usize {
    word.chars().count()
}

#[inline]
pub fn is_short_word(word: &str, max_len: usize) -> bool {
    word_len(word) <= max_len
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_basic() {
        let text = normalize("  Über   die Brücke,\n\tund   ДАЛЬШЕ!  ");
        assert_eq!(text.as_str(), "über die brücke und дальше");
    }

    #[test]
    fn test_normalize_removes_digits_and_punctuation() {
        assert_eq!(normalize("Seite 12: don't-stop 2024").as_str(), "seite dontstop");
        assert_eq!(normalize("123 ... !!!").as_str(), "");
    }

    #[test]
    fn test_normalize_empty() {
        assert_eq!(normalize("").as_str(), "");
        assert_eq!(normalize(" \n\t ").as_str(), "");
    }

    #[test]
    fn test_normalize_keeps_yo_and_eszett() {
        assert_eq!(normalize("Ёлка STRAßE").as_str(), "ёлка straße");
    }

    #[test]
    fn test_normalize_idempotent() {
        let samples = [
            "",
            "Привет, мир! Hello, World!",
            "Ärger über Öl — ß und ẞ",
            "  İstanbul \u{00A0} Ǆemal 中文 αβγ ",
            "tab\tseparated\nlines\r\nhere",
        ];
        for raw in samples {
            let once = normalize(raw);
            let twice = normalize(once.as_str());
            assert_eq!(once, twice, "not idempotent for {:?}", raw);
        }
    }

    #[test]
    fn test_normalizer_for_languages_adds_signature_letters() {
        let languages = vec![
            LanguageConfig::new("French", "fr.txt", "éèç"),
            LanguageConfig::new("German", "de.txt", "äöüß"),
        ];
        let normalizer = TextNormalizer::for_languages(&languages);
        assert_eq!(normalizer.normalize("Ça déjà Öl").as_str(), "ça déjà öl");
        assert!(normalizer.is_allowed('ё'));
    }

    #[test]
    fn test_word_frequencies_and_lengths() {
        let counts = word_frequencies("и в и не и");
        assert_eq!(counts["и"], 3);
        assert_eq!(counts["не"], 1);
        assert!(is_short_word("schön", 5));
        assert!(!is_short_word("дальше", 5));
    }
}
