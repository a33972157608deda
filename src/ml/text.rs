use crate::error::{AppError, Result};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::path::Path;

/// NLTK Spanish stopword corpus, one word per line.
const SPANISH_STOPWORDS: &str = include_str!("stopwords_es.txt");

/// Runs of non-word characters (Unicode-aware).
static NON_WORD: Lazy<Regex> = Lazy::new(|| Regex::new(r"\W+").expect("valid regex"));

/// Tokens of two or more word characters.
static WORD_TOKEN: Lazy<Regex> = Lazy::new(|| Regex::new(r"\b\w\w+\b").expect("valid regex"));

/// Set of words dropped during text cleaning
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StopWords {
    words: BTreeSet<String>,
}

impl StopWords {
    /// Built-in Spanish list
    pub fn spanish() -> Self {
        Self::from_words(SPANISH_STOPWORDS.lines())
    }

    /// Empty list, keeps every token
    pub fn none() -> Self {
        Self {
            words: BTreeSet::new(),
        }
    }

    pub fn from_words<I, S>(words: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            words: words
                .into_iter()
                .map(|w| w.as_ref().trim().to_lowercase())
                .filter(|w| !w.is_empty() && !w.starts_with('#'))
                .collect(),
        }
    }

    /// Read a stopword file with one word per line; `#` starts a comment line
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            AppError::NotFound(format!("stopword file {}: {}", path.display(), e))
        })?;
        let stopwords = Self::from_words(content.lines());
        if stopwords.is_empty() {
            return Err(AppError::Validation(format!(
                "stopword file {} contains no words",
                path.display()
            )));
        }
        Ok(stopwords)
    }

    /// Load from `path` when given, otherwise the built-in Spanish list
    pub fn load_or_default(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::from_file(path),
            None => Ok(Self::spanish()),
        }
    }

    pub fn contains(&self, word: &str) -> bool {
        self.words.contains(word)
    }

    pub fn len(&self) -> usize {
        self.words.len()
    }

    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }
}

/// Text normalisation applied identically at training and prediction time
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TextPreprocessor {
    stopwords: StopWords,
}

impl TextPreprocessor {
    pub fn new(stopwords: StopWords) -> Self {
        Self { stopwords }
    }

    /// Spanish stopwords, the default for maintenance issues
    pub fn spanish() -> Self {
        Self::new(StopWords::spanish())
    }

    /// Lowercase, collapse non-word runs into a space, drop stopwords and
    /// rejoin with single spaces
    pub fn clean(&self, text: &str) -> String {
        let lowered = text.to_lowercase();
        let spaced = NON_WORD.replace_all(&lowered, " ");
        spaced
            .split_whitespace()
            .filter(|word| !self.stopwords.contains(word))
            .collect::<Vec<_>>()
            .join(" ")
    }

    pub fn stopwords(&self) -> &StopWords {
        &self.stopwords
    }
}

/// Lowercased tokens of at least two word characters, in document order.
pub fn word_tokens(text: &str) -> Vec<String> {
    let lowered = text.to_lowercase();
    WORD_TOKEN
        .find_iter(&lowered)
        .map(|m| m.as_str().to_string())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_spanish_list_is_complete() {
        let stopwords = StopWords::spanish();
        assert_eq!(stopwords.len(), 313);
        assert!(stopwords.contains("el"));
        assert!(stopwords.contains("habían"));
        assert!(!stopwords.contains("aire"));
    }

    #[test]
    fn test_clean_reference_example() {
        let preprocessor = TextPreprocessor::spanish();
        let cleaned = preprocessor.clean("El aire acondicionado no funciona en la habitación 101");
        assert_eq!(cleaned, "aire acondicionado funciona habitación 101");
    }

    #[test]
    fn test_clean_strips_punctuation_runs() {
        let preprocessor = TextPreprocessor::spanish();
        assert_eq!(
            preprocessor.clean("¡¡Fuga de agua!!... en el baño, piso 3"),
            "fuga agua baño piso 3"
        );
    }

    #[test]
    fn test_clean_keeps_underscores_as_word_characters() {
        let preprocessor = TextPreprocessor::new(StopWords::none());
        assert_eq!(preprocessor.clean("error_code: E-42"), "error_code e 42");
    }

    #[test]
    fn test_clean_only_stopwords_yields_empty() {
        let preprocessor = TextPreprocessor::spanish();
        assert_eq!(preprocessor.clean("de la que el"), "");
    }

    #[test]
    fn test_word_tokens_skip_single_characters() {
        assert_eq!(
            word_tokens("A Server is DOWN, x 42!"),
            vec!["server", "is", "down", "42"]
        );
    }

    #[test]
    fn test_stopwords_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "# custom list\nfoo\n Bar \n\n").unwrap();

        let stopwords = StopWords::from_file(file.path()).unwrap();
        assert_eq!(stopwords.len(), 2);
        assert!(stopwords.contains("bar"));
    }

    #[test]
    fn test_empty_stopword_file_is_rejected() {
        let file = tempfile::NamedTempFile::new().unwrap();
        assert!(StopWords::from_file(file.path()).is_err());
    }
}
