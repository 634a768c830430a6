use lazy_static::lazy_static;
use regex::Regex;
use rust_stemmers::{Algorithm, Stemmer};
use serde::{Deserialize, Serialize};
use unicode_normalization::UnicodeNormalization;

lazy_static! {
    static ref TOKEN: Regex = Regex::new(r"[a-z]+").expect("valid regex");
    static ref STEMMER: Stemmer = Stemmer::create(Algorithm::English);
}

/// Analysis settings. Recorded in the snapshot so queries are tokenized
/// exactly the way the corpus was at build time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalyzerOptions {
    pub stemming: bool,
}

impl Default for AnalyzerOptions {
    fn default() -> Self {
        Self { stemming: true }
    }
}

/// Tokenize text into normalized terms: NFKC fold, lowercase, alphabetic
/// runs only, optional English stemming.
pub fn tokenize(text: &str, options: AnalyzerOptions) -> Vec<String> {
    let normalized = text.nfkc().collect::<String>().to_lowercase();
    TOKEN
        .find_iter(&normalized)
        .map(|m| {
            let token = m.as_str();
            if options.stemming {
                STEMMER.stem(token).to_string()
            } else {
                token.to_string()
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lowercases_and_strips_punctuation() {
        let terms = tokenize("Sun, rain & snow: 42!", AnalyzerOptions { stemming: false });
        assert_eq!(terms, vec!["sun", "rain", "snow"]);
    }

    #[test]
    fn stems_by_default() {
        let terms = tokenize("running runs", AnalyzerOptions::default());
        assert!(terms.iter().all(|t| t == "run"));
    }

    #[test]
    fn stemming_can_be_disabled() {
        let terms = tokenize("running", AnalyzerOptions { stemming: false });
        assert_eq!(terms, vec!["running"]);
    }

    #[test]
    fn empty_text_yields_no_terms() {
        assert!(tokenize("  \n\t", AnalyzerOptions::default()).is_empty());
    }
}
