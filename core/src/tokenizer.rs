use crate::lemmatizer::lemmatize;
use unicode_normalization::char::is_combining_mark;
use unicode_normalization::UnicodeNormalization;

/// Normalize text into index terms: fold accents, replace everything that is not
/// an ASCII letter with a space, lowercase, split on whitespace and lemmatize.
///
/// Titles are indexed and queries are parsed through this one function.
pub fn tokenize(text: &str) -> Vec<String> {
    let folded: String = text
        .nfkd()
        .filter(|c| !is_combining_mark(*c))
        .map(|c| if c.is_ascii_alphabetic() { c.to_ascii_lowercase() } else { ' ' })
        .collect();
    folded.split_whitespace().map(lemmatize).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn basic_tokenize() {
        let t = tokenize("Health Outcomes, 2nd edition!");
        assert_eq!(t, vec!["health", "outcome", "nd", "edition"]);
    }

    #[test]
    fn empty_input_yields_no_terms() {
        assert!(tokenize("").is_empty());
        assert!(tokenize("  2024 -- 42 ").is_empty());
    }
}
