//! Rule-based English noun lemmatizer.
//!
//! Reduces plural nouns to their dictionary form using an exception table for
//! irregular plurals followed by the usual detachment rules. Words the rules
//! would damage (`economics`, `analysis`, `status`) are left alone.

use lazy_static::lazy_static;
use std::collections::{HashMap, HashSet};

lazy_static! {
    static ref IRREGULAR: HashMap<&'static str, &'static str> = {
        let pairs: &[(&str, &str)] = &[
            ("analyses", "analysis"), ("axes", "axis"), ("bases", "basis"), ("children", "child"),
            ("crises", "crisis"), ("criteria", "criterion"), ("data", "datum"), ("diagnoses", "diagnosis"),
            ("feet", "foot"), ("geese", "goose"), ("hypotheses", "hypothesis"), ("indices", "index"),
            ("lives", "life"), ("men", "man"), ("mice", "mouse"), ("matrices", "matrix"),
            ("phenomena", "phenomenon"), ("syntheses", "synthesis"), ("teeth", "tooth"),
            ("theses", "thesis"), ("wives", "wife"), ("women", "woman"), ("appendices", "appendix"),
            ("curricula", "curriculum"), ("media", "medium"), ("strata", "stratum"), ("stimuli", "stimulus"),
            ("foci", "focus"), ("loci", "locus"), ("nuclei", "nucleus"), ("halves", "half"),
            ("shelves", "shelf"), ("selves", "self"), ("leaves", "leaf"), ("knives", "knife"),
        ];
        pairs.iter().copied().collect()
    };
    static ref INVARIANT: HashSet<&'static str> = {
        let words: &[&str] = &[
            "analytics", "economics", "ethics", "econometrics", "genetics", "logistics", "mathematics",
            "means", "news", "physics", "politics", "series", "species", "statistics", "dynamics",
            "linguistics", "mechanics", "robotics", "semantics", "aids", "covid", "always", "perhaps",
            "whereas", "thus", "towards", "across", "plus", "less", "was", "has", "does", "this",
            "its", "his", "yes", "various", "previous", "numerous", "chaos", "gas", "bias", "lens",
        ];
        words.iter().copied().collect()
    };
    /// Singulars in `-che` and `-ie`, whose plurals the `ches`/`ies` rules would clip.
    static ref E_SINGULARS: HashSet<&'static str> = {
        let words: &[&str] = &[
            "ache", "avalanche", "cache", "cliche", "headache", "moustache", "niche", "psyche",
            "auntie", "brownie", "calorie", "cookie", "genie", "goalie", "hippie", "movie", "newbie",
            "prairie", "rookie", "selfie", "sortie", "zombie",
        ];
        words.iter().copied().collect()
    };
}

/// Lemmatize one lowercase ASCII token.
pub fn lemmatize(token: &str) -> String {
    if let Some(lemma) = IRREGULAR.get(token) {
        return (*lemma).to_string();
    }
    if token.len() <= 3 || INVARIANT.contains(token) {
        return token.to_string();
    }
    if let Some(singular) = token.strip_suffix('s').filter(|s| E_SINGULARS.contains(s)) {
        return singular.to_string();
    }
    if let Some(stem) = token.strip_suffix("ies") {
        if stem.len() >= 2 {
            return format!("{stem}y");
        }
    }
    for (suffix, replacement) in [("sses", "ss"), ("xes", "x"), ("ches", "ch"), ("shes", "sh")] {
        if let Some(stem) = token.strip_suffix(suffix) {
            return format!("{stem}{replacement}");
        }
    }
    if token.ends_with("ss") || token.ends_with("us") || token.ends_with("is") {
        return token.to_string();
    }
    match token.strip_suffix('s') {
        Some(stem) => stem.to_string(),
        None => token.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::lemmatize;

    #[test]
    fn regular_plurals() {
        assert_eq!(lemmatize("outcomes"), "outcome");
        assert_eq!(lemmatize("markets"), "market");
        assert_eq!(lemmatize("studies"), "study");
        assert_eq!(lemmatize("classes"), "class");
        assert_eq!(lemmatize("taxes"), "tax");
        assert_eq!(lemmatize("approaches"), "approach");
    }

    #[test]
    fn irregular_and_invariant() {
        assert_eq!(lemmatize("women"), "woman");
        assert_eq!(lemmatize("criteria"), "criterion");
        assert_eq!(lemmatize("economics"), "economics");
        assert_eq!(lemmatize("analysis"), "analysis");
        assert_eq!(lemmatize("status"), "status");
        assert_eq!(lemmatize("business"), "business");
        assert_eq!(lemmatize("gas"), "gas");
    }

    #[test]
    fn che_and_ie_nouns_match_their_singular() {
        for singular in ["niche", "cache", "headache", "movie", "cookie", "calorie", "zombie"] {
            let plural = format!("{singular}s");
            assert_eq!(lemmatize(&plural), lemmatize(singular), "{plural}");
            assert_eq!(lemmatize(singular), singular);
        }
        assert_eq!(lemmatize("churches"), "church");
        assert_eq!(lemmatize("policies"), "policy");
    }

    #[test]
    fn singular_words_pass_through() {
        assert_eq!(lemmatize("health"), "health");
        assert_eq!(lemmatize("learning"), "learning");
        assert_eq!(lemmatize("economy"), "economy");
    }
}
