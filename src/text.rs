use std::collections::HashSet;

/// Filter over normalized words. Returns `true` when the word may be used.
pub type WordPredicate = dyn Fn(&str) -> bool + Send + Sync;

/// Canonical form used for every word comparison: stored words, predicate
/// sets and sentence tokens all go through this function.
pub fn casefold(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            'ß' | 'ẞ' => out.push_str("ss"),
            'ς' => out.push('σ'),
            _ => out.extend(ch.to_lowercase()),
        }
    }
    out
}

pub fn same_word(a: &str, b: &str) -> bool {
    casefold(a) == casefold(b)
}

pub fn accept_all(_word: &str) -> bool {
    true
}

/// Builds a predicate that rejects every word in `words`, compared by case-fold.
pub fn exclude_words<I, S>(words: I) -> impl Fn(&str) -> bool + Send + Sync + 'static
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let excluded: HashSet<String> = words.into_iter().map(|w| casefold(w.as_ref())).collect();
    move |word: &str| !excluded.contains(&casefold(word))
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_casefold_basic() {
        assert_eq!(casefold("Casa"), "casa");
        assert_eq!(casefold("STRASSE"), casefold("Straße"));
        assert_eq!(casefold("ΟΔΟΣ"), casefold("οδος"));
        assert_eq!(casefold("οδός"), "οδόσ");
    }

    #[test]
    fn test_exclude_words_is_case_insensitive() {
        let pred = exclude_words(["Casa", "perro"]);
        assert!(!pred("casa"));
        assert!(!pred("CASA"));
        assert!(!pred("Perro"));
        assert!(pred("gato"));
    }

    #[test]
    fn test_exclude_nothing_accepts_everything() {
        let pred = exclude_words(Vec::<String>::new());
        assert!(pred("anything"));
        assert!(accept_all("anything"));
    }

    proptest! {
        #[test]
        fn prop_casefold_is_idempotent(s in "\\PC{0,24}") {
            let once = casefold(&s);
            prop_assert_eq!(casefold(&once), once);
        }

        #[test]
        fn prop_same_word_ignores_ascii_case(s in "[a-zA-Z]{1,16}") {
            prop_assert!(same_word(&s.to_uppercase(), &s.to_lowercase()));
        }
    }
}
