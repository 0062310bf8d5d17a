use cinedex_core::tokenizer::{terms, tokenize};

#[test]
fn it_splits_on_non_alphanumeric_and_lowercases() {
    let toks = tokenize("Spider-Man: Into the Spider-Verse (2018)");
    let words: Vec<String> = toks.into_iter().map(|(w, _)| w).collect();
    assert_eq!(words, vec!["spider", "man", "into", "the", "spider", "verse", "2018"]);
}

#[test]
fn it_keeps_stopwords_and_does_not_stem() {
    let words: Vec<String> = terms("The Running Man and the Runners").collect();
    assert!(words.contains(&"the".to_string()));
    assert!(words.contains(&"and".to_string()));
    assert!(words.contains(&"running".to_string()));
    assert!(words.contains(&"runners".to_string()));
}

#[test]
fn it_folds_compatibility_forms() {
    // Ligature and full-width digits fold to their plain forms.
    let words: Vec<String> = terms("The ﬁfth Element ２０１").collect();
    assert_eq!(words, vec!["the", "fifth", "element", "201"]);
}

#[test]
fn it_handles_non_latin_text() {
    let words: Vec<String> = terms("Amélie — Le Fabuleux Destin d'Amélie Poulain").collect();
    assert_eq!(words, vec!["amélie", "le", "fabuleux", "destin", "d", "amélie", "poulain"]);
}

#[test]
fn it_is_restartable() {
    let text = "Crouching Tiger, Hidden Dragon";
    let first: Vec<String> = terms(text).collect();
    let second: Vec<String> = terms(text).collect();
    assert_eq!(first, second);
    assert_eq!(first.len(), 4);
}

#[test]
fn it_normalizes_before_splitting() {
    // ⑵ folds to "(2)"; the parentheses must become boundaries.
    let toks = tokenize("Rocky ⑵");
    assert_eq!(toks, vec![("rocky".to_string(), 0), ("2".to_string(), 1)]);
}
