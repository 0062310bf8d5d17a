use lazy_static::lazy_static;
use regex::Regex;
use unicode_normalization::UnicodeNormalization;

lazy_static! {
    // Runs of letters, combining marks and numbers; everything else is a boundary.
    static ref RE: Regex = Regex::new(r"[\p{Alphabetic}\p{M}\p{N}]+").expect("valid regex");
}

/// Lazily yield the terms of `text`: NFKC-fold and lowercase the whole text,
/// then split on non-alphanumeric boundaries. Empty tokens never appear.
pub fn terms(text: &str) -> impl Iterator<Item = String> {
    let normalized = text.nfkc().collect::<String>().to_lowercase();
    Terms { text: normalized, offset: 0 }
}

/// Owns the normalized text and walks it match by match.
struct Terms {
    text: String,
    offset: usize,
}

impl Iterator for Terms {
    type Item = String;

    fn next(&mut self) -> Option<String> {
        let mat = RE.find_at(&self.text, self.offset)?;
        self.offset = mat.end();
        Some(mat.as_str().to_string())
    }
}

/// Tokenize text into (term, position). Positions are ordinal and count only emitted terms.
pub fn tokenize(text: &str) -> Vec<(String, usize)> {
    terms(text).enumerate().map(|(pos, term)| (term, pos)).collect()
}
