use lazy_static::lazy_static;
use regex::Regex;
use unicode_normalization::UnicodeNormalization;

lazy_static! {
    // Same character set as `char::is_alphanumeric`.
    static ref RE: Regex = Regex::new(r"[\p{Alphabetic}\p{N}]+").expect("valid regex");
}

/// Normalized text with its terms produced on demand.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tokens {
    buffer: String,
}

impl Tokens {
    /// Yields terms lazily; can be called repeatedly with the same result.
    pub fn iter(&self) -> impl Iterator<Item = &str> + '_ {
        RE.find_iter(&self.buffer).map(|m| m.as_str())
    }

    pub fn is_empty(&self) -> bool { self.iter().next().is_none() }
}

impl<'a> IntoIterator for &'a Tokens {
    type Item = &'a str;
    type IntoIter = Box<dyn Iterator<Item = &'a str> + 'a>;

    fn into_iter(self) -> Self::IntoIter { Box::new(self.iter()) }
}

/// Tokenize text using NFKC normalization and lowercasing; runs of
/// non-alphanumeric characters separate terms. No stemming, no stopwords.
pub fn tokenize(text: &str) -> Tokens {
    let buffer = text.nfkc().collect::<String>().to_lowercase();
    Tokens { buffer }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn terms(text: &str) -> Vec<String> {
        tokenize(text).iter().map(str::to_string).collect()
    }

    #[test]
    fn basic_tokenize() {
        assert_eq!(terms("The quick, brown FOX!"), ["the", "quick", "brown", "fox"]);
    }

    #[test]
    fn separators_collapse() {
        assert_eq!(terms("--a__b...c  "), ["a", "b", "c"]);
        assert!(terms("  !!  ").is_empty());
        assert!(tokenize("").is_empty());
    }

    #[test]
    fn keeps_digits_and_unicode_letters() {
        assert_eq!(terms("Straße 42 café"), ["straße", "42", "café"]);
    }

    #[test]
    fn restartable() {
        let tokens = tokenize("one two one");
        let first: Vec<&str> = tokens.iter().collect();
        let second: Vec<&str> = tokens.iter().collect();
        assert_eq!(first, second);
        assert_eq!(first, ["one", "two", "one"]);
    }
}
