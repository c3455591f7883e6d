//! Display language code.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Lower-cased language code such as `en` or `de`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub struct Language(String);

impl Language {
    /// Language that enrichment notes are authored in unless stated otherwise.
    pub const DEFAULT_CODE: &'static str = "en";

    pub fn new(code: impl AsRef<str>) -> Self {
        Self(code.as_ref().trim().to_ascii_lowercase())
    }

    pub fn code(&self) -> &str {
        &self.0
    }
}

impl Default for Language {
    fn default() -> Self {
        Self::new(Self::DEFAULT_CODE)
    }
}

impl From<String> for Language {
    fn from(s: String) -> Self {
        Self::new(s)
    }
}

impl From<&str> for Language {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<Language> for String {
    fn from(lang: Language) -> Self {
        lang.0
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_language_normalized() {
        assert_eq!(Language::new(" DE "), Language::new("de"));
        assert_eq!(Language::default().code(), "en");
        let parsed: Language = serde_json::from_str("\"RU\"").unwrap();
        assert_eq!(parsed.code(), "ru");
    }
}
