//! Validated recipe identifiers

use crate::constants::RECIPE_SUFFIX;
use crate::errors::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt::{self, Display};
use std::ops::Deref;
use std::str::FromStr;

/// A normalized recipe identifier such as `Firefox.install.recipe`.
///
/// Construction trims surrounding whitespace and appends the `.recipe`
/// suffix when it is missing. Comparison is case-sensitive.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct RecipeIdentifier(String);

impl RecipeIdentifier {
    /// Create a new RecipeIdentifier with validation and normalization
    pub fn new(raw: impl AsRef<str>) -> Result<Self> {
        let trimmed = raw.as_ref().trim();
        if trimmed.is_empty() {
            return Err(Error::invalid_identifier(
                raw.as_ref(),
                "identifier cannot be empty",
            ));
        }
        if trimmed.chars().any(|c| c.is_whitespace() || c == '/' || c == '\\') {
            return Err(Error::invalid_identifier(
                trimmed,
                "identifier must not contain whitespace or path separators",
            ));
        }
        if trimmed == RECIPE_SUFFIX {
            return Err(Error::invalid_identifier(
                trimmed,
                "identifier has a suffix but no name",
            ));
        }

        if trimmed.ends_with(RECIPE_SUFFIX) {
            Ok(Self(trimmed.to_string()))
        } else {
            Ok(Self(format!("{trimmed}{RECIPE_SUFFIX}")))
        }
    }

    /// Get the full identifier, suffix included
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The identifier without its `.recipe` suffix
    pub fn name(&self) -> &str {
        self.0.strip_suffix(RECIPE_SUFFIX).unwrap_or(&self.0)
    }

    /// Convert to String
    pub fn into_string(self) -> String {
        self.0
    }
}

impl Display for RecipeIdentifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl Deref for RecipeIdentifier {
    type Target = str;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl AsRef<str> for RecipeIdentifier {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl FromStr for RecipeIdentifier {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::new(s)
    }
}

impl TryFrom<&str> for RecipeIdentifier {
    type Error = Error;

    fn try_from(s: &str) -> Result<Self> {
        Self::new(s)
    }
}

impl TryFrom<String> for RecipeIdentifier {
    type Error = Error;

    fn try_from(s: String) -> Result<Self> {
        Self::new(s)
    }
}

impl From<RecipeIdentifier> for String {
    fn from(id: RecipeIdentifier) -> Self {
        id.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_suffix_is_appended() {
        let id = RecipeIdentifier::new("Firefox.install").unwrap();
        assert_eq!(id.as_str(), "Firefox.install.recipe");
        assert_eq!(id.name(), "Firefox.install");
    }

    #[test]
    fn test_existing_suffix_is_kept() {
        let id = RecipeIdentifier::new("  GoogleChrome.pkg.recipe\n").unwrap();
        assert_eq!(id.as_str(), "GoogleChrome.pkg.recipe");
    }

    #[test]
    fn test_comparison_is_case_sensitive() {
        let lower = RecipeIdentifier::new("firefox.install").unwrap();
        let upper = RecipeIdentifier::new("Firefox.install").unwrap();
        assert_ne!(lower, upper);
    }

    #[test]
    fn test_invalid_identifiers_are_rejected() {
        assert!(RecipeIdentifier::new("").is_err());
        assert!(RecipeIdentifier::new("   ").is_err());
        assert!(RecipeIdentifier::new(".recipe").is_err());
        assert!(RecipeIdentifier::new("Fire fox").is_err());
        assert!(RecipeIdentifier::new("../Firefox").is_err());
    }

    #[test]
    fn test_serde_round_trip_normalizes() {
        let id: RecipeIdentifier = serde_json::from_str("\"Slack.download\"").unwrap();
        assert_eq!(id.as_str(), "Slack.download.recipe");
        assert_eq!(
            serde_json::to_string(&id).unwrap(),
            "\"Slack.download.recipe\""
        );
        assert!(serde_json::from_str::<RecipeIdentifier>("\"\"").is_err());
    }

    proptest! {
        #[test]
        fn prop_normalization_is_idempotent(
            name in "[A-Za-z0-9_-]{1,16}(\\.[A-Za-z0-9_-]{1,16}){0,3}"
        ) {
            let once = RecipeIdentifier::new(&name).unwrap();
            let twice = RecipeIdentifier::new(once.as_str()).unwrap();
            prop_assert_eq!(&once, &twice);
            prop_assert!(once.as_str().ends_with(RECIPE_SUFFIX));
        }
    }
}
