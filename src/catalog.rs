// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

//! Class catalog and translation table.
//!
//! The class catalog is the ordered list of sign names. Its order defines the
//! integer labels, so the catalog stored with a trained classifier must match
//! the runtime catalog exactly. The translation table maps every sign name to
//! a small `language -> text` record.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{Result, SignError};
use crate::sequence::SequenceTable;

/// Ordered, immutable list of sign names.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<String>", into = "Vec<String>")]
pub struct ClassCatalog {
    names: Vec<String>,
}

impl ClassCatalog {
    /// Create a catalog from ordered class names.
    ///
    /// # Errors
    ///
    /// Returns a configuration error if the list is empty, contains an empty
    /// name, or contains duplicates.
    pub fn new<I, S>(names: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let names: Vec<String> = names.into_iter().map(Into::into).collect();
        if names.is_empty() {
            return Err(SignError::ConfigError("class catalog is empty".to_string()));
        }
        for (i, name) in names.iter().enumerate() {
            if name.trim().is_empty() {
                return Err(SignError::ConfigError(format!(
                    "class catalog entry {i} is empty"
                )));
            }
            if names[..i].contains(name) {
                return Err(SignError::ConfigError(format!(
                    "class catalog contains '{name}' twice"
                )));
            }
        }
        Ok(Self { names })
    }

    /// Number of classes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.names.len()
    }

    /// Always false for a constructed catalog.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// Class name for a label.
    #[must_use]
    pub fn name(&self, label: usize) -> Option<&str> {
        self.names.get(label).map(String::as_str)
    }

    /// Label for a class name.
    #[must_use]
    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.names.iter().position(|n| n == name)
    }

    /// Class names in label order.
    #[must_use]
    pub fn names(&self) -> &[String] {
        &self.names
    }

    /// Check that a runtime catalog is identical to this one.
    ///
    /// # Errors
    ///
    /// Returns a configuration error naming the first difference.
    pub fn ensure_matches(&self, other: &Self) -> Result<()> {
        if self == other {
            return Ok(());
        }
        Err(SignError::ConfigError(format!(
            "class catalog mismatch: model was trained on [{}] but configuration lists [{}]",
            self.names.join(", "),
            other.names.join(", ")
        )))
    }
}

impl TryFrom<Vec<String>> for ClassCatalog {
    type Error = SignError;

    fn try_from(names: Vec<String>) -> Result<Self> {
        Self::new(names)
    }
}

impl From<ClassCatalog> for Vec<String> {
    fn from(catalog: ClassCatalog) -> Self {
        catalog.names
    }
}

/// Per-sign translations: `class name -> (language code -> text)`.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TranslationTable {
    entries: BTreeMap<String, BTreeMap<String, String>>,
}

impl TranslationTable {
    /// Create an empty table.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace one translation.
    #[must_use]
    pub fn with(mut self, class: &str, language: &str, text: &str) -> Self {
        self.insert(class, language, text);
        self
    }

    /// Add or replace one translation in place.
    pub fn insert(&mut self, class: &str, language: &str, text: &str) {
        self.entries
            .entry(class.to_string())
            .or_default()
            .insert(language.to_string(), text.to_string());
    }

    /// All translations of a sign.
    #[must_use]
    pub fn lookup(&self, class: &str) -> Option<&BTreeMap<String, String>> {
        self.entries.get(class)
    }

    /// Translation of a sign in one language.
    #[must_use]
    pub fn text(&self, class: &str, language: &str) -> Option<&str> {
        self.entries
            .get(class)
            .and_then(|langs| langs.get(language))
            .map(String::as_str)
    }

    /// Check that every catalog class has at least one translation.
    ///
    /// # Errors
    ///
    /// Returns a configuration error listing the classes without entries.
    pub fn validate(&self, catalog: &ClassCatalog) -> Result<()> {
        let missing: Vec<&str> = catalog
            .names()
            .iter()
            .filter(|name| self.entries.get(*name).is_none_or(BTreeMap::is_empty))
            .map(String::as_str)
            .collect();
        if missing.is_empty() {
            Ok(())
        } else {
            Err(SignError::ConfigError(format!(
                "translation table has no entry for: {}",
                missing.join(", ")
            )))
        }
    }
}

/// Sign configuration file: class catalog plus translations.
///
/// ```json
/// {
///   "classes": ["A", "B", "C"],
///   "translations": {
///     "A": {"en": "Apple", "hi": "सेब"},
///     "B": {"en": "Ball", "hi": "गेंद"},
///     "C": {"en": "Cat", "hi": "बिल्ली"}
///   },
///   "sequences": {"cab": ["C", "A", "B"]}
/// }
/// ```
///
/// `sequences` is optional and maps a word to the signs that spell it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignConfig {
    /// Ordered class catalog.
    pub classes: ClassCatalog,
    /// Translations for every class.
    #[serde(default)]
    pub translations: TranslationTable,
    /// Words recognized from consecutive stable signs.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub sequences: SequenceTable,
}

impl Default for SignConfig {
    fn default() -> Self {
        let classes = ["A", "B", "C"].map(str::to_string).to_vec();
        Self {
            classes: ClassCatalog { names: classes },
            translations: TranslationTable::new()
                .with("A", "en", "Apple")
                .with("A", "hi", "सेब")
                .with("B", "en", "Ball")
                .with("B", "hi", "गेंद")
                .with("C", "en", "Cat")
                .with("C", "hi", "बिल्ली"),
            sequences: SequenceTable::new(),
        }
    }
}

impl SignConfig {
    /// Load and validate a sign configuration from a JSON file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, is malformed, or a class
    /// has no translation.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|e| {
            SignError::io(format!("Failed to read {}", path.display()), e)
        })?;
        Self::from_json(&content)
    }

    /// Parse and validate a sign configuration from JSON text.
    ///
    /// # Errors
    ///
    /// Returns an error if the JSON is malformed or a class has no translation.
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Check that the translation table covers the catalog and that every
    /// word sequence is spelled with catalog signs.
    ///
    /// # Errors
    ///
    /// Returns a configuration error for missing translations, empty
    /// sequences, or sequences that use unknown signs.
    pub fn validate(&self) -> Result<()> {
        self.translations.validate(&self.classes)?;
        for (word, signs) in &self.sequences {
            if signs.is_empty() {
                return Err(SignError::ConfigError(format!(
                    "sequence for '{word}' has no signs"
                )));
            }
            if let Some(unknown) = signs.iter().find(|s| self.classes.index_of(s).is_none()) {
                return Err(SignError::ConfigError(format!(
                    "sequence for '{word}' uses unknown sign '{unknown}'"
                )));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_catalog_rejects_bad_input() {
        assert!(ClassCatalog::new(Vec::<String>::new()).is_err());
        assert!(ClassCatalog::new(["A", "B", "A"]).is_err());
        assert!(ClassCatalog::new(["A", " "]).is_err());
    }

    #[test]
    fn test_catalog_order_defines_labels() {
        let catalog = ClassCatalog::new(["B", "A", "C"]).unwrap();
        assert_eq!(catalog.index_of("B"), Some(0));
        assert_eq!(catalog.index_of("C"), Some(2));
        assert_eq!(catalog.name(1), Some("A"));
        assert_eq!(catalog.name(3), None);
    }

    #[test]
    fn test_catalog_mismatch_detected() {
        let trained = ClassCatalog::new(["A", "B", "C"]).unwrap();
        let reordered = ClassCatalog::new(["A", "C", "B"]).unwrap();

        assert!(trained.ensure_matches(&trained.clone()).is_ok());
        assert!(matches!(
            trained.ensure_matches(&reordered),
            Err(SignError::ConfigError(_))
        ));
    }

    #[test]
    fn test_default_config_is_valid() {
        let config = SignConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.classes.len(), 3);
        assert_eq!(config.translations.text("A", "en"), Some("Apple"));
        assert_eq!(config.translations.text("C", "hi"), Some("बिल्ली"));
    }

    #[test]
    fn test_missing_translation_rejected() {
        let json = r#"{
            "classes": ["A", "B"],
            "translations": {"A": {"en": "Apple"}}
        }"#;
        let err = SignConfig::from_json(json).unwrap_err();
        assert!(err.to_string().contains('B'));
    }

    #[test]
    fn test_duplicate_classes_rejected_on_load() {
        let json = r#"{"classes": ["A", "A"], "translations": {"A": {"en": "Apple"}}}"#;
        assert!(SignConfig::from_json(json).is_err());
    }

    #[test]
    fn test_sequences_checked_against_catalog() {
        let json = r#"{
            "classes": ["A", "B"],
            "translations": {"A": {"en": "Apple"}, "B": {"en": "Ball"}},
            "sequences": {"abba": ["A", "B", "B", "A"]}
        }"#;
        let config = SignConfig::from_json(json).unwrap();
        assert_eq!(config.sequences["abba"].len(), 4);

        let unknown = json.replace(r#"["A", "B", "B", "A"]"#, r#"["A", "Z"]"#);
        let err = SignConfig::from_json(&unknown).unwrap_err();
        assert!(err.to_string().contains("'Z'"));

        let empty = json.replace(r#"["A", "B", "B", "A"]"#, "[]");
        assert!(matches!(
            SignConfig::from_json(&empty),
            Err(SignError::ConfigError(_))
        ));
    }

    #[test]
    fn test_config_json_roundtrip() {
        let config = SignConfig::default();
        let json = serde_json::to_string(&config).unwrap();
        assert_eq!(SignConfig::from_json(&json).unwrap(), config);
    }
}
