//! Random bin names.

use rand::seq::IndexedRandom as _;

use crate::config::{BinsConfig, ConfigError};

/// Draws bin names from a fixed alphabet.
#[derive(Debug, Clone)]
pub struct NameGenerator {
    alphabet: Vec<char>,
    length: usize,
}

impl NameGenerator {
    /// Generator for `length`-character names over `alphabet`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] if the alphabet is empty or the
    /// length is zero.
    pub fn new(alphabet: &str, length: usize) -> Result<Self, ConfigError> {
        let alphabet: Vec<char> = alphabet.chars().collect();
        if alphabet.is_empty() {
            return Err(ConfigError::Invalid(String::from(
                "bins.name_alphabet must not be empty",
            )));
        }
        if length == 0 {
            return Err(ConfigError::Invalid(String::from(
                "bins.name_length must be at least 1",
            )));
        }
        Ok(Self { alphabet, length })
    }

    /// Generator configured by the `bins` section.
    ///
    /// # Errors
    ///
    /// See [`Self::new`].
    pub fn from_config(config: &BinsConfig) -> Result<Self, ConfigError> {
        Self::new(&config.name_alphabet, config.name_length)
    }

    /// A fresh random name.
    pub fn generate(&self) -> String {
        let mut rng = rand::rng();
        (0..self.length)
            .filter_map(|_| self.alphabet.choose(&mut rng))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;

    #[test]
    fn names_have_configured_length_and_alphabet() {
        let names = NameGenerator::new("xyz", 12).unwrap();
        for _ in 0..50 {
            let name = names.generate();
            assert_eq!(name.chars().count(), 12);
            assert!(name.chars().all(|c| "xyz".contains(c)), "{name}");
        }
    }

    #[test]
    fn names_vary() {
        let names = NameGenerator::from_config(&BinsConfig::default()).unwrap();
        assert_ne!(names.generate(), names.generate());
    }

    #[test]
    fn empty_alphabet_or_length_is_rejected() {
        assert!(NameGenerator::new("", 10).is_err());
        assert!(NameGenerator::new("abc", 0).is_err());
    }
}
