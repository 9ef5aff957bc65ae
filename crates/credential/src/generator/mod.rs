//! Constraint-satisfying password generation
//!
//! Every configured character group contributes at least one character, and
//! the position of each character is decided independently of the group it
//! came from: each character gets a random 32-bit sort key and the output is
//! the characters in key order.

mod random;

#[cfg(test)]
pub(crate) use random::testing;
pub use random::{OsRandom, SecureRandom};

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::core::Secret;
use crate::rotation::{RotationError, RotationResult};
use random::uniform_index;

/// Default secret length
pub const DEFAULT_LENGTH: usize = 24;

/// A named set of characters
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CharGroup {
    /// Group name, used in error messages
    pub name: String,
    /// Characters of the group
    pub chars: String,
}

impl CharGroup {
    /// Create a group
    pub fn new(name: impl Into<String>, chars: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            chars: chars.into(),
        }
    }

    /// Lowercase letters without `l` and `o`
    pub fn lowercase() -> Self {
        Self::new("lowercase", "abcdefghijkmnpqrstuvwxyz")
    }

    /// Uppercase letters without `I` and `O`
    pub fn uppercase() -> Self {
        Self::new("uppercase", "ABCDEFGHJKLMNPQRSTUVWXYZ")
    }

    /// Decimal digits
    pub fn digits() -> Self {
        Self::new("digits", "0123456789")
    }

    /// Symbols accepted by every target subsystem
    pub fn symbols() -> Self {
        Self::new("symbols", "!#$%*+-=?@_")
    }
}

/// Generator parameters
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneratorConfig {
    /// Target secret length
    pub length: usize,
    /// Groups that must each appear at least once, in draw order
    pub groups: Vec<CharGroup>,
    /// Group that always supplies the first character
    pub first_group: Option<CharGroup>,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            length: DEFAULT_LENGTH,
            groups: vec![
                CharGroup::lowercase(),
                CharGroup::uppercase(),
                CharGroup::digits(),
                CharGroup::symbols(),
            ],
            first_group: None,
        }
    }
}

/// Validated password generator
#[derive(Debug, Clone)]
pub struct PasswordGenerator {
    length: usize,
    groups: Vec<Vec<char>>,
    first_group: Option<Vec<char>>,
    union: Vec<char>,
}

impl PasswordGenerator {
    /// Validate a configuration and build a generator
    ///
    /// # Errors
    ///
    /// `Configuration` when the length is zero, a group is empty, or the
    /// length cannot hold one character per mandatory group.
    pub fn new(config: &GeneratorConfig) -> RotationResult<Self> {
        if config.length == 0 {
            return Err(RotationError::configuration("secret length must be positive"));
        }
        if config.groups.is_empty() {
            return Err(RotationError::configuration(
                "at least one character group is required",
            ));
        }
        for group in config.groups.iter().chain(config.first_group.iter()) {
            if group.chars.is_empty() {
                return Err(RotationError::configuration(format!(
                    "character group '{}' is empty",
                    group.name
                )));
            }
        }

        let mandatory = config.groups.len() + usize::from(config.first_group.is_some());
        if config.length < mandatory {
            return Err(RotationError::configuration(format!(
                "secret length {} is smaller than the {} mandatory character groups",
                config.length, mandatory
            )));
        }

        let groups: Vec<Vec<char>> = config.groups.iter().map(|g| g.chars.chars().collect()).collect();
        let mut union: Vec<char> = Vec::new();
        for ch in groups.iter().flatten() {
            if !union.contains(ch) {
                union.push(*ch);
            }
        }

        Ok(Self {
            length: config.length,
            groups,
            first_group: config.first_group.as_ref().map(|g| g.chars.chars().collect()),
            union,
        })
    }

    /// Target length
    pub const fn length(&self) -> usize {
        self.length
    }

    /// Every character the generator can emit
    pub fn alphabet(&self) -> impl Iterator<Item = char> + '_ {
        self.union.iter().chain(self.first_group.iter().flatten()).copied()
    }

    /// Generate one secret
    ///
    /// # Errors
    ///
    /// `Entropy` when the random source fails.
    pub fn generate(&self, rng: &mut dyn SecureRandom) -> RotationResult<Secret> {
        let mut keyed: BTreeMap<u32, char> = BTreeMap::new();

        if let Some(first) = &self.first_group {
            keyed.insert(0, draw(rng, first)?);
        }

        for group in &self.groups {
            if keyed.len() >= self.length {
                break;
            }
            let ch = draw(rng, group)?;
            let key = unique_key(rng, &keyed)?;
            keyed.insert(key, ch);
        }

        while keyed.len() < self.length {
            let ch = draw(rng, &self.union)?;
            let key = unique_key(rng, &keyed)?;
            keyed.insert(key, ch);
        }

        Ok(Secret::new(keyed.into_values().collect::<String>()))
    }
}

fn draw(rng: &mut dyn SecureRandom, chars: &[char]) -> RotationResult<char> {
    Ok(chars[uniform_index(rng, chars.len())?])
}

fn unique_key(rng: &mut dyn SecureRandom, taken: &BTreeMap<u32, char>) -> RotationResult<u32> {
    loop {
        let key = rng.next_u32()?;
        if !taken.contains_key(&key) {
            return Ok(key);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::testing::SequenceRandom;
    use super::*;
    use pretty_assertions::assert_eq;

    fn config(length: usize, groups: &[&str]) -> GeneratorConfig {
        GeneratorConfig {
            length,
            groups: groups
                .iter()
                .enumerate()
                .map(|(i, chars)| CharGroup::new(format!("g{i}"), *chars))
                .collect(),
            first_group: None,
        }
    }

    #[test]
    fn test_characters_are_ordered_by_sort_key() {
        // g0 'a' key 50, g1 'D' key 10, union "abCD"[2] = 'C' key 30
        let generator = PasswordGenerator::new(&config(3, &["ab", "CD"])).unwrap();
        let mut rng = SequenceRandom::new(vec![0, 50, 1, 10, 2, 30]);

        let secret = generator.generate(&mut rng).unwrap();

        assert_eq!(secret.expose(), "DCa");
    }

    #[test]
    fn test_colliding_sort_key_is_redrawn() {
        let generator = PasswordGenerator::new(&config(2, &["ab", "CD"])).unwrap();
        // 'a' key 7, 'C' key 7 (collision) then 3
        let mut rng = SequenceRandom::new(vec![0, 7, 0, 7, 3]);

        let secret = generator.generate(&mut rng).unwrap();

        assert_eq!(secret.expose(), "Ca");
    }

    #[test]
    fn test_first_group_always_leads() {
        let mut cfg = config(3, &["ab", "CD"]);
        cfg.first_group = Some(CharGroup::new("lead", "Z"));
        let generator = PasswordGenerator::new(&cfg).unwrap();
        // 'Z' key 0; 'b' draws key 0 (taken by the lead) then 4; 'C' key 2
        let mut rng = SequenceRandom::new(vec![9, 1, 0, 4, 0, 2]);

        let secret = generator.generate(&mut rng).unwrap();

        assert_eq!(secret.expose(), "ZCb");
    }

    #[test]
    fn test_length_smaller_than_group_count_is_rejected() {
        let err = PasswordGenerator::new(&config(2, &["a", "b", "c"])).unwrap_err();
        assert!(matches!(err, RotationError::Configuration { .. }));
    }

    #[test]
    fn test_first_group_counts_as_mandatory() {
        let mut cfg = config(2, &["a", "b"]);
        cfg.first_group = Some(CharGroup::new("lead", "Z"));
        assert!(PasswordGenerator::new(&cfg).is_err());
    }

    #[test]
    fn test_empty_group_is_rejected() {
        assert!(PasswordGenerator::new(&config(4, &["ab", ""])).is_err());
    }

    #[test]
    fn test_zero_length_is_rejected() {
        assert!(PasswordGenerator::new(&config(0, &["ab"])).is_err());
    }

    #[test]
    fn test_default_alphabet_excludes_ambiguous_letters() {
        let generator = PasswordGenerator::new(&GeneratorConfig::default()).unwrap();
        let alphabet: String = generator.alphabet().collect();
        for ambiguous in ['l', 'o', 'I', 'O'] {
            assert!(!alphabet.contains(ambiguous), "{ambiguous} must be excluded");
        }
        assert_eq!(generator.length(), 24);
    }

    #[test]
    fn test_entropy_failure_propagates() {
        struct Broken;
        impl SecureRandom for Broken {
            fn next_u32(&mut self) -> RotationResult<u32> {
                Err(RotationError::Entropy("device gone".into()))
            }
        }

        let generator = PasswordGenerator::new(&GeneratorConfig::default()).unwrap();
        let err = generator.generate(&mut Broken).unwrap_err();
        assert!(err.is_fatal());
    }
}
