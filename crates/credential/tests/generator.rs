//! Generator properties over the OS random source

use keyshift_credential::{CharGroup, GeneratorConfig, OsRandom, PasswordGenerator, RotationError};
use proptest::prelude::*;

fn config(length: usize) -> GeneratorConfig {
    GeneratorConfig {
        length,
        ..GeneratorConfig::default()
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    /// Every secret has the configured length and draws from every group
    #[test]
    fn prop_length_and_group_coverage(length in 4usize..96) {
        let config = config(length);
        let generator = PasswordGenerator::new(&config).unwrap();
        let secret = generator.generate(&mut OsRandom).unwrap();

        prop_assert_eq!(secret.expose().chars().count(), length);
        for group in &config.groups {
            prop_assert!(
                secret.expose().chars().any(|c| group.chars.contains(c)),
                "group {} missing from secret", group.name
            );
        }
    }

    /// No character outside the configured groups ever appears
    #[test]
    fn prop_alphabet_closure(length in 4usize..96) {
        let generator = PasswordGenerator::new(&config(length)).unwrap();
        let alphabet: Vec<char> = generator.alphabet().collect();
        let secret = generator.generate(&mut OsRandom).unwrap();
        prop_assert!(secret.expose().chars().all(|c| alphabet.contains(&c)));
    }

    /// A forced first group always supplies the leading character
    #[test]
    fn prop_first_group_leads(length in 5usize..48) {
        let config = GeneratorConfig {
            first_group: Some(CharGroup::uppercase()),
            ..config(length)
        };
        let generator = PasswordGenerator::new(&config).unwrap();
        let secret = generator.generate(&mut OsRandom).unwrap();
        let first = secret.expose().chars().next().unwrap();
        prop_assert!(CharGroup::uppercase().chars.contains(first));
    }
}

/// Two draws of a 24-character secret are never equal in practice
#[test]
fn test_consecutive_secrets_differ() {
    let generator = PasswordGenerator::new(&GeneratorConfig::default()).unwrap();
    let a = generator.generate(&mut OsRandom).unwrap();
    let b = generator.generate(&mut OsRandom).unwrap();
    assert_ne!(a, b);
}

#[test]
fn test_length_below_group_count_is_rejected() {
    let err = PasswordGenerator::new(&config(3)).unwrap_err();
    assert!(matches!(err, RotationError::Configuration { .. }));
}

#[test]
fn test_empty_group_is_rejected() {
    let config = GeneratorConfig {
        groups: vec![CharGroup::digits(), CharGroup::new("empty", "")],
        ..GeneratorConfig::default()
    };
    assert!(PasswordGenerator::new(&config).is_err());
}
