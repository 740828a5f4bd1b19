//! Random key and feature generation for examples and benchmarks.
//!
//! Identifiers alternate digits and letters so they read as plausible
//! opaque ids; a deterministic seed lets two processes generate the same
//! common subset independently.

use rand::Rng;
use seclink::AesRng;

/// Length of a generated identifier, excluding the suffix.
pub const IDENTIFIER_LEN: usize = 32;

const ALPHABET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz";
const DIGITS: &[u8] = b"0123456789";

/// Generate `n` random identifiers, each with `suffix` appended.
pub fn generate_random_keys(rng: &mut AesRng, n: usize, suffix: &str) -> Vec<String> {
    (0..n)
        .map(|_| {
            let mut identifier = String::with_capacity(IDENTIFIER_LEN + suffix.len());
            for idx in 0..IDENTIFIER_LEN {
                let byte: u8 = rng.gen();
                if idx & 1 == 1 {
                    identifier.push(ALPHABET[byte as usize % ALPHABET.len()] as char);
                } else {
                    identifier.push(DIGITS[byte as usize % DIGITS.len()] as char);
                }
            }
            identifier.push_str(suffix);
            identifier
        })
        .collect()
}

/// Generate `n` random features, or zeros when `is_zero` is set.
pub fn generate_random_features(rng: &mut AesRng, n: usize, is_zero: bool) -> Vec<u64> {
    if is_zero {
        vec![0; n]
    } else {
        (0..n).map(|_| rng.gen()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use seclink::Block;

    #[test]
    fn test_common_seed_gives_common_keys() {
        let mut a = AesRng::from_seed(Block::from(7u128));
        let mut b = AesRng::from_seed(Block::from(7u128));
        assert_eq!(
            generate_random_keys(&mut a, 10, "0"),
            generate_random_keys(&mut b, 10, "0")
        );
    }

    #[test]
    fn test_shape() {
        let mut rng = AesRng::new();
        let keys = generate_random_keys(&mut rng, 5, "x");
        assert_eq!(keys.len(), 5);
        assert!(keys.iter().all(|k| k.len() == IDENTIFIER_LEN + 1));
        assert_eq!(generate_random_features(&mut rng, 4, true), vec![0; 4]);
        assert_eq!(generate_random_features(&mut rng, 4, false).len(), 4);
    }
}
