//! Protocol utilities shared by the schemes: identifier hashing,
//! permutations, the parameter-consistency handshake, string
//! serialization, and a small wall-clock timer.

use crate::{Error, Item, ITEM_BYTES_LEN};
use log::info;
use rand::Rng;
use seclink::AbstractChannel;
use sha2::{Digest, Sha256};
use std::time::Instant;

/// Hash every identifier down to a fixed-length [`Item`] (truncated
/// SHA-256).
pub fn hash_keys_to_items(keys: &[String]) -> Vec<Item> {
    keys.iter()
        .map(|key| {
            let digest = Sha256::digest(key.as_bytes());
            let mut item = [0u8; ITEM_BYTES_LEN];
            item.copy_from_slice(&digest[0..ITEM_BYTES_LEN]);
            item
        })
        .collect()
}

/// Generate a uniformly random permutation of `0..n` by Fisher-Yates.
pub fn generate_permutation<R: Rng>(rng: &mut R, n: usize) -> Vec<usize> {
    let mut permutation: Vec<usize> = (0..n).collect();
    for i in (1..n).rev() {
        let j = rng.gen_range(0..=i);
        permutation.swap(i, j);
    }
    permutation
}

/// Apply `permutation` to `data`: `out[i] = data[permutation[i]]`.
pub fn permute<T: Clone>(permutation: &[usize], data: &mut Vec<T>) {
    let mut out = Vec::with_capacity(data.len());
    for &p in permutation.iter() {
        out.push(data[p].clone());
    }
    *data = out;
}

/// Undo `permutation` on `data`: `out[permutation[i]] = data[i]`.
pub fn unpermute<T: Clone + Default>(permutation: &[usize], data: &mut Vec<T>) {
    let mut out = vec![T::default(); data.len()];
    for (i, &p) in permutation.iter().enumerate() {
        out[p] = data[i].clone();
    }
    *data = out;
}

/// A numeric value that can be exchanged bit-exactly during the
/// parameter-consistency handshake.
pub trait WireParam: Copy + PartialEq + std::fmt::Display {
    /// Little-endian byte representation.
    fn to_wire(self) -> Vec<u8>;
    /// Recover a value from its wire representation.
    fn from_wire(bytes: &[u8]) -> Self;
}

impl WireParam for u64 {
    fn to_wire(self) -> Vec<u8> {
        self.to_le_bytes().to_vec()
    }
    fn from_wire(bytes: &[u8]) -> Self {
        u64::from_le_bytes(bytes.try_into().unwrap())
    }
}

impl WireParam for i64 {
    fn to_wire(self) -> Vec<u8> {
        self.to_le_bytes().to_vec()
    }
    fn from_wire(bytes: &[u8]) -> Self {
        i64::from_le_bytes(bytes.try_into().unwrap())
    }
}

impl WireParam for f64 {
    fn to_wire(self) -> Vec<u8> {
        self.to_bits().to_le_bytes().to_vec()
    }
    fn from_wire(bytes: &[u8]) -> Self {
        f64::from_bits(u64::from_le_bytes(bytes.try_into().unwrap()))
    }
}

/// Exchange `value` with the peer (sender writes first) and fail if the
/// two sides disagree bit-exactly.
pub fn check_consistency<T: WireParam, C: AbstractChannel>(
    is_sender: bool,
    channel: &mut C,
    label: &str,
    value: T,
) -> Result<(), Error> {
    let ours = value.to_wire();
    let mut theirs = vec![0u8; ours.len()];
    if is_sender {
        channel.write_bytes(&ours)?;
        channel.flush()?;
        channel.read_bytes(&mut theirs)?;
    } else {
        channel.read_bytes(&mut theirs)?;
        channel.write_bytes(&ours)?;
        channel.flush()?;
    }
    if ours != theirs {
        return Err(Error::InconsistentParameter {
            label: label.to_string(),
            ours: value.to_string(),
            theirs: T::from_wire(&theirs).to_string(),
        });
    }
    Ok(())
}

/// Serialize a sequence of strings as concatenated NUL-terminated byte
/// strings.
pub fn serialize_strings(input: &[String]) -> Vec<u8> {
    let mut out = Vec::with_capacity(input.iter().map(|s| s.len() + 1).sum());
    for s in input.iter() {
        out.extend_from_slice(s.as_bytes());
        out.push(0);
    }
    out
}

/// Recover a sequence of strings from NUL-terminated concatenation.
pub fn deserialize_strings(bytes: &[u8]) -> Result<Vec<String>, Error> {
    let mut out = Vec::new();
    let mut start = 0;
    for (i, b) in bytes.iter().enumerate() {
        if *b == 0 {
            let s = std::str::from_utf8(&bytes[start..i])
                .map_err(|e| Error::InvalidArgument(format!("malformed key bytes: {}", e)))?;
            out.push(s.to_string());
            start = i + 1;
        }
    }
    Ok(out)
}

/// Wall-clock timer logging elapsed seconds for a labelled phase.
pub struct Timer {
    start: Instant,
    label: String,
}

impl Timer {
    /// Start timing `label`.
    pub fn new(label: &str) -> Self {
        Timer {
            start: Instant::now(),
            label: label.to_string(),
        }
    }

    /// Seconds elapsed since construction.
    pub fn elapsed_secs(&self) -> f64 {
        self.start.elapsed().as_secs_f64()
    }

    /// Log the elapsed time at info level.
    pub fn report(&self) {
        info!("[{}] elapsed: {:.6} s", self.label, self.elapsed_secs());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use seclink::{unix_channel_pair, AesRng};

    #[test]
    fn test_hash_keys_fixed_length_and_distinct() {
        let keys = vec!["c".to_string(), "h".to_string(), "ch".to_string()];
        let items = hash_keys_to_items(&keys);
        assert_eq!(items.len(), 3);
        assert_ne!(items[0], items[1]);
        assert_ne!(items[0], items[2]);
        // determinism
        assert_eq!(items, hash_keys_to_items(&keys));
    }

    #[test]
    fn test_permutation_roundtrip() {
        let mut rng = AesRng::new();
        let permutation = generate_permutation(&mut rng, 100);
        let mut sorted = permutation.clone();
        sorted.sort_unstable();
        assert_eq!(sorted, (0..100).collect::<Vec<usize>>());

        let original: Vec<u64> = (0..100).map(|i| i * 7).collect();
        let mut data = original.clone();
        permute(&permutation, &mut data);
        unpermute(&permutation, &mut data);
        assert_eq!(data, original);
    }

    #[test]
    fn test_serialize_roundtrip() {
        let input = vec!["c".to_string(), "".to_string(), "egg".to_string()];
        let bytes = serialize_strings(&input);
        assert_eq!(bytes.len(), 1 + 1 + 1 + 3 + 1);
        assert_eq!(deserialize_strings(&bytes).unwrap(), input);
    }

    #[test]
    fn test_consistency_agreement() {
        let (mut left, mut right) = unix_channel_pair();
        let handle = std::thread::spawn(move || {
            check_consistency(true, &mut left, "epsilon", 1.27f64)
        });
        let ours = check_consistency(false, &mut right, "epsilon", 1.27f64);
        let theirs = handle.join().unwrap();
        assert!(ours.is_ok());
        assert!(theirs.is_ok());
    }

    #[test]
    fn test_consistency_mismatch_raises_on_both_sides() {
        let (mut left, mut right) = unix_channel_pair();
        let handle = std::thread::spawn(move || {
            check_consistency(true, &mut left, "ecc_curve_id", 415i64)
        });
        let ours = check_consistency(false, &mut right, "ecc_curve_id", 414i64);
        let theirs = handle.join().unwrap();
        for result in [ours, theirs] {
            match result {
                Err(Error::InconsistentParameter { label, .. }) => {
                    assert_eq!(label, "ecc_curve_id")
                }
                other => panic!("unexpected: {:?}", other),
            }
        }
    }
}
