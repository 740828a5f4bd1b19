//! ECDH-PSI: the public-key double-mask protocol.
//!
//! Each party hashes its identifiers to curve points, masks them with a
//! fresh secret scalar, and exchanges the masked points. Applying the own
//! scalar to the peer's masked points yields commutatively
//! doubly-encrypted values: equal identifiers collapse to equal values,
//! which are compared via a 12-byte truncation.

use crate::{
    config::{self, get_bool, get_i64},
    utils::{check_consistency, generate_permutation, permute, unpermute},
    Error, ECC_COMPARE_BYTES_LEN, ECC_POINT_LEN,
};
use curve25519_dalek::{
    ristretto::{CompressedRistretto, RistrettoPoint},
    scalar::Scalar,
};
use log::info;
use rayon::prelude::*;
use seclink::{AbstractChannel, AesRng};
use serde_json::Value;
use sha2::Sha512;

/// The only elliptic-curve registry id this engine accepts.
const SUPPORTED_CURVE_ID: i64 = 415;

/// The ECDH-PSI scheme instance. Single-use: `init` freezes parameters
/// and samples the secret key, `process` runs one intersection.
pub struct EcdhPsi {
    is_sender: bool,
    verbose: bool,
    obtain_result: bool,
    remote_obtain_result: bool,
    sk: Scalar,
}

impl Default for EcdhPsi {
    fn default() -> Self {
        EcdhPsi {
            is_sender: true,
            verbose: false,
            obtain_result: false,
            remote_obtain_result: false,
            sk: Scalar::ZERO,
        }
    }
}

impl EcdhPsi {
    /// Create an uninitialized scheme object.
    pub fn new() -> Self {
        Self::default()
    }

    /// Merge the caller's parameters over the built-in defaults, run the
    /// parameter handshakes, and sample the secret key.
    pub fn init<C: AbstractChannel>(&mut self, channel: &mut C, params: &Value) -> Result<(), Error> {
        let mut merged = config::ecdh_psi_default();
        config::merge_patch(&mut merged, params);

        self.verbose = get_bool(&merged, "/common/verbose")?;
        self.is_sender = get_bool(&merged, "/common/is_sender")?;

        self.check_params(channel, &merged)?;

        if self.verbose {
            info!("\nECDH PSI parameters: \n{:#}", merged);
        }

        self.obtain_result = get_bool(&merged, "/ecdh_params/obtain_result")?;
        if self.is_sender {
            channel.write_bool(self.obtain_result)?;
            channel.flush()?;
            self.remote_obtain_result = channel.read_bool()?;
        } else {
            self.remote_obtain_result = channel.read_bool()?;
            channel.write_bool(self.obtain_result)?;
            channel.flush()?;
        }

        let curve_id = get_i64(&merged, "/ecdh_params/curve_id")?;
        if self.verbose {
            info!("ecc curve id is {}", curve_id);
        }

        let mut rng = AesRng::new();
        self.sk = Scalar::random(&mut rng);
        Ok(())
    }

    /// Validity and cross-party consistency of the ECDH parameters.
    fn check_params<C: AbstractChannel>(&self, channel: &mut C, params: &Value) -> Result<(), Error> {
        let curve_id = get_i64(params, "/ecdh_params/curve_id")?;
        check_consistency(self.is_sender, channel, "ecc_curve_id", curve_id)?;
        if curve_id != SUPPORTED_CURVE_ID {
            return Err(Error::InvalidArgument(format!(
                "curve_id {} is not supported, expected {}",
                curve_id, SUPPORTED_CURVE_ID
            )));
        }
        Ok(())
    }

    /// No preprocessing is needed for this scheme.
    pub fn preprocess_data<C: AbstractChannel>(
        &self,
        _channel: &mut C,
        input_keys: &[String],
    ) -> Result<Vec<String>, Error> {
        if self.verbose {
            info!("preprocess input keys done.");
        }
        Ok(input_keys.to_vec())
    }

    /// Run the intersection; returns the matching identifiers in input
    /// order, or an empty vector when this party opted out of the result.
    pub fn process<C: AbstractChannel>(
        &mut self,
        channel: &mut C,
        input_keys: &[String],
    ) -> Result<Vec<String>, Error> {
        let mut rng = AesRng::new();
        let permutation = generate_permutation(&mut rng, input_keys.len());
        let mut shuffled = input_keys.to_vec();
        permute(&permutation, &mut shuffled);
        if self.verbose {
            info!("shuffle input keys done.");
        }

        let encrypted = self.encrypt_keys(&shuffled);
        if self.verbose {
            info!("encrypt keys done.");
        }

        let exchanged = self.exchange_encrypted_keys(channel, &encrypted, ECC_POINT_LEN)?;
        drop(encrypted);
        if self.verbose {
            info!("send and receive encrypted keys done.");
        }

        let remote_doubly_encrypted = self.doubly_encrypt_keys(&exchanged)?;
        if self.verbose {
            info!("doubly encrypt keys done.");
        }

        let mut self_doubly_encrypted = if self.remote_obtain_result {
            self.exchange_encrypted_keys(channel, &remote_doubly_encrypted, ECC_COMPARE_BYTES_LEN)?
        } else {
            self.exchange_encrypted_keys(channel, &[], ECC_COMPARE_BYTES_LEN)?
        };
        if self.verbose {
            info!("send and receive doubly encrypted keys done.");
        }

        if !self.obtain_result {
            if self.verbose {
                info!("self can not obtain result.");
            }
            return Ok(Vec::new());
        }

        unpermute(&permutation, &mut self_doubly_encrypted);
        let mut remote_sorted = remote_doubly_encrypted;
        remote_sorted.sort_unstable();

        let mut output_keys = Vec::new();
        if !remote_sorted.is_empty() {
            for (idx, value) in self_doubly_encrypted.iter().enumerate() {
                if remote_sorted.binary_search(value).is_ok() {
                    output_keys.push(input_keys[idx].clone());
                }
            }
        }
        if self.verbose {
            info!("calculate intersection done.");
        }
        Ok(output_keys)
    }

    /// Run the intersection but only return its cardinality; the shuffle
    /// is never undone since the output is an aggregate.
    pub fn process_cardinality_only<C: AbstractChannel>(
        &mut self,
        channel: &mut C,
        input_keys: &[String],
    ) -> Result<usize, Error> {
        let mut rng = AesRng::new();
        let permutation = generate_permutation(&mut rng, input_keys.len());
        let mut shuffled = input_keys.to_vec();
        permute(&permutation, &mut shuffled);

        let encrypted = self.encrypt_keys(&shuffled);
        let exchanged = self.exchange_encrypted_keys(channel, &encrypted, ECC_POINT_LEN)?;
        drop(encrypted);

        let remote_doubly_encrypted = self.doubly_encrypt_keys(&exchanged)?;
        let self_doubly_encrypted = if self.remote_obtain_result {
            self.exchange_encrypted_keys(channel, &remote_doubly_encrypted, ECC_COMPARE_BYTES_LEN)?
        } else {
            self.exchange_encrypted_keys(channel, &[], ECC_COMPARE_BYTES_LEN)?
        };

        if !self.obtain_result {
            return Ok(0);
        }

        let mut remote_sorted = remote_doubly_encrypted;
        remote_sorted.sort_unstable();
        let mut cardinality = 0;
        if !remote_sorted.is_empty() {
            for value in self_doubly_encrypted.iter() {
                if remote_sorted.binary_search(value).is_ok() {
                    cardinality += 1;
                }
            }
        }
        if self.verbose {
            info!("calculate cardinality done.");
        }
        Ok(cardinality)
    }

    /// Hash every key to the curve and apply the secret mask, in
    /// parallel across the inputs.
    fn encrypt_keys(&self, input_keys: &[String]) -> Vec<Vec<u8>> {
        input_keys
            .par_iter()
            .map(|key| {
                let point = RistrettoPoint::hash_from_bytes::<Sha512>(key.as_bytes());
                (point * self.sk).compress().as_bytes().to_vec()
            })
            .collect()
    }

    /// Apply the secret mask a second time to the peer's masked points
    /// and truncate to the trailing comparison bytes.
    fn doubly_encrypt_keys(&self, exchanged: &[Vec<u8>]) -> Result<Vec<Vec<u8>>, Error> {
        exchanged
            .par_iter()
            .map(|bytes| {
                let compressed = CompressedRistretto::from_slice(bytes)
                    .map_err(|_| Error::CryptoFault("bad point encoding length".to_string()))?;
                let point = compressed
                    .decompress()
                    .ok_or_else(|| Error::CryptoFault("point decompression failed".to_string()))?;
                let doubled = (point * self.sk).compress();
                Ok(doubled.as_bytes()[ECC_POINT_LEN - ECC_COMPARE_BYTES_LEN..].to_vec())
            })
            .collect()
    }

    /// Exchange length-prefixed vectors of fixed-size point encodings:
    /// the sender writes first, the receiver mirrors.
    fn exchange_encrypted_keys<C: AbstractChannel>(
        &self,
        channel: &mut C,
        keys: &[Vec<u8>],
        point_byte_count: usize,
    ) -> Result<Vec<Vec<u8>>, Error> {
        if point_byte_count == 0 {
            return Err(Error::InvalidArgument(
                "length of an ECC point is 0".to_string(),
            ));
        }
        let write_side = |channel: &mut C| -> Result<(), Error> {
            channel.write_u64(keys.len() as u64)?;
            for key in keys.iter() {
                channel.write_bytes(key)?;
            }
            channel.flush()?;
            Ok(())
        };
        let read_side = |channel: &mut C| -> Result<Vec<Vec<u8>>, Error> {
            let received_size = channel.read_u64()? as usize;
            let mut received = Vec::with_capacity(received_size);
            for _ in 0..received_size {
                received.push(channel.read_vec(point_byte_count)?);
            }
            Ok(received)
        };
        if self.is_sender {
            write_side(channel)?;
            read_side(channel)
        } else {
            let received = read_side(channel)?;
            write_side(channel)?;
            Ok(received)
        }
    }
}
