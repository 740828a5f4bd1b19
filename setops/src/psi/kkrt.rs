//! KKRT-PSI: cuckoo/simple hashing plus the batched OPRF.
//!
//! The receiver cuckoo-hashes its items and evaluates the per-bin OPRF on
//! each entry; the sender simple-hashes, evaluates the same functions on
//! every stored copy, and ships the truncated masks grouped by hash
//! function and independently shuffled per group. Equal items under the
//! same function yield equal masks, so the receiver recognizes its
//! matches by mask lookup.

use crate::{
    config::{get_bool, get_f64, get_u64},
    hashing::{CuckooTable, SimpleTable},
    utils::{
        check_consistency, deserialize_strings, generate_permutation, hash_keys_to_items, permute,
        serialize_strings,
    },
    Error, Item, REDUCE_STATISTICS_LEN,
};
use log::info;
use obliv::{
    oprf,
    ot::{NaorPinkasReceiver, NaorPinkasSender},
};
use rand::{Rng, SeedableRng};
use seclink::{cointoss, AbstractChannel, AesRng, Block};
use serde_json::Value;

type OprfSender = oprf::KkrtSender<NaorPinkasReceiver>;
type OprfReceiver = oprf::KkrtReceiver<NaorPinkasSender>;

/// The KKRT-PSI scheme instance.
pub struct KkrtPsi {
    is_sender: bool,
    verbose: bool,
    epsilon: f64,
    fun_num: usize,
    sender_obtain_result: bool,
    prng: AesRng,
    common_prng: AesRng,
    oprf_sender: Option<OprfSender>,
    oprf_receiver: Option<OprfReceiver>,
}

impl Default for KkrtPsi {
    fn default() -> Self {
        KkrtPsi {
            is_sender: true,
            verbose: false,
            epsilon: 0.0,
            fun_num: 0,
            sender_obtain_result: false,
            prng: AesRng::new(),
            common_prng: AesRng::new(),
            oprf_sender: None,
            oprf_receiver: None,
        }
    }
}

impl KkrtPsi {
    /// Create an uninitialized scheme object.
    pub fn new() -> Self {
        Self::default()
    }

    /// Read parameters, run the consistency handshake, derive the common
    /// coin, and bootstrap the OPRF from 512 base OTs.
    pub fn init<C: AbstractChannel>(&mut self, channel: &mut C, params: &Value) -> Result<(), Error> {
        self.verbose = get_bool(params, "/common/verbose")?;
        self.is_sender = get_bool(params, "/common/is_sender")?;
        self.epsilon = get_f64(params, "/kkrt_psi_params/epsilon")?;
        let fun_num = get_u64(params, "/kkrt_psi_params/fun_num")?;
        self.fun_num = fun_num as usize;
        self.sender_obtain_result = get_bool(params, "/kkrt_psi_params/sender_obtain_result")?;

        self.check_params(channel, fun_num)?;

        if self.verbose {
            info!("\nKKRT PSI parameters: \n{:#}", params);
        }

        self.prng = AesRng::new();

        // Common coin seeding the table-seed PRNG both parties share.
        let coin = cointoss::exchange(channel, self.prng.gen())?;
        self.common_prng = AesRng::from_seed(coin);

        // The PSI sender plays base-OT receiver inside the OPRF setup.
        if self.is_sender {
            self.oprf_sender = Some(OprfSender::init(channel, &mut self.prng)?);
        } else {
            self.oprf_receiver = Some(OprfReceiver::init(channel, &mut self.prng)?);
        }
        Ok(())
    }

    fn check_params<C: AbstractChannel>(&self, channel: &mut C, fun_num: u64) -> Result<(), Error> {
        check_consistency(self.is_sender, channel, "epsilon", self.epsilon)?;
        check_consistency(self.is_sender, channel, "number of function", fun_num)?;
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

    /// Run the intersection. The receiver always computes the result; it
    /// is forwarded to the sender only when `sender_obtain_result` is set.
    pub fn process<C: AbstractChannel>(
        &mut self,
        channel: &mut C,
        input_keys: &[String],
    ) -> Result<Vec<String>, Error> {
        let (sender_data_size, receiver_data_size) =
            self.exchange_data_sizes(channel, input_keys.len())?;
        let num_bins = (receiver_data_size as f64 * self.epsilon).ceil() as usize;
        let items = hash_keys_to_items(input_keys);

        if self.is_sender {
            self.run_sender_masks(channel, num_bins, sender_data_size, &items)?;
            if self.sender_obtain_result {
                if self.verbose {
                    info!("sender can obtain result.");
                }
                let count = channel.read_u64()? as usize;
                let serialized = channel.read_vec(count)?;
                let output_keys = deserialize_strings(&serialized)?;
                if self.verbose {
                    info!("sender receives intersection done.");
                }
                Ok(output_keys)
            } else {
                if self.verbose {
                    info!("sender can not obtain result.");
                }
                Ok(Vec::new())
            }
        } else {
            let matched = self.run_receiver_match(channel, num_bins, sender_data_size, &items)?;
            let output_keys: Vec<String> = input_keys
                .iter()
                .zip(matched.iter())
                .filter(|(_, hit)| **hit)
                .map(|(key, _)| key.clone())
                .collect();
            if self.verbose {
                info!("receiver calculate intersection done.");
            }
            if self.sender_obtain_result {
                let serialized = serialize_strings(&output_keys);
                channel.write_u64(serialized.len() as u64)?;
                channel.write_bytes(&serialized)?;
                channel.flush()?;
                if self.verbose {
                    info!("receiver sends intersection to sender.");
                }
            }
            Ok(output_keys)
        }
    }

    /// Run the protocol but only return the intersection cardinality.
    pub fn process_cardinality_only<C: AbstractChannel>(
        &mut self,
        channel: &mut C,
        input_keys: &[String],
    ) -> Result<usize, Error> {
        let (sender_data_size, receiver_data_size) =
            self.exchange_data_sizes(channel, input_keys.len())?;
        let num_bins = (receiver_data_size as f64 * self.epsilon).ceil() as usize;
        let items = hash_keys_to_items(input_keys);

        if self.is_sender {
            self.run_sender_masks(channel, num_bins, sender_data_size, &items)?;
            if self.sender_obtain_result {
                let count = channel.read_u64()? as usize;
                if self.verbose {
                    info!("sender receives cardinality done.");
                }
                Ok(count)
            } else {
                if self.verbose {
                    info!("sender can not obtain result.");
                }
                Ok(0)
            }
        } else {
            let matched = self.run_receiver_match(channel, num_bins, sender_data_size, &items)?;
            let count = matched.iter().filter(|hit| **hit).count();
            if self.verbose {
                info!("receiver calculate cardinality done.");
            }
            if self.sender_obtain_result {
                channel.write_u64(count as u64)?;
                channel.flush()?;
                if self.verbose {
                    info!("receiver sends cardinality to sender.");
                }
            }
            Ok(count)
        }
    }

    /// Exchange input sizes: the receiver announces first.
    fn exchange_data_sizes<C: AbstractChannel>(
        &self,
        channel: &mut C,
        own_size: usize,
    ) -> Result<(usize, usize), Error> {
        if self.is_sender {
            let receiver_data_size = channel.read_u64()? as usize;
            channel.write_u64(own_size as u64)?;
            channel.flush()?;
            Ok((own_size, receiver_data_size))
        } else {
            channel.write_u64(own_size as u64)?;
            channel.flush()?;
            let sender_data_size = channel.read_u64()? as usize;
            Ok((sender_data_size, own_size))
        }
    }

    /// Sender half up to and including the mask transport: simple
    /// hashing, OPRF evaluation, per-function shuffling, truncation.
    fn run_sender_masks<C: AbstractChannel>(
        &mut self,
        channel: &mut C,
        num_bins: usize,
        sender_data_size: usize,
        items: &[Item],
    ) -> Result<(), Error> {
        let table_seed: Block = self.common_prng.gen();
        let mut simple_table = SimpleTable::new(num_bins, self.fun_num, table_seed)?;
        simple_table.insert(items);

        let stash_size = channel.read_u64()? as usize;
        if stash_size > 0 {
            if self.verbose {
                info!("stash of size is not zero.");
            }
            return Err(Error::StashNonEmpty);
        }
        if self.verbose {
            info!("simple hash done.");
        }

        let oprf = self
            .oprf_sender
            .as_mut()
            .ok_or_else(|| Error::InvalidArgument("scheme is not initialized".to_string()))?;
        oprf.send(channel, num_bins)?;
        let mut sender_enc_data: Vec<Vec<Block>> =
            vec![Vec::with_capacity(sender_data_size); self.fun_num];
        for (bin, entries) in simple_table.bins().iter().enumerate() {
            for entry in entries.iter() {
                let mask = oprf.encode(bin, Block::from(entry.tagged()))?;
                sender_enc_data[entry.hash_index].push(mask);
            }
        }
        if self.verbose {
            info!("oprf done.");
        }

        // A fresh, independent permutation per hash function hides which
        // bin each mask came from.
        let mut reduced = Vec::with_capacity(self.fun_num * sender_data_size * REDUCE_STATISTICS_LEN);
        for masks in sender_enc_data.iter() {
            let permutation = generate_permutation(&mut self.prng, sender_data_size);
            let mut shuffled = masks.clone();
            permute(&permutation, &mut shuffled);
            for mask in shuffled.iter() {
                reduced.extend_from_slice(&mask.to_bytes()[..REDUCE_STATISTICS_LEN]);
            }
        }
        channel.write_bytes(&reduced)?;
        channel.flush()?;
        Ok(())
    }

    /// Receiver half through the mask lookup; returns one hit flag per
    /// input, in input order.
    fn run_receiver_match<C: AbstractChannel>(
        &mut self,
        channel: &mut C,
        num_bins: usize,
        sender_data_size: usize,
        items: &[Item],
    ) -> Result<Vec<bool>, Error> {
        let table_seed: Block = self.common_prng.gen();
        let mut cuckoo_table = CuckooTable::new(num_bins, self.fun_num, table_seed)?;
        cuckoo_table.insert(items);
        let stash_size = cuckoo_table.stash_size();
        channel.write_u64(stash_size as u64)?;
        channel.flush()?;
        if stash_size > 0 {
            if self.verbose {
                info!("stash of size is not zero.");
            }
            return Err(Error::StashNonEmpty);
        }
        if self.verbose {
            info!("cuckoo hash done.");
        }

        let oprf_inputs: Vec<Block> = cuckoo_table
            .tagged_entries()
            .iter()
            .map(|entry| Block::from(*entry))
            .collect();
        let oprf = self
            .oprf_receiver
            .as_mut()
            .ok_or_else(|| Error::InvalidArgument("scheme is not initialized".to_string()))?;
        let masks_with_dummies = oprf.receive(channel, &oprf_inputs, &mut self.prng)?;
        if self.verbose {
            info!("oprf done.");
        }

        let mut reduced = vec![0u8; self.fun_num * sender_data_size * REDUCE_STATISTICS_LEN];
        channel.read_bytes(&mut reduced)?;
        let slots: Vec<&[u8]> = reduced.chunks(REDUCE_STATISTICS_LEN).collect();

        let mut matched = vec![false; items.len()];
        for bin in 0..num_bins {
            if let Some(item) = cuckoo_table.item(bin) {
                let needle = &masks_with_dummies[bin].to_bytes()[..REDUCE_STATISTICS_LEN];
                let group =
                    &slots[item.hash_index * sender_data_size..(item.hash_index + 1) * sender_data_size];
                if group.iter().any(|slot| *slot == needle) {
                    matched[item.input_index] = true;
                }
            }
        }
        Ok(matched)
    }
}
