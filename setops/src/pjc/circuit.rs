//! Circuit-PSI: batch OPPRF plus share compute, producing secret-shared
//! outputs and supporting joined feature columns.
//!
//! On top of the KKRT hashing + OPRF layer, the sender programs garbled
//! cuckoo filters so that the receiver recovers, per bin, the sender's
//! random bin content exactly when the bin holds a shared item. A
//! two-party equality over those contents yields XOR-shared per-bin match
//! bits; multiplexers and a receiver-local addition extend the shares to
//! the joined feature columns. Neither side ever sees plaintext match
//! bits.

use crate::{
    config::{get_bool, get_f64, get_u64},
    hashing::{tag, CuckooTable, SimpleTable},
    mpc::{ArithMatrix, BoolMatrix, ShareCompute},
    utils::{check_consistency, hash_keys_to_items},
    Error, Item, REDUCE_BITS_MASK,
};
use log::info;
use obliv::{
    oprf,
    ot::{NaorPinkasReceiver, NaorPinkasSender},
};
use rand::{Rng, SeedableRng};
use seclink::{cointoss, AbstractChannel, AesRng, Block};
use serde_json::Value;
use std::collections::HashMap;

type OprfSender = oprf::KkrtSender<NaorPinkasReceiver>;
type OprfReceiver = oprf::KkrtReceiver<NaorPinkasSender>;

/// The Circuit-PSI scheme instance.
pub struct CircuitPsi {
    is_sender: bool,
    verbose: bool,
    epsilon: f64,
    epsilon_hint: f64,
    fun_num: usize,
    hint_fun_num: usize,
    prng: AesRng,
    common_prng: AesRng,
    oprf_sender: Option<OprfSender>,
    oprf_receiver: Option<OprfReceiver>,
    mpc: Option<ShareCompute>,
}

impl Default for CircuitPsi {
    fn default() -> Self {
        CircuitPsi {
            is_sender: true,
            verbose: false,
            epsilon: 0.0,
            epsilon_hint: 0.0,
            fun_num: 0,
            hint_fun_num: 0,
            prng: AesRng::new(),
            common_prng: AesRng::new(),
            oprf_sender: None,
            oprf_receiver: None,
            mpc: None,
        }
    }
}

/// Derive the 64-bit pad hiding a filter slot: stream the seeded PRNG
/// once per hint-function index up to and including the slot's own.
fn stream_pad(seed: Block, count: usize) -> u64 {
    let mut rng = AesRng::from_seed(seed);
    let mut pad = 0u64;
    for _ in 0..count {
        pad = rng.gen();
    }
    pad
}

fn send_filter<C: AbstractChannel>(channel: &mut C, filter: &[u64]) -> Result<(), Error> {
    for value in filter.iter() {
        channel.write_u64(*value)?;
    }
    channel.flush()?;
    Ok(())
}

fn recv_filter<C: AbstractChannel>(channel: &mut C, len: usize) -> Result<Vec<u64>, Error> {
    let mut filter = Vec::with_capacity(len);
    for _ in 0..len {
        filter.push(channel.read_u64()?);
    }
    Ok(filter)
}

impl CircuitPsi {
    /// Create an uninitialized scheme object.
    pub fn new() -> Self {
        Self::default()
    }

    /// Read parameters, run the consistency handshakes, derive the
    /// common coin, bootstrap the OPRF, and set up the share-compute
    /// endpoint (party 0 = sender).
    pub fn init<C: AbstractChannel>(&mut self, channel: &mut C, params: &Value) -> Result<(), Error> {
        self.verbose = get_bool(params, "/common/verbose")?;
        self.is_sender = get_bool(params, "/common/is_sender")?;
        self.epsilon = get_f64(params, "/circuit_psi_params/epsilon")?;
        self.epsilon_hint = get_f64(params, "/circuit_psi_params/fun_epsilon")?;
        let fun_num = get_u64(params, "/circuit_psi_params/fun_num")?;
        let hint_fun_num = get_u64(params, "/circuit_psi_params/hint_fun_num")?;
        self.fun_num = fun_num as usize;
        self.hint_fun_num = hint_fun_num as usize;

        self.check_params(channel, fun_num, hint_fun_num)?;

        if self.verbose {
            info!("\nCircuit PSI parameters: \n{:#}", params);
        }

        self.prng = AesRng::new();
        let coin = cointoss::exchange(channel, self.prng.gen())?;
        self.common_prng = AesRng::from_seed(coin);

        if self.is_sender {
            self.oprf_sender = Some(OprfSender::init(channel, &mut self.prng)?);
        } else {
            self.oprf_receiver = Some(OprfReceiver::init(channel, &mut self.prng)?);
        }

        let party = if self.is_sender { 0 } else { 1 };
        self.mpc = Some(ShareCompute::new(channel, party)?);
        Ok(())
    }

    fn check_params<C: AbstractChannel>(
        &self,
        channel: &mut C,
        fun_num: u64,
        hint_fun_num: u64,
    ) -> Result<(), Error> {
        check_consistency(self.is_sender, channel, "epsilon", self.epsilon)?;
        check_consistency(self.is_sender, channel, "epsilon_hint", self.epsilon_hint)?;
        check_consistency(self.is_sender, channel, "number of function", fun_num)?;
        check_consistency(self.is_sender, channel, "number of hint function", hint_fun_num)?;
        Ok(())
    }

    /// No preprocessing is needed for this scheme.
    pub fn preprocess_data<C: AbstractChannel>(
        &self,
        _channel: &mut C,
        input_keys: &[String],
        input_features: &[Vec<u64>],
    ) -> Result<(Vec<String>, Vec<Vec<u64>>), Error> {
        if self.verbose {
            info!("preprocess input keys done.");
        }
        Ok((input_keys.to_vec(), input_features.to_vec()))
    }

    /// Run the join. The result matrix holds one row of XOR-shared match
    /// bits followed by one row of additive shares per sender feature and
    /// per receiver feature, all `num_bins` wide.
    pub fn process<C: AbstractChannel>(
        &mut self,
        channel: &mut C,
        input_keys: &[String],
        input_features: &[Vec<u64>],
    ) -> Result<Vec<Vec<u64>>, Error> {
        let own_data_size = input_keys.len();
        let own_feature_size = input_features.len();
        let (sender_data_size, sender_feature_size, receiver_data_size, receiver_feature_size);
        if self.is_sender {
            receiver_data_size = channel.read_u64()? as usize;
            receiver_feature_size = channel.read_u64()? as usize;
            channel.write_u64(own_data_size as u64)?;
            channel.write_u64(own_feature_size as u64)?;
            channel.flush()?;
            sender_data_size = own_data_size;
            sender_feature_size = own_feature_size;
        } else {
            channel.write_u64(own_data_size as u64)?;
            channel.write_u64(own_feature_size as u64)?;
            channel.flush()?;
            sender_data_size = channel.read_u64()? as usize;
            sender_feature_size = channel.read_u64()? as usize;
            receiver_data_size = own_data_size;
            receiver_feature_size = own_feature_size;
        }

        let num_bins = (receiver_data_size as f64 * self.epsilon).ceil() as usize;
        let mut num_bins_hint =
            (self.epsilon_hint * (sender_data_size * self.fun_num) as f64).ceil() as usize;
        if sender_data_size * self.fun_num < num_bins {
            num_bins_hint = (self.epsilon_hint * num_bins as f64).ceil() as usize;
        }

        let items = hash_keys_to_items(input_keys);

        if self.is_sender {
            self.process_sender(
                channel,
                &items,
                input_features,
                num_bins,
                num_bins_hint,
                sender_data_size,
                sender_feature_size,
                receiver_feature_size,
            )
        } else {
            self.process_receiver(
                channel,
                &items,
                input_features,
                num_bins,
                num_bins_hint,
                sender_feature_size,
                receiver_feature_size,
            )
        }
    }

    #[allow(clippy::too_many_arguments)]
    fn process_sender<C: AbstractChannel>(
        &mut self,
        channel: &mut C,
        items: &[Item],
        input_features: &[Vec<u64>],
        num_bins: usize,
        num_bins_hint: usize,
        sender_data_size: usize,
        sender_feature_size: usize,
        receiver_feature_size: usize,
    ) -> Result<Vec<Vec<u64>>, Error> {
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

        // OPRF over every stored copy, bin by bin.
        let oprf = self
            .oprf_sender
            .as_mut()
            .ok_or_else(|| Error::InvalidArgument("scheme is not initialized".to_string()))?;
        oprf.send(channel, num_bins)?;
        let mut masks: Vec<Vec<Block>> = Vec::with_capacity(num_bins);
        for (bin, entries) in simple_table.bins().iter().enumerate() {
            let row: Result<Vec<Block>, obliv::Error> = entries
                .iter()
                .map(|entry| oprf.encode(bin, Block::from(entry.tagged())))
                .collect();
            masks.push(row?);
        }
        if self.verbose {
            info!("oprf done.");
        }

        // Random per-bin content, the value the equality test targets.
        let content_of_bins: Vec<u64> = (0..num_bins).map(|_| self.prng.gen()).collect();

        // Location of every tagged copy, plus the flat filter input list.
        let mut table_loc: HashMap<Item, (usize, usize)> = HashMap::new();
        let mut filter_inputs: Vec<Item> = Vec::new();
        for (bin, entries) in simple_table.bins().iter().enumerate() {
            for (index, entry) in entries.iter().enumerate() {
                table_loc.insert(entry.tagged(), (bin, index));
                filter_inputs.push(entry.tagged());
            }
        }

        let hint_seed: Block = self.common_prng.gen();
        let mut hint_table = CuckooTable::new(num_bins_hint, self.hint_fun_num, hint_seed)?;
        hint_table.insert(&filter_inputs);
        let hint_stash = hint_table.stash_size();
        channel.write_u64(hint_stash as u64)?;
        channel.flush()?;
        if hint_stash > 0 {
            if self.verbose {
                info!("stash of size is not zero.");
            }
            return Err(Error::StashNonEmpty);
        }

        // Garbled cuckoo filter: occupied slots hide the content of the
        // copy's simple bin under an OPRF-derived pad, vacant slots get
        // fresh randomness.
        let mut filter: Vec<u64> = Vec::with_capacity(num_bins_hint);
        for slot in 0..num_bins_hint {
            match hint_table.item(slot) {
                Some(resident) => {
                    let (bin, index) = table_loc[&resident.entry];
                    let pad = stream_pad(masks[bin][index], resident.hash_index + 1);
                    filter.push(content_of_bins[bin] ^ pad);
                }
                None => filter.push(self.prng.gen()),
            }
        }
        send_filter(channel, &filter)?;

        // One more filter per sender feature column, carrying
        // additively-masked feature values under per-feature pads.
        let mut feature_shares: Vec<ArithMatrix> = Vec::with_capacity(sender_feature_size);
        if sender_feature_size != 0 {
            let mut table_features_loc: HashMap<Item, Vec<u64>> = HashMap::new();
            for (i, item) in items.iter().enumerate() {
                let feature: Vec<u64> = (0..sender_feature_size)
                    .map(|fid| input_features[fid][i])
                    .collect();
                for hidx in 0..self.fun_num {
                    table_features_loc.insert(tag(item, hidx), feature.clone());
                }
            }

            for fid in 0..sender_feature_size {
                let content_features: Vec<u64> = (0..num_bins).map(|_| self.prng.gen()).collect();
                let mut shares = ArithMatrix::zero(num_bins, self.hint_fun_num);
                for bin in 0..num_bins {
                    for col in 0..self.hint_fun_num {
                        shares.set(bin, col, content_features[bin]);
                    }
                }
                let mut feature_filter: Vec<u64> = Vec::with_capacity(num_bins_hint);
                for slot in 0..num_bins_hint {
                    match hint_table.item(slot) {
                        Some(resident) => {
                            let (bin, index) = table_loc[&resident.entry];
                            let seed = masks[bin][index] ^ Block::from(fid as u128);
                            let pad = stream_pad(seed, resident.hash_index + 1);
                            let value = table_features_loc[&resident.entry][fid];
                            feature_filter
                                .push(value.wrapping_sub(content_features[bin]) ^ pad);
                        }
                        None => feature_filter.push(self.prng.gen()),
                    }
                }
                send_filter(channel, &feature_filter)?;
                feature_shares.push(shares);
            }
        }
        if self.verbose {
            info!("opprf computation done.");
        }

        // Equality over the bin contents: our side holds the plaintext
        // contents, the peer's register is zero on our side.
        let receiver_share = ArithMatrix::zero(num_bins, self.hint_fun_num);
        let mut sender_share = ArithMatrix::zero(num_bins, self.hint_fun_num);
        for bin in 0..num_bins {
            for col in 0..self.hint_fun_num {
                sender_share.set(bin, col, content_of_bins[bin] & REDUCE_BITS_MASK);
            }
        }
        let mpc = self
            .mpc
            .as_mut()
            .ok_or_else(|| Error::InvalidArgument("scheme is not initialized".to_string()))?;
        let mut result = BoolMatrix::zero(num_bins, self.hint_fun_num);
        mpc.equal(channel, &sender_share, &receiver_share, &mut result)?;

        let mut output_shares =
            vec![vec![0u64; num_bins]; sender_feature_size + receiver_feature_size + 1];
        for bin in 0..num_bins {
            for col in 0..self.hint_fun_num {
                output_shares[0][bin] ^= result.get(bin, col);
            }
        }

        if sender_feature_size != 0 || receiver_feature_size != 0 {
            for (fid, shares) in feature_shares.iter().enumerate() {
                let mut feature_result = ArithMatrix::zero(num_bins, self.hint_fun_num);
                mpc.multiplexer(channel, &result, shares, &mut feature_result)?;
                for bin in 0..num_bins {
                    for col in 0..self.hint_fun_num {
                        output_shares[fid + 1][bin] =
                            output_shares[fid + 1][bin].wrapping_add(feature_result.get(bin, col));
                    }
                }
            }
            // Receiver-feature rows stay zero on this side; the peer's
            // local addition completes those shares.
        }
        if self.verbose {
            info!("secret shares computation done.");
        }
        Ok(output_shares)
    }

    fn process_receiver<C: AbstractChannel>(
        &mut self,
        channel: &mut C,
        items: &[Item],
        input_features: &[Vec<u64>],
        num_bins: usize,
        num_bins_hint: usize,
        sender_feature_size: usize,
        receiver_feature_size: usize,
    ) -> Result<Vec<Vec<u64>>, Error> {
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

        let tagged_entries = cuckoo_table.tagged_entries();
        let oprf_inputs: Vec<Block> = tagged_entries
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

        let hint_stash = channel.read_u64()? as usize;
        if hint_stash > 0 {
            if self.verbose {
                info!("stash of size is not zero.");
            }
            return Err(Error::StashNonEmpty);
        }

        let filter = recv_filter(channel, num_bins_hint)?;

        // A matching hint table gives the candidate addresses of every
        // tagged entry; no mapping is performed on this side.
        let hint_seed: Block = self.common_prng.gen();
        let hint_table = CuckooTable::new(num_bins_hint, self.hint_fun_num, hint_seed)?;
        let addresses = hint_table.addresses(&tagged_entries);

        let mut content_of_bins = vec![0u64; num_bins * self.hint_fun_num];
        for bin in 0..num_bins {
            let mut pad_rng = AesRng::from_seed(masks_with_dummies[bin]);
            for col in 0..self.hint_fun_num {
                let pad: u64 = pad_rng.gen();
                content_of_bins[bin * self.hint_fun_num + col] =
                    filter[addresses[bin * self.hint_fun_num + col]] ^ pad;
            }
        }

        let mut content_features: Vec<Vec<u64>> = Vec::with_capacity(sender_feature_size);
        if sender_feature_size != 0 || receiver_feature_size != 0 {
            for fid in 0..sender_feature_size {
                let feature_filter = recv_filter(channel, num_bins_hint)?;
                let mut content = vec![0u64; num_bins * self.hint_fun_num];
                for bin in 0..num_bins {
                    let seed = masks_with_dummies[bin] ^ Block::from(fid as u128);
                    let mut pad_rng = AesRng::from_seed(seed);
                    for col in 0..self.hint_fun_num {
                        let pad: u64 = pad_rng.gen();
                        content[bin * self.hint_fun_num + col] =
                            feature_filter[addresses[bin * self.hint_fun_num + col]] ^ pad;
                    }
                }
                content_features.push(content);
            }
        }
        if self.verbose {
            info!("opprf computation done.");
        }

        // Equality over the recovered contents; the sender's register is
        // zero on our side.
        let sender_share = ArithMatrix::zero(num_bins, self.hint_fun_num);
        let mut receiver_share = ArithMatrix::zero(num_bins, self.hint_fun_num);
        for bin in 0..num_bins {
            for col in 0..self.hint_fun_num {
                receiver_share.set(
                    bin,
                    col,
                    content_of_bins[bin * self.hint_fun_num + col] & REDUCE_BITS_MASK,
                );
            }
        }
        let mpc = self
            .mpc
            .as_mut()
            .ok_or_else(|| Error::InvalidArgument("scheme is not initialized".to_string()))?;
        let mut result = BoolMatrix::zero(num_bins, self.hint_fun_num);
        mpc.equal(channel, &sender_share, &receiver_share, &mut result)?;

        let mut output_shares =
            vec![vec![0u64; num_bins]; sender_feature_size + receiver_feature_size + 1];
        for bin in 0..num_bins {
            for col in 0..self.hint_fun_num {
                output_shares[0][bin] ^= result.get(bin, col);
            }
        }

        if sender_feature_size != 0 || receiver_feature_size != 0 {
            for (fid, content) in content_features.iter().enumerate() {
                let mut shares = ArithMatrix::zero(num_bins, self.hint_fun_num);
                for bin in 0..num_bins {
                    for col in 0..self.hint_fun_num {
                        shares.set(bin, col, content[bin * self.hint_fun_num + col]);
                    }
                }
                let mut feature_result = ArithMatrix::zero(num_bins, self.hint_fun_num);
                mpc.multiplexer(channel, &result, &shares, &mut feature_result)?;
                for bin in 0..num_bins {
                    for col in 0..self.hint_fun_num {
                        output_shares[fid + 1][bin] =
                            output_shares[fid + 1][bin].wrapping_add(feature_result.get(bin, col));
                    }
                }
            }

            // Receiver features need no oblivious transfer: the bin
            // either holds our own item or no match can occur, so a
            // local raw-value addition completes the additive sharing.
            for bin in 0..num_bins {
                if let Some(resident) = cuckoo_table.item(bin) {
                    for fid in 0..receiver_feature_size {
                        let row = sender_feature_size + 1 + fid;
                        output_shares[row][bin] = output_shares[row][bin]
                            .wrapping_add(input_features[fid][resident.input_index]);
                    }
                }
            }
        }
        if self.verbose {
            info!("secret shares computation done.");
        }
        Ok(output_shares)
    }
}
