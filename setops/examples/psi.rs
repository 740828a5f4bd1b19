//! Runnable two-party example: connect to a peer over TCP, load or
//! generate identifiers (and features for the join), run the selected
//! scheme, and report outputs, communication, and timing.
//!
//! Run one process per party, e.g.:
//!
//! ```text
//! cargo run --example psi -- --config-path sender.json --scheme 1 &
//! cargo run --example psi -- --config-path receiver.json --scheme 1
//! ```

use clap::Parser;
use log::info;
use rand::SeedableRng;
use seclink::{AbstractChannel, AesRng, Block, Channel, TrackChannel};
use serde_json::Value;
use setops::{
    config::{get_bool, get_str, get_u64},
    data::{dummy, CsvDataProvider},
    factory::{self, PjcScheme, PsiScheme},
    utils::Timer,
    Error,
};
use std::{
    io::{BufReader, BufWriter},
    net::{TcpListener, TcpStream},
    time::Duration,
};

const BATCH_SIZE: usize = 1 << 20;

#[derive(Parser)]
#[command(about = "Two-party PSI/PJC example", version)]
struct Args {
    /// Path to this party's JSON configuration file.
    #[arg(long, default_value = "./json/ecdh_psi_sender.json")]
    config_path: String,

    /// Use randomly generated data instead of reading the input file.
    #[arg(long, default_value_t = true, action = clap::ArgAction::Set)]
    use_random_data: bool,

    /// Directory for the log file; empty logs to stderr.
    #[arg(long, default_value = "./logs/")]
    log_path: String,

    /// Scheme to run: 0 = ecdh, 1 = kkrt, 2 = circuit.
    #[arg(long, default_value_t = 0)]
    scheme: u32,

    /// Intersection size of both parties (random data only).
    #[arg(long, default_value_t = 10)]
    intersection_size: u64,

    /// Ratio of party data size to intersection size (random data only).
    #[arg(long, default_value_t = 10)]
    intersection_ratio: u64,
}

type NetChannel = TrackChannel<Channel<BufReader<TcpStream>, BufWriter<TcpStream>>>;

/// Listen on the local port and dial the peer, reading from the accepted
/// connection and writing to the dialed one.
fn connect(params: &Value) -> Result<NetChannel, Error> {
    let address = get_str(params, "/network/address")?.to_string();
    let remote_port = get_u64(params, "/network/remote_port")? as u16;
    let local_port = get_u64(params, "/network/local_port")? as u16;

    let listener = TcpListener::bind(("0.0.0.0", local_port))?;
    let mut outbound = None;
    for _ in 0..200 {
        match TcpStream::connect((address.as_str(), remote_port)) {
            Ok(stream) => {
                outbound = Some(stream);
                break;
            }
            Err(_) => std::thread::sleep(Duration::from_millis(100)),
        }
    }
    let outbound = outbound.ok_or_else(|| {
        Error::InvalidArgument(format!("peer {}:{} is unreachable", address, remote_port))
    })?;
    let (inbound, _) = listener.accept()?;
    outbound.set_nodelay(true)?;
    inbound.set_nodelay(true)?;
    Ok(TrackChannel::new(Channel::new(
        BufReader::new(inbound),
        BufWriter::new(outbound),
    )))
}

fn load_keys(args: &Args, params: &Value) -> Result<Vec<String>, Error> {
    if args.use_random_data {
        let data_size = (args.intersection_ratio * args.intersection_size) as usize;
        let mut common_rng = AesRng::from_seed(Block::default());
        let mut unique_rng = AesRng::new();
        let mut keys =
            dummy::generate_random_keys(&mut common_rng, args.intersection_size as usize, "0");
        keys.extend(dummy::generate_random_keys(
            &mut unique_rng,
            data_size - args.intersection_size as usize,
            "0",
        ));
        Ok(keys)
    } else {
        info!("Read data from csv.");
        let input_path = get_str(params, "/data/input_file")?;
        let has_header = get_bool(params, "/data/has_header")?;
        let ids_num = get_u64(params, "/common/ids_num")? as usize;
        let mut provider = CsvDataProvider::new(input_path, has_header, ids_num)?;
        let mut keys = Vec::new();
        provider.get_next_batch(BATCH_SIZE, &mut keys);
        Ok(keys)
    }
}

fn load_keys_with_features(
    args: &Args,
    params: &Value,
) -> Result<(Vec<String>, Vec<Vec<u64>>), Error> {
    if args.use_random_data {
        let keys = load_keys(args, params)?;
        let mut rng = AesRng::new();
        let features = (0..2)
            .map(|_| dummy::generate_random_features(&mut rng, keys.len(), false))
            .collect();
        Ok((keys, features))
    } else {
        info!("Read data from csv.");
        let input_path = get_str(params, "/data/input_file")?;
        let has_header = get_bool(params, "/data/has_header")?;
        let ids_num = get_u64(params, "/common/ids_num")? as usize;
        let mut provider = CsvDataProvider::new(input_path, has_header, ids_num)?;
        let mut keys_2d = Vec::new();
        let mut features = Vec::new();
        provider.get_next_batch_with_features_2d(BATCH_SIZE, &mut keys_2d, &mut features)?;
        let keys = keys_2d.into_iter().next().unwrap_or_default();
        Ok((keys, features))
    }
}

fn run_psi(
    args: &Args,
    params: &Value,
    channel: &mut NetChannel,
    scheme: PsiScheme,
) -> Result<usize, Error> {
    let keys = load_keys(args, params)?;
    let mut psi = factory::create_psi(scheme)?;
    psi.init(channel, params)?;
    let keys = psi.preprocess_data(channel, &keys)?;
    let output_keys = psi.process(channel, &keys)?;

    if !args.use_random_data && !output_keys.is_empty() {
        let output_path = get_str(params, "/data/output_file")?;
        CsvDataProvider::write_data_to_file(
            &[output_keys.clone()],
            &[],
            output_path,
            false,
            &[],
        )?;
        info!("write result to output file.");
    }
    Ok(output_keys.len())
}

fn run_pjc(
    args: &Args,
    params: &Value,
    channel: &mut NetChannel,
) -> Result<usize, Error> {
    let (keys, features) = load_keys_with_features(args, params)?;
    let mut pjc = factory::create_pjc(PjcScheme::Circuit)?;
    pjc.init(channel, params)?;
    let (keys, features) = pjc.preprocess_data(channel, &keys, &features)?;
    let output_shares = pjc.process(channel, &keys, &features)?;
    info!(
        "obtained {} share rows over {} bins.",
        output_shares.len(),
        output_shares.first().map(Vec::len).unwrap_or(0)
    );
    Ok(output_shares.first().map(Vec::len).unwrap_or(0))
}

fn run(args: &Args) -> Result<(), Error> {
    let timer = Timer::new("setops example");
    let config_text = std::fs::read_to_string(&args.config_path)
        .map_err(|e| Error::InvalidArgument(format!("config {:?}: {}", args.config_path, e)))?;
    let params: Value = serde_json::from_str(&config_text)
        .map_err(|e| Error::InvalidArgument(format!("config {:?}: {}", args.config_path, e)))?;
    let is_sender = get_bool(&params, "/common/is_sender")?;

    let mut channel = connect(&params)?;

    let cardinality = match args.scheme {
        0 => run_psi(args, &params, &mut channel, PsiScheme::Ecdh)?,
        1 => run_psi(args, &params, &mut channel, PsiScheme::Kkrt)?,
        2 => run_pjc(args, &params, &mut channel)?,
        other => {
            return Err(Error::InvalidArgument(format!(
                "scheme {} is not one of 0 (ecdh), 1 (kkrt), 2 (circuit)",
                other
            )))
        }
    };

    // Exchange byte counts, sender first, and report totals.
    let communication = channel.bytes_sent();
    let remote_communication;
    if is_sender {
        channel.write_u64(communication)?;
        channel.flush()?;
        remote_communication = channel.read_u64()?;
    } else {
        remote_communication = channel.read_u64()?;
        channel.write_u64(communication)?;
        channel.flush()?;
    }

    let to_mib = |bytes: u64| bytes as f64 / (1024.0 * 1024.0);
    info!("-------------------------------");
    info!("{}", if is_sender { "Sender" } else { "Receiver" });
    info!(
        "{}",
        if args.use_random_data {
            "Use random data."
        } else {
            "Use input file."
        }
    );
    info!("Cardinality is {}", cardinality);
    info!(
        "Total Communication is {:.3}({:.3} + {:.3})MB.",
        to_mib(communication + remote_communication),
        to_mib(communication),
        to_mib(remote_communication)
    );
    info!("Total time is {:.3} s.", timer.elapsed_secs());
    Ok(())
}

fn main() {
    let args = Args::parse();

    let mut builder = env_logger::Builder::from_default_env();
    builder.filter_level(log::LevelFilter::Info);
    if !args.log_path.is_empty() {
        if std::fs::create_dir_all(&args.log_path).is_ok() {
            let file = std::fs::File::create(format!(
                "{}/setops_scheme_{}.log",
                args.log_path.trim_end_matches('/'),
                args.scheme
            ));
            if let Ok(file) = file {
                builder.target(env_logger::Target::Pipe(Box::new(file)));
            }
        }
    }
    builder.init();

    if let Err(e) = run(&args) {
        eprintln!("example failed: {}", e);
        std::process::exit(1);
    }
}
