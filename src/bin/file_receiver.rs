//! Receives one file from a `file_sender` over UDP.
//!
//! The first datagram fixes the peer. A zero-length datagram ends the
//! transfer.

use std::{fs::File, io::BufWriter, path::PathBuf, process::ExitCode};

use clap::Parser;
use stopwait::{
    channel::{DropPolicy, Lossy, UdpChannel},
    config::Config,
};
use tracing::{error, info};

#[derive(Debug, Parser)]
#[command(name = "file_receiver", about = "Receive a file with stop-and-wait ARQ over UDP")]
struct Args {
    /// Where to write the received bytes
    #[arg(long)]
    output: PathBuf,

    #[arg(long, default_value = "0.0.0.0:19479")]
    bind: String,

    /// JSON configuration file
    #[arg(long)]
    config: Option<PathBuf>,

    /// Overrides `max_packet` from the configuration
    #[arg(long)]
    max_packet: Option<usize>,

    /// Overrides `idle_timeout_ms` from the configuration
    #[arg(long)]
    idle_timeout_ms: Option<u64>,

    /// Probability of dropping each outgoing ack
    #[arg(long, default_value_t = 0.0)]
    loss: f64,

    #[arg(long, default_value_t = 0)]
    seed: u64,
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(true)
        .init();

    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => Config::from_path(path).expect("load config"),
        None => Config::default(),
    };
    if args.max_packet.is_some() {
        config.max_packet = args.max_packet;
    }
    if args.idle_timeout_ms.is_some() {
        config.idle_timeout_ms = args.idle_timeout_ms;
    }
    let (_, receiver) = config.build().expect("valid config");

    let channel = UdpChannel::bind(&args.bind).expect("bind socket");
    info!(local = %channel.local_addr().expect("local addr"), "listening");
    let mut channel = Lossy::new(
        channel,
        DropPolicy::Random {
            rate: args.loss,
            seed: args.seed,
        },
    );

    let file = File::create(&args.output).expect("create output file");
    let mut sink = BufWriter::new(file);
    let stat = receiver.recv(&mut channel, &mut sink);

    println!(
        "received {} bytes: delivered={} duplicates={} malformed={} timeouts={}",
        stat.bytes, stat.delivered, stat.duplicates, stat.decoding_errors, stat.timeouts,
    );
    match stat.error {
        None => ExitCode::SUCCESS,
        Some(e) => {
            error!("transfer stopped early: {}", e);
            ExitCode::FAILURE
        }
    }
}
