//! Sends a file to a `file_receiver` over UDP.

use std::{fs, path::PathBuf, process::ExitCode, time::Instant};

use clap::Parser;
use stopwait::{
    channel::{Channel, DropPolicy, Lossy, UdpChannel},
    config::Config,
};
use tracing::{error, info};

/// Zero-length datagrams sent after the last ack to tell the receiver to stop.
const CLOSE_MARKERS: usize = 3;

#[derive(Debug, Parser)]
#[command(name = "file_sender", about = "Send a file with stop-and-wait ARQ over UDP")]
struct Args {
    /// File to send
    #[arg(long)]
    file: PathBuf,

    /// Address of the receiver
    #[arg(long, default_value = "127.0.0.1:19479")]
    peer: String,

    /// Local address to bind
    #[arg(long, default_value = "0.0.0.0:0")]
    bind: String,

    /// JSON configuration file
    #[arg(long)]
    config: Option<PathBuf>,

    /// Overrides `max_packet` from the configuration
    #[arg(long)]
    max_packet: Option<usize>,

    /// Probability of dropping each outgoing datagram
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
    let (sender, _) = config.build().expect("valid config");

    let data = fs::read(&args.file).expect("read source file");

    let mut channel = UdpChannel::bind(&args.bind).expect("bind socket");
    channel.connect(&args.peer).expect("resolve peer");
    info!(local = %channel.local_addr().expect("local addr"), peer = %args.peer, "bound");
    let mut channel = Lossy::new(
        channel,
        DropPolicy::Random {
            rate: args.loss,
            seed: args.seed,
        },
    );

    let before = Instant::now();
    let result = sender.send(&mut channel, &data);
    let elapsed = before.elapsed();

    let mut channel = channel.into_inner();
    for _ in 0..CLOSE_MARKERS {
        let _ = channel.send(&[]);
    }

    match result {
        Ok(stat) => {
            println!(
                "sent {} bytes in {:?}: pushes={} retransmissions={} rto={:?}",
                data.len(),
                elapsed,
                stat.pushes,
                stat.retransmissions,
                stat.rto
            );
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!("transfer stopped early: {}", e);
            ExitCode::FAILURE
        }
    }
}
