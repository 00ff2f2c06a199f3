//! Runs a sender and a receiver in one process over a simulated link and
//! checks that the output matches the input.

use std::{fs, path::PathBuf, process::ExitCode, thread, time::Duration, time::Instant};

use clap::Parser;
use stopwait::{
    channel::{
        sim::{pair, LinkConfig},
        DropPolicy, Lossy,
    },
    config::Config,
};
use tracing::error;

#[derive(Debug, Parser)]
#[command(name = "loopback", about = "Stop-and-wait ARQ over an in-memory lossy link")]
struct Args {
    /// Number of generated bytes to transfer (ignored with --file)
    #[arg(long, default_value_t = 10_000)]
    bytes: usize,

    /// Transfer this file instead of generated bytes
    #[arg(long)]
    file: Option<PathBuf>,

    /// JSON configuration file
    #[arg(long)]
    config: Option<PathBuf>,

    #[arg(long)]
    max_packet: Option<usize>,

    /// One-way link delay (milliseconds)
    #[arg(long, default_value_t = 0)]
    delay_ms: u64,

    /// Probability of dropping each data datagram
    #[arg(long, default_value_t = 0.0)]
    data_loss: f64,

    /// Probability of dropping each ack datagram
    #[arg(long, default_value_t = 0.0)]
    ack_loss: f64,

    /// Drop every k-th data datagram; overrides --data-loss
    #[arg(long)]
    drop_every: Option<u64>,

    #[arg(long, default_value_t = 0)]
    seed: u64,
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
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
    let (sender, receiver) = config.build().expect("valid config");

    let data = match &args.file {
        Some(path) => fs::read(path).expect("read source file"),
        None => (0..args.bytes).map(|i| (i % 251) as u8).collect(),
    };

    let (a, b) = pair(LinkConfig {
        delay: Duration::from_millis(args.delay_ms),
    });
    let data_policy = match args.drop_every {
        Some(k) => DropPolicy::EveryKth(k),
        None => DropPolicy::Random {
            rate: args.data_loss,
            seed: args.seed,
        },
    };
    let mut a = Lossy::new(a, data_policy);
    let mut b = Lossy::new(
        b,
        DropPolicy::Random {
            rate: args.ack_loss,
            seed: args.seed.wrapping_add(1),
        },
    );

    let handle = thread::spawn(move || {
        let mut output = Vec::new();
        let stat = receiver.recv(&mut b, &mut output);
        (stat, output)
    });

    let before = Instant::now();
    let result = sender.send(&mut a, &data);
    let elapsed = before.elapsed();
    let dropped_data = a.dropped();
    drop(a);
    let (receiver_stat, output) = handle.join().expect("receiver thread");

    let sender_stat = match result {
        Ok(stat) => stat,
        Err(e) => {
            error!("transfer stopped early: {}", e);
            return ExitCode::FAILURE;
        }
    };
    println!(
        "sender pushes={} retransmissions={} rto_hits={} dropped={} rto_ms={:.3} elapsed_ms={}",
        sender_stat.pushes,
        sender_stat.retransmissions,
        sender_stat.rto_hits,
        dropped_data,
        sender_stat.rto.as_secs_f64() * 1e3,
        elapsed.as_millis()
    );
    println!(
        "receiver bytes={} delivered={} duplicates={} malformed={}",
        receiver_stat.bytes,
        receiver_stat.delivered,
        receiver_stat.duplicates,
        receiver_stat.decoding_errors
    );

    if output != data || receiver_stat.bytes != data.len() {
        error!(
            expected = data.len(),
            got = output.len(),
            "output does not match input"
        );
        return ExitCode::FAILURE;
    }
    println!("verified bytes={}", data.len());
    ExitCode::SUCCESS
}
