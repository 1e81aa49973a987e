//! Sends a stream of requests from a single client through one limiter and prints
//! each decision.
//!
//! ```text
//! cargo run -p tower-keygate --example demo -- --algorithm leaky-bucket
//! RUST_LOG=keygate=trace cargo run -p tower-keygate --example demo -- -a token-bucket
//! ```

use std::time::Duration;
use std::time::Instant;

use clap::Parser;
use clap::ValueEnum;
use keygate::LimiterConfig;
use keygate::Registry;
use keygate::Strategy;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Clone, Copy, ValueEnum)]
enum Algorithm {
    FixedWindow,
    SlidingLog,
    LeakyBucket,
    TokenBucket,
}

impl Algorithm {
    /// The limiter and the request pacing of each demonstration.
    fn defaults(self) -> (LimiterConfig, usize, Duration) {
        match self {
            Self::FixedWindow => (
                LimiterConfig::default_fixed_window(),
                12,
                Duration::from_secs(1),
            ),
            Self::SlidingLog => (
                LimiterConfig::default_sliding_log(),
                20,
                Duration::from_secs(1),
            ),
            Self::LeakyBucket => (
                LimiterConfig::default_leaky_bucket(),
                20,
                Duration::from_millis(100),
            ),
            Self::TokenBucket => (
                LimiterConfig::default_token_bucket(),
                20,
                Duration::from_millis(100),
            ),
        }
    }
}

#[derive(Debug, Parser)]
#[command(about = "Watch a rate limiting algorithm admit and reject requests")]
struct Args {
    /// Algorithm to demonstrate
    #[arg(short, long, value_enum, default_value = "fixed-window")]
    algorithm: Algorithm,

    /// Number of requests to send (defaults per algorithm)
    #[arg(short, long)]
    requests: Option<usize>,

    /// Pause between requests, e.g. "250ms" (defaults per algorithm)
    #[arg(short, long, value_parser = humantime::parse_duration)]
    interval: Option<Duration>,

    /// Client key the requests are attributed to
    #[arg(short, long, default_value = "127.0.0.1")]
    key: String,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let args = Args::parse();
    let (config, requests, interval) = args.algorithm.defaults();
    let requests = args.requests.unwrap_or(requests);
    let interval = args.interval.unwrap_or(interval);

    println!("Algorithm: {} {:?}", config.name(), config);
    println!(
        "Sending {requests} requests, one every {}\n",
        humantime::format_duration(interval)
    );

    let registry = Registry::new(config)?;
    let limiter = registry.get_or_create(&args.key);
    let start = Instant::now();

    for i in 1..=requests {
        let verdict = if limiter.allow() {
            "allowed [v]"
        } else {
            "denied  [x]"
        };
        println!(
            "[{:>9.3?}] request {i:>3} from {}: {verdict}",
            start.elapsed(),
            args.key
        );
        tokio::time::sleep(interval).await;
    }

    Ok(())
}
