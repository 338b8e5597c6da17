//! Tail a Streaming API channel and print each event as a JSON line.
//!
//! ```sh
//! export SF_AUTH_URL='force://PlatformCLI::...'
//! cargo run --bin sfq-tail -- /data/AccountChangeEvent --replay all --for 300
//! ```
//!
//! `--replay` takes `all`, `new` (default) or a replay id to resume after.
//! `--for` stops after that many seconds.

use std::time::Duration;

use sfq_auth::SalesforceCredentials;
use sfq_client::ClientConfig;
use sfq_streaming::{ReplayFrom, StreamingConfig, Subscription};
use tracing_subscriber::EnvFilter;

struct Args {
    channel: String,
    replay: ReplayFrom,
    deadline: Option<Duration>,
}

fn usage() -> ! {
    eprintln!("Usage: sfq-tail <channel> [--replay all|new|<replay id>] [--for <seconds>]");
    eprintln!();
    eprintln!("Credentials come from SF_AUTH_URL, or SF_INSTANCE_URL, SF_CLIENT_ID,");
    eprintln!("SF_CLIENT_SECRET and SF_REFRESH_TOKEN.");
    std::process::exit(2);
}

fn parse_args() -> Args {
    let mut args = std::env::args().skip(1);
    let mut channel = None;
    let mut replay = ReplayFrom::New;
    let mut deadline = None;

    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--replay" => {
                replay = match args.next().as_deref() {
                    Some("all") => ReplayFrom::All,
                    Some("new") => ReplayFrom::New,
                    Some(id) => match id.parse() {
                        Ok(id) => ReplayFrom::Marker(id),
                        Err(_) => usage(),
                    },
                    None => usage(),
                }
            }
            "--for" => {
                let secs: u64 = args
                    .next()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or_else(|| usage());
                deadline = Some(Duration::from_secs(secs));
            }
            "-h" | "--help" => usage(),
            _ if channel.is_none() && !arg.starts_with("--") => channel = Some(arg),
            _ => usage(),
        }
    }

    Args {
        channel: channel.unwrap_or_else(|| usage()),
        replay,
        deadline,
    }
}

#[tokio::main]
async fn main() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let args = parse_args();

    let creds = SalesforceCredentials::from_env().unwrap_or_else(|e| {
        eprintln!("Error: {e}");
        eprintln!();
        eprintln!("  1. Authenticate: sf org login web -d");
        eprintln!("  2. Get auth URL: sf org display --verbose");
        eprintln!("  3. Export:       export SF_AUTH_URL='force://...'");
        std::process::exit(1);
    });

    let client = creds.connect(ClientConfig::default()).unwrap_or_else(|e| {
        eprintln!("Error: {e}");
        std::process::exit(1);
    });

    let mut config = StreamingConfig::builder().with_replay(args.replay);
    if let Some(deadline) = args.deadline {
        config = config.with_deadline(deadline);
    }

    let mut subscription = Subscription::new(client, &args.channel, config.build())
        .unwrap_or_else(|e| {
            eprintln!("Error: {e}");
            std::process::exit(1);
        });

    loop {
        let mut interrupted = false;
        let next = tokio::select! {
            next = subscription.next() => next,
            _ = tokio::signal::ctrl_c() => {
                interrupted = true;
                None
            }
        };

        match next {
            Some(Ok(event)) => match serde_json::to_string(&event) {
                Ok(line) => println!("{line}"),
                Err(e) => eprintln!("Error: cannot encode event: {e}"),
            },
            Some(Err(e)) => {
                eprintln!("Error: {e}");
                std::process::exit(1);
            }
            None => {
                if interrupted {
                    subscription.disconnect().await;
                }
                break;
            }
        }
    }

    if let Some(last) = subscription.last_replay_id() {
        eprintln!("Last replay id: {last} (resume with --replay {last})");
    }
}
