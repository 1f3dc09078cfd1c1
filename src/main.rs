//! SkipKV - An Ordered In-Memory Key-Value Store
//!
//! This binary is a small walkthrough of the library: it fills an expiring
//! store, pages through it, counts with a predicate, and waits for the
//! short-lived entries to be swept.

use bytes::Bytes;
use skipkv::{DbOptions, SaveOptions, Store};
use std::time::Duration;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

/// Demo configuration
struct Config {
    /// Number of entries to save
    entries: u32,
    /// Page size used when listing
    page_size: u32,
    /// TTL in seconds for every other entry
    ttl: i64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            entries: 25,
            page_size: 10,
            ttl: 2,
        }
    }
}

impl Config {
    /// Parse configuration from command-line arguments
    fn from_args() -> Self {
        let mut config = Config::default();
        let args: Vec<String> = std::env::args().collect();

        let mut i = 1;
        while i < args.len() {
            match args[i].as_str() {
                "--entries" | "-n" => {
                    config.entries = parse_value(&args, i, "--entries");
                    i += 2;
                }
                "--page-size" | "-p" => {
                    config.page_size = parse_value(&args, i, "--page-size");
                    i += 2;
                }
                "--ttl" | "-t" => {
                    config.ttl = parse_value(&args, i, "--ttl");
                    i += 2;
                }
                "--help" => {
                    print_help();
                    std::process::exit(0);
                }
                "--version" | "-v" => {
                    println!("SkipKV version {}", skipkv::VERSION);
                    std::process::exit(0);
                }
                _ => {
                    eprintln!("Unknown argument: {}", args[i]);
                    print_help();
                    std::process::exit(1);
                }
            }
        }

        config
    }
}

fn parse_value<T: std::str::FromStr>(args: &[String], i: usize, flag: &str) -> T {
    let Some(raw) = args.get(i + 1) else {
        eprintln!("Error: {} requires a value", flag);
        std::process::exit(1);
    };
    raw.parse().unwrap_or_else(|_| {
        eprintln!("Error: invalid value for {}: {}", flag, raw);
        std::process::exit(1);
    })
}

fn print_help() {
    println!(
        r#"
SkipKV - An Ordered In-Memory Key-Value Store

USAGE:
    skipkv [OPTIONS]

OPTIONS:
    -n, --entries <N>      Number of entries to save (default: 25)
    -p, --page-size <N>    Page size when listing (default: 10)
    -t, --ttl <SECONDS>    TTL for every other entry (default: 2)
    -v, --version          Print version information
        --help             Print this help message
"#
    );
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::from_args();

    // Set up logging
    let _subscriber = FmtSubscriber::builder()
        .with_max_level(Level::DEBUG)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .init();

    let store: Store<String, Bytes> = Store::new_plain(DbOptions::new().with_expired())?;
    info!("Store created with expiration enabled");

    for i in 0..config.entries {
        let key = format!("key:{:05}", i);
        let value = Bytes::from(format!("value-{}", i));
        if i % 2 == 0 {
            store.save_with(key, value, SaveOptions::new().with_ttl(config.ttl))?;
        } else {
            store.save(key, value)?;
        }
    }
    info!(entries = store.len(), "Entries saved");

    let mut page = 1;
    loop {
        let result = store.list(page, config.page_size, &[])?;
        info!(page, items = result.items.len(), has_next = result.has_next, "Listed page");
        if !result.has_next {
            break;
        }
        page += 1;
    }

    let long_values = |v: &Bytes| v.len() > "value-9".len();
    info!(count = store.count(&[&long_values]), "Values with two or more digits");

    let wait = Duration::from_secs(config.ttl.max(0) as u64) + Duration::from_millis(1500);
    info!(wait_ms = wait.as_millis() as u64, "Waiting for expiry sweep");
    tokio::time::sleep(wait).await;

    let stats = store.stats();
    info!(
        keys = stats.keys,
        saves = stats.saves,
        expired = stats.expired,
        "Done"
    );

    for (key, value) in store.iter().take(3) {
        info!(key = %key, value = ?value, "Remaining entry");
    }

    Ok(())
}
