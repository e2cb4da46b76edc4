// mipow Source Code File
//
// Licensed under the BSD 3-Clause license. See LICENSE file in the project root
// for full license information.

//! Command line control for nearby MiPOW bulbs.

use clap::{Parser, Subcommand};
use log::{error, warn};
use mipow::api::Advertisement;
use mipow::deadline::{self, Deadline};
use mipow::pipeline::{for_each_discovered_bulb, ActionPool, DEFAULT_DISCOVERY_WINDOW};
use mipow::platform::Adapter;
use mipow::scan;
use std::time::Duration;

/// How long a bulb is given to apply a command before its connection is closed.
const SETTLE_DELAY: Duration = Duration::from_secs(1);

#[derive(Parser)]
#[command(name = "mipowctl")]
#[command(about = "Control MiPOW Bluetooth LE bulbs")]
struct Cli {
    #[command(subcommand)]
    command: Verb,

    /// Discovery window in seconds. Ctrl-C ends it early
    #[arg(long, global = true, default_value_t = DEFAULT_DISCOVERY_WINDOW.as_secs())]
    timeout: u64,
}

#[derive(Subcommand)]
enum Verb {
    /// Print the name and address of every bulb in range
    List,
    /// Turn every bulb in range on at full white brightness
    Allon,
    /// Turn every bulb in range off
    Alloff,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    pretty_env_logger::formatted_builder()
        .filter_level(log::LevelFilter::Info)
        .parse_default_env()
        .init();

    let cli = Cli::parse();
    let timeout = Duration::from_secs(cli.timeout);
    let adapter = Adapter::new().await?;

    match cli.command {
        Verb::List => list(&adapter, timeout).await?,
        Verb::Allon => switch_all(&adapter, timeout, true).await?,
        Verb::Alloff => switch_all(&adapter, timeout, false).await?,
    }
    Ok(())
}

async fn list(adapter: &Adapter, timeout: Duration) -> anyhow::Result<()> {
    let deadline = Deadline::new(timeout);
    let result = scan::scan(adapter, &deadline.scope(), |advertisement| {
        println!("{}", list_line(&advertisement));
    })
    .await;

    match result {
        Err(e) if !e.is_scope_end() => Err(e.into()),
        _ => Ok(()),
    }
}

/// The quoted, escaped name followed by the address.
fn list_line(advertisement: &Advertisement) -> String {
    format!(
        "{:?} ({})",
        advertisement.local_name.as_deref().unwrap_or_default(),
        advertisement.address
    )
}

async fn switch_all(adapter: &Adapter, timeout: Duration, on: bool) -> anyhow::Result<()> {
    println!("Connecting to all nearby MiPOW bulbs.");
    let (verb, level) = if on { ("on", 255) } else { ("off", 0) };

    let mut actions = ActionPool::new();
    let result = for_each_discovered_bulb(adapter, timeout, |bulb| {
        actions.spawn(async move {
            let address = bulb.address();
            println!("Turning {} {}.", verb, address);
            let result = bulb.set_white_brightness(level).await;
            tokio::time::sleep(SETTLE_DELAY).await;
            if let Err(e) = bulb.close().await {
                println!("Error closing connection to {}: {}", address, e);
            }
            result
        });
    })
    .await;

    if let Err(e) = result {
        error!("Scan error: {}", e);
    }
    // The discovery window has taken over SIGINT, so keep Ctrl-C working while waiting.
    let failures = actions.join_until(deadline::ctrl_c()).await?;
    if failures > 0 {
        warn!("{} bulb(s) did not accept the command", failures);
    }
    Ok(())
}
