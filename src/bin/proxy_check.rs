//! # Proxy Check CLI
//!
//! Filters a proxy list down to the proxies that answer an IP-echo request.
//!
//! Usage:
//!   proxy_check <proxies.txt> [--output good_proxies.txt] [--timeout-secs 5]

use clap::Parser;
use log::{error, info};
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

use table_translator::client::proxy_check::DEFAULT_CHECK_URL;
use table_translator::client::{check_proxies, ProxyCheckConfig};
use table_translator::egress::{load_proxy_list, save_proxy_list};

#[derive(Parser, Debug)]
#[command(name = "proxy_check")]
#[command(about = "Keep only the proxies that answer within the timeout", long_about = None)]
struct Args {
    /// Proxy list to check, one address per line
    input: PathBuf,

    /// Where to write the responsive proxies
    #[arg(short, long, default_value = "good_proxies.txt")]
    output: PathBuf,

    /// IP-echo endpoint requested through each proxy
    #[arg(short, long, default_value = DEFAULT_CHECK_URL)]
    url: String,

    /// Per-proxy timeout
    #[arg(short, long, default_value_t = 5)]
    timeout_secs: u64,

    /// Proxies checked at the same time
    #[arg(short, long, default_value_t = 16)]
    concurrency: usize,
}

#[tokio::main]
async fn main() -> ExitCode {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(env_filter).init();

    match run(Args::parse()).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(args: Args) -> Result<(), String> {
    let identities = load_proxy_list(&args.input)?;
    info!(
        "Checking {} proxies against {}",
        identities.iter().filter(|i| !i.is_direct()).count(),
        args.url
    );

    let config = ProxyCheckConfig {
        check_url: args.url,
        timeout: Duration::from_secs(args.timeout_secs),
        concurrency: args.concurrency,
    };

    let results = check_proxies(&identities, &config).await;
    let good: Vec<_> = results
        .into_iter()
        .filter(|r| r.is_ok())
        .map(|r| r.identity)
        .collect();

    save_proxy_list(&args.output, &good)?;
    info!("{} proxies OK, written to {}", good.len(), args.output.display());

    Ok(())
}
