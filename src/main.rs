//! # Table Translator Entry Point
//!
//! Reads a CSV table, translates its unique non-English words and
//! writes the table back with translated and word-info columns appended.

use clap::Parser;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use log::{error, info, warn};
use table_translator::client::{HttpClientConfig, HttpTranslationClient};
use table_translator::egress::{load_proxy_list, EgressPool};
use table_translator::table::{parse_word_info_columns, translate_table, Table};
use table_translator::{
    DispatchConfig, DispatchEngine, DispatchError, EgressIdentity, TranslatorConfig,
};

/// Translate unique non-English words in a table and append their translations
#[derive(Parser, Debug)]
#[command(name = "table-translator")]
#[command(about = "Translate unique non-English words in a table and append their translations", long_about = None)]
struct Args {
    /// Input table (CSV, header row first)
    inputfile: PathBuf,

    /// Input language (default: auto detect)
    #[arg(short, long)]
    input_language: Option<String>,

    /// Output language
    #[arg(short = 'l', long, default_value = "en")]
    output_language: String,

    /// Translation requests per MINUTE, per egress identity
    #[arg(short, long, default_value_t = 15)]
    rate_limit: u32,

    /// Word info cache database
    #[arg(short, long)]
    word_info_file: Option<PathBuf>,

    /// Word info columns to include (CSV with `col_name,mapping` records)
    #[arg(short = 'c', long)]
    word_info_columns: Option<PathBuf>,

    /// Output table
    #[arg(short, long, default_value = "output.csv")]
    output: PathBuf,

    /// Concurrent workers
    #[arg(short, long, default_value_t = 1)]
    threads: usize,

    /// Proxy list, one address per line
    #[arg(short, long)]
    proxy_list: Option<PathBuf>,

    /// Translation endpoint base URL
    #[arg(long)]
    endpoint: Option<String>,

    /// Give up on a single word after this many seconds
    #[arg(long)]
    word_deadline_secs: Option<u64>,
}

impl Args {
    fn into_config(self) -> (TranslatorConfig, PathBuf, Option<PathBuf>, PathBuf) {
        let mut config = TranslatorConfig::default().with_env_overrides();

        config.output_language = self.output_language;
        config.input_language = self.input_language;
        config.rate_limit_per_minute = self.rate_limit;
        config.thread_count = self.threads;
        config.word_deadline = self.word_deadline_secs.map(Duration::from_secs);
        if let Some(path) = self.word_info_file {
            config.cache_store_path = path;
        }
        if let Some(path) = self.proxy_list {
            config.proxy_list_path = Some(path);
        }
        if let Some(endpoint) = self.endpoint {
            config.endpoint = endpoint;
        }

        (config, self.inputfile, self.word_info_columns, self.output)
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(env_filter).init();

    match run(Args::parse()).await {
        Ok(()) => {
            info!("Complete!");
            ExitCode::SUCCESS
        }
        Err(RunError::Dispatch(DispatchError::StoreUnavailable(e))) => {
            error!("Cache store unavailable: {}", e);
            ExitCode::from(2)
        }
        Err(RunError::Dispatch(e @ DispatchError::Interrupted { .. })) => {
            error!("{}", e);
            ExitCode::from(130)
        }
        Err(e) => {
            error!("{}", e);
            ExitCode::FAILURE
        }
    }
}

#[derive(Debug, thiserror::Error)]
enum RunError {
    #[error("{0}")]
    Setup(String),

    #[error(transparent)]
    Dispatch(#[from] DispatchError),
}

async fn run(args: Args) -> Result<(), RunError> {
    let (config, input, columns_path, output) = args.into_config();
    config.validate().map_err(RunError::Setup)?;
    info!("{:?}", config);

    let identities = match &config.proxy_list_path {
        Some(path) => load_proxy_list(path).map_err(RunError::Setup)?,
        None => vec![EgressIdentity::direct()],
    };
    info!(
        "Egress pool: {} identities ({} proxies)",
        identities.len(),
        identities.iter().filter(|i| !i.is_direct()).count()
    );

    let pool = EgressPool::new(identities, config.pool_config().map_err(RunError::Setup)?)
        .map_err(RunError::Setup)?;

    let client = HttpTranslationClient::new(HttpClientConfig {
        endpoint: config.endpoint.clone(),
        ..Default::default()
    });

    let engine = DispatchEngine::open(
        &config.cache_store_path,
        Arc::new(pool),
        Arc::new(client),
        DispatchConfig::from(&config),
    )?;

    let shutdown = engine.shutdown_signal();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Received Ctrl+C, finishing in-flight requests...");
            shutdown.trigger();
        }
    });

    let columns = match columns_path {
        Some(path) => {
            let text = std::fs::read_to_string(&path).map_err(|e| {
                RunError::Setup(format!("Failed to read {}: {}", path.display(), e))
            })?;
            parse_word_info_columns(&text).map_err(RunError::Setup)?
        }
        None => Vec::new(),
    };

    let table = Table::read(&input).map_err(RunError::Setup)?;
    let annotated = translate_table(&engine, &table, &columns, &config.output_language).await?;
    annotated.write(&output).map_err(RunError::Setup)?;

    let stats = engine.stats();
    info!(
        "Words: {}, cache hits: {} ({:.1}%), remote calls: {}, remote failures: {}",
        stats.words,
        stats.cache_hits,
        stats.hit_rate() * 100.0,
        stats.remote_calls,
        stats.remote_failures
    );
    info!("Wrote {}", output.display());

    Ok(())
}
