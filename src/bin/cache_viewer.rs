//! # Cache Viewer CLI
//!
//! Command-line tool for inspecting the word translation cache.
//!
//! Usage:
//!   cache_viewer recent [--limit N]
//!   cache_viewer lookup <word> [--lang L]
//!   cache_viewer stats

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use table_translator::storage::{CacheEntry, CacheStore};

#[derive(Parser)]
#[command(name = "cache_viewer")]
#[command(about = "Inspect the word translation cache", long_about = None)]
struct Cli {
    /// Path to the cache database
    #[arg(short, long, default_value = "word_info.db")]
    db: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show the most recently cached words
    Recent {
        /// Maximum number of entries to show
        #[arg(short, long, default_value_t = 10)]
        limit: usize,
    },

    /// Show the cached entry for a word
    Lookup {
        /// Word to look up
        word: String,

        /// Output language
        #[arg(short, long, default_value = "en")]
        lang: String,

        /// Print the raw metadata JSON
        #[arg(long)]
        json: bool,
    },

    /// Show aggregate statistics
    Stats,
}

fn main() -> Result<(), String> {
    let cli = Cli::parse();

    let store = CacheStore::open(&cli.db)?;

    match cli.command {
        Commands::Recent { limit } => {
            println!("Recent {} cached words:\n", limit);
            for entry in store.recent(limit)? {
                print_entry_summary(&entry);
            }
        }

        Commands::Lookup { word, lang, json } => match store.lookup(&word, &lang)? {
            Some(entry) => {
                print_entry_summary(&entry);
                if json {
                    let pretty = serde_json::to_string_pretty(&entry.metadata)
                        .map_err(|e| format!("Failed to format metadata: {}", e))?;
                    println!("{}", pretty);
                }
            }
            None => println!("'{}' -> {} not cached", word, lang),
        },

        Commands::Stats => {
            let stats = store.stats()?;

            println!("Cache Statistics ({})\n", store.path().display());
            println!("Rows:            {}", stats.total_rows);
            println!("Distinct keys:   {}", stats.distinct_keys);
            println!("Duplicate rows:  {}", stats.duplicate_rows());
            for (lang, count) in &stats.by_output_lang {
                println!("  -> {:<10} {}", lang, count);
            }
        }
    }

    Ok(())
}

fn print_entry_summary(entry: &CacheEntry) {
    println!(
        "{} [{} -> {}] {}",
        entry.word,
        entry.input_lang.as_deref().unwrap_or("?"),
        entry.output_lang,
        entry.translation
    );
}
