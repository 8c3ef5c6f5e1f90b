//! # Dispatch Engine
//!
//! Resolves a set of unique words through a fixed pool of worker tasks.
//!
//! Each worker takes one word at a time and runs it to completion:
//! 1. Cache lookup; a hit finishes the word
//! 2. Otherwise loop: acquire an egress identity, call the translation
//!    client, release the identity with the outcome
//! 3. On success insert into the cache and finish the word
//!
//! There is no retry cap and no backoff. Failing identities are rotated out
//! by the pool's guard interval and ERROR cooldown.
//!
//! Workers share nothing but the pool and the cache store. Neither lock is
//! held across a remote call. Cache statements run on the blocking pool.
//!
//! An acquired identity is held as an `EgressLease`. A worker that unwinds or
//! is aborted mid-call drops its lease, which releases the identity as failed.

use log::{debug, error, info, log_enabled, warn, Level};
use parking_lot::Mutex;
use std::collections::{HashMap, HashSet, VecDeque};
use std::path::Path;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use thiserror::Error;

use super::stats::{DispatchStats, DispatchStatsSnapshot};
use crate::client::{TranslationClient, TranslationRequest};
use crate::config::TranslatorConfig;
use crate::egress::EgressPool;
use crate::storage::{CacheEntry, CacheStore};
use crate::types::{EgressIdentity, Outcome, TranslationResult};

/// Engine settings.
#[derive(Debug, Clone)]
pub struct DispatchConfig {
    pub output_language: String,
    pub input_language: Option<String>,
    /// Number of concurrent workers
    pub thread_count: usize,
    /// Longest single acquire wait before the worker logs and rescans
    pub acquire_wait: Duration,
    /// Give up on a word after this long (unbounded when `None`)
    pub word_deadline: Option<Duration>,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self::from(&TranslatorConfig::default())
    }
}

impl From<&TranslatorConfig> for DispatchConfig {
    fn from(config: &TranslatorConfig) -> Self {
        Self {
            output_language: config.output_language.clone(),
            input_language: config.input_language.clone(),
            thread_count: config.thread_count,
            acquire_wait: config.acquire_wait,
            word_deadline: config.word_deadline,
        }
    }
}

#[derive(Error, Debug)]
pub enum DispatchError {
    #[error("Cache store unavailable: {0}")]
    StoreUnavailable(String),

    #[error("Interrupted after resolving {resolved} of {total} words")]
    Interrupted { resolved: usize, total: usize },

    #[error("Worker failed: {0}")]
    Worker(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

/// Cooperative stop flag.
///
/// Once triggered, workers start no new remote calls. Calls already in
/// flight complete normally.
#[derive(Debug, Clone, Default)]
pub struct ShutdownSignal {
    triggered: Arc<AtomicBool>,
}

impl ShutdownSignal {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn trigger(&self) {
        self.triggered.store(true, Ordering::SeqCst);
    }

    pub fn is_triggered(&self) -> bool {
        self.triggered.load(Ordering::SeqCst)
    }
}

/// Shared state handed to every worker.
struct DispatchContext<C> {
    pool: Arc<EgressPool>,
    cache: Arc<CacheStore>,
    client: Arc<C>,
    config: DispatchConfig,
    stats: DispatchStats,
    shutdown: ShutdownSignal,
}

/// Words of one `translate_all` call.
struct WorkQueue {
    words: Mutex<VecDeque<String>>,
    total: usize,
    taken: AtomicUsize,
    abandoned: AtomicUsize,
}

impl WorkQueue {
    fn new(words: &HashSet<String>) -> Self {
        Self {
            words: Mutex::new(words.iter().cloned().collect()),
            total: words.len(),
            taken: AtomicUsize::new(0),
            abandoned: AtomicUsize::new(0),
        }
    }

    /// Next word and its 1-based position.
    fn next(&self) -> Option<(String, usize)> {
        let word = self.words.lock().pop_front()?;
        let position = self.taken.fetch_add(1, Ordering::SeqCst) + 1;
        Some((word, position))
    }
}

/// An identity checked out of the pool, returned exactly once.
struct EgressLease<'a> {
    pool: &'a EgressPool,
    identity: EgressIdentity,
    released: bool,
}

impl<'a> EgressLease<'a> {
    fn new(pool: &'a EgressPool, identity: EgressIdentity) -> Self {
        Self {
            pool,
            identity,
            released: false,
        }
    }

    fn release(mut self, outcome: Outcome) {
        self.released = true;
        self.pool.release(&self.identity, outcome);
    }
}

impl Drop for EgressLease<'_> {
    fn drop(&mut self) {
        if !self.released {
            warn!(
                "Egress {} dropped while in use, releasing as failed",
                self.identity
            );
            self.pool.release(&self.identity, Outcome::Failure);
        }
    }
}

enum WordOutcome {
    Resolved(TranslationResult),
    Abandoned,
    Interrupted,
}

pub struct DispatchEngine<C> {
    context: Arc<DispatchContext<C>>,
}

impl<C: TranslationClient + 'static> DispatchEngine<C> {
    /// Create an engine over an already open cache store.
    pub fn new(
        pool: Arc<EgressPool>,
        cache: Arc<CacheStore>,
        client: Arc<C>,
        config: DispatchConfig,
    ) -> Result<Self, DispatchError> {
        if config.thread_count == 0 {
            return Err(DispatchError::InvalidConfig(
                "thread count must be at least 1".to_string(),
            ));
        }

        Ok(Self {
            context: Arc::new(DispatchContext {
                pool,
                cache,
                client,
                config,
                stats: DispatchStats::default(),
                shutdown: ShutdownSignal::new(),
            }),
        })
    }

    /// Open the cache store at `cache_path` and create the engine.
    ///
    /// An unopenable store is fatal: no worker is started.
    pub fn open<P: AsRef<Path>>(
        cache_path: P,
        pool: Arc<EgressPool>,
        client: Arc<C>,
        config: DispatchConfig,
    ) -> Result<Self, DispatchError> {
        let cache = CacheStore::open(cache_path).map_err(DispatchError::StoreUnavailable)?;
        Self::new(pool, Arc::new(cache), client, config)
    }

    /// Handle that stops new remote calls when triggered.
    pub fn shutdown_signal(&self) -> ShutdownSignal {
        self.context.shutdown.clone()
    }

    pub fn stats(&self) -> DispatchStatsSnapshot {
        self.context.stats.snapshot()
    }

    pub fn pool(&self) -> &Arc<EgressPool> {
        &self.context.pool
    }

    pub fn cache(&self) -> &Arc<CacheStore> {
        &self.context.cache
    }

    /// Resolve every word, returning the complete word -> result mapping.
    ///
    /// Words abandoned at the per-word deadline are missing from the
    /// mapping. A shutdown before every word resolved yields
    /// `DispatchError::Interrupted` and no partial mapping.
    pub async fn translate_all(
        &self,
        words: &HashSet<String>,
    ) -> Result<HashMap<String, TranslationResult>, DispatchError> {
        let total = words.len();
        if total == 0 {
            return Ok(HashMap::new());
        }

        let queue = Arc::new(WorkQueue::new(words));
        let workers = self.context.config.thread_count.min(total);

        info!(
            "Dispatching {} words to {} worker(s) over {} egress identities",
            total,
            workers,
            self.context.pool.len()
        );

        let handles: Vec<_> = (0..workers)
            .map(|worker_id| {
                let context = Arc::clone(&self.context);
                let queue = Arc::clone(&queue);
                tokio::spawn(async move { context.run_worker(worker_id, queue).await })
            })
            .collect();

        let mut results = HashMap::with_capacity(total);
        let mut handles = handles.into_iter();
        while let Some(handle) = handles.next() {
            match handle.await {
                Ok(resolved) => results.extend(resolved),
                Err(e) => {
                    error!("Worker task failed, stopping the others: {}", e);
                    let rest: Vec<_> = handles.collect();
                    for other in &rest {
                        other.abort();
                    }
                    // Wait so aborted workers have dropped their leases
                    for other in rest {
                        let _ = other.await;
                    }
                    return Err(DispatchError::Worker(e.to_string()));
                }
            }
        }

        let abandoned = queue.abandoned.load(Ordering::SeqCst);
        if results.len() + abandoned < total {
            warn!(
                "Dispatch interrupted: {} of {} words resolved",
                results.len(),
                total
            );
            return Err(DispatchError::Interrupted {
                resolved: results.len(),
                total,
            });
        }

        if abandoned > 0 {
            warn!("{} word(s) abandoned at the per-word deadline", abandoned);
        }
        info!("Dispatch complete: {} words resolved", results.len());

        Ok(results)
    }
}

impl<C: TranslationClient> DispatchContext<C> {
    async fn run_worker(
        &self,
        worker_id: usize,
        queue: Arc<WorkQueue>,
    ) -> Vec<(String, TranslationResult)> {
        let mut resolved = Vec::new();

        loop {
            if self.shutdown.is_triggered() {
                debug!("[worker {}] shutdown requested, stopping", worker_id);
                break;
            }

            let (word, position) = match queue.next() {
                Some(next) => next,
                None => break,
            };

            info!(
                "[worker {}] Translating ({}/{}) '{}'",
                worker_id, position, queue.total, word
            );
            self.stats.record_word();

            match self.resolve_word(worker_id, &word).await {
                WordOutcome::Resolved(result) => resolved.push((word, result)),
                WordOutcome::Abandoned => {
                    queue.abandoned.fetch_add(1, Ordering::SeqCst);
                    self.stats.record_abandoned();
                }
                WordOutcome::Interrupted => break,
            }
        }

        resolved
    }

    async fn resolve_word(&self, worker_id: usize, word: &str) -> WordOutcome {
        let output_lang = self.config.output_language.as_str();

        match self.lookup_cached(word).await {
            Ok(Some(entry)) => {
                debug!("[worker {}] '{}' found in cache", worker_id, word);
                self.stats.record_cache_hit();
                return WordOutcome::Resolved(entry.into());
            }
            Ok(None) => {}
            Err(e) => {
                self.stats.record_store_read_failure();
                warn!(
                    "[worker {}] Cache lookup for '{}' failed, treating as miss: {}",
                    worker_id, word, e
                );
            }
        }

        let request = TranslationRequest {
            word,
            source_lang: self.config.input_language.as_deref(),
            target_lang: output_lang,
        };
        let started = Instant::now();

        loop {
            if self.shutdown.is_triggered() {
                return WordOutcome::Interrupted;
            }

            let mut wait = self.config.acquire_wait;
            if let Some(deadline) = self.config.word_deadline {
                let elapsed = started.elapsed();
                if elapsed >= deadline {
                    warn!(
                        "[worker {}] Giving up on '{}' after {:?}",
                        worker_id, word, elapsed
                    );
                    return WordOutcome::Abandoned;
                }
                wait = wait.min(deadline - elapsed);
            }

            let lease = match self.pool.acquire(Some(wait)).await {
                Ok(identity) => EgressLease::new(&self.pool, identity),
                Err(e) => {
                    info!("[worker {}] {}, rescanning", worker_id, e);
                    self.log_pool_snapshot(worker_id);
                    continue;
                }
            };

            if self.shutdown.is_triggered() {
                lease.release(Outcome::Cancelled);
                return WordOutcome::Interrupted;
            }

            let identity = lease.identity.clone();
            debug!("[worker {}] '{}' via egress {}", worker_id, word, identity);
            self.stats.record_remote_call();

            match self.client.translate(&request, &identity).await {
                Ok(response) => {
                    lease.release(Outcome::Success);
                    info!(
                        "[worker {}] '{}' translated via egress {}",
                        worker_id, word, identity.id
                    );

                    let entry = CacheEntry {
                        word: word.to_string(),
                        input_lang: self
                            .config
                            .input_language
                            .clone()
                            .or(response.detected_lang),
                        output_lang: output_lang.to_string(),
                        translation: response.text,
                        metadata: response.metadata,
                    };

                    if let Err(e) = self.store(&entry).await {
                        self.stats.record_store_write_failure();
                        error!(
                            "[worker {}] Failed to cache '{}', keeping result in memory: {}",
                            worker_id, word, e
                        );
                    }

                    return WordOutcome::Resolved(entry.into());
                }
                Err(e) => {
                    lease.release(Outcome::Failure);
                    self.stats.record_remote_failure();
                    warn!(
                        "[worker {}] Egress {} failed for '{}': {}",
                        worker_id, identity.id, word, e
                    );
                }
            }
        }
    }

    async fn lookup_cached(&self, word: &str) -> Result<Option<CacheEntry>, String> {
        let cache = Arc::clone(&self.cache);
        let word = word.to_string();
        let output_lang = self.config.output_language.clone();

        tokio::task::spawn_blocking(move || cache.lookup(&word, &output_lang))
            .await
            .map_err(|e| format!("Cache lookup task failed: {}", e))?
    }

    async fn store(&self, entry: &CacheEntry) -> Result<(), String> {
        let cache = Arc::clone(&self.cache);
        let entry = entry.clone();

        tokio::task::spawn_blocking(move || cache.insert(&entry))
            .await
            .map_err(|e| format!("Cache insert task failed: {}", e))?
    }

    fn log_pool_snapshot(&self, worker_id: usize) {
        if !log_enabled!(Level::Debug) {
            return;
        }
        for member in self.pool.snapshot() {
            debug!(
                "[worker {}]   egress {} {} errors={} last_used={:?}",
                worker_id,
                member.identity,
                member.state.status,
                member.state.consecutive_errors,
                member.state.last_used_at
            );
        }
    }
}
