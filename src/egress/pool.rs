//! Rotating egress pool.
//!
//! A fixed, cyclic array of egress identities, each with its own
//! READY/BUSY/ERROR state. One mutex guards every state field and the scan
//! cursor; it is held only for the read-modify-write of a scan or a release,
//! never across a remote call.
//!
//! # Eligibility
//! - READY and unused for longer than the guard interval (`60 / rpm` seconds)
//! - ERROR and unused for longer than the error cooldown (600s default)
//!
//! `last_used_at` is stamped on acquire, so cooldown is measured from when
//! work began on the identity.

use log::{debug, warn};
use parking_lot::Mutex;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

use super::clock::{Clock, SystemClock};
use crate::types::{EgressIdentity, Outcome};

/// Pool tuning.
#[derive(Debug, Clone)]
pub struct PoolConfig {
    /// Minimum idle time between two uses of the same identity
    pub guard_interval: Duration,
    /// Idle time before an ERROR identity is retried
    pub error_cooldown: Duration,
    /// An identity enters ERROR once its consecutive failures exceed this
    pub max_consecutive_errors: u32,
    /// Sleep between two unsuccessful scans
    pub poll_interval: Duration,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            // 15 requests per minute
            guard_interval: Duration::from_secs(4),
            error_cooldown: Duration::from_secs(600),
            max_consecutive_errors: 3,
            poll_interval: Duration::from_secs(1),
        }
    }
}

impl PoolConfig {
    /// Derive the guard interval from a requests-per-minute budget.
    pub fn from_rate_limit(requests_per_minute: u32) -> Result<Self, String> {
        Ok(Self {
            guard_interval: guard_interval(requests_per_minute)?,
            ..Default::default()
        })
    }
}

/// `60 / requests_per_minute` seconds.
pub fn guard_interval(requests_per_minute: u32) -> Result<Duration, String> {
    if requests_per_minute == 0 {
        return Err("Rate limit must be at least 1 request per minute".to_string());
    }
    Ok(Duration::from_millis(60_000 / requests_per_minute as u64))
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EgressStatus {
    Ready,
    Busy,
    Error,
}

impl fmt::Display for EgressStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            EgressStatus::Ready => "READY",
            EgressStatus::Busy => "BUSY",
            EgressStatus::Error => "ERROR",
        };
        f.write_str(s)
    }
}

/// Mutable state of one identity. Created per member at construction.
#[derive(Clone, Debug)]
pub struct EgressState {
    pub status: EgressStatus,
    /// Clock time of the last acquire, `None` until first use
    pub last_used_at: Option<u64>,
    pub consecutive_errors: u32,
}

impl EgressState {
    fn new() -> Self {
        Self {
            status: EgressStatus::Ready,
            last_used_at: None,
            consecutive_errors: 0,
        }
    }

    fn idle_longer_than(&self, now: u64, interval_ms: u64) -> bool {
        match self.last_used_at {
            None => true,
            Some(at) => now.saturating_sub(at) > interval_ms,
        }
    }
}

/// Point-in-time view of one member.
#[derive(Clone, Debug)]
pub struct EgressSnapshot {
    pub identity: EgressIdentity,
    pub state: EgressState,
}

#[derive(Debug, Error)]
#[error("no egress identity became available within {0:?}")]
pub struct AcquireTimeout(pub Duration);

struct Member {
    identity: EgressIdentity,
    state: EgressState,
}

struct PoolInner {
    members: Vec<Member>,
    /// Index the next scan starts from
    cursor: usize,
}

/// Thread-safe rotating egress pool.
pub struct EgressPool {
    inner: Mutex<PoolInner>,
    config: PoolConfig,
    clock: Arc<dyn Clock>,
}

impl fmt::Debug for EgressPool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EgressPool")
            .field("members", &self.len())
            .field("config", &self.config)
            .finish()
    }
}

impl EgressPool {
    /// Create a pool on the system clock.
    pub fn new(identities: Vec<EgressIdentity>, config: PoolConfig) -> Result<Self, String> {
        Self::with_clock(identities, config, Arc::new(SystemClock))
    }

    /// Create a pool reading time from `clock`.
    ///
    /// Fails on an empty identity list or duplicate ids.
    pub fn with_clock(
        identities: Vec<EgressIdentity>,
        config: PoolConfig,
        clock: Arc<dyn Clock>,
    ) -> Result<Self, String> {
        if identities.is_empty() {
            return Err("Egress pool needs at least one identity".to_string());
        }

        let mut members: Vec<Member> = Vec::with_capacity(identities.len());
        for identity in identities {
            if members.iter().any(|m| m.identity.id == identity.id) {
                return Err(format!("Duplicate egress identity id {}", identity.id));
            }
            members.push(Member {
                identity,
                state: EgressState::new(),
            });
        }

        Ok(Self {
            inner: Mutex::new(PoolInner { members, cursor: 0 }),
            config,
            clock,
        })
    }

    pub fn len(&self) -> usize {
        self.inner.lock().members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn config(&self) -> &PoolConfig {
        &self.config
    }

    /// One full scan from the cursor. Marks the first eligible member BUSY.
    pub fn try_acquire(&self) -> Option<EgressIdentity> {
        let now = self.clock.now_ms();
        let guard_ms = self.config.guard_interval.as_millis() as u64;
        let cooldown_ms = self.config.error_cooldown.as_millis() as u64;

        let mut inner = self.inner.lock();
        let len = inner.members.len();

        for step in 0..len {
            let idx = (inner.cursor + step) % len;
            let member = &mut inner.members[idx];

            let eligible = match member.state.status {
                EgressStatus::Ready => member.state.idle_longer_than(now, guard_ms),
                EgressStatus::Error => member.state.idle_longer_than(now, cooldown_ms),
                EgressStatus::Busy => false,
            };

            if eligible {
                member.state.status = EgressStatus::Busy;
                member.state.last_used_at = Some(now);
                let identity = member.identity.clone();
                inner.cursor = (idx + 1) % len;
                return Some(identity);
            }
        }

        None
    }

    /// Poll until an identity is eligible or `timeout` elapses.
    ///
    /// `None` waits forever.
    pub async fn acquire(&self, timeout: Option<Duration>) -> Result<EgressIdentity, AcquireTimeout> {
        let started = tokio::time::Instant::now();

        loop {
            if let Some(identity) = self.try_acquire() {
                return Ok(identity);
            }

            let mut pause = self.config.poll_interval;
            if let Some(limit) = timeout {
                let waited = started.elapsed();
                if waited >= limit {
                    return Err(AcquireTimeout(limit));
                }
                pause = pause.min(limit - waited);
            }

            tokio::time::sleep(pause).await;
        }
    }

    /// Return an identity acquired earlier.
    pub fn release(&self, identity: &EgressIdentity, outcome: Outcome) {
        let mut inner = self.inner.lock();

        let member = match inner.members.iter_mut().find(|m| m.identity.id == identity.id) {
            Some(member) => member,
            None => {
                warn!("Release of unknown egress identity {}", identity);
                return;
            }
        };

        if member.state.status != EgressStatus::Busy {
            warn!(
                "Egress identity {} released while {}, ignoring",
                identity, member.state.status
            );
            return;
        }

        match outcome {
            Outcome::Success => {
                member.state.status = EgressStatus::Ready;
                member.state.consecutive_errors = 0;
            }
            Outcome::Failure => {
                member.state.consecutive_errors += 1;
                if member.state.consecutive_errors > self.config.max_consecutive_errors {
                    member.state.status = EgressStatus::Error;
                    warn!(
                        "Egress identity {} marked ERROR after {} consecutive failures",
                        identity, member.state.consecutive_errors
                    );
                } else {
                    member.state.status = EgressStatus::Ready;
                }
            }
            Outcome::Cancelled => {
                member.state.status = EgressStatus::Ready;
            }
        }

        debug!(
            "Released {} ({:?}) -> {}",
            identity, outcome, member.state.status
        );
    }

    /// Current state of one identity.
    pub fn state(&self, id: usize) -> Option<EgressState> {
        self.inner
            .lock()
            .members
            .iter()
            .find(|m| m.identity.id == id)
            .map(|m| m.state.clone())
    }

    /// Current state of every identity, in pool order.
    pub fn snapshot(&self) -> Vec<EgressSnapshot> {
        self.inner
            .lock()
            .members
            .iter()
            .map(|m| EgressSnapshot {
                identity: m.identity.clone(),
                state: m.state.clone(),
            })
            .collect()
    }
}
