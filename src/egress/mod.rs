//! Egress identities and the rotating pool that rations them.
//!
//! - **clock**: time source used for guard intervals and cooldowns
//! - **pool**: READY/BUSY/ERROR state machine with round-robin scanning
//! - **proxy_list**: proxy file loading and saving (identity 0 is always direct)

pub mod clock;
pub mod pool;
pub mod proxy_list;

pub use clock::{Clock, ManualClock, SystemClock};
pub use pool::{
    guard_interval, AcquireTimeout, EgressPool, EgressSnapshot, EgressState, EgressStatus,
    PoolConfig,
};
pub use proxy_list::{
    format_proxy_list, load_proxy_list, parse_proxy_list, save_proxy_list, SUPPORTED_SCHEMES,
};
