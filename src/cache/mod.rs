//! Time-bounded caching primitives
//!
//! - **Clock**: injectable monotonic time source
//! - **TtlCache**: snapshot cache with a fixed validity window per entry

pub mod clock;
pub mod ttl;

pub use clock::{Clock, ManualClock, SystemClock};
pub use ttl::{CacheEntry, Cached, TtlCache, TtlCacheStatsSnapshot};
