//! In-memory response cache with per-entry time-to-live
//!
//! Entries expire lazily: a lookup that finds an expired entry removes it and
//! reports a miss. There is no background sweep. Two TTL presets cover the
//! dashboard's needs: a short one for generic endpoint caching and a long one
//! for full responses that change slowly.

mod ttl;

pub use ttl::{TtlCache, DEFAULT_TTL, RESPONSE_TTL};
