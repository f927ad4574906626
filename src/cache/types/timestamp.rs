//! Wall-clock helpers
//!
//! Every timestamp the cache stores is milliseconds since the Unix epoch so metadata
//! survives a trip through the persistent tier unchanged.

use std::time::Duration;

/// Current time in milliseconds since the Unix epoch
#[inline(always)]
pub fn now_millis() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}

/// Convert a duration into whole milliseconds, saturating at `u64::MAX`
#[inline(always)]
pub fn duration_millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}
