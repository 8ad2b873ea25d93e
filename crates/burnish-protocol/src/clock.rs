use std::time::{SystemTime, UNIX_EPOCH};

/// Milliseconds since the Unix epoch. Record timestamps use wall-clock
/// epoch time because they must be comparable across process restarts.
pub fn epoch_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX))
        .unwrap_or(0)
}
