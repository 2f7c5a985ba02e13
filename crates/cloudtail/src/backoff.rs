use std::time::Duration;

const BACKOFF_CAP: Duration = Duration::from_secs(30);

/// Delay before retry attempt `attempt + 1`: `2^attempt` seconds, capped at
/// thirty. Pure; the caller owns the sleep.
pub fn retry_delay(attempt: u32) -> Duration {
    let seconds = 1u64.checked_shl(attempt).unwrap_or(u64::MAX);
    Duration::from_secs(seconds).min(BACKOFF_CAP)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn delay_doubles_per_attempt() {
        assert_eq!(retry_delay(0), Duration::from_secs(1));
        assert_eq!(retry_delay(1), Duration::from_secs(2));
        assert_eq!(retry_delay(2), Duration::from_secs(4));
        assert_eq!(retry_delay(4), Duration::from_secs(16));
    }

    #[test]
    fn delay_caps_at_thirty_seconds() {
        assert_eq!(retry_delay(5), Duration::from_secs(30));
        assert_eq!(retry_delay(10), Duration::from_secs(30));
        assert_eq!(retry_delay(100), Duration::from_secs(30));
    }
}
