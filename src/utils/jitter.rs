//! Jitter helpers for retry and refresh scheduling

/// Generate a random jitter value between 0 and `max_jitter_ms` (inclusive)
pub fn generate_jitter_ms(max_jitter_ms: u64) -> u64 {
    if max_jitter_ms == 0 {
        return 0;
    }
    fastrand::u64(0..=max_jitter_ms)
}

/// Generate jitter as a percentage of a base value
///
/// # Examples
/// ```
/// use m3u_aggregator::utils::jitter::generate_jitter_percent;
///
/// let jitter = generate_jitter_percent(1000, 25); // 0-250ms jitter (25% of 1000)
/// assert!(jitter <= 250);
/// ```
pub fn generate_jitter_percent(base_value: u64, jitter_percent: u8) -> u64 {
    if jitter_percent == 0 || base_value == 0 {
        return 0;
    }

    let max_jitter = base_value.saturating_mul(jitter_percent as u64) / 100;
    generate_jitter_ms(max_jitter)
}
