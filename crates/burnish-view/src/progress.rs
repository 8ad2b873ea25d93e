use burnish_config::ViewTunables;

/// Display-only duration estimate for a polish request. The per-character
/// cost and safety factor are empirically tuned and environment-dependent,
/// hence configurable.
pub fn estimated_seconds(char_count: usize, tunables: &ViewTunables) -> u64 {
    let estimated_ms = (char_count as u64)
        .saturating_mul(tunables.estimate_per_char_ms)
        .saturating_mul(tunables.estimate_safety_factor_pct)
        / 100;
    ((estimated_ms + 500) / 1_000).max(1)
}

/// Percentage for the progress indicator, capped at 99 until completion.
/// Cosmetic only, never a correctness signal.
pub fn progress_percent(elapsed_seconds: u64, estimated_seconds: u64) -> u8 {
    let percent = elapsed_seconds.saturating_mul(100) / estimated_seconds.max(1);
    percent.min(99) as u8
}
