/// Sum of all four scores when every metric is at its best (4 x 20).
pub const MAX_SCORE_TOTAL: i32 = 80;

/// Joining probability as a whole percentage: the four scores' share of
/// [`MAX_SCORE_TOTAL`], rounded and clamped to 0..=100. Computed on read,
/// never stored.
pub fn prediction(scores: [i32; 4]) -> u8 {
    let total: i64 = scores.iter().map(|s| i64::from(*s)).sum();
    let percent = (total as f64 / f64::from(MAX_SCORE_TOTAL) * 100.0).round();
    percent.clamp(0.0, 100.0) as u8
}
