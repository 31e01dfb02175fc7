//! Recursive exponential smoothing shared by EMA, ATR, ±DM and ADX.
//!
//! alpha = 2/(n+1), s[0] = x[0], s[i] = alpha*x[i] + (1-alpha)*s[i-1].

pub fn smoothing_factor(period: usize) -> f64 {
    2.0 / (period as f64 + 1.0)
}

pub fn smooth(values: &[f64], period: usize) -> Vec<f64> {
    if period == 0 {
        return Vec::new();
    }
    let alpha = smoothing_factor(period);
    let mut out = Vec::with_capacity(values.len());
    for (i, &x) in values.iter().enumerate() {
        let s = if i == 0 {
            x
        } else {
            alpha * x + (1.0 - alpha) * out[i - 1]
        };
        out.push(s);
    }
    out
}

/// Smooth a partially-defined series. Gaps carry the previous smoothed value;
/// output stays `None` until the first defined input.
pub fn smooth_partial(values: &[Option<f64>], period: usize) -> Vec<Option<f64>> {
    if period == 0 {
        return vec![None; values.len()];
    }
    let alpha = smoothing_factor(period);
    let mut prev: Option<f64> = None;
    values
        .iter()
        .map(|x| {
            prev = match (prev, *x) {
                (None, Some(x)) => Some(x),
                (Some(p), Some(x)) => Some(alpha * x + (1.0 - alpha) * p),
                (p, None) => p,
            };
            prev
        })
        .collect()
}
