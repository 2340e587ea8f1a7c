/// Pearson correlation between two equal-length normalized trajectories.
///
/// Returns `None` when the score is undefined: mismatched lengths, fewer
/// than two points, or zero variance in either sequence. Callers discard
/// those pairs. A defined score is clamped into `[-1, 1]` to absorb
/// rounding.
pub fn similarity(a: &[f64], b: &[f64]) -> Option<f64> {
    let n = a.len();
    if n != b.len() || n < 2 {
        return None;
    }
    let nf = n as f64;
    let mean_a = a.iter().sum::<f64>() / nf;
    let mean_b = b.iter().sum::<f64>() / nf;

    let mut cov = 0.0;
    let mut var_a = 0.0;
    let mut var_b = 0.0;
    for (&x, &y) in a.iter().zip(b.iter()) {
        let dx = x - mean_a;
        let dy = y - mean_b;
        cov += dx * dy;
        var_a += dx * dx;
        var_b += dy * dy;
    }

    if var_a < 1e-15 || var_b < 1e-15 {
        return None;
    }
    let r = cov / (var_a.sqrt() * var_b.sqrt());
    if r.is_nan() {
        return None;
    }
    Some(r.clamp(-1.0, 1.0))
}
