#[inline(always)]
pub fn logsumexp(a: f64, b: f64) -> f64 {
    if a == f64::NEG_INFINITY && b == f64::NEG_INFINITY {
        return f64::NEG_INFINITY;
    }
    if a > b {
        a + (b - a).exp().ln_1p()
    } else {
        b + (a - b).exp().ln_1p()
    }
}

/// Normalizes log-potentials in place into probabilities, returning the log-partition.
pub fn softmax(scores: &mut [f64]) -> f64 {
    let z = scores
        .iter()
        .fold(f64::NEG_INFINITY, |acc, &s| logsumexp(acc, s));
    for s in scores.iter_mut() {
        *s = (*s - z).exp();
    }
    z
}
