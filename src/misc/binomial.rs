/// Returns the binomial coefficient of `n` and `k`.
pub fn binomial(n: usize, k: usize) -> f64 {
    if k == 0 || k == n {
        return 1.;
    } else if n == 0 || k > n {
        return 0.;
    }

    let k = k.min(n - k);
    let mut r = 1.;
    for i in 0..k {
        r = r * (n - i) as f64 / (i + 1) as f64;
    }
    r
}

/// Returns `n!` as a floating point value.
pub fn factorial(n: usize) -> f64 {
    (1..=n).fold(1., |acc, i| acc * i as f64)
}

/// Returns the falling factorial `n (n - 1) ... (n - k + 1)`, i.e. the coefficient of
/// the `k`-th derivative of `x^n`.
pub fn falling_factorial(n: usize, k: usize) -> f64 {
    if k > n {
        return 0.;
    }
    ((n - k + 1)..=n).fold(1., |acc, i| acc * i as f64)
}
