//! Discrete probability machinery behind the distribution fitter
//!
//! Log-likelihoods are evaluated over the true integer support of patch
//! sizes, not a continuous relaxation. Normalizing constants come from the
//! Hurwitz zeta function (power law) or direct tail summation (truncated
//! power law); the lognormal is discretized through the normal CDF.

/// Hurwitz zeta function zeta(s, a) for s > 1, a > 0.
///
/// Euler-Maclaurin evaluation: direct summation of the first terms plus a
/// tail correction. Accuracy is far below the tolerance of any ML fit here.
pub(crate) fn hurwitz_zeta(s: f64, a: f64) -> f64 {
    const N: usize = 16;
    let mut sum = 0.0;
    for k in 0..N {
        sum += (a + k as f64).powf(-s);
    }
    let b = a + N as f64;
    sum += b.powf(1.0 - s) / (s - 1.0);
    sum += 0.5 * b.powf(-s);
    sum += s * b.powf(-s - 1.0) / 12.0;
    sum -= s * (s + 1.0) * (s + 2.0) * b.powf(-s - 3.0) / 720.0;
    sum
}

/// Approximate CDF of the standard normal distribution
/// Uses Abramowitz & Stegun approximation (error < 7.5e-8)
pub(crate) fn normal_cdf(x: f64) -> f64 {
    if x < -8.0 {
        return 0.0;
    }
    if x > 8.0 {
        return 1.0;
    }

    let t = 1.0 / (1.0 + 0.2316419 * x.abs());
    let d = 0.3989422804014327; // 1/sqrt(2*pi)
    let p = d * (-x * x / 2.0).exp()
        * (t * (0.319381530
            + t * (-0.356563782 + t * (1.781477937 + t * (-1.821255978 + t * 1.330274429)))));

    if x > 0.0 {
        1.0 - p
    } else {
        p
    }
}

/// Maximize a unimodal function over [lo, hi] by golden-section search.
///
/// Returns the argmax. The objectives here (profile log-likelihoods) are
/// smooth and effectively unimodal over the searched brackets.
pub(crate) fn golden_section_max<F>(f: F, lo: f64, hi: f64) -> f64
where
    F: Fn(f64) -> f64,
{
    const INV_PHI: f64 = 0.618_033_988_749_894_8;
    const ITERS: usize = 80;

    let mut a = lo;
    let mut b = hi;
    let mut c = b - INV_PHI * (b - a);
    let mut d = a + INV_PHI * (b - a);
    let mut fc = f(c);
    let mut fd = f(d);

    for _ in 0..ITERS {
        if fc > fd {
            b = d;
            d = c;
            fd = fc;
            c = b - INV_PHI * (b - a);
            fc = f(c);
        } else {
            a = c;
            c = d;
            fc = fd;
            d = a + INV_PHI * (b - a);
            fd = f(d);
        }
    }

    0.5 * (a + b)
}

// ---------------------------------------------------------------------------
// Power law: p(x) = x^-alpha / zeta(alpha, xmin), x = xmin, xmin+1, ...
// ---------------------------------------------------------------------------

pub(crate) fn powerlaw_loglik(alpha: f64, xmin: f64, n: f64, sum_ln_x: f64) -> f64 {
    -n * hurwitz_zeta(alpha, xmin).ln() - alpha * sum_ln_x
}

pub(crate) fn powerlaw_pmf(x: u64, alpha: f64, xmin: f64) -> f64 {
    (x as f64).powf(-alpha) / hurwitz_zeta(alpha, xmin)
}

// ---------------------------------------------------------------------------
// Truncated power law: p(x) ∝ x^-alpha * exp(-lambda * x)
// ---------------------------------------------------------------------------

/// Normalizing constant sum_{k >= xmin} k^-alpha e^(-lambda k).
///
/// Summed until the running term is negligible; lambda is bounded away from
/// zero by the fitter so the series terminates quickly.
pub(crate) fn tpl_norm(alpha: f64, lambda: f64, xmin: u64) -> f64 {
    const MAX_TERMS: usize = 200_000;
    let mut sum = 0.0;
    let mut k = xmin;
    for _ in 0..MAX_TERMS {
        let term = (k as f64).powf(-alpha) * (-lambda * k as f64).exp();
        sum += term;
        if term < sum * 1e-13 {
            break;
        }
        k += 1;
    }
    sum
}

pub(crate) fn tpl_loglik(
    alpha: f64,
    lambda: f64,
    xmin: u64,
    n: f64,
    sum_ln_x: f64,
    sum_x: f64,
) -> f64 {
    -n * tpl_norm(alpha, lambda, xmin).ln() - alpha * sum_ln_x - lambda * sum_x
}

// ---------------------------------------------------------------------------
// Lognormal, discretized and tail-normalized above xmin:
// p(x) ∝ Phi((ln(x+1/2)-mu)/sigma) - Phi((ln(x-1/2)-mu)/sigma)
// ---------------------------------------------------------------------------

pub(crate) fn lognormal_pmf(x: u64, mu: f64, sigma: f64, xmin: u64) -> f64 {
    let hi = ((x as f64 + 0.5).ln() - mu) / sigma;
    let lo = ((x as f64 - 0.5).ln() - mu) / sigma;
    let tail = 1.0 - normal_cdf(((xmin as f64 - 0.5).ln() - mu) / sigma);
    if tail <= 0.0 {
        return 0.0;
    }
    (normal_cdf(hi) - normal_cdf(lo)) / tail
}

pub(crate) fn lognormal_loglik(mu: f64, sigma: f64, xmin: u64, tail: &[u64]) -> f64 {
    tail.iter()
        .map(|&x| {
            let p = lognormal_pmf(x, mu, sigma, xmin);
            if p > 0.0 {
                p.ln()
            } else {
                -1e12
            }
        })
        .sum()
}

// ---------------------------------------------------------------------------
// Discrete exponential (shifted geometric):
// p(x) = (1 - e^-lambda) e^(-lambda (x - xmin)), x = xmin, xmin+1, ...
// ---------------------------------------------------------------------------

pub(crate) fn exponential_loglik(lambda: f64, xmin: u64, n: f64, sum_x: f64) -> f64 {
    let shifted = sum_x - n * xmin as f64;
    n * (1.0 - (-lambda).exp()).ln() - lambda * shifted
}

pub(crate) fn exponential_cdf(x: u64, lambda: f64, xmin: u64) -> f64 {
    1.0 - (-lambda * (x as f64 - xmin as f64 + 1.0)).exp()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hurwitz_zeta_basel() {
        // zeta(2, 1) = pi^2 / 6
        let z = hurwitz_zeta(2.0, 1.0);
        assert!((z - std::f64::consts::PI.powi(2) / 6.0).abs() < 1e-9, "got {z}");
    }

    #[test]
    fn test_hurwitz_zeta_shift_identity() {
        // zeta(s, a) = a^-s + zeta(s, a+1)
        let s = 2.5;
        let a = 3.0;
        let lhs = hurwitz_zeta(s, a);
        let rhs = a.powf(-s) + hurwitz_zeta(s, a + 1.0);
        assert!((lhs - rhs).abs() < 1e-10);
    }

    #[test]
    fn test_normal_cdf_reference_points() {
        assert!((normal_cdf(0.0) - 0.5).abs() < 1e-7);
        assert!((normal_cdf(1.96) - 0.975).abs() < 0.001);
        assert!((normal_cdf(-1.96) - 0.025).abs() < 0.001);
    }

    #[test]
    fn test_powerlaw_pmf_normalizes() {
        let alpha = 2.5;
        let total: f64 = (1..10_000).map(|x| powerlaw_pmf(x, alpha, 1.0)).sum();
        assert!((total - 1.0).abs() < 1e-3, "sum = {total}");
    }

    #[test]
    fn test_tpl_norm_matches_direct_sum() {
        let (alpha, lambda, xmin) = (1.5, 0.01, 2u64);
        let c = tpl_norm(alpha, lambda, xmin);
        let direct: f64 = (xmin..5_000)
            .map(|k| (k as f64).powf(-alpha) * (-lambda * k as f64).exp())
            .sum();
        assert!((c - direct).abs() / c < 1e-6, "c = {c}, direct = {direct}");
    }

    #[test]
    fn test_lognormal_pmf_normalizes() {
        let total: f64 = (1..100_000).map(|x| lognormal_pmf(x, 1.0, 1.0, 1)).sum();
        assert!((total - 1.0).abs() < 1e-3, "sum = {total}");
    }

    #[test]
    fn test_exponential_cdf_monotone() {
        let lambda = 0.3;
        let mut prev = 0.0;
        for x in 1..50 {
            let c = exponential_cdf(x, lambda, 1);
            assert!(c >= prev && c <= 1.0);
            prev = c;
        }
        assert!((exponential_cdf(200, lambda, 1) - 1.0).abs() < 1e-10);
    }

    #[test]
    fn test_golden_section_finds_parabola_peak() {
        let argmax = golden_section_max(|x| -(x - 3.2) * (x - 3.2), 0.0, 10.0);
        assert!((argmax - 3.2).abs() < 1e-6);
    }
}
