//! Small statistics primitives shared by QC, ranking, and sensitivity
//! analysis. Pure functions over slices; no interior state.

/// Consistency constant making MAD comparable to a standard deviation
/// under an approximately normal distribution.
pub const MAD_CONSISTENCY: f64 = 1.4826;

pub fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    Some(values.iter().sum::<f64>() / values.len() as f64)
}

pub fn std_dev(values: &[f64]) -> Option<f64> {
    if values.len() < 2 {
        return None;
    }
    let m = mean(values)?;
    let var = values.iter().map(|v| (v - m) * (v - m)).sum::<f64>()
        / (values.len() - 1) as f64;
    Some(var.sqrt())
}

/// Median of a slice (the slice is copied; input order is untouched).
pub fn median(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
    let n = sorted.len();
    if n % 2 == 1 {
        Some(sorted[n / 2])
    } else {
        Some((sorted[n / 2 - 1] + sorted[n / 2]) / 2.0)
    }
}

/// Median absolute deviation (unscaled; multiply by [`MAD_CONSISTENCY`]
/// for normal-approximation comparisons).
pub fn mad(values: &[f64]) -> Option<f64> {
    let med = median(values)?;
    let deviations: Vec<f64> = values.iter().map(|v| (v - med).abs()).collect();
    median(&deviations)
}

/// Rank transform with tied values sharing the average rank position.
/// Ranks are 1-based: the smallest value gets rank 1 (or the tie-group
/// average). Returned in input order.
pub fn average_ranks(values: &[f64]) -> Vec<f64> {
    let n = values.len();
    if n == 0 {
        return vec![];
    }

    let mut indexed: Vec<(usize, f64)> = values.iter().copied().enumerate().collect();
    indexed.sort_by(|a, b| a.1.partial_cmp(&b.1).unwrap_or(std::cmp::Ordering::Equal));

    let mut ranks = vec![0.0f64; n];
    let mut i = 0;
    while i < n {
        let mut j = i;
        while j < n - 1 && (indexed[j].1 - indexed[j + 1].1).abs() < 1e-12 {
            j += 1;
        }
        // Average rank for the tie group [i, j]
        let avg_rank = (i + 1 + j + 1) as f64 / 2.0;
        for k in i..=j {
            ranks[indexed[k].0] = avg_rank;
        }
        i = j + 1;
    }
    ranks
}

/// Spearman rank correlation between two equal-length samples.
///
/// Returns `(rho, p_value)`. The p-value is the two-sided tail of the
/// t-statistic `rho * sqrt((n-2) / (1 - rho^2))` evaluated against a
/// normal approximation; it is advisory only and unreliable for small
/// samples. Returns `None` when n < 3 or either sample is constant.
pub fn spearman(xs: &[f64], ys: &[f64]) -> Option<(f64, f64)> {
    let n = xs.len();
    if n != ys.len() || n < 3 {
        return None;
    }
    let rx = average_ranks(xs);
    let ry = average_ranks(ys);
    let rho = pearson(&rx, &ry)?;

    let p = if (rho.abs() - 1.0).abs() < 1e-12 {
        0.0
    } else {
        let t = rho * ((n as f64 - 2.0) / (1.0 - rho * rho)).sqrt();
        2.0 * (1.0 - standard_normal_cdf(t.abs()))
    };
    Some((rho, p.clamp(0.0, 1.0)))
}

/// Pearson correlation; `None` when either sample has zero variance.
fn pearson(xs: &[f64], ys: &[f64]) -> Option<f64> {
    let n = xs.len() as f64;
    let mx = xs.iter().sum::<f64>() / n;
    let my = ys.iter().sum::<f64>() / n;

    let mut cov = 0.0;
    let mut vx = 0.0;
    let mut vy = 0.0;
    for (x, y) in xs.iter().zip(ys.iter()) {
        let dx = x - mx;
        let dy = y - my;
        cov += dx * dy;
        vx += dx * dx;
        vy += dy * dy;
    }
    if vx <= 0.0 || vy <= 0.0 {
        return None;
    }
    Some(cov / (vx.sqrt() * vy.sqrt()))
}

/// Standard normal CDF: Phi(x) = 0.5 * (1 + erf(x / sqrt(2))).
pub fn standard_normal_cdf(x: f64) -> f64 {
    0.5 * (1.0 + erf(x / std::f64::consts::SQRT_2))
}

/// Abramowitz & Stegun 7.1.26 rational approximation of erf
/// (max absolute error ~1.5e-7).
fn erf(x: f64) -> f64 {
    let sign = if x < 0.0 { -1.0 } else { 1.0 };
    let x = x.abs();

    let a1 = 0.254829592;
    let a2 = -0.284496736;
    let a3 = 1.421413741;
    let a4 = -1.453152027;
    let a5 = 1.061405429;
    let p = 0.3275911;

    let t = 1.0 / (1.0 + p * x);
    let y = 1.0 - (((((a5 * t + a4) * t) + a3) * t + a2) * t + a1) * t * (-x * x).exp();
    sign * y
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_median_odd_even() {
        assert_eq!(median(&[3.0, 1.0, 2.0]), Some(2.0));
        assert_eq!(median(&[4.0, 1.0, 2.0, 3.0]), Some(2.5));
        assert_eq!(median(&[]), None);
    }

    #[test]
    fn test_mad_symmetric_sample() {
        // median 3, |dev| = [2,1,0,1,2], MAD = 1
        assert_eq!(mad(&[1.0, 2.0, 3.0, 4.0, 5.0]), Some(1.0));
    }

    #[test]
    fn test_average_ranks_ties() {
        // 10 and 10 tie for ranks 2 and 3 → both get 2.5
        let ranks = average_ranks(&[5.0, 10.0, 10.0, 20.0]);
        assert_eq!(ranks, vec![1.0, 2.5, 2.5, 4.0]);
    }

    #[test]
    fn test_spearman_perfect_monotone() {
        let xs = [1.0, 2.0, 3.0, 4.0, 5.0];
        let ys = [2.0, 4.0, 8.0, 16.0, 32.0];
        let (rho, p) = spearman(&xs, &ys).unwrap();
        assert!((rho - 1.0).abs() < 1e-12);
        assert_eq!(p, 0.0);
    }

    #[test]
    fn test_spearman_perfect_inverse() {
        let xs = [1.0, 2.0, 3.0, 4.0];
        let ys = [9.0, 7.0, 5.0, 1.0];
        let (rho, _) = spearman(&xs, &ys).unwrap();
        assert!((rho + 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_spearman_constant_sample_is_none() {
        let xs = [1.0, 2.0, 3.0];
        let ys = [5.0, 5.0, 5.0];
        assert!(spearman(&xs, &ys).is_none());
    }

    #[test]
    fn test_spearman_too_small_is_none() {
        assert!(spearman(&[1.0, 2.0], &[2.0, 1.0]).is_none());
    }

    #[test]
    fn test_normal_cdf_symmetry() {
        assert!((standard_normal_cdf(0.0) - 0.5).abs() < 1e-7);
        let lo = standard_normal_cdf(-1.0);
        let hi = standard_normal_cdf(1.0);
        assert!((lo + hi - 1.0).abs() < 1e-6);
        // Phi(1.96) ≈ 0.975
        assert!((standard_normal_cdf(1.96) - 0.975).abs() < 1e-3);
    }
}
