//! Small numeric helpers shared by the analyzers.

pub fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// Population standard deviation (divides by `n`).
pub fn std_dev(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let m = mean(values);
    let variance = values.iter().map(|v| (v - m).powi(2)).sum::<f64>() / values.len() as f64;
    variance.sqrt()
}

/// Ordinary least-squares fit of `y` against `x = 1..=n`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LinearFit {
    pub slope: f64,
    pub intercept: f64,
    pub r_squared: f64,
}

pub fn linear_fit(y: &[f64]) -> LinearFit {
    let n = y.len() as f64;
    if y.len() < 2 {
        return LinearFit {
            slope: 0.0,
            intercept: y.first().copied().unwrap_or(0.0),
            r_squared: 0.0,
        };
    }

    let xs: Vec<f64> = (1..=y.len()).map(|i| i as f64).collect();
    let sum_x: f64 = xs.iter().sum();
    let sum_y: f64 = y.iter().sum();
    let sum_xy: f64 = xs.iter().zip(y).map(|(x, y)| x * y).sum();
    let sum_xx: f64 = xs.iter().map(|x| x * x).sum();

    // Non-zero for n >= 2 since the x values are distinct.
    let slope = (n * sum_xy - sum_x * sum_y) / (n * sum_xx - sum_x * sum_x);
    let intercept = (sum_y - slope * sum_x) / n;

    let y_mean = sum_y / n;
    let ss_res: f64 = xs
        .iter()
        .zip(y)
        .map(|(x, y)| (y - (slope * x + intercept)).powi(2))
        .sum();
    let ss_tot: f64 = y.iter().map(|y| (y - y_mean).powi(2)).sum();
    let r_squared = if ss_tot > 0.0 { 1.0 - ss_res / ss_tot } else { 0.0 };

    LinearFit {
        slope,
        intercept,
        r_squared,
    }
}

pub fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (value * factor).round() / factor
}

/// Index of the first maximum, or `None` for an empty slice.
pub fn argmax(values: &[u32]) -> Option<usize> {
    let max = values.iter().copied().max()?;
    values.iter().position(|&v| v == max)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mean_and_std_dev() {
        let values = [2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0];
        assert_eq!(mean(&values), 5.0);
        assert_eq!(std_dev(&values), 2.0);
        assert_eq!(mean(&[]), 0.0);
        assert_eq!(std_dev(&[]), 0.0);
    }

    #[test]
    fn test_linear_fit_perfect_line() {
        let fit = linear_fit(&[1.0, 2.0, 3.0, 4.0, 5.0, 6.0]);
        assert!((fit.slope - 1.0).abs() < 1e-9);
        assert!(fit.intercept.abs() < 1e-9);
        assert!((fit.r_squared - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_linear_fit_flat_and_degenerate() {
        let flat = linear_fit(&[3.0, 3.0, 3.0]);
        assert_eq!(flat.slope, 0.0);
        assert_eq!(flat.r_squared, 0.0);

        let single = linear_fit(&[4.0]);
        assert_eq!(single.slope, 0.0);
        assert_eq!(single.intercept, 4.0);
        assert!(single.r_squared.is_finite());
    }

    #[test]
    fn test_argmax_prefers_first() {
        assert_eq!(argmax(&[1, 3, 3, 0]), Some(1));
        assert_eq!(argmax(&[]), None);
    }

    #[test]
    fn test_round_to() {
        assert_eq!(round_to(1.26, 1), 1.3);
        assert_eq!(round_to(2.345, 0), 2.0);
    }
}
