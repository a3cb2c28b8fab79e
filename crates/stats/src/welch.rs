//! Welch's two-sample t-test: difference of means without assuming equal
//! variances, two-tailed p-value from the Student-t CDF with
//! Welch–Satterthwaite degrees of freedom.

use statrs::distribution::{ContinuousCDF, StudentsT};

#[derive(Debug, Clone, Copy)]
pub struct WelchTest {
    /// Positive when sample `a` has the larger mean.
    pub t_statistic: f64,
    pub degrees_of_freedom: f64,
    /// Two-tailed.
    pub p_value: f64,
}

fn mean(xs: &[f64]) -> f64 {
    xs.iter().sum::<f64>() / xs.len() as f64
}

/// Unbiased sample variance (n - 1 denominator).
fn sample_variance(xs: &[f64], mean: f64) -> f64 {
    xs.iter().map(|x| (x - mean).powi(2)).sum::<f64>() / (xs.len() - 1) as f64
}

/// Run Welch's t-test on two raw samples.
///
/// Returns `None` when either sample has fewer than 2 observations. A
/// variance cannot be estimated, so the caller must record the pair as
/// skipped rather than report a bogus p-value.
pub fn welch_t_test(a: &[f64], b: &[f64]) -> Option<WelchTest> {
    if a.len() < 2 || b.len() < 2 {
        return None;
    }

    let (n_a, n_b) = (a.len() as f64, b.len() as f64);
    let (mean_a, mean_b) = (mean(a), mean(b));
    let var_a = sample_variance(a, mean_a);
    let var_b = sample_variance(b, mean_b);

    // Both samples constant: no variance to test against. Identical means
    // are no evidence of difference (p = 1); distinct constants are two
    // different point masses (p = 0).
    if var_a == 0.0 && var_b == 0.0 {
        return Some(if mean_a == mean_b {
            WelchTest {
                t_statistic: 0.0,
                degrees_of_freedom: n_a + n_b - 2.0,
                p_value: 1.0,
            }
        } else {
            WelchTest {
                t_statistic: (mean_a - mean_b).signum() * f64::INFINITY,
                degrees_of_freedom: n_a + n_b - 2.0,
                p_value: 0.0,
            }
        });
    }

    let se_a = var_a / n_a;
    let se_b = var_b / n_b;
    let standard_error = (se_a + se_b).sqrt();
    let t_statistic = (mean_a - mean_b) / standard_error;

    let degrees_of_freedom =
        (se_a + se_b).powi(2) / (se_a.powi(2) / (n_a - 1.0) + se_b.powi(2) / (n_b - 1.0));

    let p_value = StudentsT::new(0.0, 1.0, degrees_of_freedom)
        .map(|dist| (2.0 * (1.0 - dist.cdf(t_statistic.abs()))).clamp(0.0, 1.0))
        .unwrap_or(1.0);

    Some(WelchTest {
        t_statistic,
        degrees_of_freedom,
        p_value,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insufficient_samples() {
        assert!(welch_t_test(&[1.0], &[1.0, 2.0]).is_none());
        assert!(welch_t_test(&[1.0, 2.0], &[]).is_none());
    }

    #[test]
    fn test_identical_constant_samples() {
        let test = welch_t_test(&[5.0, 5.0, 5.0], &[5.0, 5.0]).unwrap();
        assert_eq!(test.t_statistic, 0.0);
        assert_eq!(test.p_value, 1.0);
    }

    #[test]
    fn test_distinct_constant_samples() {
        let test = welch_t_test(&[5.0, 5.0], &[7.0, 7.0]).unwrap();
        assert_eq!(test.p_value, 0.0);
        assert!(test.t_statistic.is_infinite() && test.t_statistic < 0.0);
    }

    #[test]
    fn test_equal_means_give_t_zero() {
        let test = welch_t_test(&[2.0, 3.0, 4.0], &[0.0, 3.0, 6.0]).unwrap();
        assert_eq!(test.t_statistic, 0.0);
        assert_eq!(test.p_value, 1.0);
    }

    #[test]
    fn test_symmetry() {
        let a = [1.0, 2.0, 3.0, 4.0];
        let b = [2.5, 3.5, 4.5, 6.0];
        let ab = welch_t_test(&a, &b).unwrap();
        let ba = welch_t_test(&b, &a).unwrap();
        assert!((ab.t_statistic + ba.t_statistic).abs() < 1e-12);
        assert!((ab.p_value - ba.p_value).abs() < 1e-12);
        assert!((ab.degrees_of_freedom - ba.degrees_of_freedom).abs() < 1e-12);
    }

    #[test]
    fn test_clearly_separated_samples_are_significant() {
        let a = [1.0, 1.1, 0.9, 1.05, 0.95, 1.02];
        let b = [10.0, 10.2, 9.8, 10.1, 9.9, 10.05];
        let test = welch_t_test(&a, &b).unwrap();
        assert!(test.p_value < 0.001);
        assert!(test.t_statistic < 0.0);
    }

    #[test]
    fn test_against_reference_values() {
        // scipy.stats.ttest_ind([1,2,3,4,5], [2,4,6,8,10], equal_var=False)
        // t = -1.8973665961010275, p = 0.10696852604641321, df ~ 5.882
        let a = [1.0, 2.0, 3.0, 4.0, 5.0];
        let b = [2.0, 4.0, 6.0, 8.0, 10.0];
        let test = welch_t_test(&a, &b).unwrap();
        assert!((test.t_statistic - (-1.8973665961010275)).abs() < 1e-9);
        assert!((test.p_value - 0.10696852604641321).abs() < 1e-6);
        assert!((test.degrees_of_freedom - 5.8823529411764705).abs() < 1e-9);
    }
}
