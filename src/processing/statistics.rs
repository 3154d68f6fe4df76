use serde::Serialize;

/// Arithmetic mean, `None` for an empty slice.
pub fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    Some(values.iter().sum::<f64>() / values.len() as f64)
}

/// Sample standard deviation (divides by n - 1). Zero for fewer than two values.
pub fn sample_std_dev(values: &[f64]) -> f64 {
    let n = values.len();
    let Some(mean) = mean(values) else {
        return 0.0;
    };
    if n < 2 {
        return 0.0;
    }
    let sum_sq = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>();
    (sum_sq / (n - 1) as f64).sqrt()
}

/// Descriptive summary of a parameter column.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SeriesStats {
    pub count: usize,
    pub min: f64,
    pub max: f64,
    pub mean: f64,
    pub median: f64,
    pub std_dev: f64,
}

impl SeriesStats {
    /// Summarize finite values; `None` when there are none.
    pub fn compute(values: &[f64]) -> Option<Self> {
        let mut vals: Vec<f64> = values.iter().copied().filter(|v| v.is_finite()).collect();
        let mean = mean(&vals)?;
        let std_dev = sample_std_dev(&vals);

        vals.sort_by(f64::total_cmp);
        let count = vals.len();
        let median = if count % 2 == 0 {
            (vals[count / 2 - 1] + vals[count / 2]) / 2.0
        } else {
            vals[count / 2]
        };

        Some(SeriesStats {
            count,
            min: vals[0],
            max: vals[count - 1],
            mean,
            median,
            std_dev,
        })
    }

    /// One-line summary used by the parameter listing.
    pub fn report(&self) -> String {
        format!(
            "n={} min={:.2} max={:.2} mean={:.2} median={:.2} sd={:.2}",
            self.count, self.min, self.max, self.mean, self.median, self.std_dev
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bessel_corrected() {
        let sd = sample_std_dev(&[5.0, 0.0, 5.0, 5.0]);
        assert!((sd - 2.5).abs() < 1e-12);
    }

    #[test]
    fn degenerate_inputs() {
        assert_eq!(mean(&[]), None);
        assert_eq!(sample_std_dev(&[]), 0.0);
        assert_eq!(sample_std_dev(&[42.0]), 0.0);
    }

    #[test]
    fn summary_skips_non_finite() {
        let stats = SeriesStats::compute(&[3.0, f64::NAN, 1.0, 2.0, 10.0]).unwrap();
        assert_eq!(stats.count, 4);
        assert_eq!(stats.min, 1.0);
        assert_eq!(stats.max, 10.0);
        assert_eq!(stats.median, 2.5);
        assert_eq!(stats.mean, 4.0);
        assert!(SeriesStats::compute(&[f64::NAN]).is_none());
    }
}
