use crate::state::series::Sample;

/// Largest-Triangle-Three-Buckets reduction of a chart trace to `target` points.
/// First and last samples are always kept; inputs already small enough are copied.
pub fn lttb(samples: &[Sample], target: usize) -> Vec<Sample> {
    let n = samples.len();
    if n <= target || target < 3 {
        return samples.to_vec();
    }

    let origin = samples[0].timestamp;
    let x = |i: usize| (samples[i].timestamp - origin).num_milliseconds() as f64;
    let y = |i: usize| samples[i].value;

    let mut out = Vec::with_capacity(target);
    out.push(samples[0]);

    let bucket_size = (n - 2) as f64 / (target - 2) as f64;
    let mut prev = 0usize;

    for bucket in 0..(target - 2) {
        let start = (bucket as f64 * bucket_size) as usize + 1;
        let end = (((bucket + 1) as f64 * bucket_size) as usize + 1).min(n - 1);

        // Average of the following bucket is the third triangle vertex.
        let next_start = end;
        let next_end = (((bucket + 2) as f64 * bucket_size) as usize + 1).min(n);
        let next_count = (next_end - next_start).max(1) as f64;
        let (sum_x, sum_y) = (next_start..next_end)
            .fold((0.0, 0.0), |(sx, sy), j| (sx + x(j), sy + y(j)));
        let (avg_x, avg_y) = (sum_x / next_count, sum_y / next_count);

        let (px, py) = (x(prev), y(prev));
        let best = (start..end.max(start + 1))
            .max_by(|&a, &b| {
                let area = |j: usize| ((px - avg_x) * (y(j) - py) - (px - x(j)) * (avg_y - py)).abs();
                area(a).total_cmp(&area(b))
            })
            .unwrap_or(start);

        out.push(samples[best]);
        prev = best;
    }

    out.push(samples[n - 1]);
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, NaiveDate};

    fn ramp(n: usize) -> Vec<Sample> {
        let t0 = NaiveDate::from_ymd_opt(2024, 5, 1).unwrap().and_hms_opt(0, 0, 0).unwrap();
        (0..n)
            .map(|i| Sample::new(t0 + Duration::seconds(i as i64), (i % 7) as f64))
            .collect()
    }

    #[test]
    fn keeps_small_inputs() {
        let data = ramp(10);
        assert_eq!(lttb(&data, 50), data);
    }

    #[test]
    fn reduces_to_target_and_keeps_ends() {
        let data = ramp(1000);
        let out = lttb(&data, 100);
        assert_eq!(out.len(), 100);
        assert_eq!(out[0], data[0]);
        assert_eq!(out[99], data[999]);
        assert!(out.windows(2).all(|w| w[0].timestamp < w[1].timestamp));
    }

    #[test]
    fn keeps_an_isolated_spike() {
        let mut data = ramp(500);
        data[250].value = 1000.0;
        let out = lttb(&data, 50);
        assert!(out.iter().any(|s| s.value == 1000.0));
    }
}
