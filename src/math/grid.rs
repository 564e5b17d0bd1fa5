//! Evenly spaced evaluation grids.

/// `n` evenly spaced points over `[start, end]`, both ends included.
///
/// `n < 2` collapses to the single point `start` (or nothing for `n == 0`).
pub fn linspace(start: f64, end: f64, n: usize) -> Vec<f64> {
    match n {
        0 => Vec::new(),
        1 => vec![start],
        _ => {
            let step = (end - start) / (n as f64 - 1.0);
            let mut out: Vec<f64> = (0..n).map(|i| start + step * i as f64).collect();
            // Pin the last point so rounding never leaves the range.
            out[n - 1] = end;
            out
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn linspace_includes_both_ends() {
        let xs = linspace(1.0, 3.0, 5);
        assert_eq!(xs, vec![1.0, 1.5, 2.0, 2.5, 3.0]);
    }

    #[test]
    fn linspace_degenerate_counts() {
        assert!(linspace(0.0, 1.0, 0).is_empty());
        assert_eq!(linspace(2.0, 5.0, 1), vec![2.0]);
        assert_eq!(linspace(0.1, 0.7, 500).len(), 500);
    }
}
