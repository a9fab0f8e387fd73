//! # Generation Mathematics
//!
//! Small integer helpers shared by the budget calculations.

use rand::Rng;

/// Uniform integer in `[low, high)`; returns `low` when the range is empty.
///
/// # Examples
///
/// ```
/// use cairn::utils::between;
/// use rand::{rngs::StdRng, SeedableRng};
///
/// let mut rng = StdRng::seed_from_u64(7);
/// let n = between(&mut rng, 3, 6);
/// assert!((3..6).contains(&n));
/// assert_eq!(between(&mut rng, 4, 4), 4);
/// ```
pub fn between<R: Rng + ?Sized>(rng: &mut R, low: usize, high: usize) -> usize {
    if high <= low {
        low
    } else {
        rng.gen_range(low..high)
    }
}

/// `count × numerator / denominator`, rounded half up.
pub fn round_share(count: usize, numerator: usize, denominator: usize) -> usize {
    if denominator == 0 {
        return 0;
    }
    (count * numerator * 2 + denominator) / (denominator * 2)
}

/// Share of `total` taken by `count`, as a fraction in `[0, 1]`.
pub fn fraction(count: usize, total: usize) -> f64 {
    if total == 0 {
        0.0
    } else {
        count as f64 / total as f64
    }
}

/// Scales `a` and `b` down so they sum to at most `cap`, keeping their ratio.
pub fn scale_pair(a: usize, b: usize, cap: usize) -> (usize, usize) {
    let sum = a + b;
    if sum <= cap || sum == 0 {
        return (a, b);
    }
    let scaled_a = round_share(a, cap, sum);
    (scaled_a, cap - scaled_a)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_share() {
        assert_eq!(round_share(200, 30, 100), 60);
        assert_eq!(round_share(5, 50, 100), 3);
        assert_eq!(round_share(3, 10, 100), 0);
        assert_eq!(round_share(300, 30, 150), 60);
        assert_eq!(round_share(10, 1, 0), 0);
    }

    #[test]
    fn test_scale_pair() {
        assert_eq!(scale_pair(40, 30, 100), (40, 30));
        assert_eq!(scale_pair(80, 40, 100), (67, 33));
        assert_eq!(scale_pair(100, 100, 100), (50, 50));
    }

    #[test]
    fn test_fraction() {
        assert_eq!(fraction(0, 0), 0.0);
        assert_eq!(fraction(25, 100), 0.25);
    }
}
