//! Exponential moving average.

use zoombot_core::traits::Indicator;

/// Exponential Moving Average (EMA).
///
/// Gives more weight to recent prices using an exponential decay with
/// smoothing factor `2 / (period + 1)`. The series is seeded with its first
/// input, so [`Ema::calculate`] and repeated [`Ema::step`] calls produce the
/// same values bit for bit.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Ema {
    period: usize,
    multiplier: f64,
}

impl Ema {
    /// Create a new EMA with the specified period.
    pub fn new(period: usize) -> Self {
        assert!(period > 0, "Period must be greater than 0");
        let multiplier = 2.0 / (period as f64 + 1.0);
        Self { period, multiplier }
    }

    /// Smoothing factor.
    #[inline]
    pub fn multiplier(&self) -> f64 {
        self.multiplier
    }

    /// Advance the average by one value.
    ///
    /// Equivalent to `value * k + prev * (1 - k)`. Written as a correction
    /// of `prev` so that a constant input leaves the average unchanged.
    #[inline]
    pub fn step(&self, prev: f64, value: f64) -> f64 {
        prev + self.multiplier * (value - prev)
    }
}

impl Indicator for Ema {
    type Output = f64;

    fn calculate(&self, data: &[f64]) -> Vec<f64> {
        let mut result = Vec::with_capacity(data.len());
        let mut values = data.iter().copied();

        let Some(first) = values.next() else {
            return result;
        };
        result.push(first);

        let mut ema = first;
        for price in values {
            ema = self.step(ema, price);
            result.push(ema);
        }

        result
    }

    fn period(&self) -> usize {
        self.period
    }

    fn name(&self) -> &str {
        "EMA"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_multiplier() {
        assert!((Ema::new(9).multiplier() - 0.2).abs() < 1e-12);
        assert!((Ema::new(1).multiplier() - 1.0).abs() < 1e-12);
    }

    #[test]
    #[should_panic(expected = "Period must be greater than 0")]
    fn test_zero_period_rejected() {
        Ema::new(0);
    }

    #[test]
    fn test_calculate_seeds_with_first_value() {
        let ema = Ema::new(3);
        let result = ema.calculate(&[2.0, 4.0, 4.0]);

        // k = 0.5
        assert_eq!(result, vec![2.0, 3.0, 3.5]);
        assert!(ema.calculate(&[]).is_empty());
    }

    #[test]
    fn test_step_matches_calculate() {
        let ema = Ema::new(12);
        let data: Vec<f64> = (0..200).map(|i| 100.0 + (i as f64 * 0.3).sin() * 5.0).collect();
        let batch = ema.calculate(&data);

        let mut current = data[0];
        for (i, &price) in data.iter().enumerate().skip(1) {
            current = ema.step(current, price);
            assert_eq!(current, batch[i]);
        }
    }

    #[test]
    fn test_constant_input_is_fixed_point() {
        let ema = Ema::new(26);
        let result = ema.calculate(&[10.0; 50]);
        assert!(result.iter().all(|&v| v == 10.0));
    }
}
