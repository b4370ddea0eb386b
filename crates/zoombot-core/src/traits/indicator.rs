//! Indicator trait definitions.

/// Trait for batch technical indicators.
///
/// Indicators process price data and produce one derived value per input,
/// so `calculate(data).len() == data.len()`.
pub trait Indicator: Send + Sync {
    /// The output type of the indicator.
    type Output;

    /// Calculate indicator values for the given data.
    ///
    /// # Arguments
    /// * `data` - Input data (typically close prices), oldest first
    fn calculate(&self, data: &[f64]) -> Vec<Self::Output>;

    /// Get the smoothing period.
    fn period(&self) -> usize;

    /// Get the name of the indicator.
    fn name(&self) -> &str;
}
