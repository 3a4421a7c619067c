// Repository trait for the cumulative weight series of one control session
use async_trait::async_trait;

#[async_trait]
pub trait MeasurementStore: Send + Sync {
    /// Extend the series by `sample` on top of the last cumulative value.
    /// A session with no record yet starts at `sample`.
    async fn append(&self, sample: f64) -> anyhow::Result<()>;

    /// Full cumulative series, or `[0, 0]` when nothing has been recorded yet
    async fn read(&self) -> anyhow::Result<Vec<f64>>;
}

/// Series returned for a session that has not recorded anything yet
pub fn empty_session_series() -> Vec<f64> {
    vec![0.0, 0.0]
}

/// Next cumulative value after adding `sample` to `series`
pub fn next_cumulative(series: &[f64], sample: f64) -> f64 {
    match series.last() {
        Some(last) => last + sample,
        None => sample,
    }
}
