// In-memory session store, same semantics as the NPY store without a file
use crate::application::measurement_store::{empty_session_series, next_cumulative, MeasurementStore};
use async_trait::async_trait;
use tokio::sync::Mutex;

#[derive(Debug, Default)]
pub struct InMemoryStore {
    series: Mutex<Vec<f64>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start from an already recorded cumulative series
    pub fn with_series(series: Vec<f64>) -> Self {
        Self {
            series: Mutex::new(series),
        }
    }
}

#[async_trait]
impl MeasurementStore for InMemoryStore {
    async fn append(&self, sample: f64) -> anyhow::Result<()> {
        let mut series = self.series.lock().await;
        let next = next_cumulative(&series, sample);
        series.push(next);
        Ok(())
    }

    async fn read(&self) -> anyhow::Result<Vec<f64>> {
        let series = self.series.lock().await;
        if series.is_empty() {
            Ok(empty_session_series())
        } else {
            Ok(series.clone())
        }
    }
}
