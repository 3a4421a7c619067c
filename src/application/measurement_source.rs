// Measurement source - where each tick's outflow reading comes from
use crate::domain::flow::ValvePosition;
use async_trait::async_trait;

#[async_trait]
pub trait MeasurementSource: Send + Sync {
    /// Outflow observed during the tick that commanded `position`
    async fn next_sample(&mut self, position: ValvePosition) -> anyhow::Result<f64>;
}

/// Stand-in for a scale: outflow is the commanded position scaled by the
/// weight calibration factor.
#[derive(Debug, Clone)]
pub struct SimulatedOutflow {
    calibration_factor: f64,
}

impl SimulatedOutflow {
    pub fn new(calibration_factor: f64) -> Self {
        Self { calibration_factor }
    }
}

#[async_trait]
impl MeasurementSource for SimulatedOutflow {
    async fn next_sample(&mut self, position: ValvePosition) -> anyhow::Result<f64> {
        Ok(position.get() as f64 / self.calibration_factor)
    }
}
