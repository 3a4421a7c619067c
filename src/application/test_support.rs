// Test doubles shared by the application layer tests
use crate::application::measurement_source::MeasurementSource;
use crate::application::valve_actuator::{ActuatorError, ValveActuator};
use crate::domain::flow::ValvePosition;
use async_trait::async_trait;
use tokio::sync::Mutex;

#[derive(Default)]
pub struct RecordingActuator {
    positions: Mutex<Vec<ValvePosition>>,
}

impl RecordingActuator {
    pub async fn positions(&self) -> Vec<ValvePosition> {
        self.positions.lock().await.clone()
    }
}

#[async_trait]
impl ValveActuator for RecordingActuator {
    async fn set_position(&self, position: ValvePosition) -> Result<(), ActuatorError> {
        self.positions.lock().await.push(position);
        Ok(())
    }
}

pub struct FailingActuator;

#[async_trait]
impl ValveActuator for FailingActuator {
    async fn set_position(&self, _position: ValvePosition) -> Result<(), ActuatorError> {
        Err(ActuatorError::Io(std::io::Error::new(
            std::io::ErrorKind::BrokenPipe,
            "valve unplugged",
        )))
    }
}

pub struct HangingActuator;

#[async_trait]
impl ValveActuator for HangingActuator {
    async fn set_position(&self, _position: ValvePosition) -> Result<(), ActuatorError> {
        std::future::pending::<Result<(), ActuatorError>>().await
    }
}

/// First-order outflow response to the valve, read back as a scale would
/// report it: `flow[k+1] = 0.9 flow[k] + 0.1 position / calibration`.
pub struct LaggedOutflowScale {
    calibration_factor: f64,
    flow: f64,
}

impl LaggedOutflowScale {
    pub fn new(calibration_factor: f64) -> Self {
        Self {
            calibration_factor,
            flow: 0.0,
        }
    }
}

#[async_trait]
impl MeasurementSource for LaggedOutflowScale {
    async fn next_sample(&mut self, position: ValvePosition) -> anyhow::Result<f64> {
        self.flow = 0.9 * self.flow + 0.1 * position.get() as f64 / self.calibration_factor;
        Ok(self.flow)
    }
}
