// Actuator gateway trait - sends position commands to the pinch valve
use crate::domain::flow::ValvePosition;
use async_trait::async_trait;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ActuatorError {
    #[error("Failed to open valve port {port}: {message}")]
    Open { port: String, message: String },

    #[error("Serial write failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("Valve write timed out after {0:?}")]
    Timeout(Duration),

    #[error("Valve write task failed: {0}")]
    Task(String),
}

#[async_trait]
pub trait ValveActuator: Send + Sync {
    /// Transmit an already clamped position; no acknowledgement is read
    async fn set_position(&self, position: ValvePosition) -> Result<(), ActuatorError>;
}
