// Dry-run valve driver - logs the command that would go on the wire
use crate::application::valve_actuator::{ActuatorError, ValveActuator};
use crate::domain::flow::ValvePosition;
use crate::domain::valve::ValveCommand;
use async_trait::async_trait;

#[derive(Debug, Default, Clone)]
pub struct DryRunValveActuator;

#[async_trait]
impl ValveActuator for DryRunValveActuator {
    async fn set_position(&self, position: ValvePosition) -> Result<(), ActuatorError> {
        let command = ValveCommand::move_to(position);
        tracing::info!(command = ?command.to_string(), "Valve command (serial disabled)");
        Ok(())
    }
}
