// Serial valve driver - writes ASCII position commands to the pinch valve
use crate::application::valve_actuator::{ActuatorError, ValveActuator};
use crate::domain::flow::ValvePosition;
use crate::domain::valve::ValveCommand;
use async_trait::async_trait;
use serialport::SerialPort;
use std::io::Write;
use std::sync::{Arc, Mutex};
use std::time::Duration;

pub struct SerialValveActuator {
    port_name: String,
    port: Arc<Mutex<Box<dyn SerialPort>>>,
}

impl SerialValveActuator {
    pub fn open(port_name: &str, baud_rate: u32, timeout: Duration) -> Result<Self, ActuatorError> {
        tracing::debug!("Connect to valve port: {} at {} baud", port_name, baud_rate);

        let port = serialport::new(port_name, baud_rate)
            .timeout(timeout)
            .open()
            .map_err(|e| ActuatorError::Open {
                port: port_name.to_string(),
                message: e.to_string(),
            })?;

        Ok(Self {
            port_name: port_name.to_string(),
            port: Arc::new(Mutex::new(port)),
        })
    }
}

#[async_trait]
impl ValveActuator for SerialValveActuator {
    async fn set_position(&self, position: ValvePosition) -> Result<(), ActuatorError> {
        let command = ValveCommand::move_to(position);
        let port = self.port.clone();
        tracing::debug!("Writing {:?} to {}", command.to_string(), self.port_name);

        // The serial write blocks, keep it off the runtime threads
        tokio::task::spawn_blocking(move || -> Result<(), ActuatorError> {
            let mut port = port
                .lock()
                .map_err(|_| ActuatorError::Task("serial port lock poisoned".to_string()))?;
            port.write_all(&command.to_bytes())?;
            port.flush()?;
            Ok(())
        })
        .await
        .map_err(|e| ActuatorError::Task(e.to_string()))?
    }
}
