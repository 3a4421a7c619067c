// Pinch valve command - ASCII wire format understood by the valve driver
use super::flow::ValvePosition;
use std::fmt;

const DRIVER_ADDRESS: u8 = 1;
const DRIVER_AXIS: char = 'A';

/// Absolute move command, `/1A<position>R\r\n` on the wire
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ValveCommand {
    pub address: u8,
    pub axis: char,
    pub position: ValvePosition,
}

impl ValveCommand {
    pub fn move_to(position: ValvePosition) -> Self {
        Self {
            address: DRIVER_ADDRESS,
            axis: DRIVER_AXIS,
            position,
        }
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        self.to_string().into_bytes()
    }
}

impl fmt::Display for ValveCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "/{}{}{}R\r\n", self.address, self.axis, self.position)
    }
}
