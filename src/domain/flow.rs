// Flow domain model - setpoints, valve positions and rate estimation
use std::fmt;
use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum SetpointError {
    #[error("Invalid input for flow rate {0:?}. Please enter a valid number.")]
    NotANumber(String),
}

/// Inclusive range of flow rates the operator may request
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FlowRateBounds {
    pub min: f64,
    pub max: f64,
}

impl FlowRateBounds {
    pub fn new(min: f64, max: f64) -> Self {
        Self { min, max }
    }

    pub fn clamp(&self, value: f64) -> f64 {
        value.clamp(self.min, self.max)
    }

    /// Parse operator input, clamping numeric values into the allowed range
    pub fn parse_setpoint(&self, input: &str) -> Result<f64, SetpointError> {
        let trimmed = input.trim();
        match trimmed.parse::<f64>() {
            Ok(value) if value.is_finite() => Ok(self.clamp(value)),
            _ => Err(SetpointError::NotANumber(trimmed.to_string())),
        }
    }
}

/// Commanded pinch valve position, always within `[0, max]`
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct ValvePosition(u32);

impl ValvePosition {
    pub const CLOSED: ValvePosition = ValvePosition(0);

    /// Truncate a raw compensator output toward zero and clamp it to `[0, max]`
    pub fn from_output(raw: f64, max: u32) -> Self {
        // `as` saturates at the integer bounds and maps NaN to 0
        let truncated = raw as i64;
        Self(truncated.clamp(0, max as i64) as u32)
    }

    pub fn new(position: u32, max: u32) -> Self {
        Self(position.min(max))
    }

    pub fn get(self) -> u32 {
        self.0
    }
}

impl fmt::Display for ValvePosition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Current flow rate as the first difference of the last two cumulative samples
pub fn flow_rate(series: &[f64]) -> f64 {
    match series {
        [.., previous, last] => last - previous,
        _ => 0.0,
    }
}

/// Flow rate between every pair of consecutive cumulative samples
pub fn flow_rate_history(series: &[f64]) -> Vec<f64> {
    series.windows(2).map(|w| w[1] - w[0]).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flow_rate_needs_two_samples() {
        assert_eq!(flow_rate(&[]), 0.0);
        assert_eq!(flow_rate(&[7.0]), 0.0);
        assert_eq!(flow_rate(&[0.0, 9.0]), 9.0);
        assert_eq!(flow_rate(&[1.0, 4.0, 10.0]), 6.0);
    }

    #[test]
    fn test_flow_rate_history() {
        assert!(flow_rate_history(&[3.0]).is_empty());
        assert_eq!(flow_rate_history(&[0.0, 2.0, 5.0, 5.0]), vec![2.0, 3.0, 0.0]);
    }

    #[test]
    fn test_valve_position_truncates_and_clamps() {
        assert_eq!(ValvePosition::from_output(12.9, 400).get(), 12);
        assert_eq!(ValvePosition::from_output(-0.9, 400).get(), 0);
        assert_eq!(ValvePosition::from_output(-1.0e12, 400).get(), 0);
        assert_eq!(ValvePosition::from_output(1.0e12, 400).get(), 400);
        assert_eq!(ValvePosition::from_output(f64::INFINITY, 400).get(), 400);
        assert_eq!(ValvePosition::from_output(f64::NEG_INFINITY, 400).get(), 0);
        assert_eq!(ValvePosition::from_output(f64::NAN, 400).get(), 0);
        assert_eq!(ValvePosition::from_output(400.0, 400).get(), 400);
    }

    #[test]
    fn test_parse_setpoint() {
        let bounds = FlowRateBounds::new(0.0, 100.0);
        assert_eq!(bounds.parse_setpoint("42"), Ok(42.0));
        assert_eq!(bounds.parse_setpoint(" 12.5\n"), Ok(12.5));
        assert_eq!(bounds.parse_setpoint("250"), Ok(100.0));
        assert_eq!(bounds.parse_setpoint("-3"), Ok(0.0));
        assert_eq!(
            bounds.parse_setpoint("fast"),
            Err(SetpointError::NotANumber("fast".to_string()))
        );
        assert!(bounds.parse_setpoint("NaN").is_err());
        assert!(bounds.parse_setpoint("").is_err());
    }
}
