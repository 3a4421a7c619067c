use crate::application::actuator_dispatcher::DispatchSettings;
use crate::domain::flow::FlowRateBounds;
use crate::domain::pid::PidGains;
use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;

#[derive(Debug, Deserialize, Clone, Default)]
#[serde(default)]
pub struct FlowControlConfig {
    pub flow: FlowSettings,
    pub control: ControlSettings,
    pub valve: ValveSettings,
    pub serial: SerialSettings,
    pub dispatch: DispatchConfig,
    pub storage: StorageSettings,
    pub server: ServerSettings,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct FlowSettings {
    pub min_rate: f64,
    pub max_rate: f64,
    pub initial_setpoint: f64,
}

impl Default for FlowSettings {
    fn default() -> Self {
        Self {
            min_rate: 0.0,
            max_rate: 100.0,
            initial_setpoint: 0.0,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ControlSettings {
    pub tick_interval_ms: u64,
    pub kp: f64,
    pub ki: f64,
    pub kd: f64,
    pub bias: f64,
    /// Unbounded integral when absent
    pub integral_limit: Option<f64>,
}

impl Default for ControlSettings {
    fn default() -> Self {
        Self {
            tick_interval_ms: 1000,
            kp: 2.0,
            ki: 1.0,
            kd: 2.0,
            bias: 0.0,
            integral_limit: None,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ValveSettings {
    /// Highest valve position; the valid range is `[0, positions]`
    pub positions: u32,
    /// Valve positions per unit of outflow (g/s)
    pub calibration_factor: f64,
}

impl Default for ValveSettings {
    fn default() -> Self {
        Self {
            positions: 400,
            calibration_factor: 9.0,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct SerialSettings {
    /// Log commands instead of writing them when disabled
    pub enabled: bool,
    pub port: String,
    pub baud_rate: u32,
    pub timeout_ms: u64,
}

impl Default for SerialSettings {
    fn default() -> Self {
        Self {
            enabled: false,
            port: "/dev/ttyUSB0".to_string(),
            baud_rate: 9600,
            timeout_ms: 100,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct DispatchConfig {
    pub queue_capacity: usize,
    pub max_in_flight: usize,
    pub write_timeout_ms: u64,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            queue_capacity: 16,
            max_in_flight: 4,
            write_timeout_ms: 2000,
        }
    }
}

#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    Npy,
    Memory,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct StorageSettings {
    pub data_dir: PathBuf,
    pub backend: StorageBackend,
}

impl Default for StorageSettings {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("weight_data_files"),
            backend: StorageBackend::Npy,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ServerSettings {
    pub bind: String,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            bind: "0.0.0.0:8080".to_string(),
        }
    }
}

impl FlowControlConfig {
    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.control.tick_interval_ms)
    }

    pub fn flow_bounds(&self) -> FlowRateBounds {
        FlowRateBounds::new(self.flow.min_rate, self.flow.max_rate)
    }

    pub fn pid_gains(&self) -> PidGains {
        PidGains::new(self.control.kp, self.control.ki, self.control.kd).with_bias(self.control.bias)
    }

    pub fn dispatch_settings(&self) -> DispatchSettings {
        DispatchSettings {
            queue_capacity: self.dispatch.queue_capacity,
            max_in_flight: self.dispatch.max_in_flight,
            write_timeout: Duration::from_millis(self.dispatch.write_timeout_ms),
        }
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        if !(self.flow.min_rate.is_finite() && self.flow.max_rate.is_finite()) {
            anyhow::bail!(
                "flow.min_rate and flow.max_rate must be finite, got {} and {}",
                self.flow.min_rate,
                self.flow.max_rate
            );
        }
        if self.flow.min_rate > self.flow.max_rate {
            anyhow::bail!(
                "flow.min_rate ({}) is above flow.max_rate ({})",
                self.flow.min_rate,
                self.flow.max_rate
            );
        }
        if !(self.flow.min_rate..=self.flow.max_rate).contains(&self.flow.initial_setpoint) {
            anyhow::bail!(
                "flow.initial_setpoint ({}) is outside [{}, {}]",
                self.flow.initial_setpoint,
                self.flow.min_rate,
                self.flow.max_rate
            );
        }
        let control = &self.control;
        if ![control.kp, control.ki, control.kd, control.bias].iter().all(|g| g.is_finite()) {
            anyhow::bail!(
                "control.kp, ki, kd and bias must be finite, got {}, {}, {}, {}",
                control.kp,
                control.ki,
                control.kd,
                control.bias
            );
        }
        if let Some(limit) = control.integral_limit {
            if !(limit.is_finite() && limit >= 0.0) {
                anyhow::bail!("control.integral_limit must be finite and non-negative, got {}", limit);
            }
        }
        if self.control.tick_interval_ms == 0 {
            anyhow::bail!("control.tick_interval_ms must be positive");
        }
        if !(self.valve.calibration_factor.is_finite() && self.valve.calibration_factor > 0.0) {
            anyhow::bail!(
                "valve.calibration_factor must be positive, got {}",
                self.valve.calibration_factor
            );
        }
        if self.valve.positions == 0 {
            anyhow::bail!("valve.positions must be positive");
        }
        if self.dispatch.queue_capacity == 0 || self.dispatch.max_in_flight == 0 {
            anyhow::bail!("dispatch.queue_capacity and dispatch.max_in_flight must be positive");
        }
        Ok(())
    }
}

/// Load `config/flow_control.*` (optional) overlaid with `FLOW__SECTION__KEY` variables
pub fn load_flow_control_config() -> anyhow::Result<FlowControlConfig> {
    let settings = config::Config::builder()
        .add_source(config::File::with_name("config/flow_control").required(false))
        .add_source(
            config::Environment::with_prefix("FLOW")
                .separator("__")
                .try_parsing(true),
        )
        .build()?;

    let config: FlowControlConfig = settings.try_deserialize()?;
    config.validate()?;
    Ok(config)
}
