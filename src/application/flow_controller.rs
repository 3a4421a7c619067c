// Flow controller - one closed-loop iteration per control tick
use crate::application::actuator_dispatcher::ActuatorDispatcher;
use crate::application::measurement_source::MeasurementSource;
use crate::application::measurement_store::MeasurementStore;
use crate::domain::flow::{flow_rate, flow_rate_history, ValvePosition};
use crate::domain::pid::PidController;
use crate::infrastructure::config::FlowControlConfig;
use anyhow::Context;
use std::sync::Arc;
use std::time::Instant;

/// What one tick measured and commanded
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TickReport {
    pub measured_flow_rate: f64,
    pub valve_position: ValvePosition,
}

/// Recorded series for display
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SeriesSnapshot {
    pub cumulative: Vec<f64>,
    pub flow_rates: Vec<f64>,
}

pub struct FlowController {
    pid: PidController,
    setpoint: f64,
    valve_positions: u32,
    store: Arc<dyn MeasurementStore>,
    source: Box<dyn MeasurementSource>,
    dispatcher: ActuatorDispatcher,
    started: Instant,
}

impl FlowController {
    pub fn new(
        config: &FlowControlConfig,
        store: Arc<dyn MeasurementStore>,
        source: Box<dyn MeasurementSource>,
        dispatcher: ActuatorDispatcher,
    ) -> Self {
        let pid = PidController::new(config.pid_gains())
            .with_integral_limit(config.control.integral_limit)
            .with_default_dt(config.tick_interval().as_secs_f64());

        Self {
            pid,
            setpoint: config.flow.initial_setpoint,
            valve_positions: config.valve.positions,
            store,
            source,
            dispatcher,
            started: Instant::now(),
        }
    }

    pub fn setpoint(&self) -> f64 {
        self.setpoint
    }

    /// Target flow rate for the next and all later ticks
    pub fn set_setpoint(&mut self, setpoint: f64) {
        self.setpoint = setpoint;
    }

    /// Run one tick stamped with the time elapsed since construction
    pub async fn step(&mut self) -> anyhow::Result<TickReport> {
        let t = self.started.elapsed().as_secs_f64();
        self.step_at(t).await
    }

    /// Run one tick stamped `t` seconds
    pub async fn step_at(&mut self, t: f64) -> anyhow::Result<TickReport> {
        let series = self
            .store
            .read()
            .await
            .context("Failed to read weight series")?;
        let measured_flow_rate = flow_rate(&series);

        let output = self.pid.update(t, measured_flow_rate, self.setpoint);
        let valve_position = ValvePosition::from_output(output, self.valve_positions);

        // Fire and forget: outcomes arrive on the dispatcher's report channel
        if let Err(e) = self.dispatcher.dispatch(valve_position) {
            tracing::warn!("Valve command not dispatched: {}", e);
        }

        let sample = self
            .source
            .next_sample(valve_position)
            .await
            .context("Failed to take outflow measurement")?;
        self.store
            .append(sample)
            .await
            .context("Failed to record weight sample")?;

        tracing::debug!(
            t,
            setpoint = self.setpoint,
            measured_flow_rate,
            output,
            valve_position = valve_position.get(),
            "Control tick"
        );

        Ok(TickReport {
            measured_flow_rate,
            valve_position,
        })
    }

    /// Cumulative weight series and the flow rates derived from it
    pub async fn history(&self) -> anyhow::Result<SeriesSnapshot> {
        let cumulative = self.store.read().await?;
        let flow_rates = flow_rate_history(&cumulative);
        Ok(SeriesSnapshot {
            cumulative,
            flow_rates,
        })
    }
}
