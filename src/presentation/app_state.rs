// Application state for HTTP handlers
use crate::application::control_loop::ControlSnapshot;
use crate::domain::flow::FlowRateBounds;
use tokio::sync::watch;

pub struct AppState {
    pub bounds: FlowRateBounds,
    pub setpoint_tx: watch::Sender<f64>,
    pub snapshots: watch::Receiver<ControlSnapshot>,
}
