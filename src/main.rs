// Main entry point - Dependency injection, control loop and server setup
use std::{net::SocketAddr, sync::Arc};

use anyhow::Context;
use axum::{
    routing::{get, post},
    Router,
};
use tokio::sync::watch;
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;

use flow_rate_control::application::actuator_dispatcher::{log_dispatch_reports, ActuatorDispatcher};
use flow_rate_control::application::control_loop::{run_control_loop, ControlSnapshot};
use flow_rate_control::application::flow_controller::FlowController;
use flow_rate_control::application::measurement_source::SimulatedOutflow;
use flow_rate_control::application::measurement_store::MeasurementStore;
use flow_rate_control::application::valve_actuator::ValveActuator;
use flow_rate_control::infrastructure::config::{load_flow_control_config, StorageBackend};
use flow_rate_control::infrastructure::dry_run_valve::DryRunValveActuator;
use flow_rate_control::infrastructure::memory_store::InMemoryStore;
use flow_rate_control::infrastructure::npy_store::NpySessionStore;
use flow_rate_control::infrastructure::serial_valve::SerialValveActuator;
use flow_rate_control::presentation::app_state::AppState;
use flow_rate_control::presentation::handlers::{get_series, get_status, health_check, set_setpoint};

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    // Load configuration
    let config = load_flow_control_config().context("Failed to load configuration")?;

    // Session storage (one record per run)
    let store: Arc<dyn MeasurementStore> = match config.storage.backend {
        StorageBackend::Npy => {
            Arc::new(NpySessionStore::create(&config.storage.data_dir, chrono::Local::now()).await?)
        }
        StorageBackend::Memory => Arc::new(InMemoryStore::new()),
    };

    // Valve actuator and its dispatch worker
    let actuator: Arc<dyn ValveActuator> = if config.serial.enabled {
        Arc::new(SerialValveActuator::open(
            &config.serial.port,
            config.serial.baud_rate,
            std::time::Duration::from_millis(config.serial.timeout_ms),
        )?)
    } else {
        tracing::info!("Serial output disabled, valve commands are only logged");
        Arc::new(DryRunValveActuator)
    };
    let (dispatcher, reports) = ActuatorDispatcher::spawn(actuator, config.dispatch_settings());
    tokio::spawn(log_dispatch_reports(reports));

    // Controller with simulated scale feedback
    let source = Box::new(SimulatedOutflow::new(config.valve.calibration_factor));
    let controller = FlowController::new(&config, store, source, dispatcher);

    let (setpoint_tx, setpoint_rx) = watch::channel(config.flow.initial_setpoint);
    let (snapshot_tx, snapshot_rx) = watch::channel(ControlSnapshot {
        setpoint: config.flow.initial_setpoint,
        ..ControlSnapshot::default()
    });

    let control = tokio::spawn(run_control_loop(
        controller,
        config.tick_interval(),
        setpoint_rx,
        snapshot_tx,
        shutdown_signal(),
    ));

    // Build router (presentation layer)
    let state = Arc::new(AppState {
        bounds: config.flow_bounds(),
        setpoint_tx,
        snapshots: snapshot_rx,
    });
    let router = Router::new()
        .route("/healthz", get(health_check))
        .route("/status", get(get_status))
        .route("/series", get(get_series))
        .route("/setpoint", post(set_setpoint))
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    // Start server
    let addr: SocketAddr = config
        .server
        .bind
        .parse()
        .with_context(|| format!("Invalid server.bind address {}", config.server.bind))?;
    tracing::info!("Starting flow-rate-control service on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    let server = async move {
        axum::serve(listener, router)
            .with_graceful_shutdown(shutdown_signal())
            .await
    };

    // Whichever finishes first ends the process; a storage fault surfaces here
    tokio::select! {
        result = control => result??,
        result = server => result?,
    }

    Ok(())
}
