// Control loop - drives the flow controller on a fixed tick
use crate::application::flow_controller::{FlowController, SeriesSnapshot, TickReport};
use std::future::Future;
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::MissedTickBehavior;

/// State published after every tick for the control surface
#[derive(Debug, Clone, Default)]
pub struct ControlSnapshot {
    pub setpoint: f64,
    pub ticks: u64,
    pub last_tick: Option<TickReport>,
    pub history: SeriesSnapshot,
}

/// Own `controller` and step it every `tick_interval` until `shutdown` resolves.
///
/// Setpoint changes are applied before the next tick. A storage failure ends
/// the loop with an error.
pub async fn run_control_loop(
    mut controller: FlowController,
    tick_interval: Duration,
    mut setpoints: watch::Receiver<f64>,
    snapshots: watch::Sender<ControlSnapshot>,
    shutdown: impl Future<Output = ()>,
) -> anyhow::Result<()> {
    let mut interval = tokio::time::interval(tick_interval);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
    tokio::pin!(shutdown);

    let mut ticks = 0u64;
    tracing::info!(
        interval_ms = tick_interval.as_millis() as u64,
        setpoint = controller.setpoint(),
        "Control loop started"
    );

    loop {
        tokio::select! {
            _ = interval.tick() => {}
            _ = &mut shutdown => {
                tracing::info!(ticks, "Control loop stopped");
                return Ok(());
            }
        }

        if setpoints.has_changed().unwrap_or(false) {
            let setpoint = *setpoints.borrow_and_update();
            controller.set_setpoint(setpoint);
            tracing::info!(setpoint, "Flow rate setpoint updated");
        }

        let tick = controller.step().await?;
        let history = controller.history().await?;
        ticks += 1;

        snapshots.send_replace(ControlSnapshot {
            setpoint: controller.setpoint(),
            ticks,
            last_tick: Some(tick),
            history,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::actuator_dispatcher::ActuatorDispatcher;
    use crate::application::measurement_source::SimulatedOutflow;
    use crate::application::measurement_store::MeasurementStore;
    use crate::application::test_support::RecordingActuator;
    use crate::infrastructure::config::FlowControlConfig;
    use crate::infrastructure::memory_store::InMemoryStore;
    use async_trait::async_trait;
    use std::sync::Arc;
    use tokio::sync::oneshot;

    struct BrokenStore;

    #[async_trait]
    impl MeasurementStore for BrokenStore {
        async fn append(&self, _sample: f64) -> anyhow::Result<()> {
            anyhow::bail!("disk full")
        }

        async fn read(&self) -> anyhow::Result<Vec<f64>> {
            Ok(vec![0.0, 0.0])
        }
    }

    fn controller(config: &FlowControlConfig, store: Arc<dyn MeasurementStore>) -> FlowController {
        let (dispatcher, _reports) =
            ActuatorDispatcher::spawn(Arc::new(RecordingActuator::default()), config.dispatch_settings());
        let source = Box::new(SimulatedOutflow::new(config.valve.calibration_factor));
        FlowController::new(config, store, source, dispatcher)
    }

    async fn wait_for(
        snapshots: &mut watch::Receiver<ControlSnapshot>,
        done: impl Fn(&ControlSnapshot) -> bool,
    ) -> ControlSnapshot {
        loop {
            {
                let snapshot = snapshots.borrow_and_update();
                if done(&snapshot) {
                    return (*snapshot).clone();
                }
            }
            snapshots.changed().await.unwrap();
        }
    }

    #[tokio::test]
    async fn test_ticks_apply_setpoint_and_stop() {
        let mut config = FlowControlConfig::default();
        config.control.tick_interval_ms = 5;
        let store = Arc::new(InMemoryStore::new());

        let (setpoint_tx, setpoint_rx) = watch::channel(0.0);
        let (snapshot_tx, mut snapshot_rx) = watch::channel(ControlSnapshot::default());
        let (stop_tx, stop_rx) = oneshot::channel::<()>();

        let handle = tokio::spawn(run_control_loop(
            controller(&config, store.clone()),
            config.tick_interval(),
            setpoint_rx,
            snapshot_tx,
            async move {
                let _ = stop_rx.await;
            },
        ));

        let snapshot = wait_for(&mut snapshot_rx, |s| s.ticks >= 3).await;
        assert_eq!(snapshot.setpoint, 0.0);
        assert_eq!(snapshot.last_tick.unwrap().valve_position.get(), 0);

        setpoint_tx.send(40.0).unwrap();
        let snapshot = wait_for(&mut snapshot_rx, |s| s.setpoint == 40.0).await;
        assert!(snapshot.last_tick.unwrap().valve_position.get() > 0);

        stop_tx.send(()).unwrap();
        handle.await.unwrap().unwrap();

        let recorded = store.read().await.unwrap();
        let final_snapshot = (*snapshot_rx.borrow()).clone();
        assert_eq!(recorded.len() as u64, final_snapshot.ticks);
        assert_eq!(final_snapshot.history.cumulative, recorded);
    }

    fn assert_send<T: Send>(_: &T) {}

    #[tokio::test]
    async fn test_loop_future_can_be_spawned() {
        let config = FlowControlConfig::default();
        let (_setpoint_tx, setpoint_rx) = watch::channel(0.0);
        let (snapshot_tx, _snapshot_rx) = watch::channel(ControlSnapshot::default());

        let future = run_control_loop(
            controller(&config, Arc::new(InMemoryStore::new())),
            config.tick_interval(),
            setpoint_rx,
            snapshot_tx,
            std::future::ready(()),
        );
        assert_send(&future);
        future.await.unwrap();
    }

    #[tokio::test]
    async fn test_storage_failure_ends_loop() {
        let mut config = FlowControlConfig::default();
        config.control.tick_interval_ms = 5;

        let (_setpoint_tx, setpoint_rx) = watch::channel(0.0);
        let (snapshot_tx, _snapshot_rx) = watch::channel(ControlSnapshot::default());

        let result = run_control_loop(
            controller(&config, Arc::new(BrokenStore)),
            config.tick_interval(),
            setpoint_rx,
            snapshot_tx,
            std::future::pending(),
        )
        .await;

        let error = result.unwrap_err();
        assert!(format!("{:#}", error).contains("disk full"));
    }
}
