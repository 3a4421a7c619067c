// Actuator dispatcher - bounded, non-blocking hand-off of valve writes
use crate::application::valve_actuator::{ActuatorError, ValveActuator};
use crate::domain::flow::ValvePosition;
use std::sync::Arc;
use std::time::{Duration, Instant};
use thiserror::Error;
use tokio::sync::mpsc::{self, error::TrySendError};
use tokio::sync::Semaphore;

#[derive(Debug, Error, PartialEq)]
pub enum DispatchError {
    #[error("Actuator queue is full, dropped position {0}")]
    QueueFull(ValvePosition),

    #[error("Actuator worker has stopped")]
    Closed,
}

#[derive(Debug, Clone, Copy)]
pub struct DispatchSettings {
    /// Commands waiting for a free writer before new ones are dropped
    pub queue_capacity: usize,
    /// Writes allowed to overlap
    pub max_in_flight: usize,
    pub write_timeout: Duration,
}

/// Outcome of one valve write, delivered on the completion channel
#[derive(Debug)]
pub struct DispatchReport {
    pub sequence: u64,
    pub position: ValvePosition,
    pub result: Result<(), ActuatorError>,
    pub elapsed: Duration,
}

struct Job {
    sequence: u64,
    position: ValvePosition,
}

pub struct ActuatorDispatcher {
    tx: mpsc::Sender<Job>,
    next_sequence: u64,
}

impl ActuatorDispatcher {
    /// Start the dispatch worker. Must be called inside a tokio runtime.
    pub fn spawn(
        actuator: Arc<dyn ValveActuator>,
        settings: DispatchSettings,
    ) -> (Self, mpsc::Receiver<DispatchReport>) {
        let capacity = settings.queue_capacity.max(1);
        let (tx, mut rx) = mpsc::channel::<Job>(capacity);
        let (report_tx, report_rx) = mpsc::channel(capacity * 4);
        let in_flight = Arc::new(Semaphore::new(settings.max_in_flight.max(1)));

        tokio::spawn(async move {
            while let Some(job) = rx.recv().await {
                let Ok(permit) = in_flight.clone().acquire_owned().await else {
                    break;
                };

                let actuator = actuator.clone();
                let report_tx = report_tx.clone();
                let write_timeout = settings.write_timeout;

                tokio::spawn(async move {
                    let started = Instant::now();
                    let result =
                        match tokio::time::timeout(write_timeout, actuator.set_position(job.position))
                            .await
                        {
                            Ok(result) => result,
                            Err(_) => Err(ActuatorError::Timeout(write_timeout)),
                        };
                    drop(permit);

                    let report = DispatchReport {
                        sequence: job.sequence,
                        position: job.position,
                        result,
                        elapsed: started.elapsed(),
                    };
                    if let Err(e) = report_tx.try_send(report) {
                        tracing::debug!("Dropping dispatch report: {}", e);
                    }
                });
            }

            tracing::debug!("Actuator dispatch worker stopped");
        });

        (
            Self {
                tx,
                next_sequence: 0,
            },
            report_rx,
        )
    }

    /// Queue a write without waiting for it. Returns the command's sequence number.
    pub fn dispatch(&mut self, position: ValvePosition) -> Result<u64, DispatchError> {
        let sequence = self.next_sequence;
        self.next_sequence += 1;

        match self.tx.try_send(Job { sequence, position }) {
            Ok(()) => Ok(sequence),
            Err(TrySendError::Full(_)) => Err(DispatchError::QueueFull(position)),
            Err(TrySendError::Closed(_)) => Err(DispatchError::Closed),
        }
    }
}

/// Drain the completion channel, logging failed writes
pub async fn log_dispatch_reports(mut reports: mpsc::Receiver<DispatchReport>) {
    while let Some(report) = reports.recv().await {
        match report.result {
            Ok(()) => tracing::debug!(
                sequence = report.sequence,
                position = report.position.get(),
                elapsed_ms = report.elapsed.as_millis() as u64,
                "Valve position written"
            ),
            Err(e) => tracing::warn!(
                sequence = report.sequence,
                position = report.position.get(),
                "Valve write failed, next tick will supersede it: {}",
                e
            ),
        }
    }
}
