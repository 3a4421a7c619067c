// Session store backed by one NPY file per process run
use crate::application::measurement_store::{empty_session_series, next_cumulative, MeasurementStore};
use crate::infrastructure::npy;
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Local};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone)]
pub struct NpySessionStore {
    path: PathBuf,
}

const MAX_SESSIONS_PER_SECOND: u32 = 1000;

/// `<data_dir>/weight_data_<YYYY-MM-DD_HH-MM-SS>.npy`
pub fn session_file_path(data_dir: &Path, started: DateTime<Local>) -> PathBuf {
    numbered_session_file_path(data_dir, started, 0)
}

/// Session path for the `n`th run started within the same second; `_<n>` is appended for n > 0
fn numbered_session_file_path(data_dir: &Path, started: DateTime<Local>, n: u32) -> PathBuf {
    let stamp = started.format("%Y-%m-%d_%H-%M-%S");
    if n == 0 {
        data_dir.join(format!("weight_data_{}.npy", stamp))
    } else {
        data_dir.join(format!("weight_data_{}_{}.npy", stamp, n))
    }
}

impl NpySessionStore {
    /// Create the data directory if needed and start a new session file named after `started`
    pub async fn create(data_dir: &Path, started: DateTime<Local>) -> Result<Self> {
        tokio::fs::create_dir_all(data_dir)
            .await
            .with_context(|| format!("Failed to create data directory {}", data_dir.display()))?;

        // Claim a file no earlier run owns
        for n in 0..MAX_SESSIONS_PER_SECOND {
            let path = numbered_session_file_path(data_dir, started, n);
            let claimed = tokio::fs::OpenOptions::new()
                .write(true)
                .create_new(true)
                .open(&path)
                .await;

            match claimed {
                Ok(_) => {
                    tracing::info!("Recording weight data to {}", path.display());
                    return Ok(Self { path });
                }
                Err(e) if e.kind() == ErrorKind::AlreadyExists => continue,
                Err(e) => {
                    return Err(e).with_context(|| format!("Failed to create {}", path.display()));
                }
            }
        }

        anyhow::bail!(
            "No free session file name in {} for {}",
            data_dir.display(),
            started.format("%Y-%m-%d_%H-%M-%S")
        )
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Persisted series, or `None` when the session file does not exist yet
    async fn load(&self) -> Result<Option<Vec<f64>>> {
        match tokio::fs::read(&self.path).await {
            // Claimed at creation but nothing recorded yet
            Ok(bytes) if bytes.is_empty() => Ok(None),
            Ok(bytes) => {
                let series = npy::decode_f64(&bytes)
                    .with_context(|| format!("Corrupt weight data in {}", self.path.display()))?;
                Ok(Some(series))
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e).with_context(|| format!("Failed to read {}", self.path.display())),
        }
    }
}

#[async_trait]
impl MeasurementStore for NpySessionStore {
    async fn append(&self, sample: f64) -> Result<()> {
        let mut series = self.load().await?.unwrap_or_default();
        series.push(next_cumulative(&series, sample));

        tokio::fs::write(&self.path, npy::encode_f64(&series))
            .await
            .with_context(|| format!("Failed to write {}", self.path.display()))
    }

    async fn read(&self) -> Result<Vec<f64>> {
        Ok(self.load().await?.unwrap_or_else(empty_session_series))
    }
}
