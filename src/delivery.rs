//! Staggered delivery of output files.
//!
//! Output `i` is saved at `start + i * delay`. Timers are armed together, so
//! a slow save doesn't push back the ones after it.

use crate::cancel::CancelToken;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::task::JoinSet;
use tokio::time::Instant;

#[derive(Debug, Error)]
pub enum DeliveryError {
    #[error("Failed to save {name}: {source}")]
    Io {
        name: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to save {name}: {reason}")]
    Rejected { name: String, reason: String },

    #[error("Delivery task for {name} did not finish")]
    Aborted { name: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct DeliveryConfig {
    /// Gap between consecutive saves, in milliseconds
    pub delay_ms: u64,
    /// How long a blob stays alive after its save started
    pub release_grace_ms: u64,
}

impl Default for DeliveryConfig {
    fn default() -> Self {
        DeliveryConfig {
            delay_ms: 500,
            release_grace_ms: 100,
        }
    }
}

impl DeliveryConfig {
    pub fn delay(&self) -> Duration {
        Duration::from_millis(self.delay_ms)
    }

    pub fn release_grace(&self) -> Duration {
        Duration::from_millis(self.release_grace_ms)
    }
}

/// A materialized output waiting to be delivered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Download {
    pub name: String,
    pub bytes: Vec<u8>,
}

impl Download {
    pub fn new(name: impl Into<String>, bytes: Vec<u8>) -> Self {
        Download {
            name: name.into(),
            bytes,
        }
    }
}

/// Where delivered files end up.
pub trait SaveTarget: Send + Sync + 'static {
    fn save(&self, name: &str, bytes: &[u8]) -> Result<PathBuf, DeliveryError>;
}

/// Writes each output into a directory, via a temporary file and a rename.
#[derive(Debug, Clone)]
pub struct DirectoryTarget {
    dir: PathBuf,
}

impl DirectoryTarget {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        DirectoryTarget { dir: dir.into() }
    }
}

impl SaveTarget for DirectoryTarget {
    fn save(&self, name: &str, bytes: &[u8]) -> Result<PathBuf, DeliveryError> {
        let io_err = |source| DeliveryError::Io {
            name: name.to_string(),
            source,
        };

        if name.is_empty() || name.contains(['/', '\\']) {
            return Err(DeliveryError::Rejected {
                name: name.to_string(),
                reason: "file name must not contain a path".to_string(),
            });
        }

        std::fs::create_dir_all(&self.dir).map_err(io_err)?;
        let path = self.dir.join(name);
        let partial = self.dir.join(format!(".{}.partial", name));
        std::fs::write(&partial, bytes).map_err(io_err)?;
        if let Err(e) = std::fs::rename(&partial, &path) {
            let _ = std::fs::remove_file(&partial);
            return Err(io_err(e));
        }
        Ok(path)
    }
}

/// Tracks how many output buffers are still held by delivery tasks.
#[derive(Debug, Clone, Default)]
pub struct BlobRegistry {
    live: Arc<AtomicUsize>,
}

impl BlobRegistry {
    pub fn live(&self) -> usize {
        self.live.load(Ordering::SeqCst)
    }

    fn acquire(&self, bytes: Vec<u8>) -> BlobRef {
        self.live.fetch_add(1, Ordering::SeqCst);
        BlobRef {
            bytes: Arc::from(bytes),
            live: self.live.clone(),
        }
    }
}

/// A transient reference to one output's bytes; released on drop.
struct BlobRef {
    bytes: Arc<[u8]>,
    live: Arc<AtomicUsize>,
}

impl Drop for BlobRef {
    fn drop(&mut self) {
        self.live.fetch_sub(1, Ordering::SeqCst);
    }
}

#[derive(Debug)]
pub enum DeliveryOutcome {
    Saved { path: PathBuf, at: Duration },
    Failed(DeliveryError),
    Cancelled,
}

#[derive(Debug)]
pub struct DeliveryEvent {
    pub index: usize,
    pub name: String,
    pub outcome: DeliveryOutcome,
}

#[derive(Debug, Default)]
pub struct DeliveryReport {
    /// One event per download, in download order
    pub events: Vec<DeliveryEvent>,
}

impl DeliveryReport {
    pub fn saved(&self) -> impl Iterator<Item = &Path> {
        self.events.iter().filter_map(|e| match &e.outcome {
            DeliveryOutcome::Saved { path, .. } => Some(path.as_path()),
            _ => None,
        })
    }

    pub fn failures(&self) -> impl Iterator<Item = &DeliveryError> {
        self.events.iter().filter_map(|e| match &e.outcome {
            DeliveryOutcome::Failed(err) => Some(err),
            _ => None,
        })
    }

    pub fn cancelled(&self) -> usize {
        self.events
            .iter()
            .filter(|e| matches!(e.outcome, DeliveryOutcome::Cancelled))
            .count()
    }
}

/// Scheduled offsets from the start of delivery: `0, d, 2d, ...`
///
/// Offsets saturate instead of overflowing.
pub fn schedule(count: usize, delay: Duration) -> Vec<Duration> {
    (0..count)
        .map(|i| delay.saturating_mul(u32::try_from(i).unwrap_or(u32::MAX)))
        .collect()
}

/// Sleep until `deadline`; a deadline past what the clock can represent
/// never arrives.
async fn sleep_until(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => tokio::time::sleep_until(deadline).await,
        None => std::future::pending().await,
    }
}

#[derive(Debug, Clone)]
pub struct Sequencer {
    config: DeliveryConfig,
    blobs: BlobRegistry,
}

impl Sequencer {
    pub fn new(config: DeliveryConfig) -> Self {
        Sequencer {
            config,
            blobs: BlobRegistry::default(),
        }
    }

    pub fn blobs(&self) -> &BlobRegistry {
        &self.blobs
    }

    /// Deliver every download to `target`, the first immediately and the
    /// rest staggered. Failures are reported per download and never stop
    /// the others; cancelling drops whatever is still waiting.
    pub async fn deliver(
        &self,
        downloads: Vec<Download>,
        target: Arc<dyn SaveTarget>,
        cancel: &CancelToken,
    ) -> DeliveryReport {
        let start = Instant::now();
        let offsets = schedule(downloads.len(), self.config.delay());
        let grace = self.config.release_grace();
        let mut tasks = JoinSet::new();
        let mut names = Vec::with_capacity(downloads.len());

        for (index, (download, offset)) in downloads.into_iter().zip(offsets).enumerate() {
            names.push(download.name.clone());
            let blob = self.blobs.acquire(download.bytes);
            let name = download.name;
            let target = target.clone();
            let cancel = cancel.clone();
            let deadline = start.checked_add(offset);

            tracing::debug!("scheduling {} at +{:?}", name, offset);
            tasks.spawn(async move {
                let outcome = tokio::select! {
                    biased;
                    _ = cancel.cancelled() => DeliveryOutcome::Cancelled,
                    _ = sleep_until(deadline) => {
                        let bytes = blob.bytes.clone();
                        let save_name = name.clone();
                        let result = tokio::task::spawn_blocking(move || {
                            target.save(&save_name, &bytes)
                        })
                        .await
                        .unwrap_or_else(|_| Err(DeliveryError::Aborted { name: name.clone() }));
                        let at = start.elapsed();
                        // Keep the buffer alive a little past the save on
                        // every path, then release it.
                        tokio::select! {
                            _ = cancel.cancelled() => {}
                            _ = tokio::time::sleep(grace) => {}
                        }
                        match result {
                            Ok(path) => DeliveryOutcome::Saved { path, at },
                            Err(e) => DeliveryOutcome::Failed(e),
                        }
                    }
                };
                drop(blob);
                (index, name, outcome)
            });
        }

        let mut slots: Vec<Option<DeliveryEvent>> = names.iter().map(|_| None).collect();
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((index, name, outcome)) => {
                    match &outcome {
                        DeliveryOutcome::Saved { path, .. } => {
                            tracing::info!("saved {}", path.display())
                        }
                        DeliveryOutcome::Failed(e) => tracing::warn!("{}", e),
                        DeliveryOutcome::Cancelled => tracing::debug!("cancelled {}", name),
                    }
                    slots[index] = Some(DeliveryEvent {
                        index,
                        name,
                        outcome,
                    });
                }
                Err(e) => tracing::warn!("delivery task failed: {}", e),
            }
        }

        let events = slots
            .into_iter()
            .zip(names)
            .enumerate()
            .map(|(index, (slot, name))| {
                slot.unwrap_or_else(|| DeliveryEvent {
                    index,
                    outcome: DeliveryOutcome::Failed(DeliveryError::Aborted { name: name.clone() }),
                    name,
                })
            })
            .collect();

        DeliveryReport { events }
    }
}
