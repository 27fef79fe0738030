//! Batched processing of per-page (or per-file, per-output) work.
//!
//! Items inside a batch run concurrently and their results are collected in
//! input order. Between batches the loop yields to the runtime and checks
//! the cancellation token. A failing item is recorded and the rest continue.

use crate::cancel::CancelToken;
use std::fmt;
use std::future::Future;
use thiserror::Error;

pub const DEFAULT_BATCH_SIZE: usize = 3;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ItemFailure<K> {
    pub item: K,
    pub error: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{} of {total} item(s) failed: {}", .failures.len(), summary(.failures))]
pub struct PartialBatchFailure<K: fmt::Display + fmt::Debug> {
    pub failures: Vec<ItemFailure<K>>,
    pub total: usize,
}

fn summary<K: fmt::Display>(failures: &[ItemFailure<K>]) -> String {
    failures
        .iter()
        .map(|f| format!("{} ({})", f.item, f.error))
        .collect::<Vec<_>>()
        .join(", ")
}

#[derive(Debug)]
pub struct BatchOutcome<K, T> {
    /// Successful results, in input order
    pub completed: Vec<(K, T)>,
    pub failures: Vec<ItemFailure<K>>,
    /// Set when the token fired before every item was started
    pub cancelled: bool,
    pub total: usize,
}

impl<K: Clone + fmt::Display + fmt::Debug, T> BatchOutcome<K, T> {
    pub fn values(self) -> Vec<T> {
        self.completed.into_iter().map(|(_, value)| value).collect()
    }

    /// The failures as an error, if any item failed.
    pub fn partial_failure(&self) -> Option<PartialBatchFailure<K>> {
        if self.failures.is_empty() {
            return None;
        }
        Some(PartialBatchFailure {
            failures: self.failures.clone(),
            total: self.total,
        })
    }
}

/// Run `op` over `items` in batches of `batch_size`.
pub async fn process_in_batches<K, T, F, Fut>(
    items: &[K],
    batch_size: usize,
    cancel: &CancelToken,
    mut op: F,
) -> BatchOutcome<K, T>
where
    K: Clone + fmt::Display,
    F: FnMut(K) -> Fut,
    Fut: Future<Output = anyhow::Result<T>>,
{
    let batch_size = batch_size.max(1);
    let mut outcome = BatchOutcome {
        completed: Vec::with_capacity(items.len()),
        failures: Vec::new(),
        cancelled: false,
        total: items.len(),
    };

    for (batch_no, batch) in items.chunks(batch_size).enumerate() {
        if cancel.is_cancelled() {
            tracing::debug!("batch processing cancelled before batch {}", batch_no + 1);
            outcome.cancelled = true;
            break;
        }

        let futures: Vec<_> = batch.iter().cloned().map(&mut op).collect();
        let results = futures::future::join_all(futures).await;

        for (item, result) in batch.iter().cloned().zip(results) {
            match result {
                Ok(value) => outcome.completed.push((item, value)),
                Err(e) => {
                    tracing::warn!("{} failed: {:#}", item, e);
                    outcome.failures.push(ItemFailure {
                        item,
                        error: format!("{:#}", e),
                    });
                }
            }
        }

        tracing::debug!(
            "batch {} done ({} of {} items)",
            batch_no + 1,
            outcome.completed.len() + outcome.failures.len(),
            items.len()
        );
        tokio::task::yield_now().await;
    }

    outcome
}
