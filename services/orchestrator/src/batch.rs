//! Batch and stream execution on top of single transforms
//!
//! - **Batch**: items run in fixed-size chunks, one chunk after another;
//!   inside a chunk at most `max_concurrency` transforms run at once. A
//!   failing item is recorded in `failed` and never aborts the batch.
//! - **Stream**: one item at a time from a possibly unbounded source; the
//!   input is never buffered.

use std::time::{Duration, Instant};

use futures::stream::{self, Stream, StreamExt};
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, info};
use types::{
    CanonicalEntity, InfrastructureRecord, MetricDataPoint, RelationshipEdge, TransformationResult,
};

use crate::{OrchestratorError, Result, TransformationOrchestrator};

/// One unit of batch or stream input
pub type BatchItem = InfrastructureRecord;

/// Successful item of a batch
#[derive(Debug, Clone)]
pub struct BatchSuccess {
    /// Provider that produced the result
    pub provider: String,
    pub result: TransformationResult,
}

/// Failed item of a batch, carrying the original payload
#[derive(Debug)]
pub struct BatchFailure {
    pub provider: String,
    /// Payload as submitted
    pub data: Value,
    pub error: OrchestratorError,
}

/// Aggregated outcome of [`TransformationOrchestrator::batch_transform`]
#[derive(Debug, Default)]
pub struct BatchResult {
    /// Successful items in submission order
    pub successful: Vec<BatchSuccess>,
    /// Failed items in submission order
    pub failed: Vec<BatchFailure>,
    /// Entities of every successful item, flattened
    pub entities: Vec<CanonicalEntity>,
    /// Metrics of every successful item, flattened
    pub metrics: Vec<MetricDataPoint>,
    /// Relationships of every successful item, flattened
    pub relationships: Vec<RelationshipEdge>,
}

impl BatchResult {
    /// Items processed
    pub fn len(&self) -> usize {
        self.successful.len() + self.failed.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn record(&mut self, item: BatchItem, outcome: Result<TransformationResult>) {
        match outcome {
            Ok(result) => {
                self.entities.extend(result.entities.iter().cloned());
                self.metrics.extend(result.metrics.iter().cloned());
                self.relationships.extend(result.relationships.iter().cloned());
                self.successful.push(BatchSuccess {
                    provider: item.provider,
                    result,
                });
            }
            Err(error) => self.failed.push(BatchFailure {
                provider: item.provider,
                data: item.data,
                error,
            }),
        }
    }
}

/// Counters of a finished stream
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct StreamSummary {
    /// Items taken from the source
    pub processed: u64,
    pub succeeded: u64,
    pub failed: u64,
    /// Wall-clock time from first poll to end of stream
    pub duration: Duration,
}

impl TransformationOrchestrator {
    /// Transform `items` in chunks of `batch_chunk_size` with at most
    /// `max_concurrency` transforms in flight per chunk
    pub async fn batch_transform(&self, items: Vec<BatchItem>) -> BatchResult {
        let chunk_size = self.config.batch_chunk_size.max(1);
        let max_concurrency = self.config.max_concurrency.max(1);
        let total = items.len();
        let started = Instant::now();
        let mut batch = BatchResult::default();

        let mut remaining = items.into_iter().peekable();
        let mut chunk_index = 0usize;
        while remaining.peek().is_some() {
            let chunk: Vec<BatchItem> = remaining.by_ref().take(chunk_size).collect();
            debug!(chunk = chunk_index, items = chunk.len(), "Processing batch chunk");

            // `buffered` keeps submission order while bounding concurrency
            let outcomes: Vec<(BatchItem, Result<TransformationResult>)> = stream::iter(chunk)
                .map(|item| async move {
                    let outcome = self.transform(&item.provider, &item.data).await;
                    (item, outcome)
                })
                .buffered(max_concurrency)
                .collect()
                .await;

            for (item, outcome) in outcomes {
                batch.record(item, outcome);
            }
            chunk_index += 1;
        }

        info!(
            items = total,
            successful = batch.successful.len(),
            failed = batch.failed.len(),
            chunks = chunk_index,
            duration_ms = started.elapsed().as_millis() as u64,
            "Batch transform completed"
        );
        batch
    }

    /// Consume `source` one item at a time, calling `on_result` with each
    /// item and its outcome.
    ///
    /// Ends when the source ends or the orchestrator starts shutting down;
    /// an in-flight item always completes first.
    pub async fn stream_transform<S, F>(&self, source: S, mut on_result: F) -> StreamSummary
    where
        S: Stream<Item = BatchItem>,
        F: FnMut(&BatchItem, Result<TransformationResult>),
    {
        let started = Instant::now();
        let mut summary = StreamSummary::default();
        futures::pin_mut!(source);

        while let Some(item) = source.next().await {
            if !self.is_accepting() {
                info!(processed = summary.processed, "Stream stopped by shutdown");
                break;
            }

            let outcome = self.transform(&item.provider, &item.data).await;
            summary.processed += 1;
            if outcome.is_ok() {
                summary.succeeded += 1;
            } else {
                summary.failed += 1;
            }
            on_result(&item, outcome);
        }

        summary.duration = started.elapsed();
        info!(
            processed = summary.processed,
            succeeded = summary.succeeded,
            failed = summary.failed,
            duration_ms = summary.duration.as_millis() as u64,
            "Stream transform finished"
        );
        summary
    }
}
