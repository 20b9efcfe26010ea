//! Downstream result sinks
//!
//! The orchestrator hands every successful result to the registered sink.
//! A sink failure is logged and published as an event; it never rolls back
//! or fails the transformation.

use async_trait::async_trait;
use tokio::sync::mpsc;
use types::TransformationResult;

/// Consumer of transformation results, e.g. an ingest client
#[async_trait]
pub trait ResultSink: Send + Sync {
    /// Accept one result
    async fn accept(&self, result: &TransformationResult) -> anyhow::Result<()>;
}

/// Sink forwarding results into a bounded channel
#[derive(Debug, Clone)]
pub struct ChannelSink {
    sender: mpsc::Sender<TransformationResult>,
}

impl ChannelSink {
    /// Sink plus the receiving end, with room for `capacity` results
    pub fn new(capacity: usize) -> (Self, mpsc::Receiver<TransformationResult>) {
        let (sender, receiver) = mpsc::channel(capacity);
        (Self { sender }, receiver)
    }
}

#[async_trait]
impl ResultSink for ChannelSink {
    async fn accept(&self, result: &TransformationResult) -> anyhow::Result<()> {
        self.sender
            .send(result.clone())
            .await
            .map_err(|_| anyhow::anyhow!("result channel closed"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_channel_sink_forwards_and_reports_closure() {
        let (sink, mut rx) = ChannelSink::new(1);
        let result = TransformationResult::new("kafka", vec![], vec![], vec![]);

        sink.accept(&result).await.unwrap();
        assert_eq!(rx.recv().await.unwrap().provider, "kafka");

        drop(rx);
        assert!(sink.accept(&result).await.is_err());
    }
}
