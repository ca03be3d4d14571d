use std::collections::VecDeque;

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::sync::broadcast;

use super::PublishSink;
use crate::error::PublishError;

/// One accepted publish.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Published {
    pub topic: String,
    pub payload: String,
}

/// Simple in-memory sink for tests and non-broker contexts.
///
/// Records every accepted message, and can be told to reject the next `n`
/// publishes (or all of them) to simulate a flaky or vanished broker.
#[derive(Debug)]
pub struct LocalSink {
    log: Mutex<Vec<Published>>,
    script: Mutex<VecDeque<Result<(), PublishError>>>,
    down: Mutex<Option<PublishError>>,
    tx: broadcast::Sender<Published>,
}

impl Default for LocalSink {
    fn default() -> Self {
        Self::new()
    }
}

impl LocalSink {
    pub fn new() -> Self {
        let (tx, _rx) = broadcast::channel(256);
        Self {
            log: Mutex::new(Vec::new()),
            script: Mutex::new(VecDeque::new()),
            down: Mutex::new(None),
            tx,
        }
    }

    /// Queues results for the next publishes; once drained, publishes succeed again.
    pub fn script(&self, results: impl IntoIterator<Item = Result<(), PublishError>>) {
        self.script.lock().extend(results);
    }

    /// Rejects every publish with `err` until [`recover`](Self::recover) is called.
    pub fn fail_all(&self, err: PublishError) {
        *self.down.lock() = Some(err);
    }

    pub fn recover(&self) {
        *self.down.lock() = None;
    }

    /// Messages accepted so far, oldest first.
    pub fn published(&self) -> Vec<Published> {
        self.log.lock().clone()
    }

    /// Payloads accepted so far, oldest first.
    pub fn payloads(&self) -> Vec<String> {
        self.log.lock().iter().map(|p| p.payload.clone()).collect()
    }

    /// Live feed of accepted messages.
    pub fn subscribe(&self) -> broadcast::Receiver<Published> {
        self.tx.subscribe()
    }
}

#[async_trait]
impl PublishSink for LocalSink {
    async fn publish(&self, topic: &str, payload: &str) -> Result<(), PublishError> {
        if let Some(err) = self.down.lock().clone() {
            return Err(err);
        }
        if let Some(Err(err)) = self.script.lock().pop_front() {
            return Err(err);
        }
        let msg = Published {
            topic: topic.to_string(),
            payload: payload.to_string(),
        };
        self.log.lock().push(msg.clone());
        let _ = self.tx.send(msg);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn scripted_failures_then_recovery() {
        let sink = LocalSink::new();
        sink.script([Err(PublishError::NotConnected), Ok(())]);

        assert_eq!(
            sink.publish("t", "a").await,
            Err(PublishError::NotConnected)
        );
        assert!(sink.publish("t", "b").await.is_ok());
        assert!(sink.publish("t", "c").await.is_ok());
        assert_eq!(sink.payloads(), vec!["b", "c"]);
    }

    #[tokio::test]
    async fn fail_all_until_recovered() {
        let sink = LocalSink::new();
        sink.fail_all(PublishError::Closed);
        assert!(sink.publish("t", "a").await.is_err());
        sink.recover();
        assert!(sink.publish("t", "a").await.is_ok());
        assert_eq!(sink.published()[0].topic, "t");
    }
}
