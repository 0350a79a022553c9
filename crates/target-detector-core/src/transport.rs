//! Publication seam between the pipeline and the message bus.

use std::sync::{Mutex, MutexGuard};

use crossbeam_channel::{Receiver, Sender};

use crate::frame::RawFrame;

#[derive(thiserror::Error, Debug)]
pub enum TransportError {
    #[error("invalid topic name '{0}'")]
    InvalidTopic(String),

    #[error("I/O error on topic '{topic}': {source}")]
    Io {
        topic: String,
        #[source]
        source: std::io::Error,
    },
}

#[derive(thiserror::Error, Debug)]
pub enum PublishError {
    #[error("topic '{topic}' has no remaining subscribers")]
    Disconnected { topic: String },

    #[error("I/O error publishing on '{topic}': {source}")]
    Io {
        topic: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to encode frame for '{topic}': {reason}")]
    Encode { topic: String, reason: String },
}

/// One outbound channel.
pub trait FramePublisher: Send + Sync {
    fn topic(&self) -> &str;

    fn publish(&self, frame: RawFrame) -> Result<(), PublishError>;
}

/// Opens outbound channels.
pub trait Transport {
    type Publisher: FramePublisher;

    fn advertise(&self, topic: &str, queue_size: usize) -> Result<Self::Publisher, TransportError>;
}

impl<T: Transport + ?Sized> Transport for &T {
    type Publisher = T::Publisher;

    fn advertise(&self, topic: &str, queue_size: usize) -> Result<Self::Publisher, TransportError> {
        (**self).advertise(topic, queue_size)
    }
}

/// Topic names are non-empty and use `[A-Za-z0-9_/-]` only.
pub fn validate_topic(topic: &str) -> Result<(), TransportError> {
    let valid = !topic.is_empty()
        && topic
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '/'));
    if valid {
        Ok(())
    } else {
        Err(TransportError::InvalidTopic(topic.to_string()))
    }
}

/// In-process transport backed by unbounded channels.
///
/// Every advertised topic keeps one receiver inside the transport, so
/// publishing never fails while the transport is alive. `queue_size` is not
/// enforced.
#[derive(Default)]
pub struct MemoryTransport {
    topics: Mutex<Vec<MemoryTopic>>,
}

struct MemoryTopic {
    name: String,
    tx: Sender<RawFrame>,
    rx: Receiver<RawFrame>,
}

impl MemoryTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Topics advertised so far, in advertisement order.
    pub fn advertised_topics(&self) -> Vec<String> {
        self.lock().iter().map(|t| t.name.clone()).collect()
    }

    /// Receiver for an advertised topic.
    pub fn subscribe(&self, topic: &str) -> Option<Receiver<RawFrame>> {
        self.lock()
            .iter()
            .find(|t| t.name == topic)
            .map(|t| t.rx.clone())
    }

    /// Drain everything published on `topic` so far.
    pub fn drain(&self, topic: &str) -> Vec<RawFrame> {
        self.subscribe(topic)
            .map(|rx| rx.try_iter().collect())
            .unwrap_or_default()
    }

    fn lock(&self) -> MutexGuard<'_, Vec<MemoryTopic>> {
        // A poisoned list is still structurally valid.
        self.topics.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl Transport for MemoryTransport {
    type Publisher = MemoryPublisher;

    fn advertise(
        &self,
        topic: &str,
        _queue_size: usize,
    ) -> Result<MemoryPublisher, TransportError> {
        validate_topic(topic)?;
        let mut topics = self.lock();
        let tx = match topics.iter().find(|t| t.name == topic) {
            // Re-advertising shares the existing queue.
            Some(existing) => existing.tx.clone(),
            None => {
                let (tx, rx) = crossbeam_channel::unbounded();
                topics.push(MemoryTopic {
                    name: topic.to_string(),
                    tx: tx.clone(),
                    rx,
                });
                tx
            }
        };
        Ok(MemoryPublisher {
            topic: topic.to_string(),
            tx,
        })
    }
}

/// Publisher half of a [`MemoryTransport`] topic.
#[derive(Clone)]
pub struct MemoryPublisher {
    topic: String,
    tx: Sender<RawFrame>,
}

impl FramePublisher for MemoryPublisher {
    fn topic(&self) -> &str {
        &self.topic
    }

    fn publish(&self, frame: RawFrame) -> Result<(), PublishError> {
        self.tx.send(frame).map_err(|_| PublishError::Disconnected {
            topic: self.topic.clone(),
        })
    }
}
