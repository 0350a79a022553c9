//! Node lifecycle: build the finder, advertise the outputs, spin.

use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use crossbeam_channel::{Receiver, RecvTimeoutError};
use log::{debug, info};

#[cfg(feature = "tracing")]
use tracing::instrument;

use target_detector_core::{
    build_target_finder, ConfigDocument, FinderRegistry, FramePipeline, NodeOptions,
    PipelineStatsSnapshot, RawFrame, StartupError, Transport,
};

/// A running detector node bound to one transport.
///
/// Construction is all-or-nothing: if the finder cannot be built no topic is
/// advertised, and if either advertisement fails the node does not exist.
pub struct Node<T: Transport> {
    transport: T,
    options: NodeOptions,
    pipeline: FramePipeline<T::Publisher>,
}

impl<T: Transport> Node<T> {
    /// Start with the `node` options found in `doc` (or their defaults).
    pub fn start(
        doc: &ConfigDocument,
        registry: &FinderRegistry,
        transport: T,
    ) -> Result<Self, StartupError> {
        let options = doc.node_options()?;
        Self::start_with_options(doc, options, registry, transport)
    }

    /// Start with explicit node options; `doc` only supplies the finder.
    pub fn start_with_options(
        doc: &ConfigDocument,
        options: NodeOptions,
        registry: &FinderRegistry,
        transport: T,
    ) -> Result<Self, StartupError> {
        let finder = build_target_finder(doc, registry)?;

        let advertise = |topic: &str| {
            transport
                .advertise(topic, options.queue_size)
                .map_err(|source| StartupError::Advertise {
                    topic: topic.to_string(),
                    source,
                })
        };
        let detected = advertise(&options.detected_topic)?;
        let annotated = advertise(&options.annotated_topic)?;
        info!(
            "advertised '{}' and '{}' (queue size {})",
            options.detected_topic, options.annotated_topic, options.queue_size
        );

        Ok(Self {
            pipeline: FramePipeline::new(finder, detected, annotated),
            transport,
            options,
        })
    }

    pub fn pipeline(&self) -> &FramePipeline<T::Publisher> {
        &self.pipeline
    }

    pub fn options(&self) -> &NodeOptions {
        &self.options
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Process frames one at a time until `frames` disconnects or
    /// `shutdown` is set. The flag is checked between frames and every
    /// `poll_interval_ms` while idle.
    #[cfg_attr(feature = "tracing", instrument(level = "info", skip_all))]
    pub fn spin(
        &self,
        frames: &Receiver<RawFrame>,
        shutdown: &AtomicBool,
    ) -> PipelineStatsSnapshot {
        let poll = Duration::from_millis(self.options.poll_interval_ms.max(1));
        info!("spinning on inbound frames");

        while !shutdown.load(Ordering::Relaxed) {
            match frames.recv_timeout(poll) {
                Ok(frame) => {
                    self.pipeline.on_frame(&frame);
                }
                Err(RecvTimeoutError::Timeout) => continue,
                Err(RecvTimeoutError::Disconnected) => {
                    debug!("inbound channel closed");
                    break;
                }
            }
        }

        let stats = self.pipeline.stats();
        info!(
            "shutting down: received={} published={} dropped={} publish_failures={}",
            stats.received, stats.published, stats.dropped, stats.publish_failures
        );
        stats
    }
}
