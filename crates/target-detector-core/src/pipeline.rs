//! Per-frame controller: normalize → find → draw → publish twice.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use log::{debug, warn};
use serde::{Deserialize, Serialize};

#[cfg(feature = "tracing")]
use tracing::instrument;

use crate::error::FrameError;
use crate::finder::TargetFinder;
use crate::frame::{CanonicalFrame, RawFrame};
use crate::normalize::normalize_frame;
use crate::transport::FramePublisher;

/// What happened to one frame.
#[derive(Debug)]
pub enum FrameOutcome {
    /// Both outputs were handed to the transport.
    Published {
        /// Number of distinct feature ids the finder reported.
        features: usize,
        /// Publications the transport rejected (0, 1 or 2).
        publish_failures: usize,
    },
    /// The frame was dropped before publication.
    Dropped(FrameError),
}

impl FrameOutcome {
    pub fn is_published(&self) -> bool {
        matches!(self, FrameOutcome::Published { .. })
    }
}

/// Monotonic counters shared by every invocation of a pipeline.
#[derive(Debug, Default)]
pub struct PipelineStats {
    received: AtomicU64,
    published: AtomicU64,
    dropped: AtomicU64,
    publish_failures: AtomicU64,
}

/// Point-in-time copy of [`PipelineStats`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PipelineStatsSnapshot {
    pub received: u64,
    pub published: u64,
    pub dropped: u64,
    pub publish_failures: u64,
}

impl PipelineStats {
    pub fn snapshot(&self) -> PipelineStatsSnapshot {
        PipelineStatsSnapshot {
            received: self.received.load(Ordering::Relaxed),
            published: self.published.load(Ordering::Relaxed),
            dropped: self.dropped.load(Ordering::Relaxed),
            publish_failures: self.publish_failures.load(Ordering::Relaxed),
        }
    }
}

/// Stateless per-frame controller around a shared, read-only finder.
///
/// `on_frame` may be called from several threads at once; each call owns its
/// canonical and annotated buffers.
pub struct FramePipeline<P> {
    finder: Arc<dyn TargetFinder>,
    detected: P,
    annotated: P,
    stats: PipelineStats,
}

impl<P: FramePublisher> FramePipeline<P> {
    pub fn new(finder: Arc<dyn TargetFinder>, detected: P, annotated: P) -> Self {
        Self {
            finder,
            detected,
            annotated,
            stats: PipelineStats::default(),
        }
    }

    pub fn finder(&self) -> &dyn TargetFinder {
        self.finder.as_ref()
    }

    pub fn stats(&self) -> PipelineStatsSnapshot {
        self.stats.snapshot()
    }

    /// Steps 1–3: returns the annotated frame and the feature count.
    ///
    /// The annotated frame carries the raw frame's header.
    pub fn process(&self, raw: &RawFrame) -> Result<(CanonicalFrame, usize), FrameError> {
        let canonical = normalize_frame(raw)?;
        let features = self
            .finder
            .find_target_features(&canonical.image)
            .map_err(FrameError::Detection)?;
        let image = self
            .finder
            .draw_target_features(&canonical.image, &features)
            .map_err(FrameError::Annotation)?;
        let annotated = CanonicalFrame {
            header: canonical.header,
            image,
        };
        Ok((annotated, features.len()))
    }

    /// Handle one inbound frame. Errors never escape; a failed frame is
    /// logged and dropped without any publication.
    #[cfg_attr(
        feature = "tracing",
        instrument(
            level = "debug",
            skip(self, raw),
            fields(seq = raw.header.seq, frame_id = %raw.header.frame_id)
        )
    )]
    pub fn on_frame(&self, raw: &RawFrame) -> FrameOutcome {
        self.stats.received.fetch_add(1, Ordering::Relaxed);

        let (annotated, features) = match self.process(raw) {
            Ok(v) => v,
            Err(err) => {
                self.stats.dropped.fetch_add(1, Ordering::Relaxed);
                warn!(
                    "dropping frame seq={} frame_id='{}' ({}x{} {}): {err}",
                    raw.header.seq, raw.header.frame_id, raw.width, raw.height, raw.encoding
                );
                return FrameOutcome::Dropped(err);
            }
        };

        let mut publish_failures = 0;
        for (publisher, frame) in [
            (&self.detected, raw.clone()),
            (&self.annotated, annotated.into_raw()),
        ] {
            if let Err(err) = publisher.publish(frame) {
                publish_failures += 1;
                warn!("frame seq={}: {err}", raw.header.seq);
            }
        }
        self.stats.published.fetch_add(1, Ordering::Relaxed);
        self.stats
            .publish_failures
            .fetch_add(publish_failures as u64, Ordering::Relaxed);

        debug!(
            "frame seq={} published with {features} target features",
            raw.header.seq
        );
        FrameOutcome::Published {
            features,
            publish_failures,
        }
    }
}
