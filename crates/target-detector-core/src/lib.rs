//! Core types and the per-frame detection pipeline for the target detector node.
//!
//! The crate does *not* know how a calibration target is found. It defines:
//! - the frame model ([`RawFrame`], [`CanonicalFrame`], [`BgrImage`]),
//! - normalization of arbitrary encodings into 8-bit BGR ([`normalize`]),
//! - the late-bound finder capability ([`TargetFinder`]) and the name-keyed
//!   [`FinderRegistry`] that resolves it from a [`ConfigDocument`],
//! - the [`FramePipeline`] that runs normalize → find → draw → publish and
//!   drops a single frame on any recoverable error,
//! - the [`Transport`] seam the pipeline publishes through.
//!
//! ## Quickstart
//!
//! ```
//! use std::sync::Arc;
//! use target_detector_core::{
//!     BgrImage, FinderError, FramePipeline, Header, MemoryTransport, RawFrame, TargetFeatures,
//!     TargetFinder, Transport,
//! };
//!
//! struct Nothing;
//!
//! impl TargetFinder for Nothing {
//!     fn name(&self) -> &str {
//!         "Nothing"
//!     }
//!     fn find_target_features(&self, _: &BgrImage) -> Result<TargetFeatures, FinderError> {
//!         Err(FinderError::TargetNotFound("nothing to find".into()))
//!     }
//!     fn draw_target_features(
//!         &self,
//!         image: &BgrImage,
//!         _: &TargetFeatures,
//!     ) -> Result<BgrImage, FinderError> {
//!         Ok(image.clone())
//!     }
//! }
//!
//! let transport = MemoryTransport::new();
//! let pipeline = FramePipeline::new(
//!     Arc::new(Nothing),
//!     transport.advertise("image_detected", 1).unwrap(),
//!     transport.advertise("image_annotated", 1).unwrap(),
//! );
//! let frame = RawFrame::mono8(Header::default(), 4, 4, vec![0; 16]);
//! assert!(!pipeline.on_frame(&frame).is_published());
//! ```

mod config;
mod draw;
mod encoding;
mod error;
mod features;
mod finder;
mod frame;
mod logger;
mod normalize;
mod pipeline;
mod transport;

pub use config::{ConfigDocument, ConfigError, FinderConfig, NodeOptions, TARGET_FINDER_SECTION};
pub use draw::{draw_circle, draw_cross, draw_line, fill_circle, Bgr};
pub use encoding::{BayerPattern, ChannelLayout, Encoding, SampleType, UnknownEncoding};
pub use error::{FrameError, StartupError};
pub use features::TargetFeatures;
pub use finder::{
    build_target_finder, FinderError, FinderRegistry, TargetFinder, TargetFinderFactory,
};
pub use frame::{
    BgrImage, CanonicalFrame, DecodeError, GrayImage, Header, ImageView, RawFrame, Timestamp,
};
pub use normalize::{normalize, normalize_frame};
pub use pipeline::{FrameOutcome, FramePipeline, PipelineStats, PipelineStatsSnapshot};
pub use transport::{
    validate_topic, FramePublisher, MemoryPublisher, MemoryTransport, PublishError, Transport,
    TransportError,
};

#[cfg(feature = "tracing")]
pub use logger::init_tracing;

pub use logger::init_with_level;
