//! High-level facade for the `target-detector-*` workspace.
//!
//! This crate provides:
//! - re-exports of the core pipeline types and the built-in finders,
//! - [`Node`]: the process lifecycle (build the finder, advertise the two
//!   output topics, spin over inbound frames until shutdown),
//! - (feature `image`) image-file I/O and a directory-backed transport used
//!   by the `target-detector` binary.
//!
//! ## Quickstart
//!
//! ```
//! use std::sync::atomic::AtomicBool;
//! use serde_json::json;
//! use target_detector::core::{ConfigDocument, Header, MemoryTransport, RawFrame};
//! use target_detector::{default_registry, Node};
//!
//! let doc = ConfigDocument::from_value(json!({
//!     "target_finder": { "type": "CircleGridTargetFinder", "rows": 3, "cols": 3 }
//! }));
//! let node = Node::start(&doc, &default_registry(), MemoryTransport::new()).unwrap();
//!
//! let (tx, rx) = crossbeam_channel::unbounded();
//! tx.send(RawFrame::mono8(Header::default(), 32, 32, vec![0; 32 * 32])).unwrap();
//! drop(tx);
//!
//! let stats = node.spin(&rx, &AtomicBool::new(false));
//! assert_eq!((stats.received, stats.dropped), (1, 1));
//! ```
//!
//! ## API map
//! - `target_detector::core`: frames, encodings, normalization, finder trait
//!   and registry, pipeline, transports.
//! - `target_detector::finders`: built-in finders (`CircleGridTargetFinder`).
//! - `target_detector::io` (feature `image`): image files ↔ `RawFrame`.
//! - `target_detector::fs_transport` (feature `image`): directory input and
//!   output.

pub use target_detector_core as core;
pub use target_detector_finders as finders;

pub use target_detector_core::{
    ConfigDocument, FrameOutcome, FramePipeline, NodeOptions, PipelineStatsSnapshot, RawFrame,
    StartupError, TargetFinder,
};

mod node;

pub use node::Node;

#[cfg(feature = "image")]
pub mod fs_transport;
#[cfg(feature = "image")]
pub mod io;

use target_detector_core::FinderRegistry;

/// A registry holding every built-in finder.
pub fn default_registry() -> FinderRegistry {
    let mut registry = FinderRegistry::new();
    target_detector_finders::register_builtin_finders(&mut registry);
    registry
}
