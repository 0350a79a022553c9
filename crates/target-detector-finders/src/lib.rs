//! Built-in calibration target finders.
//!
//! Finders are constructed by name through a
//! [`FinderRegistry`](target_detector_core::FinderRegistry); call
//! [`register_builtin_finders`] once at startup to make them resolvable.
//!
//! ```
//! use serde_json::json;
//! use target_detector_core::{build_target_finder, ConfigDocument, FinderRegistry};
//! use target_detector_finders::register_builtin_finders;
//!
//! let mut registry = FinderRegistry::new();
//! register_builtin_finders(&mut registry);
//!
//! let doc = ConfigDocument::from_value(json!({
//!     "target_finder": { "type": "CircleGridTargetFinder", "rows": 4, "cols": 5 }
//! }));
//! let finder = build_target_finder(&doc, &registry).unwrap();
//! assert_eq!(finder.name(), "CircleGridTargetFinder");
//! ```

mod blobs;
mod circle_grid;
mod ordering;
mod threshold;

pub use circle_grid::{
    CircleGridParams, CircleGridTargetFinder, CirclePolarity, CIRCLE_GRID_FINDER,
};

use target_detector_core::FinderRegistry;

/// Register every finder shipped with this crate.
pub fn register_builtin_finders(registry: &mut FinderRegistry) {
    registry.register(CIRCLE_GRID_FINDER, CircleGridTargetFinder::from_config);
}
