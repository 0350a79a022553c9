//! Late-bound target finders and the name-keyed registry that builds them.

use std::collections::BTreeMap;
use std::sync::Arc;

use log::{debug, info};
use serde_json::Value;

use crate::config::ConfigDocument;
use crate::error::StartupError;
use crate::features::TargetFeatures;
use crate::frame::BgrImage;

/// Errors returned by finder implementations.
///
/// Detection and rendering errors are frame-scoped; parameter errors surface
/// at construction time.
#[derive(thiserror::Error, Debug)]
pub enum FinderError {
    #[error("target not found: {0}")]
    TargetNotFound(String),

    #[error("image {width}x{height} is too small for the target")]
    ImageTooSmall { width: usize, height: usize },

    #[error("invalid finder parameters: {0}")]
    InvalidParams(String),

    #[error(transparent)]
    Params(#[from] serde_json::Error),

    #[error("failed to render target features: {0}")]
    Rendering(String),
}

/// Locate a calibration target and draw what was found.
///
/// Implementations are immutable after construction and are shared across
/// frame invocations, hence `Send + Sync` and `&self` receivers.
pub trait TargetFinder: Send + Sync {
    /// Registered type name of this finder.
    fn name(&self) -> &str;

    fn find_target_features(&self, image: &BgrImage) -> Result<TargetFeatures, FinderError>;

    /// Render `features` over a copy of `image`.
    fn draw_target_features(
        &self,
        image: &BgrImage,
        features: &TargetFeatures,
    ) -> Result<BgrImage, FinderError>;
}

/// Builds a finder from its `target_finder` configuration section.
pub trait TargetFinderFactory: Send + Sync {
    fn create(&self, params: &Value) -> Result<Box<dyn TargetFinder>, FinderError>;
}

impl<F> TargetFinderFactory for F
where
    F: Fn(&Value) -> Result<Box<dyn TargetFinder>, FinderError> + Send + Sync,
{
    fn create(&self, params: &Value) -> Result<Box<dyn TargetFinder>, FinderError> {
        self(params)
    }
}

/// Name → factory map, populated once at startup.
#[derive(Default)]
pub struct FinderRegistry {
    factories: BTreeMap<String, Box<dyn TargetFinderFactory>>,
}

impl FinderRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `factory` under `name`. A later registration replaces an earlier one.
    pub fn register<F>(&mut self, name: impl Into<String>, factory: F) -> &mut Self
    where
        F: TargetFinderFactory + 'static,
    {
        let name = name.into();
        if self.factories.insert(name.clone(), Box::new(factory)).is_some() {
            debug!("target finder factory '{name}' replaced");
        }
        self
    }

    pub fn contains(&self, name: &str) -> bool {
        self.factories.contains_key(name)
    }

    /// Registered names in sorted order.
    pub fn names(&self) -> Vec<&str> {
        self.factories.keys().map(String::as_str).collect()
    }

    /// Resolve `name` and construct a finder from `params`.
    pub fn create(
        &self,
        name: &str,
        params: &Value,
    ) -> Result<Box<dyn TargetFinder>, StartupError> {
        let factory = self
            .factories
            .get(name)
            .ok_or_else(|| StartupError::UnknownFinder {
                name: name.to_string(),
                available: self.names().join(", "),
            })?;
        factory
            .create(params)
            .map_err(|source| StartupError::FinderConstruction {
                name: name.to_string(),
                source,
            })
    }
}

/// Build the process-wide finder from the `target_finder` section of `doc`.
pub fn build_target_finder(
    doc: &ConfigDocument,
    registry: &FinderRegistry,
) -> Result<Arc<dyn TargetFinder>, StartupError> {
    let cfg = doc.finder_config()?;
    let finder = registry.create(cfg.type_name, cfg.params)?;
    info!("loaded target finder '{}'", finder.name());
    Ok(Arc::from(finder))
}
