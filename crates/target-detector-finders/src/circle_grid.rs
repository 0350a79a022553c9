//! Circle-grid target finder: a `rows × cols` grid of filled circles.
//!
//! Detection:
//! 1. Convert to gray and binarize with Otsu (or a fixed threshold).
//! 2. Label 4-connected blobs of the circle polarity, drop blobs touching the
//!    border or failing the area / fill-ratio / aspect checks.
//! 3. Keep the `rows * cols` blobs whose area is closest to the median.
//! 4. Order the centroids row-major along the grid's principal axis.
//!
//! Feature ids are `row * cols + col`.

use log::debug;
use nalgebra::Point2;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use target_detector_core::{
    draw_circle, draw_cross, draw_line, fill_circle, Bgr, BgrImage, FinderError, TargetFeatures,
    TargetFinder,
};

#[cfg(feature = "tracing")]
use tracing::instrument;

use crate::blobs::{find_blobs, Blob};
use crate::ordering::{order_grid, OrderError};
use crate::threshold::otsu_threshold;

/// Registered type name.
pub const CIRCLE_GRID_FINDER: &str = "CircleGridTargetFinder";

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CirclePolarity {
    /// Dark circles on a light background.
    #[default]
    Dark,
    Light,
}

/// Parameters read from the `target_finder` section.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CircleGridParams {
    pub rows: u32,
    pub cols: u32,
    #[serde(default)]
    pub polarity: CirclePolarity,
    #[serde(default = "default_min_area_px")]
    pub min_area_px: usize,
    /// `None` disables the upper bound.
    #[serde(default)]
    pub max_area_px: Option<usize>,
    /// Minimum blob area over bounding-box area.
    #[serde(default = "default_min_fill_ratio")]
    pub min_fill_ratio: f32,
    #[serde(default = "default_max_aspect_ratio")]
    pub max_aspect_ratio: f32,
    /// Fixed binarization threshold; Otsu when absent.
    #[serde(default)]
    pub threshold: Option<u8>,
    /// Ring radius used when drawing features.
    #[serde(default = "default_draw_radius_px")]
    pub draw_radius_px: f32,
}

fn default_min_area_px() -> usize {
    12
}

fn default_min_fill_ratio() -> f32 {
    0.5
}

fn default_max_aspect_ratio() -> f32 {
    2.0
}

fn default_draw_radius_px() -> f32 {
    6.0
}

impl CircleGridParams {
    pub fn new(rows: u32, cols: u32) -> Self {
        Self {
            rows,
            cols,
            polarity: CirclePolarity::default(),
            min_area_px: default_min_area_px(),
            max_area_px: None,
            min_fill_ratio: default_min_fill_ratio(),
            max_aspect_ratio: default_max_aspect_ratio(),
            threshold: None,
            draw_radius_px: default_draw_radius_px(),
        }
    }

    pub fn validate(&self) -> Result<(), FinderError> {
        if self.rows < 2 || self.cols < 2 {
            return Err(FinderError::InvalidParams(format!(
                "grid must be at least 2x2 (got {}x{})",
                self.rows, self.cols
            )));
        }
        if let Some(max) = self.max_area_px {
            if max < self.min_area_px {
                return Err(FinderError::InvalidParams(format!(
                    "max_area_px ({max}) < min_area_px ({})",
                    self.min_area_px
                )));
            }
        }
        if !(self.min_fill_ratio > 0.0 && self.min_fill_ratio <= 1.0) {
            return Err(FinderError::InvalidParams(
                "min_fill_ratio must be in (0, 1]".into(),
            ));
        }
        if !(self.max_aspect_ratio >= 1.0) {
            return Err(FinderError::InvalidParams(
                "max_aspect_ratio must be >= 1".into(),
            ));
        }
        if !(self.draw_radius_px >= 0.0) {
            return Err(FinderError::InvalidParams(
                "draw_radius_px must be >= 0".into(),
            ));
        }
        Ok(())
    }

    fn count(&self) -> usize {
        self.rows as usize * self.cols as usize
    }

    fn accepts(&self, blob: &Blob) -> bool {
        !blob.touches_border
            && blob.area >= self.min_area_px
            && self.max_area_px.is_none_or(|max| blob.area <= max)
            && blob.fill_ratio() >= self.min_fill_ratio
            && blob.aspect_ratio() <= self.max_aspect_ratio
    }
}

pub struct CircleGridTargetFinder {
    params: CircleGridParams,
}

impl CircleGridTargetFinder {
    pub fn new(params: CircleGridParams) -> Result<Self, FinderError> {
        params.validate()?;
        Ok(Self { params })
    }

    /// Factory entry point: deserialize from a `target_finder` section.
    pub fn from_config(section: &Value) -> Result<Box<dyn TargetFinder>, FinderError> {
        let params = CircleGridParams::deserialize(section)?;
        Ok(Box::new(Self::new(params)?))
    }

    pub fn params(&self) -> &CircleGridParams {
        &self.params
    }

    fn candidate_blobs(&self, image: &BgrImage) -> Vec<Blob> {
        let gray = image.to_gray();
        let t = self
            .params
            .threshold
            .unwrap_or_else(|| otsu_threshold(&gray.data));
        let mask: Vec<bool> = match self.params.polarity {
            CirclePolarity::Dark => gray.data.iter().map(|&v| v <= t).collect(),
            CirclePolarity::Light => gray.data.iter().map(|&v| v > t).collect(),
        };

        let blobs = find_blobs(&mask, gray.width, gray.height);
        let total = blobs.len();
        let kept: Vec<Blob> = blobs.into_iter().filter(|b| self.params.accepts(b)).collect();
        debug!(
            "circle grid: threshold={t}, blobs={total}, candidates={}",
            kept.len()
        );
        kept
    }
}

/// Keep the `n` blobs whose area is closest to the median area.
fn select_by_median_area(mut blobs: Vec<Blob>, n: usize) -> Vec<Blob> {
    if blobs.len() <= n {
        return blobs;
    }
    let mut areas: Vec<usize> = blobs.iter().map(|b| b.area).collect();
    areas.sort_unstable();
    let median = areas[areas.len() / 2] as i64;
    blobs.sort_by_key(|b| (b.area as i64 - median).abs());
    blobs.truncate(n);
    blobs
}

/// Row colours cycling through a fixed palette, like chessboard overlays.
fn row_color(row: usize) -> Bgr {
    const PALETTE: [Bgr; 6] = [
        [0, 0, 255],
        [0, 128, 255],
        [0, 200, 200],
        [0, 255, 0],
        [200, 200, 0],
        [255, 0, 0],
    ];
    PALETTE[row % PALETTE.len()]
}

impl TargetFinder for CircleGridTargetFinder {
    fn name(&self) -> &str {
        CIRCLE_GRID_FINDER
    }

    #[cfg_attr(
        feature = "tracing",
        instrument(
            level = "debug",
            skip(self, image),
            fields(width = image.width, height = image.height)
        )
    )]
    fn find_target_features(&self, image: &BgrImage) -> Result<TargetFeatures, FinderError> {
        let (rows, cols) = (self.params.rows as usize, self.params.cols as usize);
        if image.width < 2 * cols || image.height < 2 * rows {
            return Err(FinderError::ImageTooSmall {
                width: image.width,
                height: image.height,
            });
        }

        let n = self.params.count();
        let blobs = self.candidate_blobs(image);
        if blobs.len() < n {
            return Err(FinderError::TargetNotFound(format!(
                "found {} of {n} circles",
                blobs.len()
            )));
        }
        let centers: Vec<Point2<f32>> = select_by_median_area(blobs, n)
            .iter()
            .map(|b| b.centroid)
            .collect();

        let ordered = order_grid(&centers, rows, cols).map_err(|e| match e {
            OrderError::WrongCount { expected, got } => {
                FinderError::TargetNotFound(format!("expected {expected} circles, got {got}"))
            }
            OrderError::RowsNotSeparable { row } => {
                FinderError::TargetNotFound(format!("circle row {row} is not separable"))
            }
        })?;

        Ok(ordered
            .into_iter()
            .enumerate()
            .map(|(id, p)| (id as u32, p))
            .collect())
    }

    fn draw_target_features(
        &self,
        image: &BgrImage,
        features: &TargetFeatures,
    ) -> Result<BgrImage, FinderError> {
        let cols = self.params.cols as usize;
        let radius = self.params.draw_radius_px;
        let mut out = image.clone();

        let mut prev: Option<Point2<f32>> = None;
        for (id, points) in features.iter() {
            let color = row_color(id as usize / cols);
            for &p in points {
                if let Some(q) = prev {
                    draw_line(&mut out, q, p, color);
                }
                draw_circle(&mut out, p, radius, color);
                draw_cross(&mut out, p, (radius / 2.0).max(1.0), color);
                prev = Some(p);
            }
        }
        if let Some(origin) = features.get(0).and_then(|pts| pts.first()) {
            fill_circle(&mut out, *origin, (radius / 3.0).max(1.0), [255, 255, 255]);
        }
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use serde_json::json;

    /// White canvas with dark discs on a `rows × cols` grid.
    fn board(rows: usize, cols: usize, pitch: f32, radius: f32) -> (BgrImage, Vec<Point2<f32>>) {
        let margin = 2.0 * pitch;
        let width = (margin * 2.0 + pitch * (cols - 1) as f32) as usize;
        let height = (margin * 2.0 + pitch * (rows - 1) as f32) as usize;
        let mut img = BgrImage {
            width,
            height,
            data: vec![230; width * height * 3],
        };
        let mut centers = Vec::new();
        for r in 0..rows {
            for c in 0..cols {
                let p = Point2::new(margin + c as f32 * pitch, margin + r as f32 * pitch);
                fill_circle(&mut img, p, radius, [20, 20, 20]);
                centers.push(p);
            }
        }
        (img, centers)
    }

    #[test]
    fn finds_ordered_circle_centres() {
        let (img, centers) = board(3, 4, 30.0, 6.0);
        let finder = CircleGridTargetFinder::new(CircleGridParams::new(3, 4)).expect("finder");
        let features = finder.find_target_features(&img).expect("features");
        assert_eq!(features.len(), 12);
        for (id, pts) in features.iter() {
            let expected = centers[id as usize];
            assert_eq!(pts.len(), 1);
            assert_relative_eq!(pts[0].x, expected.x, epsilon = 0.5);
            assert_relative_eq!(pts[0].y, expected.y, epsilon = 0.5);
        }
    }

    #[test]
    fn light_polarity_uses_inverted_mask() {
        let (mut img, _) = board(2, 3, 24.0, 5.0);
        for v in img.data.iter_mut() {
            *v = 255 - *v;
        }
        let mut params = CircleGridParams::new(2, 3);
        params.polarity = CirclePolarity::Light;
        let finder = CircleGridTargetFinder::new(params).expect("finder");
        assert_eq!(finder.find_target_features(&img).expect("features").len(), 6);
    }

    #[test]
    fn missing_circles_are_target_not_found() {
        let (img, _) = board(3, 3, 30.0, 6.0);
        let finder = CircleGridTargetFinder::new(CircleGridParams::new(4, 4)).expect("finder");
        match finder.find_target_features(&img) {
            Err(FinderError::TargetNotFound(msg)) => assert!(msg.contains("9 of 16"), "{msg}"),
            other => panic!("unexpected: {other:?}"),
        }

        let blank = BgrImage::new(64, 64);
        assert!(matches!(
            finder.find_target_features(&blank),
            Err(FinderError::TargetNotFound(_))
        ));
    }

    #[test]
    fn tiny_images_are_rejected() {
        let finder = CircleGridTargetFinder::new(CircleGridParams::new(4, 5)).expect("finder");
        assert!(matches!(
            finder.find_target_features(&BgrImage::new(6, 6)),
            Err(FinderError::ImageTooSmall { .. })
        ));
    }

    #[test]
    fn spurious_blobs_are_outvoted_by_area() {
        let (mut img, _) = board(2, 3, 40.0, 7.0);
        // A small speck and a large smudge, both valid shapes.
        fill_circle(&mut img, Point2::new(20.0, 100.0), 2.5, [20, 20, 20]);
        fill_circle(&mut img, Point2::new(140.0, 30.0), 14.0, [20, 20, 20]);
        let finder = CircleGridTargetFinder::new(CircleGridParams::new(2, 3)).expect("finder");
        let features = finder.find_target_features(&img).expect("features");
        assert_eq!(features.len(), 6);
    }

    #[test]
    fn drawing_marks_every_feature() {
        let (img, _) = board(2, 2, 30.0, 5.0);
        let finder = CircleGridTargetFinder::new(CircleGridParams::new(2, 2)).expect("finder");
        let features = finder.find_target_features(&img).expect("features");
        let drawn = finder
            .draw_target_features(&img, &features)
            .expect("drawn");
        assert_eq!((drawn.width, drawn.height), (img.width, img.height));
        assert_ne!(drawn, img);
        let origin = features.get(0).expect("origin")[0];
        assert_eq!(
            drawn.pixel(origin.x.round() as usize, origin.y.round() as usize),
            [255, 255, 255]
        );
    }

    #[test]
    fn config_section_builds_finder() {
        let section = json!({
            "type": CIRCLE_GRID_FINDER,
            "rows": 4,
            "cols": 6,
            "polarity": "light",
            "threshold": 90
        });
        let finder = CircleGridTargetFinder::from_config(&section).expect("finder");
        assert_eq!(finder.name(), CIRCLE_GRID_FINDER);

        let bad = json!({ "type": CIRCLE_GRID_FINDER, "rows": 1, "cols": 6 });
        assert!(matches!(
            CircleGridTargetFinder::from_config(&bad),
            Err(FinderError::InvalidParams(_))
        ));

        let malformed = json!({ "type": CIRCLE_GRID_FINDER, "rows": "four" });
        assert!(matches!(
            CircleGridTargetFinder::from_config(&malformed),
            Err(FinderError::Params(_))
        ));
    }
}
