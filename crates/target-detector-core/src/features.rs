use std::collections::BTreeMap;

use nalgebra::Point2;
use serde::{Deserialize, Serialize};

/// Target features located in one canonical image.
///
/// Keyed by feature id (e.g. a circle index or a ChArUco corner id); one id may
/// carry several points (e.g. the four corners of a marker). The pipeline only
/// passes this from the finder back into the same finder's renderer.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct TargetFeatures {
    points: BTreeMap<u32, Vec<Point2<f32>>>,
}

impl TargetFeatures {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an observation for `id`.
    pub fn insert(&mut self, id: u32, point: Point2<f32>) {
        self.points.entry(id).or_default().push(point);
    }

    pub fn get(&self, id: u32) -> Option<&[Point2<f32>]> {
        self.points.get(&id).map(Vec::as_slice)
    }

    /// Iterate in ascending id order.
    pub fn iter(&self) -> impl Iterator<Item = (u32, &[Point2<f32>])> + '_ {
        self.points.iter().map(|(&id, pts)| (id, pts.as_slice()))
    }

    /// Number of distinct feature ids.
    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Total number of points over all ids.
    pub fn point_count(&self) -> usize {
        self.points.values().map(Vec::len).sum()
    }
}

impl FromIterator<(u32, Point2<f32>)> for TargetFeatures {
    fn from_iter<I: IntoIterator<Item = (u32, Point2<f32>)>>(iter: I) -> Self {
        let mut features = TargetFeatures::new();
        for (id, p) in iter {
            features.insert(id, p);
        }
        features
    }
}
