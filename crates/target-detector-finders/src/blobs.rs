//! Connected components of a binary mask.

use nalgebra::Point2;

/// One 4-connected component.
#[derive(Clone, Debug, PartialEq)]
pub struct Blob {
    pub area: usize,
    pub centroid: Point2<f32>,
    /// Inclusive bounding box `[x0, y0, x1, y1]`.
    pub bbox: [usize; 4],
    pub touches_border: bool,
}

impl Blob {
    pub fn bbox_width(&self) -> usize {
        self.bbox[2] - self.bbox[0] + 1
    }

    pub fn bbox_height(&self) -> usize {
        self.bbox[3] - self.bbox[1] + 1
    }

    /// Area over bounding-box area; about 0.6–0.8 for rasterized discs.
    pub fn fill_ratio(&self) -> f32 {
        self.area as f32 / (self.bbox_width() * self.bbox_height()) as f32
    }

    /// Long over short bounding-box side, `>= 1`.
    pub fn aspect_ratio(&self) -> f32 {
        let (w, h) = (self.bbox_width() as f32, self.bbox_height() as f32);
        w.max(h) / w.min(h)
    }
}

/// Label the set pixels of `mask` (row-major, `width * height`).
pub(crate) fn find_blobs(mask: &[bool], width: usize, height: usize) -> Vec<Blob> {
    debug_assert_eq!(mask.len(), width * height);
    let mut visited = vec![false; mask.len()];
    let mut stack = Vec::new();
    let mut blobs = Vec::new();

    for start in 0..mask.len() {
        if !mask[start] || visited[start] {
            continue;
        }
        visited[start] = true;
        stack.push(start);

        let mut area = 0usize;
        let (mut sx, mut sy) = (0f64, 0f64);
        let mut bbox = [usize::MAX, usize::MAX, 0, 0];

        while let Some(idx) = stack.pop() {
            let (x, y) = (idx % width, idx / width);
            area += 1;
            sx += x as f64;
            sy += y as f64;
            bbox[0] = bbox[0].min(x);
            bbox[1] = bbox[1].min(y);
            bbox[2] = bbox[2].max(x);
            bbox[3] = bbox[3].max(y);

            let mut visit = |n: usize| {
                if mask[n] && !visited[n] {
                    visited[n] = true;
                    stack.push(n);
                }
            };
            if x > 0 {
                visit(idx - 1);
            }
            if x + 1 < width {
                visit(idx + 1);
            }
            if y > 0 {
                visit(idx - width);
            }
            if y + 1 < height {
                visit(idx + width);
            }
        }

        let touches_border =
            bbox[0] == 0 || bbox[1] == 0 || bbox[2] + 1 == width || bbox[3] + 1 == height;
        blobs.push(Blob {
            area,
            centroid: Point2::new((sx / area as f64) as f32, (sy / area as f64) as f32),
            bbox,
            touches_border,
        });
    }

    blobs
}
