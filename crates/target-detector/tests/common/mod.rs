#![allow(dead_code)]

/// 16-bit mono image of a `rows × cols` grid of dark discs.
///
/// Background is 5000, discs are 1000, with a faint horizontal ramp so the
/// frame spans the whole 1000..5000 range.
pub struct DotGrid {
    pub width: u32,
    pub height: u32,
    pub samples: Vec<u16>,
}

pub const PITCH: f32 = 30.0;
pub const RADIUS: f32 = 6.0;

pub fn dot_grid(rows: usize, cols: usize) -> DotGrid {
    let margin = 2.0 * PITCH;
    let width = (2.0 * margin + PITCH * (cols - 1) as f32) as u32;
    let height = (2.0 * margin + PITCH * (rows - 1) as f32) as u32;

    let mut samples = Vec::with_capacity((width * height) as usize);
    for y in 0..height {
        for x in 0..width {
            let (fx, fy) = (x as f32, y as f32);
            let c = ((fx - margin) / PITCH).round().clamp(0.0, (cols - 1) as f32);
            let r = ((fy - margin) / PITCH).round().clamp(0.0, (rows - 1) as f32);
            let (cx, cy) = (margin + c * PITCH, margin + r * PITCH);
            let inside = (fx - cx).powi(2) + (fy - cy).powi(2) <= RADIUS * RADIUS;
            let value = if inside {
                1000
            } else {
                // 4800..5000 across the row.
                4800 + (200 * x / (width - 1)) as u16
            };
            samples.push(value);
        }
    }
    DotGrid {
        width,
        height,
        samples,
    }
}

pub fn blank(width: u32, height: u32) -> Vec<u16> {
    vec![3000; (width * height) as usize]
}
