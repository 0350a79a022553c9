//! Minimal raster primitives for annotation overlays.
//!
//! All primitives clip at the image border.

use nalgebra::Point2;

use crate::frame::BgrImage;

/// Colour in B, G, R order.
pub type Bgr = [u8; 3];

/// Bresenham line between two points (rounded to the pixel grid).
pub fn draw_line(img: &mut BgrImage, from: Point2<f32>, to: Point2<f32>, color: Bgr) {
    let (mut x0, mut y0) = (from.x.round() as i32, from.y.round() as i32);
    let (x1, y1) = (to.x.round() as i32, to.y.round() as i32);
    let dx = (x1 - x0).abs();
    let dy = -(y1 - y0).abs();
    let sx = if x0 < x1 { 1 } else { -1 };
    let sy = if y0 < y1 { 1 } else { -1 };
    let mut err = dx + dy;
    loop {
        img.put_pixel(x0, y0, color);
        if x0 == x1 && y0 == y1 {
            break;
        }
        let e2 = 2 * err;
        if e2 >= dy {
            err += dy;
            x0 += sx;
        }
        if e2 <= dx {
            err += dx;
            y0 += sy;
        }
    }
}

/// Midpoint circle outline.
pub fn draw_circle(img: &mut BgrImage, center: Point2<f32>, radius: f32, color: Bgr) {
    let (cx, cy) = (center.x.round() as i32, center.y.round() as i32);
    let r = radius.round().max(0.0) as i32;
    let mut x = r;
    let mut y = 0;
    let mut err = 1 - r;
    while x >= y {
        for (px, py) in [
            (x, y),
            (y, x),
            (-y, x),
            (-x, y),
            (-x, -y),
            (-y, -x),
            (y, -x),
            (x, -y),
        ] {
            img.put_pixel(cx + px, cy + py, color);
        }
        y += 1;
        if err < 0 {
            err += 2 * y + 1;
        } else {
            x -= 1;
            err += 2 * (y - x) + 1;
        }
    }
}

pub fn fill_circle(img: &mut BgrImage, center: Point2<f32>, radius: f32, color: Bgr) {
    let r = radius.max(0.0);
    let r2 = r * r;
    let (x0, x1) = ((center.x - r).floor() as i32, (center.x + r).ceil() as i32);
    let (y0, y1) = ((center.y - r).floor() as i32, (center.y + r).ceil() as i32);
    for y in y0..=y1 {
        for x in x0..=x1 {
            let dx = x as f32 - center.x;
            let dy = y as f32 - center.y;
            if dx * dx + dy * dy <= r2 {
                img.put_pixel(x, y, color);
            }
        }
    }
}

/// Axis-aligned `+` marker with arms of length `half`.
pub fn draw_cross(img: &mut BgrImage, center: Point2<f32>, half: f32, color: Bgr) {
    draw_line(
        img,
        Point2::new(center.x - half, center.y),
        Point2::new(center.x + half, center.y),
        color,
    );
    draw_line(
        img,
        Point2::new(center.x, center.y - half),
        Point2::new(center.x, center.y + half),
        color,
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    const RED: Bgr = [0, 0, 255];

    fn lit(img: &BgrImage) -> usize {
        img.data.chunks_exact(3).filter(|p| *p == RED).count()
    }

    #[test]
    fn line_covers_both_endpoints() {
        let mut img = BgrImage::new(10, 10);
        draw_line(&mut img, Point2::new(1.0, 1.0), Point2::new(8.0, 5.0), RED);
        assert_eq!(img.pixel(1, 1), RED);
        assert_eq!(img.pixel(8, 5), RED);
        assert_eq!(lit(&img), 8);
    }

    #[test]
    fn primitives_clip_at_the_border() {
        let mut img = BgrImage::new(8, 8);
        draw_line(&mut img, Point2::new(-20.0, 3.0), Point2::new(30.0, 3.0), RED);
        assert_eq!(lit(&img), 8);

        let mut img = BgrImage::new(8, 8);
        draw_circle(&mut img, Point2::new(0.0, 0.0), 3.0, RED);
        fill_circle(&mut img, Point2::new(7.0, 7.0), 2.0, RED);
        assert!(lit(&img) > 0);
    }

    #[test]
    fn circle_outline_is_symmetric() {
        let mut img = BgrImage::new(21, 21);
        draw_circle(&mut img, Point2::new(10.0, 10.0), 5.0, RED);
        for (x, y) in [(15, 10), (5, 10), (10, 15), (10, 5)] {
            assert_eq!(img.pixel(x, y), RED, "({x},{y})");
        }
        assert_eq!(img.pixel(10, 10), [0, 0, 0]);
    }

    #[test]
    fn filled_circle_contains_centre() {
        let mut img = BgrImage::new(9, 9);
        fill_circle(&mut img, Point2::new(4.0, 4.0), 2.0, RED);
        assert_eq!(img.pixel(4, 4), RED);
        assert_eq!(img.pixel(4, 6), RED);
        assert_eq!(img.pixel(6, 6), [0, 0, 0]);
    }
}
