//! Conversions between image files and [`RawFrame`]s.
//!
//! Decoded images keep their native depth: 16-bit PNG/TIFF becomes `mono16`
//! or `rgb16`, float images become `32FC3` (BGR order), so the frames reach
//! the pipeline the way a camera driver would deliver them.

use std::path::Path;

use image::{DynamicImage, ImageBuffer, Luma, Rgb, Rgba};

use target_detector_core::{ChannelLayout, Encoding, Header, RawFrame, SampleType};

#[derive(thiserror::Error, Debug)]
pub enum ImageIoError {
    #[error(transparent)]
    Image(#[from] image::ImageError),
}

/// Decode an image file into a frame carrying `header`.
pub fn load_raw_frame(path: impl AsRef<Path>, header: Header) -> Result<RawFrame, ImageIoError> {
    let img = image::open(path)?;
    Ok(raw_from_dynamic(&img, header))
}

fn pack_u16(samples: &[u16]) -> Vec<u8> {
    samples.iter().flat_map(|v| v.to_le_bytes()).collect()
}

/// Wrap a decoded image without reducing its depth.
pub fn raw_from_dynamic(img: &DynamicImage, header: Header) -> RawFrame {
    let (w, h) = (img.width(), img.height());
    let frame = |encoding: Encoding, data: Vec<u8>| {
        RawFrame::new(header.clone(), w, h, encoding, data)
    };

    match img {
        DynamicImage::ImageLuma8(b) => frame(Encoding::MONO8, b.as_raw().clone()),
        DynamicImage::ImageLumaA8(_) => frame(Encoding::MONO8, img.to_luma8().into_raw()),
        DynamicImage::ImageRgb8(b) => frame(Encoding::RGB8, b.as_raw().clone()),
        DynamicImage::ImageRgba8(b) => frame(
            Encoding::new(ChannelLayout::Rgba, SampleType::U8),
            b.as_raw().clone(),
        ),
        DynamicImage::ImageLuma16(b) => frame(Encoding::MONO16, pack_u16(b.as_raw())),
        DynamicImage::ImageLumaA16(_) => frame(Encoding::MONO16, pack_u16(&img.to_luma16())),
        DynamicImage::ImageRgb16(b) => frame(
            Encoding::new(ChannelLayout::Rgb, SampleType::U16),
            pack_u16(b.as_raw()),
        ),
        DynamicImage::ImageRgba16(b) => frame(
            Encoding::new(ChannelLayout::Rgba, SampleType::U16),
            pack_u16(b.as_raw()),
        ),
        DynamicImage::ImageRgb32F(_) | DynamicImage::ImageRgba32F(_) => {
            let rgb = img.to_rgb32f();
            let data = rgb
                .as_raw()
                .chunks_exact(3)
                .flat_map(|px| [px[2], px[1], px[0]])
                .flat_map(f32::to_le_bytes)
                .collect();
            frame(Encoding::new(ChannelLayout::Generic(3), SampleType::F32), data)
        }
        _ => frame(Encoding::RGB8, img.to_rgb8().into_raw()),
    }
}

/// Convert a frame back into an `image` buffer for writing.
///
/// Returns `None` for encodings PNG cannot hold directly (Bayer, signed,
/// float, generic multi-channel) and for structurally invalid frames.
pub fn dynamic_from_raw(raw: &RawFrame) -> Option<DynamicImage> {
    let view = raw.view().ok()?;
    let (w, h) = (raw.width, raw.height);
    let channels = view.encoding.channels();
    let samples = view.width * channels;

    // Per-pixel source index of R, G, B, A within the packed layout.
    let order: &[usize] = match view.encoding.layout {
        ChannelLayout::Mono => &[0],
        ChannelLayout::Rgb => &[0, 1, 2],
        ChannelLayout::Bgr => &[2, 1, 0],
        ChannelLayout::Rgba => &[0, 1, 2, 3],
        ChannelLayout::Bgra => &[2, 1, 0, 3],
        _ => return None,
    };

    match view.encoding.sample {
        SampleType::U8 => {
            let mut data = Vec::with_capacity(view.height * samples);
            for y in 0..view.height {
                for px in view.row(y).chunks_exact(channels) {
                    data.extend(order.iter().map(|&i| px[i]));
                }
            }
            match order.len() {
                1 => ImageBuffer::<Luma<u8>, _>::from_raw(w, h, data)
                    .map(DynamicImage::ImageLuma8),
                3 => ImageBuffer::<Rgb<u8>, _>::from_raw(w, h, data)
                    .map(DynamicImage::ImageRgb8),
                _ => ImageBuffer::<Rgba<u8>, _>::from_raw(w, h, data)
                    .map(DynamicImage::ImageRgba8),
            }
        }
        SampleType::U16 => {
            let mut data = Vec::with_capacity(view.height * samples);
            for y in 0..view.height {
                for x in 0..view.width {
                    let base = x * channels;
                    data.extend(order.iter().map(|&i| view.sample(y, base + i) as u16));
                }
            }
            match order.len() {
                1 => ImageBuffer::<Luma<u16>, _>::from_raw(w, h, data)
                    .map(DynamicImage::ImageLuma16),
                3 => ImageBuffer::<Rgb<u16>, _>::from_raw(w, h, data)
                    .map(DynamicImage::ImageRgb16),
                _ => ImageBuffer::<Rgba<u16>, _>::from_raw(w, h, data)
                    .map(DynamicImage::ImageRgba16),
            }
        }
        _ => None,
    }
}
