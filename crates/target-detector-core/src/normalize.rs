//! Conversion of arbitrary encodings into the canonical 8-bit BGR image.
//!
//! 8-bit sources only change channel order (grayscale is replicated, alpha is
//! dropped, Bayer mosaics are demosaiced); signed 8-bit samples are shifted by
//! 128 so that `-128` maps to 0. Everything else is min–max rescaled to
//! `0..=255` first, over the finite samples of the channels that reach the
//! output (alpha is never part of the range). A constant frame maps to all
//! zeros; non-finite samples saturate (`NaN` and `-inf` to 0, `+inf` to 255).

#[cfg(feature = "tracing")]
use tracing::instrument;

use crate::encoding::{BayerPattern, ChannelLayout, SampleType};
use crate::frame::{BgrImage, CanonicalFrame, DecodeError, ImageView, RawFrame};

/// Normalize a validated view. Never fails.
#[cfg_attr(
    feature = "tracing",
    instrument(
        level = "debug",
        skip(src),
        fields(width = src.width, height = src.height, encoding = %src.encoding)
    )
)]
pub fn normalize(src: &ImageView<'_>) -> BgrImage {
    let layout = src.encoding.layout;
    match src.encoding.sample {
        SampleType::U8 | SampleType::I8 => {
            let mut packed = pack_u8(src);
            if src.encoding.sample == SampleType::I8 {
                packed.iter_mut().for_each(|b| *b ^= 0x80);
            }
            match layout {
                ChannelLayout::Bayer(pattern) => demosaic(src.width, src.height, pattern, &packed),
                _ => reorder_to_bgr(src.width, src.height, layout, &packed),
            }
        }
        _ => {
            let layout = match layout {
                // A deep mosaic is treated as plain intensity.
                ChannelLayout::Bayer(_) => ChannelLayout::Mono,
                other => other,
            };
            let rescaled = rescale_min_max(src, layout);
            reorder_to_bgr(src.width, src.height, layout, &rescaled)
        }
    }
}

/// Validate a bus message and normalize it, keeping its header.
pub fn normalize_frame(raw: &RawFrame) -> Result<CanonicalFrame, DecodeError> {
    let view = raw.view()?;
    Ok(CanonicalFrame {
        header: raw.header.clone(),
        image: normalize(&view),
    })
}

fn pack_u8(src: &ImageView<'_>) -> Vec<u8> {
    let row_bytes = src.width * src.encoding.bytes_per_pixel();
    let mut out = Vec::with_capacity(row_bytes * src.height);
    for y in 0..src.height {
        out.extend_from_slice(src.row(y));
    }
    out
}

fn rescale_min_max(src: &ImageView<'_>, layout: ChannelLayout) -> Vec<u8> {
    let channels = src.encoding.channels();
    let per_row = src.width * channels;
    let mut samples = Vec::with_capacity(per_row * src.height);
    for y in 0..src.height {
        samples.extend((0..per_row).map(|k| src.sample(y, k)));
    }

    let pick = bgr_pick(layout);
    let (lo, hi) = samples
        .iter()
        .enumerate()
        .filter(|&(i, v)| v.is_finite() && pick.contains(&(i % channels)))
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), (_, &v)| {
            (lo.min(v), hi.max(v))
        });

    let range = hi - lo;
    if !(range.is_finite() && range > 0.0) {
        return vec![0; samples.len()];
    }
    let scale = 255.0 / range;
    samples
        .iter()
        .map(|&v| {
            if v.is_nan() {
                0
            } else {
                ((v - lo) * scale).round().clamp(0.0, 255.0) as u8
            }
        })
        .collect()
}

/// Source channel indices read for B, G, R.
fn bgr_pick(layout: ChannelLayout) -> [usize; 3] {
    match layout {
        ChannelLayout::Mono | ChannelLayout::Bayer(_) => [0, 0, 0],
        ChannelLayout::Generic(1) | ChannelLayout::Generic(2) => [0, 0, 0],
        ChannelLayout::Bgr | ChannelLayout::Bgra | ChannelLayout::Generic(_) => [0, 1, 2],
        ChannelLayout::Rgb | ChannelLayout::Rgba => [2, 1, 0],
    }
}

fn reorder_to_bgr(width: usize, height: usize, layout: ChannelLayout, packed: &[u8]) -> BgrImage {
    let channels = layout.channels();
    let pick = bgr_pick(layout);

    if channels == 3 && pick == [0, 1, 2] {
        return BgrImage {
            width,
            height,
            data: packed.to_vec(),
        };
    }

    let mut data = Vec::with_capacity(width * height * 3);
    for px in packed.chunks_exact(channels) {
        data.extend_from_slice(&[px[pick[0]], px[pick[1]], px[pick[2]]]);
    }
    BgrImage {
        width,
        height,
        data,
    }
}

/// Bilinear-style demosaic: each missing colour is the mean of the same-colour
/// sites in the 3x3 neighbourhood; the sensed colour is kept as is.
fn demosaic(width: usize, height: usize, pattern: BayerPattern, mosaic: &[u8]) -> BgrImage {
    let mut out = BgrImage::new(width, height);
    for y in 0..height {
        for x in 0..width {
            let mut sum = [0u32; 3];
            let mut count = [0u32; 3];
            for ny in y.saturating_sub(1)..=(y + 1).min(height - 1) {
                for nx in x.saturating_sub(1)..=(x + 1).min(width - 1) {
                    let c = pattern.channel_at(nx, ny);
                    sum[c] += mosaic[ny * width + nx] as u32;
                    count[c] += 1;
                }
            }
            let own = pattern.channel_at(x, y);
            let mut bgr = [0u8; 3];
            for c in 0..3 {
                bgr[c] = if c == own {
                    mosaic[y * width + x]
                } else if count[c] > 0 {
                    ((sum[c] + count[c] / 2) / count[c]) as u8
                } else {
                    0
                };
            }
            let i = (y * width + x) * 3;
            out.data[i..i + 3].copy_from_slice(&bgr);
        }
    }
    out
}
