//! Frame model: bus messages, validated views and the canonical BGR image.

use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};

use crate::encoding::{Encoding, SampleType, UnknownEncoding};

/// Acquisition time, seconds + nanoseconds since the Unix epoch.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Ord, PartialOrd, Hash, Serialize, Deserialize)]
pub struct Timestamp {
    pub secs: i64,
    pub nanos: u32,
}

impl Timestamp {
    pub fn now() -> Self {
        Self::from_system_time(SystemTime::now())
    }

    pub fn from_system_time(t: SystemTime) -> Self {
        match t.duration_since(UNIX_EPOCH) {
            Ok(d) => Self {
                secs: d.as_secs() as i64,
                nanos: d.subsec_nanos(),
            },
            Err(before) => {
                let d = before.duration();
                let mut secs = -(d.as_secs() as i64);
                let mut nanos = d.subsec_nanos();
                if nanos > 0 {
                    secs -= 1;
                    nanos = 1_000_000_000 - nanos;
                }
                Self { secs, nanos }
            }
        }
    }
}

/// Metadata that downstream consumers use to correlate published frames.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Header {
    pub seq: u64,
    pub stamp: Timestamp,
    /// Coordinate frame of the camera that produced the image.
    pub frame_id: String,
}

/// Frame-scoped failure to interpret a raw buffer.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum DecodeError {
    #[error(transparent)]
    UnsupportedEncoding(#[from] UnknownEncoding),

    #[error("invalid image dimensions (width={width}, height={height})")]
    InvalidDimensions { width: u32, height: u32 },

    #[error("row stride {step} is smaller than one row of pixels ({min} bytes)")]
    StrideTooSmall { step: usize, min: usize },

    #[error("image buffer too short (expected {expected} bytes, got {got})")]
    BufferTooShort { expected: usize, got: usize },
}

/// Image message as delivered by the bus. Read-only to the pipeline.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RawFrame {
    pub header: Header,
    pub width: u32,
    pub height: u32,
    /// Encoding tag, e.g. `mono16` or `bayer_rggb8`.
    pub encoding: String,
    pub is_bigendian: bool,
    /// Bytes per row, including any padding.
    pub step: usize,
    pub data: Vec<u8>,
}

impl RawFrame {
    /// Build a tightly packed little-endian frame.
    pub fn new(header: Header, width: u32, height: u32, encoding: Encoding, data: Vec<u8>) -> Self {
        Self {
            header,
            width,
            height,
            encoding: encoding.to_string(),
            is_bigendian: false,
            step: width as usize * encoding.bytes_per_pixel(),
            data,
        }
    }

    pub fn mono8(header: Header, width: u32, height: u32, data: Vec<u8>) -> Self {
        Self::new(header, width, height, Encoding::MONO8, data)
    }

    /// Build a `mono16` frame from native samples (stored little-endian).
    pub fn mono16(header: Header, width: u32, height: u32, samples: &[u16]) -> Self {
        let data = samples.iter().flat_map(|v| v.to_le_bytes()).collect();
        Self::new(header, width, height, Encoding::MONO16, data)
    }

    /// Validate the message and borrow it as a typed view.
    pub fn view(&self) -> Result<ImageView<'_>, DecodeError> {
        let encoding: Encoding = self.encoding.parse()?;
        if self.width == 0 || self.height == 0 {
            return Err(DecodeError::InvalidDimensions {
                width: self.width,
                height: self.height,
            });
        }
        let width = self.width as usize;
        let height = self.height as usize;

        let row_bytes = width
            .checked_mul(encoding.bytes_per_pixel())
            .ok_or(DecodeError::InvalidDimensions {
                width: self.width,
                height: self.height,
            })?;
        if self.step < row_bytes {
            return Err(DecodeError::StrideTooSmall {
                step: self.step,
                min: row_bytes,
            });
        }
        let expected = self
            .step
            .checked_mul(height - 1)
            .and_then(|v| v.checked_add(row_bytes))
            .ok_or(DecodeError::InvalidDimensions {
                width: self.width,
                height: self.height,
            })?;
        if self.data.len() < expected {
            return Err(DecodeError::BufferTooShort {
                expected,
                got: self.data.len(),
            });
        }

        Ok(ImageView {
            width,
            height,
            step: self.step,
            encoding,
            big_endian: self.is_bigendian,
            data: &self.data,
        })
    }
}

/// Structurally valid, typed borrow of a raw frame's pixels.
#[derive(Clone, Copy, Debug)]
pub struct ImageView<'a> {
    pub width: usize,
    pub height: usize,
    pub step: usize,
    pub encoding: Encoding,
    pub big_endian: bool,
    pub data: &'a [u8],
}

impl ImageView<'_> {
    /// Bytes of row `y` without trailing padding.
    #[inline]
    pub fn row(&self, y: usize) -> &[u8] {
        let start = y * self.step;
        &self.data[start..start + self.width * self.encoding.bytes_per_pixel()]
    }

    /// Decode sample `k` of row `y` (`k` runs over `width * channels`).
    #[inline]
    pub fn sample(&self, y: usize, k: usize) -> f64 {
        let size = self.encoding.sample.size();
        let b = &self.row(y)[k * size..(k + 1) * size];
        macro_rules! read {
            ($t:ty, $n:literal) => {{
                let mut raw = [0u8; $n];
                raw.copy_from_slice(b);
                if self.big_endian {
                    <$t>::from_be_bytes(raw) as f64
                } else {
                    <$t>::from_le_bytes(raw) as f64
                }
            }};
        }
        match self.encoding.sample {
            SampleType::U8 => b[0] as f64,
            SampleType::I8 => b[0] as i8 as f64,
            SampleType::U16 => read!(u16, 2),
            SampleType::I16 => read!(i16, 2),
            SampleType::I32 => read!(i32, 4),
            SampleType::F32 => read!(f32, 4),
            SampleType::F64 => read!(f64, 8),
        }
    }
}

/// Row-major single-channel 8-bit image.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GrayImage {
    pub width: usize,
    pub height: usize,
    pub data: Vec<u8>,
}

impl GrayImage {
    #[inline]
    pub fn get(&self, x: usize, y: usize) -> u8 {
        self.data[y * self.width + x]
    }
}

/// Tightly packed 8-bit, 3-channel image in B, G, R order.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BgrImage {
    pub width: usize,
    pub height: usize,
    pub data: Vec<u8>, // len = w*h*3
}

impl BgrImage {
    pub fn new(width: usize, height: usize) -> Self {
        Self {
            width,
            height,
            data: vec![0; width * height * 3],
        }
    }

    /// Wrap an existing buffer; `None` if the length does not match.
    pub fn from_raw(width: usize, height: usize, data: Vec<u8>) -> Option<Self> {
        (data.len() == width.checked_mul(height)?.checked_mul(3)?).then_some(Self {
            width,
            height,
            data,
        })
    }

    #[inline]
    pub fn channels(&self) -> usize {
        3
    }

    #[inline]
    pub fn pixel(&self, x: usize, y: usize) -> [u8; 3] {
        let i = (y * self.width + x) * 3;
        [self.data[i], self.data[i + 1], self.data[i + 2]]
    }

    /// Write a pixel, ignoring coordinates outside the image.
    #[inline]
    pub fn put_pixel(&mut self, x: i32, y: i32, bgr: [u8; 3]) {
        if x < 0 || y < 0 || x as usize >= self.width || y as usize >= self.height {
            return;
        }
        let i = (y as usize * self.width + x as usize) * 3;
        self.data[i..i + 3].copy_from_slice(&bgr);
    }

    /// Luma conversion with BT.601 weights.
    pub fn to_gray(&self) -> GrayImage {
        let data = self
            .data
            .chunks_exact(3)
            .map(|p| {
                let y = 0.114 * p[0] as f32 + 0.587 * p[1] as f32 + 0.299 * p[2] as f32;
                y.round().clamp(0.0, 255.0) as u8
            })
            .collect();
        GrayImage {
            width: self.width,
            height: self.height,
            data,
        }
    }
}

/// Normalized image bound to the header of the raw frame it came from.
#[derive(Clone, Debug, PartialEq)]
pub struct CanonicalFrame {
    pub header: Header,
    pub image: BgrImage,
}

impl CanonicalFrame {
    /// Convert into a `bgr8` bus message carrying the same header.
    pub fn into_raw(self) -> RawFrame {
        RawFrame::new(
            self.header,
            self.image.width as u32,
            self.image.height as u32,
            Encoding::BGR8,
            self.image.data,
        )
    }
}
