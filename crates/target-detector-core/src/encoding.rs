//! Pixel encoding tags.
//!
//! Tags follow the `sensor_msgs/Image` vocabulary (`mono16`, `bgr8`,
//! `bayer_rggb8`, `32FC1`, ...). Parsing turns the free-form string carried by
//! a [`RawFrame`](crate::RawFrame) into a sample type plus a channel layout.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Storage type of a single channel sample.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub enum SampleType {
    U8,
    I8,
    U16,
    I16,
    I32,
    F32,
    F64,
}

impl SampleType {
    /// Size of one sample in bytes.
    #[inline]
    pub fn size(self) -> usize {
        match self {
            SampleType::U8 | SampleType::I8 => 1,
            SampleType::U16 | SampleType::I16 => 2,
            SampleType::I32 | SampleType::F32 => 4,
            SampleType::F64 => 8,
        }
    }

    #[inline]
    pub fn bit_depth(self) -> u32 {
        self.size() as u32 * 8
    }

    fn cv_prefix(self) -> &'static str {
        match self {
            SampleType::U8 => "8U",
            SampleType::I8 => "8S",
            SampleType::U16 => "16U",
            SampleType::I16 => "16S",
            SampleType::I32 => "32S",
            SampleType::F32 => "32F",
            SampleType::F64 => "64F",
        }
    }
}

/// 2x2 colour filter array arrangement, named by the top-left quad in row-major order.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub enum BayerPattern {
    Rggb,
    Bggr,
    Gbrg,
    Grbg,
}

impl BayerPattern {
    /// BGR channel index (0 = B, 1 = G, 2 = R) sensed at pixel `(x, y)`.
    #[inline]
    pub fn channel_at(self, x: usize, y: usize) -> usize {
        let quad = (y & 1) * 2 + (x & 1);
        let layout: [usize; 4] = match self {
            BayerPattern::Rggb => [2, 1, 1, 0],
            BayerPattern::Bggr => [0, 1, 1, 2],
            BayerPattern::Gbrg => [1, 0, 2, 1],
            BayerPattern::Grbg => [1, 2, 0, 1],
        };
        layout[quad]
    }

    fn tag(self) -> &'static str {
        match self {
            BayerPattern::Rggb => "rggb",
            BayerPattern::Bggr => "bggr",
            BayerPattern::Gbrg => "gbrg",
            BayerPattern::Grbg => "grbg",
        }
    }
}

/// Channel semantics of an encoding.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub enum ChannelLayout {
    Mono,
    Bgr,
    Rgb,
    Bgra,
    Rgba,
    Bayer(BayerPattern),
    /// OpenCV-style `xxUCn` tags with no colour semantics.
    Generic(u8),
}

impl ChannelLayout {
    pub fn channels(self) -> usize {
        match self {
            ChannelLayout::Mono | ChannelLayout::Bayer(_) => 1,
            ChannelLayout::Bgr | ChannelLayout::Rgb => 3,
            ChannelLayout::Bgra | ChannelLayout::Rgba => 4,
            ChannelLayout::Generic(n) => n as usize,
        }
    }
}

/// Parsed encoding tag.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub struct Encoding {
    pub layout: ChannelLayout,
    pub sample: SampleType,
}

impl Encoding {
    pub const BGR8: Encoding = Encoding::new(ChannelLayout::Bgr, SampleType::U8);
    pub const RGB8: Encoding = Encoding::new(ChannelLayout::Rgb, SampleType::U8);
    pub const MONO8: Encoding = Encoding::new(ChannelLayout::Mono, SampleType::U8);
    pub const MONO16: Encoding = Encoding::new(ChannelLayout::Mono, SampleType::U16);

    pub const fn new(layout: ChannelLayout, sample: SampleType) -> Self {
        Self { layout, sample }
    }

    #[inline]
    pub fn channels(&self) -> usize {
        self.layout.channels()
    }

    /// Bits per channel sample.
    #[inline]
    pub fn bit_depth(&self) -> u32 {
        self.sample.bit_depth()
    }

    #[inline]
    pub fn bytes_per_pixel(&self) -> usize {
        self.channels() * self.sample.size()
    }
}

/// Error returned for tags outside the supported vocabulary.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
#[error("unsupported image encoding '{0}'")]
pub struct UnknownEncoding(pub String);

impl FromStr for Encoding {
    type Err = UnknownEncoding;

    fn from_str(tag: &str) -> Result<Self, Self::Err> {
        use ChannelLayout::*;
        use SampleType::*;

        let named = match tag {
            "mono8" => Some(Encoding::new(Mono, U8)),
            "mono16" => Some(Encoding::new(Mono, U16)),
            "bgr8" => Some(Encoding::new(Bgr, U8)),
            "rgb8" => Some(Encoding::new(Rgb, U8)),
            "bgra8" => Some(Encoding::new(Bgra, U8)),
            "rgba8" => Some(Encoding::new(Rgba, U8)),
            "bgr16" => Some(Encoding::new(Bgr, U16)),
            "rgb16" => Some(Encoding::new(Rgb, U16)),
            "bgra16" => Some(Encoding::new(Bgra, U16)),
            "rgba16" => Some(Encoding::new(Rgba, U16)),
            _ => None,
        };
        if let Some(enc) = named {
            return Ok(enc);
        }

        if let Some(rest) = tag.strip_prefix("bayer_") {
            return parse_bayer(rest).ok_or_else(|| UnknownEncoding(tag.to_string()));
        }

        parse_cv_tag(tag).ok_or_else(|| UnknownEncoding(tag.to_string()))
    }
}

fn parse_bayer(rest: &str) -> Option<Encoding> {
    if rest.len() < 5 || !rest.is_char_boundary(4) {
        return None;
    }
    let (pattern, depth) = rest.split_at(4);
    let pattern = match pattern {
        "rggb" => BayerPattern::Rggb,
        "bggr" => BayerPattern::Bggr,
        "gbrg" => BayerPattern::Gbrg,
        "grbg" => BayerPattern::Grbg,
        _ => return None,
    };
    let sample = match depth {
        "8" => SampleType::U8,
        "16" => SampleType::U16,
        _ => return None,
    };
    Some(Encoding::new(ChannelLayout::Bayer(pattern), sample))
}

fn parse_cv_tag(tag: &str) -> Option<Encoding> {
    let (prefix, channels) = tag.split_once('C')?;
    let sample = match prefix {
        "8U" => SampleType::U8,
        "8S" => SampleType::I8,
        "16U" => SampleType::U16,
        "16S" => SampleType::I16,
        "32S" => SampleType::I32,
        "32F" => SampleType::F32,
        "64F" => SampleType::F64,
        _ => return None,
    };
    let channels: u8 = channels.parse().ok()?;
    if !(1..=4).contains(&channels) {
        return None;
    }
    Some(Encoding::new(ChannelLayout::Generic(channels), sample))
}

impl fmt::Display for Encoding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let depth = self.sample.bit_depth();
        match self.layout {
            ChannelLayout::Mono => write!(f, "mono{depth}"),
            ChannelLayout::Bgr => write!(f, "bgr{depth}"),
            ChannelLayout::Rgb => write!(f, "rgb{depth}"),
            ChannelLayout::Bgra => write!(f, "bgra{depth}"),
            ChannelLayout::Rgba => write!(f, "rgba{depth}"),
            ChannelLayout::Bayer(p) => write!(f, "bayer_{}{depth}", p.tag()),
            ChannelLayout::Generic(n) => write!(f, "{}C{n}", self.sample.cv_prefix()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_named_tags() {
        let enc: Encoding = "mono16".parse().expect("mono16");
        assert_eq!(enc, Encoding::MONO16);
        assert_eq!(enc.bit_depth(), 16);
        assert_eq!(enc.channels(), 1);

        let enc: Encoding = "rgba8".parse().expect("rgba8");
        assert_eq!(enc.channels(), 4);
        assert_eq!(enc.bytes_per_pixel(), 4);
    }

    #[test]
    fn parses_bayer_and_cv_tags() {
        let enc: Encoding = "bayer_grbg16".parse().expect("bayer");
        assert_eq!(enc.layout, ChannelLayout::Bayer(BayerPattern::Grbg));
        assert_eq!(enc.sample, SampleType::U16);

        let enc: Encoding = "32FC3".parse().expect("32FC3");
        assert_eq!(enc.layout, ChannelLayout::Generic(3));
        assert_eq!(enc.bytes_per_pixel(), 12);
    }

    #[test]
    fn rejects_unknown_tags() {
        for tag in ["yuv422", "bayer_xxxx8", "bayer_rggb12", "16UC9", "", "C3"] {
            assert!(tag.parse::<Encoding>().is_err(), "{tag} should not parse");
        }
    }

    #[test]
    fn display_matches_parsed_tag() {
        for tag in ["mono8", "bgr16", "bayer_bggr8", "16SC1", "64FC1", "8UC4"] {
            let enc: Encoding = tag.parse().expect("parse");
            assert_eq!(enc.to_string(), tag);
        }
    }

    #[test]
    fn bayer_channel_map_covers_all_colours() {
        for p in [
            BayerPattern::Rggb,
            BayerPattern::Bggr,
            BayerPattern::Gbrg,
            BayerPattern::Grbg,
        ] {
            let mut seen = [0; 3];
            for (x, y) in [(0, 0), (1, 0), (0, 1), (1, 1)] {
                seen[p.channel_at(x, y)] += 1;
            }
            assert_eq!(seen, [1, 2, 1], "{p:?}");
        }
    }
}
