//! MPEG audio frame headers.
//!
//! A frame starts with an 11-bit sync word followed by version, layer,
//! bitrate, sample rate, padding and channel mode fields. Free-format
//! bitrates and reserved field values are rejected.

use crate::format::StreamFormat;

/// Length of a frame header in bytes.
pub const HEADER_LEN: usize = 4;

/// MPEG audio version.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum MpegVersion {
    /// MPEG-1.
    Mpeg1,
    /// MPEG-2 (low sampling frequencies).
    Mpeg2,
    /// MPEG-2.5 (unofficial extension).
    Mpeg25,
}

/// MPEG audio layer.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Layer {
    /// Layer I.
    L1,
    /// Layer II.
    L2,
    /// Layer III.
    L3,
}

/// Channel mode.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ChannelMode {
    /// Stereo.
    Stereo,
    /// Joint stereo.
    JointStereo,
    /// Dual channel.
    DualChannel,
    /// Single channel.
    Mono,
}

impl ChannelMode {
    /// Number of channels.
    pub const fn channels(&self) -> u16 {
        match self {
            Self::Mono => 1,
            _ => 2,
        }
    }
}

const BITRATES_V1_L1: [u32; 15] = [
    0, 32, 64, 96, 128, 160, 192, 224, 256, 288, 320, 352, 384, 416, 448,
];
const BITRATES_V1_L2: [u32; 15] = [
    0, 32, 48, 56, 64, 80, 96, 112, 128, 160, 192, 224, 256, 320, 384,
];
const BITRATES_V1_L3: [u32; 15] = [
    0, 32, 40, 48, 56, 64, 80, 96, 112, 128, 160, 192, 224, 256, 320,
];
const BITRATES_V2_L1: [u32; 15] = [
    0, 32, 48, 56, 64, 80, 96, 112, 128, 144, 160, 176, 192, 224, 256,
];
const BITRATES_V2_L23: [u32; 15] = [
    0, 8, 16, 24, 32, 40, 48, 56, 64, 80, 96, 112, 128, 144, 160,
];

/// A parsed frame header.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FrameHeader {
    /// MPEG version.
    pub version: MpegVersion,
    /// Layer.
    pub layer: Layer,
    /// Whether a 16-bit CRC follows the header.
    pub crc: bool,
    /// Bitrate in kbit/s.
    pub bitrate_kbps: u32,
    /// Sample rate in Hz.
    pub sample_rate: u32,
    /// Whether the frame carries a padding slot.
    pub padding: bool,
    /// Channel mode.
    pub channel_mode: ChannelMode,
}

impl FrameHeader {
    /// Parse a header from the first four bytes of `data`.
    pub fn parse(data: &[u8]) -> Option<Self> {
        let bytes: [u8; HEADER_LEN] = data.get(..HEADER_LEN)?.try_into().ok()?;

        if bytes[0] != 0xFF || bytes[1] & 0xE0 != 0xE0 {
            return None;
        }

        let version = match (bytes[1] >> 3) & 0x03 {
            0b00 => MpegVersion::Mpeg25,
            0b10 => MpegVersion::Mpeg2,
            0b11 => MpegVersion::Mpeg1,
            _ => return None,
        };
        let layer = match (bytes[1] >> 1) & 0x03 {
            0b01 => Layer::L3,
            0b10 => Layer::L2,
            0b11 => Layer::L1,
            _ => return None,
        };
        let crc = bytes[1] & 0x01 == 0;

        let bitrate_index = (bytes[2] >> 4) as usize;
        if bitrate_index == 0 || bitrate_index == 15 {
            return None;
        }
        let table = match (version, layer) {
            (MpegVersion::Mpeg1, Layer::L1) => &BITRATES_V1_L1,
            (MpegVersion::Mpeg1, Layer::L2) => &BITRATES_V1_L2,
            (MpegVersion::Mpeg1, Layer::L3) => &BITRATES_V1_L3,
            (_, Layer::L1) => &BITRATES_V2_L1,
            (_, _) => &BITRATES_V2_L23,
        };
        let bitrate_kbps = table[bitrate_index];

        let rate_index = ((bytes[2] >> 2) & 0x03) as usize;
        let base_rates = match version {
            MpegVersion::Mpeg1 => [44100, 48000, 32000],
            MpegVersion::Mpeg2 => [22050, 24000, 16000],
            MpegVersion::Mpeg25 => [11025, 12000, 8000],
        };
        let sample_rate = *base_rates.get(rate_index)?;

        let padding = (bytes[2] >> 1) & 0x01 == 1;
        let channel_mode = match bytes[3] >> 6 {
            0b00 => ChannelMode::Stereo,
            0b01 => ChannelMode::JointStereo,
            0b10 => ChannelMode::DualChannel,
            _ => ChannelMode::Mono,
        };

        Some(Self {
            version,
            layer,
            crc,
            bitrate_kbps,
            sample_rate,
            padding,
            channel_mode,
        })
    }

    /// Number of channels.
    pub const fn channels(&self) -> u16 {
        self.channel_mode.channels()
    }

    /// Rate and channel count of the frame.
    pub const fn stream_format(&self) -> StreamFormat {
        StreamFormat::new(self.sample_rate, self.channels())
    }

    /// Samples per channel in one frame.
    pub const fn samples_per_frame(&self) -> usize {
        match (self.layer, self.version) {
            (Layer::L1, _) => 384,
            (Layer::L2, _) | (Layer::L3, MpegVersion::Mpeg1) => 1152,
            (Layer::L3, _) => 576,
        }
    }

    /// Total frame length in bytes, header included.
    pub const fn frame_len(&self) -> usize {
        let bitrate = self.bitrate_kbps as usize * 1000;
        let rate = self.sample_rate as usize;
        let padding = self.padding as usize;
        match (self.layer, self.version) {
            (Layer::L1, _) => (12 * bitrate / rate + padding) * 4,
            (Layer::L2, _) | (Layer::L3, MpegVersion::Mpeg1) => 144 * bitrate / rate + padding,
            (Layer::L3, _) => 72 * bitrate / rate + padding,
        }
    }

    /// Layer III side information length in bytes.
    pub const fn side_info_len(&self) -> usize {
        match (self.version, self.channel_mode) {
            (MpegVersion::Mpeg1, ChannelMode::Mono) => 17,
            (MpegVersion::Mpeg1, _) => 32,
            (_, ChannelMode::Mono) => 9,
            (_, _) => 17,
        }
    }

    /// Whether another header plausibly belongs to the same stream.
    pub fn is_compatible(&self, other: &FrameHeader) -> bool {
        self.version == other.version
            && self.layer == other.layer
            && self.sample_rate == other.sample_rate
    }
}

/// Encoder information carried in a leading Layer III "Xing"/"Info" frame.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub struct InfoFrame {
    /// Encoder delay in samples, if a LAME extension is present.
    pub encoder_delay: Option<u32>,
}

const XING_FLAG_FRAMES: u32 = 0x1;
const XING_FLAG_BYTES: u32 = 0x2;
const XING_FLAG_TOC: u32 = 0x4;
const XING_FLAG_QUALITY: u32 = 0x8;

/// Parse an info frame. `frame` is the whole frame, header included.
pub fn parse_info_frame(header: &FrameHeader, frame: &[u8]) -> Option<InfoFrame> {
    if header.layer != Layer::L3 {
        return None;
    }

    let mut pos = HEADER_LEN + if header.crc { 2 } else { 0 } + header.side_info_len();
    let tag = frame.get(pos..pos + 4)?;
    if tag != b"Xing" && tag != b"Info" {
        return None;
    }
    pos += 4;

    let flags = u32::from_be_bytes(frame.get(pos..pos + 4)?.try_into().ok()?);
    pos += 4;
    if flags & XING_FLAG_FRAMES != 0 {
        pos += 4;
    }
    if flags & XING_FLAG_BYTES != 0 {
        pos += 4;
    }
    if flags & XING_FLAG_TOC != 0 {
        pos += 100;
    }
    if flags & XING_FLAG_QUALITY != 0 {
        pos += 4;
    }

    let mut info = InfoFrame::default();
    // LAME extension: 12-bit delay then 12-bit padding at offset 21
    if frame.get(pos..pos + 4) == Some(b"LAME".as_slice()) {
        if let Some(raw) = frame.get(pos + 21..pos + 23) {
            info.encoder_delay = Some(((raw[0] as u32) << 4) | ((raw[1] as u32) >> 4));
        }
    }
    Some(info)
}

/// Length of an ID3v2 tag at the start of `data`.
///
/// Returns `None` if `data` does not start with a complete ID3v2 header.
pub fn id3v2_len(data: &[u8]) -> Option<usize> {
    if data.len() < 10 || &data[..3] != b"ID3" {
        return None;
    }
    let size = data[6..10]
        .iter()
        .fold(0usize, |acc, b| (acc << 7) | (*b & 0x7F) as usize);
    let footer = if data[5] & 0x10 != 0 { 10 } else { 0 };
    Some(10 + size + footer)
}

/// Length of an ID3v1 trailer.
pub const ID3V1_LEN: usize = 128;
