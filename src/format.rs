//! Media format and capabilities types.
//!
//! This module provides the format vocabulary shared by the negotiator, the
//! decoding engine and the decoder session:
//!
//! - [`CapsValue<T>`]: A value that can be fixed, range, list, or any
//! - [`UpstreamCaps`] / [`StreamFormat`]: what the compressed stream carries
//! - [`CandidateCaps`] / [`CandidateList`]: what downstream is willing to accept
//! - [`SampleEncoding`]: a concrete PCM layout the engine can emit
//! - [`OutputCaps`]: the fixed description advertised downstream
//!
//! ```rust
//! use parallax_mpg123::format::{CandidateCaps, CandidateList, CapsValue};
//!
//! // Downstream prefers 24-bit, then any of 32/16-bit signed integer
//! let candidates = CandidateList::from(vec![
//!     CandidateCaps::integer(24, true),
//!     CandidateCaps::raw_int().with_width(CapsValue::List(vec![32, 16])),
//! ]);
//!
//! // Lists expand into one candidate per value, order preserved
//! assert_eq!(candidates.normalize().len(), 3);
//! ```

use std::fmt;

/// Media type of raw integer PCM.
pub const MEDIA_TYPE_INT: &str = "audio/x-raw-int";

/// Media type of raw floating point PCM.
pub const MEDIA_TYPE_FLOAT: &str = "audio/x-raw-float";

/// Sample rates an MPEG-1/2/2.5 audio stream can carry.
pub const MPEG_SAMPLE_RATES: [u32; 9] = [
    8000, 11025, 12000, 16000, 22050, 24000, 32000, 44100, 48000,
];

/// Maximum number of channels in an MPEG audio stream.
pub const MAX_CHANNELS: u16 = 2;

// ============================================================================
// CapsValue - constraint value for negotiation
// ============================================================================

/// A value that can be fixed, range, list, or any.
///
/// Downstream candidates use this for fields that may be left open. Only a
/// `Fixed` value counts as "specified" when picking a concrete encoding.
///
/// ```rust
/// use parallax_mpg123::format::CapsValue;
///
/// let range: CapsValue<u32> = CapsValue::Range { min: 16, max: 32 };
/// assert!(range.accepts(&24));
/// assert_eq!(range.as_fixed(), None);
/// ```
#[derive(Clone, Debug, PartialEq, Default)]
pub enum CapsValue<T> {
    /// Exact value (fully constrained).
    Fixed(T),
    /// Range of acceptable values (inclusive).
    Range {
        /// Minimum acceptable value.
        min: T,
        /// Maximum acceptable value.
        max: T,
    },
    /// List of acceptable values (ordered by preference, first is best).
    List(Vec<T>),
    /// Any value accepted (unconstrained).
    #[default]
    Any,
}

impl<T: Clone + Ord> CapsValue<T> {
    /// Check if a value is accepted by this constraint.
    pub fn accepts(&self, value: &T) -> bool {
        match self {
            Self::Fixed(v) => v == value,
            Self::Range { min, max } => value >= min && value <= max,
            Self::List(values) => values.contains(value),
            Self::Any => true,
        }
    }

    /// Get the fixed value if this is fixed.
    #[inline]
    pub fn as_fixed(&self) -> Option<&T> {
        match self {
            Self::Fixed(v) => Some(v),
            _ => None,
        }
    }

    /// Split a list into one fixed value per entry; anything else, including
    /// an empty list, is kept as is.
    fn expand(&self) -> Vec<Self> {
        match self {
            Self::List(values) if !values.is_empty() => {
                values.iter().cloned().map(Self::Fixed).collect()
            }
            other => vec![other.clone()],
        }
    }
}

impl<T: Clone + Ord> From<T> for CapsValue<T> {
    fn from(value: T) -> Self {
        Self::Fixed(value)
    }
}

impl<T: Clone + Ord> From<std::ops::RangeInclusive<T>> for CapsValue<T> {
    fn from(range: std::ops::RangeInclusive<T>) -> Self {
        let (min, max) = range.into_inner();
        Self::Range { min, max }
    }
}

// ============================================================================
// Media kinds and sample encodings
// ============================================================================

/// Numeric representation of raw PCM.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum MediaKind {
    /// Integer PCM (`audio/x-raw-int`).
    Integer,
    /// Floating point PCM (`audio/x-raw-float`).
    Float,
}

impl MediaKind {
    /// Resolve a media type tag. Returns `None` for non-PCM media types.
    pub fn from_media_type(media_type: &str) -> Option<Self> {
        match media_type {
            MEDIA_TYPE_INT => Some(Self::Integer),
            MEDIA_TYPE_FLOAT => Some(Self::Float),
            _ => None,
        }
    }

    /// The media type tag for this kind.
    pub const fn media_type(&self) -> &'static str {
        match self {
            Self::Integer => MEDIA_TYPE_INT,
            Self::Float => MEDIA_TYPE_FLOAT,
        }
    }
}

/// Byte order of multi-byte samples.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Endianness {
    /// Least significant byte first.
    Little,
    /// Most significant byte first.
    Big,
}

impl Endianness {
    /// Byte order of the host.
    pub const fn native() -> Self {
        if cfg!(target_endian = "big") {
            Self::Big
        } else {
            Self::Little
        }
    }

    /// Numeric caps value (1234 little, 4321 big).
    pub const fn value(&self) -> u32 {
        match self {
            Self::Little => 1234,
            Self::Big => 4321,
        }
    }

    const fn suffix(&self) -> &'static str {
        match self {
            Self::Little => "LE",
            Self::Big => "BE",
        }
    }
}

/// A concrete PCM sample layout the decoding engine can be configured to emit.
///
/// 24-bit encodings are packed (3 bytes per sample).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum SampleEncoding {
    /// Signed 16-bit integer.
    S16,
    /// Signed 24-bit integer.
    S24,
    /// Signed 32-bit integer.
    S32,
    /// Unsigned 16-bit integer.
    U16,
    /// Unsigned 24-bit integer.
    U24,
    /// Unsigned 32-bit integer.
    U32,
    /// 32-bit floating point.
    F32,
}

impl SampleEncoding {
    /// Every encoding this crate knows about.
    pub const ALL: [Self; 7] = [
        Self::S16,
        Self::S24,
        Self::S32,
        Self::U16,
        Self::U24,
        Self::U32,
        Self::F32,
    ];

    /// Map (kind, width, signedness) to an encoding.
    ///
    /// Signedness is ignored for floats. Returns `None` for combinations that
    /// have no encoding (8-bit, 64-bit float, odd widths).
    pub fn lookup(kind: MediaKind, width_bits: u32, signed: bool) -> Option<Self> {
        match (kind, width_bits, signed) {
            (MediaKind::Integer, 16, true) => Some(Self::S16),
            (MediaKind::Integer, 24, true) => Some(Self::S24),
            (MediaKind::Integer, 32, true) => Some(Self::S32),
            (MediaKind::Integer, 16, false) => Some(Self::U16),
            (MediaKind::Integer, 24, false) => Some(Self::U24),
            (MediaKind::Integer, 32, false) => Some(Self::U32),
            (MediaKind::Float, 32, _) => Some(Self::F32),
            _ => None,
        }
    }

    /// Sample width in bits.
    pub const fn width_bits(&self) -> u32 {
        match self {
            Self::S16 | Self::U16 => 16,
            Self::S24 | Self::U24 => 24,
            Self::S32 | Self::U32 | Self::F32 => 32,
        }
    }

    /// Bytes per sample (for one channel).
    pub const fn bytes_per_sample(&self) -> usize {
        self.width_bits() as usize / 8
    }

    /// Integer or float.
    pub const fn kind(&self) -> MediaKind {
        match self {
            Self::F32 => MediaKind::Float,
            _ => MediaKind::Integer,
        }
    }

    /// Whether samples are signed. Floats count as signed.
    pub const fn is_signed(&self) -> bool {
        !matches!(self, Self::U16 | Self::U24 | Self::U32)
    }

    /// Format name in native byte order, e.g. `S24LE`.
    pub fn format_name(&self) -> String {
        let prefix = match self.kind() {
            MediaKind::Float => 'F',
            MediaKind::Integer if self.is_signed() => 'S',
            MediaKind::Integer => 'U',
        };
        format!(
            "{}{}{}",
            prefix,
            self.width_bits(),
            Endianness::native().suffix()
        )
    }
}

impl fmt::Display for SampleEncoding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.format_name())
    }
}

// ============================================================================
// Upstream
// ============================================================================

/// Description of the incoming compressed stream, as parsed upstream.
///
/// Rate and channels are optional here because upstream may deliver an
/// incomplete description; [`StreamFormat`] is the validated form.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct UpstreamCaps {
    /// Sample rate in Hz.
    pub rate: Option<u32>,
    /// Number of channels.
    pub channels: Option<u16>,
}

impl UpstreamCaps {
    /// Create an empty description (no rate, no channels).
    pub fn new() -> Self {
        Self {
            rate: None,
            channels: None,
        }
    }

    /// Set the sample rate.
    pub fn with_rate(mut self, rate: u32) -> Self {
        self.rate = Some(rate);
        self
    }

    /// Set the channel count.
    pub fn with_channels(mut self, channels: u16) -> Self {
        self.channels = Some(channels);
        self
    }
}

impl Default for UpstreamCaps {
    fn default() -> Self {
        Self::new()
    }
}

impl From<StreamFormat> for UpstreamCaps {
    fn from(format: StreamFormat) -> Self {
        Self::new()
            .with_rate(format.sample_rate)
            .with_channels(format.channels)
    }
}

/// Sample rate and channel count of the compressed stream.
///
/// These are carried through unchanged into the negotiated output; the
/// decoder never resamples or remixes.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct StreamFormat {
    /// Sample rate in Hz.
    pub sample_rate: u32,
    /// Number of channels (1 or 2).
    pub channels: u16,
}

impl StreamFormat {
    /// Create a stream format.
    pub const fn new(sample_rate: u32, channels: u16) -> Self {
        Self {
            sample_rate,
            channels,
        }
    }
}

/// Which mandatory upstream field was missing or invalid.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StreamField {
    /// The sample rate.
    Rate,
    /// The channel count.
    Channels,
}

impl fmt::Display for StreamField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Rate => f.write_str("rate"),
            Self::Channels => f.write_str("channels"),
        }
    }
}

impl TryFrom<&UpstreamCaps> for StreamFormat {
    type Error = StreamField;

    fn try_from(caps: &UpstreamCaps) -> std::result::Result<Self, StreamField> {
        let sample_rate = caps.rate.filter(|r| *r > 0).ok_or(StreamField::Rate)?;
        let channels = caps
            .channels
            .filter(|c| (1..=MAX_CHANNELS).contains(c))
            .ok_or(StreamField::Channels)?;
        Ok(Self::new(sample_rate, channels))
    }
}

// ============================================================================
// Downstream
// ============================================================================

/// One output format structure offered by downstream.
#[derive(Clone, Debug, PartialEq)]
pub struct CandidateCaps {
    /// Media type tag (`audio/x-raw-int`, `audio/x-raw-float`, ...).
    pub media_type: String,
    /// Sample width in bits. Only a fixed width can be matched.
    pub width: CapsValue<u32>,
    /// Signedness for integer PCM. Anything but a fixed value means signed.
    pub signed: CapsValue<bool>,
}

impl CandidateCaps {
    /// Create a candidate with an arbitrary media type and no constraints.
    pub fn new(media_type: impl Into<String>) -> Self {
        Self {
            media_type: media_type.into(),
            width: CapsValue::Any,
            signed: CapsValue::Any,
        }
    }

    /// Unconstrained integer PCM.
    pub fn raw_int() -> Self {
        Self::new(MEDIA_TYPE_INT)
    }

    /// Unconstrained float PCM.
    pub fn raw_float() -> Self {
        Self::new(MEDIA_TYPE_FLOAT)
    }

    /// Integer PCM with a fixed width and signedness.
    pub fn integer(width: u32, signed: bool) -> Self {
        Self::raw_int()
            .with_width(CapsValue::Fixed(width))
            .with_signed(CapsValue::Fixed(signed))
    }

    /// Float PCM with a fixed width.
    pub fn float(width: u32) -> Self {
        Self::raw_float().with_width(CapsValue::Fixed(width))
    }

    /// Translate a newer-style format name (`S16LE`, `U24`, `F32LE`, ...).
    ///
    /// Names without a suffix mean native byte order. Names in foreign byte
    /// order, and names with no PCM meaning, return `None`.
    pub fn from_format_name(name: &str) -> Option<Self> {
        let (body, endianness) = if let Some(body) = name.strip_suffix("LE") {
            (body, Endianness::Little)
        } else if let Some(body) = name.strip_suffix("BE") {
            (body, Endianness::Big)
        } else {
            (name, Endianness::native())
        };

        if endianness != Endianness::native() {
            return None;
        }

        let mut chars = body.chars();
        let prefix = chars.next()?;
        let width: u32 = chars.as_str().parse().ok()?;

        match prefix {
            'S' => Some(Self::integer(width, true)),
            'U' => Some(Self::integer(width, false)),
            'F' => Some(Self::float(width)),
            _ => None,
        }
    }

    /// Set the width constraint.
    pub fn with_width(mut self, width: CapsValue<u32>) -> Self {
        self.width = width;
        self
    }

    /// Set the signedness constraint.
    pub fn with_signed(mut self, signed: CapsValue<bool>) -> Self {
        self.signed = signed;
        self
    }

    /// The PCM kind, or `None` if the media type is not raw PCM.
    pub fn kind(&self) -> Option<MediaKind> {
        MediaKind::from_media_type(&self.media_type)
    }

    /// The width, if it is fixed.
    pub fn fixed_width(&self) -> Option<u32> {
        self.width.as_fixed().copied()
    }

    /// The effective signedness (defaults to signed).
    pub fn effective_signed(&self) -> bool {
        self.signed.as_fixed().copied().unwrap_or(true)
    }
}

impl fmt::Display for CandidateCaps {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.media_type)?;
        match &self.width {
            CapsValue::Fixed(w) => write!(f, ", width={}", w)?,
            CapsValue::Range { min, max } => write!(f, ", width=[{}, {}]", min, max)?,
            CapsValue::List(ws) => write!(f, ", width={:?}", ws)?,
            CapsValue::Any => {}
        }
        match &self.signed {
            CapsValue::Fixed(s) => write!(f, ", signed={}", s),
            CapsValue::List(ss) => write!(f, ", signed={:?}", ss),
            _ => Ok(()),
        }
    }
}

/// Ordered list of downstream candidates. Order encodes preference.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct CandidateList {
    candidates: Vec<CandidateCaps>,
}

impl CandidateList {
    /// Create an empty candidate list.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a candidate (lowest preference so far).
    pub fn push(&mut self, candidate: CandidateCaps) {
        self.candidates.push(candidate);
    }

    /// Number of candidates.
    pub fn len(&self) -> usize {
        self.candidates.len()
    }

    /// Whether the list is empty.
    pub fn is_empty(&self) -> bool {
        self.candidates.is_empty()
    }

    /// Iterate candidates in preference order.
    pub fn iter(&self) -> std::slice::Iter<'_, CandidateCaps> {
        self.candidates.iter()
    }

    /// Expand list-valued fields so every candidate carries single values.
    ///
    /// Candidates keep their relative order; within one candidate, width
    /// values vary slowest and signedness fastest.
    pub fn normalize(&self) -> Self {
        let mut out = Vec::with_capacity(self.candidates.len());
        for candidate in &self.candidates {
            for width in candidate.width.expand() {
                for signed in candidate.signed.expand() {
                    out.push(CandidateCaps {
                        media_type: candidate.media_type.clone(),
                        width: width.clone(),
                        signed,
                    });
                }
            }
        }
        Self { candidates: out }
    }
}

impl From<Vec<CandidateCaps>> for CandidateList {
    fn from(candidates: Vec<CandidateCaps>) -> Self {
        Self { candidates }
    }
}

impl FromIterator<CandidateCaps> for CandidateList {
    fn from_iter<I: IntoIterator<Item = CandidateCaps>>(iter: I) -> Self {
        Self {
            candidates: iter.into_iter().collect(),
        }
    }
}

impl<'a> IntoIterator for &'a CandidateList {
    type Item = &'a CandidateCaps;
    type IntoIter = std::slice::Iter<'a, CandidateCaps>;

    fn into_iter(self) -> Self::IntoIter {
        self.candidates.iter()
    }
}

// ============================================================================
// Output
// ============================================================================

/// Fixed output description advertised downstream.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct OutputCaps {
    /// Integer or float PCM.
    pub kind: MediaKind,
    /// Sample rate in Hz (always the upstream rate).
    pub sample_rate: u32,
    /// Number of channels (always the upstream channel count).
    pub channels: u16,
    /// Sample width in bits.
    pub width: u32,
    /// Significant bits per sample (equals width).
    pub depth: u32,
    /// Signedness, present for integer PCM only.
    pub signed: Option<bool>,
    /// Byte order of samples.
    pub endianness: Endianness,
}

impl OutputCaps {
    /// Build the output description for a stream and a chosen encoding.
    pub fn for_encoding(stream: StreamFormat, encoding: SampleEncoding) -> Self {
        let kind = encoding.kind();
        Self {
            kind,
            sample_rate: stream.sample_rate,
            channels: stream.channels,
            width: encoding.width_bits(),
            depth: encoding.width_bits(),
            signed: (kind == MediaKind::Integer).then(|| encoding.is_signed()),
            endianness: Endianness::native(),
        }
    }

    /// Media type tag.
    pub fn media_type(&self) -> &'static str {
        self.kind.media_type()
    }

    /// The stream format carried by these caps.
    pub fn stream_format(&self) -> StreamFormat {
        StreamFormat::new(self.sample_rate, self.channels)
    }

    /// The sample encoding these caps describe.
    pub fn encoding(&self) -> Option<SampleEncoding> {
        SampleEncoding::lookup(self.kind, self.width, self.signed.unwrap_or(true))
    }

    /// Bytes per frame (all channels for one sample time).
    pub fn bytes_per_frame(&self) -> usize {
        (self.width as usize / 8) * self.channels as usize
    }

    /// Duration in nanoseconds of `len` bytes of audio in this format.
    pub fn duration_nanos(&self, len: usize) -> u64 {
        let frame = self.bytes_per_frame();
        if frame == 0 || self.sample_rate == 0 {
            return 0;
        }
        (len / frame) as u64 * 1_000_000_000 / self.sample_rate as u64
    }
}

impl fmt::Display for OutputCaps {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}, rate={}, channels={}, width={}, depth={}",
            self.media_type(),
            self.sample_rate,
            self.channels,
            self.width,
            self.depth
        )?;
        if let Some(signed) = self.signed {
            write!(f, ", signed={}", signed)?;
        }
        write!(f, ", endianness={}", self.endianness.value())
    }
}
