//! Decoder configuration.

use crate::decoder::ELEMENT_NAME;
use crate::engine::EngineParams;

/// Configuration for a decode session.
///
/// # Example
///
/// ```rust
/// use parallax_mpg123::config::DecoderConfig;
///
/// let config = DecoderConfig::default()
///     .with_name("mpg123-1")
///     .with_resync_limit(Some(64 * 1024));
///
/// assert!(config.gapless);
/// assert_eq!(config.engine_params().resync_limit, Some(65536));
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecoderConfig {
    /// Element instance name, used as log and metric label.
    pub name: String,
    /// Gapless decoding: drop the encoder info frame and trim delay.
    pub gapless: bool,
    /// Check the following frame header before trusting a sync word.
    pub seek_buffer: bool,
    /// Maximum bytes skipped while resyncing. `None` = unlimited.
    pub resync_limit: Option<usize>,
}

impl Default for DecoderConfig {
    fn default() -> Self {
        Self {
            name: ELEMENT_NAME.to_string(),
            gapless: true,
            seek_buffer: true,
            resync_limit: None,
        }
    }
}

impl DecoderConfig {
    /// Set the instance name.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Enable or disable gapless decoding.
    pub fn with_gapless(mut self, gapless: bool) -> Self {
        self.gapless = gapless;
        self
    }

    /// Enable or disable the seek buffer.
    pub fn with_seek_buffer(mut self, seek_buffer: bool) -> Self {
        self.seek_buffer = seek_buffer;
        self
    }

    /// Set the resync limit.
    pub fn with_resync_limit(mut self, limit: Option<usize>) -> Self {
        self.resync_limit = limit;
        self
    }

    /// Engine parameters applied at session start.
    pub fn engine_params(&self) -> EngineParams {
        EngineParams {
            gapless: self.gapless,
            seek_buffer: self.seek_buffer,
            resync_limit: self.resync_limit,
        }
    }
}
