//! Optimizer configuration.

/// Configuration for the row optimizer.
///
/// Only two knobs affect the output; `verbose` merely controls how chatty
/// the per-row `tracing` events are.
///
/// # Example
///
/// ```
/// use rowloss::Options;
///
/// // Defaults (strength 26, bleed divider 2)
/// let options = Options::new();
///
/// // Or customize with the builder
/// let options = Options::new().strength(12).bleed_divider(4);
/// ```
#[derive(Debug, Clone)]
pub struct Options {
    /// Maximum allowed distance between a committed post-filter byte and
    /// its target, per channel. 0 is lossless.
    ///
    /// Default: `26`
    pub strength: u8,

    /// Attenuation applied to diffused quantization error: 1 keeps full
    /// error diffusion, larger values trade dither texture for banding.
    /// Clamped to at least 1.
    ///
    /// Default: `2`
    pub bleed_divider: i16,

    /// Emit a `tracing` debug event per committed row.
    ///
    /// Default: `false`
    pub verbose: bool,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            strength: 26,
            bleed_divider: 2,
            verbose: false,
        }
    }
}

impl Options {
    /// Create options with default values.
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the quantization strength (0 = lossless).
    #[inline]
    pub fn strength(mut self, strength: u8) -> Self {
        self.strength = strength;
        self
    }

    /// Set the dithering bleed divider (values below 1 are clamped to 1).
    #[inline]
    pub fn bleed_divider(mut self, divider: i16) -> Self {
        self.bleed_divider = divider.max(1);
        self
    }

    /// Enable or disable per-row progress events.
    #[inline]
    pub fn verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }
}
