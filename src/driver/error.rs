//! Error types for the acquisition engine
//!
//! Errors are organized by domain:
//! - [`ConfigError`]: returned synchronously by `start`, parameter writes and
//!   construction
//! - [`DmaError`]: transfer setup and completion failures. These are raised
//!   inside the interrupt handlers, where they are counted and logged rather
//!   than propagated.
//!
//! The unified [`Error`] enum wraps both domains.

// =============================================================================
// Configuration Errors
// =============================================================================

/// Configuration and control errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ConfigError {
    /// Page size or other parameter out of range
    InvalidParameter,
    /// Link did not report alignment within the retry budget
    AlignmentFailed,
    /// Acquisition trigger did not arm
    NotArmed,
    /// A stop or a transfer is still in progress
    Busy,
    /// A hardware sub-block base address is missing
    MissingComponent,
}

impl core::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl ConfigError {
    /// Returns a human-readable description of the error
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            ConfigError::InvalidParameter => "invalid parameter",
            ConfigError::AlignmentFailed => "link alignment failed",
            ConfigError::NotArmed => "trigger not armed",
            ConfigError::Busy => "device busy",
            ConfigError::MissingComponent => "missing hardware component",
        }
    }
}

// =============================================================================
// DMA Errors
// =============================================================================

/// Transfer errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum DmaError {
    /// Scatter list or descriptor pool could not hold the page
    ResourceExhausted,
    /// The framework has no active block to receive the page
    NoActiveBlock,
    /// The engine reported a failed transfer
    TransferError,
    /// A page was dropped (transfer in flight or trigger not armed)
    PageLost,
}

impl core::fmt::Display for DmaError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl DmaError {
    /// Returns a human-readable description of the error
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            DmaError::ResourceExhausted => "DMA resources exhausted",
            DmaError::NoActiveBlock => "no active block",
            DmaError::TransferError => "DMA transfer error",
            DmaError::PageLost => "page lost",
        }
    }
}

// =============================================================================
// Unified Error Type
// =============================================================================

/// This enum wraps all domain-specific errors for unified error handling.
///
/// ```ignore
/// match dev.start(&mut delay) {
///     Err(Error::Config(ConfigError::AlignmentFailed)) => { /* check the link */ }
///     Err(Error::Config(ConfigError::NotArmed)) => { /* framework not ready */ }
///     _ => {}
/// }
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Error {
    /// Configuration error
    Config(ConfigError),
    /// DMA error
    Dma(DmaError),
}

impl core::fmt::Display for Error {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Error::Config(e) => write!(f, "config: {}", e.as_str()),
            Error::Dma(e) => write!(f, "dma: {}", e.as_str()),
        }
    }
}

impl From<ConfigError> for Error {
    fn from(e: ConfigError) -> Self {
        Error::Config(e)
    }
}

impl From<DmaError> for Error {
    fn from(e: DmaError) -> Self {
        Error::Dma(e)
    }
}

/// Result type alias for engine operations
pub type Result<T> = core::result::Result<T, Error>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = core::result::Result<T, ConfigError>;

/// Result type alias for transfer setup
pub type DmaResult<T> = core::result::Result<T, DmaError>;
