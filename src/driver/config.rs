//! Configuration types for the acquisition engine

use crate::driver::error::{ConfigError, ConfigResult};
use crate::internal::constants::{
    ALIGN_POLL_MS, ALIGN_RETRIES, MAX_PAGE_SIZE, MIN_PAGE_SIZE, SETTLE_MS,
};

/// Base addresses of the board's hardware sub-blocks.
///
/// Discovered once at attach time from the board's self-description and
/// relative to the register window of the [`RegisterBus`](crate::RegisterBus).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct BlockBases {
    /// Vectored interrupt controller
    pub vic: usize,
    /// DMA engine
    pub dma_core: usize,
    /// DMA interrupt source
    pub dma_irq: usize,
    /// Acquisition core
    pub acq_core: usize,
    /// Acquisition interrupt source
    pub acq_irq: usize,
}

impl BlockBases {
    /// Check that every sub-block was found
    pub fn validate(&self) -> ConfigResult<()> {
        let all = [
            self.vic,
            self.dma_core,
            self.dma_irq,
            self.acq_core,
            self.acq_irq,
        ];
        if all.contains(&0) {
            return Err(ConfigError::MissingComponent);
        }
        Ok(())
    }
}

/// Check that `size` is an acceptable page size in bytes
pub const fn validate_page_size(size: u32) -> ConfigResult<()> {
    if size < MIN_PAGE_SIZE || size >= MAX_PAGE_SIZE {
        return Err(ConfigError::InvalidParameter);
    }
    Ok(())
}

/// Acquisition engine configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct AcqConfig {
    /// Page size in bytes, `[MIN_PAGE_SIZE, MAX_PAGE_SIZE)`
    pub page_size: u32,
    /// Re-arm automatically after every completed page
    pub streaming: bool,
    /// Number of link-alignment polls during `start`
    pub align_retries: u32,
    /// Delay between alignment polls in milliseconds
    pub align_poll_ms: u32,
    /// Settle delay around page-size programming in milliseconds
    pub settle_ms: u32,
    /// Offset between host and bus addresses of the descriptor pool
    pub descriptor_bus_offset: u64,
}

impl Default for AcqConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl AcqConfig {
    /// Create a new configuration with defaults
    #[must_use]
    pub const fn new() -> Self {
        Self {
            page_size: MIN_PAGE_SIZE,
            streaming: true,
            align_retries: ALIGN_RETRIES,
            align_poll_ms: ALIGN_POLL_MS,
            settle_ms: SETTLE_MS,
            descriptor_bus_offset: 0,
        }
    }

    // =========================================================================
    // Builder Methods
    // =========================================================================

    /// Set the page size in bytes (validated at `start`)
    #[must_use]
    pub const fn with_page_size(mut self, page_size: u32) -> Self {
        self.page_size = page_size;
        self
    }

    /// Enable or disable streaming mode
    #[must_use]
    pub const fn with_streaming(mut self, streaming: bool) -> Self {
        self.streaming = streaming;
        self
    }

    /// Set the number of link-alignment polls
    #[must_use]
    pub const fn with_align_retries(mut self, retries: u32) -> Self {
        self.align_retries = retries;
        self
    }

    /// Set the delay between alignment polls
    #[must_use]
    pub const fn with_align_poll_ms(mut self, ms: u32) -> Self {
        self.align_poll_ms = ms;
        self
    }

    /// Set the settle delay
    #[must_use]
    pub const fn with_settle_ms(mut self, ms: u32) -> Self {
        self.settle_ms = ms;
        self
    }

    /// Set the bus offset of the descriptor pool (IOMMU or bridge windows)
    #[must_use]
    pub const fn with_descriptor_bus_offset(mut self, offset: u64) -> Self {
        self.descriptor_bus_offset = offset;
        self
    }
}

/// Named parameters of the value-get / value-set surface
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Parameter {
    /// 0 = stop, nonzero = start (or restart)
    Run,
    /// 0 = single shot, 1 = streaming
    Streaming,
    /// Page size in bytes
    PageSize,
}

/// Acquisition state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum State {
    /// Not acquiring
    #[default]
    Idle,
    /// Armed, waiting for hardware events
    Running,
    /// Stop requested, in-flight transfer still draining
    Stopping,
}

// =============================================================================
// Unit Tests
// =============================================================================
