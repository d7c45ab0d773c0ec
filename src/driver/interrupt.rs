//! Interrupt status handling.
//!
//! Typed views of the two interrupt source registers and of the DMA engine
//! status, plus the handler return value.

use crate::internal::register::table::{acq_irq, dma_irq};

/// Outcome of an interrupt handler
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum IrqReturn {
    /// Nothing pending on this source (shared line or spurious wake)
    None,
    /// The event was processed and acknowledged
    Handled,
}

impl IrqReturn {
    /// `true` if the handler claimed the interrupt
    #[inline]
    pub fn is_handled(self) -> bool {
        self == IrqReturn::Handled
    }
}

// =============================================================================
// Acquisition Interrupt Status
// =============================================================================

/// Pending sources of the acquisition interrupt block
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct AcqIrqStatus {
    /// Trigger fired
    pub trigger: bool,
    /// A page has been filled
    pub page_ready: bool,
}

impl AcqIrqStatus {
    /// Create from raw source register value
    #[inline]
    pub fn from_raw(status: u32) -> Self {
        Self {
            trigger: (status & acq_irq::TRG) != 0,
            page_ready: (status & acq_irq::ACQ) != 0,
        }
    }

    /// Convert to raw value for clearing (write-1-to-clear)
    #[inline]
    pub fn to_raw(&self) -> u32 {
        let mut val = 0u32;
        if self.trigger {
            val |= acq_irq::TRG;
        }
        if self.page_ready {
            val |= acq_irq::ACQ;
        }
        val
    }

    /// Check if any source is pending
    #[inline]
    pub fn any(&self) -> bool {
        self.trigger || self.page_ready
    }
}

// =============================================================================
// DMA Interrupt Status
// =============================================================================

/// Pending sources of the DMA interrupt block
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct DmaIrqStatus {
    /// Transfer finished
    pub done: bool,
    /// Transfer failed
    pub error: bool,
}

impl DmaIrqStatus {
    /// Create from raw source register value
    #[inline]
    pub fn from_raw(status: u32) -> Self {
        Self {
            done: (status & dma_irq::DONE) != 0,
            error: (status & dma_irq::ERR) != 0,
        }
    }

    /// Convert to raw value for clearing (write-1-to-clear)
    #[inline]
    pub fn to_raw(&self) -> u32 {
        let mut val = 0u32;
        if self.done {
            val |= dma_irq::DONE;
        }
        if self.error {
            val |= dma_irq::ERR;
        }
        val
    }

    /// Check if any source is pending
    #[inline]
    pub fn any(&self) -> bool {
        self.done || self.error
    }

    /// Successful completion: done without error
    #[inline]
    pub fn is_success(&self) -> bool {
        self.done && !self.error
    }
}

// =============================================================================
// DMA Engine Status
// =============================================================================

/// DMA engine state as reported by the status register
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum DmaEngineStatus {
    /// No transfer configured
    Idle,
    /// Last transfer completed
    Done,
    /// Transfer in progress
    Busy,
    /// Last transfer failed
    Error,
    /// Last transfer was aborted
    Aborted,
    /// Value not defined by the gateware
    Unknown(u32),
}

impl DmaEngineStatus {
    /// Decode the status register value
    pub fn from_raw(raw: u32) -> Self {
        match raw {
            0 => DmaEngineStatus::Idle,
            1 => DmaEngineStatus::Done,
            2 => DmaEngineStatus::Busy,
            3 => DmaEngineStatus::Error,
            4 => DmaEngineStatus::Aborted,
            other => DmaEngineStatus::Unknown(other),
        }
    }

    /// Short name for logs
    pub const fn as_str(&self) -> &'static str {
        match self {
            DmaEngineStatus::Idle => "idle",
            DmaEngineStatus::Done => "done",
            DmaEngineStatus::Busy => "busy",
            DmaEngineStatus::Error => "error",
            DmaEngineStatus::Aborted => "aborted",
            DmaEngineStatus::Unknown(_) => "unknown",
        }
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
