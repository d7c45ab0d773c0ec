//! Upward interface to the acquisition framework.
//!
//! The engine owns hardware sequencing; everything about buffers, triggers
//! and the streaming policy belongs to the framework and is reached through
//! the [`Acquisition`] trait.

use crate::driver::error::DmaResult;
use crate::internal::dma::DmaSegment;

/// How a page transfer ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum TransferOutcome {
    /// The engine reported success; the active block holds the page
    Completed,
    /// The engine reported an error
    Failed,
    /// The transfer was never started (mapping or descriptor setup failed)
    Aborted,
}

/// Acquisition framework callbacks.
///
/// All methods may be called from interrupt context with interrupts masked,
/// so implementations must not block.
///
/// # Example
///
/// ```ignore
/// struct Channel { armed: bool, streaming: bool, block: Option<Block> }
///
/// impl Acquisition for Channel {
///     fn is_armed(&self) -> bool { self.armed }
///     fn trigger_arm(&mut self) { self.armed = true; }
///     fn trigger_abort_and_disable(&mut self) { self.armed = false; }
///     fn on_transfer_complete(&mut self, outcome: TransferOutcome) -> bool {
///         self.armed = false;
///         self.streaming && outcome == TransferOutcome::Completed
///     }
///     fn map_active_page(&mut self, page_size: u32, segs: &mut [DmaSegment]) -> DmaResult<usize> {
///         let block = self.block.as_ref().ok_or(DmaError::NoActiveBlock)?;
///         block.map_sg(page_size, segs)
///     }
///     fn unmap_active_page(&mut self) { /* ... */ }
/// }
/// ```
pub trait Acquisition {
    /// `true` if the trigger is armed for the next page
    fn is_armed(&self) -> bool;

    /// Arm the trigger for the next page
    fn trigger_arm(&mut self);

    /// Abort any pending shot and disable the trigger
    fn trigger_abort_and_disable(&mut self);

    /// Report the end of a transfer.
    ///
    /// Returns `true` if another page should be acquired (streaming), in
    /// which case the implementation re-arms its trigger.
    fn on_transfer_complete(&mut self, outcome: TransferOutcome) -> bool;

    /// Map the active block into DMA segments for a page of `page_size`
    /// bytes.
    ///
    /// Returns the number of segments written. Fails with
    /// [`DmaError::NoActiveBlock`](crate::DmaError::NoActiveBlock) when there
    /// is no block, or [`DmaError::ResourceExhausted`](crate::DmaError::ResourceExhausted)
    /// when the block needs more segments than `segments` holds.
    fn map_active_page(&mut self, page_size: u32, segments: &mut [DmaSegment]) -> DmaResult<usize>;

    /// Release the mapping made by [`map_active_page`](Self::map_active_page)
    fn unmap_active_page(&mut self);

    /// Streaming mode changed
    fn set_streaming(&mut self, _enabled: bool) {}

    /// Hardware busy flag changed
    fn set_hw_busy(&mut self, _busy: bool) {}
}
