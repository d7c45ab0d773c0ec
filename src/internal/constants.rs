//! Centralized Constants
//!
//! Single source of truth for the limits, thresholds and timings used by
//! the acquisition engine.
//!
//! Register offsets and bit masks live in the register table
//! (`internal/register/table.rs`), not here.

// =============================================================================
// Page Geometry
// =============================================================================

/// Smallest accepted acquisition page size in bytes (1 MiB)
pub const MIN_PAGE_SIZE: u32 = 0x0010_0000;

/// Upper bound (exclusive) for the acquisition page size in bytes (128 MiB,
/// half of the carrier memory)
pub const MAX_PAGE_SIZE: u32 = 0x0800_0000;

/// Default number of descriptor slots in the pool (one per scatter segment)
pub const DEFAULT_DESCRIPTOR_SLOTS: usize = 64;

// =============================================================================
// Error Policy
// =============================================================================

/// Consecutive errors needed before the policy may force a stop
pub const ERROR_POLICY_CONSECUTIVE: u32 = 5;

/// Lifetime errors needed before the policy may force a stop
pub const ERROR_POLICY_TOTAL: u32 = 20;

/// Consecutive "trigger not armed" page drops that force a stop
pub const NOT_ARMED_LIMIT: u32 = 10;

// =============================================================================
// Timing
// =============================================================================

/// Number of link-alignment polls during `start`
pub const ALIGN_RETRIES: u32 = 30;

/// Delay between link-alignment polls in milliseconds
pub const ALIGN_POLL_MS: u32 = 1;

/// Settle delay after programming the page size and masking interrupts.
///
/// The gateware misbehaves if the interrupt masks are touched right after a
/// page-size change.
pub const SETTLE_MS: u32 = 10;

// =============================================================================
// DMA Engine
// =============================================================================

/// Byte-swap mode programmed before each transfer
pub const DMA_BYTE_SWAP: u32 = 0x2;
