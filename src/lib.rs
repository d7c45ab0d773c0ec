//! OBS-BOX Acquisition Engine
//!
//! A `no_std`, `no_alloc` driver for the OBS-BOX FPGA data-acquisition board:
//! link bring-up, page-ready and DMA interrupt handling, and scatter-gather
//! transfer of acquired pages from the board's memory into host buffers.
//!
//! # Architecture
//!
//! The board exposes five hardware sub-blocks, each a window of 32-bit
//! registers:
//!
//! 1. **Acquisition core**: link control, page size, last filled page
//! 2. **Acquisition interrupt**: trigger and page-ready sources
//! 3. **DMA core**: engine control, status and head descriptor
//! 4. **DMA interrupt**: done and error sources
//! 5. **Vectored interrupt controller**: end-of-interrupt
//!
//! [`ObsBox`] owns one board. Its control half ([`ObsBox::start`],
//! [`ObsBox::stop`], [`ObsBox::set_parameter`]) runs from task context; its
//! interrupt half ([`ObsBox::handle_page_ready`], [`ObsBox::handle_dma_done`])
//! runs from the two interrupt vectors. Shared state is guarded by
//! `critical-section`.
//!
//! Buffers, triggers and the streaming policy are owned by the acquisition
//! framework, reached through the [`Acquisition`] trait.
//!
//! # Data Flow
//!
//! ```text
//! page-ready irq ──> claim page ──> map active block ──> build descriptor chain
//!                                                              │
//!                    re-arm or stop <── release <── DMA irq <──┘ start engine
//! ```
//!
//! # Features
//!
//! - `defmt`: Log through defmt and derive `defmt::Format` on public types
//! - `log`: Log through the `log` facade
//!
//! # Example
//!
//! ```ignore
//! use obsbox::{AcqConfig, BlockBases, MmioBus, ObsBox};
//!
//! let bus = unsafe { MmioBus::new(BOARD_WINDOW) };
//! let bases = BlockBases {
//!     vic: 0x3000,
//!     dma_core: 0x1000,
//!     dma_irq: 0x1100,
//!     acq_core: 0x2000,
//!     acq_irq: 0x2100,
//! };
//!
//! let dev: ObsBox<_, _, 64> = ObsBox::new(bus, bases, channel, AcqConfig::new())?;
//! dev.attach();
//! dev.start(&mut delay)?;
//! ```

#![no_std]
#![deny(missing_docs)]
#![allow(unsafe_code)]
#![deny(unsafe_op_in_unsafe_fn)]
#![deny(clippy::correctness)]
#![warn(
    clippy::suspicious,
    clippy::style,
    clippy::complexity,
    clippy::perf,
    clippy::cloned_instead_of_copied,
    clippy::explicit_iter_loop,
    clippy::implicit_clone,
    clippy::inconsistent_struct_constructor,
    clippy::manual_assert,
    clippy::manual_let_else,
    clippy::match_same_arms,
    clippy::needless_pass_by_value,
    clippy::semicolon_if_nothing_returned,
    clippy::uninlined_format_args,
    clippy::unnested_or_patterns,
    clippy::std_instead_of_core,
    clippy::std_instead_of_alloc,
    clippy::alloc_instead_of_core
)]
#![allow(
    clippy::mod_module_files,
    clippy::self_named_module_files,
    clippy::similar_names,
    clippy::too_many_arguments,
    clippy::struct_excessive_bools,
    clippy::type_complexity,
    clippy::must_use_candidate,
    clippy::assertions_on_constants,
    clippy::cast_possible_truncation,
    clippy::cast_possible_wrap,
    clippy::cast_sign_loss,
    clippy::cast_lossless,
    clippy::panic_in_result_fn,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::module_name_repetitions,
    clippy::wildcard_imports,
    clippy::items_after_statements
)]

// Logging macros must come before the modules that use them
#[macro_use]
mod fmt;

// =============================================================================
// Modules
// =============================================================================

pub mod driver;
pub mod sync;

// Internal implementation details (pub(crate) only)
mod internal;

// Test utilities (only available during testing)
#[cfg(test)]
pub mod testing;

// =============================================================================
// Re-exports
// =============================================================================

pub use driver::config::{AcqConfig, BlockBases, Parameter, State, validate_page_size};
pub use driver::error::{ConfigError, ConfigResult, DmaError, DmaResult, Error, Result};
pub use driver::framework::{Acquisition, TransferOutcome};
pub use driver::interrupt::{AcqIrqStatus, DmaEngineStatus, DmaIrqStatus, IrqReturn};
pub use driver::obsbox::ObsBox;
pub use driver::stats::{ErrorPolicy, Stats};
pub use internal::dma::{DescriptorPool, DmaSegment, HwDescriptor, Transfer};
pub use internal::register::{MmioBus, RegisterBus};
pub use sync::CriticalSectionCell;

/// Register map and field accessors.
///
/// Offsets are relative to each sub-block's base in [`BlockBases`]. Most
/// users never need these; they exist for board bring-up tools and for
/// register-level test doubles.
///
/// # Safety
///
/// Writing registers behind the driver's back bypasses its state machine.
pub mod registers {
    pub use crate::internal::register::table::{acq_core, acq_irq, dma_core, dma_irq, vic};
    pub use crate::internal::register::{Field, read_field, read_reg, write_field, write_reg};
}

/// Shared driver constants.
pub mod constants {
    pub use crate::internal::constants::{
        // Timing
        ALIGN_POLL_MS,
        ALIGN_RETRIES,
        // Engine
        DEFAULT_DESCRIPTOR_SLOTS,
        DMA_BYTE_SWAP,
        // Error policy
        ERROR_POLICY_CONSECUTIVE,
        ERROR_POLICY_TOTAL,
        // Page geometry
        MAX_PAGE_SIZE,
        MIN_PAGE_SIZE,
        NOT_ARMED_LIMIT,
        SETTLE_MS,
    };
}
