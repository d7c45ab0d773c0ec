//! Core driver components for the OBS-BOX acquisition board.
//!
//! - [`config`] - Sub-block bases, configuration and parameters
//! - [`error`] - Error types and result aliases
//! - [`framework`] - The upward interface to the acquisition framework
//! - [`interrupt`] - Interrupt status decoding
//! - [`obsbox`] - The device context
//! - [`stats`] - Transfer counters and the error escalation policy
//!
//! The control state machine and the interrupt handlers are methods on
//! [`ObsBox`].
//!
//! # Example
//!
//! ```ignore
//! use obsbox::driver::{AcqConfig, ObsBox};
//!
//! let config = AcqConfig::new()
//!     .with_page_size(0x0020_0000)
//!     .with_streaming(true);
//! ```

// Submodules
pub mod config;
mod control;
pub mod error;
pub mod framework;
pub mod interrupt;
mod irq;
pub mod obsbox;
pub mod stats;

// Re-exports for convenience
pub use config::{AcqConfig, BlockBases, Parameter, State, validate_page_size};
pub use error::{ConfigError, ConfigResult, DmaError, DmaResult, Error, Result};
pub use framework::{Acquisition, TransferOutcome};
pub use interrupt::{AcqIrqStatus, DmaEngineStatus, DmaIrqStatus, IrqReturn};
pub use obsbox::ObsBox;
pub use stats::{ErrorPolicy, Stats};
