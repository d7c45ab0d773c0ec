//! Scatter-gather DMA
//!
//! - [`Transfer`]: the in-flight page (segment list + chain builder)
//! - [`DescriptorPool`]: fixed arena of hardware records, index addressed
//! - [`HwDescriptor`]: the 32-byte record the engine fetches
//!
//! All storage is inline and sized by const generics.

pub mod chain;
pub mod descriptor;
pub mod pool;

pub use chain::{DmaSegment, Transfer};
pub use descriptor::HwDescriptor;
pub use pool::DescriptorPool;
