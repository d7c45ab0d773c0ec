//! Internal Implementation Details
//!
//! # Contents
//!
//! - [`register`]: Raw register access, field accessor and the field table
//! - [`dma`]: Descriptor records, descriptor pool and chain builder
//! - [`constants`]: Limits, thresholds and timings

pub mod constants;
pub mod dma;
pub mod register;
