//! Synchronization primitives.
//!
//! The device context is shared between the two interrupt vectors and the
//! control task; every mutable part of it sits in a [`CriticalSectionCell`].

mod primitives;

pub use primitives::CriticalSectionCell;
