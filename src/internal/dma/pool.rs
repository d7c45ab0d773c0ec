//! Fixed-capacity descriptor pool.
//!
//! Records are addressed by slot index everywhere on the host side. A slot is
//! turned into a device-visible bus address only through [`DescriptorPool::bus_addr`],
//! at the moment a record or the engine registers are programmed.

use super::descriptor::HwDescriptor;

/// Arena of `N` hardware descriptor records.
pub struct DescriptorPool<const N: usize> {
    slots: [HwDescriptor; N],
    /// Added to the host address of a slot to obtain its bus address
    bus_offset: u64,
}

impl<const N: usize> DescriptorPool<N> {
    /// Create a pool whose bus addresses equal host addresses
    pub const fn new() -> Self {
        Self::with_bus_offset(0)
    }

    /// Create a pool seen by the device at `host address + bus_offset`
    pub const fn with_bus_offset(bus_offset: u64) -> Self {
        Self {
            slots: [const { HwDescriptor::new() }; N],
            bus_offset,
        }
    }

    /// Number of slots
    pub const fn capacity(&self) -> usize {
        N
    }

    /// Record at `index`, if in range
    pub fn slot(&self, index: usize) -> Option<&HwDescriptor> {
        self.slots.get(index)
    }

    /// Device-visible address of slot `index`.
    ///
    /// The address is derived from where the pool currently lives, so it is
    /// only meaningful while the pool is not moved.
    pub fn bus_addr(&self, index: usize) -> u64 {
        let host = self.slots.as_ptr() as usize as u64;
        host.wrapping_add((index * HwDescriptor::SIZE) as u64)
            .wrapping_add(self.bus_offset)
    }

    /// Zero the first `count` slots
    pub fn clear(&self, count: usize) {
        for slot in self.slots.iter().take(count) {
            slot.clear();
        }
    }
}

impl<const N: usize> Default for DescriptorPool<N> {
    fn default() -> Self {
        Self::new()
    }
}
