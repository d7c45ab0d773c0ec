//! Scatter-gather transfer: host segment list plus the descriptor chain
//! built from it.

use core::sync::atomic::{Ordering, fence};

use super::descriptor::HwDescriptor;
use super::pool::DescriptorPool;
use crate::driver::error::{DmaError, DmaResult};
use crate::internal::register::table::dma_core;
use crate::internal::register::{RegisterBus, write_field};

/// One DMA-mapped, physically contiguous chunk of the host page buffer.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct DmaSegment {
    /// Bus address of the chunk as seen by the DMA engine
    pub dma_addr: u64,
    /// Chunk length in bytes
    pub len: u32,
}

impl DmaSegment {
    /// Create a segment
    pub const fn new(dma_addr: u64, len: u32) -> Self {
        Self { dma_addr, len }
    }
}

/// One page transfer: up to `N` segments and the `N`-slot descriptor pool
/// that describes them to the engine.
pub struct Transfer<const N: usize> {
    segments: [DmaSegment; N],
    count: usize,
    dev_mem_off: u32,
    pool: DescriptorPool<N>,
}

impl<const N: usize> Transfer<N> {
    /// Create an empty transfer with identity bus mapping for the pool
    pub const fn new() -> Self {
        Self::with_bus_offset(0)
    }

    /// Create an empty transfer whose pool is seen at `host + bus_offset`
    pub const fn with_bus_offset(bus_offset: u64) -> Self {
        Self {
            segments: [DmaSegment::new(0, 0); N],
            count: 0,
            dev_mem_off: 0,
            pool: DescriptorPool::with_bus_offset(bus_offset),
        }
    }

    /// Scatter list storage, filled by the page mapper
    pub fn segments_mut(&mut self) -> &mut [DmaSegment] {
        &mut self.segments
    }

    /// Mapped segments of the loaded page
    pub fn segments(&self) -> &[DmaSegment] {
        &self.segments[..self.count]
    }

    /// Commit `count` mapped segments for a page at `dev_mem_off`.
    ///
    /// Fails with [`DmaError::ResourceExhausted`] when the mapping produced
    /// no segments or more than the pool can describe.
    pub fn load(&mut self, count: usize, dev_mem_off: u32) -> DmaResult<()> {
        if count == 0 || count > N {
            return Err(DmaError::ResourceExhausted);
        }
        self.count = count;
        self.dev_mem_off = dev_mem_off;
        Ok(())
    }

    /// Write one record per loaded segment into the pool.
    ///
    /// Each record's device start offset advances by the length of the
    /// segments before it. Every record but the last links to the next slot;
    /// the last carries no next address and the "last" attribute.
    pub fn build_chain(&self) {
        let mut start = self.dev_mem_off;

        for (i, seg) in self.segments().iter().enumerate() {
            let next = if i + 1 < self.count {
                Some(self.pool.bus_addr(i + 1))
            } else {
                None
            };
            if let Some(record) = self.pool.slot(i) {
                record.fill(start, seg.dma_addr, seg.len, next);
            }
            start = start.wrapping_add(seg.len);
        }

        // The engine fetches records 1.. straight from the pool
        fence(Ordering::Release);
    }

    /// Mirror the head record into the engine's transfer registers.
    pub fn program_head<B: RegisterBus + ?Sized>(&self, bus: &B, dma_base: usize) {
        let Some(head) = self.pool.slot(0) else {
            return;
        };
        let [start, addr_l, addr_h, len, next_l, next_h, attribute] = head.words();

        write_field(bus, dma_base, &dma_core::ADDR, start);
        write_field(bus, dma_base, &dma_core::ADDR_L, addr_l);
        write_field(bus, dma_base, &dma_core::ADDR_H, addr_h);
        write_field(bus, dma_base, &dma_core::LEN, len);
        write_field(bus, dma_base, &dma_core::NEXT_L, next_l);
        write_field(bus, dma_base, &dma_core::NEXT_H, next_h);
        write_field(bus, dma_base, &dma_core::BR_LAST, attribute);
    }

    /// Drop the loaded page and wipe its records
    pub fn release(&mut self) {
        self.pool.clear(self.count);
        self.count = 0;
        self.dev_mem_off = 0;
    }

    /// `true` while a page is loaded
    pub fn is_loaded(&self) -> bool {
        self.count != 0
    }

    /// Number of loaded segments
    pub fn segment_count(&self) -> usize {
        self.count
    }

    /// Device-memory offset of the loaded page
    pub fn dev_mem_off(&self) -> u32 {
        self.dev_mem_off
    }

    /// Record for segment `index` of the loaded page
    pub fn record(&self, index: usize) -> Option<&HwDescriptor> {
        if index < self.count {
            self.pool.slot(index)
        } else {
            None
        }
    }

    /// Bus address of the record for segment `index`
    pub fn record_bus_addr(&self, index: usize) -> u64 {
        self.pool.bus_addr(index)
    }

    /// Maximum number of segments per page
    pub const fn capacity(&self) -> usize {
        N
    }
}

impl<const N: usize> Default for Transfer<N> {
    fn default() -> Self {
        Self::new()
    }
}
