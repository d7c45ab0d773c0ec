//! Host-side stand-ins for the board and the acquisition framework.

#![allow(dead_code)]

use std::cell::RefCell;
use std::collections::HashMap;

use embedded_hal::delay::DelayNs;
use obsbox::registers::{acq_core, acq_irq, dma_core, dma_irq};
use obsbox::{Acquisition, BlockBases, DmaError, DmaResult, DmaSegment, RegisterBus, TransferOutcome};

pub const BASES: BlockBases = BlockBases {
    vic: 0x3000,
    dma_core: 0x1000,
    dma_irq: 0x1100,
    acq_core: 0x2000,
    acq_irq: 0x2100,
};

/// Register window backed by a map. Interrupt source registers clear on
/// write-1 and the DMA start bit clears itself; everything else stores the
/// written value.
#[derive(Debug, Default)]
pub struct SimBoard {
    regs: RefCell<HashMap<usize, u32>>,
    log: RefCell<Vec<(usize, u32)>>,
}

impl SimBoard {
    pub fn new() -> Self {
        let board = Self::default();
        board.poke(BASES.acq_core + acq_core::STAT_ALIGNED.offset, 1);
        board
    }

    pub fn poke(&self, addr: usize, value: u32) {
        self.regs.borrow_mut().insert(addr, value);
    }

    pub fn peek(&self, addr: usize) -> u32 {
        self.regs.borrow().get(&addr).copied().unwrap_or(0)
    }

    pub fn writes_to(&self, addr: usize) -> Vec<u32> {
        self.log
            .borrow()
            .iter()
            .filter(|(a, _)| *a == addr)
            .map(|(_, v)| *v)
            .collect()
    }

    pub fn write_count(&self) -> usize {
        self.log.borrow().len()
    }

    /// Gateware finished filling `page`
    pub fn page_ready(&self, page: u32) {
        self.poke(BASES.acq_core + acq_core::PAGE_ADDR.offset, page);
        self.poke(BASES.acq_irq + acq_irq::SRC.offset, acq_irq::ACQ);
    }

    /// Engine finished with `bits` in the DMA source register
    pub fn dma_irq(&self, bits: u32) {
        self.poke(BASES.dma_irq + dma_irq::SRC.offset, bits);
    }

    fn is_w1c(addr: usize) -> bool {
        addr == BASES.acq_irq + acq_irq::SRC.offset || addr == BASES.dma_irq + dma_irq::SRC.offset
    }
}

impl RegisterBus for SimBoard {
    fn read32(&self, addr: usize) -> u32 {
        self.peek(addr)
    }

    fn write32(&self, addr: usize, value: u32) {
        self.log.borrow_mut().push((addr, value));
        if Self::is_w1c(addr) {
            let current = self.peek(addr);
            self.poke(addr, current & !value);
        } else if addr == BASES.dma_core + dma_core::CTL_START.offset {
            self.poke(addr, value & !dma_core::CTL_START.mask);
        } else {
            self.poke(addr, value);
        }
    }
}

/// Delay that returns immediately
#[derive(Debug, Default)]
pub struct NoDelay;

impl DelayNs for NoDelay {
    fn delay_ns(&mut self, _ns: u32) {}
}

/// Acquisition channel whose active block is split into `chunk`-sized
/// segments starting at `host_base`.
#[derive(Debug)]
pub struct Channel {
    pub streaming: bool,
    pub armed: bool,
    pub has_block: bool,
    pub host_base: u64,
    pub chunk: u32,
    pub mapped: bool,
    pub completions: Vec<TransferOutcome>,
    pub aborts: usize,
}

impl Channel {
    pub fn new(streaming: bool) -> Self {
        Self {
            streaming,
            armed: false,
            has_block: true,
            host_base: 0x0000_0001_4000_0000,
            chunk: 0x4_0000,
            mapped: false,
            completions: Vec::new(),
            aborts: 0,
        }
    }
}

impl Acquisition for Channel {
    fn is_armed(&self) -> bool {
        self.armed
    }

    fn trigger_arm(&mut self) {
        self.armed = true;
    }

    fn trigger_abort_and_disable(&mut self) {
        self.armed = false;
        self.aborts += 1;
    }

    fn on_transfer_complete(&mut self, outcome: TransferOutcome) -> bool {
        self.completions.push(outcome);
        self.armed = self.streaming && outcome == TransferOutcome::Completed;
        self.armed
    }

    fn map_active_page(&mut self, page_size: u32, segments: &mut [DmaSegment]) -> DmaResult<usize> {
        if !self.has_block {
            return Err(DmaError::NoActiveBlock);
        }
        let count = page_size.div_ceil(self.chunk) as usize;
        if count > segments.len() {
            return Err(DmaError::ResourceExhausted);
        }
        for (i, seg) in segments.iter_mut().take(count).enumerate() {
            let off = i as u32 * self.chunk;
            *seg = DmaSegment::new(self.host_base + u64::from(off), self.chunk.min(page_size - off));
        }
        self.mapped = true;
        Ok(count)
    }

    fn unmap_active_page(&mut self) {
        self.mapped = false;
    }

    fn set_streaming(&mut self, enabled: bool) {
        self.streaming = enabled;
    }
}
