//! Test doubles for unit tests.
//!
//! `MockRegisterBus` stands in for the board's register window,
//! `MockDelay` for the platform timer and `MockAcquisition` for the
//! acquisition framework.

#![allow(missing_docs)]
#![allow(clippy::std_instead_of_core, clippy::std_instead_of_alloc)]

extern crate std;

use core::cell::{Cell, RefCell};
use std::collections::{HashMap, HashSet, VecDeque};
use std::vec::Vec;

use embedded_hal::delay::DelayNs;

use crate::driver::config::BlockBases;
use crate::driver::error::{DmaError, DmaResult};
use crate::driver::framework::{Acquisition, TransferOutcome};
use crate::internal::dma::DmaSegment;
use crate::internal::register::RegisterBus;
use crate::internal::register::table::{acq_core, acq_irq, dma_irq};

/// Sub-block bases used throughout the unit tests
pub fn test_bases() -> BlockBases {
    BlockBases {
        vic: 0x1000,
        dma_core: 0x2000,
        dma_irq: 0x3000,
        acq_core: 0x4000,
        acq_irq: 0x5000,
    }
}

// =============================================================================
// Register Bus
// =============================================================================

/// In-memory register window.
///
/// Unwritten registers read as zero. The interrupt source registers of
/// [`test_bases`] behave as write-1-to-clear. Reads can be scripted per
/// address; once a script runs out the stored value is returned.
#[derive(Debug)]
pub struct MockRegisterBus {
    registers: RefCell<HashMap<usize, u32>>,
    scripted: RefCell<HashMap<usize, VecDeque<u32>>>,
    write_log: RefCell<Vec<(usize, u32)>>,
    w1c: HashSet<usize>,
    reads: Cell<usize>,
}

impl MockRegisterBus {
    pub fn new() -> Self {
        let bases = test_bases();
        let w1c = [bases.acq_irq + acq_irq::SRC.offset, bases.dma_irq + dma_irq::SRC.offset]
            .into_iter()
            .collect();
        Self {
            registers: RefCell::new(HashMap::new()),
            scripted: RefCell::new(HashMap::new()),
            write_log: RefCell::new(Vec::new()),
            w1c,
            reads: Cell::new(0),
        }
    }

    /// Preset a register without logging a write
    pub fn set_register(&self, addr: usize, value: u32) {
        self.registers.borrow_mut().insert(addr, value);
    }

    pub fn get_register(&self, addr: usize) -> u32 {
        self.registers.borrow().get(&addr).copied().unwrap_or(0)
    }

    /// Every write so far, in order
    pub fn writes(&self) -> Vec<(usize, u32)> {
        self.write_log.borrow().clone()
    }

    pub fn clear_writes(&self) {
        self.write_log.borrow_mut().clear();
    }

    pub fn read_count(&self) -> usize {
        self.reads.get()
    }

    /// Report the link as aligned
    pub fn set_aligned(&self, acq_core_base: usize) {
        self.set_register(acq_core_base + acq_core::STAT_ALIGNED.offset, 1);
    }

    /// Queue values returned by successive reads of `addr`
    pub fn script_reads(&self, addr: usize, values: &[u32]) {
        self.scripted
            .borrow_mut()
            .entry(addr)
            .or_default()
            .extend(values.iter().copied());
    }
}

impl Default for MockRegisterBus {
    fn default() -> Self {
        Self::new()
    }
}

impl RegisterBus for MockRegisterBus {
    fn read32(&self, addr: usize) -> u32 {
        self.reads.set(self.reads.get() + 1);
        if let Some(value) = self
            .scripted
            .borrow_mut()
            .get_mut(&addr)
            .and_then(VecDeque::pop_front)
        {
            return value;
        }
        self.get_register(addr)
    }

    fn write32(&self, addr: usize, value: u32) {
        self.write_log.borrow_mut().push((addr, value));
        if self.w1c.contains(&addr) {
            let current = self.get_register(addr);
            self.set_register(addr, current & !value);
        } else {
            self.set_register(addr, value);
        }
    }
}

// =============================================================================
// Delay
// =============================================================================

/// Delay that only records what it was asked to wait
#[derive(Debug, Default)]
pub struct MockDelay {
    total_ns: u64,
    calls: usize,
}

impl MockDelay {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn total_ms(&self) -> u64 {
        self.total_ns / 1_000_000
    }

    pub fn calls(&self) -> usize {
        self.calls
    }
}

impl DelayNs for MockDelay {
    fn delay_ns(&mut self, ns: u32) {
        self.total_ns += u64::from(ns);
        self.calls += 1;
    }

    fn delay_ms(&mut self, ms: u32) {
        self.total_ns += u64::from(ms) * 1_000_000;
        self.calls += 1;
    }
}

// =============================================================================
// Acquisition Framework
// =============================================================================

/// Scriptable acquisition framework.
///
/// By default it arms on request, streams, and maps a page as one segment
/// per `page_size` at a fixed host address.
#[derive(Debug)]
pub struct MockAcquisition {
    pub armed: bool,
    pub streaming: bool,
    pub hw_busy: bool,
    /// `trigger_arm` leaves the trigger disarmed
    pub arm_fails: bool,
    /// `map_active_page` fails with this error
    pub map_error: Option<DmaError>,
    /// Segments reported by `map_active_page`; empty maps one segment
    pub segments: Vec<DmaSegment>,
    /// Overrides the count returned by `map_active_page`
    pub reported_count: Option<usize>,
    pub arm_calls: usize,
    pub abort_calls: usize,
    pub map_calls: usize,
    pub unmap_calls: usize,
    pub outcomes: Vec<TransferOutcome>,
}

impl MockAcquisition {
    pub const HOST_ADDR: u64 = 0x8000_0000;

    pub fn new() -> Self {
        Self {
            armed: false,
            streaming: true,
            hw_busy: false,
            arm_fails: false,
            map_error: None,
            segments: Vec::new(),
            reported_count: None,
            arm_calls: 0,
            abort_calls: 0,
            map_calls: 0,
            unmap_calls: 0,
            outcomes: Vec::new(),
        }
    }
}

impl Default for MockAcquisition {
    fn default() -> Self {
        Self::new()
    }
}

impl Acquisition for MockAcquisition {
    fn is_armed(&self) -> bool {
        self.armed
    }

    fn trigger_arm(&mut self) {
        self.arm_calls += 1;
        self.armed = !self.arm_fails;
    }

    fn trigger_abort_and_disable(&mut self) {
        self.abort_calls += 1;
        self.armed = false;
    }

    fn on_transfer_complete(&mut self, outcome: TransferOutcome) -> bool {
        self.outcomes.push(outcome);
        let rearm = self.streaming && outcome == TransferOutcome::Completed;
        self.armed = rearm;
        rearm
    }

    fn map_active_page(&mut self, page_size: u32, segments: &mut [DmaSegment]) -> DmaResult<usize> {
        self.map_calls += 1;
        if let Some(e) = self.map_error {
            return Err(e);
        }

        let count = if self.segments.is_empty() {
            let first = segments.first_mut().ok_or(DmaError::ResourceExhausted)?;
            *first = DmaSegment::new(Self::HOST_ADDR, page_size);
            1
        } else {
            let n = self.segments.len().min(segments.len());
            segments[..n].copy_from_slice(&self.segments[..n]);
            self.segments.len()
        };
        Ok(self.reported_count.unwrap_or(count))
    }

    fn unmap_active_page(&mut self) {
        self.unmap_calls += 1;
    }

    fn set_streaming(&mut self, enabled: bool) {
        self.streaming = enabled;
    }

    fn set_hw_busy(&mut self, busy: bool) {
        self.hw_busy = busy;
    }
}
