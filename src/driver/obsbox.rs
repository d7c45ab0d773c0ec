//! Device context.
//!
//! [`ObsBox`] ties together the register bus, the sub-block bases, the
//! in-flight transfer and the acquisition framework. Every method takes
//! `&self`: the mutable parts live in critical-section cells so one device
//! can be shared by both interrupt vectors and the control task.
//!
//! The control state machine is in `control.rs`, the interrupt handlers in
//! `irq.rs`.

use crate::driver::config::{AcqConfig, BlockBases, State, validate_page_size};
use crate::driver::error::Result;
use crate::driver::framework::Acquisition;
use crate::driver::interrupt::{AcqIrqStatus, DmaEngineStatus, DmaIrqStatus};
use crate::driver::stats::{ErrorPolicy, Stats};
use crate::internal::constants::DEFAULT_DESCRIPTOR_SLOTS;
use crate::internal::dma::Transfer;
use crate::internal::register::table::{acq_core, acq_irq, dma_core, dma_irq, vic};
use crate::internal::register::{RegisterBus, read_field, write_field};
use crate::sync::CriticalSectionCell;

// =============================================================================
// Control Flags
// =============================================================================

/// Bit set of control flags, guarded by the state lock
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub(crate) struct Flags(u8);

impl Flags {
    /// Acquisition requested
    pub(crate) const RUNNING: u8 = 1 << 0;
    /// Stop requested while a transfer is in flight
    pub(crate) const STOPPING: u8 = 1 << 1;
    /// A transfer owns the descriptor pool
    pub(crate) const HW_BUSY: u8 = 1 << 2;
    /// `start` is bringing the hardware up
    pub(crate) const CONFIGURING: u8 = 1 << 3;
    /// Stop requested while `start` was bringing the hardware up
    pub(crate) const STOP_PENDING: u8 = 1 << 4;

    #[inline]
    pub(crate) fn contains(self, bits: u8) -> bool {
        self.0 & bits == bits
    }

    #[inline]
    pub(crate) fn intersects(self, bits: u8) -> bool {
        self.0 & bits != 0
    }

    #[inline]
    pub(crate) fn insert(&mut self, bits: u8) {
        self.0 |= bits;
    }

    #[inline]
    pub(crate) fn remove(&mut self, bits: u8) {
        self.0 &= !bits;
    }
}

/// Flags, counters and settings shared with the interrupt handlers
#[derive(Debug, Clone, Copy)]
pub(crate) struct AcqState {
    pub(crate) flags: Flags,
    pub(crate) stats: Stats,
    pub(crate) page_size: u32,
    pub(crate) last_page: u32,
    pub(crate) streaming: bool,
    pub(crate) not_armed_streak: u32,
}

impl AcqState {
    const fn new(config: &AcqConfig) -> Self {
        Self {
            flags: Flags(0),
            stats: Stats::new(),
            page_size: config.page_size,
            last_page: 0,
            streaming: config.streaming,
            not_armed_streak: 0,
        }
    }

    pub(crate) fn state(&self) -> State {
        if self.flags.contains(Flags::STOPPING) {
            State::Stopping
        } else if self.flags.contains(Flags::RUNNING) {
            State::Running
        } else {
            State::Idle
        }
    }
}

// =============================================================================
// Device Context
// =============================================================================

/// One attached acquisition board.
///
/// # Type Parameters
///
/// * `B` - Register bus reaching the board's register window
/// * `A` - Acquisition framework (trigger, buffers, streaming policy)
/// * `SEGS` - Maximum scatter segments per page (descriptor pool slots)
///
/// The descriptor pool is stored inline and records link to each other by
/// address, so the device must not move while acquisition is running. Keep
/// it in a `static` or otherwise at a fixed place.
///
/// # Example
///
/// ```ignore
/// let bus = unsafe { MmioBus::new(BOARD_WINDOW) };
/// let dev: ObsBox<_, _, 64> = ObsBox::new(bus, bases, channel, AcqConfig::new())?;
/// dev.attach();
/// dev.start(&mut delay)?;
///
/// // from the page-ready vector
/// dev.handle_page_ready();
/// // from the DMA vector
/// dev.handle_dma_done();
/// ```
pub struct ObsBox<B, A, const SEGS: usize = DEFAULT_DESCRIPTOR_SLOTS> {
    pub(crate) bus: B,
    pub(crate) bases: BlockBases,
    pub(crate) config: AcqConfig,
    pub(crate) policy: ErrorPolicy,
    pub(crate) state: CriticalSectionCell<AcqState>,
    pub(crate) transfer: CriticalSectionCell<Transfer<SEGS>>,
    pub(crate) framework: CriticalSectionCell<A>,
}

impl<B: RegisterBus, A: Acquisition, const SEGS: usize> ObsBox<B, A, SEGS> {
    /// Create the device context.
    ///
    /// Fails with `MissingComponent` if a sub-block base is zero and with
    /// `InvalidParameter` if the configured page size is out of range. No
    /// register is touched.
    pub fn new(bus: B, bases: BlockBases, framework: A, config: AcqConfig) -> Result<Self> {
        bases.validate()?;
        validate_page_size(config.page_size)?;

        Ok(Self {
            bus,
            bases,
            config,
            policy: ErrorPolicy::new(),
            state: CriticalSectionCell::new(AcqState::new(&config)),
            transfer: CriticalSectionCell::new(Transfer::with_bus_offset(
                config.descriptor_bus_offset,
            )),
            framework: CriticalSectionCell::new(framework),
        })
    }

    /// Override the error escalation policy
    #[must_use]
    pub fn with_policy(mut self, policy: ErrorPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Bring the board into a known quiet state.
    ///
    /// Masks every interrupt source, programs the configured page size and
    /// tells the framework the initial streaming mode.
    pub fn attach(&self) {
        self.disable_irq();

        let (page_size, streaming) = self.state.with_ref(|s| (s.page_size, s.streaming));
        write_field(&self.bus, self.bases.acq_core, &acq_core::PAGE_SIZE, page_size);
        self.framework.with(|a| a.set_streaming(streaming));

        info!(
            "attached: page size {:#x}, streaming {}",
            page_size, streaming
        );
    }

    /// Tear the device down and hand back the bus and the framework.
    ///
    /// An in-flight transfer is aborted in the engine and its mapping
    /// released.
    pub fn detach(self) -> (B, A) {
        let busy = self.state.with(|s| {
            let busy = s.flags.contains(Flags::HW_BUSY);
            s.flags = Flags::default();
            busy
        });

        if busy {
            warn!("detach with a transfer in flight, aborting");
            write_field(&self.bus, self.bases.dma_core, &dma_core::CTL_ABORT, 1);
            self.transfer.with(|t| {
                self.framework.with(|a| {
                    a.unmap_active_page();
                    a.set_hw_busy(false);
                });
                t.release();
            });
        }

        self.disable_irq();
        self.framework.with(|a| a.trigger_abort_and_disable());
        info!("detached");

        (self.bus, self.framework.into_inner())
    }

    // =========================================================================
    // Accessors
    // =========================================================================

    /// Current acquisition state
    pub fn state(&self) -> State {
        self.state.with_ref(AcqState::state)
    }

    /// Counters for the current run
    pub fn stats(&self) -> Stats {
        self.state.with_ref(|s| s.stats)
    }

    /// Device-memory offset of the last claimed page
    pub fn last_page(&self) -> u32 {
        self.state.with_ref(|s| s.last_page)
    }

    /// Configured page size in bytes
    pub fn page_size(&self) -> u32 {
        self.state.with_ref(|s| s.page_size)
    }

    /// `true` in streaming mode
    pub fn is_streaming(&self) -> bool {
        self.state.with_ref(|s| s.streaming)
    }

    /// `true` while a transfer owns the descriptor pool
    pub fn is_busy(&self) -> bool {
        self.state.with_ref(|s| s.flags.contains(Flags::HW_BUSY))
    }

    /// Sub-block base addresses
    pub fn bases(&self) -> &BlockBases {
        &self.bases
    }

    /// Configuration the device was created with
    pub fn config(&self) -> &AcqConfig {
        &self.config
    }

    /// Error escalation policy in force
    pub fn policy(&self) -> &ErrorPolicy {
        &self.policy
    }

    /// Register bus
    pub fn bus(&self) -> &B {
        &self.bus
    }

    /// Run a closure on the acquisition framework
    pub fn with_framework<R>(&self, f: impl FnOnce(&mut A) -> R) -> R {
        self.framework.with(f)
    }

    /// Inspect the transfer (segment list and descriptor chain)
    pub fn with_transfer<R>(&self, f: impl FnOnce(&Transfer<SEGS>) -> R) -> R {
        self.transfer.with_ref(f)
    }

    /// Decode the DMA engine status register
    pub fn dma_engine_status(&self) -> DmaEngineStatus {
        DmaEngineStatus::from_raw(read_field(
            &self.bus,
            self.bases.dma_core,
            &dma_core::STA,
        ))
    }

    // =========================================================================
    // Interrupt Control
    // =========================================================================

    /// Unmask page-ready and both DMA sources
    pub fn enable_irq(&self) {
        debug!("enable interrupts");
        write_field(&self.bus, self.bases.acq_irq, &acq_irq::ENABLE_MASK, acq_irq::ACQ);
        write_field(&self.bus, self.bases.dma_irq, &dma_irq::ENABLE_MASK, dma_irq::ALL);
    }

    /// Mask every acquisition and DMA source
    pub fn disable_irq(&self) {
        debug!("disable interrupts");
        self.disable_acq_irq();
        write_field(&self.bus, self.bases.dma_irq, &dma_irq::DISABLE_MASK, dma_irq::ALL);
    }

    /// Mask the acquisition sources only, leaving DMA completion live
    pub fn disable_acq_irq(&self) {
        write_field(&self.bus, self.bases.acq_irq, &acq_irq::DISABLE_MASK, acq_irq::ALL);
    }

    /// Signal end of interrupt to the vectored controller
    pub(crate) fn ack_irq(&self) {
        write_field(&self.bus, self.bases.vic, &vic::EOIR, 1);
    }

    /// Read and clear the acquisition interrupt sources
    pub(crate) fn take_acq_status(&self) -> AcqIrqStatus {
        AcqIrqStatus::from_raw(self.take_src(self.bases.acq_irq))
    }

    /// Read and clear the DMA interrupt sources
    pub(crate) fn take_dma_status(&self) -> DmaIrqStatus {
        DmaIrqStatus::from_raw(self.take_src(self.bases.dma_irq))
    }

    fn take_src(&self, base: usize) -> u32 {
        // Both interrupt blocks share the same layout
        let status = read_field(&self.bus, base, &acq_irq::SRC);
        if status != 0 {
            write_field(&self.bus, base, &acq_irq::SRC, status);
        }
        status
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
