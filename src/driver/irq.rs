//! Interrupt handlers.
//!
//! Two sources share the device: page-ready from the acquisition core and
//! completion from the DMA engine. Both handlers run with the other source
//! possibly pending, never block, and never return errors: failures end up
//! in the counters and, past the policy threshold, in a forced stop.
//!
//! The busy flag is the only admission control. Page-ready is the only
//! place that sets it; DMA-done (or the setup abort path) the only place
//! that clears it.

use crate::driver::error::{DmaError, DmaResult};
use crate::driver::framework::{Acquisition, TransferOutcome};
use crate::driver::interrupt::IrqReturn;
use crate::driver::obsbox::{Flags, ObsBox};
use crate::internal::constants::{DMA_BYTE_SWAP, NOT_ARMED_LIMIT};
use crate::internal::register::table::{acq_core, dma_core};
use crate::internal::register::{RegisterBus, read_field, write_field};

/// Decision taken under the state lock for one page-ready event
enum PageClaim {
    /// A stop is pending
    Stopping,
    /// Acquisition is not running
    Idle,
    /// A transfer is already in flight
    Busy,
    /// The framework was not armed; carries the current streak
    NotArmed(u32),
    /// Page claimed, transfer may start
    Claimed { page_size: u32 },
}

impl<B: RegisterBus, A: Acquisition, const SEGS: usize> ObsBox<B, A, SEGS> {
    /// Page-ready interrupt handler.
    ///
    /// Claims the announced page if no transfer is in flight and the
    /// trigger is armed, builds the descriptor chain and starts the engine.
    pub fn handle_page_ready(&self) -> IrqReturn {
        let status = self.take_acq_status();
        if !status.page_ready {
            return IrqReturn::None;
        }

        let armed = self.framework.with_ref(|a| a.is_armed());
        let page = read_field(&self.bus, self.bases.acq_core, &acq_core::PAGE_ADDR);

        let claim = self.state.with(|s| {
            if s.flags.contains(Flags::STOPPING) {
                return PageClaim::Stopping;
            }
            if !s.flags.contains(Flags::RUNNING) {
                return PageClaim::Idle;
            }
            if s.flags.contains(Flags::HW_BUSY) {
                s.stats.record_page_lost();
                return PageClaim::Busy;
            }
            if !armed {
                s.stats.record_error();
                s.not_armed_streak = s.not_armed_streak.saturating_add(1);
                return PageClaim::NotArmed(s.not_armed_streak);
            }

            s.flags.insert(Flags::HW_BUSY);
            s.last_page = page;
            s.not_armed_streak = 0;
            PageClaim::Claimed {
                page_size: s.page_size,
            }
        });

        match claim {
            PageClaim::Stopping => self.finish_stop(),
            PageClaim::Idle => debug!("page {:#x} ready while idle", page),
            PageClaim::Busy => {
                warn!("{} {:#x}: DMA running", DmaError::PageLost.as_str(), page);
            }
            PageClaim::NotArmed(streak) => {
                warn!("{} {:#x}: trigger not armed", DmaError::PageLost.as_str(), page);
                if streak >= NOT_ARMED_LIMIT {
                    error!("trigger not armed for {} pages, stopping", streak);
                    self.stop();
                }
            }
            PageClaim::Claimed { page_size } => {
                debug!("acquire page {:#x}", page);
                self.framework.with(|a| a.set_hw_busy(true));
                if let Err(e) = self.launch_transfer(page, page_size) {
                    self.abort_transfer(e);
                }
            }
        }

        self.check_errors();
        self.ack_irq();
        IrqReturn::Handled
    }

    /// DMA interrupt handler.
    ///
    /// Releases the transfer, records the outcome and either lets the
    /// framework re-arm or stops acquisition.
    pub fn handle_dma_done(&self) -> IrqReturn {
        let status = self.take_dma_status();
        if !status.any() {
            return IrqReturn::None;
        }

        if !self.is_busy() {
            warn!("DMA interrupt {:#x} without a transfer", status.to_raw());
            self.ack_irq();
            return IrqReturn::Handled;
        }

        // Resources go back before the busy flag is cleared
        self.transfer.with(|t| {
            self.framework.with(|a| a.unmap_active_page());
            t.release();
        });

        let success = status.is_success();
        let stopping = self.state.with(|s| {
            s.flags.remove(Flags::HW_BUSY);
            if success {
                s.stats.record_success();
            } else {
                s.stats.record_error();
            }
            s.flags.contains(Flags::STOPPING)
        });

        let outcome = if success {
            TransferOutcome::Completed
        } else {
            TransferOutcome::Failed
        };
        let rearm = self.framework.with(|a| {
            a.set_hw_busy(false);
            a.on_transfer_complete(outcome)
        });

        if success {
            if !rearm || stopping {
                debug!("single shot or stop pending, stop acquisition");
                self.stop();
            }
        } else {
            error!(
                "{}: irq {:#x}, engine {}",
                DmaError::TransferError.as_str(),
                status.to_raw(),
                self.dma_engine_status().as_str()
            );
            self.stop();
        }

        self.check_errors();
        self.ack_irq();
        IrqReturn::Handled
    }

    // =========================================================================
    // Internals
    // =========================================================================

    /// Map the active block, build the chain and start the engine.
    ///
    /// Nothing reaches the engine registers unless mapping and loading both
    /// succeed.
    fn launch_transfer(&self, page: u32, page_size: u32) -> DmaResult<()> {
        self.transfer.with(|t| {
            let count = self
                .framework
                .with(|a| a.map_active_page(page_size, t.segments_mut()))?;

            if let Err(e) = t.load(count, page) {
                self.framework.with(|a| a.unmap_active_page());
                return Err(e);
            }

            t.build_chain();
            t.program_head(&self.bus, self.bases.dma_core);
            Ok(())
        })?;

        write_field(&self.bus, self.bases.dma_core, &dma_core::CTL_SWP, DMA_BYTE_SWAP);
        write_field(&self.bus, self.bases.dma_core, &dma_core::CTL_START, 1);
        Ok(())
    }

    /// Undo a claimed page whose transfer never started
    fn abort_transfer(&self, err: DmaError) {
        error!("cannot start DMA: {}", err.as_str());

        self.transfer.with(|t| t.release());
        self.state.with(|s| {
            s.flags.remove(Flags::HW_BUSY);
            s.stats.record_error();
        });
        // Streaming re-arm after an abort is the framework's call
        let _ = self.framework.with(|a| {
            a.set_hw_busy(false);
            a.on_transfer_complete(TransferOutcome::Aborted)
        });
    }

    /// Complete a pending stop from the page-ready path
    fn finish_stop(&self) {
        if self.is_busy() {
            // DMA completion still has to run
            self.disable_acq_irq();
        } else {
            self.state.with(|s| s.flags.remove(Flags::STOPPING));
            self.halt();
            info!("acquisition stopped");
        }
    }

    /// Force a stop once the counters cross the policy thresholds
    fn check_errors(&self) {
        let escalate = self.state.with_ref(|s| {
            s.flags.intersects(Flags::RUNNING | Flags::STOPPING)
                && self.policy.should_stop(&s.stats)
        });
        if !escalate {
            return;
        }

        let stats = self.stats();
        error!(
            "{} errors, {} consecutive: stopping acquisition",
            stats.errors, stats.consecutive_errors
        );
        self.stop();
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    extern crate std;

    use super::*;
    use crate::driver::config::{AcqConfig, State};
    use crate::internal::dma::DmaSegment;
    use crate::internal::register::table::{acq_irq, dma_irq, vic};
    use crate::testing::{MockAcquisition, MockDelay, MockRegisterBus, test_bases};
    use std::vec;

    type Dev<'a> = ObsBox<&'a MockRegisterBus, MockAcquisition, 4>;

    const PAGE: u32 = 0x0030_0000;

    fn running(bus: &MockRegisterBus, streaming: bool) -> Dev<'_> {
        bus.set_aligned(test_bases().acq_core);
        let mut acq = MockAcquisition::new();
        acq.streaming = streaming;
        acq.segments = vec![
            DmaSegment::new(0x1_0000_0000, 0x8_0000),
            DmaSegment::new(0x1_0010_0000, 0x8_0000),
        ];
        let dev: Dev<'_> = ObsBox::new(
            bus,
            test_bases(),
            acq,
            AcqConfig::new().with_streaming(streaming),
        )
        .unwrap();
        dev.start(&mut MockDelay::new()).unwrap();
        bus.clear_writes();
        dev
    }

    fn raise_page_ready(bus: &MockRegisterBus, page: u32) {
        let b = test_bases();
        bus.set_register(b.acq_core + acq_core::PAGE_ADDR.offset, page);
        bus.set_register(b.acq_irq + acq_irq::SRC.offset, acq_irq::ACQ);
    }

    fn raise_dma(bus: &MockRegisterBus, bits: u32) {
        bus.set_register(test_bases().dma_irq + dma_irq::SRC.offset, bits);
    }

    fn started(bus: &MockRegisterBus) -> bool {
        let ctl = test_bases().dma_core + dma_core::CTL_START.offset;
        bus.writes()
            .iter()
            .any(|&(addr, v)| addr == ctl && v & dma_core::CTL_START.mask != 0)
    }

    #[test]
    fn page_ready_spurious_is_ignored() {
        let bus = MockRegisterBus::new();
        let dev = running(&bus, true);

        assert_eq!(dev.handle_page_ready(), IrqReturn::None);
        assert!(bus.writes().is_empty());
    }

    #[test]
    fn trigger_bit_alone_is_not_a_page() {
        let bus = MockRegisterBus::new();
        let dev = running(&bus, true);
        bus.set_register(test_bases().acq_irq + acq_irq::SRC.offset, acq_irq::TRG);

        assert_eq!(dev.handle_page_ready(), IrqReturn::None);
        assert!(!dev.is_busy());
    }

    #[test]
    fn page_ready_claims_and_starts_dma() {
        let bus = MockRegisterBus::new();
        let dev = running(&bus, true);
        raise_page_ready(&bus, PAGE);

        assert_eq!(dev.handle_page_ready(), IrqReturn::Handled);

        let b = test_bases();
        assert!(dev.is_busy());
        assert_eq!(dev.last_page(), PAGE);
        assert!(started(&bus));
        assert_eq!(
            bus.get_register(b.dma_core + dma_core::CTL_SWP.offset) & dma_core::CTL_SWP.mask,
            DMA_BYTE_SWAP << dma_core::CTL_SWP.shift()
        );
        assert_eq!(bus.get_register(b.dma_core + dma_core::ADDR.offset), PAGE);
        assert_eq!(bus.get_register(b.dma_core + dma_core::ADDR_H.offset), 0x1);
        assert_eq!(bus.get_register(b.acq_irq + acq_irq::SRC.offset), 0);
        assert!(bus.writes().iter().any(|&(addr, _)| addr == b.vic + vic::EOIR.offset));
        assert!(dev.with_framework(|a| a.hw_busy));
    }

    #[test]
    fn chain_is_built_before_engine_start() {
        let bus = MockRegisterBus::new();
        let dev = running(&bus, true);
        raise_page_ready(&bus, PAGE);
        dev.handle_page_ready();

        let b = test_bases();
        let writes = bus.writes();
        let head = writes
            .iter()
            .position(|&(addr, _)| addr == b.dma_core + dma_core::ADDR.offset)
            .unwrap();
        let start = writes
            .iter()
            .rposition(|&(addr, v)| addr == b.dma_core && v & dma_core::CTL_START.mask != 0)
            .unwrap();
        assert!(head < start);

        dev.with_transfer(|t| {
            assert_eq!(t.segment_count(), 2);
            assert_eq!(t.record(0).unwrap().next_addr(), t.record_bus_addr(1));
            assert!(t.record(1).unwrap().is_last());
            assert_eq!(t.record(1).unwrap().start_addr(), PAGE + 0x8_0000);
        });
    }

    #[test]
    fn page_ready_while_busy_drops_page() {
        let bus = MockRegisterBus::new();
        let dev = running(&bus, true);
        raise_page_ready(&bus, PAGE);
        dev.handle_page_ready();
        bus.clear_writes();

        raise_page_ready(&bus, PAGE + 0x10_0000);
        assert_eq!(dev.handle_page_ready(), IrqReturn::Handled);

        let stats = dev.stats();
        assert_eq!(stats.pages_lost, 1);
        assert_eq!(stats.consecutive_errors, 1);
        assert_eq!(dev.last_page(), PAGE);
        assert!(!started(&bus));
        assert_eq!(dev.with_framework(|a| a.map_calls), 1);
    }

    #[test]
    fn page_ready_not_armed_counts_error() {
        let bus = MockRegisterBus::new();
        let dev = running(&bus, true);
        dev.with_framework(|a| a.armed = false);
        raise_page_ready(&bus, PAGE);

        assert_eq!(dev.handle_page_ready(), IrqReturn::Handled);
        assert!(!dev.is_busy());
        assert_eq!(dev.stats().errors, 1);
        assert_eq!(dev.stats().consecutive_errors, 1);
        assert_eq!(dev.stats().pages_lost, 0);
        assert!(!started(&bus));
    }

    #[test]
    fn repeated_not_armed_forces_stop() {
        let bus = MockRegisterBus::new();
        let dev = running(&bus, true);
        dev.with_framework(|a| a.armed = false);

        for _ in 0..NOT_ARMED_LIMIT - 1 {
            raise_page_ready(&bus, PAGE);
            dev.handle_page_ready();
        }
        assert_eq!(dev.state(), State::Running);

        raise_page_ready(&bus, PAGE);
        dev.handle_page_ready();
        assert_eq!(dev.state(), State::Idle);
        assert_eq!(dev.with_framework(|a| a.abort_calls), 1);
    }

    #[test]
    fn mapping_failure_aborts_without_starting() {
        let bus = MockRegisterBus::new();
        let dev = running(&bus, true);
        dev.with_framework(|a| a.map_error = Some(DmaError::ResourceExhausted));
        raise_page_ready(&bus, PAGE);

        assert_eq!(dev.handle_page_ready(), IrqReturn::Handled);

        let b = test_bases();
        assert!(!dev.is_busy());
        assert_eq!(dev.stats().errors, 1);
        assert!(!bus.writes().iter().any(|&(addr, _)| addr == b.dma_core + dma_core::ADDR.offset));
        assert!(!started(&bus));
        assert_eq!(
            dev.with_framework(|a| a.outcomes.last().copied()),
            Some(TransferOutcome::Aborted)
        );
        assert!(!dev.with_framework(|a| a.hw_busy));
    }

    #[test]
    fn missing_active_block_aborts() {
        let bus = MockRegisterBus::new();
        let dev = running(&bus, true);
        dev.with_framework(|a| a.map_error = Some(DmaError::NoActiveBlock));
        raise_page_ready(&bus, PAGE);
        dev.handle_page_ready();

        assert!(!dev.is_busy());
        assert_eq!(dev.stats().errors, 1);
        assert!(!started(&bus));
    }

    #[test]
    fn too_many_segments_aborts_and_unmaps() {
        let bus = MockRegisterBus::new();
        let dev = running(&bus, true);
        dev.with_framework(|a| a.reported_count = Some(5));
        raise_page_ready(&bus, PAGE);
        dev.handle_page_ready();

        assert!(!dev.is_busy());
        assert_eq!(dev.with_framework(|a| a.unmap_calls), 1);
        assert!(!started(&bus));
    }

    #[test]
    fn dma_done_spurious_is_ignored() {
        let bus = MockRegisterBus::new();
        let dev = running(&bus, true);
        assert_eq!(dev.handle_dma_done(), IrqReturn::None);
    }

    #[test]
    fn dma_done_releases_and_rearms_in_streaming() {
        let bus = MockRegisterBus::new();
        let dev = running(&bus, true);
        raise_page_ready(&bus, PAGE);
        dev.handle_page_ready();

        raise_dma(&bus, dma_irq::DONE);
        assert_eq!(dev.handle_dma_done(), IrqReturn::Handled);

        assert!(!dev.is_busy());
        assert_eq!(dev.stats().done, 1);
        assert_eq!(dev.state(), State::Running);
        assert!(!dev.with_transfer(|t| t.is_loaded()));
        assert_eq!(dev.with_framework(|a| a.unmap_calls), 1);
        assert!(dev.with_framework(|a| a.armed));
        assert_eq!(dev.with_framework(|a| a.abort_calls), 0);
    }

    #[test]
    fn dma_done_single_shot_stops_once() {
        let bus = MockRegisterBus::new();
        let dev = running(&bus, false);
        raise_page_ready(&bus, PAGE);
        dev.handle_page_ready();

        raise_dma(&bus, dma_irq::DONE);
        dev.handle_dma_done();

        assert_eq!(dev.stats().done, 1);
        assert_eq!(dev.state(), State::Idle);
        assert_eq!(dev.with_framework(|a| a.abort_calls), 1);
    }

    #[test]
    fn dma_error_forces_stop_and_clears_busy() {
        let bus = MockRegisterBus::new();
        let dev = running(&bus, true);
        raise_page_ready(&bus, PAGE);
        dev.handle_page_ready();
        bus.set_register(test_bases().dma_core + dma_core::STA.offset, 3);

        raise_dma(&bus, dma_irq::ERR);
        assert_eq!(dev.handle_dma_done(), IrqReturn::Handled);

        let stats = dev.stats();
        assert!(!dev.is_busy());
        assert_eq!(stats.errors, 1);
        assert_eq!(stats.consecutive_errors, 1);
        assert_eq!(stats.done, 0);
        assert_eq!(dev.state(), State::Idle);
        assert!(!dev.with_framework(|a| a.armed));
        assert_eq!(dev.with_framework(|a| a.unmap_calls), 1);
    }

    #[test]
    fn done_and_error_together_is_a_failure() {
        let bus = MockRegisterBus::new();
        let dev = running(&bus, true);
        raise_page_ready(&bus, PAGE);
        dev.handle_page_ready();

        raise_dma(&bus, dma_irq::DONE | dma_irq::ERR);
        dev.handle_dma_done();

        assert_eq!(dev.stats().done, 0);
        assert_eq!(dev.stats().errors, 1);
        assert_eq!(dev.state(), State::Idle);
    }

    #[test]
    fn dma_done_without_transfer_is_acknowledged() {
        let bus = MockRegisterBus::new();
        let dev = running(&bus, true);
        raise_dma(&bus, dma_irq::DONE);

        assert_eq!(dev.handle_dma_done(), IrqReturn::Handled);
        assert_eq!(dev.stats().done, 0);
        assert_eq!(dev.with_framework(|a| a.unmap_calls), 0);
    }

    #[test]
    fn deferred_stop_completes_on_dma_done() {
        let bus = MockRegisterBus::new();
        let dev = running(&bus, true);
        raise_page_ready(&bus, PAGE);
        dev.handle_page_ready();

        dev.stop();
        assert_eq!(dev.state(), State::Stopping);
        assert_eq!(dev.with_framework(|a| a.abort_calls), 0);

        raise_dma(&bus, dma_irq::DONE);
        dev.handle_dma_done();

        assert_eq!(dev.state(), State::Idle);
        assert_eq!(dev.stats().done, 1);
        assert_eq!(dev.with_framework(|a| a.abort_calls), 1);
        assert!(!dev.with_framework(|a| a.armed));
    }

    #[test]
    fn page_ready_while_stopping_starts_nothing() {
        let bus = MockRegisterBus::new();
        let dev = running(&bus, true);
        dev.state.with(|s| {
            s.flags.remove(Flags::RUNNING);
            s.flags.insert(Flags::STOPPING);
        });
        raise_page_ready(&bus, PAGE);

        assert_eq!(dev.handle_page_ready(), IrqReturn::Handled);
        assert_eq!(dev.state(), State::Idle);
        assert!(!started(&bus));
        assert_eq!(dev.with_framework(|a| a.abort_calls), 1);
    }

    #[test]
    fn policy_escalation_needs_lifetime_floor() {
        let bus = MockRegisterBus::new();
        let dev = running(&bus, true);
        dev.state.with(|s| {
            s.stats.errors = 14;
            s.stats.consecutive_errors = 4;
        });
        dev.with_framework(|a| a.armed = false);

        // consecutive reaches 5 but lifetime is 15
        raise_page_ready(&bus, PAGE);
        dev.handle_page_ready();
        assert_eq!(dev.state(), State::Running);

        dev.state.with(|s| s.stats.errors = 19);
        raise_page_ready(&bus, PAGE);
        dev.handle_page_ready();
        assert_eq!(dev.stats().errors, 20);
        assert_eq!(dev.state(), State::Idle);
    }
}
