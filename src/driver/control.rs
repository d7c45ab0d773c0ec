//! Acquisition control: start, stop, streaming mode and page size.
//!
//! These run in task context. `start` blocks for the link-alignment poll and
//! the settle delays; nothing here is meant for interrupt context.

use embedded_hal::delay::DelayNs;

use crate::driver::config::{Parameter, validate_page_size};
use crate::driver::error::{ConfigError, ConfigResult, Result};
use crate::driver::framework::Acquisition;
use crate::driver::obsbox::{Flags, ObsBox};
use crate::internal::register::table::acq_core;
use crate::internal::register::{RegisterBus, read_field, write_field};

/// What `stop` does once the flags are updated
enum StopAction {
    /// `start` is mid bring-up and halts on its own
    Pending,
    /// A transfer is in flight, DMA completion finishes the stop
    Deferred,
    Halt,
}

impl<B: RegisterBus, A: Acquisition, const SEGS: usize> ObsBox<B, A, SEGS> {
    /// Start (or restart) acquisition.
    ///
    /// Resets the counters, resynchronizes the link, programs the page size,
    /// arms the trigger and unmasks the interrupts. On any failure the device
    /// is left `Idle` with interrupts masked.
    ///
    /// A `stop` that lands while the hardware is being brought up wins: the
    /// device is halted and left `Idle`.
    ///
    /// # Errors
    ///
    /// - `Busy`: a stop is draining, a transfer is still in flight, or a stop
    ///   arrived during bring-up
    /// - `InvalidParameter`: page size out of range (no register is touched)
    /// - `AlignmentFailed`: the link never reported alignment
    /// - `NotArmed`: the framework did not arm its trigger
    pub fn start<D: DelayNs>(&self, delay: &mut D) -> Result<()> {
        let (page_size, restart) = self.state.with(|s| {
            if s.flags.intersects(Flags::STOPPING | Flags::HW_BUSY | Flags::CONFIGURING) {
                return Err(ConfigError::Busy);
            }
            validate_page_size(s.page_size)?;

            let restart = s.flags.contains(Flags::RUNNING);
            s.flags.remove(Flags::RUNNING);
            s.flags.insert(Flags::CONFIGURING);
            s.stats.reset();
            s.not_armed_streak = 0;
            Ok((s.page_size, restart))
        })?;

        if restart {
            self.halt();
        }

        let mut result = self.bring_up(page_size, delay);

        let cancelled = self.state.with(|s| {
            s.flags.remove(Flags::CONFIGURING);
            let cancelled = s.flags.contains(Flags::STOP_PENDING);
            s.flags.remove(Flags::STOP_PENDING);
            if result.is_ok() && !cancelled {
                s.flags.insert(Flags::RUNNING);
            }
            cancelled
        });

        if cancelled && result.is_ok() {
            self.halt();
            info!("stop requested during start");
            result = Err(ConfigError::Busy);
        } else {
            match result {
                Ok(()) => info!("acquisition started, page size {:#x}", page_size),
                Err(e) => warn!("start failed: {}", e.as_str()),
            }
        }
        result.map_err(Into::into)
    }

    /// Stop acquisition.
    ///
    /// With no transfer in flight the interrupts are masked and the trigger
    /// aborted right away. Otherwise the device enters `Stopping`: page-ready
    /// is masked and the DMA completion handler finishes the teardown.
    /// During `start` the stop is recorded and `start` performs the halt.
    pub fn stop(&self) {
        let action = self.state.with(|s| {
            s.flags.remove(Flags::RUNNING);
            if s.flags.contains(Flags::CONFIGURING) {
                s.flags.insert(Flags::STOP_PENDING);
                StopAction::Pending
            } else if s.flags.contains(Flags::HW_BUSY) {
                s.flags.insert(Flags::STOPPING);
                StopAction::Deferred
            } else {
                s.flags.remove(Flags::STOPPING);
                StopAction::Halt
            }
        });

        match action {
            StopAction::Pending => debug!("stop recorded, start in progress"),
            StopAction::Deferred => {
                info!("stop deferred until the transfer completes");
                self.disable_acq_irq();
            }
            StopAction::Halt => {
                self.halt();
                info!("acquisition stopped");
            }
        }
    }

    /// Switch between streaming and single-shot mode.
    ///
    /// Acquisition is stopped first.
    pub fn set_streaming(&self, enabled: bool) {
        self.stop();
        self.state.with(|s| s.streaming = enabled);
        self.framework.with(|a| a.set_streaming(enabled));
        debug!("streaming {}", enabled);
    }

    /// Set the page size used by the next `start`.
    ///
    /// The hardware only latches the size during `start`, so changes are
    /// refused while acquisition is active.
    ///
    /// # Errors
    ///
    /// - `InvalidParameter`: size out of range
    /// - `Busy`: running, stopping, starting or a transfer in flight
    pub fn set_page_size(&self, size: u32) -> ConfigResult<()> {
        if let Err(e) = validate_page_size(size) {
            warn!("invalid page size {:#x}", size);
            return Err(e);
        }
        self.state.with(|s| {
            if s.flags.intersects(Flags::RUNNING | Flags::STOPPING | Flags::HW_BUSY | Flags::CONFIGURING) {
                return Err(ConfigError::Busy);
            }
            s.page_size = size;
            Ok(())
        })
    }

    /// Read a named parameter
    pub fn parameter(&self, param: Parameter) -> u32 {
        self.state.with_ref(|s| match param {
            Parameter::Run => u32::from(s.flags.contains(Flags::RUNNING)),
            Parameter::Streaming => u32::from(s.streaming),
            Parameter::PageSize => s.page_size,
        })
    }

    /// Write a named parameter.
    ///
    /// `Run`: 0 stops, anything else starts (or restarts). `Streaming`: 0 or
    /// 1. `PageSize`: bytes.
    pub fn set_parameter<D: DelayNs>(&self, param: Parameter, value: u32, delay: &mut D) -> Result<()> {
        match param {
            Parameter::Run if value == 0 => {
                self.stop();
                Ok(())
            }
            Parameter::Run => self.start(delay),
            Parameter::Streaming if value > 1 => Err(ConfigError::InvalidParameter.into()),
            Parameter::Streaming => {
                self.set_streaming(value == 1);
                Ok(())
            }
            Parameter::PageSize => self.set_page_size(value).map_err(Into::into),
        }
    }

    // =========================================================================
    // Internals
    // =========================================================================

    /// Hardware bring-up for `start`
    fn bring_up<D: DelayNs>(&self, page_size: u32, delay: &mut D) -> ConfigResult<()> {
        self.disable_irq();

        // Resync the link
        write_field(&self.bus, self.bases.acq_core, &acq_core::RST_GTP, 1);
        write_field(&self.bus, self.bases.acq_core, &acq_core::RST_GTP, 0);
        self.wait_aligned(delay)?;

        write_field(&self.bus, self.bases.acq_core, &acq_core::PAGE_SIZE, page_size);

        // Gateware needs time after a page-size change and after masking
        delay.delay_ms(self.config.settle_ms);
        self.disable_irq();
        delay.delay_ms(self.config.settle_ms);

        let armed = self.framework.with(|a| {
            a.trigger_arm();
            a.is_armed()
        });
        if !armed {
            self.halt();
            return Err(ConfigError::NotArmed);
        }

        self.enable_irq();
        Ok(())
    }

    /// Poll the link-aligned bit, bounded by the configured retries
    fn wait_aligned<D: DelayNs>(&self, delay: &mut D) -> ConfigResult<()> {
        for _ in 0..self.config.align_retries {
            if read_field(&self.bus, self.bases.acq_core, &acq_core::STAT_ALIGNED) != 0 {
                return Ok(());
            }
            delay.delay_ms(self.config.align_poll_ms);
        }
        Err(ConfigError::AlignmentFailed)
    }

    /// Mask interrupts and abort the trigger
    pub(crate) fn halt(&self) {
        self.disable_irq();
        self.framework.with(|a| a.trigger_abort_and_disable());
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
