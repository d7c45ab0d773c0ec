//! Register field table for the board's hardware sub-blocks.
//!
//! Offsets are relative to the sub-block base discovered at attach time
//! (see [`BlockBases`](crate::driver::config::BlockBases)).

use super::Field;

/// Acquisition core: link control, page geometry and page address
pub mod acq_core {
    use super::Field;

    /// Transmitter disable
    pub const TX_DIS: Field = Field::bitfield(0x00, 0x0000_0001);
    /// GTP transceiver reset (pulsed to resynchronize the link)
    pub const RST_GTP: Field = Field::bitfield(0x00, 0x0000_0100);
    /// Receive path reset
    pub const RST_RX: Field = Field::bitfield(0x00, 0x0000_0200);
    /// Transmit path reset
    pub const RST_TX: Field = Field::bitfield(0x00, 0x0000_0400);
    /// Clock/data recovery reset
    pub const RST_CDR: Field = Field::bitfield(0x00, 0x0000_0800);
    /// Word aligner reset
    pub const RST_ALG: Field = Field::bitfield(0x00, 0x0000_1000);
    /// Page buffer reset
    pub const RST_BUF: Field = Field::bitfield(0x00, 0x0000_2000);

    /// Link aligned status bit
    pub const STAT_ALIGNED: Field = Field::bitfield(0x04, 0x0000_0001);

    /// Page size in bytes
    pub const PAGE_SIZE: Field = Field::register(0x18, 0xFFFF_FFFF);
    /// Device-memory offset of the last filled page
    pub const PAGE_ADDR: Field = Field::register(0x1C, 0xFFFF_FFFF);
    /// Device-memory offset of the mark
    pub const MARK_ADDR: Field = Field::register(0x20, 0xFFFF_FFFF);
}

/// Interrupt source register layout shared by the acquisition and DMA
/// interrupt blocks.
macro_rules! irq_block {
    () => {
        use super::Field;

        /// Write 1 to mask the corresponding source
        pub const DISABLE_MASK: Field = Field::register(0x00, 0x0000_0003);
        /// Write 1 to unmask the corresponding source
        pub const ENABLE_MASK: Field = Field::register(0x04, 0x0000_0003);
        /// Current mask state
        pub const MASK_STATUS: Field = Field::register(0x08, 0x0000_0003);
        /// Pending sources, write 1 to clear
        pub const SRC: Field = Field::register(0x0C, 0x0000_0003);
    };
}

/// Acquisition interrupt source
pub mod acq_irq {
    irq_block!();

    /// Trigger event
    pub const TRG: u32 = 1 << 0;
    /// Page ready
    pub const ACQ: u32 = 1 << 1;
    /// All sources
    pub const ALL: u32 = TRG | ACQ;
}

/// DMA interrupt source
pub mod dma_irq {
    irq_block!();

    /// Transfer completed
    pub const DONE: u32 = 1 << 0;
    /// Transfer failed
    pub const ERR: u32 = 1 << 1;
    /// All sources
    pub const ALL: u32 = DONE | ERR;
}

/// DMA engine: control, status and head descriptor registers
pub mod dma_core {
    use super::Field;

    /// Byte swap mode
    pub const CTL_SWP: Field = Field::bitfield(0x00, 0x0000_000C);
    /// Abort the running transfer
    pub const CTL_ABORT: Field = Field::bitfield(0x00, 0x0000_0002);
    /// Start a transfer from the head registers
    pub const CTL_START: Field = Field::bitfield(0x00, 0x0000_0001);
    /// Engine status (see `DmaEngineStatus`)
    pub const STA: Field = Field::register(0x04, 0x0000_0007);
    /// Device-memory start offset
    pub const ADDR: Field = Field::register(0x08, 0xFFFF_FFFF);
    /// Host DMA address, low word
    pub const ADDR_L: Field = Field::register(0x0C, 0xFFFF_FFFF);
    /// Host DMA address, high word
    pub const ADDR_H: Field = Field::register(0x10, 0xFFFF_FFFF);
    /// Transfer length in bytes
    pub const LEN: Field = Field::register(0x14, 0xFFFF_FFFF);
    /// Next descriptor bus address, low word
    pub const NEXT_L: Field = Field::register(0x18, 0xFFFF_FFFF);
    /// Next descriptor bus address, high word
    pub const NEXT_H: Field = Field::register(0x1C, 0xFFFF_FFFF);
    /// Bridge direction
    pub const BR_DIR: Field = Field::bitfield(0x20, 0x0000_0002);
    /// More descriptors follow the head
    pub const BR_LAST: Field = Field::bitfield(0x20, 0x0000_0001);
}

/// Vectored interrupt controller
pub mod vic {
    use super::Field;

    /// End of interrupt, any write acknowledges the current vector
    pub const EOIR: Field = Field::register(0x1C, 0xFFFF_FFFF);
}
