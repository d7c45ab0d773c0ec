//! Register field access for the acquisition board.
//!
//! Every hardware sub-block is a flat window of 32-bit registers reached as
//! `base + offset`. A [`Field`] names one register (or a bit-field inside one)
//! and [`read_field`] / [`write_field`] hide the mask and shift bookkeeping.
//!
//! The bus itself is abstracted by [`RegisterBus`] so the engine can run
//! against memory-mapped I/O on target and against a mock on the host.

pub mod table;

// =============================================================================
// Raw Volatile Access
// =============================================================================

/// Read a 32-bit register at the given address
///
/// # Safety
/// The caller must ensure the address is valid and properly aligned.
#[inline(always)]
pub unsafe fn read_reg(addr: usize) -> u32 {
    unsafe { core::ptr::read_volatile(addr as *const u32) }
}

/// Write a 32-bit value to a register at the given address
///
/// # Safety
/// The caller must ensure the address is valid and properly aligned.
#[inline(always)]
pub unsafe fn write_reg(addr: usize, value: u32) {
    unsafe { core::ptr::write_volatile(addr as *mut u32, value) }
}

// =============================================================================
// Register Bus
// =============================================================================

/// Access to the board's flat 32-bit register space.
///
/// Addresses are byte offsets into the board window (block base plus field
/// offset). Implementations must be usable from interrupt context: no
/// blocking, no allocation.
pub trait RegisterBus {
    /// Read the 32-bit register at `addr`
    fn read32(&self, addr: usize) -> u32;

    /// Write the 32-bit register at `addr`
    fn write32(&self, addr: usize, value: u32);
}

impl<T: RegisterBus + ?Sized> RegisterBus for &T {
    #[inline]
    fn read32(&self, addr: usize) -> u32 {
        (**self).read32(addr)
    }

    #[inline]
    fn write32(&self, addr: usize, value: u32) {
        (**self).write32(addr, value);
    }
}

/// Memory-mapped register window.
#[derive(Debug)]
pub struct MmioBus {
    window: usize,
}

impl MmioBus {
    /// Create a bus over the register window starting at `window`.
    ///
    /// # Safety
    /// `window` must be the virtual address of the board's register space,
    /// mapped for the lifetime of the returned value, and every offset the
    /// engine uses must stay inside it.
    pub const unsafe fn new(window: usize) -> Self {
        Self { window }
    }
}

impl RegisterBus for MmioBus {
    #[inline(always)]
    fn read32(&self, addr: usize) -> u32 {
        // SAFETY: validity of the window is a constructor precondition
        unsafe { read_reg(self.window + addr) }
    }

    #[inline(always)]
    fn write32(&self, addr: usize, value: u32) {
        // SAFETY: validity of the window is a constructor precondition
        unsafe { write_reg(self.window + addr, value) }
    }
}

// SAFETY: volatile 32-bit accesses are single bus transactions
unsafe impl Sync for MmioBus {}
unsafe impl Send for MmioBus {}

// =============================================================================
// Field Descriptors
// =============================================================================

/// One named register field: byte offset from its block base, bit mask, and
/// whether the value is right-aligned on access.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Field {
    /// Byte offset relative to the owning block base
    pub offset: usize,
    /// Bits of the register covered by this field
    pub mask: u32,
    /// `true` for a sub-register field, `false` for a full register
    pub is_bitfield: bool,
}

impl Field {
    /// A bit-field: values are shifted into/out of the mask position
    pub const fn bitfield(offset: usize, mask: u32) -> Self {
        Self {
            offset,
            mask,
            is_bitfield: true,
        }
    }

    /// A full register: values are masked but never shifted
    pub const fn register(offset: usize, mask: u32) -> Self {
        Self {
            offset,
            mask,
            is_bitfield: false,
        }
    }

    /// Position of the lowest bit of the mask
    #[inline]
    pub const fn shift(&self) -> u32 {
        self.mask.trailing_zeros()
    }
}

/// Read a field, right-aligned if it is a bit-field.
pub fn read_field<B: RegisterBus + ?Sized>(bus: &B, base: usize, field: &Field) -> u32 {
    let raw = bus.read32(base + field.offset) & field.mask;
    if field.is_bitfield {
        raw.checked_shr(field.shift()).unwrap_or(0)
    } else {
        raw
    }
}

/// Write a field.
///
/// Bit-fields are read-modify-written: the masked bits are cleared and
/// `value` is shifted into place. Bits of `value` that do not fit the mask
/// are dropped with a warning. Full-register fields are written directly,
/// masked.
pub fn write_field<B: RegisterBus + ?Sized>(bus: &B, base: usize, field: &Field, value: u32) {
    let addr = base + field.offset;

    if !field.is_bitfield {
        bus.write32(addr, value & field.mask);
        return;
    }

    let shifted = u64::from(value) << field.shift();
    if shifted & !u64::from(field.mask) != 0 {
        warn!(
            "addr {:#x}: value {:#x} doesn't fit mask {:#x}",
            addr, value, field.mask
        );
    }

    let current = bus.read32(addr) & !field.mask;
    bus.write32(addr, current | (shifted as u32 & field.mask));
}

// =============================================================================
// Unit Tests
// =============================================================================
