//! Hardware descriptor record fetched by the DMA engine.
//!
//! One record per scatter segment. Records live in the descriptor pool and
//! are linked by bus address; the engine walks the chain on its own once the
//! head has been programmed into its registers.

/// Volatile cell wrapper for descriptor fields
///
/// Ensures all accesses are volatile to prevent compiler optimization
/// from reordering or caching descriptor field accesses.
#[repr(transparent)]
pub(crate) struct VolatileCell<T: Copy> {
    value: core::cell::UnsafeCell<T>,
}

// Safety: all access is through volatile operations which are single
// 32-bit transactions for the field types used here.
unsafe impl<T: Copy> Sync for VolatileCell<T> {}

impl<T: Copy> VolatileCell<T> {
    /// Create a new volatile cell with the given initial value
    #[inline(always)]
    pub const fn new(value: T) -> Self {
        Self {
            value: core::cell::UnsafeCell::new(value),
        }
    }

    /// Read the value (volatile read)
    #[inline(always)]
    pub fn get(&self) -> T {
        unsafe { core::ptr::read_volatile(self.value.get()) }
    }

    /// Write a value (volatile write)
    #[inline(always)]
    pub fn set(&self, value: T) {
        unsafe { core::ptr::write_volatile(self.value.get(), value) }
    }
}

/// `attribute` value: more records follow this one
pub const ATTR_MORE: u32 = 0x1;

/// `attribute` value: this is the final record of the chain
pub const ATTR_LAST: u32 = 0x0;

/// DMA descriptor record (32 bytes).
#[repr(C, align(8))]
pub struct HwDescriptor {
    /// Device-memory start offset of this segment
    start_addr: VolatileCell<u32>,
    /// Host DMA address, low word
    dma_addr_l: VolatileCell<u32>,
    /// Host DMA address, high word
    dma_addr_h: VolatileCell<u32>,
    /// Segment length in bytes
    dma_len: VolatileCell<u32>,
    /// Bus address of the next record, low word (0 if last)
    next_addr_l: VolatileCell<u32>,
    /// Bus address of the next record, high word (0 if last)
    next_addr_h: VolatileCell<u32>,
    /// [`ATTR_MORE`] or [`ATTR_LAST`]
    attribute: VolatileCell<u32>,
    _reserved: u32,
}

const _: () = assert!(core::mem::size_of::<HwDescriptor>() == HwDescriptor::SIZE);

impl HwDescriptor {
    /// Size of one record in bytes
    pub const SIZE: usize = 32;

    /// Create a zeroed record
    #[must_use]
    pub const fn new() -> Self {
        Self {
            start_addr: VolatileCell::new(0),
            dma_addr_l: VolatileCell::new(0),
            dma_addr_h: VolatileCell::new(0),
            dma_len: VolatileCell::new(0),
            next_addr_l: VolatileCell::new(0),
            next_addr_h: VolatileCell::new(0),
            attribute: VolatileCell::new(ATTR_LAST),
            _reserved: 0,
        }
    }

    /// Populate the record.
    ///
    /// `next` is the bus address of the following record, or `None` for the
    /// tail of the chain.
    pub fn fill(&self, start_addr: u32, dma_addr: u64, len: u32, next: Option<u64>) {
        self.start_addr.set(start_addr);
        self.dma_addr_l.set(dma_addr as u32);
        self.dma_addr_h.set((dma_addr >> 32) as u32);
        self.dma_len.set(len);

        match next {
            Some(addr) => {
                self.next_addr_l.set(addr as u32);
                self.next_addr_h.set((addr >> 32) as u32);
                self.attribute.set(ATTR_MORE);
            }
            None => {
                self.next_addr_l.set(0);
                self.next_addr_h.set(0);
                self.attribute.set(ATTR_LAST);
            }
        }
    }

    /// Zero every field
    pub fn clear(&self) {
        self.fill(0, 0, 0, None);
    }

    /// Device-memory start offset
    #[inline(always)]
    pub fn start_addr(&self) -> u32 {
        self.start_addr.get()
    }

    /// Host DMA address of the segment
    #[inline(always)]
    pub fn dma_addr(&self) -> u64 {
        (u64::from(self.dma_addr_h.get()) << 32) | u64::from(self.dma_addr_l.get())
    }

    /// Segment length in bytes
    #[inline(always)]
    pub fn dma_len(&self) -> u32 {
        self.dma_len.get()
    }

    /// Bus address of the next record (0 on the tail)
    #[inline(always)]
    pub fn next_addr(&self) -> u64 {
        (u64::from(self.next_addr_h.get()) << 32) | u64::from(self.next_addr_l.get())
    }

    /// Raw attribute word
    #[inline(always)]
    pub fn attribute(&self) -> u32 {
        self.attribute.get()
    }

    /// `true` if no record follows this one
    #[inline(always)]
    pub fn is_last(&self) -> bool {
        self.attribute() == ATTR_LAST
    }

    /// Split view used when mirroring the head into the engine registers:
    /// `(start, addr_l, addr_h, len, next_l, next_h, attribute)`.
    pub(crate) fn words(&self) -> [u32; 7] {
        [
            self.start_addr.get(),
            self.dma_addr_l.get(),
            self.dma_addr_h.get(),
            self.dma_len.get(),
            self.next_addr_l.get(),
            self.next_addr_h.get(),
            self.attribute.get(),
        ]
    }
}

impl Default for HwDescriptor {
    fn default() -> Self {
        Self::new()
    }
}
