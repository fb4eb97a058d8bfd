//! # Offset-based PhysMapper
//!
//! A [`PhysMapper`] for any setup where physical memory is visible at a fixed
//! distance from its physical address:
//!
//! - the kernel's higher-half direct map (HHDM), where every physical address
//!   is mapped at `HHDM_BASE + pa` ([`OffsetPhysMapper::hhdm`]);
//! - an identity map (offset `0`);
//! - a buffer standing in for physical memory ([`OffsetPhysMapper::for_buffer`]).
//!
//! ## Example
//! ```rust
//! use kernel_alloc::phys_mapper::OffsetPhysMapper;
//! use kernel_memory_addresses::PhysicalAddress;
//! use kernel_vmem::{PageTable, PhysMapper};
//!
//! let mut table = PageTable::zeroed();
//! let phys = PhysicalAddress::new(0x1234_0000);
//! let mapper = OffsetPhysMapper::for_buffer((&raw mut table).cast(), phys);
//! unsafe {
//!     let table: &mut PageTable = mapper.phys_to_mut(phys);
//!     table.zero();
//! }
//! ```

use kernel_info::memory::HHDM_BASE;
use kernel_memory_addresses::PhysicalAddress;
use kernel_vmem::PhysMapper;

/// [`PhysMapper`] that reaches physical address `pa` at virtual `offset + pa`.
///
/// # Safety
/// - The mapping must be present and cover the referenced physical range.
/// - The returned pointer must only be used for valid, mapped, and writable memory.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct OffsetPhysMapper {
    offset: u64,
}

impl OffsetPhysMapper {
    #[inline]
    #[must_use]
    pub const fn new(offset: u64) -> Self {
        Self { offset }
    }

    /// Mapper through the kernel's higher-half direct map.
    #[inline]
    #[must_use]
    pub const fn hhdm() -> Self {
        Self::new(HHDM_BASE)
    }

    /// Mapper that treats the memory at `base` as physical address `phys_base`.
    #[inline]
    #[must_use]
    pub fn for_buffer(base: *mut u8, phys_base: PhysicalAddress) -> Self {
        Self::new((base.expose_provenance() as u64).wrapping_sub(phys_base.as_u64()))
    }

    #[inline]
    #[must_use]
    pub const fn offset(&self) -> u64 {
        self.offset
    }
}

impl PhysMapper for OffsetPhysMapper {
    #[allow(clippy::cast_possible_truncation)]
    unsafe fn phys_to_mut<'a, T>(&self, pa: PhysicalAddress) -> &'a mut T {
        let va = core::ptr::with_exposed_provenance_mut::<T>(self.offset.wrapping_add(pa.as_u64()) as usize);
        // SAFETY: Caller must ensure the physical address is valid and mapped at the offset.
        unsafe { &mut *va }
    }
}
