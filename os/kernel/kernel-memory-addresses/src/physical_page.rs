use crate::{PageOffset, PageSize, PhysicalAddress, align_down};
use core::fmt;
use core::marker::PhantomData;

/// Physical page (frame) base for size `S`.
///
/// ### Invariants
/// - The low `S::SHIFT` bits of the base are always zero.
///
/// ```rust
/// # use kernel_memory_addresses::*;
/// let frame = PhysicalAddress::new(0x8000_0123).page::<Size4K>();
/// assert_eq!(frame.base().as_u64(), 0x8000_0000);
/// assert_eq!(frame.frame_number(), 0x8_0000);
/// assert_eq!(PhysicalPage::<Size4K>::from_frame_number(0x8_0001).base().as_u64(), 0x8000_1000);
/// ```
#[repr(transparent)]
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct PhysicalPage<S: PageSize> {
    base: u64,
    _size: PhantomData<S>,
}

impl<S: PageSize> PhysicalPage<S> {
    /// The frame that contains `pa` (aligns down).
    #[inline]
    #[must_use]
    pub const fn containing(pa: PhysicalAddress) -> Self {
        Self {
            base: align_down::<S>(pa.as_u64()),
            _size: PhantomData,
        }
    }

    /// The frame with the given frame number (`base >> S::SHIFT`).
    #[inline]
    #[must_use]
    pub const fn from_frame_number(pfn: u64) -> Self {
        Self {
            base: pfn << S::SHIFT,
            _size: PhantomData,
        }
    }

    #[inline]
    #[must_use]
    pub const fn base(self) -> PhysicalAddress {
        PhysicalAddress::new(self.base)
    }

    #[inline]
    #[must_use]
    pub const fn frame_number(self) -> u64 {
        self.base >> S::SHIFT
    }

    #[inline]
    #[must_use]
    pub const fn join(self, off: PageOffset<S>) -> PhysicalAddress {
        PhysicalAddress::new(self.base + off.as_u64())
    }

    /// The frame directly above this one.
    #[inline]
    #[must_use]
    pub const fn next(self) -> Self {
        Self {
            base: self.base + S::SIZE,
            _size: PhantomData,
        }
    }
}

impl<S: PageSize> TryFrom<PhysicalAddress> for PhysicalPage<S> {
    type Error = PhysicalAddress;

    /// Accepts only page-aligned addresses; hands the address back otherwise.
    #[inline]
    fn try_from(pa: PhysicalAddress) -> Result<Self, PhysicalAddress> {
        if pa.is_aligned::<S>() {
            Ok(Self::containing(pa))
        } else {
            Err(pa)
        }
    }
}

impl<S: PageSize> fmt::Display for PhysicalPage<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{:016X}/{}", self.base, S::NAME)
    }
}

impl<S: PageSize> fmt::Debug for PhysicalPage<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PhysicalPage<{}>({:#018X})", S::NAME, self.base)
    }
}
