//! # Physical and Virtual Memory Address Types
//!
//! Zero-cost `u64` wrappers that keep physical and virtual addresses apart at
//! compile time. Everything the frame allocator and the page-table manager pass
//! around is one of these:
//!
//! | Type | Meaning |
//! |------|---------|
//! | [`PhysicalAddress`] | A byte address in RAM (or MMIO). |
//! | [`PhysicalPage<S>`] | The page-aligned base of a physical frame of size `S`. |
//! | [`VirtualAddress`] | A byte address as seen by executing code. |
//! | [`VirtualPage<S>`] | The page-aligned base of a virtual page of size `S`. |
//! | [`PageOffset<S>`] | The byte offset inside a page of size `S`. |
//!
//! Only the 4 KiB granule ([`Size4K`]) is provided; the page-table manager maps
//! nothing larger. The size is still carried as a type parameter so that a page
//! value cannot silently change its granule.
//!
//! ```rust
//! # use kernel_memory_addresses::*;
//! let va = VirtualAddress::new(0x0000_0000_0000_1234);
//! let (page, off) = va.split::<Size4K>();
//! assert_eq!(page.base().as_u64(), 0x1000);
//! assert_eq!(off.as_u64(), 0x234);
//! assert_eq!(page.join(off), va);
//!
//! let pa = PhysicalAddress::new(0x8000_0042);
//! assert_eq!(pa.align_up::<Size4K>().as_u64(), 0x8000_1000);
//! assert!(!pa.is_aligned::<Size4K>());
//! ```

#![cfg_attr(not(any(test, doctest)), no_std)]
#![allow(clippy::inline_always)]

mod page_offset;
mod page_size;
mod physical_address;
mod physical_page;
mod virtual_address;
mod virtual_page;

pub use page_offset::PageOffset;
pub use page_size::{PageSize, Size4K};
pub use physical_address::PhysicalAddress;
pub use physical_page::PhysicalPage;
pub use virtual_address::VirtualAddress;
pub use virtual_page::VirtualPage;

/// Round `x` down to a multiple of `S::SIZE`.
#[inline(always)]
#[must_use]
pub(crate) const fn align_down<S: PageSize>(x: u64) -> u64 {
    x & !(S::SIZE - 1)
}

/// Round `x` up to a multiple of `S::SIZE`, or `None` if that overflows.
#[inline(always)]
#[must_use]
pub(crate) const fn checked_align_up<S: PageSize>(x: u64) -> Option<u64> {
    match x.checked_add(S::SIZE - 1) {
        Some(v) => Some(align_down::<S>(v)),
        None => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn split_and_join_round_trip() {
        let va = VirtualAddress::new(0xFFFF_FFFF_8000_1234);
        let (vp, vo) = va.split::<Size4K>();
        assert_eq!(vp.base().as_u64(), 0xFFFF_FFFF_8000_1000);
        assert_eq!(vo.as_u64(), 0x234);
        assert_eq!(vp.join(vo), va);

        let pa = PhysicalAddress::new(0x0000_0010_2000_0042);
        let (pp, po) = pa.split::<Size4K>();
        assert_eq!(pp.base().as_u64(), 0x0000_0010_2000_0000);
        assert_eq!(po.as_u64(), 0x42);
        assert_eq!(pp.join(po), pa);
    }

    #[test]
    fn align_up_rounds_to_next_boundary() {
        assert_eq!(PhysicalAddress::new(0).align_up::<Size4K>().as_u64(), 0);
        assert_eq!(PhysicalAddress::new(1).align_up::<Size4K>().as_u64(), 0x1000);
        assert_eq!(
            PhysicalAddress::new(0x1000).align_up::<Size4K>().as_u64(),
            0x1000
        );
        assert_eq!(
            PhysicalAddress::new(0x1001).align_up::<Size4K>().as_u64(),
            0x2000
        );
    }

    #[test]
    fn checked_align_up_detects_overflow() {
        assert_eq!(checked_align_up::<Size4K>(u64::MAX), None);
        assert_eq!(checked_align_up::<Size4K>(u64::MAX - 0xFFF), None);
        assert_eq!(
            checked_align_up::<Size4K>(u64::MAX - 0x1FFF),
            Some(u64::MAX - 0xFFF)
        );
    }

    #[test]
    fn pages_step_by_one_granule() {
        let vp = VirtualAddress::new(0x1000).page::<Size4K>();
        assert_eq!(vp.next().base().as_u64(), 0x2000);

        let pp = PhysicalAddress::new(0x8000_0000).page::<Size4K>();
        assert_eq!(pp.next().next().base().as_u64(), 0x8000_2000);
        assert_eq!(pp.frame_number(), 0x8_0000);
    }

    #[test]
    fn canonical_means_bits_63_to_47_agree() {
        assert!(VirtualAddress::new(0).is_canonical());
        assert!(VirtualAddress::new(0x0000_7FFF_FFFF_FFFF).is_canonical());
        assert!(!VirtualAddress::LOWER_HALF_END.is_canonical());
        assert!(!VirtualAddress::new(0xFFFF_7FFF_FFFF_FFFF).is_canonical());
        assert!(!VirtualAddress::new(0x0001_0000_0000_0000).is_canonical());
        assert!(VirtualAddress::new(0xFFFF_8000_0000_0000).is_canonical());
        assert!(VirtualAddress::new(u64::MAX).is_canonical());
    }

    #[test]
    fn page_try_from_rejects_unaligned() {
        assert!(PhysicalPage::<Size4K>::try_from(PhysicalAddress::new(0x1234)).is_err());
        assert!(PhysicalPage::<Size4K>::try_from(PhysicalAddress::new(0x3000)).is_ok());
        assert!(VirtualPage::<Size4K>::try_from(VirtualAddress::new(0x10)).is_err());
    }
}
