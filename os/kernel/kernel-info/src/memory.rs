//! # Memory Layout

use crate::PhysicalMemoryLayout;
use kernel_memory_addresses::{PageSize, PhysicalAddress, Size4K};

/// Size of the allocation unit of the frame allocator and of a page-table page.
pub const PAGE_SIZE: u64 = Size4K::SIZE;

/// [`PAGE_SIZE`] as a buffer length.
pub const PAGE_BYTES: usize = 4096;

/// Number of entries in one page-table page (4 KiB / 8 bytes).
pub const ENTRIES_PER_TABLE: usize = 512;

/// Depth of the translation hierarchy (PML4, PDPT, PD, PT).
pub const PAGING_LEVELS: usize = 4;

/// A simple Higher Half Direct Map (HHDM) base.
/// Anything you map at [`HHDM_BASE`] + `pa` lets the kernel
/// access physical memory via a fixed offset.
pub const HHDM_BASE: u64 = 0xffff_8880_0000_0000;

/// Width of a physical address a page-table entry can hold (frame bits 51..=12).
pub const PHYS_ADDR_BITS: u32 = 52;

/// First byte after the reserved kernel image (text, data, bss, boot stack).
///
/// Everything from here up to [`PHYS_MEMORY_TOP`] belongs to the frame allocator.
pub const KERNEL_IMAGE_END: u64 = 0x0040_0000; // 4 MiB

/// One past the last byte of usable physical memory.
pub const PHYS_MEMORY_TOP: u64 = 0x0800_0000; // 128 MiB

/// The layout handed over by the loader.
pub const BOOT_LAYOUT: PhysicalMemoryLayout = PhysicalMemoryLayout::new(
    PhysicalAddress::new(KERNEL_IMAGE_END),
    PhysicalAddress::new(PHYS_MEMORY_TOP),
);

const _: () = {
    assert!(PAGE_BYTES as u64 == PAGE_SIZE);
    assert!(ENTRIES_PER_TABLE * size_of::<u64>() == PAGE_BYTES);
    assert!(KERNEL_IMAGE_END < PHYS_MEMORY_TOP);
    assert!(PHYS_MEMORY_TOP.is_multiple_of(PAGE_SIZE));
    assert!(PHYS_MEMORY_TOP < HHDM_BASE);
    assert!(PHYS_MEMORY_TOP <= 1 << PHYS_ADDR_BITS);
};
