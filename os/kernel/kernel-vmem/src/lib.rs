//! # Virtual Memory Support
//!
//! x86-64 four-level page tables for the kernel's memory-management core.
//!
//! ## What you get
//! - An [`AddressSpace`] rooted at a `PML4` page: [`walk`](AddressSpace::walk),
//!   [`map_region`](AddressSpace::map_region), [`destroy`](AddressSpace::destroy).
//! - The bit-exact [`PageTableEntry`] layout and the 4 KiB-aligned [`PageTable`].
//! - [`TableLevel`] / [`TableIndex`] for the fixed 4-level walk.
//! - Architecture-neutral [`PagePermissions`] and their PTE encoding.
//! - The seams to the rest of the kernel: [`FrameAlloc`] (where table pages
//!   come from) and [`PhysMapper`] (how a physical frame is touched).
//! - The two-tier error model: recoverable [`OutOfMemory`] / [`WalkError`] /
//!   [`MapError`], and fatal [`Violation`]s reported through [`violated`].
//!
//! ## x86-64 Virtual Address → Physical Address Walk
//!
//! Each 48-bit virtual address is divided into five fields:
//!
//! ```text
//! | 47‒39 | 38‒30 | 29‒21 | 20‒12 | 11‒0   |
//! |  PML4 |  PDPT |   PD  |   PT  | Offset |
//! ```
//!
//! The CPU uses these fields as **indices** into four levels of page tables,
//! each level containing 512 (2⁹) entries of 8 bytes (64 bits) each.
//!
//! ```text
//!  PML4  →  PDPT  →  PD  →  PT  →  4 KiB frame
//!  (0)      (1)      (2)    (3)
//! ```
//!
//! ### Leaf vs. non-leaf entries
//!
//! The role of an entry follows from its **depth alone**: entries at depths
//! 0..=2 point to the next table, entries at depth 3 map a 4 KiB frame. Huge
//! pages (`PS=1` above the terminal level) are never created; finding one in a
//! hierarchy is treated as corruption.

#![cfg_attr(not(any(test, doctest)), no_std)]
#![allow(unsafe_code)]

pub mod address_space;
mod error;
mod invariant;
mod page_entry;
mod page_table;
mod permissions;

pub use crate::address_space::{AddressSpace, RootPage};
pub use crate::error::{MapError, OutOfMemory, WalkError};
pub use crate::invariant::{Violation, violated};
pub use crate::page_entry::PageTableEntry;
pub use crate::page_table::{PageTable, TableIndex, TableLevel};
pub use crate::permissions::PagePermissions;

/// Re-export of the typed address crate.
pub use kernel_memory_addresses as addresses;
use kernel_memory_addresses::{PhysicalAddress, PhysicalPage, Size4K};

/// Re-export constants as info module.
pub use kernel_info::memory as info;

/// Source of **physical** 4 KiB frames for page-table pages.
///
/// The implementation decides where frames come from (free list, bitmap,
/// boot pool). Frames handed out must be page-aligned and owned by nobody
/// else until they are returned through [`free_4k`](Self::free_4k).
pub trait FrameAlloc {
    /// Allocate one frame, or `None` when physical memory is exhausted.
    fn alloc_4k(&mut self) -> Option<PhysicalPage<Size4K>>;

    /// Return a frame previously obtained from [`alloc_4k`](Self::alloc_4k).
    fn free_4k(&mut self, frame: PhysicalPage<Size4K>);
}

/// Converts physical addresses to *temporarily* usable pointers in the current
/// virtual address space (e.g., via identity map or a higher-half direct map, HHDM).
///
/// # Safety
/// - You must ensure `pa` is mapped as writable in the current page tables
///   for `&mut T`.
/// - Lifetime `'a` is purely borrow-checked; the mapping must remain valid
///   for `'a`.
/// - Type `T` must match the bytes at `pa` (no aliasing UB).
pub trait PhysMapper {
    /// Convert a *physical* address to a usable mutable reference in the
    /// current address space.
    ///
    /// # Safety
    /// See the trait-level requirements; additionally no other live reference
    /// may cover the same bytes.
    unsafe fn phys_to_mut<'a, T>(&self, pa: PhysicalAddress) -> &'a mut T;

    /// Overwrite every byte of `frame` with `byte`.
    ///
    /// # Safety
    /// `frame` must be RAM reachable through this mapper that nobody else
    /// references while it is being filled.
    unsafe fn fill_frame(&self, frame: PhysicalPage<Size4K>, byte: u8) {
        let bytes = unsafe { self.phys_to_mut::<[u8; info::PAGE_BYTES]>(frame.base()) };
        bytes.fill(byte);
    }
}

#[cfg(test)]
pub(crate) mod testing {
    //! In-memory "RAM" and a LIFO frame pool for unit tests.

    #![allow(clippy::cast_possible_truncation)]

    use super::{FrameAlloc, PhysMapper};
    use crate::info::{PAGE_BYTES, PAGE_SIZE};
    use kernel_memory_addresses::{PhysicalAddress, PhysicalPage, Size4K};
    use std::collections::BTreeSet;

    /// A 4 KiB-aligned frame of simulated physical memory.
    #[repr(C, align(4096))]
    pub struct Frame(pub [u8; PAGE_BYTES]);

    /// `frames` consecutive frames whose first byte has physical address `base`.
    pub struct TestMemory {
        base: u64,
        frames: *mut Frame,
        len: usize,
    }

    impl TestMemory {
        pub fn new(base: u64, len: usize) -> Self {
            let boxed: Box<[Frame]> = (0..len).map(|_| Frame([0; PAGE_BYTES])).collect();
            Self {
                base,
                frames: Box::into_raw(boxed).cast::<Frame>(),
                len,
            }
        }

        pub fn frame(&self, i: usize) -> PhysicalPage<Size4K> {
            PhysicalAddress::new(self.base + i as u64 * PAGE_SIZE).page()
        }
    }

    impl Drop for TestMemory {
        fn drop(&mut self) {
            let slice = std::ptr::slice_from_raw_parts_mut(self.frames, self.len);
            drop(unsafe { Box::from_raw(slice) });
        }
    }

    impl PhysMapper for TestMemory {
        unsafe fn phys_to_mut<'a, T>(&self, pa: PhysicalAddress) -> &'a mut T {
            let rel = pa.as_u64().checked_sub(self.base).expect("below test memory");
            let idx = (rel / PAGE_SIZE) as usize;
            assert!(idx < self.len, "{pa} is outside test memory");
            unsafe {
                &mut *self
                    .frames
                    .add(idx)
                    .cast::<u8>()
                    .add((rel % PAGE_SIZE) as usize)
                    .cast::<T>()
            }
        }
    }

    /// Hands out the frames of a [`TestMemory`] and records what comes back.
    pub struct FramePool {
        free: Vec<PhysicalPage<Size4K>>,
        pub allocated: BTreeSet<PhysicalPage<Size4K>>,
        pub returned: Vec<PhysicalPage<Size4K>>,
    }

    impl FramePool {
        pub fn new(mem: &TestMemory, frames: usize) -> Self {
            Self {
                free: (0..frames).rev().map(|i| mem.frame(i)).collect(),
                allocated: BTreeSet::new(),
                returned: Vec::new(),
            }
        }

        pub fn available(&self) -> usize {
            self.free.len()
        }
    }

    impl FrameAlloc for FramePool {
        fn alloc_4k(&mut self) -> Option<PhysicalPage<Size4K>> {
            let frame = self.free.pop()?;
            self.allocated.insert(frame);
            Some(frame)
        }

        fn free_4k(&mut self, frame: PhysicalPage<Size4K>) {
            assert!(self.allocated.remove(&frame), "double free of {frame}");
            self.returned.push(frame);
            self.free.push(frame);
        }
    }
}
