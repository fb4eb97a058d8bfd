//! Minimal Virtual Memory Manager (VMM) for the kernel.
//!
//! One [`AddressSpace`] behind a [`SpinLock`], drawing its table pages from a
//! shared [`LockedFrameAlloc`]. Every operation holds the address-space lock
//! for its whole walk, so no other execution unit observes a table that is
//! being linked or torn down.
//!
//! # Example
//! ```ignore
//! use kernel_alloc::{frame_alloc::FreeListFrameAlloc, locked::LockedFrameAlloc};
//! use kernel_alloc::{phys_mapper::OffsetPhysMapper, vmm::Vmm};
//! use kernel_info::memory::BOOT_LAYOUT;
//!
//! let mapper = OffsetPhysMapper::hhdm();
//! let frames = LockedFrameAlloc::new(FreeListFrameAlloc::new(&mapper, BOOT_LAYOUT));
//! frames.init();
//! let vmm = Vmm::new(&mapper, &frames)?;
//! // Map, query, tear down...
//! ```

use crate::locked::LockedFrameAlloc;
use kernel_memory_addresses::{PhysicalAddress, PhysicalPage, Size4K, VirtualAddress};
use kernel_sync::SpinLock;
use kernel_vmem::{
    AddressSpace, MapError, OutOfMemory, PagePermissions, PageTableEntry, PhysMapper, WalkError,
};

/// A lock-protected address space.
pub struct Vmm<'a, 'm, M: PhysMapper> {
    aspace: SpinLock<AddressSpace<'m, M>>,
    frames: &'a LockedFrameAlloc<'m, M>,
}

impl<'a, 'm, M: PhysMapper> Vmm<'a, 'm, M> {
    /// Create a fresh, empty address space.
    ///
    /// # Errors
    /// [`OutOfMemory`] if no frame is left for the root table.
    pub fn new(mapper: &'m M, frames: &'a LockedFrameAlloc<'m, M>) -> Result<Self, OutOfMemory> {
        let mut alloc = frames;
        let aspace = AddressSpace::new(mapper, &mut alloc)?;
        Ok(Self {
            aspace: SpinLock::new(aspace),
            frames,
        })
    }

    #[must_use]
    pub fn root_page(&self) -> PhysicalPage<Size4K> {
        self.aspace.with_lock(|aspace| aspace.root_page())
    }

    /// See [`AddressSpace::map_region`].
    ///
    /// # Errors
    /// As [`AddressSpace::map_region`].
    pub fn map_region(
        &self,
        va: VirtualAddress,
        size: u64,
        pa: PhysicalAddress,
        perms: PagePermissions,
    ) -> Result<(), MapError> {
        let mut frames = self.frames;
        self.aspace
            .with_lock(|aspace| aspace.map_region(&mut frames, va, size, pa, perms))
    }

    /// Run `f` on the PT slot of `va` while the address space is locked.
    ///
    /// # Errors
    /// As [`AddressSpace::walk`].
    pub fn with_entry<R>(
        &self,
        va: VirtualAddress,
        create: bool,
        f: impl FnOnce(&mut PageTableEntry) -> R,
    ) -> Result<R, WalkError> {
        let mut frames = self.frames;
        self.aspace
            .with_lock(|aspace| aspace.walk(&mut frames, va, create).map(f))
    }

    /// Translate VA→PA if mapped.
    #[must_use]
    pub fn translate(&self, va: VirtualAddress) -> Option<PhysicalAddress> {
        self.aspace.with_lock(|aspace| aspace.translate(va))
    }

    /// See [`AddressSpace::leaf`].
    ///
    /// # Errors
    /// [`WalkError::NotMapped`] if a table on the path is missing.
    pub fn leaf(&self, va: VirtualAddress) -> Result<PageTableEntry, WalkError> {
        self.aspace.with_lock(|aspace| aspace.leaf(va))
    }

    #[must_use]
    pub fn table_pages(&self) -> usize {
        self.aspace.with_lock(|aspace| aspace.table_pages())
    }

    /// Drop every mapping, keeping the root. Returns the number of table
    /// pages released.
    pub fn clear(&self) -> usize {
        let mut frames = self.frames;
        self.aspace.with_lock(|aspace| aspace.clear(&mut frames))
    }

    /// Tear the address space down. Returns the number of table pages
    /// released, root included.
    pub fn destroy(self) -> usize {
        let mut frames = self.frames;
        self.aspace.into_inner().destroy(&mut frames)
    }
}
