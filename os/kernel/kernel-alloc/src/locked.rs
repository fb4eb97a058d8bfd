//! A frame allocator shared between execution units.
//!
//! [`LockedFrameAlloc`] puts a [`FreeListFrameAlloc`] behind a [`SpinLock`]
//! so that free-list push and pop are mutually exclusive. `&LockedFrameAlloc`
//! implements [`FrameAlloc`], which lets several address spaces draw table
//! pages from the same pool.

use crate::frame_alloc::FreeListFrameAlloc;
use kernel_memory_addresses::{PhysicalAddress, PhysicalPage, Size4K};
use kernel_sync::SpinLock;
use kernel_vmem::{FrameAlloc, OutOfMemory, PhysMapper};

pub struct LockedFrameAlloc<'m, M: PhysMapper> {
    inner: SpinLock<FreeListFrameAlloc<'m, M>>,
}

impl<'m, M: PhysMapper> LockedFrameAlloc<'m, M> {
    #[must_use]
    pub const fn new(frames: FreeListFrameAlloc<'m, M>) -> Self {
        Self {
            inner: SpinLock::new(frames),
        }
    }

    /// See [`FreeListFrameAlloc::init`].
    pub fn init(&self) -> usize {
        self.inner.with_lock(FreeListFrameAlloc::init)
    }

    /// See [`FreeListFrameAlloc::allocate`].
    ///
    /// # Errors
    /// [`OutOfMemory`] if no frame is free.
    pub fn allocate(&self) -> Result<PhysicalPage<Size4K>, OutOfMemory> {
        self.inner.with_lock(FreeListFrameAlloc::allocate)
    }

    /// See [`FreeListFrameAlloc::free`].
    pub fn free(&self, addr: PhysicalAddress) {
        self.inner.with_lock(|frames| frames.free(addr));
    }

    /// See [`FreeListFrameAlloc::validate`].
    pub fn validate(&self) -> usize {
        self.inner.with_lock(|frames| frames.validate())
    }

    #[must_use]
    pub fn free_frames(&self) -> usize {
        self.inner.with_lock(|frames| frames.free_frames())
    }
}

impl<M: PhysMapper> FrameAlloc for &LockedFrameAlloc<'_, M> {
    fn alloc_4k(&mut self) -> Option<PhysicalPage<Size4K>> {
        self.allocate().ok()
    }

    fn free_4k(&mut self, frame: PhysicalPage<Size4K>) {
        self.free(frame.base());
    }
}
