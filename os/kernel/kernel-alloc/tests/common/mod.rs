#![allow(dead_code)]

use kernel_alloc::frame_alloc::FreeListFrameAlloc;
use kernel_alloc::phys_mapper::OffsetPhysMapper;
use kernel_info::PhysicalMemoryLayout;
use kernel_memory_addresses::{PhysicalAddress, PhysicalPage, Size4K};

pub const FRAME_BYTES: usize = 4096;

/// Where the simulated allocator pool starts.
pub const POOL_BASE: u64 = 0x0040_0000;

#[repr(C, align(4096))]
pub struct Frame([u8; FRAME_BYTES]);

/// Heap-backed "physical memory": `frames` frames starting at [`POOL_BASE`],
/// all of them owned by the frame allocator.
pub struct Arena {
    frames: Vec<Frame>,
    mapper: OffsetPhysMapper,
}

impl Arena {
    pub fn new(frames: usize) -> Self {
        let mut frames: Vec<Frame> = (0..frames).map(|_| Frame([0x5A; FRAME_BYTES])).collect();
        let mapper = OffsetPhysMapper::for_buffer(frames.as_mut_ptr().cast(), PhysicalAddress::new(POOL_BASE));
        Self { frames, mapper }
    }

    pub fn mapper(&self) -> &OffsetPhysMapper {
        &self.mapper
    }

    pub fn layout(&self) -> PhysicalMemoryLayout {
        let top = POOL_BASE + (self.frames.len() * FRAME_BYTES) as u64;
        PhysicalMemoryLayout::new(PhysicalAddress::new(POOL_BASE), PhysicalAddress::new(top))
    }

    /// An initialized allocator owning the whole arena.
    pub fn allocator(&self) -> FreeListFrameAlloc<'_, OffsetPhysMapper> {
        let mut frames = FreeListFrameAlloc::new(&self.mapper, self.layout());
        frames.init();
        frames
    }

    pub fn frame(&self, i: usize) -> PhysicalPage<Size4K> {
        PhysicalAddress::new(POOL_BASE + (i * FRAME_BYTES) as u64).page()
    }

    /// Contents of `frame` as seen through the backing buffer.
    pub fn bytes(&self, frame: PhysicalPage<Size4K>) -> &[u8] {
        let i = (frame.base().as_u64() - POOL_BASE) as usize / FRAME_BYTES;
        &self.frames[i].0
    }
}
