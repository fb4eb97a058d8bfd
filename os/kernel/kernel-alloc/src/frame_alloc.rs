//! # Free-List Physical Frame Allocator
//!
//! Hands out 4 KiB frames from `[kernel_image_end, physical_memory_top)`.
//!
//! Free frames form a singly linked LIFO list whose links live **inside the
//! free frames themselves**, so the allocator needs no storage of its own
//! beyond the list head and a counter:
//!
//! ```text
//!  head ──► ┌────────────┐    ┌────────────┐    ┌────────────┐
//!           │ next ──────┼──► │ next ──────┼──► │ next: END  │
//!           │ 0x01 0x01… │    │ 0x01 0x01… │    │ 0x01 0x01… │
//!           └────────────┘    └────────────┘    └────────────┘
//! ```
//!
//! - [`free`](FreeListFrameAlloc::free) fills the frame with
//!   [`FREED_FRAME_FILL`], writes the link and pushes the frame to the head.
//! - [`allocate`](FreeListFrameAlloc::allocate) pops the head, reads its link
//!   and zero-fills the frame before handing it out.
//!
//! All frame contents are reached through the [`PhysMapper`].

use kernel_info::PhysicalMemoryLayout;
use kernel_memory_addresses::{PageSize, PhysicalAddress, PhysicalPage, Size4K};
use kernel_vmem::{FrameAlloc, OutOfMemory, PhysMapper, Violation, violated};
use log::{debug, trace, warn};

/// Byte written over every frame returned through [`FreeListFrameAlloc::free`].
///
/// Stale readers of a freed frame see `0x01…` instead of their old data.
pub const FREED_FRAME_FILL: u8 = 0x01;

/// Link stored in the first bytes of a free frame.
#[repr(C)]
struct FreeFrame {
    next: u64,
}

impl FreeFrame {
    /// Link value of the last node.
    const END: u64 = u64::MAX;

    fn new(next: Option<PhysicalPage<Size4K>>) -> Self {
        Self {
            next: next.map_or(Self::END, |frame| frame.base().as_u64()),
        }
    }

    fn next(&self) -> Option<PhysicalAddress> {
        (self.next != Self::END).then(|| PhysicalAddress::new(self.next))
    }
}

/// Physical frame allocator over a [`PhysicalMemoryLayout`].
///
/// ```rust
/// # use kernel_alloc::frame_alloc::FreeListFrameAlloc;
/// # use kernel_alloc::phys_mapper::OffsetPhysMapper;
/// # use kernel_info::PhysicalMemoryLayout;
/// # use kernel_memory_addresses::PhysicalAddress;
/// #[repr(C, align(4096))]
/// struct Frame([u8; 4096]);
/// let mut ram: Vec<Frame> = (0..4).map(|_| Frame([0; 4096])).collect();
///
/// let layout = PhysicalMemoryLayout::new(PhysicalAddress::new(0x10_0000), PhysicalAddress::new(0x10_4000));
/// let mapper = OffsetPhysMapper::for_buffer(ram.as_mut_ptr().cast(), layout.kernel_image_end());
/// let mut frames = FreeListFrameAlloc::new(&mapper, layout);
/// assert_eq!(frames.init(), 4);
///
/// let frame = frames.allocate().expect("frame");
/// assert_eq!(frames.free_frames(), 3);
/// frames.free(frame.base());
/// assert_eq!(frames.validate(), 4);
/// ```
pub struct FreeListFrameAlloc<'m, M: PhysMapper> {
    mapper: &'m M,
    layout: PhysicalMemoryLayout,
    head: Option<PhysicalPage<Size4K>>,
    free_frames: usize,
    initialized: bool,
}

impl<'m, M: PhysMapper> FreeListFrameAlloc<'m, M> {
    /// An allocator with an empty free list; call [`init`](Self::init) to
    /// register the layout's frames.
    #[must_use]
    pub const fn new(mapper: &'m M, layout: PhysicalMemoryLayout) -> Self {
        Self {
            mapper,
            layout,
            head: None,
            free_frames: 0,
            initialized: false,
        }
    }

    /// Register every whole frame of the layout as free.
    ///
    /// Returns the number of frames added. Only the first call has an
    /// effect; later calls return `0`.
    pub fn init(&mut self) -> usize {
        if self.initialized {
            warn!("frame allocator: already initialized");
            return 0;
        }
        self.initialized = true;
        let added = self.free_range(self.layout.kernel_image_end(), self.layout.physical_memory_top());
        debug!(
            "frame allocator: {added} frame(s) free in [{}, {})",
            self.layout.kernel_image_end(),
            self.layout.physical_memory_top()
        );
        added
    }

    /// Free every whole frame in `[start, end)`, the start rounded up to a
    /// page boundary. Returns the number of frames freed.
    ///
    /// ### Panics
    /// If a frame lies outside the layout (see [`free`](Self::free)).
    pub fn free_range(&mut self, start: PhysicalAddress, end: PhysicalAddress) -> usize {
        let Some(mut frame) = start.checked_align_up::<Size4K>() else {
            return 0;
        };
        let mut freed = 0;
        while let Some(frame_end) = frame.checked_add(Size4K::SIZE)
            && frame_end <= end
        {
            self.free(frame);
            freed += 1;
            frame = frame_end;
        }
        freed
    }

    /// Return the frame at `addr` to the free list.
    ///
    /// The frame is overwritten with [`FREED_FRAME_FILL`] and becomes the
    /// next frame [`allocate`](Self::allocate) hands out.
    ///
    /// ### Panics
    /// - [`Violation::MisalignedFrame`] if `addr` is not page-aligned.
    /// - [`Violation::FrameOutOfRange`] if the frame is not inside the layout.
    pub fn free(&mut self, addr: PhysicalAddress) {
        let Ok(frame) = PhysicalPage::<Size4K>::try_from(addr) else {
            violated("free", Violation::MisalignedFrame { addr });
        };
        if !self.owns(addr) {
            violated(
                "free",
                Violation::FrameOutOfRange {
                    addr,
                    start: self.layout.kernel_image_end(),
                    end: self.layout.physical_memory_top(),
                },
            );
        }

        // SAFETY: the frame lies in the allocator's range and the caller has given it up.
        unsafe {
            self.mapper.fill_frame(frame, FREED_FRAME_FILL);
            *self.mapper.phys_to_mut::<FreeFrame>(addr) = FreeFrame::new(self.head);
        }
        self.head = Some(frame);
        self.free_frames += 1;
        trace!("free: {frame}");
    }

    /// Take the most recently freed frame. Its contents are all zero.
    ///
    /// # Errors
    /// [`OutOfMemory`] if no frame is free.
    ///
    /// ### Panics
    /// If the link stored in the frame is not a page-aligned address inside
    /// the layout ([`Violation::CorruptFreeList`]).
    pub fn allocate(&mut self) -> Result<PhysicalPage<Size4K>, OutOfMemory> {
        let Some(frame) = self.head else {
            warn!("allocate: out of physical frames");
            return Err(OutOfMemory);
        };

        // The link has to be read before the frame is cleared.
        // SAFETY: `frame` is the list head; its first bytes hold a `FreeFrame`.
        let next = unsafe { self.mapper.phys_to_mut::<FreeFrame>(frame.base()) }.next();
        self.head = match next {
            None => None,
            Some(node) => match PhysicalPage::<Size4K>::try_from(node) {
                Ok(page) if self.owns(node) => Some(page),
                _ => violated("allocate", Violation::CorruptFreeList { node }),
            },
        };
        self.free_frames -= 1;

        // SAFETY: the frame is off the list and owned by nobody yet.
        unsafe { self.mapper.fill_frame(frame, 0) };
        trace!("allocate: {frame}");
        Ok(frame)
    }

    /// Walk the free list and check it.
    ///
    /// Every node must be a page-aligned frame inside the layout, and the
    /// list must be exactly [`free_frames`](Self::free_frames) long. Returns
    /// the list length.
    ///
    /// ### Panics
    /// [`Violation::CorruptFreeList`] for a bad node,
    /// [`Violation::FreeListLength`] for a count mismatch (including cycles).
    pub fn validate(&self) -> usize {
        let mut walked = 0;
        let mut cursor = self.head.map(PhysicalPage::base);
        while let Some(node) = cursor {
            if walked == self.free_frames {
                violated(
                    "validate",
                    Violation::FreeListLength {
                        walked: walked + 1,
                        recorded: self.free_frames,
                    },
                );
            }
            if !node.is_aligned::<Size4K>() || !self.owns(node) {
                violated("validate", Violation::CorruptFreeList { node });
            }
            walked += 1;
            // SAFETY: `node` is an aligned frame inside the allocator's range.
            cursor = unsafe { self.mapper.phys_to_mut::<FreeFrame>(node) }.next();
        }
        if walked != self.free_frames {
            violated(
                "validate",
                Violation::FreeListLength {
                    walked,
                    recorded: self.free_frames,
                },
            );
        }
        debug!("validate: {walked} free frame(s)");
        walked
    }

    #[inline]
    #[must_use]
    pub const fn free_frames(&self) -> usize {
        self.free_frames
    }

    #[inline]
    #[must_use]
    pub const fn is_exhausted(&self) -> bool {
        self.head.is_none()
    }

    #[inline]
    #[must_use]
    pub const fn layout(&self) -> PhysicalMemoryLayout {
        self.layout
    }

    /// The whole frame starting at `addr` lies inside the layout.
    fn owns(&self, addr: PhysicalAddress) -> bool {
        self.layout.contains(addr)
            && addr
                .checked_add(Size4K::SIZE)
                .is_some_and(|end| end <= self.layout.physical_memory_top())
    }
}

impl<M: PhysMapper> FrameAlloc for FreeListFrameAlloc<'_, M> {
    fn alloc_4k(&mut self) -> Option<PhysicalPage<Size4K>> {
        self.allocate().ok()
    }

    fn free_4k(&mut self, frame: PhysicalPage<Size4K>) {
        self.free(frame.base());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::phys_mapper::OffsetPhysMapper;

    #[repr(C, align(4096))]
    struct Frame([u8; 4096]);

    fn ram(frames: usize) -> Vec<Frame> {
        (0..frames).map(|_| Frame([0xEE; 4096])).collect()
    }

    #[test]
    fn init_registers_only_whole_frames() {
        let mut ram = ram(4);
        // Kernel image ends mid-frame: the first frame is not usable.
        let layout = PhysicalMemoryLayout::new(PhysicalAddress::new(0x10_0800), PhysicalAddress::new(0x10_4000));
        let mapper = OffsetPhysMapper::for_buffer(ram.as_mut_ptr().cast(), PhysicalAddress::new(0x10_0000));
        let mut frames = FreeListFrameAlloc::new(&mapper, layout);

        assert!(frames.is_exhausted());
        assert_eq!(frames.init(), 3);
        assert_eq!(frames.init(), 0);
        assert_eq!(frames.validate(), 3);

        // LIFO: the highest frame was freed last.
        assert_eq!(frames.allocate().unwrap().base(), PhysicalAddress::new(0x10_3000));
        // The untouched frame below the kernel end keeps its contents.
        assert!(ram[0].0.iter().all(|&b| b == 0xEE));
    }

    #[test]
    fn freed_frames_carry_the_fill_pattern() {
        let mut ram = ram(2);
        let base = PhysicalAddress::new(0x20_0000);
        let layout = PhysicalMemoryLayout::new(base, PhysicalAddress::new(0x20_2000));
        let mapper = OffsetPhysMapper::for_buffer(ram.as_mut_ptr().cast(), base);
        let mut frames = FreeListFrameAlloc::new(&mapper, layout);
        frames.init();

        let first = frames.allocate().unwrap();
        let second = frames.allocate().unwrap();
        assert!(frames.is_exhausted());
        frames.free(first.base());

        // Everything past the link is the fill byte.
        let idx = usize::from(first.base() != base);
        assert!(ram[idx].0[size_of::<u64>()..].iter().all(|&b| b == FREED_FRAME_FILL));
        assert_eq!(frames.allocate(), Ok(first));
        assert_ne!(first, second);
    }

    #[test]
    #[should_panic(expected = "free list holds")]
    fn validate_detects_a_cycle() {
        let mut ram = ram(2);
        let base = PhysicalAddress::new(0x20_0000);
        let layout = PhysicalMemoryLayout::new(base, PhysicalAddress::new(0x20_2000));
        let mapper = OffsetPhysMapper::for_buffer(ram.as_mut_ptr().cast(), base);
        let mut frames = FreeListFrameAlloc::new(&mapper, layout);
        frames.init();

        // Point the head back at itself.
        let head = frames.head.unwrap();
        unsafe { *mapper.phys_to_mut::<FreeFrame>(head.base()) = FreeFrame::new(Some(head)) };
        frames.validate();
    }

    #[test]
    #[should_panic(expected = "is not an allocatable frame")]
    fn allocate_rejects_a_clobbered_link() {
        let mut ram = ram(2);
        let base = PhysicalAddress::new(0x20_0000);
        let layout = PhysicalMemoryLayout::new(base, PhysicalAddress::new(0x20_2000));
        let mapper = OffsetPhysMapper::for_buffer(ram.as_mut_ptr().cast(), base);
        let mut frames = FreeListFrameAlloc::new(&mapper, layout);
        frames.init();

        // A stray write into a free frame.
        let head = frames.head.unwrap();
        unsafe { *mapper.phys_to_mut::<u64>(head.base()) = 0x0102_0304 };
        let _ = frames.allocate();
    }

    #[test]
    #[should_panic(expected = "is not an allocatable frame")]
    fn allocate_rejects_an_aligned_link_outside_the_pool() {
        let mut ram = ram(2);
        let base = PhysicalAddress::new(0x20_0000);
        let layout = PhysicalMemoryLayout::new(base, PhysicalAddress::new(0x20_2000));
        let mapper = OffsetPhysMapper::for_buffer(ram.as_mut_ptr().cast(), base);
        let mut frames = FreeListFrameAlloc::new(&mapper, layout);
        frames.init();

        // Page-aligned, but frame 0 was never handed to the allocator.
        let head = frames.head.unwrap();
        unsafe { *mapper.phys_to_mut::<u64>(head.base()) = 0 };
        let _ = frames.allocate();
    }
}
