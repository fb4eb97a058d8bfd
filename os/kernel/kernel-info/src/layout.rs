use kernel_memory_addresses::{PageSize, PhysicalAddress, Size4K};

/// The physical range owned by the frame allocator: `[kernel_image_end, physical_memory_top)`.
///
/// ```rust
/// # use kernel_info::PhysicalMemoryLayout;
/// # use kernel_memory_addresses::PhysicalAddress;
/// let layout = PhysicalMemoryLayout::new(
///     PhysicalAddress::new(0x10_0800),
///     PhysicalAddress::new(0x11_0000),
/// );
/// // The partial frame at the start is not usable.
/// assert_eq!(layout.frame_count(), 15);
/// assert!(layout.contains(PhysicalAddress::new(0x10_0800)));
/// assert!(!layout.contains(PhysicalAddress::new(0x11_0000)));
/// ```
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct PhysicalMemoryLayout {
    kernel_image_end: PhysicalAddress,
    physical_memory_top: PhysicalAddress,
}

impl PhysicalMemoryLayout {
    /// ### Panics
    /// If `kernel_image_end` lies above `physical_memory_top`.
    #[must_use]
    pub const fn new(kernel_image_end: PhysicalAddress, physical_memory_top: PhysicalAddress) -> Self {
        assert!(
            kernel_image_end.as_u64() <= physical_memory_top.as_u64(),
            "kernel image ends above the top of physical memory"
        );
        Self {
            kernel_image_end,
            physical_memory_top,
        }
    }

    #[inline]
    #[must_use]
    pub const fn kernel_image_end(&self) -> PhysicalAddress {
        self.kernel_image_end
    }

    #[inline]
    #[must_use]
    pub const fn physical_memory_top(&self) -> PhysicalAddress {
        self.physical_memory_top
    }

    /// `true` if `pa` is in `[kernel_image_end, physical_memory_top)`.
    #[inline]
    #[must_use]
    pub const fn contains(&self, pa: PhysicalAddress) -> bool {
        pa.as_u64() >= self.kernel_image_end.as_u64()
            && pa.as_u64() < self.physical_memory_top.as_u64()
    }

    /// Number of whole frames in the range once the start is rounded up.
    #[must_use]
    pub const fn frame_count(&self) -> u64 {
        let Some(first) = self.kernel_image_end.checked_align_up::<Size4K>() else {
            return 0;
        };
        if first.as_u64() >= self.physical_memory_top.as_u64() {
            return 0;
        }
        (self.physical_memory_top.as_u64() - first.as_u64()) / Size4K::SIZE
    }
}
