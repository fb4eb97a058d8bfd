use crate::PagePermissions;
use crate::addresses::{PhysicalPage, Size4K};
use bitfield_struct::bitfield;

/// A single 64-bit x86-64 page-table entry in its raw bitfield form.
///
/// One layout serves all four levels. Whether an entry points to the next
/// table or maps a 4 KiB frame is decided by the level it sits in, not by a
/// bit in the entry: entries in PML4/PDPT/PD tables are table pointers,
/// entries in a PT are leaves.
///
/// ### Bit layout
///
/// | Bits      | Name / Mnemonic   | Meaning |
/// |-----------|-------------------|----------|
/// | 0         | `P` (present)     | Valid entry if set |
/// | 1         | `RW`              | Writable if set |
/// | 2         | `US`              | User-mode accessible if set |
/// | 3         | `PWT`             | Write-through caching |
/// | 4         | `PCD`             | Disable caching |
/// | 5         | `A`               | Accessed |
/// | 6         | `D`               | Dirty (leaf only) |
/// | 7         | `PS` / `PAT`      | Huge page above the PT level, PAT in a PT |
/// | 8         | `G`               | Global (leaf only) |
/// | 9–11      | OS avail low      | Reserved for OS use |
/// | 12–51     | `addr`            | Physical frame bits [51:12] |
/// | 52–58     | OS avail high     | Reserved for OS use |
/// | 59–62     | `PKU` / OS use    | Protection key or OS use |
/// | 63        | `NX`              | Execute disable |
///
/// ### Example
/// ```rust
/// # use kernel_vmem::{PageTableEntry, PagePermissions};
/// # use kernel_vmem::addresses::{PhysicalAddress, Size4K};
/// let frame = PhysicalAddress::new(0x8000_0000).page::<Size4K>();
/// let e = PageTableEntry::leaf(frame, PagePermissions::READ | PagePermissions::WRITE);
/// assert!(e.present() && e.writable() && e.no_execute());
/// assert_eq!(e.physical_page(), frame);
/// ```
#[bitfield(u64)]
#[derive(PartialEq, Eq)]
pub struct PageTableEntry {
    /// Present (P, bit 0).
    pub present: bool,

    /// Writable (RW, bit 1).
    pub writable: bool,

    /// User/Supervisor (US, bit 2).
    pub user_access: bool,

    /// Page Write-Through (PWT, bit 3).
    pub write_through: bool,

    /// Page Cache Disable (PCD, bit 4).
    pub cache_disabled: bool,

    /// Accessed (A, bit 5).
    ///
    /// Set on every leaf this crate installs so the CPU never has to write
    /// the entry back on first touch.
    pub accessed: bool,

    /// Dirty (D, bit 6), leaf only.
    pub dirty: bool,

    /// Page Size (PS, bit 7).
    ///
    /// In a PDPT or PD entry a set bit turns the entry into a 1 GiB / 2 MiB
    /// leaf. This crate never creates such entries; meeting one during a walk
    /// is a fatal [`LeafAboveTerminal`](crate::Violation::LeafAboveTerminal).
    pub large_page: bool,

    /// Global (G, bit 8), leaf only.
    pub global_translation: bool,

    /// OS-available (bits 9..=11).
    #[bits(3)]
    pub os_available_low: u8,

    /// Physical frame number, bits [51:12] of the frame address.
    #[bits(40)]
    frame_number: u64,

    /// OS-available (bits 52..=58).
    #[bits(7)]
    pub os_available_high: u8,

    /// Protection Key (PKU, bits 59..=62) if supported; otherwise OS use.
    #[bits(4)]
    pub protection_key: u8,

    /// No-Execute (NX, bit 63).
    pub no_execute: bool,
}

impl PageTableEntry {
    /// The not-present entry, all bits clear.
    #[inline]
    #[must_use]
    pub const fn zero() -> Self {
        Self::new()
    }

    /// A pointer to the next-level table at `next`.
    ///
    /// Intermediate entries grant everything (`RW`, `US`, `NX` clear) so that
    /// the leaf alone decides the effective permissions of a page.
    #[inline]
    #[must_use]
    pub const fn table(next: PhysicalPage<Size4K>) -> Self {
        Self::new()
            .with_present(true)
            .with_writable(true)
            .with_user_access(true)
            .with_frame_number(next.frame_number())
    }

    /// A leaf mapping `frame` with `perms`.
    #[inline]
    #[must_use]
    pub const fn leaf(frame: PhysicalPage<Size4K>, perms: PagePermissions) -> Self {
        Self::new()
            .with_present(true)
            .with_accessed(true)
            .with_writable(perms.contains(PagePermissions::WRITE))
            .with_user_access(perms.contains(PagePermissions::USER))
            .with_no_execute(!perms.contains(PagePermissions::EXECUTE))
            .with_frame_number(frame.frame_number())
    }

    #[inline]
    #[must_use]
    pub const fn is_present(self) -> bool {
        self.present()
    }

    /// `PS` is set. Only meaningful above the PT level.
    #[inline]
    #[must_use]
    pub const fn is_huge(self) -> bool {
        self.large_page()
    }

    /// The frame this entry refers to (table page or mapped frame).
    #[inline]
    #[must_use]
    pub const fn physical_page(self) -> PhysicalPage<Size4K> {
        PhysicalPage::from_frame_number(self.frame_number())
    }

    #[inline]
    pub const fn set_physical_page(&mut self, frame: PhysicalPage<Size4K>) {
        self.set_frame_number(frame.frame_number());
    }

    /// Permissions a leaf grants. Exact inverse of [`leaf`](Self::leaf) for
    /// any set containing `READ`; empty for a not-present entry.
    #[must_use]
    pub const fn permissions(self) -> PagePermissions {
        if !self.present() {
            return PagePermissions::empty();
        }
        let mut perms = PagePermissions::READ;
        if self.writable() {
            perms = perms.union(PagePermissions::WRITE);
        }
        if !self.no_execute() {
            perms = perms.union(PagePermissions::EXECUTE);
        }
        if self.user_access() {
            perms = perms.union(PagePermissions::USER);
        }
        perms
    }

    /// Frame and permissions of a present leaf.
    #[inline]
    #[must_use]
    pub const fn mapped_frame(self) -> Option<(PhysicalPage<Size4K>, PagePermissions)> {
        if self.present() {
            Some((self.physical_page(), self.permissions()))
        } else {
            None
        }
    }

    #[inline]
    #[must_use]
    pub const fn raw(self) -> u64 {
        self.into_bits()
    }
}

const _: () = assert!(size_of::<PageTableEntry>() == size_of::<u64>());
