//! # Page-Table Pages and Levels
//!
//! - [`PageTable`]: one 4 KiB-aligned page of 512 [`PageTableEntry`]s. The
//!   same type serves every level.
//! - [`TableLevel`]: position in the PML4 → PDPT → PD → PT chain, plus the
//!   virtual-address bit range that indexes it.
//! - [`TableIndex`]: a slot number `0..512`.

use crate::PageTableEntry;
use crate::addresses::VirtualAddress;
use crate::info::{ENTRIES_PER_TABLE, PAGE_BYTES, PAGING_LEVELS};
use core::fmt;

/// Index into a page-table page, `0..512`.
#[repr(transparent)]
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct TableIndex(u16);

impl TableIndex {
    /// ### Debug assertions
    /// - Asserts `v < 512` in debug builds.
    #[inline]
    #[must_use]
    pub const fn new(v: u16) -> Self {
        debug_assert!((v as usize) < ENTRIES_PER_TABLE);
        Self(v)
    }

    #[inline]
    #[must_use]
    pub const fn as_usize(self) -> usize {
        self.0 as usize
    }

    /// Every slot of a table, in ascending order.
    #[allow(clippy::cast_possible_truncation)]
    pub fn all() -> impl Iterator<Item = Self> {
        (0..ENTRIES_PER_TABLE as u16).map(Self)
    }
}

impl fmt::Display for TableIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Debug for TableIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TableIndex({})", self.0)
    }
}

/// Level of a table in the 4-level hierarchy, root first.
///
/// ```rust
/// # use kernel_vmem::TableLevel;
/// # use kernel_vmem::addresses::VirtualAddress;
/// let va = VirtualAddress::new(0xFFFF_8000_0020_1000);
/// assert_eq!(TableLevel::Pml4.index_of(va).as_usize(), 256);
/// assert_eq!(TableLevel::Pd.index_of(va).as_usize(), 1);
/// assert_eq!(TableLevel::Pt.index_of(va).as_usize(), 1);
/// assert_eq!(TableLevel::Pd.child(), Some(TableLevel::Pt));
/// ```
#[derive(Copy, Clone, Debug, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub enum TableLevel {
    /// Level 0, VA bits `[47:39]`.
    Pml4,
    /// Level 1, VA bits `[38:30]`.
    Pdpt,
    /// Level 2, VA bits `[29:21]`.
    Pd,
    /// Level 3, VA bits `[20:12]`. Its entries are leaves.
    Pt,
}

impl TableLevel {
    /// Levels whose entries point to further tables.
    pub const POINTER_LEVELS: [Self; PAGING_LEVELS - 1] = [Self::Pml4, Self::Pdpt, Self::Pd];

    /// Distance from the root (`0` for PML4).
    #[inline]
    #[must_use]
    pub const fn depth(self) -> usize {
        self as usize
    }

    /// `true` for the PT level, whose entries map frames.
    #[inline]
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Pt)
    }

    /// The level below, `None` for the PT.
    #[inline]
    #[must_use]
    pub const fn child(self) -> Option<Self> {
        match self {
            Self::Pml4 => Some(Self::Pdpt),
            Self::Pdpt => Some(Self::Pd),
            Self::Pd => Some(Self::Pt),
            Self::Pt => None,
        }
    }

    /// Position of the level's 9 index bits in a virtual address.
    #[inline]
    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub const fn shift(self) -> u32 {
        39 - 9 * self.depth() as u32
    }

    /// The slot `va` selects in a table of this level.
    #[inline]
    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub const fn index_of(self, va: VirtualAddress) -> TableIndex {
        TableIndex::new(((va.as_u64() >> self.shift()) & 0x1FF) as u16)
    }
}

impl fmt::Display for TableLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Pml4 => "PML4",
            Self::Pdpt => "PDPT",
            Self::Pd => "PD",
            Self::Pt => "PT",
        })
    }
}

/// One page-table page: 512 entries, 4 KiB-aligned.
#[doc(alias = "PML4")]
#[doc(alias = "PDPT")]
#[doc(alias = "PD")]
#[doc(alias = "PT")]
#[repr(C, align(4096))]
pub struct PageTable {
    entries: [PageTableEntry; ENTRIES_PER_TABLE],
}

impl PageTable {
    /// An empty table (all entries not-present).
    #[inline]
    #[must_use]
    pub const fn zeroed() -> Self {
        Self {
            entries: [PageTableEntry::zero(); ENTRIES_PER_TABLE],
        }
    }

    /// Set all entries to not-present.
    #[inline]
    pub fn zero(&mut self) {
        self.entries.fill(PageTableEntry::zero());
    }

    #[inline]
    #[must_use]
    pub const fn get(&self, i: TableIndex) -> PageTableEntry {
        self.entries[i.as_usize()]
    }

    #[inline]
    pub const fn set(&mut self, i: TableIndex, e: PageTableEntry) {
        self.entries[i.as_usize()] = e;
    }

    /// In-place access to one slot.
    #[inline]
    pub const fn entry_mut(&mut self, i: TableIndex) -> &mut PageTableEntry {
        &mut self.entries[i.as_usize()]
    }

    /// Present entries with their slot numbers.
    pub fn present(&self) -> impl Iterator<Item = (TableIndex, PageTableEntry)> + '_ {
        TableIndex::all()
            .map(|i| (i, self.get(i)))
            .filter(|(_, e)| e.is_present())
    }

    /// `true` if no entry is present.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.present().next().is_none()
    }
}

const _: () = {
    assert!(size_of::<PageTable>() == PAGE_BYTES);
    assert!(align_of::<PageTable>() == PAGE_BYTES);
};

#[cfg(test)]
mod tests {
    use super::*;
    use crate::PagePermissions;
    use crate::addresses::{PhysicalAddress, Size4K};

    #[test]
    fn indices_follow_address_bits() {
        let va = VirtualAddress::new(0xFFFF_8888_0123_4567);
        let idx: Vec<usize> = [TableLevel::Pml4, TableLevel::Pdpt, TableLevel::Pd, TableLevel::Pt]
            .into_iter()
            .map(|l| l.index_of(va).as_usize())
            .collect();
        assert_eq!(idx, vec![0x111, 0x020, 0x009, 0x034]);
    }

    #[test]
    fn level_chain_ends_at_pt() {
        let mut level = TableLevel::Pml4;
        let mut seen = vec![level];
        while let Some(next) = level.child() {
            level = next;
            seen.push(level);
        }
        assert_eq!(seen.len(), PAGING_LEVELS);
        assert!(level.is_terminal());
        assert_eq!(TableLevel::POINTER_LEVELS.len(), PAGING_LEVELS - 1);
        assert_eq!(level.to_string(), "PT");
    }

    #[test]
    fn table_tracks_present_entries() {
        let mut table = PageTable::zeroed();
        assert!(table.is_empty());

        let frame = PhysicalAddress::new(0x5000).page::<Size4K>();
        table.set(TableIndex::new(7), PageTableEntry::leaf(frame, PagePermissions::READ));
        table.entry_mut(TableIndex::new(511)).set_present(true);

        let present: Vec<usize> = table.present().map(|(i, _)| i.as_usize()).collect();
        assert_eq!(present, vec![7, 511]);

        table.zero();
        assert!(table.is_empty());
    }
}
