//! # Address Space (x86-64, PML4-rooted)
//!
//! Build, query and tear down a **single** virtual address space: a tree of
//! [`PageTable`] pages rooted at a PML4.
//!
//! ## Highlights
//!
//! - [`AddressSpace::walk`] finds (and optionally builds) the path to the PT
//!   slot of an address and hands out that slot by reference.
//! - [`AddressSpace::map_region`] maps a byte range page by page and refuses
//!   to overwrite an existing mapping.
//! - [`AddressSpace::destroy`] / [`AddressSpace::clear`] return every table
//!   page to the [`FrameAlloc`].
//! - [`AddressSpace::translate`] resolves a VA to a PA.
//!
//! ## Design
//!
//! - Table pages come from the caller's [`FrameAlloc`] and are zeroed before
//!   they are linked, so a walk never sees a half-built table.
//! - The role of an entry is decided by the [`TableLevel`] it is found at:
//!   PML4/PDPT/PD entries are table pointers, PT entries are leaves. A `PS`
//!   bit above the PT is reported through [`violated`].
//! - Leaf frames belong to whoever mapped them; teardown frees table pages only.
//! - Keeps `unsafe` confined to mapping a physical frame to a typed table
//!   through the `PhysMapper`.
//!
//! ## Safety
//!
//! - Mutating active mappings requires appropriate **TLB maintenance** (e.g.,
//!   `invlpg` per page or CR3 reload).
//! - The provided `PhysMapper` must yield **writable** references to table frames.

use crate::addresses::{PageSize, PhysicalAddress, PhysicalPage, Size4K, VirtualAddress};
use crate::{
    FrameAlloc, MapError, OutOfMemory, PagePermissions, PageTable, PageTableEntry, PhysMapper,
    TableIndex, TableLevel, Violation, WalkError, info, violated,
};
use log::{debug, trace, warn};

/// The PML4 root page for an [`AddressSpace`].
pub type RootPage = PhysicalPage<Size4K>;

/// Handle to a single, concrete address space.
pub struct AddressSpace<'m, M: PhysMapper> {
    root: RootPage,
    mapper: &'m M,
}

impl<'m, M: PhysMapper> AddressSpace<'m, M> {
    /// Allocate and zero a fresh root table.
    ///
    /// # Errors
    /// [`OutOfMemory`] if `alloc` has no frame for the PML4.
    pub fn new<A: FrameAlloc>(mapper: &'m M, alloc: &mut A) -> Result<Self, OutOfMemory> {
        let Some(root) = alloc.alloc_4k() else {
            warn!("address space: no frame left for a PML4");
            return Err(OutOfMemory);
        };
        let aspace = Self { root, mapper };
        aspace.table_mut(root).zero();
        debug!("address space: created with PML4 at {root}");
        Ok(aspace)
    }

    /// If you already know the root frame (e.g., from your own allocator),
    /// you can still use the explicit constructor.
    #[inline]
    #[must_use]
    pub const fn from_root(mapper: &'m M, root: RootPage) -> Self {
        Self { root, mapper }
    }

    /// Physical page of the PML4.
    #[inline]
    #[must_use]
    pub const fn root_page(&self) -> RootPage {
        self.root
    }

    /// Borrow the table page in `page`.
    #[inline]
    #[allow(clippy::mut_from_ref)]
    pub(crate) fn table_mut(&self, page: PhysicalPage<Size4K>) -> &mut PageTable {
        // SAFETY: every page reached from `root` is a table page of this hierarchy.
        unsafe { self.mapper.phys_to_mut::<PageTable>(page.base()) }
    }

    #[inline]
    fn table(&self, page: PhysicalPage<Size4K>) -> &PageTable {
        self.table_mut(page)
    }

    /// Resolve the PT slot for `va`.
    ///
    /// With `create`, each missing PDPT, PD or PT page is allocated from
    /// `alloc`, zeroed and linked before the walk descends into it. The leaf
    /// itself is never written; the caller gets the slot by reference.
    ///
    /// # Errors
    /// - [`WalkError::NotMapped`] if a table is missing and `create` is `false`.
    /// - [`WalkError::OutOfMemory`] if a missing table could not be allocated.
    ///   Tables linked before the failure stay in place (empty).
    /// - [`WalkError::NonCanonical`] if `va` is not canonical.
    ///
    /// ### Panics
    /// If a huge-page entry lies on the path ([`Violation::LeafAboveTerminal`]).
    pub fn walk<A: FrameAlloc>(
        &mut self,
        alloc: &mut A,
        va: VirtualAddress,
        create: bool,
    ) -> Result<&mut PageTableEntry, WalkError> {
        let pt = if create {
            self.ensure_leaf_table(alloc, va)?
        } else {
            self.find_leaf_table(va)?
        };
        Ok(self.table_mut(pt).entry_mut(TableLevel::Pt.index_of(va)))
    }

    /// Map `[va, va + size)` onto consecutive frames starting at `pa`.
    ///
    /// The range is widened to whole pages: the first page contains `va`, the
    /// last page contains `va + size - 1`, and a zero `size` maps the single
    /// page containing `va`. `pa` is rounded down to its frame. Leaves are
    /// written as [`PageTableEntry::leaf`]`(frame, perms)`.
    ///
    /// # Errors
    /// - [`MapError::OutOfMemory`] if a table page could not be allocated.
    ///   Pages mapped before the failure stay mapped.
    /// - [`MapError::RangeOverflow`] if the virtual or physical range wraps.
    /// - [`MapError::NonCanonical`] if the virtual range leaves the canonical
    ///   halves or crosses the hole between them.
    /// - [`MapError::FrameOutOfReach`] if a frame lies above the physical
    ///   address width.
    ///
    /// The last three are reported before any table is allocated.
    ///
    /// ### Panics
    /// If a page in the range is already mapped ([`Violation::DuplicateMapping`]).
    pub fn map_region<A: FrameAlloc>(
        &mut self,
        alloc: &mut A,
        va: VirtualAddress,
        size: u64,
        pa: PhysicalAddress,
        perms: PagePermissions,
    ) -> Result<(), MapError> {
        let overflow = MapError::RangeOverflow { va, size };
        let last_byte = va.checked_add(size.max(1) - 1).ok_or(overflow)?;
        if let Some(va) = non_canonical_in(va, last_byte) {
            return Err(MapError::NonCanonical { va });
        }
        let first = va.page::<Size4K>().base();
        let span = last_byte.align_down::<Size4K>().as_u64() - first.as_u64();
        let frames = pa.align_down::<Size4K>();
        let last_frame = frames.checked_add(span).ok_or(overflow)?;
        if last_frame.as_u64() >> info::PHYS_ADDR_BITS != 0 {
            return Err(MapError::FrameOutOfReach { pa: last_frame });
        }

        let pages = span / Size4K::SIZE + 1;
        debug!("map_region: {pages} page(s) {first} -> {frames} {perms:?}");

        for i in 0..pages {
            let page = first + i * Size4K::SIZE;
            let frame = PhysicalPage::<Size4K>::containing(frames + i * Size4K::SIZE);

            let pt = self.ensure_leaf_table(alloc, page).map_err(|e| match e {
                WalkError::NonCanonical { va } => MapError::NonCanonical { va },
                WalkError::NotMapped { .. } | WalkError::OutOfMemory { .. } => {
                    MapError::OutOfMemory { va: page }
                }
            })?;
            let slot = self.table_mut(pt).entry_mut(TableLevel::Pt.index_of(page));
            if let Some((existing, _)) = slot.mapped_frame() {
                violated(
                    "map_region",
                    Violation::DuplicateMapping {
                        va: page,
                        existing: existing.base(),
                    },
                );
            }
            *slot = PageTableEntry::leaf(frame, perms);
            trace!("map_region: {page} -> {frame}");
        }
        Ok(())
    }

    /// Copy of the leaf entry for `va`, present or not.
    ///
    /// # Errors
    /// [`WalkError::NotMapped`] if a table on the path is missing,
    /// [`WalkError::NonCanonical`] if `va` is not canonical.
    pub fn leaf(&self, va: VirtualAddress) -> Result<PageTableEntry, WalkError> {
        let pt = self.find_leaf_table(va)?;
        Ok(self.table(pt).get(TableLevel::Pt.index_of(va)))
    }

    /// Translate a `VirtualAddress` to `PhysicalAddress` if mapped.
    #[must_use]
    pub fn translate(&self, va: VirtualAddress) -> Option<PhysicalAddress> {
        let (frame, _) = self.leaf(va).ok()?.mapped_frame()?;
        Some(frame.join(va.offset()))
    }

    /// Number of table pages in the hierarchy, root included.
    #[must_use]
    pub fn table_pages(&self) -> usize {
        self.count_tables(self.root, TableLevel::Pml4)
    }

    /// Release every table below the root and leave the root empty.
    ///
    /// Returns how many table pages went back to `alloc`.
    pub fn clear<A: FrameAlloc>(&mut self, alloc: &mut A) -> usize {
        let released = self.release_children(alloc, self.root, TableLevel::Pml4);
        debug!("address space: cleared {released} table page(s) below {}", self.root);
        released
    }

    /// Tear the whole hierarchy down, root included.
    ///
    /// Mapped frames are not freed. Returns how many table pages went back to
    /// `alloc`.
    pub fn destroy<A: FrameAlloc>(self, alloc: &mut A) -> usize {
        let root = self.root;
        let released = self.release_table(alloc, root, TableLevel::Pml4);
        debug!("address space: destroyed {root}, {released} table page(s) released");
        released
    }

    fn find_leaf_table(&self, va: VirtualAddress) -> Result<PhysicalPage<Size4K>, WalkError> {
        ensure_canonical(va)?;
        let mut table = self.root;
        for level in TableLevel::POINTER_LEVELS {
            let index = level.index_of(va);
            let entry = self.table(table).get(index);
            table = next_table(entry, level, index, "walk").ok_or(WalkError::NotMapped { va, level })?;
        }
        Ok(table)
    }

    fn ensure_leaf_table<A: FrameAlloc>(
        &self,
        alloc: &mut A,
        va: VirtualAddress,
    ) -> Result<PhysicalPage<Size4K>, WalkError> {
        ensure_canonical(va)?;
        let mut table = self.root;
        for level in TableLevel::POINTER_LEVELS {
            let index = level.index_of(va);
            let entry = self.table(table).get(index);
            table = match next_table(entry, level, index, "walk") {
                Some(next) => next,
                None => self.link_table(alloc, table, level, index, va)?,
            };
        }
        Ok(table)
    }

    /// Allocate a zeroed table and hook it into `parent[index]`.
    fn link_table<A: FrameAlloc>(
        &self,
        alloc: &mut A,
        parent: PhysicalPage<Size4K>,
        level: TableLevel,
        index: TableIndex,
        va: VirtualAddress,
    ) -> Result<PhysicalPage<Size4K>, WalkError> {
        let Some(child) = alloc.alloc_4k() else {
            warn!("walk: no frame left for the table under {level}[{index}] of {va}");
            return Err(WalkError::OutOfMemory { va, level });
        };
        self.table_mut(child).zero();
        self.table_mut(parent).set(index, PageTableEntry::table(child));
        trace!("walk: linked {child} at {level}[{index}] for {va}");
        Ok(child)
    }

    fn count_tables(&self, table: PhysicalPage<Size4K>, level: TableLevel) -> usize {
        let Some(child_level) = level.child() else {
            return 1;
        };
        let children: usize = self
            .table(table)
            .present()
            .filter_map(|(index, entry)| next_table(entry, level, index, "table_pages"))
            .map(|child| self.count_tables(child, child_level))
            .sum();
        1 + children
    }

    fn release_table<A: FrameAlloc>(
        &self,
        alloc: &mut A,
        table: PhysicalPage<Size4K>,
        level: TableLevel,
    ) -> usize {
        let released = self.release_children(alloc, table, level);
        alloc.free_4k(table);
        trace!("destroy: released {level} table {table}");
        released + 1
    }

    /// Clear every entry of `table`, recursing into child tables first.
    fn release_children<A: FrameAlloc>(
        &self,
        alloc: &mut A,
        table: PhysicalPage<Size4K>,
        level: TableLevel,
    ) -> usize {
        let mut released = 0;
        for index in TableIndex::all() {
            let entry = self.table(table).get(index);
            if !entry.is_present() {
                continue;
            }
            if let Some(child_level) = level.child()
                && let Some(child) = next_table(entry, level, index, "destroy")
            {
                released += self.release_table(alloc, child, child_level);
            }
            self.table_mut(table).set(index, PageTableEntry::zero());
        }
        released
    }
}

/// Bits 63..=48 of `va` are not part of any table index; a non-canonical
/// address would alias a slot of the other half.
const fn ensure_canonical(va: VirtualAddress) -> Result<(), WalkError> {
    if va.is_canonical() {
        Ok(())
    } else {
        Err(WalkError::NonCanonical { va })
    }
}

/// First non-canonical address in `[first, last]`, if there is one.
fn non_canonical_in(first: VirtualAddress, last: VirtualAddress) -> Option<VirtualAddress> {
    if !first.is_canonical() {
        Some(first)
    } else if last.is_canonical() && (first.as_u64() ^ last.as_u64()) >> 47 == 0 {
        None
    } else {
        Some(VirtualAddress::LOWER_HALF_END)
    }
}

/// The table `entry` points to, if present. `level` is where `entry` was
/// found and must be a pointer level.
fn next_table(
    entry: PageTableEntry,
    level: TableLevel,
    index: TableIndex,
    operation: &'static str,
) -> Option<PhysicalPage<Size4K>> {
    debug_assert!(!level.is_terminal());
    if !entry.is_present() {
        return None;
    }
    if entry.is_huge() {
        violated(operation, Violation::LeafAboveTerminal { level, index });
    }
    Some(entry.physical_page())
}
