//! Recoverable failures of frame allocation and page-table manipulation.
//!
//! Everything here is a condition the caller can react to (free memory,
//! retry, report to a process). Broken invariants are not errors; they go
//! through [`violated`](crate::violated).

use crate::TableLevel;
use crate::addresses::{PhysicalAddress, VirtualAddress};

/// No free physical frame is left.
#[derive(Debug, Copy, Clone, Eq, PartialEq, thiserror::Error)]
#[error("out of physical frames")]
pub struct OutOfMemory;

/// Why [`AddressSpace::walk`](crate::AddressSpace::walk) produced no PT slot.
#[derive(Debug, Copy, Clone, Eq, PartialEq, thiserror::Error)]
pub enum WalkError {
    /// A table on the path is missing and the walk was not allowed to create it.
    #[error("{va} is not mapped: {level} entry is absent")]
    NotMapped { va: VirtualAddress, level: TableLevel },

    /// A missing table could not be allocated. `level` names the table whose
    /// entry stayed empty.
    #[error("out of physical frames extending {level} for {va}")]
    OutOfMemory { va: VirtualAddress, level: TableLevel },

    /// `va` has no slot in a 4-level hierarchy.
    #[error("{va} is not a canonical address")]
    NonCanonical { va: VirtualAddress },
}

/// Why [`AddressSpace::map_region`](crate::AddressSpace::map_region) stopped.
///
/// Pages mapped before the failure stay mapped.
#[derive(Debug, Copy, Clone, Eq, PartialEq, thiserror::Error)]
pub enum MapError {
    /// No frame was left for a table on the path to `va`.
    #[error("out of physical frames mapping {va}")]
    OutOfMemory { va: VirtualAddress },

    /// `va + size` does not fit the 64-bit address space.
    #[error("region at {va} with size {size:#x} wraps around the address space")]
    RangeOverflow { va: VirtualAddress, size: u64 },

    /// The region contains `va`, which is not canonical. A region that starts
    /// in the lower half and ends in the upper half reports
    /// [`VirtualAddress::LOWER_HALF_END`].
    #[error("region reaches the non-canonical address {va}")]
    NonCanonical { va: VirtualAddress },

    /// The region would map frame `pa`, which a page-table entry cannot address.
    #[error("frame {pa} is beyond the physical address width")]
    FrameOutOfReach { pa: PhysicalAddress },
}
