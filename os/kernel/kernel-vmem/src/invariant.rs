//! Fatal consistency violations.
//!
//! A [`Violation`] means kernel memory bookkeeping is already corrupt, so
//! there is nothing to return to. [`violated`] logs the diagnostic and halts
//! the current execution context by panicking.

use crate::addresses::{PhysicalAddress, VirtualAddress};
use crate::{TableIndex, TableLevel};

#[derive(Debug, Copy, Clone, Eq, PartialEq, thiserror::Error)]
pub enum Violation {
    /// A frame handed back to the allocator is not 4 KiB-aligned.
    #[error("frame {addr} is not page-aligned")]
    MisalignedFrame { addr: PhysicalAddress },

    /// A frame handed back to the allocator lies in the kernel image or above
    /// the top of physical memory.
    #[error("frame {addr} lies outside the allocatable range [{start}, {end})")]
    FrameOutOfRange {
        addr: PhysicalAddress,
        start: PhysicalAddress,
        end: PhysicalAddress,
    },

    /// A page about to be mapped already has a present leaf.
    #[error("virtual page {va} is already mapped to {existing}")]
    DuplicateMapping {
        va: VirtualAddress,
        existing: PhysicalAddress,
    },

    /// A huge-page entry (`PS=1`) was found above the PT level.
    #[error("{level} entry {index} maps a huge page; only 4 KiB leaves are supported")]
    LeafAboveTerminal { level: TableLevel, index: TableIndex },

    /// A free-list node fails the alignment or range check.
    #[error("free list node {node} is not an allocatable frame")]
    CorruptFreeList { node: PhysicalAddress },

    /// The free list is longer or shorter than the recorded count.
    #[error("free list holds {walked} frames but {recorded} are recorded")]
    FreeListLength { walked: usize, recorded: usize },
}

/// Report `violation`, detected while performing `operation`, and halt.
///
/// ### Panics
/// Always.
#[cold]
#[track_caller]
pub fn violated(operation: &'static str, violation: Violation) -> ! {
    log::error!("{operation}: {violation}");
    panic!("{operation}: {violation}");
}
