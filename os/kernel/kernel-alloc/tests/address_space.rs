mod common;

use common::Arena;
use kernel_memory_addresses::{PhysicalAddress, Size4K, VirtualAddress};
use kernel_vmem::{AddressSpace, MapError, PagePermissions, TableLevel, WalkError};

const RW: PagePermissions = PagePermissions::READ.union(PagePermissions::WRITE);

fn va(v: u64) -> VirtualAddress {
    VirtualAddress::new(v)
}

fn pa(v: u64) -> PhysicalAddress {
    PhysicalAddress::new(v)
}

#[test]
fn map_region_writes_three_leaves() {
    let arena = Arena::new(16);
    let mut frames = arena.allocator();
    let mut aspace = AddressSpace::new(arena.mapper(), &mut frames).unwrap();

    aspace
        .map_region(&mut frames, va(0x1000), 0x2500, pa(0x8000_0000), RW)
        .unwrap();

    let expected = [(0x1000, 0x8000_0000), (0x2000, 0x8000_1000), (0x3000, 0x8000_2000)];
    for (v, p) in expected {
        let leaf = aspace.walk(&mut frames, va(v), false).unwrap();
        assert!(leaf.is_present());
        assert_eq!(leaf.physical_page(), pa(p).page::<Size4K>());
        assert_eq!(leaf.permissions(), RW);
        assert!(leaf.accessed() && leaf.no_execute());
    }
    assert!(!aspace.leaf(va(0x4000)).unwrap().is_present());

    // Root, PDPT, PD, PT.
    assert_eq!(aspace.table_pages(), 4);
    assert_eq!(frames.free_frames(), 12);
}

#[test]
fn table_pages_are_zeroed_despite_dirty_frames() {
    let arena = Arena::new(8);
    let mut frames = arena.allocator();
    let mut aspace = AddressSpace::new(arena.mapper(), &mut frames).unwrap();

    // Every frame was filled by `free`; a fresh table must still be empty.
    let slot = aspace.walk(&mut frames, va(0x7000_0000), true).unwrap();
    assert_eq!(slot.raw(), 0);
    assert_eq!(aspace.translate(va(0x7000_1000)), None);
}

#[test]
#[should_panic(expected = "already mapped")]
fn overlapping_map_is_fatal() {
    let arena = Arena::new(16);
    let mut frames = arena.allocator();
    let mut aspace = AddressSpace::new(arena.mapper(), &mut frames).unwrap();

    aspace.map_region(&mut frames, va(0x1000), 0x2500, pa(0x8000_0000), RW).unwrap();
    let _ = aspace.map_region(&mut frames, va(0x3FFF), 1, pa(0x9000_0000), RW);
}

#[test]
fn destroy_returns_every_table_frame() {
    let arena = Arena::new(32);
    let mut frames = arena.allocator();
    let before = frames.free_frames();

    let mut aspace = AddressSpace::new(arena.mapper(), &mut frames).unwrap();
    aspace.map_region(&mut frames, va(0x1000), 0x2500, pa(0x8000_0000), RW).unwrap();
    aspace
        .map_region(&mut frames, va(0x0000_7F00_0000_0000), 0x40_0000, pa(0x9000_0000), RW)
        .unwrap();
    aspace
        .map_region(&mut frames, va(0xFFFF_8000_0000_0000), 0x1000, pa(0x1000), PagePermissions::KERNEL_TEXT)
        .unwrap();

    let tables = aspace.table_pages();
    assert_eq!(frames.free_frames(), before - tables);

    assert_eq!(aspace.destroy(&mut frames), tables);
    assert_eq!(frames.free_frames(), before);
    assert_eq!(frames.validate(), before);
}

#[test]
fn clear_leaves_the_root_empty() {
    let arena = Arena::new(16);
    let mut frames = arena.allocator();
    let mut aspace = AddressSpace::new(arena.mapper(), &mut frames).unwrap();
    let root = aspace.root_page();

    aspace.map_region(&mut frames, va(0x1000), 0x2500, pa(0x8000_0000), RW).unwrap();
    assert_eq!(aspace.clear(&mut frames), 3);
    assert_eq!(aspace.root_page(), root);
    assert_eq!(frames.free_frames(), 15);

    assert_eq!(
        aspace.leaf(va(0x1000)),
        Err(WalkError::NotMapped {
            va: va(0x1000),
            level: TableLevel::Pml4
        })
    );
    assert!(arena.bytes(root).iter().all(|&b| b == 0));
}

#[test]
fn exhaustion_is_recoverable() {
    let arena = Arena::new(5);
    let mut frames = arena.allocator();
    let mut aspace = AddressSpace::new(arena.mapper(), &mut frames).unwrap();

    // Root + 3 tables for the first page, nothing left for a second PDPT.
    aspace.map_region(&mut frames, va(0x1000), 0x1000, pa(0x8000_0000), RW).unwrap();
    assert_eq!(frames.free_frames(), 1);

    let err = aspace
        .map_region(&mut frames, va(0xFFFF_8000_0000_0000), 0x1000, pa(0x1000), RW)
        .unwrap_err();
    assert_eq!(err, MapError::OutOfMemory { va: va(0xFFFF_8000_0000_0000) });

    // The PDPT that did fit stays linked; the allocator is consistent.
    assert_eq!(frames.free_frames(), 0);
    assert_eq!(aspace.table_pages(), 5);
    assert_eq!(aspace.translate(va(0x1000)), Some(pa(0x8000_0000)));

    assert_eq!(aspace.destroy(&mut frames), 5);
    assert_eq!(frames.validate(), 5);
}
