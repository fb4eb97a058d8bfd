//! # Kernel Memory Allocation and Virtual Memory Management
//!
//! Physical frame allocation and the glue that lets page tables draw on it.
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌─────────────────────────────────────────────────────┐
//! │                Virtual Memory Manager (VMM)         │
//! │    • Locked AddressSpace (walk / map / destroy)     │
//! └─────────────────┬───────────────────────────────────┘
//!                   │ table pages
//! ┌─────────────────▼───────────────────────────────────┐
//! │           Physical Frame Allocator                  │
//! │    • 4KiB frames, LIFO free list                    │
//! │    • Links stored inside the free frames            │
//! └─────────────────┬───────────────────────────────────┘
//!                   │ frame contents
//! ┌─────────────────▼───────────────────────────────────┐
//! │              Physical Mapper                        │
//! │    • pa → usable pointer (HHDM, identity, buffer)   │
//! └─────────────────────────────────────────────────────┘
//! ```
//!
//! ## Core Components
//!
//! ### Physical Frame Allocator ([`frame_alloc`])
//!
//! Owns every frame in `[kernel_image_end, physical_memory_top)`:
//! * **Free list**: O(1) allocate/free, most recently freed frame first
//! * **Zeroed on allocation**, filled with a sentinel on free
//! * **Fatal checks** for misaligned or foreign frames
//!
//! ### Physical Mapper ([`phys_mapper`])
//!
//! [`OffsetPhysMapper`](phys_mapper::OffsetPhysMapper) reaches physical memory
//! at a fixed offset: the HHDM in the kernel, a heap buffer in tests.
//!
//! ### Sharing ([`locked`], [`vmm`])
//!
//! Spin-locked wrappers for more than one execution unit: the allocator's
//! free list and each address space are guarded separately.
//!
//! ## Memory Layout Integration
//!
//! ```text
//! Physical Address Space:
//! 0x0000_0000 ┌─────────────────────────────────┐
//!             │   Firmware, kernel image        │
//! KERNEL_IMAGE_END ───────────────────────────────┤
//!             │   Frame allocator pool          │
//! PHYS_MEMORY_TOP └───────────────────────────────┘
//! ```

#![cfg_attr(not(any(test, doctest)), no_std)]

pub mod frame_alloc;
pub mod locked;
pub mod phys_mapper;
pub mod vmm;
