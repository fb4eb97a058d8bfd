//! # Kernel Memory Configuration
//!
//! The single source of truth for the physical and virtual memory layout the
//! memory-management core relies on.
//!
//! Boot-time physical memory discovery is not performed here; the loader
//! settles the layout and hands over two facts, the end of the reserved kernel
//! image and the top of usable physical memory. They are fixed at compile
//! time in [`memory`] and bundled as a [`PhysicalMemoryLayout`] value that the
//! frame allocator is constructed from.
//!
//! ```text
//! Physical Memory Layout:
//! 0x0000_0000        ┌─────────────────────────────────┐
//!                    │  Low Memory and Kernel Image    │
//! KERNEL_IMAGE_END   ├─────────────────────────────────┤ 0x0040_0000
//!                    │    Available RAM                │
//!                    │  (owned by the frame allocator) │
//! PHYS_MEMORY_TOP    └─────────────────────────────────┘ 0x0800_0000
//! ```
//!
//! The kernel reaches physical memory through the higher-half direct map at
//! [`HHDM_BASE`](memory::HHDM_BASE) `+ pa`.

#![cfg_attr(not(any(test, doctest)), no_std)]
#![deny(unsafe_code)]

mod layout;
pub mod memory;

pub use layout::PhysicalMemoryLayout;
