//! # Kernel synchronization primitives
//!
//! The memory-management core is single-threaded by construction (`&mut self`
//! everywhere). When one frame allocator or one address space is shared
//! between execution units, it is wrapped in a [`SpinLock`] so that free-list
//! push/pop and every full walk/map/destroy sequence run exclusively.

#![cfg_attr(not(any(test, doctest)), no_std)]
#![allow(unsafe_code)]

mod spin_lock;

pub use spin_lock::{SpinLock, SpinLockGuard};
