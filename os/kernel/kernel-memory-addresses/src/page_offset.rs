use crate::PageSize;
use core::fmt;
use core::marker::PhantomData;

/// The byte offset within a page of size `S` (`0..S::SIZE`).
#[repr(transparent)]
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct PageOffset<S: PageSize> {
    value: u64,
    _size: PhantomData<S>,
}

impl<S: PageSize> PageOffset<S> {
    /// Take the low `S::SHIFT` bits of `raw`.
    #[inline]
    #[must_use]
    pub const fn from_raw(raw: u64) -> Self {
        Self {
            value: raw & (S::SIZE - 1),
            _size: PhantomData,
        }
    }

    #[inline]
    #[must_use]
    pub const fn as_u64(self) -> u64 {
        self.value
    }
}

impl<S: PageSize> fmt::Debug for PageOffset<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PageOffset<{}>({:#X})", S::NAME, self.value)
    }
}
