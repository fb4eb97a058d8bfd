bitflags::bitflags! {
    /// Architecture-neutral access rights for a mapped page.
    ///
    /// The x86-64 encoding in a leaf [`PageTableEntry`](crate::PageTableEntry):
    ///
    /// | Permission | PTE bit                         |
    /// |------------|---------------------------------|
    /// | `READ`     | implied by `P` (every present page is readable) |
    /// | `WRITE`    | `RW`                            |
    /// | `EXECUTE`  | `NX` **clear**                  |
    /// | `USER`     | `US`                            |
    ///
    /// ```rust
    /// # use kernel_vmem::PagePermissions;
    /// let data = PagePermissions::READ | PagePermissions::WRITE;
    /// assert!(!data.contains(PagePermissions::EXECUTE));
    /// ```
    #[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
    pub struct PagePermissions: u8 {
        const READ = 1 << 0;
        const WRITE = 1 << 1;
        const EXECUTE = 1 << 2;
        const USER = 1 << 3;
    }
}

impl PagePermissions {
    /// Kernel data: readable, writable, never executed.
    pub const KERNEL_DATA: Self = Self::READ.union(Self::WRITE);

    /// Kernel text: readable and executable.
    pub const KERNEL_TEXT: Self = Self::READ.union(Self::EXECUTE);
}
