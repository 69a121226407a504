//! Raw allocator adapter.
//!
//! The debugger never looks inside the memory provider. It only asks for
//! bytes and hands them back, and treats a `None` from [`RawAllocator::allocate`]
//! as exhaustion at any size.

use std::ptr::NonNull;

/// Opaque allocate/release primitives underneath the debugger.
pub trait RawAllocator {
    /// Request `size` bytes. `None` means the provider is exhausted.
    fn allocate(&mut self, size: usize) -> Option<NonNull<u8>>;

    /// Return a block previously obtained from [`RawAllocator::allocate`].
    ///
    /// # Safety
    ///
    /// `ptr` must have been returned by `allocate` on this adapter and must
    /// not have been released since.
    unsafe fn release(&mut self, ptr: NonNull<u8>);
}

/// Adapter over the C library heap (`malloc`/`free`).
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemRaw;

impl RawAllocator for SystemRaw {
    fn allocate(&mut self, size: usize) -> Option<NonNull<u8>> {
        // SAFETY: malloc accepts any size and reports failure with null.
        NonNull::new(unsafe { libc::malloc(size) }.cast::<u8>())
    }

    unsafe fn release(&mut self, ptr: NonNull<u8>) {
        // SAFETY: caller guarantees `ptr` came from `libc::malloc` above.
        unsafe { libc::free(ptr.as_ptr().cast()) };
    }
}

/// Adapter wrapper that refuses requests above a byte cap and counts traffic.
///
/// Useful wherever a deterministic "provider exhausted" answer is needed.
#[derive(Debug, Default, Clone)]
pub struct CappedRaw<A> {
    inner: A,
    cap: Option<usize>,
    allocations: u64,
    refusals: u64,
    releases: u64,
}

impl<A: RawAllocator> CappedRaw<A> {
    /// Wrap `inner`, refusing any single request larger than `cap` bytes.
    #[must_use]
    pub fn new(inner: A, cap: Option<usize>) -> Self {
        Self {
            inner,
            cap,
            allocations: 0,
            refusals: 0,
            releases: 0,
        }
    }

    /// Requests forwarded to the inner adapter.
    #[must_use]
    pub fn allocations(&self) -> u64 {
        self.allocations
    }

    /// Requests refused because they exceeded the cap.
    #[must_use]
    pub fn refusals(&self) -> u64 {
        self.refusals
    }

    /// Blocks handed back to the inner adapter.
    #[must_use]
    pub fn releases(&self) -> u64 {
        self.releases
    }

    /// Total requests seen, refused or not.
    #[must_use]
    pub fn requests(&self) -> u64 {
        self.allocations + self.refusals
    }
}

impl<A: RawAllocator> RawAllocator for CappedRaw<A> {
    fn allocate(&mut self, size: usize) -> Option<NonNull<u8>> {
        if self.cap.is_some_and(|cap| size > cap) {
            self.refusals += 1;
            return None;
        }
        self.allocations += 1;
        self.inner.allocate(size)
    }

    unsafe fn release(&mut self, ptr: NonNull<u8>) {
        self.releases += 1;
        // SAFETY: forwarded under the caller's contract.
        unsafe { self.inner.release(ptr) };
    }
}
