use core::mem;
use core::ptr::{self, NonNull};

use crate::tag::Tag;

/// Resolves the base address of the debug mailbox
///
/// # Safety
///
/// `base` must always return the same word aligned address, and that address must stay valid
/// for writes for the lifetime of the program. The mailbox does no bounds checking: the region
/// must be large enough for every offset the program writes at.
pub unsafe trait DebugRegion {
    /// First word of the mailbox
    fn base(&self) -> NonNull<u32>;
}

unsafe impl<R> DebugRegion for &R
where
    R: DebugRegion + ?Sized,
{
    fn base(&self) -> NonNull<u32> {
        (**self).base()
    }
}

/// Handle to the debug mailbox
///
/// All stores are volatile and unsynchronized. A single writer per region is assumed; if two
/// contexts write the same offsets the recorded data is silently corrupted.
pub struct Mailbox<R> {
    region: R,
}

impl<R> Mailbox<R> {
    /// Wraps the region
    pub const fn new(region: R) -> Self {
        Mailbox { region }
    }

    /// Gives the region back
    pub fn free(self) -> R {
        self.region
    }
}

impl<R> Mailbox<R>
where
    R: DebugRegion,
{
    /// Writes `tag` and `line` as three consecutive words starting at `offset`
    ///
    /// **NOTE:** This operation is a no-op when the `nop` feature is enabled
    #[allow(unused_variables)]
    #[inline(always)]
    pub fn write_tag_and_line(&mut self, tag: Tag, line: u32, offset: usize) {
        match () {
            #[cfg(feature = "nop")]
            () => {}
            #[cfg(not(feature = "nop"))]
            () => {
                self.store(offset, tag.file);
                self.store(offset + 1, tag.function);
                self.store(offset + 2, line);
            }
        }
    }

    /// Writes a single word at `offset`
    ///
    /// **NOTE:** This operation is a no-op when the `nop` feature is enabled
    #[allow(unused_variables)]
    #[inline(always)]
    pub fn write_word(&mut self, value: u32, offset: usize) {
        match () {
            #[cfg(feature = "nop")]
            () => {}
            #[cfg(not(feature = "nop"))]
            () => self.store(offset, value),
        }
    }

    /// Copies `count` words starting at `src` into the mailbox starting at `offset`
    ///
    /// **NOTE:** This operation is a no-op when the `nop` feature is enabled
    ///
    /// # Safety
    ///
    /// `src` must be word aligned and valid for reads of `count` words
    #[allow(unused_variables)]
    #[inline(always)]
    pub unsafe fn dump_words(&mut self, src: *const u32, count: usize, offset: usize) {
        match () {
            #[cfg(feature = "nop")]
            () => {}
            #[cfg(not(feature = "nop"))]
            () => self.copy(src, count, offset),
        }
    }

    /// Copies `words` into the mailbox starting at `offset`
    ///
    /// **NOTE:** This operation is a no-op when the `nop` feature is enabled
    #[inline(always)]
    pub fn dump_slice(&mut self, words: &[u32], offset: usize) {
        unsafe { self.dump_words(words.as_ptr(), words.len(), offset) }
    }

    /// Copies the whole words of `*object` into the mailbox starting at `offset`
    ///
    /// Trailing bytes that don't fill a word are not copied.
    ///
    /// **NOTE:** This operation is a no-op when the `nop` feature is enabled
    ///
    /// # Safety
    ///
    /// `object` must be valid for reads, word aligned and must not contain uninitialized
    /// (padding) bytes in its whole words
    #[inline(always)]
    pub unsafe fn dump_object<T>(&mut self, object: *const T, offset: usize) {
        self.dump_words(object.cast(), mem::size_of::<T>() >> 2, offset)
    }

    pub(crate) fn store(&mut self, offset: usize, word: u32) {
        // NOTE(unsafe) the `DebugRegion` contract covers every offset handed to us
        unsafe { ptr::write_volatile(self.region.base().as_ptr().add(offset), word) }
    }

    pub(crate) unsafe fn copy(&mut self, src: *const u32, count: usize, offset: usize) {
        let dst = self.region.base().as_ptr().add(offset);
        for i in 0..count {
            ptr::write_volatile(dst.add(i), ptr::read_volatile(src.add(i)));
        }
    }
}
