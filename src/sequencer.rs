use core::mem;
use core::sync::atomic::{self, Ordering};

use crate::mailbox::{DebugRegion, Mailbox};
use crate::reason::PanicReason;

const WORD: usize = mem::size_of::<u32>();

/// Platform services the panic path relies on
///
/// # Safety
///
/// `stack_pointer` must return the live stack pointer of the calling context, an address that
/// is readable up to the base of the [`StackRegion`] handed to the [`StackDumper`].
pub unsafe trait Platform {
    /// Masks every interrupt on the calling core. Must be idempotent.
    fn disable_interrupts(&mut self);

    /// Hardware specific panic signalling (reset, notify the host, debug break). May or may not
    /// return.
    fn panic_hook(&mut self, reason: PanicReason);

    /// Current stack pointer
    fn stack_pointer(&self) -> usize;
}

/// Bounds of the stack of the panicking context; the stack grows down from `base`
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct StackRegion {
    base: usize,
    guard: usize,
}

impl StackRegion {
    /// Stack region with the given (highest) `base` address and `guard` (sentry) address
    ///
    /// # Safety
    ///
    /// Every address between the live stack pointer and `base`, and between the live stack
    /// pointer and `guard` when `guard >= base`, must be readable
    pub const unsafe fn new(base: usize, guard: usize) -> Self {
        StackRegion { base, guard }
    }

    /// Highest address of the stack
    pub const fn base(&self) -> usize {
        self.base
    }

    /// Overflow sentry
    pub const fn guard(&self) -> usize {
        self.guard
    }
}

/// Spins forever with interrupts left as they are
pub fn halt() -> ! {
    loop {
        // NOTE the compiler_fence prevents this loop from turning into an abort instruction when
        // this crate is compiled with optimizations
        atomic::compiler_fence(Ordering::SeqCst)
    }
}

/// The terminal fault path: records why the core stopped, calls the platform hook and halts
pub struct Sequencer<R, P> {
    mailbox: Mailbox<R>,
    platform: P,
}

impl<R, P> Sequencer<R, P>
where
    R: DebugRegion,
    P: Platform,
{
    /// Sequencer writing to `mailbox`
    pub fn new(mailbox: Mailbox<R>, platform: P) -> Self {
        Sequencer { mailbox, platform }
    }

    /// Adds the stack bounds needed by [`StackDumper::panic_dump_stack`]
    pub fn with_stack(self, stack: StackRegion) -> StackDumper<R, P> {
        StackDumper {
            sequencer: self,
            stack,
        }
    }

    /// The mailbox, for records written before panicking
    pub fn mailbox(&mut self) -> &mut Mailbox<R> {
        &mut self.mailbox
    }

    /// The platform services
    pub fn platform(&self) -> &P {
        &self.platform
    }

    /// Masks interrupts, writes `0xdead0000 | reason` at offset 0, runs the platform hook and
    /// halts
    pub fn panic(&mut self, reason: PanicReason) -> ! {
        self.record(reason);
        halt()
    }

    fn record(&mut self, reason: PanicReason) {
        self.platform.disable_interrupts();
        self.mailbox.store(0, reason.sentinel());
        self.platform.panic_hook(reason);
    }
}

/// [`Sequencer`] that also dumps the live stack
pub struct StackDumper<R, P> {
    sequencer: Sequencer<R, P>,
    stack: StackRegion,
}

impl<R, P> StackDumper<R, P>
where
    R: DebugRegion,
    P: Platform,
{
    /// The plain sequencer
    pub fn sequencer(&mut self) -> &mut Sequencer<R, P> {
        &mut self.sequencer
    }

    /// Stack bounds in use
    pub fn stack(&self) -> StackRegion {
        self.stack
    }

    /// [`Sequencer::panic`] plus stack bounds and contents
    ///
    /// Writes the sentinel at offset 0, the stack top at offset 1 and the stack bottom at
    /// offset 2. If the bottom sits at or below the guard the stack is considered smashed:
    /// `0x51ac0000 | reason` goes to offset 3, the bottom is clamped to the guard and the hook
    /// receives [`PanicReason::Stack`] instead of `reason`. After the hook, the stack words
    /// from the top up to (but excluding) the last word below the bottom are copied from
    /// offset 4 onwards.
    pub fn panic_dump_stack(&mut self, reason: PanicReason) -> ! {
        self.record(reason);
        halt()
    }

    fn record(&mut self, reason: PanicReason) -> PanicReason {
        let Sequencer { mailbox, platform } = &mut self.sequencer;

        platform.disable_interrupts();

        let top = platform.stack_pointer();
        let mut bottom = self.stack.base;
        let limit = self.stack.guard;

        // addresses are stored as 32-bit words
        mailbox.store(0, reason.sentinel());
        mailbox.store(1, top as u32);
        mailbox.store(2, bottom as u32);

        let mut hook_reason = reason;
        if bottom <= limit {
            mailbox.store(3, reason.smashed_sentinel());
            bottom = limit;
            hook_reason = PanicReason::Stack;
        }

        platform.panic_hook(hook_reason);

        let count = (bottom.saturating_sub(top) / WORD).saturating_sub(1);
        // NOTE(unsafe) `Platform` and `StackRegion` guarantee `top..bottom` is readable
        unsafe { mailbox.copy(top as *const u32, count, 4) }

        hook_reason
    }
}

#[cfg(test)]
impl<R, P> Sequencer<R, P>
where
    R: DebugRegion,
    P: Platform,
{
    pub(crate) fn panic_until_halt(&mut self, reason: PanicReason) {
        self.record(reason)
    }
}

#[cfg(test)]
impl<R, P> StackDumper<R, P>
where
    R: DebugRegion,
    P: Platform,
{
    pub(crate) fn panic_dump_stack_until_halt(&mut self, reason: PanicReason) -> PanicReason {
        self.record(reason)
    }
}
