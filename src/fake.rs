//! In-memory stand-ins for the mailbox and the platform

use core::cell::UnsafeCell;
use core::convert::Infallible;
use core::ptr::{self, NonNull};

use ufmt::{uDisplay, uWrite, Formatter};

use crate::{DebugRegion, PanicReason, Platform};

pub const WORDS: usize = 64;

pub struct FakeRegion {
    words: UnsafeCell<[u32; WORDS]>,
}

impl FakeRegion {
    /// Value of every word nothing wrote to
    pub const POISON: u32 = 0xcccc_cccc;

    pub fn new() -> Self {
        FakeRegion {
            words: UnsafeCell::new([Self::POISON; WORDS]),
        }
    }

    pub fn words(&self) -> [u32; WORDS] {
        unsafe { ptr::read_volatile(self.words.get()) }
    }
}

unsafe impl DebugRegion for FakeRegion {
    fn base(&self) -> NonNull<u32> {
        unsafe { NonNull::new_unchecked(self.words.get().cast()) }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Event {
    InterruptsDisabled,
    /// Reason handed to the hook, and whether interrupts were masked at that point
    Hook(PanicReason, bool),
}

pub struct FakePlatform {
    sp: usize,
    masked: bool,
    events: Vec<Event>,
}

impl FakePlatform {
    pub fn new(sp: usize) -> Self {
        FakePlatform {
            sp,
            masked: false,
            events: Vec::new(),
        }
    }

    pub fn events(&self) -> &[Event] {
        &self.events
    }
}

unsafe impl Platform for FakePlatform {
    fn disable_interrupts(&mut self) {
        self.masked = true;
        self.events.push(Event::InterruptsDisabled);
    }

    fn panic_hook(&mut self, reason: PanicReason) {
        self.events.push(Event::Hook(reason, self.masked));
    }

    fn stack_pointer(&self) -> usize {
        self.sp
    }
}

struct Buffer(String);

impl uWrite for Buffer {
    type Error = Infallible;

    fn write_str(&mut self, s: &str) -> Result<(), Infallible> {
        self.0.push_str(s);
        Ok(())
    }
}

/// Renders `value` through `ufmt`
pub fn render<T>(value: &T) -> String
where
    T: uDisplay + ?Sized,
{
    let mut buffer = Buffer(String::new());
    let mut f = Formatter::new(&mut buffer);
    match value.fmt(&mut f) {
        Ok(()) => buffer.0,
        Err(never) => match never {},
    }
}
