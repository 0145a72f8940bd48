use core::convert::TryFrom;
use core::fmt;

use ufmt::{uDisplay, uWrite, Formatter};

/// High half of the word written at offset 0 when the core panics
pub const PANIC_SENTINEL: u32 = 0xdead_0000;

/// High half of the word written at offset 3 when a smashed stack is detected
pub const STACK_SMASHED_SENTINEL: u32 = 0x51ac_0000;

/// Why the firmware stopped
///
/// The discriminants are stable: they are the low half of the mailbox sentinels and the value
/// handed to the platform panic hook.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[repr(u32)]
pub enum PanicReason {
    /// Memory allocator failure
    Mem = 0,
    /// Work queue failure
    Work = 1,
    /// Host IPC failure
    Ipc = 2,
    /// Architecture level fault
    Arch = 3,
    /// Platform level fault
    Platform = 4,
    /// Task failure
    Task = 5,
    /// Unhandled exception
    Exception = 6,
    /// Deadlock detected
    Deadlock = 7,
    /// Stack overflow
    Stack = 8,
}

impl PanicReason {
    /// Every reason, in code order
    pub const ALL: [PanicReason; 9] = [
        PanicReason::Mem,
        PanicReason::Work,
        PanicReason::Ipc,
        PanicReason::Arch,
        PanicReason::Platform,
        PanicReason::Task,
        PanicReason::Exception,
        PanicReason::Deadlock,
        PanicReason::Stack,
    ];

    /// Numeric code, in `0..=8`
    pub const fn code(self) -> u32 {
        self as u32
    }

    /// `0xdead0000 | code`
    pub const fn sentinel(self) -> u32 {
        PANIC_SENTINEL | self as u32
    }

    /// `0x51ac0000 | code`
    pub const fn smashed_sentinel(self) -> u32 {
        STACK_SMASHED_SENTINEL | self as u32
    }

    fn name(self) -> &'static str {
        match self {
            PanicReason::Mem => "MEM",
            PanicReason::Work => "WORK",
            PanicReason::Ipc => "IPC",
            PanicReason::Arch => "ARCH",
            PanicReason::Platform => "PLATFORM",
            PanicReason::Task => "TASK",
            PanicReason::Exception => "EXCEPTION",
            PanicReason::Deadlock => "DEADLOCK",
            PanicReason::Stack => "STACK",
        }
    }
}

impl TryFrom<u32> for PanicReason {
    type Error = InvalidReason;

    fn try_from(code: u32) -> Result<Self, InvalidReason> {
        PanicReason::ALL
            .get(code as usize)
            .copied()
            .ok_or(InvalidReason(code))
    }
}

impl From<PanicReason> for u32 {
    fn from(reason: PanicReason) -> u32 {
        reason.code()
    }
}

impl fmt::Display for PanicReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl uDisplay for PanicReason {
    fn fmt<W>(&self, f: &mut Formatter<'_, W>) -> Result<(), W::Error>
    where
        W: uWrite + ?Sized,
    {
        f.write_str(self.name())
    }
}

/// A code outside of `0..=8`
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct InvalidReason(pub u32);

impl fmt::Display for InvalidReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid panic reason {}", self.0)
    }
}

impl uDisplay for InvalidReason {
    fn fmt<W>(&self, f: &mut Formatter<'_, W>) -> Result<(), W::Error>
    where
        W: uWrite + ?Sized,
    {
        f.write_str("invalid panic reason ")?;
        <u32 as uDisplay>::fmt(&self.0, f)
    }
}
