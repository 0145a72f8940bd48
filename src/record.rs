//! Post-mortem side: turning a snapshot of the mailbox back into records

use core::cmp;
use core::convert::TryFrom;
use core::fmt;

use ufmt::{uDisplay, uWrite, Formatter};

use crate::reason::{InvalidReason, PanicReason, PANIC_SENTINEL};
use crate::tag::Tag;

const SENTINEL_MASK: u32 = 0xffff_0000;

/// Why a mailbox snapshot couldn't be decoded
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DecodeError {
    /// The snapshot is shorter than the record
    Truncated {
        /// Words the record needs
        needed: usize,
        /// Words in the snapshot
        found: usize,
    },
    /// Offset 0 doesn't hold a panic sentinel
    NotAPanic(u32),
    /// The sentinel carries an unknown reason
    Reason(InvalidReason),
}

impl From<InvalidReason> for DecodeError {
    fn from(e: InvalidReason) -> Self {
        DecodeError::Reason(e)
    }
}

impl fmt::Display for DecodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DecodeError::Truncated { needed, found } => {
                write!(f, "need {} words, found {}", needed, found)
            }
            DecodeError::NotAPanic(word) => write!(f, "{:#010x} is not a panic sentinel", word),
            DecodeError::Reason(e) => fmt::Display::fmt(e, f),
        }
    }
}

impl uDisplay for DecodeError {
    fn fmt<W>(&self, f: &mut Formatter<'_, W>) -> Result<(), W::Error>
    where
        W: uWrite + ?Sized,
    {
        match self {
            DecodeError::Truncated { needed, found } => {
                f.write_str("need ")?;
                <usize as uDisplay>::fmt(needed, f)?;
                f.write_str(" words, found ")?;
                <usize as uDisplay>::fmt(found, f)
            }
            DecodeError::NotAPanic(word) => {
                hex(*word, f)?;
                f.write_str(" is not a panic sentinel")
            }
            DecodeError::Reason(e) => <InvalidReason as uDisplay>::fmt(e, f),
        }
    }
}

fn expect_len(words: &[u32], needed: usize) -> Result<(), DecodeError> {
    if words.len() < needed {
        Err(DecodeError::Truncated {
            needed,
            found: words.len(),
        })
    } else {
        Ok(())
    }
}

/// `0x` followed by eight hex digits
fn hex<W>(word: u32, f: &mut Formatter<'_, W>) -> Result<(), W::Error>
where
    W: uWrite + ?Sized,
{
    const DIGITS: &[u8; 16] = b"0123456789abcdef";

    let mut buf = *b"0x00000000";
    for (i, byte) in buf[2..].iter_mut().enumerate() {
        *byte = DIGITS[(word >> (28 - 4 * i) & 0xf) as usize];
    }

    // only ASCII
    match core::str::from_utf8(&buf) {
        Ok(s) => f.write_str(s),
        Err(_) => Ok(()),
    }
}

/// A checkpoint written by [`checkpoint!`](crate::checkpoint)
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Checkpoint {
    /// Where
    pub tag: Tag,
    /// Source line
    pub line: u32,
}

impl Checkpoint {
    /// Reads the checkpoint at the start of `words`
    pub fn decode(words: &[u32]) -> Result<Self, DecodeError> {
        match *words {
            [file, function, line, ..] => Ok(Checkpoint {
                tag: Tag { file, function },
                line,
            }),
            _ => Err(DecodeError::Truncated {
                needed: 3,
                found: words.len(),
            }),
        }
    }
}

impl uDisplay for Checkpoint {
    fn fmt<W>(&self, f: &mut Formatter<'_, W>) -> Result<(), W::Error>
    where
        W: uWrite + ?Sized,
    {
        <Tag as uDisplay>::fmt(&self.tag, f)?;
        f.write_str(":")?;
        <u32 as uDisplay>::fmt(&self.line, f)
    }
}

/// A record written by [`Sequencer::panic`](crate::Sequencer::panic)
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PanicRecord {
    /// Reason passed by the code that panicked
    pub reason: PanicReason,
}

impl PanicRecord {
    /// Reads the sentinel at the start of `words`
    pub fn decode(words: &[u32]) -> Result<Self, DecodeError> {
        expect_len(words, 1)?;

        let sentinel = words[0];
        if sentinel & SENTINEL_MASK != PANIC_SENTINEL {
            return Err(DecodeError::NotAPanic(sentinel));
        }

        Ok(PanicRecord {
            reason: PanicReason::try_from(sentinel & !SENTINEL_MASK)?,
        })
    }
}

impl uDisplay for PanicRecord {
    fn fmt<W>(&self, f: &mut Formatter<'_, W>) -> Result<(), W::Error>
    where
        W: uWrite + ?Sized,
    {
        f.write_str("panic: ")?;
        <PanicReason as uDisplay>::fmt(&self.reason, f)
    }
}

/// A record written by [`StackDumper::panic_dump_stack`](crate::StackDumper::panic_dump_stack)
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct StackDump<'a> {
    /// Reason passed by the code that panicked
    pub reason: PanicReason,
    /// Stack pointer at panic time
    pub top: u32,
    /// Stack base, before clamping
    pub bottom: u32,
    /// Whether the bottom had overrun the guard
    pub smashed: bool,
    /// Dumped stack words, lowest address first
    pub stack: &'a [u32],
}

impl<'a> StackDump<'a> {
    /// Reads a stack dump panic record from `words`
    ///
    /// The dumped words are bounded by the snapshot length. When the stack was smashed the
    /// clamped bottom is not in the mailbox, so every word after offset 3 is taken.
    ///
    /// A healthy panic leaves offset 3 untouched. If an earlier write left `0x51ac0000 | reason`
    /// there, the record is reported as smashed.
    pub fn decode(words: &'a [u32]) -> Result<Self, DecodeError> {
        let PanicRecord { reason } = PanicRecord::decode(words)?;
        expect_len(words, 4)?;

        let (top, bottom) = (words[1], words[2]);
        let smashed = words[3] == reason.smashed_sentinel();
        let rest = &words[4..];
        let len = if smashed {
            rest.len()
        } else {
            cmp::min(
                (bottom.saturating_sub(top) as usize / 4).saturating_sub(1),
                rest.len(),
            )
        };

        Ok(StackDump {
            reason,
            top,
            bottom,
            smashed,
            stack: &rest[..len],
        })
    }

    /// Reason the platform hook received
    pub fn hook_reason(&self) -> PanicReason {
        if self.smashed {
            PanicReason::Stack
        } else {
            self.reason
        }
    }
}

impl uDisplay for StackDump<'_> {
    fn fmt<W>(&self, f: &mut Formatter<'_, W>) -> Result<(), W::Error>
    where
        W: uWrite + ?Sized,
    {
        f.write_str("panic: ")?;
        <PanicReason as uDisplay>::fmt(&self.reason, f)?;
        if self.smashed {
            f.write_str(" (stack smashed)")?;
        }
        f.write_str(", stack ")?;
        hex(self.top, f)?;
        f.write_str("..")?;
        hex(self.bottom, f)?;
        for (i, word) in self.stack.iter().enumerate() {
            f.write_str(if i % 4 == 0 { "\n" } else { " " })?;
            hex(*word, f)?;
        }
        Ok(())
    }
}
