//! Crash diagnostics through a shared-memory debug mailbox
//!
//! The mailbox is a window of 32-bit words that an external host, a debugger or a post-mortem
//! tool reads after the core halts or the device resets. This crate writes two kinds of records
//! into it:
//!
//! - checkpoints and raw values / word dumps, which are best-effort transient debug aids, and
//! - panic records, written by a sequencer that masks interrupts, stores a sentinel, calls the
//!   platform panic hook and then never returns.
//!
//! # Example
//!
//! ## Device side
//!
//! ``` ignore
//! use mailbox_debug::{checkpoint, dbg_val, Firmware, Mailbox, PanicReason, Sequencer};
//!
//! fn main() {
//!     let mut mailbox = Mailbox::new(Firmware);
//!
//!     // words 0..3: file tag, function tag, line
//!     checkpoint!(mailbox);
//!     // word 4
//!     dbg_val!(mailbox, 0x1234, 4);
//!
//!     Sequencer::new(mailbox, Firmware).panic(PanicReason::Ipc);
//! }
//! ```
//!
//! ## Host side
//!
//! ``` text
//! $ # dump the mailbox window after the core halted
//! (gdb) x/5xw &mailbox_debug
//! 0x9e008000: 0xdead0002 0x6d61696e 0x00000017 0x00000000
//! 0x9e008010: 0x00001234
//! ```
//!
//! The words can be turned back into records with [`PanicRecord::decode`],
//! [`StackDump::decode`] and [`Checkpoint::decode`], all of which render through `ufmt`.
//!
//! # Mailbox layout
//!
//! | offset | checkpoint   | panic              | stack dump panic          |
//! |--------|--------------|--------------------|---------------------------|
//! | 0      | file tag     | `0xdead0000 \| r`  | `0xdead0000 \| r`         |
//! | 1      | function tag |                    | stack top                 |
//! | 2      | line         |                    | stack bottom              |
//! | 3      |              |                    | `0x51ac0000 \| r` if smashed |
//! | 4..    |              |                    | stack words               |
//!
//! # Optional features
//!
//! ## `nop`
//!
//! Turns the soft diagnostics ([`Mailbox::write_tag_and_line`], [`Mailbox::write_word`],
//! [`Mailbox::dump_words`] and every macro built on them) into "no-operations". Nothing is
//! written to the mailbox and the calls inline away. The panic paths keep writing their
//! records.
//!
//! ## `inline-asm`
//!
//! When this feature is enabled [`Firmware`] masks interrupts and reads the stack pointer using
//! inline assembly (`asm!`). This feature requires that the compilation target is an ARM target.
//!
//! When this feature is disabled [`Firmware`] uses FFI calls into the external symbols
//! `__interrupt_global_disable` and `__arch_get_stack_ptr`.

#![deny(missing_docs)]
#![deny(warnings)]
#![cfg_attr(not(test), no_std)]

mod firmware;
mod mailbox;
mod reason;
mod record;
mod sequencer;
mod tag;

#[cfg(test)]
mod fake;

pub use crate::firmware::Firmware;
pub use crate::mailbox::{DebugRegion, Mailbox};
pub use crate::reason::{InvalidReason, PanicReason, PANIC_SENTINEL, STACK_SMASHED_SENTINEL};
pub use crate::record::{Checkpoint, DecodeError, PanicRecord, StackDump};
pub use crate::sequencer::{halt, Platform, Sequencer, StackDumper, StackRegion};
pub use crate::tag::{encode_tag, Tag};

/// Strips a nested item's type name down to the enclosing function's name
#[doc(hidden)]
pub fn __function_name(path: &'static str) -> &'static str {
    // `path` is the type name of an item nested in the function, e.g. `krate::module::func::f`
    let mut path = path.strip_suffix("::f").unwrap_or(path);
    // closures and async blocks report the function that contains them
    while let Some(outer) = path.strip_suffix("::{{closure}}") {
        path = outer;
    }
    match path.rfind("::") {
        Some(i) => &path[i + 2..],
        None => path,
    }
}

/// Name of the enclosing function
#[doc(hidden)]
#[macro_export]
macro_rules! __function_name {
    () => {{
        fn f() {}
        fn type_name_of<T>(_: T) -> &'static str {
            core::any::type_name::<T>()
        }
        $crate::__function_name(type_name_of(f))
    }};
}

/// [`Tag`] of the calling file and function
#[macro_export]
macro_rules! tag {
    () => {
        $crate::encode_tag(file!(), $crate::__function_name!())
    };
}

/// Records the calling file, function and line as a checkpoint
///
/// Writes three words at the given offset, or at the start of the mailbox when the offset is
/// omitted.
#[macro_export]
macro_rules! checkpoint {
    ($mailbox:expr) => {
        $crate::checkpoint!($mailbox, 0)
    };
    ($mailbox:expr, $offset:expr) => {
        $mailbox.write_tag_and_line($crate::tag!(), line!(), $offset)
    };
}

/// Writes a single word to the mailbox
#[macro_export]
macro_rules! dbg_val {
    ($mailbox:expr, $value:expr) => {
        $crate::dbg_val!($mailbox, $value, 0)
    };
    ($mailbox:expr, $value:expr, $offset:expr) => {
        $mailbox.write_word($value, $offset)
    };
}

/// Copies `count` words starting at `addr` into the mailbox
///
/// This expands to a call to the unsafe [`Mailbox::dump_words`] and must be used inside an
/// `unsafe` block.
#[macro_export]
macro_rules! dump {
    ($mailbox:expr, $addr:expr, $count:expr) => {
        $crate::dump!($mailbox, $addr, $count, 0)
    };
    ($mailbox:expr, $addr:expr, $count:expr, $offset:expr) => {
        $mailbox.dump_words($addr, $count, $offset)
    };
}

/// Records a checkpoint followed by the whole words of an object
///
/// The checkpoint takes the three words at the offset and the object follows it. `$object` is
/// a reference or a raw pointer to the object. This expands to a call to the unsafe
/// [`Mailbox::dump_object`] and must be used inside an `unsafe` block.
#[macro_export]
macro_rules! dump_object {
    ($mailbox:expr, $object:expr) => {
        $crate::dump_object!($mailbox, $object, 0)
    };
    ($mailbox:expr, $object:expr, $offset:expr) => {{
        let mailbox = &mut $mailbox;
        let offset: usize = $offset;
        $crate::checkpoint!(mailbox, offset);
        mailbox.dump_object($object, offset + 3)
    }};
}

#[cfg(test)]
mod tests {
    use crate::fake::FakeRegion;
    use crate::Mailbox;

    #[test]
    fn function_name_is_last_path_segment() {
        assert_eq!(super::__function_name("a::b::c::f"), "c");
        assert_eq!(super::__function_name("main::f"), "main");
        assert_eq!(super::__function_name("f"), "f");
        assert_eq!(super::__function_name("a::b::{{closure}}::f"), "b");
        assert_eq!(
            super::__function_name("a::irq::{{closure}}::{{closure}}::f"),
            "irq"
        );
    }

    #[cfg(not(feature = "nop"))]
    #[test]
    fn checkpoint_inside_closure_names_enclosing_function() {
        use crate::encode_tag;

        let region = FakeRegion::new();
        let mut mailbox = Mailbox::new(&region);

        let run = |mailbox: &mut Mailbox<&FakeRegion>| checkpoint!(mailbox);
        run(&mut mailbox);

        assert_eq!(
            region.words()[1],
            encode_tag("", "checkpoint_inside_closure_names_enclosing_function").function
        );
    }

    #[cfg(not(feature = "nop"))]
    #[test]
    fn checkpoint_records_file_function_and_line() {
        use crate::encode_tag;

        let region = FakeRegion::new();
        let mut mailbox = Mailbox::new(&region);

        let line = line!() + 1;
        checkpoint!(mailbox, 2);

        let words = region.words();
        let tag = encode_tag(file!(), "checkpoint_records_file_function_and_line");
        assert_eq!(&words[2..5], &[tag.file, tag.function, line]);
        assert_eq!(words[0], FakeRegion::POISON);
    }

    #[cfg(not(feature = "nop"))]
    #[test]
    fn macros_default_to_offset_zero() {
        let region = FakeRegion::new();
        let mut mailbox = Mailbox::new(&region);

        dbg_val!(mailbox, 0xcafe);
        assert_eq!(region.words()[0], 0xcafe);

        let data = [7, 8, 9];
        unsafe { dump!(mailbox, data.as_ptr(), data.len()) };
        assert_eq!(&region.words()[..4], &[7, 8, 9, FakeRegion::POISON]);
    }

    #[cfg(not(feature = "nop"))]
    #[test]
    fn dump_object_follows_the_checkpoint() {
        use crate::encode_tag;

        #[allow(dead_code)]
        #[repr(C)]
        struct Ipc {
            cmd: u32,
            size: u32,
        }

        let region = FakeRegion::new();
        let mut mailbox = Mailbox::new(&region);
        let msg = Ipc {
            cmd: 0x3000_0000,
            size: 64,
        };

        unsafe { dump_object!(mailbox, &msg, 1) };

        let words = region.words();
        assert_eq!(
            words[1],
            encode_tag(file!(), "dump_object_follows_the_checkpoint").file
        );
        assert_eq!(&words[4..7], &[0x3000_0000, 64, FakeRegion::POISON]);
    }

    #[cfg(feature = "nop")]
    #[test]
    fn macros_are_silent() {
        let region = FakeRegion::new();
        let mut mailbox = Mailbox::new(&region);
        let data = [1u32, 2, 3];

        checkpoint!(mailbox);
        dbg_val!(mailbox, 1, 5);
        unsafe {
            dump!(mailbox, data.as_ptr(), data.len(), 8);
            dump_object!(mailbox, &data);
        }

        assert!(region.words().iter().all(|w| *w == FakeRegion::POISON));
    }
}
