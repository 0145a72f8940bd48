//! Record panics in the debug mailbox and halt the core
//!
//! # Example
//!
//! ## Device side
//!
//! ``` ignore
//! use panic_mailbox as _;
//!
//! fn main() {
//!     panic!("Oops");
//! }
//! ```
//!
//! ## Host side
//!
//! ``` text
//! $ # read the first words of the mailbox once the core stopped
//! (gdb) x/4xw &mailbox_debug
//! 0x9e008000: 0xdead0006 0x7372632f 0x00000000 0x00000004
//! ```
//!
//! - word 0: `0xdead0000 | 6`, the `EXCEPTION` panic reason
//! - word 1: first four bytes of the file that panicked (`src/`)
//! - word 2: function tag, always zero because Rust panics don't carry the function name
//! - word 3: line
//!
//! The firmware must provide the symbols listed in `mailbox_debug::Firmware`.
//!
//! # Optional features
//!
//! ## `stack-dump`
//!
//! Panic through `panic_dump_stack` instead: words 1 to 3 hold the stack bounds and the
//! overflow marker and the live stack is copied from word 4 onwards. The panic location is not
//! recorded in this mode. Requires the `__stack` and `_stack_sentry` linker symbols.
//!
//! ## `nop`
//!
//! Forwards to `mailbox_debug/nop`. The panic location is not recorded; the sentinel still is.
//!
//! ## `inline-asm`
//!
//! Forwards to `mailbox_debug/inline-asm`: interrupts are masked and the stack pointer is read
//! with inline assembly. Requires an ARM compilation target.

#![deny(missing_docs)]
#![deny(warnings)]
#![no_std]

use core::panic::PanicInfo;

use mailbox_debug::{Firmware, Mailbox, PanicReason, Platform, Sequencer};

#[allow(unused_mut)]
#[allow(unused_variables)]
#[panic_handler]
fn panic(info: &PanicInfo) -> ! {
    let mut platform = Firmware;
    platform.disable_interrupts();

    let mut sequencer = Sequencer::new(Mailbox::new(Firmware), platform);

    match () {
        #[cfg(feature = "stack-dump")]
        () => sequencer
            .with_stack(mailbox_debug::StackRegion::from_linker())
            .panic_dump_stack(PanicReason::Exception),
        #[cfg(not(feature = "stack-dump"))]
        () => {
            if let Some(location) = info.location() {
                let tag = mailbox_debug::encode_tag(location.file(), "");
                sequencer
                    .mailbox()
                    .write_tag_and_line(tag, location.line(), 1);
            }

            sequencer.panic(PanicReason::Exception)
        }
    }
}
