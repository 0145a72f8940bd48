#[cfg(all(target_arch = "arm", feature = "inline-asm"))]
use core::arch::asm;
use core::ptr::{self, NonNull};

use crate::mailbox::DebugRegion;
use crate::reason::PanicReason;
use crate::sequencer::{Platform, StackRegion};

/// The real mailbox and platform, reached through symbols provided by the firmware image
///
/// - `__mailbox_debug_base() -> *mut u32`
/// - `__platform_panic(reason: u32)`
/// - `__interrupt_global_disable()` and `__arch_get_stack_ptr() -> usize`, unless the
///   `inline-asm` feature is enabled
/// - the linker symbols `__stack` and `_stack_sentry`, see [`StackRegion::from_linker`]
pub struct Firmware;

unsafe impl DebugRegion for Firmware {
    #[inline(always)]
    fn base(&self) -> NonNull<u32> {
        extern "C" {
            fn __mailbox_debug_base() -> NonNull<u32>;
        }

        unsafe { __mailbox_debug_base() }
    }
}

unsafe impl Platform for Firmware {
    #[inline(always)]
    fn disable_interrupts(&mut self) {
        match () {
            #[cfg(all(target_arch = "arm", feature = "inline-asm"))]
            () => unsafe { asm!("cpsid if", options(nostack, preserves_flags)) },
            #[cfg(not(all(target_arch = "arm", feature = "inline-asm")))]
            () => {
                extern "C" {
                    fn __interrupt_global_disable();
                }

                unsafe { __interrupt_global_disable() }
            }
        }
    }

    fn panic_hook(&mut self, reason: PanicReason) {
        extern "C" {
            fn __platform_panic(reason: u32);
        }

        unsafe { __platform_panic(reason.code()) }
    }

    #[inline(always)]
    fn stack_pointer(&self) -> usize {
        match () {
            #[cfg(all(target_arch = "arm", feature = "inline-asm"))]
            () => {
                let sp: usize;
                unsafe { asm!("mov {}, sp", out(reg) sp, options(nomem, nostack, preserves_flags)) };
                sp
            }
            #[cfg(not(all(target_arch = "arm", feature = "inline-asm")))]
            () => {
                extern "C" {
                    fn __arch_get_stack_ptr() -> usize;
                }

                unsafe { __arch_get_stack_ptr() }
            }
        }
    }
}

impl StackRegion {
    /// Stack bounds from the linker script: `__stack` is the base, `_stack_sentry` the guard
    pub fn from_linker() -> Self {
        #[allow(non_upper_case_globals)]
        extern "C" {
            static __stack: u32;
            static _stack_sentry: u32;
        }

        // NOTE(unsafe) only the addresses are taken; the linker script places the stack between
        // the two symbols
        unsafe {
            StackRegion::new(
                ptr::addr_of!(__stack) as usize,
                ptr::addr_of!(_stack_sentry) as usize,
            )
        }
    }
}
