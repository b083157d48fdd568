//! Register reads used by the monitor
//!
//! Only two registers matter here: CR3 (which page table is live) and RBP
//! (where the frame-pointer chain starts). Both are read on demand; nothing is
//! cached.

#[cfg(target_arch = "x86_64")]
pub use x86::{read_frame_pointer, read_page_table_base, X86Cpu};

/// No frame-pointer chain to start from off x86_64
#[cfg(not(target_arch = "x86_64"))]
#[inline(always)]
pub fn read_frame_pointer() -> u64 {
    0
}

#[cfg(target_arch = "x86_64")]
mod x86 {
    use crate::platform::Cpu;
    use x86_64::registers::control::Cr3;

    /// Physical base of the active PML4
    ///
    /// CR3 is privileged; this faults outside ring 0.
    pub fn read_page_table_base() -> u64 {
        let (frame, _flags) = Cr3::read();
        frame.start_address().as_u64()
    }

    /// Current value of RBP
    ///
    /// Inlined so the value is the caller's frame pointer, not a frame of
    /// this helper. That only holds for direct calls: behind a `dyn` the
    /// helper gets its own frame, which is dead once it returns. Meaningful
    /// only when the kernel is built with `-C force-frame-pointers=yes`.
    #[inline(always)]
    pub fn read_frame_pointer() -> u64 {
        let rbp: u64;
        // SAFETY: reads a register, touches no memory
        unsafe {
            core::arch::asm!("mov {}, rbp", out(reg) rbp, options(nomem, nostack, preserves_flags));
        }
        rbp
    }

    /// [`Cpu`] backed by the real registers
    #[derive(Debug, Clone, Copy, Default)]
    pub struct X86Cpu;

    impl Cpu for X86Cpu {
        fn page_table_base(&self) -> u64 {
            read_page_table_base()
        }

        fn frame_pointer(&self, current: u64) -> u64 {
            current
        }
    }
}
