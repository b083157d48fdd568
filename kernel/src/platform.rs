//! Collaborator interfaces consumed by the monitor
//!
//! The monitor core only ever talks to the machine through these traits:
//!
//! | Trait                 | Provides                                        |
//! |-----------------------|-------------------------------------------------|
//! | [`Console`]           | line input and formatted output                 |
//! | [`Cpu`]               | page-table base (CR3) and frame pointer (RBP)   |
//! | [`PageTables`]        | non-allocating entry lookup for a virtual page  |
//! | [`AddressTranslator`] | physical <-> kernel-virtual translation         |
//! | [`MemoryAccess`]      | raw word/byte loads (the only unsafe boundary)  |
//! | [`SymbolResolver`]    | address -> file/line/function                   |
//! | [`KernelImage`]       | linker boundary symbols                         |
//!
//! [`Platform`] bundles all of them so commands can take a single
//! `&mut dyn Platform`. [`KernelPlatform`] is the hardware implementation.

use crate::memory::{PageTableEntry, PageTableRoot};
use crate::symbols::{SymbolError, SymbolInfo};
use alloc::string::String;

/// Console used for the monitor transcript
pub trait Console: core::fmt::Write {
    /// Print `prompt` and block until a full line is available.
    ///
    /// Returns `None` at end of input, which only hosted consoles report.
    fn read_line(&mut self, prompt: &str) -> Option<String>;
}

/// Register reads
pub trait Cpu {
    /// Physical address held in the page-table base register (CR3)
    fn page_table_base(&self) -> u64;

    /// Frame pointer a backtrace starts from
    ///
    /// `current` is RBP as read inside the backtrace command's own frame.
    /// Real hardware hands it back unchanged; a simulated machine substitutes
    /// the chain it laid out in its own memory.
    fn frame_pointer(&self, current: u64) -> u64;
}

/// Page-table lookup. Never allocates intermediate tables.
pub trait PageTables {
    /// Physical base of the kernel's own top-level table
    fn kernel_root(&self) -> u64;

    /// Entry slot mapping `va` under `root`, or `None` when no table covers it
    fn walk(&mut self, root: PageTableRoot, va: u64) -> Option<&mut PageTableEntry>;

    /// Drop any cached translation for `va` after its entry was rewritten
    fn flush(&mut self, va: u64);
}

/// Physical <-> kernel-virtual address translation
pub trait AddressTranslator {
    fn to_kernel_virtual(&self, pa: u64) -> u64;
    fn to_physical(&self, va: u64) -> u64;
}

/// Raw memory loads.
///
/// Every dereference of an arbitrary address (stack frames, dump ranges) goes
/// through this trait so the unsafe surface stays in one place.
pub trait MemoryAccess {
    /// Load the 64-bit word at `addr`.
    ///
    /// # Safety
    /// `addr` must be mapped and readable in the current address space.
    unsafe fn read_word(&self, addr: u64) -> u64;

    /// Load the byte at `addr`.
    ///
    /// # Safety
    /// `addr` must be mapped and readable in the current address space.
    unsafe fn read_byte(&self, addr: u64) -> u8;
}

/// Debug-symbol lookup
pub trait SymbolResolver {
    fn resolve(&self, addr: u64) -> Result<SymbolInfo<'_>, SymbolError>;
}

/// Linker-provided boundaries of the running kernel image (virtual addresses)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KernelLayout {
    /// `_start`, the image load address
    pub start: u64,
    /// `entry`, the first instruction executed after boot
    pub entry: u64,
    /// `etext`, end of code
    pub etext: u64,
    /// `edata`, end of initialized data
    pub edata: u64,
    /// `end`, end of the whole image including bss
    pub end: u64,
}

impl KernelLayout {
    /// Image size from `entry` to `end`, rounded up to whole KiB
    pub fn footprint_kib(&self) -> u64 {
        let size = self.end.saturating_sub(self.entry);
        size.div_ceil(1024)
    }
}

pub trait KernelImage {
    fn layout(&self) -> KernelLayout;
}

/// Everything a monitor command may touch
pub trait Platform:
    Console + Cpu + PageTables + AddressTranslator + MemoryAccess + SymbolResolver + KernelImage
{
}

impl<T> Platform for T where
    T: Console + Cpu + PageTables + AddressTranslator + MemoryAccess + SymbolResolver + KernelImage
{
}

#[cfg(target_arch = "x86_64")]
pub use hardware::KernelPlatform;

#[cfg(target_arch = "x86_64")]
mod hardware {
    use super::*;
    use crate::cpu::X86Cpu;
    use crate::memory::{DirectMemory, HardwarePageTables, PhysOffset};

    /// The monitor's view of a live x86_64 kernel
    ///
    /// Line input comes from the embedding kernel's console driver; symbols
    /// come from whatever table the kernel was built with.
    pub struct KernelPlatform<'s, C: Console> {
        console: C,
        cpu: X86Cpu,
        memory: DirectMemory,
        translator: PhysOffset,
        tables: HardwarePageTables,
        symbols: &'s dyn SymbolResolver,
        layout: KernelLayout,
    }

    impl<'s, C: Console> KernelPlatform<'s, C> {
        /// # Safety
        /// `translator` must describe the mappings that are actually live, and
        /// `kernel_root` must be the physical base of the kernel's PML4. The
        /// page-table walker dereferences tables through these.
        pub unsafe fn new(
            console: C,
            translator: PhysOffset,
            kernel_root: u64,
            symbols: &'s dyn SymbolResolver,
            layout: KernelLayout,
        ) -> Self {
            Self {
                console,
                cpu: X86Cpu,
                memory: DirectMemory,
                translator,
                tables: HardwarePageTables::new(translator, kernel_root),
                symbols,
                layout,
            }
        }

        pub fn into_console(self) -> C {
            self.console
        }
    }

    impl<C: Console> core::fmt::Write for KernelPlatform<'_, C> {
        fn write_str(&mut self, s: &str) -> core::fmt::Result {
            self.console.write_str(s)
        }
    }

    impl<C: Console> Console for KernelPlatform<'_, C> {
        fn read_line(&mut self, prompt: &str) -> Option<String> {
            self.console.read_line(prompt)
        }
    }

    impl<C: Console> Cpu for KernelPlatform<'_, C> {
        fn page_table_base(&self) -> u64 {
            self.cpu.page_table_base()
        }

        fn frame_pointer(&self, current: u64) -> u64 {
            self.cpu.frame_pointer(current)
        }
    }

    impl<C: Console> PageTables for KernelPlatform<'_, C> {
        fn kernel_root(&self) -> u64 {
            self.tables.kernel_root()
        }

        fn walk(&mut self, root: PageTableRoot, va: u64) -> Option<&mut PageTableEntry> {
            self.tables.walk(root, va)
        }

        fn flush(&mut self, va: u64) {
            self.tables.flush(va)
        }
    }

    impl<C: Console> AddressTranslator for KernelPlatform<'_, C> {
        fn to_kernel_virtual(&self, pa: u64) -> u64 {
            self.translator.to_kernel_virtual(pa)
        }

        fn to_physical(&self, va: u64) -> u64 {
            self.translator.to_physical(va)
        }
    }

    impl<C: Console> MemoryAccess for KernelPlatform<'_, C> {
        unsafe fn read_word(&self, addr: u64) -> u64 {
            self.memory.read_word(addr)
        }

        unsafe fn read_byte(&self, addr: u64) -> u8 {
            self.memory.read_byte(addr)
        }
    }

    impl<C: Console> SymbolResolver for KernelPlatform<'_, C> {
        fn resolve(&self, addr: u64) -> Result<SymbolInfo<'_>, SymbolError> {
            self.symbols.resolve(addr)
        }
    }

    impl<C: Console> KernelImage for KernelPlatform<'_, C> {
        fn layout(&self) -> KernelLayout {
            self.layout
        }
    }
}
