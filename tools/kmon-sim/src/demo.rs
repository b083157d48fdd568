//! A small but complete machine to poke at
//!
//! - kernel image at `KERNEL_VIRTUAL_BASE + 1 MiB`, text pages read-only,
//!   data pages writable and non-executable
//! - four pages of the linear map at physical 2 MiB, holding a marker string
//! - a kernel stack with a three-frame call chain
//!   (`breakpoint_handler` <- `trap_dispatch` <- `kernel_main`)

use kmon_kernel::memory::{
    PageTableEntry, KERNEL_VIRTUAL_BASE, PAGE_SIZE, PHYS_OFFSET, PTE_GLOBAL, PTE_NO_EXEC, PTE_PRESENT,
    PTE_WRITABLE,
};
use kmon_kernel::platform::{AddressTranslator, Console, KernelImage, PageTables};
use kmon_kernel::sim::SimMachine;
use kmon_kernel::symbols::SymbolEntry;

/// Physical base of the linear-map sample region
pub const DATA_PHYS: u64 = 0x20_0000;
/// Pages mapped at [`DATA_PHYS`]
pub const DATA_PAGES: u64 = 4;
/// Bytes stored at the start of the sample region
pub const MARKER: &[u8] = b"kmon demo memory";

/// Innermost frame pointer
pub const STACK_FP: u64 = PHYS_OFFSET + 0x30_7f00;

const TEXT: u64 = KERNEL_VIRTUAL_BASE + 0x10_0000;

pub const SYMBOLS: &[SymbolEntry] = &[
    SymbolEntry::new(TEXT + 0x1000, TEXT + 0x1400, "kernel_main", "kernel/src/main.rs", 40),
    SymbolEntry::new(TEXT + 0x2000, TEXT + 0x2300, "trap_dispatch:F(0,3)", "kernel/src/trap.rs", 112),
    SymbolEntry::new(TEXT + 0x2400, TEXT + 0x2500, "breakpoint_handler", "kernel/src/trap.rs", 88),
];

/// (saved caller fp, return address, args) from innermost to outermost
const FRAMES: [(u64, u64, [u64; 5]); 3] = [
    (STACK_FP + 0x40, TEXT + 0x2432, [3, 0, STACK_FP + 0x80, 0, 0]),
    (STACK_FP + 0x80, TEXT + 0x2105, [0xe, 0x1000, 0, 0, 0]),
    (0, TEXT + 0x1234, [0; 5]),
];

pub fn machine<C: Console>(console: C) -> SimMachine<C> {
    let mut sim = SimMachine::with_console(console);
    let root = sim.kernel_root();

    // Kernel image, page by page
    let layout = sim.layout();
    let mut va = layout.start;
    while va < layout.end {
        let pa = sim.to_physical(va);
        let perm = if va < layout.etext {
            PTE_PRESENT | PTE_GLOBAL
        } else {
            PTE_PRESENT | PTE_WRITABLE | PTE_NO_EXEC | PTE_GLOBAL
        };
        sim.map_page(root, va, PageTableEntry::from_parts(pa, perm));
        va += PAGE_SIZE;
    }

    for page in 0..DATA_PAGES {
        let pa = DATA_PHYS + page * PAGE_SIZE;
        sim.map_page(
            root,
            PHYS_OFFSET + pa,
            PageTableEntry::from_parts(pa, PTE_PRESENT | PTE_WRITABLE | PTE_NO_EXEC),
        );
    }
    sim.write_bytes(PHYS_OFFSET + DATA_PHYS, MARKER);

    for symbol in SYMBOLS {
        sim.add_symbol(*symbol);
    }
    let mut fp = STACK_FP;
    for (caller, ret, args) in FRAMES {
        sim.push_frame(fp, caller, ret, args);
        fp = caller;
    }
    sim.set_frame_pointer(STACK_FP);

    sim
}
