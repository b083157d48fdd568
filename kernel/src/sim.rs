//! Simulated machine for hosted runs
//!
//! [`SimMachine`] implements every platform trait over plain data structures:
//! a sparse byte-addressed physical memory, a map of page-table entries keyed
//! by (root, page), fixed register values, a symbol table and a scripted
//! console. Tests and the `kmon-sim` tool build one, populate it, and hand it
//! to the monitor.
//!
//! Address model:
//! - `va >= KERNEL_VIRTUAL_BASE`: kernel image window, `pa = va - KERNEL_VIRTUAL_BASE`
//! - `va >= PHYS_OFFSET`: linear map, `pa = va - PHYS_OFFSET`
//! - anything lower: identity
//!
//! Unbacked bytes read as 0. Reads are counted so tests can assert that a
//! command touched no memory.

use crate::memory::{PageTableEntry, PageTableRoot, PhysOffset, KERNEL_VIRTUAL_BASE, PAGE_MASK, PHYS_OFFSET};
use crate::platform::{
    AddressTranslator, Console, Cpu, KernelImage, KernelLayout, MemoryAccess, PageTables, SymbolResolver,
};
use crate::symbols::{SymbolEntry, SymbolError, SymbolInfo, StaticSymbolTable};
use alloc::collections::{BTreeMap, VecDeque};
use alloc::string::String;
use alloc::vec::Vec;
use core::cell::Cell;
use core::fmt;

/// Physical load address of the simulated kernel image
pub const DEFAULT_IMAGE_PHYS_BASE: u64 = 0x10_0000;

/// Console fed from a queue of lines that records everything written to it
#[derive(Debug, Default)]
pub struct ScriptConsole {
    input: VecDeque<String>,
    output: String,
    echo: bool,
}

impl ScriptConsole {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue `lines` as future input, echoing each into the transcript when read
    pub fn with_lines<I, S>(lines: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            input: lines.into_iter().map(Into::into).collect(),
            output: String::new(),
            echo: true,
        }
    }

    pub fn output(&self) -> &str {
        &self.output
    }

    pub fn take_output(&mut self) -> String {
        core::mem::take(&mut self.output)
    }
}

impl fmt::Write for ScriptConsole {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        self.output.push_str(s);
        Ok(())
    }
}

impl Console for ScriptConsole {
    fn read_line(&mut self, prompt: &str) -> Option<String> {
        self.output.push_str(prompt);
        let line = self.input.pop_front()?;
        if self.echo {
            self.output.push_str(&line);
            self.output.push('\n');
        }
        Some(line)
    }
}

/// A whole machine in memory
pub struct SimMachine<C: Console = ScriptConsole> {
    console: C,
    memory: BTreeMap<u64, u8>,
    tables: BTreeMap<(u64, u64), PageTableEntry>,
    translator: PhysOffset,
    cr3: u64,
    kernel_root: u64,
    frame_pointer: u64,
    symbols: Vec<SymbolEntry>,
    layout: KernelLayout,
    flushed: Vec<u64>,
    reads: Cell<usize>,
}

impl SimMachine<ScriptConsole> {
    pub fn new() -> Self {
        Self::with_console(ScriptConsole::new())
    }
}

impl Default for SimMachine<ScriptConsole> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C: Console> SimMachine<C> {
    /// Empty machine: no memory, no mappings, CR3 pointing at the kernel
    /// table, frame pointer 0 and a small kernel image at
    /// [`DEFAULT_IMAGE_PHYS_BASE`].
    pub fn with_console(console: C) -> Self {
        let image = KERNEL_VIRTUAL_BASE + DEFAULT_IMAGE_PHYS_BASE;
        let kernel_root = 0x1000;
        Self {
            console,
            memory: BTreeMap::new(),
            tables: BTreeMap::new(),
            translator: PhysOffset::new(PHYS_OFFSET).with_kernel_image(KERNEL_VIRTUAL_BASE, 0),
            cr3: kernel_root,
            kernel_root,
            frame_pointer: 0,
            symbols: Vec::new(),
            layout: KernelLayout {
                start: image,
                entry: image + 0x0c,
                etext: image + 0x1_8000,
                edata: image + 0x2_0000,
                end: image + 0x2_4000,
            },
            flushed: Vec::new(),
            reads: Cell::new(0),
        }
    }

    pub fn console(&self) -> &C {
        &self.console
    }

    pub fn console_mut(&mut self) -> &mut C {
        &mut self.console
    }

    pub fn into_console(self) -> C {
        self.console
    }

    pub fn set_layout(&mut self, layout: KernelLayout) {
        self.layout = layout;
    }

    /// Switch the active table (CR3) without changing the kernel's root
    pub fn set_cr3(&mut self, cr3: u64) {
        self.cr3 = cr3;
    }

    pub fn set_frame_pointer(&mut self, fp: u64) {
        self.frame_pointer = fp;
    }

    /// Physical address backing `va`
    pub fn phys_of(&self, va: u64) -> u64 {
        if va >= PHYS_OFFSET {
            self.translator.to_physical(va)
        } else {
            va
        }
    }

    pub fn write_bytes(&mut self, va: u64, bytes: &[u8]) {
        let pa = self.phys_of(va);
        for (i, byte) in bytes.iter().enumerate() {
            self.memory.insert(pa.wrapping_add(i as u64), *byte);
        }
    }

    pub fn write_word(&mut self, va: u64, word: u64) {
        self.write_bytes(va, &word.to_le_bytes());
    }

    /// Install a leaf entry for the page containing `va` under `root`
    pub fn map_page(&mut self, root: u64, va: u64, entry: PageTableEntry) {
        self.tables.insert((root, va & !PAGE_MASK), entry);
    }

    /// Entry currently installed for the page containing `va`, if any
    pub fn entry(&self, root: u64, va: u64) -> Option<PageTableEntry> {
        self.tables.get(&(root, va & !PAGE_MASK)).copied()
    }

    /// Add a function to the symbol table, keeping it sorted by start
    pub fn add_symbol(&mut self, entry: SymbolEntry) {
        let idx = self.symbols.partition_point(|e| e.start <= entry.start);
        self.symbols.insert(idx, entry);
    }

    /// Write a frame at `fp`: saved caller fp, return address and five args
    pub fn push_frame(&mut self, fp: u64, caller_fp: u64, return_address: u64, args: [u64; 5]) {
        self.write_word(fp, caller_fp);
        self.write_word(fp + 8, return_address);
        for (i, arg) in args.iter().enumerate() {
            self.write_word(fp + 16 + 8 * i as u64, *arg);
        }
    }

    /// Pages passed to [`PageTables::flush`] so far
    pub fn flushed(&self) -> &[u64] {
        &self.flushed
    }

    /// Number of [`MemoryAccess`] calls so far
    pub fn reads(&self) -> usize {
        self.reads.get()
    }

    fn load(&self, addr: u64) -> u8 {
        self.memory.get(&self.phys_of(addr)).copied().unwrap_or(0)
    }
}

impl<C: Console> fmt::Write for SimMachine<C> {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        self.console.write_str(s)
    }
}

impl<C: Console> Console for SimMachine<C> {
    fn read_line(&mut self, prompt: &str) -> Option<String> {
        self.console.read_line(prompt)
    }
}

impl<C: Console> Cpu for SimMachine<C> {
    fn page_table_base(&self) -> u64 {
        self.cr3
    }

    fn frame_pointer(&self, _current: u64) -> u64 {
        self.frame_pointer
    }
}

impl<C: Console> PageTables for SimMachine<C> {
    fn kernel_root(&self) -> u64 {
        self.kernel_root
    }

    fn walk(&mut self, root: PageTableRoot, va: u64) -> Option<&mut PageTableEntry> {
        self.tables.get_mut(&(root.phys, va & !PAGE_MASK))
    }

    fn flush(&mut self, va: u64) {
        self.flushed.push(va & !PAGE_MASK);
    }
}

impl<C: Console> AddressTranslator for SimMachine<C> {
    fn to_kernel_virtual(&self, pa: u64) -> u64 {
        self.translator.to_kernel_virtual(pa)
    }

    fn to_physical(&self, va: u64) -> u64 {
        self.translator.to_physical(va)
    }
}

impl<C: Console> MemoryAccess for SimMachine<C> {
    unsafe fn read_word(&self, addr: u64) -> u64 {
        self.reads.set(self.reads.get() + 1);
        let mut bytes = [0u8; 8];
        for (i, byte) in bytes.iter_mut().enumerate() {
            *byte = self.load(addr.wrapping_add(i as u64));
        }
        u64::from_le_bytes(bytes)
    }

    unsafe fn read_byte(&self, addr: u64) -> u8 {
        self.reads.set(self.reads.get() + 1);
        self.load(addr)
    }
}

impl<C: Console> SymbolResolver for SimMachine<C> {
    fn resolve(&self, addr: u64) -> Result<SymbolInfo<'_>, SymbolError> {
        StaticSymbolTable::new(&self.symbols).lookup(addr)
    }
}

impl<C: Console> KernelImage for SimMachine<C> {
    fn layout(&self) -> KernelLayout {
        self.layout
    }
}
