//! Memory layout constants, page-table entries and raw memory access
//!
//! Everything the monitor knows about x86_64 paging lives here:
//! - Layout constants (page size, PTE bit masks, linear-map bases)
//! - [`PageTableEntry`], the frame-address / permission split used by
//!   `showmappings` and `setperm`
//! - [`DirectMemory`], the only place a raw address is dereferenced
//! - [`PhysOffset`], physical <-> kernel-virtual translation
//! - [`HardwarePageTables`], a non-allocating 4-level table walker

use crate::platform::{AddressTranslator, MemoryAccess, PageTables};
use alloc::string::String;
use x86_64::structures::paging::PageTableFlags;
use x86_64::VirtAddr;

// Page table entry flags
pub const PTE_PRESENT: u64 = 1 << 0; // Present
pub const PTE_WRITABLE: u64 = 1 << 1; // Writable
pub const PTE_USER: u64 = 1 << 2; // User accessible
pub const PTE_PWT: u64 = 1 << 3; // Page Write Through
pub const PTE_PCD: u64 = 1 << 4; // Page Cache Disable
pub const PTE_ACCESSED: u64 = 1 << 5; // Accessed
pub const PTE_DIRTY: u64 = 1 << 6; // Dirty
pub const PTE_PS: u64 = 1 << 7; // Page Size (for PDE/PDPTE)
pub const PTE_GLOBAL: u64 = 1 << 8; // Global
pub const PTE_NO_EXEC: u64 = 1 << 63; // No Execute

/// Bits 12..=51 hold the physical frame address; everything else is
/// permission/status bits.
pub const PTE_ADDR_MASK: u64 = 0x000F_FFFF_FFFF_F000;

pub const PAGE_SIZE: u64 = 4096;
pub const PAGE_MASK: u64 = 0xFFF;

/// Size of one stack slot / machine word
pub const WORD_SIZE: u64 = 8;

/// Kernel image high-half base
pub const KERNEL_VIRTUAL_BASE: u64 = 0xFFFF_FFFF_8000_0000;

/// Base of the linear mapping of all physical memory
pub const PHYS_OFFSET: u64 = 0xFFFF_8000_0000_0000;

/// Frame address of a raw entry (`PTE_ADDR` in classic kernels)
pub const fn pte_addr(raw: u64) -> u64 {
    raw & PTE_ADDR_MASK
}

/// Page table entry
///
/// A single 64-bit entry storing a physical frame address and flag bits.
#[repr(transparent)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageTableEntry(u64);

impl PageTableEntry {
    pub const fn new(raw: u64) -> Self {
        Self(raw)
    }

    pub const fn from_parts(frame: u64, permissions: u64) -> Self {
        Self(frame & PTE_ADDR_MASK | permissions)
    }

    pub const fn raw(&self) -> u64 {
        self.0
    }

    pub const fn frame_address(&self) -> u64 {
        pte_addr(self.0)
    }

    /// Everything outside the frame-address field
    pub const fn permissions(&self) -> u64 {
        self.0 & !PTE_ADDR_MASK
    }

    pub const fn is_present(&self) -> bool {
        self.0 & PTE_PRESENT != 0
    }

    pub fn flags(&self) -> PageTableFlags {
        PageTableFlags::from_bits_truncate(self.0)
    }

    /// Keep the frame address and replace every other bit with `perm`.
    ///
    /// `perm` is not validated: bits that overlap the frame field are OR-ed in
    /// as given.
    pub fn set_permissions(&mut self, perm: u64) {
        self.0 = self.frame_address() | perm;
    }
}

/// Short names for the permission bits, lowest bit first
const FLAG_NAMES: &[(PageTableFlags, &str)] = &[
    (PageTableFlags::PRESENT, "P"),
    (PageTableFlags::WRITABLE, "W"),
    (PageTableFlags::USER_ACCESSIBLE, "U"),
    (PageTableFlags::WRITE_THROUGH, "PWT"),
    (PageTableFlags::NO_CACHE, "PCD"),
    (PageTableFlags::ACCESSED, "A"),
    (PageTableFlags::DIRTY, "D"),
    (PageTableFlags::HUGE_PAGE, "PS"),
    (PageTableFlags::GLOBAL, "G"),
    (PageTableFlags::NO_EXECUTE, "NX"),
];

/// Render the set permission bits as e.g. `P W U`, or `-` when none are set.
pub fn describe_flags(flags: PageTableFlags) -> String {
    let mut out = String::new();
    for (flag, name) in FLAG_NAMES {
        if flags.contains(*flag) {
            if !out.is_empty() {
                out.push(' ');
            }
            out.push_str(name);
        }
    }
    if out.is_empty() {
        out.push('-');
    }
    out
}

/// The active top-level table: its physical base and a directly addressable
/// kernel-virtual alias of it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageTableRoot {
    pub phys: u64,
    pub virt: u64,
}

/// Raw memory access through volatile loads.
///
/// Reads fault if the address is not mapped; that is the caller's problem.
#[derive(Debug, Clone, Copy, Default)]
pub struct DirectMemory;

impl MemoryAccess for DirectMemory {
    unsafe fn read_word(&self, addr: u64) -> u64 {
        core::ptr::read_volatile(addr as *const u64)
    }

    unsafe fn read_byte(&self, addr: u64) -> u8 {
        core::ptr::read_volatile(addr as *const u8)
    }
}

/// Physical <-> kernel-virtual translation through the linear mapping.
///
/// Addresses inside the kernel image window translate through the image's
/// own mapping; everything else through the physical-memory offset.
#[derive(Debug, Clone, Copy)]
pub struct PhysOffset {
    phys_offset: u64,
    /// (virtual base, physical base) of the kernel image mapping
    kernel_image: Option<(u64, u64)>,
}

impl PhysOffset {
    pub const fn new(phys_offset: u64) -> Self {
        Self {
            phys_offset,
            kernel_image: None,
        }
    }

    /// Also translate the high-half kernel image window.
    pub const fn with_kernel_image(mut self, virt_base: u64, phys_base: u64) -> Self {
        self.kernel_image = Some((virt_base, phys_base));
        self
    }
}

impl AddressTranslator for PhysOffset {
    fn to_kernel_virtual(&self, pa: u64) -> u64 {
        pa.wrapping_add(self.phys_offset)
    }

    fn to_physical(&self, va: u64) -> u64 {
        match self.kernel_image {
            Some((virt_base, phys_base)) if va >= virt_base => (va - virt_base).wrapping_add(phys_base),
            _ => va.wrapping_sub(self.phys_offset),
        }
    }
}

/// Walker over live x86_64 4-level page tables.
///
/// Lookups never allocate: a missing intermediate table means "absent". A
/// present 1 GiB or 2 MiB mapping returns the PDPT/PD entry itself. When the
/// intermediate tables exist, the leaf slot is returned even if its entry is
/// not present.
pub struct HardwarePageTables {
    translator: PhysOffset,
    kernel_root: u64,
}

impl HardwarePageTables {
    /// # Safety
    /// Every table reachable from any root later passed to [`PageTables::walk`]
    /// must be mapped at `translator.to_kernel_virtual(phys)` and must not be
    /// mutated concurrently.
    pub const unsafe fn new(translator: PhysOffset, kernel_root: u64) -> Self {
        Self {
            translator,
            kernel_root,
        }
    }
}

impl PageTables for HardwarePageTables {
    fn kernel_root(&self) -> u64 {
        self.kernel_root
    }

    fn walk(&mut self, root: PageTableRoot, va: u64) -> Option<&mut PageTableEntry> {
        let addr = VirtAddr::try_new(va).ok()?;
        let indices = [
            addr.p4_index(),
            addr.p3_index(),
            addr.p2_index(),
            addr.p1_index(),
        ];

        let mut table = root.virt as *mut PageTableEntry;
        for (level, index) in indices.iter().enumerate() {
            // SAFETY: `table` points at a live 512-entry table (constructor contract)
            // and every index is < 512.
            let slot = unsafe { table.add(usize::from(*index)) };
            if level == indices.len() - 1 {
                return Some(unsafe { &mut *slot });
            }

            let entry = unsafe { core::ptr::read_volatile(slot) };
            if !entry.is_present() {
                log_trace!("walk {:#x}: level {} entry not present", va, level);
                return None;
            }
            if level > 0 && entry.flags().contains(PageTableFlags::HUGE_PAGE) {
                return Some(unsafe { &mut *slot });
            }
            table = self.translator.to_kernel_virtual(entry.frame_address()) as *mut PageTableEntry;
        }
        None
    }

    #[cfg(target_os = "none")]
    fn flush(&mut self, va: u64) {
        x86_64::instructions::tlb::flush(VirtAddr::new_truncate(va));
    }

    // Hosted builds never run on live page tables, and invlpg is privileged.
    #[cfg(not(target_os = "none"))]
    fn flush(&mut self, _va: u64) {}
}
