//! Page-table inspection commands
//!
//! - `showmappings`: Display the entry mapping each page of a range
//! - `setperm`: Replace the permission bits of one entry

use super::{address_range, CommandContext, CommandHandler};
use crate::memory::{describe_flags, pte_addr, PageTableEntry, PageTableRoot, PAGE_SIZE};
use crate::monitor::CommandStatus;
use alloc::format;
use alloc::string::String;

/// Locate the active top-level table.
///
/// CR3 is masked down to the frame address (dropping PCID and cache bits)
/// and translated to the kernel-virtual alias the walker can dereference.
/// With `print`, reports whether it is the kernel's own table.
pub fn current_table(ctx: &mut CommandContext<'_>, print: bool) -> PageTableRoot {
    let phys = pte_addr(ctx.platform.page_table_base());
    let root = PageTableRoot {
        phys,
        virt: ctx.platform.to_kernel_virtual(phys),
    };

    if print {
        let hint = if phys == ctx.platform.kernel_root() {
            "kernel"
        } else {
            "unknown"
        };
        ctx.writeln(&format!("Current page table: {:#018x} ({})", phys, hint));
    }
    root
}

/// One entry as `va ..: pte .., pa .. [flags]`
///
/// `pa` is the 4 KiB frame field. For a large-page entry (PS) that field also
/// carries the PAT bit and the reserved low bits, so it is the raw field, not
/// the page base.
fn describe_entry(va: u64, entry: &PageTableEntry) -> String {
    format!(
        "va {:#018x}: pte {:#018x}, pa {:#018x} [{}]",
        va,
        entry.raw(),
        entry.frame_address(),
        describe_flags(entry.flags())
    )
}

const SHOWMAPPINGS_USAGE: &str = "showmappings START END";

/// Display page mappings
///
/// A page is "not mapped" only when no table covers it. An entry that exists
/// with the present bit clear is still shown, so a page made non-present by
/// `setperm` can be inspected and restored.
///
/// # Examples
/// ```text
/// showmappings 0xffff800000100000 0xffff800000102000
/// ```
pub struct ShowMappings;

impl CommandHandler for ShowMappings {
    fn execute(&self, args: &[&str], ctx: &mut CommandContext<'_>) -> CommandStatus {
        let root = current_table(ctx, true);

        let [_, start, end] = args else {
            return CommandStatus::ArgumentError(String::from(SHOWMAPPINGS_USAGE));
        };
        let start = match ctx.hex_arg(start, SHOWMAPPINGS_USAGE) {
            Ok(v) => v,
            Err(status) => return status,
        };
        let end = match ctx.hex_arg(end, SHOWMAPPINGS_USAGE) {
            Ok(v) => v,
            Err(status) => return status,
        };

        for va in address_range(start, end, PAGE_SIZE) {
            let line = match ctx.platform.walk(root, va) {
                Some(entry) => describe_entry(va, entry),
                None => format!("va {:#018x}: not mapped", va),
            };
            log_trace!("{}", line);
            ctx.writeln(&format!("    {}", line));
        }
        CommandStatus::Success
    }
}

const SETPERM_USAGE: &str = "setperm VA PERM";

/// Set the permission bits of the page containing `VA`
///
/// The frame address is kept; every other bit of the entry becomes `PERM`,
/// so `PERM` must include the present bit to keep the page mapped. A
/// non-present entry is rewritten all the same. Bits of `PERM` inside the
/// frame-address field are not rejected.
///
/// # Examples
/// ```text
/// setperm 0xffff800000100000 0x3     # present + writable
/// ```
pub struct SetPerm;

impl CommandHandler for SetPerm {
    fn execute(&self, args: &[&str], ctx: &mut CommandContext<'_>) -> CommandStatus {
        let root = current_table(ctx, true);

        let [_, va, perm] = args else {
            return CommandStatus::ArgumentError(String::from(SETPERM_USAGE));
        };
        let va = match ctx.hex_arg(va, SETPERM_USAGE) {
            Ok(v) => v,
            Err(status) => return status,
        };
        let perm = match ctx.hex_arg(perm, SETPERM_USAGE) {
            Ok(v) => v,
            Err(status) => return status,
        };

        let change = ctx
            .platform
            .walk(root, va)
            .map(|entry| {
                let before = *entry;
                entry.set_permissions(perm);
                (before, *entry)
            });

        match change {
            None => ctx.writeln(&format!("    va {:#018x}: not mapped", va)),
            Some((before, after)) => {
                ctx.platform.flush(va);
                log_info!(
                    "setperm {:#x}: pte {:#x} -> {:#x}",
                    va,
                    before.raw(),
                    after.raw()
                );
                ctx.writeln(&format!("    before set: {}", describe_entry(va, &before)));
                ctx.writeln(&format!("    after  set: {}", describe_entry(va, &after)));
            }
        }
        CommandStatus::Success
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::{PTE_ACCESSED, PTE_NO_EXEC, PTE_PRESENT, PTE_PS, PTE_USER, PTE_WRITABLE};
    use crate::monitor::commands::run_line;
    use crate::platform::PageTables;
    use crate::sim::SimMachine;

    const VA: u64 = 0xffff_8000_0040_0000;

    fn mapped_sim() -> SimMachine {
        let mut sim = SimMachine::new();
        let root = sim.kernel_root();
        sim.map_page(root, VA, PageTableEntry::from_parts(0x0012_3000, PTE_PRESENT | PTE_WRITABLE | PTE_ACCESSED));
        sim.map_page(root, VA + 2 * PAGE_SIZE, PageTableEntry::new(0x0045_6000));
        sim
    }

    #[test]
    fn header_names_kernel_or_unknown_table() {
        let mut sim = SimMachine::new();
        let (_, out) = run_line(&mut sim, "showmappings");
        assert_eq!(out, "Current page table: 0x0000000000001000 (kernel)\n");

        // PCID bits in CR3 are ignored
        sim.set_cr3(0x9000 | 0x18);
        let (_, out) = run_line(&mut sim, "showmappings");
        assert_eq!(out, "Current page table: 0x0000000000009000 (unknown)\n");
    }

    #[test]
    fn showmappings_reports_each_page() {
        let mut sim = mapped_sim();
        let (status, out) = run_line(&mut sim, "showmappings 0xffff800000400000 0xffff800000402fff");
        assert_eq!(status, CommandStatus::Success);
        let expected = "\
Current page table: 0x0000000000001000 (kernel)
    va 0xffff800000400000: pte 0x0000000000123023, pa 0x0000000000123000 [P W A]
    va 0xffff800000401000: not mapped
    va 0xffff800000402000: pte 0x0000000000456000, pa 0x0000000000456000 [-]
";
        assert_eq!(out, expected);
    }

    #[test]
    fn showmappings_unmapped_address_changes_nothing() {
        let mut sim = mapped_sim();
        let before = sim.entry(sim.kernel_root(), VA);
        let (status, out) = run_line(&mut sim, "showmappings 0x1000 0x1000");
        assert_eq!(status, CommandStatus::Success);
        assert!(out.ends_with("    va 0x0000000000001000: not mapped\n"));
        assert_eq!(sim.entry(sim.kernel_root(), VA), before);
        assert!(sim.flushed().is_empty());
    }

    #[test]
    fn showmappings_rejects_bad_arguments() {
        let mut sim = mapped_sim();
        let (status, _) = run_line(&mut sim, "showmappings 0x1000");
        assert_eq!(status, CommandStatus::ArgumentError(String::from(SHOWMAPPINGS_USAGE)));

        let (status, out) = run_line(&mut sim, "showmappings 0x1000 zz");
        assert!(matches!(status, CommandStatus::ArgumentError(_)));
        assert!(out.contains("invalid hex number: 'zz'"));
        assert!(!out.contains("    va "));
    }

    #[test]
    fn setperm_keeps_frame_and_replaces_permissions() {
        let mut sim = mapped_sim();
        let perm = PTE_PRESENT | PTE_USER | PTE_NO_EXEC;
        let (status, out) = run_line(&mut sim, "setperm 0xffff800000400123 0x8000000000000005");
        assert_eq!(status, CommandStatus::Success);
        assert!(out.contains("    before set: va 0xffff800000400123: pte 0x0000000000123023"));
        assert!(out.contains("    after  set: va 0xffff800000400123: pte 0x8000000000123005, pa 0x0000000000123000 [P U NX]"));

        let entry = sim.entry(sim.kernel_root(), VA).expect("still installed");
        assert_eq!(entry.frame_address(), 0x0012_3000);
        assert_eq!(entry.permissions(), perm);
        assert_eq!(sim.flushed(), [VA]);

        // A follow-up showmappings sees the new bits on the same frame
        let (_, out) = run_line(&mut sim, "showmappings 0xffff800000400000 0xffff800000400000");
        assert!(out.contains("pte 0x8000000000123005, pa 0x0000000000123000 [P U NX]"));
    }

    #[test]
    fn setperm_on_unmapped_page_is_informational() {
        let mut sim = mapped_sim();
        let (status, out) = run_line(&mut sim, "setperm 0xffff800000401000 0x3");
        assert_eq!(status, CommandStatus::Success);
        assert!(out.ends_with("    va 0xffff800000401000: not mapped\n"));
        assert_eq!(sim.entry(sim.kernel_root(), VA + PAGE_SIZE), None);
        assert!(sim.flushed().is_empty());
    }

    #[test]
    fn setperm_can_restore_a_page_it_made_non_present() {
        let mut sim = SimMachine::new();
        let va = 0x40_0000;
        sim.map_page(sim.kernel_root(), va, PageTableEntry::from_parts(0x5000, PTE_PRESENT));

        let (_, out) = run_line(&mut sim, "setperm 0x400000 0x0");
        assert!(out.contains("    after  set: va 0x0000000000400000: pte 0x0000000000005000, pa 0x0000000000005000 [-]"));
        let (_, out) = run_line(&mut sim, "showmappings 0x400000 0x400000");
        assert!(out.ends_with("    va 0x0000000000400000: pte 0x0000000000005000, pa 0x0000000000005000 [-]\n"));

        let (status, out) = run_line(&mut sim, "setperm 0x400000 0x1");
        assert_eq!(status, CommandStatus::Success);
        assert!(!out.contains("not mapped"), "{}", out);
        assert!(out.contains("    before set: va 0x0000000000400000: pte 0x0000000000005000"));
        assert_eq!(sim.entry(sim.kernel_root(), va), Some(PageTableEntry::new(0x5001)));
        assert_eq!(sim.flushed(), [va, va]);
    }

    #[test]
    fn large_page_entry_shows_the_raw_frame_field() {
        let mut sim = SimMachine::new();
        let va = 0x4000_0000;
        // 2 MiB page at 0x4060_0000 with PAT (bit 12) set
        sim.map_page(sim.kernel_root(), va, PageTableEntry::new(0x4060_1000 | PTE_PRESENT | PTE_PS));
        let (_, out) = run_line(&mut sim, "showmappings 0x40000000 0x40000000");
        assert!(out.ends_with("    va 0x0000000040000000: pte 0x0000000040601081, pa 0x0000000040601000 [P PS]\n"), "{}", out);
    }

    #[test]
    fn setperm_needs_two_hex_arguments() {
        let mut sim = mapped_sim();
        for line in ["setperm", "setperm 0xffff800000400000", "setperm 0xffff800000400000 3 4"] {
            let (status, _) = run_line(&mut sim, line);
            assert_eq!(status, CommandStatus::ArgumentError(String::from(SETPERM_USAGE)), "{}", line);
        }
        let (status, _) = run_line(&mut sim, "setperm 0xffff800000400000 0xq");
        assert!(matches!(status, CommandStatus::ArgumentError(_)));
        assert_eq!(
            sim.entry(sim.kernel_root(), VA).map(|e| e.permissions()),
            Some(PTE_PRESENT | PTE_WRITABLE | PTE_ACCESSED)
        );
    }
}
