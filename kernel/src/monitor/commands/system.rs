//! System inspection commands
//!
//! - `help`: List the registry
//! - `kerninfo`: Linker boundary symbols and image footprint
//! - `backtrace`: Walk the frame-pointer chain

use super::{CommandContext, CommandHandler};
use crate::config::MAX_BACKTRACE_DEPTH;
use crate::cpu;
use crate::monitor::CommandStatus;
use crate::stack::FrameWalker;
use alloc::format;
use alloc::string::String;
use core::fmt::Write;

pub struct Help;

impl CommandHandler for Help {
    fn execute(&self, _args: &[&str], ctx: &mut CommandContext<'_>) -> CommandStatus {
        for cmd in ctx.registry {
            ctx.writeln(&format!("{} - {}", cmd.name, cmd.description));
        }
        CommandStatus::Success
    }
}

/// Display the kernel's linker symbols
///
/// `_start` is reported as the physical load address; the other symbols
/// are shown at their link (virtual) address and translated.
///
/// # Examples
/// ```text
/// K> kerninfo
/// Special kernel symbols:
///   _start                  0000000000100000 (phys)
///   entry  ffffffff8010000c (virt)  000000000010000c (phys)
///   ...
/// Kernel executable memory footprint: 144KB
/// ```
pub struct KernInfo;

impl CommandHandler for KernInfo {
    fn execute(&self, _args: &[&str], ctx: &mut CommandContext<'_>) -> CommandStatus {
        let layout = ctx.platform.layout();
        let start = ctx.platform.to_physical(layout.start);

        ctx.writeln("Special kernel symbols:");
        ctx.writeln(&format!("  _start                  {:016x} (phys)", start));
        for (name, va) in [
            ("entry", layout.entry),
            ("etext", layout.etext),
            ("edata", layout.edata),
            ("end", layout.end),
        ] {
            let pa = ctx.platform.to_physical(va);
            ctx.writeln(&format!("  {:<6} {:016x} (virt)  {:016x} (phys)", name, va, pa));
        }
        ctx.writeln(&format!(
            "Kernel executable memory footprint: {}KB",
            layout.footprint_kib()
        ));
        CommandStatus::Success
    }
}

/// Display a stack backtrace
///
/// One line per frame with the frame pointer, return address and the five
/// words above it, then the resolved source location. The walk ends at a
/// zero frame pointer, after [`MAX_BACKTRACE_DEPTH`] frames, or at the first
/// return address no symbol covers (which fails the command).
pub struct Backtrace;

impl CommandHandler for Backtrace {
    fn execute(&self, _args: &[&str], ctx: &mut CommandContext<'_>) -> CommandStatus {
        // Read here, not behind the platform vtable: a callee's RBP is gone
        // by the time it returns.
        let rbp = cpu::read_frame_pointer();
        let mut walker = FrameWalker::new(ctx.platform.frame_pointer(rbp));
        ctx.writeln("Stack backtrace:");

        loop {
            if walker.depth() == MAX_BACKTRACE_DEPTH && walker.frame_pointer() != 0 {
                log_warn!(
                    "backtrace truncated after {} frames at rbp {:#x}",
                    MAX_BACKTRACE_DEPTH,
                    walker.frame_pointer()
                );
                ctx.writeln("  ... (truncated)");
                return CommandStatus::Success;
            }

            // SAFETY: the kernel is built with frame pointers and its entry
            // code terminates the chain with 0 (see `crate::stack`).
            let Some(frame) = (unsafe { walker.next_frame(&*ctx.platform) }) else {
                return CommandStatus::Success;
            };

            let mut line = format!(
                "  rbp {:016x}  rip {:016x}  args",
                frame.frame_pointer, frame.return_address
            );
            for arg in frame.args {
                let _ = write!(line, " {:016x}", arg);
            }
            ctx.writeln(&line);

            let location: String = match ctx.platform.resolve(frame.return_address) {
                Ok(info) => format!(
                    "         {}:{}: {}+{}",
                    info.file,
                    info.line,
                    info.display_name(),
                    frame.return_address.wrapping_sub(info.fn_addr)
                ),
                Err(err) => {
                    log_warn!("backtrace stopped: {}", err);
                    return CommandStatus::Failed(err.code());
                }
            };
            ctx.writeln(&location);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::monitor::commands::{run_line, COMMANDS};
    use crate::platform::KernelLayout;
    use crate::sim::SimMachine;
    use crate::symbols::SymbolEntry;

    #[test]
    fn help_lists_registry_in_order() {
        let mut sim = SimMachine::new();
        let (status, out) = run_line(&mut sim, "help");
        assert_eq!(status, CommandStatus::Success);
        let names: alloc::vec::Vec<&str> = out
            .lines()
            .map(|l| l.split(" - ").next().unwrap_or(""))
            .collect();
        let expected: alloc::vec::Vec<&str> = COMMANDS.iter().map(|c| c.name).collect();
        assert_eq!(names, expected);
        assert!(out.starts_with("help - Display this list of commands\n"));
    }

    #[test]
    fn kerninfo_reports_symbols_and_rounded_footprint() {
        let mut sim = SimMachine::new();
        let (status, out) = run_line(&mut sim, "kerninfo");
        assert_eq!(status, CommandStatus::Success);
        let expected = "\
Special kernel symbols:
  _start                  0000000000100000 (phys)
  entry  ffffffff8010000c (virt)  000000000010000c (phys)
  etext  ffffffff80118000 (virt)  0000000000118000 (phys)
  edata  ffffffff80120000 (virt)  0000000000120000 (phys)
  end    ffffffff80124000 (virt)  0000000000124000 (phys)
Kernel executable memory footprint: 144KB
";
        assert_eq!(out, expected);
    }

    #[test]
    fn kerninfo_exact_kib_is_not_rounded() {
        let mut sim = SimMachine::new();
        let base = 0xffff_ffff_8010_0000;
        sim.set_layout(KernelLayout {
            start: base,
            entry: base,
            etext: base + 0x400,
            edata: base + 0x800,
            end: base + 0x800,
        });
        let (_, out) = run_line(&mut sim, "kerninfo");
        assert!(out.ends_with("Kernel executable memory footprint: 2KB\n"), "{}", out);
    }

    #[test]
    fn backtrace_on_terminal_chain_prints_only_header() {
        let mut sim = SimMachine::new();
        sim.set_frame_pointer(0);
        let (status, out) = run_line(&mut sim, "backtrace");
        assert_eq!(status, CommandStatus::Success);
        assert_eq!(out, "Stack backtrace:\n");
        assert_eq!(sim.reads(), 0);
    }

    #[test]
    fn backtrace_walks_and_resolves_every_frame() {
        let mut sim = SimMachine::new();
        sim.add_symbol(SymbolEntry::new(0x1000, 0x1100, "mon_backtrace:F(0,1)", "kern/monitor.rs", 42));
        sim.add_symbol(SymbolEntry::new(0x2000, 0x2200, "i386_init", "kern/init.rs", 24));
        sim.push_frame(0x7000, 0x7100, 0x1010, [1, 2, 3, 4, 5]);
        sim.push_frame(0x7100, 0, 0x2042, [0; 5]);
        sim.set_frame_pointer(0x7000);

        let (status, out) = run_line(&mut sim, "backtrace");
        assert_eq!(status, CommandStatus::Success);
        let expected = "\
Stack backtrace:
  rbp 0000000000007000  rip 0000000000001010  args 0000000000000001 0000000000000002 0000000000000003 0000000000000004 0000000000000005
         kern/monitor.rs:42: mon_backtrace+16
  rbp 0000000000007100  rip 0000000000002042  args 0000000000000000 0000000000000000 0000000000000000 0000000000000000 0000000000000000
         kern/init.rs:24: i386_init+66
";
        assert_eq!(out, expected);
    }

    #[test]
    fn backtrace_stops_at_first_unresolved_address() {
        let mut sim = SimMachine::new();
        sim.add_symbol(SymbolEntry::new(0x1000, 0x1100, "inner", "a.rs", 1));
        sim.push_frame(0x7000, 0x7100, 0x1004, [0; 5]);
        sim.push_frame(0x7100, 0x7200, 0x9999, [0; 5]);
        sim.push_frame(0x7200, 0, 0x1008, [0; 5]);
        sim.set_frame_pointer(0x7000);

        let (status, out) = run_line(&mut sim, "backtrace");
        assert_eq!(status, CommandStatus::Failed(-1));
        assert_eq!(out.lines().count(), 4);
        assert!(out.lines().last().is_some_and(|l| l.contains("rip 0000000000009999")));
        assert!(!out.contains("0000000000007200  rip"));
    }

    /// Runs `backtrace` one call below a frame whose RSP/RBP are known.
    ///
    /// Returns `None` when this build keeps no frame pointers, since the walk
    /// would then start from whatever RBP happens to hold.
    #[cfg(target_arch = "x86_64")]
    #[inline(never)]
    fn backtrace_below_known_frame(ctx: &mut CommandContext<'_>) -> Option<(u64, u64, CommandStatus)> {
        let (rsp, rbp): (u64, u64);
        // SAFETY: reads two registers, touches no memory
        unsafe {
            core::arch::asm!(
                "mov {}, rsp",
                "mov {}, rbp",
                out(reg) rsp,
                out(reg) rbp,
                options(nomem, nostack, preserves_flags)
            );
        }
        if rbp < rsp || rbp - rsp > 0x1_0000 {
            return None;
        }
        let status = Backtrace.execute(&["backtrace"], ctx);
        Some((rsp, rbp, status))
    }

    #[cfg(target_arch = "x86_64")]
    #[test]
    fn hardware_backtrace_starts_in_the_live_command_frame() {
        use crate::memory::PhysOffset;
        use crate::platform::{Cpu, KernelPlatform, Platform};
        use crate::sim::ScriptConsole;
        use crate::symbols::StaticSymbolTable;

        let table = StaticSymbolTable::new(&[]);
        let layout = KernelLayout {
            start: 0,
            entry: 0,
            etext: 0,
            edata: 0,
            end: 0,
        };
        // SAFETY: the walker is never asked for a page table here
        let mut platform =
            unsafe { KernelPlatform::new(ScriptConsole::new(), PhysOffset::new(0), 0, &table, layout) };

        // The hardware seam keeps whatever RBP the command read
        let dynamic: &dyn Platform = &platform;
        assert_eq!(dynamic.frame_pointer(0x1234_5678), 0x1234_5678);

        let mut ctx = CommandContext {
            platform: &mut platform,
            trap: None,
            registry: COMMANDS,
        };
        let Some((rsp, rbp, status)) = backtrace_below_known_frame(&mut ctx) else {
            return;
        };
        // Nothing resolves against an empty table, so exactly one frame prints
        assert!(matches!(status, CommandStatus::Failed(_)));

        let out = platform.into_console().take_output();
        let first = out.lines().nth(1).unwrap_or_default();
        assert!(first.starts_with("  rbp "), "{}", out);
        let walked = u64::from_str_radix(&first[6..22], 16).unwrap();

        // The command's own frame sits right below the caller's stack pointer
        // (return address, then saved RBP). A frame from a callee that already
        // returned would lie deeper still.
        assert!(walked >= rsp - 16 && walked <= rbp, "walked {:#x}, caller rsp {:#x} rbp {:#x}", walked, rsp, rbp);
    }

    #[test]
    fn backtrace_caps_cyclic_chain() {
        let mut sim = SimMachine::new();
        sim.add_symbol(SymbolEntry::new(0x1000, 0x1100, "spin", "a.rs", 1));
        sim.push_frame(0x7000, 0x7000, 0x1000, [0; 5]);
        sim.set_frame_pointer(0x7000);

        let (status, out) = run_line(&mut sim, "backtrace");
        assert_eq!(status, CommandStatus::Success);
        assert_eq!(out.matches("  rbp ").count(), MAX_BACKTRACE_DEPTH);
        assert!(out.ends_with("  ... (truncated)\n"));
    }
}
