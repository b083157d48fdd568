//! Memory dump command
//!
//! `dump va|pa START END` prints four bytes per line for every 4-byte step
//! in `START..=END`. Physical addresses are read through the kernel's
//! linear mapping. Nothing checks that the range is mapped.

use super::tables::current_table;
use super::{address_range, CommandContext, CommandHandler};
use crate::monitor::CommandStatus;
use alloc::format;
use alloc::string::String;
use core::fmt;

const USAGE: &str = "dump va|pa START END";

/// Bytes shown per line
const DUMP_STRIDE: u64 = 4;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum AddressKind {
    Virtual,
    Physical,
}

impl AddressKind {
    fn parse(s: &str) -> Option<Self> {
        match s {
            "va" => Some(AddressKind::Virtual),
            "pa" => Some(AddressKind::Physical),
            _ => None,
        }
    }
}

impl fmt::Display for AddressKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            AddressKind::Virtual => "va",
            AddressKind::Physical => "pa",
        })
    }
}

pub struct Dump;

impl CommandHandler for Dump {
    fn execute(&self, args: &[&str], ctx: &mut CommandContext<'_>) -> CommandStatus {
        current_table(ctx, true);

        let [_, kind, start, end] = args else {
            return CommandStatus::ArgumentError(String::from(USAGE));
        };
        let Some(kind) = AddressKind::parse(kind) else {
            ctx.writeln(&format!("Unknown address kind '{}'", kind));
            return CommandStatus::ArgumentError(String::from(USAGE));
        };
        let start = match ctx.hex_arg(start, USAGE) {
            Ok(v) => v,
            Err(status) => return status,
        };
        let end = match ctx.hex_arg(end, USAGE) {
            Ok(v) => v,
            Err(status) => return status,
        };
        log_debug!("dump {} {:#x}..={:#x}", kind, start, end);

        for addr in address_range(start, end, DUMP_STRIDE) {
            let base = match kind {
                AddressKind::Virtual => addr,
                AddressKind::Physical => ctx.platform.to_kernel_virtual(addr),
            };

            let mut bytes = [0u8; DUMP_STRIDE as usize];
            for (offset, byte) in (0u64..).zip(bytes.iter_mut()) {
                // SAFETY: the user asked for this range; an unmapped address
                // faults like any other bad kernel access.
                *byte = unsafe { ctx.platform.read_byte(base.wrapping_add(offset)) };
            }

            ctx.writeln(&format!(
                "    {} {:#018x}: {:02x} {:02x} {:02x} {:02x}",
                kind, addr, bytes[0], bytes[1], bytes[2], bytes[3]
            ));
        }
        CommandStatus::Success
    }
}
