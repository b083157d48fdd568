//! Frame-pointer stack walking
//!
//! With frame pointers enabled every function prologue pushes the caller's
//! RBP and points RBP at that slot, so the stack holds a linked list:
//!
//! ```text
//!            +------------------+
//! fp + 6*8   | arg 5            |
//!    ...     | ...              |   words above the return address, read as
//! fp + 2*8   | arg 1            |   "arguments" by convention only
//!            +------------------+
//! fp + 8     | return address   |
//!            +------------------+
//! fp ------> | caller's fp      | --> next frame (0 terminates the chain)
//!            +------------------+
//! ```
//!
//! # Environment contract
//!
//! The walk is only meaningful if every function on the stack keeps and
//! links frame pointers (`-C force-frame-pointers=yes` for the whole kernel)
//! and the entry code stores 0 as the outermost saved frame pointer. The
//! walker cannot check either; a broken chain reads garbage or faults.

use crate::memory::WORD_SIZE;
use crate::platform::MemoryAccess;

/// Number of words above the return address reported as arguments
pub const FRAME_ARG_COUNT: usize = 5;

/// One frame of the chain
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StackFrame {
    pub frame_pointer: u64,
    pub return_address: u64,
    pub args: [u64; FRAME_ARG_COUNT],
}

/// Cursor over a frame-pointer chain.
///
/// Memory is passed per step rather than held, so callers can print between
/// steps while holding the same platform mutably.
#[derive(Debug, Clone, Copy)]
pub struct FrameWalker {
    fp: u64,
    depth: usize,
}

impl FrameWalker {
    pub const fn new(frame_pointer: u64) -> Self {
        Self {
            fp: frame_pointer,
            depth: 0,
        }
    }

    /// Frames returned so far
    pub const fn depth(&self) -> usize {
        self.depth
    }

    /// Frame pointer the next step will read (0 once the chain has ended)
    pub const fn frame_pointer(&self) -> u64 {
        self.fp
    }

    /// Read the current frame and advance to the caller's.
    ///
    /// Returns `None` once the saved frame pointer was 0.
    ///
    /// # Safety
    /// The current frame pointer and the seven words starting at it must be
    /// readable (see the module-level environment contract).
    pub unsafe fn next_frame<M: MemoryAccess + ?Sized>(&mut self, memory: &M) -> Option<StackFrame> {
        if self.fp == 0 {
            return None;
        }

        let fp = self.fp;
        let slot = |n: u64| fp.wrapping_add(n * WORD_SIZE);

        let return_address = memory.read_word(slot(1));
        let mut args = [0u64; FRAME_ARG_COUNT];
        for (i, arg) in args.iter_mut().enumerate() {
            *arg = memory.read_word(slot(2 + i as u64));
        }

        self.fp = memory.read_word(fp);
        self.depth += 1;
        log_trace!("frame {}: fp={:#x} ret={:#x} next={:#x}", self.depth, fp, return_address, self.fp);

        Some(StackFrame {
            frame_pointer: fp,
            return_address,
            args,
        })
    }
}
