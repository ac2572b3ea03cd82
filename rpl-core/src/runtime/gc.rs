//! The compacting collector.
//!
//! Temporaries are walked in address order; any object whose extent
//! contains a root survives and slides down past the holes left by the
//! dead. Every root (data stack, return frames, locals, directories,
//! undo snapshots, pinned handles, the independent-variable binding)
//! is rewritten to the moved address. Interior pointers are valid
//! roots: a pointer to an embedded child keeps the whole enclosing
//! record alive, which is what return frames rely on.

use tracing::{debug, trace};

use super::Runtime;
use crate::object;

/// Collector statistics, kept across cycles.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct GcStats {
    /// Completed collection cycles.
    pub cycles: u64,
    /// Total bytes recovered over all cycles.
    pub recovered: u64,
    /// Live bytes after the last cycle.
    pub live: usize,
}

impl Runtime {
    /// Visit every root offset. The collector is the only caller that
    /// rewrites; liveness scanning passes a read-only closure.
    fn visit_roots(&mut self, f: &mut dyn FnMut(&mut u32)) {
        for ptr in &mut self.stack {
            f(&mut ptr.0);
        }
        for frame in &mut self.returns {
            f(&mut frame.prog.0);
        }
        for frame in &mut self.locals {
            for (_, ptr) in &mut frame.bindings {
                f(&mut ptr.0);
            }
        }
        for snapshot in &mut self.undo {
            for ptr in snapshot {
                f(&mut ptr.0);
            }
        }
        for ptr in &mut self.args {
            f(&mut ptr.0);
        }
        if let Some((_, ptr)) = &mut self.indep {
            f(&mut ptr.0);
        }
        for slot in &mut self.pins {
            if let Some(offset) = slot {
                f(offset);
            }
        }
        self.dirs.visit_roots(f);
    }

    /// Slide live temporaries down past dead ones and rewrite every
    /// root whose target moved.
    pub fn gc(&mut self) {
        let before = self.heap.len();

        let mut roots: Vec<u32> = Vec::new();
        self.visit_roots(&mut |offset| roots.push(*offset));
        roots.sort_unstable();
        roots.dedup();

        // Walk the heap into object extents. A malformed record would
        // make the rest of the region unwalkable; keep it live and stop.
        let mut live: Vec<(u32, u32, u32)> = Vec::new();
        let mut at = 0usize;
        let mut dst = 0u32;
        while at < self.heap.len() {
            let size = match object::object_size(&self.heap, at) {
                Ok(size) if size > 0 => size,
                _ => {
                    debug!(at, "unwalkable object during gc, keeping tail");
                    let end = self.heap.len() as u32;
                    live.push((at as u32, end, dst));
                    dst += end - at as u32;
                    break;
                }
            };
            let start = at as u32;
            let end = (at + size) as u32;
            let first = roots.partition_point(|&r| r < start);
            if first < roots.len() && roots[first] < end {
                live.push((start, end, dst));
                dst += end - start;
            }
            at += size;
        }

        for &(start, end, new_start) in &live {
            self.heap
                .copy_within(start as usize..end as usize, new_start as usize);
        }
        self.heap.truncate(dst as usize);

        self.visit_roots(&mut |offset| {
            let idx = live.partition_point(|&(start, _, _)| start <= *offset);
            if idx > 0 {
                let (start, end, new_start) = live[idx - 1];
                if *offset < end {
                    *offset = new_start + (*offset - start);
                }
            }
        });

        let after = self.heap.len();
        self.stats.cycles += 1;
        self.stats.recovered += (before - after) as u64;
        self.stats.live = after;
        trace!(before, after, cycles = self.stats.cycles, "gc cycle");
    }
}
