//! The RPL runtime: heap, stacks, pinned handles, error slot.
//!
//! One `Runtime` owns everything the single interpreter thread mutates:
//! the contiguous temporaries heap, the data and return stacks, local
//! frames, the directory tree, the pinned-handle registry, the scratch
//! assembly lane, the undo snapshots and the process-wide error slot.
//!
//! Memory model: temporaries grow up from the bottom of the heap
//! vector; the data stack, locals, directories and return frames hold
//! offsets into it and are rewritten when the collector slides live
//! objects down. The free middle is the gap between the allocation
//! watermark and the configured capacity, less a word per live stack
//! entry to account for the pointer arrays growing down from the top.

mod gc;

pub use gc::GcStats;

use rpl_types::{leb128, ErrorKind, Id};
use tracing::trace;

use crate::dir::Directories;
use crate::error::{ErrorState, SimpleResult};
use crate::eval::Debugger;
use crate::object::{self, ObjPtr, Value};
use crate::settings::Settings;

/// Bytes of bookkeeping charged per pointer-array entry when computing
/// free space, so the two ends of the region squeeze the same middle.
const PTR_COST: usize = core::mem::size_of::<u32>();

/// Default heap capacity: a quarter of the RAM of the smallest target.
pub const DEFAULT_CAPACITY: usize = 256 * 1024;

// Offsets are u32; the heap must stay addressable by them.
static_assertions::const_assert!(DEFAULT_CAPACITY <= u32::MAX as usize);

/// A deferred-execution frame: a program object and the byte position
/// of the next object inside its body.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Frame {
    /// The program/block/expression being executed.
    pub prog: ObjPtr,
    /// Offset of the body relative to `prog`.
    pub body: u32,
    /// Body length in bytes.
    pub len: u32,
    /// Position of the next object, relative to the body start.
    pub pos: u32,
}

/// A frame of local bindings, pushed by function application.
#[derive(Debug, Clone, Default)]
pub struct LocalFrame {
    /// Name→object bindings, innermost last.
    pub bindings: Vec<(String, ObjPtr)>,
}

/// A pinned handle registered with the runtime.
///
/// The collector rewrites the registered offset when its target moves.
/// Handles must be released with [`Runtime::unpin`]; prefer
/// [`Runtime::with_pinned`] which releases on every exit path.
#[derive(Debug)]
#[must_use = "a pinned handle must be released with Runtime::unpin"]
pub struct Pinned {
    slot: usize,
}

/// The one and only runtime state.
#[derive(Debug)]
pub struct Runtime {
    heap: Vec<u8>,
    capacity: usize,
    scratch: Vec<u8>,
    pub(crate) stack: Vec<ObjPtr>,
    pub(crate) returns: Vec<Frame>,
    pub(crate) locals: Vec<LocalFrame>,
    pub(crate) dirs: Directories,
    pins: Vec<Option<u32>>,
    free_pins: Vec<usize>,
    undo: Vec<Vec<ObjPtr>>,
    /// Stack snapshot taken before each command, restored when the
    /// command fails so errors keep the stack.
    pub(crate) args: Vec<ObjPtr>,
    pub(crate) indep: Option<(String, ObjPtr)>,
    /// User settings.
    pub settings: Settings,
    /// Process-wide error slot.
    pub error: ErrorState,
    pub(crate) debug: Debugger,
    pub(crate) stats: GcStats,
}

impl Default for Runtime {
    fn default() -> Self {
        Runtime::with_capacity(DEFAULT_CAPACITY)
    }
}

impl Runtime {
    /// A runtime with the given heap capacity in bytes.
    pub fn with_capacity(capacity: usize) -> Runtime {
        Runtime {
            heap: Vec::new(),
            capacity,
            scratch: Vec::new(),
            stack: Vec::new(),
            returns: Vec::new(),
            locals: Vec::new(),
            dirs: Directories::default(),
            pins: Vec::new(),
            free_pins: Vec::new(),
            undo: Vec::new(),
            args: Vec::new(),
            indep: None,
            settings: Settings::default(),
            error: ErrorState::default(),
            debug: Debugger::default(),
            stats: GcStats::default(),
        }
    }

    /// Raw view of the temporaries region.
    pub fn heap(&self) -> &[u8] {
        &self.heap
    }

    /// Directory tree.
    pub fn dirs(&self) -> &Directories {
        &self.dirs
    }

    /// Mutable directory tree.
    pub fn dirs_mut(&mut self) -> &mut Directories {
        &mut self.dirs
    }

    /// Collector statistics.
    pub fn gc_stats(&self) -> &GcStats {
        &self.stats
    }

    /// Bytes still available between the two ends of the region.
    pub fn free_bytes(&self) -> usize {
        self.capacity
            .saturating_sub(self.heap.len())
            .saturating_sub(self.pointer_overhead())
    }

    fn pointer_overhead(&self) -> usize {
        let entries = self.stack.len()
            + 2 * self.returns.len()
            + self.locals.iter().map(|f| f.bindings.len()).sum::<usize>()
            + self.pins.len()
            + self.args.len()
            + self.undo.iter().map(Vec::len).sum::<usize>();
        entries * PTR_COST
    }

    // === allocation ======================================================

    /// Reserve room for `need` bytes of temporaries, collecting if the
    /// free middle is exhausted. Fails without retrying further.
    fn ensure(&mut self, need: usize) -> SimpleResult<()> {
        if self.free_bytes() >= need {
            return Ok(());
        }
        self.gc();
        if self.free_bytes() >= need {
            return Ok(());
        }
        trace!(need, free = self.free_bytes(), "allocation failed after gc");
        Err(ErrorKind::OutOfMemory)
    }

    /// Encode a value as a new temporary object.
    pub fn alloc_value(&mut self, value: &Value) -> SimpleResult<ObjPtr> {
        let mark = self.scratch.len();
        object::encode(value, &mut self.scratch);
        self.commit_scratch_raw(mark)
    }

    /// Decode the object at `ptr`.
    pub fn decode(&self, ptr: ObjPtr) -> SimpleResult<Value> {
        object::decode(&self.heap, ptr.index()).map(|(v, _)| v)
    }

    /// The type tag at `ptr`.
    pub fn tag(&self, ptr: ObjPtr) -> SimpleResult<Id> {
        object::tag_at(&self.heap, ptr.index())
    }

    /// Total encoded size of the object at `ptr`.
    pub fn size(&self, ptr: ObjPtr) -> SimpleResult<usize> {
        object::object_size(&self.heap, ptr.index())
    }

    // === scratchpad ======================================================

    /// Current scratch watermark, to pass to `scratch_commit` or
    /// `scratch_abort`.
    pub fn scratch_mark(&self) -> usize {
        self.scratch.len()
    }

    /// Append one encoded object to the scratch lane.
    pub fn scratch_push(&mut self, value: &Value) {
        object::encode(value, &mut self.scratch);
    }

    /// Atomically turn the scratch bytes appended since `mark` into the
    /// body of a new container object with the given id.
    pub fn scratch_commit(&mut self, id: Id, mark: usize) -> SimpleResult<ObjPtr> {
        debug_assert!(id.is_container());
        let body_len = self.scratch.len() - mark;
        let mut header = Vec::with_capacity(4);
        leb128::write_unsigned(&mut header, id as u64);
        leb128::write_unsigned(&mut header, body_len as u64);
        self.ensure(header.len() + body_len)?;
        let at = self.heap.len() as u32;
        self.heap.extend_from_slice(&header);
        self.heap.extend_from_slice(&self.scratch[mark..]);
        self.scratch.truncate(mark);
        Ok(ObjPtr(at))
    }

    /// Discard scratch bytes appended since `mark`.
    pub fn scratch_abort(&mut self, mark: usize) {
        self.scratch.truncate(mark);
    }

    fn commit_scratch_raw(&mut self, mark: usize) -> SimpleResult<ObjPtr> {
        let need = self.scratch.len() - mark;
        if let Err(e) = self.ensure(need) {
            self.scratch.truncate(mark);
            return Err(e);
        }
        let at = self.heap.len() as u32;
        self.heap.extend_from_slice(&self.scratch[mark..]);
        self.scratch.truncate(mark);
        Ok(ObjPtr(at))
    }

    // === pinned handles ==================================================

    /// Register `ptr` so the collector keeps it alive and rewrites it
    /// when its target moves.
    pub fn pin(&mut self, ptr: ObjPtr) -> Pinned {
        let slot = match self.free_pins.pop() {
            Some(slot) => {
                self.pins[slot] = Some(ptr.0);
                slot
            }
            None => {
                self.pins.push(Some(ptr.0));
                self.pins.len() - 1
            }
        };
        Pinned { slot }
    }

    /// Current target of a pinned handle.
    pub fn pinned(&self, pin: &Pinned) -> ObjPtr {
        ObjPtr(self.pins[pin.slot].expect("released pin"))
    }

    /// Release a pinned handle.
    pub fn unpin(&mut self, pin: Pinned) {
        self.pins[pin.slot] = None;
        self.free_pins.push(pin.slot);
    }

    /// Run `f` with `ptr` pinned, releasing the handle on every exit
    /// path.
    pub fn with_pinned<T>(
        &mut self,
        ptr: ObjPtr,
        f: impl FnOnce(&mut Runtime, &Pinned) -> T,
    ) -> T {
        let pin = self.pin(ptr);
        let result = f(self, &pin);
        self.unpin(pin);
        result
    }

    // === data stack ======================================================

    /// Push an object onto the data stack.
    pub fn push(&mut self, ptr: ObjPtr) -> SimpleResult<()> {
        self.ensure(0)?;
        self.stack.push(ptr);
        Ok(())
    }

    /// Encode and push a value.
    pub fn push_value(&mut self, value: &Value) -> SimpleResult<()> {
        let ptr = self.alloc_value(value)?;
        self.push(ptr)
    }

    /// Pop the top of the data stack.
    pub fn pop(&mut self) -> SimpleResult<ObjPtr> {
        self.stack.pop().ok_or(ErrorKind::TooFewArguments)
    }

    /// Pop and decode the top of the data stack.
    pub fn pop_value(&mut self) -> SimpleResult<Value> {
        let ptr = self.pop()?;
        self.decode(ptr)
    }

    /// Object at stack level `n`, level 1 being the top.
    pub fn level(&self, n: usize) -> SimpleResult<ObjPtr> {
        if n == 0 || n > self.stack.len() {
            return Err(ErrorKind::TooFewArguments);
        }
        Ok(self.stack[self.stack.len() - n])
    }

    /// Current stack depth.
    pub fn depth(&self) -> usize {
        self.stack.len()
    }

    /// Fail unless at least `n` levels are present.
    pub fn need_args(&self, n: usize) -> SimpleResult<()> {
        if self.stack.len() < n {
            Err(ErrorKind::TooFewArguments)
        } else {
            Ok(())
        }
    }

    /// Direct view of the data stack, bottom first.
    pub fn stack(&self) -> &[ObjPtr] {
        &self.stack
    }

    /// Remove every stack entry.
    pub fn clear_stack(&mut self) {
        self.stack.clear();
    }

    /// Replace the data stack wholesale; the interactive stack editor
    /// reorders levels through this.
    pub fn set_stack(&mut self, stack: Vec<ObjPtr>) {
        self.stack = stack;
    }

    // === undo ============================================================

    /// Snapshot the stack before a command line runs.
    pub fn save_undo(&mut self) {
        const UNDO_DEPTH: usize = 8;
        if self.undo.len() == UNDO_DEPTH {
            self.undo.remove(0);
        }
        self.undo.push(self.stack.clone());
    }

    /// Restore the last snapshot.
    pub fn undo(&mut self) -> SimpleResult<()> {
        let snapshot = self.undo.pop().ok_or(ErrorKind::Value)?;
        self.stack = snapshot;
        Ok(())
    }

    // === error slot ======================================================

    /// Record an error in the process-wide slot and return it, so call
    /// sites can `return rt.fail(kind, cmd)`.
    pub fn fail<T>(&mut self, kind: ErrorKind, command: Option<Id>) -> SimpleResult<T> {
        self.error.set(kind, command);
        Err(kind)
    }
}

#[cfg(test)]
mod tests;
