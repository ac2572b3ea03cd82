//! The RPL evaluator.
//!
//! Single-threaded and cooperative: the main loop pops the return
//! stack one object at a time, polls the host's interrupt sources
//! between objects, and yields to the UI when halted. Programs defer
//! their bodies through return-stack frames; inline blocks run where
//! they stand; everything else follows the per-type evaluation rules.
//!
//! Direct vs deferred execution: a program literal encountered inside a
//! running body is data and pushes itself. Only `eval`, a bound symbol
//! or the command line entry point actually runs one.

use rpl_types::{ErrorKind, Id};
use tracing::{debug, trace};

use crate::cmd;
use crate::dir::{Binding, VarKey};
use crate::error::{RuntimeError, SimpleResult};
use crate::object::{ObjPtr, Value};
use crate::runtime::{Frame, Runtime};

/// External collaborators the evaluator polls between frames.
///
/// The implementations live with the UI; evaluation only sees this
/// contract. Every hook has a no-op default so tests can run with
/// [`NullHost`].
pub trait Host {
    /// True when the exit key debounce reports a user abort.
    fn poll_exit(&mut self) -> bool {
        false
    }

    /// True when the periodic voltage sample tripped the low-battery
    /// flag.
    fn battery_low(&mut self) -> bool {
        false
    }

    /// Redraw hook called by long-running operations.
    fn refresh(&mut self) {}

    /// Monotonic milliseconds, for render budgets.
    fn now_ms(&mut self) -> u64 {
        0
    }
}

/// Host with every hook inert; the test suite's default.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullHost;

impl Host for NullHost {}

/// Resulting state of an evaluation run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProgramState {
    /// The return stack drained completely.
    Done,
    /// A halt or step condition fired; the UI may inspect
    /// [`Runtime::next_object`] and resume.
    Halted,
}

/// Halt, step and cancellation state.
#[derive(Debug, Clone, Copy, Default)]
pub struct Debugger {
    /// The loop returns control to the UI when set.
    pub(crate) halted: bool,
    /// Objects left to evaluate before halting again; zero disables.
    pub(crate) stepping: u32,
    /// Halt when the return stack shrinks back to this depth.
    pub(crate) until_depth: Option<usize>,
    /// The previous run was aborted by an interrupt.
    pub(crate) last_aborted: bool,
}

impl Debugger {
    /// Whether the interpreter is suspended.
    pub const fn halted(&self) -> bool {
        self.halted
    }

    /// Whether the previous run ended with an interrupt.
    pub const fn was_aborted(&self) -> bool {
        self.last_aborted
    }
}

impl Runtime {
    /// Debugger state.
    pub fn debugger(&self) -> &Debugger {
        &self.debug
    }

    /// The next object the main loop would evaluate; the UI shows it as
    /// the single-step hint.
    pub fn next_object(&self) -> Option<ObjPtr> {
        let frame = self.returns.iter().rev().find(|f| f.pos < f.len)?;
        Some(ObjPtr(frame.prog.0 + frame.body + frame.pos))
    }

    /// Push a deferred-execution frame for a container's body.
    pub(crate) fn push_frame(&mut self, ptr: ObjPtr) -> SimpleResult<()> {
        let heap = self.heap();
        let at = ptr.index();
        let bytes = heap.get(at..).ok_or(ErrorKind::Internal)?;
        let (_, tag_len) =
            rpl_types::leb128::read_unsigned(bytes).ok_or(ErrorKind::Internal)?;
        let (body_len, len_len) =
            rpl_types::leb128::read_unsigned(&bytes[tag_len..]).ok_or(ErrorKind::Internal)?;
        self.returns.push(Frame {
            prog: ptr,
            body: (tag_len + len_len) as u32,
            len: body_len as u32,
            pos: 0,
        });
        Ok(())
    }

    /// Evaluate one object with direct-execution semantics: programs,
    /// blocks and expressions run; data pushes; symbols resolve.
    pub fn run_object(&mut self, host: &mut dyn Host, ptr: ObjPtr) -> SimpleResult<()> {
        let id = self.tag(ptr)?;
        match id {
            Id::Program | Id::Block | Id::Expression => self.push_frame(ptr),
            _ => self.defer_object(host, ptr),
        }
    }

    /// Evaluate one object with in-body semantics: program and
    /// expression literals are data.
    fn defer_object(&mut self, host: &mut dyn Host, ptr: ObjPtr) -> SimpleResult<()> {
        let id = self.tag(ptr)?;
        trace!(%ptr, ?id, "evaluate");
        match id {
            Id::Block => self.push_frame(ptr),
            Id::Symbol => self.evaluate_symbol(host, ptr),
            Id::Constant => self.evaluate_constant(ptr),
            Id::Call => cmd::execute_call(self, host, ptr),
            _ if id.is_command() => cmd::execute(self, host, id),
            _ => self.push(ptr),
        }
    }

    fn evaluate_symbol(&mut self, host: &mut dyn Host, ptr: ObjPtr) -> SimpleResult<()> {
        let Value::Sym(name) = self.decode(ptr)? else {
            return Err(ErrorKind::Internal);
        };
        // Innermost local frame wins, then the scoped independent
        // variable, then the directory path.
        let local = self
            .locals
            .iter()
            .rev()
            .find_map(|frame| {
                frame
                    .bindings
                    .iter()
                    .rev()
                    .find(|(n, _)| *n == name)
                    .map(|(_, bound)| *bound)
            });
        if let Some(bound) = local {
            return self.push(bound);
        }
        let indep = match &self.indep {
            Some((indep, bound)) if *indep == name => Some(*bound),
            _ => None,
        };
        if let Some(bound) = indep {
            return self.push(bound);
        }
        match self.dirs.recall(&VarKey::Name(name)) {
            Some(Binding::Value(value)) => self.run_object(host, value),
            Some(Binding::Dir(dir)) => self.dirs.enter(dir),
            // Unbound names are algebraic inputs.
            None => self.push(ptr),
        }
    }

    fn evaluate_constant(&mut self, ptr: ObjPtr) -> SimpleResult<()> {
        let Value::Const { name, .. } = self.decode(ptr)? else {
            return Err(ErrorKind::Internal);
        };
        match crate::units::constant(&name) {
            Some(value) => self.push_value(&value),
            None => self.push(ptr),
        }
    }

    /// Run until the return stack drains, a halt/step condition fires,
    /// or an interrupt aborts. The data stack is preserved as of the
    /// last completed object; the return stack unwinds on abort.
    pub fn run(&mut self, host: &mut dyn Host) -> Result<ProgramState, RuntimeError> {
        loop {
            if host.poll_exit() || host.battery_low() {
                return Err(self.interrupt());
            }
            if self.debug.halted {
                return Ok(ProgramState::Halted);
            }
            let Some(frame) = self.returns.last().copied() else {
                return Ok(ProgramState::Done);
            };
            if frame.pos >= frame.len {
                self.returns.pop();
                if let Some(depth) = self.debug.until_depth {
                    if self.returns.len() <= depth {
                        self.debug.until_depth = None;
                        self.debug.halted = !self.returns.is_empty();
                        if self.debug.halted {
                            return Ok(ProgramState::Halted);
                        }
                    }
                }
                continue;
            }
            let at = ObjPtr(frame.prog.0 + frame.body + frame.pos);
            let size = self.size(at)? as u32;
            if let Some(top) = self.returns.last_mut() {
                top.pos += size;
            }
            if let Err(kind) = self.defer_object(host, at) {
                self.error.set(kind, None);
                debug!(?kind, "evaluation error");
                return Err(RuntimeError::Command {
                    kind,
                    command: self.error.command,
                });
            }
            if self.debug.stepping > 0 && self.debug.until_depth.is_none() {
                self.debug.stepping -= 1;
                if self.debug.stepping == 0 {
                    self.debug.halted = true;
                }
            }
        }
    }

    /// Evaluate a single object to completion with `eval` semantics:
    /// programs and expressions run.
    pub fn evaluate(
        &mut self,
        host: &mut dyn Host,
        ptr: ObjPtr,
    ) -> Result<ProgramState, RuntimeError> {
        self.debug.last_aborted = false;
        if let Err(kind) = self.run_object(host, ptr) {
            self.error.set(kind, None);
            return Err(RuntimeError::Command {
                kind,
                command: self.error.command,
            });
        }
        self.run(host)
    }

    /// Evaluate one committed command-line object: program and
    /// expression literals push as data, commands execute, bare names
    /// resolve. This is what Enter does for each parsed object.
    pub fn enter_object(
        &mut self,
        host: &mut dyn Host,
        ptr: ObjPtr,
    ) -> Result<ProgramState, RuntimeError> {
        self.debug.last_aborted = false;
        if let Err(kind) = self.defer_object(host, ptr) {
            self.error.set(kind, None);
            return Err(RuntimeError::Command {
                kind,
                command: self.error.command,
            });
        }
        self.run(host)
    }

    fn interrupt(&mut self) -> RuntimeError {
        self.returns.clear();
        self.debug.halted = false;
        self.debug.stepping = 0;
        self.debug.until_depth = None;
        self.debug.last_aborted = true;
        self.error.set(ErrorKind::Interrupted, None);
        RuntimeError::Command {
            kind: ErrorKind::Interrupted,
            command: None,
        }
    }

    // === halt / step controls ===========================================

    /// Resume a halted program.
    pub fn resume(&mut self, host: &mut dyn Host) -> Result<ProgramState, RuntimeError> {
        self.debug.halted = false;
        self.run(host)
    }

    /// Evaluate exactly one object, then halt again.
    pub fn step_single(&mut self, host: &mut dyn Host) -> Result<ProgramState, RuntimeError> {
        self.debug.halted = false;
        self.debug.stepping = 1;
        self.run(host)
    }

    /// Step over the next object: a program or block runs to completion
    /// before halting; anything else behaves like a single step.
    pub fn step_over(&mut self, host: &mut dyn Host) -> Result<ProgramState, RuntimeError> {
        let next_runs_deep = self
            .next_object()
            .and_then(|ptr| self.tag(ptr).ok())
            .map(|id| matches!(id, Id::Block | Id::Symbol | Id::Call))
            .unwrap_or(false);
        if next_runs_deep {
            self.debug.until_depth = Some(self.returns.len());
            self.debug.halted = false;
            self.debug.stepping = 0;
            self.run(host)
        } else {
            self.step_single(host)
        }
    }

    /// Run until the current frame returns to its caller.
    pub fn step_out(&mut self, host: &mut dyn Host) -> Result<ProgramState, RuntimeError> {
        self.debug.until_depth = Some(self.returns.len().saturating_sub(1));
        self.debug.halted = false;
        self.debug.stepping = 0;
        self.run(host)
    }

    /// Abandon the suspended program.
    pub fn kill(&mut self) {
        self.returns.clear();
        self.locals.clear();
        self.debug.halted = false;
        self.debug.stepping = 0;
        self.debug.until_depth = None;
    }

    /// Evaluate an expression with `name` bound to `value`, the
    /// solver/integrator entry point. The binding is scoped to this
    /// call.
    pub fn eval_with_independent(
        &mut self,
        host: &mut dyn Host,
        expr: ObjPtr,
        name: &str,
        value: ObjPtr,
    ) -> Result<ProgramState, RuntimeError> {
        let saved = self.indep.take();
        self.indep = Some((name.to_owned(), value));
        let result = self.evaluate(host, expr);
        self.indep = saved;
        result
    }
}
