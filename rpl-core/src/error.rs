//! Runtime error representation.
//!
//! Two layers, mirroring the split between a closed reason enum and a
//! contextual wrapper: [`ErrorKind`] names what went wrong, and
//! [`RuntimeError`] carries the command and source span the UI shows in
//! its banner. The runtime additionally keeps a single process-wide
//! error slot (see [`crate::runtime::Runtime::error`]) that ops
//! short-circuit on.

use rpl_types::{ErrorKind, Id};

/// Result of an operation that can only fail with a plain reason.
pub type SimpleResult<T> = Result<T, ErrorKind>;

/// Error surfaced to the embedder after evaluation or parsing.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RuntimeError {
    /// An operation failed while a command was executing.
    #[error("{kind}")]
    Command {
        /// What went wrong.
        kind: ErrorKind,
        /// The command being executed, when known; named in the banner.
        command: Option<Id>,
    },
    /// The parser rejected the source text.
    #[error("syntax error at byte {offset}")]
    Syntax {
        /// Byte offset of the offending code point.
        offset: usize,
    },
}

impl RuntimeError {
    /// The reason, regardless of context.
    pub const fn kind(&self) -> ErrorKind {
        match self {
            RuntimeError::Command { kind, .. } => *kind,
            RuntimeError::Syntax { .. } => ErrorKind::Syntax,
        }
    }
}

impl From<ErrorKind> for RuntimeError {
    fn from(kind: ErrorKind) -> Self {
        RuntimeError::Command {
            kind,
            command: None,
        }
    }
}

/// The single error slot held by the runtime.
///
/// Set once by the failing op, displayed by the UI until the next key,
/// cleared explicitly. Sub-ops observe the slot and short-circuit.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ErrorState {
    /// The failure reason, `None` when no error is pending.
    pub kind: Option<ErrorKind>,
    /// Command named in the banner.
    pub command: Option<Id>,
    /// Source byte range for syntax errors.
    pub span: Option<(usize, usize)>,
}

impl ErrorState {
    /// Whether an error is pending.
    pub const fn is_set(&self) -> bool {
        self.kind.is_some()
    }

    /// Record an error unless one is already pending; the first failure
    /// wins so nested ops do not overwrite the root cause.
    pub fn set(&mut self, kind: ErrorKind, command: Option<Id>) {
        if self.kind.is_none() {
            self.kind = Some(kind);
            self.command = command;
        }
    }

    /// Clear the slot, returning what was pending.
    pub fn take(&mut self) -> Option<(ErrorKind, Option<Id>)> {
        let kind = self.kind.take()?;
        let command = self.command.take();
        self.span = None;
        Some((kind, command))
    }
}
