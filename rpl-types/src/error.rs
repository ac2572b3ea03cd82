//! Closed error reason enum shared by every layer of the runtime.

use num_enum::TryFromPrimitive;

/// Reason an operation failed.
///
/// The numeric values are stable; the UI maps each kind to a banner
/// message and the recovery policy of the error table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, TryFromPrimitive, strum::EnumIter, thiserror::Error)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[repr(u8)]
pub enum ErrorKind {
    /// Input text the parser could not understand.
    #[error("Syntax error")]
    Syntax = 0x01,
    /// An operand family the operation does not accept.
    #[error("Bad argument type")]
    Type = 0x02,
    /// An operand value outside the operation's domain.
    #[error("Bad argument value")]
    Value = 0x03,
    /// Unit operands whose dimensions do not match.
    #[error("Inconsistent units")]
    InconsistentUnits = 0x04,
    /// Division of a nonzero value by zero when infinities are disabled.
    #[error("Division by zero")]
    DivideByZero = 0x05,
    /// A hardware float leaf overflowed and promotion was not possible.
    #[error("Numerical overflow")]
    Overflow = 0x06,
    /// A hardware float leaf underflowed to zero.
    #[error("Numerical underflow")]
    Underflow = 0x07,
    /// Heap exhausted even after garbage collection.
    #[error("Out of memory")]
    OutOfMemory = 0x08,
    /// Container access outside its bounds.
    #[error("Index out of range")]
    IndexOutOfBounds = 0x09,
    /// The user pressed the exit key or the battery went low.
    #[error("Interrupted")]
    Interrupted = 0x0A,
    /// An operation with no defined result, e.g. `∞-∞`.
    #[error("Undefined operation")]
    UndefinedOperation = 0x0B,
    /// A name that is bound nowhere on the directory path.
    #[error("Undefined name")]
    UndefinedName = 0x0C,
    /// A unit name outside the unit table.
    #[error("Invalid unit")]
    InvalidUnit = 0x0D,
    /// Malformed object encountered inside the heap.
    #[error("Internal error")]
    Internal = 0x0E,
    /// A command consumed more stack levels than were present.
    #[error("Too few arguments")]
    TooFewArguments = 0x0F,
}

impl ErrorKind {
    /// True when the UI should leave the data stack untouched.
    pub const fn preserves_stack(self) -> bool {
        !matches!(self, ErrorKind::Interrupted)
    }
}
