//! RPL runtime core.
//!
//! The engine at the heart of the calculator: a contiguous object heap
//! with a compacting collector and pinned handles, the self-describing
//! object model, the source parser, the text renderer, the cooperative
//! stack-machine evaluator, the promotion-lattice arithmetic dispatcher,
//! the symbolic expression engine and the directory tree.
//!
//! The UI, the rasterizer and the hardware contracts live in `rpl-ui`;
//! this crate never touches a framebuffer or a key matrix.

#![warn(missing_docs)]

pub mod arith;
pub mod cmd;
pub mod dir;
pub mod error;
pub mod eval;
pub mod expr;
pub mod functions;
pub mod object;
pub mod parse;
pub mod render;
pub mod runtime;
pub mod settings;
pub mod units;

pub use error::{RuntimeError, SimpleResult};
pub use eval::{Host, NullHost, ProgramState};
pub use object::{ObjPtr, Value};
pub use runtime::Runtime;
pub use settings::Settings;

/// Commonly used items for embedders.
pub mod prelude {
    pub use crate::{
        error::{RuntimeError, SimpleResult},
        eval::{Host, NullHost, ProgramState},
        object::{ObjPtr, Value},
        runtime::Runtime,
        settings::Settings,
    };
    pub use rpl_types::{ErrorKind, Id};
}
