//! Script construction, templates, addresses, and a full stack-machine
//! interpreter.
//!
//! A [`Script`] is an immutable byte sequence that can be lazily decomposed
//! into [`Operand`]s, classified against the standard output templates, and
//! executed against an unlocking script via [`interpreter::verify_script`].

pub mod address;
pub mod error;
pub mod interpreter;
pub mod opcodes;
pub mod operand;
pub mod script;
pub mod template;

pub use address::{Address, Network};
pub use error::ScriptError;
pub use operand::{encode_push_data, Operand, Operands};
pub use script::Script;
pub use template::ScriptTemplate;
