//! Interpreter resource limits.

use super::ScriptFlags;

pub const DEFAULT_MAX_OPS: usize = 500;
pub const DEFAULT_MAX_STACK_SIZE: usize = 1000;
pub const DEFAULT_MAX_SCRIPT_SIZE: usize = 10000;
pub const DEFAULT_MAX_SCRIPT_ELEMENT_SIZE: usize = 520;
pub const DEFAULT_MAX_PUB_KEYS_PER_MULTISIG: usize = 20;

/// Script number widths in bytes. The extended opcode set widens
/// arithmetic operands from 4 to 8 bytes.
pub const SCRIPT_NUMBER_LENGTH: usize = 4;
pub const SCRIPT_NUMBER_LENGTH_EXTENDED: usize = 8;

/// Resource limits for one verification run.
///
/// An explicit value passed to the interpreter; callers that need
/// non-default limits construct their own.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Config {
    pub max_ops: usize,
    pub max_stack_size: usize,
    pub max_script_size: usize,
    pub max_script_element_size: usize,
    pub max_pub_keys_per_multisig: usize,
}

impl Config {
    /// The script number width for a flag set, in bytes.
    pub fn max_script_number_length(flags: ScriptFlags) -> usize {
        if flags.has_flag(ScriptFlags::ENABLE_EXTENDED_OPCODES) {
            SCRIPT_NUMBER_LENGTH_EXTENDED
        } else {
            SCRIPT_NUMBER_LENGTH
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Config {
            max_ops: DEFAULT_MAX_OPS,
            max_stack_size: DEFAULT_MAX_STACK_SIZE,
            max_script_size: DEFAULT_MAX_SCRIPT_SIZE,
            max_script_element_size: DEFAULT_MAX_SCRIPT_ELEMENT_SIZE,
            max_pub_keys_per_multisig: DEFAULT_MAX_PUB_KEYS_PER_MULTISIG,
        }
    }
}
