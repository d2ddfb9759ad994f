use thiserror::Error;

/// Errors raised by script construction, templates, and addresses.
///
/// Interpreter execution reports violations through its own error code
/// type; only the fallible construction surface uses `ScriptError`.
#[derive(Error, Debug)]
pub enum ScriptError {
    #[error("invalid script: {0}")]
    InvalidScript(String),

    #[error("invalid opcode: {0}")]
    InvalidOpcode(String),

    #[error("opcode {0} cannot be appended with data")]
    InvalidOpcodeData(String),

    #[error("invalid address: {0}")]
    InvalidAddress(String),

    #[error("invalid address length: expected {expected} bytes, got {got}")]
    InvalidAddressLength { expected: usize, got: usize },

    #[error("unsupported address prefix: {0:#04x}")]
    UnsupportedAddress(u8),

    #[error("script too large: {size} bytes exceeds limit {limit}")]
    ScriptTooLarge { size: usize, limit: usize },

    #[error("push data too large: {size} bytes exceeds limit {limit}")]
    PushDataTooLarge { size: usize, limit: usize },

    #[error("data push exceeds {limit} byte limit for this template")]
    TemplateDataTooLarge { limit: usize },

    #[error("script is not a pay-to-pubkey-hash script")]
    NotP2pkh,

    #[error("multisig requires 1 <= required <= keys <= 16, got {required} of {total}")]
    InvalidMultiSigCounts { required: usize, total: usize },

    #[error("invalid hex: {0}")]
    HexDecode(#[from] hex::FromHexError),

    #[error("invalid disassembly token: {0}")]
    InvalidAsmToken(String),

    #[error(transparent)]
    Primitives(#[from] txforge_primitives::PrimitivesError),
}
