//! Interpreter error codes.
//!
//! Script invalidity is a normal outcome of verification, not an
//! exception, so every way a script can fail is a distinct code paired
//! with a human-readable description of the offending data.

use std::fmt;

/// Everything the interpreter can reject a script for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum InterpreterErrorCode {
    /// A bug in the interpreter itself, never a property of the script.
    Internal,
    #[default]
    Ok,

    // Setup
    InvalidFlags,
    InvalidParams,

    // Evaluation outcomes
    EarlyReturn,
    EmptyStack,
    EvalFalse,
    InvalidProgramCounter,
    CleanStack,

    // Resource limits
    ScriptTooBig,
    ElementTooBig,
    TooManyOperations,
    StackOverflow,
    InvalidPubKeyCount,
    InvalidSignatureCount,

    // Numeric failures
    NumberTooBig,
    NumberTooSmall,
    DivideByZero,
    MinimalData,

    // Verify-family opcodes
    Verify,
    EqualVerify,
    NumEqualVerify,
    CheckSigVerify,
    CheckMultiSigVerify,

    // Malformed or forbidden script structure
    DisabledOpcode,
    ReservedOpcode,
    MalformedPush,
    InvalidStackOperation,
    UnbalancedConditional,
    InvalidInputLength,
    MinimalIf,
    NotPushOnly,
    DiscourageUpgradableNOPs,

    // Signature encoding
    InvalidSigHashType,
    SigTooShort,
    SigTooLong,
    SigInvalidSeqID,
    SigInvalidDataLen,
    SigMissingSTypeID,
    SigMissingSLen,
    SigInvalidSLen,
    SigInvalidRIntID,
    SigZeroRLen,
    SigNegativeR,
    SigTooMuchRPadding,
    SigInvalidSIntID,
    SigZeroSLen,
    SigNegativeS,
    SigTooMuchSPadding,
    SigHighS,
    SigNullDummy,
    PubKeyType,
    NullFail,
    IllegalForkID,

    // Lock time
    NegativeLockTime,
    UnsatisfiedLockTime,
}

impl fmt::Display for InterpreterErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self)
    }
}

/// A verification failure: the code that classifies it plus a
/// description naming the data that triggered it.
#[derive(Debug, Clone)]
pub struct InterpreterError {
    pub code: InterpreterErrorCode,
    pub description: String,
}

impl InterpreterError {
    pub fn new(code: InterpreterErrorCode, description: String) -> Self {
        InterpreterError { code, description }
    }
}

impl fmt::Display for InterpreterError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.description)
    }
}

impl std::error::Error for InterpreterError {}

/// True when `err` carries exactly the code `code`.
pub fn is_error_code(err: &InterpreterError, code: InterpreterErrorCode) -> bool {
    err.code == code
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_code_matching() {
        let err = InterpreterError::new(
            InterpreterErrorCode::EvalFalse,
            "top of stack is false".to_string(),
        );
        assert!(is_error_code(&err, InterpreterErrorCode::EvalFalse));
        assert!(!is_error_code(&err, InterpreterErrorCode::EmptyStack));
        assert_eq!(err.to_string(), "top of stack is false");
    }

    #[test]
    fn test_default_code_is_ok() {
        assert_eq!(InterpreterErrorCode::default(), InterpreterErrorCode::Ok);
        assert_eq!(InterpreterErrorCode::EvalFalse.to_string(), "EvalFalse");
    }
}
