use thiserror::Error;

#[derive(Error, Debug)]
pub enum TransactionError {
    #[error("Invalid transaction: {0}")]
    InvalidTransaction(String),

    #[error("Amount error: {0}")]
    AmountError(String),

    #[error("Fee error: {0}")]
    FeeError(String),

    #[error("Dust output: {0} is below the dust limit of {1}")]
    DustOutput(u64, u64),

    #[error("Signing error: {0}")]
    SigningError(String),

    #[error("Serialization error: {0}")]
    SerializationError(String),

    #[error("Script error: {0}")]
    Script(#[from] txforge_script::ScriptError),

    #[error("Primitives error: {0}")]
    Primitives(#[from] txforge_primitives::PrimitivesError),
}
