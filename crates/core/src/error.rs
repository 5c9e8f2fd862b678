use thiserror::Error;

/// Errors raised while loading and validating a flow declaration.
///
/// Runtime per-node failures (the spec's `WorkerError` and `DeliveryError`)
/// are *not* represented here: they are localized to the offending worker,
/// logged, and turned into an early EOS on that node's outputs rather than
/// propagated as a `Result` failure (spec §7).
#[derive(Error, Debug)]
pub enum FlowError {
    #[error("failed to load flow declaration: {0}")]
    Load(String),

    #[error("cyclic import detected: {0}")]
    CyclicImport(String),

    #[error("unknown node type '{0}'")]
    UnknownNodeType(String),

    #[error("graph validation failed: {0}")]
    Validation(String),

    #[error("invalid connection: {0}")]
    Connection(String),

    #[error("invalid arguments: {0}")]
    BadArguments(String),

    #[error("task was cancelled")]
    TaskCancelled,

    #[error("io error")]
    Io(#[from] std::io::Error),

    #[error("malformed flow declaration")]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Other(#[from] crate::Error),
}

pub type Error = Box<dyn std::error::Error + Send + Sync>;

pub type Result<T> = std::result::Result<T, Error>;
