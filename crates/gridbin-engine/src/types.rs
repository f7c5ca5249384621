use gridbin_kernel::KernelError;
use gridbin_ops::OpError;

/// Errors from the bin pipeline.
#[derive(Debug, Clone, thiserror::Error)]
pub enum EngineError {
    #[error("invalid bin parameters: {reason}")]
    InvalidParameters { reason: String },

    #[error("invalid configuration: {reason}")]
    InvalidConfig { reason: String },

    #[error("operation error: {0}")]
    Op(#[from] OpError),

    #[error("kernel error: {0}")]
    Kernel(#[from] KernelError),
}
