/// Errors from bin construction operations.
#[derive(Debug, Clone, thiserror::Error)]
pub enum OpError {
    #[error("kernel error: {0}")]
    Kernel(#[from] gridbin_kernel::KernelError),

    #[error("spline '{id}' has {points} distinct points, at least 3 are required")]
    DegenerateSpline { id: String, points: usize },

    #[error("invalid parameter: {reason}")]
    InvalidParameter { reason: String },
}
