use thiserror::Error;

use vaultsync_tree::TreeError;

/// Errors surfaced by the password model.
#[derive(Debug, Error)]
pub enum ModelError {
    /// The underlying document tree rejected the operation.
    #[error(transparent)]
    Tree(#[from] TreeError),
}

/// Convenience alias for model operations.
pub type ModelResult<T> = Result<T, ModelError>;
