use thiserror::Error;

/// Errors that can occur in the Galerkin discretization.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum FemError {
    #[error("function spaces have not been built")]
    SpacesNotBuilt,

    #[error("expected {expected} nodes, got {found}")]
    Shape { expected: usize, found: usize },

    #[error("pivot block {block} of the block-tridiagonal system is singular")]
    SingularBlock { block: usize },

    #[error("assembled system is singular")]
    Singular,
}
