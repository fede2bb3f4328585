//! Engine error type.

use domain::DomainError;
use order_store::StoreError;
use thiserror::Error;

/// Errors surfaced by the engine services.
///
/// Domain and store failures pass through unchanged; `Contention` is
/// produced only after the bounded optimistic-retry loop gives up.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error(transparent)]
    Domain(#[from] DomainError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("too many concurrent updates during {0}, try again")]
    Contention(&'static str),
}

pub type Result<T> = std::result::Result<T, EngineError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn domain_errors_pass_through() {
        let err: EngineError = DomainError::NotFound("order").into();
        assert_eq!(err.to_string(), "order not found");
    }

    #[test]
    fn store_conflict_passes_through() {
        let err: EngineError = StoreError::Conflict { entity: "product" }.into();
        assert_eq!(err.to_string(), "write conflict on product");
    }

    #[test]
    fn contention_names_the_operation() {
        let err = EngineError::Contention("checkout");
        assert_eq!(
            err.to_string(),
            "too many concurrent updates during checkout, try again"
        );
    }
}
