//! REST API module.
//!
//! Handlers are thin: validate, call into the lifecycle/registry/collaborators,
//! and pass the glue service's plain JSON shapes back to the caller. Errors
//! bubble up as `AppError` and render through its envelope.

mod accounts;
mod contracts;
mod webhooks;

pub use accounts::*;
pub use contracts::*;
pub use webhooks::*;

/// Handler result: a successful response body or an enveloped `AppError`.
pub type ApiResult<T> = Result<T, crate::errors::AppError>;
