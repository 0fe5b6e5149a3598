pub mod engine;
pub mod error;
pub mod fcff;
pub mod sensitivity;
pub mod statements;
pub mod types;
pub mod valuation;

pub use error::ValuationError;
pub use types::*;

/// Standard result type for all valuation operations
pub type ValuationResult<T> = Result<T, ValuationError>;

/// Engine version, as stamped into every computation envelope.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
