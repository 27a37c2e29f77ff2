//! Data models for the Oro prompt library.
//!
//! These types define the JSON wire format (snake_case) shared by the API
//! handlers and the client toolkit.

mod execution;
mod prompt;
mod tag;

pub use execution::*;
pub use prompt::*;
pub use tag::*;
