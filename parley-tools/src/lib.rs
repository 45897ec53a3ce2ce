//! Registry of caller-supplied tools the model may invoke.
//!
//! Any `Fn(A) -> R` whose argument record derives `JsonSchema` can be registered; the
//! schema is generated once and calls are dispatched by name with JSON arguments.

mod error;
mod output;
mod registry;
mod schema;

pub use error::{RegistrationError, Result, ToolError};
pub use output::ToolOutput;
pub use registry::{ToolDefinition, ToolRegistry};
pub use schema::schema_for;

pub use schemars::JsonSchema;
