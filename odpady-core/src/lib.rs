//! Core types and service wiring for odpady, the municipal waste reporting backend.

/// Per-code aggregation of collection records.
pub mod aggregate;
/// Bundle of backend ports used by the service.
pub mod backend;
/// Waste-type to regulatory code lookup.
pub mod codes;
/// Input shared by all report encoders.
pub mod document;
/// Domain models and identifiers.
pub mod model;
/// Quarters and reporting periods.
pub mod period;
/// Traits describing backend collaborators and encoders.
pub mod ports;
/// High-level service facade used by the HTTP layer.
pub mod service;

pub use aggregate::*;
pub use backend::*;
pub use codes::*;
pub use document::*;
pub use model::*;
pub use period::*;
pub use ports::*;
pub use service::*;
