//! Shared utilities.

pub mod cancel;
pub mod priority;
pub mod telemetry;

pub use cancel::CancelFlag;
pub use priority::Priority;
pub use telemetry::init_tracing;
